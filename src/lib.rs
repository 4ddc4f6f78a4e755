//! Checkout Key Rotator
//!
//! Finds CircleCI projects whose preferred checkout key still uses the legacy
//! `ssh-rsa` algorithm and asks the provider for a replacement key, logging the
//! old and new key metadata to per-organization files.

pub mod client;
pub mod config;
pub mod error;
pub mod rotation;
pub mod security;

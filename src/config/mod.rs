pub mod loader;
pub mod types;

pub use loader::ConfigLoader;
pub use types::{ApiConfig, Config, OutputConfig, Vcs, DEFAULT_API_URL};

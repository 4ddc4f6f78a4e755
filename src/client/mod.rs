pub mod api;
pub mod models;
pub mod request;

pub use api::CircleCiClient;
pub use models::{CheckoutKey, CheckoutKeyList, NewKeyType, Project, ProjectSettings};
pub use request::{ApiResponse, HttpRequest, ParamValue, ResponseData};

pub mod api;
pub mod http;

pub use api::LinodeApi;
pub use http::{DEFAULT_API_URL, HttpLinodeClient};

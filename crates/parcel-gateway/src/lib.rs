//! HTTP surface of Parcel: uploads, short links, quota administration,
//! analytics and the manual reap trigger.

pub mod app;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod model;
pub mod state;

pub use app::App;
pub use error::AppError;
pub use state::{AppState, Backends, GatewaySettings};

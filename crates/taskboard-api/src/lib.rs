pub mod auth;
pub mod boards;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod rate_limit;
pub mod routes;
pub mod security;
pub mod state;
pub mod todos;
pub mod token;

mod rows;

pub use config::Config;
pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, AppStateInner};

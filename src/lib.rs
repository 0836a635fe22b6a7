mod database {
    pub mod actions;
    pub mod error;
    pub mod pagination;
    pub mod pool;
    pub mod schema;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod api {
    pub mod filters;
    pub mod handlers;
    pub mod rejection;
}
pub mod config;
mod constants;
pub mod logging;
pub mod shortlink;

pub use api::*;
pub use authentication::*;
pub use constants::*;
pub use database::*;

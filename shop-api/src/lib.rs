pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod server;

pub mod infrastructure;
pub mod logging;
pub mod middleware;
pub mod utils;

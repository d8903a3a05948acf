pub mod ai;
pub mod auth;
pub mod cli;
pub mod client;
pub mod database;
pub mod environment;
pub mod error;
pub mod schema;
pub mod types;
pub mod utils;
pub mod web;

pub use error::{ApiError, ErrorKind};
pub use web::{build_rocket, start_web_server};

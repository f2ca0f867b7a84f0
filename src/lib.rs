pub mod auth;
pub mod config;
pub mod contract;
pub mod db;
pub mod error;
pub mod generation;
pub mod jobs;
pub mod models;
pub mod pipeline;
pub mod routes;
pub mod schema;
pub mod state;
pub mod transcript;
pub mod workers;

pub use workers::{default_handlers, Worker};

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod normalize;
pub mod service;

pub use config::AppConfig;
pub use db::{create_pool, ensure_schema};
pub use error::{AppError, Result};
pub use service::{DecisionEngine, DocumentAssembler, ImportService, OrderService};

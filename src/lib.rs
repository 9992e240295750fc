pub mod analyzer;
pub mod config;
pub mod db;
pub mod error;
pub mod parser;
pub mod session;

pub use analyzer::{DashboardPayload, Dimension, FilterSpec, KpiSummary, OrderTable};
pub use config::EngineConfig;
pub use error::AppError;
pub use session::DashboardSession;

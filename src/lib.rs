pub mod api;
pub mod care;
pub mod collab;
pub mod entities;
pub mod error;
pub mod metrics;
pub mod migrator;
pub mod notify;
pub mod outbreak;
pub mod scheduler;
pub mod store;
pub mod telemetry;

pub use sea_orm;

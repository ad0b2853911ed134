pub mod config;
pub mod db;
pub mod metrics;
pub mod refresh;
pub mod scheduler;
pub mod types;

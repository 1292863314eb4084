pub mod config;
pub mod database;
pub mod history;
pub mod score;
pub mod trend;

pub mod config;
pub mod discover;
pub mod display;
pub mod driver;
pub mod equipment;
pub mod errors;
pub mod frequency;
pub mod monitor;
pub mod patch;
pub mod report;
pub mod types;

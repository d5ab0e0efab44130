pub mod config;
pub mod lifecycle;
pub mod logging;
pub mod probe;
pub mod report;

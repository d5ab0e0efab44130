pub mod app_config;
pub mod service_config;

pub use app_config::{AppConfig, ConfigError, build_resolver, load_config, load_config_from};
pub use service_config::{FileConfig, ServiceConfig, TimeoutsConfig};

pub mod app_config;
pub mod config;
pub mod records;

pub use app_config::AppConfig;
pub use config::{
    load_app_config, load_app_config_from_env, load_credentials, ConfigError, DEFAULT_ORDERS_URL,
    DEFAULT_SIGNIN_URL,
};
pub use records::{
    flatten_orders, normalize_order_date, Credentials, ItemRecord, OrderRecord, OrderRow,
};

pub mod config;
pub mod http;
pub mod metrics;
pub mod paths;
pub mod test_helpers;

pub mod buffer_pool_port;
pub mod metrics_port;

pub mod buffer_pool;

pub use buffer_pool::{NetworkBufferPool, PoolError};

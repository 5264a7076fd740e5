//! Shared utilities used across both backend chains

pub mod retry;

pub use retry::RetryExecutor;

//! 弹性模式模块：提供重试策略与重试模板。
//!
//! # Resilience Module
//!
//! Retries for DashScope calls. A [`RetryTemplate`] runs a unit of work and
//! asks an injected [`ResiliencePolicy`] whether, and after how long, to run
//! it again. [`RetryOperator`] is the bundled exponential-backoff policy.
//!
//! ```rust
//! use dashscope_ai::resilience::{RetryConfig, RetryTemplate};
//! use std::time::Duration;
//!
//! let template = RetryTemplate::from_config(RetryConfig {
//!     max_retries: 5,
//!     min_delay: Duration::from_millis(200),
//!     ..RetryConfig::default()
//! });
//! # let _ = template;
//! ```

pub mod retry;

pub use retry::{ResiliencePolicy, RetryConfig, RetryOperator, RetryTemplate};

//! HTTP transport used by the DashScope API client.

pub mod http;

pub use http::{HttpTransport, TransportError};

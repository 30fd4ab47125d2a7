//! Narrow transport seam the core calls through.
//!
//! A transport executes one named SOAP operation against an endpoint family
//! and hands back the decoded result value, already stripped of the
//! `{operation}_response.{operation}_result` envelope. Faults are raised
//! before any unwrapping, so a faulted response never parses as a result.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub mod soap;

#[cfg(test)]
pub(crate) mod mock;

pub use soap::SoapClient;

/// Logical endpoint family. The modeled subsystem only issues calls against
/// `Service`; `Data` and `Email` exist for completeness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Service,
    Data,
    Email,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute `operation` with an optional XML request body, returning the
    /// decoded result or an error for faults and remote failures.
    async fn invoke(&self, endpoint: Endpoint, operation: &str, body: Option<String>)
    -> Result<Value>;
}

//! Remote control of the vMix production engine
//!
//! The engine exposes a query-string RPC over HTTP GET
//! (`/api/?Function=..&Input=..&Value=..`). Commands are stateless and
//! fire-and-await: one request, no retry, no idempotency key. The
//! [`RemoteControl`] trait is the seam the sync service drives, so tests
//! can substitute a recording fake for the real HTTP client.

mod client;
mod error;

use std::fmt;

pub use client::VmixClient;
pub use error::RemoteError;

/// Default engine address: vMix listens on loopback port 8088.
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8088;

/// Control functions used by the sync sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteFunction {
    /// Move the list cursor (always to index 0 before a replace)
    SelectIndex,
    /// Clear every entry from a list input
    ListRemoveAll,
    /// Append one item to a list input
    ListAdd,
}

impl RemoteFunction {
    /// Wire name used in the `Function` query parameter
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::SelectIndex => "SelectIndex",
            Self::ListRemoveAll => "ListRemoveAll",
            Self::ListAdd => "ListAdd",
        }
    }
}

impl fmt::Display for RemoteFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// One parameterized control command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub function: RemoteFunction,
    /// Name of the list input inside the engine
    pub input: String,
    pub value: Option<String>,
}

impl RemoteCommand {
    /// `SelectIndex` with the cursor pinned to the top of the list
    pub fn select_index_zero(input: &str) -> Self {
        Self {
            function: RemoteFunction::SelectIndex,
            input: input.to_string(),
            value: Some("0".to_string()),
        }
    }

    pub fn list_remove_all(input: &str) -> Self {
        Self {
            function: RemoteFunction::ListRemoveAll,
            input: input.to_string(),
            value: None,
        }
    }

    pub fn list_add(input: &str, value: &str) -> Self {
        Self {
            function: RemoteFunction::ListAdd,
            input: input.to_string(),
            value: Some(value.to_string()),
        }
    }

    /// Query pairs in wire order (`Function`, `Input`, then `Value` if present)
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = vec![
            ("Function", self.function.wire_name()),
            ("Input", self.input.as_str()),
        ];
        if let Some(value) = &self.value {
            pairs.push(("Value", value.as_str()));
        }
        pairs
    }
}

/// Engine address for one call. Host and port are operator-supplied;
/// there is no discovery protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub host: String,
    pub port: u16,
}

impl Default for RemoteTarget {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl RemoteTarget {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Build a target from loosely validated operator input: an empty
    /// host or a non-numeric port falls back to the default.
    pub fn from_overrides(host: &str, port: &str) -> Self {
        let host = if host.trim().is_empty() {
            DEFAULT_HOST.to_string()
        } else {
            host.trim().to_string()
        };
        let port = port.trim().parse::<u16>().unwrap_or(DEFAULT_PORT);
        Self { host, port }
    }

    /// Base URL of the control endpoint
    pub fn api_url(&self) -> String {
        format!("http://{}:{}/api/", self.host, self.port)
    }
}

/// Seam between the sync orchestrator and the wire. Implementations own
/// no persistent state - every call is an independent transaction.
pub trait RemoteControl: Send + Sync {
    fn invoke(&self, target: &RemoteTarget, command: &RemoteCommand) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_pairs_order() {
        let cmd = RemoteCommand::select_index_zero("Clips");
        assert_eq!(
            cmd.query_pairs(),
            vec![("Function", "SelectIndex"), ("Input", "Clips"), ("Value", "0")]
        );

        let cmd = RemoteCommand::list_remove_all("Clips");
        assert_eq!(
            cmd.query_pairs(),
            vec![("Function", "ListRemoveAll"), ("Input", "Clips")]
        );
    }

    #[test]
    fn test_list_add_carries_filepath() {
        let cmd = RemoteCommand::list_add("Replays", "/clips/goal.mp4");
        assert_eq!(cmd.function, RemoteFunction::ListAdd);
        assert_eq!(cmd.value.as_deref(), Some("/clips/goal.mp4"));
    }

    #[test]
    fn test_target_defaults() {
        let target = RemoteTarget::default();
        assert_eq!(target.api_url(), "http://127.0.0.1:8088/api/");
    }

    #[test]
    fn test_target_loose_port_parsing() {
        let target = RemoteTarget::from_overrides("10.0.0.5", "9000");
        assert_eq!(target.host, "10.0.0.5");
        assert_eq!(target.port, 9000);

        // Non-numeric port falls back to the default
        let target = RemoteTarget::from_overrides("10.0.0.5", "not-a-port");
        assert_eq!(target.port, DEFAULT_PORT);

        // Empty host falls back too
        let target = RemoteTarget::from_overrides("  ", "8088");
        assert_eq!(target.host, DEFAULT_HOST);
    }
}

//! HTTP client for the vMix control endpoint

use std::time::Duration;

use super::{RemoteCommand, RemoteControl, RemoteError, RemoteTarget};

/// Per-call timeout. The engine answers list commands in milliseconds;
/// anything slower means it is gone and the commit should fail fast.
const CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Blocking HTTP client for the engine's query-string RPC.
///
/// Holds only a reusable agent (connection pool + timeout config); the
/// target address travels with each call so the operator can redirect
/// commits to another engine without rebuilding anything.
pub struct VmixClient {
    agent: ureq::Agent,
}

impl VmixClient {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(CALL_TIMEOUT).build(),
        }
    }
}

impl Default for VmixClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteControl for VmixClient {
    fn invoke(&self, target: &RemoteTarget, command: &RemoteCommand) -> Result<(), RemoteError> {
        let mut request = self.agent.get(&target.api_url());
        for (key, value) in command.query_pairs() {
            request = request.query(key, value);
        }

        log::debug!(
            "remote call: {} Input={} Value={:?} -> {}",
            command.function,
            command.input,
            command.value,
            target.api_url()
        );

        match request.call() {
            // Body is ignored; the status line already told us everything
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(code, _)) => Err(RemoteError::Status(code)),
            Err(ureq::Error::Transport(transport)) => {
                if is_timeout(&transport) {
                    Err(RemoteError::Timeout)
                } else {
                    Err(RemoteError::Network(transport.to_string()))
                }
            }
        }
    }
}

/// The agent surfaces an elapsed deadline as an io-level transport
/// error; inspect the underlying `io::Error` kind rather than the
/// message text.
fn is_timeout(transport: &ureq::Transport) -> bool {
    use std::error::Error as _;

    if transport.kind() != ureq::ErrorKind::Io {
        return false;
    }
    transport
        .source()
        .and_then(|source| source.downcast_ref::<std::io::Error>())
        .map(|io| {
            matches!(
                io.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            )
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_engine_is_a_network_error() {
        let client = VmixClient::new();
        // Nothing listens on loopback port 1; connect fails fast
        // (refused, or timed out on filtered hosts).
        let target = RemoteTarget::new("127.0.0.1", 1);
        let command = RemoteCommand::list_remove_all("Clips");

        let err = client.invoke(&target, &command).unwrap_err();
        assert!(matches!(
            err,
            RemoteError::Network(_) | RemoteError::Timeout
        ));
    }
}

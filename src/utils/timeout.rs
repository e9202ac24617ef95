//! Timeout helpers and default durations.

use crate::error::{ProtocolError, Result};
use std::future::Future;
use std::time::Duration;

/// Default bound on establishing the TCP connection. Well under typical OS
/// connect timeouts so an unreachable host fails fast.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Awaits `future`, failing with [`ProtocolError::Timeout`] after `duration`.
pub async fn with_timeout_error<F, T, E>(future: F, duration: Duration) -> Result<T>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: Into<ProtocolError>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(ProtocolError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_maps_to_timeout() {
        let never = std::future::pending::<std::result::Result<(), std::io::Error>>();
        let result = with_timeout_error(never, Duration::from_millis(50)).await;
        assert!(matches!(result, Err(ProtocolError::Timeout)));
    }

    #[tokio::test]
    async fn test_inner_error_is_converted() {
        let failing = async { Err::<(), _>(std::io::Error::other("boom")) };
        let result = with_timeout_error(failing, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(ProtocolError::Io(_))));
    }
}

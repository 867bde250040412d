//! TCP probing: a bare handshake, nothing else. Generalizes the teacher's
//! `checker::execute_tcp_check`.

use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use crate::error::ProbeError;

#[derive(Debug, Clone)]
pub struct TcpProbeResult {
    pub success: bool,
    pub elapsed_ms: u32,
    pub error: Option<ProbeError>,
}

/// Opens a TCP connection to `host:port`, then closes it immediately.
/// Success means the handshake completed before `timeout` elapsed.
pub async fn tcp_probe(
    host: &str,
    port: u16,
    timeout: Duration,
    cancel: &CancellationToken,
) -> TcpProbeResult {
    let start = Instant::now();
    let addr = format!("{host}:{port}");

    let connect_fut = TcpStream::connect(&addr);
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            return TcpProbeResult {
                success: false,
                elapsed_ms: start.elapsed().as_millis() as u32,
                error: Some(ProbeError::Timeout),
            };
        }
        r = tokio::time::timeout(timeout, connect_fut) => r,
    };

    let elapsed_ms = start.elapsed().as_millis() as u32;

    match result {
        Ok(Ok(stream)) => {
            drop(stream);
            TcpProbeResult {
                success: true,
                elapsed_ms,
                error: None,
            }
        }
        Ok(Err(e)) => TcpProbeResult {
            success: false,
            elapsed_ms,
            error: Some(ProbeError::ConnectError(e.to_string())),
        },
        Err(_) => TcpProbeResult {
            success: false,
            elapsed_ms,
            error: Some(ProbeError::Timeout),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_refused_is_connect_error_not_timeout() {
        // Port 0 can never accept; the OS refuses the connection immediately.
        let cancel = CancellationToken::new();
        let result = tcp_probe("127.0.0.1", 1, Duration::from_millis(500), &cancel).await;
        assert!(!result.success);
        assert!(matches!(result.error, Some(ProbeError::ConnectError(_))));
    }

    #[tokio::test]
    async fn cancellation_short_circuits() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = tcp_probe("127.0.0.1", 1, Duration::from_secs(5), &cancel).await;
        assert!(!result.success);
    }
}

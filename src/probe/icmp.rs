//! ICMP echo probing via `surge_ping`, replacing the teacher's DNS-monitor
//! idiom entirely (ICMP monitors were not part of the teacher; the call
//! shape below follows `surge_ping::ping`'s documented API).

use std::net::IpAddr;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::ProbeError;

#[derive(Debug, Clone)]
pub struct IcmpProbeResult {
    pub success: bool,
    pub elapsed_ms: u32,
    pub error: Option<ProbeError>,
}

const PAYLOAD: &[u8] = b"watchpost";

/// Sends a single ICMP echo request to `host` and waits for the reply.
/// `host` may be a literal IP or a hostname; hostnames are resolved first.
pub async fn icmp_probe(
    host: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> IcmpProbeResult {
    let start = Instant::now();

    let addr = match resolve(host).await {
        Ok(addr) => addr,
        Err(e) => {
            return IcmpProbeResult {
                success: false,
                elapsed_ms: start.elapsed().as_millis() as u32,
                error: Some(ProbeError::ConnectError(e)),
            };
        }
    };

    let ping_fut = surge_ping::ping(addr, PAYLOAD);
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            return IcmpProbeResult {
                success: false,
                elapsed_ms: start.elapsed().as_millis() as u32,
                error: Some(ProbeError::Timeout),
            };
        }
        r = tokio::time::timeout(timeout, ping_fut) => r,
    };

    let elapsed_ms = start.elapsed().as_millis() as u32;

    match result {
        Ok(Ok(_)) => IcmpProbeResult {
            success: true,
            elapsed_ms,
            error: None,
        },
        Ok(Err(e)) => IcmpProbeResult {
            success: false,
            elapsed_ms,
            error: Some(ProbeError::ConnectError(e.to_string())),
        },
        Err(_) => IcmpProbeResult {
            success: false,
            elapsed_ms,
            error: Some(ProbeError::Timeout),
        },
    }
}

async fn resolve(host: &str) -> Result<IpAddr, String> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }
    let lookup = format!("{host}:0");
    tokio::net::lookup_host(&lookup)
        .await
        .map_err(|e| e.to_string())?
        .next()
        .map(|a| a.ip())
        .ok_or_else(|| format!("no address found for {host}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_accepts_literal_ip() {
        let ip = resolve("127.0.0.1").await.unwrap();
        assert_eq!(ip, "127.0.0.1".parse::<IpAddr>().unwrap());
    }
}

//! HTTP(S) probing. Generalizes the teacher's
//! `checker::execute_http_check` (timeout via `reqwest::RequestBuilder::
//! timeout`) into the spec's exact success predicate: transport success,
//! status in the expected set (or `[200,400)` by default), and — if a
//! keyword is configured — the keyword present in the first 1 MiB of body.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::ProbeError;

/// Fixed across every probe, per `SPEC_FULL.md` §4.1.
pub const USER_AGENT: &str = "watchpost-worker/1.0 (+synthetic-monitoring)";
/// Cap on bytes read from the response body while keyword-matching
/// (Open Question 3: 1 MiB, matching `spec.md`'s own text).
pub const KEYWORD_BODY_CAP: usize = 1024 * 1024;
/// Redirects the shared client follows before giving up.
pub const MAX_REDIRECTS: usize = 5;

/// Builds the single `reqwest::Client` the worker pool hands to every HTTP
/// probe. One client per process — `reqwest` already pools connections
/// per-host internally, so this alone satisfies the "no unbounded global
/// pool shared across tenants in a starving way" guidance in §9: each host
/// gets its own bounded sub-pool.
pub fn build_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .user_agent(USER_AGENT)
        .build()
}

#[derive(Debug, Clone)]
pub struct HttpProbeResult {
    pub success: bool,
    pub status_code: Option<u16>,
    pub elapsed_ms: u32,
    pub error: Option<ProbeError>,
}

/// Runs a single HTTP(S) check against `url`.
///
/// `expected_codes`: empty means "anything in `[200,400)`" (§4.1's default
/// acceptance range); non-empty means the response status must be one of
/// these exact codes. `keyword`, if set, must appear in the first
/// `KEYWORD_BODY_CAP` bytes of the body.
pub async fn http_probe(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
    expected_codes: &[u16],
    keyword: Option<&str>,
    cancel: &CancellationToken,
) -> HttpProbeResult {
    let start = Instant::now();

    let request = client.get(url).timeout(timeout);

    let send_fut = request.send();
    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            return HttpProbeResult {
                success: false,
                status_code: None,
                elapsed_ms: start.elapsed().as_millis() as u32,
                error: Some(ProbeError::Timeout),
            };
        }
        r = send_fut => r,
    };

    let elapsed_ms = start.elapsed().as_millis() as u32;

    let response = match response {
        Ok(r) => r,
        Err(e) => {
            let err = if e.is_timeout() {
                ProbeError::Timeout
            } else {
                ProbeError::ConnectError(e.to_string())
            };
            return HttpProbeResult {
                success: false,
                status_code: None,
                elapsed_ms,
                error: Some(err),
            };
        }
    };

    let status_code = response.status().as_u16();
    let status_ok = if expected_codes.is_empty() {
        (200..400).contains(&status_code)
    } else {
        expected_codes.contains(&status_code)
    };

    if !status_ok {
        return HttpProbeResult {
            success: false,
            status_code: Some(status_code),
            elapsed_ms,
            error: Some(ProbeError::HttpStatus(status_code)),
        };
    }

    if let Some(needle) = keyword {
        let body_fut = read_capped_body(response, KEYWORD_BODY_CAP);
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return HttpProbeResult {
                    success: false,
                    status_code: Some(status_code),
                    elapsed_ms: start.elapsed().as_millis() as u32,
                    error: Some(ProbeError::Timeout),
                };
            }
            b = body_fut => b,
        };
        let elapsed_ms = start.elapsed().as_millis() as u32;
        match body {
            Ok(body) if body.contains(needle) => HttpProbeResult {
                success: true,
                status_code: Some(status_code),
                elapsed_ms,
                error: None,
            },
            Ok(_) => HttpProbeResult {
                success: false,
                status_code: Some(status_code),
                elapsed_ms,
                error: Some(ProbeError::KeywordMissing),
            },
            Err(e) => HttpProbeResult {
                success: false,
                status_code: Some(status_code),
                elapsed_ms,
                error: Some(ProbeError::ConnectError(e.to_string())),
            },
        }
    } else {
        HttpProbeResult {
            success: true,
            status_code: Some(status_code),
            elapsed_ms,
            error: None,
        }
    }
}

/// Reads up to `cap` bytes of the response body as a lossy UTF-8 string.
async fn read_capped_body(response: reqwest::Response, cap: usize) -> reqwest::Result<String> {
    let mut buf = Vec::with_capacity(cap.min(64 * 1024));
    let mut stream = response;
    while buf.len() < cap {
        match stream.chunk().await? {
            Some(chunk) => {
                let take = (cap - buf.len()).min(chunk.len());
                buf.extend_from_slice(&chunk[..take]);
            }
            None => break,
        }
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_acceptance_range_excludes_3_and_500() {
        assert!((200..400).contains(&204));
        assert!((200..400).contains(&301));
        assert!(!(200..400).contains(&500));
        assert!(!(200..400).contains(&199));
    }

    #[test]
    fn expected_codes_is_exact_match_not_range() {
        let expected = [201u16, 204];
        assert!(expected.contains(&204));
        assert!(!expected.contains(&200));
    }
}

//! Small helpers for rate-limit friendly page fetches.

use rand::{thread_rng, Rng};
use reqwest::StatusCode;
use std::time::Duration;

/// Statuses worth retrying.
pub fn is_transient(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

/// Send `rb`, retrying transient statuses and transport errors up to
/// `max_retries` times with exponential backoff plus jitter.
pub async fn send_with_backoff(
    rb: reqwest::RequestBuilder,
    label: &str,
    max_retries: u8,
) -> Result<reqwest::Response, reqwest::Error> {
    let mut attempt = 0u8;
    loop {
        let Some(req) = rb.try_clone() else {
            // Streaming bodies cannot be replayed.
            return rb.send().await;
        };
        match req.send().await {
            Ok(r) if is_transient(r.status()) && attempt < max_retries => {
                attempt += 1;
                let back_ms = backoff_delay_ms(attempt);
                log::warn!(
                    "🔁 {} {} retry={} backoff={}ms",
                    r.status().as_u16(),
                    label,
                    attempt,
                    back_ms
                );
                tokio::time::sleep(Duration::from_millis(back_ms)).await;
            }
            Ok(r) => return Ok(r),
            Err(e) if attempt < max_retries => {
                attempt += 1;
                let back_ms = backoff_delay_ms(attempt);
                log::warn!(
                    "🔁 err {} retry={} backoff={}ms : {}",
                    label,
                    attempt,
                    back_ms,
                    e
                );
                tokio::time::sleep(Duration::from_millis(back_ms)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

pub fn backoff_delay_ms(attempt: u8) -> u64 {
    let base = backoff_base_ms(attempt);
    let jitter: u64 = thread_rng().gen_range(0..=250);
    base + jitter
}

// 300, 600, 1200, 2400, 4800 then flat
fn backoff_base_ms(attempt: u8) -> u64 {
    300u64.saturating_mul(1u64 << (attempt.clamp(1, 5) - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        assert_eq!(backoff_base_ms(1), 300);
        assert_eq!(backoff_base_ms(2), 600);
        assert_eq!(backoff_base_ms(5), 4800);
        assert_eq!(backoff_base_ms(9), 4800);
        assert_eq!(backoff_base_ms(0), 300);
    }

    #[test]
    fn jitter_stays_bounded() {
        for _ in 0..50 {
            let d = backoff_delay_ms(3);
            assert!((1200..=1450).contains(&d));
        }
    }

    #[test]
    fn transient_statuses() {
        assert!(is_transient(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient(StatusCode::BAD_GATEWAY));
        assert!(!is_transient(StatusCode::NOT_FOUND));
        assert!(!is_transient(StatusCode::OK));
    }
}

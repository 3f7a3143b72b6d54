use super::*;

const LIMIT: usize = 10;
const WINDOW: Duration = Duration::from_secs(60);

fn limiter() -> RateLimiter {
    RateLimiter::new(RateLimitConfig { max_requests: LIMIT, window: WINDOW })
}

#[test]
fn allows_exactly_up_to_limit() {
    let rl = limiter();
    let now = Instant::now();

    for i in 0..LIMIT {
        assert!(rl.check_at("203.0.113.7", now).is_ok(), "request {i} should succeed");
    }
    assert_eq!(
        rl.check_at("203.0.113.7", now),
        Err(RateLimitError { limit: LIMIT, window_secs: 60 })
    );
}

#[test]
fn eleventh_request_inside_window_is_denied() {
    let rl = limiter();
    let start = Instant::now();

    for i in 0..10u64 {
        let at = start + Duration::from_secs(i * 5);
        assert!(rl.check_at("203.0.113.7", at).is_ok(), "request {i} should succeed");
    }
    assert!(rl.check_at("203.0.113.7", start + Duration::from_secs(59)).is_err());
}

#[test]
fn denied_check_does_not_extend_the_window() {
    let rl = limiter();
    let start = Instant::now();
    for _ in 0..LIMIT {
        rl.check_at("id", start).unwrap();
    }
    // Repeated denials must not push new timestamps.
    for s in 1..30 {
        assert!(rl.check_at("id", start + Duration::from_secs(s)).is_err());
    }
    assert!(rl.check_at("id", start + WINDOW).is_ok());
}

#[test]
fn window_expiry_allows_new_requests() {
    let rl = limiter();
    let start = Instant::now();

    for _ in 0..LIMIT {
        rl.check_at("client", start).unwrap();
    }
    assert!(rl.check_at("client", start).is_err());

    let after_window = start + WINDOW + Duration::from_millis(1);
    assert!(rl.check_at("client", after_window).is_ok());
}

#[test]
fn distinct_identifiers_do_not_interfere() {
    let rl = limiter();
    let now = Instant::now();

    for _ in 0..LIMIT {
        rl.check_at("a", now).unwrap();
    }
    assert!(rl.check_at("a", now).is_err());
    assert!(rl.check_at("b", now).is_ok());
}

#[test]
fn cleanup_uses_double_window_horizon() {
    let rl = limiter();
    let start = Instant::now();
    rl.check_at("old", start).unwrap();
    rl.check_at("recent", start + WINDOW).unwrap();

    // One window later "old" is expired for admission but still inside 2x.
    assert_eq!(rl.cleanup_at(start + WINDOW + Duration::from_secs(1)), 0);
    assert_eq!(rl.tracked(), 2);

    assert_eq!(rl.cleanup_at(start + WINDOW * 2), 1);
    assert_eq!(rl.tracked(), 1);
}

#[test]
fn retry_hint_is_the_window() {
    let err = RateLimitError { limit: 10, window_secs: 60 };
    assert_eq!(err.error_code(), "E_RATE_LIMITED");
    assert_eq!(err.retry_after_secs(), Some(60));
    assert!(err.retryable());
}

#[test]
fn concurrent_checks_never_over_admit() {
    let rl = limiter();
    let handles: Vec<_> = (0..32)
        .map(|_| {
            let rl = rl.clone();
            std::thread::spawn(move || rl.check("shared").is_ok())
        })
        .collect();
    let admitted = handles
        .into_iter()
        .map(|h| h.join().expect("thread should not panic"))
        .filter(|allowed| *allowed)
        .count();
    assert_eq!(admitted, LIMIT);
}

use super::*;

#[test]
fn env_parse_missing_returns_default() {
    let val: usize = env_parse("__FASTBOARD_TEST_MISSING_KEY__", 42);
    assert_eq!(val, 42);
}

#[test]
fn env_parse_present_valid() {
    unsafe { std::env::set_var("__FASTBOARD_TEST_EP_VALID__", "99") };
    let val: usize = env_parse("__FASTBOARD_TEST_EP_VALID__", 0);
    assert_eq!(val, 99);
    unsafe { std::env::remove_var("__FASTBOARD_TEST_EP_VALID__") };
}

#[test]
fn env_parse_present_invalid_returns_default() {
    unsafe { std::env::set_var("__FASTBOARD_TEST_EP_INVALID__", "lots") };
    let val: u64 = env_parse("__FASTBOARD_TEST_EP_INVALID__", 7);
    assert_eq!(val, 7);
    unsafe { std::env::remove_var("__FASTBOARD_TEST_EP_INVALID__") };
}

#[test]
fn defaults_match_documented_limits() {
    let config = Config::default();
    assert_eq!(config.port, 8000);
    assert_eq!(config.max_stroke_points, 1000);
    assert_eq!(config.board_log_max_actions, 10_000);
    assert_eq!(config.session_idle_timeout, Duration::from_secs(300));
    assert_eq!(config.ai_rate_limit.max_requests, 10);
    assert_eq!(config.ai_rate_limit.window, Duration::from_secs(60));
}

#[test]
fn bind_addr_joins_host_and_port() {
    let config = Config { host: "127.0.0.1".into(), port: 9100, ..Config::default() };
    assert_eq!(config.bind_addr(), "127.0.0.1:9100");
}

#[test]
fn tracing_level_accepts_long_spellings() {
    let mut config = Config::default();
    config.log_level = "WARNING".into();
    assert_eq!(config.tracing_level(), tracing::Level::WARN);
    config.log_level = "critical".into();
    assert_eq!(config.tracing_level(), tracing::Level::ERROR);
    config.log_level = "Debug".into();
    assert_eq!(config.tracing_level(), tracing::Level::DEBUG);
    config.log_level = "nonsense".into();
    assert_eq!(config.tracing_level(), tracing::Level::INFO);
}

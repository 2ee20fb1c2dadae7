#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("invalid identifier format: {0}")]
    InvalidFormat(String),
    #[error("timestamp {0} does not fit the identifier's time field")]
    TimeOverflow(i64),
    #[error("clock moved backwards from {last_ms}ms to {now_ms}ms")]
    ClockRegression { last_ms: i64, now_ms: i64 },
    #[error("invalid generator configuration: {0}")]
    InvalidConfig(String),
}

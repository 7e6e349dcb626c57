use thiserror::Error;

/// The four error kinds orchestrators surface. Anything else bubbles to the
/// transport, which logs it and responds as an internal computation failure.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Missing/extra/badly typed parameter keys or out-of-domain values.
    /// Never retried.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// The requested strategy key is not in the registry.
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    /// The market-data provider returned nothing or failed. `retryable`
    /// distinguishes a transient provider fault from an unresolvable ticker.
    #[error("market data unavailable: {message}")]
    DataUnavailable { message: String, retryable: bool },

    /// Unexpected arithmetic condition not caught by sanitization. Treated as
    /// a bug signal.
    #[error("internal computation error: {0}")]
    InternalComputation(String),
}

impl EngineError {
    /// Short machine tag accompanying the human message on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidParams(_) => "invalid_params",
            EngineError::UnknownStrategy(_) => "unknown_strategy",
            EngineError::DataUnavailable { .. } => "data_unavailable",
            EngineError::InternalComputation(_) => "internal_computation",
        }
    }

    pub fn no_data(ticker: &str) -> Self {
        EngineError::DataUnavailable {
            message: format!("no data found for {ticker}"),
            retryable: false,
        }
    }

    pub fn provider(message: impl Into<String>) -> Self {
        EngineError::DataUnavailable {
            message: message.into(),
            retryable: true,
        }
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable_tags() {
        assert_eq!(EngineError::InvalidParams("x".into()).kind(), "invalid_params");
        assert_eq!(EngineError::UnknownStrategy("x".into()).kind(), "unknown_strategy");
        assert_eq!(EngineError::no_data("ZZZ").kind(), "data_unavailable");
        assert_eq!(
            EngineError::InternalComputation("x".into()).kind(),
            "internal_computation"
        );
    }

    #[test]
    fn no_data_is_not_retryable_but_provider_faults_are() {
        match EngineError::no_data("ZZZ") {
            EngineError::DataUnavailable { retryable, .. } => assert!(!retryable),
            other => panic!("unexpected: {other:?}"),
        }
        match EngineError::provider("timeout") {
            EngineError::DataUnavailable { retryable, .. } => assert!(retryable),
            other => panic!("unexpected: {other:?}"),
        }
    }
}

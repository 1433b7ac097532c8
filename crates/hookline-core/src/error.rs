use thiserror::Error;

/// Failures raised by hook construction and id generation.
///
/// Execution of a wrapped computation never produces a `HookError`; whatever
/// the computation returns (or panics with) reaches the caller untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    /// A constructor received a value it cannot work with (negative wait,
    /// zero interval period, a throttle with no edges enabled).
    #[error("{hook}: {reason}")]
    InvalidArgument { hook: &'static str, reason: String },

    /// The id registry could not find a free candidate within its attempt bound.
    #[error("could not generate a unique id after {attempts} attempts (last candidate `{last}`)")]
    GenerationExhausted { attempts: usize, last: String },
}

impl HookError {
    pub(crate) fn invalid(hook: &'static str, reason: impl Into<String>) -> Self {
        let err = HookError::InvalidArgument {
            hook,
            reason: reason.into(),
        };
        log::warn!("{err}");
        err
    }
}

pub type Result<T> = std::result::Result<T, HookError>;

/// Converts a host-style millisecond wait into a `Duration`, rejecting negatives.
pub(crate) fn wait_from_millis(hook: &'static str, wait_ms: i64) -> Result<web_time::Duration> {
    u64::try_from(wait_ms)
        .map(web_time::Duration::from_millis)
        .map_err(|_| HookError::invalid(hook, format!("wait must not be negative (got {wait_ms}ms)")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_display() {
        let err = HookError::invalid("debounce", "wait must not be negative");
        assert_eq!(err.to_string(), "debounce: wait must not be negative");
    }

    #[test]
    fn test_exhausted_display_names_candidate() {
        let err = HookError::GenerationExhausted {
            attempts: 1000,
            last: "id-x-1000".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("1000 attempts"));
        assert!(msg.contains("id-x-1000"));
    }

    #[test]
    fn test_wait_from_millis() {
        assert_eq!(
            wait_from_millis("throttle", 250).unwrap(),
            web_time::Duration::from_millis(250)
        );
        assert_eq!(wait_from_millis("throttle", 0).unwrap(), web_time::Duration::ZERO);
        assert!(matches!(
            wait_from_millis("throttle", -1),
            Err(HookError::InvalidArgument { hook: "throttle", .. })
        ));
    }
}

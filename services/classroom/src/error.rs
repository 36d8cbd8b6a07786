//! services/classroom/src/error.rs
//!
//! Defines the primary error type for the classroom service.

use crate::config::ConfigError;
use classroom_core::ports::PortError;

/// The primary error type for the `classroom` service.
///
/// Failures inside a running classroom are reported to the user as notices;
/// only startup failures surface here.
#[derive(Debug, thiserror::Error)]
pub enum ClassroomError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_failures_convert_with_question_mark() {
        fn discover() -> Result<(), ClassroomError> {
            Err(PortError::Unavailable("no backend answered".to_string()))?
        }
        let err = discover().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Service Port Error: Service unavailable: no backend answered"
        );
    }
}

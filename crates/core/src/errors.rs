use thiserror::Error;

use crate::config::ConfigError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("referral count must not be negative, got {0}")]
    NegativeReferralCount(i64),
}

/// Failures a one-shot command can end with.
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    #[error("score store failure: {0}")]
    Store(String),
}

impl ApplicationError {
    /// Stable machine-readable class used in structured command output.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "config_validation",
            Self::Store(_) => "store_unavailable",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) => 2,
            Self::Store(_) => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ConfigError;
    use crate::errors::{ApplicationError, DomainError};

    #[test]
    fn domain_error_names_the_rejected_count() {
        let error = DomainError::NegativeReferralCount(-3);
        assert_eq!(error.to_string(), "referral count must not be negative, got -3");
    }

    #[test]
    fn config_error_maps_to_config_exit_code() {
        let error =
            ApplicationError::from(ConfigError::Validation("store.project_id".to_owned()));
        assert_eq!(error.error_class(), "config_validation");
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn store_error_is_service_unavailable_class() {
        let error = ApplicationError::Store("connection refused".to_owned());
        assert_eq!(error.error_class(), "store_unavailable");
        assert_eq!(error.exit_code(), 4);
        assert_eq!(error.to_string(), "score store failure: connection refused");
    }
}

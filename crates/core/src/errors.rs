use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("agent `{0}` was not found")]
    AgentNotFound(String),
    #[error("agent `{0}` is not a template")]
    NotATemplate(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError};

    #[test]
    fn domain_errors_keep_their_message_when_wrapped() {
        let error = ApplicationError::from(DomainError::NotATemplate("agent-7".to_owned()));

        assert_eq!(error.to_string(), "agent `agent-7` is not a template");
        assert!(matches!(error, ApplicationError::Domain(DomainError::NotATemplate(_))));
    }

    #[test]
    fn persistence_failures_carry_their_cause() {
        let error = ApplicationError::Persistence("database lock timeout".to_owned());

        assert_eq!(error.to_string(), "persistence failure: database lock timeout");
    }
}

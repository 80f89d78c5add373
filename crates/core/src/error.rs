//! Error taxonomy shared by every service.

use thiserror::Error;

/// Result alias used across the core crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced to the frontend.
///
/// None of these are fatal: the UI reports them and lets the user retry.
#[derive(Debug, Error)]
pub enum Error {
    /// Input did not match the expected format.
    #[error("invalid {field}: {reason}")]
    Validation {
        /// Name of the offending field.
        field: &'static str,
        /// Human readable explanation.
        reason: String,
    },
    /// A referenced record does not exist.
    #[error("{kind} `{id}` not found")]
    NotFound {
        /// Record kind (`client`, `vehicle`, ...).
        kind: &'static str,
        /// Identifier that was looked up.
        id: String,
    },
    /// The requested status transition is not allowed.
    #[error("{0}")]
    InvalidState(String),
    /// Unknown username, wrong password, or deactivated account.
    #[error("invalid username or password")]
    InvalidCredentials,
    /// A unique key is already taken.
    #[error("{kind} with {key} `{value}` already exists")]
    AlreadyExists {
        /// Record kind.
        kind: &'static str,
        /// Name of the unique key.
        key: &'static str,
        /// Conflicting value.
        value: String,
    },
    /// The record is still referenced by another store.
    #[error("{0}")]
    ReferentialIntegrity(String),
    /// The logged-in role may not perform the action.
    #[error("role {role} is not allowed to {action}")]
    Forbidden {
        /// Role label of the session.
        role: String,
        /// Description of the denied action.
        action: String,
    },
    /// Reading or writing a data file failed.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl Error {
    /// Shorthand for a [`Error::Validation`].
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`Error::NotFound`].
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_human_readable() {
        let err = Error::validation("email", "expected name@domain.tld");
        assert_eq!(err.to_string(), "invalid email: expected name@domain.tld");

        let err = Error::not_found("vehicle", "V9");
        assert_eq!(err.to_string(), "vehicle `V9` not found");

        let err = Error::Storage(anyhow::anyhow!("failed to read users.json"));
        assert_eq!(err.to_string(), "failed to read users.json");
    }
}

//! Client-supplied idempotency tokens for state writes.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest accepted token, in characters.
pub const CLIENT_REQUEST_ID_MAX_LEN: usize = 200;

/// Validation errors for [`ClientRequestId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientRequestIdValidationError {
    /// The token was blank once trimmed.
    #[error("client_request_id must not be empty")]
    Empty,
    /// The token exceeded [`CLIENT_REQUEST_ID_MAX_LEN`].
    #[error("client_request_id must be at most {max} characters")]
    TooLong {
        /// Maximum accepted length.
        max: usize,
    },
}

/// Idempotency token identifying one logical write.
///
/// Retrying a write with the same token never applies it twice.
///
/// # Examples
/// ```
/// use boardsync::domain::ClientRequestId;
///
/// let id = ClientRequestId::new(" r1 ").expect("valid token");
/// assert_eq!(id.as_ref(), "r1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientRequestId(String);

impl ClientRequestId {
    /// Validate and construct a token, trimming surrounding whitespace.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ClientRequestIdValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ClientRequestIdValidationError::Empty);
        }
        if trimmed.chars().count() > CLIENT_REQUEST_ID_MAX_LEN {
            return Err(ClientRequestIdValidationError::TooLong {
                max: CLIENT_REQUEST_ID_MAX_LEN,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Token for a write the server initiates on its own behalf.
    pub fn server_generated(purpose: &str) -> Self {
        Self(format!("{purpose}-{}", Uuid::new_v4()))
    }
}

impl AsRef<str> for ClientRequestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ClientRequestId> for String {
    fn from(value: ClientRequestId) -> Self {
        value.0
    }
}

impl TryFrom<String> for ClientRequestId {
    type Error = ClientRequestIdValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

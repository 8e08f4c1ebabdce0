//! Shared validation helpers for inbound HTTP adapters.
//!
//! Every failure becomes `400 invalid_request` with `details` naming the
//! offending field and a stable machine-readable code.

use serde_json::{Value, json};

use crate::domain::{BoardDocument, ClientRequestId, EntityId, Error};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidVersion,
    InvalidIdentifier,
    InvalidToken,
    InvalidDocument,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingField => "missing_field",
            ErrorCode::InvalidVersion => "invalid_version",
            ErrorCode::InvalidIdentifier => "invalid_identifier",
            ErrorCode::InvalidToken => "invalid_client_request_id",
            ErrorCode::InvalidDocument => "invalid_document",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(self) -> &'static str {
        self.0
    }
}

fn field_error(field: FieldName, code: ErrorCode, message: String) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field.as_str(),
        "code": code.as_str(),
    }))
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let name = field.as_str();
    field_error(
        field,
        ErrorCode::MissingField,
        format!("missing required field: {name}"),
    )
}

/// Require an optional body field.
pub(crate) fn require<T>(value: Option<T>, field: FieldName) -> Result<T, Error> {
    value.ok_or_else(|| missing_field_error(field))
}

/// Parse a non-negative integer version.
pub(crate) fn parse_version(value: &Value, field: FieldName) -> Result<u64, Error> {
    value.as_u64().ok_or_else(|| {
        let name = field.as_str();
        field_error(
            field,
            ErrorCode::InvalidVersion,
            format!("{name} must be a non-negative integer"),
        )
    })
}

/// Parse a positive row identifier sent as a number or numeric string.
pub(crate) fn parse_row_id(value: &Value, field: FieldName) -> Result<i64, Error> {
    let parsed = match value {
        Value::Number(number) => number.as_i64(),
        Value::String(raw) => raw.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.filter(|id| *id > 0).ok_or_else(|| {
        let name = field.as_str();
        field_error(
            field,
            ErrorCode::InvalidIdentifier,
            format!("{name} must be a positive integer"),
        )
    })
}

pub(crate) fn parse_client_request_id(
    raw: &str,
    field: FieldName,
) -> Result<ClientRequestId, Error> {
    ClientRequestId::new(raw)
        .map_err(|err| field_error(field, ErrorCode::InvalidToken, err.to_string()))
}

pub(crate) fn parse_entity_id(raw: &str, field: FieldName) -> Result<EntityId, Error> {
    EntityId::new(raw).ok_or_else(|| {
        let name = field.as_str();
        field_error(
            field,
            ErrorCode::InvalidIdentifier,
            format!("{name} must not be blank"),
        )
    })
}

/// Normalize a submitted document, accepting the legacy array form.
pub(crate) fn parse_document(value: Value, field: FieldName) -> Result<BoardDocument, Error> {
    BoardDocument::from_value(value)
        .map_err(|err| field_error(field, ErrorCode::InvalidDocument, err.to_string()))
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::ClientId;

/// Failure of a single client-record operation.
///
/// Every variant is scoped to the operation that produced it; none of them
/// leave the record set or a session half-mutated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// A required field is missing or malformed.
    #[error("{0}")]
    Validation(String),
    /// No credential is available; raised before any network call.
    #[error("session expired -- sign in again and retry")]
    SessionExpired,
    /// The target id does not exist locally or remotely.
    #[error("client {0} not found -- it may have been deleted; reload the list")]
    NotFound(ClientId),
    /// Transport or server failure with an opaque cause.
    #[error("network error: {0}")]
    Network(String),
    /// A save for the same client is still in flight.
    #[error("client {0} is being saved -- wait for the save to finish and retry")]
    Busy(ClientId),
}

impl RecordError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::fmt;

use crate::{RecordError, UserId};

/// Opaque bearer token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub credential: Credential,
    pub user_id: UserId,
}

/// Source of the signed-in user's session. Login itself lives elsewhere.
pub trait AuthProvider {
    fn session(&self) -> Option<AuthSession>;
}

/// Fixed session, typically resolved once from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticAuth {
    session: Option<AuthSession>,
}

impl StaticAuth {
    pub fn new(token: impl Into<String>, user_id: UserId) -> Self {
        let token = token.into();
        if token.trim().is_empty() {
            return Self::signed_out();
        }
        Self {
            session: Some(AuthSession {
                credential: Credential::new(token),
                user_id,
            }),
        }
    }

    pub fn signed_out() -> Self {
        Self { session: None }
    }
}

impl AuthProvider for StaticAuth {
    fn session(&self) -> Option<AuthSession> {
        self.session.clone()
    }
}

pub fn require_session(auth: &dyn AuthProvider) -> Result<AuthSession, RecordError> {
    auth.session().ok_or(RecordError::SessionExpired)
}

#[cfg(test)]
mod tests {
    use super::{AuthProvider, Credential, StaticAuth, require_session};
    use crate::{RecordError, UserId};

    #[test]
    fn credential_debug_is_redacted() {
        let credential = Credential::new("super-secret");
        assert_eq!(format!("{credential:?}"), "Credential(***)");
        assert_eq!(credential.expose(), "super-secret");
    }

    #[test]
    fn blank_token_means_signed_out() {
        let auth = StaticAuth::new("  ", UserId::new(1));
        assert!(auth.session().is_none());
        assert_eq!(
            require_session(&auth).expect_err("no session"),
            RecordError::SessionExpired
        );
    }

    #[test]
    fn token_yields_session_for_user() {
        let auth = StaticAuth::new("token", UserId::new(7));
        let session = require_session(&auth).expect("session present");
        assert_eq!(session.user_id, UserId::new(7));
        assert_eq!(session.credential.expose(), "token");
    }
}

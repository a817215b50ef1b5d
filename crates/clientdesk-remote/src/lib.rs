// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use clientdesk_app::{
    ClientId, ClientPatch, ClientRecord, Credential, NewClient, RecordError, RemoteStore, StoreOp,
    StoreReply,
};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Normalizes a REST base URL: http or https only, no trailing slash.
pub fn validate_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        bail!("remote.base_url must not be empty -- set it to the API root, e.g. http://localhost:8000/api");
    }
    let parsed =
        Url::parse(trimmed).with_context(|| format!("remote.base_url {trimmed:?} is not a URL"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_owned()),
        other => bail!("remote.base_url uses scheme {other:?} -- use http or https"),
    }
}

/// `RemoteStore` backed by the REST API under `{base_url}/clients/`.
#[derive(Debug, Clone)]
pub struct HttpStore {
    base_url: String,
    http: HttpClient,
}

impl HttpStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = validate_base_url(base_url)?;
        if timeout.is_zero() {
            bail!("remote.timeout must be positive");
        }
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> String {
        format!("{}/clients/", self.base_url)
    }

    fn item_url(&self, id: ClientId) -> String {
        format!("{}/clients/{id}/", self.base_url)
    }

    fn send(
        &self,
        op: StoreOp,
        target: Option<ClientId>,
        request: RequestBuilder,
        credential: &Credential,
    ) -> Result<Response, RecordError> {
        debug!(op = op.as_str(), id = target.map(ClientId::get), "remote call");
        let response = request
            .bearer_auth(credential.expose())
            .send()
            .map_err(|error| connection_error(&self.base_url, &error))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        debug!(op = op.as_str(), status = status.as_u16(), "remote call failed");
        Err(status_error(op, target, status, &body))
    }
}

impl RemoteStore for HttpStore {
    fn list(&mut self, credential: &Credential) -> Result<Vec<ClientRecord>, RecordError> {
        let request = self.http.get(self.collection_url());
        let response = self.send(StoreOp::List, None, request, credential)?;
        decode(response, "client list")
    }

    fn get(&mut self, id: ClientId, credential: &Credential) -> Result<ClientRecord, RecordError> {
        let request = self.http.get(self.item_url(id));
        let response = self.send(StoreOp::Get, Some(id), request, credential)?;
        decode(response, "client")
    }

    fn create(
        &mut self,
        client: &NewClient,
        credential: &Credential,
    ) -> Result<StoreReply, RecordError> {
        let request = self.http.post(self.collection_url()).json(client);
        let response = self.send(StoreOp::Create, None, request, credential)?;
        decode(response, "create reply")
    }

    fn update(
        &mut self,
        id: ClientId,
        patch: &ClientPatch,
        credential: &Credential,
    ) -> Result<StoreReply, RecordError> {
        let request = self.http.patch(self.item_url(id)).json(patch);
        let response = self.send(StoreOp::Update, Some(id), request, credential)?;
        decode(response, "update reply")
    }

    fn delete(&mut self, id: ClientId, credential: &Credential) -> Result<(), RecordError> {
        let request = self.http.delete(self.item_url(id));
        self.send(StoreOp::Delete, Some(id), request, credential)?;
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, RecordError> {
    response
        .json()
        .map_err(|error| RecordError::network(format!("decode {what}: {error}")))
}

fn connection_error(base_url: &str, error: &reqwest::Error) -> RecordError {
    RecordError::network(format!(
        "cannot reach {base_url} -- check remote.base_url and that the server is running ({error})"
    ))
}

fn status_error(
    op: StoreOp,
    target: Option<ClientId>,
    status: StatusCode,
    body: &str,
) -> RecordError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RecordError::SessionExpired,
        StatusCode::NOT_FOUND => match target {
            Some(id) => RecordError::NotFound(id),
            None => RecordError::network(format!(
                "{} endpoint not found (404) -- check remote.base_url",
                op.as_str()
            )),
        },
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            RecordError::validation(error_message(body).unwrap_or_else(|| {
                format!("server rejected the {} ({})", op.as_str(), status.as_u16())
            }))
        }
        _ => match error_message(body) {
            Some(message) => {
                RecordError::network(format!("server error ({}): {message}", status.as_u16()))
            }
            None => RecordError::network(format!("server returned {}", status.as_u16())),
        },
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: Option<String>,
    detail: Option<String>,
}

/// Pulls a human message out of an error body: `message`, then `detail`,
/// then per-field lists, then short plain text.
fn error_message(body: &str) -> Option<String> {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = parsed
            .message
            .or(parsed.detail)
            .filter(|message| !message.trim().is_empty())
    {
        return Some(message);
    }

    if let Ok(fields) = serde_json::from_str::<BTreeMap<String, Vec<String>>>(body)
        && !fields.is_empty()
    {
        let joined = fields
            .iter()
            .map(|(field, problems)| format!("{field}: {}", problems.join(" ")))
            .collect::<Vec<_>>()
            .join("; ");
        return Some(joined);
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() < 100 && !trimmed.contains('{') {
        return Some(trimmed.to_owned());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{error_message, status_error, validate_base_url};
    use clientdesk_app::{ClientId, RecordError, StoreOp};
    use reqwest::StatusCode;

    #[test]
    fn base_url_is_trimmed_and_checked() {
        assert_eq!(
            validate_base_url("http://localhost:8000/api/").expect("valid url"),
            "http://localhost:8000/api"
        );
        assert!(validate_base_url("").is_err());
        assert!(validate_base_url("ftp://files.example.com").is_err());
        assert!(validate_base_url("not a url").is_err());
    }

    #[test]
    fn auth_statuses_map_to_session_expired() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            assert_eq!(
                status_error(StoreOp::List, None, status, ""),
                RecordError::SessionExpired
            );
        }
    }

    #[test]
    fn not_found_depends_on_target() {
        assert_eq!(
            status_error(
                StoreOp::Delete,
                Some(ClientId::new(3)),
                StatusCode::NOT_FOUND,
                ""
            ),
            RecordError::NotFound(ClientId::new(3))
        );
        assert!(matches!(
            status_error(StoreOp::List, None, StatusCode::NOT_FOUND, ""),
            RecordError::Network(_)
        ));
    }

    #[test]
    fn validation_uses_server_message() {
        let error = status_error(
            StoreOp::Create,
            None,
            StatusCode::BAD_REQUEST,
            r#"{"message":"phone is required"}"#,
        );
        assert_eq!(error, RecordError::validation("phone is required"));
    }

    #[test]
    fn error_message_handles_detail_and_field_lists() {
        assert_eq!(
            error_message(r#"{"detail":"Invalid token."}"#).as_deref(),
            Some("Invalid token.")
        );
        assert_eq!(
            error_message(r#"{"birth_date":["Date has wrong format."],"phone":["Required."]}"#)
                .as_deref(),
            Some("birth_date: Date has wrong format.; phone: Required.")
        );
        assert_eq!(error_message("Bad Gateway").as_deref(), Some("Bad Gateway"));
        assert_eq!(error_message(r#"{"weird": 1}"#), None);
    }

    #[test]
    fn server_errors_are_network_failures() {
        assert_eq!(
            status_error(
                StoreOp::Update,
                Some(ClientId::new(1)),
                StatusCode::BAD_GATEWAY,
                ""
            ),
            RecordError::network("server returned 502")
        );
    }
}

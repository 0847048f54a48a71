//! HTTP backends: a JSON email relay and a declaration API.
//!
//! Both POST the payload as JSON with an optional bearer token and read a
//! reference from the response body. Any 4xx/5xx answer becomes
//! [`ExecutionError::Rejected`]; connection failures become
//! [`ExecutionError::Transport`].

use async_trait::async_trait;
use despacho_core::{DuimpDraft, EmailDraft};
use reqwest::Client;
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::backend::{DeclarationBackend, EmailBackend, Receipt};
use crate::error::{ExecutionError, ExecutionResult};

/// Shared request plumbing.
#[derive(Debug, Clone)]
struct JsonEndpoint {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl JsonEndpoint {
    fn new(url: &str, api_key: Option<&str>) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
            api_key: api_key.map(ToString::to_string),
        }
    }

    async fn post<T: Serialize + ?Sized>(&self, body: &T) -> ExecutionResult<Value> {
        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(body);

        if let Some(ref api_key) = self.api_key {
            let mut auth_value = HeaderValue::try_from(format!("Bearer {api_key}")).map_err(|e| {
                ExecutionError::Transport(format!("Invalid API key characters: {e}"))
            })?;
            auth_value.set_sensitive(true);
            request = request.header("Authorization", auth_value);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ExecutionError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        debug!(url = %self.url, status = %status, "Backend accepted request");
        Ok(response.json::<Value>().await?)
    }
}

/// Pull the first present reference field out of a response body.
fn reference(body: &Value, fields: &[&str]) -> ExecutionResult<String> {
    fields
        .iter()
        .find_map(|f| match body.get(*f) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .ok_or_else(|| {
            ExecutionError::InvalidResponse(format!(
                "response has none of the fields {}",
                fields.join(", ")
            ))
        })
}

#[derive(Serialize)]
struct OutgoingEmail<'a> {
    to: &'a [String],
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    cc: &'a [String],
    subject: &'a str,
    body: &'a str,
}

/// Email relay that accepts `{to, cc, subject, body}` and answers with
/// `{"message_id": ...}` (or `id`).
#[derive(Debug, Clone)]
pub struct HttpEmailRelay {
    endpoint: JsonEndpoint,
}

impl HttpEmailRelay {
    /// Create a relay client.
    #[must_use]
    pub fn new(url: &str, api_key: Option<&str>) -> Self {
        Self {
            endpoint: JsonEndpoint::new(url, api_key),
        }
    }
}

#[async_trait]
impl EmailBackend for HttpEmailRelay {
    fn name(&self) -> &str {
        "http-email-relay"
    }

    async fn send_email(&self, email: &EmailDraft) -> ExecutionResult<Receipt> {
        let body = self
            .endpoint
            .post(&OutgoingEmail {
                to: &email.to,
                cc: &email.cc,
                subject: &email.subject,
                body: &email.body,
            })
            .await?;
        let reference = reference(&body, &["message_id", "id"])?;
        Ok(Receipt::new(self.name(), reference))
    }
}

/// Answer of the declaration API.
#[derive(Debug, Deserialize)]
struct DeclarationAck {
    #[serde(default)]
    status: Option<String>,
}

/// Declaration API that accepts the DUIMP cover as JSON and answers with
/// `{"numero": ...}` (or `number` / `id`), optionally with a `status`.
#[derive(Debug, Clone)]
pub struct HttpDeclarationApi {
    endpoint: JsonEndpoint,
}

impl HttpDeclarationApi {
    /// Create an API client.
    #[must_use]
    pub fn new(url: &str, api_key: Option<&str>) -> Self {
        Self {
            endpoint: JsonEndpoint::new(url, api_key),
        }
    }
}

#[async_trait]
impl DeclarationBackend for HttpDeclarationApi {
    fn name(&self) -> &str {
        "http-declaration-api"
    }

    async fn create_declaration(&self, duimp: &DuimpDraft) -> ExecutionResult<Receipt> {
        let body = self.endpoint.post(duimp).await?;
        let ack: DeclarationAck = serde_json::from_value(body.clone())
            .map_err(|e| ExecutionError::InvalidResponse(e.to_string()))?;
        if let Some(status) = ack.status.as_deref()
            && status.eq_ignore_ascii_case("rejected")
        {
            return Err(ExecutionError::Rejected {
                status: 200,
                message: body
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or("declaration rejected")
                    .to_string(),
            });
        }
        let reference = reference(&body, &["numero", "number", "id"])?;
        Ok(Receipt::new(self.name(), reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reference_extraction() {
        assert_eq!(reference(&json!({"message_id": "m-1"}), &["message_id", "id"]).unwrap(), "m-1");
        assert_eq!(reference(&json!({"id": 42}), &["message_id", "id"]).unwrap(), "42");
        assert!(matches!(
            reference(&json!({"message_id": ""}), &["message_id"]),
            Err(ExecutionError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_outgoing_email_omits_empty_cc() {
        let to = vec!["x@y.com".to_string()];
        let body = serde_json::to_value(OutgoingEmail {
            to: &to,
            cc: &[],
            subject: "Hi",
            body: "",
        })
        .unwrap();
        assert!(body.get("cc").is_none());
        assert_eq!(body["to"][0], "x@y.com");
    }

    #[tokio::test]
    async fn test_invalid_api_key_characters() {
        let relay = HttpEmailRelay::new("http://127.0.0.1:1/send", Some("bad\nkey"));
        let err = relay
            .send_email(&EmailDraft::new(["x@y.com"], "Hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Transport(ref m) if m.contains("Invalid API key")));
    }

    #[tokio::test]
    async fn test_unreachable_relay_is_transport_error() {
        let api = HttpDeclarationApi::new("http://127.0.0.1:1/duimp", None);
        let err = api
            .create_declaration(&DuimpDraft::new("12345678000195"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Transport(_)));
    }
}

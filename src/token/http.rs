//! HTTP implementation of [`TokenRegistry`] against the MediMate
//! backend (`POST /add-token`, `DELETE /remove-token`).

use super::TokenRegistry;
use crate::config::BackendConfig;
use crate::error::TokenError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct AddTokenRequest<'a> {
    email: &'a str,
    token: &'a str,
}

/// Omitting `token` asks the registry to drop whatever it holds for
/// the email.
#[derive(Serialize)]
struct RemoveTokenRequest<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<&'a str>,
}

#[derive(Deserialize)]
struct TokenEnvelope {
    success: bool,
    message: Option<String>,
}

pub struct HttpTokenRegistry {
    config: BackendConfig,
    http: reqwest::Client,
}

impl HttpTokenRegistry {
    pub fn new(config: BackendConfig) -> anyhow::Result<Self> {
        let http = config.build_client()?;
        Ok(Self { config, http })
    }

    /// Reuse an existing client (one connection pool per process).
    pub fn with_client(config: BackendConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    async fn read_envelope(resp: reqwest::Response) -> Result<TokenEnvelope, TokenError> {
        resp.json()
            .await
            .map_err(|e| TokenError::Network(e.to_string()))
    }
}

#[async_trait]
impl TokenRegistry for HttpTokenRegistry {
    async fn add_token(&self, email: &str, token: &str) -> Result<(), TokenError> {
        let resp = self
            .http
            .post(self.config.endpoint("/add-token"))
            .json(&AddTokenRequest { email, token })
            .send()
            .await
            .map_err(|e| TokenError::Network(e.to_string()))?;

        let envelope = Self::read_envelope(resp).await?;
        if envelope.success {
            return Ok(());
        }
        let message = envelope
            .message
            .unwrap_or_else(|| "Failed to register token".to_string());
        // The registry reports a repeated (email, token) pair as a
        // failure; for the client that pair being present is exactly
        // the desired state.
        if message.eq_ignore_ascii_case("token already exists") {
            return Ok(());
        }
        Err(TokenError::Rejected(message))
    }

    async fn remove_token(&self, email: &str, token: Option<&str>) -> Result<(), TokenError> {
        let resp = self
            .http
            .delete(self.config.endpoint("/remove-token"))
            .json(&RemoveTokenRequest { email, token })
            .send()
            .await
            .map_err(|e| TokenError::Network(e.to_string()))?;

        let envelope = Self::read_envelope(resp).await?;
        if envelope.success {
            return Ok(());
        }
        Err(TokenError::Rejected(
            envelope
                .message
                .unwrap_or_else(|| "Failed to remove token".to_string()),
        ))
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn registry_for(server: &MockServer) -> HttpTokenRegistry {
        HttpTokenRegistry::new(BackendConfig::new(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn add_token_posts_email_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/add-token"))
            .and(body_json(json!({"email": "user@x.com", "token": "fcm-abc"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "Token added"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let registry = registry_for(&server).await;
        registry.add_token("user@x.com", "fcm-abc").await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_token_counts_as_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/add-token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "success": false,
                "message": "Token already exists"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let registry = registry_for(&server).await;
        registry.add_token("user@x.com", "fcm-abc").await.unwrap();
        registry.add_token("user@x.com", "fcm-abc").await.unwrap();
    }

    #[tokio::test]
    async fn other_add_failures_surface_the_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/add-token"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "success": false,
                "message": "Database unavailable"
            })))
            .mount(&server)
            .await;

        let registry = registry_for(&server).await;
        let err = registry
            .add_token("user@x.com", "fcm-abc")
            .await
            .unwrap_err();
        assert_eq!(err, TokenError::Rejected("Database unavailable".into()));
    }

    #[tokio::test]
    async fn remove_token_sends_delete_with_both_fields() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/remove-token"))
            .and(body_json(json!({"email": "user@x.com", "token": "fcm-abc"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "Token removed"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let registry = registry_for(&server).await;
        registry
            .remove_token("user@x.com", Some("fcm-abc"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn remove_token_omits_the_token_field_when_absent() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/remove-token"))
            .and(body_json(json!({"email": "user@x.com"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "Token removed"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let registry = registry_for(&server).await;
        registry.remove_token("user@x.com", None).await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_registry_maps_to_network() {
        // Nothing is listening on this port.
        let registry =
            HttpTokenRegistry::new(BackendConfig::new("http://127.0.0.1:9")).unwrap();
        let err = registry
            .add_token("user@x.com", "fcm-abc")
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::Network(_)));
    }
}

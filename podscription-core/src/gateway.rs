//! Remote gateway to the Pod Doctor backend
//!
//! Provides a `PodDoctorApi` trait, the only seam the conversation store
//! talks to, and `HttpGateway`, its reqwest implementation.
//!
//! Endpoints (relative to the configured base URL, default
//! `http://localhost:8080/api`):
//! - POST /chat          : send a message, get the updated session back
//! - POST /sessions      : create a session
//! - GET  /sessions/{id} : fetch one session
//! - GET  /sessions      : list sessions (`{sessions: [...]}` envelope)
//! - GET  {root}/health  : service health, outside the `/api` prefix

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, IntoUrl, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::ApiConfig;
use crate::error::GatewayError;
use crate::models::{Message, Session};

// ============================================================================
// PodDoctorApi trait
// ============================================================================

/// Typed access to the backend. Every call either yields the value or a
/// `GatewayError`; there is no partial result.
#[async_trait]
pub trait PodDoctorApi: Send + Sync {
    async fn send_message(
        &self,
        content: &str,
        session_id: Option<&str>,
    ) -> Result<ChatResponse, GatewayError>;

    async fn create_session(&self, name: Option<&str>) -> Result<Session, GatewayError>;

    async fn get_session(&self, id: &str) -> Result<Session, GatewayError>;

    async fn list_sessions(&self) -> Result<Vec<Session>, GatewayError>;

    /// Diagnostics only; not part of the conversation flow.
    async fn health_check(&self) -> Result<HealthStatus, GatewayError>;
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct CreateSessionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session: Session,
    pub message: Message,
}

#[derive(Debug, Deserialize)]
struct SessionsResponse {
    sessions: Vec<Session>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Error body the backend sends with non-2xx statuses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: String,
}

// ============================================================================
// HttpGateway
// ============================================================================

#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base: Url,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        Self::with_timeout(base_url, None)
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, GatewayError> {
        Self::with_timeout(
            config.base_url.clone(),
            config.timeout_seconds.map(Duration::from_secs),
        )
    }

    fn with_timeout(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, GatewayError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let base_url = base_url.into().trim_end_matches('/').to_string();
        let base = Url::parse(&base_url)
            .map_err(|e| GatewayError::InvalidBaseUrl(format!("{}: {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(GatewayError::InvalidBaseUrl(base_url));
        }

        Ok(Self {
            client: builder.build()?,
            base,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Health lives at the service root: a trailing `/api` path segment is
    /// dropped. The host is never touched.
    pub fn health_url(&self) -> String {
        let mut url = self.base.clone();
        let path = url.path().trim_end_matches('/');
        let root = path.strip_suffix("/api").unwrap_or(path).to_string();
        url.set_path(&format!("{}/health", root));
        url.to_string()
    }

    /// `{base}/sessions/{id}` with `id` percent-encoded as one segment.
    fn session_url(&self, id: &str) -> Result<Url, GatewayError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::InvalidBaseUrl(self.base_url.clone()))?
            .pop_if_empty()
            .push("sessions")
            .push(id);
        Ok(url)
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn get(&self, url: impl IntoUrl) -> RequestBuilder {
        self.client.get(url).header(CONTENT_TYPE, "application/json")
    }

    /// `json` sets the content type itself.
    fn post<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> RequestBuilder {
        self.client.post(self.url(endpoint)).json(body)
    }

    /// Send a request and decode a 2xx body as `T`, normalizing every other
    /// outcome into a `GatewayError`.
    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        endpoint: &str,
    ) -> Result<T, GatewayError> {
        tracing::debug!(endpoint, "Pod Doctor request");

        let response = request.send().await.map_err(|e| {
            tracing::warn!(endpoint, error = %e, "Pod Doctor unreachable");
            GatewayError::Transport(e)
        })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let err = api_error(status, &body);
            tracing::warn!(endpoint, status = status.as_u16(), error = %err, "Pod Doctor API error");
            return Err(err);
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(endpoint, error = %e, "Malformed Pod Doctor response");
            GatewayError::Decode(e)
        })
    }
}

/// Prefer the server's own message, then its error code, then a
/// status-derived fallback when the body is not the expected shape.
fn api_error(status: reqwest::StatusCode, body: &str) -> GatewayError {
    let fallback = || {
        format!(
            "HTTP {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown Status")
        )
    };

    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => {
            let message = if !parsed.message.is_empty() {
                parsed.message
            } else if !parsed.error.is_empty() {
                parsed.error
            } else {
                fallback()
            };
            GatewayError::Api {
                status: status.as_u16(),
                code: parsed.code,
                message,
            }
        }
        Err(_) => GatewayError::Api {
            status: status.as_u16(),
            code: None,
            message: fallback(),
        },
    }
}

#[async_trait]
impl PodDoctorApi for HttpGateway {
    async fn send_message(
        &self,
        content: &str,
        session_id: Option<&str>,
    ) -> Result<ChatResponse, GatewayError> {
        let body = ChatRequest {
            content,
            session_id: session_id.filter(|id| !id.is_empty()),
        };
        let request = self.post("/chat", &body);
        self.fetch(request, "/chat").await
    }

    async fn create_session(&self, name: Option<&str>) -> Result<Session, GatewayError> {
        let body = CreateSessionRequest {
            name: name.filter(|n| !n.is_empty()),
        };
        let request = self.post("/sessions", &body);
        self.fetch(request, "/sessions").await
    }

    async fn get_session(&self, id: &str) -> Result<Session, GatewayError> {
        let url = self.session_url(id)?;
        let endpoint = url.path().to_string();
        let request = self.get(url);
        self.fetch(request, &endpoint).await
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, GatewayError> {
        let request = self.get(self.url("/sessions"));
        let envelope: SessionsResponse = self.fetch(request, "/sessions").await?;
        Ok(envelope.sessions)
    }

    async fn health_check(&self) -> Result<HealthStatus, GatewayError> {
        let url = self.health_url();
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "Health check failed");
            return Err(GatewayError::Health {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_json(id: &str, messages: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "name": "Session 1",
            "messages": messages,
            "createdAt": "2026-03-01T12:00:00Z",
            "updatedAt": "2026-03-01T12:00:00Z"
        })
    }

    fn message_json(id: &str, role: &str, content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "role": role,
            "content": content,
            "timestamp": "2026-03-01T12:00:01Z"
        })
    }

    async fn gateway() -> (MockServer, HttpGateway) {
        let server = MockServer::start().await;
        let gateway = HttpGateway::new(format!("{}/api", server.uri())).unwrap();
        (server, gateway)
    }

    #[tokio::test]
    async fn test_send_message_posts_content_and_session_id() {
        let (server, gateway) = gateway().await;
        let assistant = message_json("m2", "assistant", "Check the liveness probe");

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({
                "content": "pod crashlooping",
                "sessionId": "s1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "session": session_json("s1", serde_json::json!([
                    message_json("m1", "user", "pod crashlooping"),
                    assistant.clone()
                ])),
                "message": assistant
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resp = gateway.send_message("pod crashlooping", Some("s1")).await.unwrap();
        assert_eq!(resp.session.id, "s1");
        assert_eq!(resp.session.messages.len(), 2);
        assert_eq!(resp.message.id, "m2");
    }

    #[tokio::test]
    async fn test_send_message_omits_missing_session_id() {
        let (server, gateway) = gateway().await;
        let assistant = message_json("m2", "assistant", "hello");

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_json(serde_json::json!({ "content": "hi" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "session": session_json("s9", serde_json::json!([assistant.clone()])),
                "message": assistant
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resp = gateway.send_message("hi", None).await.unwrap();
        assert_eq!(resp.session.id, "s9");
    }

    #[tokio::test]
    async fn test_create_session_sends_optional_name() {
        let (server, gateway) = gateway().await;

        Mock::given(method("POST"))
            .and(path("/api/sessions"))
            .and(body_json(serde_json::json!({ "name": "Night shift" })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(session_json("s2", serde_json::json!([]))),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/sessions"))
            .and(body_json(serde_json::json!({})))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(session_json("s3", serde_json::json!([]))),
            )
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(gateway.create_session(Some("Night shift")).await.unwrap().id, "s2");
        assert_eq!(gateway.create_session(None).await.unwrap().id, "s3");
    }

    #[tokio::test]
    async fn test_get_session_by_id() {
        let (server, gateway) = gateway().await;

        Mock::given(method("GET"))
            .and(path("/api/sessions/s1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(session_json("s1", serde_json::json!([]))),
            )
            .mount(&server)
            .await;

        let session = gateway.get_session("s1").await.unwrap();
        assert_eq!(session.id, "s1");
    }

    #[tokio::test]
    async fn test_list_sessions_unwraps_envelope() {
        let (server, gateway) = gateway().await;

        Mock::given(method("GET"))
            .and(path("/api/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sessions": [
                    session_json("s1", serde_json::json!([])),
                    session_json("s2", serde_json::json!([]))
                ]
            })))
            .mount(&server)
            .await;

        let sessions = gateway.list_sessions().await.unwrap();
        let ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2"]);
    }

    #[tokio::test]
    async fn test_structured_error_body_is_surfaced() {
        let (server, gateway) = gateway().await;

        Mock::given(method("GET"))
            .and(path("/api/sessions/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": "SESSION_NOT_FOUND",
                "code": "E404",
                "message": "Session not found"
            })))
            .mount(&server)
            .await;

        let err = gateway.get_session("missing").await.unwrap_err();
        match &err {
            GatewayError::Api { status, code, message } => {
                assert_eq!(*status, 404);
                assert_eq!(code.as_deref(), Some("E404"));
                assert_eq!(message, "Session not found");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
        assert_eq!(err.to_string(), "API Error: Session not found");
    }

    #[tokio::test]
    async fn test_error_code_used_when_message_empty() {
        let (server, gateway) = gateway().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "INVALID_PAYLOAD",
                "message": ""
            })))
            .mount(&server)
            .await;

        let err = gateway.send_message("x", None).await.unwrap_err();
        assert_eq!(err.to_string(), "API Error: INVALID_PAYLOAD");
    }

    #[tokio::test]
    async fn test_unparsable_error_body_falls_back_to_status() {
        let (server, gateway) = gateway().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = gateway.send_message("x", Some("s1")).await.unwrap_err();
        assert_eq!(err.to_string(), "API Error: HTTP 500: Internal Server Error");
    }

    #[tokio::test]
    async fn test_empty_error_body_falls_back_to_status() {
        let (server, gateway) = gateway().await;

        Mock::given(method("GET"))
            .and(path("/api/sessions"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = gateway.list_sessions().await.unwrap_err();
        assert!(err.to_string().contains("HTTP 503"), "got {}", err);
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_decode_error() {
        let (server, gateway) = gateway().await;

        Mock::given(method("GET"))
            .and(path("/api/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": []
            })))
            .mount(&server)
            .await;

        let err = gateway.list_sessions().await.unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)), "got {:?}", err);
        assert!(err.to_string().contains("sessions"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let gateway = HttpGateway::new("http://127.0.0.1:1/api").unwrap();
        let err = gateway.list_sessions().await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)), "got {:?}", err);
        assert!(!err.to_string().is_empty());
    }

    #[tokio::test]
    async fn test_health_check_uses_root_path() {
        let (server, gateway) = gateway().await;

        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "healthy",
                "service": "podscription-api",
                "version": "1.0.0"
            })))
            .mount(&server)
            .await;

        let health = gateway.health_check().await.unwrap();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.service, "podscription-api");
    }

    #[tokio::test]
    async fn test_health_check_failure_reports_status() {
        let (server, gateway) = gateway().await;

        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = gateway.health_check().await.unwrap_err();
        assert_eq!(err.to_string(), "Health check failed: 502");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let gateway = HttpGateway::new("http://localhost:8080/api/").unwrap();
        assert_eq!(gateway.base_url(), "http://localhost:8080/api");
        assert_eq!(gateway.health_url(), "http://localhost:8080/health");
    }

    #[test]
    fn test_health_url_keeps_api_host_intact() {
        let gateway = HttpGateway::new("http://api.example.com/api").unwrap();
        assert_eq!(gateway.health_url(), "http://api.example.com/health");

        let gateway = HttpGateway::new("https://api.example.com/pod-doctor/api").unwrap();
        assert_eq!(gateway.health_url(), "https://api.example.com/pod-doctor/health");

        let gateway = HttpGateway::new("http://api.example.com").unwrap();
        assert_eq!(gateway.health_url(), "http://api.example.com/health");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = HttpGateway::new("not a url").unwrap_err();
        assert!(matches!(err, GatewayError::InvalidBaseUrl(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_get_session_encodes_id_as_one_segment() {
        let (server, gateway) = gateway().await;

        Mock::given(method("GET"))
            .and(path("/api/sessions/ns%2Fpod-1%3Fx"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(session_json("ns/pod-1?x", serde_json::json!([]))),
            )
            .expect(1)
            .mount(&server)
            .await;

        let session = gateway.get_session("ns/pod-1?x").await.unwrap();
        assert_eq!(session.id, "ns/pod-1?x");
    }

    #[tokio::test]
    async fn test_error_message_without_code_is_surfaced() {
        let (server, gateway) = gateway().await;

        Mock::given(method("GET"))
            .and(path("/api/sessions/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "message": "Session not found"
            })))
            .mount(&server)
            .await;

        let err = gateway.get_session("gone").await.unwrap_err();
        assert_eq!(err.to_string(), "API Error: Session not found");
    }

    #[tokio::test]
    async fn test_error_object_without_fields_falls_back_to_status() {
        let (server, gateway) = gateway().await;

        Mock::given(method("GET"))
            .and(path("/api/sessions"))
            .respond_with(ResponseTemplate::new(502).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let err = gateway.list_sessions().await.unwrap_err();
        assert_eq!(err.to_string(), "API Error: HTTP 502: Bad Gateway");
    }
}

//! HTTP client for the gateway exercised by gateload.
//!
//! The client knows the gateway's routes and auth headers; it does not record
//! metrics. Callers time and tag requests themselves.

mod endpoint;
mod error;

pub use endpoint::{ApiRequest, Auth, Endpoint};
pub use error::ClientError;

use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// Header carrying the bot key on privileged routes.
pub const BOT_KEY_HEADER: &str = "X-Bot-Key";

/// Status and raw body of a gateway response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
    pub elapsed: Duration,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }

    pub fn json_value(&self) -> Result<serde_json::Value, ClientError> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Top-level field of a JSON object body, `None` when absent or unparsable.
    pub fn json_field(&self, field: &str) -> Option<serde_json::Value> {
        self.json_value().ok()?.get(field).cloned()
    }
}

#[derive(Debug, Clone)]
pub struct GatewayClient {
    inner: reqwest::Client,
    base_url: Url,
    default_timeout: Duration,
}

impl GatewayClient {
    pub fn new(base_url: Url, default_timeout: Duration) -> Result<Self, ClientError> {
        let inner = reqwest::Client::builder()
            .user_agent(concat!("gateload/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self {
            inner,
            base_url,
            default_timeout,
        })
    }

    /// Full URL for a route; the base's own path is kept as a prefix.
    pub fn url_for(&self, endpoint: &Endpoint) -> Result<Url, ClientError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let raw = format!("{base}{}", endpoint.path());
        Url::parse(&raw).map_err(|e| ClientError::InvalidUrl {
            value: raw,
            reason: e.to_string(),
        })
    }

    /// Sends one request. Non-2xx statuses are returned as responses, not errors.
    pub async fn send(&self, req: ApiRequest) -> Result<ApiResponse, ClientError> {
        let url = self.url_for(&req.endpoint)?;
        let mut builder = self
            .inner
            .request(req.endpoint.method(), url.clone())
            .timeout(req.timeout.unwrap_or(self.default_timeout));

        builder = match &req.auth {
            Auth::None => builder,
            Auth::BotKey(key) => builder.header(BOT_KEY_HEADER, key),
            Auth::Bearer(token) => builder.bearer_auth(token),
        };
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        let started = Instant::now();
        let transport = |source| ClientError::Transport {
            url: url.to_string(),
            source,
        };
        let resp = builder.send().await.map_err(transport)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(transport)?;
        let elapsed = started.elapsed();

        debug!(
            method = %req.endpoint.method(),
            name = req.tag(),
            status,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "request complete"
        );

        Ok(ApiResponse {
            status,
            body,
            elapsed,
        })
    }

    /// `GET /`, the gateway's liveness route.
    pub async fn ping(&self) -> Result<ApiResponse, ClientError> {
        self.send(ApiRequest::new(Endpoint::Health)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateload_types::api::ResourceId;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GatewayClient {
        GatewayClient::new(server.uri().parse().unwrap(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn url_for_keeps_base_prefix() {
        let c = GatewayClient::new(
            "http://gw.local:8080/prefix/".parse().unwrap(),
            Duration::from_secs(1),
        )
        .unwrap();
        let url = c.url_for(&Endpoint::GetUser(ResourceId::Int(3))).unwrap();
        assert_eq!(url.as_str(), "http://gw.local:8080/prefix/api/users/users/3");
    }

    #[tokio::test]
    async fn sends_bot_key_and_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/users"))
            .and(header(BOT_KEY_HEADER, "secret"))
            .and(body_json(serde_json::json!({"login": "u1"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": 9})))
            .expect(1)
            .mount(&server)
            .await;

        let req = ApiRequest::new(Endpoint::CreateUser)
            .bot_key("secret")
            .json(&serde_json::json!({"login": "u1"}))
            .unwrap();
        let resp = client(&server).send(req).await.unwrap();

        assert_eq!(resp.status, 201);
        assert_eq!(resp.json_field("id"), Some(serde_json::json!(9)));
    }

    #[tokio::test]
    async fn sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/users/users"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let resp = client(&server)
            .send(ApiRequest::new(Endpoint::ListUsers).bearer("tok"))
            .await
            .unwrap();
        assert_eq!(resp.status, 200);
        assert!(resp.is_success());
    }

    #[tokio::test]
    async fn error_status_is_not_a_client_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(401).set_body_string("nope"))
            .mount(&server)
            .await;

        let resp = client(&server)
            .send(ApiRequest::new(Endpoint::Login))
            .await
            .unwrap();
        assert_eq!(resp.status, 401);
        assert!(!resp.is_success());
        assert_eq!(resp.json_field("access_token"), None);
    }

    #[tokio::test]
    async fn per_request_timeout_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let err = client(&server)
            .send(ApiRequest::new(Endpoint::Health).timeout(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn ping_hits_root() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Gateway is running"))
            .mount(&server)
            .await;

        let resp = client(&server).ping().await.unwrap();
        assert_eq!(resp.body, "Gateway is running");
    }
}

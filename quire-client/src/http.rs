//! HTTP client for the `/orders` REST API

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use shared::Order;
use std::time::Duration;

use crate::{ClientConfig, ClientError, ClientResult, OrderDraft, StatusPatch};

/// Authoritative order store, as seen from the client
///
/// Implemented by [`HttpClient`]; tests substitute in-memory fakes.
#[async_trait]
pub trait OrderSource: Send + Sync {
    /// `GET /orders`
    async fn list_orders(&self) -> ClientResult<Vec<Order>>;

    /// `GET /orders/{id}`
    async fn get_order(&self, order_id: &str) -> ClientResult<Order>;

    /// `PUT /orders/{id}` with `{status}`, returns the updated order
    async fn update_status(&self, order_id: &str, patch: &StatusPatch) -> ClientResult<Order>;

    /// `POST /orders`, returns the created order
    async fn create_order(&self, draft: &OrderDraft) -> ClientResult<Order>;
}

/// HTTP client for the order REST API
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            timeout: config.timeout,
        })
    }

    /// Set the authentication token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Get the current token
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `/orders/{id}` with the id percent-encoded as a single segment
    fn order_url(&self, order_id: &str) -> ClientResult<Url> {
        let mut url = Url::parse(&self.url("/orders"))
            .map_err(|e| ClientError::Internal(format!("Invalid base URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Internal(format!("Base URL cannot carry a path: {}", self.base_url)))?
            .push(order_id);
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> ClientResult<T> {
        let response = self.authorize(request).send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Timeout(self.timeout)
            } else {
                ClientError::Http(e)
            }
        })?;
        Self::handle_response(response).await
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.send(self.client.get(self.url(path))).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: serde::Serialize>(&self, path: &str, body: &B) -> ClientResult<T> {
        self.send(self.client.post(self.url(path)).json(body)).await
    }

    /// Make a PUT request with JSON body
    pub async fn put<T: DeserializeOwned, B: serde::Serialize>(&self, path: &str, body: &B) -> ClientResult<T> {
        self.send(self.client.put(self.url(path)).json(body)).await
    }

    /// Handle the HTTP response
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await?;
            return match status {
                StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
                StatusCode::FORBIDDEN => Err(ClientError::Forbidden(text)),
                StatusCode::NOT_FOUND => Err(ClientError::NotFound(text)),
                StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                    Err(ClientError::Validation(text))
                }
                _ => Err(ClientError::Internal(text)),
            };
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl OrderSource for HttpClient {
    async fn list_orders(&self) -> ClientResult<Vec<Order>> {
        self.get("/orders").await
    }

    async fn get_order(&self, order_id: &str) -> ClientResult<Order> {
        let url = self.order_url(order_id)?;
        self.send(self.client.get(url)).await
    }

    async fn update_status(&self, order_id: &str, patch: &StatusPatch) -> ClientResult<Order> {
        tracing::debug!(order_id, status = %patch.status, "PUT order status");
        let url = self.order_url(order_id)?;
        self.send(self.client.put(url).json(patch)).await
    }

    async fn create_order(&self, draft: &OrderDraft) -> ClientResult<Order> {
        tracing::debug!(store_id = %draft.store_id, files = draft.files.len(), "POST order");
        self.post("/orders", draft).await
    }
}

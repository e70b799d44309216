//! HTTP plumbing shared by the REST client.
//!
//! Wraps a `reqwest::Client` bound to the Girder API base URL, attaches the
//! session token to every request and turns error statuses into
//! [`ClientError::Api`] carrying the server's message.

use crate::client::ClientError;
use crate::model::GirderErrorResponse;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{error, trace};
use url::Url;

/// Header Girder reads the session token from.
pub const TOKEN_HEADER: &str = "Girder-Token";

/// Default request timeout, large enough for multi-gigabyte chunks.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1800);

pub type Query<'a> = [(&'a str, String)];

/// HTTP client wrapper with common request handling logic
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
    default_headers: HashMap<String, String>,
    token: Option<String>,
}

impl HttpClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;

        let mut default_headers = HashMap::new();
        default_headers.insert(
            "User-Agent".to_string(),
            format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        );

        Ok(Self {
            client,
            base_url,
            default_headers,
            token: None,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    pub async fn get<T>(&self, path: &str, query: &Query<'_>) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        self.execute_json(self.client.get(url).query(query)).await
    }

    /// GET with HTTP basic authentication, used for the password login.
    pub async fn get_with_basic_auth<T>(
        &self,
        path: &str,
        username: &str,
        password: &str,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        self.execute_json(self.client.get(url).basic_auth(username, Some(password)))
            .await
    }

    pub async fn post<T>(&self, path: &str, query: &Query<'_>) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        self.execute_json(self.client.post(url).query(query)).await
    }

    pub async fn put<T>(&self, path: &str, query: &Query<'_>) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        self.execute_json(self.client.put(url).query(query)).await
    }

    /// POST a raw body, as used for upload chunks.
    pub async fn post_bytes<T>(
        &self,
        path: &str,
        query: &Query<'_>,
        body: Vec<u8>,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        let request = self
            .client
            .post(url)
            .query(query)
            .header("Content-Type", "application/octet-stream")
            .body(body);
        self.execute_json(request).await
    }

    /// GET returning the raw response so the caller can stream the body.
    pub async fn download(&self, path: &str) -> Result<Response, ClientError> {
        let url = self.url(path)?;
        self.execute(self.client.get(url)).await
    }

    async fn execute(&self, mut request: RequestBuilder) -> Result<Response, ClientError> {
        if let Some(token) = &self.token {
            request = request.header(TOKEN_HEADER, token);
        }

        for (key, value) in &self.default_headers {
            request = request.header(key, value);
        }

        let response = request.send().await?;
        let status = response.status();
        trace!("{} {}", status, response.url());

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<GirderErrorResponse>(&body) {
            Ok(error_response) => error_response.message,
            Err(_) if body.is_empty() => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
            Err(_) => body,
        };
        error!("Request failed with status {}: {}", status, message);

        Err(ClientError::Api { status, message })
    }

    async fn execute_json<T>(&self, request: RequestBuilder) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let response = self.execute(request).await?;
        let response_text = response.text().await?;
        trace!("Raw response text for deserialization: {}", response_text);

        serde_json::from_str::<T>(&response_text).map_err(|e| {
            error!(
                "Failed to deserialize response: {}. Raw response: {}",
                e, response_text
            );
            ClientError::Json(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde_json::Value;

    fn client_for(server: &mockito::ServerGuard) -> HttpClient {
        let base = Url::parse(&format!("{}/api/v1/", server.url())).unwrap();
        HttpClient::new(base, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_token_header_is_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/user/me")
            .match_query(mockito::Matcher::Any)
            .match_header(TOKEN_HEADER, "t0k3n")
            .with_status(200)
            .with_body(r#"{"login": "alice"}"#)
            .create_async()
            .await;

        let mut http = client_for(&server);
        http.set_token("t0k3n".to_string());
        let user: Value = http.get("user/me", &[]).await.unwrap();

        assert_eq!(user["login"], "alice");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_carries_server_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/folder/missing")
            .match_query(mockito::Matcher::Any)
            .with_status(400)
            .with_body(r#"{"message": "Invalid folder id (missing).", "type": "validation"}"#)
            .create_async()
            .await;

        let http = client_for(&server);
        let result: Result<Value, ClientError> = http.get("folder/missing", &[]).await;

        match result {
            Err(ClientError::Api { status, message }) => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(message, "Invalid folder id (missing).");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/system/version")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let http = client_for(&server);
        let result: Result<Value, ClientError> = http.get("system/version", &[]).await;
        assert!(matches!(result, Err(ClientError::Json(_))));
    }
}

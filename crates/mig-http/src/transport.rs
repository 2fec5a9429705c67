//! Shared HTTP transport
//!
//! One `reqwest::Client` per environment, carrying the bearer token as a
//! default header. Every response is funnelled through [`HttpTransport::check`]
//! so the adapters only ever see [`ClientError`]:
//!
//! - non-2xx status: `ClientError { status: Some(code), message: body }`
//! - connect, timeout or decode failure: `ClientError { status: None, .. }`

use mig_core::{ClientError, EnvironmentConfig, MigrationError};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Base URL plus configured client for one environment
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Build the transport for one environment
    ///
    /// # Errors
    /// `Config` if the base URL or the token is malformed
    pub fn new(env: &EnvironmentConfig) -> Result<Self, MigrationError> {
        let base_url = Url::parse(&env.base_url)
            .map_err(|e| MigrationError::config(format!("invalid base_url {}: {e}", env.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(MigrationError::config(format!("base_url {} cannot hold paths", env.base_url)));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = env.token() {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| MigrationError::config(format!("invalid bearer token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(env.timeout())
            .build()
            .map_err(|e| MigrationError::config(format!("cannot build http client: {e}")))?;

        Ok(Self { client, base_url })
    }

    /// Base URL requests are resolved against
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a route plus trailing segments against the base URL
    ///
    /// `route` is a static path such as `agents/apps` and is split on `/`.
    /// Each of `segments` (keys, ids, actions) becomes exactly one path
    /// segment, so a `/` inside a key is percent-encoded.
    #[must_use]
    pub fn url<'a>(&self, route: &str, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(route.split('/').filter(|s| !s.is_empty()));
            path.extend(segments);
        }
        url
    }

    /// Start a request
    #[inline]
    #[must_use]
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Send a request and decode its JSON body
    ///
    /// # Errors
    /// See the module docs
    pub async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = Self::check(Self::send(request).await?).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::transport(format!("invalid response body: {e}")))
    }

    /// Send a request with a JSON body and decode the JSON reply
    ///
    /// # Errors
    /// See the module docs
    pub async fn send_json<B, T>(&self, method: Method, url: Url, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.json(self.request(method, url).json(body)).await
    }

    /// Send a request and discard the body
    ///
    /// # Errors
    /// See the module docs
    pub async fn empty(&self, request: RequestBuilder) -> Result<(), ClientError> {
        Self::check(Self::send(request).await?).await.map(|_| ())
    }

    async fn send(request: RequestBuilder) -> Result<Response, ClientError> {
        request.send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::transport(format!("request timed out: {e}"))
            } else {
                ClientError::transport(e.to_string())
            }
        })
    }

    /// Turn a non-2xx response into a status-bearing error
    ///
    /// # Errors
    /// `ClientError` carrying the status and the response body
    pub async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().clone();
        let body = response.text().await.unwrap_or_default();
        tracing::debug!("{} {} -> {}", url, status, body);
        let message = if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("request failed").to_string()
        } else {
            body
        };
        Err(ClientError::status(status.as_u16(), message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base_url: &str) -> HttpTransport {
        HttpTransport::new(&EnvironmentConfig {
            base_url: base_url.to_string(),
            ..EnvironmentConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn url_appends_segments_to_base_path() {
        let t = transport("http://portal.dev/api/");
        assert_eq!(
            t.url("agents/apps", ["bot", "import"]).as_str(),
            "http://portal.dev/api/agents/apps/bot/import"
        );
    }

    #[test]
    fn url_encodes_each_segment() {
        let t = transport("http://portal.dev/api");
        assert_eq!(t.url("agents/tools", ["a b"]).as_str(), "http://portal.dev/api/agents/tools/a%20b");
    }

    #[test]
    fn url_keeps_identifiers_as_single_segments() {
        let t = transport("http://portal.dev/api");
        assert_eq!(t.url("agents/tools", ["a/b"]).as_str(), "http://portal.dev/api/agents/tools/a%2Fb");
        assert_eq!(
            t.url("agents/apps", ["bot", "deployments", "../d1"]).as_str(),
            "http://portal.dev/api/agents/apps/bot/deployments/..%2Fd1"
        );
    }

    #[test]
    fn rejects_malformed_base_url() {
        let env = EnvironmentConfig {
            base_url: "not a url".to_string(),
            ..EnvironmentConfig::default()
        };
        assert!(matches!(HttpTransport::new(&env), Err(MigrationError::Config(_))));

        let env = EnvironmentConfig {
            base_url: "mailto:ops@portal.dev".to_string(),
            ..EnvironmentConfig::default()
        };
        assert!(HttpTransport::new(&env).is_err());
    }
}

use std::time::Duration;

use bytes::Bytes;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};

use crate::config::ServerConfig;
use crate::error::RelayError;

use super::UpstreamResponse;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

fn build_reqwest_client(
    pool_max_idle_per_host: usize,
    pool_idle_timeout: Option<Duration>,
    timeout: Duration,
    use_env_proxy: bool,
) -> Result<reqwest::Client, RelayError> {
    let mut builder = reqwest::Client::builder()
        .pool_max_idle_per_host(pool_max_idle_per_host)
        .pool_idle_timeout(pool_idle_timeout)
        .tcp_nodelay(true)
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(reqwest::redirect::Policy::none())
        .timeout(timeout);

    if !use_env_proxy {
        builder = builder.no_proxy();
    }

    builder
        .build()
        .map_err(|err| RelayError::Transport(format!("Failed to build HTTP client: {err}")))
}

/// HTTP client for upstream LLM endpoints.
///
/// Cheap to share: the inner reqwest client is reference counted and pools
/// connections per host. No request state lives here.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with connection pooling and timeouts from the given server config.
    #[must_use]
    pub fn new(config: &ServerConfig) -> Self {
        let pool_idle_timeout = if config.http_pool_idle_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(config.http_pool_idle_timeout_secs))
        };

        let client = match build_reqwest_client(
            config.http_pool_max_idle_per_host.max(1),
            pool_idle_timeout,
            Duration::from_secs(config.timeout),
            config.http_use_env_proxy,
        ) {
            Ok(client) => client,
            Err(err) => {
                tracing::error!(error = %err, "failed to build configured reqwest client, falling back to default client");
                reqwest::Client::new()
            }
        };
        Self { client }
    }

    /// POST a JSON body, optionally with a bearer key.
    ///
    /// The reply is returned whatever its status; callers decide what a
    /// non-2xx means.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidRequest`] for a malformed endpoint URL and
    /// [`RelayError::Transport`] when the exchange fails.
    pub async fn post_json(
        &self,
        endpoint: &str,
        api_key: Option<&str>,
        body: Bytes,
    ) -> Result<UpstreamResponse, RelayError> {
        let url = parse_endpoint(endpoint)?;
        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json, text/event-stream")
            .body(body);
        if let Some(key) = api_key.filter(|key| !key.is_empty()) {
            request = request.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        let response = request.send().await.map_err(|err| {
            tracing::warn!(endpoint, error = %err, "upstream request failed");
            RelayError::Transport(format!("Upstream request failed: {err}"))
        })?;
        tracing::debug!(
            endpoint,
            status = response.status().as_u16(),
            "upstream responded"
        );
        Ok(UpstreamResponse::from_reqwest(response))
    }
}

fn parse_endpoint(endpoint: &str) -> Result<url::Url, RelayError> {
    let url = url::Url::parse(endpoint)
        .map_err(|err| RelayError::InvalidRequest(format!("Invalid endpoint URL '{endpoint}': {err}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(RelayError::InvalidRequest(format!(
            "Invalid endpoint URL '{endpoint}': unsupported scheme '{other}'"
        ))),
    }
}

//! Shared HTTP client built from a [`SessionConfig`].

use std::sync::Arc;

use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, COOKIE, HeaderMap, HeaderValue, ORIGIN, RANGE,
    REFERER,
};
use reqwest::{Client, Proxy, RequestBuilder, Response};
use tracing::{debug, instrument};
use url::Url;

use super::{SessionConfig, SessionError};

/// Thin wrapper over `reqwest::Client` carrying the run's immutable configuration.
///
/// Cloning is cheap: the client and the configuration are shared.
#[derive(Debug, Clone)]
pub struct SessionClient {
    client: Client,
    config: Arc<SessionConfig>,
    cookie_header: Option<HeaderValue>,
}

impl SessionClient {
    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the proxy or cookie is invalid or the client
    /// cannot be constructed.
    #[instrument(level = "debug", skip(config), fields(profile = %config.profile()))]
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        let cookie_header = config
            .auth_cookie()
            .map(|cookie| {
                let mut value =
                    HeaderValue::from_str(cookie).map_err(|_| SessionError::InvalidCookie)?;
                value.set_sensitive(true);
                Ok::<_, SessionError>(value)
            })
            .transpose()?;

        let mut default_headers = HeaderMap::new();
        if let Ok(language) = HeaderValue::from_str(config.accept_language()) {
            default_headers.insert(ACCEPT_LANGUAGE, language);
        }
        default_headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let mut builder = Client::builder()
            .user_agent(config.profile().user_agent())
            .default_headers(default_headers)
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.request_timeout())
            .cookie_store(true)
            .gzip(true);

        if let Some(proxy) = config.proxy() {
            let resolved = Proxy::all(proxy).map_err(|source| SessionError::InvalidProxy {
                proxy: proxy.to_string(),
                source,
            })?;
            builder = builder.proxy(resolved);
        }

        let client = builder
            .build()
            .map_err(|source| SessionError::Build { source })?;

        debug!(proxy = config.proxy().is_some(), "session client ready");

        Ok(Self {
            client,
            config: Arc::new(config),
            cookie_header,
        })
    }

    /// The configuration this client was built from.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Fetches an HTML page as text, sending the auth cookie and a same-site referer.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] on network failure, timeout, or a non-2xx status.
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub async fn fetch_page(&self, url: &str) -> Result<String, SessionError> {
        let mut request = self
            .client
            .get(url)
            .timeout(self.config.request_timeout())
            .header(ACCEPT, self.config.profile().page_accept());
        if let Some(referer) = origin_of(url) {
            request = request.header(REFERER, format!("{referer}/"));
        }
        if let Some(cookie) = &self.cookie_header {
            request = request.header(COOKIE, cookie.clone());
        }
        read_text(url, request).await
    }

    /// Fetches a JSON document as raw text from a third-party API.
    ///
    /// `origin` is sent as `Origin` and `Referer` when provided. The auth cookie is not
    /// forwarded to third parties.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] on network failure, timeout, or a non-2xx status.
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub async fn fetch_json_text(
        &self,
        url: &str,
        origin: Option<&str>,
    ) -> Result<String, SessionError> {
        let mut request = self
            .client
            .get(url)
            .timeout(self.config.request_timeout())
            .header(ACCEPT, "application/json");
        if let Some(origin) = origin {
            let origin = origin.trim_end_matches('/');
            request = request
                .header(ORIGIN, origin)
                .header(REFERER, format!("{origin}/"));
        }
        read_text(url, request).await
    }

    /// Starts a media transfer request, optionally resuming at `range_start`.
    ///
    /// The status is not checked here; the transfer engine interprets 200/206/416.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the request cannot be sent.
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub async fn start_transfer(
        &self,
        url: &str,
        range_start: Option<u64>,
    ) -> Result<Response, SessionError> {
        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, self.config.profile().media_accept());
        if let Some(start) = range_start {
            request = request.header(RANGE, format!("bytes={start}-"));
        }
        request
            .send()
            .await
            .map_err(|source| SessionError::from_reqwest(url, source))
    }
}

async fn read_text(url: &str, request: RequestBuilder) -> Result<String, SessionError> {
    let response = request
        .send()
        .await
        .map_err(|source| SessionError::from_reqwest(url, source))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SessionError::http_status(url, status.as_u16()));
    }

    response
        .text()
        .await
        .map_err(|source| SessionError::from_reqwest(url, source))
}

fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let origin = parsed.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

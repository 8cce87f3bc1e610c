//! Share page and metadata document fetched once per resolve.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::session::SessionClient;
use crate::target::{AssetId, ShareLink};

use super::ResolverEndpoints;
use super::markers;

/// Post metadata returned by the metadata API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PostMetadata {
    /// Identifier used by the proxy endpoints.
    #[serde(default)]
    pub post_id: Option<String>,
    /// Display title.
    #[serde(default)]
    pub title: Option<String>,
    /// Nested post details.
    #[serde(default)]
    pub post_info: Option<PostInfo>,
}

/// Nested post details carried by [`PostMetadata`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PostInfo {
    /// Post title.
    #[serde(default)]
    pub title: Option<String>,
    /// Post description.
    #[serde(default)]
    pub description: Option<String>,
    /// Generation prompt.
    #[serde(default)]
    pub prompt: Option<String>,
}

impl PostMetadata {
    /// Title by priority: `title`, then `post_info` title, description, prompt.
    #[must_use]
    pub fn best_title(&self) -> Option<String> {
        let info = self.post_info.as_ref();
        [
            self.title.as_deref(),
            info.and_then(|i| i.title.as_deref()),
            info.and_then(|i| i.description.as_deref()),
            info.and_then(|i| i.prompt.as_deref()),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
    }
}

/// Raw bodies gathered for one share-link.
///
/// Either body may be missing; the failure reason is kept for diagnostics.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    page_url: String,
    html: Result<String, String>,
    metadata_body: Option<Result<String, String>>,
    metadata: Option<PostMetadata>,
}

impl PageSnapshot {
    /// Fetches the share page and, when configured, the metadata document concurrently.
    #[tracing::instrument(skip_all, fields(link = %link))]
    pub async fn fetch(
        link: &ShareLink,
        session: &SessionClient,
        endpoints: &ResolverEndpoints,
    ) -> Self {
        let page_url = endpoints.page_url(link);
        let metadata_url = endpoints.metadata_url(link);

        let page_request = session.fetch_page(&page_url);
        let metadata_request = async {
            match &metadata_url {
                Some(url) => Some(
                    session
                        .fetch_json_text(url, endpoints.metadata_origin())
                        .await,
                ),
                None => None,
            }
        };
        let (html, metadata_body) = tokio::join!(page_request, metadata_request);

        let html = html.map_err(|err| {
            warn!(url = %page_url, error = %err, "share page unavailable");
            err.to_string()
        });
        let metadata_body = metadata_body.map(|result| {
            result.map_err(|err| {
                warn!(error = %err, "metadata document unavailable");
                err.to_string()
            })
        });

        Self::assemble(page_url, html, metadata_body)
    }

    /// Builds a snapshot from bodies already in hand.
    #[must_use]
    pub fn from_bodies(
        page_url: impl Into<String>,
        html: Option<String>,
        metadata_body: Option<String>,
    ) -> Self {
        Self::assemble(
            page_url.into(),
            html.ok_or_else(|| "page not fetched".to_string()),
            metadata_body.map(Ok),
        )
    }

    fn assemble(
        page_url: String,
        html: Result<String, String>,
        metadata_body: Option<Result<String, String>>,
    ) -> Self {
        let metadata = match &metadata_body {
            Some(Ok(body)) => match serde_json::from_str::<PostMetadata>(body) {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    debug!(error = %err, "metadata body is not the expected JSON shape");
                    None
                }
            },
            _ => None,
        };
        Self {
            page_url,
            html,
            metadata_body,
            metadata,
        }
    }

    /// URL the page was fetched from.
    #[must_use]
    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    /// Raw HTML, if the page was fetched.
    #[must_use]
    pub fn html(&self) -> Option<&str> {
        self.html.as_deref().ok()
    }

    /// Parsed metadata, if available.
    #[must_use]
    pub fn metadata(&self) -> Option<&PostMetadata> {
        self.metadata.as_ref()
    }

    /// Every fetched body: the HTML first, then the metadata document.
    pub fn bodies(&self) -> impl Iterator<Item = &str> {
        let metadata = match &self.metadata_body {
            Some(Ok(body)) => Some(body.as_str()),
            _ => None,
        };
        self.html().into_iter().chain(metadata)
    }

    /// True when at least one body was fetched.
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.bodies().next().is_some()
    }

    /// Runs `extract` over each body in order and returns the first hit.
    pub fn find(&self, extract: impl Fn(&str) -> Option<String>) -> Option<String> {
        self.bodies().find_map(extract)
    }

    /// Asset id reported by the metadata document.
    #[must_use]
    pub fn metadata_asset_id(&self) -> Option<AssetId> {
        self.metadata
            .as_ref()
            .and_then(|meta| meta.post_id.clone())
            .and_then(AssetId::new)
    }

    /// Title by priority: metadata fields, then page markers.
    #[must_use]
    pub fn title(&self) -> Option<String> {
        self.metadata
            .as_ref()
            .and_then(PostMetadata::best_title)
            .or_else(|| self.html().and_then(markers::page_title))
    }

    /// Why no body is available, for strategy failure messages.
    #[must_use]
    pub fn unavailable_reason(&self) -> String {
        let mut reasons = Vec::new();
        if let Err(reason) = &self.html {
            reasons.push(format!("page: {reason}"));
        }
        match &self.metadata_body {
            Some(Err(reason)) => reasons.push(format!("metadata: {reason}")),
            None => reasons.push("metadata: not configured".to_string()),
            Some(Ok(_)) => {}
        }
        reasons.join("; ")
    }
}

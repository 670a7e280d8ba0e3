//! Remote encyclopedia page retrieval.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("page not found")]
    NotFound,

    #[error("{status} for url: {url}")]
    Status { status: StatusCode, url: String },

    #[error("{0}")]
    Transport(String),
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::NotFound => "not_found",
            FetchError::Status { .. } => "status",
            FetchError::Transport(_) => "transport",
        }
    }
}

/// Source of raw article HTML, keyed by page title.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, title: &str) -> Result<String, FetchError>;
}

/// Build the article URL for a title: `{base}/wiki/{percent-encoded title}`.
/// Slashes stay literal, since titles like `AC/DC` are addressed that way.
pub fn page_url(base_url: &str, title: &str) -> String {
    let encoded = title
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/wiki/{}", base_url.trim_end_matches('/'), encoded)
}

/// Fetches articles from Wikipedia over HTTPS.
pub struct WikipediaClient {
    client: Client,
    base_url: String,
}

impl WikipediaClient {
    pub fn new(
        base_url: &str,
        user_agent: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, FetchError> {
        let mut builder = Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PageSource for WikipediaClient {
    async fn fetch_page(&self, title: &str) -> Result<String, FetchError> {
        let url = page_url(&self.base_url, title);
        tracing::debug!(%url, "Fetching encyclopedia page");

        let response = self.client.get(&url).send().await.map_err(|e| {
            tracing::error!("Failed to send GET request to {}: {}", url, e);
            FetchError::Transport(e.to_string())
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                url: response.url().to_string(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}

pub mod mock {
    //! In-memory page source for testing.

    use super::{FetchError, PageSource};
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    pub enum MockPage {
        Html(String),
        Status(u16),
        Transport(String),
    }

    /// Serves canned pages by title and records every requested title.
    /// Unknown titles answer 404.
    #[derive(Default)]
    pub struct MockPageSource {
        pages: HashMap<String, MockPage>,
        requests: Mutex<Vec<String>>,
    }

    impl MockPageSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(mut self, title: &str, html: &str) -> Self {
            self.pages
                .insert(title.to_string(), MockPage::Html(html.to_string()));
            self
        }

        pub fn with_response(mut self, title: &str, page: MockPage) -> Self {
            self.pages.insert(title.to_string(), page);
            self
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().map(|r| r.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl PageSource for MockPageSource {
        async fn fetch_page(&self, title: &str) -> Result<String, FetchError> {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(title.to_string());
            }

            match self.pages.get(title) {
                Some(MockPage::Html(html)) => Ok(html.clone()),
                Some(MockPage::Status(404)) | None => Err(FetchError::NotFound),
                Some(MockPage::Status(code)) => Err(FetchError::Status {
                    status: StatusCode::from_u16(*code)
                        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                    url: super::page_url("https://wikipedia.org", title),
                }),
                Some(MockPage::Transport(message)) => Err(FetchError::Transport(message.clone())),
            }
        }
    }
}

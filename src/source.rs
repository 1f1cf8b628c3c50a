use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use tracing::info;

/// One published article. Only the fields the tally needs are decoded.
#[derive(Debug, Clone, Deserialize)]
pub struct Article {
    #[serde(rename = "id")]
    pub identity: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub rendered_body: String,
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Option::<String>::deserialize(d).map(Option::unwrap_or_default)
}

/// Decode one page payload (a JSON array of articles).
pub fn decode_page(payload: &str) -> serde_json::Result<Vec<Article>> {
    serde_json::from_str(payload)
}

/// Fetches the raw payload of one page by zero-based index.
#[async_trait(?Send)]
pub trait PageSource {
    async fn fetch_page(&self, index: usize) -> Result<String>;
}

/// Paginated article API reached over HTTP.
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
    per_page: usize,
    access_token: Option<String>,
}

impl HttpSource {
    pub fn new(base_url: &str, per_page: usize, access_token: Option<String>) -> Result<Self> {
        reqwest::Url::parse(base_url).with_context(|| format!("Invalid source URL {}", base_url))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.to_string(),
            per_page,
            access_token,
        })
    }

    /// The API numbers pages from 1.
    fn page_query(&self, index: usize) -> [(&'static str, String); 2] {
        [
            ("page", (index + 1).to_string()),
            ("per_page", self.per_page.to_string()),
        ]
    }
}

#[async_trait(?Send)]
impl PageSource for HttpSource {
    async fn fetch_page(&self, index: usize) -> Result<String> {
        let mut request = self.client.get(&self.base_url).query(&self.page_query(index));
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        info!("Fetching page {} from {}", index + 1, self.base_url);
        let body = request
            .send()
            .await
            .with_context(|| format!("Request for page {} failed", index + 1))?
            .error_for_status()
            .with_context(|| format!("Source rejected page {}", index + 1))?
            .text()
            .await
            .with_context(|| format!("Failed to read body of page {}", index + 1))?;
        Ok(body)
    }
}

//! Feedbin-shaped HTTP feed client.
//!
//! Speaks the two endpoints the index needs:
//! `GET /v2/entries.json?starred=true&per_page=P&page=N&order=desc`
//! and `GET /v2/starred_entries.json` (array of starred entry ids,
//! whose length is the total).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

use crate::config::FeedConfig;
use crate::error::{AppError, Result};
use crate::feed::StarredFeed;
use crate::models::Article;

/// HTTP client for the remote starred feed.
pub struct FeedbinClient {
    http: Client,
    base_url: Url,
    username: String,
    password: String,
    page_size: u32,
}

impl FeedbinClient {
    /// Create a configured client.
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: Url::parse(&config.base_url)?,
            username: config.username.clone(),
            password: config.password.clone(),
            page_size: config.page_size,
        })
    }

    /// The fixed page size requests are issued with.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }
}

#[async_trait]
impl StarredFeed for FeedbinClient {
    async fn fetch_page(&self, page: u32) -> Result<Vec<Article>> {
        let url = self.base_url.join("v2/entries.json")?;
        let response = self
            .http
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .query(&[
                ("starred", "true".to_string()),
                ("per_page", self.page_size.to_string()),
                ("page", page.to_string()),
                ("order", "desc".to_string()),
            ])
            .send()
            .await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::Throttled { page });
        }
        if !response.status().is_success() {
            return Err(AppError::fetch(page, response.status()));
        }

        Ok(response.json().await?)
    }

    async fn total_starred(&self) -> Result<u64> {
        let url = self.base_url.join("v2/starred_entries.json")?;
        let response = self
            .http
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?
            .error_for_status()?;

        let ids: Vec<u64> = response.json().await?;
        Ok(ids.len() as u64)
    }
}

use reqwest::{Client, Url};
use serde_json::Value;

use toolwire_core::config::DatasetConfig;
use toolwire_core::Error;

/// Reads result items from the dataset HTTP API.
#[derive(Debug, Clone)]
pub struct DatasetClient {
    http: Client,
    config: DatasetConfig,
}

impl DatasetClient {
    pub fn new(config: DatasetConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(http: Client, config: DatasetConfig) -> Self {
        Self { http, config }
    }

    /// Fetch every item of a dataset, page by page.
    ///
    /// Paging stops at the first page shorter than the page size.
    ///
    /// # Errors
    ///
    /// [`Error::HttpStatus`] on a non-success status and
    /// [`Error::MalformedReply`] if a page is not a JSON array.
    pub async fn items(&self, dataset_id: &str) -> Result<Vec<Value>, Error> {
        let mut items = Vec::new();
        let mut offset = 0;

        loop {
            let page = self.page(dataset_id, offset).await?;
            let count = page.len();
            items.extend(page);
            tracing::debug!(dataset_id, offset, count, "fetched dataset page");

            if count < self.config.page_size {
                break;
            }
            offset += count;
        }

        tracing::info!(dataset_id, total = items.len(), "dataset fetched");
        Ok(items)
    }

    /// `{api_url}/datasets/{id}/items`, with `id` escaped as one path segment.
    fn items_url(&self, dataset_id: &str) -> Result<Url, Error> {
        let invalid = || Error::Config(format!("invalid dataset api url {}", self.config.api_url));

        let mut url = Url::parse(&self.config.api_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .extend(["datasets", dataset_id, "items"]);
        Ok(url)
    }

    async fn page(&self, dataset_id: &str, offset: usize) -> Result<Vec<Value>, Error> {
        let resp = self
            .http
            .get(self.items_url(dataset_id)?)
            .bearer_auth(&self.config.token)
            .query(&[
                ("clean", "true".to_string()),
                ("format", "json".to_string()),
                ("limit", self.config.page_size.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        match resp
            .json::<Value>()
            .await
            .map_err(|e| Error::MalformedReply(e.to_string()))?
        {
            Value::Array(items) => Ok(items),
            other => Err(Error::MalformedReply(format!(
                "dataset page is not an array: {other}"
            ))),
        }
    }
}

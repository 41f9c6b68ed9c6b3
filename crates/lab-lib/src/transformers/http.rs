//! HTTP(S) source transformer

use super::{materialize, AddOptions, Transformer};
use crate::error::{Error, Result};
use crate::models::ContentId;
use crate::peer::Publisher;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// Downloads object sources over HTTP
#[derive(Debug, Clone)]
pub struct HttpTransformer {
    client: reqwest::Client,
}

impl HttpTransformer {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transformer for HttpTransformer {
    async fn transform(
        &self,
        publisher: &dyn Publisher,
        source: &str,
        opts: &AddOptions,
        cancel: &CancellationToken,
    ) -> Result<ContentId> {
        let url = Url::parse(source)
            .map_err(|e| Error::Transform(format!("invalid source url {:?}: {}", source, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Transform(format!(
                "unsupported source scheme {:?}",
                url.scheme()
            )));
        }

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::Transform(format!("failed to fetch {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::Transform(format!(
                "fetching {} returned {}",
                url,
                response.status()
            )));
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| Error::Transform(format!("failed to read body of {}: {}", url, e)))?;

        debug!(url = %url, bytes = data.len(), "Downloaded object source");
        materialize(publisher, opts, data.to_vec(), cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::LocalPublisher;

    #[tokio::test]
    async fn test_http_transform_downloads_and_publishes() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/objects/data")
            .with_status(200)
            .with_body("remote payload")
            .create_async()
            .await;

        let publisher = LocalPublisher::new("QmSeeder", vec![]);
        let transformer = HttpTransformer::new(reqwest::Client::new());
        let cid = transformer
            .transform(
                &publisher,
                &format!("{}/objects/data", server.url()),
                &AddOptions::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            cid,
            AddOptions::default()
                .resolve()
                .unwrap()
                .content_id(b"remote payload")
        );
        assert!(publisher.get(&cid).is_some());
    }

    #[tokio::test]
    async fn test_http_error_status_is_transform_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let publisher = LocalPublisher::new("QmSeeder", vec![]);
        let result = HttpTransformer::new(reqwest::Client::new())
            .transform(
                &publisher,
                &format!("{}/missing", server.url()),
                &AddOptions::default(),
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(result, Err(Error::Transform(_))));
    }

    #[tokio::test]
    async fn test_rejects_non_http_sources() {
        let publisher = LocalPublisher::new("QmSeeder", vec![]);
        let result = HttpTransformer::new(reqwest::Client::new())
            .transform(
                &publisher,
                "ftp://example.com/data",
                &AddOptions::default(),
                &CancellationToken::new(),
            )
            .await;
        assert!(matches!(result, Err(Error::Transform(_))));
    }
}

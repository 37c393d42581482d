use std::time::Duration;

use async_trait::async_trait;

use imgbot_core::{errors::Error, ports::ImageFetcher, Result};

/// Downloads generated images over plain HTTP with a fixed per-download timeout.
#[derive(Clone, Debug)]
pub struct HttpImageFetcher {
    http: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("image http client error: {e}")))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::External(format!("image download error: {e}")))?;

        if !resp.status().is_success() {
            return Err(Error::External(format!(
                "image download failed: {} {url}",
                resp.status()
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::External(format!("image download error: {e}")))?;
        tracing::debug!(url, bytes = bytes.len(), "downloaded image");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn downloads_body_bytes() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/out/1.jpg")
            .with_status(200)
            .with_header("content-type", "image/jpeg")
            .with_body([0xffu8, 0xd8, 0xff, 0xe0])
            .create_async()
            .await;

        let fetcher = HttpImageFetcher::new(Duration::from_secs(5)).unwrap();
        let bytes = fetcher
            .fetch(&format!("{}/out/1.jpg", server.url()))
            .await
            .unwrap();
        assert_eq!(bytes, vec![0xff, 0xd8, 0xff, 0xe0]);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/out/gone.jpg")
            .with_status(404)
            .create_async()
            .await;

        let fetcher = HttpImageFetcher::new(Duration::from_secs(5)).unwrap();
        let err = fetcher
            .fetch(&format!("{}/out/gone.jpg", server.url()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }
}

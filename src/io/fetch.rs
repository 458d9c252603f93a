use crate::error::EnhanceError;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info};

/// Socket timeout for downloading input images.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Downloads input images over HTTP.
#[derive(Clone)]
pub struct ImageFetcher {
    client: reqwest::Client,
}

impl ImageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, EnhanceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EnhanceError::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Fetches the body of `url`. Anything but `200 OK` is a failure.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, EnhanceError> {
        info!("Downloading image from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| EnhanceError::network(url, e))?;

        if response.status() != StatusCode::OK {
            return Err(EnhanceError::HttpStatus {
                url: url.to_string(),
                status: response.status(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| EnhanceError::network(url, e))?;
        debug!("Downloaded {} bytes from {}", body.len(), url);
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cat.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .mount(&server)
            .await;

        let fetcher = ImageFetcher::new(DEFAULT_FETCH_TIMEOUT).unwrap();
        let body = fetcher
            .fetch(&format!("{}/cat.png", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_ok_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let fetcher = ImageFetcher::new(DEFAULT_FETCH_TIMEOUT).unwrap();
        let err = fetcher
            .fetch(&format!("{}/empty", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, EnhanceError::HttpStatus { status, .. } if status == 204));
    }

    #[tokio::test]
    async fn test_fetch_reports_unreachable_host() {
        let fetcher = ImageFetcher::new(Duration::from_secs(2)).unwrap();
        let err = fetcher.fetch("http://127.0.0.1:9/image.jpg").await.unwrap_err();
        assert!(matches!(err, EnhanceError::Network { .. }));
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let fetcher = ImageFetcher::new(Duration::from_millis(50)).unwrap();
        let err = fetcher.fetch(&server.uri()).await.unwrap_err();
        assert!(matches!(err, EnhanceError::Network { .. }));
    }
}

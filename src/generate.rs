//! Remote text-to-image generation client
//!
//! Thin boundary around a hosted generation endpoint: a GET request
//! parameterized by a URL-encoded prompt, output dimensions, a random seed,
//! and a video flag. The service is best-effort and unauthenticated; its
//! content is opaque to this crate.

use crate::{
    config::REMOTE_TIMEOUT_SECS,
    error::{Result, StudioError},
};
use async_trait::async_trait;
use log::{debug, info, warn};
use rand::Rng;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default hosted generation endpoint
pub const DEFAULT_ENDPOINT: &str = "https://image.pollinations.ai/prompt";

/// Default output dimensions for generated images
const DEFAULT_DIMENSIONS: (u32, u32) = (1024, 1024);

/// Parameters for one generation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Free-text prompt describing the desired image
    pub prompt: String,

    /// Output width in pixels
    pub width: u32,

    /// Output height in pixels
    pub height: u32,

    /// Seed forwarded to the remote model; same seed, same prompt should
    /// reproduce the same image insofar as the vendor is deterministic
    pub seed: u32,

    /// Request an animated clip instead of a still image
    pub video: bool,
}

impl GenerationRequest {
    /// Create a request for a still image with default dimensions and a
    /// random seed
    pub fn new<S: Into<String>>(prompt: S) -> Self {
        let (width, height) = DEFAULT_DIMENSIONS;
        Self {
            prompt: prompt.into(),
            width,
            height,
            seed: rand::thread_rng().gen_range(0..1_000_000),
            video: false,
        }
    }

    /// Request an animated clip instead of a still image
    #[must_use]
    pub fn with_video(mut self) -> Self {
        self.video = true;
        self
    }

    /// Use a fixed seed
    #[must_use]
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }
}

/// Generation collaborators implement this narrow interface so the
/// network-backed client can be swapped for a deterministic fake in tests
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate media for the request, returning encoded image bytes
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<u8>>;
}

/// HTTP client for the hosted generation endpoint
pub struct RemoteGenerationClient {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl RemoteGenerationClient {
    /// Create a client against the default endpoint
    pub fn new() -> Result<Self> {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    /// Create a client against a custom endpoint (primarily for testing
    /// against a local stub server)
    pub fn with_endpoint(endpoint: &str) -> Result<Self> {
        let timeout = Duration::from_secs(REMOTE_TIMEOUT_SECS);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StudioError::network(format!("failed to create HTTP client: {e}")))?;

        let endpoint = Url::parse(endpoint)
            .map_err(|e| StudioError::network(format!("invalid generation endpoint: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    /// Build the request URL: prompt as a percent-encoded path segment,
    /// everything else as query parameters
    fn build_url(&self, request: &GenerationRequest) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| StudioError::network("generation endpoint cannot take a path"))?
            .push(&request.prompt);

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("width", &request.width.to_string())
                .append_pair("height", &request.height.to_string())
                .append_pair("seed", &request.seed.to_string())
                .append_pair("nologo", "true");
            if request.video {
                query.append_pair("video", "true");
            }
        }

        Ok(url)
    }

    async fn fetch(&self, url: Url) -> std::result::Result<Vec<u8>, reqwest::Error> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ImageGenerator for RemoteGenerationClient {
    /// Fetch generated media, retrying once after a timeout
    ///
    /// The remote call is the only network-dependent, possibly-transient
    /// failure in the system, so it gets a single bounded retry; all other
    /// errors are terminal for the request.
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<u8>> {
        let url = self.build_url(request)?;
        debug!("generation request: {url}");

        match self.fetch(url.clone()).await {
            Ok(bytes) => {
                info!("generated {} bytes for seed {}", bytes.len(), request.seed);
                Ok(bytes)
            },
            Err(e) if e.is_timeout() => {
                warn!("generation timed out, retrying once");
                self.fetch(url).await.map_err(|e| {
                    if e.is_timeout() {
                        StudioError::timeout("generation", self.timeout.as_secs())
                    } else {
                        StudioError::network(format!("generation request failed: {e}"))
                    }
                })
            },
            Err(e) => Err(StudioError::network(format!(
                "generation request failed: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = GenerationRequest::new("a portrait");
        assert_eq!(request.width, 1024);
        assert_eq!(request.height, 1024);
        assert!(!request.video);
        assert!(request.seed < 1_000_000);
    }

    #[test]
    fn test_build_url_encodes_prompt() {
        let client = RemoteGenerationClient::new().unwrap();
        let request = GenerationRequest::new("a cat in Tokyo, 8k photo").with_seed(42);

        let url = client.build_url(&request).unwrap();
        let s = url.as_str();

        assert!(s.starts_with("https://image.pollinations.ai/prompt/"));
        assert!(!s.contains(' '), "spaces must be percent-encoded: {s}");
        assert!(s.contains("width=1024"));
        assert!(s.contains("height=1024"));
        assert!(s.contains("seed=42"));
        assert!(s.contains("nologo=true"));
        assert!(!s.contains("video"));
    }

    #[test]
    fn test_build_url_video_flag() {
        let client = RemoteGenerationClient::new().unwrap();
        let request = GenerationRequest::new("dancing robot").with_video();

        let url = client.build_url(&request).unwrap();
        assert!(url.as_str().contains("video=true"));
    }

    #[test]
    fn test_rejects_invalid_endpoint() {
        assert!(RemoteGenerationClient::with_endpoint("not a url").is_err());
    }

    #[tokio::test]
    async fn test_fake_generator_via_trait() {
        struct FakeGenerator;

        #[async_trait]
        impl ImageGenerator for FakeGenerator {
            async fn generate(&self, request: &GenerationRequest) -> Result<Vec<u8>> {
                Ok(request.prompt.as_bytes().to_vec())
            }
        }

        let generator: Box<dyn ImageGenerator> = Box::new(FakeGenerator);
        let bytes = generator
            .generate(&GenerationRequest::new("hello"))
            .await
            .unwrap();
        assert_eq!(bytes, b"hello");
    }
}

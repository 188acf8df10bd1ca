use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;

use crate::config::UploadConfig;
use crate::errors::{VizCueError, VizCueResult};

/// Somewhere a screenshot can be put so the model can fetch it by URL.
#[async_trait]
pub trait ImageStore: Send + Sync {
    fn name(&self) -> &str;
    /// Store the PNG and return a URL the model can read.
    async fn store(&self, png: &[u8]) -> VizCueResult<String>;
}

fn object_name() -> String {
    format!("screenshot_{}.png", uuid::Uuid::new_v4())
}

/// `PUT <endpoint>/<name>.png`, then served from `<public_base>/<name>.png`.
pub struct HttpUploadStore {
    endpoint: String,
    public_base: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpUploadStore {
    pub fn new(
        endpoint: String,
        public_base: Option<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> VizCueResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let endpoint = endpoint.trim_end_matches('/').to_string();
        let public_base = public_base
            .map(|b| b.trim_end_matches('/').to_string())
            .unwrap_or_else(|| endpoint.clone());
        Ok(Self {
            endpoint,
            public_base,
            token,
            client,
        })
    }
}

#[async_trait]
impl ImageStore for HttpUploadStore {
    fn name(&self) -> &str {
        "http_upload"
    }

    async fn store(&self, png: &[u8]) -> VizCueResult<String> {
        let name = object_name();
        let mut request = self
            .client
            .put(format!("{}/{name}", self.endpoint))
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .body(png.to_vec());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| VizCueError::Upload(e.to_string()))?;
        if !response.status().is_success() {
            return Err(VizCueError::Upload(format!("upload rejected: {}", response.status())));
        }
        Ok(format!("{}/{name}", self.public_base))
    }
}

/// Writes into a local directory and hands out `file://` URLs, for model
/// servers running on the same machine.
pub struct LocalFileStore {
    dir: PathBuf,
}

impl LocalFileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl ImageStore for LocalFileStore {
    fn name(&self) -> &str {
        "local_file"
    }

    async fn store(&self, png: &[u8]) -> VizCueResult<String> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(object_name());
        tokio::fs::write(&path, png).await?;
        let path = tokio::fs::canonicalize(&path).await?;
        Ok(format!("file://{}", path.display()))
    }
}

pub fn data_url(png: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    )
}

/// Stores in the order they should be tried.
pub fn stores_from_config(config: &UploadConfig) -> VizCueResult<Vec<Arc<dyn ImageStore>>> {
    let mut stores: Vec<Arc<dyn ImageStore>> = Vec::new();
    if let Some(endpoint) = &config.endpoint {
        stores.push(Arc::new(HttpUploadStore::new(
            endpoint.clone(),
            config.public_base.clone(),
            config.token.clone(),
            Duration::from_secs(config.timeout_secs.max(1)),
        )?));
    }
    if let Some(dir) = &config.local_dir {
        stores.push(Arc::new(LocalFileStore::new(dir.clone())));
    }
    Ok(stores)
}

/// First store that succeeds wins; when all fail (or none exist) the image
/// goes inline as a data URL.
pub async fn resolve_image_reference(stores: &[Arc<dyn ImageStore>], png: &[u8]) -> VizCueResult<String> {
    if png.is_empty() {
        return Err(VizCueError::Upload("no image data to send".into()));
    }
    for store in stores {
        match store.store(png).await {
            Ok(url) => {
                tracing::info!(store = store.name(), url = %url, "image stored");
                return Ok(url);
            }
            Err(e) => {
                tracing::warn!(store = store.name(), error = %e, "image store failed, trying next");
            }
        }
    }
    tracing::info!(bytes = png.len(), "sending image inline");
    Ok(data_url(png))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Failing(AtomicUsize);

    #[async_trait]
    impl ImageStore for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        async fn store(&self, _png: &[u8]) -> VizCueResult<String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(VizCueError::Upload("bucket unavailable".into()))
        }
    }

    struct Fixed(&'static str);

    #[async_trait]
    impl ImageStore for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn store(&self, _png: &[u8]) -> VizCueResult<String> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn no_stores_means_inline_data_url() {
        let url = resolve_image_reference(&[], &[1, 2, 3]).await.unwrap();
        assert_eq!(url, "data:image/png;base64,AQID");
    }

    #[tokio::test]
    async fn failures_fall_through_in_order() {
        let failing = Arc::new(Failing(AtomicUsize::new(0)));
        let stores: Vec<Arc<dyn ImageStore>> = vec![
            failing.clone() as Arc<dyn ImageStore>,
            Arc::new(Fixed("https://cdn/a.png")),
            Arc::new(Fixed("https://cdn/b.png")),
        ];
        let url = resolve_image_reference(&stores, &[1]).await.unwrap();
        assert_eq!(url, "https://cdn/a.png");
        assert_eq!(failing.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn all_failing_degrades_to_inline() {
        let stores: Vec<Arc<dyn ImageStore>> = vec![Arc::new(Failing(AtomicUsize::new(0)))];
        let url = resolve_image_reference(&stores, &[9, 9]).await.unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn empty_image_is_an_error() {
        assert!(matches!(
            resolve_image_reference(&[], &[]).await,
            Err(VizCueError::Upload(_))
        ));
    }

    #[tokio::test]
    async fn local_store_writes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path().join("shots"));
        let url = store.store(b"png-bytes").await.unwrap();
        let path = url.strip_prefix("file://").unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"png-bytes");
    }

    #[test]
    fn config_decides_store_order() {
        let config = UploadConfig {
            endpoint: Some("https://upload.example/bucket/".into()),
            local_dir: Some(PathBuf::from("/tmp/vizcue")),
            ..UploadConfig::default()
        };
        let names: Vec<String> = stores_from_config(&config)
            .unwrap()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, ["http_upload", "local_file"]);
        assert!(stores_from_config(&UploadConfig::default()).unwrap().is_empty());
    }
}

//! Artwork loader for the command-line host.
//!
//! Resolves a source reference (file path, `file://`, `http(s)://` or
//! `data:` URI) to bytes and decodes them into an [`ArtworkImage`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mockup_core::{ArtworkImage, CanvasError, CanvasResult, ImageLoader};
use mockup_renderer::{is_data_uri, load_image_from_bytes, load_image_from_data_uri, RenderError};
use reqwest::Client;
use thiserror::Error;
use url::Url;

/// Errors that can occur while fetching artwork.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The source looks like a URL but uses a scheme we cannot fetch.
    #[error("unsupported artwork source scheme '{0}'")]
    UnsupportedScheme(String),
    /// A `file://` URL that does not map to a local path.
    #[error("invalid artwork URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed (connection, status, body).
    #[error("artwork request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Reading a local file failed.
    #[error("failed to read artwork file {path}: {source}")]
    Io {
        /// The resolved path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The bytes were not a decodable image.
    #[error(transparent)]
    Decode(#[from] RenderError),
}

impl From<LoadError> for CanvasError {
    fn from(err: LoadError) -> Self {
        CanvasError::ImageLoad(err.to_string())
    }
}

/// Where a source reference points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// Inline `data:` URI.
    DataUri,
    /// Remote `http`/`https` resource.
    Remote(Url),
    /// Local file.
    File(PathBuf),
}

/// Loads artwork from disk, the network or inline data URIs.
#[derive(Debug, Clone)]
pub struct SourceImageLoader {
    http: Client,
    base_dir: Option<PathBuf>,
}

impl SourceImageLoader {
    /// Create a loader. Relative paths that do not exist in the working
    /// directory are looked up in `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Http`] if the HTTP client fails to build.
    pub fn new(base_dir: Option<PathBuf>) -> Result<Self, LoadError> {
        let http = Client::builder()
            .user_agent(concat!("mockup-cli/", env!("CARGO_PKG_VERSION")))
            .no_proxy()
            .build()?;
        Ok(Self { http, base_dir })
    }

    /// Classify a source reference.
    ///
    /// # Errors
    ///
    /// Returns an error for URL schemes other than `http`, `https` and
    /// `file`.
    pub fn classify(source: &str) -> Result<SourceKind, LoadError> {
        if is_data_uri(source) {
            return Ok(SourceKind::DataUri);
        }
        match Url::parse(source) {
            Ok(url) => match url.scheme().to_owned().as_str() {
                "http" | "https" => Ok(SourceKind::Remote(url)),
                "file" => url
                    .to_file_path()
                    .map(SourceKind::File)
                    .map_err(|()| LoadError::InvalidUrl(source.to_string())),
                // A single-letter scheme is a Windows drive letter.
                scheme if scheme.len() == 1 => Ok(SourceKind::File(PathBuf::from(source))),
                scheme => Err(LoadError::UnsupportedScheme(scheme.to_string())),
            },
            Err(_) => Ok(SourceKind::File(PathBuf::from(source))),
        }
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() || path.exists() {
            return path.to_path_buf();
        }
        match &self.base_dir {
            Some(base) => base.join(path),
            None => path.to_path_buf(),
        }
    }

    /// Fetch and decode one source.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be fetched or decoded.
    pub async fn load_source(&self, source: &str) -> Result<ArtworkImage, LoadError> {
        match Self::classify(source)? {
            SourceKind::DataUri => Ok(load_image_from_data_uri(source)?),
            SourceKind::Remote(url) => {
                tracing::debug!(%url, "Fetching artwork");
                let response = self.http.get(url).send().await?.error_for_status()?;
                let bytes = response.bytes().await?;
                Ok(load_image_from_bytes(&bytes)?)
            }
            SourceKind::File(path) => {
                let path = self.resolve_path(&path);
                tracing::debug!(path = %path.display(), "Reading artwork");
                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(|source| LoadError::Io { path, source })?;
                Ok(load_image_from_bytes(&bytes)?)
            }
        }
    }
}

#[async_trait]
impl ImageLoader for SourceImageLoader {
    async fn load(&self, source: &str) -> CanvasResult<ArtworkImage> {
        Ok(self.load_source(source).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockup_core::{CanvasConfig, Rect, Scene};
    use mockup_renderer::{ExportFormat, SceneExporter};

    const RED_PNG_URI: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

    fn png_bytes(width: f32, height: f32) -> Vec<u8> {
        let scene =
            Scene::new(Rect::new(0.0, 0.0, width, height), CanvasConfig::default()).expect("scene");
        SceneExporter::new(mockup_renderer::ExportPreset::Low.into())
            .export(&scene.snapshot(), ExportFormat::Png)
            .expect("png")
    }

    #[test]
    fn test_classify_sources() {
        assert_eq!(
            SourceImageLoader::classify(RED_PNG_URI).expect("data"),
            SourceKind::DataUri
        );
        assert!(matches!(
            SourceImageLoader::classify("https://cdn.example.com/a.png"),
            Ok(SourceKind::Remote(_))
        ));
        assert_eq!(
            SourceImageLoader::classify("art/logo.png").expect("path"),
            SourceKind::File(PathBuf::from("art/logo.png"))
        );
        assert!(matches!(
            SourceImageLoader::classify("ftp://example.com/a.png"),
            Err(LoadError::UnsupportedScheme(_))
        ));
    }

    #[tokio::test]
    async fn test_loads_data_uri() {
        let loader = SourceImageLoader::new(None).expect("loader");
        let artwork = loader.load(RED_PNG_URI).await.expect("load");
        assert_eq!((artwork.width(), artwork.height()), (1, 1));
    }

    #[tokio::test]
    async fn test_loads_relative_path_from_base_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("art.png"), png_bytes(8.0, 6.0)).expect("write");

        let loader = SourceImageLoader::new(Some(dir.path().to_path_buf())).expect("loader");
        let artwork = loader.load("art.png").await.expect("load");
        assert_eq!((artwork.width(), artwork.height()), (8, 6));
    }

    #[tokio::test]
    async fn test_missing_file_is_image_load_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loader = SourceImageLoader::new(Some(dir.path().to_path_buf())).expect("loader");
        let err = loader.load("nope.png").await.expect_err("missing");
        assert!(matches!(err, CanvasError::ImageLoad(_)));
    }

    #[tokio::test]
    async fn test_non_image_file_fails_to_decode() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").expect("write");

        let loader = SourceImageLoader::new(None).expect("loader");
        let err = loader.load_source(&path.to_string_lossy()).await.expect_err("decode");
        assert!(matches!(err, LoadError::Decode(_)));
    }
}

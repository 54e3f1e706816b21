//! Image download stage
//!
//! Downloads the product image, names it after the (sanitized) product
//! title, and records the written path on the record. Download or write
//! failures are logged and the record continues without a local path; this
//! stage never drops a record and never retries.

use crate::pipeline::Stage;
use crate::record::ProductRecord;
use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use url::Url;

const DEFAULT_EXTENSION: &str = "jpg";
const FALLBACK_STEM: &str = "product";

/// Image-fetching stage
pub struct ImageStage {
    client: Client,
    image_dir: PathBuf,
}

impl ImageStage {
    pub fn new(client: Client, image_dir: PathBuf) -> Self {
        Self { client, image_dir }
    }

    async fn download(&self, url: &str, target: &Path) -> crate::Result<()> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        tokio::fs::create_dir_all(&self.image_dir).await?;
        tokio::fs::write(target, &bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl Stage for ImageStage {
    fn name(&self) -> &'static str {
        "images"
    }

    async fn process(&mut self, mut record: ProductRecord) -> Option<ProductRecord> {
        let Some(url) = record.image_url.clone() else {
            return Some(record);
        };

        let filename = format!(
            "{}.{}",
            safe_filename(&record.product_title),
            extension_of(&url)
        );
        let target = self.image_dir.join(filename);

        match self.download(&url, &target).await {
            Ok(()) => {
                tracing::debug!(%url, path = %target.display(), "Image stored");
                record.local_path = Some(target.to_string_lossy().into_owned());
            }
            Err(e) => {
                tracing::warn!(%url, "Image fetch failed, record continues without image: {e}");
            }
        }

        Some(record)
    }
}

/// Derives a filesystem-safe file stem from a product title
///
/// Characters disallowed in file names become separators, whitespace runs
/// collapse, and the remaining separators become single underscores, so
/// `"Crown & Bridge / Kit"` maps to `"Crown_&_Bridge_Kit"`.
pub fn safe_filename(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => ' ',
            other => other,
        })
        .collect();

    let stem = replaced.split_whitespace().collect::<Vec<_>>().join("_");
    if stem.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        stem
    }
}

/// Picks the file extension from the image URL path, defaulting to jpg
fn extension_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path()
                .rsplit('/')
                .next()
                .and_then(|name| name.rsplit_once('.'))
                .map(|(_, ext)| ext.to_ascii_lowercase())
        })
        .filter(|ext| !ext.is_empty() && ext.len() <= 4)
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::build_http_client;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn sanitizes_title_with_disallowed_characters() {
        assert_eq!(safe_filename("Crown & Bridge / Kit"), "Crown_&_Bridge_Kit");
        assert_eq!(safe_filename("A  spaced   name"), "A_spaced_name");
        assert_eq!(safe_filename(r#"x<>:"/\|?*y"#), "x_y");
        assert_eq!(safe_filename(""), "product");
    }

    #[test]
    fn extension_comes_from_url_path() {
        assert_eq!(extension_of("https://x.test/img/scaler.PNG"), "png");
        assert_eq!(extension_of("https://x.test/img/scaler.webp?v=2"), "webp");
        assert_eq!(extension_of("https://x.test/img/scaler"), "jpg");
        assert_eq!(extension_of("not a url"), "jpg");
    }

    #[tokio::test]
    async fn stores_image_and_sets_local_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/kit.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fakeimage".to_vec()))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let mut stage = ImageStage::new(build_http_client(None).unwrap(), dir.path().to_path_buf());

        let mut record = ProductRecord::new("Crown & Bridge / Kit", "250.00");
        record.image_url = Some(format!("{}/img/kit.jpg", server.uri()));

        let out = stage.process(record).await.unwrap();
        let local = out.local_path.expect("local path should be set");
        assert!(local.ends_with("Crown_&_Bridge_Kit.jpg"));
        assert_eq!(std::fs::read(&local).unwrap(), b"fakeimage");
    }

    #[tokio::test]
    async fn fetch_failure_passes_record_without_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let mut stage = ImageStage::new(build_http_client(None).unwrap(), dir.path().to_path_buf());

        let mut record = ProductRecord::new("Scaler", "120.00");
        record.image_url = Some(format!("{}/img/missing.jpg", server.uri()));

        let out = stage.process(record).await.unwrap();
        assert_eq!(out.local_path, None);
    }

    #[tokio::test]
    async fn record_without_image_url_passes_untouched() {
        let dir = tempdir().unwrap();
        let mut stage = ImageStage::new(build_http_client(None).unwrap(), dir.path().to_path_buf());

        let record = ProductRecord::new("Scaler", "120.00");
        let out = stage.process(record.clone()).await.unwrap();
        assert_eq!(out, record);
    }
}

//! HTTP fetcher
//!
//! This module builds the HTTP client a job uses for every request (listing
//! pages and images alike) and fetches listing pages. The client carries the
//! job's proxy choice, so proxying is decided once at construction rather
//! than per request.

use crate::{CrawlError, Result};
use reqwest::{Client, Proxy};
use std::time::Duration;

const USER_AGENT: &str = concat!("shopcrawl/", env!("CARGO_PKG_VERSION"));

/// Builds the HTTP client for one job
///
/// # Arguments
///
/// * `proxy` - Proxy URL to route every request through, if any
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(CrawlError)` - Proxy URL was malformed or the client could not be built
pub fn build_http_client(proxy: Option<&str>) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy_url) = proxy {
        builder = builder.proxy(Proxy::all(proxy_url)?);
    }

    Ok(builder.build()?)
}

/// Fetches one listing page and returns its body
///
/// Any transport error or non-2xx status is returned as an error; the engine
/// decides whether that is fatal (first page) or the end of pagination
/// (subsequent pages).
pub async fn fetch_page(client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await.map_err(|e| CrawlError::Fetch {
        url: url.to_string(),
        source: e,
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(CrawlError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(|e| CrawlError::Fetch {
        url: url.to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetch_page_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/shop"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let client = build_http_client(None).unwrap();
        let body = fetch_page(&client, &format!("{}/shop", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn fetch_page_maps_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = build_http_client(None).unwrap();
        let err = fetch_page(&client, &format!("{}/shop", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::HttpStatus { status: 500, .. }));
    }

    #[test]
    fn malformed_proxy_url_is_rejected() {
        assert!(build_http_client(Some("::not-a-proxy::")).is_err());
    }
}

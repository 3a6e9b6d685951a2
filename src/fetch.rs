//! HTTP page source for `type=JSON` listing endpoints.

use crate::action::FetchedPage;
use crate::decode::ItemDecoder;
use crate::error::FetchError;
use crate::loader::{PageRequest, PageSource};
use crate::net::send_with_backoff;
use async_trait::async_trait;
use std::sync::OnceLock;
use std::time::Duration;

static HTTP: OnceLock<reqwest::Client> = OnceLock::new();

fn http_client() -> &'static reqwest::Client {
    HTTP.get_or_init(|| {
        reqwest::Client::builder()
            .pool_max_idle_per_host(8)
            .tcp_nodelay(true)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("falling back to default HTTP client: {e}");
                reqwest::Client::new()
            })
    })
}

pub struct HttpPageSource {
    base_url: String,
    decoder: ItemDecoder,
    timeout: Duration,
    retries: u8,
}

impl HttpPageSource {
    pub fn new(base_url: impl Into<String>, decoder: ItemDecoder) -> Self {
        Self {
            base_url: base_url.into(),
            decoder,
            timeout: Duration::from_millis(10_000),
            retries: 3,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout = Duration::from_millis(timeout_ms);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.retries = retries;
        self
    }

    pub fn url_for(&self, request: &PageRequest) -> String {
        page_url(&self.base_url, request)
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, request: &PageRequest) -> Result<FetchedPage, FetchError> {
        let url = self.url_for(request);
        let rb = http_client().get(&url).timeout(self.timeout);
        let res = send_with_backoff(rb, &request.path, self.retries).await?;
        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                path: request.path.clone(),
            });
        }
        let body = res.text().await?;
        let page = self.decoder.decode_page(&body)?;
        log::debug!(
            "✅ {} items from {} (next: {:?})",
            page.items.len(),
            request.path,
            page.next_page_path
        );
        Ok(page)
    }
}

/// Absolute request URL with `type=JSON` and, for indexed requests,
/// `page_number` plus the cached params. An indexed request without cached
/// params keeps the listing path's own query.
pub fn page_url(base_url: &str, request: &PageRequest) -> String {
    let base = base_url.trim_end_matches('/');
    let path = if request.path.starts_with('/') || request.path.is_empty() {
        request.path.clone()
    } else {
        format!("/{}", request.path)
    };

    let (route, own_query) = match path.split_once('?') {
        Some((route, query)) => (route.to_string(), Some(query.to_string())),
        None => (path.clone(), None),
    };

    let mut query: Vec<String> = Vec::new();
    match request.page_number {
        Some(page) => {
            if request.params.is_empty() {
                query.extend(own_query);
            }
            query.push("type=JSON".to_string());
            query.push(format!("page_number={page}"));
            for (key, value) in &request.params {
                query.push(format!(
                    "{}={}",
                    urlencoding::encode(key),
                    urlencoding::encode(value)
                ));
            }
        }
        None => {
            query.extend(own_query);
            query.push("type=JSON".to_string());
        }
    }
    query.retain(|q| !q.is_empty());
    format!("{base}{route}?{}", query.join("&"))
}

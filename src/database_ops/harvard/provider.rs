use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{PipelineError, PipelineResult};

pub const DEFAULT_BASE_URL: &str = "https://api.harvardartmuseums.org";

fn truncate_for_log(mut s: String, max_len: usize) -> String {
    if s.len() > max_len {
        let mut cut = max_len;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
        s.push('…');
    }
    s
}

// ---------- Harvard API shapes ----------
// Only the fields consumed by the projector are modeled; everything else is ignored.
// Every field is optional because upstream omits keys freely.

/// One object record as returned by `GET /object`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawObject {
    pub id: Option<i64>,
    pub objectid: Option<i64>,
    pub title: Option<String>,
    pub culture: Option<String>,
    pub period: Option<String>,
    pub century: Option<String>,
    pub medium: Option<String>,
    pub dimensions: Option<String>,
    pub description: Option<String>,
    pub department: Option<String>,
    pub classification: Option<String>,
    pub accessionyear: Option<i64>,
    pub accessionmethod: Option<String>,
    pub imagecount: Option<i64>,
    pub mediacount: Option<i64>,
    pub colorcount: Option<i64>,
    pub rank: Option<i64>,
    pub datebegin: Option<i64>,
    pub dateend: Option<i64>,
    pub colors: Option<Vec<RawColor>>,
}

/// One entry of an object's embedded `colors` list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawColor {
    pub color: Option<String>,
    pub spectrum: Option<String>,
    pub hue: Option<String>,
    pub percent: Option<f64>,
    pub css3: Option<String>,
}

/// One entry of `GET /classification`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub name: String,
    #[serde(default)]
    pub objectcount: i64,
}

/// A page of objects. A missing `records` key is an empty page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ObjectPage {
    pub info: Option<PageInfo>,
    pub records: Option<Vec<RawObject>>,
}

impl ObjectPage {
    /// Page count the catalog reports for the whole query, if present.
    pub fn reported_pages(&self) -> Option<i64> {
        self.info.as_ref().and_then(|i| i.pages)
    }

    pub fn into_records(self) -> Vec<RawObject> {
        self.records.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PageInfo {
    pub pages: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ClassificationPage {
    records: Vec<Classification>,
}

/// Transport seam for the catalog API: one call per HTTP request.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// All classifications the catalog reports (single request).
    async fn classifications(&self) -> PipelineResult<Vec<Classification>>;

    /// One page of objects filtered by classification. Pages are 1-based.
    async fn object_page(&self, category: &str, page: u32, page_size: u32)
        -> PipelineResult<ObjectPage>;
}

/// Connection settings for [`HarvardProvider`].
#[derive(Debug, Clone, Default)]
pub struct HarvardOptions {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl HarvardOptions {
    /// `HARVARD_BASE_URL`, `HARVARD_API_KEY`, `HARVARD_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        use crate::util::env::{env_opt, env_parse_opt};
        Self {
            base_url: env_opt("HARVARD_BASE_URL"),
            api_key: env_opt("HARVARD_API_KEY"),
            timeout_secs: env_parse_opt("HARVARD_TIMEOUT_SECS"),
        }
    }
}

/// Harvard Art Museums API client.
/// Public API (base): https://api.harvardartmuseums.org/
///
/// Endpoints used:
/// - GET /classification?size=100 - category names with object counts
/// - GET /object?classification=..&size=..&page=.. - paged object records
///
/// Every request carries the `apikey` query parameter.
#[derive(Debug, Clone)]
pub struct HarvardProvider {
    base_url: String,
    http: Client,
    api_key: Option<String>,
}

impl HarvardProvider {
    pub fn new(base_url: Option<&str>, timeout_secs: Option<u64>) -> Result<Self> {
        let base_url = base_url
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        let timeout_secs = timeout_secs.unwrap_or(30);
        let http = Client::builder()
            .user_agent(concat!("harvard-artifacts/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            base_url,
            http,
            api_key: None,
        })
    }

    pub fn from_options(options: &HarvardOptions) -> Result<Self> {
        Ok(Self::new(options.base_url.as_deref(), options.timeout_secs)?
            .with_api_key(options.api_key.clone()))
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn add_auth_query(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key.as_deref() {
            Some(key) => req.query(&[("apikey", key)]),
            None => req,
        }
    }

    async fn get_json<T>(&self, endpoint: &str, req: reqwest::RequestBuilder) -> PipelineResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let resp = self
            .add_auth_query(req)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| PipelineError::unavailable(endpoint, e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = truncate_for_log(resp.text().await.unwrap_or_default(), 500);
            return Err(PipelineError::unavailable(
                endpoint,
                format!("status {status} body={body}"),
            ));
        }
        resp.json::<T>()
            .await
            .map_err(|e| PipelineError::unavailable(endpoint, format!("malformed payload: {e}")))
    }
}

#[async_trait]
impl CatalogSource for HarvardProvider {
    async fn classifications(&self) -> PipelineResult<Vec<Classification>> {
        let url = format!("{}/classification", self.base_url);
        let req = self.http.get(&url).query(&[("size", "100")]);
        let page: ClassificationPage = self.get_json("classification", req).await?;
        Ok(page.records)
    }

    async fn object_page(
        &self,
        category: &str,
        page: u32,
        page_size: u32,
    ) -> PipelineResult<ObjectPage> {
        let url = format!("{}/object", self.base_url);
        let req = self.http.get(&url).query(&[
            ("size", page_size.to_string()),
            ("page", page.to_string()),
            ("classification", category.to_string()),
        ]);
        self.get_json("object", req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Local HTTP endpoint answering every request with the same status line and body.
    async fn canned_server(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}")
    }

    fn unavailable_reason(err: PipelineError) -> String {
        match err {
            PipelineError::SourceUnavailable { reason, .. } => reason,
            other => panic!("expected SourceUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn provider_initialization_trims_base_url() {
        let provider = HarvardProvider::new(Some("http://localhost:9999/"), Some(5)).unwrap();
        assert_eq!(provider.base_url(), "http://localhost:9999");

        let default = HarvardProvider::new(None, None).unwrap();
        assert!(default.base_url().contains("harvardartmuseums"));
    }

    #[test]
    fn blank_api_key_is_dropped() {
        let provider = HarvardProvider::new(None, None)
            .unwrap()
            .with_api_key(Some("   ".into()));
        assert!(provider.api_key.is_none());
    }

    #[test]
    fn page_without_records_is_empty() {
        let page: ObjectPage =
            serde_json::from_str(r#"{"info":{"totalrecords":0,"pages":0,"page":3}}"#).unwrap();
        assert_eq!(page.reported_pages(), Some(0));
        assert!(page.into_records().is_empty());
    }

    #[test]
    fn decodes_object_record_with_unknown_fields() {
        let page: ObjectPage = serde_json::from_str(
            r##"{"records":[{"id":7,"objectid":7,"title":"Bowl","rank":12,
                "people":[{"name":"Unknown"}],
                "colors":[{"color":"#c89664","spectrum":"#e0ba51","hue":"Brown","percent":0.41,"css3":"#cd853f"}]}]}"##,
        )
        .unwrap();
        let records = page.into_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rank, Some(12));
        let colors = records[0].colors.as_ref().unwrap();
        assert_eq!(colors[0].hue.as_deref(), Some("Brown"));
        assert_eq!(colors[0].percent, Some(0.41));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let out = truncate_for_log("ééééé".to_string(), 3);
        assert!(out.ends_with('…'));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_source_unavailable() {
        // Port 9 (discard) on localhost is not expected to speak HTTP.
        let provider = HarvardProvider::new(Some("http://127.0.0.1:9"), Some(2)).unwrap();
        let err = provider.classifications().await.unwrap_err();
        assert!(matches!(err, PipelineError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn error_status_is_source_unavailable() {
        let base = canned_server("500 Internal Server Error", r#"{"error":"boom"}"#).await;
        let provider = HarvardProvider::new(Some(&base), Some(5))
            .unwrap()
            .with_api_key(Some("k".into()));

        let reason = unavailable_reason(provider.classifications().await.unwrap_err());
        assert!(reason.contains("500"), "{reason}");
        let reason = unavailable_reason(provider.object_page("Prints", 1, 100).await.unwrap_err());
        assert!(reason.contains("500"), "{reason}");
    }

    #[tokio::test]
    async fn malformed_payload_is_source_unavailable() {
        let base = canned_server("200 OK", r#"{"records": "oops"}"#).await;
        let provider = HarvardProvider::new(Some(&base), Some(5)).unwrap();

        let reason = unavailable_reason(provider.classifications().await.unwrap_err());
        assert!(reason.contains("malformed payload"), "{reason}");
        let reason = unavailable_reason(provider.object_page("Prints", 1, 100).await.unwrap_err());
        assert!(reason.contains("malformed payload"), "{reason}");
    }
}

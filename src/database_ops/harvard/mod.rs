pub mod provider;

pub use provider::{
    CatalogSource, Classification, HarvardOptions, HarvardProvider, ObjectPage, RawColor,
    RawObject,
};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::database_ops::db::Db;
use crate::database_ops::persist::{persist, PersistSummary};
use crate::error::PipelineResult;
use crate::normalization::{project, BatchCounts, ProjectedBatch};
use crate::util::env::env_parse;

pub const DEFAULT_MIN_OBJECT_COUNT: i64 = 2500;
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_MAX_PAGES: u32 = 25;

/// Paging bounds for one collect run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    pub page_size: u32,
    pub max_pages: u32,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl FetchLimits {
    /// `HARVARD_PAGE_SIZE` / `HARVARD_MAX_PAGES`, falling back to 100 x 25.
    pub fn from_env() -> Self {
        Self {
            page_size: env_parse("HARVARD_PAGE_SIZE", DEFAULT_PAGE_SIZE),
            max_pages: env_parse("HARVARD_MAX_PAGES", DEFAULT_MAX_PAGES),
        }
    }

    /// Upper bound on objects a single fetch can return.
    pub fn cap(&self) -> u64 {
        u64::from(self.page_size) * u64::from(self.max_pages)
    }
}

/// `HARVARD_MIN_OBJECT_COUNT`, default 2500.
pub fn min_object_count_from_env() -> i64 {
    env_parse("HARVARD_MIN_OBJECT_COUNT", DEFAULT_MIN_OBJECT_COUNT)
}

/// Category names whose reported object count is at least `min_count`, in catalog order.
pub async fn list_categories(
    source: &dyn CatalogSource,
    min_count: i64,
) -> PipelineResult<Vec<String>> {
    let all = source.classifications().await?;
    let total = all.len();
    let names: Vec<String> = all
        .into_iter()
        .filter(|c| c.objectcount >= min_count)
        .map(|c| c.name)
        .collect();
    debug!(total, kept = names.len(), min_count, "harvard: classifications filtered");
    Ok(names)
}

/// Request exactly `max_pages` pages of `category` and concatenate their records.
///
/// Short or empty pages do not end the loop. Any failed page aborts the whole fetch
/// and nothing fetched so far is returned.
#[instrument(skip(source))]
pub async fn fetch_objects(
    source: &dyn CatalogSource,
    category: &str,
    page_size: u32,
    max_pages: u32,
) -> PipelineResult<Vec<RawObject>> {
    let mut objects: Vec<RawObject> = Vec::new();
    let mut reported_pages = None;
    for page in 1..=max_pages {
        let response = source.object_page(category, page, page_size).await?;
        reported_pages = response.reported_pages().or(reported_pages);
        let records = response.into_records();
        if records.is_empty() {
            warn!(page, "harvard: empty page, continuing");
        } else {
            debug!(page, received = records.len(), "harvard: object page");
        }
        objects.extend(records);
    }
    info!(
        category,
        pages = max_pages,
        reported_pages,
        objects = objects.len(),
        "harvard: fetch complete"
    );
    Ok(objects)
}

/// Fetch one category and project it. Nothing is written.
pub async fn collect(
    source: &dyn CatalogSource,
    category: &str,
    limits: FetchLimits,
) -> PipelineResult<ProjectedBatch> {
    let objects = fetch_objects(source, category, limits.page_size, limits.max_pages).await?;
    let batch = project(&objects)?;
    let counts = batch.counts();
    info!(
        category,
        metadata = counts.metadata,
        media = counts.media,
        colors = counts.colors,
        "harvard: collected"
    );
    Ok(batch)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestSummary {
    pub category: String,
    pub collected: BatchCounts,
    pub persisted: PersistSummary,
}

/// Fetch, project and persist one category end to end.
pub async fn ingest_category(
    db: &Db,
    source: &dyn CatalogSource,
    category: &str,
    limits: FetchLimits,
) -> PipelineResult<IngestSummary> {
    let batch = collect(source, category, limits).await?;
    let persisted = persist(db, &batch).await?;
    Ok(IngestSummary {
        category: category.to_string(),
        collected: batch.counts(),
        persisted,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::PipelineError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-process catalog: serves canned pages and records every request.
    #[derive(Default)]
    pub(crate) struct FakeCatalog {
        pub classifications: Vec<Classification>,
        pub pages: Vec<Vec<RawObject>>,
        pub fail_on_page: Option<u32>,
        pub requests: Mutex<Vec<(String, u32, u32)>>,
    }

    impl FakeCatalog {
        pub(crate) fn with_pages(pages: Vec<Vec<RawObject>>) -> Self {
            Self {
                pages,
                ..Self::default()
            }
        }

        fn requested_pages(&self) -> Vec<u32> {
            self.requests.lock().unwrap().iter().map(|r| r.1).collect()
        }
    }

    #[async_trait]
    impl CatalogSource for FakeCatalog {
        async fn classifications(&self) -> PipelineResult<Vec<Classification>> {
            Ok(self.classifications.clone())
        }

        async fn object_page(
            &self,
            category: &str,
            page: u32,
            page_size: u32,
        ) -> PipelineResult<ObjectPage> {
            self.requests
                .lock()
                .unwrap()
                .push((category.to_string(), page, page_size));
            if self.fail_on_page == Some(page) {
                return Err(PipelineError::unavailable("object", "connection reset"));
            }
            Ok(ObjectPage {
                info: None,
                records: self.pages.get(page as usize - 1).cloned(),
            })
        }
    }

    pub(crate) fn object(id: i64) -> RawObject {
        RawObject {
            id: Some(id),
            objectid: Some(id),
            title: Some(format!("Object {id}")),
            ..RawObject::default()
        }
    }

    #[tokio::test]
    async fn fetch_issues_every_page_despite_empty_pages() {
        // Page 1 has two records, page 2 is empty, page 3 has one; the rest are absent.
        let catalog = FakeCatalog::with_pages(vec![vec![object(1), object(2)], vec![], vec![object(3)]]);

        let objects = fetch_objects(&catalog, "Paintings", 100, 25).await.unwrap();

        assert_eq!(catalog.requested_pages(), (1..=25).collect::<Vec<u32>>());
        let ids: Vec<i64> = objects.iter().filter_map(|o| o.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        let requests = catalog.requests.lock().unwrap();
        assert!(requests
            .iter()
            .all(|(category, _, size)| category == "Paintings" && *size == 100));
    }

    #[tokio::test]
    async fn fetch_aborts_on_failed_page() {
        let mut catalog = FakeCatalog::with_pages(vec![vec![object(1)], vec![object(2)]]);
        catalog.fail_on_page = Some(2);

        let err = fetch_objects(&catalog, "Prints", 10, 5).await.unwrap_err();

        assert!(matches!(err, PipelineError::SourceUnavailable { .. }));
        assert_eq!(catalog.requested_pages(), vec![1, 2]);
    }

    #[tokio::test]
    async fn list_categories_applies_threshold() {
        let catalog = FakeCatalog {
            classifications: vec![
                Classification {
                    name: "Prints".into(),
                    objectcount: 71_000,
                },
                Classification {
                    name: "Fragments".into(),
                    objectcount: 2_499,
                },
                Classification {
                    name: "Coins".into(),
                    objectcount: 2_500,
                },
            ],
            ..FakeCatalog::default()
        };

        let names = list_categories(&catalog, DEFAULT_MIN_OBJECT_COUNT).await.unwrap();
        assert_eq!(names, vec!["Prints".to_string(), "Coins".to_string()]);
    }

    #[tokio::test]
    async fn ingest_category_persists_projection() {
        let mut first = object(1);
        first.colors = Some(vec![RawColor {
            color: Some("#000000".into()),
            hue: Some("Black".into()),
            percent: Some(0.9),
            ..RawColor::default()
        }]);
        let catalog = FakeCatalog::with_pages(vec![vec![first, object(2)]]);
        let db = Db::in_memory().await.unwrap();
        let limits = FetchLimits {
            page_size: 2,
            max_pages: 3,
        };

        let summary = ingest_category(&db, &catalog, "Vessels", limits).await.unwrap();

        assert_eq!(
            summary.collected,
            BatchCounts {
                metadata: 2,
                media: 2,
                colors: 1
            }
        );
        assert_eq!(summary.persisted.metadata_inserted, 2);
        assert_eq!(summary.persisted.colors_inserted, 1);
        assert_eq!(catalog.requested_pages(), vec![1, 2, 3]);
    }

    #[test]
    fn default_limits_cap_at_2500() {
        assert_eq!(FetchLimits::default().cap(), 2500);
    }
}

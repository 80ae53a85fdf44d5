use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::{info, instrument};

use crate::database_ops::db::Db;
use crate::database_ops::schema::{ensure_schema, COLORS_TABLE, MEDIA_TABLE, METADATA_TABLE};
use crate::error::{PipelineError, PipelineResult};
use crate::normalization::{ColorRow, MediaRow, MetadataRow, ProjectedBatch};

// Rows per INSERT statement; keeps bind counts far below SQLite's variable limit.
const CHUNK_ROWS: usize = 500;

/// Rows written vs. left alone by one persist call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistSummary {
    pub metadata_inserted: u64,
    pub metadata_skipped: u64,
    pub media_inserted: u64,
    pub media_skipped: u64,
    pub colors_inserted: u64,
}

/// Write a projected batch: metadata and media insert-if-absent, colors appended.
///
/// Runs the schema check first, then all three steps inside one transaction. Any failure
/// (a dangling objectid included) rolls the whole batch back.
#[instrument(skip(db, batch), fields(metadata = batch.metadata.len(), media = batch.media.len(), colors = batch.colors.len()))]
pub async fn persist(db: &Db, batch: &ProjectedBatch) -> PipelineResult<PersistSummary> {
    ensure_schema(db).await?;

    let mut summary = PersistSummary::default();
    let mut tx = db.pool.begin().await?;

    if !batch.metadata.is_empty() {
        summary.metadata_inserted = insert_metadata(&mut tx, &batch.metadata).await?;
        summary.metadata_skipped = batch.metadata.len() as u64 - summary.metadata_inserted;
    }
    if !batch.media.is_empty() {
        summary.media_inserted = insert_media(&mut tx, &batch.media).await?;
        summary.media_skipped = batch.media.len() as u64 - summary.media_inserted;
    }
    if !batch.colors.is_empty() {
        summary.colors_inserted = insert_colors(&mut tx, &batch.colors).await?;
    }

    tx.commit().await?;
    info!(
        metadata_inserted = summary.metadata_inserted,
        metadata_skipped = summary.metadata_skipped,
        media_inserted = summary.media_inserted,
        media_skipped = summary.media_skipped,
        colors_inserted = summary.colors_inserted,
        "persist: batch committed"
    );
    Ok(summary)
}

async fn insert_metadata(conn: &mut SqliteConnection, rows: &[MetadataRow]) -> PipelineResult<u64> {
    let mut inserted = 0;
    for chunk in rows.chunks(CHUNK_ROWS) {
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "INSERT INTO artifact_metadata (id, title, culture, period, century, medium, dimensions, description, department, classification, accessionyear, accessionmethod) ",
        );
        qb.push_values(chunk, |mut b, r| {
            b.push_bind(r.id)
                .push_bind(&r.title)
                .push_bind(&r.culture)
                .push_bind(&r.period)
                .push_bind(&r.century)
                .push_bind(&r.medium)
                .push_bind(&r.dimensions)
                .push_bind(&r.description)
                .push_bind(&r.department)
                .push_bind(&r.classification)
                .push_bind(r.accessionyear)
                .push_bind(&r.accessionmethod);
        });
        // Existing rows are never updated in place.
        qb.push(" ON CONFLICT (id) DO NOTHING");
        let res = qb
            .build()
            .execute(&mut *conn)
            .await
            .map_err(|e| PipelineError::from_write(METADATA_TABLE, e))?;
        inserted += res.rows_affected();
    }
    Ok(inserted)
}

async fn insert_media(conn: &mut SqliteConnection, rows: &[MediaRow]) -> PipelineResult<u64> {
    let mut inserted = 0;
    for chunk in rows.chunks(CHUNK_ROWS) {
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "INSERT INTO artifact_media (objectid, imagecount, mediacount, colorcount, rankk, datebegin, dateend) ",
        );
        qb.push_values(chunk, |mut b, r| {
            b.push_bind(r.objectid)
                .push_bind(r.imagecount)
                .push_bind(r.mediacount)
                .push_bind(r.colorcount)
                .push_bind(r.rank)
                .push_bind(r.datebegin)
                .push_bind(r.dateend);
        });
        qb.push(" ON CONFLICT (objectid) DO NOTHING");
        let res = qb
            .build()
            .execute(&mut *conn)
            .await
            .map_err(|e| PipelineError::from_write(MEDIA_TABLE, e))?;
        inserted += res.rows_affected();
    }
    Ok(inserted)
}

async fn insert_colors(conn: &mut SqliteConnection, rows: &[ColorRow]) -> PipelineResult<u64> {
    let mut inserted = 0;
    for chunk in rows.chunks(CHUNK_ROWS) {
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "INSERT INTO artifact_colors (objectid, color, spectrum, hue, percent, css3) ",
        );
        qb.push_values(chunk, |mut b, r| {
            b.push_bind(r.objectid)
                .push_bind(&r.color)
                .push_bind(&r.spectrum)
                .push_bind(&r.hue)
                .push_bind(r.percent)
                .push_bind(&r.css3);
        });
        let res = qb
            .build()
            .execute(&mut *conn)
            .await
            .map_err(|e| PipelineError::from_write(COLORS_TABLE, e))?;
        inserted += res.rows_affected();
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    fn meta(id: i64, title: &str) -> MetadataRow {
        MetadataRow {
            id,
            title: title.to_string(),
            culture: String::new(),
            period: String::new(),
            century: String::new(),
            medium: String::new(),
            dimensions: String::new(),
            description: String::new(),
            department: String::new(),
            classification: String::new(),
            accessionyear: None,
            accessionmethod: String::new(),
        }
    }

    fn media(objectid: i64) -> MediaRow {
        MediaRow {
            objectid,
            imagecount: 1,
            mediacount: 1,
            colorcount: 0,
            rank: 0,
            datebegin: None,
            dateend: None,
        }
    }

    fn color(objectid: i64, hue: &str) -> ColorRow {
        ColorRow {
            objectid,
            color: Some("#777777".into()),
            spectrum: None,
            hue: Some(hue.into()),
            percent: Some(0.25),
            css3: None,
        }
    }

    async fn count(db: &Db, sql: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(sql)
            .fetch_one(&db.pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn metadata_is_insert_if_absent() {
        let db = Db::in_memory().await.unwrap();
        let first = ProjectedBatch {
            metadata: vec![meta(1, "A")],
            ..ProjectedBatch::default()
        };
        let second = ProjectedBatch {
            metadata: vec![meta(1, "B")],
            ..ProjectedBatch::default()
        };

        persist(&db, &first).await.unwrap();
        let summary = persist(&db, &second).await.unwrap();

        assert_eq!(summary.metadata_inserted, 0);
        assert_eq!(summary.metadata_skipped, 1);
        let row = sqlx::query("SELECT title FROM artifact_metadata WHERE id = 1")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(row.get::<String, _>("title"), "A");
    }

    #[tokio::test]
    async fn colors_are_appended() {
        let db = Db::in_memory().await.unwrap();
        let first = ProjectedBatch {
            metadata: vec![meta(7, "Bowl")],
            media: vec![media(7)],
            colors: vec![color(7, "Grey"), color(7, "Grey")],
        };
        let again = ProjectedBatch {
            colors: vec![color(7, "Grey")],
            ..ProjectedBatch::default()
        };

        persist(&db, &first).await.unwrap();
        let summary = persist(&db, &again).await.unwrap();

        assert_eq!(summary.colors_inserted, 1);
        assert_eq!(
            count(&db, "SELECT COUNT(*) FROM artifact_colors WHERE objectid = 7").await,
            3
        );
    }

    #[tokio::test]
    async fn media_insert_if_absent_keeps_first_values() {
        let db = Db::in_memory().await.unwrap();
        let mut changed = media(3);
        changed.imagecount = 99;
        persist(
            &db,
            &ProjectedBatch {
                metadata: vec![meta(3, "Cup")],
                media: vec![media(3)],
                colors: vec![],
            },
        )
        .await
        .unwrap();
        let summary = persist(
            &db,
            &ProjectedBatch {
                media: vec![changed],
                ..ProjectedBatch::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(summary.media_skipped, 1);
        assert_eq!(
            count(&db, "SELECT imagecount FROM artifact_media WHERE objectid = 3").await,
            1
        );
    }

    #[tokio::test]
    async fn dangling_color_is_referential_violation_and_rolls_back() {
        let db = Db::in_memory().await.unwrap();
        let batch = ProjectedBatch {
            metadata: vec![meta(1, "Orphan parent")],
            media: vec![],
            colors: vec![color(1, "Red")],
        };

        let err = persist(&db, &batch).await.unwrap_err();

        match err {
            PipelineError::ReferentialViolation { table, .. } => assert_eq!(table, COLORS_TABLE),
            other => panic!("expected ReferentialViolation, got {other:?}"),
        }
        assert_eq!(count(&db, "SELECT COUNT(*) FROM artifact_metadata").await, 0);
    }

    #[tokio::test]
    async fn dangling_media_is_referential_violation_and_rolls_back() {
        let db = Db::in_memory().await.unwrap();
        let batch = ProjectedBatch {
            metadata: vec![meta(1, "Kept only if the batch commits")],
            media: vec![media(1), media(2)],
            colors: vec![],
        };

        let err = persist(&db, &batch).await.unwrap_err();

        match err {
            PipelineError::ReferentialViolation { table, .. } => assert_eq!(table, MEDIA_TABLE),
            other => panic!("expected ReferentialViolation, got {other:?}"),
        }
        assert_eq!(count(&db, "SELECT COUNT(*) FROM artifact_metadata").await, 0);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM artifact_media").await, 0);
    }

    #[tokio::test]
    async fn empty_batch_is_a_noop() {
        let db = Db::in_memory().await.unwrap();
        let summary = persist(&db, &ProjectedBatch::default()).await.unwrap();
        assert_eq!(summary, PersistSummary::default());
        assert_eq!(count(&db, "SELECT COUNT(*) FROM artifact_metadata").await, 0);
    }

    #[tokio::test]
    async fn large_batches_are_chunked() {
        let db = Db::in_memory().await.unwrap();
        let ids: Vec<i64> = (1..=1_234).collect();
        let batch = ProjectedBatch {
            metadata: ids.iter().map(|&id| meta(id, "x")).collect(),
            media: ids.iter().map(|&id| media(id)).collect(),
            colors: ids.iter().map(|&id| color(id, "Blue")).collect(),
        };

        let summary = persist(&db, &batch).await.unwrap();

        assert_eq!(summary.metadata_inserted, 1_234);
        assert_eq!(summary.media_inserted, 1_234);
        assert_eq!(summary.colors_inserted, 1_234);
    }
}

use sqlx::{Row, SqliteConnection};
use tracing::{debug, warn};

use crate::database_ops::db::Db;
use crate::error::{PipelineError, PipelineResult};

pub const METADATA_TABLE: &str = "artifact_metadata";
pub const MEDIA_TABLE: &str = "artifact_media";
pub const COLORS_TABLE: &str = "artifact_colors";

/// Expected definition of one table, in creation order.
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub ddl: &'static str,
}

pub const TABLES: [TableDef; 3] = [
    TableDef {
        name: METADATA_TABLE,
        columns: &[
            "id",
            "title",
            "culture",
            "period",
            "century",
            "medium",
            "dimensions",
            "description",
            "department",
            "classification",
            "accessionyear",
            "accessionmethod",
        ],
        ddl: r#"CREATE TABLE IF NOT EXISTS artifact_metadata (
            id              INTEGER PRIMARY KEY,
            title           TEXT,
            culture         TEXT,
            period          TEXT,
            century         TEXT,
            medium          TEXT,
            dimensions      TEXT,
            description     TEXT,
            department      TEXT,
            classification  TEXT,
            accessionyear   INTEGER,
            accessionmethod TEXT
        )"#,
    },
    TableDef {
        name: MEDIA_TABLE,
        columns: &[
            "objectid",
            "imagecount",
            "mediacount",
            "colorcount",
            "rankk",
            "datebegin",
            "dateend",
        ],
        ddl: r#"CREATE TABLE IF NOT EXISTS artifact_media (
            objectid   INTEGER PRIMARY KEY,
            imagecount INTEGER NOT NULL DEFAULT 0,
            mediacount INTEGER NOT NULL DEFAULT 0,
            colorcount INTEGER NOT NULL DEFAULT 0,
            rankk      INTEGER NOT NULL DEFAULT 0,
            datebegin  INTEGER,
            dateend    INTEGER,
            FOREIGN KEY (objectid) REFERENCES artifact_metadata(id)
        )"#,
    },
    TableDef {
        name: COLORS_TABLE,
        columns: &["id", "objectid", "color", "spectrum", "hue", "percent", "css3"],
        ddl: r#"CREATE TABLE IF NOT EXISTS artifact_colors (
            id       INTEGER PRIMARY KEY AUTOINCREMENT,
            objectid INTEGER NOT NULL,
            color    VARCHAR(50),
            spectrum VARCHAR(50),
            hue      VARCHAR(50),
            percent  REAL,
            css3     VARCHAR(50),
            FOREIGN KEY (objectid) REFERENCES artifact_media(objectid)
        )"#,
    },
];

/// Create the three tables if absent, then check that existing ones carry every expected column.
///
/// Idempotent; runs before every persist batch.
pub async fn ensure_schema(db: &Db) -> PipelineResult<()> {
    let mut conn = db.pool.acquire().await?;
    ensure_schema_on(&mut conn).await
}

pub(crate) async fn ensure_schema_on(conn: &mut SqliteConnection) -> PipelineResult<()> {
    for table in &TABLES {
        sqlx::query(table.ddl).execute(&mut *conn).await?;
    }
    for table in &TABLES {
        let present = table_columns(conn, table.name).await?;
        let missing: Vec<String> = table
            .columns
            .iter()
            .filter(|c| !present.iter().any(|p| p.eq_ignore_ascii_case(c)))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            warn!(table = table.name, missing = ?missing, "schema: incompatible pre-existing table");
            return Err(PipelineError::SchemaConflict {
                table: table.name,
                missing,
            });
        }
    }
    debug!("schema: artifact tables ready");
    Ok(())
}

/// Column names of `table` in ordinal order (empty if the table does not exist).
pub async fn table_columns(conn: &mut SqliteConnection, table: &str) -> PipelineResult<Vec<String>> {
    let rows = sqlx::query("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
        .bind(table)
        .fetch_all(&mut *conn)
        .await?;
    rows.iter()
        .map(|r| r.try_get::<String, _>("name").map_err(PipelineError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_schema_is_idempotent() {
        let db = Db::in_memory().await.unwrap();
        ensure_schema(&db).await.unwrap();
        ensure_schema(&db).await.unwrap();

        let mut conn = db.pool.acquire().await.unwrap();
        for table in &TABLES {
            let cols = table_columns(&mut conn, table.name).await.unwrap();
            assert_eq!(cols, table.columns.to_vec(), "columns of {}", table.name);
        }
    }

    #[tokio::test]
    async fn conflicting_table_is_reported() {
        let db = Db::in_memory().await.unwrap();
        sqlx::query("CREATE TABLE artifact_media (objectid INTEGER PRIMARY KEY, imagecount INTEGER)")
            .execute(&db.pool)
            .await
            .unwrap();

        match ensure_schema(&db).await {
            Err(PipelineError::SchemaConflict { table, missing }) => {
                assert_eq!(table, MEDIA_TABLE);
                assert!(missing.contains(&"rankk".to_string()));
                assert!(missing.contains(&"dateend".to_string()));
            }
            other => panic!("expected SchemaConflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn media_rows_require_existing_metadata() {
        let db = Db::in_memory().await.unwrap();
        ensure_schema(&db).await.unwrap();
        let err = sqlx::query("INSERT INTO artifact_media (objectid) VALUES (404)")
            .execute(&db.pool)
            .await
            .unwrap_err();
        let mapped = PipelineError::from_write(MEDIA_TABLE, err);
        assert!(matches!(mapped, PipelineError::ReferentialViolation { .. }));
    }
}

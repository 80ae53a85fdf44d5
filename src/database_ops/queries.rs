//! Canned read-only queries over the three artifact tables.
//!
//! Each entry is a [`QueryKey`] with a static [`QueryDescriptor`]. Entry 14 is the only
//! parameterized one and can only be run through [`CatalogQuery::ColorsForObject`].
use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::database_ops::db::Db;
use crate::error::PipelineResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKey {
    ByzantineEleventhCentury,
    UniqueCultures,
    ArchaicPeriod,
    TitlesByAccessionYear,
    ArtifactsPerDepartment,
    MultipleImages,
    AverageRank,
    MoreColorsThanMedia,
    CreatedFifteenHundreds,
    NoMedia,
    DistinctHues,
    TopColors,
    AveragePercentPerHue,
    ColorsForArtifact,
    TotalColorEntries,
    ByzantineTitlesAndHues,
    TitlesWithHues,
    RanksWherePeriodKnown,
    TopRankedGrey,
    ClassificationMediaStats,
    CommonMediums,
    DepartmentsSpanningCenturies,
    LongestTitles,
    AverageColorsPerArtifact,
    MissingTitleOrCulture,
}

/// Parameters a descriptor expects from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryParam {
    ObjectId,
}

#[derive(Debug, Serialize)]
pub struct QueryDescriptor {
    pub number: u8,
    pub key: QueryKey,
    pub label: &'static str,
    pub params: &'static [QueryParam],
    pub sql: &'static str,
}

macro_rules! canned {
    ($number:expr, $key:ident, $label:expr, $sql:expr) => {
        QueryDescriptor {
            number: $number,
            key: QueryKey::$key,
            label: $label,
            params: &[],
            sql: $sql,
        }
    };
}

/// The full catalog, in display order. `CATALOG[n - 1].number == n`.
pub static CATALOG: [QueryDescriptor; 25] = [
    // Metadata
    canned!(
        1,
        ByzantineEleventhCentury,
        "Artifacts from 11th century (Byzantine)",
        "SELECT * FROM artifact_metadata WHERE century LIKE '%11th%' AND culture = 'Byzantine'"
    ),
    canned!(
        2,
        UniqueCultures,
        "Unique cultures",
        "SELECT DISTINCT culture FROM artifact_metadata"
    ),
    canned!(
        3,
        ArchaicPeriod,
        "Artifacts from Archaic Period",
        "SELECT * FROM artifact_metadata WHERE period = 'Archaic'"
    ),
    canned!(
        4,
        TitlesByAccessionYear,
        "Artifact titles ordered by accession year (desc)",
        "SELECT title, accessionyear FROM artifact_metadata ORDER BY accessionyear DESC"
    ),
    canned!(
        5,
        ArtifactsPerDepartment,
        "Artifacts per department",
        "SELECT department, COUNT(*) AS total FROM artifact_metadata GROUP BY department"
    ),
    // Media
    canned!(
        6,
        MultipleImages,
        "Artifacts with >1 image",
        "SELECT * FROM artifact_media WHERE imagecount > 1"
    ),
    canned!(
        7,
        AverageRank,
        "Average rank of artifacts",
        "SELECT AVG(rankk) AS avg_rank FROM artifact_media"
    ),
    canned!(
        8,
        MoreColorsThanMedia,
        "Artifacts with colorcount > mediacount",
        "SELECT * FROM artifact_media WHERE colorcount > mediacount"
    ),
    canned!(
        9,
        CreatedFifteenHundreds,
        "Artifacts created between 1500 and 1600",
        "SELECT * FROM artifact_media WHERE datebegin >= 1500 AND dateend <= 1600"
    ),
    canned!(
        10,
        NoMedia,
        "Artifacts with no media",
        "SELECT * FROM artifact_media WHERE mediacount = 0"
    ),
    // Colors
    canned!(
        11,
        DistinctHues,
        "Distinct hues",
        "SELECT DISTINCT hue FROM artifact_colors"
    ),
    canned!(
        12,
        TopColors,
        "Top 5 most used colors",
        "SELECT color, COUNT(*) AS freq FROM artifact_colors GROUP BY color ORDER BY freq DESC LIMIT 5"
    ),
    canned!(
        13,
        AveragePercentPerHue,
        "Average % coverage per hue",
        "SELECT hue, AVG(percent) AS avg_percent FROM artifact_colors GROUP BY hue"
    ),
    QueryDescriptor {
        number: 14,
        key: QueryKey::ColorsForArtifact,
        label: "Colors for artifact ID",
        params: &[QueryParam::ObjectId],
        sql: "SELECT * FROM artifact_colors WHERE objectid = ?1 ORDER BY id",
    },
    canned!(
        15,
        TotalColorEntries,
        "Total number of color entries",
        "SELECT COUNT(*) AS total_colors FROM artifact_colors"
    ),
    // Joins
    canned!(
        16,
        ByzantineTitlesAndHues,
        "Artifact titles & hues (Byzantine culture)",
        "SELECT m.title, c.hue FROM artifact_metadata m JOIN artifact_colors c ON m.id = c.objectid WHERE m.culture = 'Byzantine'"
    ),
    canned!(
        17,
        TitlesWithHues,
        "Each artifact title with hues",
        "SELECT m.title, c.hue FROM artifact_metadata m JOIN artifact_colors c ON m.id = c.objectid"
    ),
    canned!(
        18,
        RanksWherePeriodKnown,
        "Titles, cultures, ranks where period not null",
        "SELECT m.title, m.culture, media.rankk FROM artifact_metadata m JOIN artifact_media media ON m.id = media.objectid WHERE NULLIF(m.period, '') IS NOT NULL"
    ),
    canned!(
        19,
        TopRankedGrey,
        "Top 10 ranked artifacts with hue Grey",
        "SELECT m.title, media.rankk FROM artifact_metadata m JOIN artifact_media media ON m.id = media.objectid JOIN artifact_colors c ON m.id = c.objectid WHERE c.hue = 'Grey' ORDER BY media.rankk LIMIT 10"
    ),
    canned!(
        20,
        ClassificationMediaStats,
        "Artifacts per classification & avg media count",
        "SELECT m.classification, COUNT(*) AS total, AVG(media.mediacount) AS avg_media FROM artifact_metadata m JOIN artifact_media media ON m.id = media.objectid GROUP BY m.classification"
    ),
    // Exploratory
    canned!(
        21,
        CommonMediums,
        "Most common mediums",
        "SELECT medium, COUNT(*) AS freq FROM artifact_metadata WHERE NULLIF(medium, '') IS NOT NULL GROUP BY medium ORDER BY freq DESC LIMIT 5"
    ),
    canned!(
        22,
        DepartmentsSpanningCenturies,
        "Departments with artifacts spanning >500 years",
        "SELECT meta.department, MIN(m.datebegin) AS earliest, MAX(m.dateend) AS latest, MAX(m.dateend) - MIN(m.datebegin) AS span_years FROM artifact_media m JOIN artifact_metadata meta ON m.objectid = meta.id WHERE m.datebegin IS NOT NULL AND m.dateend IS NOT NULL GROUP BY meta.department HAVING MAX(m.dateend) - MIN(m.datebegin) > 500"
    ),
    canned!(
        23,
        LongestTitles,
        "Top 10 longest artifact titles",
        "SELECT id, title, LENGTH(title) AS title_length FROM artifact_metadata WHERE NULLIF(title, '') IS NOT NULL ORDER BY title_length DESC LIMIT 10"
    ),
    canned!(
        24,
        AverageColorsPerArtifact,
        "Average number of colors per artifact",
        "SELECT AVG(color_count) AS avg_colors_per_artifact FROM (SELECT objectid, COUNT(*) AS color_count FROM artifact_colors GROUP BY objectid) sub"
    ),
    canned!(
        25,
        MissingTitleOrCulture,
        "Artifacts with missing title or culture",
        "SELECT * FROM artifact_metadata WHERE NULLIF(title, '') IS NULL OR NULLIF(culture, '') IS NULL"
    ),
];

impl QueryKey {
    pub fn descriptor(self) -> &'static QueryDescriptor {
        CATALOG
            .iter()
            .find(|d| d.key == self)
            .unwrap_or(&CATALOG[0])
    }

    pub fn number(self) -> u8 {
        self.descriptor().number
    }

    pub fn label(self) -> &'static str {
        self.descriptor().label
    }

    pub fn from_number(number: u8) -> Option<Self> {
        CATALOG
            .get(usize::from(number).checked_sub(1)?)
            .map(|d| d.key)
    }

    pub fn is_parameterized(self) -> bool {
        !self.descriptor().params.is_empty()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryArgError {
    #[error("unknown query number {0} (expected 1-{max})", max = CATALOG.len())]
    UnknownQuery(u8),
    #[error("query '{0}' requires an object id")]
    MissingObjectId(&'static str),
}

/// A runnable catalog entry: either a literal statement or the typed object-id lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogQuery {
    Canned(QueryKey),
    ColorsForObject { object_id: i64 },
}

impl CatalogQuery {
    /// Pair a key with its arguments; the object id is ignored by literal entries.
    pub fn resolve(key: QueryKey, object_id: Option<i64>) -> Result<Self, QueryArgError> {
        match key {
            QueryKey::ColorsForArtifact => object_id
                .map(|object_id| Self::ColorsForObject { object_id })
                .ok_or(QueryArgError::MissingObjectId(key.label())),
            other => Ok(Self::Canned(other)),
        }
    }

    /// Resolve by display number (1-25).
    pub fn from_number(number: u8, object_id: Option<i64>) -> Result<Self, QueryArgError> {
        let key = QueryKey::from_number(number).ok_or(QueryArgError::UnknownQuery(number))?;
        Self::resolve(key, object_id)
    }

    pub fn key(&self) -> QueryKey {
        match self {
            Self::Canned(key) => *key,
            Self::ColorsForObject { .. } => QueryKey::ColorsForArtifact,
        }
    }
}

/// Tabular result: column names plus JSON-typed cells. Zero rows is a valid outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Cell by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(idx)
    }
}

/// Execute one catalog entry. Read-only.
#[instrument(skip(db))]
pub async fn run_query(db: &Db, query: &CatalogQuery) -> PipelineResult<QueryResult> {
    let descriptor = query.key().descriptor();
    let mut stmt = sqlx::query(descriptor.sql);
    if let CatalogQuery::ColorsForObject { object_id } = query {
        stmt = stmt.bind(*object_id);
    }
    let rows = stmt.fetch_all(&db.pool).await?;
    let result = to_result(&rows)?;
    debug!(
        number = descriptor.number,
        rows = result.len(),
        "query: executed"
    );
    Ok(result)
}

fn to_result(rows: &[SqliteRow]) -> Result<QueryResult, sqlx::Error> {
    let columns: Vec<String> = rows
        .first()
        .map(|r| r.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();
    let rows = rows
        .iter()
        .map(|row| {
            (0..row.len())
                .map(|idx| cell(row, idx))
                .collect::<Result<Vec<Value>, _>>()
        })
        .collect::<Result<Vec<Vec<Value>>, _>>()?;
    Ok(QueryResult { columns, rows })
}

// Storage class of the value decides the JSON type; the declared column type is ignored.
fn cell(row: &SqliteRow, idx: usize) -> Result<Value, sqlx::Error> {
    let type_name = {
        let raw = row.try_get_raw(idx)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        raw.type_info().name().to_ascii_uppercase()
    };
    let value = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => Value::from(row.try_get_unchecked::<i64, _>(idx)?),
        "REAL" | "NUMERIC" => {
            let f = row.try_get_unchecked::<f64, _>(idx)?;
            serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null)
        }
        "BLOB" => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(idx)?;
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => Value::String(row.try_get_unchecked::<String, _>(idx)?),
    };
    Ok(value)
}

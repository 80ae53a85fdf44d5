use serde::{Deserialize, Serialize};

use crate::database_ops::harvard::provider::RawObject;
use crate::error::{PipelineError, PipelineResult};

/// One `artifact_metadata` row. Missing strings are stored as `""`, never NULL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRow {
    pub id: i64,
    pub title: String,
    pub culture: String,
    pub period: String,
    pub century: String,
    pub medium: String,
    pub dimensions: String,
    pub description: String,
    pub department: String,
    pub classification: String,
    pub accessionyear: Option<i64>,
    pub accessionmethod: String,
}

/// One `artifact_media` row. `rank` lands in the `rankk` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRow {
    pub objectid: i64,
    pub imagecount: i64,
    pub mediacount: i64,
    pub colorcount: i64,
    pub rank: i64,
    pub datebegin: Option<i64>,
    pub dateend: Option<i64>,
}

/// One `artifact_colors` row; the surrogate key is assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRow {
    pub objectid: i64,
    pub color: Option<String>,
    pub spectrum: Option<String>,
    pub hue: Option<String>,
    pub percent: Option<f64>,
    pub css3: Option<String>,
}

/// Row counts of a projected batch, as shown to the dashboard after a collect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCounts {
    pub metadata: usize,
    pub media: usize,
    pub colors: usize,
}

/// The three normalized record sets produced from one fetch.
///
/// Owned by the caller between `project` and `persist`; nothing else holds on to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectedBatch {
    pub metadata: Vec<MetadataRow>,
    pub media: Vec<MediaRow>,
    pub colors: Vec<ColorRow>,
}

impl ProjectedBatch {
    pub fn counts(&self) -> BatchCounts {
        BatchCounts {
            metadata: self.metadata.len(),
            media: self.media.len(),
            colors: self.colors.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty() && self.media.is_empty() && self.colors.is_empty()
    }
}

/// Split raw catalog objects into metadata, media and color rows.
///
/// Pure; order across objects is preserved in each output sequence. Fails with
/// `MalformedRecord` (and yields nothing) when any object lacks `id` or `objectid`.
pub fn project(objects: &[RawObject]) -> PipelineResult<ProjectedBatch> {
    let mut batch = ProjectedBatch {
        metadata: Vec::with_capacity(objects.len()),
        media: Vec::with_capacity(objects.len()),
        colors: Vec::new(),
    };

    for (index, obj) in objects.iter().enumerate() {
        let id = obj
            .id
            .ok_or(PipelineError::MalformedRecord { field: "id", index })?;
        let objectid = obj
            .objectid
            .ok_or(PipelineError::MalformedRecord { field: "objectid", index })?;

        batch.metadata.push(MetadataRow {
            id,
            title: text(&obj.title),
            culture: text(&obj.culture),
            period: text(&obj.period),
            century: text(&obj.century),
            medium: text(&obj.medium),
            dimensions: text(&obj.dimensions),
            description: text(&obj.description),
            department: text(&obj.department),
            classification: text(&obj.classification),
            accessionyear: obj.accessionyear,
            accessionmethod: text(&obj.accessionmethod),
        });

        batch.media.push(MediaRow {
            objectid,
            imagecount: obj.imagecount.unwrap_or(0),
            mediacount: obj.mediacount.unwrap_or(0),
            colorcount: obj.colorcount.unwrap_or(0),
            rank: obj.rank.unwrap_or(0),
            datebegin: obj.datebegin,
            dateend: obj.dateend,
        });

        batch
            .colors
            .extend(obj.colors.iter().flatten().map(|c| ColorRow {
                objectid,
                color: c.color.clone(),
                spectrum: c.spectrum.clone(),
                hue: c.hue.clone(),
                percent: c.percent,
                css3: c.css3.clone(),
            }));
    }

    Ok(batch)
}

fn text(v: &Option<String>) -> String {
    v.clone().unwrap_or_default()
}

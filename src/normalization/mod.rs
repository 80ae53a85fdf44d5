pub mod artifact;

pub use artifact::{project, BatchCounts, ColorRow, MediaRow, MetadataRow, ProjectedBatch};

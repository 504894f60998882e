pub mod load;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::{self, AttributeRange, FeatureVector, FEATURE_DIM};

pub use load::{discover_sources, load_catalog};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("Directory traversal error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Catalog is empty")]
    Empty,
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// One row of a source table, as deserialized from CSV.
/// Attribute cells may be missing; they are substituted with 0.0 when
/// the catalog is built.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackRecord {
    #[serde(rename = "name", alias = "title")]
    pub title: String,
    #[serde(default)]
    pub artists: Option<String>,
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub loudness: Option<f64>,
    pub speechiness: Option<f64>,
    pub acousticness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub liveness: Option<f64>,
    pub valence: Option<f64>,
    pub tempo: Option<f64>,
}

impl TrackRecord {
    /// Raw attributes in [`features::ATTRIBUTES`] order.
    /// Missing and non-finite cells become 0.0.
    pub fn raw_attributes(&self) -> FeatureVector {
        [
            self.danceability,
            self.energy,
            self.loudness,
            self.speechiness,
            self.acousticness,
            self.instrumentalness,
            self.liveness,
            self.valence,
            self.tempo,
        ]
        .map(|v| v.filter(|x| x.is_finite()).unwrap_or(0.0))
    }
}

/// A catalog entry.
#[derive(Debug, Clone, Serialize)]
pub struct Song {
    /// Position in the concatenated source tables. Assigned once at load.
    pub id: usize,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artists: Option<String>,
    #[serde(skip)]
    pub raw: FeatureVector,
    #[serde(skip)]
    pub features: FeatureVector,
}

/// The full, immutable song table.
#[derive(Debug)]
pub struct Catalog {
    songs: Vec<Song>,
    ranges: [AttributeRange; FEATURE_DIM],
}

impl Catalog {
    /// Build a catalog from rows in load order. Ids are row positions.
    pub fn from_records(records: Vec<TrackRecord>) -> Result<Self> {
        if records.is_empty() {
            return Err(CatalogError::Empty);
        }

        let raw: Vec<FeatureVector> = records.iter().map(TrackRecord::raw_attributes).collect();
        let ranges = features::compute_ranges(&raw);

        let songs = records
            .into_iter()
            .zip(raw)
            .enumerate()
            .map(|(id, (record, raw))| Song {
                id,
                title: record.title,
                artists: record.artists.filter(|a| !a.is_empty()),
                features: features::normalize(&raw, &ranges),
                raw,
            })
            .collect();

        Ok(Self { songs, ranges })
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&Song> {
        self.songs.get(id)
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn ranges(&self) -> &[AttributeRange; FEATURE_DIM] {
        &self.ranges
    }

    /// Normalized vectors in id order, ready for indexing.
    pub fn feature_vectors(&self) -> Vec<Vec<f64>> {
        self.songs.iter().map(|s| s.features.to_vec()).collect()
    }
}

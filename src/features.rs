/// Audio attributes used for similarity, in vector order.
/// Every feature vector in the crate uses exactly this layout.
pub const ATTRIBUTES: [&str; FEATURE_DIM] = [
    "danceability",
    "energy",
    "loudness",
    "speechiness",
    "acousticness",
    "instrumentalness",
    "liveness",
    "valence",
    "tempo",
];

/// Number of dimensions in a feature vector.
pub const FEATURE_DIM: usize = 9;

/// Raw or normalized attribute values in [`ATTRIBUTES`] order.
pub type FeatureVector = [f64; FEATURE_DIM];

/// Observed (min, max) of one attribute across the whole catalog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttributeRange {
    pub min: f64,
    pub max: f64,
}

impl AttributeRange {
    /// True when the attribute is constant across the catalog.
    pub fn is_degenerate(&self) -> bool {
        self.max == self.min
    }

    /// Min-max scale a raw value into [0, 1].
    /// Degenerate ranges map everything to 0.0.
    pub fn scale(&self, raw: f64) -> f64 {
        if self.is_degenerate() {
            return 0.0;
        }
        ((raw - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }
}

/// Scan all rows once and record the min and max of every attribute.
/// An empty input yields all-zero (degenerate) ranges.
pub fn compute_ranges(rows: &[FeatureVector]) -> [AttributeRange; FEATURE_DIM] {
    let mut ranges = [AttributeRange { min: 0.0, max: 0.0 }; FEATURE_DIM];

    let Some(first) = rows.first() else {
        return ranges;
    };
    for (d, range) in ranges.iter_mut().enumerate() {
        range.min = first[d];
        range.max = first[d];
    }

    for row in &rows[1..] {
        for (d, &val) in row.iter().enumerate() {
            // min/max, not sums: the result is independent of row order
            if val < ranges[d].min {
                ranges[d].min = val;
            }
            if val > ranges[d].max {
                ranges[d].max = val;
            }
        }
    }

    for (name, range) in ATTRIBUTES.iter().zip(ranges.iter()) {
        if range.is_degenerate() {
            log::debug!("Attribute {} is constant ({}), normalizing to 0.0", name, range.min);
        }
    }

    ranges
}

/// Map one row of raw attributes into the unit hypercube.
pub fn normalize(raw: &FeatureVector, ranges: &[AttributeRange; FEATURE_DIM]) -> FeatureVector {
    let mut out = [0.0_f64; FEATURE_DIM];
    for (d, value) in out.iter_mut().enumerate() {
        *value = ranges[d].scale(raw[d]);
    }
    out
}

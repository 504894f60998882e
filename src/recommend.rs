use std::path::Path;
use std::sync::OnceLock;

use serde::Serialize;
use thiserror::Error;

use crate::catalog::{self, Catalog, CatalogError, Song};
use crate::features::FEATURE_DIM;
use crate::index::{IndexError, VectorIndex};
use crate::resolver::{Candidate, DEFAULT_MIN_SCORE, TitleResolver};

/// Number of recommendations when the caller doesn't ask for a count.
pub const DEFAULT_COUNT: usize = 20;

/// Per-query failures. These are expected outcomes, not system faults.
#[derive(Error, Debug, PartialEq)]
pub enum RecommendError {
    #[error("Song '{query}' not found (best match scored {best_score:.1})")]
    NotFound { query: String, best_score: f64 },
    #[error("Invalid count {0}: must be at least 1")]
    InvalidCount(i64),
    #[error("Index search failed: {0}")]
    Index(#[from] IndexError),
}

/// Startup failures. The service is never published after one of these.
#[derive(Error, Debug)]
pub enum InitError {
    #[error("Failed to load catalog: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Failed to build index: {0}")]
    Index(#[from] IndexError),
    #[error("Recommendation service already initialized")]
    AlreadyInitialized,
}

/// One recommended song and its squared feature distance from the seed.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    #[serde(flatten)]
    pub song: Song,
    pub distance: f64,
}

/// Songs closest to a resolved seed, closest first. Never contains the seed.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationList {
    pub seed: Song,
    pub match_score: f64,
    pub items: Vec<Recommendation>,
}

impl RecommendationList {
    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|r| r.song.title.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Title lookup plus nearest-neighbor search over an immutable catalog.
///
/// Everything is built once in [`Recommender::new`] and only read
/// afterwards, so a shared reference can serve any number of threads.
#[derive(Debug)]
pub struct Recommender {
    catalog: Catalog,
    index: VectorIndex,
    resolver: TitleResolver,
    min_score: f64,
}

impl Recommender {
    pub fn new(catalog: Catalog) -> Result<Self, InitError> {
        let index = VectorIndex::build(FEATURE_DIM, &catalog.feature_vectors())?;
        let resolver = TitleResolver::new(&catalog);
        Ok(Self {
            catalog,
            index,
            resolver,
            min_score: DEFAULT_MIN_SCORE,
        })
    }

    /// Load the catalog from CSV sources (in order) and build the service.
    pub fn from_sources<P: AsRef<Path>>(sources: &[P]) -> Result<Self, InitError> {
        let catalog = catalog::load_catalog(sources)?;
        Self::new(catalog)
    }

    /// Override the title match threshold (default 60).
    /// Values outside 0–100 (including NaN) fall back to the default.
    pub fn with_min_score(mut self, min_score: f64) -> Self {
        if (0.0..=100.0).contains(&min_score) {
            self.min_score = min_score;
        } else {
            log::warn!("min_score {} outside 0–100, using {}", min_score, DEFAULT_MIN_SCORE);
            self.min_score = DEFAULT_MIN_SCORE;
        }
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn min_score(&self) -> f64 {
        self.min_score
    }

    /// Resolve `query` to a song and return the `count` songs with the
    /// nearest feature vectors, excluding the song itself.
    pub fn recommend(&self, query: &str, count: i64) -> Result<RecommendationList, RecommendError> {
        if count < 1 {
            return Err(RecommendError::InvalidCount(count));
        }
        let count = usize::try_from(count).unwrap_or(usize::MAX);

        let matched = self.resolver.resolve(query, self.min_score);
        let Some(seed) = matched.song_id.and_then(|id| self.catalog.get(id)) else {
            return Err(RecommendError::NotFound {
                query: query.to_string(),
                best_score: matched.score,
            });
        };

        let neighbors = self.index.search(&seed.features, count, Some(seed.id))?;

        let items = neighbors
            .into_iter()
            .filter_map(|nb| {
                self.catalog.get(nb.id).map(|song| Recommendation {
                    song: song.clone(),
                    distance: nb.distance,
                })
            })
            .collect();

        Ok(RecommendationList {
            seed: seed.clone(),
            match_score: matched.score,
            items,
        })
    }

    /// Closest titles to `query` with their scores, for "did you mean" hints.
    pub fn suggest(&self, query: &str, limit: usize) -> Vec<(Candidate, &Song)> {
        self.resolver
            .suggest(query, limit)
            .into_iter()
            .filter_map(|c| self.catalog.get(c.id).map(|song| (c, song)))
            .collect()
    }
}

static SERVICE: OnceLock<Recommender> = OnceLock::new();

/// Publish the process-wide service. Succeeds exactly once.
pub fn init(recommender: Recommender) -> Result<&'static Recommender, InitError> {
    SERVICE
        .set(recommender)
        .map_err(|_| InitError::AlreadyInitialized)?;
    SERVICE.get().ok_or(InitError::AlreadyInitialized)
}

/// The process-wide service, if [`init`] has run.
pub fn service() -> Option<&'static Recommender> {
    SERVICE.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::{make_record, make_record_with};
    use crate::index::squared_euclidean;

    fn beatles() -> Recommender {
        let catalog = Catalog::from_records(vec![
            make_record_with("Yesterday", [0.33, 0.18, -11.0, 0.03, 0.88, 0.0, 0.09, 0.31, 97.0]),
            make_record_with("Let It Be", [0.44, 0.40, -8.0, 0.03, 0.63, 0.0, 0.11, 0.41, 143.0]),
            make_record_with("Help!", [0.50, 0.82, -6.0, 0.04, 0.19, 0.0, 0.32, 0.79, 95.0]),
        ])
        .unwrap();
        Recommender::new(catalog).unwrap()
    }

    fn larger() -> Recommender {
        let records = (0..40)
            .map(|i| {
                let f = i as f64;
                make_record_with(
                    &format!("Track {}", i),
                    [
                        (f * 0.37) % 1.0,
                        (f * 0.11) % 1.0,
                        -(f % 13.0),
                        0.05,
                        (f * 0.53) % 1.0,
                        0.0,
                        (f % 4.0) / 4.0,
                        (f * 0.29) % 1.0,
                        80.0 + (f % 9.0) * 10.0,
                    ],
                )
            })
            .collect();
        Recommender::new(Catalog::from_records(records).unwrap()).unwrap()
    }

    #[test]
    fn test_recommend_exact_title() {
        let svc = beatles();
        let list = svc.recommend("yesterday", 2).unwrap();
        assert_eq!(list.seed.id, 0);
        assert_eq!(list.len(), 2);
        // Let It Be sits between Yesterday and Help! on most attributes
        let titles: Vec<&str> = list.titles().collect();
        assert_eq!(titles, vec!["Let It Be", "Help!"]);
        assert!(list.items[0].distance <= list.items[1].distance);
    }

    #[test]
    fn test_recommend_typo_resolves() {
        let svc = beatles();
        let list = svc.recommend("Yesterdayyy", 5).unwrap();
        assert_eq!(list.seed.title, "Yesterday");
        assert!(list.match_score >= 60.0);
        // only two other songs exist
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_recommend_not_found() {
        let svc = beatles();
        let err = svc.recommend("xyzxyz", 5).unwrap_err();
        match err {
            RecommendError::NotFound { query, best_score } => {
                assert_eq!(query, "xyzxyz");
                assert!(best_score < 60.0);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_recommend_invalid_count() {
        let svc = beatles();
        assert_eq!(svc.recommend("Help!", 0).unwrap_err(), RecommendError::InvalidCount(0));
        assert_eq!(svc.recommend("Help!", -3).unwrap_err(), RecommendError::InvalidCount(-3));
        // count is checked before resolution
        assert_eq!(svc.recommend("xyzxyz", 0).unwrap_err(), RecommendError::InvalidCount(0));
    }

    #[test]
    fn test_single_song_catalog() {
        let catalog = Catalog::from_records(vec![make_record("Ripple", 0.4)]).unwrap();
        let svc = Recommender::new(catalog).unwrap();
        let list = svc.recommend("ripple", 10).unwrap();
        assert_eq!(list.seed.id, 0);
        assert!(list.is_empty());
    }

    #[test]
    fn test_never_contains_seed() {
        let svc = larger();
        for i in 0..40 {
            let list = svc.recommend(&format!("Track {}", i), 39).unwrap();
            assert_eq!(list.seed.id, i);
            assert_eq!(list.len(), 39);
            assert!(list.items.iter().all(|r| r.song.id != i));
        }
    }

    #[test]
    fn test_ordering_by_distance_then_id() {
        let svc = larger();
        let list = svc.recommend("Track 7", 25).unwrap();
        let seed = list.seed.features;
        for pair in list.items.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                a.distance < b.distance || (a.distance == b.distance && a.song.id < b.song.id),
                "{:?} before {:?}",
                (a.song.id, a.distance),
                (b.song.id, b.distance)
            );
        }
        for r in &list.items {
            assert_eq!(r.distance, squared_euclidean(&seed, &r.song.features));
        }
    }

    #[test]
    fn test_deterministic() {
        let svc = larger();
        let a = svc.recommend("track 12", 15).unwrap();
        let b = svc.recommend("track 12", 15).unwrap();
        let ids_a: Vec<(usize, u64)> = a.items.iter().map(|r| (r.song.id, r.distance.to_bits())).collect();
        let ids_b: Vec<(usize, u64)> = b.items.iter().map(|r| (r.song.id, r.distance.to_bits())).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn test_duplicate_titles_seed_lowest_id() {
        let catalog = Catalog::from_records(vec![
            make_record("Intro", 0.1),
            make_record("Bertha", 0.2),
            make_record("Bertha", 0.2),
            make_record("Outro", 0.9),
        ])
        .unwrap();
        let svc = Recommender::new(catalog).unwrap();
        let list = svc.recommend("Bertha", 3).unwrap();
        assert_eq!(list.seed.id, 1);
        let ids: Vec<usize> = list.items.iter().map(|r| r.song.id).collect();
        // the other Bertha is an exact duplicate and is kept
        assert_eq!(ids, vec![2, 0, 3]);
    }

    #[test]
    fn test_concurrent_queries_match_sequential() {
        let svc = larger();
        let expected: Vec<Vec<usize>> = (0..8)
            .map(|i| {
                let list = svc.recommend(&format!("Track {}", i * 5), 10).unwrap();
                list.items.iter().map(|r| r.song.id).collect()
            })
            .collect();

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let svc = &svc;
                    s.spawn(move || {
                        let list = svc.recommend(&format!("Track {}", i * 5), 10).unwrap();
                        list.items.iter().map(|r| r.song.id).collect::<Vec<_>>()
                    })
                })
                .collect();
            for (i, h) in handles.into_iter().enumerate() {
                assert_eq!(h.join().unwrap(), expected[i]);
            }
        });
    }

    #[test]
    fn test_custom_threshold() {
        let svc = beatles().with_min_score(95.0);
        assert!(matches!(
            svc.recommend("Yesterdayyy", 2),
            Err(RecommendError::NotFound { .. })
        ));
        assert!(svc.recommend("Yesterday", 2).is_ok());
    }

    #[test]
    fn test_invalid_threshold_falls_back_to_default() {
        let catalog = Catalog::from_records(vec![
            make_record("Ripple", 0.2),
            make_record("Bertha", 0.8),
        ])
        .unwrap();
        let svc = Recommender::new(catalog).unwrap().with_min_score(f64::NAN);
        assert_eq!(svc.min_score(), DEFAULT_MIN_SCORE);
        assert!(matches!(
            svc.recommend("zzzzzzzzzz", 1),
            Err(RecommendError::NotFound { .. })
        ));

        for bad in [-1.0, 100.5, f64::INFINITY] {
            assert_eq!(beatles().with_min_score(bad).min_score(), DEFAULT_MIN_SCORE);
        }
        assert_eq!(beatles().with_min_score(0.0).min_score(), 0.0);
        assert_eq!(beatles().with_min_score(100.0).min_score(), 100.0);
    }

    #[test]
    fn test_index_error_surfaces() {
        let err: RecommendError = IndexError::DimensionMismatch {
            position: None,
            expected: FEATURE_DIM,
            found: 3,
        }
        .into();
        assert!(matches!(err, RecommendError::Index(_)));
        assert!(err.to_string().contains("expected 9, found 3"));
    }

    #[test]
    fn test_suggest() {
        let svc = beatles();
        let hints = svc.suggest("Let it bee", 2);
        assert_eq!(hints.len(), 2);
        assert_eq!(hints[0].1.title, "Let It Be");
    }

    #[test]
    fn test_global_init_once() {
        let first = init(beatles()).unwrap();
        assert_eq!(first.catalog().len(), 3);
        assert!(matches!(init(larger()), Err(InitError::AlreadyInitialized)));
        assert_eq!(service().unwrap().catalog().len(), 3);
    }
}

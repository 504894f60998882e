use rayon::prelude::*;
use serde::Serialize;

use crate::catalog::Catalog;

/// Minimum similarity for a title to count as a match.
pub const DEFAULT_MIN_SCORE: f64 = 60.0;

/// Outcome of resolving one query against the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchResult {
    /// Best-matching song, or `None` if the best score fell below the threshold.
    pub song_id: Option<usize>,
    /// Best score found, in [0, 100], whether or not it passed.
    pub score: f64,
}

/// A scored title candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candidate {
    pub id: usize,
    pub score: f64,
}

/// Case-fold and trim a title for comparison.
fn fold(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Edit-distance similarity in [0, 100]:
/// `100 * (1 - levenshtein(a, b) / max(len(a), len(b)))`, with lengths
/// counted in chars. Two empty strings are identical (100).
/// Callers are expected to fold case first; see [`TitleResolver`].
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 100.0;
    }
    let distance = strsim::levenshtein(a, b);
    100.0 * (1.0 - distance as f64 / longest as f64)
}

/// `a` is a better candidate than `b`: higher score, or same score and lower id.
fn better(a: Candidate, b: Candidate) -> Candidate {
    match a.score.total_cmp(&b.score) {
        std::cmp::Ordering::Greater => a,
        std::cmp::Ordering::Less => b,
        std::cmp::Ordering::Equal => {
            if a.id <= b.id { a } else { b }
        }
    }
}

/// Fuzzy title lookup over a fixed catalog.
///
/// Titles are case-folded once at construction; every query is scored
/// against every title (O(n·L²) for n titles of length L).
#[derive(Debug)]
pub struct TitleResolver {
    titles: Vec<String>,
}

impl TitleResolver {
    pub fn new(catalog: &Catalog) -> Self {
        let titles = catalog.songs().iter().map(|s| fold(&s.title)).collect();
        Self { titles }
    }

    fn score_all(&self, query: &str) -> impl ParallelIterator<Item = Candidate> + '_ {
        let query = fold(query);
        self.titles
            .par_iter()
            .enumerate()
            .map(move |(id, title)| Candidate {
                id,
                score: similarity_ratio(&query, title),
            })
    }

    /// Best-matching title for `query`. Ties go to the lowest id.
    /// A best score strictly below `min_score` yields `song_id: None`.
    pub fn resolve(&self, query: &str, min_score: f64) -> MatchResult {
        let best = self.score_all(query).reduce_with(better);

        let Some(best) = best else {
            return MatchResult { song_id: None, score: 0.0 };
        };

        // false for a NaN threshold, so nothing passes
        let passes = best.score >= min_score;
        if !passes {
            log::debug!(
                "No match for \"{}\": best score {:.1} below {:.1}",
                query,
                best.score,
                min_score
            );
            return MatchResult { song_id: None, score: best.score };
        }

        log::debug!("Resolved \"{}\" to id {} (score {:.1})", query, best.id, best.score);
        MatchResult { song_id: Some(best.id), score: best.score }
    }

    /// Top `limit` candidates, best first (score desc, id asc).
    pub fn suggest(&self, query: &str, limit: usize) -> Vec<Candidate> {
        if limit == 0 {
            return Vec::new();
        }
        let mut candidates: Vec<Candidate> = self.score_all(query).collect();
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
        candidates.truncate(limit);
        candidates
    }
}

//! Genre relevance scoring
//!
//! Scores each candidate against the campaign's target genres:
//! - 1.0 when any candidate tag equals a target tag (after normalization)
//! - a partial score strictly below 1.0 when tags overlap by word or are
//!   near-identical spellings
//! - 0.0 otherwise
//!
//! Output is ranked by relevance, then yield, then candidate id.

use promo_common::config::{AllocationParams, DEFAULT_PARTIAL_MATCH_CEILING};
use promo_common::Candidate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Jaro-Winkler similarity at which two differently spelled tags count as related
const FUZZY_THRESHOLD: f64 = 0.90;

/// Candidate paired with its relevance to the campaign's target genres
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreMatch {
    pub candidate: Candidate,
    /// Relevance in [0, 1]
    pub relevance: f64,
}

/// Genre matcher
pub struct GenreMatcher {
    /// Upper bound for partial matches (default 0.9)
    partial_match_ceiling: f64,
}

impl GenreMatcher {
    /// A ceiling outside (0, 1) falls back to the default so partial
    /// matches stay strictly below exact ones
    pub fn new(params: &AllocationParams) -> Self {
        let partial_match_ceiling = match params.validate() {
            Ok(()) => params.partial_match_ceiling,
            Err(e) => {
                warn!("{}; using {}", e, DEFAULT_PARTIAL_MATCH_CEILING);
                DEFAULT_PARTIAL_MATCH_CEILING
            }
        };
        Self { partial_match_ceiling }
    }

    /// Score and rank candidates against target genres
    ///
    /// Never fails; an empty candidate list yields an empty result.
    pub fn match_candidates(&self, candidates: &[Candidate], target_genres: &[String]) -> Vec<GenreMatch> {
        let targets = normalize_all(target_genres);

        let mut matches: Vec<GenreMatch> = candidates
            .iter()
            .map(|candidate| GenreMatch {
                relevance: self.score_normalized(&normalize_all(&candidate.genres), &targets),
                candidate: candidate.clone(),
            })
            .collect();

        matches.sort_by(rank_order);

        debug!(
            candidates = matches.len(),
            exact = matches.iter().filter(|m| m.relevance >= 1.0).count(),
            partial = matches
                .iter()
                .filter(|m| m.relevance > 0.0 && m.relevance < 1.0)
                .count(),
            "Ranked candidates by genre"
        );

        matches
    }

    /// Relevance of one tag set against target genres, in [0, 1]
    pub fn relevance(&self, genres: &[String], target_genres: &[String]) -> f64 {
        self.score_normalized(&normalize_all(genres), &normalize_all(target_genres))
    }

    fn score_normalized(&self, genres: &BTreeSet<String>, targets: &BTreeSet<String>) -> f64 {
        if genres.is_empty() || targets.is_empty() {
            return 0.0;
        }
        if genres.iter().any(|g| targets.contains(g)) {
            return 1.0;
        }

        let best = genres
            .iter()
            .flat_map(|g| targets.iter().map(move |t| tag_similarity(g, t)))
            .fold(0.0_f64, f64::max);

        best * self.partial_match_ceiling
    }
}

impl Default for GenreMatcher {
    fn default() -> Self {
        Self::new(&AllocationParams::default())
    }
}

/// Canonical form of a genre tag: lowercase, `-`/`_` as spaces, single-spaced
pub fn normalize_genre(tag: &str) -> String {
    tag.to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_all(tags: &[String]) -> BTreeSet<String> {
    tags.iter()
        .map(|t| normalize_genre(t))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Similarity of two distinct normalized tags, in [0, 1]
///
/// Word-set Jaccard ("indie pop" vs "pop" = 0.5), or Jaro-Winkler when the
/// spellings are near-identical ("pops" vs "pop").
fn tag_similarity(a: &str, b: &str) -> f64 {
    let words_a: BTreeSet<&str> = a.split(' ').collect();
    let words_b: BTreeSet<&str> = b.split(' ').collect();
    let shared = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();
    let jaccard = if union == 0 { 0.0 } else { shared as f64 / union as f64 };

    let spelling = strsim::jaro_winkler(a, b);
    let fuzzy = if spelling >= FUZZY_THRESHOLD { spelling } else { 0.0 };

    // Reordered word sets ("pop rock" vs "rock pop") score 1.0 here; the
    // partial ceiling keeps them below an exact match.
    jaccard.max(fuzzy)
}

/// Relevance desc, yield desc, id asc
fn rank_order(a: &GenreMatch, b: &GenreMatch) -> Ordering {
    b.relevance
        .total_cmp(&a.relevance)
        .then_with(|| b.candidate.avg_daily_yield.total_cmp(&a.candidate.avg_daily_yield))
        .then_with(|| a.candidate.id.cmp(&b.candidate.id))
}

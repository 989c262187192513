//! # Promo Allocation Engine
//!
//! Pure, stateless computation behind campaign configuration:
//! - [`genre_matcher`]: relevance of each playlist/creator to the target genres
//! - [`allocator`]: greedy distribution of a stream/view goal under vendor caps
//! - [`projection`]: projected totals, coverage and constraint validation
//! - [`planner`]: the three steps in one call, plus manual overrides
//!
//! Nothing here performs I/O. Candidates and caps come from a
//! [`promo_common::store::RecordStore`] owned by the caller.

pub mod allocator;
pub mod genre_matcher;
pub mod planner;
pub mod projection;

pub use allocator::Allocator;
pub use genre_matcher::{GenreMatch, GenreMatcher};
pub use planner::{CampaignPlan, CampaignRequest, Planner};
pub use projection::{ProjectionResult, ValidationError, ValidationReport};

use promo_common::config::AllocationParams;
use promo_common::{Allocation, Candidate, VendorCaps};

/// Rank candidates against target genres with default tunables
pub fn match_genres(candidates: &[Candidate], target_genres: &[String]) -> Vec<GenreMatch> {
    GenreMatcher::default().match_candidates(candidates, target_genres)
}

/// Allocate `goal` over `ranked` with the given tunables
pub fn allocate(
    ranked: &[GenreMatch],
    goal: i64,
    vendor_caps: &VendorCaps,
    duration_days: u32,
    params: &AllocationParams,
) -> Vec<Allocation> {
    Allocator::new(params).allocate(ranked, goal, vendor_caps, duration_days)
}

/// [`allocate`] with default tunables
pub fn allocate_default(
    ranked: &[GenreMatch],
    goal: i64,
    vendor_caps: &VendorCaps,
    duration_days: u32,
) -> Vec<Allocation> {
    Allocator::default().allocate(ranked, goal, vendor_caps, duration_days)
}

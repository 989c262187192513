//! Greedy stream allocation
//!
//! Walks the ranked candidate list once, giving each candidate
//! `min(remaining goal, its own yield estimate, its vendor's remaining capacity)`
//! until the goal is met or the list runs out.
//!
//! Vendors with an unset (0 or missing) daily cap are unlimited under the
//! default [`ZeroCapPolicy::Unlimited`]. This is a business policy, not a
//! missing-data fallback.
//!
//! Small vendor leftovers are not proposed: when a vendor's remaining capacity
//! cuts a candidate below its minimum allocation (`min_daily_allocation ×
//! duration`, capped by the candidate's own estimate) while the goal could
//! still absorb that minimum, the candidate is skipped.

use promo_common::config::AllocationParams;
use promo_common::{Allocation, CandidateId, VendorCaps, VendorId, ZeroCapPolicy};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::genre_matcher::GenreMatch;

/// Why a ranked candidate received nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Inactive,
    Duplicate,
    NoYield,
    VendorExhausted,
    BelowMinimum,
}

/// Greedy allocator
pub struct Allocator {
    min_daily_allocation: u64,
    zero_cap_policy: ZeroCapPolicy,
}

impl Allocator {
    pub fn new(params: &AllocationParams) -> Self {
        Self {
            min_daily_allocation: params.min_daily_allocation,
            zero_cap_policy: params.zero_cap_policy,
        }
    }

    /// Distribute `goal` across `ranked` in order
    ///
    /// Deterministic for fixed inputs. Never fails: a goal ≤ 0 or an empty
    /// ranked list yields no allocations. Candidates that receive nothing are
    /// omitted.
    pub fn allocate(
        &self,
        ranked: &[GenreMatch],
        goal: i64,
        vendor_caps: &VendorCaps,
        duration_days: u32,
    ) -> Vec<Allocation> {
        let mut allocations = Vec::new();
        if goal <= 0 || ranked.is_empty() {
            return allocations;
        }

        let mut remaining = goal;
        let mut vendor_used: HashMap<&VendorId, i64> = HashMap::new();
        let mut seen: HashSet<&CandidateId> = HashSet::new();
        let mut skipped = 0usize;

        for entry in ranked {
            if remaining <= 0 {
                break;
            }
            let candidate = &entry.candidate;
            let used = vendor_used.get(&candidate.vendor_id).copied().unwrap_or(0);
            let limit = vendor_caps.limit(&candidate.vendor_id, duration_days, self.zero_cap_policy);

            let amount = match self.propose(entry, remaining, limit.remaining(used), duration_days, &mut seen) {
                Ok(amount) => amount,
                Err(reason) => {
                    debug!(candidate = %candidate.id, ?reason, "Candidate skipped");
                    skipped += 1;
                    continue;
                }
            };

            remaining -= amount;
            *vendor_used.entry(&candidate.vendor_id).or_insert(0) += amount;
            allocations.push(Allocation::new(
                candidate.id.clone(),
                candidate.vendor_id.clone(),
                amount,
            ));
        }

        debug!(
            goal,
            duration_days,
            allocated = goal - remaining,
            candidates = allocations.len(),
            skipped,
            "Allocation pass complete"
        );

        allocations
    }

    fn propose<'a>(
        &self,
        entry: &'a GenreMatch,
        remaining_goal: i64,
        vendor_remaining: i64,
        duration_days: u32,
        seen: &mut HashSet<&'a CandidateId>,
    ) -> Result<i64, SkipReason> {
        let candidate = &entry.candidate;
        if !candidate.active {
            return Err(SkipReason::Inactive);
        }
        if !seen.insert(&candidate.id) {
            return Err(SkipReason::Duplicate);
        }

        let estimate = candidate.yield_estimate(duration_days);
        if estimate <= 0 {
            return Err(SkipReason::NoYield);
        }
        if vendor_remaining <= 0 {
            return Err(SkipReason::VendorExhausted);
        }

        let amount = remaining_goal.min(estimate).min(vendor_remaining);

        let floor = self.minimum_allocation(estimate, duration_days);
        let vendor_limited = vendor_remaining < remaining_goal.min(estimate);
        if vendor_limited && amount < floor && remaining_goal >= floor {
            return Err(SkipReason::BelowMinimum);
        }

        Ok(amount)
    }

    /// `min_daily_allocation × duration`, capped by the candidate's estimate
    pub fn minimum_allocation(&self, estimate: i64, duration_days: u32) -> i64 {
        let floor = self.min_daily_allocation.saturating_mul(u64::from(duration_days));
        i64::try_from(floor).unwrap_or(i64::MAX).min(estimate)
    }
}

impl Default for Allocator {
    fn default() -> Self {
        Self::new(&AllocationParams::default())
    }
}

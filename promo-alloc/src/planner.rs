//! Campaign planning: rank → allocate → project → validate
//!
//! The planner holds configuration only. Every call takes a fresh snapshot of
//! candidates and caps and returns a new plan.

use promo_common::config::AllocationParams;
use promo_common::{Allocation, Campaign, Candidate, CandidateId, Error, Result, VendorCaps};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::allocator::Allocator;
use crate::genre_matcher::{GenreMatch, GenreMatcher};
use crate::projection::{self, ProjectionResult, ValidationReport};

/// Parameters collected for a campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignRequest {
    pub name: String,
    /// Total streams/views to deliver over the campaign
    pub goal: i64,
    pub budget: f64,
    pub duration_days: u32,
    pub target_genres: Vec<String>,
    /// Price per 1000 streams/views; enables the budget check when set
    #[serde(default)]
    pub cost_per_thousand: Option<f64>,
}

/// Ranked pool, chosen allocations and their projection/validation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignPlan {
    pub request: CampaignRequest,
    pub ranked: Vec<GenreMatch>,
    pub allocations: Vec<Allocation>,
    pub projection: ProjectionResult,
    pub validation: ValidationReport,
}

impl CampaignPlan {
    pub fn is_valid(&self) -> bool {
        self.validation.is_valid
    }

    /// Projected spend at the request's cost per thousand, if one was given
    pub fn projected_cost(&self) -> Option<f64> {
        self.request
            .cost_per_thousand
            .map(|cpm| projection::projected_cost(self.projection.total_amount, cpm))
    }

    /// Build the record handed to the record store
    ///
    /// # Errors
    /// Returns `Error::InvalidInput` if the plan has validation errors
    pub fn into_campaign(self) -> Result<Campaign> {
        if !self.validation.is_valid {
            let reasons: Vec<String> = self.validation.errors.iter().map(|e| e.to_string()).collect();
            return Err(Error::InvalidInput(format!(
                "Campaign '{}' has {} validation error(s): {}",
                self.request.name,
                reasons.len(),
                reasons.join("; ")
            )));
        }

        Ok(Campaign::new(
            self.request.name,
            self.request.goal,
            self.request.budget,
            self.request.duration_days,
            self.allocations,
        ))
    }
}

/// Planner
pub struct Planner {
    params: AllocationParams,
    matcher: GenreMatcher,
    allocator: Allocator,
}

impl Planner {
    pub fn new(params: AllocationParams) -> Self {
        Self {
            matcher: GenreMatcher::new(&params),
            allocator: Allocator::new(&params),
            params,
        }
    }

    /// Rank the pool, allocate the goal and validate the result
    pub fn plan(&self, request: &CampaignRequest, candidates: &[Candidate], vendor_caps: &VendorCaps) -> CampaignPlan {
        let ranked = self.matcher.match_candidates(candidates, &request.target_genres);
        let allocations = self
            .allocator
            .allocate(&ranked, request.goal, vendor_caps, request.duration_days);

        let plan = self.evaluate(request.clone(), ranked, allocations, candidates, vendor_caps);

        info!(
            campaign = %request.name,
            goal = request.goal,
            allocated = plan.projection.total_amount,
            coverage_pct = %format!("{:.1}", plan.projection.coverage_percent()),
            valid = plan.validation.is_valid,
            "Campaign plan computed"
        );

        plan
    }

    /// Replace one candidate's amount and recompute projection and validation
    ///
    /// An amount of 0 removes the allocation. A candidate not yet allocated is
    /// appended with its own vendor.
    ///
    /// # Errors
    /// Returns `Error::NotFound` if the candidate is neither allocated nor in `candidates`
    pub fn apply_override(
        &self,
        plan: CampaignPlan,
        candidate_id: &CandidateId,
        amount: i64,
        candidates: &[Candidate],
        vendor_caps: &VendorCaps,
    ) -> Result<CampaignPlan> {
        let CampaignPlan {
            request,
            ranked,
            mut allocations,
            ..
        } = plan;

        match allocations.iter().position(|a| &a.candidate_id == candidate_id) {
            Some(index) if amount == 0 => {
                allocations.remove(index);
            }
            Some(index) => {
                allocations[index].amount = amount;
            }
            None if amount == 0 => {}
            None => {
                let candidate = candidates
                    .iter()
                    .find(|c| &c.id == candidate_id)
                    .ok_or_else(|| Error::NotFound(format!("Candidate {}", candidate_id)))?;
                allocations.push(Allocation::new(
                    candidate.id.clone(),
                    candidate.vendor_id.clone(),
                    amount,
                ));
            }
        }

        debug!(candidate = %candidate_id, amount, "Manual override applied");

        Ok(self.evaluate(request, ranked, allocations, candidates, vendor_caps))
    }

    fn evaluate(
        &self,
        request: CampaignRequest,
        ranked: Vec<GenreMatch>,
        allocations: Vec<Allocation>,
        candidates: &[Candidate],
        vendor_caps: &VendorCaps,
    ) -> CampaignPlan {
        let projection = projection::project(&allocations, request.goal);
        let validation = match request.cost_per_thousand {
            Some(cpm) => projection::validate_with_budget(
                &allocations,
                vendor_caps,
                candidates,
                request.duration_days,
                self.params.zero_cap_policy,
                request.budget,
                cpm,
            ),
            None => projection::validate(
                &allocations,
                vendor_caps,
                candidates,
                request.duration_days,
                self.params.zero_cap_policy,
            ),
        };

        CampaignPlan {
            request,
            ranked,
            allocations,
            projection,
            validation,
        }
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::new(AllocationParams::default())
    }
}

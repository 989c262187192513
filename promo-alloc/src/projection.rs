//! Projection and validation of an allocation set
//!
//! Both are pure folds over the allocations. Validation collects every
//! violation instead of stopping at the first, since all of them are shown to
//! the operator at once.

use promo_common::models::VendorLimit;
use promo_common::{Allocation, Candidate, CandidateId, VendorCaps, VendorId, ZeroCapPolicy};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

/// Aggregate projected output of an allocation set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionResult {
    pub total_amount: i64,
    pub per_vendor: BTreeMap<VendorId, i64>,
    /// `total_amount / goal`, 0.0 when the goal is not positive
    pub coverage: f64,
}

impl ProjectionResult {
    pub fn coverage_percent(&self) -> f64 {
        self.coverage * 100.0
    }
}

/// A single constraint violation
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("Allocation references unknown candidate {candidate}")]
    UnknownCandidate { candidate: CandidateId },

    #[error("Allocation for {candidate} has negative amount {amount}")]
    NegativeAmount { candidate: CandidateId, amount: i64 },

    #[error("Candidate {candidate} is allocated more than once")]
    DuplicateCandidate { candidate: CandidateId },

    #[error("Allocation for {candidate} names vendor {claimed} but the candidate belongs to {actual}")]
    VendorMismatch {
        candidate: CandidateId,
        claimed: VendorId,
        actual: VendorId,
    },

    #[error("Vendor {vendor} cap exceeded: {allocated} > {cap}")]
    VendorCapExceeded { vendor: VendorId, allocated: i64, cap: i64 },

    #[error("Vendor {vendor} has no cap set and uncapped vendors are blocked ({allocated} allocated)")]
    VendorBlocked { vendor: VendorId, allocated: i64 },

    #[error("Projected cost {projected_cost:.2} exceeds budget {budget:.2}")]
    BudgetExceeded { projected_cost: f64, budget: f64 },
}

/// Outcome of validating an allocation set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn from_errors(errors: Vec<ValidationError>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Sum allocations overall and per vendor
pub fn project(allocations: &[Allocation], goal: i64) -> ProjectionResult {
    let mut per_vendor: BTreeMap<VendorId, i64> = BTreeMap::new();
    let mut total_amount: i64 = 0;

    for allocation in allocations {
        total_amount = total_amount.saturating_add(allocation.amount);
        let vendor_total = per_vendor.entry(allocation.vendor_id.clone()).or_insert(0);
        *vendor_total = vendor_total.saturating_add(allocation.amount);
    }

    let coverage = if goal > 0 {
        total_amount as f64 / goal as f64
    } else {
        0.0
    };

    ProjectionResult {
        total_amount,
        per_vendor,
        coverage,
    }
}

/// Check an allocation set against the candidate pool and vendor caps
///
/// Per-allocation errors come first in allocation order, then vendor errors in
/// vendor id order.
pub fn validate(
    allocations: &[Allocation],
    vendor_caps: &VendorCaps,
    candidates: &[Candidate],
    duration_days: u32,
    policy: ZeroCapPolicy,
) -> ValidationReport {
    let known: HashMap<&CandidateId, &Candidate> = candidates.iter().map(|c| (&c.id, c)).collect();
    let mut seen: HashSet<&CandidateId> = HashSet::new();
    let mut reported_duplicate: HashSet<&CandidateId> = HashSet::new();
    let mut vendor_totals: BTreeMap<&VendorId, i64> = BTreeMap::new();
    let mut errors = Vec::new();

    for allocation in allocations {
        let id = &allocation.candidate_id;

        match known.get(id) {
            None => errors.push(ValidationError::UnknownCandidate { candidate: id.clone() }),
            Some(candidate) if candidate.vendor_id != allocation.vendor_id => {
                errors.push(ValidationError::VendorMismatch {
                    candidate: id.clone(),
                    claimed: allocation.vendor_id.clone(),
                    actual: candidate.vendor_id.clone(),
                })
            }
            Some(_) => {}
        }

        if allocation.amount < 0 {
            errors.push(ValidationError::NegativeAmount {
                candidate: id.clone(),
                amount: allocation.amount,
            });
        }

        if !seen.insert(id) && reported_duplicate.insert(id) {
            errors.push(ValidationError::DuplicateCandidate { candidate: id.clone() });
        }

        // Negative amounts are reported above and must not offset real load
        let total = vendor_totals.entry(&allocation.vendor_id).or_insert(0);
        *total = total.saturating_add(allocation.amount.max(0));
    }

    for (vendor, allocated) in vendor_totals {
        match vendor_caps.limit(vendor, duration_days, policy) {
            VendorLimit::Finite(cap) if allocated > cap => {
                errors.push(ValidationError::VendorCapExceeded {
                    vendor: vendor.clone(),
                    allocated,
                    cap,
                });
            }
            VendorLimit::Blocked if allocated > 0 => {
                errors.push(ValidationError::VendorBlocked {
                    vendor: vendor.clone(),
                    allocated,
                });
            }
            _ => {}
        }
    }

    ValidationReport::from_errors(errors)
}

/// Cost of delivering `total_amount` at `cost_per_thousand`
pub fn projected_cost(total_amount: i64, cost_per_thousand: f64) -> f64 {
    total_amount.max(0) as f64 / 1000.0 * cost_per_thousand
}

/// Budget check; `None` when the projected cost fits
pub fn validate_budget(allocations: &[Allocation], budget: f64, cost_per_thousand: f64) -> Option<ValidationError> {
    let total: i64 = allocations
        .iter()
        .fold(0i64, |acc, a| acc.saturating_add(a.amount.max(0)));
    let cost = projected_cost(total, cost_per_thousand);

    // Cent tolerance for float accumulation
    if cost > budget + 0.005 {
        Some(ValidationError::BudgetExceeded {
            projected_cost: cost,
            budget,
        })
    } else {
        None
    }
}

/// [`validate`] plus the budget check, reported last
pub fn validate_with_budget(
    allocations: &[Allocation],
    vendor_caps: &VendorCaps,
    candidates: &[Candidate],
    duration_days: u32,
    policy: ZeroCapPolicy,
    budget: f64,
    cost_per_thousand: f64,
) -> ValidationReport {
    let mut errors = validate(allocations, vendor_caps, candidates, duration_days, policy).errors;
    errors.extend(validate_budget(allocations, budget, cost_per_thousand));
    ValidationReport::from_errors(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> Vec<Candidate> {
        vec![
            Candidate::new("A", "V1", &["pop"], 100.0),
            Candidate::new("B", "V1", &["pop"], 100.0),
            Candidate::new("C", "V2", &["rock"], 100.0),
        ]
    }

    #[test]
    fn test_project_sums_and_groups() {
        let allocations = vec![
            Allocation::new("A", "V1", 600),
            Allocation::new("B", "V1", 400),
            Allocation::new("C", "V2", 1000),
        ];
        let projection = project(&allocations, 4000);
        assert_eq!(projection.total_amount, 2000);
        assert_eq!(projection.per_vendor.get(&VendorId::from("V1")), Some(&1000));
        assert_eq!(projection.per_vendor.get(&VendorId::from("V2")), Some(&1000));
        assert!((projection.coverage - 0.5).abs() < 1e-12);
        assert!((projection.coverage_percent() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_project_empty_and_zero_goal() {
        let projection = project(&[], 1000);
        assert_eq!(projection.total_amount, 0);
        assert!(projection.per_vendor.is_empty());
        assert_eq!(projection.coverage, 0.0);

        let projection = project(&[Allocation::new("A", "V1", 10)], 0);
        assert_eq!(projection.coverage, 0.0);
    }

    #[test]
    fn test_validate_vendor_cap_exceeded_once() {
        // Daily cap 100 over 10 days = 1000
        let caps = VendorCaps::new().with_cap("V1", 100);
        let allocations = vec![Allocation::new("A", "V1", 600), Allocation::new("B", "V1", 600)];

        let report = validate(&allocations, &caps, &pool(), 10, ZeroCapPolicy::Unlimited);
        assert!(!report.is_valid);
        assert_eq!(
            report.errors,
            vec![ValidationError::VendorCapExceeded {
                vendor: VendorId::from("V1"),
                allocated: 1200,
                cap: 1000,
            }]
        );
        assert!(report.errors[0].to_string().contains("1200 > 1000"));
    }

    #[test]
    fn test_validate_reports_every_violation() {
        let caps = VendorCaps::new().with_cap("V1", 10);
        let allocations = vec![
            Allocation::new("ghost", "V9", 10),
            Allocation::new("A", "V1", -5),
            Allocation::new("B", "V1", 500),
            Allocation::new("B", "V1", 1),
            Allocation::new("C", "V1", 1),
        ];

        let report = validate(&allocations, &caps, &pool(), 10, ZeroCapPolicy::Unlimited);
        assert!(!report.is_valid);
        assert_eq!(
            report.errors,
            vec![
                ValidationError::UnknownCandidate { candidate: "ghost".into() },
                ValidationError::NegativeAmount { candidate: "A".into(), amount: -5 },
                ValidationError::DuplicateCandidate { candidate: "B".into() },
                ValidationError::VendorMismatch {
                    candidate: "C".into(),
                    claimed: "V1".into(),
                    actual: "V2".into(),
                },
                ValidationError::VendorCapExceeded {
                    vendor: "V1".into(),
                    allocated: 502,
                    cap: 100,
                },
            ]
        );
    }

    #[test]
    fn test_validate_uncapped_vendor_follows_policy() {
        let allocations = vec![Allocation::new("C", "V2", 1_000_000)];
        let caps = VendorCaps::new();

        let report = validate(&allocations, &caps, &pool(), 30, ZeroCapPolicy::Unlimited);
        assert!(report.is_valid);

        let report = validate(&allocations, &caps, &pool(), 30, ZeroCapPolicy::Blocked);
        assert_eq!(
            report.errors,
            vec![ValidationError::VendorBlocked {
                vendor: "V2".into(),
                allocated: 1_000_000,
            }]
        );
    }

    #[test]
    fn test_validate_empty_is_valid() {
        let report = validate(&[], &VendorCaps::new(), &[], 30, ZeroCapPolicy::Unlimited);
        assert!(report.is_valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_budget_check() {
        let allocations = vec![Allocation::new("A", "V1", 20000)];
        // 20 × 2.50 = 50.00
        assert!((projected_cost(20000, 2.5) - 50.0).abs() < 1e-9);
        assert_eq!(validate_budget(&allocations, 50.0, 2.5), None);
        assert_eq!(
            validate_budget(&allocations, 49.0, 2.5),
            Some(ValidationError::BudgetExceeded {
                projected_cost: 50.0,
                budget: 49.0,
            })
        );
    }

    #[test]
    fn test_validate_with_budget_appends_last() {
        let caps = VendorCaps::new().with_cap("V1", 10);
        let allocations = vec![Allocation::new("A", "V1", 500)];
        let report = validate_with_budget(&allocations, &caps, &pool(), 10, ZeroCapPolicy::Unlimited, 1.0, 10.0);
        assert_eq!(report.errors.len(), 2);
        assert!(matches!(report.errors[0], ValidationError::VendorCapExceeded { .. }));
        assert!(matches!(report.errors[1], ValidationError::BudgetExceeded { .. }));
    }
}

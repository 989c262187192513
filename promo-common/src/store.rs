//! Record store contract
//!
//! The allocation engine never fetches or persists anything itself. Callers
//! obtain candidates and vendor caps through a [`RecordStore`] and hand the
//! final [`Campaign`] back to it.

use crate::models::{Campaign, Candidate, CandidateRecord, VendorCaps, VendorRecord};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Candidate query filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CandidateFilter {
    pub active_only: bool,
}

impl CandidateFilter {
    pub fn active_only() -> Self {
        Self { active_only: true }
    }

    fn accepts(&self, candidate: &Candidate) -> bool {
        !self.active_only || candidate.active
    }
}

/// Generic CRUD backend owning candidates, vendor caps and campaigns
pub trait RecordStore {
    /// Fetch candidates matching the filter, in store order
    fn fetch_candidates(&self, filter: CandidateFilter) -> Result<Vec<Candidate>>;

    /// Fetch daily caps per vendor (0 = unset)
    fn fetch_vendor_caps(&self) -> Result<VendorCaps>;

    /// Persist a campaign, returning its id
    fn persist_campaign(&mut self, campaign: &Campaign) -> Result<Uuid>;
}

/// Store holding everything in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    candidates: Vec<Candidate>,
    vendor_caps: VendorCaps,
    campaigns: Vec<Campaign>,
}

impl InMemoryStore {
    pub fn new(candidates: Vec<Candidate>, vendor_caps: VendorCaps) -> Self {
        Self {
            candidates,
            vendor_caps,
            campaigns: Vec::new(),
        }
    }

    /// Campaigns persisted so far, oldest first
    pub fn campaigns(&self) -> &[Campaign] {
        &self.campaigns
    }

    /// Campaign ids are unique within a store
    fn check_new_campaign(&self, campaign: &Campaign) -> Result<()> {
        if self.campaigns.iter().any(|c| c.id == campaign.id) {
            return Err(Error::InvalidInput(format!(
                "Campaign {} already persisted",
                campaign.id
            )));
        }
        Ok(())
    }
}

impl RecordStore for InMemoryStore {
    fn fetch_candidates(&self, filter: CandidateFilter) -> Result<Vec<Candidate>> {
        Ok(self
            .candidates
            .iter()
            .filter(|c| filter.accepts(c))
            .cloned()
            .collect())
    }

    fn fetch_vendor_caps(&self) -> Result<VendorCaps> {
        Ok(self.vendor_caps.clone())
    }

    fn persist_campaign(&mut self, campaign: &Campaign) -> Result<Uuid> {
        self.check_new_campaign(campaign)?;
        self.campaigns.push(campaign.clone());
        Ok(campaign.id)
    }
}

/// On-disk snapshot layout: raw rows as exported from the record store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub candidates: Vec<CandidateRecord>,
    #[serde(default)]
    pub vendors: Vec<VendorRecord>,
}

/// Store backed by a JSON snapshot file
///
/// Rows are validated once on open; malformed rows are skipped with a
/// warning. Persisted campaigns are appended as JSON lines to `campaign_log`.
#[derive(Debug)]
pub struct JsonSnapshotStore {
    inner: InMemoryStore,
    campaign_log: Option<PathBuf>,
    rejected_rows: usize,
}

impl JsonSnapshotStore {
    /// Open a snapshot file; `campaign_log` is where campaigns get appended
    pub fn open(snapshot_path: &Path, campaign_log: Option<PathBuf>) -> Result<Self> {
        if !snapshot_path.exists() {
            return Err(Error::NotFound(format!(
                "Snapshot file {}",
                snapshot_path.display()
            )));
        }
        let content = std::fs::read_to_string(snapshot_path)?;
        let snapshot: Snapshot = serde_json::from_str(&content)?;
        let store = Self::from_snapshot(snapshot, campaign_log);

        info!(
            "Loaded snapshot {}: {} candidates, {} vendors, {} rows rejected",
            snapshot_path.display(),
            store.inner.candidates.len(),
            store.inner.vendor_caps.len(),
            store.rejected_rows
        );
        Ok(store)
    }

    /// Validate raw rows into the typed model
    pub fn from_snapshot(snapshot: Snapshot, campaign_log: Option<PathBuf>) -> Self {
        let mut rejected_rows = 0;

        let mut candidates = Vec::with_capacity(snapshot.candidates.len());
        for record in snapshot.candidates {
            match Candidate::try_from(record) {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => {
                    warn!("Skipping candidate row: {}", e);
                    rejected_rows += 1;
                }
            }
        }

        let mut vendor_caps = VendorCaps::new();
        for record in snapshot.vendors {
            match record.into_cap() {
                Ok((vendor_id, cap)) => vendor_caps.insert(vendor_id, cap),
                Err(e) => {
                    warn!("Skipping vendor row: {}", e);
                    rejected_rows += 1;
                }
            }
        }

        Self {
            inner: InMemoryStore::new(candidates, vendor_caps),
            campaign_log,
            rejected_rows,
        }
    }

    /// Number of snapshot rows that failed boundary validation
    pub fn rejected_rows(&self) -> usize {
        self.rejected_rows
    }
}

impl RecordStore for JsonSnapshotStore {
    fn fetch_candidates(&self, filter: CandidateFilter) -> Result<Vec<Candidate>> {
        self.inner.fetch_candidates(filter)
    }

    fn fetch_vendor_caps(&self) -> Result<VendorCaps> {
        self.inner.fetch_vendor_caps()
    }

    fn persist_campaign(&mut self, campaign: &Campaign) -> Result<Uuid> {
        self.inner.check_new_campaign(campaign)?;
        if let Some(path) = &self.campaign_log {
            let line = serde_json::to_string(campaign)?;
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            writeln!(file, "{}", line)?;
            debug!("Appended campaign {} to {}", campaign.id, path.display());
        }
        self.inner.persist_campaign(campaign)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryStore {
        InMemoryStore::new(
            vec![
                Candidate::new("A", "V1", &["pop"], 1000.0),
                Candidate::new("B", "V1", &["rock"], 2000.0).inactive(),
            ],
            VendorCaps::new().with_cap("V1", 1500),
        )
    }

    #[test]
    fn test_active_only_filter() {
        let store = store();
        assert_eq!(store.fetch_candidates(CandidateFilter::default()).unwrap().len(), 2);

        let active = store.fetch_candidates(CandidateFilter::active_only()).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id.as_str(), "A");
    }

    #[test]
    fn test_persist_rejects_duplicate_id() {
        let mut store = store();
        let campaign = Campaign::new("c", 1000, 10.0, 5, vec![]);
        assert_eq!(store.persist_campaign(&campaign).unwrap(), campaign.id);
        assert!(store.persist_campaign(&campaign).is_err());
        assert_eq!(store.campaigns().len(), 1);
    }
}

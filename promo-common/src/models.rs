//! Typed data model shared by the allocation engine and its callers
//!
//! Record-store rows arrive as loosely typed JSON ([`CandidateRecord`],
//! [`VendorRecord`]). They are validated into [`Candidate`] and [`VendorCaps`]
//! at the boundary so the engine only ever sees well-formed values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::{time, uuid_utils, Error, Result};

/// Declares a string-backed identifier newtype
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(&self.0)
            }
        }
    };
}

string_id! {
    /// Playlist or creator identifier
    CandidateId
}

string_id! {
    /// Vendor (playlist curator / creator account) identifier
    VendorId
}

/// Promotion channel a candidate belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Spotify,
    Instagram,
    SoundCloud,
    YouTube,
}

impl Platform {
    /// Parse platform from a record-store string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "spotify" => Some(Platform::Spotify),
            "instagram" | "ig" => Some(Platform::Instagram),
            "soundcloud" => Some(Platform::SoundCloud),
            "youtube" | "yt" => Some(Platform::YouTube),
            _ => None,
        }
    }

    /// Name of the yield metric for this channel, used in reports
    pub fn yield_unit(&self) -> &'static str {
        match self {
            Platform::Spotify | Platform::SoundCloud => "streams",
            Platform::Instagram | Platform::YouTube => "views",
        }
    }
}

/// A playlist or creator eligible for part of a campaign's goal
///
/// Immutable input to a single allocation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub vendor_id: VendorId,
    #[serde(default)]
    pub platform: Platform,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    /// Average daily streams (or median daily views for video/social channels)
    pub avg_daily_yield: f64,
    /// Follower / subscriber count when known
    #[serde(default)]
    pub audience_size: Option<u64>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Candidate {
    /// Create an active Spotify candidate with the given genres and daily yield
    pub fn new(
        id: impl Into<CandidateId>,
        vendor_id: impl Into<VendorId>,
        genres: &[&str],
        avg_daily_yield: f64,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.0.clone(),
            id,
            vendor_id: vendor_id.into(),
            platform: Platform::Spotify,
            genres: genres.iter().map(|g| g.to_string()).collect(),
            avg_daily_yield,
            audience_size: None,
            active: true,
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_audience(mut self, audience_size: u64) -> Self {
        self.audience_size = Some(audience_size);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Expected total yield over the campaign: `avg_daily_yield × duration_days`, floored
    ///
    /// Negative or non-finite yields estimate to 0.
    pub fn yield_estimate(&self, duration_days: u32) -> i64 {
        let daily = if self.avg_daily_yield.is_finite() {
            self.avg_daily_yield.max(0.0)
        } else {
            0.0
        };
        // `as` saturates at i64::MAX
        (daily * f64::from(duration_days)).floor() as i64
    }
}

/// How a vendor with no cap (missing entry or daily cap 0) is treated
///
/// Treating unset caps as unlimited is a business policy, not a missing-data
/// fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroCapPolicy {
    /// Unset cap means the vendor can absorb any amount
    #[default]
    Unlimited,
    /// Unset cap means the vendor receives nothing
    Blocked,
}

impl ZeroCapPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "unlimited" => Some(ZeroCapPolicy::Unlimited),
            "blocked" => Some(ZeroCapPolicy::Blocked),
            _ => None,
        }
    }
}

/// Effective ceiling for a vendor over a campaign
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorLimit {
    Unlimited,
    Finite(i64),
    Blocked,
}

impl VendorLimit {
    /// Capacity still available after `used` has been allocated
    pub fn remaining(&self, used: i64) -> i64 {
        match self {
            VendorLimit::Unlimited => i64::MAX,
            VendorLimit::Finite(cap) => (cap - used).max(0),
            VendorLimit::Blocked => 0,
        }
    }
}

/// Daily cap per vendor; 0 or absent means "unset"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VendorCaps(BTreeMap<VendorId, u64>);

impl VendorCaps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a daily cap
    pub fn with_cap(mut self, vendor_id: impl Into<VendorId>, daily_cap: u64) -> Self {
        self.insert(vendor_id, daily_cap);
        self
    }

    pub fn insert(&mut self, vendor_id: impl Into<VendorId>, daily_cap: u64) {
        self.0.insert(vendor_id.into(), daily_cap);
    }

    /// Daily cap when set (non-zero)
    pub fn daily_cap(&self, vendor_id: &VendorId) -> Option<u64> {
        self.0.get(vendor_id).copied().filter(|cap| *cap > 0)
    }

    /// Ceiling over the whole campaign: `daily cap × duration_days`
    pub fn limit(&self, vendor_id: &VendorId, duration_days: u32, policy: ZeroCapPolicy) -> VendorLimit {
        match self.daily_cap(vendor_id) {
            Some(daily) => {
                let total = daily.saturating_mul(u64::from(duration_days));
                VendorLimit::Finite(i64::try_from(total).unwrap_or(i64::MAX))
            }
            None => match policy {
                ZeroCapPolicy::Unlimited => VendorLimit::Unlimited,
                ZeroCapPolicy::Blocked => VendorLimit::Blocked,
            },
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Portion of a campaign goal assigned to one candidate
///
/// `amount` is a total over the campaign duration. The allocator only emits
/// positive amounts; manual overrides may carry anything and are checked by
/// validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub candidate_id: CandidateId,
    pub vendor_id: VendorId,
    pub amount: i64,
}

impl Allocation {
    pub fn new(candidate_id: impl Into<CandidateId>, vendor_id: impl Into<VendorId>, amount: i64) -> Self {
        Self {
            candidate_id: candidate_id.into(),
            vendor_id: vendor_id.into(),
            amount,
        }
    }
}

/// Persisted campaign record handed to the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    pub goal: i64,
    pub budget: f64,
    pub duration_days: u32,
    pub chosen_allocations: Vec<Allocation>,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    /// Stamp a new campaign with a fresh id and the current time
    pub fn new(
        name: impl Into<String>,
        goal: i64,
        budget: f64,
        duration_days: u32,
        chosen_allocations: Vec<Allocation>,
    ) -> Self {
        Self {
            id: uuid_utils::generate(),
            name: name.into(),
            goal,
            budget,
            duration_days,
            chosen_allocations,
            created_at: time::now(),
        }
    }
}

// ============================================================================
// Boundary records
// ============================================================================

/// Candidate row as stored in the record store (every field optional)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: Option<String>,
    #[serde(alias = "vendor")]
    pub vendor_id: Option<String>,
    pub platform: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub genres: Option<Vec<String>>,
    #[serde(alias = "avg_daily_streams", alias = "median_views")]
    pub avg_daily_yield: Option<f64>,
    #[serde(alias = "follower_count")]
    pub audience_size: Option<u64>,
    #[serde(alias = "is_active")]
    pub active: Option<bool>,
}

impl TryFrom<CandidateRecord> for Candidate {
    type Error = Error;

    fn try_from(record: CandidateRecord) -> Result<Self> {
        let id = non_empty(record.id, "candidate id")?;
        let vendor_id = non_empty(record.vendor_id, &format!("vendor for candidate {}", id))?;

        let platform = match record.platform.as_deref() {
            None => Platform::default(),
            Some(raw) => Platform::parse(raw).ok_or_else(|| {
                Error::InvalidInput(format!("Unknown platform '{}' for candidate {}", raw, id))
            })?,
        };

        let avg_daily_yield = record
            .avg_daily_yield
            .ok_or_else(|| Error::InvalidInput(format!("Missing yield for candidate {}", id)))?;
        if !avg_daily_yield.is_finite() || avg_daily_yield < 0.0 {
            return Err(Error::InvalidInput(format!(
                "Yield out of range for candidate {}: {}",
                id, avg_daily_yield
            )));
        }

        let genres = record
            .genres
            .unwrap_or_default()
            .into_iter()
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect();

        Ok(Candidate {
            name: record.name.unwrap_or_else(|| id.clone()),
            id: CandidateId(id),
            vendor_id: VendorId(vendor_id),
            platform,
            genres,
            avg_daily_yield,
            audience_size: record.audience_size,
            active: record.active.unwrap_or(true),
        })
    }
}

/// Vendor row as stored in the record store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VendorRecord {
    pub id: Option<String>,
    #[serde(alias = "max_daily_streams", alias = "daily_cap")]
    pub max_daily_yield: Option<f64>,
}

impl VendorRecord {
    /// Validate into `(vendor, daily cap)`; a missing cap becomes 0 (unset)
    pub fn into_cap(self) -> Result<(VendorId, u64)> {
        let id = non_empty(self.id, "vendor id")?;
        let cap = match self.max_daily_yield {
            None => 0,
            Some(v) if v.is_finite() && v >= 0.0 => v.floor() as u64,
            Some(v) => {
                return Err(Error::InvalidInput(format!(
                    "Daily cap out of range for vendor {}: {}",
                    id, v
                )))
            }
        };
        Ok((VendorId(id), cap))
    }
}

fn non_empty(value: Option<String>, what: &str) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::InvalidInput(format!("Missing {}", what))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yield_estimate_floors_product() {
        let c = Candidate::new("A", "V1", &["pop"], 333.7);
        assert_eq!(c.yield_estimate(3), 1001);
        assert_eq!(c.yield_estimate(0), 0);
    }

    #[test]
    fn test_yield_estimate_rejects_garbage() {
        assert_eq!(Candidate::new("A", "V1", &[], -5.0).yield_estimate(10), 0);
        assert_eq!(Candidate::new("A", "V1", &[], f64::NAN).yield_estimate(10), 0);
    }

    #[test]
    fn test_vendor_limit_multiplies_daily_cap() {
        let caps = VendorCaps::new().with_cap("V1", 1500);
        assert_eq!(
            caps.limit(&"V1".into(), 30, ZeroCapPolicy::Unlimited),
            VendorLimit::Finite(45000)
        );
    }

    #[test]
    fn test_zero_and_missing_caps_follow_policy() {
        let caps = VendorCaps::new().with_cap("V0", 0);
        for vendor in ["V0", "missing"] {
            let id = VendorId::from(vendor);
            assert_eq!(caps.limit(&id, 10, ZeroCapPolicy::Unlimited), VendorLimit::Unlimited);
            assert_eq!(caps.limit(&id, 10, ZeroCapPolicy::Blocked), VendorLimit::Blocked);
        }
    }

    #[test]
    fn test_vendor_limit_remaining() {
        assert_eq!(VendorLimit::Finite(1000).remaining(600), 400);
        assert_eq!(VendorLimit::Finite(1000).remaining(1200), 0);
        assert_eq!(VendorLimit::Unlimited.remaining(1_000_000), i64::MAX);
        assert_eq!(VendorLimit::Blocked.remaining(0), 0);
    }

    #[test]
    fn test_platform_parse() {
        assert_eq!(Platform::parse("YouTube"), Some(Platform::YouTube));
        assert_eq!(Platform::parse(" soundcloud "), Some(Platform::SoundCloud));
        assert_eq!(Platform::parse("ig"), Some(Platform::Instagram));
        assert_eq!(Platform::parse("myspace"), None);
        assert_eq!(Platform::YouTube.yield_unit(), "views");
        assert_eq!(serde_json::to_string(&Platform::SoundCloud).unwrap(), "\"soundcloud\"");
    }

    #[test]
    fn test_candidate_builders() {
        let c = Candidate::new("yt-1", "channel-1", &["edm"], 900.0)
            .with_platform(Platform::YouTube)
            .with_audience(120_000);
        assert_eq!(c.platform, Platform::YouTube);
        assert_eq!(c.audience_size, Some(120_000));
        assert!(c.active);
        assert!(!c.inactive().active);
    }

    #[test]
    fn test_id_display_respects_padding() {
        assert_eq!(format!("[{:<4}]", CandidateId::from("A")), "[A   ]");
    }

    #[test]
    fn test_candidate_record_conversion() {
        let record: CandidateRecord = serde_json::from_value(serde_json::json!({
            "id": "pl-1",
            "vendor": "curator-9",
            "platform": "Spotify",
            "genres": ["Pop", "  ", "indie pop"],
            "avg_daily_streams": 1250.0,
            "follower_count": 40000
        }))
        .unwrap();

        let candidate = Candidate::try_from(record).unwrap();
        assert_eq!(candidate.id, CandidateId::from("pl-1"));
        assert_eq!(candidate.vendor_id, VendorId::from("curator-9"));
        assert_eq!(candidate.genres, vec!["Pop".to_string(), "indie pop".to_string()]);
        assert_eq!(candidate.audience_size, Some(40000));
        assert!(candidate.active);
        assert_eq!(candidate.name, "pl-1");
    }

    #[test]
    fn test_candidate_record_rejects_malformed_rows() {
        let missing_vendor = CandidateRecord {
            id: Some("pl-1".into()),
            avg_daily_yield: Some(10.0),
            ..Default::default()
        };
        assert!(matches!(Candidate::try_from(missing_vendor), Err(Error::InvalidInput(_))));

        let negative_yield = CandidateRecord {
            id: Some("pl-1".into()),
            vendor_id: Some("v".into()),
            avg_daily_yield: Some(-1.0),
            ..Default::default()
        };
        assert!(Candidate::try_from(negative_yield).is_err());

        let bad_platform = CandidateRecord {
            id: Some("pl-1".into()),
            vendor_id: Some("v".into()),
            platform: Some("myspace".into()),
            avg_daily_yield: Some(1.0),
            ..Default::default()
        };
        assert!(Candidate::try_from(bad_platform).is_err());
    }

    #[test]
    fn test_vendor_record_into_cap() {
        let record = VendorRecord { id: Some("V1".into()), max_daily_yield: Some(1500.9) };
        assert_eq!(record.into_cap().unwrap(), (VendorId::from("V1"), 1500));

        let unset = VendorRecord { id: Some("V2".into()), max_daily_yield: None };
        assert_eq!(unset.into_cap().unwrap().1, 0);

        let negative = VendorRecord { id: Some("V3".into()), max_daily_yield: Some(-1.0) };
        assert!(negative.into_cap().is_err());
    }

    #[test]
    fn test_campaign_new_stamps_id_and_time() {
        let a = Campaign::new("Spring push", 50000, 1200.0, 30, vec![]);
        let b = Campaign::new("Spring push", 50000, 1200.0, 30, vec![]);
        assert_ne!(a.id, b.id);
        assert!(b.created_at >= a.created_at);
    }
}

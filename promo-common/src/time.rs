//! Clock access for campaign timestamps

use chrono::{DateTime, Utc};

/// Current time, used to stamp `Campaign::created_at`
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

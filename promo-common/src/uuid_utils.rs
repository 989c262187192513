//! UUID utilities

use uuid::Uuid;

/// Generate a new UUIDv4 for a campaign record
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

//! Prefixed ID generation.
//!
//! IDs are a `prefix_` followed by a UUIDv7, so they sort by creation time
//! and are identifiable by type when reading logs.

use uuid::Uuid;

fn prefixed_id(prefix: &str) -> String {
    let id = Uuid::now_v7();
    format!("{}_{}", prefix, id.as_simple())
}

/// Generate an operation ID: `op_<uuid7>`
pub fn operation_id() -> String {
    prefixed_id("op")
}

/// Generate a device session ID: `dev_<uuid7>`
pub fn device_id() -> String {
    prefixed_id("dev")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_have_correct_prefix() {
        assert!(operation_id().starts_with("op_"));
        assert!(device_id().starts_with("dev_"));
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(operation_id(), operation_id());
    }
}

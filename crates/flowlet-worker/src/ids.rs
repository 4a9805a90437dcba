//! Run and child-workflow identifier generation
//!
//! The dispatch surface constrains identifier format, so ids are lower-cased
//! with underscores stripped. Uniqueness is best-effort via the UUID
//! component; ids are used for observability and routing, never as a
//! data-dependency key.
//!
//! Ids are drawn at workflow construction, which is non-deterministic. The
//! in-memory engine never replays, so this is safe here; a replaying
//! backend would have to supply ids through an engine-provided hook (its
//! side-effect-capture facility) instead of calling this directly.

use uuid::Uuid;

/// Build an identifier of the form `<prefix>-<uuid>`.
pub fn scoped_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::now_v7())
        .to_lowercase()
        .replace('_', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_preserved() {
        let id = scoped_id("agent-loop");
        assert!(id.starts_with("agent-loop-"));
    }

    #[test]
    fn test_format_constraints() {
        let id = scoped_id("child-My_Item");
        assert_eq!(id, id.to_lowercase());
        assert!(!id.contains('_'));
        assert!(id.starts_with("child-myitem-"));
    }

    #[test]
    fn test_ids_differ_per_call() {
        assert_ne!(scoped_id("run"), scoped_id("run"));
    }
}

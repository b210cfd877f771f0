//! Core identifier types shared by the sync and read paths.

/// InternalId: assigned by the repository on first insert, never 0
pub type InternalId = u64;

/// Parent external id carried by traversal roots
pub const ROOT_PARENT: &str = "0";

/// Whether a declared parent external id means "no parent".
///
/// The remote API and older stored records use `0`, empty strings and blanks
/// interchangeably.
pub fn is_root_parent(parent_external_id: &str) -> bool {
    let trimmed = parent_external_id.trim();
    trimmed.is_empty() || trimmed == ROOT_PARENT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_parent_sentinels() {
        assert!(is_root_parent(""));
        assert!(is_root_parent("  "));
        assert!(is_root_parent("0"));
        assert!(is_root_parent(" 0 "));
        assert!(!is_root_parent("00"));
        assert!(!is_root_parent("17"));
    }
}

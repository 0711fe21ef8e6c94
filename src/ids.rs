use uuid::Uuid;

pub const ORGANIZATION_ID_PREFIX: &str = "org";
pub const DOCUMENT_ID_PREFIX: &str = "doc";
pub const TAG_ID_PREFIX: &str = "tag";
pub const TAGGING_RULE_ID_PREFIX: &str = "tr";
pub const TAGGING_RULE_CONDITION_ID_PREFIX: &str = "trc";
pub const TAGGING_RULE_ACTION_ID_PREFIX: &str = "tra";
pub const INTAKE_EMAIL_ID_PREFIX: &str = "ie";

/// Generates a prefixed, collision-resistant identifier such as
/// `doc_6f3b2a…`. Ids are immutable once assigned to a row.
pub fn generate_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::generate_id;

    #[test]
    fn ids_carry_their_prefix() {
        let id = generate_id("doc");
        assert!(id.starts_with("doc_"));
        assert_eq!(id.len(), "doc_".len() + 32);
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(generate_id("tag"), generate_id("tag"));
    }
}

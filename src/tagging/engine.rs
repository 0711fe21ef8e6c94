use std::collections::BTreeSet;

use chrono::Utc;
use diesel::result::DatabaseErrorKind;
use diesel::result::Error as DieselError;
use diesel::sqlite::SqliteConnection;
use tracing::{info, warn};

use crate::error::AppResult;
use crate::models::{Document, TaggingRuleCondition};
use crate::tagging::conditions::{condition_matches, ConditionField, ConditionOperator};
use crate::tagging::repository::{self, RuleWithDetails};

/// What a rule evaluation pass did to one document.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TaggingOutcome {
    pub rules_matched: usize,
    pub tags_requested: usize,
    pub tags_applied: usize,
}

/// Evaluates every enabled rule of the document's organization and applies
/// the tags of the matching ones. Tag application is idempotent and
/// per-tag isolated: one failing tag never blocks the others, and a rerun
/// applies only what is still missing.
pub fn apply_tagging_rules(
    conn: &mut SqliteConnection,
    document: &Document,
) -> AppResult<TaggingOutcome> {
    let rules = repository::list_enabled_rules(conn, &document.organization_id)?;

    let mut outcome = TaggingOutcome::default();
    // BTreeSet both dedups tags requested by several rules and keeps the
    // application order stable.
    let mut requested: BTreeSet<String> = BTreeSet::new();

    for rule in &rules {
        if rule_matches(rule, document) {
            outcome.rules_matched += 1;
            requested.extend(rule.tag_ids.iter().cloned());
        }
    }

    outcome.tags_requested = requested.len();
    let now = Utc::now().naive_utc();
    for tag_id in requested {
        match repository::add_tag_to_document(conn, &document.id, &tag_id, now) {
            Ok(_) => outcome.tags_applied += 1,
            // Already on the document, most likely applied by hand or by an
            // earlier run.
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {}
            Err(err) => {
                warn!(
                    document_id = %document.id,
                    tag_id = %tag_id,
                    error = %err,
                    "failed to apply tag from rule"
                );
            }
        }
    }

    if outcome.rules_matched > 0 {
        info!(
            document_id = %document.id,
            rules_matched = outcome.rules_matched,
            tags_applied = outcome.tags_applied,
            "tagging rules applied"
        );
    }
    Ok(outcome)
}

/// A rule matches when every condition holds. A rule without conditions
/// matches every document.
fn rule_matches(rule: &RuleWithDetails, document: &Document) -> bool {
    rule.conditions
        .iter()
        .all(|condition| evaluate_condition(condition, document))
}

fn evaluate_condition(condition: &TaggingRuleCondition, document: &Document) -> bool {
    let field: ConditionField = match condition.field.parse() {
        Ok(field) => field,
        Err(err) => {
            warn!(condition_id = %condition.id, error = %err, "skipping malformed condition");
            return false;
        }
    };
    let operator: ConditionOperator = match condition.operator.parse() {
        Ok(operator) => operator,
        Err(err) => {
            warn!(condition_id = %condition.id, error = %err, "skipping malformed condition");
            return false;
        }
    };

    let field_value = match field {
        ConditionField::Name => document.name.as_str(),
        ConditionField::Content => document.content.as_str(),
    };

    condition_matches(
        field_value,
        operator,
        &condition.value,
        condition.is_case_sensitive,
    )
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{TaggingRule, TaggingRuleCondition};

    fn document(name: &str, content: &str) -> Document {
        let now = Utc::now().naive_utc();
        Document {
            id: "doc_test".into(),
            organization_id: "org_test".into(),
            name: name.into(),
            original_name: name.into(),
            mime_type: "text/plain".into(),
            size: content.len() as i64,
            storage_key: "org_test/originals/doc_test.txt".into(),
            content: content.into(),
            created_by: None,
            is_deleted: false,
            deleted_at: None,
            deleted_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn rule(conditions: Vec<TaggingRuleCondition>) -> RuleWithDetails {
        let now = Utc::now().naive_utc();
        RuleWithDetails {
            rule: TaggingRule {
                id: "tr_test".into(),
                organization_id: "org_test".into(),
                name: "test rule".into(),
                description: None,
                enabled: true,
                created_at: now,
                updated_at: now,
            },
            conditions,
            tag_ids: vec!["tag_test".into()],
        }
    }

    fn condition(field: &str, operator: &str, value: &str, case_sensitive: bool) -> TaggingRuleCondition {
        TaggingRuleCondition {
            id: "trc_test".into(),
            rule_id: "tr_test".into(),
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
            is_case_sensitive: case_sensitive,
            position: 0,
        }
    }

    #[test]
    fn empty_rule_matches_everything() {
        assert!(rule_matches(&rule(vec![]), &document("anything.bin", "")));
    }

    #[test]
    fn all_conditions_must_hold() {
        let two = rule(vec![
            condition("name", "starts_with", "invoice", false),
            condition("content", "contains", "total due", false),
        ]);
        assert!(rule_matches(&two, &document("Invoice-42.pdf", "Total due: 12 EUR")));
        assert!(!rule_matches(&two, &document("Invoice-42.pdf", "nothing owed")));
    }

    #[test]
    fn malformed_condition_fails_its_rule_only() {
        let broken = rule(vec![condition("size", "contains", "x", false)]);
        assert!(!rule_matches(&broken, &document("anything.txt", "x")));

        let healthy = rule(vec![condition("name", "ends_with", ".txt", false)]);
        assert!(rule_matches(&healthy, &document("anything.txt", "x")));
    }

    #[test]
    fn unknown_operator_never_matches() {
        let broken = rule(vec![condition("name", "matches_regex", ".*", false)]);
        assert!(!rule_matches(&broken, &document("anything.txt", "")));
    }
}

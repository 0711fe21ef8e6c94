use std::collections::HashMap;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::ids::{
    generate_id, TAGGING_RULE_ACTION_ID_PREFIX, TAGGING_RULE_CONDITION_ID_PREFIX,
};
use crate::models::{
    NewDocumentTag, NewTag, NewTaggingRule, NewTaggingRuleAction, NewTaggingRuleCondition, Tag,
    TaggingRule, TaggingRuleAction, TaggingRuleCondition,
};
use crate::schema::{document_tags, tagging_rule_actions, tagging_rule_conditions, tagging_rules, tags};

pub fn insert_tag(conn: &mut SqliteConnection, new_tag: &NewTag) -> QueryResult<Tag> {
    diesel::insert_into(tags::table).values(new_tag).execute(conn)?;
    tags::table.find(&new_tag.id).first(conn)
}

pub fn find_tag(
    conn: &mut SqliteConnection,
    organization_id: &str,
    tag_id: &str,
) -> QueryResult<Option<Tag>> {
    tags::table
        .filter(tags::id.eq(tag_id))
        .filter(tags::organization_id.eq(organization_id))
        .first(conn)
        .optional()
}

pub fn list_tags(conn: &mut SqliteConnection, organization_id: &str) -> QueryResult<Vec<Tag>> {
    tags::table
        .filter(tags::organization_id.eq(organization_id))
        .order(tags::name.asc())
        .load(conn)
}

/// Number of active documents carrying each tag of the organization.
pub fn tag_usage_counts(
    conn: &mut SqliteConnection,
    organization_id: &str,
) -> QueryResult<HashMap<String, i64>> {
    use crate::schema::documents;

    let rows: Vec<(String, i64)> = document_tags::table
        .inner_join(documents::table)
        .filter(documents::organization_id.eq(organization_id))
        .filter(documents::is_deleted.eq(false))
        .group_by(document_tags::tag_id)
        .select((document_tags::tag_id, diesel::dsl::count_star()))
        .load(conn)?;
    Ok(rows.into_iter().collect())
}

/// Attaches a tag to a document. A duplicate pair surfaces as a
/// `UniqueViolation`; callers decide whether that is a conflict (direct API
/// call) or a no-op (rule engine).
pub fn add_tag_to_document(
    conn: &mut SqliteConnection,
    document_id: &str,
    tag_id: &str,
    now: NaiveDateTime,
) -> QueryResult<usize> {
    diesel::insert_into(document_tags::table)
        .values(&NewDocumentTag {
            document_id: document_id.to_string(),
            tag_id: tag_id.to_string(),
            created_at: now,
        })
        .execute(conn)
}

pub fn remove_tag_from_document(
    conn: &mut SqliteConnection,
    document_id: &str,
    tag_id: &str,
) -> QueryResult<usize> {
    diesel::delete(
        document_tags::table
            .filter(document_tags::document_id.eq(document_id))
            .filter(document_tags::tag_id.eq(tag_id)),
    )
    .execute(conn)
}

/// Tags of the given documents, keyed by document id. Documents without tags
/// are absent from the map.
pub fn tags_for_documents(
    conn: &mut SqliteConnection,
    document_ids: &[String],
) -> QueryResult<HashMap<String, Vec<Tag>>> {
    if document_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(String, Tag)> = document_tags::table
        .inner_join(tags::table)
        .filter(document_tags::document_id.eq_any(document_ids))
        .select((document_tags::document_id, tags::all_columns))
        .load(conn)?;

    let mut by_document: HashMap<String, Vec<Tag>> = HashMap::new();
    for (document_id, tag) in rows {
        by_document.entry(document_id).or_default().push(tag);
    }
    Ok(by_document)
}

/// A rule with its ordered conditions and target tags, as the engine
/// consumes it.
#[derive(Debug, Clone)]
pub struct RuleWithDetails {
    pub rule: TaggingRule,
    pub conditions: Vec<TaggingRuleCondition>,
    pub tag_ids: Vec<String>,
}

pub struct ConditionSpec {
    pub field: String,
    pub operator: String,
    pub value: String,
    pub is_case_sensitive: bool,
}

/// Inserts a rule with its conditions and actions atomically.
pub fn insert_rule(
    conn: &mut SqliteConnection,
    new_rule: &NewTaggingRule,
    conditions: &[ConditionSpec],
    tag_ids: &[String],
) -> QueryResult<RuleWithDetails> {
    conn.transaction(|conn| {
        diesel::insert_into(tagging_rules::table)
            .values(new_rule)
            .execute(conn)?;

        for (position, condition) in conditions.iter().enumerate() {
            diesel::insert_into(tagging_rule_conditions::table)
                .values(&NewTaggingRuleCondition {
                    id: generate_id(TAGGING_RULE_CONDITION_ID_PREFIX),
                    rule_id: new_rule.id.clone(),
                    field: condition.field.clone(),
                    operator: condition.operator.clone(),
                    value: condition.value.clone(),
                    is_case_sensitive: condition.is_case_sensitive,
                    position: position as i32,
                })
                .execute(conn)?;
        }

        for tag_id in tag_ids {
            diesel::insert_into(tagging_rule_actions::table)
                .values(&NewTaggingRuleAction {
                    id: generate_id(TAGGING_RULE_ACTION_ID_PREFIX),
                    rule_id: new_rule.id.clone(),
                    tag_id: tag_id.clone(),
                })
                .execute(conn)?;
        }

        find_rule(conn, &new_rule.organization_id, &new_rule.id)?
            .ok_or(diesel::result::Error::NotFound)
    })
}

pub fn find_rule(
    conn: &mut SqliteConnection,
    organization_id: &str,
    rule_id: &str,
) -> QueryResult<Option<RuleWithDetails>> {
    let rule: Option<TaggingRule> = tagging_rules::table
        .filter(tagging_rules::id.eq(rule_id))
        .filter(tagging_rules::organization_id.eq(organization_id))
        .first(conn)
        .optional()?;
    let Some(rule) = rule else {
        return Ok(None);
    };
    let details = load_details(conn, vec![rule])?;
    Ok(details.into_iter().next())
}

pub fn list_rules(
    conn: &mut SqliteConnection,
    organization_id: &str,
) -> QueryResult<Vec<RuleWithDetails>> {
    let rules: Vec<TaggingRule> = tagging_rules::table
        .filter(tagging_rules::organization_id.eq(organization_id))
        .order(tagging_rules::created_at.asc())
        .load(conn)?;
    load_details(conn, rules)
}

/// Enabled rules of the organization, ready for evaluation.
pub fn list_enabled_rules(
    conn: &mut SqliteConnection,
    organization_id: &str,
) -> QueryResult<Vec<RuleWithDetails>> {
    let rules: Vec<TaggingRule> = tagging_rules::table
        .filter(tagging_rules::organization_id.eq(organization_id))
        .filter(tagging_rules::enabled.eq(true))
        .order(tagging_rules::created_at.asc())
        .load(conn)?;
    load_details(conn, rules)
}

fn load_details(
    conn: &mut SqliteConnection,
    rules: Vec<TaggingRule>,
) -> QueryResult<Vec<RuleWithDetails>> {
    let conditions = TaggingRuleCondition::belonging_to(&rules)
        .order(tagging_rule_conditions::position.asc())
        .load::<TaggingRuleCondition>(conn)?
        .grouped_by(&rules);
    let actions = TaggingRuleAction::belonging_to(&rules)
        .load::<TaggingRuleAction>(conn)?
        .grouped_by(&rules);

    Ok(rules
        .into_iter()
        .zip(conditions)
        .zip(actions)
        .map(|((rule, conditions), actions)| RuleWithDetails {
            rule,
            conditions,
            tag_ids: actions.into_iter().map(|action| action.tag_id).collect(),
        })
        .collect())
}

/// Deletes a rule; conditions and actions go with it via ON DELETE CASCADE.
pub fn delete_rule(
    conn: &mut SqliteConnection,
    organization_id: &str,
    rule_id: &str,
) -> QueryResult<usize> {
    diesel::delete(
        tagging_rules::table
            .filter(tagging_rules::id.eq(rule_id))
            .filter(tagging_rules::organization_id.eq(organization_id)),
    )
    .execute(conn)
}

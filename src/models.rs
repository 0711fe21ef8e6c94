use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = organizations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = organizations)]
pub struct NewOrganization {
    pub id: String,
    pub name: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = organization_members)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OrganizationMember {
    pub organization_id: String,
    pub user_id: String,
    pub role: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = organization_members)]
pub struct NewOrganizationMember {
    pub organization_id: String,
    pub user_id: String,
    pub role: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, QueryableByName, Identifiable)]
#[diesel(table_name = documents)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Document {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    pub storage_key: String,
    pub content: String,
    pub created_by: Option<String>,
    pub is_deleted: bool,
    pub deleted_at: Option<NaiveDateTime>,
    pub deleted_by: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = documents)]
pub struct NewDocument {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    pub storage_key: String,
    pub content: String,
    pub created_by: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = tags)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Tag {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub color: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = tags)]
pub struct NewTag {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub color: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Associations)]
#[diesel(table_name = document_tags)]
#[diesel(belongs_to(Document))]
#[diesel(belongs_to(Tag))]
#[diesel(primary_key(document_id, tag_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DocumentTag {
    pub document_id: String,
    pub tag_id: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = document_tags)]
pub struct NewDocumentTag {
    pub document_id: String,
    pub tag_id: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = tagging_rules)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TaggingRule {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = tagging_rules)]
pub struct NewTaggingRule {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = tagging_rule_conditions)]
#[diesel(belongs_to(TaggingRule, foreign_key = rule_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TaggingRuleCondition {
    pub id: String,
    pub rule_id: String,
    pub field: String,
    pub operator: String,
    pub value: String,
    pub is_case_sensitive: bool,
    pub position: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = tagging_rule_conditions)]
pub struct NewTaggingRuleCondition {
    pub id: String,
    pub rule_id: String,
    pub field: String,
    pub operator: String,
    pub value: String,
    pub is_case_sensitive: bool,
    pub position: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = tagging_rule_actions)]
#[diesel(belongs_to(TaggingRule, foreign_key = rule_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TaggingRuleAction {
    pub id: String,
    pub rule_id: String,
    pub tag_id: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = tagging_rule_actions)]
pub struct NewTaggingRuleAction {
    pub id: String,
    pub rule_id: String,
    pub tag_id: String,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = intake_emails)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct IntakeEmail {
    pub id: String,
    pub organization_id: String,
    pub email_address: String,
    pub is_enabled: bool,
    pub allowed_origins: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl IntakeEmail {
    /// Sender addresses permitted to trigger ingestion. An unreadable column
    /// value is treated as an empty list, which rejects every sender.
    pub fn allowed_origins(&self) -> Vec<String> {
        serde_json::from_str(&self.allowed_origins).unwrap_or_default()
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = intake_emails)]
pub struct NewIntakeEmail {
    pub id: String,
    pub organization_id: String,
    pub email_address: String,
    pub is_enabled: bool,
    pub allowed_origins: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::ids::{generate_id, TAGGING_RULE_ID_PREFIX};
use crate::models::NewTaggingRule;
use crate::organizations::ensure_member;
use crate::state::AppState;
use crate::tagging::conditions::{ConditionField, ConditionOperator};
use crate::tagging::repository::{self, ConditionSpec, RuleWithDetails};

#[derive(Deserialize)]
pub struct CreateRuleRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub conditions: Vec<ConditionPayload>,
    pub tag_ids: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Deserialize)]
pub struct ConditionPayload {
    pub field: String,
    pub operator: String,
    pub value: String,
    #[serde(default)]
    pub is_case_sensitive: bool,
}

#[derive(Serialize)]
pub struct ConditionResponse {
    pub id: String,
    pub field: String,
    pub operator: String,
    pub value: String,
    pub is_case_sensitive: bool,
}

#[derive(Serialize)]
pub struct RuleResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub conditions: Vec<ConditionResponse>,
    pub tag_ids: Vec<String>,
}

fn to_rule_response(details: RuleWithDetails) -> RuleResponse {
    RuleResponse {
        id: details.rule.id,
        name: details.rule.name,
        description: details.rule.description,
        enabled: details.rule.enabled,
        conditions: details
            .conditions
            .into_iter()
            .map(|condition| ConditionResponse {
                id: condition.id,
                field: condition.field,
                operator: condition.operator,
                value: condition.value,
                is_case_sensitive: condition.is_case_sensitive,
            })
            .collect(),
        tag_ids: details.tag_ids,
    }
}

pub async fn list_rules(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(organization_id): Path<String>,
) -> AppResult<Json<Vec<RuleResponse>>> {
    let mut conn = state.db()?;
    ensure_member(&mut conn, &organization_id, &user.user_id)?;

    let rules = repository::list_rules(&mut conn, &organization_id)?;
    Ok(Json(rules.into_iter().map(to_rule_response).collect()))
}

pub async fn create_rule(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(organization_id): Path<String>,
    Json(payload): Json<CreateRuleRequest>,
) -> AppResult<(StatusCode, Json<RuleResponse>)> {
    if payload.name.trim().is_empty() {
        return Err(AppError::bad_request("rule name must not be empty"));
    }
    if payload.tag_ids.is_empty() {
        return Err(AppError::bad_request(
            "a rule must apply at least one tag",
        ));
    }
    // Fields and operators are validated up front so a malformed rule is
    // rejected here instead of silently never matching.
    for condition in &payload.conditions {
        condition
            .field
            .parse::<ConditionField>()
            .map_err(|err| AppError::bad_request(err.to_string()))?;
        condition
            .operator
            .parse::<ConditionOperator>()
            .map_err(|err| AppError::bad_request(err.to_string()))?;
    }

    let mut conn = state.db()?;
    ensure_member(&mut conn, &organization_id, &user.user_id)?;

    for tag_id in &payload.tag_ids {
        repository::find_tag(&mut conn, &organization_id, tag_id)?
            .ok_or_else(|| AppError::not_found("tag.not_found", "tag not found"))?;
    }

    let now = Utc::now().naive_utc();
    let new_rule = NewTaggingRule {
        id: generate_id(TAGGING_RULE_ID_PREFIX),
        organization_id,
        name: payload.name.trim().to_string(),
        description: payload.description,
        enabled: payload.enabled,
        created_at: now,
        updated_at: now,
    };
    let conditions: Vec<ConditionSpec> = payload
        .conditions
        .into_iter()
        .map(|condition| ConditionSpec {
            field: condition.field,
            operator: condition.operator,
            value: condition.value,
            is_case_sensitive: condition.is_case_sensitive,
        })
        .collect();

    let details = repository::insert_rule(&mut conn, &new_rule, &conditions, &payload.tag_ids)?;
    Ok((StatusCode::CREATED, Json(to_rule_response(details))))
}

pub async fn delete_rule(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((organization_id, rule_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    ensure_member(&mut conn, &organization_id, &user.user_id)?;

    let deleted = repository::delete_rule(&mut conn, &organization_id, &rule_id)?;
    if deleted == 0 {
        return Err(AppError::not_found(
            "tagging_rule.not_found",
            "tagging rule not found",
        ));
    }
    Ok(StatusCode::NO_CONTENT)
}

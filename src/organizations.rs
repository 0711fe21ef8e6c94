use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::error::{AppError, AppResult};
use crate::models::Organization;
use crate::schema::{organization_members, organizations};

pub fn get_organization_by_id(
    conn: &mut SqliteConnection,
    organization_id: &str,
) -> QueryResult<Option<Organization>> {
    organizations::table
        .find(organization_id)
        .first(conn)
        .optional()
}

pub fn is_user_in_organization(
    conn: &mut SqliteConnection,
    organization_id: &str,
    user_id: &str,
) -> QueryResult<bool> {
    let member = organization_members::table
        .filter(organization_members::organization_id.eq(organization_id))
        .filter(organization_members::user_id.eq(user_id))
        .select(organization_members::user_id)
        .first::<String>(conn)
        .optional()?;
    Ok(member.is_some())
}

/// Shared guard for organization-scoped handlers: the organization must
/// exist and the caller must be a member.
pub fn ensure_member(
    conn: &mut SqliteConnection,
    organization_id: &str,
    user_id: &str,
) -> AppResult<()> {
    if get_organization_by_id(conn, organization_id)?.is_none() {
        return Err(AppError::not_found(
            "organization.not_found",
            "organization not found",
        ));
    }
    if !is_user_in_organization(conn, organization_id, user_id)? {
        return Err(AppError::forbidden(
            "user.not_in_organization",
            "user is not a member of this organization",
        ));
    }
    Ok(())
}

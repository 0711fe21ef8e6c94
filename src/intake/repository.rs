use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::models::{IntakeEmail, NewIntakeEmail};
use crate::schema::intake_emails;

pub fn insert_intake_email(
    conn: &mut SqliteConnection,
    new_intake_email: &NewIntakeEmail,
) -> QueryResult<IntakeEmail> {
    diesel::insert_into(intake_emails::table)
        .values(new_intake_email)
        .execute(conn)?;
    intake_emails::table.find(&new_intake_email.id).first(conn)
}

pub fn list_intake_emails(
    conn: &mut SqliteConnection,
    organization_id: &str,
) -> QueryResult<Vec<IntakeEmail>> {
    intake_emails::table
        .filter(intake_emails::organization_id.eq(organization_id))
        .order(intake_emails::created_at.asc())
        .load(conn)
}

/// Exact-match lookup by recipient address; routing never fuzzy-matches.
pub fn find_by_address(
    conn: &mut SqliteConnection,
    email_address: &str,
) -> QueryResult<Option<IntakeEmail>> {
    intake_emails::table
        .filter(intake_emails::email_address.eq(email_address))
        .first(conn)
        .optional()
}

pub fn delete_intake_email(
    conn: &mut SqliteConnection,
    organization_id: &str,
    intake_email_id: &str,
) -> QueryResult<usize> {
    diesel::delete(
        intake_emails::table
            .filter(intake_emails::id.eq(intake_email_id))
            .filter(intake_emails::organization_id.eq(organization_id)),
    )
    .execute(conn)
}

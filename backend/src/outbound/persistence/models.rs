//! Internal Diesel row structs.
//!
//! Implementation details of the persistence layer; conversions into domain
//! types live here so repositories stay thin.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::password::PasswordHash;
use crate::domain::{
    PopularUser, Project, ProjectId, ProjectSummary, Slug, TokenBalance, User, UserId, Username,
    Version,
};

use super::schema::{projects, users, versions};

/// Reasons a stored row cannot become a domain value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stored {entity} is invalid: {message}")]
pub(crate) struct RowConversionError {
    entity: &'static str,
    message: String,
}

impl RowConversionError {
    fn new(entity: &'static str, message: impl ToString) -> Self {
        Self {
            entity,
            message: message.to_string(),
        }
    }
}

fn non_negative(entity: &'static str, value: i32) -> Result<u32, RowConversionError> {
    u32::try_from(value).map_err(|_| RowConversionError::new(entity, format!("negative value {value}")))
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub tokens: i32,
    pub last_token_refill: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RowConversionError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let username =
            Username::new(row.username).map_err(|err| RowConversionError::new("user", err))?;
        let tokens = non_negative("user", row.tokens)?;
        Ok(User::new(
            UserId::from(row.id),
            username,
            PasswordHash::from_stored(row.password_hash),
            TokenBalance::new(tokens, row.last_token_refill),
            row.created_at,
        ))
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub username: &'a str,
    pub password_hash: &'a str,
    pub tokens: i32,
    pub last_token_refill: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = projects)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ProjectRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub slug: String,
    pub views: i64,
    pub pinned_version: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProjectRow> for Project {
    type Error = RowConversionError;

    fn try_from(row: ProjectRow) -> Result<Self, Self::Error> {
        let slug = Slug::parse(row.slug).map_err(|err| RowConversionError::new("project", err))?;
        let views = u64::try_from(row.views)
            .map_err(|_| RowConversionError::new("project", "negative view count"))?;
        let pinned_version = row
            .pinned_version
            .map(|number| non_negative("project", number))
            .transpose()?;
        Ok(Project {
            id: ProjectId::from(row.id),
            owner_id: UserId::from(row.user_id),
            title: row.title,
            slug,
            views,
            pinned_version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Convert a joined `(project, owner username)` row into a catalog summary.
pub(crate) fn summary_from_row(
    (row, owner): (ProjectRow, String),
) -> Result<ProjectSummary, RowConversionError> {
    let owner = Username::new(owner).map_err(|err| RowConversionError::new("user", err))?;
    let project = Project::try_from(row)?;
    Ok(ProjectSummary::from_project(&project, owner))
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = projects)]
pub(crate) struct NewProjectRow<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: &'a str,
    pub slug: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = versions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct VersionRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub version_number: i32,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<VersionRow> for Version {
    type Error = RowConversionError;

    fn try_from(row: VersionRow) -> Result<Self, Self::Error> {
        Ok(Version {
            id: row.id,
            project_id: ProjectId::from(row.project_id),
            version_number: non_negative("version", row.version_number)?,
            content: row.content,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = versions)]
pub(crate) struct NewVersionRow<'a> {
    pub id: Uuid,
    pub project_id: Uuid,
    pub version_number: i32,
    pub content: &'a str,
}

/// One row of the per-owner view aggregate.
#[derive(Debug, Clone, QueryableByName)]
pub(crate) struct PopularUserRow {
    #[diesel(sql_type = diesel::sql_types::Varchar)]
    pub username: String,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub total_views: i64,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub project_count: i64,
}

impl TryFrom<PopularUserRow> for PopularUser {
    type Error = RowConversionError;

    fn try_from(row: PopularUserRow) -> Result<Self, Self::Error> {
        let username =
            Username::new(row.username).map_err(|err| RowConversionError::new("user", err))?;
        let count = |value: i64| {
            u64::try_from(value).map_err(|_| RowConversionError::new("user", "negative aggregate"))
        };
        Ok(PopularUser {
            username,
            total_views: count(row.total_views)?,
            project_count: count(row.project_count)?,
        })
    }
}

//! PostgreSQL-backed `ProjectRepository` implementation using Diesel ORM.
//!
//! Version numbers are allocated as `max + 1` while the project row is held
//! with `SELECT ... FOR UPDATE`; the `(project_id, version_number)` unique
//! constraint backs this up. [`ProjectRepository::commit_generation`] runs
//! the debit, optional project creation and version append in one
//! transaction.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::BigInt;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{
    CommitTarget, CommittedVersion, GenerationCommit, ProjectPersistenceError, ProjectRepository,
};
use crate::domain::{
    NewProject, PopularUser, Project, ProjectId, ProjectSummary, Slug, UserId, Username, Version,
};

use super::diesel_error_mapping::{
    DieselFailure, classify_diesel_error, pool_error_message, sql_int, sql_limit,
};
use super::models::{
    NewProjectRow, NewVersionRow, PopularUserRow, ProjectRow, VersionRow, summary_from_row,
};
use super::pool::{DbPool, PoolError};
use super::schema::{projects, users, versions};

/// `SUM(bigint)` is `numeric` in PostgreSQL, hence the cast back to `int8`.
const POPULAR_USERS_SQL: &str = r#"
SELECT
    u.username,
    COALESCE(SUM(p.views), 0)::int8 AS total_views,
    COUNT(p.id) AS project_count
FROM projects p
JOIN users u ON u.id = p.user_id
GROUP BY u.username
ORDER BY total_views DESC, project_count DESC, u.username ASC
LIMIT $1
"#;

/// Diesel-backed implementation of the project repository port.
#[derive(Clone)]
pub struct DieselProjectRepository {
    pool: DbPool,
}

impl DieselProjectRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Failure inside a transaction: either Diesel's or one we raised to roll back.
enum TxError {
    Diesel(diesel::result::Error),
    Domain(ProjectPersistenceError),
}

impl From<diesel::result::Error> for TxError {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

impl From<TxError> for ProjectPersistenceError {
    fn from(error: TxError) -> Self {
        match error {
            TxError::Diesel(error) => map_diesel_error(error),
            TxError::Domain(error) => error,
        }
    }
}

fn map_pool_error(error: PoolError) -> ProjectPersistenceError {
    ProjectPersistenceError::connection(pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error) -> ProjectPersistenceError {
    match classify_diesel_error(&error) {
        DieselFailure::Connection => {
            ProjectPersistenceError::connection("database connection error")
        }
        DieselFailure::UniqueViolation => {
            ProjectPersistenceError::query("unique constraint violated")
        }
        DieselFailure::ForeignKeyViolation => ProjectPersistenceError::user_not_found(),
        DieselFailure::Query(message) => ProjectPersistenceError::query(message),
    }
}

/// Map an insert into `projects`, reporting unique violations as slug conflicts.
fn map_project_insert_error(error: diesel::result::Error, slug: &Slug) -> TxError {
    match classify_diesel_error(&error) {
        DieselFailure::UniqueViolation => {
            TxError::Domain(ProjectPersistenceError::slug_taken(slug.as_ref()))
        }
        _ => TxError::Diesel(error),
    }
}

fn conversion_error(error: impl ToString) -> ProjectPersistenceError {
    ProjectPersistenceError::query(error.to_string())
}

fn to_project(row: ProjectRow) -> Result<Project, ProjectPersistenceError> {
    Project::try_from(row).map_err(conversion_error)
}

fn to_version(row: VersionRow) -> Result<Version, ProjectPersistenceError> {
    Version::try_from(row).map_err(conversion_error)
}

fn to_summaries(rows: Vec<(ProjectRow, String)>) -> Result<Vec<ProjectSummary>, ProjectPersistenceError> {
    rows.into_iter()
        .map(|row| summary_from_row(row).map_err(conversion_error))
        .collect()
}

fn db_number(value: u32) -> Result<i32, ProjectPersistenceError> {
    sql_int(value).ok_or_else(|| ProjectPersistenceError::query(format!("{value} overflows")))
}

fn new_project_row(project: &NewProject) -> NewProjectRow<'_> {
    NewProjectRow {
        id: *project.id.as_uuid(),
        user_id: *project.owner_id.as_uuid(),
        title: project.title.as_str(),
        slug: project.slug.as_ref(),
    }
}

/// Lock the project row for the rest of the transaction.
async fn lock_project(conn: &mut AsyncPgConnection, id: Uuid) -> Result<ProjectRow, TxError> {
    projects::table
        .find(id)
        .select(ProjectRow::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()?
        .ok_or(TxError::Domain(ProjectPersistenceError::project_not_found()))
}

/// Insert the next version of a locked project and bump its `updated_at`.
async fn insert_next_version(
    conn: &mut AsyncPgConnection,
    project_id: Uuid,
    content: &str,
) -> Result<(ProjectRow, VersionRow), TxError> {
    let current: Option<i32> = versions::table
        .filter(versions::project_id.eq(project_id))
        .select(diesel::dsl::max(versions::version_number))
        .first(conn)
        .await?;
    let version = diesel::insert_into(versions::table)
        .values(&NewVersionRow {
            id: Uuid::new_v4(),
            project_id,
            version_number: current.unwrap_or(0) + 1,
            content,
        })
        .returning(VersionRow::as_returning())
        .get_result(conn)
        .await?;
    let project = diesel::update(projects::table.find(project_id))
        .set(projects::updated_at.eq(Utc::now()))
        .returning(ProjectRow::as_returning())
        .get_result(conn)
        .await?;
    Ok((project, version))
}

/// Debit `cost` tokens, rolling back with a domain error when impossible.
async fn debit(conn: &mut AsyncPgConnection, user_id: Uuid, cost: i32) -> Result<i32, TxError> {
    let remaining: Option<i32> = diesel::update(
        users::table
            .filter(users::id.eq(user_id))
            .filter(users::tokens.ge(cost)),
    )
    .set(users::tokens.eq(users::tokens - cost))
    .returning(users::tokens)
    .get_result(conn)
    .await
    .optional()?;
    if let Some(tokens) = remaining {
        return Ok(tokens);
    }

    let available: Option<i32> = users::table
        .find(user_id)
        .select(users::tokens)
        .first(conn)
        .await
        .optional()?;
    Err(TxError::Domain(match available {
        None => ProjectPersistenceError::user_not_found(),
        Some(tokens) => ProjectPersistenceError::insufficient_tokens(
            u32::try_from(tokens).unwrap_or(0),
            u32::try_from(cost).unwrap_or(0),
        ),
    }))
}

#[async_trait]
impl ProjectRepository for DieselProjectRepository {
    async fn create_project(
        &self,
        project: &NewProject,
    ) -> Result<Project, ProjectPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = diesel::insert_into(projects::table)
            .values(&new_project_row(project))
            .returning(ProjectRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|err| ProjectPersistenceError::from(map_project_insert_error(err, &project.slug)))?;
        to_project(row)
    }

    async fn find_by_id(&self, id: ProjectId) -> Result<Option<Project>, ProjectPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        projects::table
            .find(id.as_uuid())
            .select(ProjectRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .map(to_project)
            .transpose()
    }

    async fn find_by_owner_slug(
        &self,
        owner: &Username,
        slug: &Slug,
    ) -> Result<Option<Project>, ProjectPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        projects::table
            .inner_join(users::table)
            .filter(users::username.eq(owner.as_ref()))
            .filter(projects::slug.eq(slug.as_ref()))
            .select(ProjectRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .map(to_project)
            .transpose()
    }

    async fn append_version(
        &self,
        id: ProjectId,
        content: &str,
    ) -> Result<Version, ProjectPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let project_id = *id.as_uuid();
        let (_, version) = conn
            .transaction::<_, TxError, _>(|conn| {
                async move {
                    lock_project(conn, project_id).await?;
                    insert_next_version(conn, project_id, content).await
                }
                .scope_boxed()
            })
            .await?;
        to_version(version)
    }

    async fn list_versions(
        &self,
        id: ProjectId,
        limit: Option<usize>,
    ) -> Result<Vec<Version>, ProjectPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut query = versions::table
            .filter(versions::project_id.eq(id.as_uuid()))
            .order(versions::version_number.desc())
            .select(VersionRow::as_select())
            .into_boxed();
        if let Some(limit) = limit {
            query = query.limit(sql_limit(limit));
        }
        let rows: Vec<VersionRow> = query.load(&mut conn).await.map_err(map_diesel_error)?;
        rows.into_iter().map(to_version).collect()
    }

    async fn find_version(
        &self,
        id: ProjectId,
        version_number: u32,
    ) -> Result<Option<Version>, ProjectPersistenceError> {
        let Some(number) = sql_int(version_number) else {
            return Ok(None);
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        versions::table
            .filter(versions::project_id.eq(id.as_uuid()))
            .filter(versions::version_number.eq(number))
            .select(VersionRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .map(to_version)
            .transpose()
    }

    async fn set_pinned(
        &self,
        id: ProjectId,
        version_number: u32,
    ) -> Result<(), ProjectPersistenceError> {
        let Some(number) = sql_int(version_number) else {
            return Err(ProjectPersistenceError::version_not_found(version_number));
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let project_id = *id.as_uuid();
        conn.transaction::<_, TxError, _>(|conn| {
            async move {
                lock_project(conn, project_id).await?;
                let exists: Option<Uuid> = versions::table
                    .filter(versions::project_id.eq(project_id))
                    .filter(versions::version_number.eq(number))
                    .select(versions::id)
                    .first(conn)
                    .await
                    .optional()?;
                if exists.is_none() {
                    return Err(TxError::Domain(ProjectPersistenceError::version_not_found(
                        version_number,
                    )));
                }
                diesel::update(projects::table.find(project_id))
                    .set((
                        projects::pinned_version.eq(Some(number)),
                        projects::updated_at.eq(Utc::now()),
                    ))
                    .execute(conn)
                    .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(ProjectPersistenceError::from)
    }

    async fn increment_views(&self, id: ProjectId) -> Result<(), ProjectPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(projects::table.find(id.as_uuid()))
            .set(projects::views.eq(projects::views + 1_i64))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if updated == 0 {
            return Err(ProjectPersistenceError::project_not_found());
        }
        Ok(())
    }

    async fn ranked(&self, limit: usize) -> Result<Vec<ProjectSummary>, ProjectPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = projects::table
            .inner_join(users::table)
            .order((projects::views.desc(), projects::created_at.desc()))
            .limit(sql_limit(limit))
            .select((ProjectRow::as_select(), users::username))
            .load::<(ProjectRow, String)>(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        to_summaries(rows)
    }

    async fn list_by_owner(
        &self,
        owner: UserId,
    ) -> Result<Vec<ProjectSummary>, ProjectPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = projects::table
            .inner_join(users::table)
            .filter(projects::user_id.eq(owner.as_uuid()))
            .order(projects::created_at.desc())
            .select((ProjectRow::as_select(), users::username))
            .load::<(ProjectRow, String)>(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        to_summaries(rows)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ProjectSummary>, ProjectPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = projects::table
            .inner_join(users::table)
            .order(projects::created_at.desc())
            .limit(sql_limit(limit))
            .select((ProjectRow::as_select(), users::username))
            .load::<(ProjectRow, String)>(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        to_summaries(rows)
    }

    async fn popular_users(
        &self,
        limit: usize,
    ) -> Result<Vec<PopularUser>, ProjectPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = sql_query(POPULAR_USERS_SQL)
            .bind::<BigInt, _>(sql_limit(limit))
            .load::<PopularUserRow>(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter()
            .map(|row| PopularUser::try_from(row).map_err(conversion_error))
            .collect()
    }

    async fn commit_generation(
        &self,
        commit: &GenerationCommit,
    ) -> Result<CommittedVersion, ProjectPersistenceError> {
        let cost = db_number(commit.cost)?;
        let user_id = *commit.user_id.as_uuid();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let (project, version, remaining) = conn
            .transaction::<_, TxError, _>(|conn| {
                async move {
                    let remaining = debit(conn, user_id, cost).await?;
                    let project_id = match &commit.target {
                        CommitTarget::Create(new) => {
                            diesel::insert_into(projects::table)
                                .values(&new_project_row(new))
                                .execute(conn)
                                .await
                                .map_err(|err| map_project_insert_error(err, &new.slug))?;
                            *new.id.as_uuid()
                        }
                        CommitTarget::Append(id) => lock_project(conn, *id.as_uuid()).await?.id,
                    };
                    let (project, version) =
                        insert_next_version(conn, project_id, &commit.content).await?;
                    Ok((project, version, remaining))
                }
                .scope_boxed()
            })
            .await?;

        Ok(CommittedVersion {
            project: to_project(project)?,
            version: to_version(version)?,
            tokens_remaining: u32::try_from(remaining).unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn foreign_key_violations_mean_missing_user() {
        let err = ProjectPersistenceError::from(TxError::Diesel(
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::ForeignKeyViolation,
                Box::new("projects_user_id_fkey".to_owned()),
            ),
        ));
        assert_eq!(err, ProjectPersistenceError::user_not_found());
    }

    #[rstest]
    fn domain_errors_survive_rollback() {
        let err = ProjectPersistenceError::from(TxError::Domain(
            ProjectPersistenceError::insufficient_tokens(1_u32, 2_u32),
        ));
        assert!(matches!(
            err,
            ProjectPersistenceError::InsufficientTokens {
                available: 1,
                required: 2
            }
        ));
    }

    #[rstest]
    fn unique_project_inserts_report_the_slug() {
        let slug = Slug::parse("my-site").expect("valid slug");
        let err = ProjectPersistenceError::from(map_project_insert_error(
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                Box::new("projects_user_id_slug_key".to_owned()),
            ),
            &slug,
        ));
        assert_eq!(err, ProjectPersistenceError::slug_taken("my-site"));
    }
}

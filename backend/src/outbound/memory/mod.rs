//! In-memory implementation of the user and project repositories.
//!
//! Used when no database is configured and by integration tests. All state
//! sits behind one `std::sync::Mutex`, which gives the same atomicity as the
//! Diesel adapter's transactions: every port call takes the lock once and
//! never holds it across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};
use uuid::Uuid;

use crate::domain::ports::{
    CommitTarget, CommittedVersion, GenerationCommit, ProjectPersistenceError, ProjectRepository,
    UserPersistenceError, UserRepository,
};
use crate::domain::{
    NewProject, NewUser, PopularUser, Project, ProjectId, ProjectSummary, Slug, TokenBalance,
    TokenPolicy, User, UserId, Username, Version,
};

struct StoredProject {
    project: Project,
    /// Insertion order, the final ranking tiebreak.
    seq: u64,
}

#[derive(Default)]
struct StoreState {
    users: HashMap<UserId, User>,
    usernames: HashMap<String, UserId>,
    projects: HashMap<ProjectId, StoredProject>,
    /// Versions per project in ascending number order.
    versions: HashMap<ProjectId, Vec<Version>>,
    next_seq: u64,
}

impl StoreState {
    fn username_of(&self, id: UserId) -> Option<&Username> {
        self.users.get(&id).map(User::username)
    }

    fn slug_taken(&self, owner: UserId, slug: &Slug) -> bool {
        self.projects
            .values()
            .any(|stored| stored.project.owner_id == owner && stored.project.slug == *slug)
    }

    fn insert_project(&mut self, new: &NewProject, now: DateTime<Utc>) -> Project {
        let project = Project {
            id: new.id,
            owner_id: new.owner_id,
            title: new.title.clone(),
            slug: new.slug.clone(),
            views: 0,
            pinned_version: None,
            created_at: now,
            updated_at: now,
        };
        self.next_seq += 1;
        self.projects.insert(
            project.id,
            StoredProject {
                project: project.clone(),
                seq: self.next_seq,
            },
        );
        project
    }

    fn append(
        &mut self,
        id: ProjectId,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<(Project, Version), ProjectPersistenceError> {
        let stored = self
            .projects
            .get_mut(&id)
            .ok_or_else(ProjectPersistenceError::project_not_found)?;
        stored.project.updated_at = now;
        let project = stored.project.clone();

        let history = self.versions.entry(id).or_default();
        let version = Version {
            id: Uuid::new_v4(),
            project_id: id,
            version_number: history.last().map_or(1, |last| last.version_number + 1),
            content: content.to_owned(),
            created_at: now,
        };
        history.push(version.clone());
        Ok((project, version))
    }

    fn summaries<'a>(
        &self,
        projects: impl Iterator<Item = &'a StoredProject>,
    ) -> Vec<(u64, ProjectSummary)> {
        projects
            .filter_map(|stored| {
                let owner = self.username_of(stored.project.owner_id)?.clone();
                Some((stored.seq, ProjectSummary::from_project(&stored.project, owner)))
            })
            .collect()
    }
}

fn with_balance(user: &User, balance: TokenBalance) -> User {
    User::new(
        user.id(),
        user.username().clone(),
        user.password_hash().clone(),
        balance,
        user.created_at(),
    )
}

fn newest_first(mut entries: Vec<(u64, ProjectSummary)>) -> Vec<ProjectSummary> {
    entries.sort_by(|(a_seq, a), (b_seq, b)| {
        b.created_at.cmp(&a.created_at).then(b_seq.cmp(a_seq))
    });
    entries.into_iter().map(|(_, summary)| summary).collect()
}

/// Mutex-guarded store implementing [`UserRepository`] and [`ProjectRepository`].
#[derive(Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(Arc::new(DefaultClock))
    }
}

impl InMemoryStore {
    /// Create an empty store stamping records with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, user: &NewUser) -> Result<User, UserPersistenceError> {
        let mut state = self.lock();
        let key = user.username.as_ref().to_owned();
        if state.usernames.contains_key(&key) {
            return Err(UserPersistenceError::username_taken(key));
        }
        let created = User::from(user.clone());
        state.usernames.insert(key, created.id());
        state.users.insert(created.id(), created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserPersistenceError> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, UserPersistenceError> {
        let state = self.lock();
        Ok(state
            .usernames
            .get(username.as_ref())
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn apply_refill(
        &self,
        id: UserId,
        now: DateTime<Utc>,
        policy: TokenPolicy,
    ) -> Result<User, UserPersistenceError> {
        let mut state = self.lock();
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(UserPersistenceError::not_found)?;
        let balance = user.balance().refilled(&policy, now);
        if balance != user.balance() {
            *user = with_balance(user, balance);
        }
        Ok(user.clone())
    }

    async fn debit_tokens(&self, id: UserId, amount: u32) -> Result<User, UserPersistenceError> {
        let mut state = self.lock();
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(UserPersistenceError::not_found)?;
        let balance = user
            .balance()
            .debited(amount)
            .ok_or_else(|| UserPersistenceError::insufficient_tokens(user.tokens(), amount))?;
        *user = with_balance(user, balance);
        Ok(user.clone())
    }
}

#[async_trait]
impl ProjectRepository for InMemoryStore {
    async fn create_project(
        &self,
        project: &NewProject,
    ) -> Result<Project, ProjectPersistenceError> {
        let now = self.clock.utc();
        let mut state = self.lock();
        if !state.users.contains_key(&project.owner_id) {
            return Err(ProjectPersistenceError::user_not_found());
        }
        if state.slug_taken(project.owner_id, &project.slug) {
            return Err(ProjectPersistenceError::slug_taken(project.slug.as_ref()));
        }
        Ok(state.insert_project(project, now))
    }

    async fn find_by_id(&self, id: ProjectId) -> Result<Option<Project>, ProjectPersistenceError> {
        Ok(self
            .lock()
            .projects
            .get(&id)
            .map(|stored| stored.project.clone()))
    }

    async fn find_by_owner_slug(
        &self,
        owner: &Username,
        slug: &Slug,
    ) -> Result<Option<Project>, ProjectPersistenceError> {
        let state = self.lock();
        let Some(owner_id) = state.usernames.get(owner.as_ref()).copied() else {
            return Ok(None);
        };
        Ok(state
            .projects
            .values()
            .find(|stored| stored.project.owner_id == owner_id && stored.project.slug == *slug)
            .map(|stored| stored.project.clone()))
    }

    async fn append_version(
        &self,
        id: ProjectId,
        content: &str,
    ) -> Result<Version, ProjectPersistenceError> {
        let now = self.clock.utc();
        self.lock()
            .append(id, content, now)
            .map(|(_, version)| version)
    }

    async fn list_versions(
        &self,
        id: ProjectId,
        limit: Option<usize>,
    ) -> Result<Vec<Version>, ProjectPersistenceError> {
        let state = self.lock();
        let newest_first = state
            .versions
            .get(&id)
            .into_iter()
            .flat_map(|history| history.iter().rev())
            .cloned();
        Ok(match limit {
            Some(limit) => newest_first.take(limit).collect(),
            None => newest_first.collect(),
        })
    }

    async fn find_version(
        &self,
        id: ProjectId,
        version_number: u32,
    ) -> Result<Option<Version>, ProjectPersistenceError> {
        Ok(self.lock().versions.get(&id).and_then(|history| {
            history
                .iter()
                .find(|version| version.version_number == version_number)
                .cloned()
        }))
    }

    async fn set_pinned(
        &self,
        id: ProjectId,
        version_number: u32,
    ) -> Result<(), ProjectPersistenceError> {
        let now = self.clock.utc();
        let mut state = self.lock();
        if !state.projects.contains_key(&id) {
            return Err(ProjectPersistenceError::project_not_found());
        }
        let exists = state.versions.get(&id).is_some_and(|history| {
            history
                .iter()
                .any(|version| version.version_number == version_number)
        });
        if !exists {
            return Err(ProjectPersistenceError::version_not_found(version_number));
        }
        if let Some(stored) = state.projects.get_mut(&id) {
            stored.project.pinned_version = Some(version_number);
            stored.project.updated_at = now;
        }
        Ok(())
    }

    async fn increment_views(&self, id: ProjectId) -> Result<(), ProjectPersistenceError> {
        let mut state = self.lock();
        let stored = state
            .projects
            .get_mut(&id)
            .ok_or_else(ProjectPersistenceError::project_not_found)?;
        stored.project.views = stored.project.views.saturating_add(1);
        Ok(())
    }

    async fn ranked(&self, limit: usize) -> Result<Vec<ProjectSummary>, ProjectPersistenceError> {
        let state = self.lock();
        let mut entries = state.summaries(state.projects.values());
        entries.sort_by(|(a_seq, a), (b_seq, b)| {
            b.views
                .cmp(&a.views)
                .then(b.created_at.cmp(&a.created_at))
                .then(b_seq.cmp(a_seq))
        });
        Ok(entries
            .into_iter()
            .take(limit)
            .map(|(_, summary)| summary)
            .collect())
    }

    async fn list_by_owner(
        &self,
        owner: UserId,
    ) -> Result<Vec<ProjectSummary>, ProjectPersistenceError> {
        let state = self.lock();
        let entries = state.summaries(
            state
                .projects
                .values()
                .filter(|stored| stored.project.owner_id == owner),
        );
        Ok(newest_first(entries))
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ProjectSummary>, ProjectPersistenceError> {
        let state = self.lock();
        let entries = state.summaries(state.projects.values());
        Ok(newest_first(entries).into_iter().take(limit).collect())
    }

    async fn popular_users(
        &self,
        limit: usize,
    ) -> Result<Vec<PopularUser>, ProjectPersistenceError> {
        let state = self.lock();
        let mut totals: HashMap<UserId, (u64, u64)> = HashMap::new();
        for stored in state.projects.values() {
            let entry = totals.entry(stored.project.owner_id).or_default();
            entry.0 = entry.0.saturating_add(stored.project.views);
            entry.1 += 1;
        }
        let mut users: Vec<PopularUser> = totals
            .into_iter()
            .filter_map(|(owner, (total_views, project_count))| {
                Some(PopularUser {
                    username: state.username_of(owner)?.clone(),
                    total_views,
                    project_count,
                })
            })
            .collect();
        users.sort_by(|a, b| {
            b.total_views
                .cmp(&a.total_views)
                .then(b.project_count.cmp(&a.project_count))
                .then_with(|| a.username.as_ref().cmp(b.username.as_ref()))
        });
        users.truncate(limit);
        Ok(users)
    }

    async fn commit_generation(
        &self,
        commit: &GenerationCommit,
    ) -> Result<CommittedVersion, ProjectPersistenceError> {
        let now = self.clock.utc();
        let mut state = self.lock();

        let user = state
            .users
            .get(&commit.user_id)
            .ok_or_else(ProjectPersistenceError::user_not_found)?;
        let balance = user.balance().debited(commit.cost).ok_or_else(|| {
            ProjectPersistenceError::insufficient_tokens(user.tokens(), commit.cost)
        })?;
        let debited = with_balance(user, balance);
        let project_id = match &commit.target {
            CommitTarget::Create(new) => {
                if state.slug_taken(new.owner_id, &new.slug) {
                    return Err(ProjectPersistenceError::slug_taken(new.slug.as_ref()));
                }
                new.id
            }
            CommitTarget::Append(id) => {
                if !state.projects.contains_key(id) {
                    return Err(ProjectPersistenceError::project_not_found());
                }
                *id
            }
        };

        // Every check has passed; apply all three writes.
        if let CommitTarget::Create(new) = &commit.target {
            state.insert_project(new, now);
        }
        let (project, version) = state.append(project_id, &commit.content, now)?;
        let tokens_remaining = debited.tokens();
        state.users.insert(debited.id(), debited);

        Ok(CommittedVersion {
            project,
            version,
            tokens_remaining,
        })
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;

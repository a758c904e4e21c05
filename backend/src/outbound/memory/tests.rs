//! Behavioural coverage for the in-memory store.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use futures::future::join_all;
use rstest::{fixture, rstest};

use super::*;
use crate::domain::password::PasswordHash;
use crate::test_support::MutableClock;

#[fixture]
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn store_at(now: DateTime<Utc>) -> (InMemoryStore, Arc<MutableClock>) {
    let clock = Arc::new(MutableClock::new(now));
    (InMemoryStore::new(clock.clone()), clock)
}

async fn seed_user(store: &InMemoryStore, name: &str, tokens: u32, now: DateTime<Utc>) -> User {
    store
        .create(&NewUser {
            id: UserId::random(),
            username: Username::new(name).expect("valid username"),
            password_hash: PasswordHash::from_stored("unused"),
            balance: TokenBalance::new(tokens, now),
            created_at: now,
        })
        .await
        .expect("user created")
}

fn new_project(owner: UserId, slug: &str) -> NewProject {
    NewProject {
        id: ProjectId::random(),
        owner_id: owner,
        title: slug.to_owned(),
        slug: Slug::parse(slug).expect("valid slug"),
    }
}

fn create_commit(owner: UserId, slug: &str, cost: u32) -> GenerationCommit {
    GenerationCommit {
        user_id: owner,
        target: CommitTarget::Create(new_project(owner, slug)),
        content: "<p>v1</p>".to_owned(),
        cost,
    }
}

#[rstest]
#[tokio::test]
async fn usernames_are_unique(now: DateTime<Utc>) {
    let (store, _) = store_at(now);
    seed_user(&store, "alice", 16, now).await;
    let err = store
        .create(&NewUser {
            id: UserId::random(),
            username: Username::new("alice").expect("valid username"),
            password_hash: PasswordHash::from_stored("unused"),
            balance: TokenBalance::new(16, now),
            created_at: now,
        })
        .await
        .expect_err("duplicate");
    assert_eq!(err, UserPersistenceError::username_taken("alice"));
}

#[rstest]
#[tokio::test]
async fn refill_grants_once_per_period(now: DateTime<Utc>) {
    let (store, _) = store_at(now);
    let user = seed_user(&store, "alice", 4, now).await;
    let policy = TokenPolicy::default();

    let early = store
        .apply_refill(user.id(), now + TimeDelta::hours(23), policy)
        .await
        .expect("refill check");
    assert_eq!(early.tokens(), 4);

    let late = now + TimeDelta::hours(72);
    let refilled = store
        .apply_refill(user.id(), late, policy)
        .await
        .expect("refill");
    assert_eq!(refilled.tokens(), 20);
    assert_eq!(refilled.balance().last_refill(), late);

    let again = store
        .apply_refill(user.id(), late, policy)
        .await
        .expect("second refill");
    assert_eq!(again.tokens(), 20);
}

#[rstest]
#[tokio::test]
async fn debits_are_conditional(now: DateTime<Utc>) {
    let (store, _) = store_at(now);
    let user = seed_user(&store, "alice", 3, now).await;

    let after = store.debit_tokens(user.id(), 2).await.expect("debit");
    assert_eq!(after.tokens(), 1);
    let err = store.debit_tokens(user.id(), 2).await.expect_err("overdraw");
    assert_eq!(err, UserPersistenceError::insufficient_tokens(1_u32, 2_u32));
    assert_eq!(
        store.debit_tokens(UserId::random(), 1).await,
        Err(UserPersistenceError::not_found())
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_debits_never_overdraw(now: DateTime<Utc>) {
    let (store, _) = store_at(now);
    let user_id = seed_user(&store, "alice", 10, now).await.id();

    let attempts = (0..8).map(|_| {
        let store = store.clone();
        tokio::spawn(async move { store.debit_tokens(user_id, 3).await })
    });
    let succeeded = join_all(attempts)
        .await
        .into_iter()
        .filter(|outcome| matches!(outcome, Ok(Ok(_))))
        .count();

    assert_eq!(succeeded, 3);
    let remaining = UserRepository::find_by_id(&store, user_id)
        .await
        .expect("lookup")
        .expect("user exists");
    assert_eq!(remaining.tokens(), 1);
}

#[rstest]
#[tokio::test]
async fn slugs_are_unique_per_owner(now: DateTime<Utc>) {
    let (store, _) = store_at(now);
    let alice = seed_user(&store, "alice", 16, now).await;
    let bob = seed_user(&store, "bob_b", 16, now).await;

    store
        .create_project(&new_project(alice.id(), "my-site"))
        .await
        .expect("first");
    store
        .create_project(&new_project(bob.id(), "my-site"))
        .await
        .expect("other owner");
    let err = store
        .create_project(&new_project(alice.id(), "my-site"))
        .await
        .expect_err("conflict");
    assert_eq!(err, ProjectPersistenceError::slug_taken("my-site"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_appends_number_densely(now: DateTime<Utc>) {
    let (store, _) = store_at(now);
    let alice = seed_user(&store, "alice", 16, now).await;
    let project_id = store
        .create_project(&new_project(alice.id(), "my-site"))
        .await
        .expect("project")
        .id;

    let appends = (0..20).map(|i| {
        let store = store.clone();
        tokio::spawn(async move { store.append_version(project_id, &format!("<p>{i}</p>")).await })
    });
    for outcome in join_all(appends).await {
        outcome.expect("task").expect("append");
    }

    let mut numbers: Vec<u32> = store
        .list_versions(project_id, None)
        .await
        .expect("versions")
        .iter()
        .map(|version| version.version_number)
        .collect();
    numbers.reverse();
    assert_eq!(numbers, (1..=20).collect::<Vec<_>>());
}

#[rstest]
#[tokio::test]
async fn versions_list_newest_first_with_limit(now: DateTime<Utc>) {
    let (store, _) = store_at(now);
    let alice = seed_user(&store, "alice", 16, now).await;
    let project = store
        .create_project(&new_project(alice.id(), "my-site"))
        .await
        .expect("project");
    for content in ["a", "b", "c"] {
        store
            .append_version(project.id, content)
            .await
            .expect("append");
    }

    let latest = store
        .list_versions(project.id, Some(2))
        .await
        .expect("versions");
    let contents: Vec<&str> = latest.iter().map(|v| v.content.as_str()).collect();
    assert_eq!(contents, vec!["c", "b"]);
    assert_eq!(
        store.append_version(ProjectId::random(), "x").await,
        Err(ProjectPersistenceError::project_not_found())
    );
}

#[rstest]
#[tokio::test]
async fn pinning_is_idempotent_and_checked(now: DateTime<Utc>) {
    let (store, _) = store_at(now);
    let alice = seed_user(&store, "alice", 16, now).await;
    let project = store
        .create_project(&new_project(alice.id(), "my-site"))
        .await
        .expect("project");
    store.append_version(project.id, "a").await.expect("append");

    store.set_pinned(project.id, 1).await.expect("pin");
    store.set_pinned(project.id, 1).await.expect("pin again");
    let pinned = ProjectRepository::find_by_id(&store, project.id)
        .await
        .expect("lookup")
        .expect("exists");
    assert_eq!(pinned.pinned_version, Some(1));

    assert_eq!(
        store.set_pinned(project.id, 5).await,
        Err(ProjectPersistenceError::version_not_found(5_u32))
    );
    assert_eq!(
        store.set_pinned(ProjectId::random(), 1).await,
        Err(ProjectPersistenceError::project_not_found())
    );
}

#[rstest]
#[tokio::test]
async fn commit_creates_appends_and_debits(now: DateTime<Utc>) {
    let (store, _) = store_at(now);
    let alice = seed_user(&store, "alice", 16, now).await;

    let first = store
        .commit_generation(&create_commit(alice.id(), "my-site", 2))
        .await
        .expect("first commit");
    assert_eq!(first.version.version_number, 1);
    assert_eq!(first.tokens_remaining, 14);

    let second = store
        .commit_generation(&GenerationCommit {
            user_id: alice.id(),
            target: CommitTarget::Append(first.project.id),
            content: "<p>v2</p>".to_owned(),
            cost: 2,
        })
        .await
        .expect("second commit");
    assert_eq!(second.version.version_number, 2);
    assert_eq!(second.tokens_remaining, 12);
}

#[rstest]
#[case(1, "my-site")]
#[case(16, "taken")]
#[tokio::test]
async fn failed_commits_leave_no_trace(
    now: DateTime<Utc>,
    #[case] tokens: u32,
    #[case] slug: &str,
) {
    let (store, _) = store_at(now);
    let alice = seed_user(&store, "alice", tokens, now).await;
    store
        .create_project(&new_project(alice.id(), "taken"))
        .await
        .expect("existing project");

    store
        .commit_generation(&create_commit(alice.id(), slug, 2))
        .await
        .expect_err("commit rejected");

    let projects = store.list_by_owner(alice.id()).await.expect("listing");
    assert_eq!(projects.len(), 1);
    let user = UserRepository::find_by_id(&store, alice.id())
        .await
        .expect("lookup")
        .expect("exists");
    assert_eq!(user.tokens(), tokens);
}

#[rstest]
#[tokio::test]
async fn ranking_orders_by_views_then_recency(now: DateTime<Utc>) {
    let (store, clock) = store_at(now);
    let alice = seed_user(&store, "alice", 16, now).await;
    let old = store
        .create_project(&new_project(alice.id(), "old-site"))
        .await
        .expect("old");
    clock.advance_hours(1);
    let new = store
        .create_project(&new_project(alice.id(), "new-site"))
        .await
        .expect("new");
    clock.advance_hours(1);
    let popular = store
        .create_project(&new_project(alice.id(), "popular"))
        .await
        .expect("popular");
    store.increment_views(popular.id).await.expect("view");
    store.increment_views(popular.id).await.expect("view");

    let ranked: Vec<ProjectId> = store
        .ranked(10)
        .await
        .expect("ranked")
        .iter()
        .map(|summary| summary.id)
        .collect();
    assert_eq!(ranked, vec![popular.id, new.id, old.id]);

    let top = store.ranked(1).await.expect("ranked");
    assert_eq!(top.first().map(|s| s.views), Some(2));
    assert_eq!(top.first().map(|s| s.url()), Some("/@alice/popular".to_owned()));
}

#[rstest]
#[tokio::test]
async fn owner_slug_lookup_resolves_usernames(now: DateTime<Utc>) {
    let (store, _) = store_at(now);
    let alice = seed_user(&store, "alice", 16, now).await;
    let project = store
        .create_project(&new_project(alice.id(), "my-site"))
        .await
        .expect("project");

    let slug = Slug::parse("my-site").expect("valid slug");
    let found = store
        .find_by_owner_slug(&Username::new("alice").expect("valid"), &slug)
        .await
        .expect("lookup");
    assert_eq!(found.map(|p| p.id), Some(project.id));
    let missing = store
        .find_by_owner_slug(&Username::new("carol").expect("valid"), &slug)
        .await
        .expect("lookup");
    assert!(missing.is_none());
}

#[rstest]
#[tokio::test]
async fn popular_users_sum_views_per_owner(now: DateTime<Utc>) {
    let (store, _) = store_at(now);
    let alice = seed_user(&store, "alice", 16, now).await;
    let bob = seed_user(&store, "bob", 16, now).await;
    let carol = seed_user(&store, "carol", 16, now).await;
    seed_user(&store, "dave", 16, now).await;

    let hit = store
        .create_project(&new_project(bob.id(), "hit"))
        .await
        .expect("hit");
    for _ in 0..3 {
        store.increment_views(hit.id).await.expect("view");
    }
    for slug in ["one", "two"] {
        let project = store
            .create_project(&new_project(alice.id(), slug))
            .await
            .expect("project");
        store.increment_views(project.id).await.expect("view");
    }
    let quiet = store
        .create_project(&new_project(carol.id(), "quiet"))
        .await
        .expect("quiet");
    store.increment_views(quiet.id).await.expect("view");
    store.increment_views(quiet.id).await.expect("view");

    let popular = store.popular_users(10).await.expect("popular");
    let rows: Vec<(String, u64, u64)> = popular
        .iter()
        .map(|user| (user.username.to_string(), user.total_views, user.project_count))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("bob".to_owned(), 3, 1),
            ("alice".to_owned(), 2, 2),
            ("carol".to_owned(), 2, 1),
        ]
    );

    let top = store.popular_users(1).await.expect("popular");
    assert_eq!(top.len(), 1);
}

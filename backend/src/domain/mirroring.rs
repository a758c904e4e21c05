//! Keeps the page mirror in step with the version readers are served.

use tracing::warn;

use crate::domain::ports::{PageMirror, ProjectPersistenceError, ProjectRepository};
use crate::domain::{Project, Username, Version};

/// Version served for `project` when no version is requested: the pin, else
/// the newest. A dangling pin falls back to the newest, as the catalog does.
async fn served_version(
    projects: &dyn ProjectRepository,
    project: &Project,
    newest: Option<&Version>,
) -> Result<Option<Version>, ProjectPersistenceError> {
    if let Some(pin) = project.pinned_version {
        if let Some(version) = newest.filter(|version| version.version_number == pin) {
            return Ok(Some(version.clone()));
        }
        if let Some(version) = projects.find_version(project.id, pin).await? {
            return Ok(Some(version));
        }
    }
    match newest {
        Some(version) => Ok(Some(version.clone())),
        None => Ok(projects
            .list_versions(project.id, Some(1))
            .await?
            .into_iter()
            .next()),
    }
}

/// Replace the mirrored copy of `project` with the version it serves.
///
/// `newest` is the version just committed, if any. Failures are logged and
/// otherwise ignored.
pub(crate) async fn mirror_served_page(
    projects: &dyn ProjectRepository,
    mirror: &dyn PageMirror,
    owner: &Username,
    project: &Project,
    newest: Option<&Version>,
) {
    let version = match served_version(projects, project, newest).await {
        Ok(Some(version)) => version,
        Ok(None) => return,
        Err(error) => {
            warn!(project_id = %project.id, %error, "could not resolve the page to mirror");
            return;
        }
    };
    if let Err(error) = mirror.store(owner, &project.slug, &version.content).await {
        warn!(project_id = %project.id, %error, "page mirror write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{MockPageMirror, MockProjectRepository};
    use crate::domain::{ProjectId, Slug, UserId};
    use chrono::Utc;
    use rstest::{fixture, rstest};
    use uuid::Uuid;

    #[fixture]
    fn owner() -> Username {
        Username::new("alice").expect("valid username")
    }

    fn project(pinned_version: Option<u32>) -> Project {
        Project {
            id: ProjectId::random(),
            owner_id: UserId::random(),
            title: "Demo".to_owned(),
            slug: Slug::parse("demo").expect("valid slug"),
            views: 0,
            pinned_version,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn version(project_id: ProjectId, number: u32) -> Version {
        Version {
            id: Uuid::new_v4(),
            project_id,
            version_number: number,
            content: format!("<p>v{number}</p>"),
            created_at: Utc::now(),
        }
    }

    fn expect_mirrored(mirror: &mut MockPageMirror, html: &'static str) {
        mirror
            .expect_store()
            .withf(move |owner, slug, stored| {
                owner.as_ref() == "alice" && slug.as_ref() == "demo" && stored == html
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
    }

    #[rstest]
    #[tokio::test]
    async fn unpinned_projects_mirror_the_new_version(owner: Username) {
        let project = project(None);
        let newest = version(project.id, 3);
        let mut projects = MockProjectRepository::new();
        projects.expect_find_version().never();
        let mut mirror = MockPageMirror::new();
        expect_mirrored(&mut mirror, "<p>v3</p>");

        mirror_served_page(&projects, &mirror, &owner, &project, Some(&newest)).await;
    }

    #[rstest]
    #[tokio::test]
    async fn pinned_projects_keep_mirroring_the_pin(owner: Username) {
        let project = project(Some(1));
        let newest = version(project.id, 3);
        let mut projects = MockProjectRepository::new();
        projects
            .expect_find_version()
            .withf(|_, number| *number == 1)
            .times(1)
            .returning(|id, number| Ok(Some(version(id, number))));
        let mut mirror = MockPageMirror::new();
        expect_mirrored(&mut mirror, "<p>v1</p>");

        mirror_served_page(&projects, &mirror, &owner, &project, Some(&newest)).await;
    }

    #[rstest]
    #[tokio::test]
    async fn dangling_pins_mirror_the_newest_version(owner: Username) {
        let project = project(Some(7));
        let mut projects = MockProjectRepository::new();
        projects.expect_find_version().returning(|_, _| Ok(None));
        projects
            .expect_list_versions()
            .withf(|_, limit| *limit == Some(1))
            .returning(|id, _| Ok(vec![version(id, 2)]));
        let mut mirror = MockPageMirror::new();
        expect_mirrored(&mut mirror, "<p>v2</p>");

        mirror_served_page(&projects, &mirror, &owner, &project, None).await;
    }

    #[rstest]
    #[tokio::test]
    async fn lookup_failures_leave_the_mirror_alone(owner: Username) {
        let project = project(Some(1));
        let mut projects = MockProjectRepository::new();
        projects
            .expect_find_version()
            .returning(|_, _| Err(ProjectPersistenceError::connection("down")));
        let mut mirror = MockPageMirror::new();
        mirror.expect_store().never();

        mirror_served_page(&projects, &mirror, &owner, &project, None).await;
    }
}

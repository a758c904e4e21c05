//! Builders for HTTP state ports and the adapters behind them.

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};
use tracing::{info, warn};

use siteulation::domain::ports::{
    DisabledPageMirror, GenerationBackend, PageMirror, ProjectRepository, UserRepository,
};
use siteulation::domain::{CatalogService, GenerationService, IdentityService, ProjectService};
use siteulation::inbound::http::state::{HttpState, HttpStatePorts};
use siteulation::outbound::generation::{HttpGenerationBackend, TemplateGenerationBackend};
use siteulation::outbound::memory::InMemoryStore;
use siteulation::outbound::mirror::FsPageMirror;
use siteulation::outbound::persistence::{DbPool, DieselProjectRepository, DieselUserRepository};

use super::ServerConfig;
use super::config::AppSettings;

/// Driven adapters shared by every service.
struct Adapters {
    users: Arc<dyn UserRepository>,
    projects: Arc<dyn ProjectRepository>,
    backend: Arc<dyn GenerationBackend>,
    mirror: Arc<dyn PageMirror>,
    clock: Arc<dyn Clock>,
}

/// Select the Diesel repositories when a pool is configured, otherwise one
/// in-memory store serving both ports.
fn build_repositories(
    pool: Option<&DbPool>,
    clock: Arc<dyn Clock>,
) -> (Arc<dyn UserRepository>, Arc<dyn ProjectRepository>) {
    match pool {
        Some(pool) => (
            Arc::new(DieselUserRepository::new(pool.clone())) as Arc<dyn UserRepository>,
            Arc::new(DieselProjectRepository::new(pool.clone())) as Arc<dyn ProjectRepository>,
        ),
        None => {
            warn!("no database configured; state is kept in memory and lost on restart");
            let store = Arc::new(InMemoryStore::new(clock));
            (
                store.clone() as Arc<dyn UserRepository>,
                store as Arc<dyn ProjectRepository>,
            )
        }
    }
}

fn build_generation_backend(settings: &AppSettings) -> std::io::Result<Arc<dyn GenerationBackend>> {
    let endpoint = settings.generation_endpoint().map_err(std::io::Error::other)?;
    match endpoint {
        Some(endpoint) => {
            info!(endpoint = %endpoint, "using HTTP generation backend");
            let backend = HttpGenerationBackend::new(
                endpoint,
                settings.generation_timeout(),
                settings.generation_api_key.clone(),
                settings.model_names(),
            )
            .map_err(|err| {
                std::io::Error::other(format!("failed to build generation client: {err}"))
            })?;
            Ok(Arc::new(backend))
        }
        None => {
            warn!("no generation url configured; pages come from the local template");
            Ok(Arc::new(TemplateGenerationBackend))
        }
    }
}

fn build_page_mirror(settings: &AppSettings) -> std::io::Result<Arc<dyn PageMirror>> {
    match &settings.mirror_dir {
        Some(dir) => {
            let mirror = FsPageMirror::open(dir).map_err(std::io::Error::other)?;
            info!(path = %mirror.root_path().display(), "page mirror enabled");
            Ok(Arc::new(mirror))
        }
        None => Ok(Arc::new(DisabledPageMirror)),
    }
}

fn build_adapters(config: &ServerConfig) -> std::io::Result<Adapters> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let (users, projects) = build_repositories(config.db_pool.as_ref(), clock.clone());
    Ok(Adapters {
        users,
        projects,
        backend: build_generation_backend(&config.settings)?,
        mirror: build_page_mirror(&config.settings)?,
        clock,
    })
}

fn wire_services(adapters: Adapters, settings: &AppSettings) -> HttpState {
    let Adapters {
        users,
        projects,
        backend,
        mirror,
        clock,
    } = adapters;
    let policy = settings.token_policy();

    HttpState::new(HttpStatePorts {
        accounts: Arc::new(IdentityService::new(users.clone(), clock.clone(), policy)),
        generation: Arc::new(
            GenerationService::new(
                users.clone(),
                projects.clone(),
                backend,
                mirror.clone(),
                clock,
            )
            .with_policy(policy)
            .with_limits(settings.generation_limits()),
        ),
        projects: Arc::new(ProjectService::new(
            projects.clone(),
            users.clone(),
            mirror.clone(),
        )),
        catalog: Arc::new(CatalogService::new(projects, users, mirror)),
    })
}

/// Build the shared HTTP state from configured adapters.
///
/// # Errors
/// Fails when the generation endpoint or the mirror directory is unusable.
pub(super) fn build_http_state(config: &ServerConfig) -> std::io::Result<web::Data<HttpState>> {
    let adapters = build_adapters(config)?;
    Ok(web::Data::new(wire_services(adapters, &config.settings)))
}

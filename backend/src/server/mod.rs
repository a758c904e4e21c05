//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::{AppSettings, ServerConfig};

use state_builders::build_http_state;

use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::cookie::{Key, SameSite};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use siteulation::Trace;
#[cfg(debug_assertions)]
use siteulation::doc::ApiDoc;
use siteulation::inbound::http::health::{HealthState, live, ready};
use siteulation::inbound::http::state::HttpState;
use siteulation::inbound::http::{configure_api, configure_pages};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    key: Key,
    cookie_secure: bool,
    same_site: SameSite,
}

fn session_middleware(
    key: Key,
    cookie_secure: bool,
    same_site: SameSite,
) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".into())
        .cookie_path("/".into())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(same_site)
        .session_lifecycle(
            PersistentSession::default().session_ttl(actix_web::cookie::time::Duration::hours(2)),
        )
        .build()
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        key,
        cookie_secure,
        same_site,
    } = deps;

    let api = web::scope("/api")
        .wrap(session_middleware(key, cookie_secure, same_site))
        .configure(configure_api);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .service(ready)
        .service(live)
        .service(api);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app.configure(configure_pages)
}

/// Construct an Actix HTTP server using the provided health state and configuration.
///
/// # Errors
/// Propagates [`std::io::Error`] when wiring adapters, binding the socket or
/// starting the server fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let http_state = build_http_state(&config)?;
    let ServerConfig {
        session,
        bind_addr,
        db_pool: _,
        settings: _,
    } = config;

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            key: session.key.clone(),
            cookie_secure: session.cookie_secure,
            same_site: session.same_site,
        })
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}

#[cfg(test)]
mod tests {
    //! Tests for the application bootstrap and readiness signalling.

    use super::*;
    use std::ffi::OsString;

    use actix_web::http::{StatusCode, header};
    use actix_web::test;
    use env_lock::lock_env;
    use ortho_config::OrthoConfig;
    use rstest::{fixture, rstest};
    use serde_json::{Value, json};
    use siteulation::inbound::http::session_config::SessionSettings;

    #[fixture]
    fn health_state() -> web::Data<HealthState> {
        web::Data::new(HealthState::new())
    }

    fn memory_settings() -> AppSettings {
        let _guard = lock_env([
            ("SITEULATION_BIND_ADDR", None::<String>),
            ("SITEULATION_DATABASE_URL", None::<String>),
            ("SITEULATION_GENERATION_URL", None::<String>),
            ("SITEULATION_MIRROR_DIR", None::<String>),
        ]);
        AppSettings::load_from_iter([OsString::from("siteulation")]).expect("config should load")
    }

    fn server_config() -> ServerConfig {
        ServerConfig::new(
            SessionSettings {
                key: Key::generate(),
                cookie_secure: false,
                same_site: SameSite::Lax,
            },
            "127.0.0.1:0".parse().expect("addr"),
            memory_settings(),
        )
    }

    #[rstest]
    #[actix_rt::test]
    async fn create_server_marks_ready(health_state: web::Data<HealthState>) {
        let _server = create_server(health_state.clone(), server_config()).expect("server starts");
        assert!(health_state.is_ready());
    }

    #[rstest]
    #[actix_rt::test]
    async fn app_serves_api_pages_and_health_checks(health_state: web::Data<HealthState>) {
        let config = server_config();
        let http_state = build_http_state(&config).expect("state builds");
        health_state.mark_ready();
        let app = test::init_service(build_app(AppDependencies {
            health_state,
            http_state,
            key: config.session.key.clone(),
            cookie_secure: false,
            same_site: SameSite::Lax,
        }))
        .await;

        let ready_res =
            test::call_service(&app, test::TestRequest::get().uri("/health/ready").to_request())
                .await;
        assert_eq!(ready_res.status(), StatusCode::OK);
        assert_eq!(
            ready_res.headers().get(header::CACHE_CONTROL).and_then(|v| v.to_str().ok()),
            Some("no-store")
        );

        let signup = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/signup")
                .set_json(json!({"username": "alice", "password": "hunter22"}))
                .to_request(),
        )
        .await;
        assert_eq!(signup.status(), StatusCode::CREATED);
        let cookie = signup
            .response()
            .cookies()
            .find(|cookie| cookie.name() == "session")
            .expect("session cookie")
            .into_owned();
        assert!(cookie.http_only().unwrap_or(false));

        let generated = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/generate")
                .cookie(cookie)
                .set_json(json!({"title": "My Site", "prompt": "otters"}))
                .to_request(),
        )
        .await;
        assert_eq!(generated.status(), StatusCode::OK);
        let body: Value = test::read_body_json(generated).await;
        assert_eq!(body["url"], "/@alice/my-site");

        let page = test::call_service(
            &app,
            test::TestRequest::get().uri("/@alice/my-site").to_request(),
        )
        .await;
        assert_eq!(page.status(), StatusCode::OK);
        assert!(page.headers().contains_key("trace-id"));

        let ranked =
            test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        let ranked: Value = test::read_body_json(ranked).await;
        assert_eq!(ranked["projects"][0]["views"], 1);
    }
}

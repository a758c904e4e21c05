//! Shared helpers for backend integration tests.
//!
//! Integration tests compile as separate crates under `backend/tests/`. This
//! module wires the real services over the in-memory store, a scripted
//! generation backend and a settable clock, and exposes small request
//! helpers on top of `actix_web::test`.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::{Method, StatusCode};
use actix_web::{App, test, web};
use chrono::{TimeZone, Utc};
use mockable::Clock;
use serde_json::Value;

use siteulation::Trace;
use siteulation::domain::ports::{DisabledPageMirror, PageMirror};
use siteulation::domain::{
    CatalogService, GenerationService, IdentityService, ProjectService, TokenPolicy,
};
use siteulation::inbound::http::state::{HttpState, HttpStatePorts};
use siteulation::inbound::http::{configure_api, configure_pages};
use siteulation::outbound::memory::InMemoryStore;
use siteulation::test_support::{MutableClock, ScriptedGenerationBackend};

/// Services wired over in-memory adapters with handles on the test doubles.
pub struct Harness {
    pub clock: Arc<MutableClock>,
    pub backend: Arc<ScriptedGenerationBackend>,
    pub state: HttpState,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_policy(TokenPolicy::default())
    }

    pub fn with_policy(policy: TokenPolicy) -> Self {
        Self::with_policy_and_mirror(policy, Arc::new(DisabledPageMirror))
    }

    pub fn with_policy_and_mirror(policy: TokenPolicy, mirror: Arc<dyn PageMirror>) -> Self {
        let start = Utc
            .with_ymd_and_hms(2026, 1, 5, 9, 0, 0)
            .single()
            .expect("valid start time");
        let clock = Arc::new(MutableClock::new(start));
        let backend = Arc::new(ScriptedGenerationBackend::new());
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let store = Arc::new(InMemoryStore::new(dyn_clock.clone()));

        let state = HttpState::new(HttpStatePorts {
            accounts: Arc::new(IdentityService::new(store.clone(), dyn_clock.clone(), policy)),
            generation: Arc::new(
                GenerationService::new(
                    store.clone(),
                    store.clone(),
                    backend.clone(),
                    mirror.clone(),
                    dyn_clock,
                )
                .with_policy(policy),
            ),
            projects: Arc::new(ProjectService::new(
                store.clone(),
                store.clone(),
                mirror.clone(),
            )),
            catalog: Arc::new(CatalogService::new(store.clone(), store, mirror)),
        });

        Self {
            clock,
            backend,
            state,
        }
    }

    /// App wired the way the server wires it.
    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        > + use<>,
    > {
        let session = SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
            .cookie_name("session".to_owned())
            .cookie_secure(false)
            .build();
        App::new()
            .app_data(web::Data::new(self.state.clone()))
            .wrap(Trace)
            .service(web::scope("/api").wrap(session).configure(configure_api))
            .configure(configure_pages)
    }
}

/// Response captured as status, JSON body and optional session cookie.
pub struct JsonReply {
    pub status: StatusCode,
    pub body: Value,
    pub cookie: Option<Cookie<'static>>,
}

/// Send a JSON request, optionally authenticated.
pub async fn send_json(
    app: &impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
    method: Method,
    path: &str,
    cookie: Option<&Cookie<'static>>,
    payload: Option<Value>,
) -> JsonReply {
    let mut request = test::TestRequest::default().method(method).uri(path);
    if let Some(cookie) = cookie {
        request = request.cookie(cookie.clone());
    }
    if let Some(payload) = payload {
        request = request.set_json(payload);
    }
    let res = test::call_service(app, request.to_request()).await;
    let status = res.status();
    let cookie = res
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .map(Cookie::into_owned);
    let bytes = test::read_body(res).await;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    JsonReply {
        status,
        body,
        cookie,
    }
}

/// Sign up `username` and return the session cookie.
pub async fn sign_up(
    app: &impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
    username: &str,
) -> Cookie<'static> {
    let reply = send_json(
        app,
        Method::POST,
        "/api/signup",
        None,
        Some(serde_json::json!({"username": username, "password": "hunter22"})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "signup: {}", reply.body);
    reply.cookie.expect("signup sets a session cookie")
}

/// Fetch a page and return its status and HTML body.
pub async fn get_page(
    app: &impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
    path: &str,
) -> (StatusCode, String) {
    let res = test::call_service(app, test::TestRequest::get().uri(path).to_request()).await;
    let status = res.status();
    let bytes = test::read_body(res).await;
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

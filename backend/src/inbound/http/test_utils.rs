//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::ServiceResponse;

use crate::domain::ports::{
    MockAccountService, MockCatalogQuery, MockGenerationCommand, MockProjectCommand,
};

use super::state::{HttpState, HttpStatePorts};

/// Build a session middleware configured for tests.
///
/// - Generates a fresh signing/encryption key per invocation.
/// - Sets the cookie name to `session` and disables the `Secure` flag for
///   local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    test_session_middleware_with_key(Key::generate())
}

/// Session middleware sharing `key`, for apps that must read cookies minted
/// by another app instance.
pub fn test_session_middleware_with_key(key: Key) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Mock ports with no expectations; tests add the ones they need.
#[derive(Default)]
pub struct MockPorts {
    pub accounts: MockAccountService,
    pub generation: MockGenerationCommand,
    pub projects: MockProjectCommand,
    pub catalog: MockCatalogQuery,
}

impl MockPorts {
    pub fn into_state(self) -> HttpState {
        HttpState::new(HttpStatePorts {
            accounts: Arc::new(self.accounts),
            generation: Arc::new(self.generation),
            projects: Arc::new(self.projects),
            catalog: Arc::new(self.catalog),
        })
    }
}

/// Extract the `session` cookie set by a response.
pub fn session_cookie<B>(res: &ServiceResponse<B>) -> Cookie<'static> {
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .map(Cookie::into_owned)
        .unwrap_or_else(|| panic!("response did not set a session cookie"))
}

/// App wired like production (trace, session-wrapped `/api`, public pages)
/// over `state`.
pub fn test_app(
    state: HttpState,
) -> actix_web::App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    actix_web::App::new()
        .app_data(actix_web::web::Data::new(state))
        .wrap(crate::Trace)
        .service(
            actix_web::web::scope("/api")
                .wrap(test_session_middleware())
                .configure(super::configure_api),
        )
        .configure(super::configure_pages)
}

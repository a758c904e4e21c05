//! HTTP inbound adapter exposing the JSON API and the public pages.
//!
//! [`configure_api`] registers the session-backed endpoints mounted under
//! `/api`; [`configure_pages`] registers the public page and listing routes at
//! the root. Health checks are registered by the server alongside them.

pub mod auth;
pub mod carts;
pub mod dto;
pub mod error;
pub mod generate;
pub mod health;
pub mod pages;
pub mod session;
pub mod session_config;
pub mod state;
pub mod users;
#[cfg(test)]
pub mod test_utils;

use actix_web::web;

pub use error::ApiResult;

fn extractor_configs(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(error::json_error_handler))
        .app_data(web::PathConfig::default().error_handler(error::path_error_handler))
        .app_data(web::QueryConfig::default().error_handler(error::query_error_handler));
}

/// Register the `/api` endpoints. Mount inside a scope wrapped with the
/// session middleware.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    extractor_configs(cfg);
    cfg.service(auth::signup)
        .service(auth::login)
        .service(auth::logout)
        .service(auth::current_user)
        .service(auth::tokens)
        .service(generate::generate)
        .service(carts::create_cart)
        .service(carts::recent_carts)
        .service(generate::regenerate)
        .service(carts::pin_version)
        .service(carts::remix_cart)
        .service(carts::get_cart)
        .service(users::popular_users);
}

/// Register the public page routes.
pub fn configure_pages(cfg: &mut web::ServiceConfig) {
    extractor_configs(cfg);
    cfg.service(pages::ranked_listing)
        .service(pages::serve_page)
        .service(pages::owner_listing);
}

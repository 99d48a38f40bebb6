//! Identity Router

use axum::{
    Router, middleware,
    routing::{get, patch, post},
};
use std::sync::Arc;

use crate::application::TokenIssuer;
use crate::application::config::IdentityConfig;
use crate::domain::repository::IdentityStore;
use crate::infra::postgres::PgIdentityRepository;
use crate::presentation::handlers::{self, IdentityAppState};
use crate::presentation::middleware::require_bearer;

/// Create the identity router with PostgreSQL repository
pub fn identity_router(repo: PgIdentityRepository, config: IdentityConfig) -> Router {
    identity_router_generic(repo, config)
}

/// Create a generic identity router for any repository implementation
pub fn identity_router_generic<R>(repo: R, config: IdentityConfig) -> Router
where
    R: IdentityStore + Clone,
{
    let tokens = Arc::new(TokenIssuer::new(&config));
    let state = IdentityAppState {
        repo: Arc::new(repo),
        config: Arc::new(config),
        tokens: tokens.clone(),
    };

    let public = Router::new()
        .route("/register", post(handlers::register::<R>))
        .route("/login", post(handlers::login::<R>))
        .route("/refresh", post(handlers::refresh::<R>));

    let authenticated = Router::new()
        .route("/logout", post(handlers::logout::<R>))
        .route("/me", get(handlers::me::<R>))
        .route("/me/profile", patch(handlers::update_profile::<R>))
        .route("/me/password", post(handlers::change_password::<R>))
        .route("/accounts", get(handlers::find_account::<R>))
        .route(
            "/accounts/{id}",
            get(handlers::get_account::<R>).delete(handlers::delete_account::<R>),
        )
        .route("/accounts/{id}/activate", post(handlers::activate_account::<R>))
        .route("/accounts/{id}/deactivate", post(handlers::deactivate_account::<R>))
        .route("/accounts/{id}/lock", post(handlers::lock_account::<R>))
        .route("/accounts/{id}/unlock", post(handlers::unlock_account::<R>))
        .route("/accounts/{id}/password", post(handlers::reset_password::<R>))
        .route("/doctors", get(handlers::list_doctors::<R>))
        .route("/profiles/{id}/verify", post(handlers::verify_doctor::<R>))
        .route("/profiles/{id}/reject", post(handlers::reject_doctor::<R>))
        .route("/profiles/{id}/suspend", post(handlers::suspend_profile::<R>))
        .route("/profiles/{id}/reinstate", post(handlers::reinstate_profile::<R>))
        .route_layer(middleware::from_fn_with_state(tokens, require_bearer));

    public.merge(authenticated).with_state(state)
}

//! HTTP Handlers

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::config::IdentityConfig;
use crate::application::{
    AccountAdminUseCase, AuthenticateInput, AuthenticateUseCase, Principal, ProfileAdminUseCase,
    RefreshSessionUseCase, RegisterUseCase, SelfServiceUseCase, SignOutUseCase, TokenIssuer,
};
use crate::domain::entity::ProfilePatch;
use crate::domain::repository::IdentityStore;
use crate::domain::value_object::{AccountId, ProfileId};
use crate::error::IdentityResult;
use crate::presentation::dto::{
    AccountLookupQuery, AccountSummary, AccountView, ChangePasswordRequest, LoginRequest,
    ProfileView, RefreshRequest, RegisterRequest, ResetPasswordRequest, SessionResponse,
};
use crate::presentation::extract::JsonBody;

/// Shared state for identity handlers
#[derive(Clone)]
pub struct IdentityAppState<R>
where
    R: IdentityStore + Clone,
{
    pub repo: Arc<R>,
    pub config: Arc<IdentityConfig>,
    pub tokens: Arc<TokenIssuer>,
}

// ============================================================================
// Register / Login / Refresh
// ============================================================================

/// POST /api/identity/register
pub async fn register<R>(
    State(state): State<IdentityAppState<R>>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> IdentityResult<impl IntoResponse>
where
    R: IdentityStore + Clone,
{
    let use_case = RegisterUseCase::new(
        state.repo.clone(),
        state.config.clone(),
        state.tokens.clone(),
    );

    let output = use_case.execute(req.into_input()?).await?;

    Ok((StatusCode::CREATED, Json(SessionResponse::from(output))))
}

/// POST /api/identity/login
pub async fn login<R>(
    State(state): State<IdentityAppState<R>>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> IdentityResult<Json<SessionResponse>>
where
    R: IdentityStore + Clone,
{
    let use_case = AuthenticateUseCase::new(
        state.repo.clone(),
        state.config.clone(),
        state.tokens.clone(),
    );

    let input = AuthenticateInput {
        user_name: req.user_name,
        password: req.password,
    };

    let output = use_case.execute(input).await?;
    Ok(Json(SessionResponse::from(output)))
}

/// POST /api/identity/refresh
pub async fn refresh<R>(
    State(state): State<IdentityAppState<R>>,
    JsonBody(req): JsonBody<RefreshRequest>,
) -> IdentityResult<Json<SessionResponse>>
where
    R: IdentityStore + Clone,
{
    let use_case = RefreshSessionUseCase::new(
        state.repo.clone(),
        state.config.clone(),
        state.tokens.clone(),
    );

    let output = use_case.execute(&req.refresh_token).await?;
    Ok(Json(SessionResponse::from(output)))
}

// ============================================================================
// Self-service (bearer)
// ============================================================================

/// POST /api/identity/logout
pub async fn logout<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(principal): Extension<Principal>,
) -> IdentityResult<StatusCode>
where
    R: IdentityStore + Clone,
{
    SignOutUseCase::new(state.repo.clone())
        .execute(&principal)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/identity/me
pub async fn me<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(principal): Extension<Principal>,
) -> IdentityResult<Json<AccountView>>
where
    R: IdentityStore + Clone,
{
    let use_case = SelfServiceUseCase::new(state.repo.clone(), state.config.clone());
    let (account, profile) = use_case.me(&principal).await?;

    Ok(Json(AccountView::new(&account, profile.as_ref())))
}

/// PATCH /api/identity/me/profile
pub async fn update_profile<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(principal): Extension<Principal>,
    JsonBody(patch): JsonBody<ProfilePatch>,
) -> IdentityResult<Json<ProfileView>>
where
    R: IdentityStore + Clone,
{
    let use_case = SelfServiceUseCase::new(state.repo.clone(), state.config.clone());
    let profile = use_case.update_profile(&principal, patch).await?;
    Ok(Json(ProfileView::from(&profile)))
}

/// POST /api/identity/me/password
pub async fn change_password<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(principal): Extension<Principal>,
    JsonBody(req): JsonBody<ChangePasswordRequest>,
) -> IdentityResult<StatusCode>
where
    R: IdentityStore + Clone,
{
    let use_case = SelfServiceUseCase::new(state.repo.clone(), state.config.clone());
    use_case
        .change_password(&principal, req.current_password, req.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Account administration (bearer, ADMIN)
// ============================================================================

fn account_admin<R>(state: &IdentityAppState<R>) -> AccountAdminUseCase<R>
where
    R: IdentityStore + Clone,
{
    AccountAdminUseCase::new(state.repo.clone(), state.config.clone())
}

/// GET /api/identity/accounts?username=..|email=..
pub async fn find_account<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<AccountLookupQuery>,
) -> IdentityResult<Json<AccountView>>
where
    R: IdentityStore + Clone,
{
    let (account, profile) = account_admin(&state)
        .lookup(&principal, query.user_name, query.email)
        .await?;
    Ok(Json(AccountView::new(&account, profile.as_ref())))
}

/// GET /api/identity/accounts/{id}
pub async fn get_account<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> IdentityResult<Json<AccountView>>
where
    R: IdentityStore + Clone,
{
    let (account, profile) = account_admin(&state)
        .get(&principal, &AccountId::from_uuid(id))
        .await?;
    Ok(Json(AccountView::new(&account, profile.as_ref())))
}

/// POST /api/identity/accounts/{id}/activate
pub async fn activate_account<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> IdentityResult<Json<AccountSummary>>
where
    R: IdentityStore + Clone,
{
    let account = account_admin(&state)
        .activate(&principal, &AccountId::from_uuid(id))
        .await?;
    Ok(Json(AccountSummary::from(&account)))
}

/// POST /api/identity/accounts/{id}/deactivate
pub async fn deactivate_account<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> IdentityResult<Json<AccountSummary>>
where
    R: IdentityStore + Clone,
{
    let account = account_admin(&state)
        .deactivate(&principal, &AccountId::from_uuid(id))
        .await?;
    Ok(Json(AccountSummary::from(&account)))
}

/// POST /api/identity/accounts/{id}/lock
pub async fn lock_account<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> IdentityResult<Json<AccountSummary>>
where
    R: IdentityStore + Clone,
{
    let account = account_admin(&state)
        .lock(&principal, &AccountId::from_uuid(id))
        .await?;
    Ok(Json(AccountSummary::from(&account)))
}

/// POST /api/identity/accounts/{id}/unlock
pub async fn unlock_account<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> IdentityResult<Json<AccountSummary>>
where
    R: IdentityStore + Clone,
{
    let account = account_admin(&state)
        .unlock(&principal, &AccountId::from_uuid(id))
        .await?;
    Ok(Json(AccountSummary::from(&account)))
}

/// POST /api/identity/accounts/{id}/password
pub async fn reset_password<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<ResetPasswordRequest>,
) -> IdentityResult<Json<AccountSummary>>
where
    R: IdentityStore + Clone,
{
    let account = account_admin(&state)
        .reset_password(&principal, &AccountId::from_uuid(id), req.new_password)
        .await?;
    Ok(Json(AccountSummary::from(&account)))
}

/// DELETE /api/identity/accounts/{id}
pub async fn delete_account<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> IdentityResult<StatusCode>
where
    R: IdentityStore + Clone,
{
    account_admin(&state)
        .soft_delete(&principal, &AccountId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Profile administration (bearer, ADMIN)
// ============================================================================

/// GET /api/identity/doctors
pub async fn list_doctors<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(principal): Extension<Principal>,
) -> IdentityResult<Json<Vec<ProfileView>>>
where
    R: IdentityStore + Clone,
{
    let profiles = ProfileAdminUseCase::new(state.repo.clone())
        .list_doctors(&principal)
        .await?;
    Ok(Json(profiles.iter().map(ProfileView::from).collect()))
}

/// POST /api/identity/profiles/{id}/verify
pub async fn verify_doctor<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> IdentityResult<Json<ProfileView>>
where
    R: IdentityStore + Clone,
{
    let profile = ProfileAdminUseCase::new(state.repo.clone())
        .verify_doctor(&principal, &ProfileId::from_uuid(id))
        .await?;
    Ok(Json(ProfileView::from(&profile)))
}

/// POST /api/identity/profiles/{id}/reject
pub async fn reject_doctor<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> IdentityResult<Json<ProfileView>>
where
    R: IdentityStore + Clone,
{
    let profile = ProfileAdminUseCase::new(state.repo.clone())
        .reject_doctor(&principal, &ProfileId::from_uuid(id))
        .await?;
    Ok(Json(ProfileView::from(&profile)))
}

/// POST /api/identity/profiles/{id}/suspend
pub async fn suspend_profile<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> IdentityResult<Json<ProfileView>>
where
    R: IdentityStore + Clone,
{
    let profile = ProfileAdminUseCase::new(state.repo.clone())
        .suspend(&principal, &ProfileId::from_uuid(id))
        .await?;
    Ok(Json(ProfileView::from(&profile)))
}

/// POST /api/identity/profiles/{id}/reinstate
pub async fn reinstate_profile<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> IdentityResult<Json<ProfileView>>
where
    R: IdentityStore + Clone,
{
    let profile = ProfileAdminUseCase::new(state.repo.clone())
        .reinstate(&principal, &ProfileId::from_uuid(id))
        .await?;
    Ok(Json(ProfileView::from(&profile)))
}

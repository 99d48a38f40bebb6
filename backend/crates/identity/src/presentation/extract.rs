//! Request Extractors
//!
//! `JsonBody<T>` behaves like `axum::Json<T>` but rejects with an
//! [`IdentityError`], so malformed or incomplete bodies get the same
//! problem-details response as every other failure.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

use crate::error::IdentityError;

pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = IdentityError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_to_error)?;
        Ok(JsonBody(value))
    }
}

fn rejection_to_error(rejection: JsonRejection) -> IdentityError {
    tracing::debug!(status = %rejection.status(), "Rejected request body");
    IdentityError::policy(rejection.body_text())
}

use axum::{
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
    Json,
};

use crate::errors::ApiError;

/// Custom JSON extractor that returns JSON error responses instead of HTML,
/// in the same `{"message": ...}` shape as every other error body.
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: serde::de::DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| AppJson(value))
            .map_err(|rejection| {
                let message = format!("Failed to parse JSON request body: {}", rejection);
                tracing::warn!("{}", message);
                ApiError::Validation(message).into_response()
            })
    }
}

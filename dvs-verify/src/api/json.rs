//! JSON body extractor with the service's error shape
//!
//! `axum::Json` rejects unreadable bodies with a plain-text 4xx before the
//! handler runs. `ApiJson` turns those rejections into `ApiError::InvalidBody`
//! so every input violation renders as a 400 error object naming the field.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::ApiError;

static MISSING_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"missing field `([^`]+)`").expect("missing-field pattern is valid"));

// Data errors are prefixed with the path of the offending value
static FIELD_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"target type: ([A-Za-z_][A-Za-z0-9_]*)[.\[:]").expect("field-path pattern is valid")
});

/// Field a rejection message points at, if any
fn rejected_field(message: &str) -> Option<String> {
    MISSING_FIELD
        .captures(message)
        .or_else(|| FIELD_PATH.captures(message))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = rejection.body_text();
        ApiError::InvalidBody {
            field: rejected_field(&message),
            message,
        }
    }
}

/// `Json<T>` whose rejection is an [`ApiError`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                let error = ApiError::from(rejection);
                warn!(error = %error, "Rejected request body");
                Err(error)
            }
        }
    }
}

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::AppError;

/// Neutralize markup in a single string: unsafe tags and attributes are
/// dropped and stray `<`, `>` and `&` are entity-escaped.
pub fn sanitize_str(input: &str) -> String {
    ammonia::clean(input)
}

/// Replace every top-level string value of a write payload with its
/// sanitized form. Non-string values are left untouched.
pub fn sanitize_fields(body: &mut Map<String, Value>) {
    for value in body.values_mut() {
        if let Value::String(s) = value {
            *s = sanitize_str(s);
        }
    }
}

/// JSON object body whose string fields have already been sanitized.
#[derive(Debug)]
pub struct SanitizedJson(pub Map<String, Value>);

#[async_trait]
impl<S> FromRequest<S> for SanitizedJson
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|e| {
                warn!(error = %e, "rejected request body");
                AppError::validation("Invalid JSON body")
            })?;

        let Value::Object(mut fields) = body else {
            return Err(AppError::validation("Request body must be a JSON object"));
        };
        sanitize_fields(&mut fields);
        Ok(Self(fields))
    }
}

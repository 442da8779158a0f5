//! Request extractors that report malformed input through the API envelope.
//!
//! Axum's stock `Json` and `Query` rejections answer with plain text; these
//! wrappers turn them into `AppError::Validation` so every 400 carries the
//! same `{data, error}` body.

use axum::{
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::errors::AppError;

/// JSON body that is deserialized and then checked with `validator`.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        value
            .validate()
            .map_err(|errors| AppError::Validation(errors.to_string()))?;
        Ok(Self(value))
    }
}

/// Query string extractor with enveloped rejections.
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request as HttpRequest};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Note {
        #[validate(length(max = 5))]
        text: String,
    }

    fn json_request(body: &str) -> Request {
        HttpRequest::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn accepts_valid_body() {
        let request = json_request(r#"{"text":"hi"}"#);
        let ValidatedJson(note) = ValidatedJson::<Note>::from_request(request, &())
            .await
            .unwrap();
        assert_eq!(note.text, "hi");
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error() {
        let err = ValidatedJson::<Note>::from_request(json_request("{"), &())
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn failed_constraints_are_a_validation_error() {
        let err = ValidatedJson::<Note>::from_request(json_request(r#"{"text":"too long"}"#), &())
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("text"));
    }

    #[tokio::test]
    async fn bad_query_is_a_validation_error() {
        #[derive(Debug, Deserialize)]
        struct Params {
            #[allow(dead_code)]
            page: i64,
        }

        let (mut parts, _) = HttpRequest::builder()
            .uri("/?page=abc")
            .body(())
            .unwrap()
            .into_parts();
        let err = ApiQuery::<Params>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }
}

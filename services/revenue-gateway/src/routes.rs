//! axum wiring for the page and the prediction endpoint.

use crate::handler::{predict, FailureResponse, PredictError, PredictionContext};
use crate::input::ValidationError;
use crate::page::index_page;
use brewcast_core::{record_prediction, PredictionOutcome};
use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use std::collections::HashMap;
use std::sync::Arc;

pub type SharedContext = Arc<PredictionContext>;

/// Service routes plus the shared `/live`, `/ready`, `/status`, `/metrics`.
pub fn router(ctx: SharedContext, service: &str) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict_form))
        .with_state(ctx)
        .merge(brewcast_core::health_router(service))
}

async fn index(State(ctx): State<SharedContext>) -> Html<String> {
    Html(index_page(ctx.schema(), ctx.load_error()).into_string())
}

/// Submitted fields from a urlencoded or a `multipart/form-data` body. When a key repeats,
/// its first value is kept.
pub struct FormFields(pub HashMap<String, String>);

impl FormFields {
    fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut fields = HashMap::new();
        for (k, v) in pairs { fields.entry(k).or_insert(v); }
        FormFields(fields)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequest<S> for FormFields {
    type Rejection = String;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = req.headers().get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"));
        if !multipart {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state).await.map_err(|r| r.body_text())?;
            return Ok(FormFields::from_pairs(pairs));
        }
        let mut body = Multipart::from_request(req, state).await.map_err(|r| r.body_text())?;
        let mut pairs = Vec::new();
        while let Some(field) = body.next_field().await.map_err(|e| e.body_text())? {
            let Some(name) = field.name().map(str::to_string) else { continue };
            // File parts carry no feature values.
            if field.file_name().is_some() { continue; }
            pairs.push((name, field.text().await.map_err(|e| e.body_text())?));
        }
        Ok(FormFields::from_pairs(pairs))
    }
}

async fn predict_form(State(ctx): State<SharedContext>, form: Result<FormFields, String>) -> Response {
    let result = match form {
        Ok(FormFields(fields)) => predict(&ctx, &fields),
        // An unloaded model outranks a bad body, same as for well-formed requests.
        Err(_) if !ctx.is_ready() => predict(&ctx, &HashMap::new()),
        Err(rejection) => {
            record_prediction(PredictionOutcome::InvalidInput, None);
            Err(PredictError::Invalid(ValidationError::MalformedBody(rejection)))
        }
    };
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => e.into_response(),
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(FailureResponse::from(&self))).into_response()
    }
}

//! HTTP endpoint handlers. These are thin wrappers over the assessment
//! aggregate; every failure bubbles up as an `AssessmentError`.

use std::{collections::HashMap, sync::Arc};

use axum::{
  extract::{Path, State},
  response::IntoResponse,
  Form, Json,
};
use serde_json::Value;
use tracing::{info, instrument};

use crate::assessment::Assessment;
use crate::error::{AssessmentError, Result};
use crate::protocol::{HealthOut, MessageOut, SaveOut};
use crate::state::AppState;
use crate::store::AssessmentId;
use crate::user_input::UserInput;
use crate::util::trunc_for_log;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, generation: state.generator.is_some() })
}

/// Generate from the request form, persist, and return the stored document.
#[instrument(level = "info", skip(state, form), fields(form_len = form.len()))]
pub async fn http_generate_assessment(
  State(state): State<Arc<AppState>>,
  Form(form): Form<HashMap<String, String>>,
) -> Result<Json<Value>> {
  let user_input = UserInput::from_request_form(&form)?;
  let generator = state
    .generator
    .as_ref()
    .ok_or_else(|| AssessmentError::GenerationUnavailable("generation is not configured".into()))?;

  // PDF text extraction is not wired in; prompts carry topic and keywords only.
  let prompt = user_input.make_prompt(&state.prompts, None);
  let text = generator.generate(&state.prompts, &prompt).await?;
  tracing::debug!(target: "assessment", text = %trunc_for_log(&text, 300), "Generated text");

  let mut assessment = Assessment::from_generation(user_input, Some(&text))?;
  assessment.save(state.store.as_ref())?;
  info!(target: "assessment", id = %assessment.id()?, questions = assessment.questions().len(), "HTTP assessment generated");
  Ok(Json(assessment.to_document(true)?))
}

/// Save an edited assessment: overwrite when `_id` is present, copy otherwise.
#[instrument(level = "info", skip(state, payload), fields(has_id = payload.get("_id").is_some()))]
pub async fn http_save_assessment(
  State(state): State<Arc<AppState>>,
  Json(payload): Json<Value>,
) -> Result<Json<SaveOut>> {
  let mut assessment = Assessment::from_edit_payload(&payload)?;
  assessment.save(state.store.as_ref())?;
  Ok(Json(SaveOut {
    id: assessment.id()?.to_value(),
    last_modified: assessment.last_modified().to_string(),
  }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_history(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Value>>> {
  let docs = Assessment::list_documents(state.store.as_ref())?;
  info!(target: "assessment", count = docs.len(), "HTTP history served");
  Ok(Json(docs))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_assessment(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<Value>> {
  let id = AssessmentId::from_token(id)?;
  let assessment = Assessment::load(state.store.as_ref(), &id)?;
  Ok(Json(assessment.to_document(true)?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_delete_assessment(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<MessageOut>> {
  let id = AssessmentId::from_token(id)?;
  Assessment::delete_from_store(state.store.as_ref(), &id)?;
  Ok(Json(MessageOut { message: "Assessment deleted successfully.".into() }))
}

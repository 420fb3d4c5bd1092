//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs include parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{State, Query}, http::StatusCode, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::logic::{self, StepResult};
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, body), fields(key = %body.draft_key, variant = ?body.variant))]
pub async fn http_post_start(
  State(state): State<Arc<AppState>>,
  Json(body): Json<StartIn>,
) -> impl IntoResponse {
  let out = logic::start_wizard(&state, &body.draft_key, body.variant).await;
  info!(target: "wizard", key = %body.draft_key, step = out.step, "HTTP wizard started");
  Json(out)
}

#[instrument(level = "info", skip(state), fields(key = %q.key))]
pub async fn http_get_draft(
  State(state): State<Arc<AppState>>,
  Query(q): Query<DraftKeyQuery>,
) -> impl IntoResponse {
  Json(logic::snapshot(&state, &q.key).await)
}

#[instrument(level = "info", skip(state, body), fields(key = %body.draft_key, name = %body.name))]
pub async fn http_post_subject(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SubjectIn>,
) -> impl IntoResponse {
  Json(logic::add_subject(&state, &body.draft_key, &body.name, &body.exam_board, body.mode).await)
}

#[instrument(level = "info", skip(state, body), fields(key = %body.draft_key, subject_id = %body.subject_id))]
pub async fn http_post_topic(
  State(state): State<Arc<AppState>>,
  Json(body): Json<TopicIn>,
) -> impl IntoResponse {
  Json(logic::add_topic(&state, &body.draft_key, &body.subject_id, &body.name, body.confidence).await)
}

#[instrument(level = "info", skip(state, body), fields(key = %body.draft_key, action = %body.action))]
pub async fn http_post_step(
  State(state): State<Arc<AppState>>,
  Json(body): Json<StepIn>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorOut>)> {
  let out = match body.action.as_str() {
    "next" => StepResult::Draft(logic::next_step(&state, &body.draft_key).await),
    "back" => logic::back_step(&state, &body.draft_key).await,
    "jump" => {
      let Some(step) = body.step else {
        return Err((
          StatusCode::BAD_REQUEST,
          Json(ErrorOut { error: "jump requires a step".into() }),
        ));
      };
      StepResult::Draft(logic::jump_step(&state, &body.draft_key, step).await)
    }
    other => {
      return Err((
        StatusCode::BAD_REQUEST,
        Json(ErrorOut { error: format!("Unknown step action: {}", other) }),
      ));
    }
  };

  let value = match out {
    StepResult::Draft(d) => serde_json::to_value(d)
      .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorOut { error: e.to_string() })))?,
    StepResult::Closed => serde_json::json!({ "closed": true, "draftKey": body.draft_key }),
  };
  Ok(Json(value))
}

#[instrument(level = "info", skip(state, body), fields(key = %body.draft_key, subject_id = %body.subject_id, percentage = body.percentage))]
pub async fn http_post_priority(
  State(state): State<Arc<AppState>>,
  Json(body): Json<PercentageIn>,
) -> impl IntoResponse {
  Json(logic::set_percentage(&state, &body.draft_key, &body.subject_id, body.percentage).await)
}

#[instrument(level = "info", skip(state, body), fields(key = %body.draft_key, from = body.from_index, to = body.to_index))]
pub async fn http_post_priority_move(
  State(state): State<Arc<AppState>>,
  Json(body): Json<MoveIn>,
) -> impl IntoResponse {
  Json(logic::move_subject(&state, &body.draft_key, body.from_index, body.to_index).await)
}

#[instrument(level = "info", skip(state, body), fields(key = %body.draft_key))]
pub async fn http_post_apply_suggestion(
  State(state): State<Arc<AppState>>,
  Json(body): Json<KeyIn>,
) -> impl IntoResponse {
  Json(logic::apply_suggestion(&state, &body.draft_key).await)
}

#[instrument(level = "info", skip(state, body), fields(key = %body.draft_key, histories = body.histories.len()))]
pub async fn http_post_ranks(
  State(state): State<Arc<AppState>>,
  Json(body): Json<RanksIn>,
) -> impl IntoResponse {
  let ranks = logic::suggest_ranks(&state, &body.draft_key, &body.histories).await;
  Json(ranks)
}

#[instrument(level = "info", skip(state, body), fields(key = %body.draft_key, name = %body.name))]
pub async fn http_post_schedule(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ScheduleIn>,
) -> impl IntoResponse {
  Json(
    logic::set_schedule(
      &state,
      &body.draft_key,
      &body.name,
      &body.start_date,
      &body.end_date,
      body.preferences,
    )
    .await,
  )
}

#[instrument(level = "info", skip(state, body), fields(key = %body.draft_key))]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<KeyIn>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorOut>)> {
  match logic::run_generation(&state, &body.draft_key).await {
    Ok(schedule) => {
      info!(target: "wizard", key = %body.draft_key, "HTTP generate succeeded");
      Ok(Json(schedule))
    }
    Err(e) => Err((StatusCode::BAD_GATEWAY, Json(ErrorOut { error: e }))),
  }
}

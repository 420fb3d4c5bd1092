//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::logic::{self, StepResult};
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "studyplan_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "studyplan_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target = "studyplan_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "studyplan_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "studyplan_backend", "WebSocket disconnected");
}

#[instrument(level = "info", skip(state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::StartWizard { draft_key, variant } => {
      let draft = logic::start_wizard(state, &draft_key, variant).await;
      tracing::info!(target: "wizard", key = %draft_key, step = draft.step, "WS wizard started");
      ServerWsMessage::Draft { draft }
    }

    ClientWsMessage::AddSubject { draft_key, name, exam_board, mode } => {
      let draft = logic::add_subject(state, &draft_key, &name, &exam_board, mode).await;
      ServerWsMessage::Draft { draft }
    }

    ClientWsMessage::RemoveSubject { draft_key, subject_id } => {
      let draft = logic::remove_subject(state, &draft_key, &subject_id).await;
      ServerWsMessage::Draft { draft }
    }

    ClientWsMessage::AddTopic { draft_key, subject_id, name, confidence } => {
      let draft = logic::add_topic(state, &draft_key, &subject_id, &name, confidence).await;
      ServerWsMessage::Draft { draft }
    }

    ClientWsMessage::RemoveTopic { draft_key, topic_id } => {
      let draft = logic::remove_topic(state, &draft_key, &topic_id).await;
      ServerWsMessage::Draft { draft }
    }

    ClientWsMessage::SetTopicConfidence { draft_key, topic_id, confidence } => {
      let draft = logic::set_topic_confidence(state, &draft_key, &topic_id, confidence).await;
      ServerWsMessage::Draft { draft }
    }

    ClientWsMessage::SetTestDate { draft_key, subject_id, date, label } => {
      let draft = logic::set_test_date(state, &draft_key, &subject_id, &date, &label).await;
      ServerWsMessage::Draft { draft }
    }

    ClientWsMessage::RemoveTestDate { draft_key, subject_id, label } => {
      let draft = logic::remove_test_date(state, &draft_key, &subject_id, &label).await;
      ServerWsMessage::Draft { draft }
    }

    ClientWsMessage::AddHomework { draft_key, subject_id, title, due_date, estimated_minutes } => {
      let draft =
        logic::add_homework(state, &draft_key, &subject_id, &title, &due_date, estimated_minutes).await;
      ServerWsMessage::Draft { draft }
    }

    ClientWsMessage::RemoveHomework { draft_key, id } => {
      let draft = logic::remove_homework(state, &draft_key, &id).await;
      ServerWsMessage::Draft { draft }
    }

    ClientWsMessage::AddEvent { draft_key, title, date, start, end } => {
      let draft = logic::add_event(state, &draft_key, &title, &date, &start, &end).await;
      ServerWsMessage::Draft { draft }
    }

    ClientWsMessage::RemoveEvent { draft_key, id } => {
      let draft = logic::remove_event(state, &draft_key, &id).await;
      ServerWsMessage::Draft { draft }
    }

    ClientWsMessage::SetSchedule { draft_key, name, start_date, end_date, preferences } => {
      let draft =
        logic::set_schedule(state, &draft_key, &name, &start_date, &end_date, preferences).await;
      ServerWsMessage::Draft { draft }
    }

    ClientWsMessage::NextStep { draft_key } => {
      let draft = logic::next_step(state, &draft_key).await;
      ServerWsMessage::Draft { draft }
    }

    ClientWsMessage::BackStep { draft_key } => match logic::back_step(state, &draft_key).await {
      StepResult::Draft(draft) => ServerWsMessage::Draft { draft },
      StepResult::Closed => {
        tracing::info!(target: "wizard", key = %draft_key, "WS wizard dismissed at step 1");
        ServerWsMessage::WizardClosed { draft_key }
      }
    },

    ClientWsMessage::JumpToStep { draft_key, step } => {
      let draft = logic::jump_step(state, &draft_key, step).await;
      ServerWsMessage::Draft { draft }
    }

    ClientWsMessage::SetPercentage { draft_key, subject_id, percentage } => {
      let draft = logic::set_percentage(state, &draft_key, &subject_id, percentage).await;
      ServerWsMessage::Draft { draft }
    }

    ClientWsMessage::MoveSubject { draft_key, from_index, to_index } => {
      let draft = logic::move_subject(state, &draft_key, from_index, to_index).await;
      ServerWsMessage::Draft { draft }
    }

    ClientWsMessage::ApplySuggestion { draft_key } => {
      let draft = logic::apply_suggestion(state, &draft_key).await;
      ServerWsMessage::Draft { draft }
    }

    ClientWsMessage::SuggestRanks { draft_key, histories } => {
      let ranks = logic::suggest_ranks(state, &draft_key, &histories).await;
      tracing::info!(target: "wizard", key = %draft_key, ranks = ranks.len(), "WS rank suggestion served");
      ServerWsMessage::RankSuggestion { ranks }
    }

    ClientWsMessage::Generate { draft_key } => match logic::run_generation(state, &draft_key).await {
      Ok(schedule) => {
        tracing::info!(target: "wizard", key = %draft_key, "WS generate succeeded");
        ServerWsMessage::Schedule { schedule }
      }
      Err(message) => ServerWsMessage::Error { message },
    },
  }
}

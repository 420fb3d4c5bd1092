//! Core wizard behaviors shared by both HTTP and WebSocket handlers.
//!
//! Every operation resolves the machine for its draft key through
//! `AppState::with_wizard` and answers with a full draft snapshot, so the
//! two transports stay thin and cannot drift apart. The composite flows
//! (back-out, rank suggestion, generation) live here too.

use tracing::{error, info, instrument};

use crate::domain::{StudyPreferences, SubjectMode};
use crate::protocol::{to_out, DraftOut};
use crate::state::AppState;
use crate::suggest::{performance_ranks, RankedSubject, SubjectHistory};
use crate::wizard::{BackOutcome, WizardVariant, STEP_SCHEDULE};

/// Outcome of a step transition: either a fresh snapshot or "the wizard was
/// dismissed" (back at step 1).
pub enum StepResult {
  Draft(DraftOut),
  Closed,
}

#[instrument(level = "info", skip(state))]
pub async fn start_wizard(state: &AppState, key: &str, variant: WizardVariant) -> DraftOut {
  state.start_wizard(key, variant).await;
  snapshot(state, key).await
}

/// Current draft for a key, resuming the session if needed.
pub async fn snapshot(state: &AppState, key: &str) -> DraftOut {
  state.with_wizard(key, |w| to_out(w)).await
}

// -------- Step 1: subjects --------

pub async fn add_subject(
  state: &AppState,
  key: &str,
  name: &str,
  exam_board: &str,
  mode: SubjectMode,
) -> DraftOut {
  state
    .with_wizard(key, |w| {
      w.add_subject(name, exam_board, mode);
      to_out(w)
    })
    .await
}

pub async fn remove_subject(state: &AppState, key: &str, subject_id: &str) -> DraftOut {
  state
    .with_wizard(key, |w| {
      w.remove_subject(subject_id);
      to_out(w)
    })
    .await
}

// -------- Step 2: topics --------

pub async fn add_topic(
  state: &AppState,
  key: &str,
  subject_id: &str,
  name: &str,
  confidence: Option<u8>,
) -> DraftOut {
  state
    .with_wizard(key, |w| {
      w.add_topic(subject_id, name, confidence);
      to_out(w)
    })
    .await
}

pub async fn remove_topic(state: &AppState, key: &str, topic_id: &str) -> DraftOut {
  state
    .with_wizard(key, |w| {
      w.remove_topic(topic_id);
      to_out(w)
    })
    .await
}

pub async fn set_topic_confidence(
  state: &AppState,
  key: &str,
  topic_id: &str,
  confidence: u8,
) -> DraftOut {
  state
    .with_wizard(key, |w| {
      w.set_topic_confidence(topic_id, confidence);
      to_out(w)
    })
    .await
}

// -------- Step 3: test dates --------

pub async fn set_test_date(
  state: &AppState,
  key: &str,
  subject_id: &str,
  date: &str,
  label: &str,
) -> DraftOut {
  state
    .with_wizard(key, |w| {
      w.set_test_date(subject_id, date, label);
      to_out(w)
    })
    .await
}

pub async fn remove_test_date(state: &AppState, key: &str, subject_id: &str, label: &str) -> DraftOut {
  state
    .with_wizard(key, |w| {
      w.remove_test_date(subject_id, label);
      to_out(w)
    })
    .await
}

// -------- Step 4: priorities --------

pub async fn set_percentage(state: &AppState, key: &str, subject_id: &str, value: i32) -> DraftOut {
  state
    .with_wizard(key, |w| {
      w.set_percentage(subject_id, value);
      to_out(w)
    })
    .await
}

pub async fn move_subject(state: &AppState, key: &str, from: usize, to: usize) -> DraftOut {
  state
    .with_wizard(key, |w| {
      w.move_subject(from, to);
      to_out(w)
    })
    .await
}

pub async fn apply_suggestion(state: &AppState, key: &str) -> DraftOut {
  state
    .with_wizard(key, |w| {
      let shares = w.apply_confidence_suggestion();
      info!(target: "wizard", %key, applied = shares.len(), "Confidence suggestion applied");
      to_out(w)
    })
    .await
}

/// Rank subjects by need from caller-supplied performance history. Advisory
/// only; it never touches the draft's percentages.
pub async fn suggest_ranks(
  state: &AppState,
  key: &str,
  histories: &[SubjectHistory],
) -> Vec<RankedSubject> {
  let subjects = state.with_wizard(key, |w| w.draft().subjects.clone()).await;
  performance_ranks(&subjects, histories)
}

// -------- Step 5: agenda --------

pub async fn add_homework(
  state: &AppState,
  key: &str,
  subject_id: &str,
  title: &str,
  due_date: &str,
  estimated_minutes: u32,
) -> DraftOut {
  state
    .with_wizard(key, |w| {
      w.add_homework(subject_id, title, due_date, estimated_minutes);
      to_out(w)
    })
    .await
}

pub async fn remove_homework(state: &AppState, key: &str, id: &str) -> DraftOut {
  state
    .with_wizard(key, |w| {
      w.remove_homework(id);
      to_out(w)
    })
    .await
}

pub async fn add_event(
  state: &AppState,
  key: &str,
  title: &str,
  date: &str,
  start: &str,
  end: &str,
) -> DraftOut {
  state
    .with_wizard(key, |w| {
      w.add_event(title, date, start, end);
      to_out(w)
    })
    .await
}

pub async fn remove_event(state: &AppState, key: &str, id: &str) -> DraftOut {
  state
    .with_wizard(key, |w| {
      w.remove_event(id);
      to_out(w)
    })
    .await
}

// -------- Step 6: schedule details --------

pub async fn set_schedule(
  state: &AppState,
  key: &str,
  name: &str,
  start_date: &str,
  end_date: &str,
  preferences: Option<StudyPreferences>,
) -> DraftOut {
  state
    .with_wizard(key, |w| {
      w.set_schedule(name, start_date, end_date, preferences);
      to_out(w)
    })
    .await
}

// -------- Transitions --------

pub async fn next_step(state: &AppState, key: &str) -> DraftOut {
  state
    .with_wizard(key, |w| {
      w.next();
      to_out(w)
    })
    .await
}

/// Back one step; at step 1 the wizard is dismissed and its live session
/// dropped. The stored draft survives for a later resume.
pub async fn back_step(state: &AppState, key: &str) -> StepResult {
  let outcome = state.with_wizard(key, |w| (w.back(), to_out(w))).await;
  match outcome {
    (BackOutcome::Exit, _) => {
      state.close_wizard(key).await;
      StepResult::Closed
    }
    (BackOutcome::Moved(_), out) => StepResult::Draft(out),
  }
}

pub async fn jump_step(state: &AppState, key: &str, step: u8) -> DraftOut {
  state
    .with_wizard(key, |w| {
      w.jump_to(step);
      to_out(w)
    })
    .await
}

// -------- Generation --------

/// Assemble the payload, call the generation service, and on success finish
/// the wizard (stored draft cleared, session dropped). Any failure leaves
/// the draft exactly as it was.
#[instrument(level = "info", skip(state))]
pub async fn run_generation(state: &AppState, key: &str) -> Result<serde_json::Value, String> {
  let Some(client) = state.generation.clone() else {
    return Err("Generation service is not configured (set GENERATION_API_URL).".into());
  };

  // Validate and assemble under the lock, then release it for the call.
  let payload = state
    .with_wizard(key, |w| {
      if !w.can_proceed(STEP_SCHEDULE) {
        return Err(
          "Timetable name, start date and end date are required before generating.".to_string(),
        );
      }
      Ok(w.generation_payload())
    })
    .await?;

  match client.generate(&payload).await {
    Ok(schedule) => {
      state.with_wizard(key, |w| w.finish()).await;
      state.close_wizard(key).await;
      info!(target: "wizard", %key, "Generation succeeded; wizard finished");
      Ok(schedule)
    }
    Err(e) => {
      error!(target: "wizard", %key, error = %e, "Generation failed; draft retained");
      Err(e)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::persist::{DraftStore, MemoryDraftStore};
  use std::sync::Arc;

  fn test_state() -> (AppState, Arc<MemoryDraftStore>) {
    let store = Arc::new(MemoryDraftStore::new());
    let handle: Arc<dyn DraftStore> = store.clone();
    (AppState::for_tests(handle), store)
  }

  #[tokio::test]
  async fn operations_resume_a_session_implicitly() {
    let (state, _) = test_state();
    let out = add_subject(&state, "k", "Maths", "AQA", SubjectMode::ShortTermExam).await;
    assert_eq!(out.subjects.len(), 1);
    assert!(out.can_proceed);
    // Same key hits the same live machine.
    let out = add_subject(&state, "k", "History", "", SubjectMode::NoExam).await;
    assert_eq!(out.subjects.len(), 2);
  }

  #[tokio::test]
  async fn back_at_step_one_closes_the_session_but_keeps_the_draft() {
    let (state, store) = test_state();
    add_subject(&state, "k", "Maths", "", SubjectMode::NoExam).await;
    match back_step(&state, "k").await {
      StepResult::Closed => {}
      StepResult::Draft(_) => panic!("back at step 1 must dismiss the wizard"),
    }
    assert!(state.sessions.read().await.is_empty());
    assert!(store.get("k").is_some());

    // A later operation resumes from the stored draft.
    let out = snapshot(&state, "k").await;
    assert_eq!(out.subjects.len(), 1);
  }

  #[tokio::test]
  async fn generation_without_a_client_is_rejected_and_draft_survives() {
    let (state, store) = test_state();
    add_subject(&state, "k", "Maths", "", SubjectMode::NoExam).await;
    set_schedule(&state, "k", "Plan", "2026-09-01", "2026-10-01", None).await;
    let err = run_generation(&state, "k").await.unwrap_err();
    assert!(err.contains("not configured"));
    assert!(store.get("k").is_some());
  }

  #[tokio::test]
  async fn suggest_ranks_reads_the_draft_without_mutating_it() {
    let (state, _) = test_state();
    let out = add_subject(&state, "k", "Maths", "", SubjectMode::NoExam).await;
    let subject_id = out.subjects[0].id.clone();
    let ranks = suggest_ranks(&state, "k", &[]).await;
    assert_eq!(ranks.len(), 1);
    assert_eq!(ranks[0].subject_id, subject_id);
    assert!(snapshot(&state, "k").await.priorities.is_empty());
  }
}

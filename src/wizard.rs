//! The configuration wizard's state machine.
//!
//! One instance per draft key. It owns the `WizardDraft`, gates forward
//! navigation per step, and writes the whole draft through the injected
//! `DraftStore` after every mutation so an interrupted session resumes where
//! it left off. It assembles the final generation payload but never calls
//! the generation service itself; completion and cancellation are signalled
//! by the surrounding handlers.
//!
//! Two variants share the implementation: the gated onboarding flow
//! (forward navigation blocked until a step's minimum data exists) and the
//! flattened edit-dialog flow (independently selectable tabs, no gating).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::allocation::PriorityAllocationEngine;
use crate::config::WizardDefaults;
use crate::domain::{
  AgendaEvent, GenerationRequest, HomeworkEntry, StudyPreferences, Subject, SubjectMode,
  TestDate, Topic, WizardDraft, DRAFT_VERSION,
};
use crate::persist::DraftStore;
use crate::suggest::confidence_shares;
use uuid::Uuid;

pub const STEP_SUBJECTS: u8 = 1;
pub const STEP_TOPICS: u8 = 2;
pub const STEP_TEST_DATES: u8 = 3;
pub const STEP_PRIORITIES: u8 = 4;
pub const STEP_AGENDA: u8 = 5;
pub const STEP_SCHEDULE: u8 = 6;
pub const STEP_COUNT: u8 = 6;

/// Gated = onboarding flow; Flattened = edit dialog, where every step is a
/// freely selectable tab and `next` is never blocked.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WizardVariant {
  Gated,
  Flattened,
}

impl Default for WizardVariant {
  fn default() -> Self { WizardVariant::Gated }
}

/// Result of a `back()` call. Leaving step 1 is an exit from the machine,
/// not a step change; the stored draft survives it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackOutcome {
  Moved(u8),
  Exit,
}

pub struct WizardStateMachine {
  key: String,
  variant: WizardVariant,
  draft: WizardDraft,
  store: Arc<dyn DraftStore>,
  default_topic_confidence: u8,
}

impl WizardStateMachine {
  /// Resume the draft stored under `key`, or start fresh at step 1.
  ///
  /// A missing key, unreadable JSON, or a draft written by another schema
  /// version all silently fall back to a fresh draft; resume failures are
  /// never user-visible.
  #[instrument(level = "info", skip(store, defaults))]
  pub fn resume_or_new(
    store: Arc<dyn DraftStore>,
    key: &str,
    variant: WizardVariant,
    defaults: &WizardDefaults,
  ) -> Self {
    let draft = match store.get(key) {
      Some(raw) => match serde_json::from_str::<WizardDraft>(&raw) {
        Ok(d) if d.version == DRAFT_VERSION => {
          info!(target: "wizard", %key, step = d.step, subjects = d.subjects.len(), "Resumed saved draft");
          d
        }
        Ok(d) => {
          warn!(target: "wizard", %key, found = d.version, expected = DRAFT_VERSION, "Draft version mismatch; starting fresh");
          WizardDraft::fresh(defaults.preferences())
        }
        Err(e) => {
          warn!(target: "wizard", %key, error = %e, "Stored draft unreadable; starting fresh");
          WizardDraft::fresh(defaults.preferences())
        }
      },
      None => WizardDraft::fresh(defaults.preferences()),
    };

    Self {
      key: key.to_string(),
      variant,
      draft,
      store,
      default_topic_confidence: defaults.topic_confidence,
    }
  }

  pub fn key(&self) -> &str {
    &self.key
  }

  pub fn variant(&self) -> WizardVariant {
    self.variant
  }

  pub fn step(&self) -> u8 {
    self.draft.step
  }

  pub fn draft(&self) -> &WizardDraft {
    &self.draft
  }

  /// Step gating. Violations disable the forward affordance; they are never
  /// errors.
  pub fn can_proceed(&self, step: u8) -> bool {
    match step {
      STEP_SUBJECTS => !self.draft.subjects.is_empty(),
      STEP_TOPICS | STEP_TEST_DATES | STEP_PRIORITIES | STEP_AGENDA => true,
      STEP_SCHEDULE => {
        !self.draft.start_date.trim().is_empty()
          && !self.draft.end_date.trim().is_empty()
          && !self.draft.timetable_name.trim().is_empty()
      }
      _ => false,
    }
  }

  // ---- Transitions ----

  /// Advance one step. Blocked by gating in the gated variant; no-op at the
  /// last step. Returns the step after the attempt either way.
  #[instrument(level = "debug", skip(self), fields(key = %self.key, step = self.draft.step))]
  pub fn next(&mut self) -> u8 {
    if self.draft.step >= STEP_COUNT {
      return self.draft.step;
    }
    if self.variant == WizardVariant::Gated && !self.can_proceed(self.draft.step) {
      debug!(target: "wizard", key = %self.key, step = self.draft.step, "Forward blocked by step gating");
      return self.draft.step;
    }
    self.draft.step += 1;
    if self.draft.step == STEP_PRIORITIES {
      self.sync_priorities();
    }
    self.persist();
    self.draft.step
  }

  /// Go back one step; at step 1 this is the exit/cancel transition. The
  /// stored draft is deliberately retained so the session can resume later.
  pub fn back(&mut self) -> BackOutcome {
    if self.draft.step <= 1 {
      info!(target: "wizard", key = %self.key, "Cancelled at step 1; draft retained for resume");
      return BackOutcome::Exit;
    }
    self.draft.step -= 1;
    self.persist();
    BackOutcome::Moved(self.draft.step)
  }

  /// Direct step selection. Only the flattened (tab) variant exposes this;
  /// the gated flow refuses it and stays put.
  pub fn jump_to(&mut self, step: u8) -> u8 {
    if self.variant != WizardVariant::Flattened {
      warn!(target: "wizard", key = %self.key, step, "jump_to refused in gated flow");
      return self.draft.step;
    }
    if !(1..=STEP_COUNT).contains(&step) {
      return self.draft.step;
    }
    self.draft.step = step;
    if step == STEP_PRIORITIES {
      self.sync_priorities();
    }
    self.persist();
    self.draft.step
  }

  // ---- Step 1: subjects ----

  pub fn add_subject(&mut self, name: &str, exam_board: &str, mode: SubjectMode) -> Subject {
    let subject = Subject::new(name, exam_board, mode);
    self.draft.subjects.push(subject.clone());
    // Records exist only once the priority step was entered; keep them
    // consistent from then on.
    if !self.draft.priorities.is_empty() {
      self.sync_priorities();
    }
    self.persist();
    subject
  }

  /// Remove a subject and everything hanging off its id: topics, test
  /// dates, homeworks, and its priority record.
  pub fn remove_subject(&mut self, subject_id: &str) {
    self.draft.subjects.retain(|s| s.id != subject_id);
    self.draft.topics.retain(|t| t.subject_id != subject_id);
    self.draft.test_dates.retain(|t| t.subject_id != subject_id);
    self.draft.homeworks.retain(|h| h.subject_id != subject_id);
    if !self.draft.priorities.is_empty() {
      self.sync_priorities();
    }
    self.persist();
  }

  // ---- Step 2: topics ----

  /// Add a topic under an existing subject; unknown subject ids are ignored
  /// (the UI cannot produce them, resumed drafts cannot either).
  pub fn add_topic(&mut self, subject_id: &str, name: &str, confidence: Option<u8>) -> Option<Topic> {
    if !self.draft.subjects.iter().any(|s| s.id == subject_id) {
      warn!(target: "wizard", key = %self.key, %subject_id, "add_topic for unknown subject ignored");
      return None;
    }
    let topic = Topic::new(subject_id, name, confidence.unwrap_or(self.default_topic_confidence));
    self.draft.topics.push(topic.clone());
    self.persist();
    Some(topic)
  }

  pub fn remove_topic(&mut self, topic_id: &str) {
    self.draft.topics.retain(|t| t.id != topic_id);
    self.persist();
  }

  pub fn set_topic_confidence(&mut self, topic_id: &str, confidence: u8) {
    if let Some(t) = self.draft.topics.iter_mut().find(|t| t.id == topic_id) {
      t.confidence = confidence.min(100);
      self.persist();
    }
  }

  // ---- Step 3: test dates ----

  /// Upsert the test date for (subject, label); one subject can carry
  /// several labelled tests.
  pub fn set_test_date(&mut self, subject_id: &str, date: &str, label: &str) {
    if let Some(existing) = self
      .draft
      .test_dates
      .iter_mut()
      .find(|t| t.subject_id == subject_id && t.label == label)
    {
      existing.date = date.to_string();
    } else {
      self.draft.test_dates.push(TestDate {
        subject_id: subject_id.to_string(),
        date: date.to_string(),
        label: label.to_string(),
      });
    }
    self.persist();
  }

  pub fn remove_test_date(&mut self, subject_id: &str, label: &str) {
    self
      .draft
      .test_dates
      .retain(|t| !(t.subject_id == subject_id && t.label == label));
    self.persist();
  }

  // ---- Step 4: priorities ----

  fn sync_priorities(&mut self) {
    let mut engine = PriorityAllocationEngine::from_records(std::mem::take(&mut self.draft.priorities));
    engine.sync_subjects(&self.draft.subjects);
    self.draft.priorities = engine.into_records();
  }

  fn ensure_priorities(&mut self) {
    if self.draft.priorities.is_empty() && !self.draft.subjects.is_empty() {
      self.draft.priorities =
        PriorityAllocationEngine::from_subjects(&self.draft.subjects).into_records();
    }
  }

  pub fn set_percentage(&mut self, subject_id: &str, value: i32) {
    self.ensure_priorities();
    let mut engine = PriorityAllocationEngine::from_records(std::mem::take(&mut self.draft.priorities));
    engine.set_percentage(subject_id, value);
    self.draft.priorities = engine.into_records();
    self.persist();
  }

  pub fn move_subject(&mut self, from: usize, to: usize) {
    self.ensure_priorities();
    let mut engine = PriorityAllocationEngine::from_records(std::mem::take(&mut self.draft.priorities));
    engine.move_subject(from, to);
    self.draft.priorities = engine.into_records();
    self.persist();
  }

  /// Replace the distribution with the confidence-derived suggestion and
  /// re-rank accordingly. Returns the applied shares.
  pub fn apply_confidence_suggestion(&mut self) -> Vec<(String, i32)> {
    self.ensure_priorities();
    let shares =
      confidence_shares(&self.draft.subjects, &self.draft.topics, self.default_topic_confidence);
    let mut engine = PriorityAllocationEngine::from_records(std::mem::take(&mut self.draft.priorities));
    engine.apply_shares(&shares);
    self.draft.priorities = engine.into_records();
    self.persist();
    shares
  }

  // ---- Step 5: agenda ----

  pub fn add_homework(
    &mut self,
    subject_id: &str,
    title: &str,
    due_date: &str,
    estimated_minutes: u32,
  ) -> HomeworkEntry {
    let hw = HomeworkEntry {
      id: Uuid::new_v4().to_string(),
      subject_id: subject_id.to_string(),
      title: title.to_string(),
      due_date: due_date.to_string(),
      estimated_minutes,
    };
    self.draft.homeworks.push(hw.clone());
    self.persist();
    hw
  }

  pub fn remove_homework(&mut self, id: &str) {
    self.draft.homeworks.retain(|h| h.id != id);
    self.persist();
  }

  pub fn add_event(&mut self, title: &str, date: &str, start: &str, end: &str) -> AgendaEvent {
    let ev = AgendaEvent {
      id: Uuid::new_v4().to_string(),
      title: title.to_string(),
      date: date.to_string(),
      start: start.to_string(),
      end: end.to_string(),
    };
    self.draft.events.push(ev.clone());
    self.persist();
    ev
  }

  pub fn remove_event(&mut self, id: &str) {
    self.draft.events.retain(|e| e.id != id);
    self.persist();
  }

  // ---- Step 6: schedule ----

  pub fn set_schedule(
    &mut self,
    name: &str,
    start_date: &str,
    end_date: &str,
    preferences: Option<StudyPreferences>,
  ) {
    self.draft.timetable_name = name.to_string();
    self.draft.start_date = start_date.to_string();
    self.draft.end_date = end_date.to_string();
    if let Some(p) = preferences {
      self.draft.preferences = p;
    }
    self.persist();
  }

  // ---- Completion ----

  /// Assemble the payload the generation service expects. Pure read; the
  /// call itself is the handlers' business.
  pub fn generation_payload(&self) -> GenerationRequest {
    GenerationRequest {
      name: self.draft.timetable_name.clone(),
      subjects: self.draft.subjects.clone(),
      topics: self.draft.topics.clone(),
      test_dates: self.draft.test_dates.clone(),
      priorities: self.draft.priorities.clone(),
      homeworks: self.draft.homeworks.clone(),
      events: self.draft.events.clone(),
      start_date: self.draft.start_date.clone(),
      end_date: self.draft.end_date.clone(),
      preferences: self.draft.preferences.clone(),
    }
  }

  /// Terminal transition after a successful generation call: the stored
  /// draft is deleted. Only ever invoked on explicit success.
  pub fn finish(&mut self) {
    self.store.delete(&self.key);
    info!(target: "wizard", key = %self.key, "Wizard completed; stored draft cleared");
  }

  /// Best-effort write of the full draft after every mutation.
  fn persist(&self) {
    match serde_json::to_string(&self.draft) {
      Ok(json) => self.store.set(&self.key, &json),
      Err(e) => error!(target: "wizard", key = %self.key, error = %e, "Draft serialization failed; skipping persist"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::persist::MemoryDraftStore;

  fn machine(store: Arc<dyn DraftStore>, key: &str, variant: WizardVariant) -> WizardStateMachine {
    WizardStateMachine::resume_or_new(store, key, variant, &WizardDefaults::default())
  }

  #[test]
  fn step_one_gates_on_at_least_one_subject() {
    let store: Arc<dyn DraftStore> = Arc::new(MemoryDraftStore::new());
    let mut w = machine(store, "k", WizardVariant::Gated);
    assert!(!w.can_proceed(STEP_SUBJECTS));
    assert_eq!(w.next(), 1, "blocked next must not advance");
    w.add_subject("Maths", "Edexcel", SubjectMode::ShortTermExam);
    assert!(w.can_proceed(STEP_SUBJECTS));
    assert_eq!(w.next(), 2);
  }

  #[test]
  fn schedule_step_requires_name_and_both_dates() {
    let store: Arc<dyn DraftStore> = Arc::new(MemoryDraftStore::new());
    let mut w = machine(store, "k", WizardVariant::Gated);
    assert!(!w.can_proceed(STEP_SCHEDULE));
    w.set_schedule("  ", "2026-09-01", "2026-12-18", None);
    assert!(!w.can_proceed(STEP_SCHEDULE), "whitespace name must not pass");
    w.set_schedule("Autumn mocks", "2026-09-01", "2026-12-18", None);
    assert!(w.can_proceed(STEP_SCHEDULE));
  }

  #[test]
  fn next_is_a_noop_at_the_last_step() {
    let store: Arc<dyn DraftStore> = Arc::new(MemoryDraftStore::new());
    let mut w = machine(store, "k", WizardVariant::Flattened);
    assert_eq!(w.jump_to(STEP_SCHEDULE), 6);
    assert_eq!(w.next(), 6);
  }

  #[test]
  fn back_at_step_one_exits_and_keeps_the_stored_draft() {
    let store = Arc::new(MemoryDraftStore::new());
    let handle: Arc<dyn DraftStore> = store.clone();
    let mut w = machine(handle, "k", WizardVariant::Gated);
    w.add_subject("Maths", "", SubjectMode::NoExam);
    assert_eq!(w.back(), BackOutcome::Exit);
    assert!(store.get("k").is_some(), "cancel must not clear the draft");
  }

  #[test]
  fn resumes_step_and_payload_after_restart() {
    let store = Arc::new(MemoryDraftStore::new());
    let handle: Arc<dyn DraftStore> = store.clone();
    let mut w = machine(handle.clone(), "k", WizardVariant::Gated);
    let maths = w.add_subject("Maths", "AQA", SubjectMode::ShortTermExam);
    w.add_topic(&maths.id, "Differentiation", Some(35));
    w.next();
    w.next();

    let resumed = machine(handle, "k", WizardVariant::Gated);
    assert_eq!(resumed.step(), 3);
    assert_eq!(resumed.draft(), w.draft());
  }

  #[test]
  fn resumes_preferences_at_step_five_with_deep_equality() {
    let store = Arc::new(MemoryDraftStore::new());
    let handle: Arc<dyn DraftStore> = store.clone();
    let mut w = machine(handle.clone(), "k", WizardVariant::Flattened);
    w.add_subject("Physics", "", SubjectMode::LongTermExam);
    let mut prefs = StudyPreferences::default();
    prefs.daily_study_hours = 3.5;
    prefs.days[2].enabled = false;
    prefs.lunch = crate::domain::AuxWindow { enabled: true, start: "12:30".into(), end: "13:00".into() };
    w.set_schedule("Plan", "2026-09-01", "2026-10-01", Some(prefs.clone()));
    w.jump_to(STEP_AGENDA);

    let resumed = machine(handle, "k", WizardVariant::Flattened);
    assert_eq!(resumed.step(), STEP_AGENDA);
    assert_eq!(resumed.draft().preferences, prefs);
  }

  #[test]
  fn unreadable_stored_draft_falls_back_to_a_fresh_one() {
    let store = Arc::new(MemoryDraftStore::new());
    store.set("k", "{ this is not json");
    let handle: Arc<dyn DraftStore> = store;
    let w = machine(handle, "k", WizardVariant::Gated);
    assert_eq!(w.step(), 1);
    assert!(w.draft().subjects.is_empty());
  }

  #[test]
  fn draft_version_mismatch_reads_as_absent() {
    let store = Arc::new(MemoryDraftStore::new());
    let mut old = WizardDraft::fresh(StudyPreferences::default());
    old.version = DRAFT_VERSION + 1;
    old.step = 4;
    store.set("k", &serde_json::to_string(&old).unwrap());
    let handle: Arc<dyn DraftStore> = store;
    let w = machine(handle, "k", WizardVariant::Gated);
    assert_eq!(w.step(), 1);
  }

  #[test]
  fn gated_flow_refuses_jump_to() {
    let store: Arc<dyn DraftStore> = Arc::new(MemoryDraftStore::new());
    let mut w = machine(store, "k", WizardVariant::Gated);
    assert_eq!(w.jump_to(5), 1);
  }

  #[test]
  fn priority_records_are_created_on_first_entry_into_the_priority_step() {
    let store: Arc<dyn DraftStore> = Arc::new(MemoryDraftStore::new());
    let mut w = machine(store, "k", WizardVariant::Gated);
    w.add_subject("Maths", "", SubjectMode::NoExam);
    w.add_subject("History", "", SubjectMode::NoExam);
    assert!(w.draft().priorities.is_empty());
    w.next(); // topics
    w.next(); // test dates
    assert!(w.draft().priorities.is_empty());
    w.next(); // priorities
    assert_eq!(w.step(), STEP_PRIORITIES);
    let pcts: Vec<i32> = w.draft().priorities.iter().map(|r| r.percentage).collect();
    assert_eq!(pcts, vec![50, 50]);
  }

  #[test]
  fn removing_a_subject_destroys_its_priority_record_and_topics() {
    let store: Arc<dyn DraftStore> = Arc::new(MemoryDraftStore::new());
    let mut w = machine(store, "k", WizardVariant::Flattened);
    let a = w.add_subject("A", "", SubjectMode::NoExam);
    let b = w.add_subject("B", "", SubjectMode::NoExam);
    w.add_topic(&a.id, "t", None);
    w.jump_to(STEP_PRIORITIES);
    assert_eq!(w.draft().priorities.len(), 2);

    w.remove_subject(&a.id);
    assert_eq!(w.draft().priorities.len(), 1);
    assert_eq!(w.draft().priorities[0].subject_id, b.id);
    assert_eq!(w.draft().priorities[0].percentage, 100);
    assert!(w.draft().topics.is_empty());
  }

  #[test]
  fn finish_deletes_the_stored_draft() {
    let store = Arc::new(MemoryDraftStore::new());
    let handle: Arc<dyn DraftStore> = store.clone();
    let mut w = machine(handle, "k", WizardVariant::Gated);
    w.add_subject("Maths", "", SubjectMode::NoExam);
    assert!(store.get("k").is_some());
    w.finish();
    assert!(store.get("k").is_none());
  }

  #[test]
  fn generation_payload_mirrors_the_draft() {
    let store: Arc<dyn DraftStore> = Arc::new(MemoryDraftStore::new());
    let mut w = machine(store, "k", WizardVariant::Flattened);
    let s = w.add_subject("Maths", "OCR", SubjectMode::ShortTermExam);
    w.add_topic(&s.id, "Vectors", Some(20));
    w.set_test_date(&s.id, "2026-11-05", "Paper 1");
    w.set_schedule("Mocks", "2026-09-01", "2026-11-01", None);
    w.jump_to(STEP_PRIORITIES);

    let payload = w.generation_payload();
    assert_eq!(payload.name, "Mocks");
    assert_eq!(payload.subjects, w.draft().subjects);
    assert_eq!(payload.priorities, w.draft().priorities);
    assert_eq!(payload.start_date, "2026-09-01");
  }
}

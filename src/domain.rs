//! Domain models for the configuration wizard: subjects, topics, priority
//! records, agenda entries, study preferences, and the wizard draft itself.
//!
//! Everything here is plain serde data. The draft is owned exclusively by one
//! `WizardStateMachine` and mutated only through its methods; these types
//! carry no behavior beyond construction helpers and defaults.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current on-disk draft schema. Bump when the draft layout changes in a way
/// old payloads cannot satisfy; mismatches are treated as "no saved draft".
pub const DRAFT_VERSION: u32 = 1;

/// How a subject is being studied. Determines whether downstream steps
/// expect test dates for it.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubjectMode {
  ShortTermExam,
  LongTermExam,
  NoExam,
}

impl Default for SubjectMode {
  fn default() -> Self { SubjectMode::NoExam }
}

/// A subject under study. Identity (`id`) is stable once created and is the
/// foreign key for topics, test dates, and priority records.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Subject {
  pub id: String,
  pub name: String,
  #[serde(default)] pub exam_board: String,
  #[serde(default)] pub mode: SubjectMode,
}

impl Subject {
  pub fn new(name: impl Into<String>, exam_board: impl Into<String>, mode: SubjectMode) -> Self {
    Self {
      id: Uuid::new_v4().to_string(),
      name: name.into(),
      exam_board: exam_board.into(),
      mode,
    }
  }
}

/// One topic within a subject. Confidence is 0..=100 and feeds the
/// suggestion scorer; it defaults to the neutral midpoint.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Topic {
  pub id: String,
  pub subject_id: String,
  pub name: String,
  #[serde(default = "default_confidence")]
  pub confidence: u8,
}

pub fn default_confidence() -> u8 { 50 }

impl Topic {
  pub fn new(subject_id: impl Into<String>, name: impl Into<String>, confidence: u8) -> Self {
    Self {
      id: Uuid::new_v4().to_string(),
      subject_id: subject_id.into(),
      name: name.into(),
      confidence: confidence.min(100),
    }
  }
}

/// A scheduled test for one subject. Dates are ISO "YYYY-MM-DD" strings; the
/// wizard only checks presence, interpretation is the generator's business.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TestDate {
  pub subject_id: String,
  pub date: String,
  #[serde(default)] pub label: String,
}

/// One subject's share of the 100% time budget plus its rank in the
/// allocation order. Collection invariant: percentages sum to exactly 100,
/// each within [5, 80], ranks dense 1..N.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PriorityRecord {
  pub subject_id: String,
  pub percentage: i32,
  pub rank: u32,
}

/// A homework item the generator must schedule around.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HomeworkEntry {
  pub id: String,
  pub subject_id: String,
  pub title: String,
  pub due_date: String,
  #[serde(default)] pub estimated_minutes: u32,
}

/// A fixed calendar event (lesson, club, commitment) blocking study time.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AgendaEvent {
  pub id: String,
  pub title: String,
  pub date: String,
  pub start: String,
  pub end: String,
}

/// Fixed sessions run exactly `session_minutes`; flexible lets the generator
/// stretch or shrink them to fit a window.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DurationMode {
  Fixed,
  Flexible,
}

impl Default for DurationMode {
  fn default() -> Self { DurationMode::Flexible }
}

/// One weekday's study window.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DayWindow {
  pub enabled: bool,
  pub start: String,
  pub end: String,
}

impl Default for DayWindow {
  fn default() -> Self {
    Self { enabled: true, start: "16:00".into(), end: "18:00".into() }
  }
}

/// Optional extra study window (before school, lunch break, free period).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct AuxWindow {
  #[serde(default)] pub enabled: bool,
  #[serde(default)] pub start: String,
  #[serde(default)] pub end: String,
}

/// Scheduling preferences collected in the final wizard step. Opaque to the
/// engine beyond presence validation; consumed by the generation service.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StudyPreferences {
  pub daily_study_hours: f32,
  /// Monday-first, always 7 entries.
  pub days: Vec<DayWindow>,
  pub session_minutes: u32,
  pub break_minutes: u32,
  #[serde(default)] pub duration_mode: DurationMode,
  #[serde(default)] pub before_school: AuxWindow,
  #[serde(default)] pub lunch: AuxWindow,
  #[serde(default)] pub free_period: AuxWindow,
}

impl Default for StudyPreferences {
  fn default() -> Self {
    Self {
      daily_study_hours: 2.0,
      days: vec![DayWindow::default(); 7],
      session_minutes: 45,
      break_minutes: 10,
      duration_mode: DurationMode::Flexible,
      before_school: AuxWindow::default(),
      lunch: AuxWindow::default(),
      free_period: AuxWindow::default(),
    }
  }
}

/// The full in-progress configuration accumulated across wizard steps.
///
/// Serialized as one JSON document under one store key after every mutation;
/// all buckets default so that old or partial payloads still deserialize.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WizardDraft {
  pub version: u32,
  /// Current step, 1-based.
  pub step: u8,
  #[serde(default)] pub subjects: Vec<Subject>,
  #[serde(default)] pub topics: Vec<Topic>,
  #[serde(default)] pub test_dates: Vec<TestDate>,
  #[serde(default)] pub priorities: Vec<PriorityRecord>,
  #[serde(default)] pub homeworks: Vec<HomeworkEntry>,
  #[serde(default)] pub events: Vec<AgendaEvent>,
  #[serde(default)] pub timetable_name: String,
  #[serde(default)] pub start_date: String,
  #[serde(default)] pub end_date: String,
  pub preferences: StudyPreferences,
}

impl WizardDraft {
  /// Fresh step-1 draft with the given preference defaults.
  pub fn fresh(preferences: StudyPreferences) -> Self {
    Self {
      version: DRAFT_VERSION,
      step: 1,
      subjects: Vec::new(),
      topics: Vec::new(),
      test_dates: Vec::new(),
      priorities: Vec::new(),
      homeworks: Vec::new(),
      events: Vec::new(),
      timetable_name: String::new(),
      start_date: String::new(),
      end_date: String::new(),
      preferences,
    }
  }
}

/// Payload handed to the external generation service on completion.
/// Assembled by the wizard; the machine itself never performs the call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
  pub name: String,
  pub subjects: Vec<Subject>,
  pub topics: Vec<Topic>,
  pub test_dates: Vec<TestDate>,
  pub priorities: Vec<PriorityRecord>,
  pub homeworks: Vec<HomeworkEntry>,
  pub events: Vec<AgendaEvent>,
  pub start_date: String,
  pub end_date: String,
  pub preferences: StudyPreferences,
}

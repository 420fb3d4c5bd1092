//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{
  AgendaEvent, HomeworkEntry, PriorityRecord, StudyPreferences, Subject, SubjectMode, TestDate,
  Topic,
};
use crate::suggest::{RankedSubject, SubjectHistory};
use crate::wizard::{WizardStateMachine, WizardVariant};

/// Messages the client can send over WebSocket. Every wizard operation names
/// the draft key it targets; the key doubles as the session id.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    StartWizard {
        #[serde(rename = "draftKey")]
        draft_key: String,
        #[serde(default)]
        variant: WizardVariant,
    },
    AddSubject {
        #[serde(rename = "draftKey")]
        draft_key: String,
        name: String,
        #[serde(rename = "examBoard", default)]
        exam_board: String,
        #[serde(default)]
        mode: SubjectMode,
    },
    RemoveSubject {
        #[serde(rename = "draftKey")]
        draft_key: String,
        #[serde(rename = "subjectId")]
        subject_id: String,
    },
    AddTopic {
        #[serde(rename = "draftKey")]
        draft_key: String,
        #[serde(rename = "subjectId")]
        subject_id: String,
        name: String,
        confidence: Option<u8>,
    },
    RemoveTopic {
        #[serde(rename = "draftKey")]
        draft_key: String,
        #[serde(rename = "topicId")]
        topic_id: String,
    },
    SetTopicConfidence {
        #[serde(rename = "draftKey")]
        draft_key: String,
        #[serde(rename = "topicId")]
        topic_id: String,
        confidence: u8,
    },
    SetTestDate {
        #[serde(rename = "draftKey")]
        draft_key: String,
        #[serde(rename = "subjectId")]
        subject_id: String,
        date: String,
        #[serde(default)]
        label: String,
    },
    RemoveTestDate {
        #[serde(rename = "draftKey")]
        draft_key: String,
        #[serde(rename = "subjectId")]
        subject_id: String,
        #[serde(default)]
        label: String,
    },
    AddHomework {
        #[serde(rename = "draftKey")]
        draft_key: String,
        #[serde(rename = "subjectId")]
        subject_id: String,
        title: String,
        #[serde(rename = "dueDate")]
        due_date: String,
        #[serde(rename = "estimatedMinutes", default)]
        estimated_minutes: u32,
    },
    RemoveHomework {
        #[serde(rename = "draftKey")]
        draft_key: String,
        id: String,
    },
    AddEvent {
        #[serde(rename = "draftKey")]
        draft_key: String,
        title: String,
        date: String,
        start: String,
        end: String,
    },
    RemoveEvent {
        #[serde(rename = "draftKey")]
        draft_key: String,
        id: String,
    },
    SetSchedule {
        #[serde(rename = "draftKey")]
        draft_key: String,
        name: String,
        #[serde(rename = "startDate")]
        start_date: String,
        #[serde(rename = "endDate")]
        end_date: String,
        preferences: Option<StudyPreferences>,
    },
    NextStep {
        #[serde(rename = "draftKey")]
        draft_key: String,
    },
    BackStep {
        #[serde(rename = "draftKey")]
        draft_key: String,
    },
    JumpToStep {
        #[serde(rename = "draftKey")]
        draft_key: String,
        step: u8,
    },
    SetPercentage {
        #[serde(rename = "draftKey")]
        draft_key: String,
        #[serde(rename = "subjectId")]
        subject_id: String,
        percentage: i32,
    },
    MoveSubject {
        #[serde(rename = "draftKey")]
        draft_key: String,
        #[serde(rename = "fromIndex")]
        from_index: usize,
        #[serde(rename = "toIndex")]
        to_index: usize,
    },
    ApplySuggestion {
        #[serde(rename = "draftKey")]
        draft_key: String,
    },
    SuggestRanks {
        #[serde(rename = "draftKey")]
        draft_key: String,
        #[serde(default)]
        histories: Vec<SubjectHistory>,
    },
    Generate {
        #[serde(rename = "draftKey")]
        draft_key: String,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Draft {
        draft: DraftOut,
    },
    RankSuggestion {
        ranks: Vec<RankedSubject>,
    },
    Schedule {
        schedule: serde_json::Value,
    },
    WizardClosed {
        draft_key: String,
    },
    Error {
        message: String,
    },
}

/// Full draft snapshot sent after every operation; the frontend renders
/// directly from this, including the disabled/enabled forward affordance.
#[derive(Debug, Serialize)]
pub struct DraftOut {
    pub draft_key: String,
    pub variant: WizardVariant,
    pub step: u8,
    pub can_proceed: bool,
    pub subjects: Vec<Subject>,
    pub topics: Vec<Topic>,
    pub test_dates: Vec<TestDate>,
    pub priorities: Vec<PriorityRecord>,
    pub homeworks: Vec<HomeworkEntry>,
    pub events: Vec<AgendaEvent>,
    pub timetable_name: String,
    pub start_date: String,
    pub end_date: String,
    pub preferences: StudyPreferences,
}

/// Convert the machine's current state to the public DTO.
pub fn to_out(w: &WizardStateMachine) -> DraftOut {
    let d = w.draft();
    DraftOut {
        draft_key: w.key().to_string(),
        variant: w.variant(),
        step: d.step,
        can_proceed: w.can_proceed(d.step),
        subjects: d.subjects.clone(),
        topics: d.topics.clone(),
        test_dates: d.test_dates.clone(),
        priorities: d.priorities.clone(),
        homeworks: d.homeworks.clone(),
        events: d.events.clone(),
        timetable_name: d.timetable_name.clone(),
        start_date: d.start_date.clone(),
        end_date: d.end_date.clone(),
        preferences: d.preferences.clone(),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct DraftKeyQuery {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct StartIn {
    #[serde(rename = "draftKey")]
    pub draft_key: String,
    #[serde(default)]
    pub variant: WizardVariant,
}

#[derive(Debug, Deserialize)]
pub struct SubjectIn {
    #[serde(rename = "draftKey")]
    pub draft_key: String,
    pub name: String,
    #[serde(rename = "examBoard", default)]
    pub exam_board: String,
    #[serde(default)]
    pub mode: SubjectMode,
}

#[derive(Debug, Deserialize)]
pub struct TopicIn {
    #[serde(rename = "draftKey")]
    pub draft_key: String,
    #[serde(rename = "subjectId")]
    pub subject_id: String,
    pub name: String,
    pub confidence: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct StepIn {
    #[serde(rename = "draftKey")]
    pub draft_key: String,
    /// "next", "back", or "jump".
    pub action: String,
    pub step: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct PercentageIn {
    #[serde(rename = "draftKey")]
    pub draft_key: String,
    #[serde(rename = "subjectId")]
    pub subject_id: String,
    pub percentage: i32,
}

#[derive(Debug, Deserialize)]
pub struct MoveIn {
    #[serde(rename = "draftKey")]
    pub draft_key: String,
    #[serde(rename = "fromIndex")]
    pub from_index: usize,
    #[serde(rename = "toIndex")]
    pub to_index: usize,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleIn {
    #[serde(rename = "draftKey")]
    pub draft_key: String,
    pub name: String,
    #[serde(rename = "startDate")]
    pub start_date: String,
    #[serde(rename = "endDate")]
    pub end_date: String,
    pub preferences: Option<StudyPreferences>,
}

#[derive(Debug, Deserialize)]
pub struct RanksIn {
    #[serde(rename = "draftKey")]
    pub draft_key: String,
    #[serde(default)]
    pub histories: Vec<SubjectHistory>,
}

/// Body for key-only operations (apply suggestion, generate).
#[derive(Debug, Deserialize)]
pub struct KeyIn {
    #[serde(rename = "draftKey")]
    pub draft_key: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}

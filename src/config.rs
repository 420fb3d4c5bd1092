//! Loading planner configuration (wizard defaults + preference defaults)
//! from TOML.
//!
//! See `PlannerConfig` and `WizardDefaults` for the expected schema.

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::{DayWindow, DurationMode, StudyPreferences};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PlannerConfig {
  #[serde(default)]
  pub defaults: WizardDefaults,
}

/// Defaults applied to freshly created drafts. Override in TOML to match a
/// school's timetable shape (e.g. shorter weekday windows, fixed sessions).
#[derive(Clone, Debug, Deserialize)]
pub struct WizardDefaults {
  pub daily_study_hours: f32,
  pub session_minutes: u32,
  pub break_minutes: u32,
  pub duration_mode: DurationMode,
  pub window_start: String,
  pub window_end: String,
  /// Confidence assigned to topics created without an explicit rating.
  pub topic_confidence: u8,
}

impl Default for WizardDefaults {
  fn default() -> Self {
    Self {
      daily_study_hours: 2.0,
      session_minutes: 45,
      break_minutes: 10,
      duration_mode: DurationMode::Flexible,
      window_start: "16:00".into(),
      window_end: "18:00".into(),
      topic_confidence: 50,
    }
  }
}

impl WizardDefaults {
  /// Materialize the preference block a fresh draft starts from.
  pub fn preferences(&self) -> StudyPreferences {
    StudyPreferences {
      daily_study_hours: self.daily_study_hours,
      days: vec![
        DayWindow {
          enabled: true,
          start: self.window_start.clone(),
          end: self.window_end.clone(),
        };
        7
      ],
      session_minutes: self.session_minutes,
      break_minutes: self.break_minutes,
      duration_mode: self.duration_mode,
      ..StudyPreferences::default()
    }
  }
}

/// Attempt to load `PlannerConfig` from PLANNER_CONFIG_PATH. On any
/// parsing/IO error, returns None and the built-in defaults apply.
pub fn load_planner_config_from_env() -> Option<PlannerConfig> {
  let path = std::env::var("PLANNER_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<PlannerConfig>(&s) {
      Ok(cfg) => {
        info!(target: "studyplan_backend", %path, "Loaded planner config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "studyplan_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "studyplan_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_produce_seven_enabled_days() {
    let prefs = WizardDefaults::default().preferences();
    assert_eq!(prefs.days.len(), 7);
    assert!(prefs.days.iter().all(|d| d.enabled));
  }

  #[test]
  fn toml_overrides_apply() {
    let cfg: PlannerConfig = toml::from_str(
      r#"
      [defaults]
      daily_study_hours = 1.5
      session_minutes = 30
      break_minutes = 5
      duration_mode = "fixed"
      window_start = "17:00"
      window_end = "19:00"
      topic_confidence = 40
      "#,
    )
    .expect("parse");
    assert_eq!(cfg.defaults.session_minutes, 30);
    assert_eq!(cfg.defaults.duration_mode, DurationMode::Fixed);
    assert_eq!(cfg.defaults.preferences().days[0].start, "17:00");
  }
}

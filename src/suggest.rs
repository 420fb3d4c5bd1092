//! Suggestion scoring: turning confidence and performance signals into a
//! priority distribution or a rank ordering.
//!
//! Two variants, per the product's two data situations:
//! - `confidence_shares` is what "Apply Suggestions" actually applies: topic
//!   confidence inverted per subject and normalized to an exact-100 integer
//!   split.
//! - `performance_ranks` is used when historical test/practice data exists;
//!   it orders subjects by need but never dictates percentages.
//!
//! Both are pure and total: every degenerate input (no subjects, no topics,
//! zero-weight normalization) produces a defined deterministic output.

use serde::{Deserialize, Serialize};

use crate::allocation::{MAX_SHARE, MIN_SHARE};
use crate::domain::{Subject, Topic};
use crate::util::avg;

/// Historical performance signals for one subject, read-only. Absence of any
/// field is a valid, expected state and falls back to the neutral baseline.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SubjectHistory {
  pub subject_id: String,
  /// Past test results as percentages.
  #[serde(default)] pub test_scores: Vec<f32>,
  /// Practice confidence logs on a 1..5 scale.
  #[serde(default)] pub confidence_ratings: Vec<f32>,
  #[serde(default)] pub strengths: Vec<String>,
  #[serde(default)] pub weaknesses: Vec<String>,
}

/// One subject's computed need score and resulting rank.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct RankedSubject {
  pub subject_id: String,
  pub score: f32,
  /// 1 = most in need of time.
  pub rank: u32,
}

const BASELINE: f32 = 50.0;

/// Suggested integer percentages per subject from topic confidence alone.
///
/// Per subject: invert the average topic confidence (low confidence means
/// high need), normalize the inverted scores to sum exactly 100, clamp each
/// share into the editor's [5, 80] bounds, and walk any leftover units onto
/// records that can still take them. Subjects without topics score at the
/// neutral default confidence. Deterministic for identical inputs.
pub fn confidence_shares(
  subjects: &[Subject],
  topics: &[Topic],
  default_confidence: u8,
) -> Vec<(String, i32)> {
  let n = subjects.len();
  if n == 0 {
    return Vec::new();
  }

  let inverted: Vec<f32> = subjects
    .iter()
    .map(|s| {
      let confs: Vec<f32> = topics
        .iter()
        .filter(|t| t.subject_id == s.id)
        .map(|t| t.confidence as f32)
        .collect();
      100.0 - avg(&confs).unwrap_or(default_confidence as f32)
    })
    .collect();

  let total: f32 = inverted.iter().sum();
  let mut shares: Vec<i32> = if total <= 0.0 {
    // Equal division when nothing expresses need.
    let base = 100 / n as i32;
    let mut v = vec![base; n];
    v[0] += 100 - base * n as i32;
    v
  } else {
    inverted.iter().map(|w| (w / total * 100.0).round() as i32).collect()
  };

  for s in &mut shares {
    *s = (*s).clamp(MIN_SHARE, MAX_SHARE);
  }
  let mut residual = 100 - shares.iter().sum::<i32>();
  while residual != 0 {
    let mut moved = false;
    for s in &mut shares {
      if residual > 0 && *s < MAX_SHARE {
        *s += 1;
        residual -= 1;
        moved = true;
      } else if residual < 0 && *s > MIN_SHARE {
        *s -= 1;
        residual += 1;
        moved = true;
      }
      if residual == 0 {
        break;
      }
    }
    if !moved {
      break;
    }
  }

  subjects
    .iter()
    .zip(shares)
    .map(|(s, pct)| (s.id.clone(), pct))
    .collect()
}

/// Need score for one subject from its performance history.
///
/// Starts at the neutral baseline and adjusts: low test scores and low
/// practice confidence raise priority, recorded weaknesses add to it,
/// strengths take a little away. Clamped to [0, 100].
pub fn need_score(history: Option<&SubjectHistory>) -> f32 {
  let mut score = BASELINE;
  if let Some(h) = history {
    if let Some(avg_score) = avg(&h.test_scores) {
      score += (100.0 - avg_score) * 0.4;
    }
    if let Some(avg_conf) = avg(&h.confidence_ratings) {
      score += (5.0 - avg_conf) * 8.0;
    }
    score += 5.0 * distinct(&h.weaknesses) as f32;
    score -= 2.0 * distinct(&h.strengths) as f32;
  }
  score.clamp(0.0, 100.0)
}

/// Rank subjects by descending need score. Ties keep input order, so the
/// result is deterministic for identical inputs.
pub fn performance_ranks(subjects: &[Subject], histories: &[SubjectHistory]) -> Vec<RankedSubject> {
  let mut ranked: Vec<RankedSubject> = subjects
    .iter()
    .map(|s| {
      let h = histories.iter().find(|h| h.subject_id == s.id);
      RankedSubject { subject_id: s.id.clone(), score: need_score(h), rank: 0 }
    })
    .collect();
  ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
  for (i, r) in ranked.iter_mut().enumerate() {
    r.rank = i as u32 + 1;
  }
  ranked
}

fn distinct(tags: &[String]) -> usize {
  let mut seen: Vec<&str> = Vec::with_capacity(tags.len());
  for t in tags {
    let t = t.trim();
    if !t.is_empty() && !seen.contains(&t) {
      seen.push(t);
    }
  }
  seen.len()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::SubjectMode;

  fn subjects(names: &[&str]) -> Vec<Subject> {
    names.iter().map(|n| Subject::new(*n, "", SubjectMode::NoExam)).collect()
  }

  #[test]
  fn confidence_shares_sum_to_exactly_one_hundred_and_are_deterministic() {
    let subs = subjects(&["A", "B", "C"]);
    let topics = vec![
      Topic::new(&subs[0].id, "t1", 20),
      Topic::new(&subs[0].id, "t2", 40),
      Topic::new(&subs[1].id, "t3", 90),
      Topic::new(&subs[2].id, "t4", 55),
    ];
    let first = confidence_shares(&subs, &topics, 50);
    let second = confidence_shares(&subs, &topics, 50);
    assert_eq!(first, second);
    assert_eq!(first.iter().map(|(_, p)| p).sum::<i32>(), 100);
    // Lowest confidence gets the largest share.
    assert!(first[0].1 > first[1].1);
    assert!(first.iter().all(|(_, p)| (MIN_SHARE..=MAX_SHARE).contains(p)));
  }

  #[test]
  fn zero_inverted_total_divides_equally() {
    let subs = subjects(&["A", "B", "C"]);
    // All topics at full confidence: nothing expresses need.
    let topics: Vec<Topic> = subs.iter().map(|s| Topic::new(&s.id, "t", 100)).collect();
    let shares = confidence_shares(&subs, &topics, 50);
    let pcts: Vec<i32> = shares.iter().map(|(_, p)| *p).collect();
    assert_eq!(pcts, vec![34, 33, 33]);
  }

  #[test]
  fn subjects_without_topics_use_the_default_confidence() {
    let subs = subjects(&["A", "B"]);
    let shares = confidence_shares(&subs, &[], 50);
    let pcts: Vec<i32> = shares.iter().map(|(_, p)| *p).collect();
    assert_eq!(pcts, vec![50, 50]);
  }

  #[test]
  fn no_subjects_yields_no_shares() {
    assert!(confidence_shares(&[], &[], 50).is_empty());
  }

  #[test]
  fn need_score_is_neutral_without_history() {
    assert_eq!(need_score(None), BASELINE);
    assert_eq!(need_score(Some(&SubjectHistory::default())), BASELINE);
  }

  #[test]
  fn need_score_adjustments_match_the_weighting() {
    let h = SubjectHistory {
      subject_id: "s".into(),
      test_scores: vec![40.0, 60.0],           // avg 50 -> +20
      confidence_ratings: vec![2.0, 4.0],      // avg 3  -> +16
      weaknesses: vec!["algebra".into(), "algebra".into(), "graphs".into()], // 2 distinct -> +10
      strengths: vec!["mechanics".into()],     // -2
    };
    assert_eq!(need_score(Some(&h)), 50.0 + 20.0 + 16.0 + 10.0 - 2.0);
  }

  #[test]
  fn need_score_is_clamped() {
    let h = SubjectHistory {
      subject_id: "s".into(),
      test_scores: vec![0.0],           // +40
      confidence_ratings: vec![1.0],    // +32
      weaknesses: (0..20).map(|i| format!("w{i}")).collect(), // +100
      strengths: vec![],
    };
    assert_eq!(need_score(Some(&h)), 100.0);
  }

  #[test]
  fn performance_ranks_orders_by_need() {
    let subs = subjects(&["Strong", "Weak", "NoData"]);
    let histories = vec![
      SubjectHistory {
        subject_id: subs[0].id.clone(),
        test_scores: vec![100.0],
        strengths: vec!["essays".into(), "sources".into()],
        ..Default::default()
      },
      SubjectHistory { subject_id: subs[1].id.clone(), test_scores: vec![30.0], ..Default::default() },
    ];
    let ranked = performance_ranks(&subs, &histories);
    assert_eq!(ranked[0].subject_id, subs[1].id);
    assert_eq!(ranked[0].rank, 1);
    // No data falls back to the neutral baseline, between the two.
    assert_eq!(ranked[1].subject_id, subs[2].id);
    assert_eq!(ranked[2].subject_id, subs[0].id);
  }
}

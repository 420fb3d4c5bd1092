//! Priority allocation: distributing the 100% time budget across subjects.
//!
//! The collection invariant is the whole point of this module: after every
//! operation the percentages sum to exactly 100, each stays within
//! [MIN_SHARE, MAX_SHARE], and ranks are dense 1..N. Rounding drift from a
//! proportional edit is corrected by pushing the residual entirely onto the
//! first non-edited record. That single-anchor correction can visibly nudge
//! one neighbor by a unit or two after repeated edits; it is the product's
//! observed behavior and is pinned by the tests below, not smoothed out.

use tracing::{debug, instrument};

use crate::domain::{PriorityRecord, Subject};

/// A subject always retains some attention.
pub const MIN_SHARE: i32 = 5;
pub const MAX_SHARE: i32 = 80;

/// Owns the ordered collection of priority records for one draft.
/// Record order is rank order; every mutator re-derives dense ranks.
#[derive(Clone, Debug, Default)]
pub struct PriorityAllocationEngine {
  records: Vec<PriorityRecord>,
}

impl PriorityAllocationEngine {
  /// Seed one record per subject: floor(100/N) each with the integer
  /// remainder assigned entirely to the first record, rank in input order.
  pub fn from_subjects(subjects: &[Subject]) -> Self {
    let n = subjects.len();
    if n == 0 {
      return Self::default();
    }
    let base = 100 / n as i32;
    let remainder = 100 - base * n as i32;
    let records = subjects
      .iter()
      .enumerate()
      .map(|(i, s)| PriorityRecord {
        subject_id: s.id.clone(),
        percentage: if i == 0 { base + remainder } else { base },
        rank: i as u32 + 1,
      })
      .collect();
    Self { records }
  }

  /// Adopt an existing collection (e.g. from a resumed draft) as-is.
  pub fn from_records(records: Vec<PriorityRecord>) -> Self {
    Self { records }
  }

  pub fn records(&self) -> &[PriorityRecord] {
    &self.records
  }

  pub fn into_records(self) -> Vec<PriorityRecord> {
    self.records
  }

  fn total(&self) -> i32 {
    self.records.iter().map(|r| r.percentage).sum()
  }

  fn reassign_ranks(&mut self) {
    for (i, r) in self.records.iter_mut().enumerate() {
      r.rank = i as u32 + 1;
    }
  }

  /// Set one subject's share; all other records absorb the difference in
  /// proportion to their current share, floored at MIN_SHARE.
  ///
  /// Unknown ids are ignored. A lone record is forced to 100 regardless of
  /// the requested value, since there is nobody to absorb the remainder.
  #[instrument(level = "debug", skip(self))]
  pub fn set_percentage(&mut self, subject_id: &str, requested: i32) {
    let Some(idx) = self.records.iter().position(|r| r.subject_id == subject_id) else {
      return;
    };
    if self.records.len() == 1 {
      self.records[0].percentage = 100;
      return;
    }

    let new_value = requested.clamp(MIN_SHARE, MAX_SHARE);
    let old = self.records[idx].percentage;
    let diff = new_value - old;

    let other_total: i32 = self
      .records
      .iter()
      .enumerate()
      .filter(|(i, _)| *i != idx)
      .map(|(_, r)| r.percentage)
      .sum();

    if other_total == 0 {
      // Degenerate: the complement is split evenly.
      let others = (self.records.len() - 1) as i32;
      let even = (100 - new_value) / others;
      for (i, r) in self.records.iter_mut().enumerate() {
        if i != idx {
          r.percentage = even;
        }
      }
    } else {
      for (i, r) in self.records.iter_mut().enumerate() {
        if i == idx {
          continue;
        }
        let share = diff as f64 * (r.percentage as f64 / other_total as f64);
        r.percentage = ((r.percentage as f64 - share).round() as i32).max(MIN_SHARE);
      }
    }

    self.records[idx].percentage = new_value;

    // Single-anchor correction: rounding drift lands entirely on the first
    // record other than the edited one.
    let residual = 100 - self.total();
    if residual != 0 {
      if let Some(r) = self.records.iter_mut().find(|r| r.subject_id != subject_id) {
        r.percentage += residual;
      }
    }
    debug!(target: "wizard", %subject_id, new_value, residual, "Priority edit applied");
  }

  /// Relocate one record; no-op when either index is out of bounds.
  /// Percentages are untouched, ranks follow the new positions.
  pub fn move_subject(&mut self, from: usize, to: usize) {
    if from >= self.records.len() || to >= self.records.len() {
      return;
    }
    let rec = self.records.remove(from);
    self.records.insert(to, rec);
    self.reassign_ranks();
  }

  /// Overwrite percentages from a suggested distribution, then reorder so
  /// rank 1 is the largest share. Ids absent from the collection are ignored.
  pub fn apply_shares(&mut self, shares: &[(String, i32)]) {
    for (id, pct) in shares {
      if let Some(r) = self.records.iter_mut().find(|r| &r.subject_id == id) {
        r.percentage = *pct;
      }
    }
    self.records.sort_by(|a, b| b.percentage.cmp(&a.percentage));
    self.reassign_ranks();
  }

  /// Reconcile the collection with the current subject list: drop records
  /// whose subject is gone, create records for new subjects, and restore the
  /// sum invariant. Called on entry into the priority step.
  pub fn sync_subjects(&mut self, subjects: &[Subject]) {
    let before = self.records.len();
    self.records.retain(|r| subjects.iter().any(|s| s.id == r.subject_id));
    let mut changed = self.records.len() != before;
    for s in subjects {
      if !self.records.iter().any(|r| r.subject_id == s.id) {
        self.records.push(PriorityRecord { subject_id: s.id.clone(), percentage: 0, rank: 0 });
        changed = true;
      }
    }
    if self.records.is_empty() {
      return;
    }
    if self.total() <= 0 {
      *self = Self::from_subjects(subjects);
      return;
    }
    self.reassign_ranks();
    if changed || self.total() != 100 {
      self.rebalance();
    }
  }

  /// Scale every record toward sum 100, clamp into bounds, then walk the
  /// remaining units onto records that can still take them.
  fn rebalance(&mut self) {
    if self.records.len() == 1 {
      self.records[0].percentage = 100;
      return;
    }
    let total = self.total();
    for r in &mut self.records {
      let scaled = (r.percentage as f64 * 100.0 / total as f64).round() as i32;
      r.percentage = scaled.clamp(MIN_SHARE, MAX_SHARE);
    }
    let mut residual = 100 - self.total();
    while residual != 0 {
      let mut moved = false;
      for r in &mut self.records {
        if residual > 0 && r.percentage < MAX_SHARE {
          r.percentage += 1;
          residual -= 1;
          moved = true;
        } else if residual < 0 && r.percentage > MIN_SHARE {
          r.percentage -= 1;
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
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::SubjectMode;

  fn subjects(names: &[&str]) -> Vec<Subject> {
    names.iter().map(|n| Subject::new(*n, "", SubjectMode::NoExam)).collect()
  }

  fn total(e: &PriorityAllocationEngine) -> i32 {
    e.records().iter().map(|r| r.percentage).sum()
  }

  #[test]
  fn seeding_puts_remainder_on_first_record() {
    let subs = subjects(&["Maths", "Physics", "History"]);
    let e = PriorityAllocationEngine::from_subjects(&subs);
    let pcts: Vec<i32> = e.records().iter().map(|r| r.percentage).collect();
    assert_eq!(pcts, vec![34, 33, 33]);
    let ranks: Vec<u32> = e.records().iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
  }

  #[test]
  fn equal_shares_edit_redistributes_proportionally() {
    let subs = subjects(&["A", "B", "C"]);
    let mut e = PriorityAllocationEngine::from_subjects(&subs);
    e.set_percentage(&subs[0].id, 50);
    let pcts: Vec<i32> = e.records().iter().map(|r| r.percentage).collect();
    assert_eq!(pcts, vec![50, 25, 25]);
  }

  #[test]
  fn single_anchor_correction_lands_on_first_other_record() {
    let subs = subjects(&["A", "B", "C"]);
    let mut e = PriorityAllocationEngine::from_subjects(&subs);
    // 34/33/33 -> request 37: both others round up to 32, drift -1 is taken
    // entirely by B. Documented behavior, not a defect.
    e.set_percentage(&subs[0].id, 37);
    let pcts: Vec<i32> = e.records().iter().map(|r| r.percentage).collect();
    assert_eq!(pcts, vec![37, 31, 32]);
    assert_eq!(total(&e), 100);
  }

  #[test]
  fn sum_invariant_holds_under_arbitrary_edit_and_move_sequences() {
    let subs = subjects(&["A", "B", "C", "D", "E"]);
    let mut e = PriorityAllocationEngine::from_subjects(&subs);
    let edits = [(0usize, 63), (3, 7), (1, 80), (4, 2), (2, 41), (0, 5)];
    for (i, (subject, value)) in edits.iter().enumerate() {
      e.set_percentage(&subs[*subject].id, *value);
      assert_eq!(total(&e), 100, "sum broken after edit {i}");
      e.move_subject(i % 5, (i * 2 + 1) % 5);
      assert_eq!(total(&e), 100, "sum broken after move {i}");
    }
  }

  #[test]
  fn edited_record_stays_within_bounds() {
    let subs = subjects(&["A", "B", "C"]);
    let mut e = PriorityAllocationEngine::from_subjects(&subs);
    e.set_percentage(&subs[0].id, 500);
    assert_eq!(e.records().iter().find(|r| r.subject_id == subs[0].id).unwrap().percentage, 80);
    e.set_percentage(&subs[0].id, -20);
    assert_eq!(e.records().iter().find(|r| r.subject_id == subs[0].id).unwrap().percentage, 5);
    assert_eq!(total(&e), 100);
  }

  #[test]
  fn lone_subject_is_forced_to_one_hundred() {
    let subs = subjects(&["Only"]);
    let mut e = PriorityAllocationEngine::from_subjects(&subs);
    e.set_percentage(&subs[0].id, 42);
    assert_eq!(e.records()[0].percentage, 100);
    assert_eq!(total(&e), 100);
  }

  #[test]
  fn zero_weight_others_split_the_complement_evenly() {
    let mut e = PriorityAllocationEngine::from_records(vec![
      PriorityRecord { subject_id: "a".into(), percentage: 100, rank: 1 },
      PriorityRecord { subject_id: "b".into(), percentage: 0, rank: 2 },
    ]);
    e.set_percentage("a", 60);
    let pcts: Vec<i32> = e.records().iter().map(|r| r.percentage).collect();
    assert_eq!(pcts, vec![60, 40]);
  }

  #[test]
  fn noop_move_changes_nothing() {
    let subs = subjects(&["A", "B", "C"]);
    let mut e = PriorityAllocationEngine::from_subjects(&subs);
    let before = e.records().to_vec();
    e.move_subject(1, 1);
    assert_eq!(e.records(), &before[..]);
  }

  #[test]
  fn out_of_bounds_move_is_a_noop() {
    let subs = subjects(&["A", "B"]);
    let mut e = PriorityAllocationEngine::from_subjects(&subs);
    let before = e.records().to_vec();
    e.move_subject(0, 7);
    e.move_subject(9, 0);
    assert_eq!(e.records(), &before[..]);
  }

  #[test]
  fn move_reassigns_dense_ranks_and_keeps_percentages() {
    let subs = subjects(&["A", "B", "C"]);
    let mut e = PriorityAllocationEngine::from_subjects(&subs);
    e.move_subject(0, 2);
    let ids: Vec<&str> = e.records().iter().map(|r| r.subject_id.as_str()).collect();
    assert_eq!(ids, vec![subs[1].id.as_str(), subs[2].id.as_str(), subs[0].id.as_str()]);
    let ranks: Vec<u32> = e.records().iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
    assert_eq!(e.records()[2].percentage, 34);
  }

  #[test]
  fn sync_adds_new_subject_and_restores_the_sum() {
    let mut subs = subjects(&["A", "B"]);
    let mut e = PriorityAllocationEngine::from_subjects(&subs);
    e.set_percentage(&subs[0].id, 70);
    subs.push(Subject::new("C", "", SubjectMode::NoExam));
    e.sync_subjects(&subs);
    assert_eq!(e.records().len(), 3);
    assert_eq!(total(&e), 100);
    assert!(e.records().iter().all(|r| r.percentage >= MIN_SHARE));
  }

  #[test]
  fn sync_drops_removed_subject_and_restores_the_sum() {
    let mut subs = subjects(&["A", "B", "C"]);
    let mut e = PriorityAllocationEngine::from_subjects(&subs);
    subs.remove(1);
    e.sync_subjects(&subs);
    assert_eq!(e.records().len(), 2);
    assert_eq!(total(&e), 100);
    let ranks: Vec<u32> = e.records().iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![1, 2]);
  }

  #[test]
  fn apply_shares_reorders_by_descending_share() {
    let subs = subjects(&["A", "B", "C"]);
    let mut e = PriorityAllocationEngine::from_subjects(&subs);
    e.apply_shares(&[
      (subs[0].id.clone(), 20),
      (subs[1].id.clone(), 50),
      (subs[2].id.clone(), 30),
    ]);
    let ids: Vec<&str> = e.records().iter().map(|r| r.subject_id.as_str()).collect();
    assert_eq!(ids, vec![subs[1].id.as_str(), subs[2].id.as_str(), subs[0].id.as_str()]);
    let ranks: Vec<u32> = e.records().iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
    assert_eq!(total(&e), 100);
  }
}

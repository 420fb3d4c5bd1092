//! Small utility helpers used across modules.

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max { s.to_string() } else { format!("{}… ({} bytes total)", &s[..max], s.len()) }
}

/// Average of a slice, or None when empty. Used by the suggestion scorers,
/// where "no data" is a valid state and must not read as zero.
pub fn avg(values: &[f32]) -> Option<f32> {
  if values.is_empty() {
    None
  } else {
    Some(values.iter().sum::<f32>() / values.len() as f32)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn avg_of_empty_is_none() {
    assert_eq!(avg(&[]), None);
    assert_eq!(avg(&[40.0, 60.0]), Some(50.0));
  }
}

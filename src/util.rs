//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// `round(100 * part / whole)` with half-up rounding; 0 when `whole` is 0.
pub fn percent(part: usize, whole: usize) -> u32 {
  if whole == 0 { return 0; }
  ((part as f64 / whole as f64) * 100.0).round() as u32
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge response bodies. Cuts on a char boundary.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut end = max;
  while !s.is_char_boundary(end) { end -= 1; }
  format!("{}… ({} bytes total)", &s[..end], s.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fills_every_occurrence() {
    assert_eq!(fill_template("/{id}/{id}.json", &[("id", "x")]), "/x/x.json");
  }

  #[test]
  fn percent_rounds_half_up_and_handles_empty() {
    assert_eq!(percent(1, 8), 13); // 12.5
    assert_eq!(percent(1, 3), 33);
    assert_eq!(percent(0, 0), 0);
  }

  #[test]
  fn truncation_respects_char_boundaries() {
    let s = "語彙語彙語彙";
    let t = trunc_for_log(s, 4);
    assert!(t.starts_with("語"));
    assert!(t.ends_with("(18 bytes total)"));
  }
}

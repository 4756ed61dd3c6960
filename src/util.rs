//! Small utility helpers used across modules.

/// Timestamp format used for `last_modified`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Very small and safe string templating.
/// Replaces `{key}` in the template with the matching value in one pass over
/// the template; inserted values are never scanned again. Unknown keys and
/// stray braces are kept verbatim.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;
  while let Some(open) = rest.find('{') {
    out.push_str(&rest[..open]);
    let after = &rest[open + 1..];
    let value = after
      .find('}')
      .and_then(|close| pairs.iter().find(|(k, _)| *k == &after[..close]).map(|(_, v)| (close, *v)));
    match value {
      Some((close, v)) => {
        out.push_str(v);
        rest = &after[close + 1..];
      }
      None => {
        out.push('{');
        rest = after;
      }
    }
  }
  out.push_str(rest);
  out
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with whole model responses.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  match s.char_indices().nth(max) {
    None => s.to_string(),
    Some((cut, _)) => format!("{}… ({} bytes total)", &s[..cut], s.len()),
  }
}

/// Current local time, formatted for `last_modified`.
pub fn now_timestamp() -> String {
  chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fills_every_occurrence() {
    let out = fill_template("{n} questions on {topic}, {n} total", &[("n", "3"), ("topic", "heat")]);
    assert_eq!(out, "3 questions on heat, 3 total");
  }

  #[test]
  fn inserted_values_are_not_expanded_again() {
    let out = fill_template("{a} and {b}", &[("a", "{b}"), ("b", "x")]);
    assert_eq!(out, "{b} and x");
  }

  #[test]
  fn unknown_keys_and_stray_braces_survive() {
    let out = fill_template("{ {k} {other} } {", &[("k", "v")]);
    assert_eq!(out, "{ v {other} } {");
  }

  #[test]
  fn truncation_respects_char_boundaries() {
    assert_eq!(trunc_for_log("short", 10), "short");
    assert_eq!(trunc_for_log("ééé", 1), "é… (6 bytes total)");
  }

  #[test]
  fn timestamp_has_expected_shape() {
    let ts = now_timestamp();
    assert!(chrono::NaiveDateTime::parse_from_str(&ts, TIMESTAMP_FORMAT).is_ok(), "{ts}");
  }
}

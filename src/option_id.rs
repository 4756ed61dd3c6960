//! Normalisation of MCQ option identifiers.
//!
//! Generated text refers to options in many ways: `1`, `"1"`, `"b"`, `"B)"`,
//! `"c."`. All of them collapse to a zero-based index. Digits are literal
//! indices (`"1"` is the second option), letters count from `a`.

use serde_json::Value;

use crate::error::{AssessmentError, Result};

/// An option identifier as it arrives, before normalisation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionId {
  Index(i64),
  Label(String),
}

impl From<i64> for OptionId {
  fn from(i: i64) -> Self { OptionId::Index(i) }
}

impl From<usize> for OptionId {
  fn from(i: usize) -> Self { OptionId::Index(i64::try_from(i).unwrap_or(i64::MAX)) }
}

impl From<&str> for OptionId {
  fn from(s: &str) -> Self { OptionId::Label(s.to_string()) }
}

impl From<String> for OptionId {
  fn from(s: String) -> Self { OptionId::Label(s) }
}

impl TryFrom<&Value> for OptionId {
  type Error = AssessmentError;

  fn try_from(value: &Value) -> Result<Self> {
    match value {
      Value::Number(n) => n
        .as_i64()
        .map(OptionId::Index)
        .ok_or_else(|| AssessmentError::malformed(format!("invalid option id: {n}"))),
      Value::String(s) => Ok(OptionId::Label(s.clone())),
      other => Err(AssessmentError::malformed(format!("invalid option id type: {other}"))),
    }
  }
}

impl OptionId {
  /// Collapse to an index. The result is not range-checked here.
  pub fn normalize(&self) -> Result<i64> {
    match self {
      OptionId::Index(i) => Ok(*i),
      OptionId::Label(s) => normalize_label(s),
    }
  }
}

/// Normalise a raw JSON option identifier (integer or string).
#[allow(dead_code)]
pub fn normalize(value: &Value) -> Result<i64> {
  OptionId::try_from(value)?.normalize()
}

fn normalize_label(raw: &str) -> Result<i64> {
  let s = raw.trim();
  let s = s.strip_suffix('.').unwrap_or(s);
  let s = s.strip_suffix(')').unwrap_or(s);
  let s = s.to_lowercase();

  let mut chars = s.chars();
  let (Some(ch), None) = (chars.next(), chars.next()) else {
    return Err(AssessmentError::malformed(format!("invalid option id value: {raw:?}")));
  };

  if let Some(d) = ch.to_digit(10) {
    return Ok(i64::from(d));
  }
  if ch.is_ascii_lowercase() {
    return Ok(i64::from(ch as u8 - b'a'));
  }
  Err(AssessmentError::malformed(format!("invalid option id value: {raw:?}")))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::ErrorKind;
  use serde_json::json;

  #[test]
  fn integers_pass_through() {
    assert_eq!(normalize(&json!(0)).unwrap(), 0);
    assert_eq!(normalize(&json!(7)).unwrap(), 7);
    assert_eq!(normalize(&json!(-1)).unwrap(), -1);
  }

  #[test]
  fn digits_are_literal_indices() {
    assert_eq!(normalize(&json!("1")).unwrap(), 1);
    assert_eq!(normalize(&json!(" 0 ")).unwrap(), 0);
    assert_eq!(normalize(&json!("3).")).unwrap(), 3);
  }

  #[test]
  fn letters_count_from_a() {
    assert_eq!(normalize(&json!("a.")).unwrap(), 0);
    assert_eq!(normalize(&json!("B)")).unwrap(), 1);
    assert_eq!(normalize(&json!("d")).unwrap(), 3);
    assert_eq!(OptionId::from("C").normalize().unwrap(), 2);
  }

  #[test]
  fn only_one_suffix_of_each_kind_is_stripped() {
    assert!(normalize(&json!("a..")).is_err());
    assert!(normalize(&json!("a))")).is_err());
  }

  #[test]
  fn rejects_bad_values() {
    for bad in [json!(""), json!("ab)"), json!(2.3), json!("?"), json!(null), json!(true), json!(["a"])] {
      let err = normalize(&bad).unwrap_err();
      assert_eq!(err.kind(), ErrorKind::MalformedOutput, "{bad}");
    }
  }
}

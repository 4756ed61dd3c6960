//! Pulling question lists out of free-form generated text.
//!
//! Models wrap JSON in ```json fences, surround it with prose, and leave
//! trailing commas behind. We scan every fenced block in order, parse each one
//! tolerantly and concatenate the results. When the fences yield nothing we
//! try the whole text as a bare JSON list.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{AssessmentError, Result};
use crate::util::trunc_for_log;

fn fence_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"(?s)```json(.*?)```").expect("fence pattern is valid"))
}

/// Extract raw question objects from generated text. Empty input yields no questions.
#[instrument(level = "debug", skip(raw), fields(raw_len = raw.map(str::len).unwrap_or(0)))]
pub fn extract_questions(raw: Option<&str>) -> Result<Vec<Value>> {
  let Some(raw) = raw.filter(|s| !s.is_empty()) else {
    return Ok(Vec::new());
  };

  let mut questions = Vec::new();
  let mut blocks = 0usize;
  for cap in fence_re().captures_iter(raw) {
    blocks += 1;
    questions.extend(parse_question_list(cap[1].trim())?);
  }

  if questions.is_empty() {
    debug!(target: "assessment", blocks, "No questions in fenced blocks; parsing whole text");
    questions.extend(parse_question_list(raw.trim())?);
  }

  debug!(target: "assessment", blocks, count = questions.len(), "Extracted raw questions");
  Ok(questions)
}

fn parse_question_list(text: &str) -> Result<Vec<Value>> {
  match parse_tolerant(text)? {
    Value::Array(items) => Ok(items),
    other => Err(AssessmentError::malformed(format!(
      "generated JSON must be a list of questions, got: {}",
      trunc_for_log(&other.to_string(), 80)
    ))),
  }
}

/// Parse JSON that may carry trailing commas before `]` or `}`.
/// Standard JSON is accepted unchanged.
pub fn parse_tolerant(text: &str) -> Result<Value> {
  serde_json::from_str(&strip_trailing_commas(text)).map_err(|e| {
    debug!(target: "assessment", error = %e, text = %trunc_for_log(text, 200), "Tolerant JSON parse failed");
    AssessmentError::malformed(format!("generated text is not valid tolerant JSON: {e}"))
  })
}

/// Drop every comma (outside string literals) whose next non-whitespace
/// character closes an array or object.
fn strip_trailing_commas(text: &str) -> String {
  let chars: Vec<char> = text.chars().collect();
  let mut out = String::with_capacity(text.len());
  let mut in_string = false;
  let mut escaped = false;

  for (i, &ch) in chars.iter().enumerate() {
    if in_string {
      out.push(ch);
      if escaped {
        escaped = false;
      } else if ch == '\\' {
        escaped = true;
      } else if ch == '"' {
        in_string = false;
      }
      continue;
    }

    match ch {
      '"' => {
        in_string = true;
        out.push(ch);
      }
      ',' => {
        let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
        if !matches!(next, Some(']') | Some('}')) {
          out.push(ch);
        }
      }
      _ => out.push(ch),
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::ErrorKind;
  use serde_json::json;

  #[test]
  fn empty_input_is_not_an_error() {
    assert!(extract_questions(None).unwrap().is_empty());
    assert!(extract_questions(Some("")).unwrap().is_empty());
  }

  #[test]
  fn fenced_blocks_are_concatenated_in_order() {
    let raw = "Here you go:\n```json\n[{\"n\": 1}, {\"n\": 2}]\n```\nand some more\n```json\n[{\"n\": 3}]\n```\nBye.";
    let qs = extract_questions(Some(raw)).unwrap();
    assert_eq!(qs, vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 3})]);
  }

  #[test]
  fn falls_back_to_whole_text_without_fences() {
    let qs = extract_questions(Some("  [{\"n\": 1}]\n")).unwrap();
    assert_eq!(qs, vec![json!({"n": 1})]);
  }

  #[test]
  fn tolerates_trailing_commas() {
    let qs = extract_questions(Some("[{\"n\": 1, \"o\": [\"a\", \"b\",],}, ]")).unwrap();
    assert_eq!(qs, vec![json!({"n": 1, "o": ["a", "b"]})]);
  }

  #[test]
  fn commas_inside_strings_are_kept() {
    let v = parse_tolerant(r#"["a,]", "b\",}",]"#).unwrap();
    assert_eq!(v, json!(["a,]", "b\",}"]));
  }

  #[test]
  fn fenced_empty_lists_fall_back_to_whole_text() {
    // The whole text still carries the fences, so the fallback parse fails.
    let err = extract_questions(Some("```json\n[]\n```")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedOutput);
  }

  #[test]
  fn invalid_json_is_malformed_output() {
    for raw in ["Sorry, I cannot help.", "```json\n[{\"n\": }]\n```", "[1,,]", "{\"n\": 1}"] {
      let err = extract_questions(Some(raw)).unwrap_err();
      assert_eq!(err.kind(), ErrorKind::MalformedOutput, "{raw}");
    }
  }

  #[test]
  fn prose_around_single_block_is_ignored() {
    let raw = "```json\n[{\"question_type\":\"MCQ\",\"question\":\"Q\",\"options\":[\"a\",\"b\"],\"correct_answer\":\"b)\"}]\n```";
    let qs = extract_questions(Some(raw)).unwrap();
    assert_eq!(qs.len(), 1);
    assert_eq!(qs[0]["correct_answer"], "b)");
  }
}

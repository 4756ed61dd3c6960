//! The user's generation request: topic, question kind, count, uploaded PDFs
//! and extra context keywords. Validated once, then treated as an opaque value.

use std::collections::HashMap;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::config::Prompts;
use crate::error::{AssessmentError, Result};
use crate::question::QuestionType;
use crate::util::fill_template;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserInput {
  topic: String,
  question_type: QuestionType,
  num_questions: u32,
  pdfs: Vec<String>,
  context_keywords: String,
}

/// `pdfs` form field, as sent by the upload widget.
#[derive(Deserialize)]
struct PdfFileList {
  #[serde(rename = "fileList")]
  file_list: Vec<PdfFile>,
}

#[derive(Deserialize)]
struct PdfFile {
  name: String,
}

fn str_field<'a>(map: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
  map
    .get(key)
    .ok_or_else(|| AssessmentError::invalid(format!("'user_input' missing '{key}'")))?
    .as_str()
    .ok_or_else(|| AssessmentError::invalid(format!("'{key}' must be str")))
}

fn form_field<'a>(form: &'a HashMap<String, String>, key: &str) -> Result<&'a str> {
  form
    .get(key)
    .map(String::as_str)
    .ok_or_else(|| AssessmentError::invalid(format!("missing form field '{key}'")))
}

impl UserInput {
  pub fn new(
    topic: &str,
    question_type: &str,
    num_questions: i64,
    pdfs: Vec<String>,
    context_keywords: &str,
  ) -> Result<Self> {
    let topic = topic.trim();
    if topic.is_empty() {
      return Err(AssessmentError::invalid("'topic' must not be empty"));
    }
    let question_type = QuestionType::from_user_tag(question_type)
      .ok_or_else(|| AssessmentError::invalid(format!("unknown 'question_type': {question_type:?}")))?;
    let num_questions = u32::try_from(num_questions)
      .ok()
      .filter(|n| *n >= 1)
      .ok_or_else(|| AssessmentError::invalid("'num_questions' must be a positive integer"))?;

    Ok(Self {
      topic: topic.to_string(),
      question_type,
      num_questions,
      pdfs,
      context_keywords: context_keywords.trim().to_string(),
    })
  }

  /// Parse the `user_input` sub-document of an edit payload or stored assessment.
  pub fn from_value(raw: &Value) -> Result<Self> {
    let map = raw
      .as_object()
      .ok_or_else(|| AssessmentError::invalid("'user_input' must be an object"))?;

    let num_questions = map
      .get("num_questions")
      .ok_or_else(|| AssessmentError::invalid("'user_input' missing 'num_questions'"))?
      .as_i64()
      .ok_or_else(|| AssessmentError::invalid("'num_questions' must be int"))?;

    let pdfs = match map.get("pdfs") {
      None | Some(Value::Null) => Vec::new(),
      Some(Value::Array(items)) => items
        .iter()
        .map(|p| {
          p.as_str()
            .map(str::to_string)
            .ok_or_else(|| AssessmentError::invalid("'pdfs' must be list of strings"))
        })
        .collect::<Result<Vec<_>>>()?,
      Some(_) => return Err(AssessmentError::invalid("'pdfs' must be list")),
    };

    let context_keywords = match map.get("context_keywords") {
      None | Some(Value::Null) => "",
      Some(v) => v
        .as_str()
        .ok_or_else(|| AssessmentError::invalid("'context_keywords' must be str"))?,
    };

    Self::new(str_field(map, "topic")?, str_field(map, "question_type")?, num_questions, pdfs, context_keywords)
  }

  /// Parse the generation form. `pdfs` is a JSON string; when it is missing or
  /// unreadable the request simply has no PDFs.
  pub fn from_request_form(form: &HashMap<String, String>) -> Result<Self> {
    let num_questions = form_field(form, "num_questions")?
      .trim()
      .parse::<i64>()
      .map_err(|_| AssessmentError::invalid("incorrect form field type for 'num_questions'"))?;

    let pdfs = form
      .get("pdfs")
      .and_then(|s| serde_json::from_str::<PdfFileList>(s).ok())
      .map(|l| l.file_list.into_iter().map(|f| f.name).collect())
      .unwrap_or_default();

    Self::new(
      form_field(form, "topic")?,
      form_field(form, "question_type")?,
      num_questions,
      pdfs,
      form.get("context_keywords").map(String::as_str).unwrap_or(""),
    )
  }

  pub fn topic(&self) -> &str { &self.topic }
  #[allow(dead_code)]
  pub fn question_type(&self) -> QuestionType { self.question_type }
  pub fn num_questions(&self) -> u32 { self.num_questions }
  #[allow(dead_code)]
  pub fn pdfs(&self) -> &[String] { &self.pdfs }
  #[allow(dead_code)]
  pub fn context_keywords(&self) -> &str { &self.context_keywords }

  /// The `user_input` sub-document, with the canonical question type tag.
  pub fn to_value(&self) -> Value {
    json!({
      "topic": self.topic,
      "question_type": self.question_type.as_str(),
      "num_questions": self.num_questions,
      "pdfs": self.pdfs,
      "context_keywords": self.context_keywords,
    })
  }

  /// Build the generation prompt. `pdf_context` is text already extracted from
  /// the first uploaded PDF, if any.
  pub fn make_prompt(&self, prompts: &Prompts, pdf_context: Option<&str>) -> String {
    let context = if self.context_keywords.is_empty() {
      String::new()
    } else {
      fill_template(&prompts.context_keywords_template, &[("keywords", &self.context_keywords)])
    };
    let pdf_context = match pdf_context.map(str::trim) {
      Some(text) if !text.is_empty() => fill_template(&prompts.pdf_context_template, &[("text", text)]),
      _ => String::new(),
    };

    let template = match self.question_type {
      QuestionType::Mcq => &prompts.mcq_template,
      QuestionType::ShortAnswer | QuestionType::LongAnswer => &prompts.subjective_template,
    };
    let num_questions = self.num_questions.to_string();
    fill_template(
      template,
      &[
        ("num_questions", &num_questions),
        ("topic", &self.topic),
        ("question_type", self.question_type.as_str()),
        ("context", &context),
        ("pdf_context", &pdf_context),
      ],
    )
  }
}

impl Serialize for UserInput {
  fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
    self.to_value().serialize(s)
  }
}

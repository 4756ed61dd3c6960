//! Question model: a closed set of question kinds, each validated on
//! construction and on every mutation.
//!
//! Raw questions arrive as JSON objects, usually straight out of the generator.
//! `make_question` dispatches on the `question_type` tag and returns a typed
//! variant or a `MalformedOutput` error. There is no way to observe a
//! half-built or invalid question from outside this module.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::error::{AssessmentError, Result};
use crate::option_id::OptionId;

/// Discriminant shared by questions and user requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QuestionType {
  Mcq,
  ShortAnswer,
  LongAnswer,
}

impl QuestionType {
  /// Canonical tag written to documents, regardless of input casing.
  pub fn as_str(self) -> &'static str {
    match self {
      QuestionType::Mcq => "MCQ",
      QuestionType::ShortAnswer => "Short Answer",
      QuestionType::LongAnswer => "Long Answer",
    }
  }

  /// Loose match used on generated tags: case-insensitive substring search,
  /// `mcq` first, then `short`, then `long`.
  pub fn from_generated_tag(tag: &str) -> Option<Self> {
    let t = tag.to_lowercase();
    if t.contains("mcq") {
      Some(QuestionType::Mcq)
    } else if t.contains("short") {
      Some(QuestionType::ShortAnswer)
    } else if t.contains("long") {
      Some(QuestionType::LongAnswer)
    } else {
      None
    }
  }

  /// Strict match used on caller input: full names or the `sa`/`la` abbreviations.
  pub fn from_user_tag(tag: &str) -> Option<Self> {
    match tag.trim().to_lowercase().as_str() {
      "mcq" => Some(QuestionType::Mcq),
      "short answer" | "sa" => Some(QuestionType::ShortAnswer),
      "long answer" | "la" => Some(QuestionType::LongAnswer),
      _ => None,
    }
  }
}

impl fmt::Display for QuestionType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl Serialize for QuestionType {
  fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(self.as_str())
  }
}

/// Multiple choice question. `correct_answer` always indexes into `options`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct McqQuestion {
  question: String,
  options: Vec<String>,
  correct_answer: usize,
}

/// Free-text question (short or long) with a model answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubjectiveQuestion {
  question: String,
  sample_answer: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Question {
  Mcq(McqQuestion),
  ShortAnswer(SubjectiveQuestion),
  LongAnswer(SubjectiveQuestion),
}

// -------- field helpers --------

fn field<'a>(raw: &'a Map<String, Value>, key: &str) -> Result<&'a Value> {
  raw
    .get(key)
    .ok_or_else(|| AssessmentError::malformed(format!("question must have key '{key}'")))
}

fn str_field(raw: &Map<String, Value>, key: &str) -> Result<String> {
  field(raw, key)?
    .as_str()
    .map(str::to_string)
    .ok_or_else(|| AssessmentError::malformed(format!("'{key}' must be a string")))
}

fn check_question_text(text: &str) -> Result<()> {
  if text.is_empty() {
    return Err(AssessmentError::malformed("'question' must not be empty"));
  }
  Ok(())
}

fn check_option_text(text: &str) -> Result<()> {
  if text.is_empty() {
    return Err(AssessmentError::malformed("'option' must not be empty"));
  }
  Ok(())
}

// -------- MCQ --------

#[allow(dead_code)]
impl McqQuestion {
  pub fn new(question: impl Into<String>, options: Vec<String>, correct_answer: impl Into<OptionId>) -> Result<Self> {
    let question = question.into();
    check_question_text(&question)?;
    if options.is_empty() {
      return Err(AssessmentError::malformed("'options' must not be empty"));
    }
    for o in &options {
      check_option_text(o)?;
    }
    let mut q = Self { question, options, correct_answer: 0 };
    q.update_correct_answer(correct_answer)?;
    Ok(q)
  }

  fn from_map(raw: &Map<String, Value>) -> Result<Self> {
    let question = str_field(raw, "question")?;
    let options = field(raw, "options")?
      .as_array()
      .ok_or_else(|| AssessmentError::malformed("'options' must be a list"))?
      .iter()
      .map(|o| {
        o.as_str()
          .map(str::to_string)
          .ok_or_else(|| AssessmentError::malformed("'option' must be a string"))
      })
      .collect::<Result<Vec<_>>>()?;
    let correct = OptionId::try_from(field(raw, "correct_answer")?)?;
    Self::new(question, options, correct)
  }

  pub fn question(&self) -> &str { &self.question }
  pub fn options(&self) -> &[String] { &self.options }
  pub fn correct_answer(&self) -> usize { self.correct_answer }

  pub fn update_question(&mut self, text: impl Into<String>) -> Result<()> {
    let text = text.into();
    check_question_text(&text)?;
    self.question = text;
    Ok(())
  }

  /// Replace an existing option, or append when `id` equals the current length.
  pub fn update_option(&mut self, id: impl Into<OptionId>, text: impl Into<String>) -> Result<()> {
    let text = text.into();
    check_option_text(&text)?;
    let id: OptionId = id.into();
    let idx = id.normalize()?;
    let len = self.options.len() as i64;
    if (0..len).contains(&idx) {
      self.options[idx as usize] = text;
    } else if idx == len {
      self.options.push(text);
    } else {
      return Err(AssessmentError::malformed(format!("option index {idx} out of range")));
    }
    Ok(())
  }

  pub fn update_correct_answer(&mut self, id: impl Into<OptionId>) -> Result<()> {
    let id: OptionId = id.into();
    let idx = id.normalize()?;
    if !(0..self.options.len() as i64).contains(&idx) {
      return Err(AssessmentError::malformed(format!(
        "'correct_answer' {idx} must index into {} options",
        self.options.len()
      )));
    }
    self.correct_answer = idx as usize;
    Ok(())
  }
}

// -------- Short / Long answer --------

#[allow(dead_code)]
impl SubjectiveQuestion {
  pub fn new(question: impl Into<String>, sample_answer: impl Into<String>) -> Result<Self> {
    let question = question.into();
    check_question_text(&question)?;
    Ok(Self { question, sample_answer: sample_answer.into() })
  }

  fn from_map(raw: &Map<String, Value>) -> Result<Self> {
    Self::new(str_field(raw, "question")?, str_field(raw, "sample_answer")?)
  }

  pub fn question(&self) -> &str { &self.question }
  pub fn sample_answer(&self) -> &str { &self.sample_answer }

  pub fn update_question(&mut self, text: impl Into<String>) -> Result<()> {
    let text = text.into();
    check_question_text(&text)?;
    self.question = text;
    Ok(())
  }

  pub fn update_sample_answer(&mut self, text: impl Into<String>) {
    self.sample_answer = text.into();
  }
}

// -------- tagged union --------

impl Question {
  /// Build a typed question from a raw JSON object.
  pub fn from_value(raw: &Value) -> Result<Self> {
    let map = raw
      .as_object()
      .ok_or_else(|| AssessmentError::malformed("question must be a JSON object"))?;
    let tag = map
      .get("question_type")
      .ok_or_else(|| AssessmentError::malformed("all questions must have the 'question_type' attribute"))?
      .as_str()
      .ok_or_else(|| AssessmentError::malformed("'question_type' must be a string"))?;

    match QuestionType::from_generated_tag(tag) {
      Some(QuestionType::Mcq) => McqQuestion::from_map(map).map(Question::Mcq),
      Some(QuestionType::ShortAnswer) => SubjectiveQuestion::from_map(map).map(Question::ShortAnswer),
      Some(QuestionType::LongAnswer) => SubjectiveQuestion::from_map(map).map(Question::LongAnswer),
      None => Err(AssessmentError::malformed(format!("invalid question type received: {tag:?}"))),
    }
  }

  pub fn question_type(&self) -> QuestionType {
    match self {
      Question::Mcq(_) => QuestionType::Mcq,
      Question::ShortAnswer(_) => QuestionType::ShortAnswer,
      Question::LongAnswer(_) => QuestionType::LongAnswer,
    }
  }

  #[allow(dead_code)]
  pub fn question(&self) -> &str {
    match self {
      Question::Mcq(q) => q.question(),
      Question::ShortAnswer(q) | Question::LongAnswer(q) => q.question(),
    }
  }

  #[allow(dead_code)]
  pub fn update_question(&mut self, text: impl Into<String>) -> Result<()> {
    match self {
      Question::Mcq(q) => q.update_question(text),
      Question::ShortAnswer(q) | Question::LongAnswer(q) => q.update_question(text),
    }
  }

  #[allow(dead_code)]
  pub fn update_sample_answer(&mut self, text: impl Into<String>) -> Result<()> {
    match self {
      Question::ShortAnswer(q) | Question::LongAnswer(q) => {
        q.update_sample_answer(text);
        Ok(())
      }
      Question::Mcq(_) => Err(AssessmentError::malformed("MCQ questions have no 'sample_answer'")),
    }
  }

  #[allow(dead_code)]
  pub fn update_option(&mut self, id: impl Into<OptionId>, text: impl Into<String>) -> Result<()> {
    let kind = self.question_type();
    match self {
      Question::Mcq(q) => q.update_option(id, text),
      _ => Err(AssessmentError::malformed(format!("{kind} questions have no 'options'"))),
    }
  }

  #[allow(dead_code)]
  pub fn update_correct_answer(&mut self, id: impl Into<OptionId>) -> Result<()> {
    let kind = self.question_type();
    match self {
      Question::Mcq(q) => q.update_correct_answer(id),
      _ => Err(AssessmentError::malformed(format!("{kind} questions have no 'correct_answer'"))),
    }
  }

  /// Canonical document shape: `{question_type, question, ...variant fields}`.
  pub fn to_value(&self) -> Value {
    match self {
      Question::Mcq(q) => json!({
        "question_type": self.question_type().as_str(),
        "question": q.question,
        "options": q.options,
        "correct_answer": q.correct_answer,
      }),
      Question::ShortAnswer(q) | Question::LongAnswer(q) => json!({
        "question_type": self.question_type().as_str(),
        "question": q.question,
        "sample_answer": q.sample_answer,
      }),
    }
  }
}

impl Serialize for Question {
  fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
    self.to_value().serialize(s)
  }
}

impl fmt::Display for Question {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Question::Mcq(q) => {
        writeln!(f, "{}\nOptions:", q.question)?;
        for (i, opt) in q.options.iter().enumerate() {
          write!(f, "({}) {}", i + 1, opt)?;
          if i == q.correct_answer {
            f.write_str(" (correct answer)")?;
          }
          writeln!(f)?;
        }
        Ok(())
      }
      Question::ShortAnswer(q) | Question::LongAnswer(q) => {
        write!(f, "{}\nSample Answer: {}", q.question, q.sample_answer)
      }
    }
  }
}

/// Anything `make_question` accepts: raw JSON, or an already typed question.
pub trait IntoQuestion {
  fn into_question(self) -> Result<Question>;
}

impl IntoQuestion for Question {
  fn into_question(self) -> Result<Question> { Ok(self) }
}

impl IntoQuestion for &Value {
  fn into_question(self) -> Result<Question> { Question::from_value(self) }
}

impl IntoQuestion for Value {
  fn into_question(self) -> Result<Question> { Question::from_value(&self) }
}

/// Factory over the `question_type` discriminant. Typed input is returned as-is.
pub fn make_question(raw: impl IntoQuestion) -> Result<Question> {
  raw.into_question()
}

//! The assessment aggregate: who asked for what, the questions produced, and
//! the storage identity once persisted.
//!
//! Three ways in:
//! - `from_generation`: fresh, from a user request and the generator's text
//! - `from_storage_document`: an already persisted document
//! - `from_edit_payload`: an edited copy sent back by the frontend
//!
//! One way out: `to_document`, the canonical document shape shared by storage
//! and the HTTP API.

use std::fmt;

use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use crate::error::{AssessmentError, Result};
use crate::extract::extract_questions;
use crate::question::{make_question, Question};
use crate::store::{AssessmentId, DocumentStore};
use crate::user_input::UserInput;
use crate::util::now_timestamp;

#[derive(Clone, Debug, PartialEq)]
pub struct Assessment {
  id: Option<AssessmentId>,
  user_input: Option<UserInput>,
  questions: Vec<Question>,
  last_modified: String,
}

fn questions_from_values(raw: &[Value]) -> Result<Vec<Question>> {
  raw.iter().map(|q| make_question(q)).collect()
}

fn storage_shape(msg: impl fmt::Display) -> AssessmentError {
  AssessmentError::StorageUnavailable(format!("unexpected document shape: {msg}"))
}

impl Assessment {
  /// Questions only, parsed from generated text. `user_input` stays unset
  /// until `with_user_input` is called.
  pub fn from_raw_questions(raw: Option<&str>) -> Result<Self> {
    Ok(Self {
      id: None,
      user_input: None,
      questions: questions_from_values(&extract_questions(raw)?)?,
      last_modified: now_timestamp(),
    })
  }

  #[instrument(level = "info", skip_all, fields(topic = %user_input.topic(), raw_len = raw.map(str::len).unwrap_or(0)))]
  pub fn from_generation(user_input: UserInput, raw: Option<&str>) -> Result<Self> {
    let a = Self::from_raw_questions(raw)?.with_user_input(user_input);
    info!(
      target: "assessment",
      questions = a.questions.len(),
      requested = a.user_input.as_ref().map(UserInput::num_questions).unwrap_or(0),
      "Assessment built from generated text"
    );
    Ok(a)
  }

  /// Rebuild from a stored document. Questions are re-validated; the stored
  /// `last_modified` is kept as-is.
  pub fn from_storage_document(doc: &Value) -> Result<Self> {
    let map = doc.as_object().ok_or_else(|| storage_shape("not an object"))?;
    let id = map
      .get("_id")
      .ok_or_else(|| storage_shape("missing '_id'"))
      .and_then(|v| AssessmentId::from_field(v).map_err(storage_shape))?;
    let user_input = map
      .get("user_input")
      .ok_or_else(|| storage_shape("missing 'user_input'"))
      .and_then(|v| UserInput::from_value(v).map_err(storage_shape))?;
    let questions = map
      .get("questions")
      .and_then(Value::as_array)
      .ok_or_else(|| storage_shape("'questions' must be a list"))?;
    let last_modified = map
      .get("last_modified")
      .and_then(Value::as_str)
      .ok_or_else(|| storage_shape("'last_modified' must be a string"))?;

    Ok(Self {
      id: Some(id),
      user_input: Some(user_input),
      questions: questions_from_values(questions)?,
      last_modified: last_modified.to_string(),
    })
  }

  /// Build from an edited assessment sent by a client.
  ///
  /// `_id` present means "overwrite that document", absent means "save as a
  /// new copy". `last_modified` is always stamped fresh.
  pub fn from_edit_payload(payload: &Value) -> Result<Self> {
    let map = payload
      .as_object()
      .ok_or_else(|| AssessmentError::invalid("request body must be a JSON object"))?;
    let (Some(user_input), Some(questions)) = (map.get("user_input"), map.get("questions")) else {
      return Err(AssessmentError::invalid("request body must have 'user_input' and 'questions'"));
    };

    let id = match map.get("_id") {
      None | Some(Value::Null) => None,
      Some(v) => Some(AssessmentId::from_field(v)?),
    };
    let user_input = UserInput::from_value(user_input)?;
    let questions = match questions {
      Value::Array(items) => questions_from_values(items)?,
      Value::String(text) => questions_from_values(&extract_questions(Some(text))?)?,
      _ => return Err(AssessmentError::invalid("'questions' must be a list")),
    };

    Ok(Self { id, user_input: Some(user_input), questions, last_modified: now_timestamp() })
  }

  /// Load a stored assessment by identity.
  #[instrument(level = "info", skip(store), fields(%id))]
  pub fn load(store: &dyn DocumentStore, id: &AssessmentId) -> Result<Self> {
    let doc = store
      .find_one(id)?
      .ok_or_else(|| AssessmentError::NotFound(format!("assessment {id}")))?;
    Self::from_storage_document(&doc)
  }

  /// Every stored assessment document, in storage order.
  pub fn list_documents(store: &dyn DocumentStore) -> Result<Vec<Value>> {
    store.find_all()
  }

  /// Delete by identity. Deleting something that is not there is a caller error.
  #[instrument(level = "info", skip(store), fields(%id))]
  pub fn delete_from_store(store: &dyn DocumentStore, id: &AssessmentId) -> Result<()> {
    if store.delete_one(id)? == 0 {
      return Err(AssessmentError::NotFound("Assessment not found or already deleted.".into()));
    }
    info!(target: "assessment", %id, "Assessment deleted");
    Ok(())
  }

  pub fn with_user_input(mut self, user_input: UserInput) -> Self {
    self.user_input = Some(user_input);
    self
  }

  pub fn id(&self) -> Result<&AssessmentId> {
    self.id.as_ref().ok_or(AssessmentError::Unset("_id"))
  }

  #[allow(dead_code)]
  pub fn user_input(&self) -> Option<&UserInput> { self.user_input.as_ref() }
  #[allow(dead_code)]
  pub fn questions(&self) -> &[Question] { &self.questions }
  #[allow(dead_code)]
  pub fn last_modified(&self) -> &str { &self.last_modified }

  #[allow(dead_code)]
  pub fn question_mut(&mut self, index: usize) -> Option<&mut Question> {
    self.questions.get_mut(index)
  }

  /// Canonical document. `_id` is included only when asked for and set.
  pub fn to_document(&self, with_id: bool) -> Result<Value> {
    let user_input = self.user_input.as_ref().ok_or(AssessmentError::Unset("user_input"))?;

    let mut doc = Map::new();
    if with_id {
      if let Some(id) = &self.id {
        doc.insert("_id".into(), id.to_value());
      }
    }
    doc.insert("user_input".into(), user_input.to_value());
    doc.insert("questions".into(), Value::Array(self.questions.iter().map(Question::to_value).collect()));
    doc.insert("last_modified".into(), Value::String(self.last_modified.clone()));
    Ok(Value::Object(doc))
  }

  /// Insert when new (adopting the assigned identity), otherwise replace the
  /// whole stored document.
  #[instrument(level = "info", skip_all, fields(id = ?self.id))]
  pub fn save(&mut self, store: &dyn DocumentStore) -> Result<()> {
    let doc = self.to_document(false)?;
    match &self.id {
      None => {
        let id = store.insert(doc)?;
        info!(target: "assessment", %id, questions = self.questions.len(), "Assessment inserted");
        self.id = Some(id);
      }
      Some(id) => {
        if store.replace(id, doc)? == 0 {
          warn!(target: "assessment", %id, "Replace matched no stored assessment");
        } else {
          info!(target: "assessment", %id, questions = self.questions.len(), "Assessment replaced");
        }
      }
    }
    Ok(())
  }
}

impl fmt::Display for Assessment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, q) in self.questions.iter().enumerate() {
      if i > 0 {
        f.write_str("\n\n")?;
      }
      write!(f, "{}. {}", i + 1, q)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::ErrorKind;
  use crate::store::MemoryStore;
  use serde_json::json;

  const GENERATED: &str = "Sure! Here are your questions:\n```json\n[{\"question_type\":\"MCQ\",\"question\":\"Q\",\"options\":[\"a\",\"b\"],\"correct_answer\":\"b)\"},]\n```\nGood luck.";

  fn user_input() -> UserInput {
    UserInput::new("Physics", "mcq", 1, vec![], "").unwrap()
  }

  fn payload() -> Value {
    json!({
      "user_input": {"topic": "Physics", "question_type": "MCQ", "num_questions": 1, "pdfs": [], "context_keywords": ""},
      "questions": [{"question_type": "MCQ", "question": "Q", "options": ["a", "b"], "correct_answer": 0}],
      "last_modified": "1999-01-01 00:00:00"
    })
  }

  #[test]
  fn generation_yields_typed_questions() {
    let a = Assessment::from_generation(user_input(), Some(GENERATED)).unwrap();
    assert_eq!(a.questions().len(), 1);
    let Question::Mcq(q) = &a.questions()[0] else { panic!("expected MCQ") };
    assert_eq!(q.correct_answer(), 1);
    assert_eq!(a.id().unwrap_err().kind(), ErrorKind::Programming);
  }

  #[test]
  fn generation_rejects_bad_text() {
    let err = Assessment::from_generation(user_input(), Some("I am unable to comply.")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedOutput);

    let essay = "[{\"question_type\": \"Essay\", \"question\": \"Q\"}]";
    let err = Assessment::from_generation(user_input(), Some(essay)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedOutput);
  }

  #[test]
  fn to_document_requires_user_input() {
    let a = Assessment::from_raw_questions(None).unwrap();
    assert!(a.questions().is_empty());
    assert_eq!(a.to_document(false).unwrap_err().kind(), ErrorKind::Programming);

    let doc = a.with_user_input(user_input()).to_document(true).unwrap();
    assert!(doc.get("_id").is_none());
    assert_eq!(doc["questions"], json!([]));
  }

  #[test]
  fn edit_payload_without_id_inserts_a_copy() {
    let store = MemoryStore::new();
    let mut a = Assessment::from_edit_payload(&payload()).unwrap();
    assert_ne!(a.last_modified(), "1999-01-01 00:00:00");
    assert!(a.id().is_err());

    a.save(&store).unwrap();
    let id = a.id().unwrap().clone();
    assert_eq!(store.find_all().unwrap().len(), 1);

    let loaded = Assessment::load(&store, &id).unwrap();
    assert_eq!(loaded, a);
  }

  #[test]
  fn edit_payload_with_id_replaces_in_place() {
    let store = MemoryStore::new();
    let mut first = Assessment::from_edit_payload(&payload()).unwrap();
    first.save(&store).unwrap();
    let id = first.id().unwrap().clone();

    let mut edited = payload();
    edited["_id"] = id.to_value();
    edited["questions"][0]["question"] = json!("Edited?");
    let mut second = Assessment::from_edit_payload(&edited).unwrap();
    second.save(&store).unwrap();

    assert_eq!(second.id().unwrap(), &id);
    let all = store.find_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0]["questions"][0]["question"], "Edited?");
  }

  #[test]
  fn edit_payload_accepts_bare_string_id_and_raw_text_questions() {
    let mut p = payload();
    p["_id"] = json!("abc123");
    p["questions"] = json!(GENERATED);
    let a = Assessment::from_edit_payload(&p).unwrap();
    assert_eq!(a.id().unwrap().as_str(), "abc123");
    assert_eq!(a.questions()[0].to_value()["correct_answer"], 1);
  }

  #[test]
  fn edit_payload_errors_are_classified() {
    let mut p = payload();
    p.as_object_mut().unwrap().remove("questions");
    assert_eq!(Assessment::from_edit_payload(&p).unwrap_err().kind(), ErrorKind::CallerInput);

    let mut p = payload();
    p.as_object_mut().unwrap().remove("user_input");
    assert_eq!(Assessment::from_edit_payload(&p).unwrap_err().kind(), ErrorKind::CallerInput);

    assert_eq!(Assessment::from_edit_payload(&json!([1])).unwrap_err().kind(), ErrorKind::CallerInput);

    let mut p = payload();
    p["questions"][0]["correct_answer"] = json!("q)");
    assert_eq!(Assessment::from_edit_payload(&p).unwrap_err().kind(), ErrorKind::MalformedOutput);
  }

  #[test]
  fn storage_document_round_trips_without_restamping() {
    let mut doc = payload();
    doc["_id"] = json!({"$oid": "65f0aa"});
    let a = Assessment::from_storage_document(&doc).unwrap();
    assert_eq!(a.last_modified(), "1999-01-01 00:00:00");
    assert_eq!(a.to_document(true).unwrap(), doc);

    let without_id = a.to_document(false).unwrap();
    assert!(without_id.get("_id").is_none());
  }

  #[test]
  fn storage_document_with_bad_shape_is_a_storage_error() {
    let mut doc = payload();
    doc["_id"] = json!("x");
    doc.as_object_mut().unwrap().remove("last_modified");
    assert_eq!(Assessment::from_storage_document(&doc).unwrap_err().kind(), ErrorKind::StorageUnavailable);
    assert_eq!(Assessment::from_storage_document(&payload()).unwrap_err().kind(), ErrorKind::StorageUnavailable);
  }

  #[test]
  fn delete_twice_reports_not_found() {
    let store = MemoryStore::new();
    let mut a = Assessment::from_generation(user_input(), Some(GENERATED)).unwrap();
    a.save(&store).unwrap();
    let id = a.id().unwrap().clone();

    Assessment::delete_from_store(&store, &id).unwrap();
    let err = Assessment::delete_from_store(&store, &id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CallerInput);
    assert_eq!(Assessment::load(&store, &id).unwrap_err().kind(), ErrorKind::CallerInput);
  }

  #[test]
  fn saving_twice_keeps_identity() {
    let store = MemoryStore::new();
    let mut a = Assessment::from_generation(user_input(), Some(GENERATED)).unwrap();
    a.save(&store).unwrap();
    let id = a.id().unwrap().clone();

    a.question_mut(0).unwrap().update_option(2usize, "c").unwrap();
    a.save(&store).unwrap();
    assert_eq!(a.id().unwrap(), &id);
    let docs = Assessment::list_documents(&store).unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["questions"][0]["options"], json!(["a", "b", "c"]));
  }

  #[test]
  fn display_numbers_questions() {
    let a = Assessment::from_generation(user_input(), Some(GENERATED)).unwrap();
    assert!(a.to_string().starts_with("1. Q\nOptions:\n(1) a\n(2) b (correct answer)"));
  }
}

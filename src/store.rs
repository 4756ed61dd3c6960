//! Document storage capability.
//!
//! The backend never talks to a concrete database directly: it receives a
//! `DocumentStore` handle from the bootstrap layer. `MemoryStore` is the
//! in-process implementation used by the server and by tests.

use std::collections::HashMap;
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::{json, Value};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{AssessmentError, Result};

/// Opaque identity assigned by the store on first insert.
///
/// On the wire it travels either as a bare string or wrapped in the
/// `{"$oid": "..."}` envelope; both collapse to the same token here.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssessmentId(String);

impl AssessmentId {
  pub fn from_token(token: impl Into<String>) -> Result<Self> {
    let token = token.into();
    if token.trim().is_empty() {
      return Err(AssessmentError::invalid("'_id' must not be empty"));
    }
    Ok(Self(token))
  }

  /// Accepts `"abc"` or `{"$oid": "abc"}`.
  pub fn from_field(value: &Value) -> Result<Self> {
    match value {
      Value::String(s) => Self::from_token(s.as_str()),
      Value::Object(map) => match map.get("$oid") {
        Some(Value::String(s)) => Self::from_token(s.as_str()),
        _ => Err(AssessmentError::invalid("'_id' envelope must carry a string '$oid'")),
      },
      other => Err(AssessmentError::invalid(format!("invalid '_id': {other}"))),
    }
  }

  #[allow(dead_code)]
  pub fn as_str(&self) -> &str { &self.0 }

  /// Envelope form written to documents.
  pub fn to_value(&self) -> Value {
    json!({ "$oid": self.0 })
  }
}

impl fmt::Display for AssessmentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

pub trait DocumentStore: Send + Sync {
  /// Store a new document and return its freshly assigned identity.
  fn insert(&self, doc: Value) -> Result<AssessmentId>;
  /// Replace the whole document stored under `id`. Returns the number of matched documents.
  fn replace(&self, id: &AssessmentId, doc: Value) -> Result<u64>;
  /// Returns the number of deleted documents.
  fn delete_one(&self, id: &AssessmentId) -> Result<u64>;
  fn find_one(&self, id: &AssessmentId) -> Result<Option<Value>>;
  fn find_all(&self) -> Result<Vec<Value>>;
}

#[derive(Default)]
struct Inner {
  by_id: HashMap<AssessmentId, Value>,
  order: Vec<AssessmentId>,
}

/// In-memory store: documents by id plus insertion order for listings.
#[derive(Default)]
pub struct MemoryStore {
  inner: RwLock<Inner>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
    self.inner.read().map_err(|_| AssessmentError::StorageUnavailable("store lock poisoned".into()))
  }

  fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
    self.inner.write().map_err(|_| AssessmentError::StorageUnavailable("store lock poisoned".into()))
  }
}

/// Documents are kept without `_id`; it is added back on the way out.
fn strip_id(mut doc: Value) -> Result<Value> {
  let map = doc
    .as_object_mut()
    .ok_or_else(|| AssessmentError::StorageUnavailable("documents must be JSON objects".into()))?;
  map.remove("_id");
  Ok(doc)
}

fn with_id(id: &AssessmentId, doc: &Value) -> Value {
  let mut doc = doc.clone();
  if let Some(map) = doc.as_object_mut() {
    map.insert("_id".into(), id.to_value());
  }
  doc
}

impl DocumentStore for MemoryStore {
  #[instrument(level = "debug", skip(self, doc))]
  fn insert(&self, doc: Value) -> Result<AssessmentId> {
    let doc = strip_id(doc)?;
    let id = AssessmentId(Uuid::new_v4().simple().to_string());
    let mut inner = self.write()?;
    inner.by_id.insert(id.clone(), doc);
    inner.order.push(id.clone());
    debug!(target: "store", %id, total = inner.order.len(), "Inserted document");
    Ok(id)
  }

  #[instrument(level = "debug", skip(self, doc), fields(%id))]
  fn replace(&self, id: &AssessmentId, doc: Value) -> Result<u64> {
    let doc = strip_id(doc)?;
    let mut inner = self.write()?;
    match inner.by_id.get_mut(id) {
      Some(slot) => {
        *slot = doc;
        Ok(1)
      }
      None => Ok(0),
    }
  }

  #[instrument(level = "debug", skip(self), fields(%id))]
  fn delete_one(&self, id: &AssessmentId) -> Result<u64> {
    let mut inner = self.write()?;
    if inner.by_id.remove(id).is_none() {
      return Ok(0);
    }
    inner.order.retain(|o| o != id);
    Ok(1)
  }

  fn find_one(&self, id: &AssessmentId) -> Result<Option<Value>> {
    let inner = self.read()?;
    Ok(inner.by_id.get(id).map(|doc| with_id(id, doc)))
  }

  fn find_all(&self) -> Result<Vec<Value>> {
    let inner = self.read()?;
    Ok(
      inner
        .order
        .iter()
        .filter_map(|id| inner.by_id.get(id).map(|doc| with_id(id, doc)))
        .collect(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::ErrorKind;

  #[test]
  fn id_adapter_accepts_both_shapes() {
    let bare = AssessmentId::from_field(&json!("65f0c0ffee")).unwrap();
    let wrapped = AssessmentId::from_field(&json!({"$oid": "65f0c0ffee"})).unwrap();
    assert_eq!(bare, wrapped);
    assert_eq!(wrapped.to_value(), json!({"$oid": "65f0c0ffee"}));

    for bad in [json!(""), json!(12), json!({"oid": "x"}), json!({"$oid": 1}), json!(null)] {
      assert_eq!(AssessmentId::from_field(&bad).unwrap_err().kind(), ErrorKind::CallerInput, "{bad}");
    }
  }

  #[test]
  fn insert_find_replace_delete() {
    let store = MemoryStore::new();
    let id = store.insert(json!({"n": 1})).unwrap();
    assert_eq!(store.find_one(&id).unwrap(), Some(json!({"n": 1, "_id": {"$oid": id.as_str()}})));

    assert_eq!(store.replace(&id, json!({"n": 2, "_id": "ignored"})).unwrap(), 1);
    assert_eq!(store.find_one(&id).unwrap().unwrap()["n"], 2);

    assert_eq!(store.delete_one(&id).unwrap(), 1);
    assert_eq!(store.delete_one(&id).unwrap(), 0);
    assert_eq!(store.find_one(&id).unwrap(), None);
  }

  #[test]
  fn replace_of_unknown_id_matches_nothing() {
    let store = MemoryStore::new();
    let ghost = AssessmentId::from_token("ghost").unwrap();
    assert_eq!(store.replace(&ghost, json!({"n": 1})).unwrap(), 0);
    assert!(store.find_all().unwrap().is_empty());
  }

  #[test]
  fn find_all_keeps_insertion_order() {
    let store = MemoryStore::new();
    let a = store.insert(json!({"n": "a"})).unwrap();
    let b = store.insert(json!({"n": "b"})).unwrap();
    let c = store.insert(json!({"n": "c"})).unwrap();
    store.delete_one(&b).unwrap();
    let all = store.find_all().unwrap();
    let ids: Vec<_> = all.iter().map(|d| AssessmentId::from_field(&d["_id"]).unwrap()).collect();
    assert_eq!(ids, vec![a, c]);
    assert_ne!(all[0]["_id"], all[1]["_id"]);
  }

  #[test]
  fn non_object_documents_are_rejected() {
    let store = MemoryStore::new();
    let err = store.insert(json!([1, 2])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StorageUnavailable);
  }
}

//! HTTP response DTOs (serde ready). Assessment bodies themselves are the
//! canonical documents produced by `Assessment::to_document`.

use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub generation: bool,
}

/// Reply to `save_assessment`.
#[derive(Serialize)]
pub struct SaveOut {
    #[serde(rename = "_id")]
    pub id: Value,
    pub last_modified: String,
}

#[derive(Serialize)]
pub struct MessageOut {
    pub message: String,
}

/// Error body: a short category plus the detailed message.
#[derive(Serialize)]
pub struct ErrorOut {
    pub error: &'static str,
    pub message: String,
}

//! Error taxonomy shared by the whole backend.
//!
//! Every failure is classified by *who* is to blame: the caller, the text
//! generator, the storage collaborator, or the code itself.

use thiserror::Error;

/// Coarse classification used by the HTTP boundary to pick a status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
  CallerInput,
  MalformedOutput,
  StorageUnavailable,
  GenerationUnavailable,
  Programming,
}

#[derive(Error, Debug)]
pub enum AssessmentError {
  /// The request payload is malformed (missing key, wrong type, unknown enum value).
  #[error("invalid input: {0}")]
  InvalidInput(String),
  /// The requested identity does not exist (or was already deleted).
  #[error("not found: {0}")]
  NotFound(String),
  /// The generator produced text we could not turn into valid questions.
  #[error("malformed generated output: {0}")]
  MalformedOutput(String),
  #[error("storage unavailable: {0}")]
  StorageUnavailable(String),
  /// The generation call itself failed (network, timeout, non-2xx).
  #[error("generation service unavailable: {0}")]
  GenerationUnavailable(String),
  /// An aggregate was used before a required field was set.
  #[error("'{0}' unset")]
  Unset(&'static str),
}

impl AssessmentError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::InvalidInput(_) | Self::NotFound(_) => ErrorKind::CallerInput,
      Self::MalformedOutput(_) => ErrorKind::MalformedOutput,
      Self::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
      Self::GenerationUnavailable(_) => ErrorKind::GenerationUnavailable,
      Self::Unset(_) => ErrorKind::Programming,
    }
  }

  pub(crate) fn malformed(msg: impl Into<String>) -> Self {
    Self::MalformedOutput(msg.into())
  }

  pub(crate) fn invalid(msg: impl Into<String>) -> Self {
    Self::InvalidInput(msg.into())
  }
}

pub type Result<T, E = AssessmentError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn not_found_is_a_caller_error() {
    let e = AssessmentError::NotFound("abc".into());
    assert_eq!(e.kind(), ErrorKind::CallerInput);
    assert_eq!(e.to_string(), "not found: abc");
  }

  #[test]
  fn unset_is_a_programming_error() {
    assert_eq!(AssessmentError::Unset("user_input").kind(), ErrorKind::Programming);
  }
}

//! Loading prompt configuration from TOML.
//!
//! See `PromptConfig` and `Prompts` for expected schema. Every key is optional;
//! missing ones keep the built-in default.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PromptConfig {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Prompt templates sent to the generator.
///
/// Placeholders: `{num_questions}`, `{topic}`, `{question_type}`, `{context}`,
/// `{pdf_context}`, `{keywords}` and `{text}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub system: String,
  pub mcq_template: String,
  pub subjective_template: String,
  pub context_keywords_template: String,
  pub pdf_context_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      system: "You write assessment questions for teachers. Respond ONLY with JSON.".into(),
      mcq_template: "Generate {num_questions} MCQ style assessment questions on the topic '{topic}'. {context}\n\n\
The output must be a very compact one-line JSON list of all questions as a dict.\n\
Each dict must have attributes 'question', 'options' and 'correct_answer' (which should be an index into 'options').\n\
Additionally, the dict must have an attribute 'question_type' with value 'MCQ'.\n\
{pdf_context}".into(),
      subjective_template: "Generate {num_questions} {question_type} style assessment questions on the topic '{topic}'. {context}\n\n\
The output must be a very compact one-line JSON list of all questions as a dict.\n\
Each dict must have attributes 'question' and 'sample_answer'.\n\
Additionally, the dict must have an attribute 'question_type' with value '{question_type}'.\n\
{pdf_context}".into(),
      context_keywords_template: "Try to inculcate the following context: {keywords}".into(),
      pdf_context_template: "Here is some additional context on the topic: {text}".into(),
    }
  }
}

/// Attempt to load `PromptConfig` from PROMPTS_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_prompt_config_from_env() -> Option<PromptConfig> {
  let path = std::env::var("PROMPTS_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_prompt_config(&s) {
      Ok(cfg) => {
        info!(target: "assessment_backend", %path, "Loaded prompt config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "assessment_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "assessment_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

fn parse_prompt_config(s: &str) -> Result<PromptConfig, toml::de::Error> {
  toml::from_str::<PromptConfig>(s)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_toml_keeps_defaults() {
    let cfg = parse_prompt_config("[prompts]\nsystem = \"Be terse.\"\n").unwrap();
    assert_eq!(cfg.prompts.system, "Be terse.");
    assert_eq!(cfg.prompts.mcq_template, Prompts::default().mcq_template);
  }

  #[test]
  fn empty_toml_is_default() {
    let cfg = parse_prompt_config("").unwrap();
    assert_eq!(cfg.prompts.pdf_context_template, Prompts::default().pdf_context_template);
  }

  #[test]
  fn malformed_toml_is_rejected() {
    assert!(parse_prompt_config("[prompts\nsystem = 1").is_err());
  }
}

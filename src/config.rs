//! Runtime configuration: environment settings plus an optional TOML file that
//! overrides prompt templates and extends the challenge bank.
//!
//! See `AgentConfig`, `Prompts` and `Settings` for the expected schema.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::ChallengeQuestion;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub challenges: Vec<BankEntryCfg>,
}

/// Challenge-bank entry accepted in TOML: a question plus the node that owns it.
#[derive(Clone, Debug, Deserialize)]
pub struct BankEntryCfg {
  pub node_id: String,
  #[serde(flatten)]
  pub question: ChallengeQuestion,
}

/// Prompt templates for the gateway. Placeholders use `{name}` syntax.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub chat_system: String,
  pub questions_system: String,
  pub questions_user_template: String,
  pub challenges_system: String,
  pub challenges_user_template: String,
  pub verify_system: String,
  pub verify_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      chat_system: "You are a friendly programming tutor inside a coding game. Answer concisely, use short code examples when helpful, and never write complete solutions to the player's current challenge.".into(),
      questions_system: "You are a quiz generator for a coding game. Respond ONLY with strict JSON, no prose, no markdown fences.".into(),
      questions_user_template: "Generate {count} multiple-choice questions about {language} for the battle \"{battle_name}\" at difficulty {difficulty} (1 = beginner, 5 = expert).\nEach question must have exactly 4 options and exactly one correct answer.\nReturn ONLY a JSON array in this exact shape:\n[{\"question\": string, \"options\": [string, string, string, string], \"correct\": integer index 0-3}]".into(),
      challenges_system: "You are a coding challenge designer for a gamified learning platform. Respond ONLY with strict JSON, no prose, no markdown fences.".into(),
      challenges_user_template: "Create {count} {language} coding challenges for the skill \"{node_name}\" (node id: {node_id}) at difficulty {difficulty} (1 = beginner, 5 = expert).\nTest cases are checked textually. Allowed \"check\" values: contains (with \"values\"), variable_declaration (with \"variables\"), function_declaration (with \"functions\"), has_return, has_if_else, has_switch.\nReturn ONLY a JSON array in this exact shape:\n[{\"id\": string, \"title\": string, \"difficulty\": {difficulty}, \"description\": string, \"prompt\": string, \"starterCode\": string, \"testCases\": [{\"description\": string, \"check\": string, \"values\"|\"variables\"|\"functions\": [string]}], \"hints\": [string]}]".into(),
      verify_system: "You are a strict but encouraging code reviewer. You judge whether code satisfies a task without running it. Respond ONLY with strict JSON.".into(),
      verify_user_template: "Language: {language}\nTask title: {title}\nTask: {task}\nRequirements:\n{requirements}\n\nSubmitted code:\n```\n{code}\n```\n\nJudge each requirement. Return ONLY a JSON object in this exact shape:\n{\"allPassed\": boolean, \"testResults\": [{\"description\": string, \"passed\": boolean, \"feedback\": string}], \"overallFeedback\": string}".into(),
    }
  }
}

/// Process settings read from the environment.
#[derive(Clone, Debug)]
pub struct Settings {
  pub port: u16,
  pub model_timeout: Duration,
}

impl Settings {
  pub const DEFAULT_PORT: u16 = 3001;
  pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 30;

  pub fn from_env() -> Self {
    let port = std::env::var("PORT")
      .ok()
      .and_then(|p| p.parse::<u16>().ok())
      .unwrap_or(Self::DEFAULT_PORT);
    let timeout_secs = std::env::var("MODEL_TIMEOUT_SECS")
      .ok()
      .and_then(|s| s.parse::<u64>().ok())
      .filter(|s| *s > 0)
      .unwrap_or(Self::DEFAULT_MODEL_TIMEOUT_SECS);
    Self { port, model_timeout: Duration::from_secs(timeout_secs) }
  }
}

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_agent_config(&s) {
      Ok(cfg) => {
        info!(target: "codequest_backend", %path, bank_entries = cfg.challenges.len(), "Loaded agent config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "codequest_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "codequest_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_agent_config(s: &str) -> Result<AgentConfig, toml::de::Error> {
  toml::from_str::<AgentConfig>(s)
}

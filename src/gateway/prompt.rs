//! Request shapes accepted by the gateway and the pure prompt builder.
//!
//! Every request type validates its own required fields into a borrowed
//! `ContentRequest`; `render` then turns that into exactly one completion call.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Prompts;
use crate::domain::{ChatTurn, TestCase};
use crate::error::GatewayError;
use crate::llm::CompletionRequest;
use crate::util::{fill_template, non_blank};

pub const DEFAULT_QUESTION_COUNT: usize = 5;
pub const DEFAULT_CHALLENGE_COUNT: usize = 3;
pub const MAX_ITEMS_PER_REQUEST: usize = 10;

/// Difficulty as sent by the client: either a 1-5 level or a free-form label.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Difficulty {
  Level(i64),
  Label(String),
}

impl Difficulty {
  /// Numeric level in `1..=5`. Unrecognized labels count as beginner.
  pub fn level(&self) -> u8 {
    match self {
      Difficulty::Level(n) => (*n).clamp(1, 5) as u8,
      Difficulty::Label(s) => {
        let s = s.trim().to_lowercase();
        if let Ok(n) = s.parse::<i64>() {
          return n.clamp(1, 5) as u8;
        }
        match s.as_str() {
          "intermediate" | "medium" => 3,
          "advanced" | "hard" => 4,
          "expert" => 5,
          _ => 1,
        }
      }
    }
  }

  fn is_blank(&self) -> bool {
    matches!(self, Difficulty::Label(s) if s.trim().is_empty())
  }
}

impl fmt::Display for Difficulty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Difficulty::Level(n) => write!(f, "{n}"),
      Difficulty::Label(s) => f.write_str(s.trim()),
    }
  }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
  pub message: Option<String>,
  #[serde(default)]
  pub conversation_history: Vec<ChatTurn>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionsRequest {
  pub language: Option<String>,
  pub difficulty: Option<Difficulty>,
  pub battle_name: Option<String>,
  pub count: Option<usize>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengesRequest {
  pub language: Option<String>,
  pub node_id: Option<String>,
  pub node_name: Option<String>,
  pub difficulty: Option<Difficulty>,
  #[serde(alias = "count")]
  pub challenge_count: Option<usize>,
}

/// The question being answered, either as plain task text or as the full challenge.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum QuestionSpec {
  Text(String),
  Detailed(QuestionDetails),
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDetails {
  #[serde(default)] pub title: String,
  #[serde(default)] pub description: String,
  #[serde(default)] pub prompt: String,
  #[serde(default)] pub test_cases: Vec<TestCase>,
}

impl QuestionSpec {
  fn is_blank(&self) -> bool {
    match self {
      QuestionSpec::Text(s) => s.trim().is_empty(),
      QuestionSpec::Detailed(d) => [&d.title, &d.description, &d.prompt].iter().all(|s| s.trim().is_empty()),
    }
  }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
  pub code: Option<String>,
  pub question: Option<QuestionSpec>,
  pub language: Option<String>,
  // Only used for log correlation.
  pub question_id: Option<serde_json::Value>,
  pub node_id: Option<String>,
}

/// A request whose required fields have been checked.
#[derive(Debug)]
pub enum ContentRequest<'a> {
  Chat { message: &'a str, history: &'a [ChatTurn] },
  Questions { language: &'a str, difficulty: &'a Difficulty, battle_name: &'a str, count: usize },
  Challenges { language: &'a str, node_id: &'a str, node_name: &'a str, difficulty: &'a Difficulty, count: usize },
  Verify { code: &'a str, language: &'a str, question: &'a QuestionSpec },
}

impl ContentRequest<'_> {
  pub fn kind(&self) -> &'static str {
    match self {
      ContentRequest::Chat { .. } => "chat",
      ContentRequest::Questions { .. } => "questions",
      ContentRequest::Challenges { .. } => "challenges",
      ContentRequest::Verify { .. } => "verify",
    }
  }
}

fn required<'a>(value: Option<&'a str>, name: &'static str) -> Result<&'a str, GatewayError> {
  non_blank(value).ok_or(GatewayError::MissingParameter(name))
}

fn required_difficulty<'a>(value: Option<&'a Difficulty>) -> Result<&'a Difficulty, GatewayError> {
  value.filter(|d| !d.is_blank()).ok_or(GatewayError::MissingParameter("difficulty"))
}

fn item_count(requested: Option<usize>, default: usize) -> usize {
  requested.unwrap_or(default).clamp(1, MAX_ITEMS_PER_REQUEST)
}

impl ChatRequest {
  pub fn validate(&self) -> Result<ContentRequest<'_>, GatewayError> {
    Ok(ContentRequest::Chat {
      message: required(self.message.as_deref(), "message")?,
      history: &self.conversation_history,
    })
  }
}

impl QuestionsRequest {
  pub fn validate(&self) -> Result<ContentRequest<'_>, GatewayError> {
    Ok(ContentRequest::Questions {
      language: required(self.language.as_deref(), "language")?,
      difficulty: required_difficulty(self.difficulty.as_ref())?,
      battle_name: required(self.battle_name.as_deref(), "battleName")?,
      count: item_count(self.count, DEFAULT_QUESTION_COUNT),
    })
  }
}

impl ChallengesRequest {
  pub fn validate(&self) -> Result<ContentRequest<'_>, GatewayError> {
    Ok(ContentRequest::Challenges {
      language: required(self.language.as_deref(), "language")?,
      node_id: required(self.node_id.as_deref(), "nodeId")?,
      node_name: required(self.node_name.as_deref(), "nodeName")?,
      difficulty: required_difficulty(self.difficulty.as_ref())?,
      count: item_count(self.challenge_count, DEFAULT_CHALLENGE_COUNT),
    })
  }
}

impl VerifyRequest {
  pub fn validate(&self) -> Result<ContentRequest<'_>, GatewayError> {
    // Code is passed through untrimmed.
    let code = self.code.as_deref().filter(|c| !c.trim().is_empty()).ok_or(GatewayError::MissingParameter("code"))?;
    let question = self.question.as_ref().filter(|q| !q.is_blank()).ok_or(GatewayError::MissingParameter("question"))?;
    Ok(ContentRequest::Verify {
      code,
      language: required(self.language.as_deref(), "language")?,
      question,
    })
  }
}

/// Build the single completion call for a validated request. Pure.
pub fn render(prompts: &Prompts, request: &ContentRequest<'_>) -> CompletionRequest {
  match request {
    ContentRequest::Chat { message, history } => CompletionRequest {
      system: prompts.chat_system.clone(),
      history: history.to_vec(),
      prompt: message.to_string(),
      temperature: 0.7,
      json_object: false,
    },
    ContentRequest::Questions { language, difficulty, battle_name, count } => {
      let difficulty = difficulty.to_string();
      let count = count.to_string();
      CompletionRequest {
        system: prompts.questions_system.clone(),
        history: Vec::new(),
        prompt: fill_template(
          &prompts.questions_user_template,
          &[
            ("count", count.as_str()),
            ("language", *language),
            ("battle_name", *battle_name),
            ("difficulty", difficulty.as_str()),
          ],
        ),
        temperature: 0.8,
        json_object: false,
      }
    }
    ContentRequest::Challenges { language, node_id, node_name, difficulty, count } => {
      let difficulty = difficulty.level().to_string();
      let count = count.to_string();
      CompletionRequest {
        system: prompts.challenges_system.clone(),
        history: Vec::new(),
        prompt: fill_template(
          &prompts.challenges_user_template,
          &[
            ("count", count.as_str()),
            ("language", *language),
            ("node_id", *node_id),
            ("node_name", *node_name),
            ("difficulty", difficulty.as_str()),
          ],
        ),
        temperature: 0.8,
        json_object: false,
      }
    }
    ContentRequest::Verify { code, language, question } => {
      let (title, task, requirements) = describe_question(question);
      CompletionRequest {
        system: prompts.verify_system.clone(),
        history: Vec::new(),
        prompt: fill_template(
          &prompts.verify_user_template,
          &[
            ("language", *language),
            ("title", title.as_str()),
            ("task", task.as_str()),
            ("requirements", requirements.as_str()),
            // Last, so placeholders inside user code are left alone.
            ("code", *code),
          ],
        ),
        temperature: 0.2,
        json_object: true,
      }
    }
  }
}

fn describe_question(question: &QuestionSpec) -> (String, String, String) {
  match question {
    QuestionSpec::Text(text) => (
      "Untitled".to_string(),
      text.trim().to_string(),
      "- The code accomplishes the task".to_string(),
    ),
    QuestionSpec::Detailed(d) => {
      let title = if d.title.trim().is_empty() { "Untitled".to_string() } else { d.title.trim().to_string() };
      let task = [d.description.trim(), d.prompt.trim()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
      let requirements = if d.test_cases.is_empty() {
        "- The code accomplishes the task".to_string()
      } else {
        d.test_cases
          .iter()
          .map(|tc| format!("- {}", if tc.description.is_empty() { "(unnamed requirement)" } else { tc.description.as_str() }))
          .collect::<Vec<_>>()
          .join("\n")
      };
      (title, task, requirements)
    }
  }
}

//! AI content gateway: validated request -> one prompt -> one model call -> strict shape.
//!
//! No retries and no caching happen here. The only policy applied to the call
//! itself is the client timeout configured on the model.

use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::config::Prompts;
use crate::domain::{ChallengeQuestion, Mcq, VerificationReport};
use crate::error::GatewayError;
use crate::llm::TextGenerator;

pub mod parse;
pub mod prompt;

use self::prompt::{render, ChallengesRequest, ChatRequest, ContentRequest, QuestionsRequest, VerifyRequest};

/// Reply shown to the player when the tutor cannot answer.
pub const CHAT_FALLBACK_REPLY: &str =
  "Sorry, I'm having trouble connecting to my knowledge base right now. Please try again in a moment!";

#[derive(Clone)]
pub struct AiGateway {
  model: Option<Arc<dyn TextGenerator>>,
  prompts: Prompts,
}

impl AiGateway {
  pub fn new(model: Option<Arc<dyn TextGenerator>>, prompts: Prompts) -> Self {
    Self { model, prompts }
  }

  pub fn is_configured(&self) -> bool {
    self.model.is_some()
  }

  /// Render and send exactly one completion call, returning the raw reply.
  async fn call(&self, request: &ContentRequest<'_>) -> Result<String, GatewayError> {
    let kind = request.kind();
    let model = self
      .model
      .as_ref()
      .ok_or_else(|| GatewayError::Upstream("AI model not configured".into()))?;
    let completion = render(&self.prompts, request);

    let start = std::time::Instant::now();
    match model.complete(completion).await {
      Ok(raw) => {
        info!(target: "gateway", %kind, elapsed = ?start.elapsed(), reply_len = raw.len(), "Model replied");
        Ok(raw)
      }
      Err(e) => {
        error!(target: "gateway", %kind, elapsed = ?start.elapsed(), error = %e, "Model call failed");
        Err(e.into())
      }
    }
  }

  #[instrument(level = "info", skip_all, fields(history = req.conversation_history.len()))]
  pub async fn chat(&self, req: &ChatRequest) -> Result<String, GatewayError> {
    let request = req.validate()?;
    let raw = self.call(&request).await?;
    parse::parse_chat(&raw)
  }

  #[instrument(level = "info", skip_all)]
  pub async fn generate_questions(&self, req: &QuestionsRequest) -> Result<Vec<Mcq>, GatewayError> {
    let request = req.validate()?;
    let raw = self.call(&request).await?;
    let questions = parse::parse_questions(&raw)?;
    info!(target: "gateway", count = questions.len(), "Questions generated");
    Ok(questions)
  }

  #[instrument(level = "info", skip_all, fields(node_id = ?req.node_id))]
  pub async fn generate_challenges(&self, req: &ChallengesRequest) -> Result<Vec<ChallengeQuestion>, GatewayError> {
    let request = req.validate()?;
    let requested_difficulty = match &request {
      ContentRequest::Challenges { difficulty, .. } => difficulty.level(),
      _ => 1,
    };
    let raw = self.call(&request).await?;
    let challenges = parse::parse_challenges(&raw, requested_difficulty)?;
    info!(target: "gateway", count = challenges.len(), "Challenges generated");
    Ok(challenges)
  }

  /// Model-graded verification. Unusable replies degrade to the fallback report;
  /// only missing parameters and upstream failures are errors.
  #[instrument(level = "info", skip_all, fields(node_id = ?req.node_id, question_id = ?req.question_id))]
  pub async fn verify_code(&self, req: &VerifyRequest) -> Result<VerificationReport, GatewayError> {
    let request = req.validate()?;
    let raw = self.call(&request).await?;
    let report = parse::parse_verification(&raw);
    info!(target: "gateway", all_passed = report.all_passed, results = report.test_results.len(), "Code verified");
    Ok(report)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::ChatTurn;
  use crate::error::LlmError;
  use crate::llm::MockTextGenerator;
  use super::prompt::{Difficulty, QuestionSpec};

  fn gateway_with(mock: MockTextGenerator) -> AiGateway {
    AiGateway::new(Some(Arc::new(mock)), Prompts::default())
  }

  fn mock_replying(reply: &'static str) -> MockTextGenerator {
    let mut mock = MockTextGenerator::new();
    mock.expect_complete().times(1).returning(move |_| Ok(reply.to_string()));
    mock
  }

  fn questions_request() -> QuestionsRequest {
    QuestionsRequest {
      language: Some("JavaScript".into()),
      difficulty: Some(Difficulty::Level(1)),
      battle_name: Some("Syntax Slime".into()),
      count: Some(2),
    }
  }

  #[tokio::test]
  async fn missing_parameter_short_circuits_before_model() {
    let mut mock = MockTextGenerator::new();
    mock.expect_complete().times(0);
    let gw = gateway_with(mock);
    let req = QuestionsRequest { language: None, ..questions_request() };
    assert!(matches!(gw.generate_questions(&req).await, Err(GatewayError::MissingParameter("language"))));
  }

  #[tokio::test]
  async fn questions_are_parsed_from_one_call() {
    let mut mock = MockTextGenerator::new();
    mock.expect_complete()
      .withf(|req| req.prompt.contains("Syntax Slime") && req.prompt.contains("Generate 2"))
      .times(1)
      .returning(|_| Ok(r#"[{"question": "Q", "options": ["a","b","c","d"], "correct": 0}]"#.into()));
    let qs = gateway_with(mock).generate_questions(&questions_request()).await.unwrap();
    assert_eq!(qs.len(), 1);
  }

  #[tokio::test]
  async fn upstream_failure_is_surfaced() {
    let mut mock = MockTextGenerator::new();
    mock.expect_complete().times(1).returning(|_| Err(LlmError::RequestFailed("connection refused".into())));
    let err = gateway_with(mock).generate_questions(&questions_request()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Upstream(_)));
  }

  #[tokio::test]
  async fn unconfigured_model_is_upstream_error() {
    let gw = AiGateway::new(None, Prompts::default());
    assert!(!gw.is_configured());
    let err = gw.generate_questions(&questions_request()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Upstream(_)));
  }

  #[tokio::test]
  async fn all_invalid_questions_is_empty_result() {
    let gw = gateway_with(mock_replying(r#"[{"question": "Q", "options": ["a"], "correct": 0}]"#));
    assert!(matches!(gw.generate_questions(&questions_request()).await, Err(GatewayError::EmptyResult(_))));
  }

  #[tokio::test]
  async fn challenges_default_to_requested_difficulty() {
    let gw = gateway_with(mock_replying(r#"[{"title": "T", "description": "D", "prompt": "P", "hints": []}]"#));
    let req = ChallengesRequest {
      language: Some("JavaScript".into()),
      node_id: Some("js-vars".into()),
      node_name: Some("Variables".into()),
      difficulty: Some(Difficulty::Level(3)),
      challenge_count: None,
    };
    let cs = gw.generate_challenges(&req).await.unwrap();
    assert_eq!(cs[0].difficulty, 3);
    assert_eq!(cs[0].id, "1");
  }

  #[tokio::test]
  async fn garbled_verification_returns_fallback_success() {
    let gw = gateway_with(mock_replying("The code looks fine to me!"));
    let req = VerifyRequest {
      code: Some("let x = 1;".into()),
      question: Some(QuestionSpec::Text("Declare x".into())),
      language: Some("JavaScript".into()),
      ..Default::default()
    };
    let report = gw.verify_code(&req).await.unwrap();
    assert_eq!(report, parse::fallback_verification());
  }

  #[tokio::test]
  async fn chat_sends_history_and_message() {
    let mut mock = MockTextGenerator::new();
    mock.expect_complete()
      .withf(|req| req.history.len() == 2 && req.prompt == "And arrays?")
      .times(1)
      .returning(|_| Ok("Arrays are ordered lists.".into()));
    let req = ChatRequest {
      message: Some("And arrays?".into()),
      conversation_history: vec![
        ChatTurn { role: crate::domain::ChatRole::User, content: "What are objects?".into() },
        ChatTurn { role: crate::domain::ChatRole::Assistant, content: "Key/value maps.".into() },
      ],
    };
    assert_eq!(gateway_with(mock).chat(&req).await.unwrap(), "Arrays are ordered lists.");
  }
}

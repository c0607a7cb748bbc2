//! Domain models: test cases and their results, challenge questions, MCQs,
//! verification reports and chat turns.

use serde::{Deserialize, Serialize};

/// One checkable requirement against submitted code.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestCase {
  #[serde(default)]
  pub description: String,
  #[serde(flatten)]
  pub check: Check,
}

/// Matcher selected by the `check` tag, with its parameters.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Check {
  Contains {
    #[serde(default)] values: Vec<String>,
  },
  VariableDeclaration {
    #[serde(default)] variables: Vec<String>,
  },
  FunctionDeclaration {
    #[serde(default)] functions: Vec<String>,
  },
  HasReturn,
  HasIfElse,
  HasSwitch,
  /// Any tag we do not recognize. Always fails.
  ///
  /// The original tag and its parameters are not kept: this variant
  /// serializes back as `"check": "unknown"`.
  #[serde(other)]
  Unknown,
}

/// Outcome of one test case against one submission.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestResult {
  pub description: String,
  pub passed: bool,
  /// Only filled in by AI verification.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub feedback: Option<String>,
}

/// A coding exercise owned by a skill-tree node.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeQuestion {
  pub id: String,
  pub title: String,
  pub difficulty: u8, // 1..=5
  pub description: String,
  pub prompt: String,
  #[serde(default)] pub starter_code: String,
  #[serde(default)] pub test_cases: Vec<TestCase>,
  #[serde(default)] pub hints: Vec<String>,
}

/// Multiple-choice question used in battles.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mcq {
  pub question: String,
  pub options: Vec<String>,
  /// Index of the right option, always in `0..4`.
  #[serde(rename = "correct")]
  pub correct_index: usize,
}

/// AI verification verdict for a code submission.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
  pub all_passed: bool,
  pub test_results: Vec<TestResult>,
  pub overall_feedback: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
  User,
  Assistant,
}

/// One prior message of a chat conversation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
  pub role: ChatRole,
  pub content: String,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_case_parses_tagged_payload() {
    let tc: TestCase = serde_json::from_value(json!({
      "description": "Declare PI and radius",
      "check": "variable_declaration",
      "variables": ["PI", "radius"]
    }))
    .unwrap();
    assert_eq!(tc.description, "Declare PI and radius");
    assert_eq!(
      tc.check,
      Check::VariableDeclaration { variables: vec!["PI".into(), "radius".into()] }
    );
  }

  #[test]
  fn unrecognized_check_tag_becomes_unknown() {
    let tc: TestCase = serde_json::from_value(json!({
      "description": "Uses a loop",
      "check": "has_for_loop"
    }))
    .unwrap();
    assert_eq!(tc.check, Check::Unknown);
  }

  #[test]
  fn unknown_check_echoes_as_unknown() {
    let tc: TestCase = serde_json::from_value(json!({
      "description": "Uses a loop",
      "check": "has_for_loop",
      "loops": 1
    }))
    .unwrap();
    let back = serde_json::to_value(&tc).unwrap();
    assert_eq!(back, json!({ "description": "Uses a loop", "check": "unknown" }));
  }

  #[test]
  fn keyword_checks_need_no_payload() {
    let tc: TestCase = serde_json::from_value(json!({ "check": "has_return" })).unwrap();
    assert_eq!(tc.check, Check::HasReturn);
    assert_eq!(tc.description, "");
  }

  #[test]
  fn challenge_question_uses_camel_case() {
    let q: ChallengeQuestion = serde_json::from_value(json!({
      "id": "1",
      "title": "Area",
      "difficulty": 2,
      "description": "Compute an area",
      "prompt": "Declare PI",
      "starterCode": "// here",
      "testCases": [{ "description": "has PI", "check": "contains", "values": ["pi"] }],
      "hints": ["Use const"]
    }))
    .unwrap();
    assert_eq!(q.starter_code, "// here");
    assert_eq!(q.test_cases.len(), 1);

    let back = serde_json::to_value(&q).unwrap();
    assert_eq!(back["starterCode"], "// here");
    assert_eq!(back["testCases"][0]["check"], "contains");
  }

  #[test]
  fn feedback_is_omitted_when_absent() {
    let r = TestResult { description: "x".into(), passed: true, feedback: None };
    let v = serde_json::to_value(&r).unwrap();
    assert!(v.get("feedback").is_none());
  }
}

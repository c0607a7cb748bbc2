//! Turning free-text model replies into strict shapes.
//!
//! Models like to wrap JSON in prose or markdown fences, so we scan for the
//! first opener that starts a well-formed value and parse only that value.
//! Entries are then validated one by one; malformed entries are dropped
//! rather than failing the whole reply.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::domain::{ChallengeQuestion, Mcq, TestCase, TestResult, VerificationReport};
use crate::error::GatewayError;
use crate::util::trunc_for_log;

pub const MCQ_OPTION_COUNT: usize = 4;

pub const FALLBACK_TEST_DESCRIPTION: &str = "Code analysis failed";
pub const FALLBACK_TEST_FEEDBACK: &str = "We couldn't analyze your code this time. Please try again.";
pub const FALLBACK_OVERALL_FEEDBACK: &str =
  "Unable to verify your code right now. Review the requirements and submit again.";

/// Locate and parse the first well-formed JSON value starting with `opener` (`[` or `{`).
fn extract_json(raw: &str, opener: char) -> Option<Value> {
  raw.char_indices()
    .filter(|(_, c)| *c == opener)
    .find_map(|(i, _)| {
      serde_json::Deserializer::from_str(&raw[i..])
        .into_iter::<Value>()
        .next()
        .and_then(Result::ok)
    })
}

pub fn extract_json_array(raw: &str) -> Result<Vec<Value>, GatewayError> {
  match extract_json(raw, '[') {
    Some(Value::Array(items)) => Ok(items),
    _ => Err(GatewayError::Parse(format!("no JSON array in reply: {}", trunc_for_log(raw, 120)))),
  }
}

pub fn extract_json_object(raw: &str) -> Result<Map<String, Value>, GatewayError> {
  match extract_json(raw, '{') {
    Some(Value::Object(map)) => Ok(map),
    _ => Err(GatewayError::Parse(format!("no JSON object in reply: {}", trunc_for_log(raw, 120)))),
  }
}

fn non_empty_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
  obj.get(key).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

/// Option text for a scalar option. Numbers and booleans are common in arithmetic quizzes.
fn option_text(v: &Value) -> Option<String> {
  match v {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

fn mcq_from_value(v: &Value) -> Option<Mcq> {
  let obj = v.as_object()?;
  // Blank questions are rejected, but the text is kept as the model wrote it.
  let question = obj.get("question")?.as_str().filter(|q| !q.trim().is_empty())?;
  let options = obj.get("options")?.as_array()?;
  if options.len() != MCQ_OPTION_COUNT {
    return None;
  }
  let options = options.iter().map(option_text).collect::<Option<Vec<_>>>()?;
  let correct = obj.get("correct")?.as_u64()?;
  if correct >= MCQ_OPTION_COUNT as u64 {
    return None;
  }
  Some(Mcq { question: question.to_string(), options, correct_index: correct as usize })
}

/// Parse an MCQ reply. Order of surviving entries is preserved.
pub fn parse_questions(raw: &str) -> Result<Vec<Mcq>, GatewayError> {
  let items = extract_json_array(raw)?;
  let total = items.len();
  let questions: Vec<Mcq> = items.iter().filter_map(mcq_from_value).collect();
  if questions.len() < total {
    warn!(target: "gateway", kept = questions.len(), dropped = total - questions.len(), "Dropped malformed questions");
  }
  if questions.is_empty() {
    return Err(GatewayError::EmptyResult("questions"));
  }
  Ok(questions)
}

/// Id the model supplied for a challenge, if any.
fn explicit_id(v: &Value) -> Option<String> {
  match v.get("id")? {
    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

/// Challenge with every field except `id`, which `parse_challenges` assigns.
fn challenge_from_value(v: &Value, requested_difficulty: u8) -> Option<ChallengeQuestion> {
  let obj = v.as_object()?;
  let title = non_empty_str(obj, "title")?;
  let description = non_empty_str(obj, "description")?;
  let prompt = non_empty_str(obj, "prompt")?;
  let hints = obj
    .get("hints")?
    .as_array()?
    .iter()
    .filter_map(|h| h.as_str().map(str::to_string))
    .collect();

  let difficulty = obj
    .get("difficulty")
    .and_then(Value::as_u64)
    .filter(|d| (1..=5).contains(d))
    .map_or(requested_difficulty, |d| d as u8);
  let starter_code = obj.get("starterCode").and_then(Value::as_str).unwrap_or_default().to_string();
  let test_cases = obj
    .get("testCases")
    .and_then(Value::as_array)
    .map(|cases| {
      cases
        .iter()
        .filter_map(|c| match serde_json::from_value::<TestCase>(c.clone()) {
          Ok(tc) => Some(tc),
          Err(e) => {
            debug!(target: "gateway", error = %e, "Skipping malformed generated test case");
            None
          }
        })
        .collect()
    })
    .unwrap_or_default();

  Some(ChallengeQuestion {
    id: String::new(),
    title: title.to_string(),
    difficulty,
    description: description.to_string(),
    prompt: prompt.to_string(),
    starter_code,
    test_cases,
    hints,
  })
}

/// Parse a challenge-generation reply.
///
/// Ids are unique within the result. A missing or repeated id becomes the
/// 1-based position among kept entries, bumped past any id already in use.
pub fn parse_challenges(raw: &str, requested_difficulty: u8) -> Result<Vec<ChallengeQuestion>, GatewayError> {
  let items = extract_json_array(raw)?;
  let total = items.len();
  let kept: Vec<(Option<String>, ChallengeQuestion)> = items
    .iter()
    .filter_map(|item| challenge_from_value(item, requested_difficulty).map(|c| (explicit_id(item), c)))
    .collect();

  let reserved: HashSet<&str> = kept.iter().filter_map(|(id, _)| id.as_deref()).collect();
  let mut used: HashSet<String> = HashSet::with_capacity(kept.len());
  let mut challenges = Vec::with_capacity(kept.len());
  for (position, (id, mut challenge)) in kept.iter().cloned().enumerate() {
    challenge.id = match id {
      Some(id) if !used.contains(&id) => id,
      _ => {
        let mut n = position + 1;
        loop {
          let candidate = n.to_string();
          if !reserved.contains(candidate.as_str()) && !used.contains(&candidate) {
            break candidate;
          }
          n += 1;
        }
      }
    };
    used.insert(challenge.id.clone());
    challenges.push(challenge);
  }
  if challenges.len() < total {
    warn!(target: "gateway", kept = challenges.len(), dropped = total - challenges.len(), "Dropped malformed challenges");
  }
  if challenges.is_empty() {
    return Err(GatewayError::EmptyResult("challenges"));
  }
  Ok(challenges)
}

/// Strict verification parse. Callers normally want `parse_verification`.
pub fn try_parse_verification(raw: &str) -> Result<VerificationReport, GatewayError> {
  let obj = extract_json_object(raw)?;
  let model_all_passed = obj
    .get("allPassed")
    .and_then(Value::as_bool)
    .ok_or_else(|| GatewayError::Parse("`allPassed` missing or not a boolean".into()))?;
  let results = obj
    .get("testResults")
    .and_then(Value::as_array)
    .ok_or_else(|| GatewayError::Parse("`testResults` missing or not an array".into()))?;

  let test_results: Vec<TestResult> = results
    .iter()
    .filter_map(Value::as_object)
    .map(|r| TestResult {
      description: r.get("description").and_then(Value::as_str).unwrap_or_default().to_string(),
      passed: r.get("passed").and_then(Value::as_bool).unwrap_or(false),
      feedback: r.get("feedback").and_then(Value::as_str).map(str::to_string),
    })
    .collect();

  // Never report success while a listed requirement failed.
  let all_passed = model_all_passed && test_results.iter().all(|r| r.passed);
  let overall_feedback = obj.get("overallFeedback").and_then(Value::as_str).unwrap_or_default().to_string();

  Ok(VerificationReport { all_passed, test_results, overall_feedback })
}

/// Canned result used whenever a verification reply is unusable.
pub fn fallback_verification() -> VerificationReport {
  VerificationReport {
    all_passed: false,
    test_results: vec![TestResult {
      description: FALLBACK_TEST_DESCRIPTION.into(),
      passed: false,
      feedback: Some(FALLBACK_TEST_FEEDBACK.into()),
    }],
    overall_feedback: FALLBACK_OVERALL_FEEDBACK.into(),
  }
}

/// Verification parse that always yields a displayable report.
pub fn parse_verification(raw: &str) -> VerificationReport {
  match try_parse_verification(raw) {
    Ok(report) => report,
    Err(e) => {
      warn!(target: "gateway", error = %e, "Verification reply unusable; returning fallback result");
      fallback_verification()
    }
  }
}

/// Chat replies are plain text; an empty reply is not usable.
pub fn parse_chat(raw: &str) -> Result<String, GatewayError> {
  let text = raw.trim();
  if text.is_empty() {
    return Err(GatewayError::EmptyResult("chat reply"));
  }
  Ok(text.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Check;

  const TWO_MCQS: &str = r#"[
    {"question": "Which keyword declares a constant?", "options": ["var", "let", "const", "def"], "correct": 2},
    {"question": "typeof null?", "options": ["null", "object", "undefined", "number"], "correct": 1}
  ]"#;

  #[test]
  fn well_formed_mcqs_are_returned_in_order() {
    let qs = parse_questions(TWO_MCQS).unwrap();
    assert_eq!(qs.len(), 2);
    assert_eq!(qs[0].question, "Which keyword declares a constant?");
    assert_eq!(qs[0].correct_index, 2);
    assert_eq!(qs[1].options, vec!["null", "object", "undefined", "number"]);
  }

  #[test]
  fn prose_and_fences_around_json_are_ignored() {
    let raw = format!("Sure! Here are your questions [see below]:\n```json\n{TWO_MCQS}\n```\nGood luck!");
    assert_eq!(parse_questions(&raw).unwrap().len(), 2);
  }

  #[test]
  fn mcq_with_wrong_option_count_is_dropped() {
    let raw = r#"[
      {"question": "Q1", "options": ["a", "b", "c"], "correct": 0},
      {"question": "Q2", "options": ["a", "b", "c", "d"], "correct": 3}
    ]"#;
    let qs = parse_questions(raw).unwrap();
    assert_eq!(qs.len(), 1);
    assert_eq!(qs[0].question, "Q2");
  }

  #[test]
  fn mcq_with_bad_correct_index_is_dropped() {
    let raw = r#"[
      {"question": "Q1", "options": ["a", "b", "c", "d"], "correct": 4},
      {"question": "Q2", "options": ["a", "b", "c", "d"], "correct": -1},
      {"question": "Q3", "options": ["a", "b", "c", "d"], "correct": 1.5},
      {"question": "", "options": ["a", "b", "c", "d"], "correct": 0}
    ]"#;
    assert!(matches!(parse_questions(raw), Err(GatewayError::EmptyResult(_))));
  }

  #[test]
  fn scalar_options_become_text() {
    let raw = r#"[{"question": "What is 1+1?", "options": [1, 2, 3, 4], "correct": 1},
                  {"question": "Is [] truthy?", "options": [true, false, "only in Python", null], "correct": 0}]"#;
    let qs = parse_questions(raw).unwrap();
    assert_eq!(qs.len(), 1);
    assert_eq!(qs[0].options, vec!["1", "2", "3", "4"]);
  }

  #[test]
  fn question_text_is_kept_verbatim() {
    let raw = r#"[{"question": "  padded  ", "options": ["a", "b", "c", "d"], "correct": 0},
                  {"question": "   ", "options": ["a", "b", "c", "d"], "correct": 0}]"#;
    let qs = parse_questions(raw).unwrap();
    assert_eq!(qs.len(), 1);
    assert_eq!(qs[0].question, "  padded  ");
  }

  #[test]
  fn reply_without_array_is_parse_error() {
    assert!(matches!(parse_questions("I cannot help with that."), Err(GatewayError::Parse(_))));
    assert!(matches!(parse_questions("[1, 2,"), Err(GatewayError::Parse(_))));
  }

  #[test]
  fn challenges_get_defaults() {
    let raw = r#"[
      {"title": "Area", "description": "Circle area", "prompt": "Declare PI", "hints": ["const"],
       "testCases": [{"description": "PI", "check": "variable_declaration", "variables": ["PI"]},
                     {"description": "no tag"}]},
      {"title": "", "description": "x", "prompt": "y", "hints": []},
      {"id": 7, "title": "Greet", "description": "Say hi", "prompt": "Write greet", "hints": [], "difficulty": 4}
    ]"#;
    let cs = parse_challenges(raw, 2).unwrap();
    assert_eq!(cs.len(), 2);
    assert_eq!(cs[0].id, "1");
    assert_eq!(cs[0].difficulty, 2);
    assert_eq!(cs[0].starter_code, "");
    assert_eq!(cs[0].test_cases.len(), 1);
    assert_eq!(cs[0].test_cases[0].check, Check::VariableDeclaration { variables: vec!["PI".into()] });
    assert_eq!(cs[1].id, "7");
    assert_eq!(cs[1].difficulty, 4);
  }

  #[test]
  fn assigned_ids_never_collide_with_model_ids() {
    let raw = r#"[
      {"id": "2", "title": "A", "description": "d", "prompt": "p", "hints": []},
      {"title": "B", "description": "d", "prompt": "p", "hints": []},
      {"id": "2", "title": "C", "description": "d", "prompt": "p", "hints": []},
      {"title": "D", "description": "d", "prompt": "p", "hints": []}
    ]"#;
    let ids: Vec<String> = parse_challenges(raw, 1).unwrap().into_iter().map(|c| c.id).collect();
    assert_eq!(ids, vec!["2", "3", "4", "5"]);
  }

  #[test]
  fn later_model_id_keeps_its_value() {
    let raw = r#"[
      {"title": "A", "description": "d", "prompt": "p", "hints": []},
      {"id": 1, "title": "B", "description": "d", "prompt": "p", "hints": []}
    ]"#;
    let ids: Vec<String> = parse_challenges(raw, 1).unwrap().into_iter().map(|c| c.id).collect();
    assert_eq!(ids, vec!["2", "1"]);
  }

  #[test]
  fn challenge_without_hints_is_dropped() {
    let raw = r#"[{"title": "A", "description": "B", "prompt": "C"}]"#;
    assert!(matches!(parse_challenges(raw, 1), Err(GatewayError::EmptyResult("challenges"))));
  }

  #[test]
  fn challenges_wrapped_in_object_are_found() {
    let raw = r#"{"challenges": [{"title": "A", "description": "B", "prompt": "C", "hints": ["h"]}]}"#;
    assert_eq!(parse_challenges(raw, 3).unwrap()[0].title, "A");
  }

  #[test]
  fn verification_reply_is_parsed() {
    let raw = r#"Result: {"allPassed": true, "testResults": [{"description": "returns", "passed": true, "feedback": "Nice"}], "overallFeedback": "Great job"}"#;
    let report = parse_verification(raw);
    assert!(report.all_passed);
    assert_eq!(report.test_results[0].feedback.as_deref(), Some("Nice"));
    assert_eq!(report.overall_feedback, "Great job");
  }

  #[test]
  fn verification_all_passed_is_not_trusted_over_results() {
    let raw = r#"{"allPassed": true, "testResults": [{"description": "a", "passed": false}]}"#;
    assert!(!parse_verification(raw).all_passed);
  }

  #[test]
  fn unparsable_verification_falls_back() {
    for raw in ["not json at all", r#"{"allPassed": "yes", "testResults": []}"#, r#"{"allPassed": true}"#] {
      let report = parse_verification(raw);
      assert!(!report.all_passed);
      assert_eq!(report.test_results.len(), 1);
      assert!(!report.test_results[0].passed);
      assert!(!report.overall_feedback.is_empty());
      assert_eq!(report, fallback_verification());
    }
  }

  #[test]
  fn chat_reply_is_trimmed() {
    assert_eq!(parse_chat("  Closures capture variables.\n").unwrap(), "Closures capture variables.");
    assert!(matches!(parse_chat("   "), Err(GatewayError::EmptyResult(_))));
  }
}

//! Public HTTP request/response structs (serde ready).
//! Gateway request bodies live next to the prompt builder in `gateway::prompt`.

use serde::{Deserialize, Serialize};

use crate::domain::{ChallengeQuestion, Mcq, TestCase};
use crate::progress::UserProgress;
use crate::validator::Grade;

#[derive(Serialize)]
pub struct HealthOut {
    pub status: &'static str,
    pub message: String,
}

#[derive(Serialize)]
pub struct ChallengesOut {
    pub challenges: Vec<ChallengeQuestion>,
}

#[derive(Serialize)]
pub struct QuestionsOut {
    pub questions: Vec<Mcq>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatOut {
    pub response_text: String,
}

#[derive(Serialize)]
pub struct NodeChallengesOut {
    #[serde(rename = "nodeId")]
    pub node_id: String,
    pub challenges: Vec<ChallengeQuestion>,
}

/// Local grading request. Test cases come inline or from the bank via `nodeId` + `questionId`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateIn {
    #[serde(default)]
    pub code: String,
    pub test_cases: Option<Vec<TestCase>>,
    pub node_id: Option<String>,
    pub question_id: Option<String>,
    // Progress context; all three are needed to record a completion.
    pub user_id: Option<String>,
    pub skill: Option<String>,
    #[serde(default)]
    pub xp: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateOut {
    #[serde(flatten)]
    pub grade: Grade,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<UserProgress>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteNodeIn {
    pub skill: Option<String>,
    pub node_id: Option<String>,
    #[serde(default)]
    pub xp: u64,
}

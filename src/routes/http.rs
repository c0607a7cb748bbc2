//! HTTP endpoint handlers. These are thin wrappers that forward to the gateway,
//! the validator, or the progress store. Each handler is instrumented and logs
//! sizes and ids, never code or model output.

use axum::{
    extract::{FromRequest, Path, State},
    http::Uri,
    Json,
};
use tracing::{info, instrument, warn};

use crate::domain::VerificationReport;
use crate::error::{ApiError, ErrorBody, GatewayError};
use crate::gateway::prompt::{ChallengesRequest, ChatRequest, QuestionsRequest, VerifyRequest};
use crate::gateway::CHAT_FALLBACK_REPLY;
use crate::progress::UserProgress;
use crate::protocol::*;
use crate::state::AppState;
use crate::util::non_blank;
use crate::validator;

/// `Json` body extractor whose rejections render as `{error, details}`.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<AppState>) -> Json<HealthOut> {
    let message = if state.gateway.is_configured() {
        "Server is running".to_string()
    } else {
        "Server is running (AI model not configured)".to_string()
    };
    Json(HealthOut { status: "ok", message })
}

#[instrument(level = "info", skip(state, body), fields(node_id = ?body.node_id, count = ?body.challenge_count))]
pub async fn http_generate_challenges(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ChallengesRequest>,
) -> Result<Json<ChallengesOut>, ApiError> {
    let challenges = state.gateway.generate_challenges(&body).await?;
    info!(target: "challenge", node_id = ?body.node_id, count = challenges.len(), "HTTP challenges generated");
    Ok(Json(ChallengesOut { challenges }))
}

#[instrument(level = "info", skip(state, body), fields(battle = ?body.battle_name, count = ?body.count))]
pub async fn http_generate_questions(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<QuestionsRequest>,
) -> Result<Json<QuestionsOut>, ApiError> {
    let questions = state.gateway.generate_questions(&body).await?;
    Ok(Json(QuestionsOut { questions }))
}

#[instrument(level = "info", skip(state, body), fields(node_id = ?body.node_id, code_len = body.code.as_deref().map_or(0, str::len)))]
pub async fn http_verify_code(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<VerifyRequest>,
) -> Result<Json<VerificationReport>, ApiError> {
    let report = state.gateway.verify_code(&body).await?;
    info!(target: "challenge", all_passed = report.all_passed, "HTTP code verified");
    Ok(Json(report))
}

/// Chat never hard-fails once the message is present: model trouble yields a canned reply.
#[instrument(level = "info", skip(state, body), fields(history = body.conversation_history.len()))]
pub async fn http_chat(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ChatRequest>,
) -> Result<Json<ChatOut>, ApiError> {
    let response_text = match state.gateway.chat(&body).await {
        Ok(text) => text,
        Err(e @ GatewayError::MissingParameter(_)) => return Err(e.into()),
        Err(e) => {
            warn!(target: "codequest_backend", error = %e, "Chat failed; sending fallback reply");
            CHAT_FALLBACK_REPLY.to_string()
        }
    };
    Ok(Json(ChatOut { response_text }))
}

#[instrument(level = "info", skip(state, body), fields(node_id = ?body.node_id, question_id = ?body.question_id, code_len = body.code.len()))]
pub async fn http_validate(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ValidateIn>,
) -> Result<Json<ValidateOut>, ApiError> {
    let node_id = non_blank(body.node_id.as_deref());
    // Only bank test cases can complete a node; inline ones are graded and nothing else.
    let (test_cases, from_bank) = match (&body.test_cases, node_id, non_blank(body.question_id.as_deref())) {
        (Some(cases), _, _) => (cases.as_slice(), false),
        (None, Some(node_id), Some(question_id)) => match state.bank.find(node_id, question_id) {
            Some(q) => (q.test_cases.as_slice(), true),
            None => return Err(ApiError::NotFound(format!("challenge {question_id} in node {node_id}"))),
        },
        _ => return Err(ApiError::BadRequest("provide `testCases`, or `nodeId` and `questionId`".into())),
    };

    let grade = validator::grade(&body.code, test_cases);

    let mut progress = None;
    if grade.all_passed && from_bank {
        if let (Some(user_id), Some(skill), Some(node_id)) =
            (non_blank(body.user_id.as_deref()), non_blank(body.skill.as_deref()), node_id)
        {
            let completion = state.progress.mark_node_complete(user_id, skill, node_id, body.xp).await;
            if !completion.first_time {
                info!(target: "progress", %user_id, %skill, %node_id, "Node already completed; no XP credited");
            }
            progress = Some(completion.progress);
        }
    }
    info!(target: "challenge", all_passed = grade.all_passed, from_bank, recorded = progress.is_some(), "HTTP submission graded");

    Ok(Json(ValidateOut { grade, progress }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_node_challenges(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
) -> Result<Json<NodeChallengesOut>, ApiError> {
    let challenges = state.bank.for_node(&node_id).to_vec();
    if challenges.is_empty() {
        return Err(ApiError::NotFound(format!("no challenges for node {node_id}")));
    }
    Ok(Json(NodeChallengesOut { node_id, challenges }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_progress(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<UserProgress> {
    Json(state.progress.get(&user_id).await)
}

#[instrument(level = "info", skip(state, body), fields(skill = ?body.skill, node_id = ?body.node_id, xp = body.xp))]
pub async fn http_complete_node(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiJson(body): ApiJson<CompleteNodeIn>,
) -> Result<Json<UserProgress>, ApiError> {
    let skill = non_blank(body.skill.as_deref()).ok_or(GatewayError::MissingParameter("skill"))?;
    let node_id = non_blank(body.node_id.as_deref()).ok_or(GatewayError::MissingParameter("nodeId"))?;
    Ok(Json(state.progress.mark_node_complete(&user_id, skill, node_id, body.xp).await.progress))
}

#[instrument(level = "info", skip(state))]
pub async fn http_award_badge(
    State(state): State<AppState>,
    Path((user_id, badge)): Path<(String, String)>,
) -> Json<UserProgress> {
    Json(state.progress.award_badge(&user_id, &badge).await)
}

pub async fn http_not_found(uri: Uri) -> (axum::http::StatusCode, Json<ErrorBody>) {
    (
        axum::http::StatusCode::NOT_FOUND,
        Json(ErrorBody { error: "Not found".into(), details: uri.path().to_string() }),
    )
}

//! Route handlers.
//!
//! Each analysis request is dispatched through the task manager under the
//! caller's session id, so an in-flight analysis can be hard-cancelled by
//! `/cancel_session` (or superseded by the session's next request). The
//! handler waits on the task with a bounded poll rather than joining the
//! worker directly.

use std::time::Duration;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use super::error::GatewayError;
use super::payload::{
    CancelSessionRequest, DetectTextInitialRequest, DetectTextRequest, FeedbackRequest,
    SessionTasksQuery,
};
use super::state::HandlerState;
use crate::constants::COMMUNITY_FLAG_PERCENT;
use crate::hashing::anon_user_id;

const MIN_TEXT_LEN: usize = 5;
const RESULT_POLL: Duration = Duration::from_millis(100);
const RESULT_DEADLINE: Duration = Duration::from_secs(180);

/// Session id from body, headers, or a fresh uuid.
fn resolve_session(body_session: Option<&str>, headers: &HeaderMap) -> String {
    body_session
        .map(str::to_string)
        .or_else(|| header_string(headers, "x-session-id"))
        .or_else(|| header_string(headers, "user-fingerprint"))
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// `POST /detect_text`: full cached analysis, cancellable per session.
pub async fn detect_text(
    State(state): State<HandlerState>,
    headers: HeaderMap,
    Json(request): Json<DetectTextRequest>,
) -> Result<Json<Value>, GatewayError> {
    let session_id = resolve_session(request.session_id.as_deref(), &headers);
    let text = request.text.trim().to_string();
    if text.len() < MIN_TEXT_LEN {
        return Err(GatewayError::bad_request("Text too short"));
    }

    info!(session_id, text_len = text.len(), "analysis requested");

    let engine = state.engine.clone();
    let url = request.url.clone();
    let task_id = state.tasks.start(&session_id, async move {
        let response = engine.analyze(&url, &text).await;
        serde_json::to_value(&response).unwrap_or_else(|_| json!({"error": "serialization"}))
    });

    let mut result = state
        .tasks
        .wait_for_result(task_id, RESULT_POLL, RESULT_DEADLINE)
        .await
        .ok_or(GatewayError::AnalysisTimeout)?;

    if let Some(map) = result.as_object_mut() {
        map.insert("session_id".to_string(), json!(session_id));
        map.insert("task_id".to_string(), json!(task_id));
    }

    Ok(Json(result))
}

/// `POST /detect_text_initial`: quick reasoning-only first impression.
pub async fn detect_text_initial(
    State(state): State<HandlerState>,
    Json(request): Json<DetectTextInitialRequest>,
) -> Result<Json<Value>, GatewayError> {
    let text = request.text.trim();
    if text.len() < MIN_TEXT_LEN {
        return Err(GatewayError::bad_request("Text too short or missing"));
    }

    Ok(Json(state.engine.quick_assessment(text).await))
}

/// `POST /submit_feedback`: view/report counters plus the legacy
/// fake-report vector store.
pub async fn submit_feedback(
    State(state): State<HandlerState>,
    headers: HeaderMap,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<Value>, GatewayError> {
    let label = if request.response.eq_ignore_ascii_case("yes") {
        "FAKE"
    } else {
        "REAL"
    };
    let fingerprint =
        header_string(&headers, "user-fingerprint").unwrap_or_else(|| "default".to_string());

    if request.article_id.is_empty() && request.text.trim().is_empty() {
        return Err(GatewayError::bad_request("Missing article_id/text"));
    }

    let cache = state.engine.cache();

    if !request.article_id.is_empty() {
        let report_increment = if label == "FAKE" { 1 } else { 0 };

        if let Some(article) = cache.get_article(&request.article_id).await {
            let total_views = article.total_views + 1;
            let total_reports = article.total_reports + report_increment;
            let percentage = (total_reports as f64 / total_views as f64) * 100.0;

            let mut fields = json!({
                "total_views": total_views,
                "total_reports": total_reports,
            });
            if percentage > COMMUNITY_FLAG_PERCENT {
                fields["community_flagged"] = json!(true);
            }
            if let Err(err) = cache.update_article(&request.article_id, fields).await {
                tracing::warn!(%err, "feedback counter update failed");
            }

            return Ok(Json(json!({
                "status": "feedback_recorded",
                "percentage_reported": format!("{percentage:.0}%"),
            })));
        }
    }

    if label != "FAKE" {
        return Ok(Json(json!({
            "status": "ignored",
            "message": "Only FAKE labels are stored in legacy mode",
        })));
    }

    if request.explanation.is_empty() {
        return Err(GatewayError::bad_request("Missing text or explanation"));
    }

    let article_id = cache
        .store_feedback(
            request.text.trim(),
            &request.explanation,
            request.sources,
            &anon_user_id(&fingerprint),
            0.5,
            "Fake",
            true,
        )
        .await
        .map_err(|e| GatewayError::bad_request(e.to_string()))?;

    Ok(Json(json!({ "status": "stored", "article_id": article_id })))
}

/// `POST /cancel_session`: hard-cancels everything the session owns.
pub async fn cancel_session(
    State(state): State<HandlerState>,
    headers: HeaderMap,
    body: Option<Json<CancelSessionRequest>>,
) -> Result<Json<Value>, GatewayError> {
    let body_session = body.as_ref().and_then(|b| b.session_id.clone());
    let session_id = body_session
        .or_else(|| header_string(&headers, "x-session-id"))
        .or_else(|| header_string(&headers, "user-fingerprint"))
        .ok_or_else(|| GatewayError::bad_request("No session identifier provided"))?;

    info!(session_id, "cancelling session tasks");
    let outcome = state.tasks.cancel_all(&session_id);

    Ok(Json(json!({
        "status": "success",
        "session_id": session_id,
        "cancelled": outcome.cancelled,
        "task_ids": outcome.task_ids,
    })))
}

/// `GET /session_tasks`: the session's running analyses.
pub async fn session_tasks(
    State(state): State<HandlerState>,
    headers: HeaderMap,
    Query(query): Query<SessionTasksQuery>,
) -> Result<Json<Value>, GatewayError> {
    let session_id = query
        .session_id
        .or_else(|| header_string(&headers, "x-session-id"))
        .or_else(|| header_string(&headers, "user-fingerprint"))
        .ok_or_else(|| GatewayError::bad_request("No session identifier"))?;

    let active = state.tasks.list_active(&session_id);

    Ok(Json(json!({
        "session_id": session_id,
        "active_tasks": active,
        "count": active.len(),
    })))
}

/// `POST /cleanup_expired`: sweeps expired vector-index entries.
pub async fn cleanup_expired(State(state): State<HandlerState>) -> Json<Value> {
    let deleted = state.engine.cache().cleanup_expired().await;
    Json(json!({ "status": "success", "deleted": deleted }))
}

/// `GET /health`.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

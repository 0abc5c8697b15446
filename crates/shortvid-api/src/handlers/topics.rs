//! Topic suggestion, style catalog and script preview handlers.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use shortvid_gen::TopicSuggestion;
use shortvid_models::VideoStyle;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Deserialize)]
pub struct TopicSuggestionRequest {
    pub theme: String,
}

#[derive(Serialize)]
pub struct TopicSuggestionResponse {
    pub theme: String,
    pub suggestions: Vec<TopicSuggestion>,
}

#[derive(Serialize)]
pub struct StylesResponse {
    pub styles: Vec<StyleEntry>,
}

#[derive(Serialize)]
pub struct StyleEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub consistency_keywords: Vec<&'static str>,
}

#[derive(Deserialize)]
pub struct ScriptPreviewRequest {
    pub topic: String,
    pub style: String,
}

/// Script preview. The internal visual concepts are deliberately withheld.
#[derive(Serialize)]
pub struct ScriptPreviewResponse {
    pub title: String,
    pub style: &'static str,
    pub scenes: Vec<PreviewScene>,
}

#[derive(Serialize)]
pub struct PreviewScene {
    pub text: String,
    pub duration: u32,
}

// ============================================================================
// Handlers
// ============================================================================

/// Suggest ranking-style topics for a theme.
pub async fn suggest_topics(
    State(state): State<AppState>,
    Json(request): Json<TopicSuggestionRequest>,
) -> ApiResult<Json<TopicSuggestionResponse>> {
    let theme = request.theme.trim();
    if theme.is_empty() {
        return Err(ApiError::bad_request("theme must not be empty"));
    }

    let suggestions = state.chat.suggest_topics(theme).await?;

    Ok(Json(TopicSuggestionResponse {
        theme: theme.to_string(),
        suggestions,
    }))
}

/// List the style catalog.
pub async fn list_styles() -> Json<StylesResponse> {
    let styles = VideoStyle::ALL
        .iter()
        .map(|style| StyleEntry {
            id: style.as_filename_part(),
            name: style.display_name(),
            description: style.description(),
            consistency_keywords: style.consistency_keywords().to_vec(),
        })
        .collect();

    Json(StylesResponse { styles })
}

/// Generate a script synchronously for preview, without starting a job.
pub async fn preview_script(
    State(state): State<AppState>,
    Json(request): Json<ScriptPreviewRequest>,
) -> ApiResult<Json<ScriptPreviewResponse>> {
    let topic = request.topic.trim();
    if topic.is_empty() {
        return Err(ApiError::bad_request("topic must not be empty"));
    }
    let style: VideoStyle = request
        .style
        .parse()
        .map_err(|e: shortvid_models::StyleParseError| ApiError::bad_request(e.to_string()))?;

    let script = state.chat.generate_script(topic, style).await?;

    let scenes = script
        .scenes
        .into_iter()
        .map(|scene| PreviewScene {
            text: scene.text,
            duration: scene.duration_hint,
        })
        .collect();

    Ok(Json(ScriptPreviewResponse {
        title: script.title,
        style: style.as_filename_part(),
        scenes,
    }))
}

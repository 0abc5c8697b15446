//! Language model client for topic suggestions and script generation.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use shortvid_models::{Scene, Script, VideoStyle};

use crate::error::{GenError, GenResult};
use crate::extract::parse_embedded;

/// Explicit timeout for every completion call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";

/// Script generation favors consistency; topic brainstorming favors variety.
const SCRIPT_TEMPERATURE: f32 = 0.5;
const TOPIC_TEMPERATURE: f32 = 0.8;

/// Chat-completions client.
pub struct ChatClient {
    api_key: String,
    base_url: String,
    model: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// One suggested topic for a theme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicSuggestion {
    pub title: String,
    pub description: String,
    pub estimated_views: String,
}

#[derive(Debug, Deserialize)]
struct TopicSuggestions {
    suggestions: Vec<TopicSuggestion>,
}

/// The model's script payload; the style is taken from the request, not
/// trusted from the output.
#[derive(Debug, Deserialize)]
struct ScriptPayload {
    title: String,
    scenes: Vec<Scene>,
}

impl ChatClient {
    /// Create a new client.
    pub fn new(api_key: impl Into<String>) -> GenResult<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            client,
        })
    }

    /// Create from `OPENAI_API_KEY` / `OPENAI_BASE_URL` environment variables.
    pub fn from_env() -> GenResult<Self> {
        let mut client = Self::new(std::env::var("OPENAI_API_KEY").unwrap_or_default())?;
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            client.base_url = base_url;
        }
        Ok(client)
    }

    /// Override the base URL (tests point this at a mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// One-shot completion returning the raw message text.
    async fn complete(&self, prompt: &str, temperature: f32) -> GenResult<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let detail = response.text().await.unwrap_or_default();
            return Err(GenError::upstream(status, detail));
        }

        let chat: ChatResponse = response.json().await?;
        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GenError::malformed("completion had no choices"))
    }

    /// Generate a validated script for a topic in the given style.
    ///
    /// Fails when the upstream call errors, when no JSON object can be
    /// extracted, or when the script breaks the no-visual-description rule.
    pub async fn generate_script(&self, topic: &str, style: VideoStyle) -> GenResult<Script> {
        let prompt = build_script_prompt(topic, style);
        let text = self.complete(&prompt, SCRIPT_TEMPERATURE).await?;

        let payload: ScriptPayload = parse_embedded(&text).inspect_err(|e| {
            warn!("Script extraction failed: {e}");
        })?;

        let script = Script {
            title: payload.title,
            style,
            scenes: payload.scenes,
        };
        script.validate()?;
        Ok(script)
    }

    /// Suggest ranking-style topics for a broad theme.
    pub async fn suggest_topics(&self, theme: &str) -> GenResult<Vec<TopicSuggestion>> {
        let prompt = build_topic_prompt(theme);
        let text = self.complete(&prompt, TOPIC_TEMPERATURE).await?;

        let parsed: TopicSuggestions = parse_embedded(&text)?;
        Ok(parsed.suggestions)
    }
}

/// Build the script generation prompt.
///
/// The ranked-list format and the explicit ban on describing the picture are
/// both load-bearing: spoken text that narrates the image reads terribly
/// over the finished video.
pub fn build_script_prompt(topic: &str, style: VideoStyle) -> String {
    format!(
        r#"Write the script for a 15-30 second short vertical video in the {style_name} style.
Topic: {topic}

Rules:
1. After announcing each ranked item, never describe the picture or the artwork.
2. Explain only the content of each ranked item, briefly.
3. Phrases like "this image shows" or "in the picture" are forbidden.
4. Speak only content a listener can follow without seeing the screen.

Return ONLY a single JSON object with this schema:
{{
    "title": "video title",
    "scenes": [
        {{
            "text": "Number 3 is ... because ...",
            "visual_concept": "visual concept expressing item 3 (internal use only)",
            "duration": 5
        }},
        {{
            "text": "Number 2 is ... because ...",
            "visual_concept": "visual concept expressing item 2 (internal use only)",
            "duration": 5
        }},
        {{
            "text": "Number 1 is ... because ...",
            "visual_concept": "visual concept expressing item 1 (internal use only)",
            "duration": 5
        }}
    ]
}}

Example:
- Good: "Number 3 is eating late at night. Your metabolism slows down after dark, so late meals are stored as fat."
- Bad: "Number 3 is eating late at night. This image shows a clock pointing at midnight."#,
        style_name = style.display_name(),
        topic = topic,
    )
}

/// Build the topic suggestion prompt.
pub fn build_topic_prompt(theme: &str) -> String {
    format!(
        r#"Suggest 5 compelling short-video topics for the following theme.
Theme: {theme}

Requirements:
1. Use a ranking format such as "top 3 ...", "5 ... mistakes" or "... everyone gets wrong".
2. Pick angles viewers will actually care about.
3. Each topic must be explainable in 15-30 seconds.
4. Titles should be catchy enough to stop a scrolling thumb.
5. Include practical, useful information.

Return ONLY a single JSON object with this schema:
{{
    "theme": "{theme}",
    "suggestions": [
        {{
            "title": "concrete topic title",
            "description": "why this topic is interesting or useful",
            "estimated_views": "rough view-count estimate"
        }}
    ]
}}"#,
        theme = theme,
    )
}

//! Image generation client.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use shortvid_models::VideoStyle;

use crate::error::{GenError, GenResult};

/// Explicit timeout covering both the generation call and the download.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const IMAGE_MODEL: &str = "dall-e-3";
const IMAGE_SIZE: &str = "1024x1024";

/// Prompt length the image API tolerates well; longer prompts are rebuilt
/// from truncated pieces.
const MAX_PROMPT_LEN: usize = 1000;

/// Image generation client.
pub struct ImageClient {
    api_key: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ImageRequest {
    model: String,
    prompt: String,
    size: String,
    quality: String,
    style: String,
    n: u8,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    url: String,
}

impl ImageClient {
    /// Create a new client.
    pub fn new(api_key: impl Into<String>) -> GenResult<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
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

    /// Generate one image and return its bytes.
    pub async fn generate(&self, prompt: &str, style: VideoStyle) -> GenResult<Vec<u8>> {
        let request = ImageRequest {
            model: IMAGE_MODEL.to_string(),
            prompt: prompt.to_string(),
            size: IMAGE_SIZE.to_string(),
            quality: style.image_quality().to_string(),
            style: style.image_style().to_string(),
            n: 1,
        };

        let response = self
            .client
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let detail = response.text().await.unwrap_or_default();
            return Err(GenError::upstream(status, detail));
        }

        let image_response: ImageResponse = response.json().await?;
        let url = image_response
            .data
            .into_iter()
            .next()
            .map(|d| d.url)
            .ok_or_else(|| GenError::malformed("image response had no data"))?;

        let image = self.client.get(&url).send().await?;
        if !image.status().is_success() {
            return Err(GenError::upstream(
                image.status().as_u16(),
                "image download failed",
            ));
        }

        Ok(image.bytes().await?.to_vec())
    }
}

/// Build the full image prompt for one scene.
///
/// The consistency keywords keep all images of a video in the same visual
/// register; `character_hint` pins a recurring character when the topic has
/// one.
pub fn build_image_prompt(
    concept: &str,
    style: VideoStyle,
    character_hint: Option<&str>,
) -> String {
    let consistency = format!(
        "Consistent {}, maintaining identical art style throughout, same artistic \
         technique, uniform color palette",
        style.consistency_keywords().join(" ")
    );

    let character = character_hint
        .map(|hint| format!(", {hint}"))
        .unwrap_or_default();

    let full = format!("{concept}, {consistency}{character}, {}", style.style_prompt());

    if full.len() <= MAX_PROMPT_LEN {
        return full;
    }

    // Too long: rebuild from truncated pieces
    format!(
        "{}, {consistency}, {}",
        truncate_chars(concept, 300),
        truncate_chars(style.style_prompt(), 400)
    )
}

/// Truncate on a character boundary.
fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_generate_downloads_image_bytes() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"url": format!("{}/img/scene.png", server.uri())}]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/img/scene.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PNGDATA".to_vec()))
            .mount(&server)
            .await;

        let client = ImageClient::new("k").unwrap().with_base_url(server.uri());
        let bytes = client
            .generate("a clock at midnight", VideoStyle::Ghibli)
            .await
            .unwrap();

        assert_eq!(bytes, b"PNGDATA");
    }

    #[tokio::test]
    async fn test_generate_upstream_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(ResponseTemplate::new(400).set_body_string("content policy"))
            .mount(&server)
            .await;

        let client = ImageClient::new("k").unwrap().with_base_url(server.uri());
        let err = client
            .generate("a clock", VideoStyle::Ghibli)
            .await
            .unwrap_err();

        assert!(matches!(err, GenError::Upstream { status: 400, .. }));
    }

    #[test]
    fn test_prompt_contains_consistency_keywords() {
        let prompt = build_image_prompt("a broken scale", VideoStyle::Anime, None);
        assert!(prompt.contains("a broken scale"));
        assert!(prompt.contains("anime art style"));
        assert!(prompt.contains("uniform color palette"));
    }

    #[test]
    fn test_prompt_includes_character_hint() {
        let prompt = build_image_prompt(
            "a chef tasting soup",
            VideoStyle::Ghibli,
            Some("same consistent character design throughout all scenes"),
        );
        assert!(prompt.contains("same consistent character design"));
    }

    #[test]
    fn test_oversized_prompt_is_capped() {
        let concept = "cherry blossoms ".repeat(100);
        let prompt = build_image_prompt(&concept, VideoStyle::Watercolor, None);
        assert!(prompt.len() <= MAX_PROMPT_LEN);
        assert!(prompt.starts_with("cherry blossoms"));
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
        assert_eq!(truncate_chars("short", 100), "short");
    }
}

//! Speech synthesis client (VOICEVOX-style two-step flow).

use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::error::{GenError, GenResult};

/// Explicit timeout per synthesis call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const DEFAULT_BASE_URL: &str = "http://localhost:50021";

/// Title readouts are spoken slightly slower than scene lines.
const TITLE_SPEED_SCALE: f64 = 0.9;

/// Speech synthesis client.
///
/// Synthesis is a two-step protocol: first query the synthesis parameters
/// for a given text and speaker, then synthesize audio from (possibly
/// adjusted) parameters.
pub struct SpeechClient {
    base_url: String,
    client: Client,
}

impl SpeechClient {
    /// Create a new client.
    pub fn new(base_url: impl Into<String>) -> GenResult<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    /// Create from the `VOICEVOX_URL` environment variable.
    pub fn from_env() -> GenResult<Self> {
        let base_url =
            std::env::var("VOICEVOX_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    /// Synthesize one scene line. Returns WAV bytes.
    pub async fn synthesize(&self, text: &str, speaker: u32) -> GenResult<Vec<u8>> {
        let query = self.audio_query(text, speaker).await?;
        self.synthesis(query, speaker).await
    }

    /// Synthesize a title readout at the slower title speed.
    pub async fn synthesize_title(&self, title: &str, speaker: u32) -> GenResult<Vec<u8>> {
        let mut query = self.audio_query(title, speaker).await?;

        if let Some(obj) = query.as_object_mut() {
            obj.insert("speedScale".to_string(), TITLE_SPEED_SCALE.into());
        }

        self.synthesis(query, speaker).await
    }

    /// Step one: fetch synthesis parameters for text + speaker.
    async fn audio_query(&self, text: &str, speaker: u32) -> GenResult<serde_json::Value> {
        let speaker_param = speaker.to_string();
        let response = self
            .client
            .post(format!("{}/audio_query", self.base_url))
            .query(&[("text", text), ("speaker", speaker_param.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenError::upstream(
                response.status().as_u16(),
                "audio query failed",
            ));
        }

        Ok(response.json().await?)
    }

    /// Step two: synthesize audio bytes from the parameters.
    async fn synthesis(&self, query: serde_json::Value, speaker: u32) -> GenResult<Vec<u8>> {
        let response = self
            .client
            .post(format!("{}/synthesis", self.base_url))
            .query(&[("speaker", speaker)])
            .json(&query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenError::upstream(
                response.status().as_u16(),
                "synthesis failed",
            ));
        }

        let bytes = response.bytes().await?.to_vec();
        debug!("Synthesized {} bytes of audio", bytes.len());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn query_body() -> serde_json::Value {
        serde_json::json!({"speedScale": 1.0, "pitchScale": 0.0, "accent_phrases": []})
    }

    #[tokio::test]
    async fn test_two_step_synthesis() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/audio_query"))
            .and(query_param("text", "hello"))
            .and(query_param("speaker", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(query_body()))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/synthesis"))
            .and(query_param("speaker", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFFWAV".to_vec()))
            .mount(&server)
            .await;

        let client = SpeechClient::new(server.uri()).unwrap();
        let bytes = client.synthesize("hello", 1).await.unwrap();
        assert_eq!(bytes, b"RIFFWAV");
    }

    #[tokio::test]
    async fn test_title_synthesis_slows_down() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/audio_query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(query_body()))
            .mount(&server)
            .await;

        // Only matches when the synthesis body carries the slowed speedScale
        Mock::given(method("POST"))
            .and(path("/synthesis"))
            .and(body_partial_json(serde_json::json!({"speedScale": 0.9})))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"SLOWWAV".to_vec()))
            .mount(&server)
            .await;

        let client = SpeechClient::new(server.uri()).unwrap();
        let bytes = client.synthesize_title("Top 3 diet mistakes", 1).await.unwrap();
        assert_eq!(bytes, b"SLOWWAV");
    }

    #[tokio::test]
    async fn test_audio_query_failure_propagates() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/audio_query"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = SpeechClient::new(server.uri()).unwrap();
        let err = client.synthesize("hello", 1).await.unwrap_err();
        assert!(matches!(err, GenError::Upstream { status: 503, .. }));
    }
}

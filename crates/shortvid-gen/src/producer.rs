//! Asset producer: one call each for script, scene image, scene audio and
//! title assets, with the degrade policy applied.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::RgbImage;
use tracing::warn;

use shortvid_models::{Script, VideoStyle};

use crate::error::GenResult;
use crate::image_client::{build_image_prompt, ImageClient};
use crate::llm::ChatClient;
use crate::placeholder::{render_placeholder, render_title_card};
use crate::speech::SpeechClient;

/// Produces the assets for one job.
///
/// Script failure propagates; image and audio failures degrade. All files
/// are written under the caller's per-job work directory with names
/// deterministic in (style, scene index), so re-runs overwrite rather than
/// accumulate and concurrent jobs cannot collide.
#[async_trait]
pub trait AssetProducer: Send + Sync {
    /// Generate the script. Fatal on upstream or parse failure.
    async fn produce_script(&self, topic: &str, style: VideoStyle) -> GenResult<Script>;

    /// Generate one scene image. Substitutes a placeholder on upstream
    /// failure; `None` only when even the placeholder could not be written.
    async fn produce_scene_image(
        &self,
        work_dir: &Path,
        concept: &str,
        style: VideoStyle,
        scene_index: usize,
        character_hint: Option<&str>,
    ) -> Option<PathBuf>;

    /// Synthesize one scene line. `None` on upstream failure.
    async fn produce_scene_audio(
        &self,
        work_dir: &Path,
        text: &str,
        scene_index: usize,
        speaker: u32,
    ) -> Option<PathBuf>;

    /// Produce the title card and title readout. Same degrade policy.
    async fn produce_title_assets(
        &self,
        work_dir: &Path,
        title: &str,
        style: VideoStyle,
        speaker: u32,
    ) -> (Option<PathBuf>, Option<PathBuf>);
}

/// Asset producer backed by the real collaborator clients.
pub struct GenAssetProducer {
    chat: ChatClient,
    images: ImageClient,
    speech: SpeechClient,
}

impl GenAssetProducer {
    pub fn new(chat: ChatClient, images: ImageClient, speech: SpeechClient) -> Self {
        Self {
            chat,
            images,
            speech,
        }
    }

    /// Create all clients from environment variables.
    pub fn from_env() -> GenResult<Self> {
        Ok(Self {
            chat: ChatClient::from_env()?,
            images: ImageClient::from_env()?,
            speech: SpeechClient::from_env()?,
        })
    }

    fn scene_image_path(work_dir: &Path, style: VideoStyle, scene_index: usize) -> PathBuf {
        work_dir.join(format!(
            "{}_scene_{}.png",
            style.as_filename_part(),
            scene_index
        ))
    }

    fn scene_audio_path(work_dir: &Path, scene_index: usize) -> PathBuf {
        work_dir.join(format!("scene_{scene_index}.wav"))
    }

    fn title_image_path(work_dir: &Path, style: VideoStyle) -> PathBuf {
        work_dir.join(format!("title_{}.png", style.as_filename_part()))
    }

    fn title_audio_path(work_dir: &Path) -> PathBuf {
        work_dir.join("title_audio.wav")
    }

    /// Write a rendered frame as PNG, returning the path on success.
    async fn write_frame(frame: RgbImage, path: PathBuf) -> Option<PathBuf> {
        let mut buf = Vec::new();
        if let Err(e) = frame.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png) {
            warn!("Frame encode failed: {e}");
            return None;
        }
        match tokio::fs::write(&path, buf).await {
            Ok(()) => Some(path),
            Err(e) => {
                warn!("Frame write failed for {}: {e}", path.display());
                None
            }
        }
    }
}

#[async_trait]
impl AssetProducer for GenAssetProducer {
    async fn produce_script(&self, topic: &str, style: VideoStyle) -> GenResult<Script> {
        self.chat.generate_script(topic, style).await
    }

    async fn produce_scene_image(
        &self,
        work_dir: &Path,
        concept: &str,
        style: VideoStyle,
        scene_index: usize,
        character_hint: Option<&str>,
    ) -> Option<PathBuf> {
        let path = Self::scene_image_path(work_dir, style, scene_index);
        let prompt = build_image_prompt(concept, style, character_hint);

        match self.images.generate(&prompt, style).await {
            Ok(bytes) => match tokio::fs::write(&path, bytes).await {
                Ok(()) => Some(path),
                Err(e) => {
                    warn!("Image write failed for scene {scene_index}: {e}");
                    None
                }
            },
            Err(e) => {
                // Degrade: a styled placeholder keeps the pipeline moving
                warn!("Image generation degraded for scene {scene_index}: {e}");
                let frame = render_placeholder(style, scene_index, concept);
                Self::write_frame(frame, path).await
            }
        }
    }

    async fn produce_scene_audio(
        &self,
        work_dir: &Path,
        text: &str,
        scene_index: usize,
        speaker: u32,
    ) -> Option<PathBuf> {
        let path = Self::scene_audio_path(work_dir, scene_index);

        match self.speech.synthesize(text, speaker).await {
            Ok(bytes) => match tokio::fs::write(&path, bytes).await {
                Ok(()) => Some(path),
                Err(e) => {
                    warn!("Audio write failed for scene {scene_index}: {e}");
                    None
                }
            },
            Err(e) => {
                warn!("Speech synthesis degraded for scene {scene_index}: {e}");
                None
            }
        }
    }

    async fn produce_title_assets(
        &self,
        work_dir: &Path,
        title: &str,
        style: VideoStyle,
        speaker: u32,
    ) -> (Option<PathBuf>, Option<PathBuf>) {
        let image = Self::write_frame(
            render_title_card(title, style),
            Self::title_image_path(work_dir, style),
        )
        .await;

        let audio = match self.speech.synthesize_title(title, speaker).await {
            Ok(bytes) => {
                let path = Self::title_audio_path(work_dir);
                match tokio::fs::write(&path, bytes).await {
                    Ok(()) => Some(path),
                    Err(e) => {
                        warn!("Title audio write failed: {e}");
                        None
                    }
                }
            }
            Err(e) => {
                warn!("Title speech synthesis degraded: {e}");
                None
            }
        };

        (image, audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn producer_against(server: &MockServer) -> GenAssetProducer {
        GenAssetProducer::new(
            ChatClient::new("k").unwrap().with_base_url(server.uri()),
            ImageClient::new("k").unwrap().with_base_url(server.uri()),
            SpeechClient::new(server.uri()).unwrap(),
        )
    }

    #[test]
    fn test_deterministic_paths() {
        let dir = Path::new("/work/job-1");
        assert_eq!(
            GenAssetProducer::scene_image_path(dir, VideoStyle::Ghibli, 2),
            Path::new("/work/job-1/ghibli_scene_2.png")
        );
        assert_eq!(
            GenAssetProducer::scene_audio_path(dir, 2),
            Path::new("/work/job-1/scene_2.wav")
        );
        assert_eq!(
            GenAssetProducer::title_image_path(dir, VideoStyle::Ghibli),
            Path::new("/work/job-1/title_ghibli.png")
        );
    }

    #[tokio::test]
    async fn test_scene_image_degrades_to_placeholder() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let producer = producer_against(&server).await;
        let work_dir = tempfile::tempdir().unwrap();

        let result = producer
            .produce_scene_image(work_dir.path(), "a clock", VideoStyle::Ghibli, 0, None)
            .await;

        let image_path = result.expect("placeholder should be written");
        let meta = std::fs::metadata(&image_path).unwrap();
        assert!(meta.len() > 0);
        assert!(image_path.ends_with("ghibli_scene_0.png"));
    }

    #[tokio::test]
    async fn test_scene_audio_degrades_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio_query"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let producer = producer_against(&server).await;
        let work_dir = tempfile::tempdir().unwrap();

        let result = producer
            .produce_scene_audio(work_dir.path(), "hello", 0, 1)
            .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_title_assets_partial_degrade() {
        let server = MockServer::start().await;
        // Speech down, title card still renders locally
        Mock::given(method("POST"))
            .and(path("/audio_query"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let producer = producer_against(&server).await;
        let work_dir = tempfile::tempdir().unwrap();

        let (image, audio) = producer
            .produce_title_assets(work_dir.path(), "Top 3", VideoStyle::Anime, 1)
            .await;

        assert!(image.is_some());
        assert!(audio.is_none());
    }
}

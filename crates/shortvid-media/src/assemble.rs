//! Segment assembly: (image, audio) pairs into one vertical video.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_duration;

/// Vertical 1080x1920 canvas: scale down preserving aspect, then pad.
const VERTICAL_FILTER: &str =
    "scale=1080:1920:force_original_aspect_ratio=decrease,pad=1080:1920:(ow-iw)/2:(oh-ih)/2";

/// Fallback duration when the audio clip cannot be probed.
const FALLBACK_SEGMENT_SECS: f64 = 5.0;

/// The title card stays up slightly longer than its readout.
const TITLE_PAD_SECS: f64 = 0.5;
const FALLBACK_TITLE_SECS: f64 = 3.0;

/// One renderable segment: a still image shown for the length of its audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub image: PathBuf,
    pub audio: PathBuf,
}

impl Segment {
    pub fn new(image: impl Into<PathBuf>, audio: impl Into<PathBuf>) -> Self {
        Self {
            image: image.into(),
            audio: audio.into(),
        }
    }
}

/// Ordered encode plan: optional title segment followed by scene segments
/// in playback order.
#[derive(Debug, Clone, Default)]
pub struct AssemblyPlan {
    pub title: Option<Segment>,
    pub scenes: Vec<Segment>,
}

impl AssemblyPlan {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.scenes.is_empty()
    }

    pub fn segment_count(&self) -> usize {
        self.scenes.len() + usize::from(self.title.is_some())
    }
}

/// Encodes an assembly plan into one output file.
#[async_trait]
pub trait SegmentEncoder: Send + Sync {
    async fn assemble(&self, plan: &AssemblyPlan, output: &Path) -> MediaResult<()>;
}

/// FFmpeg-backed encoder.
pub struct FfmpegEncoder {
    runner: FfmpegRunner,
}

impl FfmpegEncoder {
    /// Create an encoder with the given per-invocation timeout.
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            runner: FfmpegRunner::new(timeout_secs),
        }
    }

    async fn assemble_inner(
        &self,
        plan: &AssemblyPlan,
        output: &Path,
        seg_dir: &Path,
    ) -> MediaResult<()> {
        let mut encoded: Vec<PathBuf> = Vec::new();

        if let Some(title) = &plan.title {
            let duration = match probe_duration(&title.audio).await {
                Ok(d) => d + TITLE_PAD_SECS,
                Err(e) => {
                    warn!("Title audio probe failed, using fallback duration: {e}");
                    FALLBACK_TITLE_SECS
                }
            };
            let path = seg_dir.join("segment_title.mp4");
            match self.encode_segment(title, duration, &path).await {
                Ok(()) => encoded.push(path),
                Err(e) => warn!("Title segment encode failed, skipping: {e}"),
            }
        }

        for (i, segment) in plan.scenes.iter().enumerate() {
            let duration = match probe_duration(&segment.audio).await {
                Ok(d) => d,
                Err(e) => {
                    warn!("Scene {i} audio probe failed, using fallback duration: {e}");
                    FALLBACK_SEGMENT_SECS
                }
            };
            let path = seg_dir.join(format!("segment_{i}.mp4"));
            match self.encode_segment(segment, duration, &path).await {
                Ok(()) => encoded.push(path),
                Err(e) => warn!("Scene {i} segment encode failed, skipping: {e}"),
            }
        }

        if encoded.is_empty() {
            return Err(MediaError::NoSegments);
        }

        if encoded.len() == 1 {
            tokio::fs::rename(&encoded[0], output).await?;
        } else {
            self.concat(&encoded, seg_dir, output).await?;
        }

        let size = tokio::fs::metadata(output).await?.len();
        if size == 0 {
            return Err(MediaError::EmptyOutput(output.to_path_buf()));
        }

        info!(
            "Assembled {} segments into {} ({} bytes)",
            encoded.len(),
            output.display(),
            size
        );
        Ok(())
    }

    /// Encode one looped-image + audio segment.
    async fn encode_segment(
        &self,
        segment: &Segment,
        duration: f64,
        output: &Path,
    ) -> MediaResult<()> {
        let cmd = FfmpegCommand::new(output)
            .looped_image(&segment.image)
            .input(&segment.audio)
            .video_codec("libx264")
            .duration(duration)
            .pixel_format("yuv420p")
            .video_filter(VERTICAL_FILTER)
            .audio_codec("aac")
            .audio_bitrate("128k")
            .preset("medium");

        self.runner.run(&cmd).await
    }

    /// Concatenate encoded segments with the concat demuxer.
    async fn concat(&self, segments: &[PathBuf], seg_dir: &Path, output: &Path) -> MediaResult<()> {
        let list_path = seg_dir.join("concat.txt");
        tokio::fs::write(&list_path, write_concat_list(segments)).await?;

        let cmd = FfmpegCommand::new(output)
            .input_with_args(["-f", "concat", "-safe", "0"], &list_path)
            .output_args(["-c", "copy"]);

        self.runner.run(&cmd).await
    }
}

#[async_trait]
impl SegmentEncoder for FfmpegEncoder {
    async fn assemble(&self, plan: &AssemblyPlan, output: &Path) -> MediaResult<()> {
        // Checked before any filesystem or ffmpeg work
        if plan.is_empty() {
            return Err(MediaError::NoSegments);
        }

        let seg_dir = output.with_extension("segments");
        tokio::fs::create_dir_all(&seg_dir).await?;

        let result = self.assemble_inner(plan, output, &seg_dir).await;

        tokio::fs::remove_dir_all(&seg_dir).await.ok();
        result
    }
}

/// Build a concat demuxer file list. Single quotes in paths are escaped the
/// way the demuxer expects.
fn write_concat_list(segments: &[PathBuf]) -> String {
    let mut list = String::new();
    for path in segments {
        let escaped = path.to_string_lossy().replace('\'', "'\\''");
        list.push_str(&format!("file '{}'\n", escaped));
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_list_format() {
        let list = write_concat_list(&[
            PathBuf::from("/tmp/job/segment_title.mp4"),
            PathBuf::from("/tmp/job/segment_0.mp4"),
        ]);
        assert_eq!(
            list,
            "file '/tmp/job/segment_title.mp4'\nfile '/tmp/job/segment_0.mp4'\n"
        );
    }

    #[test]
    fn test_concat_list_escapes_quotes() {
        let list = write_concat_list(&[PathBuf::from("/tmp/it's here/seg.mp4")]);
        assert!(list.contains(r"it'\''s here"));
    }

    #[test]
    fn test_plan_counts() {
        let mut plan = AssemblyPlan::default();
        assert!(plan.is_empty());

        plan.scenes.push(Segment::new("a.png", "a.wav"));
        plan.title = Some(Segment::new("t.png", "t.wav"));
        assert!(!plan.is_empty());
        assert_eq!(plan.segment_count(), 2);
    }

    #[tokio::test]
    async fn test_assemble_empty_plan_fails_fast() {
        let encoder = FfmpegEncoder::new(60);
        let err = encoder
            .assemble(&AssemblyPlan::default(), Path::new("/tmp/out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::NoSegments));
    }
}

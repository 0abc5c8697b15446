//! Pipeline orchestrator: one job from script to encoded video.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use metrics::counter;
use tracing::{info, warn};

use shortvid_gen::{AssetProducer, GenAssetProducer};
use shortvid_media::{AssemblyPlan, FfmpegEncoder, Segment, SegmentEncoder};
use shortvid_models::{SceneDisposition, SceneOutcome};
use shortvid_queue::{ProgressCache, ProgressSink, RenderJob};
use shortvid_store::JobStore;

use crate::config::WorkerConfig;
use crate::error::WorkerResult;

// Stage checkpoints. Fixed and increasing, so progress reads are
// non-decreasing for the life of a job.
const PERCENT_SCRIPT_START: u8 = 10;
const PERCENT_SCRIPT_DONE: u8 = 25;
const PERCENT_ASSETS_DONE: u8 = 65;
const PERCENT_ENCODING: u8 = 85;
const PERCENT_DONE: u8 = 100;

/// Context for job processing.
pub struct RenderContext {
    pub config: WorkerConfig,
    pub store: JobStore,
    pub progress: Arc<dyn ProgressSink>,
    pub producer: Arc<dyn AssetProducer>,
    pub encoder: Arc<dyn SegmentEncoder>,
}

impl RenderContext {
    /// Build a context against the real collaborators, from environment
    /// variables.
    pub async fn new(config: WorkerConfig) -> WorkerResult<Self> {
        let store = JobStore::from_env().await?;
        let progress = ProgressCache::from_env()?;
        let producer = GenAssetProducer::from_env()?;
        let encoder = FfmpegEncoder::new(config.encode_timeout_secs);

        Ok(Self {
            config,
            store,
            progress: Arc::new(progress),
            producer: Arc::new(producer),
            encoder: Arc::new(encoder),
        })
    }
}

/// Successful pipeline result.
struct StageOutput {
    output: PathBuf,
    outcomes: Vec<SceneOutcome>,
}

/// Fatal pipeline failure; carries whatever outcomes were known at the time.
struct StageFailure {
    detail: String,
    outcomes: Vec<SceneOutcome>,
}

impl StageFailure {
    fn new(detail: impl Into<String>, outcomes: Vec<SceneOutcome>) -> Self {
        Self {
            detail: detail.into(),
            outcomes,
        }
    }
}

/// Process one render job to a terminal state.
///
/// The terminal transition is always written to the store here; the returned
/// error covers only infrastructure failures (e.g. the store itself being
/// unreachable), in which case the caller cannot do better than log.
pub async fn process_render(ctx: &RenderContext, job: &RenderJob) -> WorkerResult<()> {
    let job_id = &job.job_id;
    info!(job_id = %job_id, topic = %job.topic, style = %job.style, "Processing render job");

    ctx.store.mark_processing(job_id).await?;

    let work_dir = ctx.config.work_dir.join(job_id.as_str());
    tokio::fs::create_dir_all(&work_dir).await?;

    let result = run_stages(ctx, job, &work_dir).await;

    // Scratch space is reclaimed in both terminal states; the output file
    // lives outside it.
    tokio::fs::remove_dir_all(&work_dir).await.ok();

    match result {
        Ok(StageOutput { output, outcomes }) => {
            ctx.store
                .mark_completed(job_id, &output.to_string_lossy(), &outcomes)
                .await?;
            ctx.progress
                .update(job_id, PERCENT_DONE, "Completed")
                .await
                .ok();
            counter!("shortvid_jobs_completed_total").increment(1);
            info!(job_id = %job_id, output = %output.display(), "Job completed");
        }
        Err(failure) => {
            ctx.store
                .mark_failed(job_id, &failure.detail, &failure.outcomes)
                .await?;
            counter!("shortvid_jobs_failed_total").increment(1);
            warn!(job_id = %job_id, "Job failed: {}", failure.detail);
        }
    }

    Ok(())
}

/// The ordered stages: script, asset fan-out, join by index, encode.
async fn run_stages(
    ctx: &RenderContext,
    job: &RenderJob,
    work_dir: &Path,
) -> Result<StageOutput, StageFailure> {
    let job_id = &job.job_id;

    ctx.progress
        .update(job_id, PERCENT_SCRIPT_START, "Generating script")
        .await
        .ok();

    // Script failure has no degrade path
    let script = match ctx.producer.produce_script(&job.topic, job.style).await {
        Ok(script) => script,
        Err(e) => {
            return Err(StageFailure::new(
                format!("script generation failed: {e}"),
                Vec::new(),
            ))
        }
    };
    info!(
        job_id = %job_id,
        title = %script.title,
        scenes = script.scenes.len(),
        "Script generated"
    );

    ctx.progress
        .update(job_id, PERCENT_SCRIPT_DONE, "Script ready")
        .await
        .ok();

    let character_hint = character_hint_for(&job.topic);
    let producer = ctx.producer.as_ref();

    // Fan out: each scene's image and audio in parallel, title assets
    // alongside. join_all preserves input order, which is playback order.
    let scene_futures = script.scenes.iter().enumerate().map(|(i, scene)| async move {
        let (image, audio) = tokio::join!(
            producer.produce_scene_image(work_dir, &scene.visual_concept, job.style, i, character_hint),
            producer.produce_scene_audio(work_dir, &scene.text, i, job.speaker),
        );
        (i, image, audio)
    });

    let title_future = producer.produce_title_assets(work_dir, &script.title, job.style, job.speaker);

    let (scene_assets, (title_image, title_audio)) =
        tokio::join!(join_all(scene_futures), title_future);

    ctx.progress
        .update(job_id, PERCENT_ASSETS_DONE, "Scene assets ready")
        .await
        .ok();

    // Re-join pairwise by original scene index; drop incomplete pairs
    let mut plan = AssemblyPlan::default();
    let mut outcomes = Vec::with_capacity(scene_assets.len());
    for (i, image, audio) in scene_assets {
        match (image, audio) {
            (Some(image), Some(audio)) => {
                plan.scenes.push(Segment::new(image, audio));
                outcomes.push(SceneOutcome::rendered(i as u32));
            }
            (None, _) => {
                warn!(job_id = %job_id, scene = i, "Dropping scene: no image");
                outcomes.push(SceneOutcome::dropped(i as u32, SceneDisposition::MissingImage));
            }
            (_, None) => {
                warn!(job_id = %job_id, scene = i, "Dropping scene: no audio");
                outcomes.push(SceneOutcome::dropped(i as u32, SceneDisposition::MissingAudio));
            }
        }
    }

    match (title_image, title_audio) {
        (Some(image), Some(audio)) => plan.title = Some(Segment::new(image, audio)),
        _ => warn!(job_id = %job_id, "Title assets incomplete, skipping title segment"),
    }

    // A job with zero playable scenes has no value to the caller
    if plan.scenes.is_empty() {
        return Err(StageFailure::new(
            "no usable segments: all scenes were dropped",
            outcomes,
        ));
    }

    ctx.progress
        .update(job_id, PERCENT_ENCODING, "Encoding video")
        .await
        .ok();

    if let Err(e) = tokio::fs::create_dir_all(&ctx.config.output_dir).await {
        return Err(StageFailure::new(
            format!("encode failed: cannot create output directory: {e}"),
            outcomes,
        ));
    }

    let output = ctx.config.output_dir.join(format!("{job_id}.mp4"));
    if let Err(e) = ctx.encoder.assemble(&plan, &output).await {
        return Err(StageFailure::new(format!("encode failed: {e}"), outcomes));
    }

    Ok(StageOutput { output, outcomes })
}

/// Recurring-character hint when the topic is about people.
fn character_hint_for(topic: &str) -> Option<&'static str> {
    let lower = topic.to_lowercase();
    if lower.contains("people") || lower.contains("person") || topic.contains('人') {
        Some("same consistent character design throughout all scenes")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use std::sync::Mutex;

    use shortvid_gen::{GenError, GenResult};
    use shortvid_media::{MediaError, MediaResult};
    use shortvid_models::{Job, JobId, JobStatus, Scene, Script, VideoStyle};
    use shortvid_queue::QueueResult;

    /// Producer stub: writes tiny asset files, with per-index failure knobs.
    #[derive(Default)]
    struct StubProducer {
        script: Option<Script>,
        fail_image_for: Vec<usize>,
        fail_audio_for: Vec<usize>,
        fail_title_audio: bool,
    }

    #[async_trait]
    impl AssetProducer for StubProducer {
        async fn produce_script(&self, _topic: &str, _style: VideoStyle) -> GenResult<Script> {
            self.script
                .clone()
                .ok_or_else(|| GenError::upstream(500, "model overloaded"))
        }

        async fn produce_scene_image(
            &self,
            work_dir: &Path,
            _concept: &str,
            style: VideoStyle,
            scene_index: usize,
            _character_hint: Option<&str>,
        ) -> Option<PathBuf> {
            if self.fail_image_for.contains(&scene_index) {
                return None;
            }
            let path = work_dir.join(format!(
                "{}_scene_{}.png",
                style.as_filename_part(),
                scene_index
            ));
            tokio::fs::write(&path, b"img").await.ok()?;
            Some(path)
        }

        async fn produce_scene_audio(
            &self,
            work_dir: &Path,
            _text: &str,
            scene_index: usize,
            _speaker: u32,
        ) -> Option<PathBuf> {
            if self.fail_audio_for.contains(&scene_index) {
                return None;
            }
            let path = work_dir.join(format!("scene_{scene_index}.wav"));
            tokio::fs::write(&path, b"wav").await.ok()?;
            Some(path)
        }

        async fn produce_title_assets(
            &self,
            work_dir: &Path,
            _title: &str,
            style: VideoStyle,
            _speaker: u32,
        ) -> (Option<PathBuf>, Option<PathBuf>) {
            let image_path = work_dir.join(format!("title_{}.png", style.as_filename_part()));
            let image = tokio::fs::write(&image_path, b"img")
                .await
                .ok()
                .map(|_| image_path);

            if self.fail_title_audio {
                return (image, None);
            }
            let audio_path = work_dir.join("title_audio.wav");
            let audio = tokio::fs::write(&audio_path, b"wav")
                .await
                .ok()
                .map(|_| audio_path);
            (image, audio)
        }
    }

    /// Progress sink recording every update.
    #[derive(Default)]
    struct RecordingSink {
        updates: Mutex<Vec<(u8, String)>>,
    }

    #[async_trait]
    impl ProgressSink for RecordingSink {
        async fn update(&self, _job_id: &JobId, percent: u8, step: &str) -> QueueResult<()> {
            self.updates
                .lock()
                .unwrap()
                .push((percent, step.to_string()));
            Ok(())
        }
    }

    /// Encoder stub: records the plan and writes a marker output file.
    #[derive(Default)]
    struct StubEncoder {
        plans: Mutex<Vec<AssemblyPlan>>,
        fail: bool,
    }

    #[async_trait]
    impl SegmentEncoder for StubEncoder {
        async fn assemble(&self, plan: &AssemblyPlan, output: &Path) -> MediaResult<()> {
            if plan.is_empty() {
                return Err(MediaError::NoSegments);
            }
            self.plans.lock().unwrap().push(plan.clone());
            if self.fail {
                return Err(MediaError::ffmpeg_failed("forced failure", None, Some(1)));
            }
            tokio::fs::write(output, b"VIDEO").await?;
            Ok(())
        }
    }

    fn three_scene_script() -> Script {
        let scene = |text: &str, concept: &str| Scene {
            text: text.to_string(),
            visual_concept: concept.to_string(),
            duration_hint: 5,
        };
        Script {
            title: "Top 3 diet mistakes".to_string(),
            style: VideoStyle::Ghibli,
            scenes: vec![
                scene("Number 3 is eating late.", "clock at midnight"),
                scene("Number 2 is skipping breakfast.", "empty plate"),
                scene("Number 1 is crash dieting.", "broken scale"),
            ],
        }
    }

    struct Harness {
        ctx: RenderContext,
        job: RenderJob,
        sink: Arc<RecordingSink>,
        encoder: Arc<StubEncoder>,
        _tmp: tempfile::TempDir,
    }

    async fn harness(producer: StubProducer, encoder: StubEncoder) -> Harness {
        let tmp = tempfile::tempdir().unwrap();
        let config = WorkerConfig {
            work_dir: tmp.path().join("work"),
            output_dir: tmp.path().join("out"),
            ..WorkerConfig::default()
        };

        let store = JobStore::connect_in_memory().await.unwrap();
        let record = Job::new("user1", "diet mistakes", VideoStyle::Ghibli, 1, false);
        store.create(&record).await.unwrap();

        let job = RenderJob::new(
            record.id.clone(),
            "user1",
            "diet mistakes",
            VideoStyle::Ghibli,
            1,
            false,
        );

        let sink = Arc::new(RecordingSink::default());
        let encoder = Arc::new(encoder);

        let ctx = RenderContext {
            config,
            store,
            progress: sink.clone(),
            producer: Arc::new(producer),
            encoder: encoder.clone(),
        };

        Harness {
            ctx,
            job,
            sink,
            encoder,
            _tmp: tmp,
        }
    }

    #[tokio::test]
    async fn test_script_failure_is_fatal() {
        let h = harness(StubProducer::default(), StubEncoder::default()).await;

        process_render(&h.ctx, &h.job).await.unwrap();

        let job = h.ctx.store.get(&h.job.job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        let detail = job.error_detail.unwrap();
        assert!(detail.contains("script generation failed"));
        assert!(job.result_path.is_none());
    }

    #[tokio::test]
    async fn test_all_scenes_succeed() {
        let producer = StubProducer {
            script: Some(three_scene_script()),
            ..StubProducer::default()
        };
        let h = harness(producer, StubEncoder::default()).await;

        process_render(&h.ctx, &h.job).await.unwrap();

        let job = h.ctx.store.get(&h.job.job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);

        // Result file exists and is non-empty
        let path = PathBuf::from(job.result_path.unwrap());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);

        // All scenes rendered, order intact
        assert_eq!(job.scene_outcomes.len(), 3);
        assert!(job
            .scene_outcomes
            .iter()
            .all(|o| o.disposition == SceneDisposition::Rendered));

        // Title segment plus three scenes, in script order
        let plans = h.encoder.plans.lock().unwrap();
        assert_eq!(plans.len(), 1);
        assert!(plans[0].title.is_some());
        let images: Vec<String> = plans[0]
            .scenes
            .iter()
            .map(|s| s.image.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(
            images,
            vec!["ghibli_scene_0.png", "ghibli_scene_1.png", "ghibli_scene_2.png"]
        );
    }

    #[tokio::test]
    async fn test_degraded_scene_is_dropped_in_order() {
        let producer = StubProducer {
            script: Some(three_scene_script()),
            fail_image_for: vec![1],
            ..StubProducer::default()
        };
        let h = harness(producer, StubEncoder::default()).await;

        process_render(&h.ctx, &h.job).await.unwrap();

        let job = h.ctx.store.get(&h.job.job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);

        // Scene 1 dropped, scenes 0 and 2 survive in order
        assert_eq!(job.scene_outcomes[0].disposition, SceneDisposition::Rendered);
        assert_eq!(
            job.scene_outcomes[1].disposition,
            SceneDisposition::MissingImage
        );
        assert_eq!(job.scene_outcomes[2].disposition, SceneDisposition::Rendered);

        let plans = h.encoder.plans.lock().unwrap();
        let images: Vec<String> = plans[0]
            .scenes
            .iter()
            .map(|s| s.image.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(images, vec!["ghibli_scene_0.png", "ghibli_scene_2.png"]);
    }

    #[tokio::test]
    async fn test_all_scenes_dropped_fails_job() {
        let producer = StubProducer {
            script: Some(three_scene_script()),
            fail_audio_for: vec![0, 1, 2],
            ..StubProducer::default()
        };
        let h = harness(producer, StubEncoder::default()).await;

        process_render(&h.ctx, &h.job).await.unwrap();

        let job = h.ctx.store.get(&h.job.job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error_detail.unwrap().contains("no usable segments"));
        assert!(job
            .scene_outcomes
            .iter()
            .all(|o| o.disposition == SceneDisposition::MissingAudio));

        // Encode never attempted
        assert!(h.encoder.plans.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_encoder_failure_fails_job() {
        let producer = StubProducer {
            script: Some(three_scene_script()),
            ..StubProducer::default()
        };
        let encoder = StubEncoder {
            fail: true,
            ..StubEncoder::default()
        };
        let h = harness(producer, encoder).await;

        process_render(&h.ctx, &h.job).await.unwrap();

        let job = h.ctx.store.get(&h.job.job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error_detail.unwrap().contains("encode failed"));
    }

    #[tokio::test]
    async fn test_missing_title_audio_keeps_job_alive() {
        let producer = StubProducer {
            script: Some(three_scene_script()),
            fail_title_audio: true,
            ..StubProducer::default()
        };
        let h = harness(producer, StubEncoder::default()).await;

        process_render(&h.ctx, &h.job).await.unwrap();

        let job = h.ctx.store.get(&h.job.job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);

        // No title segment, scenes intact
        let plans = h.encoder.plans.lock().unwrap();
        assert!(plans[0].title.is_none());
        assert_eq!(plans[0].scenes.len(), 3);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_reaches_done() {
        let producer = StubProducer {
            script: Some(three_scene_script()),
            ..StubProducer::default()
        };
        let h = harness(producer, StubEncoder::default()).await;

        process_render(&h.ctx, &h.job).await.unwrap();

        let updates = h.sink.updates.lock().unwrap();
        assert!(!updates.is_empty());
        for pair in updates.windows(2) {
            assert!(pair[0].0 <= pair[1].0, "progress went backwards: {pair:?}");
        }
        assert_eq!(updates.last().unwrap().0, 100);
    }

    #[tokio::test]
    async fn test_work_dir_reclaimed_after_terminal_state() {
        let producer = StubProducer {
            script: Some(three_scene_script()),
            ..StubProducer::default()
        };
        let h = harness(producer, StubEncoder::default()).await;

        process_render(&h.ctx, &h.job).await.unwrap();

        let job_work_dir = h.ctx.config.work_dir.join(h.job.job_id.as_str());
        assert!(!job_work_dir.exists());
    }

    #[test]
    fn test_character_hint() {
        assert!(character_hint_for("habits of successful people").is_some());
        assert!(character_hint_for("diet mistakes").is_none());
    }
}

//! Pipeline orchestrator for Sofy.
//!
//! Drives one job through the fixed step sequence
//!
//! ```text
//! initialization -> video_generation -> script_generation -> voiceover_generation
//!   -> music_generation -> video_editing -> final_render -> completed | failed
//! ```
//!
//! and reports every transition to the [`MonitoringService`]. Steps are never
//! retried here; retries live inside the service adapters. A fatal adapter
//! outcome or an editing error fails the job and skips the remaining steps.

use crate::config::{PromptGenerator, Settings, TextProvider, VideoConfig};
use crate::error::{Result, SofyError};
use crate::keys::KeyRotator;
use crate::media::{validate_shorts, PassthroughEditor, VideoEditor, DEFAULT_MAX_SHORTS_MB};
use crate::monitoring::{JobStatus, JobStep, LogLevel, MonitoringService};
use crate::services::{
    unique_artifact_name, AdapterOutcome, ClipRequest, GeminiClient, MusicAdapter, MusicRequest,
    OpenAITextBackend, RetryPolicy, SilentMusicBackend, SpeechAdapter, TextAdapter, TextBackend,
    UploadAdapter, UploadMetadata, VideoAdapter, YoutubeUploader,
};
use futures::stream::{self, StreamExt};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// External collaborators used by the pipeline.
#[derive(Clone)]
pub struct Components {
    pub prompts: PromptGenerator,
    pub text: TextAdapter,
    pub speech: SpeechAdapter,
    pub music: MusicAdapter,
    pub video: VideoAdapter,
    pub editor: Arc<dyn VideoEditor>,
    /// `None` when no upload credentials are configured.
    pub uploader: Option<UploadAdapter>,
}

impl Components {
    /// Build the production components.
    ///
    /// Gemini keys are required for speech and video; text uses the configured
    /// provider. Fails with a configuration error when keys are missing.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let policy = RetryPolicy::from_settings(
            &settings.retry,
            settings.video.poll_interval_secs,
            settings.video.poll_timeout(),
        );

        let gemini_keys = Arc::new(KeyRotator::from_env(TextProvider::Gemini.key_prefix())?);
        let gemini = Arc::new(GeminiClient::from_settings(settings)?);

        let text = match settings.text.provider {
            TextProvider::Gemini => TextAdapter::new(gemini.clone(), gemini_keys.clone(), policy.clone()),
            TextProvider::OpenAI => {
                let backend: Arc<dyn TextBackend> = Arc::new(
                    OpenAITextBackend::new(&settings.text.model)
                        .with_timeout(Duration::from_secs(settings.gemini.request_timeout_secs)),
                );
                let keys = Arc::new(KeyRotator::from_env(TextProvider::OpenAI.key_prefix())?);
                TextAdapter::new(backend, keys, policy.clone())
            }
        };

        let uploader = YoutubeUploader::from_settings(&settings.youtube)?
            .map(|uploader| UploadAdapter::new(Arc::new(uploader), policy.clone()));

        Ok(Self {
            prompts: PromptGenerator::new(text.clone()),
            speech: SpeechAdapter::new(gemini.clone(), gemini_keys.clone(), policy.clone()),
            music: MusicAdapter::new(Arc::new(SilentMusicBackend), gemini_keys.clone(), policy.clone()),
            video: VideoAdapter::new(gemini, gemini_keys, policy),
            editor: Arc::new(PassthroughEditor),
            text,
            uploader,
        })
    }
}

/// The main orchestrator for the Sofy pipeline.
pub struct Orchestrator {
    monitoring: Arc<MonitoringService>,
    components: Components,
    work_dir: PathBuf,
    max_concurrent_clips: usize,
    job_timeout: Option<Duration>,
    max_upload_mb: u64,
}

impl Orchestrator {
    /// Create an orchestrator with production components.
    pub fn new(settings: &Settings, monitoring: Arc<MonitoringService>) -> Result<Self> {
        let components = Components::from_settings(settings)?;
        let orchestrator = Self::with_components(monitoring, components, settings.temp_dir())
            .with_max_concurrent_clips(settings.pipeline.max_concurrent_clips)
            .with_max_upload_mb(settings.youtube.max_upload_mb);

        Ok(match settings.pipeline.job_timeout_secs {
            0 => orchestrator,
            secs => orchestrator.with_job_timeout(Duration::from_secs(secs)),
        })
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(monitoring: Arc<MonitoringService>, components: Components, work_dir: PathBuf) -> Self {
        Self {
            monitoring,
            components,
            work_dir,
            max_concurrent_clips: 1,
            job_timeout: None,
            max_upload_mb: DEFAULT_MAX_SHORTS_MB,
        }
    }

    /// Generate up to `n` sub-clips at once. Clip order is preserved.
    pub fn with_max_concurrent_clips(mut self, n: usize) -> Self {
        self.max_concurrent_clips = n.max(1);
        self
    }

    /// Fail jobs that run longer than `timeout`.
    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = Some(timeout);
        self
    }

    pub fn with_max_upload_mb(mut self, max_mb: u64) -> Self {
        self.max_upload_mb = max_mb;
        self
    }

    pub fn monitoring(&self) -> &Arc<MonitoringService> {
        &self.monitoring
    }

    /// Run one job to completion.
    pub async fn run(&self, config: &VideoConfig) -> Result<JobReport> {
        self.run_with_cancel(config, CancellationToken::new()).await
    }

    /// Run one job, failing it if `token` is cancelled first.
    ///
    /// Returns `Err` only when the job could not be started or its state
    /// could not be recorded. A failed job is reported through the
    /// [`JobReport`] status.
    #[instrument(skip_all, fields(niche = %config.niche))]
    pub async fn run_with_cancel(&self, config: &VideoConfig, token: CancellationToken) -> Result<JobReport> {
        config.validate()?;

        let job_id = self.monitoring.start_job(&config.niche, &config.theme).await?;
        let job_dir = self.work_dir.join(&job_id);
        let mut progress = Progress::default();

        let outcome = {
            let pipeline = async {
                match self.job_timeout {
                    Some(limit) => tokio::time::timeout(limit, self.execute(&job_id, config, &job_dir, &mut progress))
                        .await
                        .unwrap_or_else(|_| {
                            Err(SofyError::Cancelled(format!("timed out after {}s", limit.as_secs())))
                        }),
                    None => self.execute(&job_id, config, &job_dir, &mut progress).await,
                }
            };

            tokio::select! {
                biased;
                _ = token.cancelled() => Err(SofyError::Cancelled("cancelled by user".to_string())),
                result = pipeline => result,
            }
        };

        let error = match outcome {
            Ok(()) => {
                self.monitoring
                    .update_status(&job_id, JobStatus::Completed, None, None)
                    .await?;
                None
            }
            Err(e) => {
                let step = match &e {
                    SofyError::Step { step, .. } => Some(*step),
                    _ => self.monitoring.get_job(&job_id).await.and_then(|job| job.current_step),
                };
                let message = e.to_string();
                self.monitoring
                    .update_status(&job_id, JobStatus::Failed, step, Some(&message))
                    .await?;
                Some(message)
            }
        };

        let status = self
            .monitoring
            .get_job(&job_id)
            .await
            .map(|job| job.status)
            .unwrap_or(JobStatus::Failed);

        Ok(JobReport {
            job_id,
            status,
            clips_generated: progress.clips_generated,
            output_path: progress.output_path,
            video_url: progress.video_url,
            degraded: progress.degraded,
            error,
        })
    }

    async fn execute(
        &self,
        job_id: &str,
        config: &VideoConfig,
        job_dir: &Path,
        progress: &mut Progress,
    ) -> Result<()> {
        tokio::fs::create_dir_all(job_dir)
            .await
            .map_err(|e| SofyError::step(JobStep::Init, format!("cannot create {}: {}", job_dir.display(), e)))?;
        self.monitoring.log(
            LogLevel::Info,
            "Configuration loaded",
            Some(job_id),
            Some(json!({ "duration": config.duration, "clips": config.clip_count(), "style": config.style })),
        );

        self.advance(job_id, JobStep::VideoGeneration).await?;
        let clips = self.generate_clips(job_id, config, job_dir, progress).await;
        progress.clips_generated = clips.len();

        self.advance(job_id, JobStep::ScriptGeneration).await?;
        let prompt = self.components.prompts.script_prompt(config);
        let outcome = self
            .components
            .text
            .write_script(&prompt, PromptGenerator::fallback_script(config), &job_dir.join("script.txt"))
            .await;
        let script = self.settle(job_id, JobStep::ScriptGeneration, outcome, progress)?;

        self.advance(job_id, JobStep::VoiceoverGeneration).await?;
        let dest = job_dir.join(unique_artifact_name("voiceover", "wav"));
        let outcome = if config.voiceover.speakers.is_empty() {
            self.components.speech.narrate(&script, &config.voiceover.voice, &dest).await
        } else {
            self.components
                .speech
                .narrate_dialogue(&script, &config.voiceover.speakers, &dest)
                .await
        };
        let voiceover = self.settle(job_id, JobStep::VoiceoverGeneration, outcome, progress)?;

        self.advance(job_id, JobStep::MusicGeneration).await?;
        let request = MusicRequest {
            prompt: self.components.prompts.music_prompt(config),
            mood: config.music.mood.clone(),
            tempo: config.music.tempo.clone(),
            duration_secs: config.duration,
        };
        let outcome = self
            .components
            .music
            .compose(&request, &job_dir.join(unique_artifact_name("music", "wav")))
            .await;
        let music = self.settle(job_id, JobStep::MusicGeneration, outcome, progress)?;

        self.advance(job_id, JobStep::VideoEditing).await?;
        let edited = self
            .edit(config, job_dir, &clips, &script, &voiceover, &music)
            .await
            .map_err(|e| SofyError::step(JobStep::VideoEditing, e.to_string()))?;

        self.advance(job_id, JobStep::FinalRender).await?;
        let final_path = self
            .components
            .editor
            .render_final(&edited, &config.output_dir(), &config.video.format)
            .await
            .and_then(|path| validate_shorts(&path, self.max_upload_mb).map(|_| path))
            .map_err(|e| SofyError::step(JobStep::FinalRender, e.to_string()))?;

        self.monitoring
            .set_output_path(job_id, &final_path.to_string_lossy())
            .await?;
        progress.output_path = Some(final_path.clone());

        if config.output.upload {
            self.upload(job_id, config, &final_path, progress).await;
        }
        Ok(())
    }

    async fn advance(&self, job_id: &str, step: JobStep) -> Result<()> {
        self.monitoring
            .update_status(job_id, JobStatus::Running, Some(step), None)
            .await
    }

    /// Generate every sub-clip, keeping the ones that produced a file.
    async fn generate_clips(
        &self,
        job_id: &str,
        config: &VideoConfig,
        job_dir: &Path,
        progress: &mut Progress,
    ) -> Vec<PathBuf> {
        let count = config.clip_count();
        let prompts = self.components.prompts.video_prompts(config, count).await;

        let outcomes: Vec<(usize, AdapterOutcome<PathBuf>)> = stream::iter(prompts.into_iter().enumerate())
            .map(|(index, prompt)| {
                let request = ClipRequest {
                    prompt,
                    duration_secs: config.video.stitch_length,
                    resolution: config.video.resolution.clone(),
                    format: config.video.format.clone(),
                };
                let dest = job_dir.join(format!("clip_{}.{}", index + 1, config.video.format));
                async move { (index, self.components.video.generate_clip(&request, &dest).await) }
            })
            .buffered(self.max_concurrent_clips)
            .collect()
            .await;

        let mut clips = Vec::with_capacity(count);
        for (index, outcome) in outcomes {
            match outcome {
                AdapterOutcome::Success(path) => clips.push(path),
                AdapterOutcome::Degraded { value, reason } => {
                    self.note_degraded(job_id, JobStep::VideoGeneration, &reason, progress);
                    clips.push(value);
                }
                AdapterOutcome::Fatal(reason) => {
                    self.monitoring.log(
                        LogLevel::Error,
                        &format!("Error generating video clip {}/{}: {}", index + 1, count, reason),
                        Some(job_id),
                        None,
                    );
                }
            }
        }

        info!("Generated {}/{} clips", clips.len(), count);
        clips
    }

    /// Stitch, mix and subtitle the clips. Returns the edited video.
    async fn edit(
        &self,
        config: &VideoConfig,
        job_dir: &Path,
        clips: &[PathBuf],
        script: &str,
        voiceover: &Path,
        music: &Path,
    ) -> Result<PathBuf> {
        let editor = &self.components.editor;
        let stage = |name: &str| job_dir.join(format!("{}.{}", name, config.video.format));

        let stitched = editor.stitch(clips, &stage("stitched")).await?;
        let voiced = editor.add_voiceover(&stitched, voiceover, &stage("with_voiceover")).await?;
        let scored = editor.add_background_music(&voiced, music, &stage("with_music")).await?;

        if config.subtitles.enable {
            editor
                .add_subtitles(&scored, script, config.duration, &stage("with_subtitles"))
                .await
        } else {
            Ok(scored)
        }
    }

    async fn upload(&self, job_id: &str, config: &VideoConfig, video: &Path, progress: &mut Progress) {
        let Some(uploader) = &self.components.uploader else {
            self.note_degraded(job_id, JobStep::FinalRender, "upload requested but no uploader is configured", progress);
            return;
        };

        match uploader.upload(video, &UploadMetadata::from_config(config)).await {
            AdapterOutcome::Success(Some(url)) => {
                self.monitoring.log(
                    LogLevel::Info,
                    "Video uploaded",
                    Some(job_id),
                    Some(json!({ "url": url })),
                );
                progress.video_url = Some(url);
            }
            AdapterOutcome::Success(None) => {}
            AdapterOutcome::Degraded { reason, .. } | AdapterOutcome::Fatal(reason) => {
                self.note_degraded(job_id, JobStep::FinalRender, &format!("upload failed: {}", reason), progress);
            }
        }
    }

    /// Unwrap an adapter outcome for `step`, failing the step on `Fatal`.
    fn settle<T>(&self, job_id: &str, step: JobStep, outcome: AdapterOutcome<T>, progress: &mut Progress) -> Result<T> {
        match outcome {
            AdapterOutcome::Success(value) => Ok(value),
            AdapterOutcome::Degraded { value, reason } => {
                self.note_degraded(job_id, step, &reason, progress);
                Ok(value)
            }
            AdapterOutcome::Fatal(reason) => Err(SofyError::step(step, reason)),
        }
    }

    fn note_degraded(&self, job_id: &str, step: JobStep, reason: &str, progress: &mut Progress) {
        self.monitoring.log(
            LogLevel::Warning,
            &format!("Step {} used a fallback: {}", step, reason),
            Some(job_id),
            None,
        );
        progress.degraded.push(format!("{}: {}", step, reason));
    }
}

#[derive(Debug, Default)]
struct Progress {
    clips_generated: usize,
    output_path: Option<PathBuf>,
    video_url: Option<String>,
    degraded: Vec<String>,
}

/// Result of running one job.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job_id: String,
    /// Completed or Failed.
    pub status: JobStatus,
    /// Sub-clips that produced a file, including placeholders.
    pub clips_generated: usize,
    pub output_path: Option<PathBuf>,
    pub video_url: Option<String>,
    /// Steps that fell back to a placeholder, with the reason.
    pub degraded: Vec<String>,
    pub error: Option<String>,
}

impl JobReport {
    pub fn succeeded(&self) -> bool {
        self.status == JobStatus::Completed
    }
}

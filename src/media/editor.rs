//! Editor that moves artifacts between stages without transcoding.

use super::subtitles::{cues_for_script, format_srt};
use super::VideoEditor;
use crate::error::{Result, SofyError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// YouTube Shorts upload limit.
pub const DEFAULT_MAX_SHORTS_MB: u64 = 256;

/// [`VideoEditor`] that copies its primary input to each stage's output.
///
/// Stitching keeps the first clip; subtitles are written as an SRT sidecar
/// next to the output instead of being burned in.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughEditor;

impl PassthroughEditor {
    async fn copy_to(src: &Path, dest: &Path) -> Result<PathBuf> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(src, dest).await.map_err(|e| {
            SofyError::InvalidInput(format!("Failed to copy {} to {}: {}", src.display(), dest.display(), e))
        })?;
        Ok(dest.to_path_buf())
    }
}

#[async_trait]
impl VideoEditor for PassthroughEditor {
    async fn stitch(&self, clips: &[PathBuf], dest: &Path) -> Result<PathBuf> {
        let first = clips
            .first()
            .ok_or_else(|| SofyError::InvalidInput("No video clips provided for stitching".to_string()))?;

        info!("Stitching {} clips into {}", clips.len(), dest.display());
        if clips.len() > 1 {
            debug!("Passthrough stitching keeps only {}", first.display());
        }
        Self::copy_to(first, dest).await
    }

    async fn add_voiceover(&self, video: &Path, voiceover: &Path, dest: &Path) -> Result<PathBuf> {
        info!("Adding voiceover {}", voiceover.display());
        Self::copy_to(video, dest).await
    }

    async fn add_background_music(&self, video: &Path, music: &Path, dest: &Path) -> Result<PathBuf> {
        info!("Adding background music {}", music.display());
        Self::copy_to(video, dest).await
    }

    async fn add_subtitles(&self, video: &Path, script: &str, duration_secs: u32, dest: &Path) -> Result<PathBuf> {
        let cues = cues_for_script(script, duration_secs);
        if cues.is_empty() {
            warn!("Script is empty, no subtitles written");
        } else {
            let sidecar = dest.with_extension("srt");
            if let Some(parent) = sidecar.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&sidecar, format_srt(&cues)).await?;
            info!("Wrote {} subtitle cues to {}", cues.len(), sidecar.display());
        }
        Self::copy_to(video, dest).await
    }

    async fn render_final(&self, video: &Path, output_dir: &Path, format: &str) -> Result<PathBuf> {
        let dest = output_dir.join(format!("final_video.{}", format));
        info!("Rendering final video to {}", dest.display());
        Self::copy_to(video, &dest).await
    }
}

/// Check that a rendered video exists and fits the Shorts size limit.
///
/// Returns the file size in bytes.
pub fn validate_shorts(path: &Path, max_mb: u64) -> Result<u64> {
    let metadata = std::fs::metadata(path)
        .map_err(|_| SofyError::InvalidInput(format!("Video file does not exist: {}", path.display())))?;

    let size = metadata.len();
    let limit = max_mb.saturating_mul(1024 * 1024);
    if size > limit {
        return Err(SofyError::InvalidInput(format!(
            "Video is {:.1} MB, over the {} MB Shorts limit",
            size as f64 / (1024.0 * 1024.0),
            max_mb
        )));
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stitch_without_clips_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = PassthroughEditor
            .stitch(&[], &dir.path().join("stitched.mp4"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No video clips provided for stitching"));
    }

    #[tokio::test]
    async fn test_stitch_copies_first_clip() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("clip_1.mp4");
        let b = dir.path().join("clip_2.mp4");
        std::fs::write(&a, b"first").unwrap();
        std::fs::write(&b, b"second").unwrap();

        let out = PassthroughEditor
            .stitch(&[a, b], &dir.path().join("stitched.mp4"))
            .await
            .unwrap();

        assert_eq!(std::fs::read(out).unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_subtitles_write_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("with_music.mp4");
        std::fs::write(&video, b"v").unwrap();
        let dest = dir.path().join("with_subtitles.mp4");

        PassthroughEditor
            .add_subtitles(&video, "Stand up. Move.", 4, &dest)
            .await
            .unwrap();

        let srt = std::fs::read_to_string(dir.path().join("with_subtitles.srt")).unwrap();
        assert!(srt.contains("00:00:02,000 --> 00:00:04,000\nMove."));
        assert!(dest.exists());
    }

    #[tokio::test]
    async fn test_render_final_name() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("in.mp4");
        std::fs::write(&video, b"v").unwrap();

        let out = PassthroughEditor
            .render_final(&video, &dir.path().join("out"), "mp4")
            .await
            .unwrap();

        assert_eq!(out, dir.path().join("out").join("final_video.mp4"));
    }

    #[test]
    fn test_validate_shorts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("final_video.mp4");
        assert!(validate_shorts(&path, 256).is_err());

        std::fs::write(&path, vec![0u8; 2 * 1024 * 1024]).unwrap();
        assert_eq!(validate_shorts(&path, 256).unwrap(), 2 * 1024 * 1024);
        assert!(validate_shorts(&path, 1).is_err());
    }

    #[test]
    fn test_validate_shorts_huge_limit_does_not_overflow() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("final_video.mp4");
        std::fs::write(&path, b"video").unwrap();
        assert_eq!(validate_shorts(&path, u64::MAX).unwrap(), 5);
    }
}

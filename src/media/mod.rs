//! Media editing seam.
//!
//! The pipeline only needs to move artifacts from one editing stage to the
//! next; actual encoding and muxing live behind the [`VideoEditor`] trait.

mod editor;
mod subtitles;

pub use editor::{validate_shorts, PassthroughEditor, DEFAULT_MAX_SHORTS_MB};
pub use subtitles::{format_srt, split_sentences, SubtitleCue};

use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Editing operations applied to generated clips.
#[async_trait]
pub trait VideoEditor: Send + Sync {
    /// Join clips in order into `dest`.
    async fn stitch(&self, clips: &[PathBuf], dest: &Path) -> Result<PathBuf>;

    /// Lay a voiceover track over `video`.
    async fn add_voiceover(&self, video: &Path, voiceover: &Path, dest: &Path) -> Result<PathBuf>;

    /// Mix a background track under `video`.
    async fn add_background_music(&self, video: &Path, music: &Path, dest: &Path) -> Result<PathBuf>;

    /// Attach subtitles for `script`, spread over `duration_secs`.
    async fn add_subtitles(&self, video: &Path, script: &str, duration_secs: u32, dest: &Path) -> Result<PathBuf>;

    /// Produce `final_video.<format>` in `output_dir`.
    async fn render_final(&self, video: &Path, output_dir: &Path, format: &str) -> Result<PathBuf>;
}

/// Frame raw little-endian PCM samples as a WAV file.
pub fn pcm_to_wav(pcm: &[u8], sample_rate: u32, channels: u16, bits_per_sample: u16) -> Vec<u8> {
    let block_align = channels * bits_per_sample / 8;
    let byte_rate = sample_rate * block_align as u32;
    let data_len = pcm.len() as u32;

    let mut wav = Vec::with_capacity(44 + pcm.len());
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());

    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.extend_from_slice(pcm);
    wav
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_header_fields() {
        let wav = pcm_to_wav(&[0u8; 480], 24_000, 1, 16);
        assert_eq!(wav.len(), 44 + 480);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes(wav[4..8].try_into().unwrap()), 36 + 480);
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(u32::from_le_bytes(wav[24..28].try_into().unwrap()), 24_000);
        // byte rate = 24000 * 2
        assert_eq!(u32::from_le_bytes(wav[28..32].try_into().unwrap()), 48_000);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32::from_le_bytes(wav[40..44].try_into().unwrap()), 480);
    }
}

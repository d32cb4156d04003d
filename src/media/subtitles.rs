//! Subtitle generation from a voiceover script (SRT).

/// One timed subtitle line.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleCue {
    pub text: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

/// Split a script into sentences, keeping terminal punctuation.
pub fn split_sentences(script: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for ch in script.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            let sentence = current.trim();
            if !sentence.is_empty() && sentence.chars().any(char::is_alphanumeric) {
                sentences.push(sentence.to_string());
            }
            current.clear();
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Spread the script's sentences evenly over `duration_secs`.
pub fn cues_for_script(script: &str, duration_secs: u32) -> Vec<SubtitleCue> {
    let sentences = split_sentences(script);
    if sentences.is_empty() || duration_secs == 0 {
        return Vec::new();
    }

    let slot = duration_secs as f64 / sentences.len() as f64;
    sentences
        .into_iter()
        .enumerate()
        .map(|(i, text)| SubtitleCue {
            text,
            start_seconds: i as f64 * slot,
            end_seconds: (i + 1) as f64 * slot,
        })
        .collect()
}

/// Format cues as SRT (SubRip).
pub fn format_srt(cues: &[SubtitleCue]) -> String {
    let mut output = String::new();

    for (i, cue) in cues.iter().enumerate() {
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_timestamp(cue.start_seconds),
            format_srt_timestamp(cue.end_seconds)
        ));
        output.push_str(&cue.text);
        output.push_str("\n\n");
    }

    output
}

/// Format timestamp for SRT (00:00:00,000).
fn format_srt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let ms = total_ms % 1000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sentences() {
        assert_eq!(
            split_sentences("Get up. Keep going! Why stop? Never"),
            vec!["Get up.", "Keep going!", "Why stop?", "Never"]
        );
        assert!(split_sentences("  ").is_empty());
    }

    #[test]
    fn test_cues_cover_duration() {
        let cues = cues_for_script("One. Two. Three. Four.", 10);
        assert_eq!(cues.len(), 4);
        assert_eq!(cues[0].start_seconds, 0.0);
        assert_eq!(cues[1].start_seconds, 2.5);
        assert_eq!(cues[3].end_seconds, 10.0);
    }

    #[test]
    fn test_format_srt() {
        let srt = format_srt(&cues_for_script("Hello world. This is a test.", 5));
        assert!(srt.contains("1\n00:00:00,000 --> 00:00:02,500\nHello world."));
        assert!(srt.contains("2\n00:00:02,500 --> 00:00:05,000\nThis is a test."));
    }

    #[test]
    fn test_srt_timestamp() {
        assert_eq!(format_srt_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_srt_timestamp(61.5), "00:01:01,500");
        assert_eq!(format_srt_timestamp(3661.123), "01:01:01,123");
    }
}

//! Prompt templates for clip, script and music generation.

use super::video::{PromptType, VideoConfig};
use crate::services::TextAdapter;
use tracing::{info, warn};

/// Prompts for one niche.
pub trait PromptTemplate: Send + Sync {
    /// Base clip prompts for the configuration, cycled to `count`.
    fn video_prompts(&self, config: &VideoConfig, count: usize) -> Vec<String>;

    /// Prompt for the voiceover script.
    fn script_prompt(&self, config: &VideoConfig) -> String {
        format!(
            "Write a {duration}-second motivational voiceover script about {theme} with a focus on {topic}.\n\
             The tone should be {tone} and the emotion should be {emotion}.\n\
             The script should be inspiring and suitable for a {niche} audience.\n\
             Keep it concise and impactful, with approximately {sentences} sentences.\n\
             Do not include any timestamps or audio directions.",
            duration = config.duration,
            theme = config.theme,
            topic = config.prompt.topic,
            tone = config.prompt.tone,
            emotion = config.prompt.emotion,
            niche = config.niche,
            sentences = config.duration / 5,
        )
    }

    /// Prompt for the background music track.
    fn music_prompt(&self, config: &VideoConfig) -> String {
        format!(
            "Generate a {mood} background music track with a {tempo} tempo.\n\
             The music should complement a {niche} video about {theme}.\n\
             The duration should be approximately {duration} seconds.",
            mood = config.music.mood,
            tempo = config.music.tempo,
            niche = config.niche,
            theme = config.theme,
            duration = config.duration,
        )
    }
}

/// Templates for motivational videos. Also the default for unknown niches.
#[derive(Debug, Default, Clone, Copy)]
pub struct MotivationalTemplate;

impl PromptTemplate for MotivationalTemplate {
    fn video_prompts(&self, config: &VideoConfig, count: usize) -> Vec<String> {
        let style = &config.style;
        let templates = [
            format!("High-energy {style} montage: Diverse individuals consistently mastering challenging daily routines (exercise, study, craft) from dawn till dusk, showcasing discipline building momentum towards a powerful, inspirational sunrise."),
            format!("Visually stunning, rapid-cut {style} sequence illustrating small, consistent daily actions compounding into monumental personal growth, with dynamic transitions and an uplifting score conveying unstoppable progress."),
            format!("Dramatic {style} video: A high-energy journey depicting initial struggles and setbacks overcome through unwavering discipline and consistency, leading to breakthrough moments and a triumphant, inspiring conclusion."),
            format!("Inspirational {style} clip: Abstract representations of a growth mindset manifesting through consistent, disciplined effort, evolving from raw potential to refined strength, with dynamic light and powerful visuals."),
            format!("High-energy {style} portrayal of an athlete's intense, consistent training (morning runs, gym reps, skill practice) through all conditions, showcasing how discipline and repetition forge peak performance."),
            format!("Visually appealing, high-energy {style} short: A creator (artist, musician, coder) practicing their craft daily, demonstrating the quiet discipline required to transform raw talent into mastery, with progression shots."),
            "Dynamic, high-energy montage: Diverse individuals engaged in disciplined, consistent effort (learning, building, working out), visually transitioning from focused struggle to powerful, confident achievement.".to_string(),
            format!("{style}, high-energy sequence: Characters making disciplined choices daily, pushing past comfort zones with consistent effort, culminating in a powerful, self-assured stance against a challenging backdrop."),
            "Time-lapse transformation: A seed growing into a mighty tree, intercut with a person practicing a skill over months, emphasizing gradual, consistent effort yielding magnificent growth.".to_string(),
            "\"Small Wins Big\": Rapid-fire montage of small, consistent actions (one push-up, one page read, one line of code) accumulating into massive, visually impressive results.".to_string(),
        ];

        templates.iter().cycle().take(count).cloned().collect()
    }
}

/// Select the template for a niche.
pub fn template_for(niche: &str) -> Box<dyn PromptTemplate> {
    match niche.to_lowercase().as_str() {
        "motivational" => Box::new(MotivationalTemplate),
        _ => Box::new(MotivationalTemplate),
    }
}

/// Builds prompts for a job, using the text model for dynamic variations.
#[derive(Clone)]
pub struct PromptGenerator {
    text: TextAdapter,
}

impl PromptGenerator {
    pub fn new(text: TextAdapter) -> Self {
        Self { text }
    }

    /// Produce exactly `count` clip prompts.
    pub async fn video_prompts(&self, config: &VideoConfig, count: usize) -> Vec<String> {
        info!("Generating {} video prompts for {} niche", count, config.niche);
        let template = template_for(&config.niche);

        if config.prompt.prompt_type == PromptType::Static {
            return template.video_prompts(config, count);
        }

        let base = template.video_prompts(config, 1).pop().unwrap_or_default();
        let request = format!(
            "I need {count} different video prompt variations based on the following theme:\n\
             \"{base}\"\n\n\
             Each prompt should be unique but related to the main theme of {theme} with a focus on {topic}.\n\
             The tone should be {tone} and the emotion should be {emotion}.\n\
             Format the response as a numbered list with each prompt on a new line.\n\
             Keep each prompt concise and specific for video generation.",
            theme = config.theme,
            topic = config.prompt.topic,
            tone = config.prompt.tone,
            emotion = config.prompt.emotion,
        );

        match self.text.generate_list(&request, count).await {
            Ok(prompts) if prompts.len() >= count => prompts,
            Ok(prompts) => {
                warn!(
                    "Only {} of {} prompts generated, falling back to templates",
                    prompts.len(),
                    count
                );
                template.video_prompts(config, count)
            }
            Err(e) => {
                warn!("Error generating dynamic prompts, falling back to templates: {}", e);
                template.video_prompts(config, count)
            }
        }
    }

    pub fn script_prompt(&self, config: &VideoConfig) -> String {
        template_for(&config.niche).script_prompt(config)
    }

    pub fn music_prompt(&self, config: &VideoConfig) -> String {
        template_for(&config.niche).music_prompt(config)
    }

    /// Script used when the text model is unavailable.
    pub fn fallback_script(config: &VideoConfig) -> String {
        format!(
            "Here's a motivational message about {} focused on {}.",
            config.theme, config.prompt.topic
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyRotator;
    use crate::services::{RetryPolicy, ServiceError, TextBackend};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FixedText(Result<String, ServiceError>);

    #[async_trait]
    impl TextBackend for FixedText {
        async fn generate(&self, _api_key: &str, _prompt: &str) -> Result<String, ServiceError> {
            self.0.clone()
        }
    }

    fn generator(response: Result<String, ServiceError>) -> PromptGenerator {
        let rotator = Arc::new(KeyRotator::new(vec!["k".into()]).unwrap());
        PromptGenerator::new(TextAdapter::new(
            Arc::new(FixedText(response)),
            rotator,
            RetryPolicy::immediate(2),
        ))
    }

    fn dynamic_config() -> VideoConfig {
        let mut config = VideoConfig::sample();
        config.prompt.prompt_type = PromptType::Dynamic;
        config
    }

    #[test]
    fn test_templates_cycle() {
        let prompts = MotivationalTemplate.video_prompts(&VideoConfig::sample(), 12);
        assert_eq!(prompts.len(), 12);
        assert_eq!(prompts[0], prompts[10]);
        assert!(prompts[0].contains("cinematic"));
    }

    #[test]
    fn test_script_prompt_wording() {
        let prompt = MotivationalTemplate.script_prompt(&VideoConfig::sample());
        assert!(prompt.starts_with(
            "Write a 15-second motivational voiceover script about overcoming obstacles with a focus on perseverance."
        ));
        assert!(prompt.contains("approximately 3 sentences"));
    }

    #[test]
    fn test_music_prompt_wording() {
        let prompt = MotivationalTemplate.music_prompt(&VideoConfig::sample());
        assert!(prompt.starts_with("Generate a uplifting background music track with a medium tempo."));
        assert!(prompt.contains("approximately 15 seconds"));
    }

    #[tokio::test]
    async fn test_dynamic_prompts_parsed() {
        let generator = generator(Ok("1. Dawn run\n2. Night study\n3. Summit climb".into()));
        let prompts = generator.video_prompts(&dynamic_config(), 3).await;
        assert_eq!(prompts, vec!["Dawn run", "Night study", "Summit climb"]);
    }

    #[tokio::test]
    async fn test_dynamic_short_response_falls_back() {
        let generator = generator(Ok("1. Only one".into()));
        let config = dynamic_config();
        let prompts = generator.video_prompts(&config, 3).await;
        assert_eq!(prompts, MotivationalTemplate.video_prompts(&config, 3));
    }

    #[tokio::test]
    async fn test_dynamic_failure_falls_back() {
        let generator = generator(Err(ServiceError::Unavailable("down".into())));
        let prompts = generator.video_prompts(&dynamic_config(), 2).await;
        assert_eq!(prompts.len(), 2);
    }

    #[test]
    fn test_fallback_script() {
        assert_eq!(
            PromptGenerator::fallback_script(&VideoConfig::sample()),
            "Here's a motivational message about overcoming obstacles focused on perseverance."
        );
    }
}

//! Gemini REST backends (text, speech, Veo video).

use super::speech::{SpeechBackend, SpeechRequest};
use super::text::TextBackend;
use super::video::{ClipRequest, OperationStatus, VideoBackend};
use super::ServiceError;
use crate::config::Settings;
use crate::error::Result;
use crate::media::pcm_to_wav;
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// TTS audio is raw PCM at this format.
const TTS_SAMPLE_RATE: u32 = 24_000;
const TTS_CHANNELS: u16 = 1;
const TTS_BITS_PER_SAMPLE: u16 = 16;

/// Client for the Gemini generative language API.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    text_model: String,
    tts_model: String,
    video_model: String,
}

impl GeminiClient {
    /// Create a client against `base_url` with the given models.
    pub fn new(
        base_url: &str,
        text_model: &str,
        tts_model: &str,
        video_model: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            text_model: text_model.to_string(),
            tts_model: tts_model.to_string(),
            video_model: video_model.to_string(),
        })
    }

    /// Create a client from the `[gemini]` and `[text]` settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            &settings.gemini.base_url,
            &settings.text.model,
            &settings.gemini.tts_model,
            &settings.gemini.video_model,
            Duration::from_secs(settings.gemini.request_timeout_secs),
        )
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.base_url, model, method)
    }

    /// POST a JSON body and decode the JSON response.
    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        api_key: &str,
        url: &str,
        body: &Value,
    ) -> std::result::Result<T, ServiceError> {
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        decode_response(response).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        api_key: &str,
        url: &str,
    ) -> std::result::Result<T, ServiceError> {
        let response = self
            .http
            .get(url)
            .header("x-goog-api-key", api_key)
            .send()
            .await
            .map_err(transport_error)?;
        decode_response(response).await
    }
}

#[async_trait]
impl TextBackend for GeminiClient {
    async fn generate(&self, api_key: &str, prompt: &str) -> std::result::Result<String, ServiceError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });
        let response: GenerateContentResponse = self
            .post_json(api_key, &self.model_url(&self.text_model, "generateContent"), &body)
            .await?;
        Ok(response.text())
    }
}

#[async_trait]
impl SpeechBackend for GeminiClient {
    async fn synthesize(&self, api_key: &str, request: &SpeechRequest) -> std::result::Result<Vec<u8>, ServiceError> {
        let body = speech_body(request);
        let response: GenerateContentResponse = self
            .post_json(api_key, &self.model_url(&self.tts_model, "generateContent"), &body)
            .await?;

        let Some(encoded) = response.inline_data() else {
            return Ok(Vec::new());
        };
        let pcm = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| ServiceError::Unavailable(format!("invalid audio payload: {}", e)))?;
        Ok(pcm_to_wav(&pcm, TTS_SAMPLE_RATE, TTS_CHANNELS, TTS_BITS_PER_SAMPLE))
    }
}

#[async_trait]
impl VideoBackend for GeminiClient {
    async fn submit(&self, api_key: &str, request: &ClipRequest) -> std::result::Result<String, ServiceError> {
        let body = json!({
            "instances": [{ "prompt": request.prompt }],
            "parameters": {
                "aspectRatio": request.aspect_ratio(),
                "durationSeconds": request.duration_secs,
            }
        });
        let operation: Operation = self
            .post_json(api_key, &self.model_url(&self.video_model, "predictLongRunning"), &body)
            .await?;
        debug!("Started video operation {}", operation.name);
        Ok(operation.name)
    }

    async fn poll(&self, api_key: &str, operation: &str) -> std::result::Result<OperationStatus, ServiceError> {
        let url = format!("{}/v1beta/{}", self.base_url, operation);
        let operation: Operation = self.get_json(api_key, &url).await?;
        Ok(operation.status())
    }

    async fn download(&self, api_key: &str, uri: &str) -> std::result::Result<Vec<u8>, ServiceError> {
        let url = url::Url::parse(uri).map_err(|e| ServiceError::Fatal(format!("invalid video URI {}: {}", uri, e)))?;
        let response = self
            .http
            .get(url)
            .header("x-goog-api-key", api_key)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::classify(Some(status.as_u16()), api_error_message(&body)));
        }
        let bytes = response.bytes().await.map_err(transport_error)?;
        Ok(bytes.to_vec())
    }
}

fn speech_body(request: &SpeechRequest) -> Value {
    let speech_config = match request {
        SpeechRequest::Single { voice, .. } => json!({
            "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": voice } }
        }),
        SpeechRequest::MultiSpeaker { speakers, .. } => {
            let configs: Vec<Value> = speakers
                .iter()
                .map(|(speaker, voice)| {
                    json!({
                        "speaker": speaker,
                        "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": voice } }
                    })
                })
                .collect();
            json!({ "multiSpeakerVoiceConfig": { "speakerVoiceConfigs": configs } })
        }
    };

    json!({
        "contents": [{ "parts": [{ "text": request.text() }] }],
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": speech_config,
        }
    })
}

fn transport_error(e: reqwest::Error) -> ServiceError {
    ServiceError::classify(e.status().map(|s| s.as_u16()), e.to_string())
}

async fn decode_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> std::result::Result<T, ServiceError> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
        return Err(ServiceError::classify(Some(status.as_u16()), api_error_message(&body)));
    }

    serde_json::from_str(&body).map_err(|e| ServiceError::Unavailable(format!("unexpected response: {}", e)))
}

/// Pull `error.message` (and status) out of an API error body.
fn api_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        error: ApiError,
    }

    match serde_json::from_str::<Envelope>(body) {
        Ok(Envelope { error }) => match error.status {
            Some(status) => format!("{}: {}", status, error.message),
            None => error.message,
        },
        Err(_) => body.chars().take(500).collect(),
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

impl GenerateContentResponse {
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter())
            .into_iter()
            .flatten()
    }

    fn text(&self) -> String {
        self.parts().filter_map(|p| p.text.as_deref()).collect()
    }

    fn inline_data(&self) -> Option<&str> {
        self.parts().find_map(|p| p.inline_data.as_ref().map(|d| d.data.as_str()))
    }
}

#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<ApiError>,
    #[serde(default)]
    response: Option<Value>,
}

impl Operation {
    fn status(&self) -> OperationStatus {
        if !self.done {
            return OperationStatus::Pending;
        }
        if let Some(error) = &self.error {
            return OperationStatus::Failed(error.message.clone());
        }

        let uri = self
            .response
            .as_ref()
            .and_then(|r| r.pointer("/generateVideoResponse/generatedSamples/0/video/uri"))
            .and_then(Value::as_str);

        match uri {
            Some(uri) => OperationStatus::Done {
                video_uri: uri.to_string(),
            },
            None => OperationStatus::Failed("operation finished without a generated video".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Keep "},{"text":"going."}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response.text(), "Keep going.");
    }

    #[test]
    fn test_inline_audio_extracted() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"inlineData":{"mimeType":"audio/L16","data":"AAA="}}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response.inline_data(), Some("AAA="));
        assert!(GenerateContentResponse::default().inline_data().is_none());
    }

    #[test]
    fn test_operation_status() {
        let pending: Operation = serde_json::from_str(r#"{"name":"operations/1"}"#).unwrap();
        assert_eq!(pending.status(), OperationStatus::Pending);

        let done: Operation = serde_json::from_str(
            r#"{"name":"operations/1","done":true,"response":{"generateVideoResponse":{"generatedSamples":[{"video":{"uri":"https://x/v.mp4"}}]}}}"#,
        )
        .unwrap();
        assert_eq!(
            done.status(),
            OperationStatus::Done {
                video_uri: "https://x/v.mp4".into()
            }
        );

        let failed: Operation =
            serde_json::from_str(r#"{"name":"operations/1","done":true,"error":{"message":"blocked"}}"#).unwrap();
        assert_eq!(failed.status(), OperationStatus::Failed("blocked".into()));
    }

    #[test]
    fn test_quota_error_body_is_rate_limited() {
        let body = r#"{"error":{"code":429,"message":"You exceeded your current quota","status":"RESOURCE_EXHAUSTED"}}"#;
        let message = api_error_message(body);
        assert_eq!(message, "RESOURCE_EXHAUSTED: You exceeded your current quota");
        assert!(ServiceError::classify(Some(400), message).is_rate_limited());
    }

    #[test]
    fn test_multi_speaker_body() {
        let speakers: BTreeMap<String, String> = [("Coach".to_string(), "Kore".to_string())].into_iter().collect();
        let body = speech_body(&SpeechRequest::MultiSpeaker {
            text: "Coach: Go".into(),
            speakers,
        });
        assert_eq!(
            body.pointer("/generationConfig/speechConfig/multiSpeakerVoiceConfig/speakerVoiceConfigs/0/voiceConfig/prebuiltVoiceConfig/voiceName"),
            Some(&json!("Kore"))
        );
        assert_eq!(body.pointer("/generationConfig/responseModalities/0"), Some(&json!("AUDIO")));
    }
}

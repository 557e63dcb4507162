//! Request and response bodies for DashScope multimodal generation (TTS).
//!
//! ```json
//! {
//!   "model": "qwen3-tts-flash",
//!   "input": { "text": "你好", "voice": "Cherry", "language_type": "Chinese" }
//! }
//! ```
//!
//! The response carries the audio either as a download URL or inline base64,
//! under `output.audio.{url,data}` or the flat `output.audio_{url,data}`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct SynthesisRequest<'a> {
    pub model: &'a str,
    pub input: SynthesisInput<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SynthesisInput<'a> {
    pub text: &'a str,
    pub voice: &'a str,
    pub language_type: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SynthesisResponse {
    pub output: Option<SynthesisOutput>,
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SynthesisOutput {
    pub audio: Option<AudioPayload>,
    pub audio_url: Option<String>,
    pub audio_data: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AudioPayload {
    pub url: Option<String>,
    pub data: Option<String>,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DashScopeErrorResponse {
    pub code: Option<String>,
    pub message: Option<String>,
    pub request_id: Option<String>,
}

/// Where the synthesized audio can be obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    Url(String),
    Inline(String),
}

impl SynthesisResponse {
    /// Pick the audio source, preferring a URL over inline data.
    pub fn audio_source(&self) -> Option<AudioSource> {
        let output = self.output.as_ref()?;
        let nested = output.audio.as_ref();

        let url = nested
            .and_then(|a| a.url.as_deref())
            .or(output.audio_url.as_deref())
            .filter(|u| !u.is_empty());
        if let Some(url) = url {
            return Some(AudioSource::Url(url.to_string()));
        }

        nested
            .and_then(|a| a.data.as_deref())
            .or(output.audio_data.as_deref())
            .filter(|d| !d.is_empty())
            .map(|d| AudioSource::Inline(d.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let body = SynthesisRequest {
            model: "qwen3-tts-flash",
            input: SynthesisInput {
                text: "你好",
                voice: "Cherry",
                language_type: "Chinese",
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["input"]["voice"], "Cherry");
        assert_eq!(json["input"]["language_type"], "Chinese");
    }

    #[test]
    fn test_audio_source_nested_url() {
        let resp: SynthesisResponse = serde_json::from_str(
            r#"{"output":{"audio":{"url":"https://x/a.wav","data":""}},"request_id":"r1"}"#,
        )
        .unwrap();
        assert_eq!(resp.audio_source(), Some(AudioSource::Url("https://x/a.wav".into())));
        assert_eq!(resp.request_id.as_deref(), Some("r1"));
    }

    #[test]
    fn test_audio_source_flat_fields() {
        let resp: SynthesisResponse =
            serde_json::from_str(r#"{"output":{"audio_data":"UklGRg=="}}"#).unwrap();
        assert_eq!(resp.audio_source(), Some(AudioSource::Inline("UklGRg==".into())));

        let resp: SynthesisResponse =
            serde_json::from_str(r#"{"output":{"audio_url":"https://x/b.mp3"}}"#).unwrap();
        assert_eq!(resp.audio_source(), Some(AudioSource::Url("https://x/b.mp3".into())));
    }

    #[test]
    fn test_audio_source_missing() {
        let resp: SynthesisResponse = serde_json::from_str(r#"{"output":{}}"#).unwrap();
        assert_eq!(resp.audio_source(), None);
        let resp: SynthesisResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(resp.audio_source(), None);
    }

    #[test]
    fn test_error_body() {
        let err: DashScopeErrorResponse = serde_json::from_str(
            r#"{"code":"InvalidApiKey","message":"Invalid API-key provided."}"#,
        )
        .unwrap();
        assert_eq!(err.code.as_deref(), Some("InvalidApiKey"));
    }
}

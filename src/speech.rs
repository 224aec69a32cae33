use std::sync::LazyLock;

use async_trait::async_trait;
use base64::Engine as _;
use regex::Regex;

use crate::config::VoiceGender;
use crate::error::ChatError;
use crate::gemini::{
    self, Content, GenerateRequest, GenerationConfig, PrebuiltVoiceConfig, SpeechConfig,
    VoiceConfig,
};

const TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// Narration text is cut to this many characters before synthesis.
pub const MAX_SPEECH_CHARS: usize = 4000;

static MARKDOWN_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[#*_`~>]").expect("Invalid markdown regex"));
static LINK_MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*?\]\(.*?\)").expect("Invalid link regex"));
static BARE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("Invalid URL regex"));

/// Strip markdown punctuation, link markup and bare URLs so the narrator
/// reads prose only.
pub fn clean_for_speech(text: &str) -> String {
    let text = MARKDOWN_PUNCT.replace_all(text, "");
    let text = LINK_MARKUP.replace_all(&text, "");
    let text = BARE_URL.replace_all(&text, "");
    text.trim().chars().take(MAX_SPEECH_CHARS).collect()
}

pub fn voice_name(voice: VoiceGender) -> &'static str {
    match voice {
        VoiceGender::Female => "Kore",
        VoiceGender::Male => "Fenrir",
    }
}

#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Raw s16le PCM for `text`, or `None` when the voice produced nothing.
    async fn synthesize(&self, text: &str, voice: VoiceGender) -> Result<Option<Vec<u8>>, ChatError>;
}

/// Run the collaborator and fold every failure into `None`.
pub async fn synthesize(service: &dyn SpeechService, text: &str, voice: VoiceGender) -> Option<Vec<u8>> {
    match service.synthesize(text, voice).await {
        Ok(Some(bytes)) if !bytes.is_empty() => Some(bytes),
        Ok(_) => {
            log::warn!("Speech synthesis returned no audio");
            None
        }
        Err(e) => {
            log::warn!("Speech synthesis failed: {e}");
            None
        }
    }
}

/// Gemini TTS. Output is 24 kHz mono 16-bit PCM.
pub struct GeminiSpeech {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiSpeech {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: gemini::API_BASE.to_string(),
        }
    }

    /// Point at a different models endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_request(text: &str, voice: VoiceGender) -> GenerateRequest {
        GenerateRequest {
            system_instruction: None,
            contents: vec![Content::text(clean_for_speech(text))],
            tools: Vec::new(),
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice_name(voice).to_string(),
                        },
                    },
                }),
                ..Default::default()
            },
        }
    }
}

#[async_trait]
impl SpeechService for GeminiSpeech {
    async fn synthesize(&self, text: &str, voice: VoiceGender) -> Result<Option<Vec<u8>>, ChatError> {
        let body = Self::build_request(text, voice);
        let resp = gemini::generate_content(&self.client, &self.base_url, TTS_MODEL, &self.api_key, &body)
            .await?;

        let Some(data) = resp.inline_data() else {
            return Ok(None);
        };
        let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = base64::engine::general_purpose::STANDARD.decode(compact)?;
        Ok(Some(bytes))
    }
}

//! In-memory collaborators and a ready-made [`AppState`] for tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::state::{AppEvent, AppState, Collaborators};
use crate::config::{Config, VoiceGender};
use crate::error::ChatError;
use crate::imaging::ImageService;
use crate::playback::mock::{self, SharedLog};
use crate::reasoning::{ReasoningReply, ReasoningRequest, ReasoningService};
use crate::session::{GroundingSource, SessionStore};
use crate::speech::SpeechService;

#[derive(Default)]
pub struct MockReasoning {
    pub requests: Mutex<Vec<ReasoningRequest>>,
    pub fail: AtomicBool,
    pub panic: AtomicBool,
}

#[async_trait]
impl ReasoningService for MockReasoning {
    async fn generate(&self, request: ReasoningRequest) -> Result<ReasoningReply, ChatError> {
        if self.panic.load(Ordering::SeqCst) {
            panic!("reasoning backend exploded");
        }
        let prompt = request.prompt.clone();
        self.requests.lock().unwrap().push(request);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ChatError::MissingApiKey);
        }
        Ok(ReasoningReply {
            text: format!("answer to: {prompt}"),
            sources: vec![
                GroundingSource {
                    title: "First".into(),
                    uri: "https://first.example".into(),
                },
                GroundingSource {
                    title: "Second".into(),
                    uri: "https://second.example".into(),
                },
            ],
        })
    }
}

pub struct MockSpeech {
    pub calls: AtomicUsize,
    pub silent: AtomicBool,
    pub panic: AtomicBool,
    pub payload: Mutex<Vec<u8>>,
}

impl Default for MockSpeech {
    fn default() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            silent: AtomicBool::new(false),
            panic: AtomicBool::new(false),
            // Two mono frames: 0.0 and 0.5.
            payload: Mutex::new(vec![0x00, 0x00, 0x00, 0x40]),
        }
    }
}

#[async_trait]
impl SpeechService for MockSpeech {
    async fn synthesize(&self, _text: &str, _voice: VoiceGender) -> Result<Option<Vec<u8>>, ChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic.load(Ordering::SeqCst) {
            panic!("speech backend exploded");
        }
        if self.silent.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(Some(self.payload.lock().unwrap().clone()))
    }
}

pub struct MockImages;

#[async_trait]
impl ImageService for MockImages {
    async fn generate(&self, _endpoint: &str, _prompt: &str) -> Result<Option<String>, ChatError> {
        Ok(Some("https://img.local/cat.png".to_string()))
    }
}

pub struct Harness {
    pub state: AppState,
    pub events: async_channel::Receiver<AppEvent>,
    pub reasoning: Arc<MockReasoning>,
    pub speech: Arc<MockSpeech>,
    pub device: SharedLog,
    pub dir: tempfile::TempDir,
}

/// Build an [`AppState`] backed by mocks and a temporary data directory.
/// Must be called from within a tokio runtime.
pub fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::open(dir.path().join("sessions.json"));
    let reasoning = Arc::new(MockReasoning::default());
    let speech = Arc::new(MockSpeech::default());
    let collaborators = Collaborators {
        reasoning: reasoning.clone(),
        speech: speech.clone(),
        images: Arc::new(MockImages),
    };
    let (audio, device) = mock::pipeline();
    let (sender, events) = async_channel::unbounded();

    let state = AppState::new(
        Config::default(),
        dir.path().join("config.json"),
        store,
        collaborators,
        audio,
        tokio::runtime::Handle::current(),
        sender,
    );

    Harness {
        state,
        events,
        reasoning,
        speech,
        device,
        dir,
    }
}

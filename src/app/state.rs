use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::imaging::{HttpImageService, ImageService};
use crate::playback::{AudioPipeline, MessageRef};
use crate::reasoning::{GeminiReasoning, ProxyReasoning, ReasoningService};
use crate::session::{Message, SessionStore};
use crate::speech::{GeminiSpeech, SpeechService};
use crate::ui::Command;

/// Events delivered to the owner of [`AppState`]. Background tasks never
/// touch sessions directly; they report back through this channel.
pub enum AppEvent {
    Command(Command),
    ResponseReady {
        session_id: String,
        message: Message,
    },
    ResponseFailed {
        session_id: String,
        error: String,
    },
    SpeechReady {
        target: MessageRef,
        audio: Option<Vec<u8>>,
    },
    PlaybackFinished {
        generation: u64,
    },
}

/// Conversation request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppStatus {
    Idle,
    Loading,
    Error,
}

/// Remote services the client talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub reasoning: Arc<dyn ReasoningService>,
    pub speech: Arc<dyn SpeechService>,
    pub images: Arc<dyn ImageService>,
}

impl Collaborators {
    pub fn from_config(config: &Config) -> Self {
        let client = reqwest::Client::new();
        let api_key = config.api_key();

        let reasoning: Arc<dyn ReasoningService> = if config.reasoning_endpoint.trim().is_empty() {
            Arc::new(GeminiReasoning::new(client.clone(), api_key.clone()))
        } else {
            log::info!("Using research proxy at {}", config.reasoning_endpoint);
            Arc::new(ProxyReasoning::new(
                client.clone(),
                config.reasoning_endpoint.trim(),
            ))
        };

        Self {
            reasoning,
            speech: Arc::new(GeminiSpeech::new(client.clone(), api_key)),
            images: Arc::new(HttpImageService::new(client)),
        }
    }
}

/// Central application state, owned by the event loop.
pub struct AppState {
    pub status: AppStatus,
    pub config: Config,
    pub config_path: PathBuf,
    pub store: SessionStore,
    pub audio: AudioPipeline,
    pub collaborators: Collaborators,
    pub runtime: tokio::runtime::Handle,
    pub backend_sender: async_channel::Sender<AppEvent>,
    /// Narration requested while this message was still synthesizing.
    pub pending_play: Option<MessageRef>,
}

impl AppState {
    pub fn new(
        config: Config,
        config_path: PathBuf,
        store: SessionStore,
        collaborators: Collaborators,
        audio: AudioPipeline,
        runtime: tokio::runtime::Handle,
        sender: async_channel::Sender<AppEvent>,
    ) -> Self {
        Self {
            status: AppStatus::Idle,
            config,
            config_path,
            store,
            audio,
            collaborators,
            runtime,
            backend_sender: sender,
            pending_play: None,
        }
    }

    pub fn update_status(&mut self, status: AppStatus) {
        if self.status != status {
            log::debug!("Status {:?} -> {status:?}", self.status);
        }
        self.status = status;
    }

    /// Rewrite the session blob; failures are logged, not raised.
    pub fn persist_sessions(&self) {
        if let Err(e) = self.store.save() {
            log::warn!("Failed to save sessions: {e}");
        }
    }

    pub fn persist_config(&self) {
        if let Err(e) = self.config.save_to(&self.config_path) {
            log::warn!("Failed to save config: {e}");
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ChatError;
use crate::pcm::AudioBuffer;

pub const DEFAULT_TITLE: &str = "New Search Inquiry";

pub const GREETING: &str = "Hello. I am OmniSearch. I can research facts using Google Search, \
apply logic frameworks, or visualize concepts. What can I investigate for you today?";

/// Session titles taken from the first prompt are cut to this many characters.
pub const TITLE_MAX_CHARS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A citation returned by the reasoning collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub title: String,
    pub uri: String,
}

/// Narration cache for one message. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum AudioState {
    #[default]
    NoAudio,
    Synthesizing,
    Ready(Arc<AudioBuffer>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<GroundingSource>,
    #[serde(skip)]
    pub audio: AudioState,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            images: Vec::new(),
            sources: Vec::new(),
            audio: AudioState::NoAudio,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn with_sources(mut self, sources: Vec<GroundingSource>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    /// Unix milliseconds.
    pub last_modified: i64,
}

/// Ordered session list (most recent first) plus the active selection.
///
/// Every mutation is followed by a full rewrite of the session blob by the
/// caller; there is no incremental persistence.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    sessions: Vec<ChatSession>,
    current_session_id: Option<String>,
    last_issued_id: i64,
}

impl SessionStore {
    /// ~/.local/share/omnisearch/sessions.json
    pub fn default_path() -> PathBuf {
        let mut p = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("omnisearch");
        p.push("sessions.json");
        p
    }

    /// Read the persisted session list. Absent or malformed data yields an
    /// empty list.
    pub fn load(path: &Path) -> Vec<ChatSession> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str(&data) {
            Ok(sessions) => sessions,
            Err(e) => {
                log::warn!("Discarding unreadable session store {}: {e}", path.display());
                Vec::new()
            }
        }
    }

    /// Load the store, synthesising a default session when nothing usable was
    /// persisted. The first session becomes the active one.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let sessions = Self::load(&path);
        let last_issued_id = sessions
            .iter()
            .filter_map(|s| s.id.parse::<i64>().ok())
            .max()
            .unwrap_or(0);
        let current_session_id = sessions.first().map(|s| s.id.clone());

        let mut store = Self {
            path,
            sessions,
            current_session_id,
            last_issued_id,
        };

        if store.sessions.is_empty() {
            store.create_session();
            if let Err(e) = store.save() {
                log::warn!("Failed to save sessions: {e}");
            }
        }
        store
    }

    pub fn serialize(sessions: &[ChatSession]) -> Result<String, ChatError> {
        Ok(serde_json::to_string_pretty(sessions)?)
    }

    /// Overwrite the persisted blob with the full session list.
    pub fn save(&self) -> Result<(), ChatError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, Self::serialize(&self.sessions)?)?;
        Ok(())
    }

    /// Insert a fresh session with the greeting at the front and select it.
    pub fn create_session(&mut self) -> String {
        let now = Utc::now().timestamp_millis();
        let id = now.max(self.last_issued_id + 1);
        self.last_issued_id = id;

        let session = ChatSession {
            id: id.to_string(),
            title: DEFAULT_TITLE.to_string(),
            messages: vec![Message::assistant(GREETING)],
            last_modified: now,
        };
        log::info!("Created session {}", session.id);

        self.current_session_id = Some(session.id.clone());
        self.sessions.insert(0, session);
        id.to_string()
    }

    /// Append `messages` to the session and bump `last_modified`.
    ///
    /// `title_override` only applies while the session holds at most the
    /// greeting.
    pub fn append_messages(
        &mut self,
        session_id: &str,
        messages: Vec<Message>,
        title_override: Option<&str>,
    ) -> Result<(), ChatError> {
        let session = self.session_mut(session_id)?;
        if let Some(title) = title_override {
            if session.messages.len() <= 1 {
                session.title = title.chars().take(TITLE_MAX_CHARS).collect();
            }
        }
        session.messages.extend(messages);
        session.last_modified = Utc::now().timestamp_millis();
        Ok(())
    }

    /// Replace the narration state of one message in place.
    pub fn set_audio(&mut self, session_id: &str, index: usize, audio: AudioState) -> Result<(), ChatError> {
        let session = self.session_mut(session_id)?;
        let message = session
            .messages
            .get_mut(index)
            .ok_or_else(|| ChatError::MessageNotFound {
                session_id: session_id.to_string(),
                index,
            })?;
        message.audio = audio;
        Ok(())
    }

    pub fn select(&mut self, session_id: &str) -> Result<(), ChatError> {
        if self.session(session_id).is_none() {
            return Err(ChatError::SessionNotFound(session_id.to_string()));
        }
        self.current_session_id = Some(session_id.to_string());
        Ok(())
    }

    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn session(&self, session_id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == session_id)
    }

    fn session_mut(&mut self, session_id: &str) -> Result<&mut ChatSession, ChatError> {
        self.sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| ChatError::SessionNotFound(session_id.to_string()))
    }

    pub fn message(&self, session_id: &str, index: usize) -> Option<&Message> {
        self.session(session_id)?.messages.get(index)
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current_session_id.as_deref()
    }

    pub fn current(&self) -> Option<&ChatSession> {
        self.session(self.current_id()?)
    }
}

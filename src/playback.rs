//! Narration playback: one lazily opened output engine and at most one
//! active source.
//!
//! The engine moves `uninitialized -> ready` the first time it is needed and
//! is resumed whenever it reports itself suspended. Starting a source always
//! stops the previous one first, and every exit path leaves the player either
//! `Playing` with a live handle or `Idle` with none.

use std::sync::Arc;

use crate::error::ChatError;
use crate::pcm::AudioBuffer;

/// A source that is currently producing sound.
pub trait Playback {
    /// Halt output. Must tolerate being called after natural completion.
    fn stop(&mut self);
}

/// The underlying output device.
pub trait OutputDevice {
    fn is_suspended(&self) -> bool {
        false
    }

    fn resume(&mut self) -> Result<(), ChatError> {
        Ok(())
    }

    /// Begin playing `buffer`. `on_finished` runs once, from any thread, when
    /// the buffer has been fully played.
    fn start(
        &mut self,
        buffer: Arc<AudioBuffer>,
        on_finished: Box<dyn FnOnce() + Send>,
    ) -> Result<Box<dyn Playback>, ChatError>;
}

pub type DeviceFactory = Box<dyn Fn() -> Result<Box<dyn OutputDevice>, ChatError>>;

/// Addresses one message inside one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub session_id: String,
    pub index: usize,
}

impl MessageRef {
    pub fn new(session_id: impl Into<String>, index: usize) -> Self {
        Self {
            session_id: session_id.into(),
            index,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PlayerState {
    #[default]
    Idle,
    Playing(MessageRef),
}

struct ActiveSource {
    generation: u64,
    handle: Box<dyn Playback>,
}

pub struct AudioPipeline {
    factory: DeviceFactory,
    device: Option<Box<dyn OutputDevice>>,
    active: Option<ActiveSource>,
    state: PlayerState,
    next_generation: u64,
}

impl AudioPipeline {
    pub fn new(factory: DeviceFactory) -> Self {
        Self {
            factory,
            device: None,
            active: None,
            state: PlayerState::Idle,
            next_generation: 1,
        }
    }

    /// Open the output engine on first use and resume it if suspended.
    pub fn ensure_engine(&mut self) -> Result<(), ChatError> {
        if self.device.is_none() {
            let device = (self.factory)()?;
            log::info!("Audio output engine ready");
            self.device = Some(device);
        }
        if let Some(device) = self.device.as_mut() {
            if device.is_suspended() {
                log::info!("Resuming suspended audio engine");
                device.resume()?;
            }
        }
        Ok(())
    }

    /// Stop whatever is playing, then start `buffer` for `target`.
    ///
    /// `on_finished` receives the generation number of this source so stale
    /// completions can be told apart from the current one.
    pub fn start<F>(&mut self, target: MessageRef, buffer: Arc<AudioBuffer>, on_finished: F) -> Result<(), ChatError>
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.stop();

        let generation = self.next_generation;
        self.next_generation += 1;

        self.ensure_engine()?;
        let device = self
            .device
            .as_mut()
            .ok_or_else(|| ChatError::Audio("audio engine unavailable".into()))?;
        let handle = device.start(buffer, Box::new(move || on_finished(generation)))?;

        log::info!(
            "Narrating message {} of session {}",
            target.index,
            target.session_id
        );
        self.active = Some(ActiveSource { generation, handle });
        self.state = PlayerState::Playing(target);
        Ok(())
    }

    /// Halt any active source. A no-op when idle.
    pub fn stop(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.handle.stop();
        }
        self.state = PlayerState::Idle;
    }

    /// Handle a completion notification. Returns `false` for stale ones.
    pub fn finished(&mut self, generation: u64) -> bool {
        match self.active {
            Some(ref active) if active.generation == generation => {
                self.active = None;
                self.state = PlayerState::Idle;
                true
            }
            _ => false,
        }
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn is_playing(&self, target: &MessageRef) -> bool {
        matches!(&self.state, PlayerState::Playing(current) if current == target)
    }
}

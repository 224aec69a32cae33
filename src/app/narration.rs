//! Per-message narration: `NoAudio -> Synthesizing -> Ready` on each
//! message, and one global player that is `Idle` or `Playing(message)`.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;

use super::state::{AppEvent, AppState};
use crate::pcm::{self, AudioBuffer, SPEECH_CHANNELS, SPEECH_SAMPLE_RATE};
use crate::playback::{MessageRef, PlayerState};
use crate::session::{AudioState, Role};
use crate::speech;
use crate::ui::transcript;

/// Result of asking for a message's narration buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Ready(Arc<AudioBuffer>),
    /// Synthesis is running; a `SpeechReady` event will follow.
    Pending,
    /// Nothing to narrate, or the audio engine could not be opened.
    Unavailable,
}

/// Return the cached buffer, or start synthesis if there is none.
///
/// A message that is already `Synthesizing` is never synthesized twice.
pub fn ensure_cached(state: &mut AppState, target: &MessageRef) -> CacheLookup {
    let Some(message) = state.store.message(&target.session_id, target.index) else {
        return CacheLookup::Unavailable;
    };
    if message.role != Role::Assistant {
        return CacheLookup::Unavailable;
    }
    match &message.audio {
        AudioState::Ready(buffer) => return CacheLookup::Ready(buffer.clone()),
        AudioState::Synthesizing => return CacheLookup::Pending,
        AudioState::NoAudio => {}
    }
    let text = message.content.clone();

    if let Err(e) = state.audio.ensure_engine() {
        log::warn!("Audio engine unavailable, skipping narration: {e}");
        return CacheLookup::Unavailable;
    }

    if let Err(e) = state
        .store
        .set_audio(&target.session_id, target.index, AudioState::Synthesizing)
    {
        log::warn!("Cannot mark message for synthesis: {e}");
        return CacheLookup::Unavailable;
    }

    let service = state.collaborators.speech.clone();
    let voice = state.config.voice;
    let sender = state.backend_sender.clone();
    let target = target.clone();
    state.runtime.spawn(async move {
        // A panicking collaborator must still report back, or the message
        // would stay `Synthesizing` forever.
        let audio = AssertUnwindSafe(speech::synthesize(service.as_ref(), &text, voice))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                log::error!("Speech synthesis task panicked");
                None
            });
        let _ = sender.send(AppEvent::SpeechReady { target, audio }).await;
    });

    CacheLookup::Pending
}

/// Store the synthesized audio and start any deferred playback for it.
pub fn on_speech_ready(state: &mut AppState, target: MessageRef, audio: Option<Vec<u8>>) {
    let buffer = audio.and_then(|bytes| decode(state, &bytes));

    let audio_state = match &buffer {
        Some(buffer) => AudioState::Ready(buffer.clone()),
        None => AudioState::NoAudio,
    };
    if let Err(e) = state
        .store
        .set_audio(&target.session_id, target.index, audio_state)
    {
        log::warn!("Discarding narration: {e}");
        return;
    }

    if state.pending_play.as_ref() == Some(&target) {
        state.pending_play = None;
        if let Some(buffer) = buffer {
            start(state, target, buffer);
            return;
        }
    }
    transcript::print_narration(state, &target);
}

fn decode(state: &mut AppState, bytes: &[u8]) -> Option<Arc<AudioBuffer>> {
    if let Err(e) = state.audio.ensure_engine() {
        log::warn!("Audio engine unavailable: {e}");
        return None;
    }
    match pcm::decode(bytes, SPEECH_SAMPLE_RATE, SPEECH_CHANNELS) {
        Ok(buffer) => Some(Arc::new(buffer)),
        Err(e) => {
            log::warn!("Narration decode failed: {e}");
            None
        }
    }
}

/// Narrate a message, stopping whatever is playing first. Uncached messages
/// start as soon as synthesis finishes; unavailable ones are a no-op.
pub fn play(state: &mut AppState, target: MessageRef) {
    stop(state);

    if let Err(e) = state.audio.ensure_engine() {
        log::warn!("Audio engine unavailable: {e}");
        return;
    }

    match ensure_cached(state, &target) {
        CacheLookup::Ready(buffer) => start(state, target, buffer),
        CacheLookup::Pending => state.pending_play = Some(target),
        CacheLookup::Unavailable => {
            log::debug!("No narration available for message {}", target.index);
        }
    }
}

fn start(state: &mut AppState, target: MessageRef, buffer: Arc<AudioBuffer>) {
    let sender = state.backend_sender.clone();
    let result = state.audio.start(target.clone(), buffer, move |generation| {
        let _ = sender.try_send(AppEvent::PlaybackFinished { generation });
    });
    match result {
        Ok(()) => transcript::print_narration(state, &target),
        Err(e) => log::warn!("Playback failed: {e}"),
    }
}

/// Halt narration and cancel any deferred start. Safe when idle.
pub fn stop(state: &mut AppState) {
    state.pending_play = None;
    state.audio.stop();
}

pub fn on_playback_finished(state: &mut AppState, generation: u64) {
    let PlayerState::Playing(target) = state.audio.state().clone() else {
        return;
    };
    if state.audio.finished(generation) {
        log::debug!("Narration finished");
        transcript::print_narration_finished(state, &target);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::app::handle_event;
    use crate::app::testing::{harness, Harness};
    use crate::playback::mock::{self, DeviceEvent};
    use crate::session::Message;

    async fn pump(h: &mut Harness) {
        let event = h.events.recv().await.unwrap();
        handle_event(&mut h.state, event);
    }

    /// Seed the current session with assistant replies; returns their refs.
    fn seed(h: &mut Harness, count: usize) -> Vec<MessageRef> {
        let session_id = h.state.store.current_id().unwrap().to_string();
        let start = h.state.store.current().unwrap().messages.len();
        let replies = (0..count)
            .map(|i| Message::assistant(format!("reply {i}")))
            .collect();
        h.state
            .store
            .append_messages(&session_id, replies, None)
            .unwrap();
        (start..start + count)
            .map(|index| MessageRef::new(session_id.clone(), index))
            .collect()
    }

    fn audio_of(h: &Harness, target: &MessageRef) -> AudioState {
        h.state
            .store
            .message(&target.session_id, target.index)
            .unwrap()
            .audio
            .clone()
    }

    #[tokio::test]
    async fn test_ensure_cached_synthesizes_once() {
        let mut h = harness();
        let target = seed(&mut h, 1).remove(0);

        assert_eq!(ensure_cached(&mut h.state, &target), CacheLookup::Pending);
        assert_eq!(audio_of(&h, &target), AudioState::Synthesizing);
        assert_eq!(ensure_cached(&mut h.state, &target), CacheLookup::Pending);

        pump(&mut h).await;
        assert!(matches!(ensure_cached(&mut h.state, &target), CacheLookup::Ready(_)));
        assert!(matches!(ensure_cached(&mut h.state, &target), CacheLookup::Ready(_)));
        assert_eq!(h.speech.calls.load(Ordering::SeqCst), 1);
        assert!(h.events.is_empty());
    }

    #[tokio::test]
    async fn test_failed_synthesis_can_be_retried() {
        let mut h = harness();
        let target = seed(&mut h, 1).remove(0);
        h.speech.silent.store(true, Ordering::SeqCst);

        ensure_cached(&mut h.state, &target);
        pump(&mut h).await;
        assert_eq!(audio_of(&h, &target), AudioState::NoAudio);

        h.speech.silent.store(false, Ordering::SeqCst);
        assert_eq!(ensure_cached(&mut h.state, &target), CacheLookup::Pending);
        pump(&mut h).await;
        assert!(matches!(audio_of(&h, &target), AudioState::Ready(_)));
        assert_eq!(h.speech.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_undecodable_audio_leaves_message_uncached() {
        let mut h = harness();
        let target = seed(&mut h, 1).remove(0);
        *h.speech.payload.lock().unwrap() = vec![0x01, 0x02, 0x03];

        play(&mut h.state, target.clone());
        pump(&mut h).await;

        assert_eq!(audio_of(&h, &target), AudioState::NoAudio);
        assert_eq!(h.state.audio.state(), &PlayerState::Idle);
        assert_eq!(h.device.lock().unwrap().started(), 0);
    }

    #[tokio::test]
    async fn test_panicking_synthesis_can_be_retried() {
        let mut h = harness();
        let target = seed(&mut h, 1).remove(0);
        h.speech.panic.store(true, Ordering::SeqCst);

        play(&mut h.state, target.clone());
        pump(&mut h).await;
        assert_eq!(audio_of(&h, &target), AudioState::NoAudio);
        assert!(h.state.pending_play.is_none());
        assert_eq!(h.state.audio.state(), &PlayerState::Idle);

        h.speech.panic.store(false, Ordering::SeqCst);
        assert_eq!(ensure_cached(&mut h.state, &target), CacheLookup::Pending);
        pump(&mut h).await;
        assert!(matches!(audio_of(&h, &target), AudioState::Ready(_)));
    }

    #[tokio::test]
    async fn test_user_messages_are_not_narrated() {
        let mut h = harness();
        let session_id = h.state.store.current_id().unwrap().to_string();
        h.state
            .store
            .append_messages(&session_id, vec![Message::user("hi")], None)
            .unwrap();

        let target = MessageRef::new(session_id, 1);
        assert_eq!(ensure_cached(&mut h.state, &target), CacheLookup::Unavailable);
        assert_eq!(ensure_cached(&mut h.state, &MessageRef::new("nope", 0)), CacheLookup::Unavailable);
        assert_eq!(h.speech.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_play_uncached_starts_after_synthesis() {
        let mut h = harness();
        let target = seed(&mut h, 1).remove(0);

        play(&mut h.state, target.clone());
        assert_eq!(h.state.pending_play.as_ref(), Some(&target));
        assert_eq!(h.state.audio.state(), &PlayerState::Idle);

        pump(&mut h).await;
        assert!(h.state.audio.is_playing(&target));
        assert!(h.state.pending_play.is_none());
    }

    #[tokio::test]
    async fn test_playing_another_message_stops_the_first() {
        let mut h = harness();
        let refs = seed(&mut h, 2);
        for target in &refs {
            ensure_cached(&mut h.state, target);
            pump(&mut h).await;
        }

        play(&mut h.state, refs[0].clone());
        play(&mut h.state, refs[1].clone());

        assert!(h.state.audio.is_playing(&refs[1]));
        let device = h.device.lock().unwrap();
        assert_eq!(
            device.events[1..],
            [DeviceEvent::Started(0), DeviceEvent::Stopped(0), DeviceEvent::Started(1)]
        );
        assert_eq!(device.max_live, 1);
    }

    #[tokio::test]
    async fn test_natural_completion_returns_to_idle() {
        let mut h = harness();
        let target = seed(&mut h, 1).remove(0);
        play(&mut h.state, target.clone());
        pump(&mut h).await;
        assert!(h.state.audio.is_playing(&target));

        mock::finish(&h.device, 0);
        pump(&mut h).await;
        assert_eq!(h.state.audio.state(), &PlayerState::Idle);
    }

    #[tokio::test]
    async fn test_stale_completion_does_not_stop_new_playback() {
        let mut h = harness();
        let refs = seed(&mut h, 2);
        for target in &refs {
            ensure_cached(&mut h.state, target);
            pump(&mut h).await;
        }
        play(&mut h.state, refs[0].clone());
        let sender = h.state.backend_sender.clone();
        play(&mut h.state, refs[1].clone());

        // A completion for the first source arriving late.
        sender
            .try_send(AppEvent::PlaybackFinished { generation: 1 })
            .unwrap();
        pump(&mut h).await;
        assert!(h.state.audio.is_playing(&refs[1]));
    }

    #[tokio::test]
    async fn test_stop_cancels_deferred_play() {
        let mut h = harness();
        let target = seed(&mut h, 1).remove(0);
        play(&mut h.state, target.clone());
        stop(&mut h.state);
        stop(&mut h.state);

        pump(&mut h).await;
        assert!(matches!(audio_of(&h, &target), AudioState::Ready(_)));
        assert_eq!(h.state.audio.state(), &PlayerState::Idle);
        assert_eq!(h.device.lock().unwrap().started(), 0);
    }

    #[tokio::test]
    async fn test_missing_device_skips_synthesis() {
        let mut h = harness();
        h.device.lock().unwrap().fail_open = true;
        let target = seed(&mut h, 1).remove(0);

        play(&mut h.state, target.clone());
        assert_eq!(ensure_cached(&mut h.state, &target), CacheLookup::Unavailable);
        assert_eq!(audio_of(&h, &target), AudioState::NoAudio);
        assert_eq!(h.speech.calls.load(Ordering::SeqCst), 0);
    }
}

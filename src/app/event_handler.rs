use std::ops::ControlFlow;

use super::conversation;
use super::narration;
use super::state::{AppEvent, AppState, Collaborators};
use crate::playback::MessageRef;
use crate::ui::{transcript, Command};

/// Handle one event. This is the core state machine; `Break` ends the loop.
pub fn handle_event(state: &mut AppState, event: AppEvent) -> ControlFlow<()> {
    match event {
        AppEvent::Command(command) => return handle_command(state, command),
        AppEvent::ResponseReady {
            session_id,
            message,
        } => conversation::on_response(state, session_id, message),
        AppEvent::ResponseFailed { session_id, error } => {
            conversation::on_failure(state, &session_id, &error)
        }
        AppEvent::SpeechReady { target, audio } => narration::on_speech_ready(state, target, audio),
        AppEvent::PlaybackFinished { generation } => {
            narration::on_playback_finished(state, generation)
        }
    }
    ControlFlow::Continue(())
}

fn handle_command(state: &mut AppState, command: Command) -> ControlFlow<()> {
    match command {
        Command::Submit(prompt) => match conversation::submit(state, &prompt) {
            Ok(()) => transcript::print_notice("Researching..."),
            Err(e) => log::debug!("Ignoring submission: {e}"),
        },
        Command::NewChat => {
            state.store.create_session();
            state.persist_sessions();
            transcript::print_session(state);
        }
        Command::ListSessions => transcript::print_sessions(state),
        Command::Switch(number) => {
            let id = number
                .checked_sub(1)
                .and_then(|i| state.store.sessions().get(i))
                .map(|s| s.id.clone());
            match id {
                Some(id) => {
                    if let Err(e) = state.store.select(&id) {
                        log::warn!("Cannot switch session: {e}");
                    }
                    transcript::print_session(state);
                }
                None => transcript::print_notice(&format!("No session {number}")),
            }
        }
        Command::Play(number) => {
            let Some(session_id) = state.store.current_id().map(str::to_string) else {
                return ControlFlow::Continue(());
            };
            match number.checked_sub(1) {
                Some(index) if state.store.message(&session_id, index).is_some() => {
                    narration::play(state, MessageRef::new(session_id, index));
                }
                _ => transcript::print_notice(&format!("No message {number}")),
            }
        }
        Command::Stop => narration::stop(state),
        Command::SetAutoNarrate(enabled) => {
            state.config.auto_narrate = enabled;
            settings_changed(state);
        }
        Command::SetVoice(voice) => {
            state.config.voice = voice;
            settings_changed(state);
        }
        Command::SetScope(scope) => {
            state.config.scope = scope;
            settings_changed(state);
        }
        Command::SetMethod(method) => {
            state.config.legal_method = method;
            settings_changed(state);
        }
        Command::SetImageEndpoint(url) => {
            state.config.image_endpoint = url.trim().to_string();
            settings_changed(state);
        }
        Command::SetApiKey(key) => {
            state.config.gemini_api_key = key.trim().to_string();
            state.collaborators = Collaborators::from_config(&state.config);
            state.persist_config();
            transcript::print_notice("API key updated");
        }
        Command::Show => transcript::print_session(state),
        Command::Settings => transcript::print_settings(&state.config),
        Command::Help => transcript::print_help(),
        Command::Quit => {
            narration::stop(state);
            return ControlFlow::Break(());
        }
    }
    ControlFlow::Continue(())
}

fn settings_changed(state: &AppState) {
    state.persist_config();
    transcript::print_settings(&state.config);
}

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;

use super::narration;
use super::state::{AppEvent, AppState, AppStatus};
use crate::error::ChatError;
use crate::imaging::{ImageService, IMAGE_FAILURE_TEXT, IMAGE_SUCCESS_TEXT};
use crate::intent::{self, Route};
use crate::playback::MessageRef;
use crate::reasoning::{ReasoningRequest, ReasoningService};
use crate::session::Message;
use crate::ui::transcript;

/// Everything a background task needs to answer one prompt.
struct Turn {
    route: Route,
    request: ReasoningRequest,
    image_endpoint: String,
    reasoning: Arc<dyn ReasoningService>,
    images: Arc<dyn ImageService>,
}

/// Accept a prompt: append it optimistically and dispatch the remote call.
///
/// Empty prompts and prompts submitted while a request is in flight are
/// rejected without touching the session.
pub fn submit(state: &mut AppState, prompt: &str) -> Result<(), ChatError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(ChatError::EmptyPrompt);
    }
    if state.status == AppStatus::Loading {
        return Err(ChatError::Busy);
    }
    let session_id = state
        .store
        .current_id()
        .ok_or_else(|| ChatError::SessionNotFound(String::new()))?
        .to_string();

    narration::stop(state);
    if let Err(e) = state.audio.ensure_engine() {
        log::warn!("Audio engine unavailable: {e}");
    }

    state
        .store
        .append_messages(&session_id, vec![Message::user(prompt)], Some(prompt))?;
    state.persist_sessions();
    state.update_status(AppStatus::Loading);

    dispatch_turn(state, session_id, prompt);
    Ok(())
}

fn dispatch_turn(state: &AppState, session_id: String, prompt: &str) {
    let turn = Turn {
        route: intent::classify(prompt, &state.config.image_endpoint),
        request: ReasoningRequest {
            prompt: prompt.to_string(),
            attachments: Vec::new(),
            legal_method: state.config.legal_method,
            scope: state.config.scope,
        },
        image_endpoint: state.config.image_endpoint.trim().to_string(),
        reasoning: state.collaborators.reasoning.clone(),
        images: state.collaborators.images.clone(),
    };
    log::info!("Dispatching {:?} request for session {session_id}", turn.route);

    let sender = state.backend_sender.clone();
    state.runtime.spawn(async move {
        let event = match AssertUnwindSafe(run_turn(turn)).catch_unwind().await {
            Ok(message) => AppEvent::ResponseReady {
                session_id,
                message,
            },
            Err(_) => AppEvent::ResponseFailed {
                session_id,
                error: "collaborator task panicked".to_string(),
            },
        };
        let _ = sender.send(event).await;
    });
}

/// Produce the single assistant message for a turn. Collaborator errors are
/// folded into the message text.
async fn run_turn(turn: Turn) -> Message {
    match turn.route {
        Route::Image => match turn
            .images
            .generate(&turn.image_endpoint, &turn.request.prompt)
            .await
        {
            Ok(Some(reference)) => Message::assistant(IMAGE_SUCCESS_TEXT).with_images(vec![reference]),
            Ok(None) => {
                log::warn!("Image service reply carried no image reference");
                Message::assistant(IMAGE_FAILURE_TEXT)
            }
            Err(e) => {
                log::warn!("Image generation failed: {e}");
                Message::assistant(IMAGE_FAILURE_TEXT)
            }
        },
        Route::Reasoning => match turn.reasoning.generate(turn.request).await {
            Ok(reply) => Message::assistant(reply.text).with_sources(reply.sources),
            Err(e) => {
                log::error!("Reasoning request failed: {e}");
                Message::assistant(format!("Investigation Error: {e}"))
            }
        },
    }
}

/// Append the assistant reply, then warm or play its narration.
pub fn on_response(state: &mut AppState, session_id: String, message: Message) {
    state.update_status(AppStatus::Idle);

    if let Err(e) = state.store.append_messages(&session_id, vec![message], None) {
        log::warn!("Dropping reply: {e}");
        return;
    }
    state.persist_sessions();

    let Some(session) = state.store.session(&session_id) else {
        return;
    };
    let index = session.messages.len() - 1;
    if state.store.current_id() == Some(session_id.as_str()) {
        transcript::print_message(state, index);
    }

    let target = MessageRef::new(session_id, index);
    if state.config.auto_narrate {
        narration::play(state, target);
    } else {
        narration::ensure_cached(state, &target);
    }
}

pub fn on_failure(state: &mut AppState, session_id: &str, error: &str) {
    log::error!("Request for session {session_id} failed: {error}");
    state.update_status(AppStatus::Error);
    transcript::print_notice(&format!("Request failed: {error}"));
}

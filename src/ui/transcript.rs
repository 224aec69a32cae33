//! Plain-text rendering of sessions, messages and settings.

use chrono::Local;

use crate::app::AppState;
use crate::config::Config;
use crate::playback::MessageRef;
use crate::session::{AudioState, ChatSession, Message, Role};

fn narration_marker(state: &AppState, target: &MessageRef, message: &Message) -> Option<&'static str> {
    if state.audio.is_playing(target) {
        return Some("[playing]");
    }
    if state.pending_play.as_ref() == Some(target) {
        return Some("[starting narration]");
    }
    match message.audio {
        AudioState::Synthesizing => Some("[synthesizing]"),
        AudioState::Ready(_) => Some("[narration ready]"),
        AudioState::NoAudio => None,
    }
}

fn format_message(number: usize, message: &Message, marker: Option<&str>) -> String {
    let speaker = match message.role {
        Role::User => "You",
        Role::Assistant => "OmniSearch",
    };
    let time = message.timestamp.with_timezone(&Local).format("%H:%M");

    let mut out = format!("#{number} {speaker} ({time})");
    if let Some(marker) = marker {
        out.push(' ');
        out.push_str(marker);
    }
    out.push('\n');
    out.push_str(&message.content);
    for image in &message.images {
        out.push_str(&format!("\n  image: {image}"));
    }
    if !message.sources.is_empty() {
        out.push_str("\n  sources:");
        for (i, source) in message.sources.iter().enumerate() {
            out.push_str(&format!("\n    [{}] {} <{}>", i + 1, source.title, source.uri));
        }
    }
    out
}

fn format_session_line(position: usize, session: &ChatSession, current: bool) -> String {
    let cursor = if current { '*' } else { ' ' };
    format!(
        "{cursor} {position}. {} ({} messages)",
        session.title,
        session.messages.len()
    )
}

/// Status line for a narration change on `target`, `None` when the message
/// is not in the session on screen.
fn narration_line(state: &AppState, target: &MessageRef) -> Option<String> {
    if state.store.current_id() != Some(target.session_id.as_str()) {
        return None;
    }
    let message = state.store.message(&target.session_id, target.index)?;
    let marker = narration_marker(state, target, message).unwrap_or("[no narration]");
    Some(format!("#{} {marker}", target.index + 1))
}

pub fn print_narration(state: &AppState, target: &MessageRef) {
    if let Some(line) = narration_line(state, target) {
        print_notice(&line);
    }
}

pub fn print_narration_finished(state: &AppState, target: &MessageRef) {
    if state.store.current_id() == Some(target.session_id.as_str()) {
        print_notice(&format!("#{} narration finished", target.index + 1));
    }
}

/// Print message `index` of the current session.
pub fn print_message(state: &AppState, index: usize) {
    let Some(session) = state.store.current() else {
        return;
    };
    let Some(message) = session.messages.get(index) else {
        return;
    };
    let target = MessageRef::new(session.id.clone(), index);
    let marker = narration_marker(state, &target, message);
    println!("\n{}", format_message(index + 1, message, marker));
}

pub fn print_session(state: &AppState) {
    let Some(session) = state.store.current() else {
        return;
    };
    println!("\n=== {} ===", session.title);
    for index in 0..session.messages.len() {
        print_message(state, index);
    }
}

pub fn print_sessions(state: &AppState) {
    let current = state.store.current_id();
    for (i, session) in state.store.sessions().iter().enumerate() {
        println!(
            "{}",
            format_session_line(i + 1, session, current == Some(session.id.as_str()))
        );
    }
}

pub fn print_settings(config: &Config) {
    let image = if config.image_endpoint.is_empty() {
        "(disabled)"
    } else {
        config.image_endpoint.as_str()
    };
    let narrate = if config.auto_narrate { "on" } else { "off" };
    println!(
        "scope: {}  method: {}  voice: {}  auto-narrate: {narrate}\nimage endpoint: {image}",
        config.scope, config.legal_method, config.voice
    );
}

pub fn print_notice(text: &str) {
    println!("-- {text}");
}

pub fn print_help() {
    println!(
        "Type a question to research it. Commands:
  /new                  start a new inquiry
  /sessions             list inquiries
  /switch <n>           open inquiry n
  /show                 reprint the current inquiry
  /play <n>             narrate message n
  /stop                 stop narration
  /narrate on|off       narrate replies automatically
  /voice male|female    narrator voice
  /scope global|nigeria jurisdiction
  /method none|irac|ipac|crec
  /image-url [url]      image webhook (empty disables)
  /api-key <key>        Gemini API key
  /settings             show settings
  /quit                 exit"
    );
}

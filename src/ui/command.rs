use std::str::FromStr;

use crate::config::{LegalMethod, Scope, VoiceGender};

/// A line of user input, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Submit(String),
    NewChat,
    ListSessions,
    /// 1-based position in the session list.
    Switch(usize),
    /// 1-based message number in the current session.
    Play(usize),
    Stop,
    SetAutoNarrate(bool),
    SetVoice(VoiceGender),
    SetScope(Scope),
    SetMethod(LegalMethod),
    /// Empty disables image routing.
    SetImageEndpoint(String),
    SetApiKey(String),
    Show,
    Settings,
    Help,
    Quit,
}

fn number(arg: &str, usage: &str) -> Result<usize, String> {
    arg.parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| format!("usage: {usage}"))
}

impl FromStr for Command {
    type Err = String;

    /// Lines not starting with `/` are prompts. The error is a usage hint.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Command::Submit(line.to_string()));
        };
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "new" => Command::NewChat,
            "sessions" => Command::ListSessions,
            "switch" => Command::Switch(number(arg, "/switch <session number>")?),
            "play" => Command::Play(number(arg, "/play <message number>")?),
            "stop" => Command::Stop,
            "narrate" => match arg.to_ascii_lowercase().as_str() {
                "on" => Command::SetAutoNarrate(true),
                "off" => Command::SetAutoNarrate(false),
                _ => return Err("usage: /narrate on|off".into()),
            },
            "voice" => Command::SetVoice(arg.parse().map_err(|_| "usage: /voice male|female")?),
            "scope" => Command::SetScope(arg.parse().map_err(|_| "usage: /scope global|nigeria")?),
            "method" => Command::SetMethod(
                arg.parse()
                    .map_err(|_| "usage: /method none|irac|ipac|crec")?,
            ),
            "image-url" => Command::SetImageEndpoint(arg.to_string()),
            "api-key" if !arg.is_empty() => Command::SetApiKey(arg.to_string()),
            "api-key" => return Err("usage: /api-key <key>".into()),
            "show" => Command::Show,
            "settings" => Command::Settings,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("Unknown command /{other}. Type /help for a list.")),
        };
        Ok(command)
    }
}

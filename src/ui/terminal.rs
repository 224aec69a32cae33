use tokio::io::{AsyncBufReadExt, BufReader};

use super::{transcript, Command};
use crate::app::AppEvent;

/// Read stdin line by line on the runtime and forward parsed commands to
/// the event loop. End of input is treated as `/quit`.
pub fn start_input_reader(runtime: &tokio::runtime::Handle, sender: async_channel::Sender<AppEvent>) {
    runtime.spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    log::error!("Failed to read input: {e}");
                    break;
                }
            };
            match line.parse::<Command>() {
                Ok(command) => {
                    if sender.send(AppEvent::Command(command)).await.is_err() {
                        return;
                    }
                }
                Err(usage) => transcript::print_notice(&usage),
            }
        }
        let _ = sender.send(AppEvent::Command(Command::Quit)).await;
    });
}

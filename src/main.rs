mod app;
mod audio_output;
mod config;
mod error;
mod gemini;
mod imaging;
mod intent;
mod pcm;
mod playback;
mod reasoning;
mod session;
mod speech;
mod ui;

use std::ops::ControlFlow;

use app::{AppEvent, AppState, Collaborators};
use audio_output::CpalOutput;
use config::Config;
use playback::{AudioPipeline, DeviceFactory, OutputDevice};
use session::SessionStore;

fn main() {
    env_logger::init();
    log::info!("OmniSearch starting");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };

    let config_path = Config::default_path();
    let config = Config::load_from(&config_path);
    if config.api_key().is_empty() && config.reasoning_endpoint.is_empty() {
        log::warn!("No Gemini API key configured; set one with /api-key or GEMINI_API_KEY");
    }
    let store = SessionStore::open(SessionStore::default_path());

    // The output device is opened lazily on first narration.
    let factory: DeviceFactory =
        Box::new(|| CpalOutput::open().map(|device| Box::new(device) as Box<dyn OutputDevice>));

    let (backend_tx, backend_rx) = async_channel::unbounded::<AppEvent>();
    let collaborators = Collaborators::from_config(&config);
    let mut state = AppState::new(
        config,
        config_path,
        store,
        collaborators,
        AudioPipeline::new(factory),
        runtime.handle().clone(),
        backend_tx.clone(),
    );

    ui::transcript::print_session(&state);
    ui::transcript::print_notice("Type /help for commands.");
    ui::terminal::start_input_reader(runtime.handle(), backend_tx);

    runtime.block_on(async {
        while let Ok(event) = backend_rx.recv().await {
            if let ControlFlow::Break(()) = app::handle_event(&mut state, event) {
                break;
            }
        }
    });

    state.audio.stop();
    runtime.shutdown_background();
    log::info!("OmniSearch stopped");
}

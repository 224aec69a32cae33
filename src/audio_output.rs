use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::ChatError;
use crate::pcm::AudioBuffer;
use crate::playback::{OutputDevice, Playback};

/// Default cpal output device.
pub struct CpalOutput {
    device: cpal::Device,
    config: cpal::SupportedStreamConfig,
}

impl CpalOutput {
    pub fn open() -> Result<Self, ChatError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| ChatError::Audio("No output device found".into()))?;
        let config = device
            .default_output_config()
            .map_err(|e| ChatError::Audio(e.to_string()))?;

        log::info!(
            "Output device: {:?} ({} Hz, {} ch)",
            device.description(),
            config.sample_rate(),
            config.channels()
        );
        Ok(Self { device, config })
    }
}

struct CpalPlayback {
    stream: Option<cpal::Stream>,
}

impl Playback for CpalPlayback {
    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::debug!("Pausing output stream failed: {e}");
            }
        }
    }
}

impl OutputDevice for CpalOutput {
    fn start(
        &mut self,
        buffer: Arc<AudioBuffer>,
        on_finished: Box<dyn FnOnce() + Send>,
    ) -> Result<Box<dyn Playback>, ChatError> {
        let channels = self.config.channels() as usize;
        let samples = Arc::new(resample(&buffer, self.config.sample_rate()));
        let total = samples.len();

        let sample_idx = Arc::new(AtomicUsize::new(0));
        let on_finished = Mutex::new(Some(on_finished));

        let stream = self
            .device
            .build_output_stream(
                &self.config.config(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut idx = sample_idx.load(Ordering::Relaxed);
                    for frame in data.chunks_mut(channels) {
                        let value = if idx < total { samples[idx] } else { 0.0 };
                        for sample in frame.iter_mut() {
                            *sample = value;
                        }
                        idx = idx.saturating_add(1);
                    }
                    sample_idx.store(idx, Ordering::Relaxed);

                    if idx >= total {
                        if let Ok(mut guard) = on_finished.lock() {
                            if let Some(notify) = guard.take() {
                                notify();
                            }
                        }
                    }
                },
                |err| log::error!("Audio output error: {err}"),
                None,
            )
            .map_err(|e| ChatError::Audio(e.to_string()))?;

        stream
            .play()
            .map_err(|e| ChatError::Audio(e.to_string()))?;

        Ok(Box::new(CpalPlayback {
            stream: Some(stream),
        }))
    }
}

/// Mix down to mono and linearly resample to `target_rate`.
pub fn resample(buffer: &AudioBuffer, target_rate: u32) -> Vec<f32> {
    let frames = buffer.frame_count();
    if frames == 0 || target_rate == 0 {
        return Vec::new();
    }

    let ratio = buffer.sample_rate() as f64 / target_rate as f64;
    let out_len = (frames as f64 / ratio).round() as usize;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let base = (pos.floor() as usize).min(frames - 1);
            let next = (base + 1).min(frames - 1);
            let frac = (pos - base as f64).clamp(0.0, 1.0) as f32;
            let a = buffer.mono_sample(base);
            let b = buffer.mono_sample(next);
            a + (b - a) * frac
        })
        .collect()
}

//! CPAL-based audio output backend.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, Stream, StreamConfig};
use dawn_engine::{ChannelBank, Renderer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::traits::{AudioError, AudioOutput};

/// Mono samples rendered per pass inside the device callback.
const SCRATCH_FRAMES: usize = 1024;

/// CPAL-based audio output.
///
/// The device callback runs the [`Renderer`] against the shared
/// [`ChannelBank`] and copies the mono result into every device channel.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    running: Arc<AtomicBool>,
}

impl CpalOutput {
    /// Open the default output device at the renderer's sample rate and
    /// build a paused stream that renders from `bank`.
    pub fn open(bank: Arc<ChannelBank>, renderer: Renderer) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let mut config = f32_config(&device)?;
        config.sample_rate = SampleRate(renderer.sample_rate());

        tracing::debug!(
            device = %device.name().unwrap_or_default(),
            channels = config.channels,
            sample_rate = config.sample_rate.0,
            "audio: opening output"
        );

        let running = Arc::new(AtomicBool::new(false));
        let mut feed = Feed::new(bank, renderer, running.clone());
        let channels = config.channels as usize;

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    feed.fill(data, channels);
                },
                |err| tracing::error!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        Ok(Self {
            device,
            config,
            stream: Some(stream),
            running,
        })
    }

    /// Device channel count. Each carries the same mono mix.
    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    pub fn device_name(&self) -> String {
        self.device.name().unwrap_or_default()
    }
}

/// Default config if it is f32, otherwise the first f32 config the device
/// supports.
fn f32_config(device: &Device) -> Result<StreamConfig, AudioError> {
    let default = device
        .default_output_config()
        .map_err(|e| AudioError::DeviceInit(e.to_string()))?;
    if default.sample_format() == SampleFormat::F32 {
        return Ok(default.into());
    }

    let mut supported = device
        .supported_output_configs()
        .map_err(|e| AudioError::DeviceInit(e.to_string()))?;
    supported
        .find(|range| range.sample_format() == SampleFormat::F32)
        .map(|range| range.with_max_sample_rate().into())
        .ok_or_else(|| AudioError::UnsupportedFormat(format!("{:?}", default.sample_format())))
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running.store(true, Ordering::Release);
        if let Some(ref stream) = self.stream {
            stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Release);
        if let Some(ref stream) = self.stream {
            stream.pause().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }
}

/// State owned by the device callback. Nothing here allocates after `new`.
struct Feed {
    bank: Arc<ChannelBank>,
    renderer: Renderer,
    scratch: Vec<f32>,
    running: Arc<AtomicBool>,
}

impl Feed {
    fn new(bank: Arc<ChannelBank>, renderer: Renderer, running: Arc<AtomicBool>) -> Self {
        Self {
            bank,
            renderer,
            scratch: vec![0.0; SCRATCH_FRAMES],
            running,
        }
    }

    /// Fill an interleaved device buffer.
    fn fill(&mut self, data: &mut [f32], channels: usize) {
        if !self.running.load(Ordering::Acquire) || channels == 0 {
            data.fill(0.0);
            return;
        }

        for block in data.chunks_mut(SCRATCH_FRAMES * channels) {
            let frames = block.len() / channels;
            let mono = &mut self.scratch[..frames];
            self.renderer.render(&self.bank, mono);

            for (frame, &sample) in block.chunks_mut(channels).zip(mono.iter()) {
                frame.fill(sample);
            }
            // A trailing partial frame gets silence.
            block[frames * channels..].fill(0.0);
        }
    }
}

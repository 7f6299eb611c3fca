//! Audio output trait and error types.

/// Error type for audio operations.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// No audio device available
    #[error("No audio device available")]
    NoDevice,
    /// Failed to initialize audio device
    #[error("Device init error: {0}")]
    DeviceInit(String),
    /// Device has no f32 output configuration
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
    /// Failed to create audio stream
    #[error("Stream create error: {0}")]
    StreamCreate(String),
    /// Playback error
    #[error("Playback error: {0}")]
    Playback(String),
}

/// An output device that pulls samples from a renderer on its own schedule.
pub trait AudioOutput {
    /// Get the sample rate.
    fn sample_rate(&self) -> u32;

    /// Start pulling samples.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Stop pulling samples. The device plays silence until restarted.
    fn stop(&mut self) -> Result<(), AudioError>;
}

// src/audio/source/server.rs
//! Capture from the system sound server through cpal.
//!
//! The stream is callback driven: cpal hands each captured block to us and we
//! forward it to the channel buffers as signed 16-bit samples.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, FromSample, Host, SampleFormat, SampleRate, SizedSample, StreamConfig};
use tracing::{debug, info, warn};

use super::stream_thread::StreamThread;
use super::AudioSource;
use crate::audio::channels::ChannelBuffers;
use crate::config::{InputConfig, Source};
use crate::error::{Result, VizError};

/// Asynchronous capture from an input device of the default host.
pub struct ServerSource {
    buffers: Arc<ChannelBuffers>,
    device: String,
    stream: Option<StreamThread>,
}

impl ServerSource {
    /// Check that the configured input device exists.
    ///
    /// An empty `config.device` selects the host's default input.
    pub fn connect(config: &InputConfig, buffers: Arc<ChannelBuffers>) -> Result<Self> {
        let host = cpal::default_host();
        let device = find_device(&host, &config.device)?;
        let name = device.name().unwrap_or_else(|_| "<unnamed>".to_string());
        info!(host = ?host.id(), device = %name, "connected to sound server");

        Ok(Self {
            buffers,
            device: config.device.clone(),
            stream: None,
        })
    }
}

impl AudioSource for ServerSource {
    fn start_stream(&mut self, config: &InputConfig) -> Result<()> {
        self.stop_stream();

        let device = if config.device.is_empty() {
            self.device.clone()
        } else {
            config.device.clone()
        };
        let stream_config = StreamConfig {
            channels: config.channel_count() as u16,
            sample_rate: SampleRate(config.sample_rate),
            buffer_size: BufferSize::Default,
        };
        let buffers = Arc::clone(&self.buffers);

        // The stream handle is not Send on every host, so it is built and
        // dropped on the thread that owns it.
        let wanted = device.clone();
        let stream = StreamThread::spawn("pcmviz-capture", move || {
            let host = cpal::default_host();
            let device = find_device(&host, &wanted)?;
            build_capture(&device, &stream_config, buffers)
        })?;

        self.device = device;
        self.stream = Some(stream);
        debug!(channels = config.channel_count(), rate = config.sample_rate, "capture stream started");
        Ok(())
    }

    fn stop_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            debug!("capture stream stopped");
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn kind(&self) -> Source {
        Source::Server
    }
}

impl Drop for ServerSource {
    fn drop(&mut self) {
        self.stop_stream();
    }
}

fn find_device(host: &Host, name: &str) -> Result<Device> {
    if name.is_empty() {
        return host
            .default_input_device()
            .ok_or_else(|| VizError::Connect("no default input device".into()));
    }

    let mut devices = host
        .input_devices()
        .map_err(|e| VizError::Connect(format!("failed to list input devices: {e}")))?;
    devices
        .find(|d| d.name().map(|n| n == name).unwrap_or(false))
        .ok_or_else(|| VizError::Connect(format!("input device '{name}' not found")))
}

fn build_capture(
    device: &Device,
    config: &StreamConfig,
    buffers: Arc<ChannelBuffers>,
) -> Result<cpal::Stream> {
    let supported = device
        .default_input_config()
        .map_err(|e| VizError::Stream(format!("no input config: {e}")))?;

    let stream = match supported.sample_format() {
        SampleFormat::I16 => build_stream::<i16>(device, config, buffers)?,
        SampleFormat::U16 => build_stream::<u16>(device, config, buffers)?,
        SampleFormat::F32 => build_stream::<f32>(device, config, buffers)?,
        other => {
            return Err(VizError::Stream(format!("unsupported sample format {other:?}")));
        }
    };

    stream
        .play()
        .map_err(|e| VizError::Stream(format!("failed to start capture: {e}")))?;
    Ok(stream)
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    buffers: Arc<ChannelBuffers>,
) -> Result<cpal::Stream>
where
    T: SizedSample + Send + 'static,
    i16: FromSample<T>,
{
    let mut scratch: Vec<i16> = Vec::new();

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                scratch.clear();
                scratch.extend(data.iter().map(|&s| <i16 as cpal::Sample>::from_sample(s)));
                buffers.write_interleaved(&scratch);
            },
            |err| warn!("capture stream error: {err}"),
            None,
        )
        .map_err(|e| VizError::Stream(format!("failed to build capture stream: {e}")))
}

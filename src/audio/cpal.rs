// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{error::Error, fmt, thread};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info, span, Level};

use super::mixer::AudioMixer;
use super::{AudioError, PlayParams, Playback, SoundId, StreamId};
use crate::config;
use crate::samples::LoadedSample;

/// A cpal output device driven by an in-memory mixer. The cpal stream lives on its own
/// thread and pulls mixed frames from the mixer in its callback.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The mixer the output callback reads from.
    mixer: AudioMixer,
    /// Dropping this sender ends the output thread and closes the stream.
    _shutdown_tx: crossbeam_channel::Sender<()>,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.mixer.num_channels(),
            self.host_id.name()
        )
    }
}

/// Creates a callback that mixes into a reusable scratch buffer and converts to the
/// device's sample type.
fn create_callback<T>(
    mixer: AudioMixer,
) -> impl FnMut(&mut [T], &cpal::OutputCallbackInfo) + Send + 'static
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let mut scratch: Vec<f32> = Vec::new();
    move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
        scratch.resize(data.len(), 0.0);
        mixer.process_into(&mut scratch);
        for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
            *dst = T::from_sample(src);
        }
    }
}

impl Device {
    /// Lists cpal output devices.
    pub fn list() -> Result<Vec<String>, Box<dyn Error>> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.output_devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let Ok(configs) = device.supported_output_configs() else {
                    continue;
                };
                let max_channels = configs.map(|c| c.channels()).max().unwrap_or(0);
                if max_channels > 0 {
                    devices.push(format!(
                        "{} (Channels={}) ({})",
                        device.name()?,
                        max_channels,
                        host_id.name()
                    ));
                }
            }
        }

        devices.sort();
        Ok(devices)
    }

    /// Finds a device by name. "default" selects the default host's default output.
    fn find(name: &str) -> Result<(cpal::HostId, cpal::Device), Box<dyn Error>> {
        if name == "default" {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or("no default output device available")?;
            return Ok((host.id(), device));
        }

        let _shh_stderr = shh::stderr()?;
        for host_id in cpal::available_hosts() {
            let Ok(devices) = cpal::host_from_id(host_id)?.output_devices() else {
                continue;
            };
            for device in devices {
                if device.name().is_ok_and(|device_name| device_name.trim() == name) {
                    return Ok((host_id, device));
                }
            }
        }

        Err(format!("no device found with name {}", name).into())
    }

    /// Gets the given cpal device and starts its output stream.
    pub fn get(config: &config::Audio, max_streams: usize) -> Result<Device, Box<dyn Error>> {
        let (host_id, device) = Device::find(config.device())?;
        let name = device.name()?;
        let sample_format = device.default_output_config()?.sample_format();

        let mixer = AudioMixer::new(config.channels(), config.sample_rate(), max_streams);
        let stream_config = cpal::StreamConfig {
            channels: mixer.num_channels(),
            sample_rate: config.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };

        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), String>>(1);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);

        // cpal streams aren't Send on every platform, so the stream is built and kept on
        // this thread.
        let callback_mixer = mixer.clone();
        let device_name = name.clone();
        thread::spawn(move || {
            let span = span!(Level::INFO, "output stream (cpal)", device = %device_name);
            let _enter = span.enter();

            let err_fn = |err: cpal::StreamError| error!("CPAL output stream error: {}", err);
            let stream_result = match sample_format {
                cpal::SampleFormat::F32 => device.build_output_stream(
                    &stream_config,
                    create_callback::<f32>(callback_mixer),
                    err_fn,
                    None,
                ),
                cpal::SampleFormat::I16 => device.build_output_stream(
                    &stream_config,
                    create_callback::<i16>(callback_mixer),
                    err_fn,
                    None,
                ),
                cpal::SampleFormat::I32 => device.build_output_stream(
                    &stream_config,
                    create_callback::<i32>(callback_mixer),
                    err_fn,
                    None,
                ),
                other => {
                    let _ = ready_tx.send(Err(format!("unsupported sample format {}", other)));
                    return;
                }
            };

            let stream = match stream_result {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(format!("failed to create stream: {}", e)));
                    return;
                }
            };
            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(format!("failed to start stream: {}", e)));
                return;
            }

            info!("CPAL output stream started");
            let _ = ready_tx.send(Ok(()));

            // Blocks until the device is dropped.
            let _ = shutdown_rx.recv();
            info!("CPAL output stream stopped");
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(AudioError::Device(e).into()),
            Err(_) => {
                return Err(AudioError::Device("output thread exited".to_string()).into())
            }
        }

        Ok(Device {
            name,
            host_id,
            mixer,
            _shutdown_tx: shutdown_tx,
        })
    }
}

impl Playback for Device {
    fn sample_rate(&self) -> u32 {
        self.mixer.sample_rate()
    }

    fn load(&self, sample: &LoadedSample) -> Result<SoundId, AudioError> {
        Ok(self.mixer.load(sample))
    }

    fn unload(&self, sound: SoundId) {
        self.mixer.unload(sound);
    }

    fn play(&self, sound: SoundId, params: PlayParams) -> Result<StreamId, AudioError> {
        self.mixer.play(sound, params)
    }

    fn set_volume(&self, stream: StreamId, left: f32, right: f32) {
        self.mixer.set_volume(stream, left, right);
    }

    fn stop(&self, stream: StreamId) {
        self.mixer.stop(stream);
    }

    fn set_master_gain(&self, gain: f32) {
        self.mixer.set_master_gain(gain);
    }
}

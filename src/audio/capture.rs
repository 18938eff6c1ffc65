//! Microphone WAV capture via cpal.
//!
//! Runs beside the streaming recognizer while a memo is recorded so the
//! saved memo can carry an audio attachment. The `cpal::Stream` is not Send,
//! so it lives on a dedicated thread that parks until capture is stopped.

use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use hound::{WavSpec, WavWriter};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info};

pub struct MicCapture {
    sample_rate: u32,
    samples: Arc<Mutex<Vec<f32>>>,
    worker: Option<CaptureWorker>,
}

struct CaptureWorker {
    stop_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl MicCapture {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            samples: Arc::new(Mutex::new(Vec::new())),
            worker: None,
        }
    }

    /// Start capturing from the default input device.
    pub fn start(&mut self) -> Result<()> {
        if self.worker.is_some() {
            bail!("Mic capture already running");
        }

        {
            let mut samples = self.samples.lock().unwrap();
            samples.clear();
            samples.shrink_to_fit();
        }

        let samples = self.samples.clone();
        let sample_rate = self.sample_rate;
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<String, String>>();

        let handle = std::thread::spawn(move || {
            let host = cpal::default_host();
            let Some(device) = host.default_input_device() else {
                let _ = ready_tx.send(Err("no input device available".to_string()));
                return;
            };

            let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
            let config = cpal::StreamConfig {
                channels: 1,
                sample_rate: cpal::SampleRate(sample_rate),
                buffer_size: cpal::BufferSize::Default,
            };

            let err_fn = |err| error!("Mic capture stream error: {}", err);
            let stream = match device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut samples) = samples.lock() {
                        samples.extend_from_slice(data);
                    }
                },
                err_fn,
                None,
            ) {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(e.to_string()));
                return;
            }

            let _ = ready_tx.send(Ok(device_name));

            // Park here; dropping the stream on the way out stops capture.
            let _ = stop_rx.recv();
            drop(stream);
            debug!("Mic capture thread exiting");
        });

        match ready_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(device_name)) => {
                info!("Mic capture started on device: {}", device_name);
                self.worker = Some(CaptureWorker { stop_tx, handle });
                Ok(())
            }
            Ok(Err(msg)) => {
                let _ = handle.join();
                Err(anyhow!("Failed to start mic capture: {}", msg))
            }
            Err(_) => Err(anyhow!("Mic capture thread did not come up")),
        }
    }

    /// Stop capturing and return the samples collected so far.
    pub fn stop(&mut self) -> Result<Vec<f32>> {
        let Some(worker) = self.worker.take() else {
            bail!("Mic capture not running");
        };

        let _ = worker.stop_tx.send(());
        if worker.handle.join().is_err() {
            error!("Mic capture thread panicked");
        }

        let samples = {
            let mut guard = self.samples.lock().unwrap();
            let s = guard.clone();
            guard.clear();
            guard.shrink_to_fit();
            s
        };

        info!("Mic capture stopped, {} samples", samples.len());
        Ok(samples)
    }

    pub fn is_active(&self) -> bool {
        self.worker.is_some()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl Drop for MicCapture {
    fn drop(&mut self) {
        if self.worker.is_some() {
            debug!("Dropping active MicCapture, cleaning up");
            let _ = self.stop();
        }
    }
}

/// Write captured samples as a mono float WAV.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create recordings directory")?;
    }

    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    info!("Recording saved: {:?} ({} samples)", path, samples.len());
    Ok(())
}

/// Timestamped WAV path inside `dir`, with a collision counter.
pub fn timestamped_wav(dir: &Path) -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let path = dir.join(format!("memo-{}.wav", timestamp));

    if path.exists() {
        for i in 1..100 {
            let alt = dir.join(format!("memo-{}-{}.wav", timestamp, i));
            if !alt.exists() {
                return alt;
            }
        }
    }

    path
}

use std::sync::{Arc, Mutex, PoisonError};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, warn};

use crate::foundation::error::{BubbleError, BubbleResult};

use super::analyzer::SpectrumAnalyzer;
use super::snapshot::AudioSnapshot;

enum Source {
    /// Live input device. Holding the stream keeps the callback alive;
    /// dropping it tears the capture down synchronously.
    Mic { _stream: cpal::Stream },
    /// Decoded WAV looped by the host clock. No thread, no callback: the
    /// playhead is derived from `now_ms` on every tick.
    Wav {
        samples: Arc<Vec<f32>>,
        sample_rate: u32,
        epoch_ms: f64,
    },
}

/// Owns the audio source and the shared analyzer.
///
/// At most one source is active. Starting a new one replaces the old and
/// resets the analyzer, so levels never bleed between sessions. All failures
/// surface as `BubbleError::Audio`; a capture that never started simply
/// yields neutral snapshots.
pub struct AudioCapture {
    analyzer: Arc<Mutex<SpectrumAnalyzer>>,
    source: Option<Source>,
}

fn lock_analyzer(
    analyzer: &Arc<Mutex<SpectrumAnalyzer>>,
) -> std::sync::MutexGuard<'_, SpectrumAnalyzer> {
    analyzer.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AudioCapture {
    pub fn new() -> Self {
        Self {
            analyzer: Arc::new(Mutex::new(SpectrumAnalyzer::default())),
            source: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.source.is_some()
    }

    /// Open the default input device and start feeding the analyzer.
    pub fn start_mic(&mut self) -> BubbleResult<()> {
        self.stop();
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| BubbleError::audio("no default input device"))?;
        let config = device
            .default_input_config()
            .map_err(|e| BubbleError::audio(format!("input config: {e}")))?;
        debug!(
            device = device.name().unwrap_or_default(),
            rate = config.sample_rate().0,
            channels = config.channels(),
            "starting mic capture"
        );

        let channels = config.channels() as usize;
        let analyzer = Arc::clone(&self.analyzer);
        let on_err = |e: cpal::StreamError| warn!("audio stream error: {e}");
        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device
                .build_input_stream(
                    &config.into(),
                    move |data: &[f32], _| feed_interleaved(&analyzer, data, channels),
                    on_err,
                    None,
                )
                .map_err(|e| BubbleError::audio(format!("build stream: {e}")))?,
            cpal::SampleFormat::I16 => device
                .build_input_stream(
                    &config.into(),
                    move |data: &[i16], _| {
                        let floats: Vec<f32> =
                            data.iter().map(|&s| f32::from(s) / 32768.0).collect();
                        feed_interleaved(&analyzer, &floats, channels);
                    },
                    on_err,
                    None,
                )
                .map_err(|e| BubbleError::audio(format!("build stream: {e}")))?,
            other => {
                return Err(BubbleError::audio(format!(
                    "unsupported input sample format {other:?}"
                )));
            }
        };
        stream
            .play()
            .map_err(|e| BubbleError::audio(format!("play stream: {e}")))?;
        self.source = Some(Source::Mic { _stream: stream });
        Ok(())
    }

    /// Decode a WAV file and loop it as the analysis source, starting at
    /// `now_ms`. Multi-channel files are mixed down to mono.
    pub fn start_wav_file(&mut self, path: &std::path::Path, now_ms: f64) -> BubbleResult<()> {
        self.stop();
        let mut reader = hound::WavReader::open(path)
            .map_err(|e| BubbleError::audio(format!("open wav '{}': {e}", path.display())))?;
        let spec = reader.spec();
        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|e| BubbleError::audio(format!("decode wav: {e}")))?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1i64 << (spec.bits_per_sample.min(32) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<Result<_, _>>()
                    .map_err(|e| BubbleError::audio(format!("decode wav: {e}")))?
            }
        };
        if interleaved.is_empty() {
            return Err(BubbleError::audio("wav file contains no samples"));
        }
        let channels = spec.channels.max(1) as usize;
        let mono: Vec<f32> = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();
        debug!(
            samples = mono.len(),
            rate = spec.sample_rate,
            "wav source loaded"
        );
        self.source = Some(Source::Wav {
            samples: Arc::new(mono),
            sample_rate: spec.sample_rate,
            epoch_ms: now_ms,
        });
        Ok(())
    }

    /// Tear down the source and return the analyzer to silence. Synchronous:
    /// after this returns no callback is feeding samples.
    pub fn stop(&mut self) {
        self.source = None;
        lock_analyzer(&self.analyzer).reset();
    }

    /// Advance analysis to `now_ms` and return the snapshot. Neutral when no
    /// source is active.
    pub fn tick(&mut self, now_ms: f64) -> AudioSnapshot {
        match &self.source {
            None => AudioSnapshot::neutral(),
            Some(Source::Mic { .. }) => lock_analyzer(&self.analyzer).update(),
            Some(Source::Wav {
                samples,
                sample_rate,
                epoch_ms,
            }) => {
                let mut analyzer = lock_analyzer(&self.analyzer);
                let window = wav_window(samples, *sample_rate, *epoch_ms, now_ms, analyzer.fft_size());
                analyzer.feed(&window);
                analyzer.update()
            }
        }
    }

    pub fn snapshot(&self) -> AudioSnapshot {
        lock_analyzer(&self.analyzer).snapshot()
    }
}

impl Default for AudioCapture {
    fn default() -> Self {
        Self::new()
    }
}

fn feed_interleaved(analyzer: &Arc<Mutex<SpectrumAnalyzer>>, data: &[f32], channels: usize) {
    let channels = channels.max(1);
    let mono: Vec<f32> = data
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();
    lock_analyzer(analyzer).feed(&mono);
}

/// Analysis window ending at the looped playhead for `now_ms`.
fn wav_window(
    samples: &[f32],
    sample_rate: u32,
    epoch_ms: f64,
    now_ms: f64,
    len: usize,
) -> Vec<f32> {
    let total = samples.len();
    let elapsed_s = ((now_ms - epoch_ms) / 1000.0).max(0.0);
    let playhead = (elapsed_s * f64::from(sample_rate)) as usize % total;
    (0..len)
        .map(|i| {
            // Window ends at the playhead, wrapping through the loop.
            let idx = (playhead + total - (len - 1 - i) % total) % total;
            samples[idx]
        })
        .collect()
}

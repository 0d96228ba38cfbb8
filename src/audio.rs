//! Audio Analysis System for WaveScope
//! FFT-based per-frame analysis producing byte-magnitude buffers

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver};
use rodio::{Decoder, OutputStream, Sink};
use rustfft::{num_complex::Complex, FftPlanner};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::config::AnalysisConfig;

/// One analysis frame: frequency-domain and time-domain magnitudes as
/// unsigned bytes, the way the renderers consume them. Both buffers hold
/// `fft_size / 2` values. Frequency bytes map smoothed dB magnitudes onto
/// 0..=255 (silence is 0); time-domain bytes center the signal on 128.
#[derive(Clone, Debug)]
pub struct AudioFrame {
    pub spectrum: Vec<u8>,
    pub waveform: Vec<u8>,
    pub time: f32,
    pub frame_index: usize,
}

impl Default for AudioFrame {
    fn default() -> Self {
        Self {
            spectrum: vec![0; 1024],
            waveform: vec![128; 1024],
            time: 0.0,
            frame_index: 0,
        }
    }
}

/// Pre-analyzed audio data for frame-accurate sync
#[derive(Clone)]
pub struct AudioAnalysis {
    pub frames: Vec<AudioFrame>,
    pub sample_rate: u32,
    pub duration: f32,
    pub total_frames: usize,
    pub fps: u32,
}

impl AudioAnalysis {
    pub fn get_frame(&self, index: usize) -> AudioFrame {
        self.frames.get(index).cloned().unwrap_or_default()
    }
}

// ============================================================================
// Frame statistics
// ============================================================================

/// Display-only aggregates over one frequency buffer: mean magnitude, peak
/// magnitude, and mean over the lowest 10% of bins (the bass band).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub avg: u8,
    pub peak: u8,
    pub bass: u8,
}

impl FrameStats {
    pub fn measure(spectrum: &[u8]) -> Self {
        if spectrum.is_empty() {
            return Self::default();
        }

        let mut sum = 0u32;
        let mut peak = 0u8;
        let mut bass_sum = 0u32;
        let bass_range = spectrum.len() / 10;

        for (i, &value) in spectrum.iter().enumerate() {
            sum += value as u32;
            if value > peak {
                peak = value;
            }
            if i < bass_range {
                bass_sum += value as u32;
            }
        }

        let avg = (sum as f32 / spectrum.len() as f32).round() as u8;
        let bass = if bass_range > 0 {
            (bass_sum as f32 / bass_range as f32).round() as u8
        } else {
            0
        };

        Self { avg, peak, bass }
    }
}

// ============================================================================
// Byte conversion
// ============================================================================

/// Map a linear magnitude onto 0..=255 through the configured dB window.
fn byte_frequency(magnitude: f32, config: &AnalysisConfig) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = (db - config.min_db) / (config.max_db - config.min_db);
    (scaled.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Map a sample in [-1, 1] onto 0..=255 centered on 128.
fn byte_time_domain(sample: f32) -> u8 {
    (sample.clamp(-1.0, 1.0) * 128.0 + 128.0).clamp(0.0, 255.0) as u8
}

// ============================================================================
// Analysis
// ============================================================================

/// Analyze a mono sample stream into per-frame byte buffers.
pub fn analyze_samples(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> AudioAnalysis {
    let fft_size = config.fft_size;
    let bins = config.bins();
    let fps = config.fps.max(1);
    let smoothing = config.smoothing.clamp(0.0, 0.99);

    let duration = samples.len() as f32 / sample_rate as f32;
    let samples_per_frame = (sample_rate / fps).max(1) as usize;
    let total_frames = samples.len() / samples_per_frame;

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);

    let mut frames = Vec::with_capacity(total_frames);
    let mut smoothed = vec![0.0f32; bins];

    for frame_idx in 0..total_frames {
        let start = frame_idx * samples_per_frame;
        let end = (start + fft_size).min(samples.len());

        let mut fft_buffer: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); fft_size];
        for (i, &sample) in samples[start..end].iter().enumerate() {
            // Hann window
            let window =
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / fft_size as f32).cos());
            fft_buffer[i] = Complex::new(sample * window, 0.0);
        }

        fft.process(&mut fft_buffer);

        let mut spectrum = Vec::with_capacity(bins);
        for (k, c) in fft_buffer[..bins].iter().enumerate() {
            let magnitude = c.norm() / fft_size as f32;
            smoothed[k] = smoothed[k] * smoothing + magnitude * (1.0 - smoothing);
            spectrum.push(byte_frequency(smoothed[k], config));
        }

        let waveform: Vec<u8> = (0..bins)
            .map(|i| byte_time_domain(samples.get(start + i).copied().unwrap_or(0.0)))
            .collect();

        frames.push(AudioFrame {
            spectrum,
            waveform,
            time: frame_idx as f32 / fps as f32,
            frame_index: frame_idx,
        });
    }

    AudioAnalysis {
        frames,
        sample_rate,
        duration,
        total_frames,
        fps,
    }
}

/// Decode an audio file to mono f32 samples.
fn decode_samples(path: &Path) -> anyhow::Result<(Vec<f32>, u32)> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension() {
        hint.with_extension(&ext.to_string_lossy());
    }

    let format_opts = FormatOptions::default();
    let metadata_opts = MetadataOptions::default();
    let decoder_opts = DecoderOptions::default();

    let probed =
        symphonia::default::get_probe().format(&hint, mss, &format_opts, &metadata_opts)?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| anyhow::anyhow!("No audio track found"))?;

    let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
    let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(2);
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs().make(&track.codec_params, &decoder_opts)?;

    let mut all_samples: Vec<f32> = Vec::new();

    loop {
        match format.next_packet() {
            Ok(packet) => {
                if packet.track_id() != track_id {
                    continue;
                }

                match decoder.decode(&packet) {
                    Ok(decoded) => {
                        let spec = decoded.spec();
                        let frames = decoded.frames();

                        let mut sample_buf = SampleBuffer::<f32>::new(frames as u64, *spec);
                        sample_buf.copy_interleaved_ref(decoded);

                        // Mix to mono
                        let samples = sample_buf.samples();
                        for chunk in samples.chunks(channels) {
                            let mono: f32 = chunk.iter().sum::<f32>() / channels as f32;
                            all_samples.push(mono);
                        }
                    }
                    Err(_) => continue,
                }
            }
            Err(_) => break,
        }
    }

    Ok((all_samples, sample_rate))
}

/// Decode and analyze an audio file.
pub fn analyze_audio(path: &str, config: &AnalysisConfig) -> anyhow::Result<AudioAnalysis> {
    let (samples, sample_rate) = decode_samples(Path::new(path))?;
    if samples.is_empty() {
        anyhow::bail!("No decodable audio in {}", path);
    }
    Ok(analyze_samples(&samples, sample_rate, config))
}

// ============================================================================
// Playback
// ============================================================================

/// Audio System - handles playback and analysis
pub struct AudioSystem {
    _stream: OutputStream,
    _stream_handle: rodio::OutputStreamHandle,
    sink: Arc<Sink>,
    pub analysis: Option<Arc<AudioAnalysis>>,
    pub source_path: Option<String>,
    is_stopped: bool,
}

impl AudioSystem {
    pub fn new() -> Self {
        let (_stream, stream_handle) =
            OutputStream::try_default().expect("Failed to create audio output stream");
        let sink = Arc::new(Sink::try_new(&stream_handle).expect("Failed to create sink"));

        Self {
            _stream,
            _stream_handle: stream_handle,
            sink,
            analysis: None,
            source_path: None,
            is_stopped: false,
        }
    }

    /// Analyze a local file and prepare it for playback.
    pub fn load_file(&mut self, path: String, config: &AnalysisConfig) -> anyhow::Result<()> {
        let analysis = analyze_audio(&path, config)?;
        self.install(analysis, path)
    }

    /// Adopt an already-analyzed source (local file or downloaded stream).
    pub fn install(&mut self, analysis: AudioAnalysis, path: String) -> anyhow::Result<()> {
        self.analysis = Some(Arc::new(analysis));
        self.source_path = Some(path);
        self.reload_audio_source()?;
        self.is_stopped = false;
        Ok(())
    }

    /// Reload audio source from stored path (internal use)
    fn reload_audio_source(&self) -> anyhow::Result<()> {
        if let Some(ref path) = self.source_path {
            let file = File::open(path)?;
            let reader = BufReader::new(file);
            let source = Decoder::new(reader)?;

            self.sink.stop();
            self.sink.append(source);
            self.sink.pause();
        }
        Ok(())
    }

    pub fn play(&mut self) {
        // If stopped, reload the audio source first
        if self.is_stopped || self.sink.empty() {
            if let Err(e) = self.reload_audio_source() {
                eprintln!("Failed to reload audio: {}", e);
                return;
            }
            self.is_stopped = false;
        }
        self.sink.play();
    }

    pub fn pause(&self) {
        self.sink.pause();
    }

    pub fn stop(&mut self) {
        self.sink.stop();
        self.is_stopped = true;
    }

    pub fn set_volume(&self, volume: f32) {
        self.sink.set_volume(volume.clamp(0.0, 1.0));
    }

    pub fn is_loaded(&self) -> bool {
        self.analysis.is_some()
    }
}

// ============================================================================
// Stream fetching
// ============================================================================

/// Outcome of a background stream fetch.
pub enum StreamMessage {
    Loaded {
        path: String,
        analysis: AudioAnalysis,
    },
    Failed(String),
}

/// Download an audio URL and analyze it on a background thread. The receiver
/// yields exactly one message.
pub fn fetch_stream(url: String, config: AnalysisConfig) -> Receiver<StreamMessage> {
    let (tx, rx) = bounded(1);
    std::thread::spawn(move || {
        let msg = match download_and_analyze(&url, &config) {
            Ok((path, analysis)) => StreamMessage::Loaded { path, analysis },
            Err(e) => StreamMessage::Failed(e.to_string()),
        };
        let _ = tx.send(msg);
    });
    rx
}

fn download_and_analyze(
    url: &str,
    config: &AnalysisConfig,
) -> anyhow::Result<(String, AudioAnalysis)> {
    let response = reqwest::blocking::get(url)?.error_for_status()?;
    let bytes = response.bytes()?;

    // Keep the URL's extension so the decoder gets a format hint
    let trimmed = url
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or(url);
    let ext = Path::new(trimmed)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("mp3");

    let path = std::env::temp_dir().join(format!("wavescope-{}.{}", std::process::id(), ext));
    std::fs::write(&path, &bytes)?;

    let path = path.to_string_lossy().to_string();
    let analysis = analyze_audio(&path, config)?;
    Ok((path, analysis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_all_zero_buffer() {
        let stats = FrameStats::measure(&[0u8; 1024]);
        assert_eq!(stats, FrameStats { avg: 0, peak: 0, bass: 0 });
    }

    #[test]
    fn test_stats_all_max_buffer() {
        let stats = FrameStats::measure(&[255u8; 1024]);
        assert_eq!(
            stats,
            FrameStats {
                avg: 255,
                peak: 255,
                bass: 255
            }
        );
    }

    #[test]
    fn test_stats_bass_band_is_lowest_tenth() {
        // 1024 bins -> bass band covers bins 0..102
        let mut buffer = [0u8; 1024];
        for value in buffer.iter_mut().take(102) {
            *value = 200;
        }
        buffer[500] = 255;

        let stats = FrameStats::measure(&buffer);
        assert_eq!(stats.bass, 200);
        assert_eq!(stats.peak, 255);
        assert!(stats.avg < 200);
    }

    #[test]
    fn test_stats_buffer_shorter_than_ten_bins() {
        // Bass range floors to zero; bass reads 0 rather than dividing by it.
        let stats = FrameStats::measure(&[100u8; 5]);
        assert_eq!(stats.avg, 100);
        assert_eq!(stats.peak, 100);
        assert_eq!(stats.bass, 0);
    }

    #[test]
    fn test_byte_time_domain_anchors() {
        assert_eq!(byte_time_domain(0.0), 128);
        assert_eq!(byte_time_domain(-1.0), 0);
        assert_eq!(byte_time_domain(1.0), 255);
        // Out-of-range samples clamp instead of wrapping
        assert_eq!(byte_time_domain(4.0), 255);
        assert_eq!(byte_time_domain(-4.0), 0);
    }

    #[test]
    fn test_byte_frequency_window() {
        let config = AnalysisConfig::default();

        assert_eq!(byte_frequency(0.0, &config), 0);
        // At or below the floor of the dB window
        let floor = 10.0f32.powf(config.min_db / 20.0);
        assert_eq!(byte_frequency(floor, &config), 0);
        // At or above the ceiling
        let ceiling = 10.0f32.powf(config.max_db / 20.0);
        assert_eq!(byte_frequency(ceiling, &config), 255);
        assert_eq!(byte_frequency(1.0, &config), 255);
        // Midpoint of the window maps near the middle of the byte range
        let mid = 10.0f32.powf((config.min_db + config.max_db) / 2.0 / 20.0);
        let byte = byte_frequency(mid, &config);
        assert!((127..=129).contains(&byte), "got {byte}");
    }

    #[test]
    fn test_analyze_silence_yields_zero_spectrum() {
        let config = AnalysisConfig::default();
        let samples = vec![0.0f32; 44100];
        let analysis = analyze_samples(&samples, 44100, &config);

        assert_eq!(analysis.fps, 60);
        assert_eq!(analysis.sample_rate, 44100);
        assert!((analysis.duration - 1.0).abs() < 0.01);
        assert!(analysis.total_frames > 0);
        assert_eq!(analysis.frames[1].frame_index, 1);
        assert!((analysis.frames[1].time - 1.0 / 60.0).abs() < 1e-6);
        for frame in &analysis.frames {
            assert_eq!(frame.spectrum.len(), config.bins());
            assert_eq!(frame.waveform.len(), config.bins());
            assert!(frame.spectrum.iter().all(|&v| v == 0));
            assert!(frame.waveform.iter().all(|&v| v == 128));
            assert_eq!(FrameStats::measure(&frame.spectrum), FrameStats::default());
        }
    }

    #[test]
    fn test_analyze_sine_concentrates_energy_in_one_bin() {
        let config = AnalysisConfig::default();
        let sample_rate = 44100u32;
        // 1 kHz sine, loud enough to clear the dB floor
        let samples: Vec<f32> = (0..sample_rate)
            .map(|i| (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / sample_rate as f32).sin())
            .collect();
        let analysis = analyze_samples(&samples, sample_rate, &config);

        // Skip early frames so temporal smoothing has settled
        let frame = analysis.get_frame(30);
        let stats = FrameStats::measure(&frame.spectrum);
        assert!(stats.peak > 128, "peak {}", stats.peak);

        let loudest = frame
            .spectrum
            .iter()
            .enumerate()
            .max_by_key(|(_, &v)| v)
            .map(|(i, _)| i)
            .unwrap();
        let expected = (1000.0 * config.fft_size as f32 / sample_rate as f32).round() as usize;
        assert!(
            loudest.abs_diff(expected) <= 2,
            "loudest bin {loudest}, expected near {expected}"
        );
    }

    #[test]
    fn test_default_frame_is_silent_midline() {
        let frame = AudioFrame::default();
        assert!(frame.spectrum.iter().all(|&v| v == 0));
        assert!(frame.waveform.iter().all(|&v| v == 128));
    }
}

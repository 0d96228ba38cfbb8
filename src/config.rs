//! Configuration System for WaveScope
//! Analysis, playback and visual settings with JSON save/load

use serde::{Deserialize, Serialize};

// ============================================================================
// Analysis
// ============================================================================

/// FFT and byte-conversion settings. The frequency buffer handed to the
/// renderers always has `fft_size / 2` bins.
#[derive(Clone, Copy, Serialize, Deserialize, Debug)]
pub struct AnalysisConfig {
    /// Analysis window size in samples. Must be a power of two.
    pub fft_size: usize,
    /// Analysis frame rate; one spectrum/waveform snapshot per frame.
    pub fps: u32,
    /// Temporal smoothing applied to magnitudes between frames (0.0-0.99).
    pub smoothing: f32,
    /// Magnitudes at or below this level map to byte 0.
    pub min_db: f32,
    /// Magnitudes at or above this level map to byte 255.
    pub max_db: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            fps: 60,
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
        }
    }
}

impl AnalysisConfig {
    /// Number of frequency bins (and time-domain samples) per frame.
    pub fn bins(&self) -> usize {
        self.fft_size / 2
    }
}

// ============================================================================
// Playback
// ============================================================================

#[derive(Clone, Copy, Serialize, Deserialize, Debug)]
pub struct PlaybackConfig {
    pub volume: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { volume: 1.0 }
    }
}

// ============================================================================
// Visuals
// ============================================================================

#[derive(Clone, Copy, Serialize, Deserialize, Debug)]
pub struct VisualConfig {
    /// How many recent frames of geometry the trailing presets keep alive.
    pub trail_frames: usize,
    /// Per-frame brightness retention of trailing geometry (0.0-1.0).
    pub trail_decay: f32,
    pub background: [u8; 3],
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            trail_frames: 14,
            trail_decay: 0.9,
            background: [0, 0, 0],
        }
    }
}

// ============================================================================
// Main App Configuration
// ============================================================================

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub visual: VisualConfig,
}

impl AppConfig {
    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &str) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&json)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bins_is_half_window() {
        let config = AnalysisConfig::default();
        assert_eq!(config.fft_size, 2048);
        assert_eq!(config.bins(), 1024);

        let small = AnalysisConfig {
            fft_size: 512,
            ..Default::default()
        };
        assert_eq!(small.bins(), 256);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.analysis.fft_size, config.analysis.fft_size);
        assert_eq!(back.visual.trail_frames, config.visual.trail_frames);
    }

    #[test]
    fn test_missing_sections_fall_back_to_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.analysis.fps, 60);
        assert!((config.playback.volume - 1.0).abs() < f32::EPSILON);
    }
}

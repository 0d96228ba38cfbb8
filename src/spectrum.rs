//! Spectrum Renderers for WaveScope
//! Frequency-domain presets: vertical bars, radial trail, chunky bass

use std::collections::VecDeque;

use egui::{Color32, Painter, Pos2, Rect, Stroke};

use crate::audio::AudioFrame;
use crate::config::VisualConfig;

/// Number of downsampled bars in the chunky-bass preset, independent of the
/// buffer length. Any remainder samples past the last full chunk are ignored.
pub const DISPLAY_BARS: usize = 64;
/// Share of display bars treated as bass and boosted/recolored.
pub const BASS_FRACTION: f32 = 0.2;

const CIRCLE_RADIUS: f32 = 80.0;
const MAX_SEGMENT: f32 = 100.0;

/// Frequency-domain preset renderers. The radial preset keeps a short
/// history of spectra so older segments fade out, standing in for the
/// semi-transparent clear a retained canvas would give.
pub struct SpectrumRenderer {
    circular_trail: VecDeque<Vec<u8>>,
}

impl SpectrumRenderer {
    pub fn new() -> Self {
        Self {
            circular_trail: VecDeque::new(),
        }
    }

    /// One vertical bar per bin, height and color driven by magnitude.
    pub fn render_bars(&self, painter: &Painter, rect: Rect, frame: &AudioFrame) {
        let len = frame.spectrum.len();
        if len == 0 {
            return;
        }

        let bar_width = rect.width() / len as f32 * 2.5;
        let mut x = rect.left();

        for &value in &frame.spectrum {
            let bar_height = value as f32 / 255.0 * rect.height();
            let red = (value as u16 + 100).min(255) as u8;
            let color = Color32::from_rgb(red, 50, 150);

            let bar = Rect::from_min_max(
                Pos2::new(x, rect.bottom() - bar_height),
                Pos2::new(x + bar_width, rect.bottom()),
            );
            painter.rect_filled(bar, 0.0, color);

            x += bar_width + 1.0;
            if x > rect.right() {
                break;
            }
        }
    }

    /// Radial segments around a fixed circle, hue sweeping the full wheel,
    /// recent frames fading behind the current one.
    pub fn render_circular(
        &mut self,
        painter: &Painter,
        rect: Rect,
        frame: &AudioFrame,
        visual: &VisualConfig,
    ) {
        self.circular_trail.push_back(frame.spectrum.clone());
        while self.circular_trail.len() > visual.trail_frames.max(1) {
            self.circular_trail.pop_front();
        }

        let center = rect.center();
        let newest = self.circular_trail.len() - 1;
        let decay = visual.trail_decay.clamp(0.0, 1.0);

        for (slot, spectrum) in self.circular_trail.iter().enumerate() {
            let fade = decay.powi((newest - slot) as i32);
            let alpha = (fade * 255.0) as u8;
            if alpha < 8 {
                continue;
            }

            let len = spectrum.len();
            for (i, &value) in spectrum.iter().enumerate() {
                if value == 0 {
                    continue;
                }

                let segment = value as f32 / 255.0 * MAX_SEGMENT;
                let angle = i as f32 / len as f32 * std::f32::consts::TAU;
                let (sin, cos) = angle.sin_cos();

                let inner = Pos2::new(
                    center.x + cos * CIRCLE_RADIUS,
                    center.y + sin * CIRCLE_RADIUS,
                );
                let outer = Pos2::new(
                    center.x + cos * (CIRCLE_RADIUS + segment),
                    center.y + sin * (CIRCLE_RADIUS + segment),
                );

                let hue = i as f32 / len as f32 * 360.0;
                let base = hsl_color(hue, 1.0, 0.5);
                let color =
                    Color32::from_rgba_unmultiplied(base.r(), base.g(), base.b(), alpha);
                painter.line_segment([inner, outer], Stroke::new(2.0, color));
            }
        }
    }

    /// 64 fat bars from chunk-averaged bins; the bass share is boosted 1.5x
    /// and drawn red, the rest blue.
    pub fn render_chunky(&self, painter: &Painter, rect: Rect, frame: &AudioFrame) {
        let averages = chunk_averages(&frame.spectrum);
        let bar_width = rect.width() / DISPLAY_BARS as f32;

        for (i, &value) in averages.iter().enumerate() {
            let is_bass = (i as f32) < DISPLAY_BARS as f32 * BASS_FRACTION;
            let boost = if is_bass { 1.5 } else { 1.0 };
            let bar_height = value / 255.0 * rect.height() * boost;

            let hue = if is_bass { 0.0 } else { 200.0 };
            let lightness = ((50.0 + value / 5.0) / 100.0).min(1.0);
            let color = hsl_color(hue, 1.0, lightness);

            let x = rect.left() + i as f32 * bar_width;
            let bar = Rect::from_min_max(
                Pos2::new(x, rect.bottom() - bar_height),
                Pos2::new(x + bar_width - 2.0, rect.bottom()),
            );
            painter.rect_filled(bar, 0.0, color);
        }
    }
}

/// Downsample a spectrum into exactly `DISPLAY_BARS` chunk averages.
/// Remainder samples past the last full chunk are silently dropped.
pub(crate) fn chunk_averages(spectrum: &[u8]) -> [f32; DISPLAY_BARS] {
    let mut bars = [0.0f32; DISPLAY_BARS];
    let samples_per_bar = spectrum.len() / DISPLAY_BARS;
    if samples_per_bar == 0 {
        return bars;
    }

    for (i, bar) in bars.iter_mut().enumerate() {
        let start = i * samples_per_bar;
        let sum: u32 = spectrum[start..start + samples_per_bar]
            .iter()
            .map(|&v| v as u32)
            .sum();
        *bar = sum as f32 / samples_per_bar as f32;
    }

    bars
}

/// HSL to Color32, hue in degrees, saturation and lightness in [0, 1].
pub fn hsl_color(hue: f32, saturation: f32, lightness: f32) -> Color32 {
    let h = hue.rem_euclid(360.0) / 60.0;
    let s = saturation.clamp(0.0, 1.0);
    let l = lightness.clamp(0.0, 1.0);

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    let m = l - c / 2.0;
    Color32::from_rgb(
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_count_is_fixed_regardless_of_length() {
        for len in [64usize, 512, 1000, 1024, 4096] {
            let buffer = vec![100u8; len];
            let bars = chunk_averages(&buffer);
            assert_eq!(bars.len(), DISPLAY_BARS);
            assert!(bars.iter().all(|&b| (b - 100.0).abs() < f32::EPSILON));
        }
    }

    #[test]
    fn test_chunk_averages_drop_remainder() {
        // 1000 bins -> 15 samples per bar, the trailing 40 never contribute.
        let mut buffer = vec![10u8; 1000];
        for value in buffer.iter_mut().skip(960) {
            *value = 255;
        }
        let bars = chunk_averages(&buffer);
        assert!(bars.iter().all(|&b| (b - 10.0).abs() < f32::EPSILON));
    }

    #[test]
    fn test_chunk_averages_short_buffer() {
        // Fewer bins than bars: no full chunk exists, every bar reads zero.
        let bars = chunk_averages(&[200u8; 10]);
        assert!(bars.iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_chunk_averages_follow_their_chunk() {
        let mut buffer = vec![0u8; 1024];
        // Light up exactly the second chunk (bins 16..32)
        for value in buffer.iter_mut().take(32).skip(16) {
            *value = 128;
        }
        let bars = chunk_averages(&buffer);
        assert!((bars[1] - 128.0).abs() < f32::EPSILON);
        assert_eq!(bars[0], 0.0);
        assert_eq!(bars[2], 0.0);
    }

    #[test]
    fn test_hsl_primary_anchors() {
        assert_eq!(hsl_color(0.0, 1.0, 0.5), Color32::from_rgb(255, 0, 0));
        assert_eq!(hsl_color(120.0, 1.0, 0.5), Color32::from_rgb(0, 255, 0));
        assert_eq!(hsl_color(240.0, 1.0, 0.5), Color32::from_rgb(0, 0, 255));
        assert_eq!(hsl_color(0.0, 0.0, 1.0), Color32::from_rgb(255, 255, 255));
        assert_eq!(hsl_color(0.0, 0.0, 0.0), Color32::from_rgb(0, 0, 0));
    }

    #[test]
    fn test_hsl_wraps_and_clamps() {
        assert_eq!(hsl_color(360.0, 1.0, 0.5), hsl_color(0.0, 1.0, 0.5));
        // Overdriven lightness (chunky bars at full magnitude) pins to white
        assert_eq!(hsl_color(200.0, 1.0, 1.5), Color32::from_rgb(255, 255, 255));
    }
}

//! Oscilloscope Renderer for WaveScope
//! Time-domain polyline across the full surface width

use egui::{Color32, Painter, Pos2, Rect, Stroke};

use crate::audio::AudioFrame;

const LINE_COLOR: Color32 = Color32::from_rgb(0, 255, 0);
const LINE_WIDTH: f32 = 2.0;

/// Draw the time-domain buffer as a connected polyline. Byte 128 sits on the
/// vertical midline; the final segment returns to it at the right edge.
pub fn render_oscilloscope(painter: &Painter, rect: Rect, frame: &AudioFrame) {
    let samples = &frame.waveform;
    if samples.is_empty() {
        return;
    }

    let slice_width = rect.width() / samples.len() as f32;
    let mut points: Vec<Pos2> = Vec::with_capacity(samples.len() + 1);

    for (i, &value) in samples.iter().enumerate() {
        let v = value as f32 / 128.0;
        let x = rect.left() + i as f32 * slice_width;
        let y = rect.top() + v * rect.height() / 2.0;
        points.push(Pos2::new(x, y));
    }

    points.push(Pos2::new(rect.right(), rect.top() + rect.height() / 2.0));

    let stroke = Stroke::new(LINE_WIDTH, LINE_COLOR);
    for i in 0..points.len() - 1 {
        painter.line_segment([points[i], points[i + 1]], stroke);
    }
}

//! Particle Field for WaveScope
//! Persistent audio-driven particles with fading trails

use std::collections::VecDeque;

use egui::{Color32, Painter, Pos2, Rect, Vec2};
use rand::Rng;

use crate::audio::AudioFrame;
use crate::config::VisualConfig;
use crate::spectrum::hsl_color;

pub const PARTICLE_COUNT: usize = 100;

/// Individual particle data. Positions are relative to the drawing surface.
#[derive(Clone)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: f32,
}

#[derive(Clone, Copy)]
struct TrailDot {
    pos: Pos2,
    radius: f32,
    color: Color32,
}

/// Particle preset state. Seeded lazily on first draw and kept for the
/// lifetime of the app; switching presets never resets it.
pub struct ParticleField {
    particles: Vec<Particle>,
    trail: VecDeque<Vec<TrailDot>>,
}

impl ParticleField {
    pub fn new() -> Self {
        Self {
            particles: Vec::new(),
            trail: VecDeque::new(),
        }
    }

    fn ensure_init(&mut self, width: f32, height: f32) {
        if !self.particles.is_empty() {
            return;
        }

        let mut rng = rand::thread_rng();
        self.particles = (0..PARTICLE_COUNT)
            .map(|_| Particle {
                pos: Vec2::new(rng.gen::<f32>() * width, rng.gen::<f32>() * height),
                vel: Vec2::new(
                    (rng.gen::<f32>() - 0.5) * 2.0,
                    (rng.gen::<f32>() - 0.5) * 2.0,
                ),
                size: rng.gen::<f32>() * 3.0 + 1.0,
            })
            .collect();
    }

    /// Advance one frame. Each particle's step is scaled by the magnitude at
    /// its mapped frequency bin; positions reflect off the edges and stay
    /// clamped inside the surface.
    fn step(&mut self, spectrum: &[u8], width: f32, height: f32) {
        let count = self.particles.len().max(1);
        for (i, p) in self.particles.iter_mut().enumerate() {
            let freq_index = i * spectrum.len() / count;
            let intensity = spectrum.get(freq_index).copied().unwrap_or(0) as f32 / 255.0;

            p.pos += p.vel * (1.0 + intensity);

            if p.pos.x < 0.0 || p.pos.x > width {
                p.vel.x = -p.vel.x;
            }
            if p.pos.y < 0.0 || p.pos.y > height {
                p.vel.y = -p.vel.y;
            }

            p.pos.x = p.pos.x.clamp(0.0, width);
            p.pos.y = p.pos.y.clamp(0.0, height);
        }
    }

    pub fn render(
        &mut self,
        painter: &Painter,
        rect: Rect,
        frame: &AudioFrame,
        visual: &VisualConfig,
    ) {
        self.ensure_init(rect.width(), rect.height());
        self.step(&frame.spectrum, rect.width(), rect.height());

        let count = self.particles.len().max(1);
        let dots: Vec<TrailDot> = self
            .particles
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let freq_index = i * frame.spectrum.len() / count;
                let intensity =
                    frame.spectrum.get(freq_index).copied().unwrap_or(0) as f32 / 255.0;
                let hue = i as f32 / count as f32 * 360.0;

                TrailDot {
                    pos: rect.min + p.pos,
                    radius: p.size * (1.0 + intensity),
                    color: hsl_color(hue, 1.0, 0.5 + intensity * 0.5),
                }
            })
            .collect();

        self.trail.push_back(dots);
        while self.trail.len() > visual.trail_frames.max(1) {
            self.trail.pop_front();
        }

        let newest = self.trail.len() - 1;
        let decay = visual.trail_decay.clamp(0.0, 1.0);

        for (slot, dots) in self.trail.iter().enumerate() {
            let fade = decay.powi((newest - slot) as i32);
            let alpha = (fade * 255.0) as u8;
            if alpha < 8 {
                continue;
            }

            for dot in dots {
                let color = Color32::from_rgba_unmultiplied(
                    dot.color.r(),
                    dot.color.g(),
                    dot.color.b(),
                    alpha,
                );
                painter.circle_filled(dot.pos, dot.radius, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_seeds_hundred_particles_in_bounds() {
        let mut field = ParticleField::new();
        field.ensure_init(800.0, 600.0);

        assert_eq!(field.particles.len(), PARTICLE_COUNT);
        for p in &field.particles {
            assert!((0.0..=800.0).contains(&p.pos.x));
            assert!((0.0..=600.0).contains(&p.pos.y));
            assert!((-1.0..=1.0).contains(&p.vel.x));
            assert!((-1.0..=1.0).contains(&p.vel.y));
            assert!((1.0..=4.0).contains(&p.size));
        }
    }

    #[test]
    fn test_init_is_lazy_and_happens_once() {
        let mut field = ParticleField::new();
        assert!(field.particles.is_empty());

        field.ensure_init(800.0, 600.0);
        field.particles[0].pos = Vec2::new(12.5, 34.5);

        // Further calls keep existing state
        field.ensure_init(800.0, 600.0);
        assert_eq!(field.particles.len(), PARTICLE_COUNT);
        assert_eq!(field.particles[0].pos, Vec2::new(12.5, 34.5));
    }

    #[test]
    fn test_particles_stay_inside_after_many_steps() {
        let mut field = ParticleField::new();
        field.ensure_init(200.0, 150.0);

        let spectrum = [255u8; 1024];
        for _ in 0..1000 {
            field.step(&spectrum, 200.0, 150.0);
        }

        for p in &field.particles {
            assert!((0.0..=200.0).contains(&p.pos.x));
            assert!((0.0..=150.0).contains(&p.pos.y));
        }
    }

    #[test]
    fn test_step_scales_with_intensity() {
        let mut field = ParticleField::new();
        field.particles = vec![Particle {
            pos: Vec2::new(100.0, 100.0),
            vel: Vec2::new(1.0, 0.0),
            size: 2.0,
        }];

        field.step(&[0u8; 64], 800.0, 600.0);
        assert!((field.particles[0].pos.x - 101.0).abs() < 1e-4);

        field.step(&[255u8; 64], 800.0, 600.0);
        assert!((field.particles[0].pos.x - 103.0).abs() < 1e-4);
    }
}

//! Progressive accumulation film.
//!
//! Row-major grid of linear-color cells holding a running average over
//! render iterations. Rows are individually lockable: during an iteration
//! each row is claimed by exactly one worker, so row locks are
//! uncontended on the write side and exist to make display snapshots
//! safe at any time.

use ember_math::Vec3;
use std::sync::Mutex;

/// The accumulation buffer shared between workers and display reads.
#[derive(Debug)]
pub struct Film {
    width: u32,
    height: u32,
    rows: Vec<Mutex<Vec<Vec3>>>,
}

impl Film {
    /// Create a film cleared to black.
    pub fn new(width: u32, height: u32) -> Self {
        let rows = (0..height)
            .map(|_| Mutex::new(vec![Vec3::ZERO; width as usize]))
            .collect();

        Self {
            width,
            height,
            rows,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Blend one freshly traced row into the running average.
    ///
    /// `iteration` is the number of iterations completed before this one;
    /// the blend weight 1/(iteration+1) keeps every cell an unweighted
    /// mean of all estimates so far.
    pub fn blend_row(&self, y: usize, samples: &[Vec3], iteration: u32) {
        let weight = 1.0 / (iteration + 1) as f32;
        let mut row = self.rows[y].lock().unwrap();
        debug_assert_eq!(row.len(), samples.len());

        for (cell, sample) in row.iter_mut().zip(samples) {
            *cell = *cell * (1.0 - weight) + *sample * weight;
        }
    }

    /// Copy the current frame out, row-major.
    pub fn snapshot(&self) -> Vec<Vec3> {
        let mut out = Vec::with_capacity((self.width * self.height) as usize);
        for row in &self.rows {
            out.extend_from_slice(&row.lock().unwrap());
        }
        out
    }
}

/// Convert one linear-color cell to display-ready 8-bit RGB.
///
/// Gamma encoding: channel = clamp(value^0.45 * 255.99, 0, 255.99).
/// When and how often to run this over the film is the caller's policy.
pub fn color_to_rgb(color: Vec3) -> [u8; 3] {
    let encoded = (color.max(Vec3::ZERO).powf(0.45) * 255.99).min(Vec3::splat(255.99));
    [encoded.x as u8, encoded.y as u8, encoded.z as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_iteration_replaces_black() {
        let film = Film::new(3, 2);
        let row = vec![Vec3::ONE, Vec3::splat(2.0), Vec3::splat(3.0)];

        film.blend_row(0, &row, 0);

        let frame = film.snapshot();
        assert_eq!(frame[0], Vec3::ONE);
        assert_eq!(frame[2], Vec3::splat(3.0));
        // Untouched row stays black
        assert_eq!(frame[3], Vec3::ZERO);
    }

    #[test]
    fn test_running_average_weights() {
        let film = Film::new(1, 1);

        film.blend_row(0, &[Vec3::splat(1.0)], 0);
        film.blend_row(0, &[Vec3::splat(3.0)], 1);
        assert!((film.snapshot()[0] - Vec3::splat(2.0)).length() < 1e-6);

        film.blend_row(0, &[Vec3::splat(5.0)], 2);
        assert!((film.snapshot()[0] - Vec3::splat(3.0)).length() < 1e-5);
    }

    #[test]
    fn test_snapshot_is_row_major() {
        let film = Film::new(2, 2);
        film.blend_row(0, &[Vec3::X, Vec3::Y], 0);
        film.blend_row(1, &[Vec3::Z, Vec3::ONE], 0);

        let frame = film.snapshot();
        assert_eq!(frame, vec![Vec3::X, Vec3::Y, Vec3::Z, Vec3::ONE]);
    }

    #[test]
    fn test_color_to_rgb_clamps() {
        assert_eq!(color_to_rgb(Vec3::ZERO), [0, 0, 0]);
        assert_eq!(color_to_rgb(Vec3::splat(-1.0)), [0, 0, 0]);
        assert_eq!(color_to_rgb(Vec3::splat(100.0)), [255, 255, 255]);

        let [r, g, b] = color_to_rgb(Vec3::ONE);
        assert_eq!([r, g, b], [255, 255, 255]);
    }

    #[test]
    fn test_color_to_rgb_gamma_brightens_midtones() {
        // 0.5^0.45 ~ 0.73, well above the linear value
        let [r, _, _] = color_to_rgb(Vec3::splat(0.5));
        assert!(r > 170 && r < 200, "got {r}");
    }
}

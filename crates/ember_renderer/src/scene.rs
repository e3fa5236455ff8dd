//! Scene model: a flat primitive list plus the lighting environment.

use crate::shape::{Intersection, Primitive};
use ember_math::{Interval, Ray, Vec3};
use serde::{Deserialize, Serialize};

/// Minimum accepted hit distance; suppresses self-intersection acne.
pub const HIT_EPSILON: f32 = 1e-3;

/// A scene intersection: which primitive won the nearest-hit scan.
#[derive(Debug, Clone, Copy)]
pub struct SceneHit {
    /// Index of the winning primitive in scene order
    pub primitive: usize,
    pub hit: Intersection,
}

/// The world being rendered.
///
/// Immutable once handed to the renderer; workers read it without locks.
/// `light_dir` points from the directional light toward the scene and is
/// normalized on construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    primitives: Vec<Primitive>,
    pub light_dir: Vec3,
    pub light_color: Vec3,
    pub sky_color: Vec3,
}

impl Scene {
    /// Create an empty scene with the given lighting environment.
    pub fn new(light_dir: Vec3, light_color: Vec3, sky_color: Vec3) -> Self {
        Self {
            primitives: Vec::new(),
            light_dir: light_dir.normalize(),
            light_color,
            sky_color,
        }
    }

    /// Add a primitive to the scene.
    pub fn add(&mut self, primitive: Primitive) {
        self.primitives.push(primitive);
    }

    /// Get a primitive by the index a `SceneHit` reported.
    pub fn primitive(&self, index: usize) -> &Primitive {
        &self.primitives[index]
    }

    /// Get the number of primitives.
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    /// Check if the scene has no primitives.
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Find the nearest positive-distance hit across all primitives.
    ///
    /// Linear scan, O(primitives) per ray. Small scenes only; a spatial
    /// index would slot in here if that ever changes.
    pub fn hit(&self, ray: &Ray) -> Option<SceneHit> {
        let mut closest = Interval::new(HIT_EPSILON, f32::INFINITY);
        let mut found = None;

        for (index, primitive) in self.primitives.iter().enumerate() {
            if let Some(hit) = primitive.hit(ray, closest) {
                closest.max = hit.t;
                found = Some(SceneHit {
                    primitive: index,
                    hit,
                });
            }
        }

        found
    }

    /// Shadow test: true when anything blocks the ray.
    pub fn occluded(&self, ray: &Ray) -> bool {
        let range = Interval::new(HIT_EPSILON, f32::INFINITY);
        self.primitives
            .iter()
            .any(|primitive| primitive.hit(ray, range).is_some())
    }
}

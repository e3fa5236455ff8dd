//! Monte Carlo path integrator.
//!
//! Iterative rather than recursive: `throughput` carries the running
//! product of albedos and sampling weights, `radiance` accumulates
//! contributions as the walk picks them up.

use crate::sampling::{cosine_sample_hemisphere, gen_f32};
use crate::scene::Scene;
use ember_math::{Ray, Vec3};
use rand::RngCore;
use std::f32::consts::FRAC_1_PI;

/// Survival probability for Russian-roulette termination.
pub const RR_SURVIVAL: f32 = 0.95;

/// Floor for the pdf division, keeps throughput finite for samples
/// landing near the horizon.
const MIN_PDF: f32 = 1e-4;

/// One radiance estimate for a single camera ray.
#[derive(Debug, Clone, Copy)]
pub struct PathSample {
    /// Linear-color radiance picked up along the path
    pub radiance: Vec3,
    /// Scattering bounces taken after the primary hit
    pub bounces: u32,
}

/// Trace one light-transport path through the scene.
pub fn trace_path(scene: &Scene, primary: Ray, rng: &mut dyn RngCore) -> PathSample {
    let mut ray = primary;
    let mut throughput = Vec3::ONE;
    let mut radiance = Vec3::ZERO;
    let mut bounces = 0u32;

    loop {
        let Some(scene_hit) = scene.hit(&ray) else {
            radiance += throughput * scene.sky_color;
            break;
        };
        let primitive = scene.primitive(scene_hit.primitive);
        let hit = scene_hit.hit;
        let point = ray.at(hit.t);

        throughput *= primitive.albedo;

        // Direct light: shadow ray toward the directional light
        let to_light = -scene.light_dir;
        if !scene.occluded(&Ray::new(point, to_light)) {
            radiance += throughput * scene.light_color * hit.normal.dot(to_light).max(0.0);
        }

        // Emissive surfaces contribute and terminate; they never scatter
        if primitive.emissive > 0.0 {
            radiance += throughput * primitive.emissive;
            break;
        }

        let sample = cosine_sample_hemisphere(hit.normal, rng);
        let cos_theta = sample.direction.dot(hit.normal).max(0.0);
        throughput *= cos_theta * FRAC_1_PI / sample.pdf.max(MIN_PDF);

        // Russian roulette from the second bounce on. The first bounce is
        // never compensated; the estimator depends on that asymmetry.
        if bounces > 0 {
            if gen_f32(rng) > RR_SURVIVAL {
                break;
            }
            throughput /= RR_SURVIVAL;
        }
        bounces += 1;

        ray = Ray::new(point, sample.direction);
    }

    PathSample { radiance, bounces }
}

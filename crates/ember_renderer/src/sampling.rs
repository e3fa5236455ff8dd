//! Cosine-weighted hemisphere sampling.

use ember_math::Vec3;
use rand::{Rng, RngCore};
use std::f32::consts::{FRAC_1_PI, TAU};

/// Uniform f32 in [0, 1).
#[inline]
pub(crate) fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    rng.gen()
}

/// An orthonormal frame built around a surface normal.
pub struct OrthonormalBasis {
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub normal: Vec3,
}

impl OrthonormalBasis {
    /// Build a frame around `normal` (assumed unit length).
    ///
    /// The tangent branches on whichever of |n.x|, |n.y| is larger; that
    /// is enough to avoid a degenerate frame near axis-aligned normals,
    /// and the branch condition is kept as-is so sampling patterns stay
    /// reproducible across revisions.
    pub fn from_normal(normal: Vec3) -> Self {
        let tangent = if normal.x.abs() > normal.y.abs() {
            Vec3::new(normal.z, 0.0, -normal.x)
                / (normal.x * normal.x + normal.z * normal.z).sqrt()
        } else {
            Vec3::new(0.0, -normal.z, normal.y)
                / (normal.y * normal.y + normal.z * normal.z).sqrt()
        };
        let bitangent = normal.cross(tangent);

        Self {
            tangent,
            bitangent,
            normal,
        }
    }

    /// Map a local-frame vector (z along the normal) into world space.
    pub fn to_world(&self, v: Vec3) -> Vec3 {
        v.x * self.tangent + v.y * self.bitangent + v.z * self.normal
    }
}

/// A sampled hemisphere direction and its probability density.
#[derive(Debug, Clone, Copy)]
pub struct DirectionSample {
    pub direction: Vec3,
    pub pdf: f32,
}

/// Draw a cosine-weighted direction on the hemisphere around `normal`.
///
/// The pdf is cos(theta)/pi, matching how the integrator divides the
/// cosine term back out; changing one side of that pairing requires
/// changing the other.
pub fn cosine_sample_hemisphere(normal: Vec3, rng: &mut dyn RngCore) -> DirectionSample {
    let basis = OrthonormalBasis::from_normal(normal);
    let r1 = gen_f32(rng);
    let r2 = gen_f32(rng);

    let phi = TAU * r1;
    let cos_theta = (1.0 - r2).sqrt();
    let sin_theta = r2.sqrt();

    let local = Vec3::new(phi.cos() * sin_theta, phi.sin() * sin_theta, cos_theta);

    DirectionSample {
        direction: basis.to_world(local),
        pdf: cos_theta * FRAC_1_PI,
    }
}

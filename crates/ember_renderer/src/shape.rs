//! Shape primitives and ray intersection.
//!
//! The shape set is closed (sphere, axis-aligned cube, infinite plane),
//! so geometry is an enum matched at the intersection site rather than a
//! trait object.

use ember_math::{Interval, Ray, Vec3};
use serde::{Deserialize, Serialize};

/// Tolerance for the cube's point-on-face containment check.
const FACE_SLACK: f32 = 1e-4;
/// Rays closer to grazing a plane than this are treated as misses.
const GRAZING_EPSILON: f32 = 1e-6;

/// Record of a ray-primitive intersection.
///
/// The hit point itself is recovered by the caller via `ray.at(t)`.
#[derive(Debug, Clone, Copy)]
pub struct Intersection {
    /// Distance along the (unit-direction) ray
    pub t: f32,
    /// Unit surface normal. Orientation follows each shape's own
    /// convention: spheres point outward, cube faces point outward,
    /// planes return their stored normal regardless of approach side.
    pub normal: Vec3,
}

/// Geometry of a primitive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeKind {
    Sphere { radius: f32 },
    Cube { half_extent: f32 },
    Plane { normal: Vec3 },
}

/// A scene object: one shape plus its surface parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Primitive {
    pub center: Vec3,
    #[serde(flatten)]
    pub shape: ShapeKind,
    /// Surface color in linear space
    pub albedo: Vec3,
    /// Emitted intensity; anything above zero makes the surface a light
    #[serde(default)]
    pub emissive: f32,
}

impl Primitive {
    /// Test the ray against this primitive within `t_range`.
    pub fn hit(&self, ray: &Ray, t_range: Interval) -> Option<Intersection> {
        match self.shape {
            ShapeKind::Sphere { radius } => self.hit_sphere(radius, ray, t_range),
            ShapeKind::Cube { half_extent } => self.hit_cube(half_extent, ray, t_range),
            ShapeKind::Plane { normal } => self.hit_plane(normal, ray, t_range),
        }
    }

    fn hit_sphere(&self, radius: f32, ray: &Ray, t_range: Interval) -> Option<Intersection> {
        let oc = ray.origin - self.center;
        let a = ray.direction.length_squared();
        let b = 2.0 * oc.dot(ray.direction);
        let c = oc.length_squared() - radius * radius;

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrtd = discriminant.sqrt();

        // Prefer the near root, fall back to the far one when the near
        // root is behind the origin or outside the range
        let mut root = (-b - sqrtd) / (2.0 * a);
        if !t_range.surrounds(root) {
            root = (-b + sqrtd) / (2.0 * a);
            if !t_range.surrounds(root) {
                return None;
            }
        }

        let normal = (ray.at(root) - self.center) / radius;
        Some(Intersection { t: root, normal })
    }

    fn hit_cube(&self, half_extent: f32, ray: &Ray, t_range: Interval) -> Option<Intersection> {
        const FACE_NORMALS: [Vec3; 6] = [
            Vec3::X,
            Vec3::NEG_X,
            Vec3::Y,
            Vec3::NEG_Y,
            Vec3::Z,
            Vec3::NEG_Z,
        ];

        let mut limit = t_range;
        let mut best = None;

        for n in FACE_NORMALS {
            let denom = n.dot(ray.direction);
            // Only faces whose normal opposes the ray can be entered
            if denom >= -GRAZING_EPSILON {
                continue;
            }

            // Face plane: n . (p - center) = half_extent
            let t = (half_extent - n.dot(ray.origin - self.center)) / denom;
            if !limit.surrounds(t) {
                continue;
            }

            let local = ray.at(t) - self.center;
            let on_face = local.x.abs() <= half_extent + FACE_SLACK
                && local.y.abs() <= half_extent + FACE_SLACK
                && local.z.abs() <= half_extent + FACE_SLACK;
            if on_face {
                limit.max = t;
                best = Some(Intersection { t, normal: n });
            }
        }

        best
    }

    fn hit_plane(&self, normal: Vec3, ray: &Ray, t_range: Interval) -> Option<Intersection> {
        let denom = normal.dot(ray.direction);
        if denom.abs() < GRAZING_EPSILON {
            return None;
        }

        // Plane through `center`: normal . (p - center) = 0
        let t = normal.dot(self.center - ray.origin) / denom;
        if !t_range.surrounds(t) {
            return None;
        }

        Some(Intersection { t, normal })
    }
}

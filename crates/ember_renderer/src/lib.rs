//! Ember - progressive CPU path tracing.
//!
//! A Monte Carlo path tracer that refines a linear-color framebuffer over
//! unbounded iterations. A persistent worker pool claims scanlines from a
//! shared atomic counter, traces each claimed row, and blends the result
//! into a running-average film with weight 1/(iteration+1). Display,
//! input handling, and file output live with the caller: the renderer
//! exposes a blocking `render_iteration` call and a `frame` snapshot.

mod camera;
mod film;
mod integrator;
mod sampling;
mod scene;
mod scheduler;
mod shape;

pub use camera::Camera;
pub use film::{color_to_rgb, Film};
pub use integrator::{trace_path, PathSample, RR_SURVIVAL};
pub use sampling::{cosine_sample_hemisphere, DirectionSample, OrthonormalBasis};
pub use scene::{Scene, SceneHit, HIT_EPSILON};
pub use scheduler::{Renderer, RendererError};
pub use shape::{Intersection, Primitive, ShapeKind};

/// Re-export math types from ember_math
pub use ember_math::{Interval, Ray, Vec3};

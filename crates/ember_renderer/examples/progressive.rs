//! Progressive render example.
//!
//! Builds a small scene, runs the worker pool for a fixed number of
//! iterations, and reports how the frame converges. Display and file
//! output are the embedding application's job; this just exercises the
//! core loop.

use anyhow::Result;
use ember_renderer::{color_to_rgb, Camera, Primitive, Renderer, Scene, ShapeKind, Vec3};

fn main() -> Result<()> {
    env_logger::init();

    let scene = build_scene();
    let mut camera = Camera::new()
        .with_resolution(640, 360)
        .with_position(
            Vec3::new(0.0, 1.5, 4.0),
            Vec3::new(0.0, 0.5, 0.0),
            Vec3::Y,
        )
        .with_vfov(55.0);
    camera.initialize();

    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    let renderer = Renderer::new(scene, camera, workers)?;
    println!(
        "Rendering {}x{} on {} workers...",
        renderer.width(),
        renderer.height(),
        workers
    );

    let start = std::time::Instant::now();
    for _ in 0..32 {
        let completed = renderer.render_iteration();
        if completed % 8 == 0 {
            println!(
                "iteration {completed:3}: mean luminance {:.4} ({:?} elapsed)",
                mean_luminance(&renderer.frame()),
                start.elapsed()
            );
        }
    }

    // A display layer would gamma-encode each cell like this before
    // blitting; here we just sample the center pixel
    let frame = renderer.frame();
    let center = frame[(renderer.height() / 2 * renderer.width() + renderer.width() / 2) as usize];
    let [r, g, b] = color_to_rgb(center);
    println!("center pixel after 32 iterations: rgb({r}, {g}, {b})");

    Ok(())
}

fn build_scene() -> Scene {
    let mut scene = Scene::new(
        Vec3::new(-0.4, -1.0, -0.3),
        Vec3::splat(0.9),
        Vec3::new(0.35, 0.45, 0.65),
    );

    // Floor
    scene.add(Primitive {
        center: Vec3::ZERO,
        shape: ShapeKind::Plane { normal: Vec3::Y },
        albedo: Vec3::splat(0.7),
        emissive: 0.0,
    });

    // Matte sphere
    scene.add(Primitive {
        center: Vec3::new(-1.2, 0.6, 0.0),
        shape: ShapeKind::Sphere { radius: 0.6 },
        albedo: Vec3::new(0.8, 0.3, 0.25),
        emissive: 0.0,
    });

    // Cube
    scene.add(Primitive {
        center: Vec3::new(1.1, 0.5, -0.4),
        shape: ShapeKind::Cube { half_extent: 0.5 },
        albedo: Vec3::new(0.25, 0.5, 0.8),
        emissive: 0.0,
    });

    // Small emissive sphere
    scene.add(Primitive {
        center: Vec3::new(0.0, 2.4, -1.0),
        shape: ShapeKind::Sphere { radius: 0.3 },
        albedo: Vec3::ONE,
        emissive: 6.0,
    });

    scene
}

fn mean_luminance(frame: &[Vec3]) -> f32 {
    let sum: f32 = frame
        .iter()
        .map(|c| c.dot(Vec3::new(0.2126, 0.7152, 0.0722)))
        .sum();
    sum / frame.len() as f32
}

//! Persistent worker pool driving progressive render iterations.
//!
//! A fixed set of worker threads races a shared claim counter for
//! scanlines. Each claimed row is traced pixel-by-pixel and blended into
//! the film; when the counter is exhausted a worker parks on the
//! "iteration ready" condvar. The coordinator (whoever calls
//! [`Renderer::render_iteration`]) re-arms the counter, wakes the pool,
//! and blocks on a finished-row barrier, so a completed call guarantees
//! every worker write of that iteration is visible to later frame reads.

use crate::camera::Camera;
use crate::film::Film;
use crate::integrator::trace_path;
use crate::scene::Scene;
use ember_math::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use thiserror::Error;

/// Construction-time failures. Nothing fails once rendering starts.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("image dimensions must be non-zero (got {width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("worker pool needs at least one thread")]
    NoWorkers,

    #[error("failed to spawn render worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Scanline claim counter.
///
/// Hands out each row index in [0, height) at most once per iteration;
/// `reset` re-arms it when the coordinator starts the next iteration.
#[derive(Debug)]
struct RowQueue {
    next: AtomicUsize,
    height: usize,
}

impl RowQueue {
    /// Starts exhausted; rows become claimable on the first `reset`.
    fn new(height: usize) -> Self {
        Self {
            next: AtomicUsize::new(height),
            height,
        }
    }

    fn reset(&self) {
        self.next.store(0, Ordering::Release);
    }

    /// Claim the next unclaimed row, or None when the iteration's rows
    /// are all taken.
    fn claim(&self) -> Option<usize> {
        let mut current = self.next.load(Ordering::Relaxed);
        loop {
            if current >= self.height {
                return None;
            }
            match self.next.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Some(current),
                Err(actual) => current = actual,
            }
        }
    }
}

/// State guarded by the pool mutex.
#[derive(Debug)]
struct IterationState {
    /// Monotone count of iterations started; parked workers wait for it
    /// to move past the value they last saw
    epoch: u64,
    /// Rows completed in the current iteration
    rows_done: u32,
}

#[derive(Debug)]
struct Shared {
    scene: Scene,
    camera: Camera,
    film: Film,
    queue: RowQueue,
    state: Mutex<IterationState>,
    /// Signaled when a new iteration's rows become claimable
    iteration_ready: Condvar,
    /// Signaled when the last row of an iteration completes
    iteration_done: Condvar,
    /// Completed-iteration count; also the blend weight input
    iterations: AtomicU32,
    shutdown: AtomicBool,
}

/// Progressive renderer: scene, camera, film, and the worker pool.
///
/// Workers persist for the renderer's lifetime and park between
/// iterations. Dropping the renderer signals shutdown and joins them.
#[derive(Debug)]
pub struct Renderer {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl Renderer {
    /// Build the film and spawn `workers` persistent render threads.
    pub fn new(scene: Scene, camera: Camera, workers: usize) -> Result<Self, RendererError> {
        let width = camera.image_width;
        let height = camera.image_height;

        if width == 0 || height == 0 {
            return Err(RendererError::EmptyImage { width, height });
        }
        if workers == 0 {
            return Err(RendererError::NoWorkers);
        }

        let shared = Arc::new(Shared {
            scene,
            camera,
            film: Film::new(width, height),
            queue: RowQueue::new(height as usize),
            state: Mutex::new(IterationState {
                epoch: 0,
                rows_done: 0,
            }),
            iteration_ready: Condvar::new(),
            iteration_done: Condvar::new(),
            iterations: AtomicU32::new(0),
            shutdown: AtomicBool::new(false),
        });

        log::info!("spawning {workers} render workers for a {width}x{height} film");

        let mut renderer = Self {
            shared,
            workers: Vec::with_capacity(workers),
        };
        for id in 0..workers {
            let shared = Arc::clone(&renderer.shared);
            let handle = thread::Builder::new()
                .name(format!("render-worker-{id}"))
                .spawn(move || worker_loop(shared))?;
            renderer.workers.push(handle);
        }

        Ok(renderer)
    }

    /// Run one full render iteration; blocks until every scanline of the
    /// image has been traced and blended.
    ///
    /// Returns the number of completed iterations, which is also the
    /// sample count behind every film cell.
    pub fn render_iteration(&self) -> u32 {
        let height = self.shared.film.height();
        let started = Instant::now();

        {
            let mut state = self.shared.state.lock().unwrap();
            state.rows_done = 0;
            state.epoch += 1;
            self.shared.queue.reset();
            self.shared.iteration_ready.notify_all();

            while state.rows_done < height {
                state = self.shared.iteration_done.wait(state).unwrap();
            }
        }

        let completed = self.shared.iterations.fetch_add(1, Ordering::AcqRel) + 1;
        log::debug!("iteration {completed} traced in {:?}", started.elapsed());
        completed
    }

    /// Snapshot the current linear-color frame, row-major.
    ///
    /// Callable at any time; between iterations it reflects exactly the
    /// completed iteration count returned by `render_iteration`.
    pub fn frame(&self) -> Vec<Vec3> {
        self.shared.film.snapshot()
    }

    /// Number of completed iterations.
    pub fn iterations(&self) -> u32 {
        self.shared.iterations.load(Ordering::Acquire)
    }

    pub fn width(&self) -> u32 {
        self.shared.film.width()
    }

    pub fn height(&self) -> u32 {
        self.shared.film.height()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        // Take the lock so no worker can re-check its park predicate
        // between our store and the broadcast
        {
            let _state = self.shared.state.lock().unwrap();
            self.shared.iteration_ready.notify_all();
        }
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

/// Worker state machine: claim a row, trace it, park when the iteration
/// runs dry, wake on the next epoch, exit on shutdown.
fn worker_loop(shared: Arc<Shared>) {
    let mut rng = StdRng::from_entropy();
    let mut scratch = vec![Vec3::ZERO; shared.film.width() as usize];
    let mut seen_epoch = 0u64;
    let height = shared.film.height();

    loop {
        if shared.shutdown.load(Ordering::Acquire) {
            return;
        }

        match shared.queue.claim() {
            Some(row) => {
                // Stable for the whole iteration; the coordinator bumps
                // it only after the barrier
                let iteration = shared.iterations.load(Ordering::Acquire);

                trace_row(&shared, row, &mut scratch, &mut rng);
                shared.film.blend_row(row, &scratch, iteration);

                let mut state = shared.state.lock().unwrap();
                state.rows_done += 1;
                if state.rows_done >= height {
                    shared.iteration_done.notify_all();
                }
            }
            None => {
                let mut state = shared.state.lock().unwrap();
                while state.epoch == seen_epoch && !shared.shutdown.load(Ordering::Acquire) {
                    state = shared.iteration_ready.wait(state).unwrap();
                }
                seen_epoch = state.epoch;
            }
        }
    }
}

fn trace_row(shared: &Shared, row: usize, scratch: &mut [Vec3], rng: &mut StdRng) {
    for (x, cell) in scratch.iter_mut().enumerate() {
        let ray = shared.camera.get_ray(x as u32, row as u32, rng);
        *cell = trace_path(&shared.scene, ray, rng).radiance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sky_only_scene(sky: Vec3) -> Scene {
        Scene::new(Vec3::new(0.0, -1.0, 0.0), Vec3::ONE, sky)
    }

    fn small_camera(width: u32, height: u32) -> Camera {
        let mut camera = Camera::new()
            .with_resolution(width, height)
            .with_position(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y)
            .with_vfov(60.0);
        camera.initialize();
        camera
    }

    #[test]
    fn test_row_queue_claims_each_row_exactly_once() {
        let height = 64;
        let queue = Arc::new(RowQueue::new(height));
        queue.reset();

        let claims: Arc<Vec<AtomicU32>> =
            Arc::new((0..height).map(|_| AtomicU32::new(0)).collect());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let claims = Arc::clone(&claims);
                thread::spawn(move || {
                    while let Some(row) = queue.claim() {
                        claims[row].fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for (row, count) in claims.iter().enumerate() {
            assert_eq!(count.load(Ordering::Relaxed), 1, "row {row}");
        }
    }

    #[test]
    fn test_row_queue_starts_exhausted() {
        let queue = RowQueue::new(4);
        assert!(queue.claim().is_none());

        queue.reset();
        assert_eq!(queue.claim(), Some(0));
    }

    #[test]
    fn test_sky_only_scene_converges_immediately() {
        // Zero-variance baseline: every estimate equals the sky color,
        // so the running mean must equal it after any iteration count
        let sky = Vec3::new(0.25, 0.5, 0.75);
        let renderer = Renderer::new(sky_only_scene(sky), small_camera(8, 6), 3).unwrap();

        for expected in 1..=5 {
            assert_eq!(renderer.render_iteration(), expected);
        }
        assert_eq!(renderer.iterations(), 5);

        let frame = renderer.frame();
        assert_eq!(frame.len(), 8 * 6);
        for (i, pixel) in frame.iter().enumerate() {
            assert!((*pixel - sky).length() < 1e-5, "pixel {i}: {pixel:?}");
        }
    }

    #[test]
    fn test_more_workers_than_rows() {
        let sky = Vec3::splat(0.5);
        let renderer = Renderer::new(sky_only_scene(sky), small_camera(4, 2), 8).unwrap();

        renderer.render_iteration();

        for pixel in renderer.frame() {
            assert!((pixel - sky).length() < 1e-5);
        }
    }

    #[test]
    fn test_frame_is_black_before_first_iteration() {
        let renderer =
            Renderer::new(sky_only_scene(Vec3::ONE), small_camera(4, 4), 2).unwrap();

        assert_eq!(renderer.iterations(), 0);
        assert!(renderer.frame().iter().all(|p| *p == Vec3::ZERO));
    }

    #[test]
    fn test_drop_joins_workers() {
        let renderer =
            Renderer::new(sky_only_scene(Vec3::ONE), small_camera(6, 4), 4).unwrap();
        renderer.render_iteration();

        // Must not hang
        drop(renderer);
    }

    #[test]
    fn test_drop_without_rendering() {
        let renderer =
            Renderer::new(sky_only_scene(Vec3::ONE), small_camera(6, 4), 4).unwrap();
        drop(renderer);
    }

    #[test]
    fn test_invalid_construction() {
        let scene = sky_only_scene(Vec3::ONE);

        let err = Renderer::new(scene.clone(), small_camera(6, 4), 0).unwrap_err();
        assert!(matches!(err, RendererError::NoWorkers));

        let mut camera = Camera::new().with_resolution(0, 4);
        camera.initialize();
        let err = Renderer::new(scene, camera, 2).unwrap_err();
        assert!(matches!(err, RendererError::EmptyImage { .. }));
    }
}

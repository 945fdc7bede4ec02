//! The per-frame pipeline.
//!
//! A [`LightLayer`] owns a fixed pool of worker threads and spreads lights
//! across them. Each frame, the owning thread calls
//!
//! 1. [`LightLayer::detach`], which applies queued changes and releases the
//!    workers into their next cycle, then
//! 2. [`LightLayer::draw`], which draws each worker's lights as soon as that
//!    worker is done and composites the light map onto the frame.
//!
//! Between `draw` and the next `detach`, every worker is idle and the
//! scene may be changed freely. It may also be changed while workers are
//! sweeping, once [`LightLayer::snapshots_done`] says so.

use std::{collections::HashMap, thread};

use kurbo::Affine;

use crate::{
    blur::{GaussianKernel, KernelConfig},
    canvas::{BlendMode, Canvas, Color, SurfaceId},
    light::{DrawContext, LightHandle, LightId, LightSource},
    occluder::Scene,
    schedule::Balancer,
    worker::{CycleReport, Slot, Worker},
    Error,
};

/// Worker count used when the number of cores can't be determined.
const FALLBACK_WORKERS: usize = 4;

/// Settings for a [`LightLayer`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    /// Width of the frame the layer draws onto, in pixels.
    pub width: u32,
    /// Height of the frame the layer draws onto, in pixels.
    pub height: u32,
    /// Light-map pixels per frame pixel.
    pub scale: f64,
    /// The size of the worker pool. `None` means one per core.
    pub max_workers: Option<usize>,
    /// The name of the mask drawn over each point light.
    pub mask_asset: String,
    /// Blur applied to the light map before compositing.
    pub blur: Option<KernelConfig>,
}

impl Default for LayerConfig {
    fn default() -> Self {
        LayerConfig {
            width: 800,
            height: 600,
            scale: 1.0,
            max_workers: None,
            mask_asset: "light.png".to_owned(),
            blur: None,
        }
    }
}

impl LayerConfig {
    /// Checks every setting that can be checked without a canvas.
    pub fn validate(&self) -> Result<(), Error> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidDimensions {
                width: f64::from(self.width),
                height: f64::from(self.height),
            });
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(Error::InvalidScale(self.scale));
        }
        if self.max_workers == Some(0) {
            return Err(Error::ZeroWorkers);
        }
        if let Some(blur) = &self.blur {
            blur.build()?;
        }
        Ok(())
    }

    /// The size of the worker pool.
    pub fn worker_count(&self) -> usize {
        self.max_workers.unwrap_or_else(|| {
            thread::available_parallelism()
                .map(usize::from)
                .unwrap_or_else(|e| {
                    log::warn!("couldn't count cores ({e}); using {FALLBACK_WORKERS} workers");
                    FALLBACK_WORKERS
                })
        })
    }

    /// The light map's pixel size.
    pub fn map_size(&self) -> (u32, u32) {
        let scaled = |n: u32| (f64::from(n) * self.scale).ceil().max(1.0) as u32;
        (scaled(self.width), scaled(self.height))
    }
}

/// Lights, the workers that sweep them, and the light map they draw onto.
///
/// Dropping the layer stops its workers, waiting for any cycle in progress.
pub struct LightLayer {
    config: LayerConfig,
    scene: Scene,
    workers: Vec<Worker>,
    balancer: Balancer,
    placements: HashMap<LightId, usize>,
    pending_add: Vec<Slot>,
    pending_remove: Vec<LightId>,
    next_id: u64,
    light_map: SurfaceId,
    mask: SurfaceId,
    mask_size: (u32, u32),
    kernel: Option<GaussianKernel>,
}

impl std::fmt::Debug for LightLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightLayer")
            .field("config", &self.config)
            .field("workers", &self.workers.len())
            .field("placements", &self.placements)
            .field("pending_add", &self.pending_add.len())
            .field("pending_remove", &self.pending_remove)
            .field("light_map", &self.light_map)
            .finish_non_exhaustive()
    }
}

impl LightLayer {
    /// Validates `config`, loads the mask, allocates the light map and
    /// starts the workers.
    pub fn new(config: LayerConfig, scene: Scene, canvas: &mut dyn Canvas) -> Result<Self, Error> {
        config.validate()?;
        let kernel = config.blur.map(|b| b.build()).transpose()?;
        let mask = canvas
            .load_surface(&config.mask_asset)
            .ok_or_else(|| Error::MissingAsset(config.mask_asset.clone()))?;
        let mask_size = canvas
            .surface_size(mask)
            .ok_or_else(|| Error::MissingAsset(config.mask_asset.clone()))?;

        let count = config.worker_count();
        let workers = (0..count)
            .map(|i| Worker::spawn(i, scene.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        let (map_w, map_h) = config.map_size();
        let light_map = canvas.create_surface(map_w, map_h);
        canvas.clear(light_map, Color::BLACK);
        log::debug!("light layer with {count} workers and a {map_w}x{map_h} light map");

        Ok(LightLayer {
            config,
            scene,
            workers,
            balancer: Balancer::new(count),
            placements: HashMap::new(),
            pending_add: Vec::new(),
            pending_remove: Vec::new(),
            next_id: 0,
            light_map,
            mask,
            mask_size,
            kernel,
        })
    }

    /// The layer's settings.
    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    /// The occluders every light sees.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// The size of the worker pool.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// The number of lights the workers are running, not counting queued
    /// changes.
    pub fn light_count(&self) -> usize {
        self.placements.len()
    }

    /// The light map that [`LightLayer::draw`] composites.
    pub fn light_map(&self) -> SurfaceId {
        self.light_map
    }

    /// Queues a light to join the next cycle.
    pub fn add_light(&mut self, light: impl LightSource + 'static) -> LightHandle {
        let id = LightId(self.next_id);
        self.next_id += 1;
        let handle = LightHandle::new(id, light.held().clone());
        self.pending_add.push(Slot {
            id,
            light: Box::new(light),
        });
        handle
    }

    /// Queues a light to leave at the next cycle.
    pub fn remove_light(&mut self, id: LightId) {
        let queued = self.pending_add.len();
        self.pending_add.retain(|slot| slot.id != id);
        if self.pending_add.len() == queued {
            self.pending_remove.push(id);
        }
    }

    /// Applies queued changes and starts the next cycle on every worker.
    ///
    /// Waits for any cycle still running from a `detach` without a `draw`.
    pub fn detach(&mut self) {
        for worker in &self.workers {
            if worker.wait_idle() {
                self.balancer.record(worker.index(), worker.report().run_time);
            } else if self.balancer.retire(worker.index()) {
                let lost = std::mem::take(&mut *worker.lights());
                for slot in &lost {
                    self.placements.remove(&slot.id);
                }
                log::error!(
                    "worker {} has stopped, dropping its {} lights",
                    worker.index(),
                    lost.len()
                );
            }
        }

        for id in std::mem::take(&mut self.pending_remove) {
            let Some(w) = self.placements.remove(&id) else {
                continue;
            };
            self.workers[w].lights().retain(|slot| slot.id != id);
            self.balancer.remove(w);
            log::debug!("removed light {} from worker {w}", id.0);
        }
        for slot in std::mem::take(&mut self.pending_add) {
            let Some(w) = self.balancer.assign() else {
                log::error!("no workers left to run light {}", slot.id.0);
                continue;
            };
            log::debug!("assigned light {} to worker {w}", slot.id.0);
            self.placements.insert(slot.id, w);
            self.workers[w].lights().push(slot);
        }

        for worker in &self.workers {
            for slot in worker.lights().iter_mut() {
                slot.light.transfer_held();
            }
            worker.release();
        }
    }

    /// Have all workers finished reading the scene this cycle?
    pub fn snapshots_done(&self) -> bool {
        self.workers
            .iter()
            .all(|w| w.try_snapshot_done() == Some(true) || w.is_dead())
    }

    /// Draws every light and composites the light map onto `target`.
    ///
    /// Returns once every worker has finished its cycle. The light map is
    /// cleared afterwards, ready for the next frame.
    pub fn draw(&mut self, canvas: &mut dyn Canvas, target: SurfaceId) {
        let ctx = DrawContext {
            light_map: self.light_map,
            mask: self.mask,
            mask_size: self.mask_size,
            scale: self.config.scale,
        };

        let mut waiting: Vec<&Worker> = self.workers.iter().collect();
        while !waiting.is_empty() {
            waiting.retain(|worker| match worker.try_sweep_done() {
                Some(true) => {
                    for slot in worker.lights().iter_mut() {
                        slot.light.draw_local(canvas, &ctx);
                    }
                    false
                }
                _ if worker.is_dead() => {
                    log::error!("worker {} has stopped; skipping its lights", worker.index());
                    false
                }
                _ => true,
            });
            if !waiting.is_empty() {
                thread::yield_now();
            }
        }

        for worker in &self.workers {
            if worker.is_dead() {
                continue;
            }
            for slot in worker.lights().iter() {
                slot.light.draw_to_map(canvas, &ctx);
            }
        }
        if let Some(kernel) = &self.kernel {
            canvas.blur(self.light_map, kernel);
        }
        canvas.composite(
            self.light_map,
            target,
            Affine::scale(1.0 / self.config.scale),
            BlendMode::Multiply,
        );
        canvas.clear(self.light_map, Color::BLACK);
    }

    /// Each worker's report from its last finished cycle.
    pub fn cycle_stats(&self) -> Vec<CycleReport> {
        self.workers.iter().map(Worker::report).collect()
    }
}

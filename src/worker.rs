//! Worker threads.
//!
//! Each worker owns a list of lights and loops over
//!
//! ```text
//! wait for release -> snapshot every light -> sweep every light -> report
//! ```
//!
//! Two flags, each behind its own mutex, tell the owning thread how far the
//! current cycle has got: `snapshot_done` once the worker no longer needs
//! the scene, and `sweep_done` once its lights may be drawn. The owner only
//! ever `try_lock`s them, so it never waits on a worker.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::{
    light::{LightId, LightSource},
    occluder::Scene,
    sweep::SweepStats,
    Error,
};

/// A light and the id its layer knows it by.
pub(crate) struct Slot {
    pub id: LightId,
    pub light: Box<dyn LightSource>,
}

/// What one worker did in its last finished cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CycleReport {
    /// Wall-clock time from release to the end of the last sweep.
    pub run_time: Duration,
    /// The number of lights processed.
    pub lights: usize,
    /// Sweep counters summed over those lights.
    pub stats: SweepStats,
}

#[derive(Debug, Default)]
struct Gate {
    cycle: u64,
    shutdown: bool,
}

struct Shared {
    scene: Scene,
    lights: Mutex<Vec<Slot>>,
    snapshot_done: Mutex<bool>,
    sweep_done: Mutex<bool>,
    gate: Mutex<Gate>,
    release: Condvar,
    report: Mutex<CycleReport>,
}

pub(crate) struct Worker {
    index: usize,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Starts a worker thread, idle until the first [`Worker::release`].
    pub fn spawn(index: usize, scene: Scene) -> Result<Self, Error> {
        let shared = Arc::new(Shared {
            scene,
            lights: Mutex::new(Vec::new()),
            // Nothing to wait for before the first release.
            snapshot_done: Mutex::new(true),
            sweep_done: Mutex::new(true),
            gate: Mutex::new(Gate::default()),
            release: Condvar::new(),
            report: Mutex::new(CycleReport::default()),
        });
        let handle = thread::Builder::new()
            .name(format!("lightsweep-worker-{index}"))
            .spawn({
                let shared = Arc::clone(&shared);
                move || run(index, &shared)
            })
            .map_err(|e| Error::Spawn(e.to_string()))?;
        log::debug!("spawned worker {index}");
        Ok(Worker {
            index,
            shared,
            handle: Some(handle),
        })
    }

    /// Starts the next cycle.
    pub fn release(&self) {
        *self.shared.snapshot_done.lock() = false;
        *self.shared.sweep_done.lock() = false;
        let mut gate = self.shared.gate.lock();
        gate.cycle += 1;
        self.shared.release.notify_one();
    }

    /// Has the current cycle finished snapshotting? `None` if the flag is busy.
    pub fn try_snapshot_done(&self) -> Option<bool> {
        self.shared.snapshot_done.try_lock().map(|done| *done)
    }

    /// Has the current cycle finished sweeping? `None` if the flag is busy.
    pub fn try_sweep_done(&self) -> Option<bool> {
        self.shared.sweep_done.try_lock().map(|done| *done)
    }

    /// Spins until the current cycle, if any, is over.
    ///
    /// Returns `false` if the thread died instead.
    pub fn wait_idle(&self) -> bool {
        loop {
            match self.try_sweep_done() {
                Some(true) => return true,
                _ if self.is_dead() => return false,
                _ => thread::yield_now(),
            }
        }
    }

    /// Did the thread exit without being asked to?
    pub fn is_dead(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// The worker's lights. Blocks while a cycle is running.
    pub fn lights(&self) -> MutexGuard<'_, Vec<Slot>> {
        self.shared.lights.lock()
    }

    /// The last finished cycle's report.
    pub fn report(&self) -> CycleReport {
        *self.shared.report.lock()
    }

    /// The worker's position in its layer.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shared.gate.lock().shutdown = true;
        self.shared.release.notify_one();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("worker {} panicked", self.index);
            }
        }
    }
}

fn run(index: usize, shared: &Shared) {
    let mut seen = 0;
    loop {
        {
            let mut gate = shared.gate.lock();
            while gate.cycle == seen && !gate.shutdown {
                shared.release.wait(&mut gate);
            }
            if gate.shutdown {
                log::debug!("worker {index} shutting down");
                return;
            }
            seen = gate.cycle;
        }

        let start = Instant::now();
        let mut lights = shared.lights.lock();
        {
            let occluders = shared.scene.read();
            for slot in lights.iter_mut() {
                slot.light.create_shade_points(&occluders);
            }
        }
        *shared.snapshot_done.lock() = true;

        let mut stats = SweepStats::default();
        for slot in lights.iter_mut() {
            stats += slot.light.map_shade_points();
        }
        let report = CycleReport {
            run_time: start.elapsed(),
            lights: lights.len(),
            stats,
        };
        drop(lights);

        log::trace!(
            "worker {index} finished cycle {seen}: {} lights in {:?}",
            report.lights,
            report.run_time
        );
        *shared.report.lock() = report;
        *shared.sweep_done.lock() = true;
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Line;

    use super::*;
    use crate::{canvas::Color, light::RadialLight};

    #[test]
    fn runs_a_cycle() {
        let scene = Scene::new();
        scene
            .write()
            .insert_line(Line::new((10.0, 0.0), (10.0, 50.0)))
            .unwrap();
        let worker = Worker::spawn(0, scene).unwrap();
        assert_eq!(worker.try_sweep_done(), Some(true));

        let light = RadialLight::new(100.0, Color::WHITE).unwrap();
        worker.lights().push(Slot {
            id: LightId(7),
            light: Box::new(light),
        });

        worker.release();
        assert!(worker.wait_idle());
        assert_eq!(worker.try_snapshot_done(), Some(true));
        let report = worker.report();
        assert_eq!(report.lights, 1);
        assert_eq!(report.stats.segments, 6);

        // A second cycle over the same scene does the same work.
        worker.release();
        assert!(worker.wait_idle());
        assert_eq!(worker.report().stats, report.stats);
        assert!(!worker.is_dead());
    }

    #[test]
    fn drops_while_idle() {
        let worker = Worker::spawn(3, Scene::new()).unwrap();
        assert_eq!(worker.index(), 3);
        drop(worker);
    }
}

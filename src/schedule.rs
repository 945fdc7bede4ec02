//! Deciding which worker runs each new light.
//!
//! Until every worker has a light, new lights go to an idle worker. After
//! that they go to whichever worker finished its last cycle soonest. Its
//! estimate is bumped by the average cost of one light straight away, so a
//! burst of additions between two measurements gets spread around. Retired
//! workers are never picked again.

use std::time::Duration;

/// What the balancer knows about one worker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerLoad {
    /// Lights currently assigned.
    pub sources: usize,
    /// The last measured cycle time, plus estimates for lights added since.
    pub run_time: Duration,
    /// The worker can no longer run lights.
    pub retired: bool,
}

/// Assigns lights to a fixed number of workers.
#[derive(Clone, Debug)]
pub struct Balancer {
    capacity: usize,
    loads: Vec<WorkerLoad>,
}

impl Balancer {
    /// A balancer for `capacity` workers, none of them in use yet.
    pub fn new(capacity: usize) -> Self {
        Balancer {
            capacity,
            loads: Vec::with_capacity(capacity),
        }
    }

    /// The number of workers lights may be assigned to.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The workers that have been handed a light at some point.
    pub fn loads(&self) -> &[WorkerLoad] {
        &self.loads
    }

    /// Picks a worker for a new light and counts the light against it.
    ///
    /// Returns `None` if every worker has been retired.
    pub fn assign(&mut self) -> Option<usize> {
        let worker = if self.loads.len() < self.capacity {
            match self.loads.iter().position(|l| l.sources == 0 && !l.retired) {
                Some(idle) => idle,
                None => {
                    self.loads.push(WorkerLoad::default());
                    self.loads.len() - 1
                }
            }
        } else {
            let estimate = self.per_source_estimate();
            let (worker, _) = self
                .loads
                .iter()
                .enumerate()
                .filter(|(_, l)| !l.retired)
                .min_by_key(|(_, l)| (l.run_time, l.sources))?;
            self.loads[worker].run_time += estimate;
            worker
        };
        self.loads[worker].sources += 1;
        Some(worker)
    }

    /// Stops assigning lights to `worker` and forgets the ones it had.
    ///
    /// Returns `false` if it was already retired.
    pub fn retire(&mut self, worker: usize) -> bool {
        if worker >= self.capacity {
            return false;
        }
        while self.loads.len() <= worker {
            self.loads.push(WorkerLoad::default());
        }
        let load = &mut self.loads[worker];
        let fresh = !load.retired;
        *load = WorkerLoad {
            retired: true,
            ..WorkerLoad::default()
        };
        fresh
    }

    /// Records a worker's measured cycle time, replacing any estimate.
    pub fn record(&mut self, worker: usize, run_time: Duration) {
        if let Some(load) = self.loads.get_mut(worker) {
            load.run_time = run_time;
        }
    }

    /// Forgets a light that was assigned to `worker`.
    pub fn remove(&mut self, worker: usize) {
        if let Some(load) = self.loads.get_mut(worker) {
            load.sources = load.sources.saturating_sub(1);
        }
    }

    fn per_source_estimate(&self) -> Duration {
        let live = self.loads.iter().filter(|l| !l.retired);
        let sources: usize = live.clone().map(|l| l.sources).sum();
        let total: Duration = live.map(|l| l.run_time).sum();
        match u32::try_from(sources) {
            Ok(n) if n > 0 => total / n,
            _ => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn fills_before_measuring() {
        let mut b = Balancer::new(3);
        assert_eq!(b.assign(), Some(0));
        assert_eq!(b.assign(), Some(1));
        assert_eq!(b.assign(), Some(2));
        // Full and nothing measured yet: fewest lights wins the tie.
        assert_eq!(b.assign(), Some(0));
        assert_eq!(b.assign(), Some(1));
    }

    #[test]
    fn reuses_emptied_workers() {
        let mut b = Balancer::new(4);
        b.assign();
        b.assign();
        b.remove(0);
        assert_eq!(b.assign(), Some(0));
        assert_eq!(b.loads().len(), 2);
    }

    #[test]
    fn prefers_fastest_worker() {
        let mut b = Balancer::new(2);
        b.assign();
        b.assign();
        b.record(0, ms(10));
        b.record(1, ms(4));
        assert_eq!(b.assign(), Some(1));
        // Worker 1 is now estimated at 4ms + 14ms / 2 = 11ms.
        assert_eq!(b.loads()[1].run_time, ms(11));
        assert_eq!(b.assign(), Some(0));
        b.record(1, ms(3));
        assert_eq!(b.loads()[1].run_time, ms(3));
    }

    #[test]
    fn skips_retired_workers() {
        let mut b = Balancer::new(3);
        assert!(b.retire(1));
        assert!(!b.retire(1));
        assert!(!b.retire(7));
        // Filling passes over the retired worker.
        assert_eq!(b.assign(), Some(0));
        assert_eq!(b.assign(), Some(2));

        b.record(0, ms(9));
        b.record(2, ms(5));
        assert_eq!(b.assign(), Some(2));
        // Worker 1's zero run time doesn't count towards the estimate.
        assert_eq!(b.loads()[2].run_time, ms(12));

        assert!(b.retire(0));
        assert!(b.retire(2));
        assert_eq!(b.assign(), None);
        assert!(b.loads().iter().all(|l| l.retired && l.sources == 0));
    }

    proptest! {
        #[test]
        fn fair_while_filling(capacity in 1usize..16, adds in 0usize..16, removals in proptest::collection::vec(0usize..16, 0..4)) {
            let mut b = Balancer::new(capacity);
            for w in removals {
                b.assign();
                b.remove(w % b.loads().len());
            }
            for _ in 0..adds {
                if b.loads().len() == capacity && b.loads().iter().all(|l| l.sources > 0) {
                    break;
                }
                b.assign();
                let counts: Vec<usize> = b.loads().iter().map(|l| l.sources).collect();
                let min = counts.iter().copied().min().unwrap_or(0);
                let max = counts.iter().copied().max().unwrap_or(0);
                prop_assert!(max - min <= 1, "{counts:?}");
            }
        }
    }
}

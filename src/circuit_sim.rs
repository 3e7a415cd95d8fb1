use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::pin::ComponentId;

pub type Tick = u64;
pub type Ticks = u64;

pub const DEFAULT_MAX_TICKS: Ticks = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunResult {
    Finished { after_ticks: Ticks },
    ReachedMaxTicks { max_ticks: Ticks },
}

impl RunResult {
    pub fn is_finished(&self) -> bool {
        matches!(self, RunResult::Finished { .. })
    }
}

/// Simulation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SimConfig {
    /// Upper bound on component evaluations per settle. Feedback loops that
    /// never reach a fixed point are reported instead of spinning forever.
    pub max_ticks: Ticks,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_ticks: DEFAULT_MAX_TICKS,
        }
    }
}

/// Pending set of components awaiting re-evaluation.
///
/// Components come out in the order they were first scheduled; scheduling a
/// component that is already pending does nothing.
#[derive(Debug, Default)]
pub struct Scheduler {
    tick: Tick,
    queue: VecDeque<ComponentId>,
    pending: HashSet<ComponentId>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of components dequeued so far.
    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn enqueue(&mut self, component: ComponentId) -> bool {
        if self.pending.insert(component) {
            self.queue.push_back(component);
            true
        } else {
            false
        }
    }

    pub fn dequeue_next(&mut self) -> Option<ComponentId> {
        let component = self.queue.pop_front()?;
        self.pending.remove(&component);
        self.tick += 1;
        Some(component)
    }

    pub fn is_settled(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_pending(&self, component: ComponentId) -> bool {
        self.pending.contains(&component)
    }
}

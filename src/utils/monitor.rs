//! Per-phase resource samples for a single orchestration run.

use crate::domain::model::OrchestratorState;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessesToUpdate, System};

/// What the run looked like when it entered `state`.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSample {
    pub state: OrchestratorState,
    /// Time spent getting from the previous state to this one.
    pub phase_time: Duration,
    pub elapsed: Duration,
    pub cpu_usage: Option<f32>,
    pub memory_mb: Option<u64>,
}

struct Timeline {
    last_mark: Instant,
    samples: Vec<PhaseSample>,
}

pub struct SystemMonitor {
    started: Instant,
    timeline: Mutex<Timeline>,
    #[cfg(feature = "cli")]
    process: Option<(Mutex<System>, Pid)>,
}

impl SystemMonitor {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            timeline: Mutex::new(Timeline {
                last_mark: now,
                samples: Vec::new(),
            }),
            #[cfg(feature = "cli")]
            process: match sysinfo::get_current_pid() {
                Ok(pid) => Some((Mutex::new(System::new()), pid)),
                Err(e) => {
                    tracing::warn!("Process monitoring unavailable: {}", e);
                    None
                }
            },
        }
    }

    #[cfg(feature = "cli")]
    fn usage(&self) -> (Option<f32>, Option<u64>) {
        let Some((system, pid)) = &self.process else {
            return (None, None);
        };
        let Ok(mut system) = system.lock() else {
            return (None, None);
        };
        system.refresh_processes(ProcessesToUpdate::Some(&[*pid]), true);
        match system.process(*pid) {
            Some(process) => (Some(process.cpu_usage()), Some(process.memory() / 1024 / 1024)),
            None => (None, None),
        }
    }

    #[cfg(not(feature = "cli"))]
    fn usage(&self) -> (Option<f32>, Option<u64>) {
        (None, None)
    }

    /// Samples the process as the run enters `state` and logs the phase.
    pub fn record(&self, state: &OrchestratorState) {
        let (cpu_usage, memory_mb) = self.usage();
        let now = Instant::now();

        let Ok(mut timeline) = self.timeline.lock() else {
            return;
        };
        let sample = PhaseSample {
            state: state.clone(),
            phase_time: now.duration_since(timeline.last_mark),
            elapsed: now.duration_since(self.started),
            cpu_usage,
            memory_mb,
        };
        timeline.last_mark = now;

        tracing::info!(
            "📊 {} after {:?} - CPU: {}, Memory: {}, Total: {:?}",
            sample.state,
            sample.phase_time,
            sample.cpu_usage.map_or("n/a".to_string(), |c| format!("{:.1}%", c)),
            sample.memory_mb.map_or("n/a".to_string(), |m| format!("{}MB", m)),
            sample.elapsed
        );
        timeline.samples.push(sample);
    }

    pub fn samples(&self) -> Vec<PhaseSample> {
        self.timeline
            .lock()
            .map(|t| t.samples.clone())
            .unwrap_or_default()
    }

    pub fn peak_memory_mb(&self) -> Option<u64> {
        self.samples().iter().filter_map(|s| s.memory_mb).max()
    }

    /// The phase that took longest to complete.
    pub fn slowest_phase(&self) -> Option<PhaseSample> {
        self.samples().into_iter().max_by_key(|s| s.phase_time)
    }

    pub fn log_summary(&self) {
        let Some(slowest) = self.slowest_phase() else {
            return;
        };
        tracing::info!(
            "📊 Run finished in {:?}; slowest phase {} ({:?}); peak memory {}",
            self.started.elapsed(),
            slowest.state,
            slowest.phase_time,
            self.peak_memory_mb()
                .map_or("n/a".to_string(), |m| format!("{}MB", m))
        );
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new()
    }
}

//! Simulation metrics
//!
//! Plain counters owned by the session (the simulation is single-threaded) plus
//! a rolling window of tick times recorded by the host loop. Exported as
//! Prometheus text or JSON.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;

/// Tick samples kept for percentile calculation
const TICK_HISTORY_LEN: usize = 1000;

/// Tick time percentiles in microseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickPercentiles {
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Counters for one crowd session
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimMetrics {
    /// Render frames ticked
    pub frames: u64,
    /// Fixed flocking steps run
    pub logic_steps: u64,
    pub spawned: u64,
    pub removed: u64,
    /// Units alive after the last tick, leader included
    pub total: u32,
    pub peak_total: u32,
    pub gates_applied: u64,
    /// Agent positions corrected by the lane clamp
    pub lane_clamps: u64,
    pub game_overs: u64,

    /// Candidates returned by neighbor queries
    #[cfg(feature = "metrics_extended")]
    pub neighbor_candidates: u64,
    /// Neighbor queries truncated by a full scratch buffer
    #[cfg(feature = "metrics_extended")]
    pub saturated_queries: u64,

    /// Most recent tick time in microseconds
    pub tick_time_us: u64,
    #[serde(skip)]
    tick_history: VecDeque<u64>,
}

impl SimMetrics {
    pub fn new() -> Self {
        Self {
            tick_history: VecDeque::with_capacity(TICK_HISTORY_LEN),
            ..Self::default()
        }
    }

    /// Record wall time spent in one tick
    pub fn record_tick_time(&mut self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us = us;
        if self.tick_history.len() == TICK_HISTORY_LEN {
            self.tick_history.pop_front();
        }
        self.tick_history.push_back(us);
    }

    /// Percentiles over the rolling window (zero until 10 samples exist)
    pub fn tick_percentiles(&self) -> TickPercentiles {
        if self.tick_history.len() < 10 {
            return TickPercentiles::default();
        }
        let mut sorted: Vec<u64> = self.tick_history.iter().copied().collect();
        sorted.sort_unstable();

        let at = |q: f32| sorted[((sorted.len() as f32 * q) as usize).min(sorted.len() - 1)];
        TickPercentiles {
            p50_us: at(0.50),
            p95_us: at(0.95),
            p99_us: at(0.99),
            max_us: sorted.last().copied().unwrap_or(0),
        }
    }

    /// Clear every counter, keeping the history allocation
    pub fn reset(&mut self) {
        let mut history = std::mem::take(&mut self.tick_history);
        history.clear();
        *self = Self {
            tick_history: history,
            ..Self::default()
        };
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(2048);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!("crowd_frames_total", "Render frames ticked", "counter", self.frames);
        metric!("crowd_logic_steps_total", "Fixed flocking steps", "counter", self.logic_steps);
        metric!("crowd_spawned_total", "Agents spawned", "counter", self.spawned);
        metric!("crowd_removed_total", "Agents removed", "counter", self.removed);
        metric!("crowd_population", "Units alive including the leader", "gauge", self.total);
        metric!("crowd_population_peak", "Highest population reached", "gauge", self.peak_total);
        metric!("crowd_gates_total", "Gates applied", "counter", self.gates_applied);
        metric!("crowd_lane_clamps_total", "Positions corrected by the lane clamp", "counter",
            self.lane_clamps);
        metric!("crowd_game_overs_total", "Sessions ended by game over", "counter", self.game_overs);

        #[cfg(feature = "metrics_extended")]
        {
            metric!("crowd_neighbor_candidates_total", "Neighbor query candidates", "counter",
                self.neighbor_candidates);
            metric!("crowd_neighbor_saturated_total", "Truncated neighbor queries", "counter",
                self.saturated_queries);
        }

        let percentiles = self.tick_percentiles();
        metric!("crowd_tick_time_microseconds", "Last tick time", "gauge", self.tick_time_us);
        metric!("crowd_tick_time_p95_microseconds", "95th percentile tick time", "gauge",
            percentiles.p95_us);
        metric!("crowd_tick_time_p99_microseconds", "99th percentile tick time", "gauge",
            percentiles.p99_us);
        metric!("crowd_tick_time_max_microseconds", "Maximum tick time", "gauge",
            percentiles.max_us);

        output
    }

    /// JSON snapshot including tick percentiles
    pub fn to_json(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct Snapshot<'a> {
            #[serde(flatten)]
            counters: &'a SimMetrics,
            tick: TickPercentiles,
        }
        serde_json::to_string_pretty(&Snapshot {
            counters: self,
            tick: self.tick_percentiles(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = SimMetrics::new();
        assert_eq!(metrics.frames, 0);
        assert_eq!(metrics.tick_percentiles(), TickPercentiles::default());
    }

    #[test]
    fn test_record_tick_time() {
        let mut metrics = SimMetrics::new();
        for i in 0..100 {
            metrics.record_tick_time(Duration::from_micros(100 + i * 10));
        }

        let p = metrics.tick_percentiles();
        assert_eq!(metrics.tick_time_us, 1090);
        assert_eq!(p.max_us, 1090);
        assert!(p.p95_us >= p.p50_us && p.p99_us >= p.p95_us);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut metrics = SimMetrics::new();
        for i in 0..(TICK_HISTORY_LEN as u64 + 50) {
            metrics.record_tick_time(Duration::from_micros(i));
        }
        assert_eq!(metrics.tick_history.len(), TICK_HISTORY_LEN);
        assert_eq!(metrics.tick_history.front().copied(), Some(50));
    }

    #[test]
    fn test_prometheus_format() {
        let mut metrics = SimMetrics::new();
        metrics.total = 50;
        metrics.spawned = 49;

        let output = metrics.to_prometheus();
        assert!(output.contains("crowd_population 50"));
        assert!(output.contains("crowd_spawned_total 49"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_json_format() {
        let mut metrics = SimMetrics::new();
        metrics.peak_total = 120;
        let json = metrics.to_json().unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["peak_total"], 120);
        assert!(value["tick"].is_object());
    }

    #[test]
    fn test_reset_clears_counters() {
        let mut metrics = SimMetrics::new();
        metrics.frames = 10;
        metrics.record_tick_time(Duration::from_micros(5));
        metrics.reset();
        assert_eq!(metrics.frames, 0);
        assert_eq!(metrics.tick_time_us, 0);
        assert!(metrics.tick_history.is_empty());
    }
}

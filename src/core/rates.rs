use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::types::SimTime;

/// Empirical arrival and service rates over a sliding window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmpiricalRates {
    /// Arrivals per minute
    pub arrival_rate: f64,
    /// Completions per minute of preparation, per server
    pub service_rate: f64,
    pub arrivals_observed: usize,
    pub completions_observed: usize,
}

/// Sliding-window estimator feeding the queueing model.
///
/// λ is arrivals inside the window divided by the covered span; μ is
/// completions divided by the preparation minutes they took, i.e. one over
/// the mean observed preparation time.
#[derive(Debug, Clone)]
pub struct RateEstimator {
    window: f64,
    started_at: Option<SimTime>,
    arrivals: VecDeque<SimTime>,
    completions: VecDeque<(SimTime, f64)>,
}

impl RateEstimator {
    pub fn new(window_minutes: f64) -> Self {
        Self {
            window: window_minutes,
            started_at: None,
            arrivals: VecDeque::new(),
            completions: VecDeque::new(),
        }
    }

    pub fn window(&self) -> f64 {
        self.window
    }

    fn mark_start(&mut self, now: SimTime) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    /// Note the start of the observation period without recording anything
    pub fn observe_clock(&mut self, now: SimTime) {
        self.mark_start(now);
    }

    pub fn record_arrival(&mut self, at: SimTime) {
        self.mark_start(at);
        self.arrivals.push_back(at);
    }

    pub fn record_completion(&mut self, at: SimTime, prep_duration: f64) {
        self.mark_start(at);
        self.completions.push_back((at, prep_duration.max(0.0)));
    }

    fn evict(&mut self, now: SimTime) {
        let cutoff = now - self.window;
        while self.arrivals.front().is_some_and(|t| *t < cutoff) {
            self.arrivals.pop_front();
        }
        while self.completions.front().is_some_and(|(t, _)| *t < cutoff) {
            self.completions.pop_front();
        }
    }

    /// Current estimate, `None` until at least one arrival and one completion
    /// with positive duration fall inside the window
    pub fn estimate(&mut self, now: SimTime) -> Option<EmpiricalRates> {
        self.evict(now);

        let started = self.started_at?;
        let span = (now - started).min(self.window);
        if span <= 0.0 || self.arrivals.is_empty() {
            return None;
        }

        let busy: f64 = self.completions.iter().map(|(_, d)| d).sum();
        if self.completions.is_empty() || busy <= 0.0 {
            return None;
        }

        Some(EmpiricalRates {
            arrival_rate: self.arrivals.len() as f64 / span,
            service_rate: self.completions.len() as f64 / busy,
            arrivals_observed: self.arrivals.len(),
            completions_observed: self.completions.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_estimate_without_data() {
        let mut estimator = RateEstimator::new(60.0);
        estimator.observe_clock(0.0);
        assert!(estimator.estimate(10.0).is_none());

        estimator.record_arrival(1.0);
        assert!(estimator.estimate(10.0).is_none());
    }

    #[test]
    fn test_rates_from_window() {
        let mut estimator = RateEstimator::new(60.0);
        estimator.observe_clock(0.0);
        for t in 0..5 {
            estimator.record_arrival(t as f64 * 2.0);
        }
        estimator.record_completion(5.0, 4.0);
        estimator.record_completion(8.0, 2.0);

        let rates = estimator.estimate(10.0).unwrap();
        assert!((rates.arrival_rate - 0.5).abs() < 1e-9);
        assert!((rates.service_rate - 2.0 / 6.0).abs() < 1e-9);
        assert_eq!(rates.completions_observed, 2);
    }

    #[test]
    fn test_old_observations_expire() {
        let mut estimator = RateEstimator::new(10.0);
        estimator.observe_clock(0.0);
        estimator.record_arrival(0.0);
        estimator.record_arrival(1.0);
        estimator.record_arrival(15.0);
        estimator.record_completion(16.0, 3.0);

        let rates = estimator.estimate(20.0).unwrap();
        assert_eq!(rates.arrivals_observed, 1);
        assert!((rates.arrival_rate - 0.1).abs() < 1e-9);
    }
}

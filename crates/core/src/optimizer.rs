// crates/core/src/optimizer.rs
//! Nearest-neighbor visit ordering.
//!
//! Greedy, not globally optimal: O(n²) over a day's jobs, which stays small.
//! Ties go to the job that appeared first in the input so plans are
//! reproducible.

use serde::Serialize;

use crate::error::PlanError;
use crate::geo::distance_km;
use crate::types::{Coordinate, Job};

/// A job paired with the coordinate it resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutableJob {
    pub job: Job,
    pub coordinate: Coordinate,
}

impl RoutableJob {
    pub fn new(job: Job, coordinate: Coordinate) -> Self {
        Self { job, coordinate }
    }
}

/// One stop in a planned route.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStop {
    pub job: Job,
    pub coordinate: Coordinate,
    /// 0-based position in the plan.
    pub route_order: usize,
    /// Kilometers from the previous stop (or the start point for the first stop).
    pub distance_from_prev_km: f64,
}

/// An ordered visit list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlan {
    start: Option<Coordinate>,
    stops: Vec<RouteStop>,
}

impl RoutePlan {
    pub fn stops(&self) -> &[RouteStop] {
        &self.stops
    }

    pub fn start(&self) -> Option<Coordinate> {
        self.start
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RouteStop> {
        self.stops.get(index)
    }

    pub fn total_distance_km(&self) -> f64 {
        self.stops.iter().map(|s| s.distance_from_prev_km).sum()
    }

    /// Stop coordinates in visiting order.
    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.stops.iter().map(|s| s.coordinate).collect()
    }

    /// Move the stop at `from` to `to`, renumber, and recompute leg distances.
    ///
    /// The first stop's leg is measured from the plan's start point, or is
    /// zero when the plan has none.
    pub fn move_stop(&mut self, from: usize, to: usize) -> Result<(), PlanError> {
        let len = self.stops.len();
        for index in [from, to] {
            if index >= len {
                return Err(PlanError::IndexOutOfRange { index, len });
            }
        }
        let stop = self.stops.remove(from);
        self.stops.insert(to, stop);
        self.recompute();
        Ok(())
    }

    fn recompute(&mut self) {
        let mut prev = self.start;
        for (order, stop) in self.stops.iter_mut().enumerate() {
            stop.route_order = order;
            stop.distance_from_prev_km = prev.map_or(0.0, |p| distance_km(p, stop.coordinate));
            prev = Some(stop.coordinate);
        }
    }
}

/// Order `jobs` by repeatedly visiting the closest remaining job.
///
/// Starts from `start` when known, otherwise from the first job's coordinate
/// (which makes that job the first stop at distance zero).
pub fn optimize(jobs: Vec<RoutableJob>, start: Option<Coordinate>) -> RoutePlan {
    let Some(first) = jobs.first() else {
        return RoutePlan { start, stops: Vec::new() };
    };

    let mut current = start.unwrap_or(first.coordinate);
    let mut remaining = jobs;
    let mut stops = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (i, candidate) in remaining.iter().enumerate() {
            let d = distance_km(current, candidate.coordinate);
            // Strict comparison keeps the earliest job on ties.
            if d < best_distance {
                best = i;
                best_distance = d;
            }
        }

        // Vec::remove keeps the relative input order of the rest.
        let next = remaining.remove(best);
        current = next.coordinate;
        stops.push(RouteStop {
            job: next.job,
            coordinate: next.coordinate,
            route_order: stops.len(),
            distance_from_prev_km: best_distance,
        });
    }

    RoutePlan { start, stops }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JobStatus;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn c(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    fn routable(id: &str, lat: f64, lng: f64) -> RoutableJob {
        RoutableJob::new(Job::new(id, id, JobStatus::Scheduled), c(lat, lng))
    }

    fn ids(plan: &RoutePlan) -> Vec<&str> {
        plan.stops().iter().map(|s| s.job.id.as_str()).collect()
    }

    #[test]
    fn empty_input_gives_empty_plan() {
        let plan = optimize(Vec::new(), Some(c(0.0, 0.0)));
        assert!(plan.is_empty());
        assert_eq!(plan.total_distance_km(), 0.0);
    }

    #[test]
    fn nearest_neighbor_walks_the_line() {
        // Input deliberately shuffled.
        let jobs = vec![routable("C", 0.0, 2.0), routable("A", 0.0, 0.0), routable("B", 0.0, 1.0)];
        let plan = optimize(jobs, Some(c(0.0, -1.0)));
        assert_eq!(ids(&plan), vec!["A", "B", "C"]);

        let mut cumulative = 0.0;
        for stop in plan.stops() {
            assert!(stop.distance_from_prev_km > 0.0);
            let next = cumulative + stop.distance_from_prev_km;
            assert!(next > cumulative);
            cumulative = next;
        }
        assert!((plan.total_distance_km() - cumulative).abs() < 1e-9);
        assert!((plan.total_distance_km() - 3.0 * distance_km(c(0.0, 0.0), c(0.0, 1.0))).abs() < 1e-6);
    }

    #[test]
    fn without_start_the_first_job_leads() {
        let jobs = vec![routable("far", 0.0, 5.0), routable("near", 0.0, 0.0), routable("mid", 0.0, 3.0)];
        let plan = optimize(jobs, None);
        assert_eq!(ids(&plan), vec!["far", "mid", "near"]);
        assert_eq!(plan.stops()[0].distance_from_prev_km, 0.0);
        assert_eq!(plan.start(), None);
    }

    #[test]
    fn ties_go_to_input_order() {
        // Both one degree of longitude from the start.
        let jobs = vec![routable("east", 0.0, 1.0), routable("west", 0.0, -1.0)];
        let plan = optimize(jobs, Some(c(0.0, 0.0)));
        assert_eq!(ids(&plan), vec!["east", "west"]);

        let jobs = vec![routable("west", 0.0, -1.0), routable("east", 0.0, 1.0)];
        let plan = optimize(jobs, Some(c(0.0, 0.0)));
        assert_eq!(ids(&plan), vec!["west", "east"]);
    }

    #[test]
    fn move_stop_renumbers_and_recomputes() {
        let jobs = vec![routable("A", 0.0, 0.0), routable("B", 0.0, 1.0), routable("C", 0.0, 2.0)];
        let mut plan = optimize(jobs, Some(c(0.0, -1.0)));
        plan.move_stop(2, 0).unwrap();

        assert_eq!(ids(&plan), vec!["C", "A", "B"]);
        let orders: Vec<usize> = plan.stops().iter().map(|s| s.route_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);

        let one_degree = distance_km(c(0.0, 0.0), c(0.0, 1.0));
        assert!((plan.stops()[0].distance_from_prev_km - 3.0 * one_degree).abs() < 1e-6);
        assert!((plan.stops()[1].distance_from_prev_km - 2.0 * one_degree).abs() < 1e-6);
        assert!((plan.stops()[2].distance_from_prev_km - one_degree).abs() < 1e-6);
    }

    #[test]
    fn move_stop_without_start_zeroes_first_leg() {
        let jobs = vec![routable("A", 0.0, 0.0), routable("B", 0.0, 1.0)];
        let mut plan = optimize(jobs, None);
        plan.move_stop(1, 0).unwrap();
        assert_eq!(ids(&plan), vec!["B", "A"]);
        assert_eq!(plan.stops()[0].distance_from_prev_km, 0.0);
        assert!(plan.stops()[1].distance_from_prev_km > 0.0);
    }

    #[test]
    fn move_stop_out_of_range_is_rejected() {
        let mut plan = optimize(vec![routable("A", 0.0, 0.0)], None);
        let before = plan.clone();
        assert_eq!(plan.move_stop(0, 3), Err(PlanError::IndexOutOfRange { index: 3, len: 1 }));
        assert_eq!(plan, before);
    }

    proptest! {
        #[test]
        fn plan_is_a_permutation(
            points in prop::collection::vec((-60.0f64..60.0, -170.0f64..170.0), 0..25),
            start in prop::option::of((-60.0f64..60.0, -170.0f64..170.0)),
        ) {
            let jobs: Vec<RoutableJob> = points
                .iter()
                .enumerate()
                .map(|(i, (lat, lng))| routable(&i.to_string(), *lat, *lng))
                .collect();
            let n = jobs.len();
            let plan = optimize(jobs, start.map(|(lat, lng)| c(lat, lng)));

            prop_assert_eq!(plan.len(), n);
            let mut orders: Vec<usize> = plan.stops().iter().map(|s| s.route_order).collect();
            orders.sort_unstable();
            prop_assert_eq!(orders, (0..n).collect::<Vec<_>>());

            let mut seen: Vec<&str> = plan.stops().iter().map(|s| s.job.id.as_str()).collect();
            seen.sort_unstable();
            seen.dedup();
            prop_assert_eq!(seen.len(), n);
            prop_assert!(plan.stops().iter().all(|s| s.distance_from_prev_km >= 0.0));
        }
    }
}

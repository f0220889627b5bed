use crate::error::OptimizationError;

use super::{
    route_problem::{RouteProblem, Waypoint},
    stop::StopIdx,
};

/// Pair of waypoints the matrices have no data for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingLeg {
    pub from: Waypoint,
    pub to: Waypoint,
}

impl MissingLeg {
    pub fn into_error(self, problem: &RouteProblem) -> OptimizationError {
        problem.unreachable(self.from, self.to)
    }

    /// The stop to give up on so the route becomes reachable again.
    pub fn offending_stop(&self) -> Option<StopIdx> {
        match (self.from, self.to) {
            (_, Waypoint::Stop(stop_id)) => Some(stop_id),
            (Waypoint::Stop(stop_id), _) => Some(stop_id),
            _ => None,
        }
    }
}

/// Dense cost table over `[start, members..., end]` for one run.
///
/// Building it reads every leg a tour over `members` could use, so a successful
/// build means every order of the members can be costed.
#[derive(Debug, Clone)]
pub struct RouteCosts {
    members: Vec<StopIdx>,
    nodes: Vec<Option<usize>>,
    num_nodes: usize,
    has_end: bool,
    is_symmetric: bool,
    distances: Vec<f64>,
    durations: Vec<f64>,
}

impl RouteCosts {
    pub fn build(problem: &RouteProblem, members: &[StopIdx]) -> Result<RouteCosts, MissingLeg> {
        let has_end = problem.has_end();
        let num_nodes = members.len() + 1 + usize::from(has_end);

        let mut nodes = vec![None; problem.num_stops()];
        let mut waypoints = Vec::with_capacity(num_nodes);
        waypoints.push(Waypoint::Start);
        for (position, &stop_id) in members.iter().enumerate() {
            nodes[stop_id.get()] = Some(position + 1);
            waypoints.push(Waypoint::Stop(stop_id));
        }
        if has_end {
            waypoints.push(Waypoint::End);
        }

        let matrices = problem.matrices();
        let mut distances = vec![0.0; num_nodes * num_nodes];
        let mut durations = vec![0.0; num_nodes * num_nodes];

        for (i, &from) in waypoints.iter().enumerate() {
            if from == Waypoint::End {
                continue;
            }
            let from_location = problem.waypoint_location_id(from);

            for (j, &to) in waypoints.iter().enumerate() {
                if i == j || to == Waypoint::Start {
                    continue;
                }
                let to_location = problem.waypoint_location_id(to);

                let leg = matrices
                    .distance(from_location, to_location)
                    .zip(matrices.time(from_location, to_location));

                match leg {
                    Some((distance, duration)) => {
                        distances[i * num_nodes + j] = distance;
                        durations[i * num_nodes + j] = duration;
                    }
                    // An empty tour never drives straight back.
                    None if from == Waypoint::Start && to == Waypoint::End => {}
                    None => return Err(MissingLeg { from, to }),
                }
            }
        }

        Ok(RouteCosts {
            members: members.to_vec(),
            nodes,
            num_nodes,
            has_end,
            is_symmetric: problem.is_symmetric(),
            distances,
            durations,
        })
    }

    /// Costs over every stop of the problem, failing on the first missing leg.
    pub fn for_all_stops(problem: &RouteProblem) -> Result<RouteCosts, OptimizationError> {
        let members = problem.stop_ids().collect::<Vec<_>>();
        Self::build(problem, &members).map_err(|missing| missing.into_error(problem))
    }

    pub fn members(&self) -> &[StopIdx] {
        &self.members
    }

    pub fn contains(&self, stop_id: StopIdx) -> bool {
        self.nodes
            .get(stop_id.get())
            .is_some_and(|node| node.is_some())
    }

    pub fn has_end(&self) -> bool {
        self.has_end
    }

    pub fn is_symmetric(&self) -> bool {
        self.is_symmetric
    }

    #[inline(always)]
    fn node(&self, waypoint: Waypoint) -> usize {
        match waypoint {
            Waypoint::Start => 0,
            Waypoint::Stop(stop_id) => self.nodes[stop_id.get()].unwrap_or(0),
            Waypoint::End => self.num_nodes - 1,
        }
    }

    /// Meters from `from` to `to`, zero when `to` is `End` on an open tour.
    #[inline(always)]
    pub fn distance(&self, from: Waypoint, to: Waypoint) -> f64 {
        if to == Waypoint::End && !self.has_end {
            return 0.0;
        }
        self.distances[self.node(from) * self.num_nodes + self.node(to)]
    }

    /// Free-flow seconds from `from` to `to`.
    #[inline(always)]
    pub fn duration(&self, from: Waypoint, to: Waypoint) -> f64 {
        if to == Waypoint::End && !self.has_end {
            return 0.0;
        }
        self.durations[self.node(from) * self.num_nodes + self.node(to)]
    }

    #[inline]
    pub fn stop_distance(&self, from: StopIdx, to: StopIdx) -> f64 {
        self.distance(Waypoint::Stop(from), Waypoint::Stop(to))
    }

    /// Waypoint before position `position` of `order`.
    #[inline]
    pub fn previous(order: &[StopIdx], position: usize) -> Waypoint {
        if position == 0 {
            Waypoint::Start
        } else {
            Waypoint::Stop(order[position - 1])
        }
    }

    /// Waypoint after position `position` of `order`.
    #[inline]
    pub fn next(order: &[StopIdx], position: usize) -> Waypoint {
        if position + 1 >= order.len() {
            Waypoint::End
        } else {
            Waypoint::Stop(order[position + 1])
        }
    }

    pub fn tour_distance(&self, order: &[StopIdx]) -> f64 {
        self.legs(order)
            .map(|(from, to)| self.distance(from, to))
            .sum()
    }

    pub fn tour_duration(&self, order: &[StopIdx]) -> f64 {
        self.legs(order)
            .map(|(from, to)| self.duration(from, to))
            .sum()
    }

    /// Every leg driven by `order`, including the closing leg when the tour returns.
    pub fn legs<'a>(
        &self,
        order: &'a [StopIdx],
    ) -> impl Iterator<Item = (Waypoint, Waypoint)> + use<'a> {
        let has_end = self.has_end;
        let waypoints = std::iter::once(Waypoint::Start)
            .chain(order.iter().map(|&stop_id| Waypoint::Stop(stop_id)))
            .chain(has_end.then_some(Waypoint::End));

        waypoints
            .clone()
            .zip(waypoints.skip(1))
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils;

    use super::*;

    #[test]
    fn test_open_tour_distance() {
        let problem = test_utils::line_problem(&[100.0, 200.0, 300.0]);
        let costs = RouteCosts::for_all_stops(&problem).unwrap();

        let order = [StopIdx::new(0), StopIdx::new(1), StopIdx::new(2)];
        assert_eq!(costs.tour_distance(&order), 300.0);

        let order = [StopIdx::new(2), StopIdx::new(0), StopIdx::new(1)];
        assert_eq!(costs.tour_distance(&order), 300.0 + 200.0 + 100.0);
        assert_eq!(costs.tour_duration(&order), 60.0);
    }

    #[test]
    fn test_closed_tour_distance() {
        let problem = test_utils::line_problem_returning(&[100.0, 200.0]);
        let costs = RouteCosts::for_all_stops(&problem).unwrap();

        let order = [StopIdx::new(0), StopIdx::new(1)];
        assert_eq!(costs.tour_distance(&order), 400.0);
        assert_eq!(costs.legs(&order).count(), 3);
    }

    #[test]
    fn test_missing_leg_names_stop_pair() {
        let problem = test_utils::problem_with_missing_leg();

        let error = RouteCosts::for_all_stops(&problem).unwrap_err();
        assert_eq!(
            error,
            OptimizationError::UnreachableStop {
                from: "van-1 (start)".to_owned(),
                to: "b".to_owned(),
            }
        );

        let missing = RouteCosts::build(&problem, &[StopIdx::new(0), StopIdx::new(1)]).unwrap_err();
        assert_eq!(missing.offending_stop(), Some(StopIdx::new(1)));
    }

    #[test]
    fn test_subset_of_members() {
        let problem = test_utils::problem_with_missing_leg();

        let costs = RouteCosts::build(&problem, &[StopIdx::new(0)]).unwrap();
        assert!(costs.contains(StopIdx::new(0)));
        assert!(!costs.contains(StopIdx::new(1)));
    }
}

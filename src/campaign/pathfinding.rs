//! Frontier search over hex move rules
//!
//! [`Dijkstra`] holds the shared search state. A [`SearchGoal`] decides the
//! visit priority and when to stop: [`AStar`] stops at a single target,
//! [`Reachable`] floods everything within a cost budget.

use ahash::AHashMap;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::campaign::map::HexCoord;
use crate::campaign::moves::MoveRules;

/// Ordering and termination for a [`Dijkstra`] run
pub trait SearchGoal {
    /// Frontier priority of a hex reached at `cost`; lower is visited first
    fn priority<R: MoveRules + ?Sized>(&self, _rules: &R, cost: u32, _coord: HexCoord) -> u32 {
        cost
    }

    /// Stop before the frontier is exhausted
    fn is_done(&self, visited: &AHashMap<HexCoord, u32>) -> bool;

    /// Whether a path of this cost is worth exploring at all
    fn admits(&self, _cost: u32) -> bool {
        true
    }
}

/// Shared frontier search state
pub struct Dijkstra<'r, R: MoveRules + ?Sized> {
    rules: &'r R,
    origin: HexCoord,
    frontier: BinaryHeap<Reverse<(u32, HexCoord)>>,
    costs: AHashMap<HexCoord, u32>,
    visited: AHashMap<HexCoord, u32>,
    came_from: AHashMap<HexCoord, HexCoord>,
}

impl<'r, R: MoveRules + ?Sized> Dijkstra<'r, R> {
    pub fn new(rules: &'r R, origin: HexCoord) -> Self {
        let origin = rules.canonical(origin);
        let mut frontier = BinaryHeap::new();
        frontier.push(Reverse((0, origin)));
        let mut costs = AHashMap::new();
        costs.insert(origin, 0);
        Self {
            rules,
            origin,
            frontier,
            costs,
            visited: AHashMap::new(),
            came_from: AHashMap::new(),
        }
    }

    pub fn origin(&self) -> HexCoord {
        self.origin
    }

    /// Pop and finalise hexes until the goal is met or the frontier runs dry
    pub fn run<G: SearchGoal>(&mut self, goal: &G) {
        while !goal.is_done(&self.visited) {
            let Some(Reverse((_, coord))) = self.frontier.pop() else {
                break;
            };
            if !self.visited.contains_key(&coord) {
                self.visit(coord, goal);
            }
        }
    }

    fn visit<G: SearchGoal>(&mut self, coord: HexCoord, goal: &G) {
        let base = self.costs.get(&coord).copied().unwrap_or(0);
        for next in self.rules.adjacent(coord) {
            let Some(step) = self.rules.cost(coord, next) else {
                continue;
            };
            let cost = base + step;
            if !goal.admits(cost) {
                continue;
            }
            let improves = self.costs.get(&next).map_or(true, |&known| cost < known);
            if improves {
                self.costs.insert(next, cost);
                self.came_from.insert(next, coord);
                let priority = goal.priority(self.rules, cost, next);
                self.frontier.push(Reverse((priority, next)));
            }
        }
        self.visited.insert(coord, base);
    }

    /// Finalised hexes and their costs
    pub fn visited(&self) -> &AHashMap<HexCoord, u32> {
        &self.visited
    }

    pub fn cost_to(&self, coord: HexCoord) -> Option<u32> {
        self.visited.get(&self.rules.canonical(coord)).copied()
    }

    pub fn is_exhausted(&self) -> bool {
        self.frontier.is_empty()
    }

    /// Path from the origin to a visited hex, both ends included
    pub fn path_to(&self, coord: HexCoord) -> Option<Vec<HexCoord>> {
        let mut current = self.rules.canonical(coord);
        if !self.visited.contains_key(&current) {
            return None;
        }
        let mut path = vec![current];
        while current != self.origin {
            current = *self.came_from.get(&current)?;
            path.push(current);
        }
        path.reverse();
        Some(path)
    }
}

/// Search for one target using exact hex distance as the heuristic
pub struct AStar<'r, R: MoveRules + ?Sized> {
    search: Dijkstra<'r, R>,
    target: Target,
}

struct Target(HexCoord);

impl SearchGoal for Target {
    fn priority<R: MoveRules + ?Sized>(&self, rules: &R, cost: u32, coord: HexCoord) -> u32 {
        cost + rules.distance(coord, self.0)
    }

    fn is_done(&self, visited: &AHashMap<HexCoord, u32>) -> bool {
        visited.contains_key(&self.0)
    }
}

impl<'r, R: MoveRules + ?Sized> AStar<'r, R> {
    pub fn new(rules: &'r R, origin: HexCoord, target: HexCoord) -> Self {
        Self {
            search: Dijkstra::new(rules, origin),
            target: Target(rules.canonical(target)),
        }
    }

    /// Run to completion; the cost of the cheapest path, if there is one
    pub fn run(&mut self) -> Option<u32> {
        self.search.run(&self.target);
        let cost = self.cost();
        tracing::debug!(
            origin = ?self.search.origin(),
            target = ?self.target.0,
            ?cost,
            visited = self.search.visited().len(),
            "A* search finished"
        );
        cost
    }

    pub fn cost(&self) -> Option<u32> {
        self.search.cost_to(self.target.0)
    }

    pub fn path(&self) -> Option<Vec<HexCoord>> {
        self.search.path_to(self.target.0)
    }

    pub fn search(&self) -> &Dijkstra<'r, R> {
        &self.search
    }
}

/// Every hex reachable within `max_cost`
#[derive(Debug, Clone, Copy)]
pub struct Reachable {
    pub max_cost: u32,
}

impl SearchGoal for Reachable {
    fn is_done(&self, _visited: &AHashMap<HexCoord, u32>) -> bool {
        false
    }

    fn admits(&self, cost: u32) -> bool {
        cost <= self.max_cost
    }
}

impl Reachable {
    pub fn new(max_cost: u32) -> Self {
        Self { max_cost }
    }

    /// Flood from `origin`; the finished search answers cost and path queries
    pub fn run<'r, R: MoveRules + ?Sized>(&self, rules: &'r R, origin: HexCoord) -> Dijkstra<'r, R> {
        let mut search = Dijkstra::new(rules, origin);
        search.run(self);
        search
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::map::TileMap;
    use crate::campaign::moves::{MapMoveRules, SimpleHexMoveRules};

    #[test]
    fn test_astar_stay_still() {
        let rules = SimpleHexMoveRules;
        let mut astar = AStar::new(&rules, HexCoord::new(1, 1), HexCoord::new(1, 1));
        assert_eq!(astar.run(), Some(0));
        assert_eq!(astar.search().visited().len(), 1);
        assert_eq!(astar.path(), Some(vec![HexCoord::new(1, 1)]));
    }

    #[test]
    fn test_astar_one_step() {
        let rules = SimpleHexMoveRules;
        let mut astar = AStar::new(&rules, HexCoord::new(1, 1), HexCoord::new(2, 0));
        assert_eq!(astar.run(), Some(1));
    }

    #[test]
    fn test_astar_couple_steps() {
        let rules = SimpleHexMoveRules;
        let mut astar = AStar::new(&rules, HexCoord::new(1, 1), HexCoord::new(3, 4));
        assert_eq!(astar.run(), Some(5));

        let path = astar.path().unwrap();
        assert_eq!(path.len(), 6);
        assert_eq!(path.first(), Some(&HexCoord::new(1, 1)));
        assert_eq!(path.last(), Some(&HexCoord::new(3, 4)));
        for pair in path.windows(2) {
            assert!(pair[0].is_adjacent(&pair[1]));
        }
    }

    #[test]
    fn test_astar_matches_distance() {
        let rules = SimpleHexMoveRules;
        let origin = HexCoord::new(0, 0);
        for target in [HexCoord::new(-4, 2), HexCoord::new(3, -1), HexCoord::new(-2, -3)] {
            let mut astar = AStar::new(&rules, origin, target);
            assert_eq!(astar.run(), Some(origin.distance(&target)));
        }
    }

    #[test]
    fn test_astar_wraps_around_map() {
        let map = TileMap::generate_square(14, 14);
        let rules = MapMoveRules::new(&map);
        let mut astar = AStar::new(&rules, HexCoord::new(6, -3), HexCoord::new(-7, 4));
        assert_eq!(astar.run(), Some(1));
    }

    #[test]
    fn test_astar_unreachable_target_terminates() {
        let map = TileMap::generate_square(4, 4);
        let rules = MapMoveRules::new(&map);
        // Far outside the map vertically
        let mut astar = AStar::new(&rules, HexCoord::new(0, 0), HexCoord::new(0, 40));
        assert_eq!(astar.run(), None);
        assert!(astar.search().is_exhausted());
        assert_eq!(astar.search().visited().len(), map.len());
    }

    #[test]
    fn test_reachable_ring_counts() {
        let rules = SimpleHexMoveRules;
        let search = Reachable::new(2).run(&rules, HexCoord::new(0, 0));
        // 1 + 6 + 12
        assert_eq!(search.visited().len(), 19);
        assert_eq!(search.cost_to(HexCoord::new(2, -2)), Some(2));
        assert_eq!(search.cost_to(HexCoord::new(3, 0)), None);
        assert_eq!(search.path_to(HexCoord::new(0, 2)).map(|p| p.len()), Some(3));
    }
}

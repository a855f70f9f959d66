use crate::{PlanError, PlanningState, Result, StateKey};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::{Duration, Instant};

/// Trait defining the interface for search algorithms used by the planner.
///
/// An implementation explores the states reachable from `initial` and returns
/// the first goal state it settles on. The goal state carries the plan that
/// produced it. Implementations include A* search and Dijkstra's algorithm.
///
/// # Examples
///
/// ```
/// use harvest_rs::{PlanError, PlanningState, SearchAlgorithm, SearchOutcome, SearchStats};
///
/// /// Follows the first applicable action until it reaches a goal or a dead end.
/// struct FirstChoiceSearch;
///
/// impl SearchAlgorithm for FirstChoiceSearch {
///     fn search(&self, initial: PlanningState) -> Result<SearchOutcome, PlanError> {
///         let mut state = initial;
///         let mut stats = SearchStats::default();
///         while !state.is_goal() {
///             state = state
///                 .generate_successors()
///                 .into_iter()
///                 .next()
///                 .ok_or(PlanError::NoPlanFound)?;
///             stats.expanded += 1;
///         }
///         Ok(SearchOutcome { state, stats })
///     }
/// }
/// ```
pub trait SearchAlgorithm {
    /// Searches from `initial` to any state satisfying its goal.
    ///
    /// # Returns
    ///
    /// * `Ok(SearchOutcome)` - The goal state reached, with its plan and cost
    /// * `Err(PlanError)` - If no plan exists or the search budget ran out
    fn search(&self, initial: PlanningState) -> Result<SearchOutcome>;
}

/// A trait for heuristic functions used in search algorithms.
pub trait HeuristicStrategy: Send + Sync {
    /// Estimates the remaining cost from a state to its goal.
    fn calculate(&self, state: &PlanningState) -> f64;
}

/// Reads the estimate each state computes for itself, see [`crate::heuristic`].
pub struct DefaultHeuristic;

impl HeuristicStrategy for DefaultHeuristic {
    fn calculate(&self, state: &PlanningState) -> f64 {
        state.heuristic()
    }
}

/// Zero heuristic for algorithms like Dijkstra that don't use heuristics.
pub struct ZeroHeuristic;

impl HeuristicStrategy for ZeroHeuristic {
    fn calculate(&self, _state: &PlanningState) -> f64 {
        0.0
    }
}

/// Bounds on how much work one search may do. `None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchLimits {
    pub max_expansions: Option<usize>,
    pub time_limit: Option<Duration>,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_expansions: Some(200_000),
            time_limit: None,
        }
    }
}

impl SearchLimits {
    pub fn unbounded() -> Self {
        Self {
            max_expansions: None,
            time_limit: None,
        }
    }
}

/// Counters collected while searching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// States taken off the frontier and expanded.
    pub expanded: usize,
    /// Successor states produced.
    pub generated: usize,
    /// Successors dropped because their configuration was already expanded.
    pub skipped_closed: usize,
    /// Successors dropped because the frontier already reaches them as cheaply.
    pub skipped_dominated: usize,
}

/// A goal state and the work it took to find it.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub state: PlanningState,
    pub stats: SearchStats,
}

/// Represents a frontier entry in the search space.
#[derive(Debug)]
struct Node {
    /// The state at this node
    state: PlanningState,
    /// Total estimated cost (f = g + h)
    f_cost: f64,
    /// Path cost for tie-breaking
    g_cost: f64,
    /// Insertion order, the last tie-breaker
    seq: usize,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // First compare by f_cost
        self.f_cost
            .total_cmp(&other.f_cost)
            // If f_costs are equal, prefer paths that are further along (higher g_cost)
            .then_with(|| other.g_cost.total_cmp(&self.g_cost))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Manages the state of a graph search.
struct SearchContext<'a> {
    heuristic: &'a dyn HeuristicStrategy,
    /// Priority queue of states to explore, cheapest first
    open_set: BinaryHeap<Reverse<Node>>,
    /// Best path cost seen so far for each configuration still in the open set
    best_g: HashMap<StateKey, f64>,
    /// Configurations that have been expanded
    closed_set: HashSet<StateKey>,
    next_seq: usize,
    stats: SearchStats,
}

impl<'a> SearchContext<'a> {
    /// Creates a new search context with the initial state.
    fn new(initial: PlanningState, heuristic: &'a dyn HeuristicStrategy) -> Self {
        let mut context = Self {
            heuristic,
            open_set: BinaryHeap::new(),
            best_g: HashMap::new(),
            closed_set: HashSet::new(),
            next_seq: 0,
            stats: SearchStats::default(),
        };
        context.best_g.insert(initial.key(), initial.cost());
        context.push(initial);
        context
    }

    fn push(&mut self, state: PlanningState) {
        let g_cost = state.cost();
        let f_cost = g_cost + self.heuristic.calculate(&state);
        self.open_set.push(Reverse(Node {
            state,
            f_cost,
            g_cost,
            seq: self.next_seq,
        }));
        self.next_seq += 1;
    }

    /// Gets the next state to explore from the open set.
    fn next_node(&mut self) -> Option<PlanningState> {
        // Keep popping until we find a node that's neither closed nor superseded
        while let Some(Reverse(node)) = self.open_set.pop() {
            let key = node.state.key();
            if self.closed_set.contains(&key) {
                continue;
            }
            if self.best_g.get(&key).is_some_and(|best| *best < node.g_cost) {
                continue;
            }
            return Some(node.state);
        }
        None
    }

    /// Marks a state as expanded (adds to closed set).
    fn mark_visited(&mut self, state: &PlanningState) {
        let key = state.key();
        self.best_g.remove(&key);
        self.closed_set.insert(key);
        self.stats.expanded += 1;
    }

    /// Processes a successor, adding it to the open set if appropriate.
    fn process_successor(&mut self, successor: PlanningState) -> bool {
        self.stats.generated += 1;
        let key = successor.key();

        if self.closed_set.contains(&key) {
            self.stats.skipped_closed += 1;
            return false;
        }

        // Check if we've already found a path to this configuration that is at least as cheap
        if self
            .best_g
            .get(&key)
            .is_some_and(|best| *best <= successor.cost())
        {
            self.stats.skipped_dominated += 1;
            return false;
        }

        self.best_g.insert(key, successor.cost());
        self.push(successor);
        true
    }

    fn budget_exhausted(&self, limits: &SearchLimits, started: Instant) -> bool {
        let out_of_expansions = limits
            .max_expansions
            .is_some_and(|max| self.stats.expanded >= max);
        let out_of_time = limits
            .time_limit
            .is_some_and(|limit| started.elapsed() >= limit);
        out_of_expansions || out_of_time
    }
}

/// A* search algorithm implementation.
pub struct AStarSearch {
    heuristic: Box<dyn HeuristicStrategy>,
    limits: SearchLimits,
}

impl AStarSearch {
    /// Creates a new A* search with the given heuristic and limits.
    pub fn new(heuristic: Box<dyn HeuristicStrategy>, limits: SearchLimits) -> Self {
        Self { heuristic, limits }
    }

    /// Creates a new A* search with the default heuristic.
    pub fn with_limits(limits: SearchLimits) -> Self {
        Self::new(Box::new(DefaultHeuristic), limits)
    }

    pub fn limits(&self) -> &SearchLimits {
        &self.limits
    }
}

impl Default for AStarSearch {
    fn default() -> Self {
        Self::with_limits(SearchLimits::default())
    }
}

impl SearchAlgorithm for AStarSearch {
    fn search(&self, initial: PlanningState) -> Result<SearchOutcome> {
        let started = Instant::now();
        log::debug!(
            "Starting search: {} workers, gold {}/{}, wood {}/{}",
            initial.workers().len(),
            initial.current_gold(),
            initial.goal().gold,
            initial.current_wood(),
            initial.goal().wood
        );

        let mut context = SearchContext::new(initial, self.heuristic.as_ref());

        // Main search loop
        while let Some(state) = context.next_node() {
            // Check if we've reached the goal
            if state.is_goal() {
                log::info!(
                    "Plan found: {} actions, cost {} ({} expanded, {} generated)",
                    state.plan().len(),
                    state.cost(),
                    context.stats.expanded,
                    context.stats.generated
                );
                return Ok(SearchOutcome {
                    state,
                    stats: context.stats,
                });
            }

            if context.budget_exhausted(&self.limits, started) {
                log::warn!(
                    "Search budget exhausted after {} expansions in {:?}",
                    context.stats.expanded,
                    started.elapsed()
                );
                return Err(PlanError::BudgetExhausted {
                    expansions: context.stats.expanded,
                });
            }

            // Mark as visited
            context.mark_visited(&state);
            log::trace!(
                "Expanding g={} h={} gold={} wood={} depth={}",
                state.cost(),
                state.heuristic(),
                state.current_gold(),
                state.current_wood(),
                state.plan().len()
            );

            for successor in state.generate_successors() {
                context.process_successor(successor);
            }

            if context.stats.expanded % 10_000 == 0 {
                log::debug!(
                    "{} states expanded, {} in frontier",
                    context.stats.expanded,
                    context.open_set.len()
                );
            }
        }

        log::info!(
            "No plan found after expanding {} states",
            context.stats.expanded
        );
        Err(PlanError::NoPlanFound)
    }
}

/// Dijkstra's algorithm implementation.
#[derive(Default)]
pub struct DijkstraSearch {
    limits: SearchLimits,
}

impl DijkstraSearch {
    pub fn new(limits: SearchLimits) -> Self {
        Self { limits }
    }
}

impl SearchAlgorithm for DijkstraSearch {
    fn search(&self, initial: PlanningState) -> Result<SearchOutcome> {
        // Dijkstra is A* with a zero heuristic
        let astar = AStarSearch::new(Box::new(ZeroHeuristic), self.limits);
        astar.search(initial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Action, Goal, PlanningRules, Position, ResourceKind, ResourceMap, Worker};

    /// One worker next to a small mine, deposit two cells east.
    fn corridor(goal: Goal) -> PlanningState {
        let mut map = ResourceMap::new(5, 3, Position::new(3, 1)).unwrap();
        map.add_resource(ResourceKind::Gold, Position::new(2, 1), 50)
            .unwrap();
        let workers = vec![Worker::new(1, Position::new(1, 1))];
        PlanningState::from_parts(map, workers, 0, 0, PlanningRules::new(goal)).unwrap()
    }

    fn node(f_cost: f64, g_cost: f64, seq: usize) -> Reverse<Node> {
        Reverse(Node {
            state: corridor(Goal::new(50, 0)),
            f_cost,
            g_cost,
            seq,
        })
    }

    #[test]
    fn test_frontier_order() {
        let mut heap = BinaryHeap::new();
        heap.push(node(5.0, 1.0, 0));
        heap.push(node(4.0, 1.0, 1));
        heap.push(node(4.0, 3.0, 2));
        heap.push(node(4.0, 3.0, 3));

        let order: Vec<usize> = std::iter::from_fn(|| heap.pop().map(|Reverse(n)| n.seq)).collect();
        assert_eq!(order, vec![2, 3, 1, 0]);
    }

    /// The corridor start and its harvest successor, plus a copy of that
    /// successor reached at a higher cost.
    fn harvest_pair() -> (PlanningState, PlanningState, PlanningState) {
        let initial = corridor(Goal::new(50, 0));
        let harvested = initial
            .generate_successors()
            .into_iter()
            .find(|s| matches!(s.plan().last(), Some(Action::Harvest { .. })))
            .unwrap();
        let worker = initial.worker(1).unwrap().clone();
        let mut costlier = harvested.clone();
        costlier.record(Action::harvest(&worker, ResourceKind::Gold, Position::new(2, 1)));
        assert_eq!(costlier.key(), harvested.key());
        assert!(costlier.cost() > harvested.cost());
        (initial, harvested, costlier)
    }

    #[test]
    fn test_expanded_state_is_not_reopened() {
        let initial = corridor(Goal::new(50, 0));
        let heuristic = ZeroHeuristic;
        let mut context = SearchContext::new(initial.clone(), &heuristic);

        let state = context.next_node().unwrap();
        assert_eq!(state, initial);
        context.mark_visited(&state);
        assert_eq!(context.stats.expanded, 1);

        assert!(!context.process_successor(initial));
        assert_eq!(context.stats.skipped_closed, 1);
        assert_eq!(context.stats.generated, 1);
        assert!(context.next_node().is_none());
    }

    #[test]
    fn test_costlier_duplicate_is_dominated() {
        let (initial, harvested, costlier) = harvest_pair();
        let heuristic = ZeroHeuristic;
        let mut context = SearchContext::new(initial, &heuristic);

        assert!(context.process_successor(harvested.clone()));
        assert!(!context.process_successor(costlier));
        assert_eq!(context.stats.skipped_dominated, 1);

        // Equal cost is no improvement either
        assert!(!context.process_successor(harvested));
        assert_eq!(context.stats.skipped_dominated, 2);
        assert_eq!(context.open_set.len(), 2);
    }

    #[test]
    fn test_cheaper_duplicate_supersedes_queued_entry() {
        let (initial, harvested, costlier) = harvest_pair();
        let heuristic = ZeroHeuristic;
        let mut context = SearchContext::new(initial, &heuristic);

        assert!(context.process_successor(costlier));
        assert!(context.process_successor(harvested));
        assert_eq!(context.stats.skipped_dominated, 0);
        assert_eq!(context.open_set.len(), 3);

        let popped: Vec<f64> = std::iter::from_fn(|| context.next_node().map(|s| s.cost())).collect();
        assert_eq!(popped, vec![0.0, 1.0]);
        assert!(context.open_set.is_empty());
    }

    #[test]
    fn test_astar_search() {
        let outcome = AStarSearch::default()
            .search(corridor(Goal::new(50, 0)))
            .unwrap();
        let plan = outcome.state.plan();
        assert_eq!(plan.len(), 3);
        assert!(matches!(plan[0], Action::Harvest { .. }));
        assert!(matches!(plan[1], Action::Move { .. }));
        assert!(matches!(plan[2], Action::Deposit { .. }));
        assert_eq!(outcome.state.cost(), 3.0);
        assert_eq!(outcome.state.current_gold(), 50);
        assert_eq!(outcome.stats.expanded, 3);
    }

    #[test]
    fn test_dijkstra_search() {
        let outcome = DijkstraSearch::default()
            .search(corridor(Goal::new(50, 0)))
            .unwrap();
        assert_eq!(outcome.state.plan().len(), 3);
        assert_eq!(outcome.state.cost(), 3.0);
    }

    #[test]
    fn test_goal_already_met() {
        let outcome = AStarSearch::default()
            .search(corridor(Goal::new(0, 0)))
            .unwrap();
        assert!(outcome.state.plan().is_empty());
        assert_eq!(outcome.stats.expanded, 0);
    }

    #[test]
    fn test_unreachable_goal() {
        // The mine only holds 50.
        let err = AStarSearch::default()
            .search(corridor(Goal::new(100, 0)))
            .unwrap_err();
        assert!(matches!(err, PlanError::NoPlanFound));
    }

    #[test]
    fn test_expansion_budget() {
        let limits = SearchLimits {
            max_expansions: Some(1),
            time_limit: None,
        };
        let err = AStarSearch::with_limits(limits)
            .search(corridor(Goal::new(50, 0)))
            .unwrap_err();
        assert!(matches!(err, PlanError::BudgetExhausted { expansions: 1 }));
    }

    #[test]
    fn test_time_budget() {
        let limits = SearchLimits {
            max_expansions: None,
            time_limit: Some(Duration::ZERO),
        };
        let err = AStarSearch::with_limits(limits)
            .search(corridor(Goal::new(50, 0)))
            .unwrap_err();
        assert!(matches!(err, PlanError::BudgetExhausted { expansions: 0 }));
    }

    #[test]
    fn test_limits_from_json() {
        let limits: SearchLimits = serde_json::from_str(r#"{"max_expansions": 500}"#).unwrap();
        assert_eq!(limits.max_expansions, Some(500));
        assert_eq!(limits.time_limit, None);

        let limits: SearchLimits = serde_json::from_str("{}").unwrap();
        assert_eq!(limits, SearchLimits::default());
    }
}

// Weighted maximum matching in general graphs.

// The algorithm is taken from "Efficient Algorithms for Finding Maximum
// Matching in Graphs" by Zvi Galil, ACM Computing Surveys, 1986.
// It is based on the "blossom" method for finding augmenting paths and
// the "primal-dual" method for finding a matching of maximum weight, both
// due to Jack Edmonds.
// Least-slack edges are tracked in concatenable priority queues, following
// "An O(EV log V) algorithm for finding a maximal weighted matching in
// general graphs" by Z. Galil, S. Micali and H. Gabow, SIAM J. Comput., 1986.

//! Compute a maximum-weighted matching in the general undirected weighted
//! graph given by a list of edges.
//!
//! Edges are tuples `(x, y, w)` describing an undirected edge between
//! vertex `x` and vertex `y` with weight `w`. There is at most one edge
//! between any two vertices; no vertex has an edge to itself. Vertices are
//! identified by consecutive, non-negative integers.
//!
//! The solver runs in time O(n * (n + m) * log(n)) for n vertices and m
//! edges.

use log::debug;

pub mod concatenable_queue;
pub mod priority_queue;

mod blossom;
mod context;
mod error;
mod graph;
mod verify;
mod weight;

pub use error::{Error, InputError, MatchingError, Result};
pub use weight::Weight;

use context::MatchingContext;
use graph::GraphInfo;

pub type Vertex   = usize;
pub type Vertices = Vec<Vertex>;
pub type EdgeId   = usize;
pub type Edge<W>  = (Vertex, Vertex, W); // x, y, wt

/// Solver configuration and input.
#[derive(Debug, Clone)]
pub struct Matching<W> {
    edges: Vec<Edge<W>>,
    max_cardinality: bool,
    check_optimum: bool,
}

impl<W: Weight> Matching<W> {
    pub fn new(edges: Vec<Edge<W>>) -> Matching<W> {
        Matching {
            edges,
            max_cardinality: false,
            check_optimum: true,
        }
    }

    /// Only consider maximum-cardinality matchings as solutions. Among
    /// those, return one of maximum weight.
    pub fn max_cardinality(&mut self) -> &mut Self {
        self.max_cardinality = true;
        self
    }

    /// Verify the solution through LP duality. Only integral instances are
    /// checked. Enabled by default.
    pub fn check_optimum(&mut self, check: bool) -> &mut Self {
        self.check_optimum = check;
        self
    }

    /// Run the matching algorithm.
    ///
    /// Returns the matched pairs `(x, y)` in input edge order.
    pub fn solve(&self) -> Result<Vec<(Vertex, Vertex)>> {
        graph::check_input_weights(&self.edges)?;
        graph::check_input_graph(&self.edges)?;

        let adjusted;
        let edges = if self.max_cardinality {
            adjusted = graph::adjust_weights_for_cardinality(&self.edges)?;
            &adjusted
        } else {
            &self.edges
        };

        let edges = graph::remove_negative_weight_edges(edges);
        let num_dropped = self.edges.len() - edges.len();
        if num_dropped > 0 {
            debug!("ignoring {} edges with negative weight", num_dropped);
        }

        if edges.is_empty() {
            return Ok(Vec::new());
        }

        let graph = GraphInfo::new(edges);
        debug!(
            "matching graph with {} vertices and {} edges",
            graph.num_vertex,
            graph.edges.len()
        );

        let mut ctx = MatchingContext::new(&graph);
        ctx.start();

        // Each stage finds an augmenting path and uses it to improve the
        // matching. There are at most n/2 stages.
        let mut stage = 0;
        while ctx.run_stage() {
            stage += 1;
            debug!("stage {}: {} vertices matched", stage, ctx.num_matched_vertices());
        }
        debug!("no augmenting path after {} stages", stage);

        ctx.cleanup();

        let pairs = graph
            .edges
            .iter()
            .filter(|&&(x, y, _w)| ctx.vertex_mate[x] == Some(y))
            .map(|&(x, y, _w)| (x, y))
            .collect();

        if self.check_optimum && graph.integer_weights {
            verify::verify_optimum(&ctx)?;
            debug!("optimum verified");
        }

        Ok(pairs)
    }
}

/// Compute a maximum-weighted matching.
///
/// Edges with negative weight are ignored. Returns the matched pairs in
/// input edge order.
pub fn maximum_weight_matching<W: Weight>(edges: &[Edge<W>]) -> Result<Vec<(Vertex, Vertex)>> {
    Matching::new(edges.to_vec()).solve()
}

/// Adjust edge weights such that the maximum-weight matching of the adjusted
/// graph is a maximum-cardinality matching of the input graph, with maximum
/// weight among those.
///
/// All weights are increased by the same amount, so the adjusted weights
/// are positive and at least `n` times the input weight range.
pub fn adjust_weights_for_maximum_cardinality_matching<W: Weight>(
    edges: &[Edge<W>],
) -> Result<Vec<Edge<W>>> {
    Ok(graph::adjust_weights_for_cardinality(edges)?)
}

//! Input validation and the immutable graph representation.

use crate::error::InputError;
use crate::weight::Weight;
use crate::{Edge, EdgeId, Vertex};

/// Representation of the input graph.
///
/// These data remain unchanged while the algorithm runs.
#[derive(Debug, Clone)]
pub(crate) struct GraphInfo<W> {
    /// `edges[e] = (x, y, w)` for edge index `e`.
    pub edges: Vec<Edge<W>>,

    /// Vertices are numbered `0 .. num_vertex`.
    pub num_vertex: usize,

    /// `adjacent_edges[x]` lists the indices of all edges incident on `x`.
    pub adjacent_edges: Vec<Vec<EdgeId>>,

    /// True if every weight is integral. Dual arithmetic is then exact
    /// and the final solution can be verified.
    pub integer_weights: bool,
}

impl<W: Weight> GraphInfo<W> {
    /// Build the adjacency lists.
    ///
    /// This function takes time O(n + m).
    pub fn new(edges: Vec<Edge<W>>) -> Self {
        let num_vertex = count_vertices(&edges);

        let mut adjacent_edges = vec![Vec::new(); num_vertex];
        for (e, &(x, y, _w)) in edges.iter().enumerate() {
            adjacent_edges[x].push(e);
            adjacent_edges[y].push(e);
        }

        let integer_weights = edges.iter().all(|&(_x, _y, w)| w.is_integral());

        GraphInfo {
            edges,
            num_vertex,
            adjacent_edges,
            integer_weights,
        }
    }

    /// Largest edge weight, or zero for an empty graph.
    pub fn max_weight(&self) -> W {
        self.edges
            .iter()
            .map(|&(_x, _y, w)| w)
            .fold(W::zero(), |acc, w| if w > acc { w } else { acc })
    }

    /// Return the vertex at the other end of edge `e`.
    #[inline]
    pub fn other_vertex(&self, e: EdgeId, x: Vertex) -> Vertex {
        let (p, q, _w) = self.edges[e];
        if p != x {
            p
        } else {
            q
        }
    }
}

/// One more than the largest vertex index, or 0 for an empty edge list.
pub(crate) fn count_vertices<W>(edges: &[Edge<W>]) -> usize {
    edges
        .iter()
        .map(|&(x, y, _)| std::cmp::max(x, y) + 1)
        .max()
        .unwrap_or(0)
}

/// Check that all weights are finite and small enough for the dual
/// variable arithmetic.
///
/// This function takes time O(m).
pub(crate) fn check_input_weights<W: Weight>(edges: &[Edge<W>]) -> Result<(), InputError> {
    let limit = W::limit();
    for &(x, y, w) in edges {
        if !w.is_finite() {
            return Err(InputError::NonFiniteWeight {
                x,
                y,
                weight: w.to_string(),
            });
        }
        if w > limit {
            return Err(out_of_range(x, y, w));
        }
    }
    Ok(())
}

/// Check that the input is a valid graph, without self-edges and
/// without multi-edges.
///
/// This function takes time O(m * log(m)).
pub(crate) fn check_input_graph<W>(edges: &[Edge<W>]) -> Result<(), InputError> {
    if let Some(&(x, _, _)) = edges.iter().find(|&&(x, y, _)| x == y) {
        return Err(InputError::SelfEdge(x));
    }

    // Sorting gives a guaranteed O(m * log(m)) bound.
    let mut endpoints: Vec<(Vertex, Vertex)> = edges
        .iter()
        .map(|&(x, y, _)| if x < y { (x, y) } else { (y, x) })
        .collect();
    endpoints.sort_unstable();

    match endpoints.windows(2).find(|pair| pair[0] == pair[1]) {
        Some(pair) => Err(InputError::DuplicateEdge(pair[0].0, pair[0].1)),
        None => Ok(()),
    }
}

/// Remove edges with negative weight.
///
/// Such edges never improve a matching, so this does not change the
/// solution but keeps the algorithm simple.
pub(crate) fn remove_negative_weight_edges<W: Weight>(edges: &[Edge<W>]) -> Vec<Edge<W>> {
    edges
        .iter()
        .filter(|&&(_x, _y, w)| w >= W::zero())
        .copied()
        .collect()
}

/// Increase all edge weights by an equal amount such that the adjusted
/// weights are positive and the minimum weight is at least `n` times the
/// weight range. Any maximum-weight matching of the adjusted graph then has
/// maximum cardinality, and maximum original weight among those.
///
/// This function takes time O(m).
pub(crate) fn adjust_weights_for_cardinality<W: Weight>(
    edges: &[Edge<W>],
) -> Result<Vec<Edge<W>>, InputError> {
    check_input_weights(edges)?;

    let limit = W::limit();
    let neg_limit = W::zero() - limit;
    if let Some(&(x, y, w)) = edges.iter().find(|&&(_x, _y, w)| w < neg_limit) {
        return Err(out_of_range(x, y, w));
    }

    let (Some(&min_edge), Some(&max_edge)) = (
        edges.iter().min_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal)),
        edges.iter().max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal)),
    ) else {
        return Ok(Vec::new());
    };

    let num_vertex = count_vertices(edges);
    let min_weight = min_edge.2;
    let max_weight = max_edge.2;
    let weight_range = max_weight - min_weight;

    // The largest adjusted weight is (n + 1) * range.
    let num_vertex_w = W::from_usize(num_vertex);
    if weight_range > W::zero() {
        let fits = num_vertex_w.map_or(false, |n| weight_range <= limit / (n + W::one()));
        if !fits {
            return Err(out_of_range(max_edge.0, max_edge.1, max_weight));
        }
    }
    let scaled_range = num_vertex_w.map_or(W::zero(), |n| n * weight_range);

    if min_weight > W::zero() && min_weight >= scaled_range {
        return Ok(edges.to_vec());
    }

    let delta = if weight_range > W::zero() {
        scaled_range - min_weight
    } else {
        // All weights are equal. Make them positive.
        W::one() - min_weight
    };
    debug_assert!(delta >= W::zero());

    Ok(edges.iter().map(|&(x, y, w)| (x, y, w + delta)).collect())
}

fn out_of_range<W: Weight>(x: Vertex, y: Vertex, w: W) -> InputError {
    InputError::WeightOutOfRange {
        x,
        y,
        weight: w.to_string(),
        limit: W::limit().to_string(),
    }
}

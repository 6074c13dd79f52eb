//! Error types for the matching solver.

use thiserror::Error;

use crate::Vertex;

/// Result type alias using the crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Any failure reported by the public entry points.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The edge list does not describe a valid graph.
    #[error(transparent)]
    Input(#[from] InputError),

    /// The computed matching failed its optimality check.
    #[error(transparent)]
    Matching(#[from] MatchingError),
}

/// Rejected input. Detected before any algorithm state is built.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("self-edges are not supported (vertex {0})")]
    SelfEdge(Vertex),

    #[error("duplicate edge ({0}, {1})")]
    DuplicateEdge(Vertex, Vertex),

    #[error("edge ({x}, {y}) has non-finite weight {weight}")]
    NonFiniteWeight {
        x: Vertex,
        y: Vertex,
        weight: String,
    },

    #[error("edge ({x}, {y}) has weight {weight}, edge weights must lie within +/- {limit}")]
    WeightOutOfRange {
        x: Vertex,
        y: Vertex,
        weight: String,
        limit: String,
    },
}

/// Verification of the final matching failed.
///
/// This can only happen if there is a bug in the algorithm. Dual values are
/// reported pre-multiplied by 2, the way the solver stores them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchingError {
    #[error("verification failed: asymmetric match of vertex {x} and {y}")]
    AsymmetricMate { x: Vertex, y: Vertex },

    #[error("verification failed: {vertices} matched vertices inconsistent with {edges} matched edges")]
    MatchedCountMismatch { vertices: usize, edges: usize },

    #[error("verification failed: vertex {vertex} has negative dual (2x) {dual_2x}")]
    NegativeVertexDual { vertex: Vertex, dual_2x: String },

    #[error("verification failed: negative blossom dual {dual}")]
    NegativeBlossomDual { dual: String },

    #[error("verification failed: unmatched vertex {vertex} has non-zero dual (2x) {dual_2x}")]
    UnmatchedVertexDual { vertex: Vertex, dual_2x: String },

    #[error("verification failed: blossom non-full dual={dual} nvertex={num_vertex} nmatched={num_matched}")]
    NonFullBlossom {
        dual: String,
        num_vertex: usize,
        num_matched: usize,
    },

    #[error("verification failed: edge ({x}, {y}) has negative slack (2x) {slack_2x}")]
    NegativeEdgeSlack { x: Vertex, y: Vertex, slack_2x: String },

    #[error("verification failed: matched edge ({x}, {y}) has slack (2x) {slack_2x}")]
    MatchedEdgeSlack { x: Vertex, y: Vertex, slack_2x: String },
}

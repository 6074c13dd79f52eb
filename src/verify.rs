//! Optimality check of a finished matching.
//!
//! The solution is optimal if the matching and the dual variables satisfy
//! the complementary slackness conditions. This check uses only the final
//! matching and duals, so it catches bugs in the lazy bookkeeping.

use crate::blossom::BlossomId;
use crate::context::MatchingContext;
use crate::error::MatchingError;
use crate::weight::Weight;

/// Descend through the nested blossoms of top-level blossom `b`.
///
/// Adds 2 times the duals of all containing blossoms to the slack of each
/// edge inside `b`, and checks that every blossom is full: all but one of
/// its vertices are matched to another vertex in the blossom.
fn verify_blossom_edges<W: Weight>(
    ctx: &MatchingContext<'_, W>,
    b: BlossomId,
    edge_slack_2x: &mut [W],
) -> Result<(), MatchingError> {
    let graph = ctx.graph;
    let blossoms = &ctx.blossoms;

    // Depth of the smallest blossom on the current descent path that
    // contains each vertex. Zero for vertices outside the path.
    let mut vertex_depth = vec![0usize; graph.num_vertex];

    // Sum of blossom duals and number of matched edges at each depth.
    let mut path_sum_dual = vec![W::zero()];
    let mut path_num_matched = vec![0usize];

    // Each entry holds a blossom and the position of the next sub-blossom
    // to visit, or `None` on first entry.
    let mut stack: Vec<(BlossomId, Option<usize>)> = vec![(b, None)];

    while let Some(&(blossom, pos)) = stack.last() {
        let depth = stack.len();
        let nt = blossoms.nontrivial(blossom);

        let p = match pos {
            Some(p) => p,
            None => {
                for x in blossoms.vertices(blossom) {
                    vertex_depth[x] = depth;
                }
                let sum = path_sum_dual[path_sum_dual.len() - 1] + nt.dual_var;
                path_sum_dual.push(sum);
                path_num_matched.push(0);
                0
            }
        };

        if p < nt.subblossoms.len() {
            stack[depth - 1].1 = Some(p + 1);

            let sub = nt.subblossoms[p];
            if blossoms.is_nontrivial(sub) {
                stack.push((sub, None));
                continue;
            }

            // Visit each edge once, from the vertex that comes first in it.
            let base = blossoms[sub].base_vertex;
            for &e in &graph.adjacent_edges[base] {
                let (x, y, _w) = graph.edges[e];
                if x != base {
                    continue;
                }
                let edge_depth = vertex_depth[y];
                if edge_depth > 0 {
                    edge_slack_2x[e] += W::two() * path_sum_dual[edge_depth];
                    if ctx.vertex_mate[x] == Some(y) {
                        path_num_matched[edge_depth] += 1;
                    }
                }
            }
        } else {
            let vertices = blossoms.vertices(blossom);
            let num_matched = path_num_matched[depth];
            if vertices.len() != 2 * num_matched + 1 {
                return Err(MatchingError::NonFullBlossom {
                    dual: nt.dual_var.to_string(),
                    num_vertex: vertices.len(),
                    num_matched,
                });
            }

            path_num_matched[depth - 1] += num_matched;
            for x in vertices {
                vertex_depth[x] = depth - 1;
            }

            path_sum_dual.pop();
            path_num_matched.pop();
            stack.pop();
        }
    }

    Ok(())
}

/// Verify that the optimum solution has been found.
///
/// Only meaningful with exact arithmetic, so callers skip it unless all
/// weights are integral.
///
/// This function takes time O(n**2).
pub(crate) fn verify_optimum<W: Weight>(ctx: &MatchingContext<'_, W>) -> Result<(), MatchingError> {
    let graph = ctx.graph;

    let mut num_matched_vertex = 0;
    for (x, &mate) in ctx.vertex_mate.iter().enumerate() {
        if let Some(y) = mate {
            if ctx.vertex_mate[y] != Some(x) {
                return Err(MatchingError::AsymmetricMate { x, y });
            }
            num_matched_vertex += 1;
        }
    }

    let num_matched_edge = graph
        .edges
        .iter()
        .filter(|&&(x, y, _w)| ctx.vertex_mate[x] == Some(y))
        .count();

    if num_matched_vertex != 2 * num_matched_edge {
        return Err(MatchingError::MatchedCountMismatch {
            vertices: num_matched_vertex,
            edges: num_matched_edge,
        });
    }

    // Duals must be non-negative.
    for (x, &dual) in ctx.vertex_dual_2x.iter().enumerate() {
        if dual < W::zero() {
            return Err(MatchingError::NegativeVertexDual {
                vertex: x,
                dual_2x: dual.to_string(),
            });
        }
    }

    for b in ctx.blossoms.nontrivial_ids() {
        let dual = ctx.blossoms.nontrivial(b).dual_var;
        if dual < W::zero() {
            return Err(MatchingError::NegativeBlossomDual {
                dual: dual.to_string(),
            });
        }
    }

    for (x, &dual) in ctx.vertex_dual_2x.iter().enumerate() {
        if ctx.vertex_mate[x].is_none() && !dual.is_zero() {
            return Err(MatchingError::UnmatchedVertexDual {
                vertex: x,
                dual_2x: dual.to_string(),
            });
        }
    }

    let mut edge_slack_2x: Vec<W> = graph
        .edges
        .iter()
        .map(|&(x, y, w)| ctx.vertex_dual_2x[x] + ctx.vertex_dual_2x[y] - W::two() * w)
        .collect();

    // Edges inside blossoms also pay for the blossom duals.
    let top_level: Vec<BlossomId> = ctx
        .blossoms
        .nontrivial_ids()
        .filter(|&b| ctx.blossoms[b].parent.is_none())
        .collect();
    for b in top_level {
        verify_blossom_edges(ctx, b, &mut edge_slack_2x)?;
    }

    for (e, &slack) in edge_slack_2x.iter().enumerate() {
        if slack < W::zero() {
            let (x, y, _w) = graph.edges[e];
            return Err(MatchingError::NegativeEdgeSlack {
                x,
                y,
                slack_2x: slack.to_string(),
            });
        }
    }

    for (e, &slack) in edge_slack_2x.iter().enumerate() {
        let (x, y, _w) = graph.edges[e];
        if ctx.vertex_mate[x] == Some(y) && !slack.is_zero() {
            return Err(MatchingError::MatchedEdgeSlack {
                x,
                y,
                slack_2x: slack.to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphInfo;

    fn solved(graph: &GraphInfo<i64>) -> MatchingContext<'_, i64> {
        let mut ctx = MatchingContext::new(graph);
        ctx.start();
        while ctx.run_stage() {}
        ctx.cleanup();
        ctx
    }

    #[test]
    fn accepts_optimum() {
        let graph = GraphInfo::new(vec![(0, 1, 1), (1, 2, 1), (2, 3, 1), (3, 4, 1), (4, 0, 1)]);
        let ctx = solved(&graph);
        assert_eq!(verify_optimum(&ctx), Ok(()));

        let graph = GraphInfo::new(vec![(1, 2, 40), (1, 3, 30), (2, 3, 60), (2, 4, 55), (3, 5, 55), (4, 5, 50)]);
        let ctx = solved(&graph);
        assert_eq!(verify_optimum(&ctx), Ok(()));
    }

    #[test]
    fn rejects_asymmetric_mate() {
        let graph = GraphInfo::new(vec![(0, 1, 5), (1, 2, 4)]);
        let mut ctx = solved(&graph);
        ctx.vertex_mate[2] = Some(1);
        assert_eq!(
            verify_optimum(&ctx),
            Err(MatchingError::AsymmetricMate { x: 2, y: 1 })
        );
    }

    #[test]
    fn rejects_suboptimal_matching() {
        let graph = GraphInfo::new(vec![(0, 1, 5), (1, 2, 8), (2, 3, 5)]);
        let mut ctx = solved(&graph);
        assert_eq!(verify_optimum(&ctx), Ok(()));

        // Swap in the single middle edge.
        ctx.vertex_mate = vec![None, Some(2), Some(1), None];
        assert!(verify_optimum(&ctx).is_err());
    }

    #[test]
    fn rejects_negative_dual() {
        let graph = GraphInfo::new(vec![(0, 1, 5), (1, 2, 4), (2, 3, 5)]);
        let mut ctx = solved(&graph);
        ctx.vertex_dual_2x[3] = -2;
        assert!(matches!(
            verify_optimum(&ctx),
            Err(MatchingError::NegativeVertexDual { vertex: 3, .. })
        ));
    }

    #[test]
    fn rejects_matched_pair_without_edge() {
        let graph = GraphInfo::new(vec![(0, 1, 5), (1, 2, 8), (2, 3, 5)]);
        let mut ctx = solved(&graph);
        ctx.vertex_mate = vec![Some(2), Some(3), Some(0), Some(1)];
        assert_eq!(
            verify_optimum(&ctx),
            Err(MatchingError::MatchedCountMismatch { vertices: 4, edges: 0 })
        );
    }

    /// Triangle: vertices 0 and 1 end up matched inside a blossom based at
    /// the unmatched vertex 2.
    fn solved_triangle(graph: &GraphInfo<i64>) -> MatchingContext<'_, i64> {
        let ctx = solved(graph);
        assert_eq!(ctx.blossoms.nontrivial_ids().count(), 1);
        assert_eq!(ctx.vertex_mate, vec![Some(1), Some(0), None]);
        assert_eq!(verify_optimum(&ctx), Ok(()));
        ctx
    }

    fn triangle() -> GraphInfo<i64> {
        GraphInfo::new(vec![(0, 1, 2), (1, 2, 2), (0, 2, 2)])
    }

    #[test]
    fn rejects_negative_blossom_dual() {
        let graph = triangle();
        let mut ctx = solved_triangle(&graph);
        let b = ctx.blossoms.nontrivial_ids().next().expect("no blossom");
        ctx.blossoms.nontrivial_mut(b).dual_var = -2;
        assert!(matches!(
            verify_optimum(&ctx),
            Err(MatchingError::NegativeBlossomDual { .. })
        ));
    }

    #[test]
    fn rejects_unmatched_vertex_with_dual() {
        let graph = triangle();
        let mut ctx = solved_triangle(&graph);
        ctx.vertex_dual_2x[2] = 4;
        assert!(matches!(
            verify_optimum(&ctx),
            Err(MatchingError::UnmatchedVertexDual { vertex: 2, .. })
        ));
    }

    #[test]
    fn rejects_non_full_blossom() {
        let graph = triangle();
        let mut ctx = solved_triangle(&graph);
        ctx.vertex_mate = vec![None, None, None];
        assert!(matches!(
            verify_optimum(&ctx),
            Err(MatchingError::NonFullBlossom { num_vertex: 3, num_matched: 0, .. })
        ));
    }

    #[test]
    fn rejects_negative_edge_slack() {
        let graph = GraphInfo::new(vec![(0, 1, 5)]);
        let mut ctx = solved(&graph);
        assert_eq!(ctx.vertex_mate, vec![Some(1), Some(0)]);
        ctx.vertex_dual_2x = vec![4, 5];
        assert!(matches!(
            verify_optimum(&ctx),
            Err(MatchingError::NegativeEdgeSlack { x: 0, y: 1, .. })
        ));
    }

    #[test]
    fn rejects_loose_matched_edge() {
        let graph = GraphInfo::new(vec![(0, 1, 5)]);
        let mut ctx = solved(&graph);
        ctx.vertex_dual_2x = vec![7, 5];
        assert_eq!(
            verify_optimum(&ctx),
            Err(MatchingError::MatchedEdgeSlack {
                x: 0,
                y: 1,
                slack_2x: String::from("2"),
            })
        );
    }
}

//! Blossoms and the arena that owns them.
//!
//! A blossom is an odd-length alternating cycle over sub-blossoms. A single
//! vertex by itself is a trivial blossom. Blossom `x` for `x < num_vertex`
//! is the trivial blossom of vertex `x`; non-trivial blossoms are created
//! and destroyed while the algorithm runs and take the ids above that.

use std::ops::{Index, IndexMut};

use crate::concatenable_queue::QueueId;
use crate::priority_queue::NodeHandle;
use crate::weight::Weight;
use crate::Vertex;

pub(crate) type BlossomId = usize;

/// Alternating trees are named after the vertex at their root.
pub(crate) type TreeId = Vertex;

/// Label of a top-level blossom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Label {
    Free,
    /// Outer blossom.
    S,
    /// Inner blossom.
    T,
}

#[derive(Debug, Clone)]
pub(crate) struct Blossom<W> {
    /// Blossom that contains this one as a sub-blossom, or `None` for a
    /// top-level blossom.
    pub parent: Option<BlossomId>,

    /// The unique vertex in this blossom that is not matched to another
    /// vertex in the same blossom.
    pub base_vertex: Vertex,

    pub label: Label,

    /// `Some((x, y))` if this labeled top-level blossom is attached to its
    /// alternating tree through edge `(x, y)`, with `y` inside the blossom.
    /// `None` for the root of a tree.
    pub tree_edge: Option<(Vertex, Vertex)>,

    /// Alternating tree that contains this labeled top-level blossom.
    pub tree: Option<TreeId>,

    /// Concatenable queue holding all vertices of this blossom.
    pub vertex_queue: QueueId,

    /// Node in the delta2 queue for an unlabeled top-level blossom with an
    /// edge to an S-vertex.
    pub delta2_node: Option<NodeHandle>,

    /// Pending lazy update to the dual variables of the vertices inside.
    pub vertex_dual_offset: W,

    /// Scratch flag for `trace_alternating_paths`.
    pub marker: bool,

    pub nontrivial: Option<NonTrivialBlossom<W>>,
}

/// Extra state of a blossom with at least 3 sub-blossoms.
#[derive(Debug, Clone)]
pub(crate) struct NonTrivialBlossom<W> {
    /// Sub-blossoms in cycle order. `subblossoms[0]` holds the base vertex.
    pub subblossoms: Vec<BlossomId>,

    /// `edges[i] = (x, y)` links vertex `x` in `subblossoms[i]` to vertex
    /// `y` in the next sub-blossom around the cycle.
    pub edges: Vec<(Vertex, Vertex)>,

    /// Modified dual variable, invariant under delta steps.
    ///
    /// The true dual of a top-level S-blossom is `dual_var + delta_sum_2x`,
    /// of a top-level T-blossom `dual_var - delta_sum_2x`, and of any other
    /// blossom simply `dual_var`.
    pub dual_var: W,

    /// Node in the delta4 queue while this is a top-level T-blossom.
    pub delta4_node: Option<NodeHandle>,
}

impl<W: Weight> Blossom<W> {
    pub fn trivial(base_vertex: Vertex, vertex_queue: QueueId) -> Self {
        Blossom {
            parent: None,
            base_vertex,
            label: Label::Free,
            tree_edge: None,
            tree: None,
            vertex_queue,
            delta2_node: None,
            vertex_dual_offset: W::zero(),
            marker: false,
            nontrivial: None,
        }
    }

    #[inline]
    pub fn is_nontrivial(&self) -> bool {
        self.nontrivial.is_some()
    }
}

impl<W> NonTrivialBlossom<W> {
    /// Position of a direct sub-blossom in the cycle.
    pub fn position(&self, sub: BlossomId) -> usize {
        self.subblossoms
            .iter()
            .position(|&b| b == sub)
            .expect("not a sub-blossom")
    }

    /// Construct a path with an even number of edges through this blossom,
    /// from sub-blossom `sub` to the base.
    ///
    /// Returns `(nodes, edges)` where `edges[i]` links `nodes[i]` to
    /// `nodes[i + 1]`.
    pub fn path_to_base(&self, sub: BlossomId) -> (Vec<BlossomId>, Vec<(Vertex, Vertex)>) {
        let p = self.position(sub);
        let (nodes, edges): (Vec<BlossomId>, Vec<(Vertex, Vertex)>) = if p % 2 == 0 {
            // Walk backwards, flipping the edges.
            (
                self.subblossoms[..=p].iter().rev().copied().collect(),
                self.edges[..p].iter().rev().map(|&(x, y)| (y, x)).collect(),
            )
        } else {
            // Walk forward around the cycle.
            (
                self.subblossoms[p..]
                    .iter()
                    .chain(&self.subblossoms[..1])
                    .copied()
                    .collect(),
                self.edges[p..].to_vec(),
            )
        };
        debug_assert_eq!(edges.len() % 2, 0);
        debug_assert_eq!(nodes.len(), edges.len() + 1);
        (nodes, edges)
    }
}

/// Owner of all blossoms.
#[derive(Debug, Clone)]
pub(crate) struct BlossomArena<W> {
    slots: Vec<Blossom<W>>,
    unused: Vec<BlossomId>,
    num_vertex: usize,
}

impl<W: Weight> BlossomArena<W> {
    /// Create the trivial blossoms of all vertices.
    pub fn new(num_vertex: usize, mut vertex_queue: impl FnMut(Vertex) -> QueueId) -> Self {
        BlossomArena {
            slots: (0..num_vertex)
                .map(|x| Blossom::trivial(x, vertex_queue(x)))
                .collect(),
            unused: Vec::new(),
            num_vertex,
        }
    }

    /// Store a new non-trivial blossom. `make` receives the id of its slot.
    pub fn alloc(&mut self, make: impl FnOnce(BlossomId) -> Blossom<W>) -> BlossomId {
        match self.unused.pop() {
            Some(b) => {
                self.slots[b] = make(b);
                b
            }
            None => {
                let b = self.slots.len();
                self.slots.push(make(b));
                b
            }
        }
    }

    /// Release a non-trivial blossom and hand back its cycle.
    pub fn free(&mut self, b: BlossomId) -> NonTrivialBlossom<W> {
        debug_assert!(b >= self.num_vertex);
        let slot = &mut self.slots[b];
        let nontrivial = slot.nontrivial.take().expect("freeing a trivial blossom");
        slot.parent = None;
        slot.label = Label::Free;
        slot.tree_edge = None;
        slot.tree = None;
        slot.delta2_node = None;
        slot.vertex_dual_offset = W::zero();
        slot.marker = false;
        self.unused.push(b);
        nontrivial
    }

    #[inline]
    pub fn is_nontrivial(&self, b: BlossomId) -> bool {
        self.slots[b].is_nontrivial()
    }

    pub fn nontrivial(&self, b: BlossomId) -> &NonTrivialBlossom<W> {
        self.slots[b].nontrivial.as_ref().expect("trivial blossom")
    }

    pub fn nontrivial_mut(&mut self, b: BlossomId) -> &mut NonTrivialBlossom<W> {
        self.slots[b].nontrivial.as_mut().expect("trivial blossom")
    }

    /// Ids of all live non-trivial blossoms.
    pub fn nontrivial_ids(&self) -> impl Iterator<Item = BlossomId> + '_ {
        (self.num_vertex..self.slots.len()).filter(move |&b| self.slots[b].is_nontrivial())
    }

    /// Ids of all trivial and live non-trivial blossoms.
    pub fn ids(&self) -> impl Iterator<Item = BlossomId> + '_ {
        (0..self.num_vertex).chain(self.nontrivial_ids())
    }

    /// Return the vertices contained in the blossom.
    pub fn vertices(&self, b: BlossomId) -> Vec<Vertex> {
        if !self.is_nontrivial(b) {
            return vec![self.slots[b].base_vertex];
        }

        let mut stack = vec![b];
        let mut vertices = Vec::new();
        while let Some(b) = stack.pop() {
            for &sub in &self.nontrivial(b).subblossoms {
                if self.is_nontrivial(sub) {
                    stack.push(sub);
                } else {
                    vertices.push(self.slots[sub].base_vertex);
                }
            }
        }
        vertices
    }
}

impl<W> Index<BlossomId> for BlossomArena<W> {
    type Output = Blossom<W>;

    #[inline]
    fn index(&self, b: BlossomId) -> &Blossom<W> {
        &self.slots[b]
    }
}

impl<W> IndexMut<BlossomId> for BlossomArena<W> {
    #[inline]
    fn index_mut(&mut self, b: BlossomId) -> &mut Blossom<W> {
        &mut self.slots[b]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested_arena() -> (BlossomArena<i64>, BlossomId, BlossomId) {
        // Vertices 0..5. Inner blossom (1, 2, 3), outer blossom (0, inner, 4).
        let mut arena = BlossomArena::new(5, |x| x);
        let inner = arena.alloc(|b| Blossom {
            base_vertex: 1,
            nontrivial: Some(NonTrivialBlossom {
                subblossoms: vec![1, 2, 3],
                edges: vec![(1, 2), (2, 3), (3, 1)],
                dual_var: 0,
                delta4_node: None,
            }),
            ..Blossom::trivial(1, b)
        });
        let outer = arena.alloc(|b| Blossom {
            base_vertex: 0,
            nontrivial: Some(NonTrivialBlossom {
                subblossoms: vec![0, inner, 4],
                edges: vec![(0, 1), (3, 4), (4, 0)],
                dual_var: 0,
                delta4_node: None,
            }),
            ..Blossom::trivial(0, b)
        });
        for sub in [1, 2, 3] {
            arena[sub].parent = Some(inner);
        }
        for sub in [0, inner, 4] {
            arena[sub].parent = Some(outer);
        }
        (arena, inner, outer)
    }

    #[test]
    fn vertices() {
        let (arena, inner, outer) = nested_arena();
        assert_eq!(arena.vertices(2), vec![2]);
        assert_eq!(arena.vertices(inner), vec![1, 2, 3]);
        let mut all = arena.vertices(outer);
        all.sort_unstable();
        assert_eq!(all, vec![0, 1, 2, 3, 4]);
        assert_eq!(arena.nontrivial_ids().collect::<Vec<_>>(), vec![inner, outer]);
    }

    #[test]
    fn path_to_base() {
        let nt = NonTrivialBlossom::<i64> {
            subblossoms: vec![10, 11, 12, 13, 14],
            edges: vec![(0, 1), (1, 2), (2, 3), (3, 4), (4, 0)],
            dual_var: 0,
            delta4_node: None,
        };

        // Even position: walk backwards.
        let (nodes, edges) = nt.path_to_base(12);
        assert_eq!(nodes, vec![12, 11, 10]);
        assert_eq!(edges, vec![(2, 1), (1, 0)]);

        // Odd position: walk forward.
        let (nodes, edges) = nt.path_to_base(13);
        assert_eq!(nodes, vec![13, 14, 10]);
        assert_eq!(edges, vec![(3, 4), (4, 0)]);

        let (nodes, edges) = nt.path_to_base(10);
        assert_eq!(nodes, vec![10]);
        assert!(edges.is_empty());
    }

    #[test]
    fn ids_are_recycled() {
        let (mut arena, inner, outer) = nested_arena();
        let nt = arena.free(outer);
        assert_eq!(nt.subblossoms, vec![0, inner, 4]);
        assert!(!arena.is_nontrivial(outer));
        assert_eq!(arena.ids().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4, inner]);

        let again = arena.alloc(|b| Blossom {
            nontrivial: Some(NonTrivialBlossom {
                subblossoms: vec![0, inner, 4],
                edges: vec![(0, 1), (3, 4), (4, 0)],
                dual_var: 0,
                delta4_node: None,
            }),
            ..Blossom::trivial(0, b)
        });
        assert_eq!(again, outer);
    }
}

//! State and operations of the primal-dual matching algorithm.
//!
//! The algorithm is taken from "Efficient Algorithms for Finding Maximum
//! Matching in Graphs" by Zvi Galil, ACM Computing Surveys, 1986. It is
//! based on the "blossom" method for finding augmenting paths and the
//! "primal-dual" method for finding a matching of maximum weight, both due
//! to Jack Edmonds. Least-slack edges are tracked with concatenable priority
//! queues as proposed by Galil, Micali and Gabow, which gives a run time of
//! O(n * (n + m) * log(n)).
//!
//! All dual variables are stored multiplied by 2, so they stay integral if
//! all edge weights are integers. Delta steps are applied lazily through a
//! running sum `delta_sum_2x`; see the field docs for how true dual values
//! are reconstructed.

use std::collections::BTreeSet;
use std::mem;

use log::trace;

use crate::blossom::{Blossom, BlossomArena, BlossomId, Label, NonTrivialBlossom, TreeId};
use crate::concatenable_queue::{ConcatenableQueues, NodeId};
use crate::graph::GraphInfo;
use crate::priority_queue::{NodeHandle, PriorityQueue};
use crate::weight::Weight;
use crate::{EdgeId, Vertex};

/// List of edges forming an alternating path or an alternating cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AlternatingPath {
    pub edges: Vec<(Vertex, Vertex)>,
    pub is_cycle: bool,
}

/// Outcome of a dual delta step calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeltaStep {
    /// Some unmatched vertex reaches dual 0. The matching is optimal.
    Delta1,
    /// An edge between an S-vertex and an unlabeled vertex becomes tight.
    Delta2(EdgeId),
    /// An edge between S-vertices in different blossoms becomes tight.
    Delta3(EdgeId),
    /// A top-level T-blossom reaches dual 0.
    Delta4(BlossomId),
}

/// All data used by the matching algorithm: a partial solution plus the
/// auxiliary structures that find the next delta step quickly.
pub(crate) struct MatchingContext<'a, W: Weight> {
    pub graph: &'a GraphInfo<W>,

    /// `vertex_mate[x] == Some(y)` if vertex `x` is matched to `y`.
    pub vertex_mate: Vec<Option<Vertex>>,

    pub blossoms: BlossomArena<W>,

    /// One concatenable queue per top-level blossom, holding its vertices.
    /// The priority of a vertex is 2 times the pseudo-slack of its
    /// least-slack edge to an S-vertex.
    vertex_queues: ConcatenableQueues<BlossomId, Vertex, W>,

    /// Leaf of vertex `x` in the queue of its top-level blossom.
    vertex_queue_node: Vec<NodeId>,

    /// Initial vertex dual, times 2. Equal to the maximum edge weight.
    start_vertex_dual_2x: W,

    /// 2 times the modified vertex dual, invariant under delta steps.
    ///
    /// The true dual of an S-vertex is `(vertex_dual_2x[x] - delta_sum_2x) / 2`,
    /// of a T-vertex `(vertex_dual_2x[x] + delta_sum_2x + B(x).vertex_dual_offset) / 2`,
    /// and of an unlabeled vertex `(vertex_dual_2x[x] + B(x).vertex_dual_offset) / 2`.
    pub vertex_dual_2x: Vec<W>,

    /// Running sum of applied delta steps, times 2.
    delta_sum_2x: W,

    /// Unlabeled top-level blossoms with an edge to an S-blossom, keyed by
    /// 2 times the least slack plus 2 times the running delta sum.
    delta2_queue: PriorityQueue<W, BlossomId>,

    /// Edges between S-vertices in different top-level blossoms, keyed by
    /// the slack plus 2 times the running delta sum.
    delta3_queue: PriorityQueue<W, EdgeId>,
    delta3_node: Vec<Option<NodeHandle>>,

    /// Top-level non-trivial T-blossoms, keyed by their modified dual.
    delta4_queue: PriorityQueue<W, BlossomId>,

    /// For each T-vertex or unlabeled vertex, its edges to S-vertices keyed
    /// by 2 times the pseudo-slack.
    vertex_sedge_queue: Vec<PriorityQueue<W, EdgeId>>,
    vertex_sedge_node: Vec<Option<NodeHandle>>,

    /// Top-level blossoms of each alternating tree.
    trees: Vec<BTreeSet<BlossomId>>,

    /// S-vertices whose edges have not been scanned yet.
    scan_queue: Vec<Vertex>,
}

impl<'a, W: Weight> MatchingContext<'a, W> {
    /// Set up the initial state: all vertices unmatched, each in its own
    /// trivial blossom.
    pub fn new(graph: &'a GraphInfo<W>) -> Self {
        let num_vertex = graph.num_vertex;
        let num_edge = graph.edges.len();

        let mut vertex_queues = ConcatenableQueues::new();
        let mut vertex_queue_node = Vec::with_capacity(num_vertex);
        let blossoms = BlossomArena::new(num_vertex, |x| {
            let q = vertex_queues.add_queue(x);
            vertex_queue_node.push(vertex_queues.insert(q, x, W::infinity()));
            q
        });

        let start_vertex_dual_2x = graph.max_weight();

        MatchingContext {
            graph,
            vertex_mate: vec![None; num_vertex],
            blossoms,
            vertex_queues,
            vertex_queue_node,
            start_vertex_dual_2x,
            vertex_dual_2x: vec![start_vertex_dual_2x; num_vertex],
            delta_sum_2x: W::zero(),
            delta2_queue: PriorityQueue::new(),
            delta3_queue: PriorityQueue::new(),
            delta3_node: vec![None; num_edge],
            delta4_queue: PriorityQueue::new(),
            vertex_sedge_queue: (0..num_vertex).map(|_| PriorityQueue::new()).collect(),
            vertex_sedge_node: vec![None; num_edge],
            trees: vec![BTreeSet::new(); num_vertex],
            scan_queue: Vec::new(),
        }
    }

    /// Find the top-level blossom that contains vertex `x`.
    ///
    /// This function takes time O(log(n)).
    #[inline]
    pub fn top_level_blossom(&self, x: Vertex) -> BlossomId {
        self.vertex_queues.find(self.vertex_queue_node[x])
    }

    pub fn num_matched_vertices(&self) -> usize {
        self.vertex_mate.iter().filter(|m| m.is_some()).count()
    }

    //
    // Least-slack edge tracking.
    //

    /// Return 2 times the pseudo-slack of edge `e`.
    ///
    /// The pseudo-slack is invariant under delta steps. The true slack of
    /// an edge between S-vertices in different top-level blossoms is
    /// `pseudo_slack_2x / 2 - delta_sum_2x`. The true slack of an edge
    /// between an S-vertex and an unlabeled vertex `y` is
    /// `(pseudo_slack_2x - delta_sum_2x + B(y).vertex_dual_offset) / 2`.
    fn edge_pseudo_slack_2x(&self, e: EdgeId) -> W {
        let (x, y, w) = self.graph.edges[e];
        self.vertex_dual_2x[x] + self.vertex_dual_2x[y] - W::two() * w
    }

    /// Add edge `e` between an S-vertex and the non-S vertex `y` (inside
    /// top-level blossom `by`) to delta2 tracking.
    ///
    /// This function takes time O(log(n)).
    fn delta2_add_edge(&mut self, e: EdgeId, y: Vertex, by: BlossomId) {
        let prio = self.edge_pseudo_slack_2x(e);

        let sedge_queue = &mut self.vertex_sedge_queue[y];
        let improved = sedge_queue.min_prio().map_or(true, |p| p > prio);

        debug_assert!(self.vertex_sedge_node[e].is_none());
        self.vertex_sedge_node[e] = Some(sedge_queue.insert(prio, e));

        if !improved {
            return;
        }

        // The new edge is the least-slack S-edge of "y".
        self.vertex_queues.set_prio(self.vertex_queue_node[y], prio);

        let blossom = &mut self.blossoms[by];
        if blossom.label == Label::Free {
            let prio = prio + blossom.vertex_dual_offset;
            match blossom.delta2_node {
                None => blossom.delta2_node = Some(self.delta2_queue.insert(prio, by)),
                Some(node) => {
                    if prio < self.delta2_queue.prio(node) {
                        self.delta2_queue.decrease_prio(node, prio);
                    }
                }
            }
        }
    }

    /// Remove edge `e` from delta2 tracking. Called when the S-vertex at
    /// the other end of the edge loses its label.
    ///
    /// This function takes time O(log(n)).
    fn delta2_remove_edge(&mut self, e: EdgeId, y: Vertex, by: BlossomId) {
        let Some(sedge_node) = self.vertex_sedge_node[e].take() else {
            return;
        };

        let sedge_queue = &mut self.vertex_sedge_queue[y];
        sedge_queue.delete(sedge_node);
        let prio = sedge_queue.min_prio().unwrap_or_else(W::infinity);

        let leaf = self.vertex_queue_node[y];
        if prio <= self.vertex_queues.prio(leaf) {
            return;
        }
        self.vertex_queues.set_prio(leaf, prio);

        let blossom = &mut self.blossoms[by];
        if blossom.label == Label::Free {
            let node = blossom
                .delta2_node
                .expect("unlabeled blossom with S-edge not in delta2 queue");
            let prio = self.vertex_queues.min_prio(blossom.vertex_queue);
            if prio < W::infinity() {
                let prio = prio + blossom.vertex_dual_offset;
                if prio > self.delta2_queue.prio(node) {
                    self.delta2_queue.increase_prio(node, prio);
                }
            } else {
                self.delta2_queue.delete(node);
                blossom.delta2_node = None;
            }
        }
    }

    /// Start delta2 tracking for a blossom that just became an unlabeled
    /// top-level blossom.
    ///
    /// This function takes time O(log(n)).
    fn delta2_enable_blossom(&mut self, b: BlossomId) {
        let blossom = &mut self.blossoms[b];
        debug_assert!(blossom.delta2_node.is_none());
        let prio = self.vertex_queues.min_prio(blossom.vertex_queue);
        if prio < W::infinity() {
            let prio = prio + blossom.vertex_dual_offset;
            blossom.delta2_node = Some(self.delta2_queue.insert(prio, b));
        }
    }

    /// Stop delta2 tracking for a blossom that is no longer an unlabeled
    /// top-level blossom.
    fn delta2_disable_blossom(&mut self, b: BlossomId) {
        if let Some(node) = self.blossoms[b].delta2_node.take() {
            self.delta2_queue.delete(node);
        }
    }

    /// Drop all delta2 tracking of vertex `x` when it becomes an S-vertex.
    /// Its blossom must already be disabled.
    ///
    /// This function takes time O(k + log(n)) for a vertex with k edges.
    fn delta2_clear_vertex(&mut self, x: Vertex) {
        self.vertex_sedge_queue[x].clear();
        for &e in &self.graph.adjacent_edges[x] {
            self.vertex_sedge_node[e] = None;
        }
        self.vertex_queues
            .set_prio(self.vertex_queue_node[x], W::infinity());
    }

    /// Find the least-slack edge between any S-vertex and any unlabeled
    /// vertex. Returns the edge and 2 times its slack.
    ///
    /// This function takes time O(log(n)).
    fn delta2_get_min_edge(&self) -> Option<(EdgeId, W)> {
        let node = self.delta2_queue.find_min()?;
        let b = *self.delta2_queue.data(node);
        let slack_2x = self.delta2_queue.prio(node) - self.delta_sum_2x;
        debug_assert!(self.blossoms[b].parent.is_none());
        debug_assert_eq!(self.blossoms[b].label, Label::Free);

        let x = self.vertex_queues.min_elem(self.blossoms[b].vertex_queue);
        let sedge_queue = &self.vertex_sedge_queue[x];
        let sedge = sedge_queue.find_min().expect("vertex without S-edge");
        Some((*sedge_queue.data(sedge), slack_2x))
    }

    /// Add edge `e` between two S-vertices in different top-level blossoms
    /// to delta3 tracking. The edge may already be tracked from its other
    /// end.
    ///
    /// This function takes time O(log(n)).
    fn delta3_add_edge(&mut self, e: EdgeId) {
        if self.delta3_node[e].is_some() {
            return;
        }
        let prio_2x = self.edge_pseudo_slack_2x(e);
        // The slack of an edge between S-vertices is integral for integer weights.
        debug_assert!(!self.graph.integer_weights || (prio_2x % W::two()).is_zero());
        let prio = prio_2x / W::two();
        self.delta3_node[e] = Some(self.delta3_queue.insert(prio, e));
    }

    fn delta3_remove_edge(&mut self, e: EdgeId) {
        if let Some(node) = self.delta3_node[e].take() {
            self.delta3_queue.delete(node);
        }
    }

    /// Find the least-slack edge between S-vertices in different top-level
    /// blossoms. Returns the edge and its slack.
    ///
    /// Edges that became internal to a blossom since they were queued are
    /// discarded on the way.
    ///
    /// This function takes time O((1 + k) * log(n)) for k discarded edges.
    fn delta3_get_min_edge(&mut self) -> Option<(EdgeId, W)> {
        while let Some(node) = self.delta3_queue.find_min() {
            let e = *self.delta3_queue.data(node);
            let (x, y, _w) = self.graph.edges[e];
            let bx = self.top_level_blossom(x);
            let by = self.top_level_blossom(y);
            debug_assert_eq!(self.blossoms[bx].label, Label::S);
            debug_assert_eq!(self.blossoms[by].label, Label::S);
            if bx != by {
                return Some((e, self.delta3_queue.prio(node) - self.delta_sum_2x));
            }

            self.delta3_queue.delete(node);
            self.delta3_node[e] = None;
        }
        None
    }

    //
    // Blossom labels.
    //

    /// Change an unlabeled top-level blossom into an S-blossom.
    ///
    /// For a blossom with j vertices and k incident edges this takes time
    /// O(j * log(n) + k).
    fn assign_blossom_label_s(&mut self, b: BlossomId) {
        debug_assert!(self.blossoms[b].parent.is_none());
        debug_assert_eq!(self.blossoms[b].label, Label::Free);
        self.blossoms[b].label = Label::S;

        self.delta2_disable_blossom(b);

        let blossom = &mut self.blossoms[b];
        if let Some(nt) = blossom.nontrivial.as_mut() {
            nt.dual_var -= self.delta_sum_2x;
        }

        // S-blossoms keep no vertex dual offset. S-vertex duals follow
        // the running delta sum instead.
        let vertex_dual_fixup =
            self.delta_sum_2x + mem::replace(&mut blossom.vertex_dual_offset, W::zero());

        let vertices = self.blossoms.vertices(b);
        for &x in &vertices {
            self.vertex_dual_2x[x] += vertex_dual_fixup;
            self.delta2_clear_vertex(x);
        }

        self.scan_queue.extend(vertices);
    }

    /// Change an unlabeled top-level blossom into a T-blossom.
    ///
    /// This function takes time O(log(n)).
    fn assign_blossom_label_t(&mut self, b: BlossomId) {
        debug_assert!(self.blossoms[b].parent.is_none());
        debug_assert_eq!(self.blossoms[b].label, Label::Free);
        self.blossoms[b].label = Label::T;

        self.delta2_disable_blossom(b);

        let blossom = &mut self.blossoms[b];
        if let Some(nt) = blossom.nontrivial.as_mut() {
            nt.dual_var += self.delta_sum_2x;
            debug_assert!(nt.delta4_node.is_none());
            nt.delta4_node = Some(self.delta4_queue.insert(nt.dual_var, b));
        }

        blossom.vertex_dual_offset -= self.delta_sum_2x;
    }

    /// Change a top-level S-blossom into an unlabeled blossom.
    ///
    /// For a blossom with j vertices and k incident edges this takes time
    /// O((j + k) * log(n)).
    fn remove_blossom_label_s(&mut self, b: BlossomId) {
        debug_assert!(self.blossoms[b].parent.is_none());
        debug_assert_eq!(self.blossoms[b].label, Label::S);
        self.blossoms[b].label = Label::Free;

        if let Some(nt) = self.blossoms[b].nontrivial.as_mut() {
            nt.dual_var += self.delta_sum_2x;
        }
        debug_assert!(self.blossoms[b].vertex_dual_offset.is_zero());

        let graph = self.graph;
        for x in self.blossoms.vertices(b) {
            self.vertex_dual_2x[x] -= self.delta_sum_2x;

            for &e in &graph.adjacent_edges[x] {
                let y = graph.other_vertex(e, x);

                // Vertex "x" is no longer an S-vertex.
                self.delta3_remove_edge(e);

                let by = self.top_level_blossom(y);
                if self.blossoms[by].label == Label::S {
                    // Track the edge for delta2 via "x".
                    self.delta2_add_edge(e, x, b);
                } else {
                    // The edge was tracked for delta2 via "y".
                    self.delta2_remove_edge(e, y, by);
                }
            }
        }
    }

    /// Change a top-level T-blossom into an unlabeled blossom.
    ///
    /// This function takes time O(log(n)).
    fn remove_blossom_label_t(&mut self, b: BlossomId) {
        debug_assert!(self.blossoms[b].parent.is_none());
        debug_assert_eq!(self.blossoms[b].label, Label::T);
        self.blossoms[b].label = Label::Free;

        let blossom = &mut self.blossoms[b];
        if let Some(nt) = blossom.nontrivial.as_mut() {
            let node = nt.delta4_node.take().expect("T-blossom not in delta4 queue");
            self.delta4_queue.delete(node);
            nt.dual_var -= self.delta_sum_2x;
        }

        blossom.vertex_dual_offset += self.delta_sum_2x;

        self.delta2_enable_blossom(b);
    }

    /// Change a top-level S-blossom into an S-sub-blossom.
    fn change_s_blossom_to_subblossom(&mut self, b: BlossomId) {
        let blossom = &mut self.blossoms[b];
        debug_assert!(blossom.parent.is_none());
        debug_assert_eq!(blossom.label, Label::S);
        blossom.label = Label::Free;

        if let Some(nt) = blossom.nontrivial.as_mut() {
            nt.dual_var += self.delta_sum_2x;
        }
    }

    fn reset_blossom_label(&mut self, b: BlossomId) {
        match self.blossoms[b].label {
            Label::S => self.remove_blossom_label_s(b),
            Label::T => self.remove_blossom_label_t(b),
            Label::Free => unreachable!("blossom {} is already unlabeled", b),
        }
    }

    //
    // Alternating trees.
    //

    /// Remove all labels of an alternating tree.
    ///
    /// This function takes time O((n + m) * log(n)).
    fn remove_alternating_tree(&mut self, tree: TreeId) {
        let members = mem::take(&mut self.trees[tree]);
        trace!("remove alternating tree {} ({} blossoms)", tree, members.len());
        for b in members {
            debug_assert_eq!(self.blossoms[b].tree, Some(tree));
            self.reset_blossom_label(b);
            self.blossoms[b].tree_edge = None;
            self.blossoms[b].tree = None;
        }
    }

    /// Trace back through the alternating trees from the tight S-to-S edge
    /// `(x, y)`.
    ///
    /// If both vertices are in the same tree, the result is an alternating
    /// cycle that starts and ends in the same top-level blossom. Otherwise
    /// it is an augmenting path between two unmatched vertices.
    ///
    /// The search alternates between both sides, so discovering a blossom
    /// takes time O(k * log(n)) for k sub-blossoms.
    fn trace_alternating_paths(&mut self, x: Vertex, y: Vertex) -> AlternatingPath {
        let mut marked_blossoms = Vec::new();

        let mut xedges = vec![(x, y)];
        let mut yedges = vec![(y, x)];

        let mut first_common = None;

        let mut x = Some(x);
        let mut y = Some(y);
        while let Some(xv) = x {
            let bx = self.top_level_blossom(xv);
            if self.blossoms[bx].marker {
                first_common = Some(bx);
                break;
            }

            self.blossoms[bx].marker = true;
            marked_blossoms.push(bx);

            x = match self.blossoms[bx].tree_edge {
                Some(edge) => {
                    xedges.push(edge);
                    Some(edge.0)
                }
                None => None,
            };

            // Alternate between both paths.
            if y.is_some() {
                mem::swap(&mut x, &mut y);
                mem::swap(&mut xedges, &mut yedges);
            }
        }

        for b in marked_blossoms {
            self.blossoms[b].marker = false;
        }

        // Trim both paths at the common ancestor.
        if let Some(common) = first_common {
            debug_assert_eq!(self.top_level_blossom(xedges[xedges.len() - 1].0), common);
            while let Some(&(v, _)) = yedges.last() {
                if self.top_level_blossom(v) == common {
                    break;
                }
                yedges.pop();
            }
        }

        // Fuse the two paths, dropping the duplicate edge.
        let edges: Vec<(Vertex, Vertex)> = xedges
            .into_iter()
            .rev()
            .chain(yedges.into_iter().skip(1).map(|(p, q)| (q, p)))
            .collect();
        debug_assert_eq!(edges.len() % 2, 1);

        AlternatingPath {
            edges,
            is_cycle: first_common.is_some(),
        }
    }

    /// Assign label S to the unlabeled blossom that contains `x`, and attach
    /// it to the tree through the matched edge of `x`.
    fn extend_tree_t_to_s(&mut self, x: Vertex) {
        let bx = self.top_level_blossom(x);
        self.assign_blossom_label_s(bx);

        let y = self.vertex_mate[x].expect("vertex reached through T-blossom must be matched");
        let by = self.top_level_blossom(y);
        debug_assert_eq!(self.blossoms[by].label, Label::T);
        let tree = self.blossoms[by].tree.expect("T-blossom outside alternating tree");

        self.blossoms[bx].tree_edge = Some((y, x));
        self.blossoms[bx].tree = Some(tree);
        self.trees[tree].insert(bx);
    }

    /// Assign label T to the unlabeled blossom that contains `y`, attach it
    /// to S-vertex `x` through a tight edge, then label its mate S.
    ///
    /// Zero-dual blossoms are expanded first, so that the label lands on a
    /// blossom that will still exist when its dual must decrease.
    fn extend_tree_s_to_t(&mut self, x: Vertex, y: Vertex) {
        let bx = self.top_level_blossom(x);
        debug_assert_eq!(self.blossoms[bx].label, Label::S);

        let mut by = self.top_level_blossom(y);
        while self.blossoms[by]
            .nontrivial
            .as_ref()
            .map_or(false, |nt| nt.dual_var.is_zero())
        {
            self.expand_unlabeled_blossom(by);
            by = self.top_level_blossom(y);
        }

        self.assign_blossom_label_t(by);
        let tree = self.blossoms[bx].tree.expect("S-blossom outside alternating tree");
        self.blossoms[by].tree_edge = Some((x, y));
        self.blossoms[by].tree = Some(tree);
        self.trees[tree].insert(by);

        let base = self.blossoms[by].base_vertex;
        let z = self.vertex_mate[base].expect("T-blossom with unmatched base");
        self.extend_tree_t_to_s(z);
    }

    /// Handle a tight edge between S-vertices in different top-level
    /// blossoms. Either forms a new blossom (same tree) or augments the
    /// matching (different trees).
    ///
    /// Returns true if the matching was augmented.
    fn add_s_to_s_edge(&mut self, x: Vertex, y: Vertex) -> bool {
        let bx = self.top_level_blossom(x);
        let by = self.top_level_blossom(y);
        debug_assert_eq!(self.blossoms[bx].label, Label::S);
        debug_assert_eq!(self.blossoms[by].label, Label::S);
        debug_assert_ne!(bx, by);

        let path = self.trace_alternating_paths(x, y);

        let xtree = self.blossoms[bx].tree.expect("S-blossom outside alternating tree");
        let ytree = self.blossoms[by].tree.expect("S-blossom outside alternating tree");

        if xtree == ytree {
            debug_assert!(path.is_cycle);
            self.make_blossom(path);
            false
        } else {
            self.remove_alternating_tree(xtree);
            self.remove_alternating_tree(ytree);
            debug_assert!(!path.is_cycle);
            self.augment_matching(&path);
            true
        }
    }

    /// Scan the edges of newly labeled S-vertices and add them to delta2 or
    /// delta3 tracking.
    ///
    /// Tight edges are not used directly. They show up later as zero-delta
    /// steps.
    fn scan_new_s_vertices(&mut self) {
        let graph = self.graph;
        let mut scan_queue = mem::take(&mut self.scan_queue);

        for &x in &scan_queue {
            let bx = self.top_level_blossom(x);
            debug_assert_eq!(self.blossoms[bx].label, Label::S);

            for &e in &graph.adjacent_edges[x] {
                let y = graph.other_vertex(e, x);

                let by = self.top_level_blossom(y);
                if bx == by {
                    continue;
                }

                if self.blossoms[by].label == Label::S {
                    self.delta3_add_edge(e);
                } else {
                    self.delta2_add_edge(e, y, by);
                }
            }
        }

        scan_queue.clear();
        self.scan_queue = scan_queue;
    }

    //
    // Blossoms.
    //

    /// Create a new S-blossom from an alternating cycle. T-sub-blossoms
    /// become S and their vertices are queued for scanning.
    fn make_blossom(&mut self, path: AlternatingPath) {
        debug_assert_eq!(path.edges.len() % 2, 1);
        debug_assert!(path.edges.len() >= 3);

        let subblossoms: Vec<BlossomId> = path
            .edges
            .iter()
            .map(|&(x, _y)| self.top_level_blossom(x))
            .collect();

        // The path starts and ends in the same blossom.
        debug_assert!(path
            .edges
            .iter()
            .enumerate()
            .all(|(i, &(_x, y))| self.top_level_blossom(y) == subblossoms[(i + 1) % subblossoms.len()]));
        debug_assert_eq!(self.blossoms[subblossoms[0]].label, Label::S);

        for &sub in &subblossoms {
            if self.blossoms[sub].label == Label::T {
                self.remove_blossom_label_t(sub);
                self.assign_blossom_label_s(sub);
            }
            self.change_s_blossom_to_subblossom(sub);
        }

        let first = &self.blossoms[subblossoms[0]];
        let base_vertex = first.base_vertex;
        let tree_edge = first.tree_edge;
        let tree = first.tree.expect("S-blossom outside alternating tree");

        let num_sub = subblossoms.len();
        let vertex_queues = &mut self.vertex_queues;
        let dual_var = W::zero() - self.delta_sum_2x;
        let b = self.blossoms.alloc(|b| Blossom {
            base_vertex,
            label: Label::S,
            tree_edge,
            tree: Some(tree),
            nontrivial: Some(NonTrivialBlossom {
                subblossoms: subblossoms.clone(),
                edges: path.edges,
                dual_var,
                delta4_node: None,
            }),
            ..Blossom::trivial(base_vertex, vertex_queues.add_queue(b))
        });
        self.trees[tree].insert(b);

        for &sub in &subblossoms {
            let blossom = &mut self.blossoms[sub];
            blossom.parent = Some(b);
            blossom.tree_edge = None;
            blossom.tree = None;
            self.trees[tree].remove(&sub);
        }

        let sub_queues = subblossoms
            .iter()
            .map(|&sub| self.blossoms[sub].vertex_queue)
            .collect();
        self.vertex_queues
            .merge(self.blossoms[b].vertex_queue, sub_queues);

        trace!("new blossom {} with {} sub-blossoms, base {}", b, num_sub, base_vertex);
    }

    /// Expand an unlabeled top-level blossom. Its sub-blossoms become
    /// unlabeled top-level blossoms. Returns the cycle of the deleted
    /// blossom.
    fn expand_unlabeled_blossom(&mut self, b: BlossomId) -> NonTrivialBlossom<W> {
        debug_assert!(self.blossoms[b].parent.is_none());
        debug_assert_eq!(self.blossoms[b].label, Label::Free);
        trace!("expand blossom {}", b);

        self.delta2_disable_blossom(b);

        let vertex_queue = self.blossoms[b].vertex_queue;
        self.vertex_queues.split(vertex_queue);

        // Push lazy dual updates down to the sub-blossoms.
        let vertex_dual_offset = mem::replace(&mut self.blossoms[b].vertex_dual_offset, W::zero());

        let subblossoms = self.blossoms.nontrivial(b).subblossoms.clone();
        for sub in subblossoms {
            let blossom = &mut self.blossoms[sub];
            debug_assert_eq!(blossom.label, Label::Free);
            debug_assert!(blossom.vertex_dual_offset.is_zero());
            blossom.parent = None;
            blossom.vertex_dual_offset = vertex_dual_offset;
            self.delta2_enable_blossom(sub);
        }

        self.vertex_queues.remove_queue(vertex_queue);
        self.blossoms.free(b)
    }

    /// Expand a T-blossom whose dual reached zero, and rebuild the
    /// alternating tree through its sub-blossoms.
    fn expand_t_blossom(&mut self, b: BlossomId) {
        debug_assert!(self.blossoms[b].parent.is_none());
        debug_assert_eq!(self.blossoms[b].label, Label::T);
        debug_assert!(self.blossoms[b].delta2_node.is_none());

        let tree = self.blossoms[b].tree.expect("T-blossom outside alternating tree");
        let tree_edge = self.blossoms[b]
            .tree_edge
            .expect("T-blossom without tree edge");
        self.trees[tree].remove(&b);

        self.remove_blossom_label_t(b);
        let expanded = self.expand_unlabeled_blossom(b);

        // The sub-blossom that held the tree edge becomes T.
        let (_x, y) = tree_edge;
        let sub = self.top_level_blossom(y);
        self.assign_blossom_label_t(sub);
        self.blossoms[sub].tree_edge = Some(tree_edge);
        self.blossoms[sub].tree = Some(tree);
        self.trees[tree].insert(sub);

        // Walk from "sub" to the base, labeling sub-blossoms S and T in turn.
        //
        //   (p) ==(y,x)== (p+1) ----- (p+2)
        //    T              S           T
        //
        let (path_nodes, path_edges) = expanded.path_to_base(sub);
        for p in (0..path_edges.len()).step_by(2) {
            let (_y, x) = path_edges[p];
            self.extend_tree_t_to_s(x);

            let sub = path_nodes[p + 2];
            self.assign_blossom_label_t(sub);
            self.blossoms[sub].tree_edge = Some(path_edges[p + 1]);
            self.blossoms[sub].tree = Some(tree);
            self.trees[tree].insert(sub);
        }
    }

    //
    // Augmenting.
    //

    /// Augment along the path through blossom `b` from sub-blossom `sub` to
    /// the base, then rotate the cycle so that `sub` holds the new base.
    ///
    /// Sub-blossoms on the path that need recursive augmentation are pushed
    /// on `stack`.
    fn augment_blossom_rec(
        &mut self,
        b: BlossomId,
        sub: BlossomId,
        stack: &mut Vec<(BlossomId, BlossomId)>,
    ) {
        let (path_nodes, path_edges) = self.blossoms.nontrivial(b).path_to_base(sub);

        //   before:  (p) ===== (p+1) ---(x,y)--- (p+2)
        //   after:   (p) ----- (p+1) ===(x,y)=== (p+2)
        for p in (0..path_edges.len()).step_by(2) {
            let (x, y) = path_edges[p + 1];
            self.vertex_mate[x] = Some(y);
            self.vertex_mate[y] = Some(x);

            // Trivial blossom ids equal their vertex.
            let bx = path_nodes[p + 1];
            if self.blossoms.is_nontrivial(bx) {
                stack.push((bx, x));
            }
            let by = path_nodes[p + 2];
            if self.blossoms.is_nontrivial(by) {
                stack.push((by, y));
            }
        }

        let nt = self.blossoms.nontrivial_mut(b);
        let p = nt.position(sub);
        nt.subblossoms.rotate_left(p);
        nt.edges.rotate_left(p);

        // "sub" has already been augmented.
        self.blossoms[b].base_vertex = self.blossoms[sub].base_vertex;
    }

    /// Augment through blossom `b` from sub-blossom `sub` (possibly nested
    /// several levels deep) to its base.
    ///
    /// This function takes time O(n).
    fn augment_blossom(&mut self, b: BlossomId, sub: BlossomId) {
        let mut stack = vec![(b, sub)];
        while let Some((outer, sub)) = stack.pop() {
            let blossom = self.blossoms[sub].parent.expect("sub-blossom without parent");
            if blossom != outer {
                // Continue with the parent of "blossom" once this level is done.
                stack.push((outer, blossom));
            }
            self.augment_blossom_rec(blossom, sub, &mut stack);
        }
    }

    /// Augment the matching along an augmenting path.
    ///
    /// This function takes time O(n * log(n)).
    fn augment_matching(&mut self, path: &AlternatingPath) {
        debug_assert_eq!(path.edges.len() % 2, 1);
        debug_assert!({
            let ends = [path.edges[0].0, path.edges[path.edges.len() - 1].1];
            ends.iter().all(|&x| {
                let base = self.blossoms[self.top_level_blossom(x)].base_vertex;
                self.vertex_mate[base].is_none()
            })
        });

        // Walk the edges that were unmatched before augmenting.
        for &(x, y) in path.edges.iter().step_by(2) {
            let bx = self.top_level_blossom(x);
            if self.blossoms.is_nontrivial(bx) {
                self.augment_blossom(bx, x);
            }
            let by = self.top_level_blossom(y);
            if self.blossoms.is_nontrivial(by) {
                self.augment_blossom(by, y);
            }

            self.vertex_mate[x] = Some(y);
            self.vertex_mate[y] = Some(x);
        }
    }

    //
    // Delta steps.
    //

    /// Calculate the next delta step in the dual problem.
    ///
    /// Returns the step type and 2 times its amount. Each later candidate
    /// replaces an earlier one when its amount is not larger.
    fn calc_dual_delta_step(&mut self) -> (DeltaStep, W) {
        // delta1: all unmatched vertices have the same, minimal S-vertex dual.
        let mut step = DeltaStep::Delta1;
        let mut delta_2x = self.start_vertex_dual_2x - self.delta_sum_2x;

        // delta2: least slack of any S-to-unlabeled edge.
        if let Some((e, slack_2x)) = self.delta2_get_min_edge() {
            if slack_2x <= delta_2x {
                step = DeltaStep::Delta2(e);
                delta_2x = slack_2x;
            }
        }

        // delta3: half the least slack of any S-to-S edge.
        if let Some((e, slack)) = self.delta3_get_min_edge() {
            if slack <= delta_2x {
                step = DeltaStep::Delta3(e);
                delta_2x = slack;
            }
        }

        // delta4: half the least dual of a top-level T-blossom.
        if let Some(node) = self.delta4_queue.find_min() {
            let b = *self.delta4_queue.data(node);
            debug_assert_eq!(self.blossoms[b].label, Label::T);
            debug_assert!(self.blossoms[b].parent.is_none());
            let blossom_dual = self.blossoms.nontrivial(b).dual_var - self.delta_sum_2x;
            if blossom_dual <= delta_2x {
                step = DeltaStep::Delta4(b);
                delta_2x = blossom_dual;
            }
        }

        (step, delta_2x)
    }

    //
    // Main algorithm.
    //

    /// Make every vertex the S-labeled root of its own alternating tree.
    ///
    /// This function is called once, at the beginning of the algorithm.
    pub fn start(&mut self) {
        for x in 0..self.graph.num_vertex {
            debug_assert!(self.vertex_mate[x].is_none());
            let bx = self.top_level_blossom(x);
            debug_assert_eq!(self.blossoms[bx].base_vertex, x);

            self.assign_blossom_label_s(bx);

            self.blossoms[bx].tree_edge = None;
            self.blossoms[bx].tree = Some(x);
            self.trees[x].insert(bx);
        }
    }

    /// Run one stage: search an augmenting path and augment the matching.
    ///
    /// Returns false if no augmenting path exists, which means the matching
    /// is optimal.
    ///
    /// This function takes time O((n + m) * log(n)).
    pub fn run_stage(&mut self) -> bool {
        // Each pass is a substage ending with a delta step.
        loop {
            self.scan_new_s_vertices();

            let (step, delta_2x) = self.calc_dual_delta_step();
            trace!("delta step {:?}, delta (2x) {}", step, delta_2x);

            self.delta_sum_2x += delta_2x;

            match step {
                DeltaStep::Delta1 => return false,
                DeltaStep::Delta2(e) => {
                    let (mut x, mut y, _w) = self.graph.edges[e];
                    if self.blossoms[self.top_level_blossom(x)].label != Label::S {
                        mem::swap(&mut x, &mut y);
                    }
                    self.extend_tree_s_to_t(x, y);
                }
                DeltaStep::Delta3(e) => {
                    let (x, y, _w) = self.graph.edges[e];
                    if self.add_s_to_s_edge(x, y) {
                        return true;
                    }
                }
                DeltaStep::Delta4(b) => self.expand_t_blossom(b),
            }
        }
    }

    /// Remove all alternating trees and labels, and apply all pending lazy
    /// updates to the vertex duals.
    ///
    /// This function is called once, at the end of the algorithm.
    pub fn cleanup(&mut self) {
        debug_assert!(self.scan_queue.is_empty());

        let ids: Vec<BlossomId> = self.blossoms.ids().collect();
        for b in ids {
            if self.blossoms[b].parent.is_none() && self.blossoms[b].label != Label::Free {
                self.reset_blossom_label(b);
            }
            debug_assert_eq!(self.blossoms[b].label, Label::Free);

            self.blossoms[b].tree_edge = None;
            self.blossoms[b].tree = None;

            let offset = mem::replace(&mut self.blossoms[b].vertex_dual_offset, W::zero());
            if !offset.is_zero() {
                for x in self.blossoms.vertices(b) {
                    self.vertex_dual_2x[x] += offset;
                }
            }
        }

        self.trees.iter_mut().for_each(BTreeSet::clear);

        assert!(self.delta2_queue.is_empty());
        assert!(self.delta3_queue.is_empty());
        assert!(self.delta4_queue.is_empty());
    }
}

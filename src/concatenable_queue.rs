//! Concatenable priority queues.
//!
//! A combination of a disjoint-set structure and a priority queue. Each
//! queue has a name, each element has a priority, and the following
//! operations are efficient:
//!
//!  - create a queue holding one new element;
//!  - find the name of the queue that contains a given element;
//!  - change the priority of an element;
//!  - find the minimum-priority element of a queue;
//!  - merge two or more queues;
//!  - undo a previous merge.
//!
//! Every queue is a 2-3 tree whose leaves are the elements, in the order
//! in which their queues were merged. Internal nodes cache the element and
//! priority of the minimum leaf below them. All queues and tree nodes of
//! one [`ConcatenableQueues`] live in shared arenas and are addressed by
//! index.

/// Index of a queue.
pub type QueueId = usize;

/// Index of a tree node. Leaf node ids are stable element handles.
pub type NodeId = usize;

#[derive(Debug, Clone)]
struct Node<E, P> {
    // Element and priority of the minimum leaf in this subtree.
    elem: E,
    prio: P,
    height: u32,
    parent: Option<NodeId>,
    childs: Vec<NodeId>,
    // Only set on the root node of a queue.
    owner: Option<QueueId>,
}

#[derive(Debug, Clone)]
struct Queue<N> {
    name: N,
    tree: Option<NodeId>,
    first_node: Option<NodeId>,
    sub_queues: Vec<QueueId>,
}

/// Arena of concatenable queues with names `N`, elements `E` and
/// priorities `P`.
#[derive(Debug, Clone)]
pub struct ConcatenableQueues<N, E, P> {
    queues: Vec<Queue<N>>,
    free_queues: Vec<QueueId>,
    nodes: Vec<Node<E, P>>,
    free_nodes: Vec<NodeId>,
}

impl<N: Copy, E: Copy, P: Copy + PartialOrd> Default for ConcatenableQueues<N, E, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Copy, E: Copy, P: Copy + PartialOrd> ConcatenableQueues<N, E, P> {
    pub fn new() -> Self {
        ConcatenableQueues {
            queues: Vec::new(),
            free_queues: Vec::new(),
            nodes: Vec::new(),
            free_nodes: Vec::new(),
        }
    }

    /// Create a new empty queue.
    ///
    /// This function takes time O(1).
    pub fn add_queue(&mut self, name: N) -> QueueId {
        let queue = Queue {
            name,
            tree: None,
            first_node: None,
            sub_queues: Vec::new(),
        };
        match self.free_queues.pop() {
            Some(q) => {
                self.queues[q] = queue;
                q
            }
            None => {
                self.queues.push(queue);
                self.queues.len() - 1
            }
        }
    }

    /// Release an empty queue. Its id may be reused by `add_queue`.
    pub fn remove_queue(&mut self, q: QueueId) {
        assert!(self.queues[q].tree.is_none(), "removing a non-empty queue");
        self.queues[q].sub_queues.clear();
        self.free_queues.push(q);
    }

    #[inline]
    pub fn is_empty(&self, q: QueueId) -> bool {
        self.queues[q].tree.is_none()
    }

    #[inline]
    pub fn name(&self, q: QueueId) -> N {
        self.queues[q].name
    }

    /// Insert an element into an empty queue.
    ///
    /// Non-empty queues can grow only by merging.
    /// This function takes time O(1).
    pub fn insert(&mut self, q: QueueId, elem: E, prio: P) -> NodeId {
        assert!(self.queues[q].tree.is_none(), "insert into non-empty queue");
        let node = self.alloc_node(Node {
            elem,
            prio,
            height: 0,
            parent: None,
            childs: Vec::new(),
            owner: Some(q),
        });
        self.queues[q].tree = Some(node);
        self.queues[q].first_node = Some(node);
        node
    }

    /// Return the minimum priority of any element in the queue.
    ///
    /// The queue must be non-empty.
    /// This function takes time O(1).
    #[inline]
    pub fn min_prio(&self, q: QueueId) -> P {
        self.nodes[self.root(q)].prio
    }

    /// Return the element with minimum priority.
    ///
    /// The queue must be non-empty.
    /// This function takes time O(1).
    #[inline]
    pub fn min_elem(&self, q: QueueId) -> E {
        self.nodes[self.root(q)].elem
    }

    /// Current priority of a leaf.
    #[inline]
    pub fn prio(&self, node: NodeId) -> P {
        debug_assert_eq!(self.nodes[node].height, 0);
        self.nodes[node].prio
    }

    /// Return the name of the queue that contains this element.
    ///
    /// This function takes time O(log(n)).
    pub fn find(&self, node: NodeId) -> N {
        let mut node = node;
        while let Some(parent) = self.nodes[node].parent {
            node = parent;
        }
        let owner = self.nodes[node].owner.expect("tree root without owner");
        self.queues[owner].name
    }

    /// Change the priority of an element.
    ///
    /// This function takes time O(log(n)).
    pub fn set_prio(&mut self, node: NodeId, prio: P) {
        debug_assert_eq!(self.nodes[node].height, 0);
        self.nodes[node].prio = prio;
        let mut next = self.nodes[node].parent;
        while let Some(node) = next {
            self.repair_node(node);
            next = self.nodes[node].parent;
        }
    }

    /// Merge the specified queues into `q`.
    ///
    /// Queue `q` must initially be empty and all sub-queues must be
    /// non-empty. All elements move from the sub-queues to `q`, and `q`
    /// remembers the sub-queues so that `split` can undo the merge.
    ///
    /// This function takes time O(len(sub_queues) * log(n)).
    pub fn merge(&mut self, q: QueueId, sub_queues: Vec<QueueId>) {
        assert!(self.queues[q].tree.is_none());
        assert!(self.queues[q].sub_queues.is_empty());
        assert!(!sub_queues.is_empty());

        // Move the root node from the first sub-queue to this queue.
        let first = sub_queues[0];
        let mut tree = self.take_tree(first);
        self.queues[q].first_node = self.queues[first].first_node;

        for &sub in &sub_queues[1..] {
            let subtree = self.take_tree(sub);
            tree = self.join(tree, subtree);
        }

        self.nodes[tree].owner = Some(q);
        self.queues[q].tree = Some(tree);
        self.queues[q].sub_queues = sub_queues;
    }

    /// Undo the merge step that filled this queue.
    ///
    /// All elements go back to the sub-queues they came from, and this
    /// queue becomes empty.
    ///
    /// This function takes time O(k * log(n)).
    pub fn split(&mut self, q: QueueId) {
        assert!(!self.queues[q].sub_queues.is_empty(), "split of unmerged queue");
        let mut tree = self.take_tree(q);
        let sub_queues = std::mem::take(&mut self.queues[q].sub_queues);

        // Peel sub-queues off the right end of the tree.
        for &sub in sub_queues[1..].iter().rev() {
            let first_node = self.queues[sub]
                .first_node
                .expect("sub-queue without elements");
            let (ltree, rtree) = self.split_tree(first_node);
            self.nodes[rtree].owner = Some(sub);
            self.queues[sub].tree = Some(rtree);
            tree = ltree;
        }

        self.nodes[tree].owner = Some(sub_queues[0]);
        self.queues[sub_queues[0]].tree = Some(tree);
        self.queues[q].first_node = None;
    }

    fn root(&self, q: QueueId) -> NodeId {
        self.queues[q].tree.expect("empty queue")
    }

    /// Detach the tree from queue `q` and clear its owner.
    fn take_tree(&mut self, q: QueueId) -> NodeId {
        let tree = self.queues[q].tree.take().expect("empty queue");
        debug_assert_eq!(self.nodes[tree].owner, Some(q));
        self.nodes[tree].owner = None;
        tree
    }

    fn alloc_node(&mut self, node: Node<E, P>) -> NodeId {
        match self.free_nodes.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn free_node(&mut self, node: NodeId) {
        self.nodes[node].childs.clear();
        self.nodes[node].parent = None;
        self.free_nodes.push(node);
    }

    #[inline]
    fn first_child(&self, node: NodeId) -> NodeId {
        self.nodes[node].childs[0]
    }

    #[inline]
    fn last_child(&self, node: NodeId) -> NodeId {
        let childs = &self.nodes[node].childs;
        childs[childs.len() - 1]
    }

    /// Recompute the cached minimum of an internal node.
    fn repair_node(&mut self, node: NodeId) {
        let childs = &self.nodes[node].childs;
        let mut best = childs[0];
        for &child in &childs[1..] {
            if self.nodes[child].prio < self.nodes[best].prio {
                best = child;
            }
        }
        let (elem, prio) = (self.nodes[best].elem, self.nodes[best].prio);
        self.nodes[node].elem = elem;
        self.nodes[node].prio = prio;
    }

    /// Create a new internal node with 2 child nodes.
    fn new_internal_node(&mut self, ltree: NodeId, rtree: NodeId) -> NodeId {
        debug_assert_eq!(self.nodes[ltree].height, self.nodes[rtree].height);
        let best = if self.nodes[ltree].prio <= self.nodes[rtree].prio {
            ltree
        } else {
            rtree
        };
        let node = self.alloc_node(Node {
            elem: self.nodes[best].elem,
            prio: self.nodes[best].prio,
            height: self.nodes[ltree].height + 1,
            parent: None,
            childs: vec![ltree, rtree],
            owner: None,
        });
        self.nodes[ltree].parent = Some(node);
        self.nodes[rtree].parent = Some(node);
        node
    }

    /// Repair cached minimums from `node` up to the root, then return the root.
    fn repair_to_root(&mut self, mut node: NodeId) -> NodeId {
        loop {
            self.repair_node(node);
            match self.nodes[node].parent {
                Some(parent) => node = parent,
                None => return node,
            }
        }
    }

    /// Join two trees where the left tree is higher than the right tree.
    ///
    /// Return the root node of the joined tree.
    fn join_right(&mut self, ltree: NodeId, mut rtree: NodeId) -> NodeId {
        let rheight = self.nodes[rtree].height;

        // Descend the right spine of the left tree to just above the right tree.
        let mut node = ltree;
        while self.nodes[node].height > rheight + 1 {
            node = self.last_child(node);
        }
        debug_assert_eq!(self.nodes[node].height, rheight + 1);

        // A node with 3 childs can not take the right tree. Split off its
        // last child into a new 2-node with the right tree and retry one
        // level up.
        //
        //       N                     N       R'
        //     / | \                  / \     / \
        //    /  |  \        --->    /   \   /   \
        //   A   B   C   R           A   B   C   R
        //
        while self.nodes[node].childs.len() == 3 {
            let child = self.nodes[node].childs[2];
            self.nodes[node].childs.truncate(2);
            self.repair_node(node);
            rtree = self.new_internal_node(child, rtree);
            match self.nodes[node].parent {
                Some(parent) => node = parent,
                None => return self.new_internal_node(node, rtree),
            }
        }

        self.nodes[node].childs.push(rtree);
        self.nodes[rtree].parent = Some(node);
        self.repair_to_root(node)
    }

    /// Join two trees where the left tree is lower than the right tree.
    ///
    /// Return the root node of the joined tree.
    fn join_left(&mut self, mut ltree: NodeId, rtree: NodeId) -> NodeId {
        let lheight = self.nodes[ltree].height;

        // Descend the left spine of the right tree to just above the left tree.
        let mut node = rtree;
        while self.nodes[node].height > lheight + 1 {
            node = self.first_child(node);
        }
        debug_assert_eq!(self.nodes[node].height, lheight + 1);

        //          N                L'      N
        //        / | \             / \     / \
        //       /  |  \    --->   /   \   /   \
        //  L   A   B   C          L   A   B   C
        //
        while self.nodes[node].childs.len() == 3 {
            let child = self.nodes[node].childs.remove(0);
            self.repair_node(node);
            ltree = self.new_internal_node(ltree, child);
            match self.nodes[node].parent {
                Some(parent) => node = parent,
                None => return self.new_internal_node(ltree, node),
            }
        }

        self.nodes[node].childs.insert(0, ltree);
        self.nodes[ltree].parent = Some(node);
        self.repair_to_root(node)
    }

    /// Join two consistent 2-3 trees. Both roots must be detached.
    ///
    /// Return the root node of the joined tree.
    fn join(&mut self, ltree: NodeId, rtree: NodeId) -> NodeId {
        let lheight = self.nodes[ltree].height;
        let rheight = self.nodes[rtree].height;
        if lheight > rheight {
            self.join_right(ltree, rtree)
        } else if lheight < rheight {
            self.join_left(ltree, rtree)
        } else {
            self.new_internal_node(ltree, rtree)
        }
    }

    /// Join `tree` to the left of an optional tree.
    fn join_opt(&mut self, tree: NodeId, rtree: Option<NodeId>) -> NodeId {
        match rtree {
            Some(rtree) => self.join(tree, rtree),
            None => tree,
        }
    }

    /// Split a tree on the specified leaf.
    ///
    /// Leaves to the left of `split_node` end up in the left tree. The
    /// split node itself and the leaves to its right end up in the right
    /// tree. Internal nodes that lose their place in the tree are freed.
    ///
    /// Return `(ltree, rtree)`.
    fn split_tree(&mut self, split_node: NodeId) -> (NodeId, NodeId) {
        let mut parent = self.nodes[split_node].parent.take();

        let mut ltree: Option<NodeId> = None;
        let mut rtree = split_node;

        // Walk up to the root. Detach each node from its parent on the way
        // and join its remaining childs to the appropriate side.
        let mut node = split_node;
        while let Some(next) = parent {
            let child = node;
            node = next;
            parent = self.nodes[node].parent.take();

            let childs = self.nodes[node].childs.clone();
            if childs.len() == 3 {
                if childs[0] == child {
                    // Left subtree already split. Keep "node" as a 2-node
                    // and join it to the right tree.
                    self.nodes[node].childs.remove(0);
                    self.repair_node(node);
                    rtree = self.join(rtree, node);
                } else if childs[2] == child {
                    // Right subtree already split. Keep "node" as a 2-node
                    // and join it to the left tree.
                    self.nodes[node].childs.truncate(2);
                    self.repair_node(node);
                    ltree = Some(self.join_opt(node, ltree));
                } else {
                    // Middle subtree already split.
                    self.nodes[childs[0]].parent = None;
                    self.nodes[childs[2]].parent = None;
                    self.free_node(node);
                    ltree = Some(self.join_opt(childs[0], ltree));
                    rtree = self.join(rtree, childs[2]);
                }
            } else if childs[0] == child {
                self.nodes[childs[1]].parent = None;
                self.free_node(node);
                rtree = self.join(rtree, childs[1]);
            } else {
                self.nodes[childs[0]].parent = None;
                self.free_node(node);
                ltree = Some(self.join_opt(childs[0], ltree));
            }
        }

        (ltree.expect("split on first leaf of tree"), rtree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::collections::{BTreeMap, BTreeSet};

    type Queues = ConcatenableQueues<&'static str, char, i32>;

    /// Check tree balancing rules and cached minimums.
    fn check_tree<N: Copy, E: Copy + PartialEq + std::fmt::Debug, P: Copy + PartialOrd + std::fmt::Debug>(
        cq: &ConcatenableQueues<N, E, P>,
        q: QueueId,
    ) {
        let root = cq.queues[q].tree.unwrap();
        assert_eq!(cq.nodes[root].parent, None);
        assert_eq!(cq.nodes[root].owner, Some(q));

        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            let n = &cq.nodes[node];
            if node != root {
                assert_eq!(n.owner, None);
            }
            if n.height == 0 {
                assert!(n.childs.is_empty());
            } else {
                assert!(n.childs.len() == 2 || n.childs.len() == 3);
                let mut best: Option<P> = None;
                for &child in &n.childs {
                    assert_eq!(cq.nodes[child].parent, Some(node));
                    assert_eq!(cq.nodes[child].height, n.height - 1);
                    stack.push(child);
                    let p = cq.nodes[child].prio;
                    if best.map_or(true, |b| p < b) {
                        best = Some(p);
                    }
                }
                assert_eq!(Some(n.prio), best);
                assert!(n
                    .childs
                    .iter()
                    .any(|&c| cq.nodes[c].prio == n.prio && cq.nodes[c].elem == n.elem));
            }
        }
    }

    #[test]
    fn single() {
        let mut cq = Queues::new();
        let q = cq.add_queue("Q");
        assert!(cq.is_empty(q));

        let n = cq.insert(q, 'a', 4);
        check_tree(&cq, q);
        assert!(!cq.is_empty(q));
        assert_eq!(cq.find(n), "Q");
        assert_eq!(cq.min_prio(q), 4);
        assert_eq!(cq.min_elem(q), 'a');

        cq.set_prio(n, 8);
        check_tree(&cq, q);
        assert_eq!(cq.find(n), "Q");
        assert_eq!(cq.prio(n), 8);
        assert_eq!(cq.min_prio(q), 8);
        assert_eq!(cq.min_elem(q), 'a');
    }

    #[test]
    #[should_panic]
    fn insert_into_nonempty_queue() {
        let mut cq = Queues::new();
        let q = cq.add_queue("Q");
        cq.insert(q, 'a', 4);
        cq.insert(q, 'x', 1);
    }

    #[test]
    #[should_panic]
    fn min_of_empty_queue() {
        let mut cq = Queues::new();
        let q = cq.add_queue("Q");
        cq.min_prio(q);
    }

    #[test]
    fn simple() {
        let mut cq = Queues::new();
        let q1 = cq.add_queue("A");
        let n1 = cq.insert(q1, 'a', 5);
        let q2 = cq.add_queue("B");
        let n2 = cq.insert(q2, 'b', 6);
        let q3 = cq.add_queue("C");
        let n3 = cq.insert(q3, 'c', 7);
        let q4 = cq.add_queue("D");
        let n4 = cq.insert(q4, 'd', 4);
        let q5 = cq.add_queue("E");
        let n5 = cq.insert(q5, 'e', 3);

        let q345 = cq.add_queue("P");
        cq.merge(q345, vec![q3, q4, q5]);
        check_tree(&cq, q345);

        assert_eq!(cq.find(n1), "A");
        assert_eq!(cq.find(n3), "P");
        assert_eq!(cq.find(n4), "P");
        assert_eq!(cq.find(n5), "P");
        assert_eq!(cq.min_prio(q345), 3);
        assert_eq!(cq.min_elem(q345), 'e');
        assert!(cq.is_empty(q3));

        cq.set_prio(n5, 6);
        check_tree(&cq, q345);
        assert_eq!(cq.min_prio(q345), 4);
        assert_eq!(cq.min_elem(q345), 'd');

        let q12 = cq.add_queue("Q");
        cq.merge(q12, vec![q1, q2]);
        check_tree(&cq, q12);
        assert_eq!(cq.find(n1), "Q");
        assert_eq!(cq.find(n2), "Q");
        assert_eq!(cq.min_prio(q12), 5);
        assert_eq!(cq.min_elem(q12), 'a');

        let q12345 = cq.add_queue("R");
        cq.merge(q12345, vec![q12, q345]);
        check_tree(&cq, q12345);
        for n in [n1, n2, n3, n4, n5] {
            assert_eq!(cq.find(n), "R");
        }
        assert_eq!(cq.min_prio(q12345), 4);
        assert_eq!(cq.min_elem(q12345), 'd');

        cq.set_prio(n4, 8);
        check_tree(&cq, q12345);
        assert_eq!(cq.min_prio(q12345), 5);
        assert_eq!(cq.min_elem(q12345), 'a');

        cq.set_prio(n3, 2);
        check_tree(&cq, q12345);
        assert_eq!(cq.min_prio(q12345), 2);
        assert_eq!(cq.min_elem(q12345), 'c');

        cq.split(q12345);
        assert!(cq.is_empty(q12345));
        check_tree(&cq, q12);
        check_tree(&cq, q345);
        assert_eq!(cq.find(n1), "Q");
        assert_eq!(cq.find(n2), "Q");
        assert_eq!(cq.find(n3), "P");
        assert_eq!(cq.find(n4), "P");
        assert_eq!(cq.find(n5), "P");
        assert_eq!(cq.min_prio(q12), 5);
        assert_eq!(cq.min_elem(q12), 'a');
        assert_eq!(cq.min_prio(q345), 2);
        assert_eq!(cq.min_elem(q345), 'c');

        cq.split(q12);
        check_tree(&cq, q1);
        check_tree(&cq, q2);

        cq.split(q345);
        check_tree(&cq, q3);
        check_tree(&cq, q4);
        check_tree(&cq, q5);

        assert_eq!(cq.find(n1), "A");
        assert_eq!(cq.find(n2), "B");
        assert_eq!(cq.find(n3), "C");
        assert_eq!(cq.find(n4), "D");
        assert_eq!(cq.find(n5), "E");
        assert_eq!(cq.min_prio(q3), 2);
        assert_eq!(cq.min_elem(q3), 'c');

        cq.remove_queue(q12345);
        let q6 = cq.add_queue("F");
        assert_eq!(q6, q12345);
        assert_eq!(cq.name(q6), "F");
    }

    #[test]
    fn medium() {
        let mut prios = [3, 8, 6, 2, 9, 4, 6, 8, 1, 5, 9, 4, 7, 8];
        let names = ["A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N"];

        let mut cq = Queues::new();
        let mut queues = Vec::new();
        let mut nodes = Vec::new();
        for i in 0..14 {
            let q = cq.add_queue(names[i]);
            nodes.push(cq.insert(q, (b'a' + i as u8) as char, prios[i]));
            queues.push(q);
        }

        let groups: [(&str, std::ops::Range<usize>); 4] =
            [("AB", 0..2), ("CDE", 2..5), ("FGHI", 5..9), ("JKLMN", 9..14)];
        for (name, range) in groups.iter().cloned() {
            let q = cq.add_queue(name);
            cq.merge(q, queues[range.clone()].to_vec());
            check_tree(&cq, q);
            assert_eq!(cq.min_prio(q), *prios[range].iter().min().unwrap());
            queues.push(q);
        }

        for (name, range) in groups.iter().cloned() {
            for i in range {
                assert_eq!(cq.find(nodes[i]), name);
            }
        }

        let all = cq.add_queue("ALL");
        cq.merge(all, queues[14..18].to_vec());
        check_tree(&cq, all);
        assert_eq!(cq.min_prio(all), 1);
        assert_eq!(cq.min_elem(all), 'i');
        for &n in &nodes {
            assert_eq!(cq.find(n), "ALL");
        }

        prios[8] = 5;
        cq.set_prio(nodes[8], prios[8]);
        assert_eq!(cq.min_prio(all), 2);
        assert_eq!(cq.min_elem(all), 'd');

        cq.split(all);
        for (k, (name, range)) in groups.iter().cloned().enumerate() {
            for i in range.clone() {
                assert_eq!(cq.find(nodes[i]), name);
            }
            assert_eq!(cq.min_prio(queues[14 + k]), *prios[range].iter().min().unwrap());
        }

        for k in 14..18 {
            check_tree(&cq, queues[k]);
            cq.split(queues[k]);
        }

        for i in 0..14 {
            check_tree(&cq, queues[i]);
            assert_eq!(cq.find(nodes[i]), names[i]);
            assert_eq!(cq.min_prio(queues[i]), prios[i]);
            assert_eq!(cq.min_elem(queues[i]), (b'a' + i as u8) as char);
        }
    }

    #[test]
    fn random() {
        let mut rng = ChaCha8Rng::seed_from_u64(23456);
        let num_elem = 2000;

        let mut cq: ConcatenableQueues<usize, usize, u64> = ConcatenableQueues::new();
        let mut nodes = Vec::new();
        let mut prios = Vec::new();
        let mut queue_nodes: BTreeMap<QueueId, BTreeSet<usize>> = BTreeMap::new();
        let mut queue_subs: BTreeMap<QueueId, Vec<QueueId>> = BTreeMap::new();
        let mut live_queues: BTreeSet<QueueId> = BTreeSet::new();
        let mut live_merged: BTreeSet<QueueId> = BTreeSet::new();

        // Queue names are their own ids.
        let add_queue = |cq: &mut ConcatenableQueues<usize, usize, u64>| {
            let q = cq.add_queue(0);
            cq.queues[q].name = q;
            q
        };

        let check_min = |cq: &ConcatenableQueues<usize, usize, u64>,
                         prios: &[u64],
                         members: &BTreeSet<usize>,
                         q: QueueId| {
            let pp = members.iter().map(|&t| prios[t]).min().unwrap();
            assert_eq!(cq.min_prio(q), pp);
            assert_eq!(prios[cq.min_elem(q)], pp);
            assert!(members.contains(&cq.min_elem(q)));
        };

        for i in 0..num_elem {
            let q = add_queue(&mut cq);
            let p = rng.gen::<u64>();
            nodes.push(cq.insert(q, i, p));
            prios.push(p);
            queue_nodes.insert(q, BTreeSet::from([i]));
            live_queues.insert(q);
        }

        for _ in 0..1000 {
            for _ in 0..10 {
                let t = rng.gen_range(0..num_elem);
                let q = cq.find(nodes[t]);
                assert!(live_queues.contains(&q));
                assert!(queue_nodes[&q].contains(&t));
                let p = rng.gen::<u64>();
                prios[t] = p;
                cq.set_prio(nodes[t], p);
                check_min(&cq, &prios, &queue_nodes[&q], q);
            }

            let live: Vec<QueueId> = live_queues.iter().copied().collect();
            let k = rng.gen_range(2..=std::cmp::max(2, (live.len() / 2).saturating_sub(200)));
            let subs: Vec<QueueId> = live.choose_multiple(&mut rng, k).copied().collect();

            let q = add_queue(&mut cq);
            cq.merge(q, subs.clone());
            check_tree(&cq, q);
            let members: BTreeSet<usize> = subs
                .iter()
                .flat_map(|s| queue_nodes[s].iter().copied())
                .collect();
            for s in &subs {
                live_queues.remove(s);
                live_merged.remove(s);
            }
            queue_nodes.insert(q, members);
            queue_subs.insert(q, subs);
            live_queues.insert(q);
            live_merged.insert(q);
            check_min(&cq, &prios, &queue_nodes[&q], q);

            if live_merged.len() >= 50 {
                let merged: Vec<QueueId> = live_merged.iter().copied().collect();
                let q = *merged.choose(&mut rng).unwrap();
                cq.split(q);
                let subs = queue_subs.remove(&q).unwrap();
                for s in subs {
                    check_tree(&cq, s);
                    check_min(&cq, &prios, &queue_nodes[&s], s);
                    live_queues.insert(s);
                    if queue_subs.contains_key(&s) {
                        live_merged.insert(s);
                    }
                }
                live_merged.remove(&q);
                live_queues.remove(&q);
                queue_nodes.remove(&q);
                cq.remove_queue(q);
            }
        }
    }
}

//! Priority queue based on a binary heap.
//!
//! Unlike `std::collections::BinaryHeap`, every element is addressed by a
//! stable [`NodeHandle`], so the priority of an element can be changed and
//! an arbitrary element can be deleted in O(log n).

/// Stable reference to an element in a [`PriorityQueue`].
///
/// A handle becomes invalid when its element is deleted or the queue is
/// cleared. The slot may later be reused for a new element.
pub type NodeHandle = usize;

#[derive(Debug, Clone)]
struct Node<P, T> {
    // Position of this node in the heap array.
    index: usize,
    prio: P,
    data: T,
}

/// Indexed binary min-heap.
#[derive(Debug, Clone)]
pub struct PriorityQueue<P, T> {
    heap: Vec<NodeHandle>,
    nodes: Vec<Node<P, T>>,
    free_nodes: Vec<NodeHandle>,
}

impl<P: Copy + PartialOrd, T> Default for PriorityQueue<P, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Copy + PartialOrd, T> PriorityQueue<P, T> {
    pub fn new() -> Self {
        PriorityQueue {
            heap: Vec::new(),
            nodes: Vec::new(),
            free_nodes: Vec::new(),
        }
    }

    /// Remove all elements from the queue.
    ///
    /// This function takes time O(n).
    pub fn clear(&mut self) {
        self.heap.clear();
        self.nodes.clear();
        self.free_nodes.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Return the handle of the minimum-priority element, if any.
    ///
    /// This function takes time O(1).
    #[inline]
    pub fn find_min(&self) -> Option<NodeHandle> {
        self.heap.first().copied()
    }

    /// Return the minimum priority in the queue, if any.
    #[inline]
    pub fn min_prio(&self) -> Option<P> {
        self.find_min().map(|h| self.nodes[h].prio)
    }

    #[inline]
    pub fn prio(&self, handle: NodeHandle) -> P {
        debug_assert!(self.contains(handle));
        self.nodes[handle].prio
    }

    #[inline]
    pub fn data(&self, handle: NodeHandle) -> &T {
        debug_assert!(self.contains(handle));
        &self.nodes[handle].data
    }

    /// True if `handle` refers to a live element of this queue.
    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.nodes
            .get(handle)
            .map_or(false, |node| self.heap.get(node.index) == Some(&handle))
    }

    /// Insert a new element into the queue.
    ///
    /// This function takes time O(log(n)).
    pub fn insert(&mut self, prio: P, data: T) -> NodeHandle {
        let index = self.heap.len();
        let node = Node { index, prio, data };
        let handle = match self.free_nodes.pop() {
            Some(handle) => {
                self.nodes[handle] = node;
                handle
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };
        self.heap.push(handle);
        self.sift_up(index);
        handle
    }

    /// Delete the specified element from the queue.
    ///
    /// This function takes time O(log(n)).
    pub fn delete(&mut self, handle: NodeHandle) {
        assert!(self.contains(handle), "stale priority queue handle");
        let index = self.nodes[handle].index;
        let prio = self.nodes[handle].prio;

        if let Some(last) = self.heap.pop() {
            if index < self.heap.len() {
                // Move the last element into the hole and repair the heap.
                self.heap[index] = last;
                self.nodes[last].index = index;
                if self.nodes[last].prio < prio {
                    self.sift_up(index);
                } else if self.nodes[last].prio > prio {
                    self.sift_down(index);
                }
            }
        }

        self.free_nodes.push(handle);
    }

    /// Decrease the priority of an existing element in the queue.
    ///
    /// This function takes time O(log(n)).
    pub fn decrease_prio(&mut self, handle: NodeHandle, prio: P) {
        assert!(self.contains(handle), "stale priority queue handle");
        debug_assert!(prio <= self.nodes[handle].prio);
        self.nodes[handle].prio = prio;
        self.sift_up(self.nodes[handle].index);
    }

    /// Increase the priority of an existing element in the queue.
    ///
    /// This function takes time O(log(n)).
    pub fn increase_prio(&mut self, handle: NodeHandle, prio: P) {
        assert!(self.contains(handle), "stale priority queue handle");
        debug_assert!(prio >= self.nodes[handle].prio);
        self.nodes[handle].prio = prio;
        self.sift_down(self.nodes[handle].index);
    }

    /// Repair the heap along an ascending path to the root.
    fn sift_up(&mut self, index: usize) {
        let handle = self.heap[index];
        let prio = self.nodes[handle].prio;

        let mut pos = index;
        while pos > 0 {
            let tpos = (pos - 1) / 2;
            let thandle = self.heap[tpos];
            if self.nodes[thandle].prio <= prio {
                break;
            }
            self.nodes[thandle].index = pos;
            self.heap[pos] = thandle;
            pos = tpos;
        }

        if pos != index {
            self.nodes[handle].index = pos;
            self.heap[pos] = handle;
        }
    }

    /// Repair the heap along a descending path.
    fn sift_down(&mut self, index: usize) {
        let num_elem = self.heap.len();
        let handle = self.heap[index];
        let prio = self.nodes[handle].prio;

        let mut pos = index;
        loop {
            let mut tpos = 2 * pos + 1;
            if tpos >= num_elem {
                break;
            }
            let mut thandle = self.heap[tpos];

            let qpos = tpos + 1;
            if qpos < num_elem {
                let qhandle = self.heap[qpos];
                if self.nodes[qhandle].prio <= self.nodes[thandle].prio {
                    tpos = qpos;
                    thandle = qhandle;
                }
            }

            if self.nodes[thandle].prio >= prio {
                break;
            }

            self.nodes[thandle].index = pos;
            self.heap[pos] = thandle;
            pos = tpos;
        }

        if pos != index {
            self.nodes[handle].index = pos;
            self.heap[pos] = handle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn empty() {
        let q: PriorityQueue<i32, char> = PriorityQueue::new();
        assert!(q.is_empty());
        assert_eq!(q.find_min(), None);
        assert_eq!(q.min_prio(), None);
    }

    #[test]
    fn single() {
        let mut q = PriorityQueue::new();
        let n1 = q.insert(5, 'a');
        assert_eq!(q.prio(n1), 5);
        assert_eq!(*q.data(n1), 'a');
        assert!(!q.is_empty());
        assert_eq!(q.find_min(), Some(n1));

        q.decrease_prio(n1, 3);
        assert_eq!(q.prio(n1), 3);
        assert_eq!(q.find_min(), Some(n1));

        q.delete(n1);
        assert!(q.is_empty());
        assert!(!q.contains(n1));
    }

    #[test]
    fn simple() {
        let prios = [9, 4, 7, 5, 8, 6, 4, 5, 2, 6];
        let labels = "abcdefghij";

        let mut q = PriorityQueue::new();
        let elems: Vec<NodeHandle> = prios
            .iter()
            .zip(labels.chars())
            .map(|(&prio, data)| q.insert(prio, data))
            .collect();
        for ((&n, &prio), data) in elems.iter().zip(prios.iter()).zip(labels.chars()) {
            assert_eq!(q.prio(n), prio);
            assert_eq!(*q.data(n), data);
        }

        assert_eq!(q.find_min(), Some(elems[8]));

        q.decrease_prio(elems[2], 1);
        assert_eq!(q.find_min(), Some(elems[2]));

        q.decrease_prio(elems[4], 3);
        assert_eq!(q.find_min(), Some(elems[2]));

        q.delete(elems[2]);
        assert_eq!(q.find_min(), Some(elems[8]));

        q.delete(elems[8]);
        assert_eq!(q.find_min(), Some(elems[4]));

        q.delete(elems[4]);
        q.delete(elems[1]);
        assert_eq!(q.find_min(), Some(elems[6]));

        q.delete(elems[3]);
        q.delete(elems[9]);
        assert_eq!(q.find_min(), Some(elems[6]));

        q.delete(elems[6]);
        assert_eq!(q.find_min(), Some(elems[7]));

        q.delete(elems[7]);
        assert_eq!(q.find_min(), Some(elems[5]));

        assert!(!q.is_empty());
        q.clear();
        assert!(q.is_empty());
    }

    #[test]
    fn increase_prio() {
        let mut q = PriorityQueue::new();
        let n1 = q.insert(5, 'a');
        q.increase_prio(n1, 8);
        assert_eq!(q.prio(n1), 8);
        assert_eq!(q.find_min(), Some(n1));

        let mut q = PriorityQueue::new();
        let n1 = q.insert(9, 'a');
        let n2 = q.insert(4, 'b');
        let n3 = q.insert(7, 'c');
        let n4 = q.insert(5, 'd');
        assert_eq!(q.find_min(), Some(n2));

        q.increase_prio(n2, 8);
        assert_eq!(q.prio(n2), 8);
        assert_eq!(q.find_min(), Some(n4));

        q.increase_prio(n3, 10);
        assert_eq!(q.find_min(), Some(n4));

        q.delete(n4);
        assert_eq!(q.find_min(), Some(n2));

        q.delete(n2);
        assert_eq!(q.find_min(), Some(n1));

        q.delete(n1);
        assert_eq!(q.find_min(), Some(n3));
        assert_eq!(q.prio(n3), 10);

        q.delete(n3);
        assert!(q.is_empty());
    }

    #[test]
    fn equal_priorities_keep_oldest_on_top() {
        let mut q = PriorityQueue::new();
        let first = q.insert(0, 0usize);
        for i in 1..10 {
            q.insert(0, i);
        }
        assert_eq!(q.find_min(), Some(first));
    }

    #[test]
    fn handles_are_recycled() {
        let mut q = PriorityQueue::new();
        let a = q.insert(3, 'a');
        let b = q.insert(1, 'b');
        q.delete(a);
        let c = q.insert(2, 'c');
        assert_eq!(c, a);
        assert_eq!(q.find_min(), Some(b));
        q.delete(b);
        assert_eq!(q.find_min(), Some(c));
        assert_eq!(*q.data(c), 'c');
    }

    #[test]
    fn random() {
        let mut rng = ChaCha8Rng::seed_from_u64(34567);
        let num_elem = 1000;

        let mut seq = 0u32;
        let mut elems: Vec<(NodeHandle, u32, u32)> = Vec::new();
        let mut q = PriorityQueue::new();

        fn check(q: &PriorityQueue<u32, u32>, elems: &[(NodeHandle, u32, u32)]) {
            let min_prio = elems.iter().map(|e| e.1).min().unwrap();
            let m = q.find_min().unwrap();
            assert!(elems.contains(&(m, q.prio(m), *q.data(m))));
            assert_eq!(q.prio(m), min_prio);
        }

        for _ in 0..num_elem {
            seq += 1;
            let prio = rng.gen_range(0..=1_000_000);
            elems.push((q.insert(prio, seq), prio, seq));
            check(&q, &elems);
        }

        for _ in 0..10000 {
            let p = rng.gen_range(0..num_elem);
            let prio = rng.gen_range(0..=1_000_000);
            if prio <= elems[p].1 {
                q.decrease_prio(elems[p].0, prio);
            } else {
                q.increase_prio(elems[p].0, prio);
            }
            elems[p].1 = prio;
            check(&q, &elems);

            let p = rng.gen_range(0..num_elem);
            q.delete(elems[p].0);
            elems.remove(p);
            check(&q, &elems);

            seq += 1;
            let prio = rng.gen_range(0..=1_000_000);
            elems.push((q.insert(prio, seq), prio, seq));
            check(&q, &elems);
        }

        for i in 0..num_elem {
            let p = rng.gen_range(0..num_elem - i);
            q.delete(elems[p].0);
            elems.remove(p);
            if !elems.is_empty() {
                check(&q, &elems);
            }
        }

        assert!(q.is_empty());
    }
}

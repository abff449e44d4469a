// Copyright @yucwang 2026

use crate::math::aabb::AABB;
use crate::math::constants::{Float, Vector3f, FLOAT_MAX};
use super::octree::{Octree, OctreeData};
use super::priority_queue::PriorityQueue;

pub const ROOT_IDX: u32 = 0;
pub const NULL_IDX: u32 = 0xFFFF_FFFF;

#[derive(Debug, Clone)]
pub struct SearchResult<T> {
    pub data: T,
    pub distance2: Float,
}

impl<T> PartialEq for SearchResult<T> {
    fn eq(&self, other: &Self) -> bool {
        self.distance2 == other.distance2
    }
}

// Max-heap order: the farthest of the k candidates sits on top.
impl<T> PartialOrd for SearchResult<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.distance2.partial_cmp(&other.distance2)
    }
}

// Packed to one cache line pair; the query loop touches nothing else.
#[repr(align(128))]
#[derive(Debug, Clone, PartialEq)]
pub struct LinearOctant {
    pub bb: AABB,
    pub start_data: u64,
    pub contained_data: u64,
    pub next_sibling: u32,
    pub leaf: bool,
}

impl Default for LinearOctant {
    fn default() -> Self {
        Self {
            bb: AABB::default(),
            start_data: 0,
            contained_data: 0,
            next_sibling: NULL_IDX,
            leaf: true,
        }
    }
}

// Depth-first array rewrite of the dynamic octree. For any interior node at
// index i the first child is at i + 1 and the remaining children are reached
// through next_sibling; each node's slice of ordered_data holds its own items
// followed by every descendant's.
pub struct LinearOctree<T: OctreeData> {
    pub linear_tree: Vec<LinearOctant>,
    pub ordered_data: Vec<T>,
}

impl<T: OctreeData> Default for LinearOctree<T> {
    fn default() -> Self {
        Self { linear_tree: Vec::new(), ordered_data: Vec::new() }
    }
}

impl<T: OctreeData> LinearOctree<T> {
    // Consumes the dynamic octree, releasing its nodes as they are copied
    // out, so peak memory stays near one copy of the payload.
    pub fn new(mut octree_root: Octree<T>) -> Self {
        let (octree_size, data_size) = Self::octree_size(&octree_root);

        let mut tree = Self::default();
        if octree_size == 0 || data_size == 0 {
            return tree;
        }

        tree.linear_tree.reserve_exact(octree_size);
        tree.ordered_data.reserve_exact(data_size);

        let mut data_idx: u64 = 0;
        tree.compact(&mut octree_root, &mut data_idx, true);
        tree
    }

    pub fn len(&self) -> usize {
        self.ordered_data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered_data.is_empty()
    }

    fn octree_size(node: &Octree<T>) -> (usize, usize) {
        if node.leaf() && node.data_vec.is_empty() {
            return (0, 0);
        }

        let mut size = 1;
        let mut data_size = node.data_vec.len();
        if !node.leaf() {
            for octant in &node.octants {
                let (s, d) = Self::octree_size(octant);
                size += s;
                data_size += d;
            }
        }

        (size, data_size)
    }

    fn compact(&mut self, node: &mut Octree<T>, data_idx: &mut u64, last: bool) -> (AABB, u64) {
        let idx = self.linear_tree.len();
        self.linear_tree.push(LinearOctant::default());
        self.linear_tree[idx].leaf = node.leaf();
        self.linear_tree[idx].start_data = *data_idx;

        let mut contained_data = node.data_vec.len() as u64;

        // The emitted box is tight over the contained payload, not the
        // geometric octant; the k-NN pruning bound requires this.
        let mut bb = AABB::default();
        if !node.data_vec.is_empty() {
            for data in &node.data_vec {
                bb.expand_by_point(&data.pos());
            }
            *data_idx += node.data_vec.len() as u64;
            self.ordered_data.append(&mut node.data_vec);
            node.data_vec = Vec::new();
        }

        if !node.leaf() {
            let octants = std::mem::take(&mut node.octants);
            let non_empty: Vec<Box<Octree<T>>> = octants
                .into_iter()
                .filter(|o| !(o.leaf() && o.data_vec.is_empty()))
                .collect();
            let num_children = non_empty.len();
            for (i, mut child) in non_empty.into_iter().enumerate() {
                let (child_bb, child_data) =
                    self.compact(&mut child, data_idx, i + 1 == num_children);
                bb.expand_by_aabb(&child_bb);
                contained_data += child_data;
            }
        }

        self.linear_tree[idx].next_sibling =
            if last { NULL_IDX } else { self.linear_tree.len() as u32 };
        self.linear_tree[idx].contained_data = contained_data;
        self.linear_tree[idx].bb = bb;
        (bb, contained_data)
    }

    pub fn knn_search(&self, p: &Vector3f, k: usize,
                      result: &mut PriorityQueue<SearchResult<T>>) {
        result.clear();

        if self.linear_tree.is_empty() {
            return;
        }

        let k = k.min(self.ordered_data.len());
        if k == 0 {
            return;
        }

        let mut max_distance2 = FLOAT_MAX;

        // Best-first over unvisited subtrees, nearest lower bound on top.
        #[derive(Copy, Clone)]
        struct DNode {
            distance2: Float,
            octant: u32,
        }

        impl PartialEq for DNode {
            fn eq(&self, other: &Self) -> bool {
                self.distance2 == other.distance2
            }
        }

        impl PartialOrd for DNode {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                other.distance2.partial_cmp(&self.distance2)
            }
        }

        let mut to_visit: PriorityQueue<DNode> = PriorityQueue::new();

        let mut current = DNode {
            distance2: self.linear_tree[ROOT_IDX as usize].bb.distance2(p),
            octant: ROOT_IDX,
        };

        loop {
            let node = &self.linear_tree[current.octant as usize];
            if node.leaf || node.contained_data <= k as u64 {
                // Small subtrees are cheaper to scan than to traverse.
                let end_idx = node.start_data + node.contained_data;
                for i in node.start_data..end_idx {
                    let data = &self.ordered_data[i as usize];
                    let diff = data.pos() - p;
                    let distance2 = diff.dot(&diff);
                    if distance2 <= max_distance2 {
                        if result.len() + 1 < k {
                            // The first k candidates are accepted
                            // unconditionally; defer heap construction.
                            result.push_unordered(SearchResult {
                                data: data.clone(),
                                distance2,
                            });
                        } else {
                            if result.len() != k {
                                result.push_unordered(SearchResult {
                                    data: data.clone(),
                                    distance2,
                                });
                                result.make_heap();
                            } else {
                                result.pop_push(SearchResult {
                                    data: data.clone(),
                                    distance2,
                                });
                            }
                            // No k-NN answer can be farther than the farthest
                            // of the k candidates held now.
                            let top_distance2 = result.top().unwrap().distance2;
                            if top_distance2 < max_distance2 {
                                max_distance2 = top_distance2;
                            }
                        }
                    }
                }
            } else {
                let mut child_octant = current.octant + 1;
                while child_octant != NULL_IDX {
                    let child_node = &self.linear_tree[child_octant as usize];

                    let distance2 = child_node.bb.distance2(p);
                    if distance2 <= max_distance2 {
                        to_visit.push(DNode { distance2, octant: child_octant });

                        if child_node.contained_data >= k as u64 {
                            // A subtree that already holds k items bounds the
                            // answer by its farthest corner.
                            let far2 = child_node.bb.max_distance2(p);
                            if far2 < max_distance2 {
                                max_distance2 = far2;
                            }
                        }
                    }
                    child_octant = child_node.next_sibling;
                }
            }

            match to_visit.top() {
                None => break,
                Some(top) => {
                    if top.distance2 > max_distance2 {
                        break;
                    }
                    current = *top;
                    to_visit.pop();
                }
            }
        }
    }

    pub fn radius_search(&self, p: &Vector3f, radius: Float) -> Vec<SearchResult<T>> {
        let mut result = Vec::new();

        if self.linear_tree.is_empty() {
            return result;
        }

        let radius2 = radius * radius;
        let mut to_visit: Vec<u32> = Vec::new();
        let mut node_idx = ROOT_IDX;

        loop {
            let node = &self.linear_tree[node_idx as usize];
            if node.leaf {
                let end_idx = node.start_data + node.contained_data;
                for i in node.start_data..end_idx {
                    let data = &self.ordered_data[i as usize];
                    let diff = data.pos() - p;
                    let distance2 = diff.dot(&diff);
                    if distance2 <= radius2 {
                        result.push(SearchResult { data: data.clone(), distance2 });
                    }
                }
            } else {
                let mut child_idx = node_idx + 1;
                while child_idx != NULL_IDX {
                    let child_node = &self.linear_tree[child_idx as usize];
                    if child_node.bb.distance2(p) <= radius2 {
                        if child_node.bb.max_distance2(p) <= radius2 {
                            // Subtree lies entirely inside the sphere; take
                            // its whole range without descending.
                            let end_idx = child_node.start_data + child_node.contained_data;
                            for i in child_node.start_data..end_idx {
                                let data = &self.ordered_data[i as usize];
                                let diff = data.pos() - p;
                                result.push(SearchResult {
                                    data: data.clone(),
                                    distance2: diff.dot(&diff),
                                });
                            }
                        } else {
                            to_visit.push(child_idx);
                        }
                    }
                    child_idx = child_node.next_sibling;
                }
            }

            match to_visit.pop() {
                None => break,
                Some(idx) => node_idx = idx,
            }
        }

        result
    }
}

/* Tests for LinearOctree */

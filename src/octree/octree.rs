// Copyright @yucwang 2026

use crate::math::aabb::AABB;
use crate::math::constants::Vector3f;

// A dense point cluster would otherwise subdivide without bound.
const MAX_OCTREE_DEPTH: u32 = 32;

pub trait OctreeData: Clone {
    fn pos(&self) -> Vector3f;
}

// Insert-driven octree used only while bulk-loading a photon map. It is
// consumed and destroyed by the linear octree compaction.
pub struct Octree<T: OctreeData> {
    pub bb: AABB,
    pub data_vec: Vec<T>,
    pub octants: Vec<Box<Octree<T>>>,
    max_node_data: usize,
    depth: u32,
}

impl<T: OctreeData> Octree<T> {
    pub fn new(bb: AABB, max_node_data: usize) -> Self {
        Self::with_depth(bb, max_node_data.max(1), 0)
    }

    fn with_depth(bb: AABB, max_node_data: usize, depth: u32) -> Self {
        Self {
            bb,
            data_vec: Vec::new(),
            octants: Vec::new(),
            max_node_data,
            depth,
        }
    }

    pub fn leaf(&self) -> bool {
        self.octants.is_empty()
    }

    pub fn insert(&mut self, item: T) {
        if self.leaf() {
            self.data_vec.push(item);
            if self.data_vec.len() > self.max_node_data && self.depth < MAX_OCTREE_DEPTH {
                self.subdivide();
            }
        } else {
            let idx = self.child_index(&item.pos());
            self.octants[idx].insert(item);
        }
    }

    // Child octant selected by the sign of (p - center) per axis; points on
    // a splitting plane go to the positive side.
    fn child_index(&self, p: &Vector3f) -> usize {
        let center = self.bb.center();
        ((p.x >= center.x) as usize)
            | (((p.y >= center.y) as usize) << 1)
            | (((p.z >= center.z) as usize) << 2)
    }

    fn subdivide(&mut self) {
        let center = self.bb.center();
        self.octants.reserve_exact(8);
        for i in 0..8 {
            let mut p_min = self.bb.p_min;
            let mut p_max = center;
            if i & 1 != 0 {
                p_min.x = center.x;
                p_max.x = self.bb.p_max.x;
            }
            if i & 2 != 0 {
                p_min.y = center.y;
                p_max.y = self.bb.p_max.y;
            }
            if i & 4 != 0 {
                p_min.z = center.z;
                p_max.z = self.bb.p_max.z;
            }
            self.octants.push(Box::new(Octree::with_depth(
                AABB::new(p_min, p_max),
                self.max_node_data,
                self.depth + 1,
            )));
        }

        let data_vec = std::mem::take(&mut self.data_vec);
        for item in data_vec {
            let idx = self.child_index(&item.pos());
            self.octants[idx].insert(item);
        }
    }
}

/* Tests for Octree */
#[cfg(test)]
mod tests {
    use super::{Octree, OctreeData};
    use crate::core::rng::LcgRng;
    use crate::math::aabb::AABB;
    use crate::math::constants::Vector3f;

    #[derive(Debug, Clone, PartialEq)]
    struct TestPoint {
        p: Vector3f,
    }

    impl OctreeData for TestPoint {
        fn pos(&self) -> Vector3f {
            self.p
        }
    }

    fn unit_box() -> AABB {
        AABB::new(Vector3f::new(0.0, 0.0, 0.0), Vector3f::new(1.0, 1.0, 1.0))
    }

    fn count_and_check(node: &Octree<TestPoint>, max_node_data: usize) -> usize {
        if node.leaf() {
            for item in &node.data_vec {
                assert!(node.bb.contains(&item.pos()));
            }
            return node.data_vec.len();
        }

        // Interior nodes hold no payload of their own.
        assert!(node.data_vec.is_empty());
        assert_eq!(node.octants.len(), 8);
        node.octants
            .iter()
            .map(|o| count_and_check(o, max_node_data))
            .sum()
    }

    #[test]
    fn test_insert_and_subdivide() {
        let max_node_data = 16;
        let mut tree = Octree::new(unit_box(), max_node_data);
        let mut rng = LcgRng::new(11);

        let n = 2000;
        for _ in 0..n {
            tree.insert(TestPoint {
                p: Vector3f::new(rng.next_f32(), rng.next_f32(), rng.next_f32()),
            });
        }

        assert!(!tree.leaf());
        assert_eq!(count_and_check(&tree, max_node_data), n);
    }

    // Coincident points cannot be separated by subdivision; the depth cap
    // keeps insertion from recursing forever.
    #[test]
    fn test_insert_coincident_points_terminates() {
        let mut tree = Octree::new(unit_box(), 4);
        for _ in 0..256 {
            tree.insert(TestPoint {
                p: Vector3f::new(0.25, 0.25, 0.25),
            });
        }
        assert_eq!(count_and_check(&tree, 4), 256);
    }
}

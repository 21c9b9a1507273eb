//! ## R-tree implementation
//!
//! A dynamic, disk-free Guttman R-tree over [`Civilization`] points. Internal
//! nodes are owned by an arena (`Vec<Option<RNode>>`) addressed by [`NodeId`],
//! with each non-root node carrying a back-reference to its parent; this gives
//! `adjust_tree` and `condense_tree` upward walks without raw pointers or
//! reference counting.
//!
//! ### Example
//!
//! ```
//! use civindex::civilization::Civilization;
//! use civindex::geometry::{Point, Rectangle};
//! use civindex::r_tree::RTree;
//!
//! let mut tree = RTree::new(4).unwrap();
//! tree.insert(Point::new(12.5, 41.9, Civilization::new(1, "Rome", 41.9, 12.5, -753)));
//! tree.insert(Point::new(10.3, 36.8, Civilization::new(2, "Carthage", 36.8, 10.3, -814)));
//!
//! let hits = tree.search(&Rectangle::new(0.0, 0.0, 20.0, 50.0));
//! assert_eq!(hits.len(), 2);
//!
//! let (nearest, dist, found) = tree.nearest_neighbor(12.0, 41.0);
//! assert!(found);
//! assert_eq!(nearest.unwrap().id, 1);
//! assert!(dist >= 0.0);
//! ```

use crate::civilization::Civilization;
use crate::exceptions::IndexError;
use crate::geometry::{lat_lon_distance, Point, Rectangle};
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::{debug, info};

/// An index into the tree's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct NodeId(usize);

#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct RNode {
    is_leaf: bool,
    mbr: Rectangle,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    points: Vec<Point>,
}

impl RNode {
    fn new_leaf(parent: Option<NodeId>) -> Self {
        RNode {
            is_leaf: true,
            mbr: Rectangle::empty(),
            parent,
            children: Vec::new(),
            points: Vec::new(),
        }
    }

    fn new_internal(parent: Option<NodeId>) -> Self {
        RNode {
            is_leaf: false,
            mbr: Rectangle::empty(),
            parent,
            children: Vec::new(),
            points: Vec::new(),
        }
    }
}

/// A dynamic R-tree over [`Civilization`] points, split and condensed with
/// Guttman's quadratic-cost heuristic.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RTree {
    arena: Vec<Option<RNode>>,
    free: Vec<usize>,
    root: NodeId,
    max_children: usize,
    min_children: usize,
    len: usize,
}

impl RTree {
    /// Creates a new, empty R-tree. `max_children` bounds the number of
    /// entries a node may hold before it splits; it must be at least 2.
    /// The minimum fill factor is `max(2, max_children / 2)`.
    pub fn new(max_children: usize) -> Result<Self, IndexError> {
        if max_children < 2 {
            return Err(IndexError::InvalidCapacity {
                capacity: max_children,
            });
        }
        info!("Creating new RTree with max_children: {}", max_children);
        let min_children = std::cmp::max(2, max_children / 2);
        Ok(RTree {
            arena: vec![Some(RNode::new_leaf(None))],
            free: Vec::new(),
            root: NodeId(0),
            max_children,
            min_children,
            len: 0,
        })
    }

    /// Number of points currently indexed.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Height of the tree: 1 for a tree whose root is a leaf.
    pub fn get_height(&self) -> usize {
        let mut height = 1;
        let mut node_id = self.root;
        loop {
            let n = self.node(node_id);
            if n.is_leaf {
                return height;
            }
            height += 1;
            node_id = n.children[0];
        }
    }

    /// Discards all entries, resetting the tree to a single empty leaf root.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.free.clear();
        self.arena.push(Some(RNode::new_leaf(None)));
        self.root = NodeId(0);
        self.len = 0;
    }

    fn node(&self, id: NodeId) -> &RNode {
        self.arena[id.0].as_ref().expect("dangling NodeId")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut RNode {
        self.arena[id.0].as_mut().expect("dangling NodeId")
    }

    fn alloc(&mut self, node: RNode) -> NodeId {
        if let Some(slot) = self.free.pop() {
            self.arena[slot] = Some(node);
            NodeId(slot)
        } else {
            self.arena.push(Some(node));
            NodeId(self.arena.len() - 1)
        }
    }

    fn dealloc(&mut self, id: NodeId) {
        self.arena[id.0] = None;
        self.free.push(id.0);
    }

    /// Recomputes a node's MBR as the tight union of its entries.
    fn retighten(&mut self, id: NodeId) {
        let n = self.node(id);
        let mbr = if n.is_leaf {
            n.points
                .iter()
                .fold(Rectangle::empty(), |acc, p| acc.combine(&p.mbr()))
        } else {
            n.children
                .iter()
                .fold(Rectangle::empty(), |acc, &c| acc.combine(&self.node(c).mbr))
        };
        self.node_mut(id).mbr = mbr;
    }

    /// Descends from the root to the leaf requiring the least enlargement to
    /// admit `r`, breaking ties by smaller original area and then by the
    /// first child encountered.
    fn choose_leaf(&self, r: &Rectangle) -> NodeId {
        let mut node_id = self.root;
        loop {
            let n = self.node(node_id);
            if n.is_leaf {
                return node_id;
            }
            let mut best_child = n.children[0];
            let mut best_enlargement = f64::INFINITY;
            let mut best_area = f64::INFINITY;
            for &child in &n.children {
                let child_mbr = self.node(child).mbr;
                let enlargement = child_mbr.enlargement(r);
                let area = child_mbr.area();
                if enlargement < best_enlargement {
                    best_enlargement = enlargement;
                    best_area = area;
                    best_child = child;
                } else if enlargement == best_enlargement && area < best_area {
                    best_area = area;
                    best_child = child;
                }
            }
            node_id = best_child;
        }
    }

    /// Inserts a point, descending to a leaf via `choose_leaf` and splitting
    /// and retightening ancestors as needed.
    pub fn insert(&mut self, point: Point) {
        info!("Inserting point into RTree: id={}", point.payload.id);
        self.insert_internal(point);
        self.len += 1;
    }

    fn insert_internal(&mut self, point: Point) {
        let r = point.mbr();
        let leaf = self.choose_leaf(&r);
        self.node_mut(leaf).points.push(point);
        self.retighten(leaf);

        let split_sibling = if self.node(leaf).points.len() > self.max_children {
            Some(self.split_node(leaf))
        } else {
            None
        };
        self.adjust_tree(leaf, split_sibling);
    }

    /// Splits an overflowing node in two using `pick_seeds` and
    /// `distribute_quadratic`, and returns the newly allocated sibling.
    fn split_node(&mut self, node_id: NodeId) -> NodeId {
        debug!("Splitting overflowing node");
        let (seed1, seed2) = self.pick_seeds(node_id);
        self.distribute_quadratic(node_id, seed1, seed2)
    }

    /// Picks the pair of entries whose combined MBR wastes the most area if
    /// grouped together: `O(n^2)`, exact per Guttman's quadratic split.
    fn pick_seeds(&self, node_id: NodeId) -> (usize, usize) {
        let n = self.node(node_id);
        let count = if n.is_leaf {
            n.points.len()
        } else {
            n.children.len()
        };
        let rect_of = |i: usize| -> Rectangle {
            if n.is_leaf {
                n.points[i].mbr()
            } else {
                self.node(n.children[i]).mbr
            }
        };

        let mut seed1 = 0;
        let mut seed2 = 1;
        let mut max_inefficiency = f64::NEG_INFINITY;
        for i in 0..count {
            for j in (i + 1)..count {
                let ri = rect_of(i);
                let rj = rect_of(j);
                let inefficiency = ri.combine(&rj).area() - ri.area() - rj.area();
                if inefficiency > max_inefficiency {
                    max_inefficiency = inefficiency;
                    seed1 = i;
                    seed2 = j;
                }
            }
        }
        (seed1, seed2)
    }

    /// Distributes `node_id`'s entries between itself and a fresh sibling,
    /// seeded by indices `seed1`/`seed2`, greedily assigning the rest to
    /// whichever group needs less enlargement (ties go to smaller area, then
    /// to the original node), except once a group's deficit against
    /// `min_children` equals the number of entries left to place, at which
    /// point every remaining entry goes there unconditionally.
    fn distribute_quadratic(&mut self, node_id: NodeId, seed1: usize, seed2: usize) -> NodeId {
        let is_leaf = self.node(node_id).is_leaf;
        let parent = self.node(node_id).parent;
        let sibling_id = self.alloc(if is_leaf {
            RNode::new_leaf(parent)
        } else {
            RNode::new_internal(parent)
        });

        if is_leaf {
            let original = std::mem::take(&mut self.node_mut(node_id).points);
            let mut remaining = std::collections::VecDeque::with_capacity(original.len());
            let mut seed_a = None;
            let mut seed_b = None;
            for (i, pt) in original.into_iter().enumerate() {
                if i == seed1 {
                    seed_a = Some(pt);
                } else if i == seed2 {
                    seed_b = Some(pt);
                } else {
                    remaining.push_back(pt);
                }
            }
            self.node_mut(node_id).points.push(seed_a.unwrap());
            self.node_mut(sibling_id).points.push(seed_b.unwrap());
            self.retighten(node_id);
            self.retighten(sibling_id);

            // Guttman's forced-assignment clause: once only exactly as many
            // entries remain as a group needs to reach `min_children`, dump
            // them all there rather than keep choosing by least enlargement,
            // so a split never produces an underfull group.
            while let Some(pt) = remaining.pop_front() {
                let needed = remaining.len() + 1;
                let len1 = self.node(node_id).points.len();
                let len2 = self.node(sibling_id).points.len();
                if len1 + needed <= self.min_children {
                    self.node_mut(node_id).points.push(pt);
                    while let Some(rest) = remaining.pop_front() {
                        self.node_mut(node_id).points.push(rest);
                    }
                    self.retighten(node_id);
                    break;
                }
                if len2 + needed <= self.min_children {
                    self.node_mut(sibling_id).points.push(pt);
                    while let Some(rest) = remaining.pop_front() {
                        self.node_mut(sibling_id).points.push(rest);
                    }
                    self.retighten(sibling_id);
                    break;
                }

                let pt_rect = pt.mbr();
                let enl1 = self.node(node_id).mbr.enlargement(&pt_rect);
                let enl2 = self.node(sibling_id).mbr.enlargement(&pt_rect);
                let area1 = self.node(node_id).mbr.area();
                let area2 = self.node(sibling_id).mbr.area();
                if enl1 < enl2 || (enl1 == enl2 && area1 <= area2) {
                    self.node_mut(node_id).points.push(pt);
                    self.retighten(node_id);
                } else {
                    self.node_mut(sibling_id).points.push(pt);
                    self.retighten(sibling_id);
                }
            }
        } else {
            let original = std::mem::take(&mut self.node_mut(node_id).children);
            let mut remaining = std::collections::VecDeque::with_capacity(original.len());
            let mut seed_a = None;
            let mut seed_b = None;
            for (i, child) in original.into_iter().enumerate() {
                if i == seed1 {
                    seed_a = Some(child);
                } else if i == seed2 {
                    seed_b = Some(child);
                } else {
                    remaining.push_back(child);
                }
            }
            let seed_a = seed_a.unwrap();
            let seed_b = seed_b.unwrap();
            self.node_mut(seed_a).parent = Some(node_id);
            self.node_mut(seed_b).parent = Some(sibling_id);
            self.node_mut(node_id).children.push(seed_a);
            self.node_mut(sibling_id).children.push(seed_b);
            self.retighten(node_id);
            self.retighten(sibling_id);

            while let Some(child) = remaining.pop_front() {
                let needed = remaining.len() + 1;
                let len1 = self.node(node_id).children.len();
                let len2 = self.node(sibling_id).children.len();
                if len1 + needed <= self.min_children {
                    self.node_mut(child).parent = Some(node_id);
                    self.node_mut(node_id).children.push(child);
                    while let Some(rest) = remaining.pop_front() {
                        self.node_mut(rest).parent = Some(node_id);
                        self.node_mut(node_id).children.push(rest);
                    }
                    self.retighten(node_id);
                    break;
                }
                if len2 + needed <= self.min_children {
                    self.node_mut(child).parent = Some(sibling_id);
                    self.node_mut(sibling_id).children.push(child);
                    while let Some(rest) = remaining.pop_front() {
                        self.node_mut(rest).parent = Some(sibling_id);
                        self.node_mut(sibling_id).children.push(rest);
                    }
                    self.retighten(sibling_id);
                    break;
                }

                let child_rect = self.node(child).mbr;
                let enl1 = self.node(node_id).mbr.enlargement(&child_rect);
                let enl2 = self.node(sibling_id).mbr.enlargement(&child_rect);
                let area1 = self.node(node_id).mbr.area();
                let area2 = self.node(sibling_id).mbr.area();
                if enl1 < enl2 || (enl1 == enl2 && area1 <= area2) {
                    self.node_mut(child).parent = Some(node_id);
                    self.node_mut(node_id).children.push(child);
                    self.retighten(node_id);
                } else {
                    self.node_mut(child).parent = Some(sibling_id);
                    self.node_mut(sibling_id).children.push(child);
                    self.retighten(sibling_id);
                }
            }
        }

        sibling_id
    }

    /// Walks from `node_id` up to the root, retightening ancestor MBRs and
    /// propagating a pending split until it is absorbed or the root itself
    /// must grow a new level.
    fn adjust_tree(&mut self, mut node_id: NodeId, mut split_sibling: Option<NodeId>) {
        while node_id != self.root {
            let parent = self.node(node_id).parent.expect("non-root node has a parent");
            self.retighten(parent);

            if let Some(sibling) = split_sibling {
                self.node_mut(sibling).parent = Some(parent);
                self.node_mut(parent).children.push(sibling);
                self.retighten(parent);
                split_sibling = if self.node(parent).children.len() > self.max_children {
                    Some(self.split_node(parent))
                } else {
                    None
                };
            }
            node_id = parent;
        }

        if let Some(sibling) = split_sibling {
            debug!("Root overflowed; growing a new root level");
            let old_root = self.root;
            let new_root = self.alloc(RNode::new_internal(None));
            self.node_mut(old_root).parent = Some(new_root);
            self.node_mut(sibling).parent = Some(new_root);
            self.node_mut(new_root).children.push(old_root);
            self.node_mut(new_root).children.push(sibling);
            self.retighten(new_root);
            self.root = new_root;
        }
    }

    /// Finds the leaf holding `point`, pruning subtrees whose MBR cannot
    /// contain it.
    fn find_leaf(&self, node_id: NodeId, point: &Point) -> Option<NodeId> {
        let n = self.node(node_id);
        if !n.mbr.contains_point(point) {
            return None;
        }
        if n.is_leaf {
            return n.points.iter().any(|p| p == point).then_some(node_id);
        }
        n.children.iter().find_map(|&child| self.find_leaf(child, point))
    }

    /// Removes a point, condensing underfull ancestors by flattening and
    /// reinserting their surviving points. Returns `true` if `point` was
    /// found and removed.
    pub fn remove(&mut self, point: &Point) -> bool {
        info!("Attempting to remove point: id={}", point.payload.id);
        let Some(leaf) = self.find_leaf(self.root, point) else {
            return false;
        };

        let pos = self
            .node(leaf)
            .points
            .iter()
            .position(|p| p == point)
            .expect("find_leaf guarantees a match");
        self.node_mut(leaf).points.remove(pos);
        self.retighten(leaf);

        let orphans = self.condense_tree(leaf);
        for pt in orphans {
            self.insert_internal(pt);
        }

        let root = self.root;
        if !self.node(root).is_leaf && self.node(root).children.len() == 1 {
            let only_child = self.node(root).children[0];
            self.node_mut(only_child).parent = None;
            self.dealloc(root);
            self.root = only_child;
        }

        self.len -= 1;
        true
    }

    /// Walks from `leaf` to the root, detaching and flattening any
    /// underfull node into raw points along the way, retightening every
    /// ancestor's MBR as it goes.
    fn condense_tree(&mut self, leaf: NodeId) -> Vec<Point> {
        let mut orphans = Vec::new();
        let mut node_id = leaf;
        while node_id != self.root {
            let parent = self.node(node_id).parent.expect("non-root node has a parent");
            let n = self.node(node_id);
            let underflow = if n.is_leaf {
                n.points.len() < self.min_children
            } else {
                n.children.len() < self.min_children
            };

            if underflow {
                debug!("Condensing underfull node");
                let pos = self
                    .node(parent)
                    .children
                    .iter()
                    .position(|&c| c == node_id)
                    .expect("parent-child link consistency");
                self.node_mut(parent).children.remove(pos);
                self.flatten_into(node_id, &mut orphans);
                self.dealloc(node_id);
            }

            self.retighten(parent);
            node_id = parent;
        }
        orphans
    }

    /// Recursively collects every point under `node_id` into `out`,
    /// deallocating descendant internal nodes as it unwinds.
    fn flatten_into(&mut self, node_id: NodeId, out: &mut Vec<Point>) {
        let is_leaf = self.node(node_id).is_leaf;
        if is_leaf {
            out.extend(std::mem::take(&mut self.node_mut(node_id).points));
        } else {
            let children = std::mem::take(&mut self.node_mut(node_id).children);
            for child in children {
                self.flatten_into(child, out);
                self.dealloc(child);
            }
        }
    }

    /// Returns every point whose coordinates fall in the closed rectangle
    /// `query`.
    pub fn search(&self, query: &Rectangle) -> Vec<Civilization> {
        info!("Performing range search with query: {:?}", query);
        let mut results = Vec::new();
        self.search_rec(self.root, query, &mut results);
        results
    }

    fn search_rec(&self, node_id: NodeId, query: &Rectangle, results: &mut Vec<Civilization>) {
        let n = self.node(node_id);
        if !n.mbr.intersects(query) {
            return;
        }
        if n.is_leaf {
            for pt in &n.points {
                if query.contains_point(pt) {
                    results.push(pt.payload.clone());
                }
            }
        } else {
            for &child in &n.children {
                self.search_rec(child, query, results);
            }
        }
    }

    /// Finds the point nearest to `(qx, qy)` by best-first search over a
    /// min-priority-queue of MBR distances, returning early once the queue's
    /// minimum distance exceeds the current best. Distance is computed via
    /// [`lat_lon_distance`] with `(qy, qx)` interpreted as `(lat, lon)`, so
    /// results agree with [`crate::kd_tree::KdTree::nearest_neighbor`].
    pub fn nearest_neighbor(&self, qx: f64, qy: f64) -> (Option<Civilization>, f64, bool) {
        let mut heap = BinaryHeap::new();
        heap.push(HeapEntry {
            dist: OrderedFloat(self.node(self.root).mbr.distance_to_point(qx, qy)),
            node: self.root,
        });

        let mut best: Option<Civilization> = None;
        let mut best_dist = f64::INFINITY;

        while let Some(HeapEntry { dist, node: node_id }) = heap.pop() {
            if dist.into_inner() >= best_dist {
                break;
            }
            let n = self.node(node_id);
            if n.is_leaf {
                for pt in &n.points {
                    let d = lat_lon_distance(qy, qx, pt.payload.latitude, pt.payload.longitude);
                    if d < best_dist {
                        best_dist = d;
                        best = Some(pt.payload.clone());
                    }
                }
            } else {
                for &child in &n.children {
                    let child_dist = self.node(child).mbr.distance_to_point(qx, qy);
                    if child_dist < best_dist {
                        heap.push(HeapEntry {
                            dist: OrderedFloat(child_dist),
                            node: child,
                        });
                    }
                }
            }
        }

        let found = best.is_some();
        (best, best_dist, found)
    }
}

/// Min-heap entry for best-first nearest-neighbor search: `BinaryHeap` is a
/// max-heap, so `Ord` is reversed on distance.
struct HeapEntry {
    dist: OrderedFloat<f64>,
    node: NodeId,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.dist.cmp(&self.dist)
    }
}

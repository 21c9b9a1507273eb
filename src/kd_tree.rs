//! ## K-d tree implementation
//!
//! A 2-d binary space partition over `Civilization` payloads, keyed on
//! `(latitude, longitude)`. The tree is never rebalanced; it exists to serve as
//! the correctness oracle the R-tree's range search and nearest-neighbor search
//! are checked against, and as a simple build-once/query-many alternative index.
//!
//! ### Example
//!
//! ```
//! use civindex::civilization::Civilization;
//! use civindex::kd_tree::KdTree;
//!
//! let mut tree = KdTree::new();
//! tree.insert(Civilization::new(1, "Rome", 41.9, 12.5, -753));
//! tree.insert(Civilization::new(2, "Carthage", 36.8, 10.3, -814));
//!
//! let (nearest, dist) = tree.nearest_neighbor(41.0, 12.0).unwrap();
//! assert_eq!(nearest.id, 1);
//! assert!(dist >= 0.0);
//! ```

use crate::civilization::Civilization;
use crate::geometry::lat_lon_distance;
use tracing::info;

/// A node in the k-d tree, owning its children.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct KdNode {
    civ: Civilization,
    left: Option<Box<KdNode>>,
    right: Option<Box<KdNode>>,
}

impl KdNode {
    fn new(civ: Civilization) -> Self {
        KdNode {
            civ,
            left: None,
            right: None,
        }
    }

    /// `true` for even depths (split on latitude), `false` for odd (longitude).
    fn splits_on_latitude(depth: usize) -> bool {
        depth % 2 == 0
    }
}

/// A 2-d k-d tree over `Civilization` records, splitting on latitude at even
/// depths and longitude at odd depths.
#[derive(Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KdTree {
    root: Option<Box<KdNode>>,
    len: usize,
}

impl KdTree {
    /// Creates a new, empty k-d tree.
    pub fn new() -> Self {
        KdTree { root: None, len: 0 }
    }

    /// Number of civilizations currently indexed.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts a civilization. No duplicate rejection: equal keys are admitted
    /// on the right.
    pub fn insert(&mut self, civ: Civilization) {
        info!("Inserting civilization into KdTree: {:?}", civ.id);
        self.root = Some(Self::insert_rec(self.root.take(), civ, 0));
        self.len += 1;
    }

    fn insert_rec(node: Option<Box<KdNode>>, civ: Civilization, depth: usize) -> Box<KdNode> {
        match node {
            None => Box::new(KdNode::new(civ)),
            Some(mut current) => {
                let go_left = if KdNode::splits_on_latitude(depth) {
                    civ.latitude < current.civ.latitude
                } else {
                    civ.longitude < current.civ.longitude
                };
                if go_left {
                    current.left = Some(Self::insert_rec(current.left.take(), civ, depth + 1));
                } else {
                    current.right = Some(Self::insert_rec(current.right.take(), civ, depth + 1));
                }
                current
            }
        }
    }

    /// Returns every civilization whose `(latitude, longitude)` lies in the
    /// closed box `[lat_min, lat_max] x [lon_min, lon_max]`.
    pub fn range_search(
        &self,
        lat_min: f64,
        lat_max: f64,
        lon_min: f64,
        lon_max: f64,
    ) -> Vec<Civilization> {
        let mut found = Vec::new();
        Self::range_search_rec(&self.root, lat_min, lat_max, lon_min, lon_max, 0, &mut found);
        found
    }

    fn range_search_rec(
        node: &Option<Box<KdNode>>,
        lat_min: f64,
        lat_max: f64,
        lon_min: f64,
        lon_max: f64,
        depth: usize,
        found: &mut Vec<Civilization>,
    ) {
        let Some(n) = node else { return };

        if n.civ.latitude >= lat_min
            && n.civ.latitude <= lat_max
            && n.civ.longitude >= lon_min
            && n.civ.longitude <= lon_max
        {
            found.push(n.civ.clone());
        }

        let on_lat = KdNode::splits_on_latitude(depth);
        let (query_min, query_max, v) = if on_lat {
            (lat_min, lat_max, n.civ.latitude)
        } else {
            (lon_min, lon_max, n.civ.longitude)
        };

        // Asymmetric on purpose: strict on the low side, non-strict on the high
        // side, matching the `>=` rule used by insertion.
        if query_min < v {
            Self::range_search_rec(&n.left, lat_min, lat_max, lon_min, lon_max, depth + 1, found);
        }
        if query_max >= v {
            Self::range_search_rec(&n.right, lat_min, lat_max, lon_min, lon_max, depth + 1, found);
        }
    }

    /// Returns the civilization nearest to `(qlat, qlon)` and its distance, or
    /// `None` if the tree is empty.
    pub fn nearest_neighbor(&self, qlat: f64, qlon: f64) -> Option<(Civilization, f64)> {
        self.root.as_ref()?;
        let mut best: Option<Civilization> = None;
        let mut best_dist = f64::INFINITY;
        Self::nearest_neighbor_rec(&self.root, qlat, qlon, 0, &mut best, &mut best_dist);
        best.map(|civ| (civ, best_dist))
    }

    fn nearest_neighbor_rec(
        node: &Option<Box<KdNode>>,
        qlat: f64,
        qlon: f64,
        depth: usize,
        best: &mut Option<Civilization>,
        best_dist: &mut f64,
    ) {
        let Some(n) = node else { return };

        let d = lat_lon_distance(qlat, qlon, n.civ.latitude, n.civ.longitude);
        if d < *best_dist {
            *best_dist = d;
            *best = Some(n.civ.clone());
        }

        let on_lat = KdNode::splits_on_latitude(depth);
        let (query_coord, node_coord) = if on_lat {
            (qlat, n.civ.latitude)
        } else {
            (qlon, n.civ.longitude)
        };

        let (near, far) = if query_coord < node_coord {
            (&n.left, &n.right)
        } else {
            (&n.right, &n.left)
        };

        Self::nearest_neighbor_rec(near, qlat, qlon, depth + 1, best, best_dist);

        if (query_coord - node_coord).abs() < *best_dist {
            Self::nearest_neighbor_rec(far, qlat, qlon, depth + 1, best, best_dist);
        }
    }
}

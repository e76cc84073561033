use std::time;

use crate::geom;

use super::{Bounds, BuildConfig, BvhTree, NodeId};

// The winning candidate of a binned SAH search
#[derive(Clone, Copy)]
#[derive(Debug, PartialEq)]
pub struct Split {
    pub axis: geom::Axis,
    // Triangles centered strictly below this go left
    pub position: f32,
    pub cost: f32,
}

#[derive(Clone, Copy)]
struct Bin {
    count: usize,
    bounds: Bounds,
}

impl Bin {
    const EMPTY: Self = Self { count: 0, bounds: Bounds::EMPTY, };
}

#[derive(Clone, Copy)]
#[derive(Debug, Default, PartialEq)]
pub struct BuildStats {
    pub triangles: usize,
    pub nodes: usize,
    pub leaves: usize,
    pub depth: usize,
    pub elapsed: time::Duration,
}

// Top-down binned SAH construction.
// Every call to `BvhTree::build` starts over from a fresh triangle set
pub struct Builder<'a> {
    config: &'a BuildConfig,
    tree: BvhTree,
    // Reused across axes and nodes to avoid an allocation per search
    bins: Vec<Bin>,
    sweep: Vec<Bin>,
}

impl<'a> Builder<'a> {
    pub fn new(config: &'a BuildConfig) -> Self {
        Self {
            config,
            tree: BvhTree::with_capacity(0),
            bins: Vec::new(),
            sweep: Vec::new(),
        }
    }

    pub fn build(mut self, triangles: Vec<geom::Triangle>) -> BvhTree {
        self.tree = BvhTree::with_capacity({
            2 * triangles.len() / self.config.leaf_size.max(1) + 1
        });

        self.build_node(triangles, 0);
        self.tree
    }

    fn build_node(
        &mut self,
        triangles: Vec<geom::Triangle>,
        depth: u32,
    ) -> NodeId {
        let bounds = Bounds::union_all(triangles.iter().map(geom::Triangle::bounds));

        if triangles.is_empty()
            || depth > self.config.max_depth
            || triangles.len() < self.config.leaf_size {

            return self.tree.push_leaf(bounds, triangles);
        }

        let Some(split) = self.find_split(&triangles, &bounds, depth) else {
            return self.tree.push_leaf(bounds, triangles);
        };

        let (left, right): (Vec<_>, Vec<_>) = triangles
            .into_iter()
            .partition(|tri| tri.center(split.axis) < split.position);

        // The bins separated the set but the comparison against the
        // split plane did not, so there is nothing to recurse on
        if left.is_empty() || right.is_empty() {
            let triangles = if left.is_empty() { right } else { left };

            log::debug!(
                "split along {} at {} kept all {} triangles on one side (depth {})",
                split.axis, split.position, triangles.len(), depth,
            );

            return self.tree.push_leaf(bounds, triangles);
        }

        let left = self.build_node(left, depth + 1);
        let right = self.build_node(right, depth + 1);

        self.tree.push_inner(bounds, split.axis, (left, right))
    }

    // Evaluates every bin boundary on every axis wide enough to bin,
    // returning the cheapest boundary that leaves triangles on both sides
    pub fn find_split(
        &mut self,
        triangles: &[geom::Triangle],
        bounds: &Bounds,
        depth: u32,
    ) -> Option<Split> {
        let count = self.config.bins_at(depth);

        let mut best: Option<Split> = None;
        let mut best_cost = f32::MAX;

        for axis in geom::Axis::ALL {
            let width = bounds.width(axis);

            // Written this way round so NaN widths are rejected too
            if !(width >= self.config.axis_eps) { continue; }

            let start = bounds.axis_start(axis);
            let size = width / count as f32;

            self.bins.clear();
            self.bins.resize(count, Bin::EMPTY);

            for tri in triangles {
                let idx = ((tri.center(axis) - start) / size) as usize;

                let bin = &mut self.bins[idx.min(count - 1)];
                bin.count += 1;
                bin.bounds = bin.bounds.union(tri.bounds());
            }

            // sweep[i] covers bins i..count
            self.sweep.clear();
            self.sweep.resize(count, Bin::EMPTY);

            let mut acc = Bin::EMPTY;
            for (bin, sweep) in self.bins.iter().zip(self.sweep.iter_mut()).rev() {
                acc.count += bin.count;
                acc.bounds = acc.bounds.union(&bin.bounds);
                *sweep = acc;
            }

            let mut left = Bin::EMPTY;
            for i in 0..(count - 1) {
                left.count += self.bins[i].count;
                left.bounds = left.bounds.union(&self.bins[i].bounds);

                let right = self.sweep[i + 1];

                if left.count == 0 || right.count == 0 { continue; }

                let cost = left.count as f32 * left.bounds.surface_area()
                    + right.count as f32 * right.bounds.surface_area();

                if cost < best_cost {
                    best_cost = cost;
                    best = Some(Split {
                        axis,
                        position: start + (i + 1) as f32 * size,
                        cost,
                    });
                }
            }
        }

        best
    }
}

impl BvhTree {
    pub fn build(
        triangles: Vec<geom::Triangle>,
        config: &BuildConfig,
    ) -> Self {
        Self::build_with_stats(triangles, config).0
    }

    pub fn build_with_stats(
        triangles: Vec<geom::Triangle>,
        config: &BuildConfig,
    ) -> (Self, BuildStats) {
        let start = time::Instant::now();
        let count = triangles.len();

        let tree = Builder::new(config).build(triangles);

        let stats = BuildStats {
            triangles: count,
            nodes: tree.size(),
            leaves: tree.leaf_count(),
            depth: tree.depth(),
            elapsed: start.elapsed(),
        };

        log::info!(
            "built bvh over {} triangles in {}ms: {} nodes, {} leaves, {} levels",
            stats.triangles,
            stats.elapsed.as_millis(),
            stats.nodes,
            stats.leaves,
            stats.depth,
        );

        (tree, stats)
    }
}

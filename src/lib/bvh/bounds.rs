use crate::geom::{self, V3Ops as _};

// Axis-aligned bounds. The inverted box (min = +inf, max = -inf)
// is the identity for `union`, and it's what an empty node carries
#[derive(Clone, Copy)]
#[derive(Debug, PartialEq)]
pub struct Bounds {
    min: geom::V3<f32>,
    max: geom::V3<f32>,
}

impl Default for Bounds {
    fn default() -> Self { Self::EMPTY }
}

impl Bounds {
    pub const EMPTY: Self = Self {
        min: [f32::INFINITY; 3],
        max: [f32::NEG_INFINITY; 3],
    };

    pub const fn new(min: geom::V3<f32>, max: geom::V3<f32>) -> Self {
        Self { min, max }
    }

    pub fn from_points<P>(points: P) -> Self
        where P: IntoIterator<Item = geom::V3<f32>> {

        points.into_iter().fold(Self::EMPTY, |bounds, point| Self {
            min: bounds.min.min(point),
            max: bounds.max.max(point),
        })
    }

    pub fn union_all<'a, B>(bounds: B) -> Self
        where B: IntoIterator<Item = &'a Bounds> {

        bounds.into_iter().fold(Self::EMPTY, |acc, b| acc.union(b))
    }

    pub fn min(&self) -> geom::V3<f32> { self.min }

    pub fn max(&self) -> geom::V3<f32> { self.max }

    // True for the sentinel, or any box inverted along some axis
    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    // Empty boxes have no area. Without the guard the sentinel
    // reports an infinite (or NaN once scaled by zero) cost
    pub fn surface_area(&self) -> f32 {
        if self.is_empty() { return 0.; }

        let [dx, dy, dz] = self.max.sub(self.min);

        2. * (dx * dy + dx * dz + dy * dz)
    }

    pub fn width(&self, axis: geom::Axis) -> f32 {
        self.max[axis.index()] - self.min[axis.index()]
    }

    pub fn axis_start(&self, axis: geom::Axis) -> f32 {
        self.min[axis.index()]
    }

    pub fn centroid(&self) -> geom::V3<f32> {
        self.min.add(self.max).scale(0.5)
    }

    pub fn center(&self, axis: geom::Axis) -> f32 {
        self.centroid()[axis.index()]
    }

    pub fn contains(&self, other: &Self) -> bool {
        (0..3).all(|i| {
            self.min[i] <= other.min[i] && other.max[i] <= self.max[i]
        })
    }
}

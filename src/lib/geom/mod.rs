pub mod v3;

use std::fmt;

use crate::bvh;

pub use v3::{V3, V3Ops};

#[derive(Clone, Copy)]
#[derive(Debug, PartialEq, Eq, Hash)]
pub enum Axis { X, Y, Z, }

impl Axis {
    // Split candidates are always evaluated in this order
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };

        write!(f, "{name}")
    }
}

// A single world-space triangle as it enters the builder.
// `indices` point into the scene's global vertex buffer,
// `tags` travel alongside them into the material-index buffer
#[derive(Clone, Copy)]
#[derive(Debug, PartialEq)]
pub struct Triangle {
    vertices: [V3<f32>; 3],
    indices: [i32; 3],
    tags: [i32; 3],
    bounds: bvh::Bounds,
}

impl Triangle {
    pub fn new(
        vertices: [V3<f32>; 3],
        indices: [i32; 3],
        tags: [i32; 3],
    ) -> Self {
        let bounds = bvh::Bounds::from_points(vertices);

        Self { vertices, indices, tags, bounds, }
    }

    pub fn vertices(&self) -> [V3<f32>; 3] { self.vertices }

    pub fn indices(&self) -> [i32; 3] { self.indices }

    pub fn tags(&self) -> [i32; 3] { self.tags }

    pub fn bounds(&self) -> &bvh::Bounds { &self.bounds }

    // Position used for binning and partitioning
    pub fn center(&self, axis: Axis) -> f32 {
        self.bounds.center(axis)
    }
}

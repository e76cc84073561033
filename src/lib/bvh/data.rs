use std::{fmt, mem};

use super::{Bounds, BvhTree, NodeId, NodeKind};

// What a flattened node's two integer fields mean.
// Only `GpuNode::content` produces these, after checking the leaf flag
#[derive(Clone, Copy)]
#[derive(Debug, PartialEq, Eq)]
pub enum NodeContent {
    // `count` entries of the index buffer starting at `offset`
    Leaf { offset: i32, count: i32 },
    // Slots of the two children in the node array
    Inner { left: i32, right: i32 },
}

// One record of the node buffer handed to the traversal kernel.
// 36 bytes, no padding: min (12), max (12), leaf flag, then two fields
// that hold either (index count, index offset) or (left slot, right slot)
#[repr(C)]
#[derive(Clone, Copy)]
#[derive(Debug, PartialEq)]
#[derive(bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuNode {
    pub min: [f32; 3],
    pub max: [f32; 3],
    pub is_leaf: u32,
    pub field0: i32,
    pub field1: i32,
}

impl GpuNode {
    fn new(bounds: &Bounds, content: NodeContent) -> Self {
        let (is_leaf, field0, field1) = match content {
            NodeContent::Leaf { offset, count } => (1, count, offset),
            NodeContent::Inner { left, right } => (0, left, right),
        };

        Self {
            min: bounds.min(),
            max: bounds.max(),
            is_leaf,
            field0,
            field1,
        }
    }

    pub fn is_leaf(&self) -> bool { self.is_leaf != 0 }

    pub fn bounds(&self) -> Bounds { Bounds::new(self.min, self.max) }

    pub fn content(&self) -> NodeContent {
        if self.is_leaf() {
            NodeContent::Leaf { offset: self.field1, count: self.field0 }
        } else {
            NodeContent::Inner { left: self.field0, right: self.field1 }
        }
    }
}

// JSON has no infinities, so the bounds of an empty leaf are written as null
impl serde::Serialize for GpuNode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where S: serde::Serializer {

        #[derive(serde::Serialize)]
        struct Intermediate {
            min: Option<[f32; 3]>,
            max: Option<[f32; 3]>,
            is_leaf: bool,
            field0: i32,
            field1: i32,
        }

        let finite = |v: [f32; 3]| v.iter().all(|c| c.is_finite()).then_some(v);

        let intermediate = Intermediate {
            min: finite(self.min),
            max: finite(self.max),
            is_leaf: self.is_leaf(),
            field0: self.field0,
            field1: self.field1,
        };

        serde::Serialize::serialize(&intermediate, serializer)
    }
}

impl<'de> serde::Deserialize<'de> for GpuNode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where D: serde::Deserializer<'de> {

        #[derive(serde::Deserialize)]
        struct Intermediate {
            min: Option<[f32; 3]>,
            max: Option<[f32; 3]>,
            is_leaf: bool,
            field0: i32,
            field1: i32,
        }

        let intermediate = <Intermediate as serde::Deserialize>::deserialize(deserializer)?;

        Ok(Self {
            min: intermediate.min.unwrap_or(Bounds::EMPTY.min()),
            max: intermediate.max.unwrap_or(Bounds::EMPTY.max()),
            is_leaf: u32::from(intermediate.is_leaf),
            field0: intermediate.field0,
            field1: intermediate.field1,
        })
    }
}

// A leaf as seen by the traversal: which slot it sits in
// and which run of `indices`/`material_tags` belongs to it
#[derive(Clone)]
#[derive(Debug, PartialEq, Eq)]
pub struct LeafRange {
    pub slot: usize,
    pub range: std::ops::Range<usize>,
}

// The three buffers the renderer consumes, flattened in
// depth-first preorder so they can be walked without recursion
#[derive(Clone)]
#[derive(Debug, Default, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize)]
pub struct BvhData {
    pub nodes: Vec<GpuNode>,
    pub indices: Vec<i32>,
    pub material_tags: Vec<i32>,
}

impl BvhData {
    // Deep enough for any tree the builder produces (62 levels at most),
    // matching the fixed stack a shader would declare
    pub const STACK_SIZE: usize = 64;

    pub fn new(tree: &BvhTree) -> Self {
        let triangles = tree.triangle_count();

        let mut data = Self {
            nodes: Vec::with_capacity(tree.size()),
            indices: Vec::with_capacity(3 * triangles),
            material_tags: Vec::with_capacity(3 * triangles),
        };

        // Nodes are pushed in visiting order, so the slot reserved for
        // a node is always the current length of the array
        fn into_gpu_node(
            data: &mut BvhData,
            tree: &BvhTree,
            id: NodeId,
        ) -> i32 {
            let slot = data.nodes.len();
            let node = tree.node(id);

            match node.kind() {
                NodeKind::Leaf { triangles } => {
                    let offset = gpu_field(data.indices.len());
                    let count = gpu_field(3 * triangles.len());

                    data.nodes.push(GpuNode::new(
                        node.bounds(),
                        NodeContent::Leaf { offset, count },
                    ));

                    for tri in triangles {
                        data.indices.extend(tri.indices());
                        data.material_tags.extend(tri.tags());
                    }

                    log::trace!("leaf {} holds {} indices from {}", slot, count, offset);
                },
                NodeKind::Inner { left, right, .. } => {
                    data.nodes.push(GpuNode::new(
                        node.bounds(),
                        NodeContent::Inner { left: 0, right: 0 },
                    ));

                    data.nodes[slot].field0 = into_gpu_node(data, tree, *left);
                    data.nodes[slot].field1 = into_gpu_node(data, tree, *right);
                },
            }

            gpu_field(slot)
        }

        into_gpu_node(&mut data, tree, tree.root());

        data
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }

    pub fn triangle_count(&self) -> usize { self.indices.len() / 3 }

    // Raw views for uploading into storage buffers
    pub fn node_bytes(&self) -> &[u8] { bytemuck::cast_slice(&self.nodes) }

    pub fn index_bytes(&self) -> &[u8] { bytemuck::cast_slice(&self.indices) }

    pub fn material_tag_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.material_tags)
    }

    // Walks the node array exactly the way the traversal kernel does:
    // a fixed-size stack, right child pushed before left
    pub fn leaves(&self) -> Leaves<'_> {
        let mut leaves = Leaves {
            data: self,
            stack: [0; Self::STACK_SIZE],
            top: 0,
        };

        if !self.nodes.is_empty() {
            leaves.top = 1;
        }

        leaves
    }

    // Checks that a buffer set (typically one loaded from disk)
    // honors the layout the traversal relies on
    pub fn validate(&self) -> anyhow::Result<()> {
        let Self { nodes, indices, material_tags } = self;

        if nodes.is_empty() {
            anyhow::bail!("BVH data must contain at least a root node");
        }

        if indices.len() != material_tags.len() {
            anyhow::bail!("\
                Index buffer has {} entries but material tag buffer has {}\
            ", indices.len(), material_tags.len());
        }

        if indices.len() % 3 != 0 {
            anyhow::bail!("Index buffer length {} is not a multiple of 3", indices.len());
        }

        // Replays the traversal with the same fixed stack. Pops must visit
        // slots in array order and leaves must consume the index buffer
        // front to back
        let mut stack = Vec::with_capacity(Self::STACK_SIZE);
        stack.push(0);

        let mut next = 0;
        let mut covered = 0;

        while let Some(idx) = stack.pop() {
            if idx != next {
                anyhow::bail!("\
                    Traversal reached slot {} where slot {} was expected\
                ", idx, next);
            }

            let Some(node) = nodes.get(idx) else {
                anyhow::bail!("Slot {} is past the end of {} nodes", idx, nodes.len());
            };

            next += 1;

            match node.content() {
                NodeContent::Leaf { offset, count } => {
                    let (Ok(offset), Ok(count)) = (usize::try_from(offset), usize::try_from(count)) else {
                        anyhow::bail!("Leaf {} has a negative index range", idx);
                    };

                    if count % 3 != 0 || offset != covered || offset + count > indices.len() {
                        anyhow::bail!("\
                            Leaf {} covers indices {}..{}, expected a run starting at {} within {}\
                        ", idx, offset, offset + count, covered, indices.len());
                    }

                    covered += count;
                },
                NodeContent::Inner { left, right } => {
                    if stack.len() + 2 > Self::STACK_SIZE {
                        anyhow::bail!("\
                            Inner node {} needs more than {} traversal stack entries\
                        ", idx, Self::STACK_SIZE);
                    }

                    let (Ok(left), Ok(right)) = (usize::try_from(left), usize::try_from(right)) else {
                        anyhow::bail!("Inner node {} has a negative child slot", idx);
                    };

                    if left != idx + 1 {
                        anyhow::bail!("\
                            Inner node {} must have its left child at slot {}, found {}\
                        ", idx, idx + 1, left);
                    }

                    stack.push(right);
                    stack.push(left);
                },
            }
        }

        if next != nodes.len() {
            anyhow::bail!("Only {} of {} nodes are reachable from the root", next, nodes.len());
        }

        if covered != indices.len() {
            anyhow::bail!("\
                Leaves cover {} indices but the index buffer has {}\
            ", covered, indices.len());
        }

        Ok(())
    }

    pub fn from_json(bytes: &[u8]) -> anyhow::Result<Self> {
        let data = serde_json::from_slice::<Self>(bytes)?;

        data.validate()?;

        Ok(data)
    }

    // Size of a single node record on the GPU
    pub const fn stride() -> usize { mem::size_of::<GpuNode>() }
}

// Node fields are i32 on the GPU, so buffers are limited to i32::MAX
// entries. Larger values are clamped and reported instead of wrapping
fn gpu_field(value: usize) -> i32 {
    i32::try_from(value).unwrap_or_else(|_| {
        log::error!("{} does not fit in a node field, clamping to {}", value, i32::MAX);
        i32::MAX
    })
}

impl From<&BvhTree> for BvhData {
    fn from(tree: &BvhTree) -> Self { Self::new(tree) }
}

pub struct Leaves<'a> {
    data: &'a BvhData,
    stack: [usize; BvhData::STACK_SIZE],
    top: usize,
}

impl Iterator for Leaves<'_> {
    type Item = LeafRange;

    fn next(&mut self) -> Option<Self::Item> {
        while self.top > 0 {
            self.top -= 1;

            let slot = self.stack[self.top];
            let node = self.data.nodes.get(slot)?;

            match node.content() {
                NodeContent::Leaf { offset, count } => {
                    let offset = offset.max(0) as usize;
                    let count = count.max(0) as usize;

                    return Some(LeafRange { slot, range: offset..(offset + count) });
                },
                NodeContent::Inner { left, right } => {
                    // A well-formed tree never needs more room than this
                    if self.top + 2 > BvhData::STACK_SIZE {
                        log::warn!("traversal stack overflow at slot {}", slot);
                        return None;
                    }

                    self.stack[self.top] = right.max(0) as usize;
                    self.stack[self.top + 1] = left.max(0) as usize;
                    self.top += 2;
                },
            }
        }

        None
    }
}

impl fmt::Display for BvhData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let leaves = self.nodes.iter().filter(|node| node.is_leaf()).count();

        write!(
            f,
            "{} nodes ({} leaves), {} triangles, {} bytes of nodes",
            self.node_count(),
            leaves,
            self.triangle_count(),
            self.node_bytes().len(),
        )
    }
}

impl BvhTree {
    pub fn flatten(&self) -> BvhData { BvhData::new(self) }
}

// Material tags and indices for a leaf, as the kernel would read them
impl LeafRange {
    pub fn triangles<'a>(
        &'a self,
        data: &'a BvhData,
    ) -> impl Iterator<Item = ([i32; 3], [i32; 3])> + 'a {
        let indices = data.indices[self.range.clone()].chunks_exact(3);
        let tags = data.material_tags[self.range.clone()].chunks_exact(3);

        indices.zip(tags).map(|(i, t)| ([i[0], i[1], i[2]], [t[0], t[1], t[2]]))
    }
}

const _: () = assert!(mem::size_of::<GpuNode>() == 36);

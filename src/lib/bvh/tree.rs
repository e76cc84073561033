use std::fmt;

use crate::geom;

use super::Bounds;

// Nodes live in a flat arena owned by the tree.
// Children and parents are both plain indices into it, so the
// upward link never owns anything and no cycle can form
#[derive(Clone, Copy)]
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const fn index(self) -> usize { self.0 }
}

#[derive(Clone)]
#[derive(Debug)]
pub enum NodeKind {
    Leaf { triangles: Vec<geom::Triangle> },
    Inner { left: NodeId, right: NodeId, axis: geom::Axis },
}

#[derive(Clone)]
#[derive(Debug)]
pub struct BvhNode {
    bounds: Bounds,
    parent: Option<NodeId>,
    kind: NodeKind,
}

impl BvhNode {
    pub fn bounds(&self) -> &Bounds { &self.bounds }

    pub fn parent(&self) -> Option<NodeId> { self.parent }

    pub fn kind(&self) -> &NodeKind { &self.kind }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    pub fn triangles(&self) -> &[geom::Triangle] {
        match &self.kind {
            NodeKind::Leaf { triangles } => triangles,
            NodeKind::Inner { .. } => &[],
        }
    }

    // The axis an inner node was split along
    pub fn axis(&self) -> Option<geom::Axis> {
        match self.kind {
            NodeKind::Inner { axis, .. } => Some(axis),
            NodeKind::Leaf { .. } => None,
        }
    }

    pub fn children(&self) -> Option<(NodeId, NodeId)> {
        match self.kind {
            NodeKind::Inner { left, right, .. } => Some((left, right)),
            NodeKind::Leaf { .. } => None,
        }
    }
}

#[derive(Clone)]
pub struct BvhTree {
    nodes: Vec<BvhNode>,
    root: NodeId,
}

impl BvhTree {
    // The builder assembles the arena bottom-up;
    // the last node pushed becomes the root
    pub(super) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            root: NodeId(0),
        }
    }

    pub(super) fn push_leaf(
        &mut self,
        bounds: Bounds,
        triangles: Vec<geom::Triangle>,
    ) -> NodeId {
        self.push(BvhNode {
            bounds,
            parent: None,
            kind: NodeKind::Leaf { triangles },
        })
    }

    pub(super) fn push_inner(
        &mut self,
        bounds: Bounds,
        axis: geom::Axis,
        (left, right): (NodeId, NodeId),
    ) -> NodeId {
        let id = self.push(BvhNode {
            bounds,
            parent: None,
            kind: NodeKind::Inner { left, right, axis },
        });

        self.nodes[left.0].parent = Some(id);
        self.nodes[right.0].parent = Some(id);

        id
    }

    fn push(&mut self, node: BvhNode) -> NodeId {
        let id = NodeId(self.nodes.len());

        self.nodes.push(node);
        self.root = id;

        id
    }

    pub fn root(&self) -> NodeId { self.root }

    pub fn node(&self, id: NodeId) -> &BvhNode { &self.nodes[id.0] }

    pub fn get(&self, id: NodeId) -> Option<&BvhNode> { self.nodes.get(id.0) }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(BvhNode::parent)
    }

    pub fn bounds(&self) -> &Bounds { self.node(self.root).bounds() }

    // Total number of nodes, which is also the length of the flattened array
    pub fn size(&self) -> usize { self.nodes.len() }

    // Number of levels, a lone leaf counts as 1
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self.root, 1)];

        while let Some((id, level)) = stack.pop() {
            deepest = deepest.max(level);

            if let Some((left, right)) = self.node(id).children() {
                stack.push((right, level + 1));
                stack.push((left, level + 1));
            }
        }

        deepest
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }

    pub fn triangle_count(&self) -> usize {
        self.nodes.iter().map(|node| node.triangles().len()).sum()
    }

    // Root first, left subtree before right subtree
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder { tree: self, stack: vec![self.root] }
    }

    pub fn leaves(&self) -> impl Iterator<Item = &BvhNode> + '_ {
        self.preorder()
            .map(|(_, node)| node)
            .filter(|node| node.is_leaf())
    }

    pub fn cursor(&self) -> Cursor<'_> {
        Cursor { tree: self, current: self.root }
    }
}

pub struct Preorder<'a> {
    tree: &'a BvhTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = (NodeId, &'a BvhNode);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.tree.node(id);

        if let Some((left, right)) = node.children() {
            self.stack.push(right);
            self.stack.push(left);
        }

        Some((id, node))
    }
}

// Steps around a built tree one edge at a time.
// Moves that have nowhere to go leave the cursor where it is
#[derive(Clone, Copy)]
pub struct Cursor<'a> {
    tree: &'a BvhTree,
    current: NodeId,
}

impl<'a> Cursor<'a> {
    pub fn id(&self) -> NodeId { self.current }

    pub fn node(&self) -> &'a BvhNode { self.tree.node(self.current) }

    pub fn left(&mut self) -> bool {
        self.step(self.node().children().map(|(left, _)| left))
    }

    pub fn right(&mut self) -> bool {
        self.step(self.node().children().map(|(_, right)| right))
    }

    pub fn up(&mut self) -> bool {
        self.step(self.node().parent())
    }

    fn step(&mut self, target: Option<NodeId>) -> bool {
        match target {
            Some(id) => {
                self.current = id;
                true
            },
            None => false,
        }
    }
}

// Prints the nesting of the tree with each leaf shown as its triangle count
impl fmt::Debug for BvhTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct Subtree<'a> { tree: &'a BvhTree, id: NodeId, }

        impl fmt::Debug for Subtree<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let Self { tree, id } = *self;

                match tree.node(id).children() {
                    Some((left, right)) => f.debug_list()
                        .entry(&Subtree { tree, id: left })
                        .entry(&Subtree { tree, id: right })
                        .finish(),
                    None => write!(f, "{}", tree.node(id).triangles().len()),
                }
            }
        }

        write!(f, "{:?}", Subtree { tree: self, id: self.root })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri(offset: f32, idx: i32) -> geom::Triangle {
        geom::Triangle::new(
            [[offset, 0., 0.], [offset + 1., 0., 0.], [offset, 1., 0.]],
            [idx; 3],
            [0; 3],
        )
    }

    // (a b) c
    fn sample() -> BvhTree {
        let a = vec![tri(0., 0)];
        let b = vec![tri(2., 1)];
        let c = vec![tri(4., 2), tri(5., 3)];

        let ba = Bounds::union_all(a.iter().map(geom::Triangle::bounds));
        let bb = Bounds::union_all(b.iter().map(geom::Triangle::bounds));
        let bc = Bounds::union_all(c.iter().map(geom::Triangle::bounds));

        let mut tree = BvhTree::with_capacity(5);

        let a = tree.push_leaf(ba, a);
        let b = tree.push_leaf(bb, b);
        let ab = tree.push_inner(ba.union(&bb), geom::Axis::X, (a, b));
        let c = tree.push_leaf(bc, c);

        tree.push_inner(ba.union(&bb).union(&bc), geom::Axis::X, (ab, c));
        tree
    }

    #[test]
    fn structure() {
        let tree = sample();

        assert_eq!(tree.size(), 5);
        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.leaf_count(), 3);
        assert_eq!(tree.triangle_count(), 4);
        assert_eq!(format!("{:?}", tree), "[[1, 1], 2]");
    }

    #[test]
    fn parents_point_back() {
        let tree = sample();

        assert_eq!(tree.parent(tree.root()), None);

        for (id, node) in tree.preorder() {
            if let Some((left, right)) = node.children() {
                assert_eq!(tree.parent(left), Some(id));
                assert_eq!(tree.parent(right), Some(id));
            }
        }
    }

    #[test]
    fn preorder_visits_left_first() {
        let tree = sample();

        let leaves = tree.leaves()
            .map(|leaf| leaf.triangles()[0].indices()[0])
            .collect::<Vec<_>>();

        assert_eq!(leaves, vec![0, 1, 2]);
        assert_eq!(tree.preorder().count(), tree.size());
    }

    #[test]
    fn cursor_navigation() {
        let tree = sample();
        let mut cursor = tree.cursor();

        assert!(!cursor.up());
        assert_eq!(cursor.id(), tree.root());

        assert!(cursor.left());
        assert!(cursor.right());
        assert!(cursor.node().is_leaf());
        assert_eq!(cursor.node().triangles()[0].indices(), [1; 3]);

        // Leaves have nowhere further down to go
        assert!(!cursor.left());
        assert!(!cursor.right());

        assert!(cursor.up());
        assert!(cursor.up());
        assert_eq!(cursor.id(), tree.root());
    }
}

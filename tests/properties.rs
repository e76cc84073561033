use std::collections::HashMap;

use rt::bvh::{Bounds, BuildConfig, BvhTree, NodeContent};
use rt::geom::{Axis, Triangle};

fn random_soup(seed: u64, count: usize, extent: f32) -> Vec<Triangle> {
    let mut rng = fastrand::Rng::with_seed(seed);

    let mut point = |scale: f32| [
        (rng.f32() - 0.5) * scale,
        (rng.f32() - 0.5) * scale,
        (rng.f32() - 0.5) * scale,
    ];

    (0..count)
        .map(|i| {
            let base = point(extent);
            let corner = |offset: [f32; 3]| [
                base[0] + offset[0],
                base[1] + offset[1],
                base[2] + offset[2],
            ];

            let i = i as i32;

            Triangle::new(
                [base, corner(point(2.)), corner(point(2.))],
                [3 * i, 3 * i + 1, 3 * i + 2],
                [i % 7; 3],
            )
        })
        .collect()
}

fn soups() -> Vec<Vec<Triangle>> {
    vec![
        random_soup(1, 1, 10.),
        random_soup(2, 4, 10.),
        random_soup(3, 17, 100.),
        random_soup(4, 500, 100.),
        random_soup(5, 2_000, 1_000.),
    ]
}

#[test]
fn every_triangle_in_exactly_one_leaf() {
    for soup in soups() {
        let tree = BvhTree::build(soup.clone(), &BuildConfig::default());

        let mut seen = HashMap::new();
        for leaf in tree.leaves() {
            for tri in leaf.triangles() {
                *seen.entry(tri.indices()[0]).or_insert(0) += 1;
            }
        }

        assert_eq!(seen.len(), soup.len());
        assert!(seen.values().all(|&count| count == 1));
    }
}

#[test]
fn leaf_bounds_cover_input() {
    for soup in soups() {
        let expected = Bounds::union_all(soup.iter().map(Triangle::bounds));
        let tree = BvhTree::build(soup, &BuildConfig::default());

        let leaves = Bounds::union_all(tree.leaves().map(|leaf| leaf.bounds()));

        assert_eq!(leaves, expected);
        assert_eq!(*tree.bounds(), expected);
    }
}

#[test]
fn inner_bounds_equal_union_of_children() {
    for soup in soups() {
        let tree = BvhTree::build(soup, &BuildConfig::default());

        for (_, node) in tree.preorder() {
            if let Some((left, right)) = node.children() {
                let left = tree.node(left).bounds();
                let right = tree.node(right).bounds();

                assert_eq!(*node.bounds(), left.union(right));
            }
        }
    }
}

#[test]
fn flattened_indices_match_triangle_count() {
    for soup in soups() {
        let count = soup.len();
        let data = BvhTree::build(soup, &BuildConfig::default()).flatten();

        assert_eq!(data.indices.len(), 3 * count);
        assert_eq!(data.material_tags.len(), 3 * count);
    }
}

#[test]
fn depth_stays_under_cap() {
    let config = BuildConfig::default();

    for soup in soups() {
        let tree = BvhTree::build(soup, &config);

        // Inner nodes stop at depth 60, so the deepest leaf sits at 61
        assert!(tree.depth() - 1 <= config.max_depth as usize + 1);
    }

    let shallow = BuildConfig { max_depth: 3, ..BuildConfig::default() };
    let tree = BvhTree::build(random_soup(9, 1_000, 100.), &shallow);

    assert!(tree.depth() <= 5);
    assert_eq!(tree.triangle_count(), 1_000);
}

#[test]
fn shrinking_gaps_reach_default_cap() {
    // Point triangles on a line have no area, so every candidate costs 0
    // and the first boundary wins. The gap after each point is wider than
    // a bin of what remains, so each split peels off a single triangle
    let mut x = 0f32;
    let mut gap = 1f32;

    let tris = (0..100)
        .map(|i| {
            let tri = Triangle::new([[x, 0., 0.]; 3], [3 * i, 3 * i + 1, 3 * i + 2], [i; 3]);

            x += gap;
            gap *= 0.9;

            tri
        })
        .collect::<Vec<_>>();

    let config = BuildConfig::default();
    let tree = BvhTree::build(tris, &config);

    // Splits at depths 0..=60, then both children of the last one are leaves
    assert_eq!(tree.depth(), config.max_depth as usize + 2);
    assert_eq!(tree.leaf_count(), 62);
    assert_eq!(tree.triangle_count(), 100);

    let data = tree.flatten();

    assert!(data.validate().is_ok());
    assert_eq!(data.leaves().count(), tree.leaf_count());
}

#[test]
fn left_child_follows_parent() {
    for soup in soups() {
        let tree = BvhTree::build(soup, &BuildConfig::default());
        let data = tree.flatten();

        assert_eq!(data.node_count(), tree.size());

        for (slot, node) in data.nodes.iter().enumerate() {
            if let NodeContent::Inner { left, .. } = node.content() {
                assert_eq!(left as usize, slot + 1);
            }
        }

        assert!(data.validate().is_ok());
    }
}

#[test]
fn three_triangles_make_one_leaf() {
    let tree = BvhTree::build(random_soup(11, 3, 50.), &BuildConfig::default());

    assert_eq!(tree.size(), 1);
    assert_eq!(tree.depth(), 1);
    assert_eq!(tree.node(tree.root()).triangles().len(), 3);
}

#[test]
fn empty_input() {
    let tree = BvhTree::build(Vec::new(), &BuildConfig::default());

    assert_eq!(tree.size(), 1);
    assert_eq!(*tree.bounds(), Bounds::EMPTY);

    let data = tree.flatten();

    assert_eq!(data.node_count(), 1);
    assert!(data.indices.is_empty());
    assert!(data.material_tags.is_empty());
}

#[test]
fn single_axis_spread_splits_on_that_axis() {
    let tris = (0..300)
        .map(|i| {
            let x = i as f32 * 7.5;

            Triangle::new(
                [[x, 0., 0.], [x + 1., 0., 0.], [x, 1., 1.]],
                [3 * i, 3 * i + 1, 3 * i + 2],
                [0; 3],
            )
        })
        .collect::<Vec<_>>();

    let tree = BvhTree::build(tris, &BuildConfig::default());

    let axes = tree.preorder()
        .filter_map(|(_, node)| node.axis())
        .collect::<Vec<_>>();

    assert!(!axes.is_empty());
    assert!(axes.iter().all(|&axis| axis == Axis::X));
}

#[test]
fn coincident_triangles_stay_together() {
    let tris = (0..1_000)
        .map(|i| Triangle::new(
            [[-1., -1., 0.], [1., -1., 0.], [0., 2., 0.5]],
            [3 * i, 3 * i + 1, 3 * i + 2],
            [1; 3],
        ))
        .collect::<Vec<_>>();

    let tree = BvhTree::build(tris, &BuildConfig::default());

    assert_eq!(tree.size(), 1);
    assert_eq!(tree.triangle_count(), 1_000);
}

#[test]
fn flattening_is_deterministic() {
    for soup in soups() {
        let tree = BvhTree::build(soup.clone(), &BuildConfig::default());

        let fst = tree.flatten();
        let snd = tree.flatten();

        assert_eq!(fst.node_bytes(), snd.node_bytes());
        assert_eq!(fst.index_bytes(), snd.index_bytes());
        assert_eq!(fst.material_tag_bytes(), snd.material_tag_bytes());

        // Rebuilding from the same input lands on the same buffers too
        let rebuilt = BvhTree::build(soup, &BuildConfig::default()).flatten();
        assert_eq!(fst.node_bytes(), rebuilt.node_bytes());
    }
}

#[test]
fn stack_traversal_reaches_every_leaf() {
    for soup in soups() {
        let tree = BvhTree::build(soup, &BuildConfig::default());
        let data = tree.flatten();

        let reached = data.leaves().collect::<Vec<_>>();

        assert_eq!(reached.len(), tree.leaf_count());

        // Left-first traversal visits leaves in emission order
        let mut expected_start = 0;
        for leaf in reached {
            assert_eq!(leaf.range.start, expected_start);
            expected_start = leaf.range.end;
        }

        assert_eq!(expected_start, data.indices.len());
    }
}

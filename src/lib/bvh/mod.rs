mod bounds;
mod builder;
mod data;
mod tree;

pub use bounds::Bounds;
pub use builder::{Builder, BuildStats, Split};
pub use data::{BvhData, GpuNode, LeafRange, Leaves, NodeContent};
pub use tree::{BvhNode, BvhTree, Cursor, NodeId, NodeKind, Preorder};

// All the knobs that shape construction
#[derive(Clone, Copy)]
#[derive(Debug, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct BuildConfig {
    // Nodes deeper than this always become leaves
    pub max_depth: u32,
    // Sets with fewer triangles than this always become leaves
    pub leaf_size: usize,
    // Bin count at the root, halved every level...
    pub max_bins: u32,
    // ...but never below this
    pub min_bins: u32,
    // Axes narrower than this are never split
    pub axis_eps: f32,
}

impl BuildConfig {
    pub const fn new() -> Self {
        Self {
            max_depth: 60,
            leaf_size: 4,
            max_bins: 1024,
            min_bins: 32,
            axis_eps: 1e-6,
        }
    }

    // 1024, 512, 256, ... down to the floor
    pub fn bins_at(&self, depth: u32) -> usize {
        let bins = self.max_bins
            .checked_shr(depth)
            .unwrap_or(0)
            .max(self.min_bins)
            .max(1);

        bins as usize
    }
}

impl Default for BuildConfig {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bins_halve_down_to_floor() {
        let config = BuildConfig::default();

        let bins = (0..8).map(|depth| config.bins_at(depth)).collect::<Vec<_>>();

        assert_eq!(bins, vec![1024, 512, 256, 128, 64, 32, 32, 32]);
        assert_eq!(config.bins_at(60), 32);
        assert_eq!(config.bins_at(200), 32);
    }

    #[test]
    fn partial_config_keeps_defaults() -> anyhow::Result<()> {
        let config: BuildConfig = serde_json::from_str(r#"{ "max_depth": 12 }"#)?;

        assert_eq!(config.max_depth, 12);
        assert_eq!(config.leaf_size, 4);
        assert_eq!(config.max_bins, 1024);

        Ok(())
    }
}

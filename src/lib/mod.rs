pub mod bvh;
pub mod geom;
pub mod rebuild;
pub mod scene;

// Builds and flattens a batch in one go, for callers that
// don't need the intermediate tree
pub fn compile(
    batch: &scene::SceneBatch,
    config: &bvh::BuildConfig,
) -> (bvh::BvhData, bvh::BuildStats) {
    let (tree, stats) = batch.build_with_stats(config);

    (tree.flatten(), stats)
}

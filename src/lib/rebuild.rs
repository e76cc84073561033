use std::{sync, thread};
use std::sync::atomic;

use crate::{bvh, scene};

// One finished rebuild: the buffers the renderer binds,
// plus how they came to be
#[derive(Debug, Default)]
pub struct Snapshot {
    pub generation: u64,
    pub data: bvh::BvhData,
    pub stats: bvh::BuildStats,
}

// Shared slot the worker publishes into. Readers clone the Arc,
// so a snapshot stays alive for as long as anyone still renders from it
type Published = sync::Arc<sync::RwLock<sync::Arc<Snapshot>>>;

// Rebuilds happen off the caller's thread. Each submitted batch is
// built and flattened from scratch, then swapped in whole
pub struct Rebuilder {
    sender: Option<sync::mpsc::Sender<scene::SceneBatch>>,
    handle: Option<thread::JoinHandle<()>>,
    published: Published,
    generation: sync::Arc<atomic::AtomicU64>,
}

impl Rebuilder {
    pub fn spawn(config: bvh::BuildConfig) -> anyhow::Result<Self> {
        let (sender, receiver) = sync::mpsc::channel::<scene::SceneBatch>();

        let published: Published = sync::Arc::default();
        let generation = sync::Arc::new(atomic::AtomicU64::new(0));

        let handle = thread::Builder::new()
            .name("bvh-rebuild".into())
            .spawn({
                let published = published.clone();
                let generation = generation.clone();

                move || {
                    // Exits once every sender is gone and the queue is drained
                    while let Ok(mut batch) = receiver.recv() {
                        // Only the newest pending batch is worth building
                        while let Ok(newer) = receiver.try_recv() {
                            batch = newer;
                        }

                        let (tree, stats) = batch.build_with_stats(&config);
                        let data = tree.flatten();

                        let snapshot = Snapshot {
                            generation: generation.load(atomic::Ordering::Acquire) + 1,
                            data,
                            stats,
                        };

                        log::info!(
                            "publishing bvh generation {} ({})",
                            snapshot.generation, snapshot.data,
                        );

                        let snapshot = sync::Arc::new(snapshot);

                        *published.write().unwrap_or_else(|e| e.into_inner()) = snapshot;

                        generation.fetch_add(1, atomic::Ordering::Release);
                    }
                }
            })?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
            published,
            generation,
        })
    }

    pub fn submit(&self, batch: scene::SceneBatch) -> anyhow::Result<()> {
        let Some(sender) = self.sender.as_ref() else {
            anyhow::bail!("Rebuild worker has already been stopped");
        };

        if sender.send(batch).is_err() {
            anyhow::bail!("Rebuild worker exited before the batch could be queued");
        }

        Ok(())
    }

    // The most recently published snapshot.
    // Before the first rebuild lands this is an empty, generation 0 snapshot
    pub fn current(&self) -> sync::Arc<Snapshot> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(atomic::Ordering::Acquire)
    }

    // Stops accepting batches, waits for queued work, and returns
    // whatever was published last
    pub fn finish(mut self) -> anyhow::Result<sync::Arc<Snapshot>> {
        self.stop()?;

        Ok(self.current())
    }

    fn stop(&mut self) -> anyhow::Result<()> {
        drop(self.sender.take());

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                anyhow::bail!("Rebuild worker panicked");
            }
        }

        Ok(())
    }
}

impl Drop for Rebuilder {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::error!("{}", e);
        }
    }
}

// ABOUTME: Demo that saves bursts of entity versions through a coalescing processor.
// ABOUTME: Prints each entity's write history to show coalesced, in-order saves.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use coalesce::prelude::*;

const ENTITIES: u32 = 20;
const BURSTS: u32 = 100;

/// In-memory store that refuses overlapping saves for the same id.
#[derive(Default)]
struct EntityStore {
    history: Mutex<BTreeMap<u32, Vec<u32>>>,
    saving: Mutex<HashSet<u32>>,
}

impl EntityStore {
    async fn save(&self, version: u32, id: u32) -> Result<()> {
        if !self.saving.lock().insert(id) {
            anyhow::bail!("concurrent save for entity {}", id);
        }
        let _saving = SavingGuard { store: self, id };

        let latency = 10 + (version * 7 + id * 13) % 41;
        tokio::time::sleep(Duration::from_millis(latency as u64)).await;
        self.history.lock().entry(id).or_default().push(version);
        Ok(())
    }
}

/// Clears an id's in-progress mark however the save ends.
struct SavingGuard<'a> {
    store: &'a EntityStore,
    id: u32,
}

impl Drop for SavingGuard<'_> {
    fn drop(&mut self) {
        self.store.saving.lock().remove(&self.id);
    }
}

fn load_config() -> Result<ProcessorConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config {}", path))?;
            Ok(ProcessorConfig::from_json(&raw)?)
        }
        None => Ok(ProcessorConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = load_config()?;
    let store = Arc::new(EntityStore::default());
    let sink = store.clone();
    let processor = CoalescingProcessor::with_config(
        FnOperation::new(move |version: u32, id: u32| {
            let store = sink.clone();
            async move { store.save(version, id).await }
        }),
        &config,
    )?;

    tracing::info!(entities = ENTITIES, bursts = BURSTS, "demo.start");
    for version in 0..BURSTS {
        for id in 1..=ENTITIES {
            processor.submit(version, id);
        }
        tokio::time::sleep(Duration::from_millis(3)).await;
    }

    let mut failures = 0;
    for id in 1..=ENTITIES {
        if let Err(e) = processor.submit(BURSTS, id).await {
            tracing::warn!(id, error = %e, "demo.final_save_failed");
            failures += 1;
        }
    }
    processor.drain().await;

    let submitted = (BURSTS + 1) * ENTITIES;
    let mut written = 0;
    for (id, versions) in store.history.lock().iter() {
        written += versions.len();
        println!("entity {:>2}: {} saves {:?}", id, versions.len(), versions);
        if versions.windows(2).any(|pair| pair[0] >= pair[1]) {
            anyhow::bail!("entity {} saved out of order: {:?}", id, versions);
        }
    }
    println!(
        "{} submissions, {} saves, {} failures",
        submitted, written, failures
    );
    Ok(())
}

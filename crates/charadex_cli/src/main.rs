//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `charadex_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use charadex_core::{CharacterDraft, CharacterStore, StoreResult};

fn main() {
    println!("charadex_core ping={}", charadex_core::ping());
    println!("charadex_core version={}", charadex_core::core_version());

    match store_smoke() {
        Ok(visible) => println!("charadex_core store_smoke visible={visible}"),
        Err(err) => {
            eprintln!("charadex_core store_smoke failed: {err}");
            std::process::exit(1);
        }
    }
}

/// Runs one in-memory insert through the full stack: migrations, worker
/// queue, repository, materialized view.
fn store_smoke() -> StoreResult<usize> {
    let store = CharacterStore::open_in_memory()?;
    store
        .insert(CharacterDraft {
            name: "Smoke".to_string(),
            ..CharacterDraft::default()
        })
        .wait()?;
    Ok(store.view().len())
}

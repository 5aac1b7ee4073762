use std::path::PathBuf;

use c4rag_core::config::Settings;
use c4rag_vector::store::{META_DOCUMENTS, META_EMBEDDER_ID, META_FINGERPRINT, META_PASSAGES};
use c4rag_vector::PassageStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let root = match std::env::args().nth(1) {
        Some(dir) => PathBuf::from(dir),
        None => Settings::load()?.store_dir(),
    };
    let store = PassageStore::open(&root).await?;
    println!("store: {}", root.display());
    println!("dimension: {}", store.dim());
    for key in [META_EMBEDDER_ID, META_FINGERPRINT, META_DOCUMENTS, META_PASSAGES] {
        println!("{}: {}", key, store.get_meta(key).await?.unwrap_or_else(|| "-".into()));
    }
    println!("rows: {}", store.count_passages().await?);
    Ok(())
}

use c4rag_core::config::Settings;
use c4rag_embed::build_embedder;

fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    let embedder = build_embedder(&settings.embedding)?;
    let texts = vec!["hello world".to_string(), "rust embeddings".to_string()];
    let embs = embedder.embed_batch(&texts)?;
    println!("id={} B={} dim={}", embedder.embedder_id(), embs.len(), embedder.dim());
    Ok(())
}

use recom_core::config::ModelSettings;
use recom_embed::get_default_embedder;

fn main() -> anyhow::Result<()> {
    let embedder = get_default_embedder(&ModelSettings::default())?;
    let texts = vec!["red running shoe".to_string(), "cotton shirt".to_string()];
    let embs = embedder.embed_batch(&texts)?;
    println!("model={} B={} dim={}", embedder.model_id(), embs.len(), embedder.dim());
    Ok(())
}

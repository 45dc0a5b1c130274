//! Maintenance commands that live outside the serving path.

use std::path::Path;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::AsyncWriteExt;

/// The artifacts the local embedder needs, fetched by `model download`.
const ARTIFACTS: &[(&str, &str)] = &[
    (
        "model.onnx",
        "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/onnx/model.onnx",
    ),
    (
        "tokenizer.json",
        "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/tokenizer.json",
    ),
];

/// Fetch the embedding model and tokenizer into the cache directory.
/// Artifacts already on disk are left alone.
pub async fn model_download(config: &crate::config::EmbeddingConfig) -> Result<()> {
    let target_dir = crate::config::expand_tilde(&config.cache_dir);
    std::fs::create_dir_all(&target_dir)
        .with_context(|| format!("cannot create {}", target_dir.display()))?;

    let client = reqwest::Client::new();
    for (name, url) in ARTIFACTS {
        let dest = target_dir.join(name);
        if dest.exists() {
            println!("{name} already present, skipping");
            continue;
        }
        fetch_artifact(&client, url, &dest, name).await?;
        println!("{name} saved to {}", dest.display());
    }

    Ok(())
}

/// Stream one artifact to disk. Bytes land in a `.part` file that is renamed
/// into place only when the body is fully read, so an interrupted download
/// never leaves a truncated model where the embedder would load it.
async fn fetch_artifact(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    label: &str,
) -> Result<()> {
    let mut response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("request for {label} failed"))?;
    if !response.status().is_success() {
        bail!("{label}: server answered {}", response.status());
    }

    let bar = progress_bar(label, response.content_length());

    let partial = dest.with_extension("part");
    let mut file = tokio::fs::File::create(&partial)
        .await
        .with_context(|| format!("cannot create {}", partial.display()))?;

    while let Some(chunk) = response
        .chunk()
        .await
        .with_context(|| format!("{label} download interrupted"))?
    {
        file.write_all(&chunk)
            .await
            .with_context(|| format!("cannot write {}", partial.display()))?;
        bar.inc(chunk.len() as u64);
    }

    file.flush().await?;
    drop(file);
    tokio::fs::rename(&partial, dest)
        .await
        .with_context(|| format!("cannot move {label} into place"))?;

    bar.finish_and_clear();
    Ok(())
}

fn progress_bar(label: &str, total_bytes: Option<u64>) -> ProgressBar {
    match total_bytes {
        Some(total) => {
            let bar = ProgressBar::new(total);
            bar.set_style(
                ProgressStyle::with_template("{msg:>15} {wide_bar} {bytes}/{total_bytes}")
                    .expect("static template"),
            );
            bar.set_message(label.to_string());
            bar
        }
        None => ProgressBar::new_spinner().with_message(label.to_string()),
    }
}

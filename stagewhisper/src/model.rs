//! Local cache of ggml whisper models, filled from Hugging Face on demand.

use std::io::Write;
use std::path::{Path, PathBuf};

use futures_util::{Stream, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::config::Model;
use crate::error::{Error, Result};

const HUGGINGFACE_BASE: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Anything smaller is an HTML error page, not a model.
const MIN_MODEL_BYTES: u64 = 1_000_000;

/// Where `model` lives inside `cache_dir`.
pub fn cached_model_path(model: Model, cache_dir: &Path) -> PathBuf {
    cache_dir.join(model.filename())
}

/// Ensure a model is available locally, downloading it if necessary.
/// Returns the path to the model file.
pub async fn ensure_model(model: Model, cache_dir: &Path) -> Result<PathBuf> {
    let model_path = cached_model_path(model, cache_dir);
    if model_path.is_file() {
        info!(%model, path = %model_path.display(), "model already cached");
        return Ok(model_path);
    }

    std::fs::create_dir_all(cache_dir).map_err(|e| {
        Error::Model(format!(
            "failed to create cache dir {}: {e}",
            cache_dir.display()
        ))
    })?;

    let url = format!("{HUGGINGFACE_BASE}/{}", model.filename());
    info!(%model, %url, "downloading model");
    download_model(&url, &model_path).await?;

    Ok(model_path)
}

async fn download_model(url: &str, dest: &Path) -> Result<()> {
    let response = reqwest::Client::new()
        .get(url)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| Error::ModelDownload(format!("HTTP error: {e}")))?;

    let total_size = response.content_length().unwrap_or(0);

    let pb = ProgressBar::new(total_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
            .expect("valid template")
            .progress_chars("#>-"),
    );
    pb.set_message(format!(
        "Downloading {}",
        dest.file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default()
    ));

    // Only complete downloads are renamed to the cached name.
    let tmp_path = part_path(dest);
    if let Err(e) = save_part(response.bytes_stream(), &tmp_path, &pb).await {
        pb.abandon_with_message("Download failed");
        return Err(e);
    }

    let file_size = std::fs::metadata(&tmp_path)?.len();
    if file_size < MIN_MODEL_BYTES {
        std::fs::remove_file(&tmp_path).ok();
        pb.abandon_with_message("Download failed");
        return Err(Error::ModelDownload(format!(
            "downloaded file too small ({file_size} bytes), likely an error page"
        )));
    }

    std::fs::rename(&tmp_path, dest)?;
    pb.finish_with_message("Download complete");

    if total_size > 0 && file_size != total_size {
        warn!(
            expected = total_size,
            actual = file_size,
            "file size mismatch, model may be corrupt"
        );
    }

    info!(path = %dest.display(), size = file_size, "model saved");
    Ok(())
}

fn part_path(dest: &Path) -> PathBuf {
    dest.with_extension("bin.part")
}

/// Stream into `path`; on failure the partial file is removed.
async fn save_part<S, B, E>(stream: S, path: &Path, pb: &ProgressBar) -> Result<()>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    Error: From<E>,
{
    let result = write_stream(stream, path, pb).await;
    if result.is_err() {
        std::fs::remove_file(path).ok();
    }
    result
}

async fn write_stream<S, B, E>(mut stream: S, path: &Path, pb: &ProgressBar) -> Result<()>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    Error: From<E>,
{
    let mut file = std::fs::File::create(path)?;
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let bytes = chunk.as_ref();
        file.write_all(bytes)?;
        downloaded += bytes.len() as u64;
        pb.set_position(downloaded);
    }
    file.flush()?;
    Ok(())
}

/// List all cached model files, sorted by name.
pub fn list_cached_models(cache_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(cache_dir) else {
        return Vec::new();
    };

    let mut models: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "bin"))
        .collect();
    models.sort();
    models
}

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Wrap `audio` into a deflated zip at `archive` with a single entry named by its base name
pub async fn package(audio: &Path, archive: &Path) -> Result<PathBuf> {
    let audio = audio.to_path_buf();
    let archive = archive.to_path_buf();

    tokio::task::spawn_blocking(move || write_archive(&audio, &archive).map(|_| archive))
        .await
        .context("Archive task panicked")?
}

fn write_archive(audio: &Path, archive: &Path) -> Result<()> {
    let entry_name = audio
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("No file name in {}", audio.display()))?;

    let mut source = fs_err::File::open(audio)?;
    let target = fs_err::File::create(archive)?;

    // Fixed timestamp so identical input yields an identical entry
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut zip = ZipWriter::new(target);
    zip.start_file(entry_name.as_str(), options)
        .with_context(|| format!("Failed to add {} to archive", entry_name))?;
    std::io::copy(&mut source, &mut zip)?;
    zip.finish().context("Failed to finish archive")?;

    tracing::debug!("Packaged {} into {}", audio.display(), archive.display());
    Ok(())
}

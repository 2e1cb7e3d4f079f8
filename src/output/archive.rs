use anyhow::{Context, Result};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Sidecar files yt-dlp writes next to `{id}.mp4`, archived when present
pub const SIDECAR_EXTENSIONS: &[&str] = &["info.json", "description", "jpg", "webp"];

/// Files that go into the archive of `video_id`: the video and whichever sidecars exist
pub fn archive_members(dir: &Path, video_id: &str) -> Vec<PathBuf> {
    std::iter::once(format!("{}.mp4", video_id))
        .chain(
            SIDECAR_EXTENSIONS
                .iter()
                .map(|ext| format!("{}.{}", video_id, ext)),
        )
        .map(|name| dir.join(name))
        .filter(|path| path.is_file())
        .collect()
}

/// Zip the video and its sidecars from `dir` into `dest` (deflate).
///
/// Returns the number of files archived. Fails when the video itself is missing.
pub async fn build_archive(dir: &Path, video_id: &str, dest: &Path) -> Result<usize> {
    let members = archive_members(dir, video_id);
    if !members.iter().any(|p| p.extension().is_some_and(|e| e == "mp4")) {
        anyhow::bail!("No video file to archive for {} in {}", video_id, dir.display());
    }

    let dest = dest.to_path_buf();
    let count = members.len();

    tokio::task::spawn_blocking(move || write_zip(&members, &dest))
        .await
        .context("Archive task panicked")??;

    tracing::info!("Archived {} file(s) for {}", count, video_id);
    Ok(count)
}

fn write_zip(members: &[PathBuf], dest: &Path) -> Result<()> {
    let file = fs_err::File::create(dest).context("Failed to create archive")?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(true);

    for path in members {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Invalid file name: {}", path.display()))?;

        zip.start_file(name, options)
            .with_context(|| format!("Failed to add {} to archive", name))?;
        let mut reader = BufReader::new(fs_err::File::open(path)?);
        std::io::copy(&mut reader, &mut zip)
            .with_context(|| format!("Failed to compress {}", name))?;
    }

    zip.finish().context("Failed to finish archive")?;
    Ok(())
}

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use log::info;
use tokio::fs;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::{error::Result, tree::FileTree, types::ArchiveEntry};

/// File name of the downloadable project export
pub const ARCHIVE_FILE_NAME: &str = "project-files.zip";

/// Build a deflate-compressed zip archive in memory
pub fn build_zip(entries: &[ArchiveEntry]) -> Result<Bytes> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in entries {
        writer.start_file(entry.path.as_str(), options)?;
        writer.write_all(entry.content.as_bytes())?;
    }

    let cursor = writer.finish()?;
    Ok(Bytes::from(cursor.into_inner()))
}

/// Export every file in `tree` to `<dir>/project-files.zip`
///
/// Creates `dir` if needed and returns the path of the written archive.
pub async fn write_archive(tree: &FileTree, dir: &Path) -> Result<PathBuf> {
    let entries = tree.flatten_to_archive();
    let data = build_zip(&entries)?;

    fs::create_dir_all(dir).await?;
    let path = dir.join(ARCHIVE_FILE_NAME);
    fs::write(&path, &data).await?;

    info!(
        "exported {} files ({} bytes) to {}",
        entries.len(),
        data.len(),
        path.display()
    );
    Ok(path)
}

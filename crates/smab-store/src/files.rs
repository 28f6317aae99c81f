//! Container files on disk.
//!
//! Writes go to a sibling `<name>.tmp`, are flushed and synced, then renamed
//! over the final path. A crash leaves either the old file or the new one
//! under the real name, never a partial write.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use smab_format::{Container, FormatError, DEFAULT_MAX_SECTION_LEN};

use crate::error::Result;

/// Fixed bytes around the two length-prefixed sections.
const FRAME_OVERHEAD: u64 = 4 + 1 + 4 + 12 + 16 + 4;

/// Atomically replace `path` with `bytes`.
pub fn write_container_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = temp_path(path);
    if let Err(e) = write_synced(&tmp_path, bytes) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    if let Some(parent) = path.parent() {
        fsync_directory(parent);
    }
    tracing::debug!(path = %path.display(), len = bytes.len(), "wrote container file");
    Ok(())
}

/// Encode `container` and write it atomically.
pub fn write_container(path: &Path, container: &Container) -> Result<()> {
    write_container_file(path, &container.encode()?)
}

/// Read and parse a container, bounding each section by `max_section_len`.
///
/// The header signature is not verified here.
pub fn read_container_file(path: &Path, max_section_len: usize) -> Result<Container> {
    let len = fs::metadata(path)?.len();
    let max_file = FRAME_OVERHEAD.saturating_add((max_section_len as u64).saturating_mul(2));
    if len > max_file {
        return Err(FormatError::TooLarge {
            what: "container file",
            len: len as usize,
            max: max_file as usize,
        }
        .into());
    }

    let bytes = fs::read(path)?;
    Ok(Container::decode_with_limit(&bytes, max_section_len)?)
}

/// Read with the default section bound.
pub fn read_container(path: &Path) -> Result<Container> {
    read_container_file(path, DEFAULT_MAX_SECTION_LEN)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(bytes)?;
    file.flush()?;
    file.sync_all()?;
    Ok(())
}

fn fsync_directory(path: &Path) {
    let dir = if path.as_os_str().is_empty() {
        Path::new(".")
    } else {
        path
    };
    if let Ok(handle) = File::open(dir) {
        let _ = handle.sync_all();
    }
}

//! Durable file copy

use crate::types::FsakError;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

const COPY_BUFFER: usize = 128 * 1024;
const PART_SUFFIX: &str = "fsak-part";
const MAX_PART_ATTEMPTS: u32 = 1000;

/// Copy a file using write-then-rename
///
/// 1. Stream into a fresh hidden sibling `.<name>.<pid>.<n>.fsak-part`
/// 2. `sync_all` so the bytes are on disk
/// 3. Carry over permissions and mtime
/// 4. Rename onto `dest`
///
/// The temp file is created exclusively, so no existing file is ever
/// truncated or renamed away. It is removed if any later step fails, so
/// `dest` either holds the complete content or is left as it was.
///
/// # Returns
/// * `Ok(u64)` - Number of bytes copied
///
/// # Example
/// ```no_run
/// use fsak::executor::copy_file_atomic;
/// use std::path::Path;
///
/// let bytes = copy_file_atomic(Path::new("source.txt"), Path::new("dest.txt"))?;
/// # Ok::<(), fsak::types::FsakError>(())
/// ```
pub fn copy_file_atomic(src: &Path, dest: &Path) -> Result<u64, FsakError> {
    let mut src_file = File::open(src).map_err(|e| FsakError::path_io(src, e))?;
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| FsakError::path_io(parent, e))?;
    }

    let (part_path, part_file) = create_part_file(dest)?;
    let outcome = write_part(src, &mut src_file, &part_path, part_file).and_then(|bytes| {
        fs::rename(&part_path, dest)
            .map(|()| bytes)
            .map_err(|e| FsakError::path_io(dest, e))
    });
    if outcome.is_err() {
        discard_part(&part_path);
    }
    outcome
}

/// Create a temp sibling of `dest` that did not exist before
fn create_part_file(dest: &Path) -> Result<(PathBuf, File), FsakError> {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "copy".to_string());
    let pid = std::process::id();

    for attempt in 0..MAX_PART_ATTEMPTS {
        let part_path = dest.with_file_name(format!(".{name}.{pid}.{attempt}.{PART_SUFFIX}"));
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&part_path)
        {
            Ok(file) => return Ok((part_path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(FsakError::path_io(&part_path, e)),
        }
    }

    Err(FsakError::path_io(
        dest,
        std::io::Error::new(
            ErrorKind::AlreadyExists,
            "no free temporary name next to the destination",
        ),
    ))
}

fn discard_part(part_path: &Path) {
    if let Err(e) = fs::remove_file(part_path) {
        if e.kind() != ErrorKind::NotFound {
            warn!(
                "Could not remove temporary file {}: {}",
                part_path.display(),
                e
            );
        }
    }
}

fn write_part(
    src: &Path,
    src_file: &mut File,
    part_path: &Path,
    mut part_file: File,
) -> Result<u64, FsakError> {
    let mut buffer = vec![0u8; COPY_BUFFER];
    let mut total_bytes = 0u64;

    loop {
        let bytes_read = match src_file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(FsakError::path_io(src, e)),
        };

        part_file
            .write_all(&buffer[..bytes_read])
            .map_err(|e| FsakError::path_io(part_path, e))?;
        total_bytes += bytes_read as u64;
    }

    part_file
        .sync_all()
        .map_err(|e| FsakError::path_io(part_path, e))?;
    // Close before rename (required on Windows)
    drop(part_file);

    let metadata = src_file
        .metadata()
        .map_err(|e| FsakError::path_io(src, e))?;
    fs::set_permissions(part_path, metadata.permissions())
        .map_err(|e| FsakError::path_io(part_path, e))?;
    let mtime = metadata.modified().map_err(|e| FsakError::path_io(src, e))?;
    filetime::set_file_mtime(part_path, filetime::FileTime::from_system_time(mtime))
        .map_err(|e| FsakError::path_io(part_path, e))?;

    Ok(total_bytes)
}

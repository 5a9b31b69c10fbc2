//! Fingerprint engine: MD5 + BLAKE3 from a single pass over the file

use crate::types::{Fingerprint, FsakError};
use md5::{Digest, Md5};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

const READ_CHUNK: usize = 64 * 1024;

/// Compute the fingerprint of a file
///
/// The file is streamed once in 64KB chunks and every chunk feeds both the
/// MD5 and the BLAKE3 accumulator, so the bytes are never read twice.
///
/// # Errors
/// * `FsakError::PathIo` if the file cannot be opened or a read fails
///   partway; nothing is returned for a partial read.
///
/// # Example
/// ```no_run
/// use fsak::hash::fingerprint_file;
/// use std::path::Path;
///
/// let fp = fingerprint_file(Path::new("file.txt"))?;
/// println!("{} {}", fp.legacy, fp.strong);
/// # Ok::<(), fsak::types::FsakError>(())
/// ```
pub fn fingerprint_file(file_path: &Path) -> Result<Fingerprint, FsakError> {
    let mut file = File::open(file_path).map_err(|e| FsakError::path_io(file_path, e))?;

    let mut legacy = Md5::new();
    let mut strong = blake3::Hasher::new();
    let mut buffer = vec![0u8; READ_CHUNK];

    loop {
        let bytes_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(FsakError::path_io(file_path, e)),
        };

        legacy.update(&buffer[..bytes_read]);
        strong.update(&buffer[..bytes_read]);
    }

    Ok(Fingerprint {
        legacy: format!("{:x}", legacy.finalize()),
        strong: strong.finalize().to_hex().to_string(),
    })
}

/// Fingerprint of an in-memory buffer
pub fn fingerprint_bytes(data: &[u8]) -> Fingerprint {
    Fingerprint {
        legacy: format!("{:x}", Md5::digest(data)),
        strong: blake3::hash(data).to_hex().to_string(),
    }
}

/// Catalog key for an absolute path: BLAKE3 hex of the path's raw bytes
///
/// Identical to hashing the path string whenever the path is valid UTF-8.
pub fn path_key(path: &Path) -> String {
    blake3::hash(path.as_os_str().as_encoded_bytes())
        .to_hex()
        .to_string()
}

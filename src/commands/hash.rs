//! `fsak hash <file>`

use crate::hash::fingerprint_file;
use crate::types::{Fingerprint, FsakError};
use std::path::Path;

pub fn format_fingerprint(fingerprint: &Fingerprint) -> String {
    format!("MD5:    {}\nBLAKE3: {}", fingerprint.legacy, fingerprint.strong)
}

/// Print both digests of `file`, read once
pub fn run(file: &Path) -> Result<(), FsakError> {
    let fingerprint = fingerprint_file(file)?;
    println!("{}", format_fingerprint(&fingerprint));
    Ok(())
}

use crate::ipf::{self, IpfArchive};
use anyhow::{Context, Result};
use memmap2::MmapMut;
use std::fs::OpenOptions;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Decrypt,
    Encrypt,
}

/// Rewrites the archive in place, running the cipher over every non-clear,
/// non-empty entry payload. Any per-entry failure aborts before the flush:
/// a half-ciphered archive must not be made durable. The mapping is flushed
/// once, after the last entry.
pub fn recrypt_archive(path: &Path, direction: Direction, quiet: bool) -> Result<()> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .with_context(|| format!("cannot open '{}'", path.display()))?;
    let mut map = unsafe { MmapMut::map_mut(&file) }
        .with_context(|| format!("cannot map '{}'", path.display()))?;

    let archive = IpfArchive::parse(&map)
        .with_context(|| format!("cannot read '{}'", path.display()))?;

    let mut touched = 0usize;
    for entry in archive.entries() {
        if entry.is_stored_in_clear() || entry.is_empty() {
            continue;
        }

        let payload = &mut map[entry.range()];
        match direction {
            Direction::Decrypt => ipf::decrypt(payload),
            Direction::Encrypt => ipf::encrypt(payload),
        }
        .with_context(|| {
            format!(
                "re-ciphering '{}' from '{}'",
                entry.filename(),
                entry.archive_name()
            )
        })?;
        touched += 1;
    }

    map.flush()
        .with_context(|| format!("cannot flush '{}'", path.display()))?;

    if !quiet {
        println!(
            "rewrote {touched} of {} entries in '{}'",
            archive.len(),
            path.display()
        );
    }

    Ok(())
}

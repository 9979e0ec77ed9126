use crate::ies::IesTable;
use crate::ipf::{IpfArchive, IpfEntry, IpfError};
use anyhow::{bail, Context, Result};
use flate2::read::ZlibDecoder;
use globset::GlobSet;
use md5::{Digest, Md5};
use std::fs::{self, File};
use std::io::{BufWriter, Read};
use std::path::{Path, PathBuf};

// Only these are decompressed and written out as-is; everything else gets a
// digest placeholder. jpg is also in the clear set, so it skips the inflate
// step and lands on disk raw.
const INTERESTING_EXTENSIONS: &[&str] = &["xml", "ies", "jpg", "png", "tga", "lua"];

fn worth_decompress(entry: &IpfEntry) -> bool {
    INTERESTING_EXTENSIONS
        .iter()
        .any(|ext| entry.has_extension(ext))
}

/// Unpacks archive entries into a directory tree. Extraction operates on the
/// payload bytes as stored: run the decrypt action first on an encrypted
/// archive.
pub struct Extractor {
    output_root: PathBuf,
    filter: GlobSet,
    quiet: bool,
    // one inflate buffer reused across entries
    inflate_buf: Vec<u8>,
}

impl Extractor {
    #[must_use]
    pub fn new(output_root: PathBuf, filter: GlobSet, quiet: bool) -> Self {
        Self {
            output_root,
            filter,
            quiet,
            inflate_buf: Vec::new(),
        }
    }

    /// Processes every matching entry in directory order. Per-entry failures
    /// are reported and skipped; only a directory-level problem aborts the
    /// run.
    pub fn run(&mut self, archive: &IpfArchive, data: &[u8]) -> Result<()> {
        let mut matched = 0usize;
        for entry in archive.entries() {
            if !self.filter.is_empty() && !self.filter.is_match(entry.relative_path()) {
                continue;
            }
            matched += 1;

            if let Err(e) = self.process_entry(entry, data) {
                eprintln!(
                    "skipping '{}' from '{}': {e:#}",
                    entry.filename(),
                    entry.archive_name()
                );
            }
        }

        if matched == 0 && !self.filter.is_empty() {
            bail!("provided patterns did not match any entries");
        }

        Ok(())
    }

    fn process_entry(&mut self, entry: &IpfEntry, data: &[u8]) -> Result<()> {
        let payload = entry.payload(data);
        let target = self.entry_target(entry)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("cannot create '{}'", parent.display()))?;
        }

        if worth_decompress(entry) {
            if entry.is_stored_in_clear() {
                // jpg: interesting but never ciphered or compressed
                fs::write(&target, payload)?;
            } else {
                inflate_into(payload, entry.uncompressed_size() as usize, &mut self.inflate_buf)
                    .with_context(|| format!("cannot decompress '{}'", entry.filename()))?;

                if entry.has_extension("ies") {
                    let table = IesTable::parse(&self.inflate_buf)
                        .with_context(|| format!("cannot decode table '{}'", entry.filename()))?;
                    let mut writer = BufWriter::new(File::create(&target)?);
                    table.write_csv(&mut writer)?;
                } else {
                    fs::write(&target, &self.inflate_buf)?;
                }
            }
        } else {
            // a stable placeholder instead of the opaque payload
            let digest = format!("{:x}", Md5::digest(payload));
            fs::write(&target, digest)?;
        }

        if !self.quiet {
            println!("extracted '{}'", entry.relative_path());
        }

        Ok(())
    }

    // `<output root>/<archive name>/<entry dirname>/<entry basename>`,
    // rejecting components that would escape the root.
    fn entry_target(&self, entry: &IpfEntry) -> Result<PathBuf> {
        let relative = entry.relative_path();
        let mut target = self.output_root.clone();
        for component in relative.split('/').filter(|c| !c.is_empty()) {
            if component == ".." {
                bail!("entry path '{relative}' escapes the output directory");
            }
            target.push(component);
        }
        Ok(target)
    }
}

/// Inflates one zlib stream into `dst`, reusing its allocation.
fn inflate_into(src: &[u8], expected_len: usize, dst: &mut Vec<u8>) -> Result<(), IpfError> {
    dst.clear();
    dst.reserve(expected_len);
    ZlibDecoder::new(src)
        .read_to_end(dst)
        .map_err(IpfError::DecompressFailed)?;
    Ok(())
}

/// Extracts `path` into `output_root`, or a directory derived from the
/// archive's stem when no root is given.
pub fn extract_archive(
    path: &Path,
    output_root: Option<PathBuf>,
    filter: GlobSet,
    quiet: bool,
) -> Result<()> {
    let output_root = match output_root {
        Some(root) => root,
        None => crate::archive_output_dir(path)
            .with_context(|| format!("cannot derive an output directory from '{}'", path.display()))?,
    };

    let file = File::open(path).with_context(|| format!("cannot open '{}'", path.display()))?;
    let map = unsafe { memmap2::Mmap::map(&file) }
        .with_context(|| format!("cannot map '{}'", path.display()))?;
    let archive = IpfArchive::parse(&map)
        .with_context(|| format!("cannot read '{}'", path.display()))?;

    if !quiet {
        println!(
            "processing '{}' ({} entries) into '{}'",
            path.display(),
            archive.len(),
            output_root.display()
        );
    }

    Extractor::new(output_root, filter, quiet).run(&archive, &map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipf::testutil::{build_archive, TestEntry};
    use globset::{Glob, GlobSetBuilder};

    fn run_extract(data: &[u8], root: &Path, filter: GlobSet) -> Result<()> {
        let archive = IpfArchive::parse(data).unwrap();
        Extractor::new(root.to_path_buf(), filter, true).run(&archive, data)
    }

    #[test]
    fn interesting_entries_are_inflated_and_written() {
        let data = build_archive(
            "a.ipf",
            &[TestEntry::compressed("sub\\dir\\hello.xml", b"hello")],
        );
        let dir = tempfile::tempdir().unwrap();

        run_extract(&data, dir.path(), GlobSet::empty()).unwrap();

        let written = fs::read(dir.path().join("a.ipf/sub/dir/hello.xml")).unwrap();
        assert_eq!(written, b"hello");
    }

    #[test]
    fn opaque_entries_become_md5_placeholders() {
        let data = build_archive("a.ipf", &[TestEntry::stored("readme.txt", b"hello")]);
        let dir = tempfile::tempdir().unwrap();

        run_extract(&data, dir.path(), GlobSet::empty()).unwrap();

        let written = fs::read_to_string(dir.path().join("a.ipf/readme.txt")).unwrap();
        assert_eq!(written.len(), 32);
        assert_eq!(written, "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn jpg_entries_are_written_raw() {
        let payload = b"\xff\xd8\xff\xe0 not really a jpeg";
        let data = build_archive("a.ipf", &[TestEntry::stored("img\\pic.jpg", payload)]);
        let dir = tempfile::tempdir().unwrap();

        run_extract(&data, dir.path(), GlobSet::empty()).unwrap();

        let written = fs::read(dir.path().join("a.ipf/img/pic.jpg")).unwrap();
        assert_eq!(written, payload);
    }

    #[test]
    fn a_bad_entry_does_not_stop_the_others() {
        // not a zlib stream, but claims an interesting extension
        let data = build_archive(
            "a.ipf",
            &[
                TestEntry::stored("broken.xml", b"\x00\x01\x02"),
                TestEntry::compressed("ok.xml", b"fine"),
            ],
        );
        let dir = tempfile::tempdir().unwrap();

        run_extract(&data, dir.path(), GlobSet::empty()).unwrap();

        assert!(!dir.path().join("a.ipf/broken.xml").exists());
        assert_eq!(fs::read(dir.path().join("a.ipf/ok.xml")).unwrap(), b"fine");
    }

    #[test]
    fn filters_select_entries_by_glob() {
        let data = build_archive(
            "a.ipf",
            &[
                TestEntry::compressed("keep\\one.xml", b"one"),
                TestEntry::compressed("drop\\two.xml", b"two"),
            ],
        );
        let dir = tempfile::tempdir().unwrap();

        let mut builder = GlobSetBuilder::new();
        builder.add(Glob::new("**/keep/*").unwrap());
        run_extract(&data, dir.path(), builder.build().unwrap()).unwrap();

        assert!(dir.path().join("a.ipf/keep/one.xml").exists());
        assert!(!dir.path().join("a.ipf/drop/two.xml").exists());
    }

    #[test]
    fn unmatched_filters_are_an_error() {
        let data = build_archive("a.ipf", &[TestEntry::compressed("one.xml", b"one")]);
        let dir = tempfile::tempdir().unwrap();

        let mut builder = GlobSetBuilder::new();
        builder.add(Glob::new("**/*.tga").unwrap());
        let result = run_extract(&data, dir.path(), builder.build().unwrap());

        assert!(result.is_err());
    }

    #[test]
    fn ies_entries_come_out_as_csv() {
        let table = sample_table_bytes();
        let data = build_archive("db.ipf", &[TestEntry::compressed("tables\\stats.ies", &table)]);
        let dir = tempfile::tempdir().unwrap();

        run_extract(&data, dir.path(), GlobSet::empty()).unwrap();

        let csv = fs::read_to_string(dir.path().join("db.ipf/tables/stats.ies")).unwrap();
        assert_eq!(csv, "Level,Name\n7,\"Knight\"\n");
    }

    // Same shape the table decoder tests build: one float column, one
    // string column, one row.
    fn sample_table_bytes() -> Vec<u8> {
        use byteorder::{WriteBytesExt, LE};

        fn scrambled(name: &str) -> [u8; 64] {
            let mut field = [0u8; 64];
            field[..name.len()].copy_from_slice(name.as_bytes());
            let mut out = [0u8; 64];
            for (i, b) in field.iter().enumerate() {
                out[i ^ 1] = b ^ 0x01;
            }
            out
        }

        let text = "Knight";
        let mut data = Vec::new();
        let mut name = [0u8; 64];
        name[..5].copy_from_slice(b"Stats");
        data.extend_from_slice(&name);
        data.write_u32::<LE>((4 + 2 + text.len() + 1) as u32).unwrap();
        data.write_u32::<LE>(4).unwrap();
        data.write_u32::<LE>(1).unwrap();
        data.write_u32::<LE>(1).unwrap();
        data.write_u32::<LE>(1).unwrap();
        data.extend_from_slice(&[0u8; 44]);

        for (name, kind) in [("Level", 0u16), ("Name", 1u16)] {
            data.extend_from_slice(&scrambled(name));
            data.extend_from_slice(&scrambled(&format!("{name}_2")));
            data.write_u16::<LE>(kind).unwrap();
            data.write_u16::<LE>(kind).unwrap(); // sort order
            data.write_u16::<LE>(0).unwrap();
        }

        data.write_f32::<LE>(7.0).unwrap();
        data.write_u16::<LE>(text.len() as u16).unwrap();
        data.extend_from_slice(text.as_bytes());
        data.push(0x01);

        data
    }
}

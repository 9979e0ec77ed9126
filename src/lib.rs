#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::path::{Path, PathBuf};

pub mod extract;
pub mod ies;
pub mod ipf;
pub mod recrypt;

// If the archive path has an extension, use the stem as the output directory.
// Otherwise, use the archive name with a ".d" suffix.
pub fn archive_output_dir<P: AsRef<Path>>(path: P) -> Option<PathBuf> {
    let name = path.as_ref().file_name()?;
    let stem = path.as_ref().file_stem()?;

    let mut output_dir = stem.to_owned();
    if stem == name {
        // doesn't have an extension
        output_dir.push(".d");
    }

    Some(PathBuf::from(output_dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_dir_strips_the_last_extension() {
        assert_eq!(
            archive_output_dir("some/dir/item.ipf"),
            Some(PathBuf::from("item"))
        );
        assert_eq!(
            archive_output_dir("item_hightex.v2.ipf"),
            Some(PathBuf::from("item_hightex.v2"))
        );
    }

    #[test]
    fn output_dir_for_extensionless_input_gets_a_suffix() {
        assert_eq!(
            archive_output_dir("archive"),
            Some(PathBuf::from("archive.d"))
        );
    }
}

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use globset::{GlobSet, GlobSetBuilder};
use ipf_unpacker::extract;
use ipf_unpacker::ipf::IpfArchive;
use ipf_unpacker::recrypt::{self, Direction};
use memmap2::Mmap;
use std::fs::File;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "ipf_unpacker",
    version,
    about = "A CLI tool for extracting and re-ciphering IPF archives"
)]
#[command(group(
    ArgGroup::new("action")
        .required(true)
        .args(["decrypt", "encrypt", "extract", "list"])
))]
pub struct Cli {
    #[arg(short = 'd', long, help = "Decrypt the archive in place")]
    pub decrypt: bool,

    #[arg(short = 'c', long, help = "Encrypt the archive in place")]
    pub encrypt: bool,

    #[arg(short = 'e', long, help = "Extract files to the output directory")]
    pub extract: bool,

    #[arg(short = 'l', long, help = "List the entry directory")]
    pub list: bool,

    #[arg(long, help = "Suppress informational output")]
    pub quiet: bool,

    #[arg(
        long,
        value_name = "GLOB",
        help = "Only process entries whose path matches the glob\nMay be given more than once"
    )]
    pub filter: Vec<String>,

    #[arg(help = "The IPF archive to process")]
    pub archive: PathBuf,

    #[arg(help = "Output directory for extraction\nDefaults to the archive name without its extension")]
    pub output_dir: Option<PathBuf>,
}

pub fn run(cli: Cli) -> Result<()> {
    let filter = build_filter(&cli.filter)?;

    if cli.decrypt {
        recrypt::recrypt_archive(&cli.archive, Direction::Decrypt, cli.quiet)
    } else if cli.encrypt {
        recrypt::recrypt_archive(&cli.archive, Direction::Encrypt, cli.quiet)
    } else if cli.list {
        let file = File::open(&cli.archive)
            .with_context(|| format!("cannot open '{}'", cli.archive.display()))?;
        let map = unsafe { Mmap::map(&file) }
            .with_context(|| format!("cannot map '{}'", cli.archive.display()))?;
        let archive = IpfArchive::parse(&map)
            .with_context(|| format!("cannot read '{}'", cli.archive.display()))?;
        archive.list_entries(&filter);
        Ok(())
    } else {
        extract::extract_archive(&cli.archive, cli.output_dir, filter, cli.quiet)
    }
}

fn build_filter(globs: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for glob in globs {
        builder.add(glob.parse()?);
    }
    Ok(builder.build()?)
}

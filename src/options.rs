use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "prokka2vep",
    about = "Convert a Prokka GFF3 annotation into the gene/transcript/exon layout VEP expects",
    version
)]
pub struct Args {
    /// Prokka GFF3 annotation (plain or gzipped)
    #[arg(short = 'g', long = "gff", value_name = "GFF")]
    pub gff: PathBuf,

    /// Output GFF3 path
    #[arg(short = 'o', long = "out", value_name = "GFF")]
    pub out: PathBuf,

    /// Set logging level to WARN
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

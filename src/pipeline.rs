//! The conversion as a whole: parsing, transcript synthesis, merging and
//! reordering, and the non-coding RNA adaptation, run in that order.

use crate::issues::Diagnostics;
use crate::ncrna::adapt_ncrna;
use crate::ordering::{merge_tables, reorder};
use crate::parser::parse_records;
use crate::reader::GffColumns;
use crate::record::Record;
use crate::synthesizer::synthesize_transcripts;
use crate::writer::{records_to_df, write_gff};
use anyhow::bail;
use polars::prelude::DataFrame;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Runs the three transforming stages over parsed records.
pub fn convert_records(
    records: Vec<Record>,
    diag: &mut Diagnostics,
) -> anyhow::Result<Vec<Record>> {
    let start = Instant::now();
    let synthesized = synthesize_transcripts(records, diag);
    let duration: Duration = start.elapsed();
    debug!("created transcripts in {:?}", duration);

    let start = Instant::now();
    let merged = merge_tables(synthesized.records, synthesized.transcripts);
    let ordered = reorder(merged, diag)?;
    let duration: Duration = start.elapsed();
    debug!("merged and reordered in {:?}", duration);

    let start = Instant::now();
    let adapted = adapt_ncrna(ordered);
    let duration: Duration = start.elapsed();
    debug!("adapted ncRNA in {:?}", duration);

    Ok(adapted)
}

/// Converts a nine column GFF3 data frame, as produced by
/// [GffColumns::into_df], into its VEP-ready counterpart.
///
/// Returns the converted data frame together with the warnings raised on the way.
pub fn convert_df(df: &DataFrame) -> anyhow::Result<(DataFrame, Diagnostics)> {
    let mut diag = Diagnostics::new();
    let records = parse_records(df, &mut diag)?;
    let converted = convert_records(records, &mut diag)?;
    let out = records_to_df(&converted)?;
    Ok((out, diag))
}

/// Reads the Prokka GFF3 file at `input`, converts it and writes the result to
/// `output`.
///
/// # Arguments
///
/// * `input`: the Prokka GFF3 file, plain or gzipped.
/// * `output`: where the converted GFF3 is written. Missing parent folders are
///   created.
///
/// # Returns
///
/// The [Diagnostics] collected over the run. The warnings in it were already
/// logged; an empty report means the input converted cleanly.
///
/// # Errors
///
/// Fails if the two paths are the same, if the input can not be read or holds
/// invalid coordinates, if the parent references form a cycle, or if the
/// output can not be written.
///
/// # Examples
///
/// ```rust,no_run
/// # fn main() -> anyhow::Result<()> {
/// let diag = prokka2vep::run("PROKKA_01012024.gff", "vep/PROKKA_01012024.gff")?;
/// println!("{} warnings", diag.len());
/// # Ok(())
/// # }
/// ```
pub fn run<T: AsRef<Path>, U: AsRef<Path>>(input: T, output: U) -> anyhow::Result<Diagnostics> {
    let input = input.as_ref();
    let output = output.as_ref();
    if input == output {
        bail!(
            "The input and output paths are the same ({:?}); refusing to overwrite the input.",
            input
        );
    }

    let start = Instant::now();
    let gc = GffColumns::from_gff(input)?;
    let (df, directives) = gc.into_df()?;
    let duration: Duration = start.elapsed();
    debug!("read the GFF file in {:?}", duration);

    let (mut out, diag) = convert_df(&df)?;
    write_gff(&mut out, &directives, output)?;

    info!("GFF conversion is done.");
    Ok(diag)
}

use crate::gff_utils::GFFFIELDS;
use crate::record::Record;
use anyhow::Context;
use polars::prelude::*;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

const GFF_VERSION_LINE: &str = "##gff-version 3";

/// Lays the records out as the nine GFF3 columns, in the order given.
pub fn records_to_df(records: &[Record]) -> anyhow::Result<DataFrame> {
    let n = records.len();
    let mut seqid = Vec::with_capacity(n);
    let mut source = Vec::with_capacity(n);
    let mut feature_type = Vec::with_capacity(n);
    let mut start = Vec::with_capacity(n);
    let mut end = Vec::with_capacity(n);
    let mut score = Vec::with_capacity(n);
    let mut strand = Vec::with_capacity(n);
    let mut phase = Vec::with_capacity(n);
    let mut attributes = Vec::with_capacity(n);

    for r in records {
        seqid.push(r.seq_region.as_str());
        source.push(r.source.as_str());
        feature_type.push(r.feature_type.as_gff_type());
        start.push(r.start);
        end.push(r.end);
        score.push(r.score.as_str());
        strand.push(r.strand.to_string());
        phase.push(r.phase.as_str());
        attributes.push(r.attributes.to_gff_string());
    }

    let df = DataFrame::new(vec![
        Series::new(GFFFIELDS[0], seqid),
        Series::new(GFFFIELDS[1], source),
        Series::new(GFFFIELDS[2], feature_type),
        Series::new(GFFFIELDS[3], start),
        Series::new(GFFFIELDS[4], end),
        Series::new(GFFFIELDS[5], score),
        Series::new(GFFFIELDS[6], strand),
        Series::new(GFFFIELDS[7], phase),
        Series::new(GFFFIELDS[8], attributes),
    ])?;
    Ok(df)
}

/// Writes a GFF3 data frame to `w`: the version line, then the given
/// directives, then one tab separated line per row.
pub fn write_gff_to<W: Write>(
    w: &mut W,
    df: &mut DataFrame,
    directives: &[String],
) -> anyhow::Result<()> {
    writeln!(w, "{}", GFF_VERSION_LINE)?;
    for d in directives {
        writeln!(w, "{}", d)?;
    }
    CsvWriter::new(w)
        .include_header(false)
        .with_separator(b'\t')
        .with_quote_style(QuoteStyle::Never)
        .finish(df)?;
    Ok(())
}

/// Writes a GFF3 data frame to `file_path`, creating its parent folder if needed.
pub fn write_gff<T: AsRef<Path>>(
    df: &mut DataFrame,
    directives: &[String],
    file_path: T,
) -> anyhow::Result<()> {
    let file_path = file_path.as_ref();
    info!("Writing GFF file to {:?}", file_path.as_os_str());

    // create the folder if it doesn't exist
    fs::create_dir_all(file_path.parent().with_context(|| {
        format!(
            "Could not get the parent directory of the given output file path {:?}",
            file_path.as_os_str()
        )
    })?)?;

    let file = fs::File::create(file_path)
        .with_context(|| format!("Could not create the output file {:?}", file_path))?;
    let mut file = BufWriter::with_capacity(4194304, file);
    write_gff_to(&mut file, df, directives)?;
    file.flush()?;

    Ok(())
}

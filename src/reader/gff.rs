use crate::gff_utils::{get_reader_from_path, FASTA_DIRECTIVE, GFFFIELDS, MISSING_VALUE};
use anyhow::Context;
use noodles::core::Position;
use noodles::gff;
use polars::prelude::*;
use std::io::BufRead;
use std::path::Path;
use tracing::{info, warn};

const GFF_VERSION_DIRECTIVE: &str = "##gff-version";

fn or_missing(s: &str) -> String {
    if s.is_empty() {
        MISSING_VALUE.to_string()
    } else {
        s.to_string()
    }
}

/// The raw columns of a GFF3 file, one vector per column.
///
/// This is the row-oriented table the conversion pipeline consumes, kept in
/// columnar vectors until it is turned into a polars [DataFrame]. Every column
/// except `start` and `end` is kept verbatim; in particular the attribute
/// column is not decoded here, that is the record parser's job.
///
/// # Fields
///
/// * `seqid`: the sequence region (contig) names.
/// * `source`: the annotation tool names, e.g. `Prokka` or `prodigal:002006`.
/// * `feature_type`: the raw feature types, e.g. `gene`, `CDS`, `tRNA`.
/// * `start`, `end`: 1-based inclusive coordinates.
/// * `score`, `strand`, `phase`: the raw column values, `.` when empty.
/// * `attributes`: the undecoded `key=value;...` attribute strings.
/// * `directives`: header directives (`##...` lines) other than `##gff-version`
///   and `##FASTA`, in file order, so they can be echoed into the output.
#[derive(Clone, Default)]
pub struct GffColumns {
    pub seqid: Vec<String>,
    pub source: Vec<String>,
    pub feature_type: Vec<String>,
    pub start: Vec<i64>,
    pub end: Vec<i64>,
    pub score: Vec<String>,
    pub strand: Vec<String>,
    pub phase: Vec<String>,
    pub attributes: Vec<String>,
    pub directives: Vec<String>,
}

impl GffColumns {
    /// Reads the feature rows of a (possibly gzipped) GFF3 file.
    ///
    /// Comment and directive lines are skipped (directives are remembered),
    /// and everything from the `##FASTA` directive or the first `>` line on is
    /// ignored. Lines with fewer than nine tab-separated columns are skipped
    /// with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read, or if a start or
    /// end column is not an integer.
    pub fn from_gff<T: AsRef<Path>>(file_path: T) -> anyhow::Result<GffColumns> {
        let file_path = file_path.as_ref();
        let rdr = get_reader_from_path(file_path)
            .with_context(|| format!("Could not open the GFF file {:?}", file_path))?;
        let mut gc = GffColumns::default();
        gc._from_reader(rdr)?;
        Ok(gc)
    }

    /// Reads the feature rows from any buffered reader. See [GffColumns::from_gff].
    pub fn from_reader<R: BufRead>(rdr: R) -> anyhow::Result<GffColumns> {
        let mut gc = GffColumns::default();
        gc._from_reader(rdr)?;
        Ok(gc)
    }

    fn _from_reader<R: BufRead>(&mut self, rdr: R) -> anyhow::Result<()> {
        let mut rdr = gff::Reader::new(rdr);
        let mut n_comments = 0usize;
        let mut n_records = 0usize;
        let mut n_short = 0usize;

        // the raw line, and its lazily decoded form
        let mut buf = String::new();
        let mut line = gff::lazy::Line::default();
        let mut line_idx = 0usize;

        loop {
            buf.clear();
            if rdr.read_line(&mut buf)? == 0 {
                break;
            }
            line_idx += 1;

            if buf.starts_with('>') {
                info!("Found the embedded FASTA section, ignoring the rest of the file.");
                break;
            }

            // decoding is confined to this one line, so a truncated record
            // can not run into the next one
            if gff::Reader::new(buf.as_bytes()).read_lazy_line(&mut line)? == 0 {
                continue;
            }

            match &line {
                gff::lazy::Line::Directive(d) => {
                    if d.starts_with(FASTA_DIRECTIVE) {
                        info!("Found the embedded FASTA section, ignoring the rest of the file.");
                        break;
                    }
                    if !d.starts_with(GFF_VERSION_DIRECTIVE) {
                        self.directives.push(d.to_string());
                    }
                }
                gff::lazy::Line::Comment(_) => {
                    n_comments += 1;
                }
                gff::lazy::Line::Record(r) => {
                    if buf.split('\t').count() < GFFFIELDS.len() {
                        n_short += 1;
                        continue;
                    }

                    let start = Position::try_from(r.start()).with_context(|| {
                        format!(
                            "Invalid start coordinate {:?} on line {}",
                            r.start().as_ref(),
                            line_idx
                        )
                    })?;
                    let end = Position::try_from(r.end()).with_context(|| {
                        format!(
                            "Invalid end coordinate {:?} on line {}",
                            r.end().as_ref(),
                            line_idx
                        )
                    })?;

                    self.seqid.push(r.reference_sequence_name().to_string());
                    self.source.push(r.source().to_string());
                    self.feature_type.push(r.ty().to_string());
                    self.start.push(start.get() as i64);
                    self.end.push(end.get() as i64);
                    self.score.push(or_missing(r.score()));
                    self.strand.push(or_missing(r.strand().as_ref()));
                    self.phase.push(or_missing(r.phase()));
                    self.attributes.push(or_missing(r.attributes().as_ref()));
                    n_records += 1;
                }
            }
        }

        if n_short > 0 {
            warn!(
                "{} lines have fewer than nine tab-separated columns and were skipped",
                n_short
            );
        }

        info!(
            "Finished parsing the input file. Found {} comments, {} directives and {} records.",
            n_comments,
            self.directives.len(),
            n_records
        );
        Ok(())
    }

    /// The number of feature rows read.
    pub fn len(&self) -> usize {
        self.seqid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seqid.is_empty()
    }

    /// Converts the columns into a polars [DataFrame] whose column names are
    /// [GFFFIELDS]. The header directives are returned alongside.
    pub fn into_df(self) -> anyhow::Result<(DataFrame, Vec<String>)> {
        let df = DataFrame::new(vec![
            Series::new(GFFFIELDS[0], self.seqid),
            Series::new(GFFFIELDS[1], self.source),
            Series::new(GFFFIELDS[2], self.feature_type),
            Series::new(GFFFIELDS[3], self.start),
            Series::new(GFFFIELDS[4], self.end),
            Series::new(GFFFIELDS[5], self.score),
            Series::new(GFFFIELDS[6], self.strand),
            Series::new(GFFFIELDS[7], self.phase),
            Series::new(GFFFIELDS[8], self.attributes),
        ])?;
        Ok((df, self.directives))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROKKA_GFF: &[u8] = b"##gff-version 3\n##sequence-region contig_1 1 5000\n# produced by a test\ncontig_1\tProkka\tgene\t100\t500\t.\t+\t.\tID=PROKKA_00001_gene;locus_tag=PROKKA_00001\ncontig_1\tProdigal:002006\tCDS\t100\t500\t.\t+\t0\tID=PROKKA_00001;Parent=PROKKA_00001_gene;product=hypothetical protein\ncontig_1\tProkka\tshort\t1\n\ncontig_1\tAragorn:001002\ttRNA\t900\t975\t.\t-\t.\tID=PROKKA_00002;product=tRNA-Ala(tgc)\n##FASTA\n>contig_1\nACGTACGTACGT\n";

    #[test]
    fn test_from_reader() -> anyhow::Result<()> {
        let gc = GffColumns::from_reader(PROKKA_GFF)?;
        assert_eq!(gc.len(), 3);
        assert_eq!(gc.seqid, vec![String::from("contig_1"); 3]);
        assert_eq!(
            gc.feature_type,
            vec![
                String::from("gene"),
                String::from("CDS"),
                String::from("tRNA")
            ]
        );
        assert_eq!(gc.start, vec![100, 100, 900]);
        assert_eq!(gc.end, vec![500, 500, 975]);
        assert_eq!(gc.strand, vec!["+", "+", "-"]);
        assert_eq!(gc.phase, vec![".", "0", "."]);
        assert_eq!(
            gc.attributes[1],
            "ID=PROKKA_00001;Parent=PROKKA_00001_gene;product=hypothetical protein"
        );
        assert_eq!(
            gc.directives,
            vec![String::from("##sequence-region contig_1 1 5000")]
        );
        Ok(())
    }

    #[test]
    fn test_into_df() -> anyhow::Result<()> {
        let (df, _) = GffColumns::from_reader(PROKKA_GFF)?.into_df()?;
        assert_eq!(df.height(), 3);
        assert_eq!(df.get_column_names(), GFFFIELDS.to_vec());
        assert_eq!(
            df.column("end")?
                .i64()?
                .into_iter()
                .map(|x| x.unwrap())
                .collect::<Vec<i64>>(),
            vec![500, 500, 975]
        );
        Ok(())
    }

    #[test]
    fn test_crlf_and_empty_columns() -> anyhow::Result<()> {
        let gff: &[u8] = b"##gff-version 3\r\ncontig_1\tProkka\tgene\t1\t90\t\t\t\tID=g1\r\n\r\ncontig_1\tProkka\trepeat_region\t100\t200\t.\t?\t.\t.\r\n";
        let gc = GffColumns::from_reader(gff)?;
        assert_eq!(gc.len(), 2);
        assert!(gc.directives.is_empty());
        assert_eq!(gc.score, vec![".", "."]);
        assert_eq!(gc.strand, vec![".", "?"]);
        assert_eq!(gc.phase, vec![".", "."]);
        assert_eq!(gc.attributes, vec!["ID=g1", "."]);
        Ok(())
    }

    #[test]
    fn test_invalid_coordinate() {
        let gff: &[u8] = b"contig_1\tProkka\tgene\tabc\t500\t.\t+\t.\tID=g1\n";
        let err = GffColumns::from_reader(gff).err().unwrap();
        assert!(format!("{:#}", err).contains("Invalid start coordinate"));
    }
}

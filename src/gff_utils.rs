use flate2::bufread::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

/// Type alias for a line reader over either a plain or a gzip compressed
/// annotation file.
pub type GffLineReader = Box<dyn BufRead>;

/// The nine columns of a GFF3 record, in file order. These are also the
/// column names of the in-memory table produced by the reader and consumed
/// by the record parser.
pub const GFFFIELDS: [&str; 9] = [
    "seqname",
    "source",
    "feature_type",
    "start",
    "end",
    "score",
    "strand",
    "phase",
    "attributes",
];

/// The directive marking the start of the embedded FASTA section that Prokka
/// appends to its GFF3 output.
pub(crate) const FASTA_DIRECTIVE: &str = "##FASTA";

/// The value written for an empty score or phase column.
pub(crate) const MISSING_VALUE: &str = ".";

/// Checks the first two bytes of `reader` for the gzip magic header.
///
/// The bytes are only looked at, not consumed, so `reader` can be handed to a
/// decoder afterwards. Nothing must have been read from `reader` before.
pub fn is_gzipped<T: BufRead>(reader: &mut T) -> std::io::Result<bool> {
    const GZIP_MAGIC_NUMBER: [u8; 2] = [0x1f, 0x8b];

    let src = reader.fill_buf()?;
    if src.get(..2) == Some(&GZIP_MAGIC_NUMBER) {
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Opens the annotation at `p`, decompressing it on the fly when it is gzipped.
pub fn get_reader_from_path<T: AsRef<Path>>(p: T) -> anyhow::Result<GffLineReader> {
    let file = File::open(p.as_ref())?;
    let mut inner_rdr = BufReader::new(file);
    if is_gzipped(&mut inner_rdr)? {
        info!("auto-detected gzipped file - reading via decompression");
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(inner_rdr))))
    } else {
        Ok(Box::new(inner_rdr))
    }
}

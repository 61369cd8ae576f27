//! Turns the raw nine-column table into typed [Record]s.

use crate::gff_utils::{GFFFIELDS, MISSING_VALUE};
use crate::issues::{Diagnostics, Issue};
use crate::record::{unique_id, Attributes, FeatureType, Record, Strand, ID_KEY, PARENT_KEY};
use anyhow::{bail, Context};
use noodles::gff::record::Strand as GffStrand;
use polars::prelude::*;
use std::collections::HashSet;
use tracing::{debug, info, warn};

fn str_column<'a>(df: &'a DataFrame, name: &str) -> anyhow::Result<Vec<Option<&'a str>>> {
    let ca = df
        .column(name)
        .with_context(|| format!("The input table has no {} column", name))?
        .str()
        .with_context(|| format!("The {} column is not a string column", name))?;
    Ok(ca.into_iter().collect())
}

fn i64_column(df: &DataFrame, name: &str) -> anyhow::Result<Vec<i64>> {
    let s = df
        .column(name)
        .with_context(|| format!("The input table has no {} column", name))?
        .cast(&DataType::Int64)
        .with_context(|| format!("The {} column is not an integer column", name))?;
    let values = s
        .i64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| v.with_context(|| format!("row {}: missing {} value", row, name)))
        .collect::<anyhow::Result<Vec<i64>>>()?;
    Ok(values)
}

/// Decodes a GFF3 attribute column into an [Attributes] map.
///
/// Fields are separated by `;` and split on their first `=`. Empty fields
/// (e.g. a trailing `;`) are ignored; fields without a `=` are dropped and
/// recorded as [Issue::MalformedAttribute].
pub fn parse_attributes(raw: &str, row: usize, diag: &mut Diagnostics) -> Attributes {
    let mut attrs = Attributes::new();
    if raw == MISSING_VALUE {
        return attrs;
    }
    for field in raw.split(';') {
        let field = field.trim();
        if field.is_empty() {
            continue;
        }
        match field.split_once('=') {
            Some((k, v)) => {
                attrs.insert(k.trim(), v);
            }
            None => diag.record(Issue::MalformedAttribute {
                row,
                field: field.to_string(),
            }),
        }
    }
    attrs
}

/// Parses every row of `df` into a [Record].
///
/// `df` must have the columns named in [GFFFIELDS]. The record id comes from
/// the `ID` attribute; rows without one get `<type>_<row>` and have it written
/// back as their `ID`. Ids are made unique: a repeated `ID` is renamed with a
/// numeric suffix and recorded as [Issue::DuplicateIdentifier].
///
/// Strands are read with noodles; `.`, `?` and an empty column are taken as
/// `+`, with one aggregated warning. A multi-valued `Parent` keeps its first
/// entry. Prokka's `mRNA` records become exons.
///
/// # Arguments
///
/// * `df`: the nine column table, e.g. from [crate::reader::GffColumns::into_df].
/// * `diag`: the report that recoverable problems are added to.
///
/// # Returns
///
/// The records in row order, each carrying its row as `source_row_index`.
///
/// # Errors
///
/// Returns an error if a column is missing or has the wrong type, if a
/// required value is null, if a strand is not one of `+ - . ?`, or if a row has
/// `start > end`.
///
/// # Examples
///
/// ```rust
/// use polars::prelude::*;
/// use prokka2vep::issues::Diagnostics;
/// use prokka2vep::parser::parse_records;
/// use prokka2vep::record::FeatureType;
///
/// # fn main() -> anyhow::Result<()> {
/// let df = df!(
///     "seqname" => ["contig_1", "contig_1"],
///     "source" => ["Prokka", "Prodigal:002006"],
///     "feature_type" => ["gene", "CDS"],
///     "start" => [100i64, 100],
///     "end" => [500i64, 500],
///     "score" => [".", "."],
///     "strand" => ["+", "+"],
///     "phase" => [".", "0"],
///     "attributes" => ["ID=PROKKA_00001_gene", "ID=PROKKA_00001;Parent=PROKKA_00001_gene"],
/// )?;
/// let mut diag = Diagnostics::new();
/// let records = parse_records(&df, &mut diag)?;
/// assert_eq!(records[1].feature_type, FeatureType::Cds);
/// assert_eq!(records[1].parent_id.as_deref(), Some("PROKKA_00001_gene"));
/// assert!(diag.is_empty());
/// # Ok(())
/// # }
/// ```
pub fn parse_records(df: &DataFrame, diag: &mut Diagnostics) -> anyhow::Result<Vec<Record>> {
    info!("Parsing {} rows into feature records ...", df.height());

    let seqname = str_column(df, GFFFIELDS[0])?;
    let source = str_column(df, GFFFIELDS[1])?;
    let feature_type = str_column(df, GFFFIELDS[2])?;
    let start = i64_column(df, GFFFIELDS[3])?;
    let end = i64_column(df, GFFFIELDS[4])?;
    let score = str_column(df, GFFFIELDS[5])?;
    let strands = str_column(df, GFFFIELDS[6])?;
    let phase = str_column(df, GFFFIELDS[7])?;
    let attributes = str_column(df, GFFFIELDS[8])?;

    let mut n_strand_none = 0usize;
    let mut n_strand_unknown = 0usize;
    let mut records = Vec::with_capacity(df.height());

    for row in 0..df.height() {
        let raw_type =
            feature_type[row].with_context(|| format!("row {}: missing feature type", row))?;
        let seq_region = seqname[row].with_context(|| format!("row {}: missing seqname", row))?;

        if start[row] > end[row] {
            bail!(
                "row {}: the start ({}) of this {} record is after its end ({})",
                row,
                start[row],
                raw_type,
                end[row]
            );
        }

        // an empty column counts as a missing strand
        let raw_strand = match strands[row] {
            Some(s) if !s.trim().is_empty() => s.trim(),
            _ => MISSING_VALUE,
        };
        let strand = match raw_strand.parse::<GffStrand>() {
            Ok(GffStrand::Forward) => Strand::Forward,
            Ok(GffStrand::Reverse) => Strand::Reverse,
            Ok(GffStrand::None) => {
                n_strand_none += 1;
                Strand::Forward
            }
            Ok(GffStrand::Unknown) => {
                n_strand_unknown += 1;
                Strand::Forward
            }
            Err(e) => bail!("row {}: invalid strand {:?}: {}", row, raw_strand, e),
        };

        let mut attrs = parse_attributes(attributes[row].unwrap_or(MISSING_VALUE), row, diag);

        // Prokka's mRNA records become the exon level, rename them accordingly
        if raw_type == "mRNA" {
            if let Some(id) = attrs.get(ID_KEY).and_then(|id| id.strip_suffix("_mRNA")) {
                let exon_id = format!("{}_exon", id);
                attrs.insert(ID_KEY, exon_id);
            }
        }

        let parent_id = attrs.get(PARENT_KEY).map(String::from);

        records.push(Record {
            feature_id: attrs.get(ID_KEY).unwrap_or_default().to_string(),
            feature_type: FeatureType::from_gff_type(raw_type),
            seq_region: seq_region.to_string(),
            source: source[row].unwrap_or(MISSING_VALUE).to_string(),
            start: start[row],
            end: end[row],
            score: score[row].unwrap_or(MISSING_VALUE).to_string(),
            strand,
            phase: phase[row].unwrap_or(MISSING_VALUE).to_string(),
            parent_id,
            attributes: attrs,
            source_row_index: row,
        });
    }

    if n_strand_none > 0 {
        warn!(
            "{} records have no strand information, set to '+'",
            n_strand_none
        );
    }

    if n_strand_unknown > 0 {
        warn!(
            "{} records have unknown strand information, set to '+'",
            n_strand_unknown
        );
    }

    resolve_parent_lists(&mut records, diag);
    assign_unique_ids(&mut records, diag);

    info!("Parsed {} feature records.", records.len());
    Ok(records)
}

/// Keeps the first entry of multi-valued `Parent` attributes.
fn resolve_parent_lists(records: &mut [Record], diag: &mut Diagnostics) {
    for rec in records.iter_mut() {
        let kept = match rec.parent_id.as_deref() {
            Some(p) if p.contains(',') => p.split(',').next().unwrap_or_default().to_string(),
            _ => continue,
        };
        let id = if rec.feature_id.is_empty() {
            format!("row {}", rec.source_row_index)
        } else {
            rec.feature_id.clone()
        };
        diag.record(Issue::MultipleParents {
            id,
            kept: kept.clone(),
        });
        rec.set_parent(kept);
    }
}

/// Gives every record a unique id. Explicit ids win over generated ones, and
/// the first record carrying an explicit id keeps it.
fn assign_unique_ids(records: &mut [Record], diag: &mut Diagnostics) {
    let explicit: HashSet<String> = records
        .iter()
        .filter(|r| !r.feature_id.is_empty())
        .map(|r| r.feature_id.clone())
        .collect();
    let mut assigned: HashSet<String> = HashSet::with_capacity(records.len());

    for rec in records.iter_mut() {
        if rec.feature_id.is_empty() {
            let base = format!("{}_{}", rec.feature_type, rec.source_row_index);
            let id = unique_id(&base, |s| assigned.contains(s) || explicit.contains(s));
            debug!("row {} has no ID, using {}", rec.source_row_index, id);
            rec.set_id(id);
        } else if assigned.contains(&rec.feature_id) {
            let id = unique_id(&rec.feature_id, |s| {
                assigned.contains(s) || explicit.contains(s)
            });
            diag.record(Issue::DuplicateIdentifier {
                id: rec.feature_id.clone(),
                renamed_to: id.clone(),
            });
            rec.set_id(id);
        }
        assigned.insert(rec.feature_id.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_df() -> DataFrame {
        df!(
            "seqname" => ["contig_1", "contig_1", "contig_1", "contig_1", "contig_1"],
            "source" => ["Prokka", "Prodigal:002006", "Prokka", "Aragorn:001002", "minced:0.2.0"],
            "feature_type" => ["gene", "CDS", "mRNA", "tRNA", "repeat_region"],
            "start" => [100i64, 100, 100, 900, 2000],
            "end" => [500i64, 500, 500, 975, 2300],
            "score" => [".", ".", ".", ".", "."],
            "strand" => ["+", "+", "+", "-", "."],
            "phase" => [".", "0", ".", ".", "."],
            "attributes" => [
                "ID=PROKKA_00001_gene;locus_tag=PROKKA_00001",
                "ID=PROKKA_00001;Parent=PROKKA_00001_gene;product=hypothetical protein;",
                "ID=PROKKA_00001_mRNA;Parent=PROKKA_00001_gene",
                "ID=PROKKA_00002;product=tRNA-Ala(tgc);note",
                "rpt_family=CRISPR",
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_parse_records() -> anyhow::Result<()> {
        let mut diag = Diagnostics::new();
        let recs = parse_records(&toy_df(), &mut diag)?;
        assert_eq!(recs.len(), 5);

        assert_eq!(recs[0].feature_type, FeatureType::Gene);
        assert_eq!(recs[0].parent_id, None);

        assert_eq!(recs[1].feature_id, "PROKKA_00001");
        assert_eq!(recs[1].feature_type, FeatureType::Cds);
        assert_eq!(recs[1].parent_id.as_deref(), Some("PROKKA_00001_gene"));
        assert_eq!(recs[1].phase, "0");
        assert_eq!(recs[1].attributes.len(), 3);

        assert_eq!(recs[2].feature_id, "PROKKA_00001_exon");
        assert_eq!(recs[2].feature_type, FeatureType::Exon);

        assert_eq!(recs[3].strand, Strand::Reverse);
        assert_eq!(recs[3].feature_type, FeatureType::NcRna(String::from("tRNA")));

        // no ID: synthesized from the type and row, and written back
        assert_eq!(recs[4].feature_id, "repeat_region_4");
        assert_eq!(recs[4].attributes.get("ID"), Some("repeat_region_4"));
        assert_eq!(recs[4].strand, Strand::Forward);

        // the dangling "note" field of the tRNA
        assert_eq!(
            diag.issues(),
            &[Issue::MalformedAttribute {
                row: 3,
                field: String::from("note")
            }]
        );
        Ok(())
    }

    #[test]
    fn test_duplicate_ids() -> anyhow::Result<()> {
        let df = df!(
            "seqname" => ["c1", "c1", "c1"],
            "source" => ["Prokka", "Prokka", "Prokka"],
            "feature_type" => ["gene", "gene", "gene"],
            "start" => [1i64, 50, 90],
            "end" => [10i64, 60, 99],
            "score" => [".", ".", "."],
            "strand" => ["+", "+", "-"],
            "phase" => [".", ".", "."],
            "attributes" => ["ID=g1", "ID=g1", "locus_tag=x"],
        )?;
        let mut diag = Diagnostics::new();
        let recs = parse_records(&df, &mut diag)?;
        assert_eq!(recs[0].feature_id, "g1");
        assert_eq!(recs[1].feature_id, "g1_2");
        assert_eq!(recs[1].attributes.get("ID"), Some("g1_2"));
        assert_eq!(recs[2].feature_id, "gene_2");
        assert_eq!(
            diag.issues(),
            &[Issue::DuplicateIdentifier {
                id: String::from("g1"),
                renamed_to: String::from("g1_2")
            }]
        );
        Ok(())
    }

    #[test]
    fn test_multiple_parents() -> anyhow::Result<()> {
        let df = df!(
            "seqname" => ["c1"],
            "source" => ["Prokka"],
            "feature_type" => ["CDS"],
            "start" => [1i64],
            "end" => [10i64],
            "score" => ["."],
            "strand" => ["+"],
            "phase" => ["0"],
            "attributes" => ["ID=c1;Parent=g1,g2"],
        )?;
        let mut diag = Diagnostics::new();
        let recs = parse_records(&df, &mut diag)?;
        assert_eq!(recs[0].parent_id.as_deref(), Some("g1"));
        assert_eq!(recs[0].attributes.get("Parent"), Some("g1"));
        assert_eq!(diag.len(), 1);
        Ok(())
    }

    #[test]
    fn test_start_after_end() {
        let df = df!(
            "seqname" => ["c1"],
            "source" => ["Prokka"],
            "feature_type" => ["gene"],
            "start" => [20i64],
            "end" => [10i64],
            "score" => ["."],
            "strand" => ["+"],
            "phase" => ["."],
            "attributes" => ["ID=g1"],
        )
        .unwrap();
        let mut diag = Diagnostics::new();
        assert!(parse_records(&df, &mut diag).is_err());
    }

    #[test]
    fn test_empty_strand_is_forward() -> anyhow::Result<()> {
        let df = df!(
            "seqname" => ["c1", "c1"],
            "source" => ["Prokka", "Prokka"],
            "feature_type" => ["gene", "gene"],
            "start" => [1i64, 50],
            "end" => [10i64, 60],
            "score" => [".", "."],
            "strand" => ["", "?"],
            "phase" => [".", "."],
            "attributes" => ["ID=g1", "ID=g2"],
        )?;
        let mut diag = Diagnostics::new();
        let recs = parse_records(&df, &mut diag)?;
        assert_eq!(recs[0].strand, Strand::Forward);
        assert_eq!(recs[1].strand, Strand::Forward);
        assert!(diag.is_empty());
        Ok(())
    }

    #[test]
    fn test_parse_attributes() {
        let mut diag = Diagnostics::new();
        let attrs = parse_attributes("ID=x;Name=a=b; ;Parent=y", 0, &mut diag);
        assert_eq!(attrs.get("Name"), Some("a=b"));
        assert_eq!(attrs.get("Parent"), Some("y"));
        assert!(diag.is_empty());
        assert!(parse_attributes(".", 0, &mut diag).is_empty());
    }
}

use crate::gff_utils::MISSING_VALUE;
use crate::issues::{Diagnostics, Issue};
use crate::record::{
    unique_id, Attributes, FeatureType, Record, BIOTYPE_KEY, ID_KEY, PARENT_KEY,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

const GENE_SUFFIX: &str = "_gene";
const TRANSCRIPT_SUFFIX: &str = "_transcript";
const CODING_BIOTYPE: &str = "protein_coding";

/// The preferred id of the transcript synthesized below `gene_id`.
///
/// Prokka's `--addgenes` ids end in `_gene`; that suffix is swapped so
/// `PROKKA_00001_gene` gets `PROKKA_00001_transcript`. Any other id just gets
/// `_transcript` appended.
pub fn transcript_id_for(gene_id: &str) -> String {
    match gene_id.strip_suffix(GENE_SUFFIX) {
        Some(base) if !base.is_empty() => format!("{}{}", base, TRANSCRIPT_SUFFIX),
        _ => format!("{}{}", gene_id, TRANSCRIPT_SUFFIX),
    }
}

/// The output of [synthesize_transcripts]: the input records (re-linked, with
/// coding orphans removed) and the transcripts created for them. The two are
/// combined and ordered by [crate::ordering].
#[derive(Clone, Debug, Default)]
pub struct Synthesized {
    pub records: Vec<Record>,
    pub transcripts: Vec<Record>,
}

/// Coding children waiting for a transcript, grouped by their gene.
struct CodingGroup {
    gene_idx: usize,
    children: Vec<usize>,
}

/// Gives every coding gene a transcript level.
///
/// Coding children (CDS and exon records) are grouped by their parent. For each
/// group whose parent is a gene without an explicit transcript child, one
/// transcript is synthesized spanning the group, and the children are
/// re-linked to it. Genes that already have a transcript child are left as
/// they are.
///
/// Coding children without a resolvable parent are recorded as
/// [Issue::OrphanChild] and dropped. A synthesized id that is already taken
/// gets a numeric suffix and is recorded as [Issue::DuplicateIdentifier].
///
/// # Arguments
///
/// * `records`: the parsed records, see [crate::parser::parse_records].
/// * `diag`: the report that orphans, strand conflicts and renamed ids are added to.
///
/// # Returns
///
/// A [Synthesized] holding the re-linked records and the new transcripts. A
/// transcript spans its children, takes the strand of its first child and the
/// source and sequence region of its gene, and has `biotype=protein_coding`.
///
/// # Examples
///
/// ```rust
/// use polars::prelude::*;
/// use prokka2vep::issues::Diagnostics;
/// use prokka2vep::parser::parse_records;
/// use prokka2vep::synthesizer::synthesize_transcripts;
///
/// # fn main() -> anyhow::Result<()> {
/// let df = df!(
///     "seqname" => ["contig_1", "contig_1"],
///     "source" => ["Prokka", "Prodigal:002006"],
///     "feature_type" => ["gene", "CDS"],
///     "start" => [100i64, 100],
///     "end" => [500i64, 500],
///     "score" => [".", "."],
///     "strand" => ["-", "-"],
///     "phase" => [".", "0"],
///     "attributes" => ["ID=PROKKA_00001_gene", "ID=PROKKA_00001;Parent=PROKKA_00001_gene"],
/// )?;
/// let mut diag = Diagnostics::new();
/// let records = parse_records(&df, &mut diag)?;
/// let out = synthesize_transcripts(records, &mut diag);
///
/// assert_eq!(out.transcripts[0].feature_id, "PROKKA_00001_transcript");
/// assert_eq!(
///     out.records[1].parent_id.as_deref(),
///     Some("PROKKA_00001_transcript")
/// );
/// # Ok(())
/// # }
/// ```
pub fn synthesize_transcripts(mut records: Vec<Record>, diag: &mut Diagnostics) -> Synthesized {
    info!("Creating transcript records ...");

    let index: HashMap<String, usize> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.feature_id.clone(), i))
        .collect();

    // genes that already have an explicit transcript level
    let genes_with_transcript: HashSet<String> = records
        .iter()
        .filter(|r| r.is_transcript())
        .filter_map(|r| r.parent_id.as_deref())
        .filter(|p| index.get(*p).is_some_and(|&i| records[i].is_gene()))
        .map(String::from)
        .collect();

    let mut excluded = vec![false; records.len()];
    let mut groups: Vec<CodingGroup> = Vec::new();
    let mut group_of_gene: HashMap<usize, usize> = HashMap::new();

    for (i, rec) in records.iter().enumerate() {
        if !rec.feature_type.is_coding_child() {
            continue;
        }
        let parent_idx = match rec.parent_id.as_deref() {
            Some(p) => index.get(p).copied(),
            None => None,
        };
        let Some(parent_idx) = parent_idx else {
            diag.record(Issue::OrphanChild {
                id: rec.feature_id.clone(),
                parent: rec.parent_id.clone(),
            });
            excluded[i] = true;
            continue;
        };
        let parent = &records[parent_idx];
        if !parent.is_gene() || genes_with_transcript.contains(&parent.feature_id) {
            continue;
        }
        let g = *group_of_gene.entry(parent_idx).or_insert_with(|| {
            groups.push(CodingGroup {
                gene_idx: parent_idx,
                children: Vec::new(),
            });
            groups.len() - 1
        });
        groups[g].children.push(i);
    }

    let mut taken: HashSet<String> = index.into_keys().collect();
    let mut transcripts = Vec::with_capacity(groups.len());
    let n_records = records.len();

    for (k, group) in groups.iter().enumerate() {
        let gene = &records[group.gene_idx];
        let first = &records[group.children[0]];

        let start = group
            .children
            .iter()
            .map(|&i| records[i].start)
            .min()
            .unwrap_or(first.start);
        let end = group
            .children
            .iter()
            .map(|&i| records[i].end)
            .max()
            .unwrap_or(first.end);

        let strand = first.strand;
        if group.children.iter().any(|&i| records[i].strand != strand) {
            diag.record(Issue::StrandConflict {
                gene: gene.feature_id.clone(),
                chosen: strand,
            });
        }

        let preferred = transcript_id_for(&gene.feature_id);
        let tid = unique_id(&preferred, |s| taken.contains(s));
        if tid != preferred {
            diag.record(Issue::DuplicateIdentifier {
                id: preferred,
                renamed_to: tid.clone(),
            });
        }
        taken.insert(tid.clone());

        let mut attributes = Attributes::new();
        attributes.insert(ID_KEY, tid.as_str());
        attributes.insert(PARENT_KEY, gene.feature_id.as_str());
        attributes.insert(BIOTYPE_KEY, CODING_BIOTYPE);

        debug!(
            "synthesized {} ({}-{}) for {} coding features of {}",
            tid,
            start,
            end,
            group.children.len(),
            gene.feature_id
        );

        transcripts.push(Record {
            feature_id: tid,
            feature_type: FeatureType::Transcript,
            seq_region: gene.seq_region.clone(),
            source: gene.source.clone(),
            start,
            end,
            score: MISSING_VALUE.to_string(),
            strand,
            phase: MISSING_VALUE.to_string(),
            parent_id: Some(gene.feature_id.clone()),
            attributes,
            source_row_index: n_records + k,
        });
    }

    for (group, transcript) in groups.iter().zip(transcripts.iter()) {
        for &i in group.children.iter() {
            records[i].set_parent(transcript.feature_id.as_str());
        }
    }

    info!(
        "Created {} transcript records, {} genes already had one.",
        transcripts.len(),
        genes_with_transcript.len()
    );

    let records = records
        .into_iter()
        .zip(excluded)
        .filter_map(|(r, ex)| if ex { None } else { Some(r) })
        .collect();

    Synthesized {
        records,
        transcripts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{toy_record as rec, Strand};

    #[test]
    fn test_transcript_id_for() {
        assert_eq!(transcript_id_for("geneA"), "geneA_transcript");
        assert_eq!(
            transcript_id_for("PROKKA_00001_gene"),
            "PROKKA_00001_transcript"
        );
        assert_eq!(transcript_id_for("_gene"), "_gene_transcript");
    }

    #[test]
    fn test_synthesize() {
        let records = vec![
            rec("geneA", FeatureType::Gene, 100, 500, Strand::Forward, None, 0),
            rec("cds1", FeatureType::Cds, 100, 200, Strand::Forward, Some("geneA"), 1),
            rec("cds2", FeatureType::Cds, 300, 500, Strand::Forward, Some("geneA"), 2),
        ];
        let mut diag = Diagnostics::new();
        let out = synthesize_transcripts(records, &mut diag);
        assert!(diag.is_empty());
        assert_eq!(out.records.len(), 3);
        assert_eq!(out.transcripts.len(), 1);

        let t = &out.transcripts[0];
        assert_eq!(t.feature_id, "geneA_transcript");
        assert_eq!(t.feature_type, FeatureType::Transcript);
        assert_eq!((t.start, t.end), (100, 500));
        assert_eq!(t.strand, Strand::Forward);
        assert_eq!(t.parent_id.as_deref(), Some("geneA"));
        assert_eq!(t.attributes.get("biotype"), Some("protein_coding"));

        for cds in &out.records[1..3] {
            assert_eq!(cds.parent_id.as_deref(), Some("geneA_transcript"));
            assert_eq!(cds.attributes.get("Parent"), Some("geneA_transcript"));
        }
    }

    #[test]
    fn test_span_and_strand_conflict() {
        let records = vec![
            rec("g", FeatureType::Gene, 1, 1000, Strand::Reverse, None, 0),
            rec("c1", FeatureType::Cds, 400, 900, Strand::Reverse, Some("g"), 1),
            rec("c2", FeatureType::Exon, 50, 300, Strand::Forward, Some("g"), 2),
        ];
        let mut diag = Diagnostics::new();
        let out = synthesize_transcripts(records, &mut diag);
        let t = &out.transcripts[0];
        assert_eq!((t.start, t.end), (50, 900));
        assert_eq!(t.strand, Strand::Reverse);
        assert_eq!(
            diag.issues(),
            &[Issue::StrandConflict {
                gene: String::from("g"),
                chosen: Strand::Reverse
            }]
        );
    }

    #[test]
    fn test_existing_transcript_untouched() {
        let records = vec![
            rec("g", FeatureType::Gene, 1, 100, Strand::Forward, None, 0),
            rec("t", FeatureType::Transcript, 1, 100, Strand::Forward, Some("g"), 1),
            rec("c", FeatureType::Cds, 1, 100, Strand::Forward, Some("t"), 2),
        ];
        let mut diag = Diagnostics::new();
        let out = synthesize_transcripts(records.clone(), &mut diag);
        assert_eq!(out.records, records);
        assert!(out.transcripts.is_empty());
        assert!(diag.is_empty());
    }

    #[test]
    fn test_orphans_and_collisions() {
        let records = vec![
            rec("geneA", FeatureType::Gene, 1, 100, Strand::Forward, None, 0),
            rec(
                "geneA_transcript",
                FeatureType::Other(String::from("misc_feature")),
                5,
                10,
                Strand::Forward,
                None,
                1,
            ),
            rec("cds1", FeatureType::Cds, 1, 100, Strand::Forward, Some("geneA"), 2),
            rec("cds9", FeatureType::Cds, 1, 100, Strand::Forward, Some("nogene"), 3),
            rec("cds10", FeatureType::Cds, 1, 100, Strand::Forward, None, 4),
        ];
        let mut diag = Diagnostics::new();
        let out = synthesize_transcripts(records, &mut diag);
        let ids: Vec<&str> = out.records.iter().map(|r| r.feature_id.as_str()).collect();
        assert_eq!(ids, vec!["geneA", "geneA_transcript", "cds1"]);
        assert_eq!(out.transcripts[0].feature_id, "geneA_transcript_2");
        assert_eq!(out.records[2].parent_id.as_deref(), Some("geneA_transcript_2"));
        assert_eq!(diag.orphans(), vec!["cds9", "cds10"]);
        assert!(diag.issues().contains(&Issue::DuplicateIdentifier {
            id: String::from("geneA_transcript"),
            renamed_to: String::from("geneA_transcript_2"),
        }));
        assert_eq!(diag.len(), 3);
    }
}

use crate::record::{FeatureType, Record, BIOTYPE_KEY};
use std::collections::HashMap;
use tracing::{debug, info};

/// Lets the RNA feature of a non-coding gene play the transcript role.
///
/// For every gene whose children are all non-coding RNA records, each child is
/// re-typed to `transcript` and its RNA kind (e.g. `tRNA`) is kept as the
/// `biotype` attribute. No transcript is synthesized for these genes, and no
/// record moves, so the order set by [crate::ordering::reorder] is kept.
/// Genes with a mix of coding and non-coding children are left as they are.
pub fn adapt_ncrna(mut records: Vec<Record>) -> Vec<Record> {
    info!("Processing the non-coding RNA ...");

    let to_adapt: Vec<(usize, String)> = {
        let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, r) in records.iter().enumerate() {
            if let Some(p) = r.parent_id.as_deref() {
                children.entry(p).or_default().push(i);
            }
        }

        records
            .iter()
            .filter(|r| r.is_gene())
            .filter_map(|g| children.get(g.feature_id.as_str()).map(|kids| (g, kids)))
            .filter(|(_, kids)| kids.iter().all(|&k| records[k].feature_type.is_ncrna()))
            .flat_map(|(g, kids)| kids.iter().map(move |&k| (k, g.feature_id.clone())))
            .collect()
    };

    for (k, gene_id) in to_adapt.iter() {
        let rec = &mut records[*k];
        if let FeatureType::NcRna(subtype) = &rec.feature_type {
            let subtype = subtype.clone();
            debug!(
                "{} ({}) now acts as the transcript of {}",
                rec.feature_id, subtype, gene_id
            );
            rec.attributes.insert(BIOTYPE_KEY, subtype);
            rec.feature_type = FeatureType::Transcript;
            rec.set_parent(gene_id.as_str());
        }
    }

    info!("Adapted {} non-coding RNA records.", to_adapt.len());
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{toy_record as rec, Strand};

    #[test]
    fn test_adapt_ncrna() {
        let records = vec![
            rec("geneB", FeatureType::Gene, 900, 975, Strand::Reverse, None, 0),
            rec(
                "rna1",
                FeatureType::NcRna(String::from("tRNA")),
                900,
                975,
                Strand::Reverse,
                Some("geneB"),
                1,
            ),
            rec("geneC", FeatureType::Gene, 1000, 1500, Strand::Forward, None, 2),
            rec(
                "rna2",
                FeatureType::NcRna(String::from("rRNA")),
                1000,
                1500,
                Strand::Forward,
                Some("geneC"),
                3,
            ),
            rec("cds3", FeatureType::Cds, 1000, 1500, Strand::Forward, Some("geneC"), 4),
        ];
        let out = adapt_ncrna(records);
        assert_eq!(out.len(), 5);

        assert_eq!(out[1].feature_type, FeatureType::Transcript);
        assert_eq!(out[1].attributes.get("biotype"), Some("tRNA"));
        assert_eq!(out[1].parent_id.as_deref(), Some("geneB"));
        assert_eq!(out[1].attributes.get("Parent"), Some("geneB"));

        // mixed gene: untouched
        assert_eq!(out[3].feature_type, FeatureType::NcRna(String::from("rRNA")));
        assert_eq!(out[3].attributes.get("biotype"), None);
    }

    #[test]
    fn test_adapt_ncrna_is_idempotent() {
        let records = vec![
            rec("geneB", FeatureType::Gene, 900, 975, Strand::Reverse, None, 0),
            rec(
                "rna1",
                FeatureType::NcRna(String::from("tmRNA")),
                900,
                975,
                Strand::Reverse,
                Some("geneB"),
                1,
            ),
        ];
        let once = adapt_ncrna(records);
        let twice = adapt_ncrna(once.clone());
        assert_eq!(once, twice);
    }
}

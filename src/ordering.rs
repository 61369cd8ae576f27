//! Combining the parsed and synthesized records and putting them in hierarchy order.

use crate::issues::{Diagnostics, Issue};
use crate::record::Record;
use anyhow::bail;
use std::collections::{HashMap, HashSet};
use tracing::info;

/// Concatenates the original records and the synthesized transcripts into one
/// table. Row indices are left as they are, so ties still resolve in input order.
pub fn merge_tables(records: Vec<Record>, transcripts: Vec<Record>) -> Vec<Record> {
    info!(
        "Merging {} records with {} synthesized transcripts ...",
        records.len(),
        transcripts.len()
    );
    let mut merged = records;
    merged.extend(transcripts);
    merged
}

/// Orders the table so that each top-level record is followed by the contiguous
/// block of its descendants, parents before children.
///
/// Top-level records (genes, and pass-through records that never had a
/// parent) are sorted by sequence region, in order of first appearance, then by
/// start. Siblings are sorted by start. Ties are broken by input row.
///
/// Records that are never reached are dropped: if their parent chain ends at a
/// missing id they are recorded as [Issue::OrphanChild].
///
/// # Arguments
///
/// * `records`: the merged table, see [merge_tables].
/// * `diag`: the report that excluded records are added to.
///
/// # Returns
///
/// The reachable records in hierarchy order. The records themselves are not
/// modified.
///
/// # Errors
///
/// Returns an error if the parent references form a cycle.
///
/// # Examples
///
/// ```rust
/// use polars::prelude::*;
/// use prokka2vep::issues::Diagnostics;
/// use prokka2vep::ordering::reorder;
/// use prokka2vep::parser::parse_records;
///
/// # fn main() -> anyhow::Result<()> {
/// let df = df!(
///     "seqname" => ["contig_1", "contig_1", "contig_1"],
///     "source" => ["Prokka", "Prokka", "Prokka"],
///     "feature_type" => ["exon", "gene", "gene"],
///     "start" => [900i64, 900, 100],
///     "end" => [975i64, 975, 500],
///     "score" => [".", ".", "."],
///     "strand" => ["+", "+", "+"],
///     "phase" => [".", ".", "."],
///     "attributes" => ["ID=e1;Parent=g2", "ID=g2", "ID=g1"],
/// )?;
/// let mut diag = Diagnostics::new();
/// let records = parse_records(&df, &mut diag)?;
/// let ordered = reorder(records, &mut diag)?;
///
/// let ids: Vec<&str> = ordered.iter().map(|r| r.feature_id.as_str()).collect();
/// assert_eq!(ids, vec!["g1", "g2", "e1"]);
/// # Ok(())
/// # }
/// ```
pub fn reorder(records: Vec<Record>, diag: &mut Diagnostics) -> anyhow::Result<Vec<Record>> {
    info!("Reordering {} records ...", records.len());

    let mut region_rank: HashMap<&str, usize> = HashMap::new();
    for r in records.iter() {
        let next = region_rank.len();
        region_rank.entry(r.seq_region.as_str()).or_insert(next);
    }

    let index: HashMap<&str, usize> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.feature_id.as_str(), i))
        .collect();

    let mut roots: Vec<usize> = Vec::new();
    let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut reported: HashSet<usize> = HashSet::new();

    for (i, r) in records.iter().enumerate() {
        match r.parent_id.as_deref() {
            None if !r.feature_type.requires_parent() => roots.push(i),
            Some(p) if index.contains_key(p) => children.entry(index[p]).or_default().push(i),
            _ => {
                diag.record(Issue::OrphanChild {
                    id: r.feature_id.clone(),
                    parent: r.parent_id.clone(),
                });
                reported.insert(i);
            }
        }
    }

    roots.sort_by_key(|&i| {
        let r = &records[i];
        (region_rank[r.seq_region.as_str()], r.start, r.source_row_index)
    });
    for kids in children.values_mut() {
        kids.sort_by_key(|&i| records[i].sibling_key());
    }

    let mut visited = vec![false; records.len()];
    let mut order: Vec<usize> = Vec::with_capacity(records.len());
    let mut stack: Vec<usize> = Vec::new();

    for &root in roots.iter() {
        stack.push(root);
        while let Some(i) = stack.pop() {
            if visited[i] {
                bail!(
                    "Cycle detected: {} was reached twice while walking the feature hierarchy",
                    records[i].feature_id
                );
            }
            visited[i] = true;
            order.push(i);
            if let Some(kids) = children.get(&i) {
                // reversed so that the first child is popped first
                stack.extend(kids.iter().rev());
            }
        }
    }

    // what is left either hangs below an orphan or sits on a cycle
    for i in 0..records.len() {
        if visited[i] || reported.contains(&i) {
            continue;
        }
        let mut chain: Vec<usize> = vec![i];
        let mut cur = i;
        loop {
            let parent = records[cur]
                .parent_id
                .as_deref()
                .and_then(|p| index.get(p).copied());
            match parent {
                Some(p) if chain.contains(&p) => {
                    let ids: Vec<&str> = chain
                        .iter()
                        .map(|&c| records[c].feature_id.as_str())
                        .collect();
                    bail!(
                        "Cycle detected in the parent references: {} -> {}",
                        ids.join(" -> "),
                        records[p].feature_id
                    );
                }
                Some(p) if !reported.contains(&p) && !visited[p] => {
                    chain.push(p);
                    cur = p;
                }
                _ => break,
            }
        }
        diag.record(Issue::OrphanChild {
            id: records[i].feature_id.clone(),
            parent: records[i].parent_id.clone(),
        });
        reported.insert(i);
    }

    let mut slots: Vec<Option<Record>> = records.into_iter().map(Some).collect();
    let ordered: Vec<Record> = order.into_iter().filter_map(|i| slots[i].take()).collect();

    info!("Kept {} records in hierarchy order.", ordered.len());
    Ok(ordered)
}

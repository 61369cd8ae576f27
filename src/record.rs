use indexmap::IndexMap;
use std::fmt;

pub(crate) const ID_KEY: &str = "ID";
pub(crate) const PARENT_KEY: &str = "Parent";
pub(crate) const BIOTYPE_KEY: &str = "biotype";

/// The raw feature types that are treated as non-coding RNA.
pub(crate) const NCRNA_TYPES: [&str; 5] = ["tRNA", "rRNA", "tmRNA", "ncRNA", "misc_RNA"];

/// The hierarchy level of a record.
///
/// The non-coding RNA variant keeps the raw type (e.g. `tRNA`) as its subtype, and
/// unrecognized types are carried through as [FeatureType::Other] so that the
/// pipeline never fails on a type it does not transform.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FeatureType {
    Gene,
    Transcript,
    Cds,
    Exon,
    NcRna(String),
    Other(String),
}

impl FeatureType {
    /// Maps a raw GFF3 type column value to its hierarchy level.
    ///
    /// `mRNA` is mapped to [FeatureType::Exon]: in a prokaryotic annotation the
    /// mRNA record spans the whole gene and is the single exon of its transcript.
    pub fn from_gff_type(s: &str) -> FeatureType {
        match s {
            "gene" => FeatureType::Gene,
            "transcript" => FeatureType::Transcript,
            "CDS" | "cds" => FeatureType::Cds,
            "exon" | "mRNA" => FeatureType::Exon,
            t if NCRNA_TYPES.contains(&t) => FeatureType::NcRna(t.to_string()),
            t => FeatureType::Other(t.to_string()),
        }
    }

    /// The value written to the type column of the output.
    pub fn as_gff_type(&self) -> &str {
        match self {
            FeatureType::Gene => "gene",
            FeatureType::Transcript => "transcript",
            FeatureType::Cds => "CDS",
            FeatureType::Exon => "exon",
            FeatureType::NcRna(t) => t.as_str(),
            FeatureType::Other(t) => t.as_str(),
        }
    }

    /// `true` for the types a transcript is synthesized over.
    pub fn is_coding_child(&self) -> bool {
        matches!(self, FeatureType::Cds | FeatureType::Exon)
    }

    pub fn is_ncrna(&self) -> bool {
        matches!(self, FeatureType::NcRna(_))
    }

    /// `true` for the types that must hang below another record. Pass-through
    /// types may be top-level.
    pub fn requires_parent(&self) -> bool {
        !matches!(self, FeatureType::Gene | FeatureType::Other(_))
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_gff_type())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Strand {
    Forward,
    Reverse,
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
        }
    }
}

/// A key-unique attribute map that remembers insertion order, so that records are
/// written back with their attributes in the order they were read.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: IndexMap<String, String>,
}

impl Attributes {
    pub fn new() -> Attributes {
        Attributes::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Sets `key` to `value`. An existing key keeps its position and only has its
    /// value replaced; the previous value is returned.
    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encodes the attributes as a GFF3 attribute column: `key=value` pairs
    /// joined by `;`.
    pub fn to_gff_string(&self) -> String {
        self.iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Returns `base` if it is free, otherwise the first of `base_2`, `base_3`, ...
/// that is.
pub(crate) fn unique_id<F: Fn(&str) -> bool>(base: &str, is_taken: F) -> String {
    if !is_taken(base) {
        return base.to_string();
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{}_{}", base, n);
        if !is_taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// One annotation row.
///
/// `feature_id` mirrors the `ID` attribute and `parent_id` mirrors the
/// `Parent` attribute; [Record::set_id] and [Record::set_parent] keep the two in
/// sync.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub feature_id: String,
    pub feature_type: FeatureType,
    pub seq_region: String,
    pub source: String,
    pub start: i64,
    pub end: i64,
    pub score: String,
    pub strand: Strand,
    pub phase: String,
    pub parent_id: Option<String>,
    pub attributes: Attributes,
    pub source_row_index: usize,
}

impl Record {
    pub fn set_id<T: Into<String>>(&mut self, id: T) {
        let id = id.into();
        self.attributes.insert(ID_KEY, id.as_str());
        self.feature_id = id;
    }

    pub fn set_parent<T: Into<String>>(&mut self, parent: T) {
        let parent = parent.into();
        self.attributes.insert(PARENT_KEY, parent.as_str());
        self.parent_id = Some(parent);
    }

    pub fn is_gene(&self) -> bool {
        self.feature_type == FeatureType::Gene
    }

    pub fn is_transcript(&self) -> bool {
        self.feature_type == FeatureType::Transcript
    }

    /// The key used to order siblings: ascending start, ties broken by input order.
    pub fn sibling_key(&self) -> (i64, usize) {
        (self.start, self.source_row_index)
    }
}

#[cfg(test)]
pub(crate) fn toy_record(
    id: &str,
    ty: FeatureType,
    start: i64,
    end: i64,
    strand: Strand,
    parent: Option<&str>,
    row: usize,
) -> Record {
    let mut attributes = Attributes::new();
    attributes.insert(ID_KEY, id);
    if let Some(p) = parent {
        attributes.insert(PARENT_KEY, p);
    }
    Record {
        feature_id: id.to_string(),
        feature_type: ty,
        seq_region: String::from("contig_1"),
        source: String::from("Prokka"),
        start,
        end,
        score: String::from("."),
        strand,
        phase: String::from("."),
        parent_id: parent.map(String::from),
        attributes,
        source_row_index: row,
    }
}

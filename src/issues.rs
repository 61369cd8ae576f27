use crate::record::Strand;
use std::fmt;
use tracing::warn;

/// A recoverable problem found while converting the annotation.
///
/// None of these stop the run. Each is logged as a warning when recorded and
/// kept in a [Diagnostics] report so callers can inspect what happened.
/// Unrecoverable conditions (a parent cycle, unreadable input) are returned as
/// errors instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Issue {
    /// An attribute field without a `=`; the field was dropped.
    MalformedAttribute { row: usize, field: String },
    /// An identifier was already taken; `renamed_to` was used instead.
    DuplicateIdentifier { id: String, renamed_to: String },
    /// A record whose parent does not resolve; the record was excluded.
    OrphanChild {
        id: String,
        parent: Option<String>,
    },
    /// The coding children of a gene disagree on strand; `chosen` (the first
    /// child's strand) was used for the synthesized transcript.
    StrandConflict { gene: String, chosen: Strand },
    /// A record lists more than one parent; only `kept` was used.
    MultipleParents { id: String, kept: String },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::MalformedAttribute { row, field } => write!(
                f,
                "row {}: dropped attribute field {:?} without a key-value delimiter",
                row, field
            ),
            Issue::DuplicateIdentifier { id, renamed_to } => write!(
                f,
                "identifier {} is already in use, using {} instead",
                id, renamed_to
            ),
            Issue::OrphanChild {
                id,
                parent: Some(p),
            } => write!(
                f,
                "{} references the missing parent {}, excluding it from the output",
                id, p
            ),
            Issue::OrphanChild { id, parent: None } => write!(
                f,
                "{} has no parent, excluding it from the output",
                id
            ),
            Issue::StrandConflict { gene, chosen } => write!(
                f,
                "the coding features of {} are on different strands, using the first seen strand ({})",
                gene, chosen
            ),
            Issue::MultipleParents { id, kept } => write!(
                f,
                "{} has more than one parent, only {} is kept",
                id, kept
            ),
        }
    }
}

/// The warnings collected over a conversion run, in the order they were found.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    issues: Vec<Issue>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    /// Logs `issue` and keeps it in the report.
    pub fn record(&mut self, issue: Issue) {
        warn!("{}", issue);
        self.issues.push(issue);
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// The orphans that were excluded, by feature id.
    pub fn orphans(&self) -> Vec<&str> {
        self.issues
            .iter()
            .filter_map(|i| match i {
                Issue::OrphanChild { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect()
    }
}

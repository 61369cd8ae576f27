//! prokka2vep turns a [Prokka](https://github.com/tseemann/prokka) GFF3 annotation into the
//! gene → transcript → exon/CDS layout that the Ensembl Variant Effect Predictor expects.
//!
//! Prokka writes coding genes as a `gene` with its `CDS` directly below it, and non-coding genes
//! as a `gene` with a `tRNA`/`rRNA`/... child. The conversion runs four stages over the records:
//! [parser] builds typed [record::Record]s from a GFF3 [polars](https://pola.rs/) data frame,
//! [synthesizer] creates the missing transcript level of coding genes, [ordering] merges the
//! tables and puts every gene block in hierarchy order, and [ncrna] lets the RNA record of a
//! non-coding gene play the transcript role. [pipeline] ties the stages to the [reader] and
//! [writer].

pub mod gff_utils;
pub mod issues;
pub mod ncrna;
pub mod options;
pub mod ordering;
pub mod parser;
pub mod pipeline;
pub mod reader;
pub mod record;
pub mod synthesizer;
pub mod writer;

pub use issues::{Diagnostics, Issue};
pub use pipeline::{convert_df, run};
pub use reader::GffColumns;
pub use record::{FeatureType, Record, Strand};

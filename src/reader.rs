pub mod gff;
pub use gff::GffColumns;

//! Catalog import planning and fuzzy name matching.

pub mod import;
pub mod matcher;

pub use import::{plan_import, ImportPlan, ImportReport, ImportRow, SkippedRow};
pub use matcher::{best_match, jaccard_similarity, normalize_name, DEFAULT_MATCH_THRESHOLD};

//! Prune workflow: decisioning, filesystem safety rails and per-set
//! sequencing.

pub mod decision;
pub mod fileops;
pub mod orchestrator;

pub use decision::{decide, DecisionMode, KeepPrompt, PruneDecision};
pub use fileops::{
    apply_path_map, is_allowed, DeleteFilesMode, FileOpResult, FileOps, PathMapRule,
};
pub use orchestrator::Orchestrator;

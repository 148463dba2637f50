//! Ranking, reporting and the end-to-end analysis pipeline.

pub mod aggregator;
pub mod report;
pub mod runner;

pub use self::aggregator::{aggregate, summarize, AttackerTotal, RankedSummary, RankingBasis};
pub use self::runner::AnalysisOutcome;

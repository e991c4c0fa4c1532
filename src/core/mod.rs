pub mod dictionary_sync;
pub mod document;
pub mod engine;
pub mod keywords;
pub mod publish;
pub mod rule_pack;

pub use crate::domain::model::{IdentityMap, KeywordList, PatchReport, RunSummary};
pub use crate::domain::ports::{ComplianceService, Storage};
pub use crate::utils::error::Result;

//! Operation catalogue and per-operation cache policy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::MuninnError;

/// The kind of AI task being requested.
///
/// Drives the cache key namespace, the model configuration lookup and the
/// cache policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// Tailored resume text for a candidate profile.
    ResumeGeneration,
    /// Cover letter for a specific posting.
    CoverLetter,
    /// Applicant-tracking-system match score between a resume and a posting.
    AtsScoring,
    /// Structured job posting extracted from free text.
    JobExtraction,
    /// Skills present in / missing from a resume relative to a posting.
    SkillGapAnalysis,
}

/// Whether an operation reads and writes through the response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Look up before calling upstream, store after a successful parse.
    ReadThrough,
    /// Always call upstream; never read or write the cache.
    Bypass,
}

impl CachePolicy {
    /// The `skip_cache` flag passed to `execute` for this policy.
    pub fn skips_cache(self) -> bool {
        matches!(self, CachePolicy::Bypass)
    }
}

impl OperationType {
    /// Every operation type, in declaration order.
    pub const ALL: [OperationType; 5] = [
        OperationType::ResumeGeneration,
        OperationType::CoverLetter,
        OperationType::AtsScoring,
        OperationType::JobExtraction,
        OperationType::SkillGapAnalysis,
    ];

    /// Stable tag used in cache keys, usage records and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            OperationType::ResumeGeneration => "resume_generation",
            OperationType::CoverLetter => "cover_letter",
            OperationType::AtsScoring => "ats_scoring",
            OperationType::JobExtraction => "job_extraction",
            OperationType::SkillGapAnalysis => "skill_gap_analysis",
        }
    }

    /// Cache policy for this operation.
    ///
    /// Free-text generation must always be fresh; scored and extracted
    /// outputs are a deterministic function of bounded input.
    pub fn cache_policy(self) -> CachePolicy {
        match self {
            OperationType::ResumeGeneration | OperationType::CoverLetter => CachePolicy::Bypass,
            OperationType::AtsScoring
            | OperationType::JobExtraction
            | OperationType::SkillGapAnalysis => CachePolicy::ReadThrough,
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = MuninnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationType::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| MuninnError::InvalidInput(format!("unknown operation type: {s}")))
    }
}

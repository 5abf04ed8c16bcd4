//! Typed wrappers for the built-in operations.
//!
//! Each wrapper builds its prompt, derives cache parameters from its inputs
//! and picks `skip_cache` from [`OperationType::cache_policy`]. Generation
//! operations always go upstream; scoring and extraction read through the
//! cache.

use serde_json::json;

use super::service::Orchestrator;
use super::{parse, prompts};
use crate::types::{AtsScore, JobPosting, OperationType, SkillGapAnalysis};
use crate::{MuninnError, Result};

impl Orchestrator {
    /// Generate a resume from a candidate profile, optionally tailored to a
    /// job description.
    pub async fn generate_resume(
        &self,
        profile: &str,
        job_description: Option<&str>,
    ) -> Result<String> {
        let op = OperationType::ResumeGeneration;
        let params = json!({ "profile": profile, "job_description": job_description });
        self.execute(
            op,
            prompts::resume(profile, job_description),
            &params,
            parse::text,
            op.cache_policy().skips_cache(),
        )
        .await
    }

    /// Write a cover letter for a job description.
    pub async fn generate_cover_letter(
        &self,
        profile: &str,
        job_description: &str,
        company: Option<&str>,
    ) -> Result<String> {
        let op = OperationType::CoverLetter;
        let params = json!({
            "profile": profile,
            "job_description": job_description,
            "company": company,
        });
        self.execute(
            op,
            prompts::cover_letter(profile, job_description, company),
            &params,
            parse::text,
            op.cache_policy().skips_cache(),
        )
        .await
    }

    /// Score how well a resume matches a job description.
    pub async fn score_ats(&self, resume: &str, job_description: &str) -> Result<AtsScore> {
        let op = OperationType::AtsScoring;
        let params = json!({ "resume": resume, "job_description": job_description });
        self.execute(
            op,
            prompts::ats_score(resume, job_description),
            &params,
            |raw| {
                let score: AtsScore = parse::json(raw)?;
                if score.score > 100 {
                    return Err(MuninnError::InvalidResponse(format!(
                        "ATS score {} is outside 0-100",
                        score.score
                    )));
                }
                Ok(score)
            },
            op.cache_policy().skips_cache(),
        )
        .await
    }

    /// Extract a structured job posting from free text.
    pub async fn extract_job_posting(&self, text: &str) -> Result<JobPosting> {
        if text.trim().is_empty() {
            return Err(MuninnError::InvalidInput("job posting text is empty".to_string()));
        }
        let op = OperationType::JobExtraction;
        let params = json!({ "text": text });
        self.execute(
            op,
            prompts::job_extraction(text),
            &params,
            |raw| {
                let posting: JobPosting = parse::json(raw)?;
                if posting.title.trim().is_empty() {
                    return Err(MuninnError::InvalidResponse(
                        "extracted job posting has no title".to_string(),
                    ));
                }
                Ok(posting)
            },
            op.cache_policy().skips_cache(),
        )
        .await
    }

    /// Compare the skills in a resume with those a job requires.
    pub async fn analyze_skill_gap(
        &self,
        resume: &str,
        job_description: &str,
    ) -> Result<SkillGapAnalysis> {
        let op = OperationType::SkillGapAnalysis;
        let params = json!({ "resume": resume, "job_description": job_description });
        self.execute(
            op,
            prompts::skill_gap(resume, job_description),
            &params,
            parse::json::<SkillGapAnalysis>,
            op.cache_policy().skips_cache(),
        )
        .await
    }
}

//! Tests for the typed operation wrappers and the operation catalogue.

use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use muninn::{
    CacheConfig, CachePolicy, ChatTransport, CompletionRequest, CompletionResponse, ModelConfig,
    Muninn, MuninnError, OperationType, Orchestrator, Result, Role,
};

/// Transport that always answers with the same text and remembers requests.
struct FixedTransport {
    text: String,
    calls: AtomicU32,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl FixedTransport {
    fn new(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn call_count(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ChatTransport for FixedTransport {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.requests.lock().unwrap().push(request.clone());
        Ok(CompletionResponse::from_text(self.text.clone()).with_usage(200, 100))
    }
}

fn orchestrator(transport: &Arc<FixedTransport>) -> Orchestrator {
    Muninn::builder()
        .transport(transport.clone())
        .cache(CacheConfig::new().sweep_interval(None))
        .build()
        .unwrap()
}

// ============================================================================
// Catalogue
// ============================================================================

#[test]
fn cache_policy_table() {
    assert_eq!(OperationType::ResumeGeneration.cache_policy(), CachePolicy::Bypass);
    assert_eq!(OperationType::CoverLetter.cache_policy(), CachePolicy::Bypass);
    assert_eq!(OperationType::AtsScoring.cache_policy(), CachePolicy::ReadThrough);
    assert_eq!(OperationType::JobExtraction.cache_policy(), CachePolicy::ReadThrough);
    assert_eq!(OperationType::SkillGapAnalysis.cache_policy(), CachePolicy::ReadThrough);
    assert!(CachePolicy::Bypass.skips_cache());
    assert!(!CachePolicy::ReadThrough.skips_cache());
}

#[test]
fn operation_tags_round_trip() {
    for op in OperationType::ALL {
        assert_eq!(OperationType::from_str(op.as_str()).unwrap(), op);
        assert_eq!(op.to_string(), op.as_str());
    }
    assert!(matches!(
        OperationType::from_str("poetry"),
        Err(MuninnError::InvalidInput(_))
    ));
}

#[test]
fn operation_serializes_as_snake_case_tag() {
    let json = serde_json::to_string(&OperationType::SkillGapAnalysis).unwrap();
    assert_eq!(json, "\"skill_gap_analysis\"");
}

// ============================================================================
// Structured operations
// ============================================================================

#[tokio::test]
async fn score_ats_parses_and_caches() {
    let transport = FixedTransport::new(
        "```json\n{\"score\": 78, \"matched_keywords\": [\"rust\"], \"missing_keywords\": [\"k8s\"], \"suggestions\": []}\n```",
    );
    let orchestrator = orchestrator(&transport);

    let score = orchestrator.score_ats("resume", "job").await.unwrap();
    assert_eq!(score.score, 78);
    assert_eq!(score.matched_keywords, vec!["rust"]);
    assert_eq!(score.missing_keywords, vec!["k8s"]);

    let again = orchestrator.score_ats("resume", "job").await.unwrap();
    assert_eq!(score, again);
    assert_eq!(transport.call_count(), 1);

    // different inputs are a different cache entry
    orchestrator.score_ats("other resume", "job").await.unwrap();
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn score_out_of_range_is_rejected() {
    let transport = FixedTransport::new(r#"{"score": 140}"#);
    let orchestrator = orchestrator(&transport);

    let err = orchestrator.score_ats("resume", "job").await.unwrap_err();
    assert!(matches!(err, MuninnError::InvalidResponse(ref m) if m.contains("140")));
    assert_eq!(orchestrator.cache_stats().size, 0);
}

#[tokio::test]
async fn extract_job_posting_parses_optional_fields() {
    let transport = FixedTransport::new(
        r#"Here you go: {"title": "Backend Engineer", "company": "Acme", "skills": ["Rust", "SQL"]}"#,
    );
    let orchestrator = orchestrator(&transport);

    let posting = orchestrator
        .extract_job_posting("Acme is hiring a Backend Engineer...")
        .await
        .unwrap();

    assert_eq!(posting.title, "Backend Engineer");
    assert_eq!(posting.company.as_deref(), Some("Acme"));
    assert_eq!(posting.location, None);
    assert_eq!(posting.skills, vec!["Rust", "SQL"]);
    assert!(posting.requirements.is_empty());
}

#[tokio::test]
async fn extract_job_posting_requires_title() {
    let transport = FixedTransport::new(r#"{"title": "  "}"#);
    let orchestrator = orchestrator(&transport);

    let err = orchestrator.extract_job_posting("text").await.unwrap_err();
    assert!(matches!(err, MuninnError::InvalidResponse(_)));
}

#[tokio::test]
async fn extract_job_posting_rejects_empty_input_before_upstream() {
    let transport = FixedTransport::new(r#"{"title": "x"}"#);
    let orchestrator = orchestrator(&transport);

    let err = orchestrator.extract_job_posting("   ").await.unwrap_err();
    assert!(matches!(err, MuninnError::InvalidInput(_)));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn analyze_skill_gap_parses() {
    let transport = FixedTransport::new(
        r#"{"matching_skills": ["Rust"], "missing_skills": ["Go"], "recommendations": ["Learn Go"]}"#,
    );
    let orchestrator = orchestrator(&transport);

    let gap = orchestrator.analyze_skill_gap("resume", "job").await.unwrap();
    assert_eq!(gap.matching_skills, vec!["Rust"]);
    assert_eq!(gap.missing_skills, vec!["Go"]);
    assert_eq!(gap.recommendations, vec!["Learn Go"]);
}

// ============================================================================
// Generation operations
// ============================================================================

#[tokio::test]
async fn generation_always_goes_upstream() {
    let transport = FixedTransport::new("  # Jane Doe\n\nRust engineer.  \n");
    let orchestrator = orchestrator(&transport);

    let first = orchestrator.generate_resume("profile", None).await.unwrap();
    let second = orchestrator.generate_resume("profile", None).await.unwrap();

    assert_eq!(first, "# Jane Doe\n\nRust engineer.");
    assert_eq!(first, second);
    assert_eq!(transport.call_count(), 2);
    assert_eq!(orchestrator.cache_stats().size, 0);
}

#[tokio::test]
async fn cover_letter_uses_generation_model() {
    let transport = FixedTransport::new("Dear Acme team,");
    let orchestrator = orchestrator(&transport);

    let letter = orchestrator
        .generate_cover_letter("profile", "job", Some("Acme"))
        .await
        .unwrap();
    assert_eq!(letter, "Dear Acme team,");

    let requests = transport.requests.lock().unwrap();
    assert_eq!(requests[0].model, "gpt-4o");
    assert_eq!(requests[0].max_tokens, 1500);
    assert_eq!(requests[0].messages[0].role, Role::System);
    assert!(requests[0].messages[1].content.contains("Acme"));
}

#[tokio::test]
async fn empty_generation_is_invalid() {
    let transport = FixedTransport::new("   ");
    let orchestrator = orchestrator(&transport);

    let err = orchestrator.generate_resume("profile", None).await.unwrap_err();
    assert!(matches!(err, MuninnError::InvalidResponse(_)));
}

#[tokio::test]
async fn model_overrides_reach_the_request() {
    let transport = FixedTransport::new(r#"{"score": 50}"#);
    let orchestrator = Muninn::builder()
        .transport(transport.clone())
        .model(OperationType::AtsScoring, ModelConfig::new("local-model", 0.0, 256))
        .build()
        .unwrap();

    orchestrator.score_ats("resume", "job").await.unwrap();

    let requests = transport.requests.lock().unwrap();
    assert_eq!(requests[0].model, "local-model");
    assert_eq!(requests[0].max_tokens, 256);
    assert_eq!(
        orchestrator.model_config(OperationType::AtsScoring).model,
        "local-model"
    );
}

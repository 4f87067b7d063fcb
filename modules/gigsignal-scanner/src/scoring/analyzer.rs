//! LLM scoring pipeline: prompt construction, tolerant response parsing
//! with a deterministic fallback, rule overlay, and bounded-concurrency
//! batch scoring.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use gigsignal_common::{Opportunity, OpportunityStatus, ScoreDetails, ScoringConfig};
use llm_client::util::{extract_json_object, strip_code_blocks, truncate_to_char_boundary};
use llm_client::{retry, ChatApi, LlmError, Message, RetryPolicy};

use super::rules;

/// Cap on how much of the description goes into the prompt.
const DESCRIPTION_PROMPT_CAP: usize = 800;

const FALLBACK_SCORE: i64 = 50;
pub const PARSE_FAILED_REASON: &str = "parse failed; manual review";

/// What the model returns for one posting. Every field has a default so
/// a sparse-but-valid object still parses.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Analysis {
    #[serde(default = "default_score")]
    pub score: i64,
    #[serde(default = "default_reason")]
    pub reason: String,
    #[serde(default = "default_match_score")]
    pub match_score: i64,
    #[serde(default)]
    pub budget_reasonable: bool,
    #[serde(default)]
    pub requirement_clear: bool,
    #[serde(default)]
    pub estimated_hours: f64,
    #[serde(default)]
    pub suggested_bid: f64,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
    /// Derived here from the score threshold, never taken from the model.
    #[serde(skip)]
    pub recommended: bool,
}

fn default_score() -> i64 {
    FALLBACK_SCORE
}

fn default_reason() -> String {
    "no evaluation reason".to_string()
}

fn default_match_score() -> i64 {
    50
}

impl Analysis {
    /// The deterministic record used when the model's output is unusable.
    /// Never retried: the same input would produce the same output.
    pub fn fallback(reason: &str) -> Self {
        Self {
            score: FALLBACK_SCORE,
            reason: reason.to_string(),
            match_score: 0,
            budget_reasonable: false,
            requirement_clear: false,
            estimated_hours: 0.0,
            suggested_bid: 0.0,
            risks: Vec::new(),
            strengths: Vec::new(),
            recommended: false,
        }
    }

    fn details(&self) -> ScoreDetails {
        ScoreDetails {
            match_score: self.match_score,
            budget_reasonable: self.budget_reasonable,
            requirement_clear: self.requirement_clear,
            estimated_hours: self.estimated_hours,
            suggested_bid: self.suggested_bid,
            recommended: self.recommended,
            risks: self.risks.clone(),
            strengths: self.strengths.clone(),
        }
    }
}

pub struct ScoreAnalyzer {
    chat: Arc<dyn ChatApi>,
    scoring: ScoringConfig,
    retry_policy: RetryPolicy,
}

impl ScoreAnalyzer {
    pub fn new(chat: Arc<dyn ChatApi>, scoring: ScoringConfig) -> Self {
        Self {
            chat,
            scoring,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    fn build_prompt(&self, opp: &Opportunity) -> String {
        let skills_line = if opp.skills_required.is_empty() {
            "not stated".to_string()
        } else {
            opp.skills_required.join(", ")
        };
        let budget_line = opp
            .budget_display()
            .unwrap_or_else(|| "not stated".to_string());
        let description = truncate_to_char_boundary(&opp.description, DESCRIPTION_PROMPT_CAP);
        let my_skills = self.scoring.skills.join(", ");
        let min_budget = self.scoring.min_budget;

        format!(
            "You are a veteran freelance contractor evaluating whether a project is worth bidding on.\n\
             \n\
             Project:\n\
             - Title: {title}\n\
             - Budget: {budget_line}\n\
             - Skills listed: {skills_line}\n\
             - Description: {description}\n\
             \n\
             My skills: {my_skills}\n\
             \n\
             Evaluate:\n\
             1. Budget sanity (below ${min_budget} is not worth it)\n\
             2. Skill match against my skills\n\
             3. Requirement clarity\n\
             4. Complexity vs. effort\n\
             5. Likely competition\n\
             \n\
             Reply with a single JSON object and nothing else:\n\
             {{\n\
                 \"score\": 85,\n\
                 \"reason\": \"one sentence on why this is or is not worth applying to\",\n\
                 \"match_score\": 90,\n\
                 \"budget_reasonable\": true,\n\
                 \"requirement_clear\": true,\n\
                 \"estimated_hours\": 40,\n\
                 \"suggested_bid\": 1200,\n\
                 \"risks\": [\"possible risk\"],\n\
                 \"strengths\": [\"project strength\"]\n\
             }}",
            title = opp.title,
        )
    }

    /// Tolerates fenced code blocks and surrounding prose; any failure to
    /// produce a valid object is a parse failure, not an error.
    fn parse_response(&self, response: &str) -> Option<Analysis> {
        let cleaned = strip_code_blocks(response);
        let object = extract_json_object(cleaned)?;
        let mut analysis: Analysis = serde_json::from_str(object).ok()?;
        analysis.recommended = analysis.score >= self.scoring.score_threshold;
        Some(analysis)
    }

    /// Score a single record. Transport failures are retried with
    /// backoff; token-limit and parse failures degrade to the fallback.
    pub async fn analyze(&self, opp: &Opportunity, cancelled: &AtomicBool) -> Analysis {
        let mut analysis = if cancelled.load(Ordering::Relaxed) {
            Analysis::fallback("cancelled before scoring")
        } else {
            let messages = [Message::user(self.build_prompt(opp))];
            let result = retry(&self.retry_policy, LlmError::is_retryable, || async {
                self.chat.chat(&messages, 0.3).await
            })
            .await;

            match result {
                Ok(text) => self.parse_response(&text).unwrap_or_else(|| {
                    warn!(
                        natural_key = %opp.natural_key,
                        raw = truncate_to_char_boundary(&text, 200),
                        "Unparseable scoring response"
                    );
                    Analysis::fallback(PARSE_FAILED_REASON)
                }),
                Err(e) => {
                    warn!(natural_key = %opp.natural_key, error = %e, "Scoring call failed");
                    Analysis::fallback("analysis failed; manual review")
                }
            }
        };

        rules::apply_rule_overlay(opp, &mut analysis, &self.scoring);
        analysis.score = analysis.score.clamp(0, 100);

        info!(
            natural_key = %opp.natural_key,
            score = analysis.score,
            recommended = analysis.recommended,
            "Scored"
        );
        analysis
    }

    /// Score a batch with at most `max_concurrent` in-flight LLM calls.
    /// Cancellation is observed before each call; already-started calls
    /// finish and their results are kept (best-effort, no all-or-nothing).
    /// The result is sorted `score DESC, created_at ASC`.
    pub async fn batch_analyze(
        &self,
        mut opps: Vec<Opportunity>,
        cancelled: &Arc<AtomicBool>,
    ) -> Vec<Opportunity> {
        let k = self.scoring.max_concurrent.max(1);

        let analyses_futs: Vec<_> = opps
            .iter()
            .enumerate()
            .map(|(index, opp)| {
                let cancelled = cancelled.clone();
                async move { (index, self.analyze(opp, &cancelled).await) }
            })
            .collect();
        let analyses: Vec<(usize, Analysis)> = stream::iter(analyses_futs)
            .buffer_unordered(k)
            .collect()
            .await;

        for (index, analysis) in analyses {
            let opp = &mut opps[index];
            opp.score = Some(analysis.score);
            opp.score_reason = Some(analysis.reason.clone());
            opp.score_details = Some(analysis.details());
            opp.status = OpportunityStatus::Scored;
        }

        opps.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        opps
    }
}

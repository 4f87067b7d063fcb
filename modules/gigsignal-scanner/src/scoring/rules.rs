//! Deterministic overlay applied after every LLM response. The model
//! proposes; these rules dispose.

use gigsignal_common::{BudgetType, Opportunity, ScoringConfig};

use super::analyzer::Analysis;

const BUDGET_FLOOR_CAP: i64 = 40;
const SKILL_MISMATCH_CAP: i64 = 50;
const VAGUE_DESCRIPTION_CAP: i64 = 60;

const MIN_MATCH_SCORE: i64 = 30;
const MIN_DESCRIPTION_LEN: usize = 100;

pub fn apply_rule_overlay(opp: &Opportunity, analysis: &mut Analysis, config: &ScoringConfig) {
    // The floor is a project-total threshold; an hourly rate is not a
    // project total, so hourly records are exempt.
    if let Some(budget_min) = opp.budget_min.filter(|_| opp.budget_type != BudgetType::Hourly) {
        if budget_min < config.min_budget {
            analysis.score = analysis.score.min(BUDGET_FLOOR_CAP);
            analysis.recommended = false;
            analysis.budget_reasonable = false;
            analysis.reason = format!(
                "budget ${budget_min} below ${} floor. {}",
                config.min_budget, analysis.reason
            );
        }
    }

    if !opp.skills_required.is_empty() && analysis.match_score < MIN_MATCH_SCORE {
        analysis.score = analysis.score.min(SKILL_MISMATCH_CAP);
        analysis.recommended = false;
        analysis.reason = format!("weak skill match. {}", analysis.reason);
    }

    if opp.description.len() < MIN_DESCRIPTION_LEN {
        analysis.score = analysis.score.min(VAGUE_DESCRIPTION_CAP);
        analysis.requirement_clear = false;
        analysis.reason = format!("description too short. {}", analysis.reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gigsignal_common::{BudgetType, JobPost, Platform};

    fn opp(budget_min: Option<f64>, skills: Vec<String>, description: &str) -> Opportunity {
        Opportunity::from_post(
            JobPost {
                platform: Platform::Upwork,
                platform_id: "1".to_string(),
                title: "Some project".to_string(),
                company: None,
                location: None,
                description: description.to_string(),
                url: "https://example.com".to_string(),
                budget_min,
                budget_max: budget_min,
                budget_type: BudgetType::Fixed,
                skills,
                client_country: None,
                client_rating: None,
                posted_at: None,
            },
            Utc::now(),
        )
    }

    fn high_analysis() -> Analysis {
        let mut analysis = Analysis::fallback("seed");
        analysis.score = 90;
        analysis.match_score = 85;
        analysis.recommended = true;
        analysis.budget_reasonable = true;
        analysis.requirement_clear = true;
        analysis.reason = "great project".to_string();
        analysis
    }

    fn long_description() -> String {
        "A thoroughly described project with goals, scope and deliverables. ".repeat(3)
    }

    #[test]
    fn budget_floor_clamps_regardless_of_model_output() {
        let config = ScoringConfig::default(); // floor 300
        let opp = opp(Some(100.0), vec!["Rust".to_string()], &long_description());
        let mut analysis = high_analysis();

        apply_rule_overlay(&opp, &mut analysis, &config);
        assert!(analysis.score <= 40);
        assert!(!analysis.recommended);
        assert!(!analysis.budget_reasonable);
        assert!(analysis.reason.contains("below"));
    }

    #[test]
    fn hourly_rates_are_exempt_from_the_floor() {
        let config = ScoringConfig::default();
        let mut hourly = opp(Some(80.0), vec!["Rust".to_string()], &long_description());
        hourly.budget_type = BudgetType::Hourly;
        let mut analysis = high_analysis();

        apply_rule_overlay(&hourly, &mut analysis, &config);
        assert_eq!(analysis.score, 90);
        assert!(analysis.recommended);
    }

    #[test]
    fn missing_budget_does_not_trigger_floor() {
        let config = ScoringConfig::default();
        let opp = opp(None, vec!["Rust".to_string()], &long_description());
        let mut analysis = high_analysis();

        apply_rule_overlay(&opp, &mut analysis, &config);
        assert_eq!(analysis.score, 90);
        assert!(analysis.recommended);
    }

    #[test]
    fn weak_skill_match_clamps_only_when_skills_declared() {
        let config = ScoringConfig::default();
        let mut analysis = high_analysis();
        analysis.match_score = 10;

        let with_skills = opp(Some(1000.0), vec!["Rust".to_string()], &long_description());
        let mut clamped = analysis.clone();
        apply_rule_overlay(&with_skills, &mut clamped, &config);
        assert!(clamped.score <= 50);
        assert!(!clamped.recommended);

        // No declared skills: the rule cannot fire.
        let without_skills = opp(Some(1000.0), vec![], &long_description());
        let mut untouched = analysis.clone();
        apply_rule_overlay(&without_skills, &mut untouched, &config);
        assert_eq!(untouched.score, 90);
    }

    #[test]
    fn short_description_caps_and_flags_clarity() {
        let config = ScoringConfig::default();
        let opp = opp(Some(1000.0), vec!["Rust".to_string()], "too short");
        let mut analysis = high_analysis();

        apply_rule_overlay(&opp, &mut analysis, &config);
        assert!(analysis.score <= 60);
        assert!(!analysis.requirement_clear);
        // Clarity alone does not flip the recommendation.
        assert!(analysis.recommended);
    }

    #[test]
    fn rules_stack() {
        let config = ScoringConfig::default();
        let opp = opp(Some(50.0), vec!["Rust".to_string()], "short");
        let mut analysis = high_analysis();
        analysis.match_score = 5;

        apply_rule_overlay(&opp, &mut analysis, &config);
        assert!(analysis.score <= 40);
        assert!(!analysis.recommended);
        assert!(!analysis.requirement_clear);
    }
}

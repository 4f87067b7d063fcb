use std::sync::OnceLock;

use regex::Regex;

use crate::types::BudgetType;

/// Outcome of parsing a free-form budget/salary string.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParsedBudget {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub budget_type: BudgetType,
}

fn amount_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // A number with optional thousands separators, decimals and k-suffix.
    RE.get_or_init(|| Regex::new(r"(\d[\d,]*(?:\.\d+)?)\s*([kK])?").expect("Invalid amount regex"))
}

/// Parse budget strings as the sources emit them: `"500"`, `"2000-3000"`,
/// `"Hourly: 25-50"`, `"$80/hr"`, `"$100k-150k"`. Currency symbols and
/// thousands separators are stripped. Anything without a number comes
/// back as `unknown` with no bounds.
pub fn parse_budget(raw: &str) -> ParsedBudget {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ParsedBudget::default();
    }

    let mut amounts: Vec<f64> = Vec::new();
    for cap in amount_regex().captures_iter(trimmed) {
        let digits = cap[1].replace(',', "");
        let Ok(mut value) = digits.parse::<f64>() else {
            continue;
        };
        if cap.get(2).is_some() {
            value *= 1000.0;
        }
        amounts.push(value);
        if amounts.len() == 2 {
            break;
        }
    }

    if amounts.is_empty() {
        return ParsedBudget::default();
    }

    let lower = trimmed.to_lowercase();
    let hourly = lower.contains("/hr")
        || lower.contains("hour")
        || lower.split(|c: char| !c.is_alphanumeric()).any(|w| w == "hr");
    let budget_type = if hourly {
        BudgetType::Hourly
    } else {
        BudgetType::Fixed
    };

    let min = amounts[0];
    let max = *amounts.get(1).unwrap_or(&min);
    ParsedBudget {
        min: Some(min.min(max)),
        max: Some(min.max(max)),
        budget_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_number_is_fixed() {
        let parsed = parse_budget("500");
        assert_eq!(parsed.min, Some(500.0));
        assert_eq!(parsed.max, Some(500.0));
        assert_eq!(parsed.budget_type, BudgetType::Fixed);
    }

    #[test]
    fn range_with_currency_and_separators() {
        let parsed = parse_budget("$1,500-3,000");
        assert_eq!(parsed.min, Some(1500.0));
        assert_eq!(parsed.max, Some(3000.0));
        assert_eq!(parsed.budget_type, BudgetType::Fixed);
    }

    #[test]
    fn hourly_prefix_form() {
        let parsed = parse_budget("Hourly: 25-50");
        assert_eq!(parsed.min, Some(25.0));
        assert_eq!(parsed.max, Some(50.0));
        assert_eq!(parsed.budget_type, BudgetType::Hourly);
    }

    #[test]
    fn per_hour_rate_form() {
        let parsed = parse_budget("$80/hr");
        assert_eq!(parsed.min, Some(80.0));
        assert_eq!(parsed.max, Some(80.0));
        assert_eq!(parsed.budget_type, BudgetType::Hourly);
    }

    #[test]
    fn k_suffix_salary_range() {
        let parsed = parse_budget("$100k-150k");
        assert_eq!(parsed.min, Some(100_000.0));
        assert_eq!(parsed.max, Some(150_000.0));
        assert_eq!(parsed.budget_type, BudgetType::Fixed);
    }

    #[test]
    fn unparseable_text_is_unknown() {
        let parsed = parse_budget("Competitive salary");
        assert_eq!(parsed.min, None);
        assert_eq!(parsed.max, None);
        assert_eq!(parsed.budget_type, BudgetType::Unknown);

        assert_eq!(parse_budget(""), ParsedBudget::default());
        assert_eq!(parse_budget("   "), ParsedBudget::default());
    }

    #[test]
    fn reversed_range_is_normalized() {
        let parsed = parse_budget("3000-2000");
        assert_eq!(parsed.min, Some(2000.0));
        assert_eq!(parsed.max, Some(3000.0));
    }
}

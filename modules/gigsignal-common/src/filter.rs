use serde::Deserialize;

/// Keyword gate applied between fetch and dedup. All comparisons are
/// case-insensitive substring checks. A record passes only if some
/// required keyword and some level keyword match, so an empty keyword
/// list rejects everything.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    /// At least one must appear in title or description.
    #[serde(default)]
    pub required_keywords: Vec<String>,
    /// At least one must appear in the title.
    #[serde(default)]
    pub level_keywords: Vec<String>,
    /// Any hit in title or description disqualifies the record.
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
}

impl FilterConfig {
    pub fn matches(&self, title: &str, description: &str) -> bool {
        let title_lower = title.to_lowercase();
        let desc_lower = description.to_lowercase();

        if self.exclude_keywords.iter().any(|k| {
            let k = k.to_lowercase();
            title_lower.contains(&k) || desc_lower.contains(&k)
        }) {
            return false;
        }

        let has_required = self.required_keywords.iter().any(|k| {
            let k = k.to_lowercase();
            title_lower.contains(&k) || desc_lower.contains(&k)
        });
        if !has_required {
            return false;
        }

        let has_level = self
            .level_keywords
            .iter()
            .any(|k| title_lower.contains(&k.to_lowercase()));

        has_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FilterConfig {
        FilterConfig {
            required_keywords: vec!["java".to_string()],
            level_keywords: vec!["senior".to_string(), "lead".to_string()],
            exclude_keywords: vec!["internship".to_string()],
        }
    }

    #[test]
    fn requires_keyword_in_title_or_description() {
        let f = config();
        assert!(f.matches("Senior Java Developer", "backend work"));
        assert!(f.matches("Senior Backend Developer", "mostly Java services"));
        assert!(!f.matches("Senior Python Developer", "django APIs"));
    }

    #[test]
    fn level_keyword_must_be_in_title() {
        let f = config();
        assert!(!f.matches("Java Developer", "we want a senior person"));
        assert!(f.matches("Lead Java Developer", ""));
    }

    #[test]
    fn exclude_keywords_disqualify_anywhere() {
        let f = config();
        assert!(!f.matches("Senior Java Internship", "great team"));
        assert!(!f.matches("Senior Java Developer", "this is an Internship role"));
    }

    #[test]
    fn empty_lists_reject_everything() {
        let f = FilterConfig::default();
        assert!(!f.matches("Anything", "at all"));

        // A required keyword alone is not enough without level keywords.
        let f = FilterConfig {
            required_keywords: vec!["java".to_string()],
            level_keywords: vec![],
            exclude_keywords: vec![],
        };
        assert!(!f.matches("Senior Java Developer", "java work"));
    }
}

use regex::Regex;

use crate::error::GigSignalError;

/// Default skill vocabulary when the config doesn't supply one.
pub const DEFAULT_SKILLS: &[&str] = &[
    "React",
    "Vue.js",
    "JavaScript",
    "TypeScript",
    "Python",
    "FastAPI",
    "Django",
    "Flask",
    "Node.js",
    "Express",
    "Java",
    "Spring Boot",
    "Kotlin",
    "Go",
    "Rust",
    "SQL",
    "PostgreSQL",
    "MongoDB",
    "MySQL",
    "REST API",
    "GraphQL",
    "AWS",
    "Docker",
    "Kubernetes",
    "DevOps",
    "CI/CD",
];

/// Scans free text for canonical-vocabulary skill terms. Matching is
/// case-insensitive and whole-word; the emitted casing is always the
/// canonical one.
pub struct SkillMatcher {
    terms: Vec<(String, Regex)>,
}

impl SkillMatcher {
    pub fn new(vocabulary: &[String]) -> Result<Self, GigSignalError> {
        let mut terms = Vec::with_capacity(vocabulary.len());
        for skill in vocabulary {
            let escaped = regex::escape(skill);
            // \b only works against word characters; terms like "CI/CD"
            // end on a symbol and get no trailing boundary.
            let prefix = if skill.starts_with(|c: char| c.is_alphanumeric()) {
                r"\b"
            } else {
                ""
            };
            let suffix = if skill.ends_with(|c: char| c.is_alphanumeric()) {
                r"\b"
            } else {
                ""
            };
            let pattern = format!("(?i){prefix}{escaped}{suffix}");
            let re = Regex::new(&pattern).map_err(|e| {
                GigSignalError::Config(format!("invalid skill term {skill:?}: {e}"))
            })?;
            terms.push((skill.clone(), re));
        }
        Ok(Self { terms })
    }

    pub fn default_vocabulary() -> Self {
        let vocab: Vec<String> = DEFAULT_SKILLS.iter().map(|s| s.to_string()).collect();
        Self::new(&vocab).expect("default skill vocabulary must compile")
    }

    /// Extract canonical skills mentioned in `text`, in vocabulary order,
    /// deduplicated.
    pub fn extract(&self, text: &str) -> Vec<String> {
        self.terms
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(canonical, _)| canonical.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(terms: &[&str]) -> SkillMatcher {
        let vocab: Vec<String> = terms.iter().map(|s| s.to_string()).collect();
        SkillMatcher::new(&vocab).unwrap()
    }

    #[test]
    fn extracts_canonical_casing_case_insensitively() {
        let m = matcher(&["Rust", "PostgreSQL"]);
        let skills = m.extract("We need RUST and postgresql experience");
        assert_eq!(skills, vec!["Rust".to_string(), "PostgreSQL".to_string()]);
    }

    #[test]
    fn whole_word_matching_avoids_substrings() {
        let m = matcher(&["Go", "Java"]);
        assert!(m.extract("Good knowledge of Gothic architecture").is_empty());
        assert_eq!(m.extract("JavaScript only"), Vec::<String>::new());
        assert_eq!(m.extract("Senior Java engineer"), vec!["Java".to_string()]);
        assert_eq!(m.extract("We write Go services"), vec!["Go".to_string()]);
    }

    #[test]
    fn symbol_terms_match() {
        let m = matcher(&["CI/CD", "Node.js"]);
        assert_eq!(
            m.extract("Experience with node.js and CI/CD pipelines"),
            vec!["CI/CD".to_string(), "Node.js".to_string()]
        );
    }

    #[test]
    fn duplicates_collapse() {
        let m = matcher(&["Python"]);
        assert_eq!(
            m.extract("Python, python, PYTHON"),
            vec!["Python".to_string()]
        );
    }
}

use glob::Pattern;
use serde::{Deserialize, Serialize};

pub const OTHER_CATEGORY: &str = "Other";

/// One row of a category table: space separated glob patterns and the label
/// given to names matching any of them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub pattern: String,
    pub category: String,
}

impl CategoryRule {
    pub fn new(pattern: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            category: category.into(),
        }
    }
}

enum Matcher {
    Glob(Pattern),
    Literal(String),
}

impl Matcher {
    fn new(pattern: &str) -> Self {
        match Pattern::new(pattern) {
            Ok(glob) => Matcher::Glob(glob),
            Err(_) => Matcher::Literal(pattern.to_string()),
        }
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            Matcher::Glob(glob) => glob.matches(name),
            Matcher::Literal(literal) => literal == name,
        }
    }
}

/// True if `name` matches any of the space separated glob patterns.
pub fn match_multiple(name: &str, patterns: &str) -> bool {
    patterns
        .split_whitespace()
        .any(|pattern| Matcher::new(pattern).matches(name))
}

/// First matching rule wins, in declaration order; otherwise `fallback`.
pub fn classify<'a>(name: &str, rules: &'a [CategoryRule], fallback: &'a str) -> &'a str {
    rules
        .iter()
        .find(|rule| match_multiple(name, &rule.pattern))
        .map(|rule| rule.category.as_str())
        .unwrap_or(fallback)
}

/// A category table with its patterns compiled once.
pub struct Categories {
    rules: Vec<(Vec<Matcher>, String)>,
    fallback: String,
}

impl Categories {
    pub fn new(rules: &[CategoryRule], fallback: impl Into<String>) -> Self {
        let rules = rules
            .iter()
            .map(|rule| {
                let matchers = rule.pattern.split_whitespace().map(Matcher::new).collect();
                (matchers, rule.category.clone())
            })
            .collect();
        Self {
            rules,
            fallback: fallback.into(),
        }
    }

    pub fn classify(&self, name: &str) -> &str {
        self.rules
            .iter()
            .find(|(matchers, _)| matchers.iter().any(|matcher| matcher.matches(name)))
            .map(|(_, category)| category.as_str())
            .unwrap_or(&self.fallback)
    }

    /// Category labels in declaration order, followed by the fallback.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        for (_, category) in &self.rules {
            if !labels.contains(&category.as_str()) {
                labels.push(category);
            }
        }
        if !labels.contains(&self.fallback.as_str()) {
            labels.push(&self.fallback);
        }
        labels
    }
}

pub fn default_attribute_categories() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new("ai:*", "Arnold"),
        CategoryRule::new("dl:*", "3Delight"),
        CategoryRule::new("cycles:*", "Cycles"),
        CategoryRule::new("ri:*", "RenderMan"),
        CategoryRule::new("gl:*", "OpenGL"),
        CategoryRule::new("usd:*", "USD"),
        CategoryRule::new("user:*", "User"),
        CategoryRule::new(
            "scene:visible doubleSided render:* gaffer:* linkedLights shadowedLights filteredLights",
            "Standard",
        ),
    ]
}

pub fn default_option_categories() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new("ai:*", "Arnold"),
        CategoryRule::new("dl:*", "3Delight"),
        CategoryRule::new("cycles:*", "Cycles"),
        CategoryRule::new("ri:*", "RenderMan"),
        CategoryRule::new("gl:*", "OpenGL"),
        CategoryRule::new("usd:*", "USD"),
        CategoryRule::new("user:*", "User"),
        CategoryRule::new("render:* sampleMotion", "Standard"),
    ]
}

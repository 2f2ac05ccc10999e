/// Keyword pattern configuration for category scoring and urgency detection.
///
/// A `PatternSet` is built once at start, validated, and then shared read-only by
/// every request. Declaration order of the categories is significant: it is the
/// tie-break order when two categories score the same.
use std::path::Path;
use std::str::FromStr;

use regex::Regex;
use serde::Deserialize;

use crate::error::AppError;
use ngo_common::api::CategoryInfo;

pub const FALLBACK_CATEGORY: &str = "General Legal Aid";
pub const HIGH_PRIORITY_POINTS: u32 = 15;
pub const MEDIUM_PRIORITY_POINTS: u32 = 3;
const MAX_WEIGHT: u32 = 100;

pub const DEFAULT_URGENCY_TERMS: &[&str] = &[
    "urgent",
    "emergency",
    "immediate",
    "help now",
    "asap",
    "crisis",
    "danger",
    "threat",
    "violence",
    "severe",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Term may appear anywhere, including inside a longer word.
    #[default]
    Substring,
    /// Term must be delimited by non-word characters or the text edges.
    WordBoundary,
}

impl FromStr for MatchMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "substring" => Ok(MatchMode::Substring),
            "word" | "word_boundary" => Ok(MatchMode::WordBoundary),
            other => Err(AppError::Config(format!(
                "KEYWORD_MATCH_MODE must be 'substring' or 'word', got '{other}'"
            ))),
        }
    }
}

/// Category pattern as declared in configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPattern {
    pub category: String,
    #[serde(default)]
    pub high_priority_terms: Vec<String>,
    #[serde(default)]
    pub medium_priority_terms: Vec<String>,
    pub weight: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatternFile {
    categories: Vec<CategoryPattern>,
    #[serde(default)]
    urgency_terms: Option<Vec<String>>,
}

/// A lowercase search term, plus its word-boundary matcher when that mode is on.
#[derive(Debug, Clone)]
pub struct Term {
    text: String,
    boundary: Option<Regex>,
}

impl Term {
    fn compile(raw: &str, mode: MatchMode) -> Result<Self, String> {
        let text = raw.trim().to_lowercase();
        if text.is_empty() {
            return Err("blank term".to_string());
        }
        let boundary = match mode {
            MatchMode::Substring => None,
            MatchMode::WordBoundary => {
                let pattern = format!(r"(?:^|\W){}(?:$|\W)", regex::escape(&text));
                Some(Regex::new(&pattern).map_err(|e| e.to_string())?)
            }
        };
        Ok(Self { text, boundary })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// `haystack` must already be lowercase.
    pub fn is_in(&self, haystack: &str) -> bool {
        match &self.boundary {
            Some(re) => re.is_match(haystack),
            None => haystack.contains(&self.text),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub category: String,
    pub weight: u32,
    pub high_priority: Vec<Term>,
    pub medium_priority: Vec<Term>,
}

#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<CompiledPattern>,
    urgency_terms: Vec<Term>,
}

impl PatternSet {
    pub fn new(
        patterns: Vec<CategoryPattern>,
        urgency_terms: Vec<String>,
        mode: MatchMode,
    ) -> Result<Self, AppError> {
        if patterns.is_empty() {
            return Err(AppError::Patterns("no categories declared".to_string()));
        }

        let mut compiled: Vec<CompiledPattern> = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let category = pattern.category.trim().to_string();
            if category.is_empty() {
                return Err(AppError::Patterns("category name must not be blank".to_string()));
            }
            if category == FALLBACK_CATEGORY {
                return Err(AppError::Patterns(format!(
                    "'{FALLBACK_CATEGORY}' is reserved for the fallback"
                )));
            }
            if compiled.iter().any(|c| c.category == category) {
                return Err(AppError::Patterns(format!("duplicate category '{category}'")));
            }
            if pattern.weight == 0 || pattern.weight > MAX_WEIGHT {
                return Err(AppError::Patterns(format!(
                    "'{category}': weight must be within 1..={MAX_WEIGHT}, got {}",
                    pattern.weight
                )));
            }
            if pattern.high_priority_terms.is_empty() && pattern.medium_priority_terms.is_empty() {
                return Err(AppError::Patterns(format!("'{category}': no terms declared")));
            }

            let compile_all = |terms: &[String]| -> Result<Vec<Term>, AppError> {
                let mut out: Vec<Term> = Vec::with_capacity(terms.len());
                for raw in terms {
                    let term = Term::compile(raw, mode)
                        .map_err(|e| AppError::Patterns(format!("'{category}': {e}")))?;
                    if !out.iter().any(|t| t.text == term.text) {
                        out.push(term);
                    }
                }
                Ok(out)
            };

            compiled.push(CompiledPattern {
                high_priority: compile_all(&pattern.high_priority_terms)?,
                medium_priority: compile_all(&pattern.medium_priority_terms)?,
                category,
                weight: pattern.weight,
            });
        }

        let urgency_terms = urgency_terms
            .iter()
            .map(|t| Term::compile(t, mode))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Patterns(format!("urgency terms: {e}")))?;

        Ok(Self {
            patterns: compiled,
            urgency_terms,
        })
    }

    /// The built-in six-category configuration.
    pub fn builtin(mode: MatchMode) -> Result<Self, AppError> {
        Self::new(default_patterns(), default_urgency_terms(), mode)
    }

    /// Load a JSON pattern file: `{"categories": [...], "urgencyTerms": [...]}`.
    /// `urgencyTerms` may be omitted to keep the defaults.
    pub fn from_file(path: &Path, mode: MatchMode) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let file: PatternFile = serde_json::from_str(&content)
            .map_err(|e| AppError::Patterns(format!("{}: {e}", path.display())))?;
        Self::new(
            file.categories,
            file.urgency_terms.unwrap_or_else(default_urgency_terms),
            mode,
        )
    }

    pub fn patterns(&self) -> &[CompiledPattern] {
        &self.patterns
    }

    pub fn urgency_terms(&self) -> &[Term] {
        &self.urgency_terms
    }

    /// Declaration index of a category, used as the scoring tie-break.
    pub fn position_of(&self, category: &str) -> Option<usize> {
        self.patterns.iter().position(|p| p.category == category)
    }

    pub fn category_infos(&self) -> Vec<CategoryInfo> {
        self.patterns
            .iter()
            .map(|p| CategoryInfo {
                name: p.category.clone(),
                weight: p.weight,
                high_priority_terms: p.high_priority.len(),
                medium_priority_terms: p.medium_priority.len(),
            })
            .collect()
    }
}

fn default_urgency_terms() -> Vec<String> {
    DEFAULT_URGENCY_TERMS.iter().map(|s| s.to_string()).collect()
}

fn pattern(category: &str, weight: u32, high: &[&str], medium: &[&str]) -> CategoryPattern {
    CategoryPattern {
        category: category.to_string(),
        high_priority_terms: high.iter().map(|s| s.to_string()).collect(),
        medium_priority_terms: medium.iter().map(|s| s.to_string()).collect(),
        weight,
    }
}

pub fn default_patterns() -> Vec<CategoryPattern> {
    vec![
        pattern(
            "LGBTQ+ Rights",
            3,
            &[
                "lgbtq", "lgbt", "transgender", "gay", "lesbian", "bisexual", "queer",
                "homophobia", "transphobia", "same-sex", "sexual orientation",
                "gender identity", "conversion therapy",
            ],
            &["pride", "coming out", "non-binary", "nonbinary", "intersex", "section 377"],
        ),
        pattern(
            "Women's Rights & Gender Justice",
            3,
            &[
                "domestic violence", "dowry", "sexual harassment", "sexual assault", "rape",
                "acid attack", "marital abuse", "women's rights", "gender discrimination",
                "maternity",
            ],
            &[
                "woman", "women", "wife", "husband", "divorce", "alimony", "gender",
                "harassment", "abuse",
            ],
        ),
        pattern(
            "Child Protection",
            3,
            &[
                "child abuse", "child labour", "child labor", "child marriage",
                "child trafficking", "pocso", "juvenile", "underage", "orphan",
            ],
            &["child", "children", "kid", "school", "custody", "adoption", "guardian"],
        ),
        pattern(
            "Labor & Employment Rights",
            2,
            &[
                "workplace discrimination", "workplace harassment", "unpaid wages",
                "wrongful termination", "unfair dismissal", "minimum wage",
                "employment contract", "labour law", "labor law", "bonded labour",
            ],
            &[
                "employer", "employee", "employment", "wages", "salary", "job", "workplace",
                "fired", "overtime", "contract", "union", "boss",
            ],
        ),
        pattern(
            "Refugee & Migrant Rights",
            2,
            &[
                "refugee", "asylum", "deportation", "migrant", "immigrant", "stateless",
                "citizenship", "visa", "detention center", "detention centre",
            ],
            &["immigration", "border", "passport", "foreigner", "displaced", "nationality"],
        ),
        pattern(
            "Human Rights & Civil Liberties",
            1,
            &[
                "human rights", "civil liberties", "police brutality", "custodial torture",
                "free speech", "freedom of speech", "unlawful detention", "illegal detention",
                "caste discrimination", "torture",
            ],
            &[
                "discrimination", "police", "arrest", "protest", "rights", "equality",
                "privacy", "justice",
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_set_declares_six_categories_in_order() {
        let set = PatternSet::builtin(MatchMode::Substring).unwrap();
        let names: Vec<&str> = set.patterns().iter().map(|p| p.category.as_str()).collect();
        assert_eq!(
            names,
            [
                "LGBTQ+ Rights",
                "Women's Rights & Gender Justice",
                "Child Protection",
                "Labor & Employment Rights",
                "Refugee & Migrant Rights",
                "Human Rights & Civil Liberties",
            ]
        );
        assert_eq!(set.position_of("Child Protection"), Some(2));
        assert_eq!(set.position_of(FALLBACK_CATEGORY), None);
        assert_eq!(set.urgency_terms().len(), DEFAULT_URGENCY_TERMS.len());
    }

    #[test]
    fn rejects_duplicate_categories() {
        let err = PatternSet::new(
            vec![pattern("A", 1, &["x"], &[]), pattern("A", 2, &["y"], &[])],
            vec![],
            MatchMode::Substring,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Patterns(_)));
    }

    #[test]
    fn rejects_zero_weight_and_reserved_name() {
        assert!(PatternSet::new(vec![pattern("A", 0, &["x"], &[])], vec![], MatchMode::Substring).is_err());
        assert!(PatternSet::new(
            vec![pattern(FALLBACK_CATEGORY, 1, &["x"], &[])],
            vec![],
            MatchMode::Substring
        )
        .is_err());
    }

    #[test]
    fn rejects_blank_terms_and_empty_patterns() {
        assert!(PatternSet::new(vec![pattern("A", 1, &["  "], &[])], vec![], MatchMode::Substring).is_err());
        assert!(PatternSet::new(vec![pattern("A", 1, &[], &[])], vec![], MatchMode::Substring).is_err());
        assert!(PatternSet::new(vec![], vec![], MatchMode::Substring).is_err());
    }

    #[test]
    fn terms_are_lowercased_and_deduplicated() {
        let set = PatternSet::new(
            vec![pattern("A", 1, &["Asylum", "asylum ", "VISA"], &[])],
            vec!["URGENT".to_string()],
            MatchMode::Substring,
        )
        .unwrap();
        let terms: Vec<&str> = set.patterns()[0].high_priority.iter().map(Term::as_str).collect();
        assert_eq!(terms, ["asylum", "visa"]);
        assert_eq!(set.urgency_terms()[0].as_str(), "urgent");
    }

    #[test]
    fn substring_mode_matches_inside_words() {
        let visa = Term::compile("visa", MatchMode::Substring).unwrap();
        assert!(visa.is_in("the visas expired"));
        let gay = Term::compile("gay", MatchMode::Substring).unwrap();
        assert!(gay.is_in("we live on gaylord street"));
    }

    #[test]
    fn word_mode_requires_delimiters() {
        let visa = Term::compile("visa", MatchMode::WordBoundary).unwrap();
        assert!(!visa.is_in("the visas expired"));
        assert!(visa.is_in("my visa expired"));
        assert!(visa.is_in("visa"));
        let gay = Term::compile("gay", MatchMode::WordBoundary).unwrap();
        assert!(!gay.is_in("we live on gaylord street"));
        assert!(gay.is_in("i am gay."));
        let plus = Term::compile("lgbtq+", MatchMode::WordBoundary).unwrap();
        assert!(plus.is_in("lgbtq+ support"));
    }

    #[test]
    fn match_mode_parses_env_values() {
        assert_eq!("substring".parse::<MatchMode>().unwrap(), MatchMode::Substring);
        assert_eq!("Word".parse::<MatchMode>().unwrap(), MatchMode::WordBoundary);
        assert!("fuzzy".parse::<MatchMode>().is_err());
    }

    #[test]
    fn loads_pattern_file_with_default_urgency_terms() {
        let path = std::env::temp_dir().join(format!("patterns-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"categories": [{"category": "Housing", "highPriorityTerms": ["eviction"], "weight": 2}]}"#,
        )
        .unwrap();
        let set = PatternSet::from_file(&path, MatchMode::Substring).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(set.patterns()[0].category, "Housing");
        assert_eq!(set.urgency_terms().len(), DEFAULT_URGENCY_TERMS.len());
    }
}

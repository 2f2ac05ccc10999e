/// Conversation analysis: normalization, category scoring, urgency detection and
/// category ranking. Everything here is pure; the only input besides the request is
/// the shared `PatternSet`.
use std::collections::BTreeMap;

use ngo_common::api::{AnalysisSummary, ConversationTurn, UrgencyLevel};

use crate::patterns::{PatternSet, FALLBACK_CATEGORY, HIGH_PRIORITY_POINTS, MEDIUM_PRIORITY_POINTS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredCategory {
    pub category: String,
    /// Declaration index in the pattern set.
    pub position: usize,
    pub score: u32,
}

/// Raw scorer output: categories with a positive score in declaration order, and
/// every matched high-priority term (may repeat across categories).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryScores {
    pub scored: Vec<ScoredCategory>,
    pub matched_keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    /// Highest score first; the fallback category alone when nothing matched.
    pub categories: Vec<String>,
    pub keywords: Vec<String>,
    pub urgency: UrgencyLevel,
    pub category_scores: BTreeMap<String, u32>,
}

impl AnalysisResult {
    pub fn is_fallback(&self) -> bool {
        self.category_scores.is_empty()
    }

    pub fn category_index(&self, category: &str) -> Option<usize> {
        self.categories.iter().position(|c| c == category)
    }

    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary {
            detected_categories: self.categories.clone(),
            keywords: self.keywords.clone(),
            urgency_level: self.urgency,
            category_scores: self.category_scores.clone(),
        }
    }
}

/// Flatten the conversation into one lowercase string, turns first, then the
/// trailing message. Pieces are space-joined so adjacent turns never fuse words.
pub fn normalize_conversation(history: &[ConversationTurn], last_message: Option<&str>) -> String {
    history
        .iter()
        .map(|turn| turn.text.as_str())
        .chain(last_message)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn score_categories(text: &str, patterns: &PatternSet) -> CategoryScores {
    let mut result = CategoryScores::default();
    if text.is_empty() {
        return result;
    }

    for (position, pattern) in patterns.patterns().iter().enumerate() {
        let mut score = 0u32;
        for term in pattern.high_priority.iter().filter(|t| t.is_in(text)) {
            score += HIGH_PRIORITY_POINTS * pattern.weight;
            result.matched_keywords.push(term.as_str().to_string());
        }
        let medium_hits = pattern.medium_priority.iter().filter(|t| t.is_in(text)).count() as u32;
        score += medium_hits * MEDIUM_PRIORITY_POINTS * pattern.weight;

        if score > 0 {
            result.scored.push(ScoredCategory {
                category: pattern.category.clone(),
                position,
                score,
            });
        }
    }
    result
}

pub fn detect_urgency(text: &str, patterns: &PatternSet) -> UrgencyLevel {
    if patterns.urgency_terms().iter().any(|t| t.is_in(text)) {
        UrgencyLevel::High
    } else {
        UrgencyLevel::Normal
    }
}

pub fn rank_categories(scores: CategoryScores, urgency: UrgencyLevel) -> AnalysisResult {
    let keywords = dedup_preserving_order(scores.matched_keywords);

    if scores.scored.is_empty() {
        return AnalysisResult {
            categories: vec![FALLBACK_CATEGORY.to_string()],
            keywords,
            urgency,
            category_scores: BTreeMap::new(),
        };
    }

    let mut scored = scores.scored;
    scored.sort_by(|a, b| b.score.cmp(&a.score).then(a.position.cmp(&b.position)));

    let category_scores = scored
        .iter()
        .map(|s| (s.category.clone(), s.score))
        .collect();
    AnalysisResult {
        categories: scored.into_iter().map(|s| s.category).collect(),
        keywords,
        urgency,
        category_scores,
    }
}

/// Normalize, score, detect urgency and rank, in that order.
pub fn analyze(
    history: &[ConversationTurn],
    last_message: Option<&str>,
    patterns: &PatternSet,
) -> AnalysisResult {
    let text = normalize_conversation(history, last_message);
    let scores = score_categories(&text, patterns);
    let urgency = detect_urgency(&text, patterns);
    rank_categories(scores, urgency)
}

fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// Relevance ranking of candidate NGOs against an analysis result.
use ngo_common::api::Recommendation;
use ngo_common::ngo::NgoRecord;

use crate::analysis::AnalysisResult;

/// Bonus by the NGO category's index in the ranked analysis categories.
pub const CATEGORY_POSITION_BONUS: [u32; 5] = [200, 120, 60, 30, 15];
/// Bonus for a matched category ranked beyond the table.
pub const CATEGORY_TAIL_BONUS: u32 = 10;
pub const KEYWORD_OVERLAP_POINTS: u32 = 5;
pub const RATING_MULTIPLIER: f64 = 10.0;
pub const URGENT_QUALITY_BONUS: u32 = 25;
pub const URGENT_QUALITY_MIN_RATING: f64 = 4.0;
pub const HIGHLY_RATED_MIN_RATING: f64 = 4.5;
pub const WELL_RATED_MIN_RATING: f64 = 4.0;

const REASON_SEPARATOR: &str = " • ";
const DEFAULT_REASON: &str = "Matches your needs";

pub fn category_bonus(index: Option<usize>) -> u32 {
    match index {
        Some(i) => CATEGORY_POSITION_BONUS
            .get(i)
            .copied()
            .unwrap_or(CATEGORY_TAIL_BONUS),
        None => 0,
    }
}

/// Number of analysis keywords found in the NGO's name and description.
pub fn keyword_overlap(ngo: &NgoRecord, keywords: &[String]) -> usize {
    let haystack = format!("{} {}", ngo.name, ngo.description).to_lowercase();
    keywords.iter().filter(|k| haystack.contains(k.as_str())).count()
}

pub fn quality_points(rating: f64) -> u32 {
    (rating.clamp(0.0, ngo_common::ngo::MAX_RATING) * RATING_MULTIPLIER).round() as u32
}

pub fn relevance_score(ngo: &NgoRecord, analysis: &AnalysisResult) -> u32 {
    let mut score = category_bonus(analysis.category_index(&ngo.category));
    score += KEYWORD_OVERLAP_POINTS * keyword_overlap(ngo, &analysis.keywords) as u32;
    score += quality_points(ngo.rating);
    if analysis.urgency.is_high() && ngo.rating >= URGENT_QUALITY_MIN_RATING {
        score += URGENT_QUALITY_BONUS;
    }
    score
}

pub fn match_reason(ngo: &NgoRecord, analysis: &AnalysisResult) -> String {
    let mut reasons: Vec<String> = Vec::new();

    match analysis.category_index(&ngo.category) {
        Some(0) => reasons.push(format!("Perfect match for {}", ngo.category)),
        Some(1) => reasons.push(format!("Strong match for {}", ngo.category)),
        Some(_) => reasons.push(format!("Specializes in {}", ngo.category)),
        None => {}
    }

    if ngo.rating >= HIGHLY_RATED_MIN_RATING {
        reasons.push("Highly rated".to_string());
    } else if ngo.rating >= WELL_RATED_MIN_RATING {
        reasons.push("Well-rated".to_string());
    }

    if analysis.urgency.is_high() {
        reasons.push("Available for urgent cases".to_string());
    }

    if reasons.is_empty() {
        DEFAULT_REASON.to_string()
    } else {
        reasons.join(REASON_SEPARATOR)
    }
}

/// Score every candidate and sort descending. The sort is stable, so equal scores
/// keep the directory's order.
pub fn rank_candidates(candidates: Vec<NgoRecord>, analysis: &AnalysisResult) -> Vec<Recommendation> {
    let mut ranked: Vec<Recommendation> = candidates
        .into_iter()
        .map(|ngo| Recommendation {
            relevance_score: relevance_score(&ngo, analysis),
            match_reason: match_reason(&ngo, analysis),
            ngo,
        })
        .collect();
    ranked.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));
    ranked
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use ngo_common::api::UrgencyLevel;
    use ngo_common::ngo::NgoStatus;

    use super::*;

    fn ngo(id: &str, category: &str, rating: f64, description: &str) -> NgoRecord {
        NgoRecord {
            id: id.to_string(),
            name: format!("NGO {id}"),
            category: category.to_string(),
            description: description.to_string(),
            rating,
            status: NgoStatus::Active,
            contact: "+1 555 0100".to_string(),
            email: format!("{id}@example.org"),
            logo: None,
            images: vec![],
            created_at: None,
        }
    }

    fn analysis(categories: &[&str], keywords: &[&str], urgency: UrgencyLevel) -> AnalysisResult {
        AnalysisResult {
            categories: categories.iter().map(|s| s.to_string()).collect(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            urgency,
            category_scores: categories
                .iter()
                .enumerate()
                .map(|(i, c)| (c.to_string(), 100 - i as u32))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn position_bonus_table() {
        assert_eq!(category_bonus(Some(0)), 200);
        assert_eq!(category_bonus(Some(1)), 120);
        assert_eq!(category_bonus(Some(2)), 60);
        assert_eq!(category_bonus(Some(3)), 30);
        assert_eq!(category_bonus(Some(4)), 15);
        assert_eq!(category_bonus(Some(5)), 10);
        assert_eq!(category_bonus(Some(42)), 10);
        assert_eq!(category_bonus(None), 0);
    }

    #[test]
    fn score_combines_all_components() {
        let a = analysis(&["Child Protection"], &["child labour", "orphan"], UrgencyLevel::High);
        let candidate = ngo("x", "Child Protection", 4.2, "We fight child labour and support orphans");
        // 200 category + 2 keywords * 5 + 42 rating + 25 urgent boost
        assert_eq!(relevance_score(&candidate, &a), 200 + 10 + 42 + 25);
    }

    #[test]
    fn urgent_boost_requires_good_rating() {
        let a = analysis(&["Child Protection"], &[], UrgencyLevel::High);
        let weak = ngo("w", "Other", 3.9, "");
        assert_eq!(relevance_score(&weak, &a), 39);
        let strong = ngo("s", "Other", 4.0, "");
        assert_eq!(relevance_score(&strong, &a), 40 + 25);
    }

    #[test]
    fn keyword_overlap_is_case_insensitive_on_ngo_text() {
        let candidate = ngo("k", "Other", 0.0, "ASYLUM seekers and Refugee families");
        let keywords = vec!["asylum".to_string(), "refugee".to_string(), "visa".to_string()];
        assert_eq!(keyword_overlap(&candidate, &keywords), 2);
    }

    #[test]
    fn match_reasons_by_position_and_rating() {
        let a = analysis(&["A", "B", "C"], &[], UrgencyLevel::Normal);
        assert_eq!(
            match_reason(&ngo("1", "A", 4.6, ""), &a),
            "Perfect match for A • Highly rated"
        );
        assert_eq!(match_reason(&ngo("2", "B", 4.0, ""), &a), "Strong match for B • Well-rated");
        assert_eq!(match_reason(&ngo("3", "C", 3.0, ""), &a), "Specializes in C");
        assert_eq!(match_reason(&ngo("4", "Z", 3.0, ""), &a), "Matches your needs");
    }

    #[test]
    fn urgent_reason_is_appended() {
        let a = analysis(&["A"], &[], UrgencyLevel::High);
        assert_eq!(match_reason(&ngo("5", "Z", 1.0, ""), &a), "Available for urgent cases");
        assert_eq!(
            match_reason(&ngo("6", "A", 4.9, ""), &a),
            "Perfect match for A • Highly rated • Available for urgent cases"
        );
    }

    #[test]
    fn ranking_sorts_descending_and_keeps_ties_in_retrieval_order() {
        let a = analysis(&["A", "B"], &[], UrgencyLevel::Normal);
        let candidates = vec![
            ngo("tie-1", "Z", 4.0, ""),
            ngo("b", "B", 3.0, ""),
            ngo("tie-2", "Z", 4.0, ""),
            ngo("a", "A", 1.0, ""),
        ];
        let ranked = rank_candidates(candidates, &a);
        let ids: Vec<&str> = ranked.iter().map(|r| r.ngo.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "tie-1", "tie-2"]);
        assert!(ranked
            .windows(2)
            .all(|w| w[0].relevance_score >= w[1].relevance_score));
    }

    #[test]
    fn quality_points_round_to_nearest() {
        assert_eq!(quality_points(4.26), 43);
        assert_eq!(quality_points(5.0), 50);
        assert_eq!(quality_points(0.0), 0);
    }
}

use crate::models::Category;

/// Ordered keyword table. The first row with a matching keyword decides the category.
const KEYWORD_TABLE: &[(&[&str], Category)] = &[
    (
        &[
            "programming",
            "coding",
            "javascript",
            "python",
            "java",
            "react",
            "technology",
            "computer",
        ],
        Category::Technology,
    ),
    (&["history", "war", "ancient", "medieval"], Category::History),
    (&["science", "physics", "chemistry", "biology"], Category::Science),
    (
        &["geography", "country", "capital", "continent"],
        Category::Geography,
    ),
    (
        &["math", "algebra", "geometry", "calculus"],
        Category::Mathematics,
    ),
    (
        &["sport", "football", "basketball", "olympic"],
        Category::Sports,
    ),
    (
        &["movie", "music", "celebrity", "entertainment"],
        Category::Entertainment,
    ),
];

/// Map a free-text topic onto a fixed category by case-insensitive substring match.
pub fn classify(topic: &str) -> Category {
    let lower_topic = topic.to_lowercase();

    KEYWORD_TABLE
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|keyword| lower_topic.contains(keyword)))
        .map(|(_, category)| *category)
        .unwrap_or(Category::GeneralKnowledge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_categories() {
        let test_cases = vec![
            ("Python Basics", Category::Technology),
            ("JavaScript Programming", Category::Technology),
            ("Computer Networks", Category::Technology),
            ("World History", Category::History),
            ("Medieval Castles", Category::History),
            ("Science Facts", Category::Science),
            ("Organic Chemistry", Category::Science),
            ("European Capitals", Category::Geography),
            ("Linear Algebra", Category::Mathematics),
            ("Mathematics", Category::Mathematics),
            ("Olympic Records", Category::Sports),
            ("Movies and Entertainment", Category::Entertainment),
            ("Classical Music", Category::Entertainment),
        ];

        for (topic, expected) in test_cases {
            assert_eq!(classify(topic), expected, "Topic '{}' should map to {:?}", topic, expected);
        }
    }

    #[test]
    fn test_case_insensitive_match() {
        assert_eq!(classify("PYTHON"), Category::Technology);
        assert_eq!(classify("pHySiCs"), Category::Science);
    }

    #[test]
    fn test_fallback_category() {
        assert_eq!(classify("Philosophy"), Category::GeneralKnowledge);
        assert_eq!(classify("Current Affairs"), Category::GeneralKnowledge);
        assert_eq!(classify(""), Category::GeneralKnowledge);
    }

    #[test]
    fn test_first_matching_row_wins() {
        // "science" appears in the Science row, but "computer" is checked first
        assert_eq!(classify("Computer Science"), Category::Technology);
        // "war" (History) precedes "sport" (Sports)
        assert_eq!(classify("Sports during the war"), Category::History);
    }

    #[test]
    fn test_substring_containment() {
        // "java" is a substring of "javanese", matching is containment not word boundaries
        assert_eq!(classify("Javanese Cuisine"), Category::Technology);
        assert_eq!(classify("Software Award Winners"), Category::History);
    }

    #[test]
    fn test_classification_is_deterministic() {
        for topic in ["Space and Astronomy", "React Development", "Geography"] {
            let first = classify(topic);
            for _ in 0..10 {
                assert_eq!(classify(topic), first);
            }
        }
    }
}

//! Turns a structured query answer into display sections.
//!
//! [`interpret`] is pure: it never mutates the response and the same input
//! always renders byte-identical text. Section order is fixed: header,
//! intent, entities, key phrases, summary, results, suggestions.

use std::fmt;

use mea_core::{QueryResponse, ResultItem};

/// Values shown per entity type.
pub const MAX_ENTITY_VALUES: usize = 3;
/// Key phrases shown.
pub const MAX_KEY_PHRASES: usize = 5;
/// Items shown per category in grouped mode.
pub const MAX_ITEMS_PER_CATEGORY: usize = 2;
/// Suggestions shown alongside results.
pub const MAX_SUGGESTIONS: usize = 3;

/// Summary text the backend sends when it found nothing.
pub const NO_CONTENT_SUMMARY: &str = "No relevant content found.";

const NO_DOCUMENTS: &str =
    "No documents found. Try adding some documents to your knowledge base first.";
const DEFAULT_CATEGORY: &str = "general";

/// A query answer broken into display sections.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedSections {
    /// Echoed query text.
    pub query: String,
    /// Detected intent, when non-empty.
    pub intent: Option<String>,
    /// One line per non-empty entity type, values truncated.
    pub entities: Vec<EntityLine>,
    /// Truncated key phrases.
    pub key_phrases: Vec<String>,
    /// Summary, unless absent, empty or the "nothing found" sentinel.
    pub summary: Option<String>,
    /// Results block.
    pub results: ResultsSection,
    /// Suggestions to show (already truncated for the mode).
    pub suggestions: Vec<String>,
}

/// Entity type and its first few values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityLine {
    /// Entity type, e.g. `languages`.
    pub kind: String,
    /// Up to [`MAX_ENTITY_VALUES`] values.
    pub values: Vec<String>,
}

/// How results are laid out.
#[derive(Clone, Debug, PartialEq)]
pub enum ResultsSection {
    /// No results at all.
    Empty,
    /// More than one non-empty category.
    Grouped(Vec<CategoryGroup>),
    /// Every result in backend order.
    Flat {
        /// Matches before truncation, as reported by the backend.
        total: u64,
        /// All returned items.
        items: Vec<RenderedItem>,
    },
}

/// One category in grouped mode.
#[derive(Clone, Debug, PartialEq)]
pub struct CategoryGroup {
    /// Category name as sent by the backend.
    pub name: String,
    /// Size of the category before truncation.
    pub count: usize,
    /// First [`MAX_ITEMS_PER_CATEGORY`] items.
    pub items: Vec<RenderedItem>,
}

/// A result ready for display.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedItem {
    /// Document title.
    pub title: String,
    /// Score as given.
    pub score: f64,
    /// Chunk text.
    pub text: String,
    /// Category label.
    pub category: String,
}

impl RenderedItem {
    fn from_result(item: &ResultItem, fallback_category: &str) -> Self {
        Self {
            title: item.title.clone(),
            score: item.score,
            text: item.text.clone(),
            category: item
                .category
                .clone()
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| fallback_category.to_string()),
        }
    }
}

/// Build the display sections for `response`.
pub fn interpret(response: &QueryResponse) -> RenderedSections {
    let intent = response.intent.clone().filter(|i| !i.trim().is_empty());

    let entities = response
        .entities
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(kind, values)| EntityLine {
            kind: kind.clone(),
            values: values.iter().take(MAX_ENTITY_VALUES).cloned().collect(),
        })
        .collect();

    let key_phrases = response
        .key_phrases
        .iter()
        .take(MAX_KEY_PHRASES)
        .cloned()
        .collect();

    let summary = response
        .summary
        .clone()
        .filter(|s| !s.trim().is_empty() && s != NO_CONTENT_SUMMARY);

    let (results, suggestions) = if response.results.is_empty() {
        (ResultsSection::Empty, response.suggestions.clone())
    } else {
        let suggestions = response
            .suggestions
            .iter()
            .take(MAX_SUGGESTIONS)
            .cloned()
            .collect();
        (layout_results(response), suggestions)
    };

    RenderedSections {
        query: response.query.clone(),
        intent,
        entities,
        key_phrases,
        summary,
        results,
        suggestions,
    }
}

fn layout_results(response: &QueryResponse) -> ResultsSection {
    let groups: Vec<CategoryGroup> = response
        .grouped_results
        .iter()
        .filter(|(_, items)| !items.is_empty())
        .map(|(name, items)| CategoryGroup {
            name: name.clone(),
            count: items.len(),
            items: items
                .iter()
                .take(MAX_ITEMS_PER_CATEGORY)
                .map(|item| RenderedItem::from_result(item, name))
                .collect(),
        })
        .collect();

    if groups.len() > 1 {
        return ResultsSection::Grouped(groups);
    }

    ResultsSection::Flat {
        total: response.total,
        items: response
            .results
            .iter()
            .map(|item| RenderedItem::from_result(item, DEFAULT_CATEGORY))
            .collect(),
    }
}

// ─── Plain-text rendering ────────────────────────────────────────────────

impl fmt::Display for RenderedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  - {} (Score: {})", self.title, self.score)?;
        writeln!(f, "    {}", self.text)?;
        write!(f, "    Category: {}", self.category)
    }
}

impl fmt::Display for RenderedSections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut blocks: Vec<String> = Vec::new();

        let mut header = format!("AI Analysis Results\nQuery: {}", self.query);
        if let Some(intent) = &self.intent {
            header.push_str(&format!("\nIntent Detected: [{intent}]"));
        }
        blocks.push(header);

        if !self.entities.is_empty() {
            let lines: Vec<String> = self
                .entities
                .iter()
                .map(|e| format!("  {}: {}", e.kind, e.values.join(", ")))
                .collect();
            blocks.push(format!("Entities Found:\n{}", lines.join("\n")));
        }

        if !self.key_phrases.is_empty() {
            blocks.push(format!("Key Phrases:\n  {}", self.key_phrases.join(" • ")));
        }

        if let Some(summary) = &self.summary {
            blocks.push(format!("AI Summary:\n  {summary}"));
        }

        match &self.results {
            ResultsSection::Empty => blocks.push(NO_DOCUMENTS.to_string()),
            ResultsSection::Grouped(groups) => {
                let mut block = String::from("Results by Category:");
                for group in groups {
                    block.push_str(&format!(
                        "\n{} ({})",
                        group.name.to_uppercase(),
                        group.count
                    ));
                    for item in &group.items {
                        block.push_str(&format!("\n{item}"));
                    }
                }
                blocks.push(block);
            }
            ResultsSection::Flat { total, items } => {
                let mut block = format!(
                    "Found {total} relevant chunks, showing top {}",
                    items.len()
                );
                for item in items {
                    block.push_str(&format!("\n{item}"));
                }
                blocks.push(block);
            }
        }

        if !self.suggestions.is_empty() {
            let heading = match self.results {
                ResultsSection::Empty => "Suggestions:",
                ResultsSection::Grouped(_) | ResultsSection::Flat { .. } => "AI Suggestions:",
            };
            let lines: Vec<String> = self
                .suggestions
                .iter()
                .map(|s| format!("  • {s}"))
                .collect();
            blocks.push(format!("{heading}\n{}", lines.join("\n")));
        }

        f.write_str(&blocks.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use proptest::prelude::*;

    fn item(title: &str, score: f64, category: Option<&str>) -> ResultItem {
        ResultItem {
            title: title.into(),
            text: format!("{title} body"),
            score,
            category: category.map(str::to_string),
        }
    }

    fn items(prefix: &str, n: usize) -> Vec<ResultItem> {
        (0..n)
            .map(|i| item(&format!("{prefix}-{i}"), 1.0, Some(prefix)))
            .collect()
    }

    #[test]
    fn empty_results_list_every_suggestion() {
        let response = QueryResponse {
            query: "hello".into(),
            suggestions: vec!["Try X".into(), "Try Y".into(), "Try Z".into(), "Try W".into()],
            ..QueryResponse::default()
        };
        let rendered = interpret(&response);
        assert_eq!(rendered.results, ResultsSection::Empty);
        assert_eq!(rendered.suggestions.len(), 4);

        let text = rendered.to_string();
        assert!(text.contains("No documents found"));
        assert!(text.contains("Suggestions:\n  • Try X"));
        assert!(text.contains("  • Try W"));
        assert!(!text.contains("AI Suggestions"));
    }

    #[test]
    fn grouped_scenario_faq_and_docs() {
        let mut grouped = IndexMap::new();
        let _ = grouped.insert("faq".to_string(), items("faq", 2));
        let _ = grouped.insert("docs".to_string(), items("docs", 3));
        let response = QueryResponse {
            query: "q".into(),
            results: items("docs", 3),
            grouped_results: grouped,
            total: 5,
            ..QueryResponse::default()
        };

        let rendered = interpret(&response);
        let ResultsSection::Grouped(groups) = &rendered.results else {
            panic!("expected grouped mode");
        };
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].name, "docs");
        assert_eq!(groups[1].count, 3);
        assert_eq!(groups[1].items.len(), 2);

        let text = rendered.to_string();
        assert!(text.contains("FAQ (2)"));
        assert!(text.contains("DOCS (3)"));
        assert!(text.contains("docs-1"));
        assert!(!text.contains("docs-2"));
    }

    #[test]
    fn grouped_mode_caps_items_per_category() {
        let mut grouped = IndexMap::new();
        for name in ["a", "b", "c", "d", "e"] {
            let _ = grouped.insert(name.to_string(), items(name, 4));
        }
        let response = QueryResponse {
            results: items("a", 4),
            grouped_results: grouped,
            ..QueryResponse::default()
        };
        let ResultsSection::Grouped(groups) = interpret(&response).results else {
            panic!("expected grouped mode");
        };
        assert_eq!(groups.len(), 5);
        assert!(groups.iter().all(|g| g.items.len() == 2 && g.count == 4));
    }

    #[test]
    fn single_non_empty_category_falls_back_to_flat() {
        let mut grouped = IndexMap::new();
        let _ = grouped.insert("docs".to_string(), items("docs", 3));
        let _ = grouped.insert("faq".to_string(), Vec::new());
        let response = QueryResponse {
            results: vec![item("one", 2.5, None), item("two", 1.25, Some("technical"))],
            grouped_results: grouped,
            total: 9,
            ..QueryResponse::default()
        };

        let rendered = interpret(&response);
        let text = rendered.to_string();
        assert!(text.contains("Found 9 relevant chunks, showing top 2"));
        assert!(text.contains("  - one (Score: 2.5)\n    one body\n    Category: general"));
        assert!(text.contains("Category: technical"));
    }

    #[test]
    fn grouped_item_label_falls_back_to_group_name() {
        let mut grouped = IndexMap::new();
        let _ = grouped.insert("faq".to_string(), vec![item("f", 1.0, None)]);
        let _ = grouped.insert("docs".to_string(), vec![item("d", 1.0, Some("manual"))]);
        let response = QueryResponse {
            results: vec![item("f", 1.0, None)],
            grouped_results: grouped,
            ..QueryResponse::default()
        };
        let ResultsSection::Grouped(groups) = interpret(&response).results else {
            panic!("expected grouped mode");
        };
        assert_eq!(groups[0].items[0].category, "faq");
        assert_eq!(groups[1].items[0].category, "manual");
    }

    #[test]
    fn truncation_limits() {
        let mut entities = IndexMap::new();
        let _ = entities.insert(
            "people".to_string(),
            (0..10).map(|i| format!("p{i}")).collect::<Vec<_>>(),
        );
        let _ = entities.insert("places".to_string(), Vec::new());
        let response = QueryResponse {
            results: vec![item("r", 1.0, None)],
            entities,
            key_phrases: (0..7).map(|i| format!("k{i}")).collect(),
            suggestions: (0..6).map(|i| format!("s{i}")).collect(),
            ..QueryResponse::default()
        };

        let rendered = interpret(&response);
        assert_eq!(rendered.entities.len(), 1);
        assert_eq!(rendered.entities[0].values, ["p0", "p1", "p2"]);
        assert_eq!(rendered.key_phrases.len(), 5);
        assert_eq!(rendered.suggestions, ["s0", "s1", "s2"]);

        let text = rendered.to_string();
        assert!(text.contains("  people: p0, p1, p2\n"));
        assert!(!text.contains("places"));
        assert!(text.contains("k0 • k1 • k2 • k3 • k4"));
        assert!(!text.contains("k5"));
        assert!(text.contains("AI Suggestions:"));
    }

    #[test]
    fn sentinel_and_blank_summaries_are_hidden() {
        let mut response = QueryResponse {
            summary: Some(NO_CONTENT_SUMMARY.into()),
            ..QueryResponse::default()
        };
        assert!(interpret(&response).summary.is_none());

        response.summary = Some("   ".into());
        assert!(interpret(&response).summary.is_none());

        response.summary = Some("Rust is fast.".into());
        assert!(interpret(&response).to_string().contains("AI Summary:\n  Rust is fast."));
    }

    #[test]
    fn intent_badge_only_when_present() {
        let mut response = QueryResponse {
            query: "hola".into(),
            intent: Some(String::new()),
            ..QueryResponse::default()
        };
        assert!(!interpret(&response).to_string().contains("Intent"));

        response.intent = Some("greeting".into());
        let text = interpret(&response).to_string();
        assert!(text.starts_with("AI Analysis Results\nQuery: hola\nIntent Detected: [greeting]"));
    }

    #[test]
    fn sections_render_in_fixed_order() {
        let mut entities = IndexMap::new();
        let _ = entities.insert("topics".to_string(), vec!["rust".to_string()]);
        let response = QueryResponse {
            query: "q".into(),
            intent: Some("question".into()),
            entities,
            key_phrases: vec!["kp".into()],
            summary: Some("sum".into()),
            results: vec![item("r", 1.0, None)],
            suggestions: vec!["next".into()],
            total: 1,
            ..QueryResponse::default()
        };
        let text = interpret(&response).to_string();
        let positions: Vec<usize> = [
            "Query:",
            "Intent Detected",
            "Entities Found",
            "Key Phrases",
            "AI Summary",
            "Found 1 relevant",
            "AI Suggestions",
        ]
        .iter()
        .map(|needle| text.find(needle).unwrap())
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    proptest! {
        #[test]
        fn interpretation_is_deterministic(
            query in ".{0,20}",
            phrases in proptest::collection::vec("[a-z]{1,8}", 0..10),
            suggestions in proptest::collection::vec("[a-z ]{1,12}", 0..6),
            n_results in 0usize..5,
        ) {
            let response = QueryResponse {
                query,
                key_phrases: phrases,
                suggestions,
                results: (0..n_results).map(|i| item(&format!("t{i}"), 0.5, None)).collect(),
                total: n_results as u64,
                ..QueryResponse::default()
            };
            let before = response.clone();
            let first = interpret(&response).to_string();
            let second = interpret(&response).to_string();
            prop_assert_eq!(first, second);
            prop_assert_eq!(response, before);
        }
    }
}

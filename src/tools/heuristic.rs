//! Keyword-based tool usage inference
//!
//! Reporting only: when the model made no structured tool calls, guess which
//! offered tools the user's request was about. Nothing here invokes a tool.

use regex::Regex;
use std::sync::LazyLock;

static ARITHMETIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+[+\-*/]\d+").expect("valid arithmetic pattern"));

/// A tool category recognised by keywords
struct Category {
    tool: &'static str,
    keywords: &'static [&'static str],
    arithmetic: bool,
}

const CATEGORIES: &[Category] = &[
    Category {
        tool: "web_search",
        keywords: &["search", "latest", "current"],
        arithmetic: false,
    },
    Category {
        tool: "calculator",
        keywords: &["calculate", "math"],
        arithmetic: true,
    },
    Category {
        tool: "code_interpreter",
        keywords: &["code", "python", "javascript"],
        arithmetic: false,
    },
    Category {
        tool: "image_generation",
        keywords: &["image", "picture", "generate"],
        arithmetic: false,
    },
];

impl Category {
    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k))
            || (self.arithmetic && ARITHMETIC.is_match(lowered))
    }
}

/// Infer which of the `offered` tools look relevant to `text`.
///
/// Results follow category order and only contain names present in `offered`.
pub fn infer_tools_used(text: &str, offered: &[String]) -> Vec<String> {
    let lowered = text.to_lowercase();

    CATEGORIES
        .iter()
        .filter(|c| offered.iter().any(|name| name == c.tool))
        .filter(|c| c.matches(&lowered))
        .map(|c| c.tool.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offered(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_arithmetic_implies_calculator() {
        let tools = offered(&["calculator"]);
        assert_eq!(infer_tools_used("2+2?", &tools), vec!["calculator"]);
        assert_eq!(infer_tools_used("what is 12*3", &tools), vec!["calculator"]);
        assert!(infer_tools_used("chapters 12 - 14", &tools).is_empty());
        assert_eq!(infer_tools_used("Calculate my taxes", &tools), vec!["calculator"]);
    }

    #[test]
    fn test_only_offered_tools_are_reported() {
        assert!(infer_tools_used("search the latest news", &offered(&["calculator"])).is_empty());
        assert!(infer_tools_used("2+2", &[]).is_empty());
    }

    #[test]
    fn test_multiple_categories_in_fixed_order() {
        let tools = offered(&["image_generation", "code_interpreter", "web_search"]);
        let used = infer_tools_used("Search for python code that draws a picture", &tools);
        assert_eq!(used, vec!["web_search", "code_interpreter", "image_generation"]);
    }

    #[test]
    fn test_no_keywords() {
        let tools = offered(&["web_search", "calculator"]);
        assert!(infer_tools_used("hello there", &tools).is_empty());
    }
}

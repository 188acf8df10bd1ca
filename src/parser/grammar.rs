//! Candidate grammars for spatial references in model output.
//!
//! Grammars are tried strictly in the order returned here; the first one
//! whose match also converts cleanly wins. Specific, keyword-anchored forms
//! come first so that incidental numbers in prose are only used as a last
//! resort.

use std::sync::OnceLock;

use regex::Regex;

use crate::parser::types::ModelFamily;

/// Number token. Deliberately loose (`1.2.3` matches) so malformed numbers
/// surface as conversion failures rather than silently shifting the match.
const NUM: &str = r"(\.?\d[\d.]*)";
/// Separator inside brackets: a comma or plain whitespace.
const SEP: &str = r"(?:\s*,\s*|\s+)";

#[derive(Debug)]
pub struct Grammar {
    pub name: &'static str,
    pub regex: Regex,
}

impl Grammar {
    fn new(name: &'static str, pattern: &str) -> Self {
        let regex = Regex::new(pattern)
            .unwrap_or_else(|e| panic!("grammar {name} should compile: {e}"));
        Self { name, regex }
    }
}

fn quad(sep: &str) -> String {
    format!(r"{NUM}{sep}{NUM}{sep}{NUM}{sep}{NUM}")
}

/// Keywords that may introduce a box, longest alternatives first.
fn keywords(family: ModelFamily) -> Vec<&'static str> {
    let mut kws = Vec::new();
    match family {
        ModelFamily::Gemini => kws.push(r#""?box_2d"?"#),
        ModelFamily::CogAgent => {
            kws.push(r"grounded\s+operation\s*:\s*\[?\s*click\s+at\s+the\s+box");
            kws.push(r"click\s+at\s+the\s+box");
        }
        ModelFamily::Llava | ModelFamily::Generic => {}
    }
    kws.extend([r"bounding\s+box", "coordinates", "position", "box"]);
    kws
}

/// Box grammars in priority order for one model family.
pub fn box_grammars(family: ModelFamily) -> Vec<Grammar> {
    let kw = keywords(family).join("|");
    let q = quad(SEP);
    vec![
        Grammar::new(
            "keyword_box",
            &format!(r"(?i)(?:{kw})\**\s*[:=]?\s*\**\s*\[\[?\s*{q}\s*\]?\]"),
        ),
        Grammar::new("double_bracket", &format!(r"\[\[\s*{q}\s*\]\]")),
        Grammar::new("single_bracket", &format!(r"\[\s*{q}\s*\]")),
        Grammar::new("bare_quadruple", &quad(r"\s*,\s*")),
    ]
}

/// Cell-label grammars, shared by every family.
pub fn cell_grammars() -> &'static [Grammar] {
    static CELL_GRAMMARS: OnceLock<Vec<Grammar>> = OnceLock::new();
    CELL_GRAMMARS.get_or_init(|| {
        vec![
            Grammar::new(
                "grid_cell_label",
                r"(?i)grid\s*cell\**\s*[:=]\s*\**\s*\b([A-Z]{1,3}\d{1,4})\b",
            ),
            Grammar::new(
                "keyword_cell",
                r"\b(?i:cell|grid|in|at)\s+\**([A-Z]{1,3}\d{1,4})\b",
            ),
            Grammar::new("bare_cell", r"\b([A-Z]{1,2}\d{1,3})\b"),
        ]
    })
}

/// `Action: …` line written by models prompted for it.
pub fn action_line() -> &'static Regex {
    static ACTION_RE: OnceLock<Regex> = OnceLock::new();
    ACTION_RE.get_or_init(|| {
        Regex::new(r#"(?im)^[\s>*_"-]*action\**\s*:\s*\**\s*(.+?)\s*$"#)
            .expect("action regex should compile")
    })
}

/// Bracketed numeric groups (closed or cut off), stripped from user-facing text.
pub fn bracket_coordinates() -> &'static Regex {
    static BRACKET_RE: OnceLock<Regex> = OnceLock::new();
    BRACKET_RE.get_or_init(|| {
        Regex::new(r"\[\[?\s*[\d.][\d.,\s]*\]?\]?").expect("bracket regex should compile")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_grammar_order_is_specific_to_general() {
        let names: Vec<_> = box_grammars(ModelFamily::Generic).iter().map(|g| g.name).collect();
        assert_eq!(names, ["keyword_box", "double_bracket", "single_bracket", "bare_quadruple"]);
    }

    #[test]
    fn keyword_grammar_accepts_family_keywords() {
        let gemini = &box_grammars(ModelFamily::Gemini)[0];
        assert!(gemini.regex.is_match(r#"{"box_2d": [10, 20, 30, 40]}"#));
        assert!(gemini.regex.is_match("Bounding Box: [10, 20, 30, 40]"));

        let cog = &box_grammars(ModelFamily::CogAgent)[0];
        assert!(cog.regex.is_match("Grounded Operation: [CLICK at the box [[1, 2, 3, 4]]]"));
        assert!(cog.regex.is_match("box=[[1,2,3,4]]"));
    }

    #[test]
    fn separators_need_comma_or_space() {
        let single = &box_grammars(ModelFamily::Generic)[2];
        assert!(single.regex.is_match("[100 200 140 240]"));
        assert!(!single.regex.is_match("[1234]"));
    }

    #[test]
    fn bare_cell_is_case_sensitive() {
        let bare = &cell_grammars()[2];
        assert!(bare.regex.is_match("look at B3 please"));
        assert!(!bare.regex.is_match("an mp3 file"));
    }
}

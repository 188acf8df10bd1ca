use regex::{Captures, Regex};

use crate::errors::{VizCueError, VizCueResult};
use crate::grid::parse_cell_id;
use crate::parser::grammar::{self, Grammar};
use crate::parser::types::{
    AxisOrder, BoxRef, CoordSpace, ModelFamily, ParseMode, ParsedResponse, SpatialReference,
};

pub const DEFAULT_ACTION_TEXT: &str = "Click here";

/// Extracts at most one spatial reference from free-form model output.
///
/// Compiled once per model family; `parse` is pure.
pub struct ResponseParser {
    family: ModelFamily,
    box_grammars: Vec<Grammar>,
}

impl ResponseParser {
    pub fn new(family: ModelFamily) -> Self {
        Self {
            family,
            box_grammars: grammar::box_grammars(family),
        }
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    pub fn parse(&self, text: &str, mode: ParseMode) -> ParsedResponse {
        let found = match mode {
            ParseMode::Grid => first_match(grammar::cell_grammars(), text, convert_cell)
                .or_else(|| self.first_box(text)),
            ParseMode::Direct => self.first_box(text),
        };

        match found {
            Some((grammar, matched, reference)) => {
                tracing::debug!(grammar, matched = %matched, ?reference, "spatial reference parsed");
                let action_text = action_text(text, Some(&matched), &reference);
                ParsedResponse {
                    reference: Some(reference),
                    action_text,
                    matched: Some(matched),
                    grammar: Some(grammar),
                }
            }
            None => {
                tracing::debug!(?mode, family = ?self.family, "no spatial reference in response");
                ParsedResponse {
                    reference: None,
                    action_text: explicit_action(text).unwrap_or_else(|| DEFAULT_ACTION_TEXT.into()),
                    matched: None,
                    grammar: None,
                }
            }
        }
    }

    fn first_box(&self, text: &str) -> Option<(&'static str, String, SpatialReference)> {
        let family = self.family;
        first_match(&self.box_grammars, text, |caps| convert_box(caps, family))
    }
}

/// Convenience wrapper for one-off parses.
pub fn parse_response(text: &str, mode: ParseMode, family: ModelFamily) -> ParsedResponse {
    ResponseParser::new(family).parse(text, mode)
}

/// Try grammars in order; within a grammar try each match in text order.
/// Conversion failures fall through to the next candidate.
fn first_match<F>(
    grammars: &[Grammar],
    text: &str,
    convert: F,
) -> Option<(&'static str, String, SpatialReference)>
where
    F: Fn(&Captures) -> VizCueResult<SpatialReference>,
{
    for g in grammars {
        for caps in g.regex.captures_iter(text) {
            let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            match convert(&caps) {
                Ok(reference) => return Some((g.name, whole.to_string(), reference)),
                Err(e) => {
                    tracing::debug!(grammar = g.name, matched = whole, error = %e, "candidate rejected");
                }
            }
        }
    }
    None
}

fn convert_cell(caps: &Captures) -> VizCueResult<SpatialReference> {
    let label = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    parse_cell_id(label)
        .map(SpatialReference::GridCell)
        .ok_or_else(|| VizCueError::CoordinateConversion(format!("not a cell label: {label:?}")))
}

fn convert_box(caps: &Captures, family: ModelFamily) -> VizCueResult<SpatialReference> {
    let mut raw = [""; 4];
    let mut values = [0.0f64; 4];
    for i in 0..4 {
        let token = caps.get(i + 1).map(|m| m.as_str()).unwrap_or_default();
        let value: f64 = token
            .parse()
            .map_err(|_| VizCueError::CoordinateConversion(format!("not a number: {token:?}")))?;
        if !value.is_finite() {
            return Err(VizCueError::CoordinateConversion(format!("not finite: {token:?}")));
        }
        raw[i] = token;
        values[i] = value;
    }

    Ok(SpatialReference::Box(BoxRef {
        values,
        space: classify_space(&raw, &values, family),
        order: AxisOrder::for_family(family),
    }))
}

/// Any component written with a decimal point and `<= 1.0` marks the whole
/// box as 0–1 normalized. Otherwise Gemini boxes are 0–1000, others pixels.
pub fn classify_space(raw: &[&str; 4], values: &[f64; 4], family: ModelFamily) -> CoordSpace {
    let unit = raw.iter().zip(values).any(|(t, v)| t.contains('.') && *v <= 1.0);
    if unit {
        CoordSpace::Normalized01
    } else if family == ModelFamily::Gemini {
        CoordSpace::Normalized1000
    } else {
        CoordSpace::Pixel
    }
}

fn explicit_action(text: &str) -> Option<String> {
    let caps = grammar::action_line().captures(text)?;
    let line = caps.get(1)?.as_str().trim_matches(|c: char| c == '"' || c.is_whitespace());
    let cleaned = sanitize(line);
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Action text: the `Action:` line, else the sentence around a matched box
/// (with the box removed), else the default. Never contains bracket coordinates.
fn action_text(text: &str, matched: Option<&str>, reference: &SpatialReference) -> String {
    if let Some(action) = explicit_action(text) {
        return action;
    }
    if let (Some(matched), SpatialReference::Box(_)) = (matched, reference) {
        if let Some(sentence) = surrounding_sentence(text, matched) {
            let cleaned = sanitize(&sentence.replace(matched, " "));
            if !cleaned.is_empty() {
                return cleaned;
            }
        }
    }
    DEFAULT_ACTION_TEXT.into()
}

fn surrounding_sentence(text: &str, matched: &str) -> Option<String> {
    let pattern = format!(r"[^.!?\n]*{}[^.!?\n]*[.!?]?", regex::escape(matched));
    let re = Regex::new(&pattern).ok()?;
    re.find(text).map(|m| m.as_str().to_string())
}

fn sanitize(text: &str) -> String {
    let stripped = grammar::bracket_coordinates().replace_all(text, " ");
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| matches!(c, ':' | '*' | '"' | ',' | '.') || c.is_whitespace())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridCell;

    fn boxed(p: &ParsedResponse) -> BoxRef {
        match p.reference {
            Some(SpatialReference::Box(b)) => b,
            ref other => panic!("expected box, got {other:?}"),
        }
    }

    #[test]
    fn grid_label_with_action_line() {
        let p = parse_response(
            "Action: Click the Mail icon\nGrid Cell: B3",
            ParseMode::Grid,
            ModelFamily::CogAgent,
        );
        assert_eq!(p.reference, Some(SpatialReference::GridCell(GridCell::new(1, 2))));
        assert_eq!(p.action_text, "Click the Mail icon");
        assert_eq!(p.grammar, Some("grid_cell_label"));
    }

    #[test]
    fn grid_label_keeps_multi_digit_columns() {
        let p = parse_response("Grid Cell: C30", ParseMode::Grid, ModelFamily::CogAgent);
        assert_eq!(p.reference, Some(SpatialReference::GridCell(GridCell::new(2, 29))));
    }

    #[test]
    fn grid_mode_falls_back_to_bare_token() {
        let p = parse_response(
            "The settings gear is near the top, I'd say D2 is your best bet.",
            ParseMode::Grid,
            ModelFamily::Llava,
        );
        assert_eq!(p.reference, Some(SpatialReference::GridCell(GridCell::new(3, 1))));
        assert_eq!(p.action_text, DEFAULT_ACTION_TEXT);
    }

    #[test]
    fn lowercase_tokens_after_keywords_are_not_cells() {
        let p = parse_response(
            "This is in v2 of the UI; the icon is B3.",
            ParseMode::Grid,
            ModelFamily::Generic,
        );
        assert_eq!(p.reference, Some(SpatialReference::GridCell(GridCell::new(1, 2))));
        assert_eq!(p.grammar, Some("bare_cell"));

        let p = parse_response("It is in B4.", ParseMode::Grid, ModelFamily::Generic);
        assert_eq!(p.reference, Some(SpatialReference::GridCell(GridCell::new(1, 3))));
        assert_eq!(p.grammar, Some("keyword_cell"));
    }

    #[test]
    fn grid_mode_falls_back_to_boxes() {
        let p = parse_response("Click [[10, 20, 30, 40]]", ParseMode::Grid, ModelFamily::CogAgent);
        assert_eq!(boxed(&p).values, [10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn direct_double_bracket_pixels() {
        let p = parse_response(
            "click on Settings [[100, 200, 140, 240]]",
            ParseMode::Direct,
            ModelFamily::CogAgent,
        );
        let b = boxed(&p);
        assert_eq!(b.values, [100.0, 200.0, 140.0, 240.0]);
        assert_eq!(b.space, CoordSpace::Pixel);
        assert_eq!(b.order, AxisOrder::XyXy);
        assert_eq!(p.action_text, "click on Settings");
    }

    #[test]
    fn keyword_grammar_beats_earlier_bare_brackets() {
        let text = "Version [1, 2, 3, 4] is installed. The button bounding box: [50, 60, 70, 80].";
        let p = parse_response(text, ParseMode::Direct, ModelFamily::Generic);
        assert_eq!(boxed(&p).values, [50.0, 60.0, 70.0, 80.0]);
        assert_eq!(p.grammar, Some("keyword_box"));
    }

    #[test]
    fn gemini_boxes_are_thousandths_in_yx_order() {
        let p = parse_response(
            "The Mail icon in the dock is at [912, 480, 990, 530].",
            ParseMode::Direct,
            ModelFamily::Gemini,
        );
        let b = boxed(&p);
        assert_eq!(b.space, CoordSpace::Normalized1000);
        assert_eq!(b.order, AxisOrder::YxYx);
        assert_eq!(p.action_text, "The Mail icon in the dock is at");
    }

    #[test]
    fn decimals_at_most_one_mean_unit_space() {
        let p = parse_response("box: [0.25, 0.5, 0.75, 1]", ParseMode::Direct, ModelFamily::Gemini);
        assert_eq!(boxed(&p).space, CoordSpace::Normalized01);

        let p = parse_response("box: [12.5, 40, 80, 90]", ParseMode::Direct, ModelFamily::Generic);
        assert_eq!(boxed(&p).space, CoordSpace::Pixel);
    }

    #[test]
    fn malformed_number_falls_through_to_next_grammar() {
        let text = "coordinates: [1.2.3, 4, 5, 6] or maybe [[10, 20, 30, 40]]";
        let p = parse_response(text, ParseMode::Direct, ModelFamily::Generic);
        assert_eq!(boxed(&p).values, [10.0, 20.0, 30.0, 40.0]);
        assert_eq!(p.grammar, Some("double_bracket"));
    }

    #[test]
    fn bare_quadruple_is_last_resort() {
        let p = parse_response("try 300, 400, 350, 420 on screen", ParseMode::Direct, ModelFamily::Generic);
        assert_eq!(boxed(&p).values, [300.0, 400.0, 350.0, 420.0]);
        assert_eq!(p.grammar, Some("bare_quadruple"));
    }

    #[test]
    fn prose_without_coordinates_is_a_miss() {
        for mode in [ParseMode::Grid, ParseMode::Direct] {
            let p = parse_response("I'm not sure what you mean.", mode, ModelFamily::Gemini);
            assert!(p.is_miss());
            assert_eq!(p.action_text, DEFAULT_ACTION_TEXT);
        }
    }

    #[test]
    fn action_text_never_carries_bracket_coordinates() {
        let samples = [
            "Action: click [[1, 2, 3, 4]] now\n[[1, 2, 3, 4]]",
            "Press the button at [10, 20, 30, 40] and wait.",
            "**Coordinates:** [[5, 5, 9, 9]] [0.1, 0.2, 0.3, 0.4]",
        ];
        for text in samples {
            let first = parse_response(text, ParseMode::Direct, ModelFamily::Generic);
            assert!(!first.action_text.contains('['), "{:?}", first.action_text);
            let again = parse_response(&first.action_text, ParseMode::Direct, ModelFamily::Generic);
            assert!(!again.action_text.contains('['));
        }
    }
}

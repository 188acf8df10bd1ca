//! Prompt templates. Each one asks for exactly the output shape the
//! response parser's grammars expect for that mode and model family.
use crate::grid::GridSpec;
use crate::parser::{ModelFamily, ParseMode};

const MAIL_TERMS: [&str; 4] = ["mail", "email", "outlook", "thunderbird"];

/// Everything a prompt may mention besides the request itself.
#[derive(Debug, Clone, Default)]
pub struct PromptContext<'a> {
    /// Earlier `role: content` lines, oldest first.
    pub recent: &'a [String],
    pub grid: Option<GridSpec>,
}

pub fn platform_name() -> &'static str {
    match std::env::consts::OS {
        "macos" => "macOS",
        "windows" => "Windows",
        "linux" => "Linux",
        other => other,
    }
}

pub fn build_prompt(mode: ParseMode, family: ModelFamily, request: &str, ctx: &PromptContext) -> String {
    match (mode, ctx.grid) {
        (ParseMode::Grid, Some(grid)) => grid_prompt(request, &grid),
        _ if family == ModelFamily::Gemini => gemini_prompt(request, ctx.recent),
        _ if family == ModelFamily::CogAgent => cogagent_direct_prompt(request),
        _ => direct_prompt(request, ctx.recent),
    }
}

pub fn grid_prompt(request: &str, grid: &GridSpec) -> String {
    format!(
        "Task: Look at the screenshot with grid cells labeled (A1, A2, B1, B2, etc.). {request}\n\
         Rows are lettered A–{last_row} from top to bottom; columns are numbered 1–{cols} from left to right,\n\
         so cells run from A1 to {last_cell}.\n\
         I need you to identify WHICH SPECIFIC GRID CELL contains what I'm looking for.\n\
         \n\
         (Platform: {platform})\n\
         \n\
         Format your answer as:\n\
         \"Action: [Brief description of what to do]\"\n\
         \"Grid Cell: [Letter+Number of the cell, e.g. A1, B3, etc.]\"\n\
         \n\
         Be very specific about which grid cell to click.",
        last_row = crate::grid::addressing::row_label(grid.rows() - 1),
        cols = grid.cols(),
        last_cell = grid.last_cell_id(),
        platform = platform_name(),
    )
}

pub fn cogagent_direct_prompt(request: &str) -> String {
    format!(
        "Task: {request}\n\
         \n\
         (Platform: {platform})\n\
         \n\
         Format your answer as:\n\
         \"Action: [Brief description of what to do]\"\n\
         \"Grounded Operation: [CLICK at the box [[x1, y1, x2, y2]]]\"\n\
         \n\
         Provide exact pixel coordinates (x1,y1,x2,y2) for where to click.",
        platform = platform_name(),
    )
}

pub fn direct_prompt(request: &str, recent: &[String]) -> String {
    format!(
        "You are an assistant helping a user with their {platform} computer.\n\
         \n\
         {context}User's request: \"{request}\"\n\
         \n\
         Analyze the attached screenshot and answer the user's request.\n\
         Always try to identify the relevant UI element on screen, even for general questions.\n\
         \n\
         In your response:\n\
         1. Describe the element in simple terms.\n\
         2. Explain what it does.\n\
         3. Give its bounding box in the format [[x1, y1, x2, y2]] in screenshot pixels.\n\
         \n\
         Example: 'To read your email, click the Mail app icon [[123, 456, 200, 550]].'",
        platform = platform_name(),
        context = recent_block(recent),
    )
}

pub fn gemini_prompt(request: &str, recent: &[String]) -> String {
    let mut prompt = format!(
        "You are an assistant helping a user with their {platform} computer.\n\
         \n\
         {context}User's request: \"{request}\"\n\
         \n\
         Analyze the attached screenshot and answer the user's request clearly.\n\
         Always identify at least one relevant visible element and return a tight bounding box\n\
         in the format [y_min, x_min, y_max, x_max], normalized to 0-1000 with (0,0) at the\n\
         top-left of the image.\n\
         \n\
         - Keep the box as tight as possible around just the element.\n\
         - For dock or taskbar icons, box only the icon itself, not labels or indicators.\n\
         - For buttons, include only the visible button area.",
        platform = platform_name(),
        context = recent_block(recent),
    );
    let lower = request.to_lowercase();
    if MAIL_TERMS.iter().any(|t| lower.contains(t)) {
        prompt.push_str(
            "\n\nFor the Mail app icon: box only the envelope icon itself, \
             without label text, badges or surrounding padding.",
        );
    }
    prompt
}

fn recent_block(recent: &[String]) -> String {
    if recent.is_empty() {
        String::new()
    } else {
        format!("Recent conversation:\n{}\n\n", recent.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_prompt_names_the_label_scheme() {
        let grid = GridSpec::new(4, 6).unwrap();
        let p = build_prompt(
            ParseMode::Grid,
            ModelFamily::CogAgent,
            "Open mail",
            &PromptContext { recent: &[], grid: Some(grid) },
        );
        assert!(p.contains("Grid Cell:"));
        assert!(p.contains("Action:"));
        assert!(p.contains("A–D"));
        assert!(p.contains("1–6"));
        assert!(p.contains("A1 to D6"));
    }

    #[test]
    fn family_decides_direct_prompt_shape() {
        let ctx = PromptContext::default();
        let gemini = build_prompt(ParseMode::Direct, ModelFamily::Gemini, "Open email", &ctx);
        assert!(gemini.contains("[y_min, x_min, y_max, x_max]"));
        assert!(gemini.contains("Mail app icon"));

        let cog = build_prompt(ParseMode::Direct, ModelFamily::CogAgent, "Open settings", &ctx);
        assert!(cog.contains("Grounded Operation"));

        let generic = build_prompt(ParseMode::Direct, ModelFamily::Generic, "Open settings", &ctx);
        assert!(generic.contains("[[x1, y1, x2, y2]]"));
        assert!(!generic.contains("Recent conversation"));
    }

    #[test]
    fn recent_turns_are_included() {
        let recent = vec!["user: hi".to_string(), "assistant: hello".to_string()];
        let p = direct_prompt("where is the dock?", &recent);
        assert!(p.contains("Recent conversation:\nuser: hi\nassistant: hello"));
    }
}

use crate::parser::ParseMode;
use crate::session::{EngineCommand, EngineStatus, Notice};

pub const HELP: &str = "\
Type a request (\"where is the mail app?\") or a command:
  /mode grid|direct     switch how locations are asked for
  /provider <id>        switch the active provider
  /model <id>           switch the model of the active provider
  /click [CELL]         click the highlighted target, or a grid cell
  /cancel               abandon the request in progress
  /clear                drop highlights and the conversation
  /status               show what the assistant is doing
  /quit                 exit";

/// Parse one console line. Blank lines give `Ok(None)`; plain text is a request.
pub fn parse_line(line: &str) -> Result<Option<EngineCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(EngineCommand::Request(line.to_string())));
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default().to_ascii_lowercase();
    let arg = parts.next();
    if parts.next().is_some() {
        return Err(format!("/{name} takes at most one argument"));
    }

    let cmd = match (name.as_str(), arg) {
        ("quit" | "exit", None) => EngineCommand::Quit,
        ("clear", None) => EngineCommand::Clear,
        ("cancel", None) => EngineCommand::Cancel,
        ("status", None) => EngineCommand::Status,
        ("click", None) => EngineCommand::Click,
        ("click", Some(cell)) => EngineCommand::ClickCell(cell.to_string()),
        ("mode", Some(mode)) => EngineCommand::SetMode(parse_mode(mode)?),
        ("provider", Some(id)) => EngineCommand::SetProvider(id.to_string()),
        ("model", Some(id)) => EngineCommand::SetModel(id.to_string()),
        ("yes" | "y", None) => EngineCommand::Answer(true),
        ("no" | "n", None) => EngineCommand::Answer(false),
        ("mode" | "provider" | "model", None) => {
            return Err(format!("/{name} needs an argument"));
        }
        _ => return Err(format!("unknown command /{name}; try /help")),
    };
    Ok(Some(cmd))
}

fn parse_mode(s: &str) -> Result<ParseMode, String> {
    match s.to_ascii_lowercase().as_str() {
        "grid" => Ok(ParseMode::Grid),
        "direct" => Ok(ParseMode::Direct),
        other => Err(format!("unknown mode {other:?}, expected grid or direct")),
    }
}

/// Reply to a yes/no question. Anything else is `None`.
pub fn parse_answer(line: &str) -> Option<bool> {
    match line.trim().trim_end_matches(['.', '!']).to_ascii_lowercase().as_str() {
        "y" | "yes" | "ok" | "sure" => Some(true),
        "n" | "no" | "cancel" => Some(false),
        _ => None,
    }
}

/// One line of console output for a notice. Only the start of analysis is
/// worth printing among status changes.
pub fn format_notice(notice: &Notice) -> Option<String> {
    let line = match notice {
        Notice::Status { status } => match status {
            EngineStatus::Analyzing => "… looking at the screen".to_string(),
            _ => return None,
        },
        Notice::Answer { text } => text.trim().to_string(),
        Notice::Highlighted { rect, action_text } => format!(
            "▶ {action_text} (highlighted at {},{} {}x{}; /click to click it)",
            rect.x, rect.y, rect.width, rect.height
        ),
        Notice::NoLocation { action_text } => {
            format!("▶ {action_text} (no coordinates found)")
        }
        Notice::ConfirmClick { plan } => format!(
            "? {} at ({}, {}). Click? [y/n]",
            plan.label, plan.point.x, plan.point.y
        ),
        Notice::Clicked { point } => format!("✓ clicked at ({}, {})", point.x, point.y),
        Notice::Info { message } => message.clone(),
        Notice::Error { message } => format!("error: {message}"),
    };
    Some(line)
}

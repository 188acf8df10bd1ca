use serde::Serialize;

use crate::capture::ScreenContext;
use crate::errors::VizCueResult;
use crate::executor::ClickPlan;
use crate::geometry::{PixelRect, ScreenPoint};
use crate::grid::GridSpec;
use crate::normalizer::NormalizedTarget;
use crate::parser::{ParseMode, ParsedResponse};

/// Input to the engine from the shell.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    /// Capture, ask the model, highlight the answer.
    Request(String),
    /// Drop highlights and the conversation.
    Clear,
    SetMode(ParseMode),
    SetProvider(String),
    SetModel(String),
    /// Click the currently highlighted target (asks first).
    Click,
    /// Click a cell of the last captured grid (asks first).
    ClickCell(String),
    /// Reply to a pending yes/no question.
    Answer(bool),
    Cancel,
    Status,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    Idle,
    Analyzing,
    AwaitingConfirmation,
    Clicking,
}

/// Output from the engine to the shell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    Status { status: EngineStatus },
    /// Raw model answer.
    Answer { text: String },
    Highlighted { rect: PixelRect, action_text: String },
    /// The answer carried no usable location.
    NoLocation { action_text: String },
    ConfirmClick { plan: ClickPlan },
    Clicked { point: ScreenPoint },
    Info { message: String },
    Error { message: String },
}

/// Everything the worker learned about one request.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub ctx: ScreenContext,
    pub grid: GridSpec,
    pub mode: ParseMode,
    pub response: String,
    pub parsed: ParsedResponse,
}

/// Messages from worker tasks back to the engine loop.
#[derive(Debug)]
pub enum WorkerResult {
    Analyzed {
        request_id: u64,
        outcome: VizCueResult<Analysis>,
    },
    Clicked {
        /// Highlight of the target that was clicked; `None` for grid-cell clicks.
        highlight_id: Option<String>,
        outcome: VizCueResult<ScreenPoint>,
    },
}

/// The target the user can ask to click.
#[derive(Debug, Clone)]
pub struct PendingTarget {
    pub target: NormalizedTarget,
    pub ctx: ScreenContext,
    pub label: String,
    /// Removed once the click went through.
    pub highlight_id: String,
}

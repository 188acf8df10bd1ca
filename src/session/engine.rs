use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};

use crate::capture::{ScreenCapture, ScreenContext};
use crate::commands::parse_answer;
use crate::config::{AppConfig, GridConfig};
use crate::errors::{VizCueError, VizCueResult};
use crate::executor::{ActionExecutor, ClickPlan, PointerDriver, ReplyGate};
use crate::grid::overlay::draw_grid;
use crate::grid::{parse_cell_id, GridSpec};
use crate::highlight::{HighlightManager, HighlightRequest, RenderSink};
use crate::llm::prompts::{build_prompt, PromptContext};
use crate::llm::{resolve_image_reference, ImageStore, ModelSession, VisionModel};
use crate::normalizer::Normalizer;
use crate::parser::{ParseMode, ResponseParser};
use crate::session::history::{HistoryEntry, SessionHistory};
use crate::session::state::{
    Analysis, EngineCommand, EngineStatus, Notice, PendingTarget, WorkerResult,
};

/// Conversation turns handed to the prompt as context.
const RECENT_TURNS: usize = 2;

/// Collaborators the engine drives. Swapped for fakes in tests.
pub struct EngineParts {
    pub capture: Arc<dyn ScreenCapture>,
    pub pointer: Arc<dyn PointerDriver>,
    pub renderer: Box<dyn RenderSink>,
    pub stores: Vec<Arc<dyn ImageStore>>,
    pub session: ModelSession,
}

/// The shell's side of the engine.
pub struct EngineHandle {
    pub commands: mpsc::Sender<EngineCommand>,
    pub notices: mpsc::UnboundedReceiver<Notice>,
    /// Shared cancellation flag, also set by [`EngineCommand::Cancel`].
    pub cancel: Arc<AtomicBool>,
}

/// Single owner of highlights, the model session and the pending target.
/// Slow work (capture, upload, model call, pointer motion) runs in spawned
/// workers whose results come back through `worker_rx`.
pub struct AssistantEngine {
    config: AppConfig,
    commands: mpsc::Receiver<EngineCommand>,
    notices: mpsc::UnboundedSender<Notice>,
    worker_tx: mpsc::Sender<WorkerResult>,
    worker_rx: mpsc::Receiver<WorkerResult>,
    cancel: Arc<AtomicBool>,

    capture: Arc<dyn ScreenCapture>,
    stores: Arc<Vec<Arc<dyn ImageStore>>>,
    executor: ActionExecutor,
    normalizer: Normalizer,
    highlights: HighlightManager,
    session: ModelSession,
    history: SessionHistory,

    // ── Per-request state ─────────────────────────────────────────────────
    mode: ParseMode,
    status: EngineStatus,
    request_seq: u64,
    pending: Option<PendingTarget>,
    last_grid: Option<(ScreenContext, GridSpec)>,
    confirm_tx: Option<oneshot::Sender<bool>>,
}

impl AssistantEngine {
    pub fn new(config: AppConfig, parts: EngineParts) -> (Self, EngineHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let (worker_tx, worker_rx) = mpsc::channel(8);
        let cancel = Arc::new(AtomicBool::new(false));

        let engine = Self {
            mode: config.mode,
            executor: ActionExecutor::new(parts.pointer, &config.executor),
            normalizer: Normalizer::new(config.normalizer.clone()),
            history: SessionHistory::new(config.history.dir.as_deref()),
            highlights: HighlightManager::new(parts.renderer),
            capture: parts.capture,
            stores: Arc::new(parts.stores),
            session: parts.session,
            commands: cmd_rx,
            notices: notice_tx,
            worker_tx,
            worker_rx,
            cancel: cancel.clone(),
            status: EngineStatus::Idle,
            request_seq: 0,
            pending: None,
            last_grid: None,
            confirm_tx: None,
            config,
        };
        let handle = EngineHandle {
            commands: cmd_tx,
            notices: notice_rx,
            cancel,
        };
        (engine, handle)
    }

    pub async fn run_loop(mut self) {
        tracing::info!(session = %self.history.session_id, mode = ?self.mode, "engine started");
        loop {
            let deadline = self.highlights.next_deadline();
            tokio::select! {
                cmd = self.commands.recv() => {
                    match cmd {
                        Some(EngineCommand::Quit) | None => break,
                        Some(cmd) => self.handle_command(cmd),
                    }
                }
                Some(result) = self.worker_rx.recv() => self.handle_worker(result),
                _ = wait_until(deadline) => {
                    self.highlights.tick(Instant::now());
                }
            }
        }
        self.cancel.store(true, Ordering::SeqCst);
        self.highlights.clear_all();
        tracing::info!(session = %self.history.session_id, "engine stopped");
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    fn handle_command(&mut self, cmd: EngineCommand) {
        tracing::debug!(?cmd, status = ?self.status, "command received");
        match cmd {
            EngineCommand::Request(text) if self.status == EngineStatus::AwaitingConfirmation => {
                match parse_answer(&text) {
                    Some(yes) => self.answer(yes),
                    None => self.notify_info("Please answer yes or no."),
                }
            }
            EngineCommand::Request(text) => self.start_request(text),
            EngineCommand::Answer(yes) => self.answer(yes),
            EngineCommand::Click => self.start_click(),
            EngineCommand::ClickCell(label) => self.start_cell_click(&label),
            EngineCommand::Clear => {
                self.highlights.clear_all();
                self.pending = None;
                self.history.clear();
                self.notify_info("Conversation cleared.");
            }
            EngineCommand::SetMode(mode) => {
                self.mode = mode;
                self.highlights.clear_all();
                self.pending = None;
                tracing::info!(?mode, "mode switched");
                self.notify_info(format!("Mode: {mode:?}"));
            }
            EngineCommand::SetProvider(name) => match self.session.set_active(&name) {
                Ok(()) => self.notify_info(format!("Provider: {name}")),
                Err(e) => self.notify_error(&e),
            },
            EngineCommand::SetModel(model) => match self.session.set_model(&model) {
                Ok(()) => self.notify_info(format!(
                    "Model: {model} ({:?})",
                    self.session.active_family()
                )),
                Err(e) => self.notify_error(&e),
            },
            EngineCommand::Cancel => {
                self.cancel.store(true, Ordering::SeqCst);
                if let Some(tx) = self.confirm_tx.take() {
                    let _ = tx.send(false);
                }
                self.notify_info("Cancelling…");
            }
            EngineCommand::Status => {
                let status = self.status;
                self.notify(Notice::Status { status });
                self.notify_info(format!(
                    "provider={} (of {}) mode={:?} highlights={}",
                    self.session.active_name(),
                    self.session.list_names().join(", "),
                    self.mode,
                    self.highlights.len()
                ));
            }
            EngineCommand::Quit => {}
        }
    }

    fn start_request(&mut self, request: String) {
        if self.status != EngineStatus::Idle {
            self.notify_info("Still working on the previous request.");
            return;
        }
        let model = match self.session.active() {
            Ok(m) => m,
            Err(e) => {
                self.notify_error(&e);
                return;
            }
        };

        self.highlights.clear_all();
        self.pending = None;
        self.cancel.store(false, Ordering::SeqCst);
        self.request_seq += 1;

        let recent = self.history.recent(RECENT_TURNS);
        self.history
            .record(HistoryEntry::new("user", Some(request.clone()), None));

        let job = RequestJob {
            request_id: self.request_seq,
            request,
            mode: self.mode,
            recent,
            grid_config: self.config.grid.clone(),
            model,
            capture: self.capture.clone(),
            stores: self.stores.clone(),
            cancel: self.cancel.clone(),
        };
        tracing::info!(request_id = job.request_id, mode = ?job.mode, model = %job.model.model(), "request started");
        self.set_status(EngineStatus::Analyzing);

        let tx = self.worker_tx.clone();
        tokio::spawn(async move {
            let request_id = job.request_id;
            let outcome = job.run().await;
            let _ = tx.send(WorkerResult::Analyzed { request_id, outcome }).await;
        });
    }

    fn start_click(&mut self) {
        if self.status != EngineStatus::Idle {
            self.notify_info("Busy; finish or cancel first.");
            return;
        }
        let Some(pending) = self.pending.clone() else {
            self.notify_info("Nothing highlighted to click.");
            return;
        };
        let plan = ClickPlan::new(
            pending.target.center,
            pending.ctx.live_width,
            pending.ctx.live_height,
            pending.label.clone(),
        );
        if let Err(e) = plan.check_bounds() {
            self.notify_error(&e);
            return;
        }

        let gate = self.open_gate(plan);
        let executor = self.executor.clone();
        let tx = self.worker_tx.clone();
        tokio::spawn(async move {
            let outcome = executor
                .click_target(&pending.target, &pending.ctx, &pending.label, &gate)
                .await;
            let _ = tx
                .send(WorkerResult::Clicked {
                    highlight_id: Some(pending.highlight_id),
                    outcome,
                })
                .await;
        });
    }

    fn start_cell_click(&mut self, label: &str) {
        if self.status != EngineStatus::Idle {
            self.notify_info("Busy; finish or cancel first.");
            return;
        }
        let Some((ctx, grid)) = self.last_grid else {
            self.notify_info("No grid screenshot yet; send a request in grid mode first.");
            return;
        };
        let Some(cell) = parse_cell_id(label) else {
            self.notify_info(format!("Not a cell label: {label}"));
            return;
        };
        let target = match self.normalizer.grid_target(cell, &grid, &ctx) {
            Ok(t) => t,
            Err(e) => {
                self.notify_error(&e);
                return;
            }
        };
        let plan = ClickPlan::new(
            target.center,
            ctx.live_width,
            ctx.live_height,
            format!("Click grid cell {}", cell.id()),
        );

        let gate = self.open_gate(plan);
        let executor = self.executor.clone();
        let tx = self.worker_tx.clone();
        tokio::spawn(async move {
            let outcome = executor.click_grid_cell(cell, &grid, &ctx, &gate).await;
            let _ = tx
                .send(WorkerResult::Clicked {
                    highlight_id: None,
                    outcome,
                })
                .await;
        });
    }

    /// Show the question and hand back the gate the click worker will wait on.
    fn open_gate(&mut self, plan: ClickPlan) -> ReplyGate {
        let (tx, gate) = ReplyGate::new();
        self.confirm_tx = Some(tx);
        self.set_status(EngineStatus::AwaitingConfirmation);
        self.notify(Notice::ConfirmClick { plan });
        gate
    }

    fn answer(&mut self, yes: bool) {
        match self.confirm_tx.take() {
            Some(tx) => {
                let _ = tx.send(yes);
                if yes {
                    self.set_status(EngineStatus::Clicking);
                }
            }
            None => self.notify_info("No question is pending."),
        }
    }

    // ── Worker results ────────────────────────────────────────────────────────

    fn handle_worker(&mut self, result: WorkerResult) {
        match result {
            WorkerResult::Analyzed { request_id, outcome } => {
                if request_id != self.request_seq {
                    tracing::debug!(request_id, current = self.request_seq, "stale result dropped");
                    return;
                }
                self.set_status(EngineStatus::Idle);
                match outcome {
                    Ok(analysis) => self.apply_analysis(analysis),
                    Err(VizCueError::Cancelled) => {
                        tracing::info!(request_id, "request cancelled");
                        self.notify_info("Request cancelled.");
                    }
                    Err(e) => {
                        if e.is_collaborator_failure() {
                            tracing::error!(request_id, error = %e, "request failed");
                        } else {
                            tracing::warn!(request_id, error = %e, "request abandoned");
                        }
                        self.history.record(HistoryEntry::new(
                            "error",
                            Some(e.to_string()),
                            None,
                        ));
                        self.notify_error(&e);
                    }
                }
            }
            WorkerResult::Clicked {
                highlight_id,
                outcome,
            } => {
                self.confirm_tx = None;
                self.set_status(EngineStatus::Idle);
                match outcome {
                    Ok(point) => {
                        if let Some(id) = highlight_id {
                            self.highlights.remove_highlight(&id);
                            if self.pending.as_ref().is_some_and(|p| p.highlight_id == id) {
                                self.pending = None;
                            }
                        }
                        self.history.record(HistoryEntry::new(
                            "action",
                            Some(format!("clicked at ({}, {})", point.x, point.y)),
                            serde_json::to_value(point).ok(),
                        ));
                        self.notify(Notice::Clicked { point });
                    }
                    Err(VizCueError::ActionDeclined) => self.notify_info("Click declined."),
                    Err(e) => {
                        tracing::error!(error = %e, "click failed");
                        self.notify_error(&e);
                    }
                }
            }
        }
    }

    fn apply_analysis(&mut self, analysis: Analysis) {
        let Analysis {
            ctx,
            grid,
            mode,
            response,
            parsed,
        } = analysis;

        if mode == ParseMode::Grid {
            self.last_grid = Some((ctx, grid));
        }
        self.history.record(HistoryEntry::new(
            "assistant",
            Some(response.clone()),
            serde_json::to_value(&parsed.reference).ok(),
        ));
        self.notify(Notice::Answer {
            text: response.clone(),
        });

        let Some(reference) = parsed.reference else {
            tracing::info!(grammar = ?parsed.grammar, "no location in response");
            self.notify(Notice::NoLocation {
                action_text: parsed.action_text,
            });
            return;
        };

        let target = match self.normalizer.normalize(&reference, &ctx, &grid, &response) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, ?reference, "reference could not be placed");
                self.notify_error(&e);
                return;
            }
        };

        let overlay = self.normalizer.overlay_rect(target.rect, &ctx);
        let req = HighlightRequest::from_config(overlay, &self.config.highlight)
            .with_message(parsed.action_text.clone());
        self.highlights.clear_all();
        let highlight_id = self.highlights.add_highlight(req, Instant::now());

        tracing::info!(
            rect = ?target.rect,
            center = ?target.center,
            grammar = ?parsed.grammar,
            refined_by = ?target.refined_by,
            "target highlighted"
        );
        self.notify(Notice::Highlighted {
            rect: target.rect,
            action_text: parsed.action_text.clone(),
        });
        self.pending = Some(PendingTarget {
            target,
            ctx,
            label: parsed.action_text,
            highlight_id,
        });
    }

    // ── Notices ───────────────────────────────────────────────────────────────

    fn set_status(&mut self, status: EngineStatus) {
        if self.status != status {
            tracing::debug!(from = ?self.status, to = ?status, "status changed");
            self.status = status;
            self.notify(Notice::Status { status });
        }
    }

    fn notify(&self, notice: Notice) {
        if self.notices.send(notice).is_err() {
            tracing::debug!("notice dropped: shell is gone");
        }
    }

    fn notify_info(&self, message: impl Into<String>) {
        self.notify(Notice::Info {
            message: message.into(),
        });
    }

    fn notify_error(&self, e: &VizCueError) {
        self.notify(Notice::Error {
            message: e.to_string(),
        });
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(tokio::time::Instant::from_std(d)).await,
        None => std::future::pending::<()>().await,
    }
}

/// One capture → model → parse round trip, run off the engine loop.
struct RequestJob {
    request_id: u64,
    request: String,
    mode: ParseMode,
    recent: Vec<String>,
    grid_config: GridConfig,
    model: Arc<dyn VisionModel>,
    capture: Arc<dyn ScreenCapture>,
    stores: Arc<Vec<Arc<dyn ImageStore>>>,
    cancel: Arc<AtomicBool>,
}

impl RequestJob {
    fn check_cancel(&self) -> VizCueResult<()> {
        if self.cancel.load(Ordering::SeqCst) {
            Err(VizCueError::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn run(self) -> VizCueResult<Analysis> {
        self.check_cancel()?;
        let frame = self.capture.capture().await?;
        self.check_cancel()?;

        let ctx = frame.context();
        let grid = grid_for(&self.grid_config, frame.width, frame.height)?;
        let image = if self.mode == ParseMode::Grid && self.grid_config.draw_overlay {
            let png = frame.png_bytes;
            tokio::task::spawn_blocking(move || draw_grid(&png, &grid))
                .await
                .map_err(|e| VizCueError::Capture(format!("grid overlay task failed: {e}")))??
        } else {
            frame.png_bytes
        };
        self.check_cancel()?;

        let image_ref = resolve_image_reference(&self.stores, &image).await?;
        self.check_cancel()?;

        let family = self.model.family();
        let prompt = build_prompt(
            self.mode,
            family,
            &self.request,
            &PromptContext {
                recent: &self.recent,
                grid: (self.mode == ParseMode::Grid).then_some(grid),
            },
        );
        let response = self.model.analyze(&image_ref, &prompt).await?;
        self.check_cancel()?;

        let parsed = ResponseParser::new(family).parse(&response, self.mode);
        Ok(Analysis {
            ctx,
            grid,
            mode: self.mode,
            response,
            parsed,
        })
    }
}

fn grid_for(config: &GridConfig, width: u32, height: u32) -> VizCueResult<GridSpec> {
    if config.auto {
        Ok(GridSpec::auto_for_surface(width, height, config.target_cell_px))
    } else {
        GridSpec::new(config.rows, config.cols)
    }
}

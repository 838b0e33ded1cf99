//! Dashboard event loop: owns the terminal, the message queue, and every
//! side-effect the update function asks for.
//!
//! Messages arrive on one crossbeam channel from the input thread, the
//! refresh orchestrator, and the executor itself. Each is applied by
//! [`update::update`] on this thread only, then the returned command is
//! executed and the frame repainted.

#![allow(missing_docs)]

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, Sender, unbounded};
use crossterm::cursor::MoveTo;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::queue;
use crossterm::style::{Attribute, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};

use crate::client::UpstreamClient;
use crate::core::config::Config;
use crate::core::errors::{KedastralError, Result};
use crate::core::paths;
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};
use crate::tui::canvas::Canvas;
use crate::tui::export;
use crate::tui::model::{DashboardCmd, DashboardModel, DashboardMsg};
use crate::tui::refresh::RefreshOrchestrator;
use crate::tui::render::{self, FrameTime};
use crate::tui::terminal_guard::TerminalGuard;
use crate::tui::theme::{AccessibilityProfile, Theme, ThemeName};
use crate::tui::update;

/// How long the input thread blocks in `event::poll` before rechecking stop.
const INPUT_POLL: Duration = Duration::from_millis(50);
/// Repaint cadence while no message arrives (spinner, toast expiry, ages).
const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

/// Everything the runtime needs besides the logger.
#[derive(Debug, Clone)]
pub struct DashboardRuntimeConfig {
    pub config: Config,
    pub accessibility: AccessibilityProfile,
    pub export_dir: PathBuf,
}

impl DashboardRuntimeConfig {
    /// Runtime defaults: `NO_COLOR` from the environment, exports to `~/Downloads`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            accessibility: AccessibilityProfile::from_environment(),
            export_dir: paths::export_dir(),
        }
    }
}

/// Run the dashboard until the user quits or a termination signal arrives.
///
/// # Errors
/// Returns terminal setup failures and thread spawn failures. Upstream
/// failures never end the loop; they are shown in the dashboard.
pub fn run_dashboard(rc: DashboardRuntimeConfig, logger: &ActivityLoggerHandle) -> Result<()> {
    let started = Instant::now();
    let client = UpstreamClient::new(&rc.config.forecaster_url, &rc.config.scaler_url)?;
    let (tx, rx) = unbounded::<DashboardMsg>();

    let terminate = Arc::new(AtomicBool::new(false));
    register_signals(&terminate);

    logger.send(ActivityEvent::Started {
        version: env!("CARGO_PKG_VERSION").to_string(),
        workload: rc.config.workload.clone(),
        config_path: rc.config.config_file.display().to_string(),
    });

    let guard = TerminalGuard::new().map_err(|e| KedastralError::Terminal {
        details: format!("terminal setup: {e}"),
    })?;

    let stop_input = Arc::new(AtomicBool::new(false));
    let input_join = spawn_input_thread(tx.clone(), Arc::clone(&stop_input))?;

    let theme = Theme::new(rc.config.theme, rc.accessibility);
    let mut model = DashboardModel::new(rc.config, TerminalGuard::terminal_size());
    let mut executor = Executor::new(
        RefreshOrchestrator::new(client, tx.clone(), logger.clone()),
        tx,
        logger.clone(),
        rc.export_dir,
        io::stdout(),
    );
    let mut painter = Painter::new(theme, rc.accessibility);

    let outcome = event_loop(&mut model, &mut executor, &mut painter, &rx, &terminate);

    executor.orchestrator.cancel();
    stop_input.store(true, Ordering::SeqCst);
    let _ = input_join.join();
    drop(guard);

    let reason = match &outcome {
        Ok(()) if terminate.load(Ordering::SeqCst) => "signal".to_string(),
        Ok(()) => "user quit".to_string(),
        Err(e) => e.to_string(),
    };
    logger.send(ActivityEvent::Stopped {
        reason,
        uptime_secs: started.elapsed().as_secs(),
    });
    outcome
}

fn event_loop<W: Write>(
    model: &mut DashboardModel,
    executor: &mut Executor<W>,
    painter: &mut Painter,
    rx: &crossbeam_channel::Receiver<DashboardMsg>,
    terminate: &AtomicBool,
) -> Result<()> {
    let cmd = update::init(model);
    executor.execute(cmd, painter);

    loop {
        let now = Instant::now();
        model.prune_toasts(now);
        painter.paint(&mut executor.out, model, FrameTime::now())?;
        if model.quit {
            return Ok(());
        }

        if terminate.load(Ordering::SeqCst) {
            let cmd = update::update(model, DashboardMsg::Shutdown);
            executor.execute(cmd, painter);
            continue;
        }

        for generation in executor.ticks.due(now) {
            let cmd = update::update(model, DashboardMsg::Tick { generation });
            executor.execute(cmd, painter);
        }

        let wait = executor.ticks.next_wait(now).map_or(REDRAW_INTERVAL, |w| w.min(REDRAW_INTERVAL));
        match rx.recv_timeout(wait) {
            Ok(msg) => {
                let cmd = update::update(model, msg);
                executor.execute(cmd, painter);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        }
    }
}

fn register_signals(flag: &Arc<AtomicBool>) {
    use signal_hook::consts::SIGTERM;
    if let Err(e) = signal_hook::flag::register(SIGTERM, Arc::clone(flag)) {
        eprintln!("[KTUI-SIGNAL] failed to register SIGTERM: {e}");
    }

    #[cfg(unix)]
    {
        use signal_hook::consts::SIGHUP;
        if let Err(e) = signal_hook::flag::register(SIGHUP, Arc::clone(flag)) {
            eprintln!("[KTUI-SIGNAL] failed to register SIGHUP: {e}");
        }
    }
}

fn spawn_input_thread(
    tx: Sender<DashboardMsg>,
    stop: Arc<AtomicBool>,
) -> Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("ktui-input".to_string())
        .spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                match event::poll(INPUT_POLL) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(_) => break,
                }
                let msg = match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => DashboardMsg::Key(key),
                    Ok(Event::Resize(cols, rows)) => DashboardMsg::Resize { cols, rows },
                    Ok(_) => continue,
                    Err(_) => break,
                };
                if tx.send(msg).is_err() {
                    break;
                }
            }
        })
        .map_err(|source| KedastralError::Runtime {
            details: format!("failed to spawn input thread: {source}"),
        })
}

// ──────────────────── timers ────────────────────

/// Pending `Tick` deliveries, fired from the loop thread.
#[derive(Debug, Default)]
pub struct TickQueue {
    pending: Vec<(Instant, u64)>,
}

impl TickQueue {
    pub fn schedule(&mut self, at: Instant, generation: u64) {
        self.pending.push((at, generation));
    }

    /// Remove and return the generations due at `now`, earliest first.
    pub fn due(&mut self, now: Instant) -> Vec<u64> {
        let mut fired: Vec<(Instant, u64)> = Vec::new();
        self.pending.retain(|&(at, generation)| {
            if at <= now {
                fired.push((at, generation));
                false
            } else {
                true
            }
        });
        fired.sort_by_key(|&(at, _)| at);
        fired.into_iter().map(|(_, generation)| generation).collect()
    }

    #[must_use]
    pub fn next_wait(&self, now: Instant) -> Option<Duration> {
        self.pending
            .iter()
            .map(|&(at, _)| at.saturating_duration_since(now))
            .min()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// ──────────────────── command executor ────────────────────

/// Runs [`DashboardCmd`]s. Outcomes that the model must see are fed back
/// into the message queue.
pub struct Executor<W: Write> {
    orchestrator: RefreshOrchestrator,
    tx: Sender<DashboardMsg>,
    logger: ActivityLoggerHandle,
    export_dir: PathBuf,
    ticks: TickQueue,
    out: W,
}

impl<W: Write> Executor<W> {
    pub fn new(
        orchestrator: RefreshOrchestrator,
        tx: Sender<DashboardMsg>,
        logger: ActivityLoggerHandle,
        export_dir: PathBuf,
        out: W,
    ) -> Self {
        Self {
            orchestrator,
            tx,
            logger,
            export_dir,
            ticks: TickQueue::default(),
            out,
        }
    }

    #[must_use]
    pub const fn ticks(&self) -> &TickQueue {
        &self.ticks
    }

    #[must_use]
    pub const fn output(&self) -> &W {
        &self.out
    }

    pub fn execute(&mut self, cmd: DashboardCmd, painter: &mut Painter) {
        for cmd in cmd.flatten() {
            self.execute_one(cmd, painter);
        }
    }

    fn execute_one(&mut self, cmd: DashboardCmd, painter: &mut Painter) {
        match cmd {
            DashboardCmd::None | DashboardCmd::Quit | DashboardCmd::Batch(_) => {}
            DashboardCmd::StartCycle {
                cycle,
                workload,
                lead_time,
            } => {
                if let Err(e) = self.orchestrator.start_cycle(cycle, workload, lead_time) {
                    let _ = self.tx.send(DashboardMsg::ForecastFetched {
                        cycle,
                        result: Err(e.into()),
                    });
                }
            }
            DashboardCmd::ListWorkloads => {
                if let Err(e) = self.orchestrator.list_workloads() {
                    let _ = self.tx.send(DashboardMsg::WorkloadsListed(Err(e.into())));
                }
            }
            DashboardCmd::ScheduleTick { generation, after } => {
                self.ticks.schedule(Instant::now() + after, generation);
            }
            DashboardCmd::ApplySettings(settings) => painter.set_theme(settings.theme),
            DashboardCmd::PersistConfig(config) => {
                let result = config.save(&config.config_file);
                self.logger.send(ActivityEvent::ConfigSaved {
                    path: config.config_file.display().to_string(),
                    error: result.as_ref().err().map(ToString::to_string),
                });
                let _ = self
                    .tx
                    .send(DashboardMsg::ConfigSaved(result.map_err(|e| e.to_string())));
            }
            DashboardCmd::Export(job) => {
                let result = export::write_export(&self.export_dir, &job);
                self.logger.send(ActivityEvent::Exported {
                    path: result.as_ref().ok().map(|p| p.display().to_string()),
                    error: result.as_ref().err().map(ToString::to_string),
                });
                let _ = self
                    .tx
                    .send(DashboardMsg::ExportFinished(result.map_err(|e| e.to_string())));
            }
            DashboardCmd::Copy(text) => {
                let result = export::copy_to_clipboard(&mut self.out, &text);
                self.logger.send(ActivityEvent::Copied {
                    bytes: text.len(),
                    error: result.as_ref().err().map(ToString::to_string),
                });
                let _ = self
                    .tx
                    .send(DashboardMsg::CopyFinished(result.map_err(|e| e.to_string())));
            }
        }
    }
}

// ──────────────────── frame painter ────────────────────

/// Writes canvases to the terminal, repainting only rows that changed.
pub struct Painter {
    theme: Theme,
    accessibility: AccessibilityProfile,
    last: Option<Canvas>,
}

impl Painter {
    #[must_use]
    pub const fn new(theme: Theme, accessibility: AccessibilityProfile) -> Self {
        Self {
            theme,
            accessibility,
            last: None,
        }
    }

    #[must_use]
    pub const fn theme(&self) -> Theme {
        self.theme
    }

    /// Switch palettes; the next paint redraws everything.
    pub fn set_theme(&mut self, name: ThemeName) {
        self.theme = Theme::new(name, self.accessibility);
        self.last = None;
    }

    pub fn paint<W: Write>(&mut self, out: &mut W, model: &DashboardModel, time: FrameTime) -> Result<()> {
        let canvas = render::render_frame(model, time);
        self.paint_canvas(out, canvas)
    }

    pub fn paint_canvas<W: Write>(&mut self, out: &mut W, canvas: Canvas) -> Result<()> {
        self.write_canvas(out, &canvas).map_err(|e| KedastralError::Terminal {
            details: format!("paint: {e}"),
        })?;
        self.last = Some(canvas);
        Ok(())
    }

    fn write_canvas<W: Write>(&self, out: &mut W, canvas: &Canvas) -> io::Result<()> {
        let previous = self
            .last
            .as_ref()
            .filter(|last| last.width() == canvas.width() && last.height() == canvas.height());
        if previous.is_none() {
            queue!(out, Clear(ClearType::All))?;
        }

        for y in 0..canvas.height() {
            let row = canvas.row(y);
            if previous.is_some_and(|last| last.row(y) == row) {
                continue;
            }
            queue!(out, MoveTo(0, y))?;
            let mut style = None;
            for cell in row {
                if style != Some((cell.tone, cell.bold)) {
                    queue!(out, SetAttribute(Attribute::Reset))?;
                    match self.theme.foreground(cell.tone) {
                        Some(color) => queue!(out, SetForegroundColor(color))?,
                        None => queue!(out, ResetColor)?,
                    }
                    if cell.bold {
                        queue!(out, SetAttribute(Attribute::Bold))?;
                    }
                    style = Some((cell.tone, cell.bold));
                }
                queue!(out, Print(cell.ch))?;
            }
        }
        queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;
        out.flush()
    }
}

// ──────────────────── tests ────────────────────

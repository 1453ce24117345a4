pub mod ui;

use aimforge::{
    app_dirs::AppDirs,
    clock::{Clock, MonotonicClock},
    config::{ConfigStore, FileConfigStore, Settings},
    engine::{build_engine, DisplayList, Engine, TickOutcome, TrainingResult},
    history::{HistoryDb, HistoryStore, MemoryHistory, ModeSummary, OverallSummary},
    input::{from_terminal_mouse, CellScale, InputAdapter, InputEvent, Key, SessionCommand},
    runtime::{CrosstermEventSource, FixedTicker, Runner, TrainerEvent},
    sensitivity::{
        convert_sensitivity, format_cm360, preset, GameProfile, SensitivityConfig, PRESETS,
    },
    session::{DistanceClass, MovementPattern, SpeedClass, TrainingMode},
    target::{CanvasSize, TargetSize},
};
use clap::{error::ErrorKind, Args, CommandFactory, Parser, Subcommand};
use crossterm::{
    event::{
        DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, KeyCode,
        KeyEvent, KeyModifiers, MouseEvent,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use rand::{rngs::StdRng, SeedableRng};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin, Write},
    path::PathBuf,
};
use tracing::{debug, info, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ui::screen::current_screen;

/// Countdown between pointer capture and the first frame.
const COUNTDOWN_MS: f64 = 3000.0;
/// Rows kept on the history screen.
const HISTORY_ROWS: usize = 50;

/// terminal aim trainer with cross-game sensitivity conversion
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Train flicks, tracking and target switching in the terminal with your real in-game sensitivity, and convert sensitivities between games.",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[clap(subcommand)]
    command: Option<Command>,

    #[clap(flatten)]
    play: PlayArgs,

    /// raise log verbosity (-v debug, -vv trace)
    #[clap(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// run a training session (default)
    Play(PlayArgs),
    /// convert a sensitivity from one game to another at the same dpi
    Convert(ConvertArgs),
    /// print the physical cm/360 of a sensitivity
    Cm360(Cm360Args),
    /// show, export or clear past results
    History(HistoryArgs),
    /// list the pro player presets usable with --preset
    Presets,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PlayArgs {
    /// training mode
    #[clap(short = 'm', long, value_enum)]
    mode: Option<TrainingMode>,

    /// session length in seconds
    #[clap(short = 's', long)]
    secs: Option<f64>,

    /// target size
    #[clap(long, value_enum)]
    target_size: Option<TargetSize>,

    /// concurrent gridshot targets
    #[clap(long)]
    targets: Option<usize>,

    /// tracking movement pattern
    #[clap(long, value_enum)]
    pattern: Option<MovementPattern>,

    /// tracking target speed
    #[clap(long, value_enum)]
    speed: Option<SpeedClass>,

    /// flicking target distance
    #[clap(long, value_enum)]
    distance: Option<DistanceClass>,

    /// start from a pro player's setup (see `aimforge presets`)
    #[clap(short = 'p', long)]
    preset: Option<String>,

    /// game whose sensitivity you are entering
    #[clap(short = 'g', long, value_enum)]
    game: Option<GameProfile>,

    /// in-game sensitivity
    #[clap(long)]
    sens: Option<f64>,

    /// mouse dpi
    #[clap(long)]
    dpi: Option<f64>,

    /// physical cm/360, overrides game and sensitivity
    #[clap(long)]
    cm360: Option<f64>,

    /// write the merged settings back to the config file
    #[clap(long)]
    save: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    #[clap(long, value_enum)]
    from: GameProfile,

    #[clap(long, value_enum)]
    to: GameProfile,

    #[clap(long)]
    sens: f64,

    #[clap(long, default_value_t = 800.0)]
    dpi: f64,
}

#[derive(Args, Debug, Clone)]
pub struct Cm360Args {
    #[clap(short = 'g', long, value_enum)]
    game: GameProfile,

    #[clap(long)]
    sens: f64,

    #[clap(long, default_value_t = 800.0)]
    dpi: f64,
}

#[derive(Args, Debug, Clone)]
pub struct HistoryArgs {
    /// number of runs to list
    #[clap(short = 'n', long, default_value_t = 10)]
    limit: usize,

    /// write every stored run to this csv file
    #[clap(long)]
    export: Option<PathBuf>,

    /// delete all stored runs
    #[clap(long)]
    clear: bool,
}

fn positive(name: &str, value: Option<f64>) -> Result<(), String> {
    match value {
        Some(v) if !(v > 0.0 && v.is_finite()) => Err(format!("--{name} must be positive, got {v}")),
        _ => Ok(()),
    }
}

impl PlayArgs {
    /// Overlays the flags on `settings`. Fails on values no session can use.
    fn apply(&self, settings: &mut Settings) -> Result<(), String> {
        positive("secs", self.secs)?;
        positive("sens", self.sens)?;
        positive("dpi", self.dpi)?;
        positive("cm360", self.cm360)?;
        if let Some(n) = self.targets {
            if !(1..=15).contains(&n) {
                return Err(format!("--targets must be between 1 and 15, got {n}"));
            }
        }

        if let Some(mode) = self.mode {
            settings.mode = mode;
        }
        let training = &mut settings.training;
        if let Some(secs) = self.secs {
            training.duration_secs = secs;
        }
        if let Some(size) = self.target_size {
            training.target_size = size;
        }
        if let Some(n) = self.targets {
            training.target_count = n;
        }
        if let Some(pattern) = self.pattern {
            training.movement_pattern = pattern;
        }
        if let Some(speed) = self.speed {
            training.speed = speed;
        }
        if let Some(distance) = self.distance {
            training.target_distance = distance;
        }

        let sens = &mut settings.sensitivity;
        if let Some(player) = &self.preset {
            *sens = preset(player).ok_or_else(|| format!("unknown preset: {player}"))?;
        }
        if let Some(game) = self.game {
            if game != sens.game {
                let default_sens = game
                    .spec()
                    .map(|spec| spec.default_sens)
                    .unwrap_or(sens.sensitivity);
                *sens = SensitivityConfig::new(game, default_sens, sens.dpi);
            }
        }
        if let Some(s) = self.sens {
            sens.sensitivity = s;
        }
        if let Some(dpi) = self.dpi {
            sens.dpi = dpi;
        }
        if let Some(cm) = self.cm360 {
            let dpi = sens.dpi;
            *sens = SensitivityConfig {
                dpi,
                ..SensitivityConfig::custom(cm)
            };
        }
        sens.cm360().map(|_| ()).map_err(|err| err.to_string())
    }
}

fn init_logging(verbose: u8) -> Option<WorkerGuard> {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_env("AIMFORGE_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("aimforge={level},warn")));

    // stdout belongs to the TUI, so logs only ever go to a file
    let dir = AppDirs::log_dir()?;
    std::fs::create_dir_all(&dir).ok()?;
    let appender = tracing_appender::rolling::never(dir, "aimforge.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .try_init()
        .ok()?;
    Some(guard)
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.verbose);
    debug!(?cli, "starting");

    let mut stdout = io::stdout();
    match cli.command.unwrap_or(Command::Play(cli.play)) {
        Command::Convert(args) => run_convert(&args, &mut stdout),
        Command::Cm360(args) => run_cm360(&args, &mut stdout),
        Command::History(args) => {
            let mut db = HistoryDb::open_default()?;
            run_history(&args, &mut db, &mut stdout)
        }
        Command::Presets => run_presets(&mut stdout),
        Command::Play(args) => run_play(&args),
    }
}

fn run_convert(args: &ConvertArgs, out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    let converted = convert_sensitivity(args.from, args.to, args.sens, args.dpi)?;
    let physical = SensitivityConfig::new(args.from, args.sens, args.dpi).cm360()?;
    writeln!(
        out,
        "{} {} @ {} dpi -> {} {:.3} ({})",
        args.from,
        args.sens,
        args.dpi,
        args.to,
        converted,
        format_cm360(physical)
    )?;
    Ok(())
}

fn run_cm360(args: &Cm360Args, out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    let config = SensitivityConfig::new(args.game, args.sens, args.dpi);
    let cm = config.cm360()?;
    writeln!(out, "{}", format_cm360(cm))?;
    writeln!(out, "eDPI {:.0}", config.edpi())?;
    writeln!(out, "pointer scale {:.2}", config.pointer_scale_factor()?)?;
    Ok(())
}

fn run_presets(out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    for p in &PRESETS {
        let config = SensitivityConfig::new(p.game, p.sensitivity, p.dpi);
        writeln!(
            out,
            "{:<7} {:<9} {} @ {} dpi  {}",
            p.player,
            p.game.to_string(),
            p.sensitivity,
            p.dpi,
            format_cm360(config.cm360()?)
        )?;
    }
    Ok(())
}

fn run_history(
    args: &HistoryArgs,
    db: &mut HistoryDb,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    if args.clear {
        db.clear()?;
        writeln!(out, "history cleared")?;
        return Ok(());
    }
    if let Some(path) = &args.export {
        let rows = db.export_csv(path)?;
        writeln!(out, "exported {rows} runs to {}", path.display())?;
        return Ok(());
    }

    let runs = db.recent(args.limit)?;
    if runs.is_empty() {
        writeln!(out, "no runs recorded yet")?;
        return Ok(());
    }
    let now = chrono::Local::now();
    for run in &runs {
        writeln!(
            out,
            "{:<9} score {:>4}  acc {:>5.1}%  avg {:>4.0} ms  {}",
            run.mode.to_string(),
            run.score,
            run.accuracy,
            run.avg_reaction_ms,
            ui::history::humanize_age(run.timestamp, now)
        )?;
    }
    if let Some(total) = db.overall_summary()? {
        writeln!(
            out,
            "{} runs  avg acc {:.1}%  avg reaction {:.0} ms  total score {}",
            total.sessions, total.avg_accuracy, total.avg_reaction_ms, total.total_score
        )?;
    }
    Ok(())
}

fn run_play(args: &PlayArgs) -> Result<(), Box<dyn Error>> {
    let store = FileConfigStore::new();
    let mut settings = store.load();
    if let Err(msg) = args.apply(&mut settings) {
        Cli::command().error(ErrorKind::ValueValidation, msg).exit();
    }
    if args.save {
        store.save(&settings)?;
        info!(path = %store.path().display(), "settings saved");
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let history: Box<dyn HistoryStore> = match HistoryDb::open_default() {
        Ok(db) => Box::new(db),
        Err(err) => {
            warn!(%err, "history unavailable, keeping results in memory");
            Box::new(MemoryHistory::new())
        }
    };

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableFocusChange
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let size = terminal.size()?;
    let clock = MonotonicClock::new();
    let mut app = App::new(
        settings,
        history,
        Box::new(move || Box::new(clock) as Box<dyn Clock>),
        size.width,
        size.height,
    );
    // mouse capture is our pointer lock
    app.on_event(TrainerEvent::FocusGained);

    let res = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableFocusChange,
        DisableMouseCapture,
        LeaveAlternateScreen,
    )?;
    terminal.show_cursor()?;

    res
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::default());
    terminal.draw(|f| current_screen(&app.state).render(app, f))?;

    loop {
        let event = runner.step();
        // mouse reports only move the crosshair; the next tick draws it
        let redraw = !matches!(event, TrainerEvent::Mouse(_));
        if app.on_event(event) == Flow::Quit {
            return Ok(());
        }
        if redraw {
            terminal.draw(|f| current_screen(&app.state).render(app, f))?;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Waiting for pointer capture.
    Idle,
    Countdown,
    Playing,
    Paused,
    Results,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Hands out clocks that all read the same time.
pub type ClockFactory = Box<dyn Fn() -> Box<dyn Clock>>;

pub struct App {
    pub settings: Settings,
    pub state: AppState,
    pub engine: Box<dyn Engine>,
    pub adapter: InputAdapter,
    pub frame: DisplayList,
    pub scale: CellScale,
    pub terminal_size: (u16, u16),
    pub countdown_from: f64,
    pub last_result: Option<TrainingResult>,
    pub mode_summary: Option<ModeSummary>,
    pub recent: Vec<TrainingResult>,
    pub overall: Option<OverallSummary>,
    pub history_offset: usize,
    history: Box<dyn HistoryStore>,
    clocks: ClockFactory,
    host_clock: Box<dyn Clock>,
}

impl App {
    pub fn new(
        settings: Settings,
        history: Box<dyn HistoryStore>,
        clocks: ClockFactory,
        cols: u16,
        rows: u16,
    ) -> Self {
        let host_clock = clocks();
        let engine = engine_for(&settings, cols, rows, &clocks);
        let mut app = Self {
            settings,
            state: AppState::Idle,
            engine,
            adapter: InputAdapter::new(),
            frame: DisplayList::new(),
            scale: CellScale::default(),
            terminal_size: (cols, rows),
            countdown_from: 0.0,
            last_result: None,
            mode_summary: None,
            recent: Vec::new(),
            overall: None,
            history_offset: 0,
            history,
            clocks,
            host_clock,
        };
        app.await_capture();
        app
    }

    fn now(&self) -> f64 {
        self.host_clock.now_ms()
    }

    /// Fresh engine for the current settings, then wait for capture.
    pub fn begin(&mut self) {
        self.replace_engine();
        self.await_capture();
    }

    /// Swaps in an engine for the current settings and hands back the old
    /// one, already destroyed.
    fn replace_engine(&mut self) -> Box<dyn Engine> {
        let (cols, rows) = self.terminal_size;
        self.engine.destroy();
        let engine = engine_for(&self.settings, cols, rows, &self.clocks);
        std::mem::replace(&mut self.engine, engine)
    }

    fn await_capture(&mut self) {
        self.fit_scale();
        self.frame.reset();
        self.adapter.reanchor();
        self.set_state(AppState::Idle);
        debug!(mode = %self.settings.mode, "waiting for pointer capture");

        let now = self.now();
        self.adapter.lock_mut().request(now);
        if self.adapter.lock().accepts_input() {
            self.start_countdown();
        }
    }

    fn start_countdown(&mut self) {
        self.countdown_from = self.now();
        self.set_state(AppState::Countdown);
    }

    /// The engine only hears the pointer and keys while a run is on.
    fn set_state(&mut self, state: AppState) {
        self.state = state;
        self.adapter
            .set_enabled(matches!(state, AppState::Playing | AppState::Paused));
    }

    /// Whole seconds left on the countdown, 3..=1.
    pub fn countdown_secs(&self) -> u32 {
        let left = (COUNTDOWN_MS - (self.now() - self.countdown_from)).max(0.0);
        (left / 1000.0).ceil() as u32
    }

    /// Keeps terminal cells mapped onto the whole engine canvas.
    fn fit_scale(&mut self) {
        let (cols, rows) = self.terminal_size;
        let canvas = self.engine.core().canvas();
        self.scale = CellScale {
            px_per_col: canvas.width / cols.max(1) as f64,
            px_per_row: canvas.height / rows.max(1) as f64,
        };
    }

    pub fn on_event(&mut self, event: TrainerEvent) -> Flow {
        match event {
            TrainerEvent::Tick => {
                self.on_tick();
                Flow::Continue
            }
            TrainerEvent::Key(key) => self.on_key(key),
            TrainerEvent::Mouse(mouse) => {
                self.on_mouse(&mouse);
                Flow::Continue
            }
            TrainerEvent::FocusGained => {
                self.dispatch(InputEvent::LockAcquired);
                if self.state == AppState::Idle {
                    self.start_countdown();
                }
                Flow::Continue
            }
            TrainerEvent::FocusLost => {
                self.dispatch(InputEvent::LockLost);
                Flow::Continue
            }
            TrainerEvent::Resize(cols, rows) => {
                self.terminal_size = (cols, rows);
                if matches!(self.state, AppState::Idle | AppState::Countdown) {
                    let canvas = canvas_for(CellScale::default(), cols, rows);
                    self.engine
                        .configure(canvas, self.settings.training.clone());
                }
                self.fit_scale();
                Flow::Continue
            }
        }
    }

    fn on_tick(&mut self) {
        match self.state {
            AppState::Idle => {
                let now = self.now();
                if self.adapter.lock_mut().poll(now) {
                    self.start_countdown();
                }
            }
            AppState::Countdown => {
                if self.now() - self.countdown_from >= COUNTDOWN_MS {
                    self.engine.start();
                    self.adapter.reanchor();
                    self.set_state(AppState::Playing);
                    info!(mode = %self.settings.mode, "run started");
                }
            }
            AppState::Playing => {
                let outcome = self.engine.tick(&mut self.frame);
                self.log_engine_events();
                if outcome == TickOutcome::Finished {
                    self.finish_run();
                }
            }
            AppState::Paused | AppState::Results | AppState::History => {}
        }
    }

    fn log_engine_events(&mut self) {
        for event in self.engine.drain_events() {
            trace!(?event, "engine event");
        }
    }

    fn finish_run(&mut self) {
        self.engine.stop();
        self.log_engine_events();
        let result = self.engine.results();
        info!(
            mode = %result.mode,
            score = result.score,
            accuracy = result.accuracy,
            "run finished"
        );
        if let Err(err) = self.history.record(&result) {
            warn!(%err, "could not store result");
        }
        self.mode_summary = self
            .history
            .summary_for(result.mode)
            .unwrap_or_else(|err| {
                warn!(%err, "could not summarise history");
                None
            });
        self.last_result = Some(result);
        self.set_state(AppState::Results);
    }

    fn open_history(&mut self) {
        match self.history.recent(HISTORY_ROWS) {
            Ok(runs) => self.recent = runs,
            Err(err) => warn!(%err, "could not read history"),
        }
        self.overall = self.history.overall_summary().unwrap_or(None);
        self.history_offset = 0;
        self.set_state(AppState::History);
    }

    fn dispatch(&mut self, event: InputEvent) {
        match self.adapter.dispatch(event, self.engine.as_mut()) {
            Some(SessionCommand::Pause) => self.set_state(AppState::Paused),
            Some(SessionCommand::Resume) => self.set_state(AppState::Playing),
            None => {}
        }
    }

    fn on_mouse(&mut self, mouse: &MouseEvent) {
        for event in from_terminal_mouse(mouse, self.scale) {
            self.dispatch(event);
        }
    }

    fn on_key(&mut self, key: KeyEvent) -> Flow {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Flow::Quit;
        }
        match self.state {
            AppState::Idle | AppState::Countdown => {
                if key.code == KeyCode::Esc {
                    return Flow::Quit;
                }
            }
            AppState::Playing => {
                if key.code == KeyCode::Esc {
                    self.dispatch(InputEvent::Key(Key::Escape));
                }
            }
            AppState::Paused => match key.code {
                KeyCode::Char(' ') => {
                    self.adapter.reanchor();
                    self.dispatch(InputEvent::Key(Key::Space));
                }
                KeyCode::Char('q') => self.finish_run(),
                KeyCode::Esc => return Flow::Quit,
                _ => {}
            },
            AppState::Results => match key.code {
                KeyCode::Char('r') => self.begin(),
                KeyCode::Char('n') => {
                    self.settings.mode = self.settings.mode.next();
                    self.begin();
                }
                KeyCode::Char('h') => self.open_history(),
                KeyCode::Esc => return Flow::Quit,
                _ => {}
            },
            AppState::History => match key.code {
                KeyCode::Esc | KeyCode::Char('b') | KeyCode::Backspace => {
                    self.set_state(AppState::Results);
                }
                KeyCode::Up => self.history_offset = self.history_offset.saturating_sub(1),
                KeyCode::Down => {
                    if self.history_offset + 1 < self.recent.len() {
                        self.history_offset += 1;
                    }
                }
                KeyCode::Char('q') => return Flow::Quit,
                _ => {}
            },
        }
        Flow::Continue
    }
}

/// Engine for `settings` sized to the terminal, with pointer scale and
/// crosshair applied.
fn engine_for(settings: &Settings, cols: u16, rows: u16, clocks: &ClockFactory) -> Box<dyn Engine> {
    let canvas = canvas_for(CellScale::default(), cols, rows);
    let mut engine = build_engine(
        settings.mode,
        canvas,
        settings.training.clone(),
        clocks(),
        Box::new(StdRng::from_entropy()),
    );
    match settings.sensitivity.pointer_scale_factor() {
        Ok(factor) => engine.set_pointer_scale(factor),
        Err(err) => warn!(%err, "bad sensitivity, using unscaled pointer"),
    }
    engine.set_crosshair(settings.crosshair());
    engine
}

fn canvas_for(scale: CellScale, cols: u16, rows: u16) -> CanvasSize {
    CanvasSize::new(
        cols.max(1) as f64 * scale.px_per_col,
        rows.max(1) as f64 * scale.px_per_row,
    )
}

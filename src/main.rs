mod api;
mod app;
mod catalog;
mod cli;
mod config;
mod dispatch;
mod error;
mod fetch;
mod input;
mod lifecycle;
mod model;
mod palette;
mod ui;

use anyhow::{Context, Result};
use api::ConsoleApi;
use app::{App, AppCommand, AppEvent};
use catalog::Catalog;
use clap::Parser;
use cli::CliArgs;
use config::{ScalingPollConfig, Settings};
use crossterm::event::{
    Event, EventStream, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use futures::StreamExt;
use lifecycle::{PollBackoff, poll_until_converged};
use model::NoticeLevel;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter, args.log_file.as_deref())?;

    let catalog = Catalog::validated().inspect_err(|error| {
        error!(error = %error, "resource catalog rejected");
    })?;
    let settings = Settings::load(&args)?;
    info!(
        api_base = %settings.api_base,
        config = settings.source.as_deref().unwrap_or("<defaults>"),
        "starting"
    );

    let api = ConsoleApi::new(
        &settings.api_base,
        settings.request_timeout(),
        settings.log_tail_lines,
    )
    .with_context(|| format!("invalid API base {}", settings.api_base))?;

    let mut app = App::new(catalog, args.cluster.clone(), args.namespace.clone());
    run(&mut app, api, settings.scaling_poll).await
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let writer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(io::sink),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .compact()
        .with_writer(writer)
        .try_init();

    Ok(())
}

async fn run(app: &mut App, api: ConsoleApi, poll: ScalingPollConfig) -> Result<()> {
    let (mut terminal, keyboard_enhanced) = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, api, poll).await;
    let restore_result = restore_terminal(&mut terminal, keyboard_enhanced);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<(TuiTerminal, bool)> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    if keyboard_enhanced {
        execute!(
            stdout,
            EnterAlternateScreen,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )
        .context("failed to enter alternate screen with keyboard enhancement")?;
    } else {
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok((terminal, keyboard_enhanced))
}

fn restore_terminal(terminal: &mut TuiTerminal, keyboard_enhanced: bool) -> Result<()> {
    if keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("failed to pop keyboard enhancement flags")?;
    }
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    api: ConsoleApi,
    poll: ScalingPollConfig,
) -> Result<()> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<AppEvent>();
    let mut backend = Backend::new(api, event_tx, poll);
    let mut reader = EventStream::new();

    let command = app.start();
    backend.execute(command);

    loop {
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = input::map_key(app.mode(), key, app.catalog()) {
                            debug!("action={action:?}");
                            let command = app.apply_action(action);
                            backend.execute(command);
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        let message = format!("terminal event error: {error}");
                        app.set_notice(NoticeLevel::Error, message);
                    }
                    None => {
                        app.set_notice(NoticeLevel::Error, "terminal event stream closed");
                        break;
                    }
                }
            }
            maybe_event = event_rx.recv() => {
                if let Some(event) = maybe_event {
                    let command = app.apply_event(event);
                    backend.execute(command);
                }
            }
        }
    }

    backend.shutdown();
    Ok(())
}

/// Runs app commands as background tasks; each task reports back through
/// the event channel.
struct Backend {
    api: ConsoleApi,
    events: mpsc::UnboundedSender<AppEvent>,
    poll: ScalingPollConfig,
    watchers: HashMap<String, JoinHandle<()>>,
}

impl Backend {
    fn new(
        api: ConsoleApi,
        events: mpsc::UnboundedSender<AppEvent>,
        poll: ScalingPollConfig,
    ) -> Self {
        Self {
            api,
            events,
            poll,
            watchers: HashMap::new(),
        }
    }

    fn execute(&mut self, command: AppCommand) {
        match command {
            AppCommand::None => {}
            AppCommand::Batch(commands) => {
                for command in commands {
                    self.execute(command);
                }
            }
            AppCommand::LoadClusters => self.spawn(|api| async move {
                AppEvent::Clusters(api.list_clusters().await)
            }),
            AppCommand::Connect { cluster } => self.spawn(|api| async move {
                let result = api.connect(&cluster).await;
                AppEvent::Connected { cluster, result }
            }),
            AppCommand::LoadNamespaces { cluster } => self.spawn(|api| async move {
                let result = api.list_namespaces(&cluster).await;
                AppEvent::Namespaces { cluster, result }
            }),
            AppCommand::FetchList { ticket, kind } => self.spawn(|api| async move {
                let result = api.list_resources(&ticket.key.cluster, kind).await;
                AppEvent::Listed { ticket, result }
            }),
            AppCommand::RunAction { token, request } => self.spawn(|api| async move {
                let result = api.run_action(&request).await;
                AppEvent::ActionDone {
                    token,
                    request,
                    result,
                }
            }),
            AppCommand::ScaleCluster { cluster, direction } => self.spawn(|api| async move {
                let result = api.scale_cluster(&cluster, direction).await;
                AppEvent::ScaleAccepted {
                    cluster,
                    direction,
                    result,
                }
            }),
            AppCommand::PollScaling { cluster } => self.spawn(|api| async move {
                let result = api.scaling_status(&cluster).await;
                AppEvent::ScalingStatus { cluster, result }
            }),
            AppCommand::LoadUpgradeStatus { cluster } => self.spawn(|api| async move {
                let result = api.upgrade_status(&cluster).await;
                AppEvent::UpgradeStatus { cluster, result }
            }),
            AppCommand::WatchScaling { cluster, direction } => {
                if let Some(previous) = self.watchers.remove(&cluster) {
                    debug!(%cluster, "replacing scaling watcher");
                    previous.abort();
                }
                let api = self.api.clone();
                let events = self.events.clone();
                let backoff = PollBackoff::new(
                    self.poll.initial_delay(),
                    self.poll.max_delay(),
                    self.poll.max_attempts,
                );
                let watched = cluster.clone();
                let handle = tokio::spawn(async move {
                    let converged = poll_until_converged(
                        backoff,
                        direction,
                        || api.scaling_status(&watched),
                        |result| {
                            let _ = events.send(AppEvent::ScalingStatus {
                                cluster: watched.clone(),
                                result,
                            });
                        },
                    )
                    .await;
                    info!(cluster = %watched, converged, "scaling watch finished");
                });
                self.watchers.insert(cluster, handle);
            }
        }
    }

    fn spawn<F, Fut>(&self, task: F)
    where
        F: FnOnce(ConsoleApi) -> Fut,
        Fut: Future<Output = AppEvent> + Send + 'static,
    {
        let events = self.events.clone();
        let future = task(self.api.clone());
        tokio::spawn(async move {
            let _ = events.send(future.await);
        });
    }

    fn shutdown(&mut self) {
        for (_, handle) in self.watchers.drain() {
            handle.abort();
        }
    }
}

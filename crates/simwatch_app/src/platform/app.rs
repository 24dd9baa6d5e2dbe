use std::io::{self, Stdout};
use std::sync::mpsc;
use std::thread;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::Parser;
use engine_logging::{engine_info, engine_warn};
use log::LevelFilter;
use simwatch_core::{update, AppState, DownloadState, Msg, RunState, SimulationRequest};
use simwatch_engine::{Downloader, EngineSettings, ReqwestDownloader};

use super::cli::{Cli, Command, RunArgs};
use super::config;
use super::effects::EffectRunner;
use super::logging;
use super::ui::render::TerminalRenderer;

pub fn run_app() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.merge_into(config::load(cli.config.as_deref())?);

    let level = engine_logging::parse_level(&config.log_level).unwrap_or_else(|| {
        eprintln!("Unknown log level {:?}; using info", config.log_level);
        LevelFilter::Info
    });
    logging::initialize(cli.log_dest, level);
    engine_info!("simwatch starting against {}", config.base_url);

    match &cli.command {
        Command::Run(args) => run_simulation(config.engine_settings(), args),
        Command::Download { filename } => download_artifact(config.engine_settings(), filename),
    }
}

fn run_simulation(settings: EngineSettings, args: &RunArgs) -> anyhow::Result<()> {
    let request = args.to_request();
    let errors = request.validate();
    if !errors.is_empty() {
        for err in &errors {
            eprintln!("invalid request: {err}");
        }
        bail!("simulation request rejected ({} problem(s))", errors.len());
    }

    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let runner = EffectRunner::new(settings, msg_tx.clone());
    spawn_interrupt_listener(msg_tx)?;

    let mut session = Session::new(runner, TerminalRenderer::new(io::stdout()), args.download);
    session.start(request)?;
    while !session.finished() {
        let msg = msg_rx
            .recv()
            .context("event channel closed before the run finished")?;
        session.dispatch(msg)?;
    }
    session.outcome()
}

/// Turns Ctrl-C into a stop request. A second Ctrl-C while stopping is a no-op.
fn spawn_interrupt_listener(msg_tx: mpsc::Sender<Msg>) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build signal runtime")?;
    thread::Builder::new()
        .name("simwatch-signals".to_string())
        .spawn(move || {
            while runtime.block_on(tokio::signal::ctrl_c()).is_ok() {
                engine_info!("Interrupt received; stopping the run");
                if msg_tx.send(Msg::StopRequested).is_err() {
                    break;
                }
            }
        })
        .context("failed to spawn signal thread")?;
    Ok(())
}

fn download_artifact(settings: EngineSettings, filename: &str) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build download runtime")?;
    let path = runtime
        .block_on(ReqwestDownloader::new(settings).download(filename))
        .with_context(|| format!("could not download {filename}"))?;
    println!("Saved {filename} to {}", path.display());
    Ok(())
}

/// One run of the message loop: state, effects and display.
struct Session {
    state: AppState,
    runner: EffectRunner,
    renderer: TerminalRenderer<Stdout>,
    auto_download: bool,
}

impl Session {
    fn new(runner: EffectRunner, renderer: TerminalRenderer<Stdout>, auto_download: bool) -> Self {
        Self {
            state: AppState::new(),
            runner,
            renderer,
            auto_download,
        }
    }

    fn start(&mut self, request: SimulationRequest) -> io::Result<()> {
        self.dispatch(Msg::StartRequested {
            request,
            now: Utc::now(),
        })
    }

    fn dispatch(&mut self, msg: Msg) -> io::Result<()> {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        if state.consume_dirty() {
            self.renderer.render(&state.view())?;
        }
        self.state = state;
        self.runner.enqueue(effects);

        if wants_download(&self.state, self.auto_download) {
            self.auto_download = false;
            return self.dispatch(Msg::DownloadRequested);
        }
        Ok(())
    }

    fn finished(&self) -> bool {
        self.state.run_state().is_terminal() && *self.state.download() != DownloadState::InProgress
    }

    fn outcome(&self) -> anyhow::Result<()> {
        match self.state.run_state() {
            RunState::Failed { cause } => bail!("simulation failed: {cause}"),
            RunState::Completed => match self.state.download() {
                DownloadState::Failed { reason } => bail!("artifact download failed: {reason}"),
                DownloadState::NotRequested if self.auto_download => {
                    engine_warn!("Run completed without a downloadable artifact");
                    Ok(())
                }
                _ => Ok(()),
            },
            _ => Ok(()),
        }
    }
}

fn wants_download(state: &AppState, auto_download: bool) -> bool {
    auto_download
        && state.artifact_ready()
        && state.artifact().is_some()
        && *state.download() == DownloadState::NotRequested
}

use std::io::{self, Write};

use simwatch_core::{format_clock, AppViewModel, DownloadState, LogRowView, RunId, RunPhase};

const BAR_WIDTH: usize = 30;
/// Moves to column 0 and erases the line, so the progress line can be redrawn.
const CLEAR_LINE: &str = "\r\x1B[2K";

/// Incremental terminal renderer: prints each log row once and redraws a
/// single progress line underneath.
pub struct TerminalRenderer<W: Write> {
    out: W,
    run_id: RunId,
    printed_logs: usize,
    phase: RunPhase,
    download: DownloadState,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            run_id: 0,
            printed_logs: 0,
            phase: RunPhase::Idle,
            download: DownloadState::NotRequested,
        }
    }

    pub fn render(&mut self, view: &AppViewModel) -> io::Result<()> {
        if view.run_id != self.run_id {
            self.run_id = view.run_id;
            self.printed_logs = 0;
            self.download = DownloadState::NotRequested;
            writeln!(self.out, "{CLEAR_LINE}Run {} started", view.run_id)?;
        }

        for row in view.logs.iter().skip(self.printed_logs) {
            writeln!(self.out, "{CLEAR_LINE}{}", log_line(row))?;
        }
        self.printed_logs = view.logs.len();

        if view.phase != self.phase {
            self.phase = view.phase;
            if let Some(line) = phase_line(view) {
                writeln!(self.out, "{CLEAR_LINE}{line}")?;
            }
        }

        if view.download != self.download {
            self.download = view.download.clone();
            if let Some(line) = download_line(&view.download, view.artifact.as_deref()) {
                writeln!(self.out, "{CLEAR_LINE}{line}")?;
            }
        }

        if matches!(view.phase, RunPhase::Running | RunPhase::Stopping) {
            write!(self.out, "{CLEAR_LINE}{}", progress_line(view))?;
        }
        self.out.flush()
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

/// `[#####.....]  42% | Elapsed 0:10 | Left 0:14`
pub fn progress_line(view: &AppViewModel) -> String {
    let percent = view.progress_percent.clamp(0.0, 100.0);
    let filled = ((percent / 100.0) * BAR_WIDTH as f64).round() as usize;
    let mut line = format!(
        "[{}{}] {:>3}% | Elapsed {}",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        percent.round() as u64,
        format_clock(view.elapsed_seconds),
    );
    if let Some(left) = view.estimated_remaining_seconds.filter(|left| *left > 0) {
        line.push_str(&format!(" | Left {}", format_clock(left)));
    }
    if view.phase == RunPhase::Stopping {
        line.push_str(" | stopping...");
    }
    line
}

/// `42% - message`, or `-` in place of the percentage for status-less rows.
pub fn log_line(row: &LogRowView) -> String {
    match row.status {
        Some(status) => format!("{}% - {}", format_percent(status), row.message),
        None => format!("- {}", row.message),
    }
}

fn format_percent(status: f64) -> String {
    let rounded = (status * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        format!("{rounded}")
    }
}

fn phase_line(view: &AppViewModel) -> Option<String> {
    match view.phase {
        RunPhase::Idle | RunPhase::Running | RunPhase::Stopping => None,
        RunPhase::Completed => Some(match (&view.artifact, view.artifact_ready) {
            (Some(artifact), true) => format!(
                "Simulation completed in {}. Artifact ready: {artifact}",
                format_clock(view.elapsed_seconds)
            ),
            (None, true) => format!(
                "Simulation completed in {}. No artifact name was reported.",
                format_clock(view.elapsed_seconds)
            ),
            (_, false) => format!(
                "Simulation completed in {} ({}%), no artifact available.",
                format_clock(view.elapsed_seconds),
                format_percent(view.progress_percent)
            ),
        }),
        RunPhase::Stopped => Some("Simulation stopped by user.".to_string()),
        RunPhase::Failed => Some(format!(
            "Simulation failed: {}",
            view.failure.as_deref().unwrap_or("unknown error")
        )),
    }
}

fn download_line(download: &DownloadState, artifact: Option<&str>) -> Option<String> {
    let name = artifact.unwrap_or("artifact");
    match download {
        DownloadState::NotRequested => None,
        DownloadState::InProgress => Some(format!("Downloading {name}...")),
        DownloadState::Saved { path } => Some(format!("Saved {name} to {}", path.display())),
        DownloadState::Failed { reason } => Some(format!("Download of {name} failed: {reason}")),
    }
}

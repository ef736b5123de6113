//! Console dashboard.
//!
//! The dashboard repaints the whole terminal on every update, so the scheduler
//! logs to a file instead of stdout.

use std::io::{self, Write};
use std::time::Duration;

use chrono_tz::Tz;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use crossterm::{cursor, queue};
use tracing::warn;

use crate::credentials::CredentialStatus;
use crate::scheduler::{SchedulerSnapshot, SuspendedUpload, SuspensionCause};
use crate::utils::format::{format_bytes, format_hours_minutes};

/// Renders scheduler snapshots.
pub trait Presenter: Send {
    fn render(&mut self, snapshot: &SchedulerSnapshot);
}

/// How a dashboard line is highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Warning,
    Error,
}

impl Tone {
    fn color(self) -> Color {
        match self {
            Tone::Info => Color::Cyan,
            Tone::Success => Color::Green,
            Tone::Warning => Color::Yellow,
            Tone::Error => Color::Red,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardLine {
    pub tone: Tone,
    pub text: String,
}

impl DashboardLine {
    fn new(tone: Tone, text: impl Into<String>) -> Self {
        Self {
            tone,
            text: text.into(),
        }
    }
}

/// Lay out `snapshot` as dashboard lines.
///
/// `dots` animates the waiting messages; `tick` converts per-tick throughput
/// into a rate.
pub fn render_lines(snapshot: &SchedulerSnapshot, dots: usize, tick: Duration) -> Vec<DashboardLine> {
    let dots = ".".repeat(dots);
    let mut lines = Vec::new();

    lines.push(match &snapshot.credentials {
        CredentialStatus::Valid => DashboardLine::new(Tone::Success, "Got the tokens 💪"),
        CredentialStatus::Unavailable => DashboardLine::new(
            Tone::Info,
            format!("Your config.json file has no accessTokens. Check your browser{dots}"),
        ),
        CredentialStatus::Expired => DashboardLine::new(
            Tone::Info,
            format!("Your access tokens have expired. Refreshing{dots}"),
        ),
        CredentialStatus::AwaitingConsent { url } => DashboardLine::new(
            Tone::Info,
            format!("Authorize this app by visiting this url: {url}\nCheck your browser{dots}"),
        ),
        CredentialStatus::RefreshFailed { reason } => DashboardLine::new(
            Tone::Error,
            format!("Could not refresh your access tokens: {reason}. Retrying soon{dots}"),
        ),
    });

    lines.push(DashboardLine::new(
        Tone::Info,
        format!("Listening to the {} folder{dots}\n", snapshot.root.display()),
    ));

    for path in &snapshot.completed {
        lines.push(DashboardLine::new(
            Tone::Success,
            format!("{path} uploaded successfully \u{2713}"),
        ));
    }

    for failed in &snapshot.failed {
        lines.push(DashboardLine::new(
            Tone::Error,
            format!("{} failed \u{2717} ({})", failed.path, failed.reason),
        ));
    }

    if let Some(active) = &snapshot.active {
        let percent = active
            .percent
            .map(|p| format!("{p:.2}%"))
            .unwrap_or_else(|| "unknown".to_string());
        let tick_ms = tick.as_millis().max(1) as u64;
        let rate = active.throughput.saturating_mul(1000) / tick_ms;
        lines.push(DashboardLine::new(
            Tone::Warning,
            format!(
                "Uploading {}\t{}/{}({percent})@{}/s",
                active.file_name,
                format_bytes(active.bytes_dispatched),
                format_bytes(active.total_bytes),
                format_bytes(rate),
            ),
        ));
    }

    if let Some(suspended) = &snapshot.suspended {
        lines.push(DashboardLine::new(
            Tone::Error,
            format!("{} failed \u{2717}", suspended.path),
        ));
    }

    for path in &snapshot.queued {
        lines.push(DashboardLine::new(Tone::Info, format!("{path} is in the queue.")));
    }

    if let Some(suspended) = &snapshot.suspended {
        lines.push(suspension_line(suspended));
    }

    lines
}

fn suspension_line(suspended: &SuspendedUpload) -> DashboardLine {
    let zone = zone_label(suspended.time_zone);
    let left = format_hours_minutes(suspended.remaining);
    let text = match &suspended.cause {
        SuspensionCause::QuotaExhausted => format!(
            "\nYou've reached your quota limit. Waiting until midnight {zone} to continue ({left} left)."
        ),
        SuspensionCause::TransferFailed(reason) => format!(
            "\nThe upload failed: {reason}. Retrying at midnight {zone} ({left} left)."
        ),
    };
    DashboardLine::new(Tone::Warning, text)
}

fn zone_label(tz: Tz) -> String {
    if tz == chrono_tz::America::Los_Angeles {
        "Pacific Time".to_string()
    } else {
        tz.name().to_string()
    }
}

/// Repaints the terminal with the latest snapshot.
pub struct ConsoleDashboard<W: Write + Send = io::Stdout> {
    out: W,
    tick: Duration,
    dots: usize,
}

impl ConsoleDashboard {
    pub fn stdout(tick: Duration) -> Self {
        Self::new(io::stdout(), tick)
    }
}

impl<W: Write + Send> ConsoleDashboard<W> {
    pub fn new(out: W, tick: Duration) -> Self {
        Self { out, tick, dots: 0 }
    }

    fn draw(&mut self, snapshot: &SchedulerSnapshot) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::All), cursor::MoveTo(0, 0))?;
        for line in render_lines(snapshot, self.dots, self.tick) {
            for text in line.text.split('\n') {
                queue!(
                    self.out,
                    SetForegroundColor(line.tone.color()),
                    Print(text),
                    ResetColor,
                    Print("\r\n")
                )?;
            }
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Presenter for ConsoleDashboard<W> {
    fn render(&mut self, snapshot: &SchedulerSnapshot) {
        if let Err(e) = self.draw(snapshot) {
            warn!(error = %e, "Failed to draw dashboard");
        }
        self.dots = (self.dots + 1) % 4;
    }
}

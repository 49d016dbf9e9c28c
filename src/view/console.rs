// src/view/console.rs
//! Terminal marker console
//!
//! Stand-in for the device's map pane: subscribes to the marker cache and
//! repaints when a new snapshot lands, plus a slow heartbeat repaint so the
//! sync-age line stays fresh.

use crate::{
    error::{Result, ScoutError},
    sync::MarkerCache,
};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType, DisableLineWrap, EnableLineWrap},
};
use std::{
    io::{self, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::time::{sleep, Instant};

const HEARTBEAT: Duration = Duration::from_secs(5);

pub struct ConsoleView;

impl ConsoleView {
    pub fn new() -> Self {
        Self
    }

    /// Run the console loop until the running flag clears.
    pub async fn run(&self, cache: Arc<MarkerCache>, running: Arc<AtomicBool>) -> Result<()> {
        let changes = cache.subscribe();

        let mut stdout = io::stdout();
        execute!(stdout, Hide, DisableLineWrap).map_err(ScoutError::Io)?;

        // Set up Ctrl+C handler
        let running_clone = Arc::clone(&running);
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            running_clone.store(false, Ordering::Relaxed);
        });

        let mut dirty = true;
        let mut last_paint = Instant::now();

        while running.load(Ordering::Relaxed) {
            // Drain change notifications accumulated since the last pass
            while changes.try_recv().is_ok() {
                dirty = true;
            }

            if dirty || last_paint.elapsed() >= HEARTBEAT {
                execute!(stdout, Clear(ClearType::All), MoveTo(0, 0)).map_err(ScoutError::Io)?;
                self.render(&mut stdout, &cache)?;
                stdout.flush().map_err(ScoutError::Io)?;
                dirty = false;
                last_paint = Instant::now();
            }

            sleep(Duration::from_millis(100)).await;
        }

        execute!(stdout, Show, EnableLineWrap).map_err(ScoutError::Io)?;
        println!("\nShutting down...");
        Ok(())
    }

    fn render(&self, stdout: &mut impl Write, cache: &MarkerCache) -> Result<()> {
        execute!(
            stdout,
            SetForegroundColor(Color::Green),
            Print("=".repeat(60)),
            Print("\n"),
            Print("Plant Scout - Field Marker Console"),
            Print("\n"),
            Print("=".repeat(60)),
            Print("\n"),
            ResetColor
        )
        .map_err(ScoutError::Io)?;

        let synced_str = match cache.last_updated() {
            Some(ts) => ts.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            None => "never".to_string(),
        };
        execute!(stdout, Print(format!("Last Sync: {}\n\n", synced_str)))
            .map_err(ScoutError::Io)?;

        self.render_markers_section(stdout, cache)?;

        execute!(
            stdout,
            SetForegroundColor(Color::Green),
            Print("=".repeat(60)),
            Print("\n"),
            Print("Press Ctrl+C to exit"),
            Print("\n"),
            ResetColor
        )
        .map_err(ScoutError::Io)?;

        Ok(())
    }

    fn render_markers_section(&self, stdout: &mut impl Write, cache: &MarkerCache) -> Result<()> {
        execute!(
            stdout,
            SetForegroundColor(Color::Yellow),
            Print("SIGHTINGS:\n"),
            ResetColor
        )
        .map_err(ScoutError::Io)?;

        let markers = cache.snapshot();
        if markers.is_empty() {
            execute!(stdout, Print("  No markers synced yet\n\n")).map_err(ScoutError::Io)?;
            return Ok(());
        }

        for marker in &markers {
            execute!(
                stdout,
                Print(format!(
                    "  {} ({} sighting{})\n",
                    marker.name,
                    marker.coordinates.len(),
                    if marker.coordinates.len() == 1 { "" } else { "s" }
                ))
            )
            .map_err(ScoutError::Io)?;

            for point in &marker.coordinates {
                execute!(stdout, Print(format!("    {}\n", point))).map_err(ScoutError::Io)?;
            }
        }

        execute!(stdout, Print("\n")).map_err(ScoutError::Io)?;
        Ok(())
    }
}

impl Default for ConsoleView {
    fn default() -> Self {
        Self::new()
    }
}

//! Incremental rendering of streamed batches.
//!
//! Output is written as batches arrive rather than after the walk ends, so
//! long listings start printing right away.

use std::{
    io::{self, Write},
    sync::Arc,
};

use console::style;
use fleet_client::PageStream;
use fleet_types::{Device, DeviceEvent, Filter, Hook, Package, Segment, Token, Update};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Json,
    #[default]
    Pretty,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "pretty" => Ok(OutputFormat::Pretty),
            _ => Err(format!(
                "Invalid format: {}. Valid options are: json, pretty",
                s
            )),
        }
    }
}

/// A resource that can be printed as one table row
pub trait Render {
    /// Column titles and widths
    const COLUMNS: &'static [(&'static str, usize)];

    fn cells(&self) -> Vec<String>;
}

fn truncate(cell: &str, width: usize) -> String {
    if cell.chars().count() > width {
        let kept: String = cell.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        cell.to_string()
    }
}

fn format_row(cells: &[String], columns: &[(&str, usize)]) -> String {
    cells
        .iter()
        .zip(columns)
        .map(|(cell, (_, width))| format!("{:<width$}", truncate(cell, *width), width = *width))
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end()
        .to_string()
}

fn opt(value: &Option<impl ToString>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_else(|| "-".to_string())
}

/// Writes batches to `out` in the chosen format.
///
/// JSON output is a single array whose elements are written batch by batch;
/// it is closed on completion and on error, so partial output still parses.
pub struct BatchWriter<W> {
    out: W,
    format: OutputFormat,
    written: usize,
}

impl<W: Write> BatchWriter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            written: 0,
        }
    }

    pub fn begin<T: Render>(&mut self) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => write!(self.out, "["),
            OutputFormat::Pretty => {
                let titles: Vec<String> = T::COLUMNS.iter().map(|(t, _)| t.to_string()).collect();
                let header = format_row(&titles, T::COLUMNS);
                let rule_len = T::COLUMNS.iter().map(|(_, w)| w + 1).sum::<usize>();
                writeln!(self.out, "{}", style(header).bold())?;
                writeln!(self.out, "{}", "-".repeat(rule_len.saturating_sub(1)))
            }
        }
    }

    pub fn batch<T: Render + Serialize>(&mut self, items: &[T]) -> io::Result<()> {
        for item in items {
            match self.format {
                OutputFormat::Json => {
                    let separator = if self.written == 0 { "" } else { "," };
                    let json = serde_json::to_string(item).map_err(io::Error::other)?;
                    write!(self.out, "{}\n  {}", separator, json)?;
                }
                OutputFormat::Pretty => {
                    writeln!(self.out, "{}", format_row(&item.cells(), T::COLUMNS))?;
                }
            }
            self.written += 1;
        }
        self.out.flush()
    }

    pub fn finish(&mut self) -> io::Result<()> {
        match self.format {
            OutputFormat::Json if self.written == 0 => writeln!(self.out, "]")?,
            OutputFormat::Json => writeln!(self.out, "\n]")?,
            OutputFormat::Pretty => {
                let noun = if self.written == 1 { "item" } else { "items" };
                writeln!(
                    self.out,
                    "\n{} {} {}",
                    style("✓").green(),
                    self.written,
                    noun
                )?;
            }
        }
        self.out.flush()
    }
}

/// Print every batch of `stream` to `out` as it arrives.
///
/// Must be called before the stream is handed to the engine.
pub fn attach<T, W>(stream: &PageStream<T>, writer: BatchWriter<W>) -> Arc<Mutex<BatchWriter<W>>>
where
    T: Render + Serialize + Send + 'static,
    W: Write + Send + 'static,
{
    let writer = Arc::new(Mutex::new(writer));
    if let Err(e) = writer.lock().begin::<T>() {
        error!(error = %e, "Failed to write output header");
    }

    let batches = Arc::clone(&writer);
    let completions = Arc::clone(&writer);
    let errors = Arc::clone(&writer);
    stream
        .on_item_batch(move |items| {
            if let Err(e) = batches.lock().batch(items) {
                error!(error = %e, "Failed to write output");
            }
        })
        .on_completed(move || {
            if let Err(e) = completions.lock().finish() {
                error!(error = %e, "Failed to write output");
            }
        })
        .on_error(move |_| {
            let mut writer = errors.lock();
            if writer.format == OutputFormat::Json
                && let Err(e) = writer.finish()
            {
                error!(error = %e, "Failed to write output");
            }
        });

    writer
}

/// [`attach`] to standard output
pub fn attach_stdout<T>(stream: &PageStream<T>, format: OutputFormat)
where
    T: Render + Serialize + Send + 'static,
{
    attach(stream, BatchWriter::new(io::stdout(), format));
}

impl Render for Device {
    const COLUMNS: &'static [(&'static str, usize)] = &[
        ("ID", 24),
        ("Name", 20),
        ("Segment", 14),
        ("Status", 12),
        ("Version", 12),
        ("Last seen", 25),
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.display_name().to_string(),
            opt(&self.segment_id),
            self.status.to_string(),
            opt(&self.installed_version),
            opt(&self.last_seen_at.map(|t| t.to_rfc3339())),
        ]
    }
}

impl Render for Segment {
    const COLUMNS: &'static [(&'static str, usize)] =
        &[("ID", 24), ("Name", 24), ("Active", 8), ("Devices", 10)];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            opt(&self.name),
            if self.active { "✓" } else { "✗" }.to_string(),
            opt(&self.device_count),
        ]
    }
}

impl Render for Package {
    const COLUMNS: &'static [(&'static str, usize)] =
        &[("ID", 24), ("Name", 20), ("Version", 12), ("Description", 40)];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.version.clone(),
            self.description.clone().unwrap_or_default(),
        ]
    }
}

impl Render for Update {
    const COLUMNS: &'static [(&'static str, usize)] =
        &[("ID", 24), ("Package", 24), ("Status", 12), ("Created", 25)];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            opt(&self.package_id),
            self.status.to_string(),
            self.created_at.to_rfc3339(),
        ]
    }
}

impl Render for DeviceEvent {
    const COLUMNS: &'static [(&'static str, usize)] =
        &[("Created", 25), ("Type", 24), ("ID", 24), ("Payload", 40)];

    fn cells(&self) -> Vec<String> {
        let payload = if self.payload.is_null() {
            String::new()
        } else {
            self.payload.to_string()
        };
        vec![
            self.created_at.to_rfc3339(),
            self.kind.clone(),
            self.id.clone(),
            payload,
        ]
    }
}

impl Render for Filter {
    const COLUMNS: &'static [(&'static str, usize)] = &[("ID", 24), ("Name", 24), ("Query", 50)];

    fn cells(&self) -> Vec<String> {
        vec![self.id.clone(), self.name.clone(), self.query.to_string()]
    }
}

impl Render for Hook {
    const COLUMNS: &'static [(&'static str, usize)] = &[("ID", 24), ("URL", 40), ("Events", 40)];

    fn cells(&self) -> Vec<String> {
        vec![self.id.clone(), self.url.clone(), self.events.join(",")]
    }
}

impl Render for Token {
    const COLUMNS: &'static [(&'static str, usize)] =
        &[("ID", 24), ("Name", 20), ("Created", 25), ("Expires", 25)];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            opt(&self.name),
            opt(&self.created_at.map(|t| t.to_rfc3339())),
            opt(&self.expires_at.map(|t| t.to_rfc3339())),
        ]
    }
}

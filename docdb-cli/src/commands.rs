//! Command execution.

use crate::Commands;
use colored::Colorize;
use docdb_bson::split_documents;
use docdb_driver::{CursorOptions, ErrorKind, MemoryTransport, MemoryTransportConfig, ServerVersion};
use std::cmp::Ordering;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Options for [`dump`].
#[derive(Debug, Clone)]
pub struct DumpOptions {
    pub batch_size: u32,
    pub limit: Option<u64>,
    pub pretty: bool,
    pub namespace: String,
}

/// Outcome of a dump.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DumpSummary {
    pub written: u64,
    pub skipped: u64,
}

/// Executes a one-shot command and returns the formatted output.
pub async fn execute(cmd: Commands) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        // Dump streams its output and is handled in main.rs
        Commands::Dump { .. } => unreachable!(),

        Commands::Count { file } => {
            let data = tokio::fs::read(&file).await?;
            let size = data.len() as u64;
            let docs = split_documents(data)?;
            Ok(format!(
                "{} document(s) in {} ({})",
                docs.len().to_string().cyan(),
                file.display(),
                format_bytes(size)
            ))
        }

        Commands::VersionCompare { a, b } => {
            let left: ServerVersion = a.parse()?;
            let right: ServerVersion = b.parse()?;
            let symbol = match left.cmp(&right) {
                Ordering::Less => "<",
                Ordering::Equal => "=",
                Ordering::Greater => ">",
            };
            Ok(format!("{} {} {}", left, symbol.bold(), right))
        }
    }
}

/// Writes every document in `path` to `out` as relaxed extended JSON.
///
/// Documents are served through an in-memory transport and read back with
/// a cursor, so batch size and limit behave as they would against a server.
/// Documents that fail to decode are skipped and counted; any other error
/// stops the dump.
pub async fn dump<W: Write>(
    path: &Path,
    options: &DumpOptions,
    out: &mut W,
) -> Result<DumpSummary, Box<dyn std::error::Error>> {
    let data = tokio::fs::read(path).await?;
    let raw = split_documents(data)?;

    let transport = Arc::new(MemoryTransport::new(MemoryTransportConfig::default()));
    let handle = transport.open(&options.namespace, raw);

    let mut cursor_options = CursorOptions::new().with_batch_size(options.batch_size);
    if let Some(limit) = options.limit {
        cursor_options = cursor_options.with_limit(limit);
    }
    let mut cursor = transport.cursor(handle, cursor_options);

    let mut summary = DumpSummary::default();
    loop {
        match cursor.next().await {
            Ok(Some(doc)) => {
                let json = doc.into_relaxed_extjson();
                let line = if options.pretty {
                    serde_json::to_string_pretty(&json)?
                } else {
                    json.to_string()
                };
                writeln!(out, "{}", line)?;
                summary.written += 1;
            }
            Ok(None) => break,
            Err(e) if e.kind() == ErrorKind::Codec => {
                tracing::warn!(error = %e, position = cursor.yielded(), "skipping document");
                summary.skipped += 1;
            }
            Err(e) => {
                cursor.close();
                return Err(e.into());
            }
        }
    }
    cursor.close();
    out.flush()?;
    Ok(summary)
}

/// Formats bytes as human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes >= 1024 * 1024 * 1024 {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    } else if bytes >= 1024 * 1024 {
        format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

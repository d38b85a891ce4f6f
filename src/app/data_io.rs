use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use url::Url;

use super::crawl::Artifact;
use super::types::{DataFormat, LinkDefect};

const CSV_HEADERS: [&str; 6] = [
    "source_page",
    "link_text",
    "broken_link",
    "http_code",
    "external",
    "status_class",
];

#[derive(Debug, Clone, Serialize)]
struct ExportRecord<'a> {
    source_page: &'a str,
    link_text: &'a str,
    broken_link: &'a str,
    http_code: u16,
    external: bool,
    status_class: &'static str,
}

pub fn status_class(code: u16) -> &'static str {
    match code {
        0 => "unreachable",
        300..=399 => "redirect",
        400..=499 => "client_error",
        500..=599 => "server_error",
        _ => "other",
    }
}

fn to_export_record(row: &LinkDefect) -> ExportRecord<'_> {
    ExportRecord {
        source_page: &row.source_page,
        link_text: &row.link_text,
        broken_link: &row.broken_link,
        http_code: row.http_code,
        external: row.external,
        status_class: status_class(row.http_code),
    }
}

fn write_csv<W: Write>(writer: W, rows: &[LinkDefect]) -> io::Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(CSV_HEADERS)?;
    for row in rows {
        let rec = to_export_record(row);
        writer.write_record([
            rec.source_page,
            rec.link_text,
            rec.broken_link,
            rec.http_code.to_string().as_str(),
            if rec.external { "true" } else { "false" },
            rec.status_class,
        ])?;
    }
    writer.flush()
}

fn write_json<W: Write>(mut writer: W, rows: &[LinkDefect]) -> io::Result<()> {
    let records = rows.iter().map(to_export_record).collect::<Vec<_>>();
    serde_json::to_writer_pretty(&mut writer, &records).map_err(io::Error::other)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Writes the result set to `path`, returning the number of rows written.
pub fn export_results(path: &str, format: DataFormat, rows: &[LinkDefect]) -> io::Result<usize> {
    let file = File::create(path)?;
    match format {
        DataFormat::Csv => write_csv(file, rows)?,
        DataFormat::Json => write_json(file, rows)?,
    }
    Ok(rows.len())
}

pub fn detect_data_format(path: &str, fallback: DataFormat) -> DataFormat {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".json") {
        DataFormat::Json
    } else if lower.ends_with(".csv") {
        DataFormat::Csv
    } else {
        fallback
    }
}

pub fn default_output_path(url: &str, format: DataFormat) -> String {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_else(|| "crawl".to_string());
    let host = host
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' {
                ch
            } else {
                '_'
            }
        })
        .collect::<String>();
    let ts = Utc::now().format("%Y%m%d_%H%M%S");
    match format {
        DataFormat::Csv => format!("{host}_broken_links_{ts}.csv"),
        DataFormat::Json => format!("{host}_broken_links_{ts}.json"),
    }
}

/// Writes a downloaded report into `dir` under its fixed file name,
/// creating the directory if needed.
pub fn save_artifact(dir: &Path, artifact: &Artifact) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(artifact.file_name);
    fs::write(&path, &artifact.bytes)?;
    Ok(path)
}

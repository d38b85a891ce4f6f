use std::io;
use std::path::{Path, PathBuf};

use clap::Parser;
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use super::config::ServiceConfig;
use super::crawl::TaskClient;
use super::data_io::{default_output_path, detect_data_format, export_results, save_artifact};
use super::remote::{HttpRemoteService, RemoteService};
use super::tui::draw_loop;
use super::types::{Cli, DataFormat, JobPhase, LinkDefect, UiState};

/// Where resolved results get written.
#[derive(Debug, Clone)]
pub struct ExportTarget {
    pub path: String,
    pub format: DataFormat,
}

impl ExportTarget {
    pub fn from_cli(cli: &Cli) -> Option<Self> {
        let configured: DataFormat = cli.format.into();
        cli.output.as_deref().map(|path| {
            let path = if path.trim().is_empty() {
                default_output_path(&cli.url, configured)
            } else {
                path.to_string()
            };
            Self {
                format: detect_data_format(&path, configured),
                path,
            }
        })
    }

    pub fn write(&self, rows: &[LinkDefect]) -> io::Result<usize> {
        export_results(&self.path, self.format, rows)
    }
}

fn init_logging(no_tui: bool) {
    // The TUI owns the terminal; logging stays off there unless RUST_LOG asks for it.
    let default_filter = if no_tui { "info" } else { "off" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .try_init();
}

pub async fn run() -> io::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.no_tui);

    let config = ServiceConfig::from_cli(&cli)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
    let service = HttpRemoteService::new(&config).map_err(io::Error::other)?;
    log::info!(
        "using crawl service at {} (poll every {} ms)",
        service.base_url(),
        config.poll_interval.as_millis()
    );

    let mut client = TaskClient::with_poll_interval(service, config.poll_interval);
    let export = ExportTarget::from_cli(&cli);
    let download_dir = PathBuf::from(&cli.download_dir);

    if cli.no_tui {
        return run_headless(&mut client, &cli.url, export.as_ref(), cli.download, &download_dir)
            .await;
    }
    run_tui(&mut client, &cli.url, download_dir, export.as_ref(), cli.auto_close)
}

/// Runs one job to completion without a terminal UI: progress goes to the
/// log, results to stdout and the optional export file.
pub async fn run_headless<S: RemoteService>(
    client: &mut TaskClient<S>,
    url: &str,
    export: Option<&ExportTarget>,
    download: bool,
    download_dir: &Path,
) -> io::Result<()> {
    client.submit(url);
    let mut rx = client.subscribe();
    let mut last_phase = JobPhase::Idle;
    let final_state = loop {
        let state = rx.borrow_and_update().clone();
        if state.phase != last_phase {
            log::info!("crawl phase: {}", state.phase.label());
            last_phase = state.phase;
        }
        if state.is_settled() {
            break state;
        }
        if rx.changed().await.is_err() {
            break client.state();
        }
    };

    if let Some(err) = final_state.error.as_deref() {
        return Err(io::Error::other(err.to_string()));
    }

    print_results(&final_state);
    if let Some(export) = export {
        let count = export.write(&final_state.results)?;
        log::info!("exported {count} rows to {}", export.path);
    }

    if download {
        match client.download_artifact().await {
            Ok(artifact) => {
                let path = save_artifact(download_dir, &artifact)?;
                log::info!("saved report to {}", path.display());
            }
            // Losing the report does not fail the run.
            Err(err) => log::warn!("report not saved: {err}"),
        }
    }

    eprintln!(
        "finished crawl: broken={} external={} task={}",
        final_state.results.len(),
        final_state.external_count(),
        final_state
            .task_id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    Ok(())
}

fn print_results(state: &UiState) {
    println!("Number of broken links found: {}", state.results.len());
    for row in &state.results {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            row.http_code,
            if row.external { "external" } else { "internal" },
            row.source_page,
            row.broken_link,
            row.link_text
        );
    }
}

fn run_tui<S: RemoteService>(
    client: &mut TaskClient<S>,
    url: &str,
    download_dir: PathBuf,
    export: Option<&ExportTarget>,
    auto_close: bool,
) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    client.submit(url);
    let tui_result = draw_loop(&mut terminal, client, url, download_dir, export, auto_close);
    client.cancel();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tui_result
}

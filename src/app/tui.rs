use std::collections::VecDeque;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap};
use tokio::sync::mpsc::{self, UnboundedSender};

use super::crawl::TaskClient;
use super::data_io::save_artifact;
use super::remote::RemoteService;
use super::runtime::ExportTarget;
use super::types::{JobPhase, UiState};
use super::ui_utils::{open_url_in_browser, phase_style, status_code_style, truncate_for_log};

const PAGE_JUMP_STEP: usize = 10;
const MAX_STATUS_MESSAGES: usize = 20;

#[derive(Default)]
struct StatusLog {
    messages: VecDeque<(bool, String)>,
}

impl StatusLog {
    fn push_status(&mut self, message: impl Into<String>) {
        self.push(false, message.into());
    }

    fn push_error(&mut self, message: impl Into<String>) {
        self.push(true, message.into());
    }

    fn push(&mut self, is_error: bool, message: String) {
        self.messages.push_front((is_error, message));
        while self.messages.len() > MAX_STATUS_MESSAGES {
            self.messages.pop_back();
        }
    }
}

fn spawn_download<S: RemoteService>(
    client: &TaskClient<S>,
    download_dir: PathBuf,
    tx: UnboundedSender<(bool, String)>,
) {
    let download = client.download_artifact();
    tokio::spawn(async move {
        let outcome = match download.await {
            Ok(artifact) => match save_artifact(&download_dir, &artifact) {
                Ok(path) => (false, format!("saved report to {}", path.display())),
                Err(err) => (true, format!("failed to save report: {err}")),
            },
            Err(err) => (true, err.to_string()),
        };
        let _ = tx.send(outcome);
    });
}

pub fn draw_loop<S: RemoteService>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    client: &mut TaskClient<S>,
    target_url: &str,
    download_dir: PathBuf,
    export: Option<&ExportTarget>,
    auto_close: bool,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(120);
    let mut last_tick = Instant::now();
    let mut log = StatusLog::default();
    let (download_tx, mut download_rx) = mpsc::unbounded_channel::<(bool, String)>();
    let mut table_state = TableState::default();
    let mut selected = 0usize;
    let mut last_phase = JobPhase::Idle;

    loop {
        while let Ok((is_error, message)) = download_rx.try_recv() {
            log.push(is_error, message);
        }

        let ui = client.state();
        if ui.phase != last_phase {
            if ui.phase == JobPhase::Resolved
                && let Some(export) = export
            {
                match export.write(&ui.results) {
                    Ok(count) => log.push_status(format!(
                        "exported {count} rows to {}",
                        export.path
                    )),
                    Err(err) => log.push_error(format!("export failed: {err}")),
                }
            }
            last_phase = ui.phase;
        }
        if ui.results.is_empty() {
            selected = 0;
            table_state.select(None);
        } else {
            selected = selected.min(ui.results.len() - 1);
            table_state.select(Some(selected));
        }

        terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(4),
                    Constraint::Min(8),
                    Constraint::Length(5),
                ])
                .split(f.area());

            f.render_widget(header(&ui, target_url), chunks[0]);

            let rows = ui.results.iter().map(|r| {
                Row::new(vec![
                    Cell::from(r.http_code.to_string()).style(status_code_style(r.http_code)),
                    Cell::from(if r.external { "yes" } else { "no" }),
                    Cell::from(r.link_text.clone()),
                    Cell::from(r.broken_link.clone()).style(Style::default().fg(Color::LightRed)),
                    Cell::from(r.source_page.clone()).style(Style::default().fg(Color::Blue)),
                ])
            });
            let table = Table::new(
                rows,
                [
                    Constraint::Length(6),
                    Constraint::Length(5),
                    Constraint::Length(24),
                    Constraint::Percentage(40),
                    Constraint::Min(20),
                ],
            )
            .header(
                Row::new(vec!["Code", "Ext", "Link Text", "Broken Link", "Source Page"])
                    .style(Style::default().add_modifier(Modifier::BOLD)),
            )
            .row_highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            )
            .block(
                Block::default()
                    .title(format!("Broken Links ({})", ui.results.len()))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .column_spacing(1);
            f.render_stateful_widget(table, chunks[1], &mut table_state);

            f.render_widget(footer(&ui, &log), chunks[2]);
        })?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Char('r') => {
                    let job = client.submit(target_url);
                    log.push_status(format!("resubmitted crawl (job {job})"));
                }
                KeyCode::Char('c') => {
                    if ui.loading {
                        client.cancel();
                        log.push_status("cancelled crawl job");
                    }
                }
                KeyCode::Char('d') => {
                    if ui.results.is_empty() {
                        log.push_error("nothing to download yet");
                    } else {
                        log.push_status("downloading report...");
                        spawn_download(client, download_dir.clone(), download_tx.clone());
                    }
                }
                KeyCode::Char('o') => {
                    if let Some(row) = ui.results.get(selected)
                        && let Err(err) = open_url_in_browser(&row.source_page)
                    {
                        log.push_error(format!("failed to open link in browser: {err}"));
                    }
                }
                KeyCode::Up | KeyCode::Char('k') => selected = selected.saturating_sub(1),
                KeyCode::Down | KeyCode::Char('j') => selected = selected.saturating_add(1),
                KeyCode::PageUp => selected = selected.saturating_sub(PAGE_JUMP_STEP),
                KeyCode::PageDown => selected = selected.saturating_add(PAGE_JUMP_STEP),
                KeyCode::Home => selected = 0,
                KeyCode::End => selected = ui.results.len().saturating_sub(1),
                _ => {}
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if auto_close && ui.is_settled() && ui.phase != JobPhase::Idle {
            break;
        }
    }

    Ok(())
}

fn header<'a>(ui: &UiState, target_url: &'a str) -> Paragraph<'a> {
    let metric_label = Style::default().fg(Color::Gray);
    let sep_style = Style::default().fg(Color::DarkGray);
    let title = if ui.loading {
        "linkprobe - Crawling (press q to quit)"
    } else {
        "linkprobe - Idle (press q to quit)"
    };
    let lines = vec![
        Line::from(vec![
            Span::styled("Target ", metric_label),
            Span::styled(target_url, Style::default().fg(Color::White)),
            Span::styled("  |  ", sep_style),
            Span::styled("Phase ", metric_label),
            Span::styled(ui.phase.label(), phase_style(ui.phase)),
            Span::styled("  |  ", sep_style),
            Span::styled("Task ", metric_label),
            Span::styled(
                ui.task_id
                    .as_ref()
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                Style::default().fg(Color::LightCyan),
            ),
        ]),
        Line::from(vec![
            Span::styled("Polls ", metric_label),
            Span::styled(
                ui.pending_polls.to_string(),
                Style::default().fg(Color::Yellow),
            ),
            Span::styled("  |  ", sep_style),
            Span::styled("Broken ", metric_label),
            Span::styled(
                ui.results.len().to_string(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Span::styled("  |  ", sep_style),
            Span::styled("External ", metric_label),
            Span::styled(
                ui.external_count().to_string(),
                Style::default().fg(Color::Magenta),
            ),
        ]),
    ];
    Paragraph::new(lines).block(Block::default().title(title).borders(Borders::ALL))
}

fn footer<'a>(ui: &UiState, log: &StatusLog) -> Paragraph<'a> {
    let (label, message, style) = if let Some(err) = ui.error.as_deref() {
        ("ERROR", err.to_string(), Style::default().fg(Color::LightRed))
    } else if ui.loading {
        (
            "STATUS",
            "Loading...".to_string(),
            Style::default().fg(Color::Cyan),
        )
    } else if let Some((is_error, message)) = log.messages.front() {
        (
            if *is_error { "LAST ERROR" } else { "LAST STATUS" },
            truncate_for_log(message, 170),
            if *is_error {
                Style::default().fg(Color::LightRed)
            } else {
                Style::default().fg(Color::Cyan)
            },
        )
    } else {
        (
            "LAST STATUS",
            "none".to_string(),
            Style::default().fg(Color::DarkGray),
        )
    };
    let key = |k: &'static str| {
        Span::styled(
            k,
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    };
    let hint = |h: &'static str| Span::styled(h, Style::default().fg(Color::Gray));
    let lines = vec![
        Line::from(vec![
            Span::styled(format!("{label}  "), style.add_modifier(Modifier::BOLD)),
            Span::styled(message, style),
        ]),
        Line::from(vec![
            key("r"),
            hint(" resubmit  "),
            key("c"),
            hint(" cancel  "),
            key("d"),
            hint(" download PDF  "),
            key("o"),
            hint(" open source page  "),
            key("j/k"),
            hint(" move  "),
            key("q"),
            hint(" quit"),
        ]),
    ];
    let border = if ui.error.is_some() {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Paragraph::new(lines)
        .block(
            Block::default()
                .title("Command & Health Bar")
                .borders(Borders::ALL)
                .border_style(border),
        )
        .wrap(Wrap { trim: true })
}

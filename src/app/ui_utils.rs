use std::process::{Command, Stdio};

use ratatui::style::{Color, Modifier, Style};

use super::types::JobPhase;

pub fn open_url_in_browser(url: &str) -> Result<(), String> {
    if url.trim().is_empty() {
        return Err("empty URL".to_string());
    }

    #[cfg(target_os = "macos")]
    let mut command = {
        let mut cmd = Command::new("open");
        cmd.arg(url);
        cmd
    };

    #[cfg(target_os = "windows")]
    let mut command = {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", "", url]);
        cmd
    };

    #[cfg(all(not(target_os = "macos"), not(target_os = "windows")))]
    let mut command = {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(url);
        cmd
    };

    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|err| err.to_string())?;

    Ok(())
}

pub fn truncate_for_log(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    input.chars().take(max_chars).collect::<String>() + "..."
}

pub fn status_code_style(code: u16) -> Style {
    match code {
        0 => Style::default()
            .fg(Color::LightRed)
            .add_modifier(Modifier::BOLD),
        200..=299 => Style::default().fg(Color::Green),
        300..=399 => Style::default().fg(Color::Yellow),
        400..=499 => Style::default().fg(Color::Red),
        500..=599 => Style::default().fg(Color::Magenta),
        _ => Style::default().fg(Color::Gray),
    }
}

pub fn phase_style(phase: JobPhase) -> Style {
    match phase {
        JobPhase::Idle => Style::default().fg(Color::DarkGray),
        JobPhase::Submitting | JobPhase::Polling | JobPhase::Fetching => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
        JobPhase::Resolved => Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
        JobPhase::Errored => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_counts_chars_not_bytes() {
        assert_eq!(truncate_for_log("short", 10), "short");
        assert_eq!(truncate_for_log("äöüäöü", 3), "äöü...");
    }

    #[test]
    fn empty_url_is_not_opened() {
        assert_eq!(open_url_in_browser("  "), Err("empty URL".to_string()));
    }
}

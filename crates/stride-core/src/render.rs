use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::dashboard::{Summary, UpcomingRow};
use crate::habits::HabitRow;
use crate::resources::ResourceRow;
use crate::state::Theme;
use crate::tasks::{FieldErrors, TaskRow};

/// Short id shown in tables; any unique prefix of it addresses the record.
pub fn short_id(id: uuid::Uuid) -> String {
    id.to_string().chars().take(8).collect()
}

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    theme: Theme,
}

impl Renderer {
    pub fn new(cfg: &Config, theme: Theme) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color, theme })
    }

    #[tracing::instrument(skip(self, rows))]
    pub fn print_task_table(&mut self, rows: &[TaskRow]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        if rows.is_empty() {
            writeln!(out, "No tasks match the current filters.")?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "".to_string(),
            "Due".to_string(),
            "Pri".to_string(),
            "Category".to_string(),
            "Title".to_string(),
        ];

        let mut table_rows = Vec::with_capacity(rows.len());
        for row in rows {
            let id = self.paint(&short_id(row.id), self.accent_code());
            let done = if row.completed { "x".to_string() } else { String::new() };

            let due = format!("{} ({})", row.due.format("%Y-%m-%d"), row.due_label);
            let due = if row.past_due && !row.completed {
                self.paint(&due, self.alert_code())
            } else {
                due
            };

            table_rows.push(vec![
                id,
                done,
                due,
                row.priority.label().to_string(),
                row.category.clone(),
                row.title.clone(),
            ]);
        }

        write_table(&mut out, headers, table_rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, errors))]
    pub fn print_field_errors(&mut self, errors: &FieldErrors) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        if let Some(message) = &errors.title {
            writeln!(out, "  title: {message}")?;
        }
        if let Some(message) = &errors.due {
            writeln!(out, "  due:   {message}")?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, rows))]
    pub fn print_habit_table(
        &mut self,
        rows: &[HabitRow],
        weekly: (usize, usize),
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        if rows.is_empty() {
            writeln!(out, "No habits yet.")?;
            return Ok(());
        }

        let mut headers = vec!["ID".to_string(), "Habit".to_string(), "Goal".to_string()];
        if let Some(first) = rows.first() {
            headers.extend(first.days.iter().map(|mark| mark.label.to_string()));
        }
        headers.push("Done".to_string());

        let mut table_rows = Vec::with_capacity(rows.len());
        for row in rows {
            let mut cells = vec![
                self.paint(&short_id(row.id), self.accent_code()),
                row.name.clone(),
                format!("{}/7", row.goal),
            ];
            for mark in &row.days {
                cells.push(if mark.done { "x".to_string() } else { ".".to_string() });
            }
            let done = format!("{}/{}", row.days_done, row.goal);
            cells.push(if row.achieved {
                self.paint(&done, self.success_code())
            } else {
                done
            });
            table_rows.push(cells);
        }

        write_table(&mut out, headers, table_rows)?;

        let (met, total) = weekly;
        writeln!(out, "{met} of {total} weekly goals met.")?;
        Ok(())
    }

    #[tracing::instrument(skip(self, rows))]
    pub fn print_resource_table(&mut self, rows: &[ResourceRow]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        if rows.is_empty() {
            writeln!(out, "No resources match the search.")?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "Fav".to_string(),
            "Category".to_string(),
            "Title".to_string(),
            "Link".to_string(),
        ];

        let mut table_rows = Vec::with_capacity(rows.len());
        for row in rows {
            let fav = if row.favorite {
                self.paint("*", self.accent_code())
            } else {
                String::new()
            };
            table_rows.push(vec![
                row.id.to_string(),
                fav,
                row.category.clone(),
                row.title.clone(),
                row.link.clone(),
            ]);
        }

        write_table(&mut out, headers, table_rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, summary, upcoming))]
    pub fn print_dashboard(
        &mut self,
        summary: &Summary,
        upcoming: &[UpcomingRow],
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "Due soon      {}", summary.due_soon)?;
        writeln!(
            out,
            "Completed     {} of {} ({}%)",
            summary.completed, summary.total, summary.completion_pct
        )?;
        writeln!(
            out,
            "Weekly goals  {} of {} met",
            summary.goals_met, summary.habit_total
        )?;
        writeln!(out)?;

        if upcoming.is_empty() {
            writeln!(out, "Nothing due in the next few days.")?;
            return Ok(());
        }

        writeln!(out, "Coming up:")?;
        for row in upcoming {
            let label = self.paint(&row.due_label, self.accent_code());
            writeln!(
                out,
                "  {} - {} [{} / {}]",
                label,
                row.title,
                row.priority.label(),
                row.category
            )?;
        }
        Ok(())
    }

    fn accent_code(&self) -> &'static str {
        match self.theme {
            Theme::Light => "33",
            Theme::Dark => "93",
        }
    }

    fn alert_code(&self) -> &'static str {
        match self.theme {
            Theme::Light => "31",
            Theme::Dark => "91",
        }
    }

    fn success_code(&self) -> &'static str {
        match self.theme {
            Theme::Light => "32",
            Theme::Dark => "92",
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

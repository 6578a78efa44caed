use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::calendar;
use crate::config::Config;
use crate::datetime;
use crate::schedule::Schedule;
use crate::store::TaskStore;
use crate::task::{Category, Task};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, store))]
    pub fn print_board(&mut self, store: &TaskStore) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        for category in Category::ALL {
            writeln!(out, "{}", self.paint(category.label(), category.accent()))?;

            let tasks = store.by_category(category);
            if tasks.is_empty() {
                writeln!(out, "  (empty)")?;
            }
            for task in tasks {
                let check = if task.completed { "[x]" } else { "[ ]" };
                let mut line = format!("{check} {:>3}  {}", task.id, task.text);
                if let Some(deadline) = task.deadline {
                    line.push_str(&format!("  (due {})", datetime::format_deadline(deadline)));
                }
                if task.has_details() {
                    line.push_str("  *");
                }
                let line = if task.completed {
                    self.paint(&line, "2")
                } else {
                    line
                };
                writeln!(out, "  {line}")?;
            }
            writeln!(out)?;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, tasks, today))]
    pub fn print_task_table(&mut self, tasks: &[&Task], today: NaiveDate) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "ID".to_string(),
            "Done".to_string(),
            "Category".to_string(),
            "Due".to_string(),
            "Note".to_string(),
            "Description".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());
        for task in tasks {
            let id = self.paint(&task.id.to_string(), "33");
            let done = if task.completed { "x" } else { "" }.to_string();
            let due = match task.deadline {
                Some(deadline) => {
                    let text = datetime::format_deadline(deadline);
                    if deadline < today {
                        self.paint(&text, "31")
                    } else {
                        text
                    }
                }
                None => String::new(),
            };
            let note = if task.has_details() { "*" } else { "" }.to_string();

            rows.push(vec![
                id,
                done,
                task.category.key().to_string(),
                due,
                note,
                task.text.clone(),
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, schedule))]
    pub fn print_schedule(&mut self, schedule: &Schedule, now_minutes: u32) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let current_time = schedule
            .current(now_minutes)
            .map(|entry| entry.time.clone());

        for entry in schedule.entries() {
            let is_current = current_time.as_deref() == Some(entry.time.as_str());
            let marker = if is_current { ">" } else { " " };
            let line = format!("{marker} {:>8}  {}  {}", entry.time, entry.emoji, entry.activity);
            let line = if is_current {
                self.paint(&line, "36")
            } else {
                line
            };
            writeln!(out, "{line}")?;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn print_month(
        &mut self,
        year: i32,
        month: u32,
        today: Option<u32>,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let title = format!("{} {year}", calendar::month_name(month));
        writeln!(out, "{title:^20}")?;
        writeln!(out, "Su Mo Tu We Th Fr Sa")?;

        let mut line = String::new();
        for (i, cell) in calendar::month_grid(year, month).iter().enumerate() {
            let text = match cell {
                Some(day) => format!("{day:>2}"),
                None => "  ".to_string(),
            };
            let text = if cell.is_some() && *cell == today {
                self.paint(&text, "7")
            } else {
                text
            };
            line.push_str(&text);
            if (i + 1) % 7 == 0 {
                writeln!(out, "{line}")?;
                line.clear();
            } else {
                line.push(' ');
            }
        }
        if !line.trim().is_empty() {
            writeln!(out, "{}", line.trim_end())?;
        }

        Ok(())
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

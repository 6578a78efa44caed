use anyhow::{Context, anyhow};
use chrono::{Datelike, Local, NaiveDate, Timelike, Utc};
use tracing::{debug, info, instrument};

use crate::board::BoardController;
use crate::cli::Invocation;
use crate::config::Config;
use crate::datetime;
use crate::render::Renderer;
use crate::reorder::{DropEvent, Slot};
use crate::schedule::Schedule;
use crate::task::{Category, Task};
use crate::utilities;

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "board",
        "add",
        "edit",
        "toggle",
        "note",
        "delete",
        "clear",
        "move",
        "list",
        "categories",
        "export",
        "schedule",
        "convert",
        "bmi",
        "water",
        "age",
        "sleep",
        "cal",
        "_show",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(board, schedule, cfg, renderer, inv))]
pub fn dispatch(
    board: &mut BoardController,
    schedule: &mut Schedule,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let command = inv.command.as_str();

    debug!(command, args = ?inv.args, "dispatching command");

    match command {
        "board" => cmd_board(board, renderer),
        "add" => cmd_add(board, &inv.args, now),
        "edit" => cmd_edit(board, &inv.args, now),
        "toggle" => cmd_toggle(board, &inv.args, now),
        "note" => cmd_note(board, &inv.args, now),
        "delete" => cmd_delete(board, &inv.args),
        "clear" => cmd_clear(board, &inv.args),
        "move" => cmd_move(board, &inv.args, now),
        "list" => cmd_list(board, renderer, &inv.args),
        "categories" => cmd_categories(),
        "export" => cmd_export(board),
        "schedule" => cmd_schedule(schedule, renderer, &inv.args),
        "convert" => cmd_convert(&inv.args),
        "bmi" => cmd_bmi(&inv.args),
        "water" => cmd_water(&inv.args),
        "age" => cmd_age(&inv.args),
        "sleep" => cmd_sleep(&inv.args),
        "cal" => cmd_cal(renderer, &inv.args),
        "_show" => cmd_show(cfg),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

fn parse_category(token: &str) -> anyhow::Result<Category> {
    Category::parse_key(token).ok_or_else(|| {
        let keys: Vec<&str> = Category::ALL.iter().map(|c| c.key()).collect();
        anyhow!("unknown category: {token} (expected one of {})", keys.join(", "))
    })
}

fn parse_task_id(token: &str) -> anyhow::Result<u64> {
    token
        .parse::<u64>()
        .with_context(|| format!("expected a numeric task id, got: {token}"))
}

/// Splits `due:YYYY-MM-DD` modifiers out of free-form task text.
fn parse_text_and_deadline(args: &[String]) -> anyhow::Result<(String, Option<NaiveDate>)> {
    let mut words = Vec::new();
    let mut deadline = None;

    for arg in args {
        if let Some(value) = arg.strip_prefix("due:") {
            deadline = Some(datetime::parse_deadline(value)?);
            continue;
        }
        words.push(arg.as_str());
    }

    Ok((words.join(" "), deadline))
}

#[instrument(skip(board, renderer))]
fn cmd_board(board: &mut BoardController, renderer: &mut Renderer) -> anyhow::Result<()> {
    info!("command board");
    renderer.print_board(board.store())
}

#[instrument(skip(board, args, now))]
fn cmd_add(
    board: &mut BoardController,
    args: &[String],
    now: chrono::DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command add");

    let Some((category_token, rest)) = args.split_first() else {
        return Err(anyhow!("add requires a category and task text"));
    };
    let category = parse_category(category_token)?;
    let (text, deadline) = parse_text_and_deadline(rest)?;

    board.submit(category, &text, deadline, now)?;
    Ok(())
}

#[instrument(skip(board, args, now))]
fn cmd_edit(
    board: &mut BoardController,
    args: &[String],
    now: chrono::DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command edit");

    let Some((id_token, rest)) = args.split_first() else {
        return Err(anyhow!("edit requires a task id and new text"));
    };
    let id = parse_task_id(id_token)?;
    let (text, deadline) = parse_text_and_deadline(rest)?;

    let Some(category) = board.store().get(id).map(|t| t.category) else {
        debug!(id, "edit on unknown id ignored");
        return Ok(());
    };
    if board.begin_edit(id).is_none() {
        return Ok(());
    }
    board.submit(category, &text, deadline, now)?;
    Ok(())
}

#[instrument(skip(board, args, now))]
fn cmd_toggle(
    board: &mut BoardController,
    args: &[String],
    now: chrono::DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command toggle");

    let id_token = args.first().ok_or_else(|| anyhow!("toggle requires a task id"))?;
    let id = parse_task_id(id_token)?;

    match board.toggle_completed(id, now)? {
        Some(true) => println!("Task {id} completed."),
        Some(false) => println!("Task {id} reopened."),
        None => debug!(id, "toggle on unknown id ignored"),
    }
    Ok(())
}

#[instrument(skip(board, args, now))]
fn cmd_note(
    board: &mut BoardController,
    args: &[String],
    now: chrono::DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command note");

    let Some((id_token, rest)) = args.split_first() else {
        return Err(anyhow!("note requires a task id"));
    };
    let id = parse_task_id(id_token)?;

    if rest.is_empty() {
        if let Some(task) = board.store().get(id) {
            match &task.details {
                Some(details) => println!("{details}"),
                None => println!("(no details)"),
            }
        }
        return Ok(());
    }

    if board.open_note(id).is_none() {
        debug!(id, "note on unknown id ignored");
        return Ok(());
    }
    board.save_note(&rest.join(" "), now)?;
    Ok(())
}

#[instrument(skip(board, args))]
fn cmd_delete(board: &mut BoardController, args: &[String]) -> anyhow::Result<()> {
    info!("command delete");

    let id_token = args.first().ok_or_else(|| anyhow!("delete requires a task id"))?;
    let id = parse_task_id(id_token)?;
    if !board.delete(id)? {
        debug!(id, "delete on unknown id ignored");
    }
    Ok(())
}

#[instrument(skip(board, args))]
fn cmd_clear(board: &mut BoardController, args: &[String]) -> anyhow::Result<()> {
    info!("command clear");

    let token = args.first().ok_or_else(|| anyhow!("clear requires a category"))?;
    let category = parse_category(token)?;
    board.clear_category(category)?;
    Ok(())
}

#[instrument(skip(board, args, now))]
fn cmd_move(
    board: &mut BoardController,
    args: &[String],
    now: chrono::DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command move");

    // Two spellings: `move <id> <category> [index]`, or the raw drop form
    // `move <from-category> <from-index> <to-category> <to-index>`.
    match args {
        [id_token, category_token] | [id_token, category_token, _]
            if id_token.parse::<u64>().is_ok() =>
        {
            let id = parse_task_id(id_token)?;
            let category = parse_category(category_token)?;
            let index = args
                .get(2)
                .map(|token| token.parse::<usize>())
                .transpose()
                .context("move index must be a number")?
                .unwrap_or(0);

            if board.move_task(id, category, index, now)? {
                println!("Moved task {id} to {}.", category.label());
            } else {
                debug!(id, "move on unknown id ignored");
            }
            Ok(())
        }
        [from_category, from_index, to_category, to_index] => {
            let event = DropEvent {
                source: Slot {
                    category: parse_category(from_category)?,
                    index: from_index
                        .parse()
                        .context("move source index must be a number")?,
                },
                destination: Some(Slot {
                    category: parse_category(to_category)?,
                    index: to_index
                        .parse()
                        .context("move target index must be a number")?,
                }),
            };
            if !board.handle_drop(event, now)? {
                debug!("drop did not match any task");
            }
            Ok(())
        }
        _ => Err(anyhow!(
            "usage: move <id> <category> [index], or move <from-category> <from-index> <to-category> <to-index>"
        )),
    }
}

#[instrument(skip(board, renderer, args))]
fn cmd_list(
    board: &mut BoardController,
    renderer: &mut Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command list");

    let filter = args.first().map(|token| parse_category(token)).transpose()?;
    let tasks: Vec<&Task> = board
        .store()
        .tasks()
        .iter()
        .filter(|task| filter.is_none_or(|category| task.category == category))
        .collect();

    renderer.print_task_table(&tasks, Local::now().date_naive())
}

fn cmd_categories() -> anyhow::Result<()> {
    for category in Category::ALL {
        println!("{:8} {}", category.key(), category.label());
    }
    Ok(())
}

#[instrument(skip(board))]
fn cmd_export(board: &mut BoardController) -> anyhow::Result<()> {
    info!("command export");
    let out = serde_json::to_string(board.store().tasks())?;
    println!("{out}");
    Ok(())
}

#[instrument(skip(schedule, renderer, args))]
fn cmd_schedule(
    schedule: &mut Schedule,
    renderer: &mut Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command schedule");

    let Some((sub, rest)) = args.split_first() else {
        let local = Local::now();
        let now_minutes = local.hour() * 60 + local.minute();
        return renderer.print_schedule(schedule, now_minutes);
    };

    match sub.as_str() {
        "add" => {
            let [time, emoji, activity @ ..] = rest else {
                return Err(anyhow!("usage: schedule add <time> <emoji> <activity...>"));
            };
            if activity.is_empty() {
                return Err(anyhow!("usage: schedule add <time> <emoji> <activity...>"));
            }
            schedule.add(time, emoji, &activity.join(" "))?;
            println!("Added schedule entry at {}.", time.trim());
            Ok(())
        }
        "remove" => {
            let token = rest
                .first()
                .ok_or_else(|| anyhow!("usage: schedule remove <position>"))?;
            let position: usize = token
                .parse()
                .context("schedule position must be a number")?;
            let removed = schedule.remove(position)?;
            println!("Removed {} {}.", removed.time, removed.activity);
            Ok(())
        }
        "reset" => {
            schedule.reset()?;
            println!("Schedule reset to the default plan.");
            Ok(())
        }
        other => Err(anyhow!("unknown schedule subcommand: {other}")),
    }
}

#[instrument(skip(args))]
fn cmd_convert(args: &[String]) -> anyhow::Result<()> {
    info!("command convert");

    if args.is_empty() {
        for conv in utilities::CONVERSIONS {
            println!("{:10} {} ({} -> {})", conv.key, conv.label, conv.from, conv.to);
        }
        return Ok(());
    }

    let value: f64 = args[0]
        .parse()
        .with_context(|| format!("convert requires a numeric value, got: {}", args[0]))?;
    let key = args
        .get(1)
        .ok_or_else(|| anyhow!("convert requires a conversion key (run `planner convert` for the list)"))?;
    let conv = utilities::find_conversion(key)
        .ok_or_else(|| anyhow!("unknown conversion: {key}"))?;

    println!("{} {} = {:.2} {}", value, conv.from, conv.apply(value), conv.to);
    Ok(())
}

#[instrument(skip(args))]
fn cmd_bmi(args: &[String]) -> anyhow::Result<()> {
    info!("command bmi");

    let [weight, height] = args else {
        return Err(anyhow!("usage: bmi <weight-kg> <height-cm>"));
    };
    let weight: f64 = weight.parse().context("weight must be a number")?;
    let height: f64 = height.parse().context("height must be a number")?;

    println!("Your BMI is: {:.1}", utilities::bmi(weight, height)?);
    Ok(())
}

#[instrument(skip(args))]
fn cmd_water(args: &[String]) -> anyhow::Result<()> {
    info!("command water");

    let weight_token = args
        .first()
        .ok_or_else(|| anyhow!("usage: water <weight-kg> [low|moderate|high]"))?;
    let weight: f64 = weight_token.parse().context("weight must be a number")?;
    let activity = match args.get(1) {
        Some(token) => utilities::Activity::parse(token)
            .ok_or_else(|| anyhow!("unknown activity level: {token} (low, moderate or high)"))?,
        None => utilities::Activity::Low,
    };

    let liters = utilities::water_intake_liters(weight, activity)?;
    println!("Daily water intake: {liters:.2} L");
    Ok(())
}

#[instrument(skip(args))]
fn cmd_age(args: &[String]) -> anyhow::Result<()> {
    info!("command age");

    let token = args
        .first()
        .ok_or_else(|| anyhow!("usage: age <YYYY-MM-DD>"))?;
    let dob = datetime::parse_deadline(token)?;
    let today = Local::now().date_naive();

    let (years, months, days) = utilities::calendar_age(dob, today)?;
    println!("You are: {years} years, {months} months, {days} days");
    Ok(())
}

#[instrument(skip(args))]
fn cmd_sleep(args: &[String]) -> anyhow::Result<()> {
    info!("command sleep");

    let [bed, wake] = args else {
        return Err(anyhow!("usage: sleep <bed-time> <wake-time>"));
    };
    let minutes = utilities::sleep_duration_minutes(bed, wake)?;
    println!("Total sleep: {}", datetime::format_duration(minutes));
    Ok(())
}

#[instrument(skip(renderer, args))]
fn cmd_cal(renderer: &mut Renderer, args: &[String]) -> anyhow::Result<()> {
    info!("command cal");

    let today = Local::now().date_naive();
    let (month, year) = match args {
        [] => (today.month(), today.year()),
        [month_token, year_token] => (
            month_token.parse().context("month must be a number")?,
            year_token.parse().context("year must be a number")?,
        ),
        _ => return Err(anyhow!("usage: cal [month year]")),
    };
    if !(1..=12).contains(&month) {
        return Err(anyhow!("month must be between 1 and 12"));
    }

    let highlight =
        (year == today.year() && month == today.month()).then(|| today.day());
    renderer.print_month(year, month, highlight)
}

fn cmd_show(cfg: &Config) -> anyhow::Result<()> {
    for (k, v) in cfg.iter() {
        println!("{k}={v}");
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!(
        "Implemented commands: board, add, edit, toggle, note, delete, clear, move, list, categories, export, schedule, convert, bmi, water, age, sleep, cal"
    );
    Ok(())
}

use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::cli::Invocation;
use crate::confirm::confirm;
use crate::config::Config;
use crate::datastore::DataStore;
use crate::datetime::parse_due_expr;
use crate::habit::Habit;
use crate::habits::{self, HabitOutcome};
use crate::render::{Renderer, short_id};
use crate::resources::{self, ResourceQuery};
use crate::state::{AppState, Theme};
use crate::task::{Priority, Task};
use crate::tasks::{self, TaskDraft, TaskOutcome};
use crate::{dashboard, datetime};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add",
        "quickadd",
        "list",
        "edit",
        "done",
        "delete",
        "habit",
        "habits",
        "resources",
        "dashboard",
        "theme",
        "reset",
        "export",
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

#[instrument(skip(state, store, cfg, renderer, inv))]
pub fn dispatch(
    state: &mut AppState,
    store: &DataStore,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let command = inv.command.as_str();

    debug!(command, args = ?inv.args, "dispatching command");

    match command {
        "add" => cmd_add(state, store, cfg, renderer, &inv.args, now),
        "quickadd" => cmd_quickadd(state, store, cfg, &inv.args, now),
        "list" => cmd_list(state, renderer, &inv.args, now),
        "edit" => cmd_edit(state, store, renderer, &inv.args, now),
        "done" => cmd_done(state, store, &inv.args),
        "delete" => cmd_delete(state, store, cfg, &inv.args),
        "habit" | "habits" => cmd_habit(state, store, cfg, renderer, &inv.args, now),
        "resources" => cmd_resources(state, store, cfg, renderer, &inv.args),
        "dashboard" => cmd_dashboard(state, renderer, now),
        "theme" => cmd_theme(state, store, &inv.args),
        "reset" => cmd_reset(state, store, cfg),
        "export" => cmd_export(state),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

/// Field overrides parsed from `key:value` tokens; bare words become the
/// title.
#[derive(Debug, Default)]
struct TaskMods {
    title_words: Vec<String>,
    due: Option<NaiveDate>,
    priority: Option<Priority>,
    category: Option<String>,
    description: Option<String>,
}

fn parse_task_mods(args: &[String], now: DateTime<Utc>) -> anyhow::Result<TaskMods> {
    let mut mods = TaskMods::default();

    for arg in args {
        if let Some(value) = arg.strip_prefix("due:") {
            mods.due = Some(parse_due_expr(value, now)?);
        } else if let Some(value) = arg.strip_prefix("priority:").or_else(|| arg.strip_prefix("pri:")) {
            mods.priority = Some(value.parse()?);
        } else if let Some(value) = arg.strip_prefix("category:").or_else(|| arg.strip_prefix("cat:")) {
            mods.category = Some(value.to_string());
        } else if let Some(value) = arg.strip_prefix("desc:") {
            mods.description = Some(value.to_string());
        } else {
            mods.title_words.push(arg.clone());
        }
    }

    Ok(mods)
}

enum Resolved {
    One(Uuid),
    None,
    Ambiguous(usize),
}

fn resolve_id<I>(ids: I, token: &str) -> Resolved
where
    I: Iterator<Item = Uuid>,
{
    let needle = token.to_ascii_lowercase();
    let matches: Vec<Uuid> = ids
        .filter(|id| id.to_string().starts_with(&needle))
        .collect();
    match matches.len() {
        0 => Resolved::None,
        1 => Resolved::One(matches[0]),
        n => Resolved::Ambiguous(n),
    }
}

fn resolve_task(state: &AppState, token: &str) -> Option<Uuid> {
    match resolve_id(state.tasks.iter().map(|task| task.id), token) {
        Resolved::One(id) => Some(id),
        Resolved::None => {
            println!("No task matches '{token}'.");
            None
        }
        Resolved::Ambiguous(n) => {
            println!("Id prefix '{token}' is ambiguous ({n} matches).");
            None
        }
    }
}

fn resolve_habit(state: &AppState, token: &str) -> Option<Uuid> {
    match resolve_id(state.habits.iter().map(|habit| habit.id), token) {
        Resolved::One(id) => Some(id),
        Resolved::None => {
            println!("No habit matches '{token}'.");
            None
        }
        Resolved::Ambiguous(n) => {
            println!("Id prefix '{token}' is ambiguous ({n} matches).");
            None
        }
    }
}

fn default_category(cfg: &Config) -> String {
    cfg.get("category.default").unwrap_or_else(|| "study".to_string())
}

#[instrument(skip(state, store, cfg, renderer, args, now))]
fn cmd_add(
    state: &mut AppState,
    store: &DataStore,
    cfg: &Config,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command add");

    let mods = parse_task_mods(args, now)?;
    let draft = TaskDraft {
        title: mods.title_words.join(" "),
        description: mods.description.unwrap_or_default(),
        due: mods.due,
        priority: mods.priority.unwrap_or(Priority::Medium),
        category: mods.category.unwrap_or_else(|| default_category(cfg)),
    };

    match tasks::create(state, store, draft, now)? {
        TaskOutcome::Created(id) => println!("Created task {}.", short_id(id)),
        TaskOutcome::Invalid(errors) => {
            println!("Task not added:");
            renderer.print_field_errors(&errors)?;
        }
        _ => {}
    }
    Ok(())
}

#[instrument(skip(state, store, cfg, args, now))]
fn cmd_quickadd(
    state: &mut AppState,
    store: &DataStore,
    cfg: &Config,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command quickadd");

    let (title, due) = match args.split_last() {
        Some((last, title_words)) if !title_words.is_empty() => {
            (title_words.join(" "), Some(parse_due_expr(last, now)?))
        }
        _ => (String::new(), None),
    };

    match tasks::quick_create(state, store, &title, due, &default_category(cfg), now)? {
        TaskOutcome::Created(id) => println!("Created task {}.", short_id(id)),
        TaskOutcome::Rejected => {
            println!("Nothing added (quick add needs a title and a due date).");
        }
        _ => {}
    }
    Ok(())
}

#[instrument(skip(state, renderer, args, now))]
fn cmd_list(
    state: &mut AppState,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command list");

    for arg in args {
        if let Some(value) = arg.strip_prefix("status:") {
            state.selection.status = value.parse()?;
        } else if let Some(value) = arg.strip_prefix("category:").or_else(|| arg.strip_prefix("cat:")) {
            state.selection.category = if value.eq_ignore_ascii_case("all") {
                None
            } else {
                Some(value.to_string())
            };
        } else if let Some(value) = arg.strip_prefix("sort:") {
            state.selection.sort = value.parse()?;
        } else {
            return Err(anyhow!(
                "unexpected list argument: {arg} (expected status:, category: or sort:)"
            ));
        }
    }

    let rows = tasks::rows(state, now);
    renderer.print_task_table(&rows)
}

#[instrument(skip(state, store, renderer, args, now))]
fn cmd_edit(
    state: &mut AppState,
    store: &DataStore,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command edit");

    let Some(token) = args.first() else {
        return Err(anyhow!("edit requires a task id"));
    };
    let Some(id) = resolve_task(state, token) else {
        return Ok(());
    };
    let mods = parse_task_mods(&args[1..], now)?;

    let Some(existing) = state.find_task(id) else {
        return Ok(());
    };
    let draft = TaskDraft {
        title: if mods.title_words.is_empty() {
            existing.title.clone()
        } else {
            mods.title_words.join(" ")
        },
        description: mods
            .description
            .unwrap_or_else(|| existing.description.clone()),
        due: Some(mods.due.unwrap_or(existing.due)),
        priority: mods.priority.unwrap_or(existing.priority),
        category: mods.category.unwrap_or_else(|| existing.category.clone()),
    };

    state.selection.editing = Some(id);
    match tasks::update(state, store, id, draft)? {
        TaskOutcome::Updated(id) => println!("Updated task {}.", short_id(id)),
        TaskOutcome::Invalid(errors) => {
            println!("Task not updated:");
            renderer.print_field_errors(&errors)?;
        }
        TaskOutcome::NotFound => println!("No task matches '{token}'."),
        _ => {}
    }
    state.selection.editing = None;
    Ok(())
}

#[instrument(skip(state, store, args))]
fn cmd_done(state: &mut AppState, store: &DataStore, args: &[String]) -> anyhow::Result<()> {
    info!("command done");

    if args.is_empty() {
        return Err(anyhow!("done requires at least one task id"));
    }

    for token in args {
        let Some(id) = resolve_task(state, token) else {
            continue;
        };
        match tasks::toggle_completed(state, store, id)? {
            TaskOutcome::Toggled { id, completed: true } => {
                println!("Completed task {}.", short_id(id));
            }
            TaskOutcome::Toggled { id, completed: false } => {
                println!("Reopened task {}.", short_id(id));
            }
            _ => {}
        }
    }
    Ok(())
}

#[instrument(skip(state, store, cfg, args))]
fn cmd_delete(
    state: &mut AppState,
    store: &DataStore,
    cfg: &Config,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command delete");

    let Some(token) = args.first() else {
        return Err(anyhow!("delete requires a task id"));
    };
    let Some(id) = resolve_task(state, token) else {
        return Ok(());
    };
    let title = state
        .find_task(id)
        .map(|task| task.title.clone())
        .unwrap_or_default();

    if !confirm(cfg, "Delete task", &format!("Permanently delete '{title}'?"))? {
        println!("Deletion cancelled.");
        return Ok(());
    }

    if let TaskOutcome::Deleted(id) = tasks::delete(state, store, id)? {
        println!("Deleted task {}.", short_id(id));
    }
    Ok(())
}

fn parse_day_token(token: &str) -> Option<usize> {
    if let Ok(day) = token.parse::<usize>() {
        return Some(day);
    }
    let lower = token.to_ascii_lowercase();
    datetime::WEEK_DAYS
        .iter()
        .position(|label| lower.starts_with(&label.to_ascii_lowercase()))
}

#[instrument(skip(state, store, cfg, renderer, args, now))]
fn cmd_habit(
    state: &mut AppState,
    store: &DataStore,
    cfg: &Config,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command habit");

    match args.first().map(String::as_str) {
        None | Some("list") => {
            let rows = habits::rows(state);
            renderer.print_habit_table(&rows, habits::weekly_summary(state))
        }
        Some("add") => {
            let (name, goal) = match args[1..].split_last() {
                Some((last, name_words)) if !name_words.is_empty() => {
                    (name_words.join(" "), last.parse::<u8>().unwrap_or(0))
                }
                _ => (String::new(), 0),
            };
            match habits::create(state, store, &name, goal, now)? {
                HabitOutcome::Created(_) => println!("Added habit '{name}' (goal {goal}/7)."),
                HabitOutcome::Rejected => {
                    println!("Nothing added (habit needs a name and a goal of 1-7 days).");
                }
                _ => {}
            }
            Ok(())
        }
        Some("toggle") => {
            let (Some(id_token), Some(day_token)) = (args.get(1), args.get(2)) else {
                return Err(anyhow!("habit toggle requires an id and a day"));
            };
            let Some(id) = resolve_habit(state, id_token) else {
                return Ok(());
            };
            let Some(day) = parse_day_token(day_token) else {
                println!("Day must be 0-6 or a weekday name.");
                return Ok(());
            };
            match habits::toggle_day(state, store, id, day)? {
                HabitOutcome::Toggled { id, day, done } => {
                    let name = state
                        .find_habit(id)
                        .map(|habit| habit.name.clone())
                        .unwrap_or_default();
                    let label = datetime::WEEK_DAYS[day];
                    if done {
                        println!("Marked {label} done for '{name}'.");
                    } else {
                        println!("Cleared {label} for '{name}'.");
                    }
                }
                HabitOutcome::InvalidDay => println!("Day must be 0-6 or a weekday name."),
                _ => {}
            }
            Ok(())
        }
        Some("delete") => {
            let Some(id_token) = args.get(1) else {
                return Err(anyhow!("habit delete requires an id"));
            };
            let Some(id) = resolve_habit(state, id_token) else {
                return Ok(());
            };
            let name = state
                .find_habit(id)
                .map(|habit| habit.name.clone())
                .unwrap_or_default();

            if !confirm(cfg, "Delete habit", &format!("Permanently delete '{name}'?"))? {
                println!("Deletion cancelled.");
                return Ok(());
            }

            if matches!(habits::delete(state, store, id)?, HabitOutcome::Deleted(_)) {
                println!("Deleted habit '{name}'.");
            }
            Ok(())
        }
        Some(other) => Err(anyhow!(
            "unknown habit subcommand: {other} (expected add, toggle, delete or list)"
        )),
    }
}

fn resource_source(store: &DataStore, cfg: &Config) -> String {
    cfg.get("resources.source")
        .unwrap_or_else(|| store.data_dir.join("resources.json").to_string_lossy().to_string())
}

fn render_resources(
    state: &AppState,
    renderer: &mut Renderer,
    query: &ResourceQuery,
) -> anyhow::Result<()> {
    match state.resources.state() {
        crate::resource::LoadState::Loaded => {
            let rows = resources::rows(state, query);
            renderer.print_resource_table(&rows)
        }
        crate::resource::LoadState::Failed(reason) => {
            println!("Could not load resources: {reason}");
            println!("Run 'stride resources refresh' to retry.");
            Ok(())
        }
        _ => Ok(()),
    }
}

#[instrument(skip(state, store, cfg, renderer, args))]
fn cmd_resources(
    state: &mut AppState,
    store: &DataStore,
    cfg: &Config,
    renderer: &mut Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command resources");

    let source = resource_source(store, cfg);

    match args.first().map(String::as_str) {
        Some("fav") => {
            let Some(raw) = args.get(1) else {
                return Err(anyhow!("resources fav requires a resource id"));
            };
            let id: u64 = raw
                .parse()
                .with_context(|| format!("invalid resource id: {raw}"))?;
            if resources::toggle_favorite(state, store, id)? {
                println!("Added resource {id} to favorites.");
            } else {
                println!("Removed resource {id} from favorites.");
            }
            Ok(())
        }
        Some("refresh") => {
            println!("Loading resources from {source}...");
            resources::load(state, &source)?;
            render_resources(state, renderer, &ResourceQuery::default())
        }
        _ => {
            if state.resources.needs_load() {
                println!("Loading resources from {source}...");
            }
            resources::ensure_loaded(state, &source)?;

            let mut query = ResourceQuery::default();
            let mut search_words: Vec<String> = Vec::new();
            for arg in args {
                if arg == "search" {
                    continue;
                }
                if arg == "favorites" {
                    state.selection.favorites_only = true;
                    continue;
                }
                if let Some(value) = arg.strip_prefix("category:").or_else(|| arg.strip_prefix("cat:")) {
                    query.category = if value.eq_ignore_ascii_case("all") {
                        None
                    } else {
                        Some(value.to_string())
                    };
                    continue;
                }
                search_words.push(arg.clone());
            }
            query.search = search_words.join(" ");

            render_resources(state, renderer, &query)
        }
    }
}

#[instrument(skip(state, renderer, now))]
fn cmd_dashboard(
    state: &mut AppState,
    renderer: &mut Renderer,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command dashboard");

    let summary = dashboard::summary(state, now);
    let upcoming = dashboard::upcoming(state, now);
    renderer.print_dashboard(&summary, &upcoming)
}

#[instrument(skip(state, store, args))]
fn cmd_theme(state: &mut AppState, store: &DataStore, args: &[String]) -> anyhow::Result<()> {
    info!("command theme");

    let theme = match args.first() {
        Some(token) => token.parse::<Theme>()?,
        None => state.theme.toggled(),
    };

    state.theme = theme;
    store.save_theme(theme)?;
    println!("Theme set to {}.", theme.as_str());
    Ok(())
}

#[instrument(skip(state, store, cfg))]
fn cmd_reset(state: &mut AppState, store: &DataStore, cfg: &Config) -> anyhow::Result<()> {
    info!("command reset");

    if !confirm(
        cfg,
        "Reset all data",
        "Delete all tasks, habits and favorites? This cannot be undone.",
    )? {
        println!("Reset cancelled.");
        return Ok(());
    }

    store.reset()?;
    state.tasks.clear();
    state.habits.clear();
    state.favorites.clear();
    state.selection.editing = None;

    println!("All data cleared. Theme kept.");
    Ok(())
}

#[derive(Debug, Serialize)]
struct ExportPayload<'a> {
    tasks: &'a [Task],
    habits: &'a [Habit],
    favorites: &'a [u64],
}

#[instrument(skip(state))]
fn cmd_export(state: &AppState) -> anyhow::Result<()> {
    info!("command export");

    let payload = ExportPayload {
        tasks: &state.tasks,
        habits: &state.habits,
        favorites: &state.favorites,
    };
    println!("{}", serde_json::to_string(&payload)?);
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!(
        "\
stride - a study-tracking CLI

  add <title> [due:<expr>] [priority:<p>] [category:<c>] [desc:<text>]
  quickadd <title> <due-expr>
  list [status:<all|active|completed>] [category:<c>] [sort:<due|priority|title>]
  edit <id> [<new title>] [due:...] [priority:...] [category:...] [desc:...]
  done <id>...
  delete <id>
  habit add <name> <goal> | habit toggle <id> <day> | habit delete <id> | habits
  resources [search <terms>] [category:<c>] [favorites]
  resources fav <resource-id> | resources refresh
  dashboard
  theme [light|dark]
  reset
  export

Due date expressions: today, tomorrow, weekday names, +Nd, YYYY-MM-DD.
Tasks and habits are addressed by any unique prefix of their id."
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{expand_command_abbrev, known_command_names, parse_day_token, resolve_id, Resolved};

    #[test]
    fn abbreviations_expand_when_unambiguous() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("da", &known), Some("dashboard"));
        assert_eq!(expand_command_abbrev("q", &known), Some("quickadd"));
        assert_eq!(expand_command_abbrev("habit", &known), Some("habit"));
        // "habi" matches both habit and habits.
        assert_eq!(expand_command_abbrev("habi", &known), None);
        assert_eq!(expand_command_abbrev("zzz", &known), None);
    }

    #[test]
    fn id_prefix_resolution() {
        let a = uuid::Uuid::new_v4();
        let b = uuid::Uuid::new_v4();
        let ids = [a, b];

        let prefix: String = a.to_string().chars().take(12).collect();
        assert!(matches!(
            resolve_id(ids.iter().copied(), &prefix),
            Resolved::One(found) if found == a
        ));
        assert!(matches!(
            resolve_id(ids.iter().copied(), "not-a-uuid"),
            Resolved::None
        ));
        assert!(matches!(resolve_id(ids.iter().copied(), ""), Resolved::Ambiguous(2)));
    }

    #[test]
    fn day_tokens_accept_indices_and_names() {
        assert_eq!(parse_day_token("0"), Some(0));
        assert_eq!(parse_day_token("6"), Some(6));
        assert_eq!(parse_day_token("mon"), Some(0));
        assert_eq!(parse_day_token("Sunday"), Some(6));
        assert_eq!(parse_day_token("someday"), None);
    }
}

use std::error::Error;
use std::io::{self, BufRead, Write};

use chrono::Utc;

use taskflow::logging::init_logging;
use taskflow::{Config, ExportFile, FileBackend, Filter, Screen, Storage, TaskId, TaskManager};

const HELP: &str = "\
commands:
  add <text>           add a task
  toggle <id>          mark a task done / not done
  edit <id>            start editing a task
  draft <text>         change the text being edited
  save                 save the edit
  cancel               cancel the edit
  delete <id>          ask to delete a task
  confirm | keep       confirm or cancel the delete
  filter <all|active|completed>
  stats                show statistics
  export               print all tasks as JSON
  import <json>        replace all tasks with exported JSON
  clear                delete every task
  list                 show the list again
  quit";

fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env();
    let _logger = init_logging(&config.data_dir)?;

    let storage = Storage::new(FileBackend::new(config.data_dir.clone()));
    let mut manager = TaskManager::open(storage, &config);

    let stdin = io::stdin();
    let mut out = io::stdout().lock();
    render(&mut out, &manager.view(Utc::now()))?;
    write!(out, "> ")?;
    out.flush()?;

    for line in stdin.lock().lines() {
        let line = line?;
        let (command, rest) = match line.trim().split_once(' ') {
            Some((command, rest)) => (command, rest.trim()),
            None => (line.trim(), ""),
        };
        match command {
            "" => {}
            "quit" | "exit" => break,
            "help" => writeln!(out, "{HELP}")?,
            "add" => {
                let _ = manager.add_task(rest);
            }
            "toggle" => {
                if let Some(id) = parse_id(&mut out, rest)? {
                    let _ = manager.toggle_task(id);
                }
            }
            "edit" => {
                if let Some(id) = parse_id(&mut out, rest)? {
                    let _ = manager.start_edit(id);
                }
            }
            "draft" => manager.update_draft(rest),
            "save" => {
                let _ = manager.save_edit();
            }
            "cancel" => manager.cancel_edit(),
            "delete" => {
                if let Some(id) = parse_id(&mut out, rest)? {
                    let _ = manager.request_delete(id);
                }
            }
            "confirm" => {
                let _ = manager.confirm_delete();
            }
            "keep" => manager.cancel_delete(),
            "filter" => match rest.parse::<Filter>() {
                Ok(filter) => manager.set_filter(filter),
                Err(err) => writeln!(out, "{err}")?,
            },
            "stats" => {
                let stats = manager.statistics();
                writeln!(
                    out,
                    "total={} completed={} active={} completion={}%",
                    stats.total, stats.completed, stats.active, stats.completion_rate
                )?;
            }
            "export" => writeln!(out, "{}", serde_json::to_string_pretty(&manager.export())?)?,
            "import" => match serde_json::from_str::<ExportFile>(rest) {
                Ok(data) => {
                    let count = manager.import(data);
                    writeln!(out, "imported {count} tasks")?;
                }
                Err(err) => writeln!(out, "invalid import data: {err}")?,
            },
            "clear" => manager.clear_all(),
            "list" => {}
            other => writeln!(out, "unknown command: {other} (try `help`)")?,
        }
        render(&mut out, &manager.view(Utc::now()))?;
        write!(out, "> ")?;
        out.flush()?;
    }
    Ok(())
}

fn parse_id(out: &mut impl Write, raw: &str) -> io::Result<Option<TaskId>> {
    match raw.parse::<TaskId>() {
        Ok(id) => Ok(Some(id)),
        Err(_) => {
            writeln!(out, "expected a task id, got `{raw}`")?;
            Ok(None)
        }
    }
}

fn render(out: &mut impl Write, screen: &Screen) -> io::Result<()> {
    let view = &screen.view;
    writeln!(
        out,
        "[{}] {} | {}",
        view.filter, view.task_label, view.completed_label
    )?;
    if view.empty {
        writeln!(out, "  (no tasks)")?;
    }
    for row in &view.rows {
        let mark = if row.completed { "x" } else { " " };
        match &row.draft {
            Some(draft) => writeln!(out, "  [{mark}] {:>4}  editing: {draft}", row.id)?,
            None => writeln!(out, "  [{mark}] {:>4}  {}", row.id, row.text)?,
        }
    }
    if let Some(id) = screen.pending_delete {
        writeln!(out, "  delete task {id}? (confirm / keep)")?;
    }
    for notice in &screen.notices {
        writeln!(out, "  ! {}", notice.message)?;
    }
    Ok(())
}

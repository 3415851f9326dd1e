use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use cramguard_core::{
    Block, Category, ExportRequest, IntakeError, IntakeParser, PlannerBoard, Priority, StdRandom,
    Task, TaskDraft, export_ics, export_summary, local_now, parse_local_datetime,
};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod state;

use config::Config;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CRAMGUARD_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(
    name = "cramguard",
    version = VERSION,
    about = "Deadline-aware study planner: turn tasks into committed work blocks"
)]
struct Cli {
    /// State directory (defaults to $CRAMGUARD_HOME or ~/.cramguard)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a free-text task without saving it
    Parse {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Add a task from free text and suggest work blocks for it
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Due date as "YYYY-MM-DD HH:MM" (overrides the parsed one)
        #[arg(long)]
        due: Option<String>,

        #[arg(long)]
        priority: Option<Priority>,

        #[arg(long)]
        category: Option<Category>,

        /// Effort estimate in hours
        #[arg(long)]
        effort: Option<u32>,

        #[arg(long)]
        description: Option<String>,
    },

    /// List tasks, earliest due first
    Tasks {
        /// Include completed tasks
        #[arg(long)]
        all: bool,
    },

    /// Generate fresh block suggestions for a task
    Suggest {
        task_id: String,

        #[arg(long)]
        count: Option<usize>,
    },

    /// Replace one suggested block with a non-conflicting alternative
    Swap { block: String },

    /// Commit a suggested block
    Commit { block: String },

    /// Remove a committed block
    Uncommit { block: String },

    /// Mark a task done (or not done with --undo)
    Done {
        task_id: String,

        #[arg(long)]
        undo: bool,
    },

    /// Delete a task and all of its blocks
    Delete { task_id: String },

    /// Write committed blocks to an .ics calendar file
    Export {
        /// Only export this task's blocks
        #[arg(long)]
        task: Option<String>,

        /// Output file or directory (default: current directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Manage ~/.cramguard/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Show example task phrasings
    Examples,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,
    /// Print the effective config
    Show,
    /// Print the config file path
    Path,
}

struct Ctx {
    home: PathBuf,
    config: Config,
    now: NaiveDateTime,
}

impl Ctx {
    fn load(home: PathBuf) -> Result<Self> {
        let config = config::load_config(&home)?;
        let now = local_now(config.timezone()?);
        Ok(Self { home, config, now })
    }

    fn board(&self) -> Result<PlannerBoard> {
        state::load_board(&self.home)
    }

    fn save(&self, board: &PlannerBoard) -> Result<()> {
        state::save_board(&self.home, board)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cramguard=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let home = match cli.home {
        Some(h) => h,
        None => state::cramguard_home()?,
    };

    match cli.command {
        Command::Config { command } => match command {
            ConfigCommand::Init => {
                let p = config::config_path(&home);
                if config::init_config(&home)? {
                    println!("Wrote {}", p.display());
                } else {
                    println!("Config already exists: {}", p.display());
                }
            }
            ConfigCommand::Show => {
                let cfg = config::load_config(&home)?;
                print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            }
            ConfigCommand::Path => println!("{}", config::config_path(&home).display()),
        },

        Command::Examples => {
            let cfg = config::load_config(&home)?;
            for ex in &cfg.intake.examples {
                println!("  {ex}");
            }
        }

        command => {
            let ctx = Ctx::load(home)?;
            run(&ctx, command)?;
        }
    }

    Ok(())
}

fn run(ctx: &Ctx, command: Command) -> Result<()> {
    match command {
        Command::Parse { text } => {
            let parser = ctx.config.parser()?;
            let draft = parse_draft(&parser, &text.join(" "), ctx.now)?;
            print_draft(&draft);
            warn_if_past_due(&draft, ctx.now);
        }

        Command::Add {
            text,
            due,
            priority,
            category,
            effort,
            description,
        } => {
            let parser = ctx.config.parser()?;
            let input = text.join(" ");
            let mut draft = parse_draft(&parser, &input, ctx.now)?;
            if let Some(due) = due {
                draft = draft.with_due(parse_local_datetime(&due)?);
            }
            if let Some(p) = priority {
                draft.priority = p;
            }
            if let Some(c) = category {
                draft.category = c;
            }
            if let Some(e) = effort {
                draft.effort = e;
            }
            if draft.due.is_none() {
                bail!(
                    "No due date found in \"{input}\". Add one to the text or pass --due \"YYYY-MM-DD HH:MM\""
                );
            }

            warn_if_past_due(&draft, ctx.now);

            let mut task = draft.into_task(new_task_id(), ctx.now)?;
            if let Some(d) = description {
                task = task.with_description(d);
            }

            let mut board = ctx.board()?;
            board.add_task(task.clone())?;
            println!("Added [{}] {} (due {})", task.id, task.title, fmt_dt(task.due));
            suggest_for(ctx, &mut board, &task, ctx.config.planner.default_count)?;
            ctx.save(&board)?;
        }

        Command::Tasks { all } => {
            let board = ctx.board()?;
            let tasks = if all { board.tasks() } else { board.open_tasks() };
            if tasks.is_empty() {
                println!("No tasks. Add one with: cramguard add \"Math homework due tomorrow at 5pm\"");
                return Ok(());
            }
            for t in tasks {
                print_task(&board, t, ctx.now);
            }
            let committed = board.committed(None).len();
            if committed > 0 {
                println!(
                    "\n{committed} block{} committed, earliest finish {}h early",
                    if committed > 1 { "s" } else { "" },
                    board.min_hours_ahead()
                );
            }
        }

        Command::Suggest { task_id, count } => {
            let mut board = ctx.board()?;
            let task = board
                .task(&task_id)
                .cloned()
                .ok_or_else(|| anyhow!("no task with id '{task_id}'"))?;
            let count = count.unwrap_or(ctx.config.planner.default_count);
            suggest_for(ctx, &mut board, &task, count)?;
            ctx.save(&board)?;
        }

        Command::Swap { block } => {
            let mut board = ctx.board()?;
            let id = resolve_block(&board, &block, false)?;
            let engine = ctx.config.engine()?;
            let swapped = board
                .swap_suggestion(&id, &engine, ctx.now, &mut StdRandom::from_entropy())?
                .clone();
            println!("Swapped:");
            print_block(&board, &swapped);
            ctx.save(&board)?;
        }

        Command::Commit { block } => {
            let mut board = ctx.board()?;
            let id = resolve_block(&board, &block, false)?;
            let hours = board.commit(&id)?;
            println!("Block committed, you're {hours}h ahead of deadline");
            ctx.save(&board)?;
        }

        Command::Uncommit { block } => {
            let mut board = ctx.board()?;
            let id = resolve_block(&board, &block, true)?;
            let removed = board.uncommit(&id)?;
            println!("Uncommitted [{}]", short_id(&removed));
            ctx.save(&board)?;
        }

        Command::Done { task_id, undo } => {
            let mut board = ctx.board()?;
            let task = board.set_completed(&task_id, !undo, ctx.now)?;
            let state = if task.is_completed() { "done" } else { "open" };
            println!("[{}] {} is {state}", task.id, task.title);
            ctx.save(&board)?;
        }

        Command::Delete { task_id } => {
            let mut board = ctx.board()?;
            let task = board.delete_task(&task_id)?;
            println!("Deleted [{}] {}", task.id, task.title);
            ctx.save(&board)?;
        }

        Command::Export { task, out } => {
            let board = ctx.board()?;
            let blocks = board.committed(None);
            let tasks: Vec<Task> = board.tasks().into_iter().cloned().collect();
            let summary = export_summary(&blocks, &tasks, task.as_deref());

            let req = ExportRequest {
                blocks: &blocks,
                tasks: &tasks,
                selected_task_id: task.as_deref(),
            };
            let file = export_ics(&req, ctx.now)?;
            let path = export_path(out.as_deref(), &file.filename);
            fs::write(&path, &file.content).with_context(|| format!("write {}", path.display()))?;

            match summary.task_title {
                Some(title) => println!(
                    "Exported {} block(s) for \"{title}\" to {}",
                    summary.block_count,
                    path.display()
                ),
                None => println!("Exported {} block(s) to {}", summary.block_count, path.display()),
            }
        }

        Command::Config { .. } | Command::Examples => unreachable!("handled before loading state"),
    }

    Ok(())
}

/// Parse, printing example phrasings when no title could be extracted.
fn parse_draft(parser: &IntakeParser, input: &str, now: NaiveDateTime) -> Result<TaskDraft> {
    parser.parse_at(input, now).map_err(|e| {
        if matches!(e, IntakeError::TitleExtractionFailed { .. }) {
            eprintln!("Examples:");
            for ex in parser.example_inputs() {
                eprintln!("  {ex}");
            }
        }
        anyhow!(e)
    })
}

fn warn_if_past_due(draft: &TaskDraft, now: NaiveDateTime) {
    if !draft.is_past_due(now) {
        return;
    }
    if let Some(due) = draft.due {
        eprintln!(
            "Note: due {} has already passed; blocks will use the fallback window.",
            fmt_dt(due)
        );
    }
}

fn suggest_for(ctx: &Ctx, board: &mut PlannerBoard, task: &Task, count: usize) -> Result<()> {
    let engine = ctx.config.engine()?;
    let blocks = engine.suggest(task, count, ctx.now, &mut StdRandom::from_entropy())?;
    board.set_suggestions(&task.id, blocks)?;

    let shown = board.suggested(&task.id);
    if shown.is_empty() {
        println!("No blocks available. Try adjusting the task deadline.");
        return Ok(());
    }
    println!("Suggested blocks:");
    for b in shown {
        print_block(board, b);
    }
    println!("\nCommit one with: cramguard commit <block>");
    Ok(())
}

/// Find a block by full id or by a unique prefix of its short id.
fn resolve_block(board: &PlannerBoard, input: &str, committed_only: bool) -> Result<String> {
    let mut pool: Vec<Block> = board.committed(None);
    if !committed_only {
        for t in board.tasks() {
            pool.extend(board.suggested(&t.id).iter().cloned());
        }
    }

    if pool.iter().any(|b| b.id == input) {
        return Ok(input.to_string());
    }
    let hits: BTreeSet<&str> = pool
        .iter()
        .filter(|b| short_id(b).starts_with(input))
        .map(|b| b.id.as_str())
        .collect();
    let mut iter = hits.iter();
    match (iter.next(), iter.next()) {
        (None, _) => bail!("no block matching '{input}'"),
        (Some(id), None) => Ok(id.to_string()),
        _ => bail!("'{input}' matches {} blocks; use more characters", hits.len()),
    }
}

fn export_path(out: Option<&Path>, filename: &str) -> PathBuf {
    match out {
        Some(p) if p.is_dir() => p.join(filename),
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(filename),
    }
}

fn new_task_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// The first 8 hex digits of the block's unique suffix.
fn short_id(block: &Block) -> String {
    let tail = block.id.rsplit('-').next().unwrap_or(&block.id);
    tail.chars().take(8).collect()
}

fn fmt_dt(dt: NaiveDateTime) -> String {
    dt.format("%a %Y-%m-%d %H:%M").to_string()
}

fn print_draft(draft: &TaskDraft) {
    println!("Title:    {}", draft.title);
    match (draft.due, draft.date_text.as_deref()) {
        (Some(due), Some(text)) => println!("Due:      {} (from \"{text}\")", fmt_dt(due)),
        (Some(due), None) => println!("Due:      {}", fmt_dt(due)),
        (None, _) => println!("Due:      not detected (pass --due when adding)"),
    }
    println!("Priority: {}", draft.priority);
    println!("Category: {}", draft.category);
    println!("Effort:   {}h", draft.effort);
}

fn print_task(board: &PlannerBoard, t: &Task, now: NaiveDateTime) {
    let mark = if t.is_completed() { "x" } else { " " };
    let left = t.hours_until_due(now);
    let when = if left >= 0 {
        format!("in {left}h")
    } else {
        format!("{}h overdue", -left)
    };
    println!(
        "[{mark}] {}  {}  due {} ({when})  {}/{}  ~{}h  {} committed",
        t.id,
        t.title,
        fmt_dt(t.due),
        t.priority,
        t.category,
        t.effort,
        board.committed(Some(t.id.as_str())).len()
    );
}

fn print_block(board: &PlannerBoard, b: &Block) {
    let mark = if board.is_committed(&b.id) { "*" } else { " " };
    println!(
        "{mark} [{}] {} {} {:>3} min  {}",
        short_id(b),
        b.date.format("%a %b %d"),
        b.start_time.format("%H:%M"),
        b.duration,
        b.reason
    );
}

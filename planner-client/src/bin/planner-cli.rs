use clap::{Parser, Subcommand};
use planner_client::{
    ClientConfig, EventType, MutationOutcome, Rejection, SyncMode, TodoEngine, TodoEvent,
};
use planner_core::{DateKey, SyncError, SyncResult, TaskId, TaskItem, TimeSlot, UserSession};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "planner-cli")]
#[command(about = "Manage a mentee's date-scoped to-do list", long_about = None)]
struct Cli {
    /// Mentee id whose lists are loaded
    #[arg(short, long)]
    user: String,

    /// Date to work on (YYYY-MM-DD); defaults to today
    #[arg(short, long)]
    date: Option<DateKey>,

    /// Overrides PLANNER_MODE
    #[arg(short, long)]
    mode: Option<SyncMode>,

    /// Overrides PLANNER_DATABASE_URL
    #[arg(long)]
    database: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the list for the selected date
    List,
    /// Add an item at the top of the list
    Add { title: String },
    /// Flip an item between done and not done
    Toggle {
        id: TaskId,
        /// Start of the time slot, e.g. 14:00
        #[arg(long, requires = "end")]
        start: Option<String>,
        /// End of the time slot, e.g. 15:00
        #[arg(long, requires = "start")]
        end: Option<String>,
    },
    /// Change an item's title
    Rename { id: TaskId, title: String },
    /// Delete an item
    Remove { id: TaskId },
    /// Delete every list stored on this device for the user
    Forget,
}

#[tokio::main]
async fn main() -> SyncResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("planner_client=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env()?;
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(database) = cli.database {
        config.database_url = database;
    }

    let engine = TodoEngine::from_config(&config).await?;
    engine
        .event_dispatcher()
        .register_callback(
            |event| {
                if let TodoEvent::StoredLocally { advisory, .. } = event {
                    eprintln!("warning: {advisory}");
                }
            },
            Some(EventType::StoredLocally),
        )
        .map_err(|e| SyncError::Configuration(e.to_string()))?;

    engine.sign_in(UserSession::mentee(cli.user)).await;
    if let Some(date) = cli.date {
        engine.select_date(date).await;
    }

    let outcome = match cli.command {
        Command::List => None,
        Command::Add { title } => Some(engine.add(&title).await),
        Command::Toggle { id, start, end } => {
            let time_slot = match (start, end) {
                (Some(start), Some(end)) => Some(TimeSlot::parse(&start, &end).ok_or_else(|| {
                    SyncError::InvalidInput(format!("invalid time slot {start}..{end}"))
                })?),
                _ => None,
            };
            Some(engine.toggle(id, time_slot).await)
        }
        Command::Rename { id, title } => Some(engine.rename(id, &title).await),
        Command::Remove { id } => Some(engine.remove(id).await),
        Command::Forget => {
            engine.forget_cached().await;
            None
        }
    };

    if let Some(MutationOutcome::Rejected(rejection)) = outcome {
        match rejection {
            Rejection::EmptyTitle => eprintln!("error: title must not be empty"),
            Rejection::UnknownTask(id) => eprintln!("error: no item {id} on this date"),
        }
    }

    print_list(engine.selected_date().await, &engine.todos().await);
    Ok(())
}

fn print_list(date: DateKey, items: &[TaskItem]) {
    println!("{date}");
    if items.is_empty() {
        println!("  (nothing planned)");
        return;
    }
    for item in items {
        let mark = if item.status().is_done() { "x" } else { " " };
        let slot = item
            .time_slot
            .map(|s| {
                format!(
                    " {}-{}",
                    s.start_time.format("%H:%M"),
                    s.end_time.format("%H:%M")
                )
            })
            .unwrap_or_default();
        println!("  [{mark}] {:>16}  {}{slot}", item.id, item.title);
    }
}

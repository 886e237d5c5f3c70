pub mod application;
pub mod domain;
pub mod infrastructure;

use application::bootstrap::bootstrap_workspace;
use application::commands::{board_overview_impl, AppState};
use application::end_of_day::{EndOfDayChoice, EndOfDayNotifier, EndOfDayPrompt};
use infrastructure::error::AppError;
use infrastructure::logging::init_logging;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::ctrl_c;
use tokio::sync::mpsc;
use tracing::{error, info};

const WORKSPACE_ENV: &str = "KANBAN_WORKSPACE";
const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

fn workspace_root() -> Result<PathBuf, AppError> {
    match std::env::var_os(WORKSPACE_ENV) {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => std::env::current_dir().map_err(AppError::from),
    }
}

fn print_header(state: &AppState) -> Result<(), AppError> {
    let overview = board_overview_impl(state)?;
    if overview.needs_onboarding {
        println!("Welcome! No user name is configured yet.");
    } else {
        println!("Hey {}", overview.user_name);
    }
    let mood = if overview.is_working_hours {
        "Time to work"
    } else {
        "Kick back and relax"
    };
    println!("{mood} (work hours: {})", overview.work_hours_label);
    for column in &overview.columns {
        println!("  {}: {}", column.column.title, column.tasks.len());
    }
    Ok(())
}

// EOF means nobody is left to answer; keeping the tasks records today's
// guard so the prompt does not repeat until the next work day.
fn parse_answer(read: usize, line: &str) -> EndOfDayChoice {
    if read == 0 {
        info!("stdin closed, keeping unfinished tasks");
        return EndOfDayChoice::KeepTasks;
    }
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => EndOfDayChoice::MarkAllDone,
        _ => EndOfDayChoice::KeepTasks,
    }
}

async fn ask(prompt: &EndOfDayPrompt) -> Option<EndOfDayChoice> {
    println!("{}", prompt.message());
    if let Some(clears_at) = prompt.clears_at {
        println!(
            "Completed tasks will be cleared by {}.",
            clears_at.format("%a %Y-%m-%d %H:%M")
        );
    }
    print!("Mark all unfinished tasks as completed? [y/N] ");
    let _ = std::io::stdout().flush();

    let answer = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|read| (read, line))
    })
    .await;

    match answer {
        Ok(Ok((read, line))) => Some(parse_answer(read, &line)),
        Ok(Err(err)) => {
            error!(error = %err, "failed to read answer");
            None
        }
        Err(err) => {
            error!(error = %err, "stdin reader panicked");
            None
        }
    }
}

async fn serve(state: Arc<AppState>) -> Result<(), AppError> {
    print_header(&state)?;

    let (prompt_tx, mut prompt_rx) = mpsc::channel(1);
    let notifier = EndOfDayNotifier::start(Arc::clone(&state), prompt_tx);

    loop {
        tokio::select! {
            _ = ctrl_c() => break,
            prompt = prompt_rx.recv() => {
                let Some(prompt) = prompt else { break };
                let choice = tokio::select! {
                    _ = ctrl_c() => break,
                    choice = ask(&prompt) => choice,
                };
                let result = match choice {
                    Some(choice) => notifier.respond(choice).map(|outcome| {
                        println!("Marked {} task(s) as completed.", outcome.completed);
                    }),
                    None => notifier.dismiss().map(|_| ()),
                };
                if let Err(err) = result {
                    eprintln!("{}", state.command_error("respond_end_of_day", &err));
                }
            }
        }
    }

    info!("shutting down");
    notifier.shutdown().await;
    Ok(())
}

pub fn run() {
    let workspace_root = workspace_root().expect("failed to resolve workspace directory");
    let bootstrap = bootstrap_workspace(&workspace_root).expect("failed to bootstrap workspace");
    init_logging(&bootstrap.logs_dir, &bootstrap.config.log_level)
        .expect("failed to open log file");
    info!(
        workspace = %bootstrap.workspace_root.display(),
        database = %bootstrap.database_path.display(),
        "starting {}",
        bootstrap.config.app_name
    );

    let state = Arc::new(AppState::from_bootstrap(&bootstrap));
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime");
    let result = runtime.block_on(serve(state));
    // A stdin read may still be blocked on a worker thread.
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    if let Err(err) = result {
        error!(error = %err, "board host failed");
        eprintln!("{err}");
        std::process::exit(1);
    }
}

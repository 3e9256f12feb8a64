use crate::activity::ActivityLog;
use crate::config::Config;
use crate::messages::Messages;
use crate::session::{AuthOutcome, SessionManager};
use crate::store::FileStore;
use crate::submissions::{Submission, SubmissionAggregator, UserStats};
use anyhow::Result;
use clap::{Parser, Subcommand};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Register a new user
    Register {
        name: String,
        email: String,
        password: String,
    },
    /// Log in and store the current session
    Login { email: String, password: String },
    /// Clear the current session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List registered users (passwords are not shown)
    Users,
    /// List form submissions, optionally filtered
    Submissions {
        #[arg(long, conflicts_with = "user_name")]
        user_id: Option<i64>,
        #[arg(long)]
        user_name: Option<String>,
    },
    /// Show a single submission by its session id
    Session { session_id: String },
    /// List submissions grouped by user name
    Grouped,
    /// Per-user totals
    Stats {
        #[arg(long, help = "Only this user name")]
        user: Option<String>,
        #[arg(long, help = "Print JSON instead of a table")]
        json: bool,
    },
    /// Interactive prompt accepting the commands above
    Shell,
}

/// A single line typed at the shell prompt
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_help_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Command,
}

pub struct Context {
    pub root: PathBuf,
    pub config: Config,
    pub messages: Messages,
    pub store: FileStore,
    pub activity: Option<ActivityLog>,
    pub debug: bool,
}

impl Context {
    // Activity is best effort: a log that cannot be written never fails the command
    fn record(&mut self, f: impl FnOnce(&mut ActivityLog) -> Result<()>) {
        if let Some(log) = self.activity.as_mut() {
            if let Err(e) = f(log) {
                eprintln!("Warning: failed to write activity log: {}", e);
            }
        }
    }

    fn sessions(&mut self) -> SessionManager<'_, FileStore> {
        SessionManager::new(&mut self.store).with_messages(self.messages.clone())
    }
}

/// Run one command. Returns false when a register or login attempt failed.
pub fn run_command(ctx: &mut Context, command: Command) -> Result<bool> {
    match command {
        Command::Register {
            name,
            email,
            password,
        } => {
            let outcome = ctx.sessions().register(&name, &email, &password)?;
            ctx.record(|log| log.register(&email, outcome.success, outcome.kind.as_str()));
            Ok(print_outcome(&outcome))
        }
        Command::Login { email, password } => {
            let outcome = ctx.sessions().login(&email, &password)?;
            ctx.record(|log| log.login(&email, outcome.success, outcome.kind.as_str()));
            Ok(print_outcome(&outcome))
        }
        Command::Logout => {
            let mut sessions = ctx.sessions();
            let previous = sessions.current_user();
            sessions.logout()?;
            let email = previous.as_ref().map(|u| u.email.as_str());
            ctx.record(|log| log.logout(email));
            match previous {
                Some(user) => println!("Logged out {}", user.email),
                None => println!("No active session"),
            }
            Ok(true)
        }
        Command::Whoami => {
            match ctx.sessions().current_user() {
                Some(user) => {
                    let role = if user.is_admin { "admin" } else { "user" };
                    println!("{} <{}> id={} ({})", user.name, user.email, user.id, role);
                }
                None => println!("Not logged in"),
            }
            Ok(true)
        }
        Command::Users => {
            let users = ctx.sessions().users();
            for user in &users {
                let admin = if user.is_admin { " [admin]" } else { "" };
                println!("  {}: {} <{}>{}", user.id, user.name, user.email, admin);
            }
            println!("{} user(s)", users.len());
            Ok(true)
        }
        Command::Submissions { user_id, user_name } => {
            let aggregator = SubmissionAggregator::new(&ctx.store);
            let submissions = match (user_id, &user_name) {
                (Some(id), _) => aggregator.by_user(id),
                (None, Some(name)) => aggregator.by_user_name(name),
                (None, None) => aggregator.all(),
            };
            ctx.record(|log| log.query("submissions", submissions.len()));
            for submission in &submissions {
                print_submission(submission);
            }
            println!("{} submission(s)", submissions.len());
            Ok(true)
        }
        Command::Session { session_id } => {
            let found = SubmissionAggregator::new(&ctx.store).by_id(&session_id);
            ctx.record(|log| log.query("session", usize::from(found.is_some())));
            match found {
                Some(submission) => println!("{}", serde_json::to_string_pretty(&submission)?),
                None => println!("Session not found: {}", session_id),
            }
            Ok(true)
        }
        Command::Grouped => {
            let grouped = SubmissionAggregator::new(&ctx.store).grouped_by_user_name();
            ctx.record(|log| log.query("grouped", grouped.len()));
            for (user_name, submissions) in &grouped {
                println!("{} ({}):", user_name, submissions.len());
                for submission in submissions {
                    print_submission(submission);
                }
            }
            Ok(true)
        }
        Command::Stats { user, json } => {
            let aggregator = SubmissionAggregator::new(&ctx.store);
            let stats: Vec<UserStats> = match &user {
                Some(name) => aggregator.user_stats(name).into_iter().collect(),
                None => aggregator.all_user_stats(),
            };
            ctx.record(|log| log.query("stats", stats.len()));
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_stats_table(&stats);
            }
            Ok(true)
        }
        Command::Shell => {
            run_shell(ctx)?;
            Ok(true)
        }
    }
}

fn print_outcome(outcome: &AuthOutcome) -> bool {
    if outcome.success {
        println!("{}", outcome.message);
    } else {
        eprintln!("{}", outcome.message);
    }
    outcome.success
}

fn print_submission(submission: &Submission) {
    let user_id = submission
        .user_id
        .as_ref()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "  {} user={} ({}) entries={} errors={} time={}",
        submission.session_id,
        submission.user_name,
        user_id,
        submission.entry_count(),
        submission.error_count(),
        submission.time_spent()
    );
}

fn print_stats_table(stats: &[UserStats]) {
    if stats.is_empty() {
        println!("No submissions");
        return;
    }

    let width = stats
        .iter()
        .map(|s| s.user_name.chars().count())
        .max()
        .unwrap_or(0)
        .max("user".len());

    println!(
        "{:<width$}  {:>8}  {:>8}  {:>6}  {:>10}",
        "user",
        "sessions",
        "entries",
        "errors",
        "time",
        width = width
    );
    for s in stats {
        println!(
            "{:<width$}  {:>8}  {:>8}  {:>6}  {:>10}",
            s.user_name,
            s.total_sessions,
            s.total_entries,
            s.total_errors,
            s.total_time,
            width = width
        );
    }
}

pub fn run_shell(ctx: &mut Context) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let history = ctx.root.join(crate::config::CONFIG_DIR).join("history");
    let _ = rl.load_history(&history);

    println!("formstats - type /help for commands, /exit to quit");

    loop {
        match rl.readline("formstats> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;

                let command = line.strip_prefix('/').unwrap_or(line);
                match command {
                    "exit" | "quit" => break,
                    "help" => {
                        print_shell_help();
                        continue;
                    }
                    _ => {}
                }

                if let Err(e) = run_shell_line(ctx, command) {
                    eprintln!("Error: {}", e);
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    if let Err(e) = rl.save_history(&history) {
        if ctx.debug {
            eprintln!("[DEBUG] Could not save history: {}", e);
        }
    }
    Ok(())
}

fn run_shell_line(ctx: &mut Context, line: &str) -> Result<()> {
    let words = shell_words::split(line)?;
    let parsed = match ShellLine::try_parse_from(words) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(());
        }
    };

    if matches!(parsed.command, Command::Shell) {
        println!("Already in the shell");
        return Ok(());
    }
    run_command(ctx, parsed.command)?;
    Ok(())
}

fn print_shell_help() {
    println!("Commands:");
    println!("  /exit                              - quit");
    println!("  /help                              - show commands");
    println!("Accounts:");
    println!("  /register <name> <email> <password>");
    println!("  /login <email> <password>");
    println!("  /logout");
    println!("  /whoami");
    println!("  /users");
    println!("Submissions:");
    println!("  /submissions [--user-id N | --user-name NAME]");
    println!("  /session <session-id>");
    println!("  /grouped");
    println!("  /stats [--user NAME] [--json]");
    println!("Quote arguments containing spaces: /register \"Ana Gil\" ana@x.com pw");
}

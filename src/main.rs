use anyhow::Result;
use clap::Parser;
use formstats::activity::ActivityLog;
use formstats::cli::{self, Command, Context};
use formstats::config::Config;
use formstats::messages::Messages;
use formstats::store::FileStore;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "formstats",
    about = "Local user sessions and form submission statistics"
)]
pub struct Args {
    #[arg(long, env = "FORMSTATS_STORE", help = "Store file (JSON)")]
    pub store: Option<PathBuf>,

    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Debug output (print resolved paths and settings)")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let root = std::env::current_dir()?;

    let cfg = if let Some(config_path) = &args.config {
        Config::load_from(config_path)?
    } else {
        Config::load(&root)?
    };

    if let Err(errors) = cfg.validate() {
        for error in &errors {
            eprintln!("Config error {}", error);
        }
        return Err(anyhow::anyhow!(
            "Invalid configuration ({} error(s))",
            errors.len()
        ));
    }

    let store_path = args
        .store
        .clone()
        .unwrap_or_else(|| cfg.store_path(&root));
    let activity_path = cfg.activity_path(&root);

    if args.debug {
        eprintln!("[DEBUG] Config sources: {:?}", cfg.sources);
        eprintln!("[DEBUG] Store: {}", store_path.display());
        eprintln!("[DEBUG] Activity log: {:?}", activity_path);
    }

    let run_id = uuid::Uuid::new_v4().to_string();
    let activity = match activity_path {
        Some(path) => match ActivityLog::new(&path, &run_id) {
            Ok(log) => Some(log),
            Err(e) => {
                eprintln!(
                    "Warning: activity log disabled, cannot open {}: {}",
                    path.display(),
                    e
                );
                None
            }
        },
        None => None,
    };

    let mut ctx = Context {
        messages: Messages::with_overrides(&cfg.messages),
        store: FileStore::open(&store_path),
        config: cfg,
        root,
        activity,
        debug: args.debug,
    };

    if !cli::run_command(&mut ctx, args.command)? {
        std::process::exit(1);
    }
    Ok(())
}

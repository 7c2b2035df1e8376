use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use contextflow::database::{self, SqliteStore};
use contextflow::models::{Role, Settings};
use contextflow::store::Stores;
use contextflow::utils::config;
use contextflow::ContextEngine;

/// Run one message through the context engine and print the JSON response.
#[derive(Debug, Parser)]
#[command(name = "contextflow", version)]
struct Args {
    /// SQLite database file.
    #[arg(long, env = "CONTEXTFLOW_DB_PATH")]
    db: Option<PathBuf>,

    /// JSON settings file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Session id to echo back; a new one is generated when absent.
    #[arg(long)]
    session: Option<String>,

    user_id: String,

    /// Message text. Everything after the user id is taken verbatim.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    message: Vec<String>,
}

impl Args {
    fn message(&self) -> String {
        self.message.join(" ")
    }
}

fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => config::load_settings(path)?,
        None => Settings::default(),
    };
    config::apply_env_defaults(&mut settings);
    if let Some(db) = &args.db {
        settings.general.db_path = db.display().to_string();
    }
    config::validate(&settings)?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    config::load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let message = args.message();
    let settings = load_settings(&args)?;

    let db_path = PathBuf::from(&settings.general.db_path);
    let conn = database::init_database(&db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    let store = Arc::new(SqliteStore::new(conn));
    let engine = ContextEngine::new(&settings, Stores::from_shared(store))?;

    let response = engine
        .handle(&args.user_id, &message, args.session.as_deref())
        .await;
    if let Err(e) = engine
        .record_message(&args.user_id, Role::User, &message, Some(&response.analysis))
        .await
    {
        log::warn!("[Main] could not record message: {}", e);
    }

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_before_user_id() {
        let args = Args::try_parse_from([
            "contextflow", "--db", "crm.db", "--session", "s-1", "u1", "Llamar", "a", "Ana",
        ])
        .unwrap();
        assert_eq!(args.db, Some(PathBuf::from("crm.db")));
        assert_eq!(args.session.as_deref(), Some("s-1"));
        assert_eq!(args.user_id, "u1");
        assert_eq!(args.message(), "Llamar a Ana");
    }

    #[test]
    fn test_flag_like_words_stay_in_message() {
        let args = Args::try_parse_from(["contextflow", "u1", "llamar", "-h", "--db", "mañana"]).unwrap();
        assert_eq!(args.user_id, "u1");
        assert_eq!(args.db, None);
        assert_eq!(args.message(), "llamar -h --db mañana");
    }

    #[test]
    fn test_message_is_required() {
        assert!(Args::try_parse_from(["contextflow", "u1"]).is_err());
    }
}

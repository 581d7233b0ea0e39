use election::audit::ElectionLogger;
use election::auth::SessionService;
use election::config::Config;
use election::console::Console;
use election::{Election, Result};
use std::sync::Arc;

fn main() -> Result<()> {
    let config = Config::from_env()?;
    election::init_with(&config.logging)?;

    let logger = Arc::new(match config.election.audit_max_entries {
        Some(max) => ElectionLogger::with_capacity(max),
        None => ElectionLogger::new(),
    });
    let election = Election::from_config(&config.election, logger.clone());
    let sessions = SessionService::from_config(&config.auth)?;

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    Console::new(&election, &sessions, stdin.lock(), stdout.lock()).run()?;

    tracing::info!("Session ended with {} audit entries", logger.len()?);
    Ok(())
}

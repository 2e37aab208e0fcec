use std::time::Duration;

use coindash_core::config::{AppConfig, LoadOptions};
use coindash_core::{ApplicationError, LeaderboardResponder};
use coindash_store::{connect, LeaderboardQuery};

use crate::commands::{runtime, CommandResult};

/// Prints exactly what the bot would send for `/leaderboard` right now.
/// Exits non-zero when the store could not answer. Needs no bot token.
pub fn run() -> CommandResult {
    let config = match AppConfig::load_unvalidated(LoadOptions::default())
        .and_then(|config| config.validate_store_access().map(|()| config))
    {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::from_error("leaderboard", &ApplicationError::from(error));
        }
    };

    let store = match connect(&config.store) {
        Ok(store) => store,
        Err(error) => {
            return CommandResult::from_error(
                "leaderboard",
                &ApplicationError::Store(error.to_string()),
            );
        }
    };

    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(message) => return CommandResult::failure("leaderboard", "runtime_init", message, 5),
    };

    let query = LeaderboardQuery::new(store, Duration::from_secs(config.store.timeout_secs));
    let outcome = runtime.block_on(query.top_scores());
    let exit_code = match &outcome {
        Ok(_) => 0,
        Err(failure) => ApplicationError::Store(failure.reason.clone()).exit_code(),
    };

    let reply = LeaderboardResponder::with_table(&config.game.link).respond(outcome);
    CommandResult { exit_code, output: reply.text }
}

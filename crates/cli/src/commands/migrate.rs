use estimo_core::config::LoadOptions;

use crate::commands::{build_runtime, load_config, open_store, CommandResult};

pub fn run(options: LoadOptions) -> CommandResult {
    let config = match load_config("migrate", options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let runtime = match build_runtime("migrate") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_store(&config).await?;
        pool.close().await;
        Ok::<(), (&'static str, String, u8)>(())
    });

    match result {
        Ok(()) => {
            tracing::info!(
                event_name = "cli.migrate.applied",
                database_url = %config.database.url,
                "applied pending migrations"
            );
            CommandResult::success("migrate", "applied pending migrations")
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}

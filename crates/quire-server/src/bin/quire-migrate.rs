//! Creates the blog schema in an empty database.
//!
//! Usage: `quire-migrate [--print] [config.toml]`
//!
//! With `--print`, writes the DDL script to stdout and touches no database.
//! Otherwise creates every table once; running it against a database that
//! already has the tables fails.

use quire_server::{config, init_tracing};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut print_only = false;
    let mut config_arg = None;
    for arg in std::env::args().skip(1) {
        if arg == "--print" {
            print_only = true;
        } else {
            config_arg = Some(arg);
        }
    }

    let catalog = match quire_db::blog_catalog() {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("invalid schema catalog: {e}");
            return ExitCode::FAILURE;
        }
    };

    if print_only {
        println!("{}", quire_db::render_script(&catalog));
        return ExitCode::SUCCESS;
    }

    let (resolved_config_path, config_source) = config::resolve_config_path(config_arg);
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));
    let config = match config::load_config(selected_config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.logging);
    tracing::info!(
        source = config_source,
        database = %config.database.path,
        "creating tables"
    );

    let pool = match quire_db::create_pool(&config.database.path, config.database.runtime_settings())
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "failed to open database");
            return ExitCode::FAILURE;
        }
    };
    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!(error = %e, "failed to get database connection");
            return ExitCode::FAILURE;
        }
    };

    match quire_db::create_all_tables(&conn, &catalog) {
        Ok(created) => {
            tracing::info!(count = created, "tables created");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, table = e.table().unwrap_or("<none>"), "migration failed");
            ExitCode::FAILURE
        }
    }
}

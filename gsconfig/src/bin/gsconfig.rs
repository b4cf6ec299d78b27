use std::env;
use std::io::stdout;
use std::process::exit;

use clap::Parser;
use gsconfig::GsconfigResult;
use gsconfig::args::Args;
use gsconfig::commands::run;
use gsconfig::config::resolve_settings;
use gsconfig::logging::{LOG_FORMAT_VAR, ensure_core_log_level_matches, init_tracing};
use gsconfig_core::Catalog;
use gsconfig_core::config::env::OsEnv;
use log::log_enabled;
use tracing::{debug, error};

fn start(args: Args) -> GsconfigResult<()> {
    let env = OsEnv::default();
    let settings = resolve_settings(args.connection, &env)?;
    debug!("Connecting with {settings:?}");
    let cat = Catalog::from_settings(&settings)?;
    run(&cat, args.command, args.json, &mut stdout().lock())
}

fn main() {
    let filter = ensure_core_log_level_matches(env::var("RUST_LOG").ok(), "gsconfig=");
    init_tracing(&filter, env::var(LOG_FORMAT_VAR).ok());

    let args = Args::parse();
    if let Err(e) = start(args) {
        // Ensure the message is printed, even if the logging is disabled
        if log_enabled!(log::Level::Error) {
            error!("{e}");
        } else {
            eprintln!("{e}");
        }
        exit(1);
    }
}

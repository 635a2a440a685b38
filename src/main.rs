use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use clipbook::cli::{
    build_config, copy_table, export_document, list_files, open_controller, show_status, Cli,
    Commands, ConfigOverrides,
};
use clipbook::context::ReviewContext;
use clipbook::shell::run_shell;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Files => {
            let ctx = ReviewContext::current()?;
            list_files(&ctx)
        }
        Commands::Review {
            file,
            dest,
            interval,
            handle,
            export,
        } => {
            let ctx = ReviewContext::current()?;
            let config = build_config(ConfigOverrides {
                interval,
                handle,
                export,
            })?;
            let controller = open_controller(&ctx, &file, dest.as_deref(), &config)?;
            run_shell(controller)
        }
        Commands::Status { file } => {
            let ctx = ReviewContext::current()?;
            show_status(&ctx, &file)
        }
        Commands::Export { file, out, handle } => {
            let ctx = ReviewContext::current()?;
            let config = build_config(ConfigOverrides {
                handle,
                ..Default::default()
            })?;
            export_document(&ctx, &file, out.as_deref(), &config)
        }
        Commands::Copy { file, dest } => {
            let ctx = ReviewContext::current()?;
            copy_table(&ctx, &file, dest.as_deref())
        }
    }
}

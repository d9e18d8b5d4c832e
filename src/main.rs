//! deskdb - run SQL against desktop database files.

mod cli;
mod output;
mod shell;

use anyhow::{Context, Result};
use cli::{Cli, Command};
use deskdb::config::Config;
use deskdb::driver::Driver;
use deskdb::logging;
use output::Renderer;
use shell::{ShellCommand, ShellInput, HELP};
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse_args();

    match &cli.log_file {
        Some(path) => logging::init_file_logging(path, "info"),
        None => logging::init_stderr_logging("warn"),
    }

    if let Err(e) = run(cli) {
        match e.downcast_ref::<deskdb::DeskError>() {
            Some(desk) => error!("{}: {}", desk.category(), desk),
            None => error!("{:#}", e),
        }
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let renderer = Renderer::new(cli.output_format(&config), config.output.max_column_width);
    let driver = Driver::for_kind(config.engine, config.sqlite_options(), config.driver_options());

    match &cli.command {
        Command::Run { path, sql } => {
            let outcome = driver
                .run_one_shot(path, sql)
                .with_context(|| format!("Failed to run statement against {}", path.display()))?;
            println!("{}", renderer.outcome(&outcome)?);
        }
        Command::Shell { path } => run_shell(&driver, path, &renderer)?,
        Command::Refresh { path } => {
            let mut session = driver
                .open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            let summary = session.refresh_links()?;
            session.close();
            println!("{}", renderer.refresh_summary(&summary)?);
        }
    }

    Ok(())
}

fn run_shell(driver: &Driver, path: &Path, renderer: &Renderer) -> Result<()> {
    let mut session = driver
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut input = ShellInput::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    eprintln!("Connected to {}. Type .help for help.", path.display());
    prompt(&mut stdout, false)?;

    let mut lines = stdin.lock().lines();
    loop {
        let command = match lines.next() {
            Some(line) => input.push_line(&line.context("Failed to read stdin")?),
            None => match input.finish() {
                Some(command) => Some(command),
                None => break,
            },
        };

        match command {
            Some(ShellCommand::Quit) => break,
            Some(ShellCommand::Help) => println!("{HELP}"),
            Some(ShellCommand::Refresh) => {
                let summary = session.refresh_links()?;
                println!("{}", renderer.refresh_summary(&summary)?);
            }
            Some(ShellCommand::Statement(sql)) => match session.run(&sql) {
                Ok(outcome) => println!("{}", renderer.outcome(&outcome)?),
                Err(e) => eprintln!("{}: {}", e.category(), e),
            },
            Some(ShellCommand::Unknown(cmd)) => eprintln!("Unknown command {cmd}. Try .help"),
            None => {}
        }
        prompt(&mut stdout, input.is_pending())?;
    }

    session.close();
    Ok(())
}

fn prompt(stdout: &mut io::Stdout, continuation: bool) -> Result<()> {
    print!("{}", if continuation { "   ...> " } else { "deskdb> " });
    stdout.flush().context("Failed to flush stdout")
}

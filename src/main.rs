use std::io::{self, IsTerminal};
use std::process::ExitCode;

use clap::Parser;
use parallax::cli::{handle_config_action, Args, Command};
use parallax::config::Config;
use parallax::fanout::{fan_out, FanOutSettings};
use parallax::runner::CommandSpec;
use parallax::status::Activity;
use parallax::terminal::restore_input_mode;

/// Exit code used when interrupted by Ctrl+C
const INTERRUPTED: i32 = 130;

/// Set up the Ctrl+C handler.
///
/// Terminal input mode is restored before exiting so the shell gets its
/// echo back.
fn setup_ctrlc_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        restore_input_mode();
        eprintln!("\nReceived Ctrl+C, shutting down...");
        std::process::exit(INTERRUPTED);
    })
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(Command::Config { action }) = args.command {
        let code = handle_config_action(action, args.config.as_deref());
        return ExitCode::from(code as u8);
    }

    if args.dirs.is_empty() || args.run.is_empty() {
        eprintln!("Usage: parallax [OPTIONS] <DIRS>... -- <COMMAND>...");
        return ExitCode::from(2);
    }

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    if let Err(e) = setup_ctrlc_handler() {
        eprintln!("Warning: Could not set up Ctrl+C handler: {}", e);
    }

    let mut run = args.run.into_iter();
    let program = run.next().unwrap_or_default();
    let spec = CommandSpec::new(program, run.collect()).with_unchanged_marker(args.unchanged_if);

    let interactive = io::stdout().is_terminal();
    let activity = Activity::new(args.title, args.progressive);
    let settings = FanOutSettings {
        parallel: args.parallel.unwrap_or(config.scheduler.parallel),
        activity: activity.clone(),
        label: args.label.or(config.display.label.clone()),
        disable_input: interactive && config.display.disable_input && !args.no_input_lock,
        tick: config.display.tick(),
        show_output: args.show_output,
        display: interactive,
        width: None,
    };

    let results = match fan_out(args.dirs, spec, settings, io::stdout()) {
        Ok(results) => results,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    // Without a live display, report each outcome once at the end
    if !interactive {
        for result in &results {
            println!(
                "{}",
                parallax::ansi::strip(&activity.outcome_line(&result.name, &result.outcome))
            );
        }
    }

    if results.iter().any(|r| r.outcome.is_fail()) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

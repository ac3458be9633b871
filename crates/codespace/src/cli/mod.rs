/// Clap argument definitions
mod args;

/// REST client and CLI errors
mod api;

/// Status → verify → fetch, before joining a room
mod bootstrap;

/// Line commands inside a joined space
mod repl;

/// WebSocket session loop
mod session;

use clap::Parser;
use std::io::{self, Write};

use codespace_core::SpaceData;

use api::{CliError, HttpApi, SpaceApi};
pub use args::Cli;
use args::Commands;

/// Main entry point for the CLI
pub fn run_cli() {
    env_logger::init();
    let cli = Cli::parse();

    let api = match HttpApi::new(&cli.server) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    };

    // Execute commands and track success
    let success = match cli.command {
        Commands::Open { name } => handle_open(&api, &name),
        Commands::Status { name } => handle_status(&api, &name),
        Commands::Join { name, passcode } => handle_join(&api, &name, passcode),
        Commands::Privacy {
            name,
            public,
            passcode,
            current_passcode,
        } => handle_privacy(&api, &name, public, passcode.as_deref(), current_passcode),
        Commands::Delete { name, file } => handle_delete(&api, &name, &file),
    };

    if !success {
        std::process::exit(1);
    }
}

fn report(e: CliError) -> bool {
    eprintln!("✗ {}", e);
    false
}

fn print_files(space: &SpaceData) {
    for file in &space.files {
        println!("  {} ({}, {} bytes)", file.name, file.language, file.content.len());
    }
}

/// Handle the open command
/// Returns true on success, false on error
fn handle_open(api: &impl SpaceApi, name: &str) -> bool {
    match api.get_or_create(name) {
        Ok((space, created)) => {
            if created {
                println!("✓ Created codespace '{}'", space.name);
            } else {
                println!("✓ Opened codespace '{}'", space.name);
            }
            if space.is_public {
                print_files(&space);
            } else {
                println!("  Private; use 'codespace join {} --passcode ...' to read it", name);
            }
            true
        }
        Err(e) => report(e),
    }
}

fn handle_status(api: &impl SpaceApi, name: &str) -> bool {
    match api.status(name) {
        Ok(status) => {
            println!(
                "{}: {}",
                name,
                if status.is_public { "public" } else { "private" }
            );
            true
        }
        Err(e) => report(e),
    }
}

fn handle_join(api: &HttpApi, name: &str, passcode: Option<String>) -> bool {
    let bootstrapped = match bootstrap::bootstrap(api, name, passcode, prompt_passcode) {
        Ok(b) => b,
        Err(e) => return report(e),
    };
    let ws_url = match api.ws_url() {
        Ok(url) => url,
        Err(e) => return report(e),
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => return report(e.into()),
    };
    match runtime.block_on(session::run_session(
        ws_url,
        bootstrapped.replica,
        bootstrapped.passcode,
    )) {
        Ok(()) => true,
        Err(e) => report(e),
    }
}

fn handle_privacy(
    api: &impl SpaceApi,
    name: &str,
    public: bool,
    passcode: Option<&str>,
    current: Option<String>,
) -> bool {
    let current = match current {
        Some(current) => Some(current),
        None => match api.status(name) {
            Ok(status) if !status.is_public => prompt_passcode(1),
            Ok(_) => None,
            Err(e) => return report(e),
        },
    };

    match api.set_privacy(name, public, passcode, current.as_deref()) {
        Ok(state) => {
            if state.is_public {
                println!("✓ '{}' is now public", name);
            } else {
                println!("✓ '{}' is now private", name);
            }
            true
        }
        Err(e) => report(e),
    }
}

fn handle_delete(api: &impl SpaceApi, name: &str, file: &str) -> bool {
    match api.delete_file(name, file) {
        Ok(resp) => {
            println!("✓ {}", resp.msg);
            print_files(&resp.codespace);
            true
        }
        Err(e) => report(e),
    }
}

/// Ask for a passcode on stdin; `None` when input ends or is empty
fn prompt_passcode(attempt: usize) -> Option<String> {
    if attempt > 1 {
        eprintln!("Incorrect passcode, try again.");
    }
    print!("Passcode: ");
    io::stdout().flush().ok()?;

    let mut input = String::new();
    match io::stdin().read_line(&mut input) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(input.trim().to_string()).filter(|s| !s.is_empty()),
    }
}

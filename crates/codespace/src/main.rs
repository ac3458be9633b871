//! `codespace`: open, inspect and join shared editing spaces from a terminal.

/// CLI module - command-line interface for codespace
mod cli;

fn main() {
    cli::run_cli();
}

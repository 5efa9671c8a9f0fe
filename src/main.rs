use clap::{Parser, Subcommand};

use commands::GlobalArgs;

mod commands;
mod output;
mod tty;

use commands::{config, regen, scan};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "guidregen")]
#[command(version = VERSION)]
#[command(about = "Regenerate Unity asset GUIDs and rewrite every reference to them")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview which GUIDs would be regenerated (writes nothing)
    Scan(scan::ScanArgs),
    /// Regenerate GUIDs and rewrite references in place
    Regen(regen::RegenArgs),
    /// Manage global guidregen configuration
    Config(config::ConfigArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let global = GlobalArgs {};

    let (json_result, exit_code) = commands::run_json(cli.command, &global);

    if output::print_json_result(json_result).is_err() {
        return std::process::ExitCode::from(1);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}

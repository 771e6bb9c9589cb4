//! entrypoint for tessera-cli

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;

pub mod cmd;
use self::cmd::{jwks, keygen, sign, verify};

pub mod trace;

#[derive(Debug, Parser)]
#[command(name = "tessera")]
#[command(bin_name = "tessera")]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(long, short = 'v', global = true)]
    /// Log debug information to stderr (RUST_LOG takes precedence)
    verbose: bool,

    #[command(subcommand)]
    cmds: CliCommands,
}

#[derive(Debug, Subcommand)]
enum CliCommands {
    Keygen(keygen::CliCommandKeygen),
    Jwks(jwks::CliCommandJwks),
    Sign(sign::CliCommandSign),
    Verify(verify::CliCommandVerify),
}

fn main() {
    let cli = Cli::parse();

    let default_directive = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };

    #[expect(clippy::exit)]
    if let Err(err) = trace::init_tracing(default_directive).and_then(|()| match cli.cmds {
        CliCommands::Keygen(cfg) => keygen::run(cfg),
        CliCommands::Jwks(cfg) => jwks::run(cfg),
        CliCommands::Sign(cfg) => sign::run(cfg),
        CliCommands::Verify(cfg) => verify::run(cfg),
    }) {
        eprintln!("🚩 exit with error: {err}");
        std::process::exit(1);
    }
}

use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

mod config;
mod op;
mod ops;

use config::GlobalArgs;
use op::{Op, OpContext};

#[derive(Parser, Debug)]
#[command(name = "blobs", version, about = "Read and write Netlify Blobs stores")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: ops::Command,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.global.client_config()?;
    let client = blobs::Client::new(config)?;
    let ctx = OpContext { client };

    match cli.command.execute(&ctx).await {
        Ok(output) => {
            println!("{output}");
            Ok(())
        }
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_context_env_matches_library() {
        let command = Cli::command();
        let context = command
            .get_arguments()
            .find(|arg| arg.get_id() == "context")
            .unwrap();
        assert_eq!(
            context.get_env(),
            Some(std::ffi::OsStr::new(blobs::context::BLOBS_CONTEXT_ENV))
        );
    }

    #[test]
    fn test_store_target_is_required() {
        let parsed = Cli::try_parse_from(["blobs", "get", "nails"]);
        assert!(parsed.is_err());

        let parsed = Cli::try_parse_from(["blobs", "get", "--store", "construction", "nails"]);
        assert!(parsed.is_ok());
    }

    #[test]
    fn test_store_and_deploy_conflict() {
        let parsed = Cli::try_parse_from([
            "blobs",
            "delete",
            "--store",
            "construction",
            "--deploy",
            "abc",
            "nails",
        ]);
        assert!(parsed.is_err());
    }
}

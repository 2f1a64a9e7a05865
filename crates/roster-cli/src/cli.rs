use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "roster",
    about = "Roster: append form submissions to a shared ledger in a GitHub repository",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML config file; environment variables override it
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP service
    Serve(ServeArgs),
    /// Append one submission to the ledger
    Append(AppendArgs),
    /// Print the current ledger
    Show(ShowArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Listen address, overriding config and PORT
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args)]
pub struct AppendArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub phone: String,
    #[arg(long)]
    pub linkedin: Option<String>,
}

#[derive(Args)]
pub struct ShowArgs {
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_append() {
        let cli = Cli::try_parse_from([
            "roster", "append", "--name", "Ada", "--phone", "555-0100", "--config", "roster.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("roster.toml")));
        match cli.command {
            Command::Append(args) => {
                assert_eq!(args.name, "Ada");
                assert_eq!(args.phone, "555-0100");
                assert!(args.linkedin.is_none());
            }
            _ => panic!("expected append"),
        }
    }

    #[test]
    fn parses_serve_bind() {
        let cli = Cli::try_parse_from(["roster", "serve", "--bind", "127.0.0.1:3000"]).unwrap();
        match cli.command {
            Command::Serve(args) => assert_eq!(args.bind, Some("127.0.0.1:3000".parse().unwrap())),
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn show_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["roster", "show", "--format", "yaml"]).is_err());
    }
}

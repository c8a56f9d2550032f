use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pulumi-resource-docker-buildkit")]
#[command(author = "Alberto Cavalcante")]
#[command(version = crate::provider::VERSION)]
#[command(about = "Builds Docker images with Buildkit and pushes them to a registry", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ~/.config/docker-buildkit/config.toml)
    #[arg(long, global = true, env = "DOCKER_BUILDKIT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub serve: ServeArgs,

    /// Defaults to `serve`
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve provider requests over stdin/stdout
    Serve,

    /// Print the digest of a build context
    Digest(DigestArgs),

    /// Print the package schema
    Schema {
        /// Package version to embed
        #[arg(value_name = "VERSION", default_value = crate::provider::VERSION)]
        package_version: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Overrides for the provider config file
#[derive(Args)]
pub struct ServeArgs {
    /// Docker executable
    #[arg(long, global = true, env = "DOCKER_BUILDKIT_DOCKER")]
    pub docker: Option<String>,

    /// buildx builder instance
    #[arg(long, global = true, env = "DOCKER_BUILDKIT_BUILDER")]
    pub builder: Option<String>,

    /// Number of requests to serve in parallel
    #[arg(short, long, global = true)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct DigestArgs {
    /// Build context root
    #[arg(short, long, default_value = ".")]
    pub context: PathBuf,

    /// Build file, relative to the context
    #[arg(short = 'f', long, default_value = "Dockerfile")]
    pub dockerfile: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["pulumi-resource-docker-buildkit"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_digest_args() {
        let cli = Cli::try_parse_from([
            "pulumi-resource-docker-buildkit",
            "-vv",
            "digest",
            "--context",
            "app",
            "-f",
            "build/Dockerfile",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Command::Digest(args)) => {
                assert_eq!(args.context, PathBuf::from("app"));
                assert_eq!(args.dockerfile, PathBuf::from("build/Dockerfile"));
            }
            _ => panic!("expected digest"),
        }
    }

    #[test]
    fn test_serve_jobs() {
        let cli =
            Cli::try_parse_from(["pulumi-resource-docker-buildkit", "serve", "-j", "8"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Serve)));
        assert_eq!(cli.serve.jobs, Some(8));

        let cli = Cli::try_parse_from(["pulumi-resource-docker-buildkit", "--jobs", "2"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.serve.jobs, Some(2));
    }

    #[test]
    fn test_schema_version() {
        let cli = Cli::try_parse_from(["pulumi-resource-docker-buildkit", "schema"]).unwrap();
        match cli.command {
            Some(Command::Schema { package_version }) => {
                assert_eq!(package_version, crate::provider::VERSION);
            }
            _ => panic!("expected schema"),
        }

        let cli =
            Cli::try_parse_from(["pulumi-resource-docker-buildkit", "schema", "1.2.3"]).unwrap();
        match cli.command {
            Some(Command::Schema { package_version }) => assert_eq!(package_version, "1.2.3"),
            _ => panic!("expected schema"),
        }
    }
}

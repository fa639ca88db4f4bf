use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "morpheus-deploy")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Deploy declarative YAML configuration to a Morpheus Data appliance", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v info, -vv debug with HTTP calls, -vvv bodies)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress notices
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Appliance host name
    #[arg(long, env = "MORPHEUS_HOST", global = true, hide_env_values = true)]
    pub host: Option<String>,

    /// API bearer token
    #[arg(long, env = "MORPHEUS_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Settings file (default: ~/.config/morpheus-deploy/config.toml)
    #[arg(long, env = "MORPHEUS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create or update everything declared in the given files or directories
    Deploy(SourcesArgs),

    /// Delete everything declared in the given files or directories
    Undeploy(SourcesArgs),

    /// Print the operations a deploy would run, without contacting the API
    Plan(PlanArgs),

    /// Call the API and print the response
    Get(GetArgs),

    /// Print an object as a deployable YAML document
    Export(ExportArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct SourcesArgs {
    /// YAML files or directories of YAML files
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(Args)]
pub struct PlanArgs {
    /// YAML files or directories of YAML files
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Show the undeploy order instead
    #[arg(long)]
    pub undeploy: bool,
}

#[derive(Args)]
pub struct GetArgs {
    /// API path or alias, e.g. optionTypes/3 or tasks?max=5
    pub path: String,

    /// JMESPath query applied to the response, e.g. 'optionTypes[].name'
    #[arg(short, long)]
    pub query: Option<String>,

    /// Print YAML instead of JSON
    #[arg(short, long)]
    pub yaml: bool,
}

#[derive(Args)]
pub struct ExportArgs {
    /// API path or alias of the collection, e.g. optionTypes
    pub path: String,

    /// Object name
    #[arg(short, long)]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "morpheus-deploy",
            "deploy",
            "a.yaml",
            "dir",
            "-vv",
            "--insecure",
            "--host",
            "h",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.insecure);
        assert_eq!(cli.host.as_deref(), Some("h"));
        match cli.command {
            Command::Deploy(args) => assert_eq!(args.paths.len(), 2),
            _ => panic!("expected deploy"),
        }
    }

    #[test]
    fn test_get_query_short_flag() {
        let cli = Cli::try_parse_from(["morpheus-deploy", "get", "optionTypes", "-q", "optionTypes[].name", "--quiet"])
            .unwrap();
        assert!(cli.quiet);
        match cli.command {
            Command::Get(args) => assert_eq!(args.query.as_deref(), Some("optionTypes[].name")),
            _ => panic!("expected get"),
        }
    }

    #[test]
    fn test_deploy_requires_paths() {
        assert!(Cli::try_parse_from(["morpheus-deploy", "deploy"]).is_err());
    }
}

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

use crate::domain::content::NodeId;

/// Command-line arguments for the published-cache binary.
#[derive(Debug, Parser)]
#[command(
    name = "published-cache",
    version,
    about = "Resolve routes, urls and url aliases against a published content tree"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "PUBLISHED_CACHE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Resolve a route such as `/about/team` or `1234/news` to a node id.
    Route(RouteArgs),
    /// Build the route of a node.
    Url(UrlArgs),
    /// Find the node listing a url alias.
    Alias(AliasArgs),
}

impl Command {
    pub fn lookup(&self) -> &LookupArgs {
        match self {
            Command::Route(args) => &args.lookup,
            Command::Url(args) => &args.lookup,
            Command::Alias(args) => &args.lookup,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct RouteArgs {
    #[command(flatten)]
    pub lookup: LookupArgs,

    /// Route to resolve.
    #[arg(value_name = "ROUTE")]
    pub route: String,
}

#[derive(Debug, Args, Clone)]
pub struct UrlArgs {
    #[command(flatten)]
    pub lookup: LookupArgs,

    /// Node id whose route is built.
    #[arg(value_name = "ID", allow_negative_numbers = true)]
    pub id: NodeId,
}

#[derive(Debug, Args, Clone)]
pub struct AliasArgs {
    #[command(flatten)]
    pub lookup: LookupArgs,

    /// Restrict the search to descendants of this node.
    #[arg(long = "root-id", value_name = "ID")]
    pub root_id: Option<NodeId>,

    /// Alias to look up.
    #[arg(value_name = "ALIAS")]
    pub alias: String,
}

/// Options shared by every lookup command.
#[derive(Debug, Args, Clone)]
pub struct LookupArgs {
    /// JSON content tree fixture.
    #[arg(
        long = "tree",
        env = "PUBLISHED_CACHE_TREE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub tree: PathBuf,

    /// Read draft content instead of published content.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub preview: bool,

    /// Culture used for segments and culture-variant values.
    #[arg(long, value_name = "CULTURE")]
    pub culture: Option<String>,

    #[command(flatten)]
    pub overrides: LookupOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LookupOverrides {
    /// Override whether the top-level node segment is hidden from routes.
    #[arg(
        long = "hide-top-level-node",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub hide_top_level_node: Option<bool>,

    /// Override the property holding url aliases.
    #[arg(long = "url-alias-property", value_name = "ALIAS")]
    pub url_alias_property: Option<String>,

    /// Override alias matching (substring|delimited).
    #[arg(long = "alias-matching", value_name = "MODE")]
    pub alias_matching: Option<String>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

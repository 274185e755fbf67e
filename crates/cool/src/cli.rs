//! Clap CLI definitions for the `cool` command.

use clap::{Args, Parser, Subcommand};
use cool_core::PromotionLevel;

/// cool -- Inspect and change a UCM object graph.
#[derive(Parser, Debug)]
#[command(
    name = "cool",
    about = "Inspect and change UCM streams, baselines and tags",
    long_about = "Navigates the stream hierarchy of a UCM project VOB, lists and filters baselines, and reads and writes key/value tags through cleartool.",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global flags available to all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Output in JSON format.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose/debug output.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output (errors only).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Project VOB for names given without @scope (overrides config).
    #[arg(long, global = true)]
    pub pvob: Option<String>,

    /// Path to the cleartool binary (overrides config).
    #[arg(long, global = true)]
    pub cleartool: Option<String>,

    /// Kill any cleartool call running longer than this many seconds.
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
}

/// All available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the attributes of an entity (kind:name[@pvob]).
    Show(ShowArgs),

    /// List the child streams of a stream.
    Children(ChildrenArgs),

    /// List integration streams of other projects that deliver to a stream.
    Siblings(StreamArgs),

    /// Find the stream with a delivery into a stream in progress.
    Delivering(DeliveringArgs),

    /// List baselines of a component in a stream, newest first.
    Baselines(BaselinesArgs),

    /// List the recommended baselines of a stream.
    Recommended(StreamArgs),

    /// Promote a baseline one level (or reject it).
    Promote(PromoteArgs),

    /// Set key/value entries of a tag on an entity.
    SetTag(SetTagArgs),

    /// Show a tag on an entity.
    GetTag(GetTagArgs),

    /// Generate shell completion scripts.
    Completion(CompletionArgs),

    /// Print version information.
    Version,
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

/// Arguments for `cool show`.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Entity reference, e.g. `stream:dev` or `baseline:bl_1@/vobs/PVOB`.
    pub entity: String,
}

/// A single stream argument.
#[derive(Args, Debug)]
pub struct StreamArgs {
    /// Stream name or reference.
    pub stream: String,
}

/// Arguments for `cool children`.
#[derive(Args, Debug)]
pub struct ChildrenArgs {
    /// Stream name or reference.
    pub stream: String,

    /// Keep children with a delivery posted from another replica.
    #[arg(long)]
    pub polling: bool,

    /// Also list excluded children with the reason.
    #[arg(long)]
    pub all: bool,
}

/// Arguments for `cool delivering`.
#[derive(Args, Debug)]
pub struct DeliveringArgs {
    /// Stream name or reference.
    pub stream: String,

    /// Keep children with a delivery posted from another replica.
    #[arg(long)]
    pub polling: bool,
}

// ---------------------------------------------------------------------------
// Baselines
// ---------------------------------------------------------------------------

/// Arguments for `cool baselines`.
#[derive(Args, Debug)]
pub struct BaselinesArgs {
    /// Stream name or reference.
    pub stream: String,

    /// Component name or reference.
    pub component: String,

    /// Only baselines at this promotion level.
    #[arg(long)]
    pub level: Option<PromotionLevel>,

    /// Only baselines newer than the stream's recommended baseline.
    #[arg(long)]
    pub newer_than_recommended: bool,

    /// Only baselines created on or after this date (YYYY-MM-DD).
    #[arg(long)]
    pub since: Option<String>,

    /// Only baselines whose tag matches "key1=value1&key2=value2".
    #[arg(long, requires_all = ["tag_type", "tag_id"])]
    pub tag: Option<String>,

    /// Tag type used with --tag.
    #[arg(long)]
    pub tag_type: Option<String>,

    /// Tag id used with --tag.
    #[arg(long)]
    pub tag_id: Option<String>,
}

/// Arguments for `cool promote`.
#[derive(Args, Debug)]
pub struct PromoteArgs {
    /// Baseline name or reference.
    pub baseline: String,

    /// Mark the baseline REJECTED instead.
    #[arg(long)]
    pub reject: bool,
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// Arguments for `cool set-tag`.
#[derive(Args, Debug)]
pub struct SetTagArgs {
    /// Entity reference, e.g. `baseline:bl_1`.
    pub entity: String,

    /// The tag type.
    #[arg(short = 'y', long)]
    pub tag_type: String,

    /// The tag id.
    #[arg(short = 'i', long)]
    pub tag_id: String,

    /// Entries as "key1=value1&key2=value2".
    #[arg(short = 't', long)]
    pub tags: String,
}

/// Arguments for `cool get-tag`.
#[derive(Args, Debug)]
pub struct GetTagArgs {
    /// Entity reference, e.g. `baseline:bl_1`.
    pub entity: String,

    /// The tag type.
    #[arg(short = 'y', long)]
    pub tag_type: String,

    /// The tag id.
    #[arg(short = 'i', long)]
    pub tag_id: String,
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

/// Arguments for `cool completion`.
#[derive(Args, Debug)]
pub struct CompletionArgs {
    #[command(subcommand)]
    pub command: CompletionCommands,
}

/// Completion subcommands.
#[derive(Subcommand, Debug)]
pub enum CompletionCommands {
    /// Generate Bash completions.
    Bash,
    /// Generate Zsh completions.
    Zsh,
    /// Generate Fish completions.
    Fish,
    /// Generate PowerShell completions.
    Powershell,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_version() {
        let cli = Cli::try_parse_from(["cool", "version"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn cli_global_flags() {
        let cli = Cli::try_parse_from([
            "cool", "--json", "--verbose", "--pvob", "/vobs/pvob", "--timeout", "30", "children", "int",
        ])
        .unwrap();
        assert!(cli.global.json);
        assert!(cli.global.verbose);
        assert_eq!(cli.global.pvob.as_deref(), Some("/vobs/pvob"));
        assert_eq!(cli.global.timeout, Some(30));
    }

    #[test]
    fn cli_rejects_zero_timeout() {
        assert!(Cli::try_parse_from(["cool", "--timeout", "0", "version"]).is_err());
    }

    #[test]
    fn cli_parses_baselines_level() {
        let cli = Cli::try_parse_from(["cool", "baselines", "int", "app", "--level", "TESTED"]).unwrap();
        match cli.command {
            Some(Commands::Baselines(args)) => {
                assert_eq!(args.level, Some(PromotionLevel::Tested));
                assert!(!args.newer_than_recommended);
            }
            _ => panic!("Expected Baselines command"),
        }
    }

    #[test]
    fn cli_tag_filter_needs_type_and_id() {
        assert!(Cli::try_parse_from(["cool", "baselines", "int", "app", "--tag", "a=1"]).is_err());
        assert!(
            Cli::try_parse_from([
                "cool", "baselines", "int", "app", "--tag", "a=1", "--tag-type", "ci", "--tag-id", "main",
            ])
            .is_ok()
        );
    }

    #[test]
    fn cli_parses_set_tag() {
        let cli = Cli::try_parse_from([
            "cool", "set-tag", "baseline:bl_1", "-y", "hudson", "-i", "job-1", "-t", "a=1&b=2",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::SetTag(args)) => {
                assert_eq!(args.tag_type, "hudson");
                assert_eq!(args.tags, "a=1&b=2");
            }
            _ => panic!("Expected SetTag command"),
        }
    }
}

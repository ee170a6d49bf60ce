//! CLI argument definitions using clap derive macros.

use clap::Parser;

use optical_core::FieldMode;

const EXAMPLES: &str = "\
Examples:
  Retrieve all nodes with a role starting with \"example-\":
    optical role=/^example-/

  Retrieve all the nodes registered to a test optica instance:
    optical -h https://optica-test.example.com

  Retrieve all data about my nodes:
    optical --all launched_by=`whoami`

  SSH into the first matched node:
    ssh $(optical --just hostname role=example branch=jake-test | head -n 1)";

/// Fetch host information from Optica, and cache it for 15 minutes.
///
/// Output the fetched information as a JSON stream, suitable for processing
/// with `jq`.
///
/// FIELD: any optica field; see your optica host for available fields.
/// FILTER: a bare string like "optica", a regex like "/^(o|O)ptica?/", or a
/// list like "[web,db]".
#[derive(Parser, Debug)]
#[command(name = "optical")]
#[command(author, version, about)]
#[command(disable_help_flag = true, after_help = EXAMPLES)]
pub struct Args {
    /// Filters, as FIELD=FILTER
    #[arg(value_name = "FIELD=FILTER")]
    pub filters: Vec<String>,

    /// Retrieve the given fields, in addition to the defaults
    #[arg(short, long, value_name = "a,b,c", value_delimiter = ',')]
    pub select: Vec<String>,

    /// Retrieve all fields (default is just role, id, hostname)
    #[arg(short, long)]
    pub all: bool,

    /// Print just the given fields as tab-separated strings instead of JSON.
    /// Implies selecting those fields.
    #[arg(short, long, value_name = "a,b,c", value_delimiter = ',')]
    pub just: Vec<String>,

    /// Increase output verbosity (-v for request details, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Pretty-print JSON (default true when STDOUT is a TTY)
    #[arg(
        short,
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub pretty: Option<bool>,

    /// Delete the response cache before performing the request
    #[arg(short, long)]
    pub refresh: bool,

    /// Optica host for this invocation (default from config)
    #[arg(short = 'h', long, value_name = "URI")]
    pub host: Option<String>,

    /// Set the default Optica host (also used for this invocation)
    #[arg(short = 'H', long, value_name = "URI")]
    pub set_default_host: Option<String>,

    /// Print help
    #[arg(long, action = clap::ArgAction::Help)]
    pub help: Option<bool>,
}

impl Args {
    /// Field selection implied by `--all`, `--select` and `--just`.
    #[must_use]
    pub fn field_mode(&self) -> FieldMode {
        if self.all {
            FieldMode::All
        } else {
            FieldMode::Explicit(self.select.iter().chain(&self.just).cloned().collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["optical"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(!args.all);
        assert!(!args.refresh);
        assert!(args.filters.is_empty());
        assert_eq!(args.pretty, None);
        assert_eq!(args.host, None);
        assert_eq!(args.field_mode(), FieldMode::Explicit(Vec::new()));
    }

    #[test]
    fn test_cli_positional_filters_collected_in_order() {
        let args = Args::try_parse_from(["optical", "role=web", "env=/^prod/"]).unwrap();
        assert_eq!(args.filters, ["role=web", "env=/^prod/"]);
    }

    #[test]
    fn test_cli_select_splits_on_commas_and_repeats() {
        let args =
            Args::try_parse_from(["optical", "-s", "hostname,id", "--select", "az"]).unwrap();
        assert_eq!(args.select, ["hostname", "id", "az"]);
    }

    #[test]
    fn test_cli_just_implies_selection() {
        let args = Args::try_parse_from(["optical", "-s", "az", "-j", "hostname,id"]).unwrap();
        assert_eq!(args.just, ["hostname", "id"]);
        assert_eq!(
            args.field_mode(),
            FieldMode::Explicit(vec!["az".into(), "hostname".into(), "id".into()])
        );
    }

    #[test]
    fn test_cli_all_wins_over_select() {
        let args = Args::try_parse_from(["optical", "-s", "az", "-a"]).unwrap();
        assert_eq!(args.field_mode(), FieldMode::All);
    }

    #[test]
    fn test_cli_short_h_is_host_not_help() {
        let args = Args::try_parse_from(["optical", "-h", "https://optica.example.com"]).unwrap();
        assert_eq!(args.host.as_deref(), Some("https://optica.example.com"));
    }

    #[test]
    fn test_cli_set_default_host() {
        let args =
            Args::try_parse_from(["optical", "-H", "https://optica.example.com"]).unwrap();
        assert_eq!(
            args.set_default_host.as_deref(),
            Some("https://optica.example.com")
        );
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Args::try_parse_from(["optical", "--help"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let result = Args::try_parse_from(["optical", "--version"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let result = Args::try_parse_from(["optical", "--invalid-flag"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_cli_pretty_bare_flag_means_true() {
        let args = Args::try_parse_from(["optical", "-p", "role=web"]).unwrap();
        assert_eq!(args.pretty, Some(true));
        assert_eq!(args.filters, ["role=web"]);
    }

    #[test]
    fn test_cli_pretty_explicit_false() {
        let args = Args::try_parse_from(["optical", "--pretty=false"]).unwrap();
        assert_eq!(args.pretty, Some(false));
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["optical", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_refresh_flag() {
        let args = Args::try_parse_from(["optical", "-r"]).unwrap();
        assert!(args.refresh);
    }
}

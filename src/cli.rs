use clap::{Arg, ArgAction, Command};

pub const DEFAULT_ISSUE: &str = "OCPBUGS-36344";

pub fn build_cli() -> Command {
    Command::new("jira-retry")
        .about("Fetch Jira issues while honoring per-node rate limits")
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .num_args(1)
                .help("Log filter, overrides RUST_LOG (e.g. debug)"),
        )
        .arg(
            Arg::new("version")
                .long("version")
                .help("Print the jira-retry version")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("issue")
                .num_args(1..)
                .action(ArgAction::Append)
                .value_name("ISSUE")
                .help("Issue ids to fetch, one after another (default: OCPBUGS-36344)"),
        )
}

pub fn issues(matches: &clap::ArgMatches) -> Vec<String> {
    matches
        .get_many::<String>("issue")
        .map(|ids| ids.cloned().collect())
        .unwrap_or_else(|| vec![DEFAULT_ISSUE.to_string()])
}

/// Logs go to stderr so stdout only carries the retrieved issue ids.
pub fn init_logging(level: Option<&str>) {
    let env = env_logger::Env::default().default_filter_or("info");
    let mut builder = env_logger::Builder::from_env(env);
    if let Some(level) = level {
        // replaces the RUST_LOG default directive
        builder.parse_filters(level);
    }
    builder.init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_fixed_issue() {
        let m = build_cli().get_matches_from(["jira-retry"]);
        assert_eq!(issues(&m), vec![DEFAULT_ISSUE.to_string()]);
        assert!(!m.get_flag("version"));
    }

    #[test]
    fn accepts_several_issues_and_level() {
        let m = build_cli().get_matches_from([
            "jira-retry",
            "--log-level",
            "debug",
            "A-1",
            "B-2",
        ]);
        assert_eq!(issues(&m), vec!["A-1".to_string(), "B-2".to_string()]);
        assert_eq!(
            m.get_one::<String>("log-level").map(String::as_str),
            Some("debug")
        );
    }
}

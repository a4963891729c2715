mod cli;

use anyhow::Context;
use jira_retry::config::Config;
use jira_retry::http::JiraClient;
use jira_retry::retry::{get_issue_with_retries, FetchOutcome, TokioSleeper};
use log::info;

#[tokio::main(flavor = "current_thread")] // requests and sleeps run strictly one after another
async fn main() -> anyhow::Result<()> {
    let cmd = cli::build_cli();
    let matches = cmd.get_matches();
    let log_level = matches.get_one::<String>("log-level").cloned();
    let version_flag = matches.get_flag("version");

    cli::init_logging(log_level.as_deref());

    if version_flag {
        println!("jira-retry {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Fatal errors surface once, through the returned Err (exit status 1).
    let cfg = Config::from_env()?;
    let policy = cfg.retry_policy();
    info!(
        "Retry policy: max_attempts={} wait={}s..{}s counting={}",
        policy.max_attempts,
        policy.min_wait.as_secs(),
        policy.max_wait.as_secs(),
        policy.counting
    );
    let client = JiraClient::new(&cfg).context("failed to set up Jira client")?;

    for issue_id in cli::issues(&matches) {
        // Each fetch owns a fresh tracker and attempt counter.
        match get_issue_with_retries(&client, &cfg.endpoint, &issue_id, &policy, &TokioSleeper)
            .await
        {
            Ok(FetchOutcome::Found(issue)) => {
                println!("Successfully retrieved issue: {}", issue.id);
            }
            Ok(FetchOutcome::Exhausted { attempts }) => {
                info!("Giving up on {} after {} attempts", issue_id, attempts);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("fetching issue {}", issue_id));
            }
        }
    }
    Ok(())
}

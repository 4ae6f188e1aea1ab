//! Tracing bootstrap for the smoke run.

use std::env;

use tracing_subscriber::EnvFilter;

/// Crates whose events the smoke run cares about at `debug` by default.
const WORKSPACE_TARGETS: [&str; 3] = ["transition_core", "transition_platform", "transition_smoke"];

/// Install the global subscriber. `RUST_LOG` wins, then
/// `TRANSITION_SMOKE_LOG`, then the workspace default.
pub fn init() {
    let directives = filter_directives(|key| env::var(key).ok());
    let env_filter = EnvFilter::try_new(&directives)
        .unwrap_or_else(|_| EnvFilter::new(default_directives()));
    let _ = tracing_subscriber::fmt()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_env_filter(env_filter)
        .try_init();
}

/// Pick the filter directives to use. Blank or unparsable overrides fall
/// through to the next tier.
fn filter_directives<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ["RUST_LOG", "TRANSITION_SMOKE_LOG"]
        .into_iter()
        .filter_map(|key| lookup(key))
        .map(|value| value.trim().to_owned())
        .find(|value| !value.is_empty() && EnvFilter::try_new(value).is_ok())
        .unwrap_or_else(default_directives)
}

fn default_directives() -> String {
    WORKSPACE_TARGETS
        .iter()
        .fold(String::from("info"), |mut directives, target| {
            directives.push(',');
            directives.push_str(target);
            directives.push_str("=debug");
            directives
        })
}

use anyhow::{Result, bail};
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;
use crate::scan::{ErrorPolicy, ScanOptions};

pub const CLASSPATH_ENV: &str = "CLASSPATH";

pub fn resolve_classpath(cli: &Cli) -> Vec<PathBuf> {
    classpath_entries(&cli.classpath, env::var_os(CLASSPATH_ENV))
}

/// Flattens `--classpath` values, falling back to the environment value and
/// finally the working directory. Empty list elements are dropped.
pub fn classpath_entries(args: &[OsString], env_value: Option<OsString>) -> Vec<PathBuf> {
    let split = |value: &OsString| -> Vec<PathBuf> {
        env::split_paths(value)
            .filter(|p| !p.as_os_str().is_empty())
            .collect()
    };

    let from_args: Vec<PathBuf> = args.iter().flat_map(split).collect();
    if !from_args.is_empty() {
        return from_args;
    }

    if let Some(value) = env_value {
        let from_env = split(&value);
        if !from_env.is_empty() {
            return from_env;
        }
    }

    vec![PathBuf::from(".")]
}

pub fn scan_options(
    sort: bool,
    skip_errors: bool,
    parallel: bool,
    timeout_ms: Option<u64>,
) -> Result<ScanOptions> {
    if timeout_ms == Some(0) {
        bail!("--timeout-ms must be greater than zero");
    }

    Ok(ScanOptions {
        error_policy: if skip_errors {
            ErrorPolicy::Skip
        } else {
            ErrorPolicy::Abort
        },
        sort,
        parallel,
        timeout: timeout_ms.map(Duration::from_millis),
    })
}

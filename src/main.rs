use anyhow::{Context, Result};
use clap::Parser;
use package_scanner::archive::ArchiveReader;
use package_scanner::cli::{Cli, Commands, OutputFormat};
use package_scanner::config::{resolve_classpath, scan_options};
use package_scanner::directory::DirectoryReader;
use package_scanner::logging;
use package_scanner::resolve::ClasspathResolver;
use package_scanner::scan::{ScanReport, Scanner};
use package_scanner::{Location, Resolver};
use serde::Serialize;
use std::time::Instant;
use tracing::debug;

fn main() -> Result<()> {
    let cli = parse_cli();
    logging::init(cli.verbose);

    let classpath = resolve_classpath(&cli);
    debug!(?classpath, "classpath");
    let resolver = ClasspathResolver::new(classpath);

    match cli.command.clone() {
        Commands::Scan {
            package,
            format,
            sort,
            skip_errors,
            parallel,
            timeout_ms,
        } => {
            let options = scan_options(sort, skip_errors, parallel, timeout_ms)?;
            let scanner = Scanner::new(resolver).with_options(options);
            let package = normalize_package(&package);
            let result = scan_package(&scanner, &package)?;
            write_scan_output(&result, format)?;
        }
        Commands::Locate { package, format } => {
            let package = normalize_package(&package);
            let locations = Scanner::new(resolver)
                .locate(&package)
                .with_context(|| format!("Failed to locate package {package}"))?;
            write_locate_output(&locations, format)?;
        }
    }

    Ok(())
}

fn parse_cli() -> Cli {
    let args: Vec<String> = std::env::args().collect();
    Cli::parse_from(rewrite_args_for_implicit_scan(args))
}

/// `package-scanner com.acme` is shorthand for `package-scanner scan com.acme`.
fn rewrite_args_for_implicit_scan(mut args: Vec<String>) -> Vec<String> {
    if args.len() <= 1 {
        return args;
    }

    let subcommands = ["scan", "locate", "help"];

    let mut idx = 1usize;
    while idx < args.len() {
        let a = args[idx].as_str();
        if a == "--" {
            idx += 1;
            break;
        }

        if a == "-c" || a == "--classpath" {
            idx += 2;
            continue;
        }

        if a.starts_with('-') {
            idx += 1;
            continue;
        }

        break;
    }

    if idx < args.len() {
        let token = args[idx].as_str();
        if !subcommands.contains(&token) {
            args.insert(idx, "scan".to_string());
        }
    }

    args
}

/// Accepts `package com.acme;`, `import com.acme.*;` and stray whitespace.
fn normalize_package(raw: &str) -> String {
    let mut s = raw.trim();
    for keyword in ["package", "import"] {
        if let Some(rest) = s.strip_prefix(keyword)
            && rest.starts_with(char::is_whitespace)
        {
            s = rest.trim();
        }
    }
    s = s.trim_end_matches(';').trim();
    s = s.strip_suffix(".*").unwrap_or(s);
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

#[derive(Debug, Serialize)]
struct LocationOutput {
    kind: &'static str,
    url: String,
    /// Unescaped path, or the decode error when the URL does not unescape to UTF-8.
    decoded_path: String,
}

impl From<&Location> for LocationOutput {
    fn from(location: &Location) -> Self {
        Self {
            kind: location.kind().as_str(),
            url: location.url().to_string(),
            decoded_path: location.decoded_path().unwrap_or_else(|e| e.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct SkippedOutput {
    url: String,
    reason: String,
}

#[derive(Debug, Serialize)]
struct ScanResult {
    package: String,
    duration_ms: u64,
    locations: Vec<LocationOutput>,
    skipped: Vec<SkippedOutput>,
    classes: Vec<String>,
}

fn scan_package<R, A, D>(scanner: &Scanner<R, A, D>, package: &str) -> Result<ScanResult>
where
    R: Resolver + Sync,
    A: ArchiveReader + Sync,
    D: DirectoryReader + Sync,
{
    let start = Instant::now();
    let ScanReport {
        classes,
        locations,
        skipped,
    } = scanner
        .scan(package)
        .with_context(|| format!("Failed to scan package {package}"))?;

    Ok(ScanResult {
        package: package.to_string(),
        duration_ms: start.elapsed().as_millis() as u64,
        locations: locations.iter().map(LocationOutput::from).collect(),
        skipped: skipped
            .into_iter()
            .map(|s| SkippedOutput {
                url: s.location.url().to_string(),
                reason: s.reason,
            })
            .collect(),
        classes,
    })
}

fn write_scan_output(result: &ScanResult, format: OutputFormat) -> Result<()> {
    let content = match format {
        OutputFormat::Json => serde_json::to_string_pretty(result)?,
        OutputFormat::Text => result.classes.join("\n"),
    };
    print_content(&content);
    Ok(())
}

fn write_locate_output(locations: &[Location], format: OutputFormat) -> Result<()> {
    let view: Vec<LocationOutput> = locations.iter().map(LocationOutput::from).collect();
    let content = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&view)?,
        OutputFormat::Text => view
            .iter()
            .map(|l| format!("{}\t{}\t{}", l.kind, l.url, l.decoded_path))
            .collect::<Vec<_>>()
            .join("\n"),
    };
    print_content(&content);
    Ok(())
}

fn print_content(content: &str) {
    if content.is_empty() {
        return;
    }
    print!("{content}");
    if !content.ends_with('\n') {
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_package_strips_keywords_wildcard_and_semicolon() {
        assert_eq!(normalize_package("package com.acme.service ;"), "com.acme.service");
        assert_eq!(normalize_package("import com.acme.*;"), "com.acme");
        assert_eq!(normalize_package("  com.acme. plugins "), "com.acme.plugins");
        assert_eq!(normalize_package("packages.core"), "packages.core");
    }

    #[test]
    fn rewrite_args_for_implicit_scan_skips_global_option_values() {
        let args = vec![
            "package-scanner".to_string(),
            "-c".to_string(),
            "/tmp/app.jar".to_string(),
            "--classpath".to_string(),
            "/tmp/classes".to_string(),
            "-v".to_string(),
            "com.acme".to_string(),
            "--sort".to_string(),
        ];

        let rewritten = rewrite_args_for_implicit_scan(args);
        assert_eq!(rewritten[1], "-c");
        assert_eq!(rewritten[2], "/tmp/app.jar");
        assert_eq!(rewritten[5], "-v");
        assert_eq!(rewritten[6], "scan");
        assert_eq!(rewritten[7], "com.acme");
    }

    #[test]
    fn location_output_carries_decoded_path_or_decode_error() {
        let ok = Location::from_url("file:///opt/my%20classes/com/acme/").unwrap();
        let out = LocationOutput::from(&ok);
        assert_eq!(out.kind, "directory");
        assert_eq!(out.decoded_path, "/opt/my classes/com/acme/");

        let bad = Location::from_url("file:///opt/%FF/com/acme/").unwrap();
        let out = LocationOutput::from(&bad);
        assert!(out.decoded_path.starts_with("cannot decode location"));
    }

    #[test]
    fn rewrite_args_leaves_explicit_subcommands_alone() {
        let args = vec![
            "package-scanner".to_string(),
            "locate".to_string(),
            "com.acme".to_string(),
        ];
        assert_eq!(rewrite_args_for_implicit_scan(args.clone()), args);
    }
}

use crate::{cli::actions::Action, targets, zone::Zone};
use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use std::{path::PathBuf, time::Duration};

/// Convert `ArgMatches` into typed Action enum with validation
///
/// # Errors
///
/// Returns an error if the domain list cannot be read, no domain is given
/// or the timezone is unknown
pub async fn dispatch(matches: &ArgMatches) -> Result<Action> {
    // Extract targets from --domain or --file
    let targets = if let Some(path) = matches.get_one::<PathBuf>("file") {
        targets::from_list(path).await?
    } else {
        matches
            .get_many::<String>("domain")
            .map(|domains| {
                domains
                    .map(|d| d.trim().to_string())
                    .filter(|d| !d.is_empty())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default()
    };

    if targets.is_empty() {
        bail!("cannot receive domain names");
    }

    // Extract timeout with default
    let timeout = matches.get_one::<u64>("timeout").copied().unwrap_or(5);

    let insecure = matches.get_flag("insecure");

    // Extract and validate timezone
    let timezone = matches
        .get_one::<String>("timezone")
        .map_or("Local", String::as_str);
    let zone = timezone
        .parse::<Zone>()
        .with_context(|| format!("Invalid timezone: {timezone}"))?;

    let concurrency = matches
        .get_one::<u16>("concurrency")
        .map(|c| usize::from(*c));

    Ok(Action::Check {
        targets,
        timeout: Duration::from_secs(timeout),
        insecure,
        zone,
        concurrency,
    })
}

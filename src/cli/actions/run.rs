use super::Action;
use crate::{Collector, output};
use anyhow::Context;
use tracing::{info, warn};

/// Execute the action's business logic by delegating to the appropriate module
pub async fn execute(action: Action) -> anyhow::Result<()> {
    match action {
        Action::Check {
            targets,
            timeout,
            insecure,
            zone,
            concurrency,
        } => {
            if insecure {
                warn!("insecure mode skips verification of the certificate chain and host name");
            }

            let mut collector = Collector::default();
            if let Some(concurrency) = concurrency {
                collector = collector.with_concurrency(concurrency);
            }

            info!(
                targets = targets.len(),
                concurrency = collector.concurrency(),
                "getting certificate information..."
            );
            let mut records = collector
                .collect(&targets, timeout, insecure, zone)
                .await
                .context("failed to collect certificates")?;

            output::sort_records(&mut records);
            output::write_json(std::io::stdout().lock(), &records)?;

            info!("completed");
            Ok(())
        }
    }
}

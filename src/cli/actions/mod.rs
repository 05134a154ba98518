mod run;

use crate::zone::Zone;
use std::time::Duration;

/// Action enum representing each possible command
#[derive(Debug)]
pub enum Action {
    Check {
        targets: Vec<String>,
        timeout: Duration,
        insecure: bool,
        zone: Zone,
        concurrency: Option<usize>,
    },
}

impl Action {
    /// Execute the action
    ///
    /// # Errors
    ///
    /// Returns an error if the action fails to execute
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use validator_errors::ValidatorError;
use validator_executor::BlockProcessor;
use validator_primitives::{Block, ChainConfig};
use validator_state::StateBackend;

use crate::backfill::BackfillClient;
use crate::config::Config;

/// One pass through the state machine described in §4.6: EVALUATE, then
/// VALIDATE/NOT-YET/MISSING depending on what's found, with the caller
/// responsible for waiting and retrying.
enum Step {
    /// Block validated and published; advance the cursor.
    Advanced,
    /// Cursor is inside the trail; wait before re-evaluating.
    NotYet,
    /// Header row absent at the cursor; a backfill request may have been sent.
    Missing,
}

/// Owns the cursor and drives it forward one block at a time, observing
/// `cancel` at every suspension point so a stop request never waits out a
/// full retry interval.
pub struct ProgressionLoop {
    config: Config,
    backend: StateBackend,
    processor: BlockProcessor,
    backfill: Option<BackfillClient>,
    progress_tx: Option<mpsc::Sender<u64>>,
    cancel: CancellationToken,
}

impl ProgressionLoop {
    pub fn new(
        config: Config,
        chain: ChainConfig,
        backend: StateBackend,
        backfill: Option<BackfillClient>,
        progress_tx: Option<mpsc::Sender<u64>>,
        cancel: CancellationToken,
    ) -> Self {
        ProgressionLoop { config, backend, processor: BlockProcessor::new(chain), backfill, progress_tx, cancel }
    }

    /// Runs until `cancel` fires or a fatal validation error occurs. On
    /// fatal error, returns it without publishing the offending block.
    pub async fn run(mut self) -> Result<(), ValidatorError> {
        let mut cursor = self.config.from_block;

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            match self.evaluate(cursor).await? {
                Step::Advanced => {
                    cursor += 1;
                }
                Step::NotYet | Step::Missing => {
                    if self.wait_or_stop().await {
                        break;
                    }
                }
            }
        }

        info!(cursor, "progression loop stopped");
        self.progress_tx.take();
        Ok(())
    }

    async fn evaluate(&self, cursor: u64) -> Result<Step, ValidatorError> {
        let latest = self.backend.latest_height().await?;
        let Some(latest) = latest else {
            return Ok(Step::NotYet);
        };

        if cursor > latest.saturating_sub(self.config.trail) {
            return Ok(Step::NotYet);
        }

        let Some(block) = self.backend.block(cursor).await? else {
            self.handle_missing(cursor).await;
            return Ok(Step::Missing);
        };

        self.validate(&block).await?;
        self.publish(cursor).await;
        Ok(Step::Advanced)
    }

    async fn handle_missing(&self, cursor: u64) {
        warn!(block_number = cursor, "block not yet indexed");
        if self.config.statediff_missing_block {
            if let Some(backfill) = &self.backfill {
                backfill.request(cursor).await;
                validator_metrics::record_backfill_requested();
            }
        }
    }

    async fn validate(&self, block: &Block) -> Result<(), ValidatorError> {
        let block_number = block.number();
        let runtime = tokio::runtime::Handle::current();
        let author = self.backend.author(block_number).await?.unwrap_or(block.header.beneficiary);
        let pre_state = self.backend.full_state(block_number.saturating_sub(1)).await?;
        let state_db = self.backend.state_at_parent_of(block_number, runtime);

        self.processor.execute(block, author, state_db, pre_state).map_err(|err| {
            error!(block_number, error = %err, "re-execution failed");
            ValidatorError::from(err)
        })?;

        validator_integrity::validate_referential_integrity(self.backend.pool(), block_number).await.map_err(|err| {
            error!(block_number, error = %err, "referential integrity audit failed");
            validator_metrics::record_integrity_gap();
            ValidatorError::from(err)
        })?;

        Ok(())
    }

    async fn publish(&self, cursor: u64) {
        if let Some(tx) = &self.progress_tx {
            let _ = tx.send(cursor).await;
        }
        validator_metrics::record_last_validated_block(cursor);
        info!(block_number = cursor, "validated");
    }

    /// Waits out the retry interval, or returns early (with `true`) if
    /// `cancel` fires first.
    async fn wait_or_stop(&self) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.config.retry_interval) => false,
            _ = self.cancel.cancelled() => true,
        }
    }
}

//! Retryable ticket status tracking
//!
//! The child chain is the only source of truth. A status is recomputed from
//! scratch on every query:
//!
//! 1. no receipt for the ticket id: `NOT_YET_CREATED`
//! 2. reverted creation receipt: `CREATION_FAILED`
//! 3. a successful retry scheduled by the creation tx (auto-redeem) or by any
//!    later `redeem` call: `REDEEMED`
//! 4. `getTimeout` answers: `FUNDS_DEPOSITED_ON_L2`, it reverts: `EXPIRED`
//!
//! The polling wrapper keeps the last accepted state and refuses to move
//! backwards if a lagging RPC node reports an older view.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use alloy::{primitives::B256, rpc::types::Filter, sol_types::SolEvent};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::evm::client::{ChainClient, ChainProvider};
use crate::evm::contracts::{ArbRetryableTx, ARB_RETRYABLE_TX_ADDRESS};
use crate::evm::events::{block_chunks, decode_logs, redeem_scheduled};
use crate::message::status::TicketState;
use crate::networks::ChainPair;
use crate::poll::{poll_until, CancelToken, PollConfig};
use crate::types::MessageStatus;

/// Every state except `NOT_YET_CREATED`
pub const CREATED_STATUSES: [MessageStatus; 4] = [
    MessageStatus::CreationFailed,
    MessageStatus::FundsDepositedOnL2,
    MessageStatus::Redeemed,
    MessageStatus::Expired,
];

/// Something that can report the current state of a ticket
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_state(&self, ticket_id: B256) -> Result<TicketState, BridgeError>;
}

/// The ticket creation receipt, reduced to what the status depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationReceipt {
    pub succeeded: bool,
    pub block_number: u64,
    /// Retry transactions the creation tx scheduled for this ticket
    pub scheduled_retries: Vec<B256>,
}

/// Child-chain reads behind the status algorithm
#[async_trait]
pub trait TicketReader: Send + Sync {
    async fn creation_receipt(&self, ticket_id: B256)
        -> Result<Option<CreationReceipt>, BridgeError>;

    async fn latest_block(&self) -> Result<u64, BridgeError>;

    /// Retry transactions scheduled for `ticket_id` in blocks `[from, to]`
    async fn scheduled_retries(
        &self,
        ticket_id: B256,
        from: u64,
        to: u64,
    ) -> Result<Vec<B256>, BridgeError>;

    async fn retry_succeeded(&self, retry_tx: B256) -> Result<bool, BridgeError>;

    /// `getTimeout` of a live ticket, `None` once the precompile reverts
    async fn ticket_timeout(&self, ticket_id: B256) -> Result<Option<u64>, BridgeError>;
}

#[async_trait]
impl<CP: ChainProvider> TicketReader for ChainClient<CP> {
    async fn creation_receipt(
        &self,
        ticket_id: B256,
    ) -> Result<Option<CreationReceipt>, BridgeError> {
        Ok(self.receipt(ticket_id).await?.map(|receipt| CreationReceipt {
            succeeded: receipt.status(),
            block_number: receipt.block_number.unwrap_or_default(),
            scheduled_retries: redeem_scheduled(&receipt)
                .into_iter()
                .filter(|event| event.ticketId == ticket_id)
                .map(|event| event.retryTxHash)
                .collect(),
        }))
    }

    async fn latest_block(&self) -> Result<u64, BridgeError> {
        self.block_number().await
    }

    async fn scheduled_retries(
        &self,
        ticket_id: B256,
        from: u64,
        to: u64,
    ) -> Result<Vec<B256>, BridgeError> {
        let filter = Filter::new()
            .address(ARB_RETRYABLE_TX_ADDRESS)
            .event_signature(ArbRetryableTx::RedeemScheduled::SIGNATURE_HASH)
            .topic1(ticket_id)
            .from_block(from)
            .to_block(to);
        let logs = self.logs(&filter).await?;
        let scheduled: Vec<ArbRetryableTx::RedeemScheduled> =
            decode_logs(&logs, Some(ARB_RETRYABLE_TX_ADDRESS));
        Ok(scheduled.into_iter().map(|event| event.retryTxHash).collect())
    }

    async fn retry_succeeded(&self, retry_tx: B256) -> Result<bool, BridgeError> {
        Ok(self
            .receipt(retry_tx)
            .await?
            .is_some_and(|receipt| receipt.status()))
    }

    async fn ticket_timeout(&self, ticket_id: B256) -> Result<Option<u64>, BridgeError> {
        let precompile = ArbRetryableTx::new(ARB_RETRYABLE_TX_ADDRESS, self.provider());
        match precompile.getTimeout(ticket_id).call().await {
            Ok(timeout) => Ok(Some(timeout._0.saturating_to())),
            Err(e) => {
                let e = BridgeError::from(e);
                if e.is_revert() {
                    Ok(None)
                } else {
                    Err(e)
                }
            }
        }
    }
}

/// Computes ticket state from child-chain reads
///
/// Redeem scans resume after the highest block already searched for a
/// ticket, so repeated polls only look at new blocks.
#[derive(Debug)]
pub struct ChainStatusSource<R> {
    reader: R,
    max_block_range: u64,
    scanned: Mutex<HashMap<B256, u64>>,
}

impl<R: TicketReader> ChainStatusSource<R> {
    pub fn new(reader: R, max_block_range: u64) -> Self {
        Self {
            reader,
            max_block_range,
            scanned: Mutex::new(HashMap::new()),
        }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    fn scanned_through(&self, ticket_id: B256) -> Option<u64> {
        self.scanned
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&ticket_id)
            .copied()
    }

    fn mark_scanned(&self, ticket_id: B256, block: u64) {
        let mut scanned = self
            .scanned
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = scanned.entry(ticket_id).or_insert(block);
        *entry = (*entry).max(block);
    }

    /// A successful retry of `ticket_id` scheduled between `from` and `to`
    async fn successful_redeem(
        &self,
        ticket_id: B256,
        from: u64,
        to: u64,
    ) -> Result<Option<B256>, BridgeError> {
        let from = match self.scanned_through(ticket_id) {
            Some(done) => from.max(done.saturating_add(1)),
            None => from,
        };

        for (start, end) in block_chunks(from, to, self.max_block_range) {
            for retry_tx in self.reader.scheduled_retries(ticket_id, start, end).await? {
                if self.reader.retry_succeeded(retry_tx).await? {
                    return Ok(Some(retry_tx));
                }
                debug!(
                    ticket_id = %ticket_id,
                    retry_tx = %retry_tx,
                    "Redeem attempt did not succeed"
                );
            }
            self.mark_scanned(ticket_id, end);
        }
        Ok(None)
    }
}

#[async_trait]
impl<R: TicketReader> StatusSource for ChainStatusSource<R> {
    async fn fetch_state(&self, ticket_id: B256) -> Result<TicketState, BridgeError> {
        let Some(creation) = self.reader.creation_receipt(ticket_id).await? else {
            return Ok(TicketState::NotYetCreated);
        };
        if !creation.succeeded {
            return Ok(TicketState::CreationFailed {
                creation_tx: ticket_id,
            });
        }

        // Auto-redeem happens in the creation transaction itself
        for retry_tx in &creation.scheduled_retries {
            if self.reader.retry_succeeded(*retry_tx).await? {
                return Ok(TicketState::Redeemed {
                    creation_tx: ticket_id,
                    redeem_tx: *retry_tx,
                });
            }
        }

        let latest = self.reader.latest_block().await?;
        if let Some(redeem_tx) = self
            .successful_redeem(ticket_id, creation.block_number, latest)
            .await?
        {
            return Ok(TicketState::Redeemed {
                creation_tx: ticket_id,
                redeem_tx,
            });
        }

        if let Some(timeout) = self.reader.ticket_timeout(ticket_id).await? {
            return Ok(TicketState::FundsDeposited {
                creation_tx: ticket_id,
                timeout,
            });
        }

        // The ticket is gone: either it expired or a redeem landed after our scan
        let now = self.reader.latest_block().await?;
        if let Some(redeem_tx) = self
            .successful_redeem(ticket_id, creation.block_number, now)
            .await?
        {
            return Ok(TicketState::Redeemed {
                creation_tx: ticket_id,
                redeem_tx,
            });
        }
        Ok(TicketState::Expired {
            creation_tx: ticket_id,
        })
    }
}

/// Polls a [`StatusSource`] until a ticket reaches one of the wanted statuses
pub struct MessageStatusTracker<S> {
    source: S,
    poll: PollConfig,
    default_timeout: Duration,
}

impl<CP: ChainProvider> MessageStatusTracker<ChainStatusSource<ChainClient<CP>>> {
    /// Tracker backed by a child-chain client
    pub fn new(child: ChainClient<CP>, config: &BridgeConfig, chain_pair: &ChainPair) -> Self {
        Self::with_source(
            ChainStatusSource::new(child, config.max_block_range),
            PollConfig::from_bridge_config(config),
            Duration::from_millis(chain_pair.deposit_timeout_ms),
        )
    }
}

impl<S: StatusSource> MessageStatusTracker<S> {
    pub fn with_source(source: S, poll: PollConfig, default_timeout: Duration) -> Self {
        Self {
            source,
            poll,
            default_timeout,
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// One-shot status query
    pub async fn get_status(&self, ticket_id: B256) -> Result<TicketState, BridgeError> {
        self.source.fetch_state(ticket_id).await
    }

    /// Poll until the ticket's status is one of `targets`
    ///
    /// `timeout` defaults to the chain pair's deposit timeout. Asking again
    /// after a terminal state returns that same state on the first poll.
    pub async fn wait_for_status(
        &self,
        ticket_id: B256,
        targets: &[MessageStatus],
        timeout: Option<Duration>,
        cancel: Option<&CancelToken>,
    ) -> Result<TicketState, BridgeError> {
        let timeout = timeout.unwrap_or(self.default_timeout);
        let last: Mutex<Option<TicketState>> = Mutex::new(None);
        let last = &last;
        let source = &self.source;

        info!(
            ticket_id = %ticket_id,
            targets = ?targets,
            timeout_ms = timeout.as_millis() as u64,
            "Waiting for retryable ticket status"
        );

        poll_until("retryable ticket status", &self.poll, timeout, cancel, move || async move {
            let observed = source.fetch_state(ticket_id).await?;
            let mut last = last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

            let accepted = match *last {
                // Whatever the chain says first is the starting point
                None => {
                    debug!(ticket_id = %ticket_id, status = %observed.status(), "Initial ticket status");
                    observed
                }
                Some(previous) => match previous.transition(observed) {
                    Ok(next) => {
                        if next.status() != previous.status() {
                            info!(
                                ticket_id = %ticket_id,
                                from = %previous.status(),
                                to = %next.status(),
                                "Retryable ticket status changed"
                            );
                        }
                        next
                    }
                    Err(e) => {
                        warn!(
                            ticket_id = %ticket_id,
                            error = %e,
                            "Ignoring stale ticket state"
                        );
                        previous
                    }
                },
            };
            *last = Some(accepted);

            Ok(targets.contains(&accepted.status()).then_some(accepted))
        })
        .await
    }

    /// Wait until the ticket exists on the child chain in any form
    pub async fn wait_for_creation(
        &self,
        ticket_id: B256,
        timeout: Option<Duration>,
        cancel: Option<&CancelToken>,
    ) -> Result<TicketState, BridgeError> {
        self.wait_for_status(ticket_id, &CREATED_STATUSES, timeout, cancel)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a fixed sequence of answers, repeating the last one
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<TicketState, BridgeError>>>,
        last: Mutex<Option<TicketState>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<TicketState, BridgeError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(None),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl StatusSource for ScriptedSource {
        async fn fetch_state(&self, _ticket_id: B256) -> Result<TicketState, BridgeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Ok(state)) => {
                    *self.last.lock().unwrap() = Some(state);
                    Ok(state)
                }
                Some(Err(e)) => Err(e),
                None => Ok(self.last.lock().unwrap().unwrap_or(TicketState::NotYetCreated)),
            }
        }
    }

    fn fast_poll() -> PollConfig {
        PollConfig {
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(5),
            multiplier: 2.0,
        }
    }

    fn tracker(script: Vec<Result<TicketState, BridgeError>>) -> MessageStatusTracker<ScriptedSource> {
        MessageStatusTracker::with_source(
            ScriptedSource::new(script),
            fast_poll(),
            Duration::from_secs(5),
        )
    }

    fn funded() -> TicketState {
        TicketState::FundsDeposited {
            creation_tx: B256::repeat_byte(1),
            timeout: 1_000,
        }
    }

    fn redeemed() -> TicketState {
        TicketState::Redeemed {
            creation_tx: B256::repeat_byte(1),
            redeem_tx: B256::repeat_byte(2),
        }
    }

    fn transient() -> BridgeError {
        BridgeError::MessageTimeout {
            what: "rpc".into(),
            timeout_ms: 1,
        }
    }

    #[tokio::test]
    async fn test_waits_through_states() {
        let tracker = tracker(vec![
            Ok(TicketState::NotYetCreated),
            Ok(funded()),
            Ok(redeemed()),
        ]);
        let state = tracker
            .wait_for_status(B256::ZERO, &[MessageStatus::Redeemed], None, None)
            .await
            .unwrap();
        assert_eq!(state, redeemed());
        assert_eq!(state.redeem_tx(), Some(B256::repeat_byte(2)));
        assert_eq!(tracker.source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let tracker = tracker(vec![Err(transient()), Err(transient()), Ok(funded())]);
        let state = tracker
            .wait_for_creation(B256::ZERO, None, None)
            .await
            .unwrap();
        assert_eq!(state.status(), MessageStatus::FundsDepositedOnL2);
    }

    #[tokio::test]
    async fn test_permanent_error_stops_polling() {
        let tracker = tracker(vec![Err(BridgeError::Decode("bad".into())), Ok(funded())]);
        let err = tracker
            .wait_for_creation(B256::ZERO, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Decode(_)));
    }

    #[tokio::test]
    async fn test_regression_is_ignored() {
        // A lagging node reports NOT_YET_CREATED after FUNDS_DEPOSITED
        let tracker = tracker(vec![
            Ok(funded()),
            Ok(TicketState::NotYetCreated),
            Ok(redeemed()),
        ]);
        let state = tracker
            .wait_for_status(B256::ZERO, &[MessageStatus::Redeemed], None, None)
            .await
            .unwrap();
        assert_eq!(state, redeemed());
    }

    #[tokio::test]
    async fn test_terminal_state_is_idempotent() {
        let tracker = tracker(vec![Ok(redeemed())]);
        for _ in 0..3 {
            let state = tracker
                .wait_for_status(B256::ZERO, &[MessageStatus::Redeemed], None, None)
                .await
                .unwrap();
            assert_eq!(state, redeemed());
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let tracker = tracker(vec![Ok(funded())]);
        let err = tracker
            .wait_for_status(
                B256::ZERO,
                &[MessageStatus::Redeemed],
                Some(Duration::from_millis(30)),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::MessageTimeout { .. }));
    }

    #[tokio::test]
    async fn test_cancel() {
        let tracker = tracker(vec![Ok(TicketState::NotYetCreated)]);
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = tracker
            .wait_for_creation(B256::ZERO, None, Some(&cancel))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Cancelled));
    }

    #[tokio::test]
    async fn test_expired_on_first_poll_is_accepted() {
        let expired = TicketState::Expired {
            creation_tx: B256::repeat_byte(1),
        };
        let tracker = tracker(vec![Ok(expired)]);
        let quick = Some(Duration::from_millis(200));

        let state = tracker
            .wait_for_status(B256::ZERO, &[MessageStatus::Expired], quick, None)
            .await
            .unwrap();
        assert_eq!(state, expired);

        let state = tracker
            .wait_for_creation(B256::ZERO, quick, None)
            .await
            .unwrap();
        assert_eq!(state, expired);
    }

    #[tokio::test]
    async fn test_creation_failed_on_first_poll_is_accepted() {
        let failed = TicketState::CreationFailed {
            creation_tx: B256::repeat_byte(1),
        };
        let tracker = tracker(vec![Ok(failed)]);
        let state = tracker
            .wait_for_creation(B256::ZERO, Some(Duration::from_millis(200)), None)
            .await
            .unwrap();
        assert_eq!(state, failed);
    }

    #[tokio::test]
    async fn test_zero_gas_ticket_stays_funded() {
        let tracker = tracker(vec![Ok(TicketState::NotYetCreated), Ok(funded())]);
        let state = tracker
            .wait_for_creation(B256::ZERO, None, None)
            .await
            .unwrap();
        assert_eq!(state.status(), MessageStatus::FundsDepositedOnL2);
        assert_eq!(tracker.get_status(B256::ZERO).await.unwrap(), funded());
    }

    /// In-memory child chain for the status algorithm
    #[derive(Default)]
    struct MockChain {
        creation: Option<CreationReceipt>,
        /// Successive chain heads, the last one repeats
        heads: Mutex<VecDeque<u64>>,
        /// Block and retry tx of every `RedeemScheduled` log
        redeems: Vec<(u64, B256)>,
        succeeded: Vec<B256>,
        timeout: Option<u64>,
        scans: Mutex<Vec<(u64, u64)>>,
    }

    impl MockChain {
        fn created(block_number: u64, scheduled_retries: Vec<B256>) -> Self {
            Self {
                creation: Some(CreationReceipt {
                    succeeded: true,
                    block_number,
                    scheduled_retries,
                }),
                heads: Mutex::new(VecDeque::from([100])),
                timeout: Some(5_000),
                ..Default::default()
            }
        }

        fn with_heads(self, heads: &[u64]) -> Self {
            *self.heads.lock().unwrap() = heads.iter().copied().collect();
            self
        }

        fn scans(&self) -> Vec<(u64, u64)> {
            self.scans.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TicketReader for MockChain {
        async fn creation_receipt(
            &self,
            _ticket_id: B256,
        ) -> Result<Option<CreationReceipt>, BridgeError> {
            Ok(self.creation.clone())
        }

        async fn latest_block(&self) -> Result<u64, BridgeError> {
            let mut heads = self.heads.lock().unwrap();
            let head = if heads.len() > 1 {
                heads.pop_front()
            } else {
                heads.front().copied()
            };
            Ok(head.unwrap_or_default())
        }

        async fn scheduled_retries(
            &self,
            _ticket_id: B256,
            from: u64,
            to: u64,
        ) -> Result<Vec<B256>, BridgeError> {
            self.scans.lock().unwrap().push((from, to));
            Ok(self
                .redeems
                .iter()
                .filter(|(block, _)| (from..=to).contains(block))
                .map(|(_, tx)| *tx)
                .collect())
        }

        async fn retry_succeeded(&self, retry_tx: B256) -> Result<bool, BridgeError> {
            Ok(self.succeeded.contains(&retry_tx))
        }

        async fn ticket_timeout(&self, _ticket_id: B256) -> Result<Option<u64>, BridgeError> {
            Ok(self.timeout)
        }
    }

    fn ticket() -> B256 {
        B256::repeat_byte(0xaa)
    }

    fn retry(n: u8) -> B256 {
        B256::repeat_byte(n)
    }

    async fn state_of(source: &ChainStatusSource<MockChain>) -> TicketState {
        source.fetch_state(ticket()).await.unwrap()
    }

    #[tokio::test]
    async fn test_missing_receipt_is_not_yet_created() {
        let source = ChainStatusSource::new(MockChain::default(), 1_000);
        assert_eq!(state_of(&source).await, TicketState::NotYetCreated);
    }

    #[tokio::test]
    async fn test_reverted_creation_is_creation_failed() {
        let mut chain = MockChain::created(90, vec![retry(1)]);
        chain.creation.as_mut().unwrap().succeeded = false;
        chain.succeeded = vec![retry(1)];
        let source = ChainStatusSource::new(chain, 1_000);

        assert_eq!(
            state_of(&source).await,
            TicketState::CreationFailed {
                creation_tx: ticket()
            }
        );
        assert!(source.reader().scans().is_empty());
    }

    #[tokio::test]
    async fn test_auto_redeem_in_creation_receipt() {
        let mut chain = MockChain::created(90, vec![retry(1)]);
        chain.succeeded = vec![retry(1)];
        let source = ChainStatusSource::new(chain, 1_000);

        assert_eq!(
            state_of(&source).await,
            TicketState::Redeemed {
                creation_tx: ticket(),
                redeem_tx: retry(1),
            }
        );
        assert!(source.reader().scans().is_empty());
    }

    #[tokio::test]
    async fn test_failed_retries_with_live_ticket_is_funded() {
        let mut chain = MockChain::created(90, vec![retry(1)]);
        chain.redeems = vec![(95, retry(2))];
        let source = ChainStatusSource::new(chain, 1_000);

        assert_eq!(
            state_of(&source).await,
            TicketState::FundsDeposited {
                creation_tx: ticket(),
                timeout: 5_000,
            }
        );
    }

    #[tokio::test]
    async fn test_manual_redeem_found_in_logs() {
        let mut chain = MockChain::created(90, vec![]);
        chain.redeems = vec![(92, retry(2)), (97, retry(3))];
        chain.succeeded = vec![retry(3)];
        let source = ChainStatusSource::new(chain, 1_000);

        let state = state_of(&source).await;
        assert_eq!(state.redeem_tx(), Some(retry(3)));
    }

    #[tokio::test]
    async fn test_vanished_ticket_is_expired() {
        let mut chain = MockChain::created(90, vec![]);
        chain.timeout = None;
        let source = ChainStatusSource::new(chain, 1_000);

        assert_eq!(
            state_of(&source).await,
            TicketState::Expired {
                creation_tx: ticket()
            }
        );
    }

    #[tokio::test]
    async fn test_late_redeem_after_timeout_revert() {
        // The redeem lands at 103, after the first scan stopped at 100
        let mut chain = MockChain::created(90, vec![]).with_heads(&[100, 105]);
        chain.redeems = vec![(103, retry(4))];
        chain.succeeded = vec![retry(4)];
        chain.timeout = None;
        let source = ChainStatusSource::new(chain, 1_000);

        assert_eq!(
            state_of(&source).await,
            TicketState::Redeemed {
                creation_tx: ticket(),
                redeem_tx: retry(4),
            }
        );
        assert_eq!(source.reader().scans(), vec![(90, 100), (101, 105)]);
    }

    #[tokio::test]
    async fn test_redeem_scan_resumes_after_scanned_blocks() {
        let chain = MockChain::created(90, vec![]).with_heads(&[100, 120]);
        let source = ChainStatusSource::new(chain, 1_000);

        assert_eq!(state_of(&source).await.status(), MessageStatus::FundsDepositedOnL2);
        assert_eq!(state_of(&source).await.status(), MessageStatus::FundsDepositedOnL2);
        assert_eq!(state_of(&source).await.status(), MessageStatus::FundsDepositedOnL2);
        assert_eq!(source.reader().scans(), vec![(90, 100), (101, 120)]);
    }

    #[tokio::test]
    async fn test_redeem_scan_is_chunked() {
        let chain = MockChain::created(0, vec![]).with_heads(&[25]);
        let source = ChainStatusSource::new(chain, 10);

        state_of(&source).await;
        assert_eq!(source.reader().scans(), vec![(0, 9), (10, 19), (20, 25)]);
    }

    #[tokio::test]
    async fn test_tracker_over_chain_source() {
        let mut chain = MockChain::created(90, vec![]);
        chain.timeout = None;
        let tracker = MessageStatusTracker::with_source(
            ChainStatusSource::new(chain, 1_000),
            fast_poll(),
            Duration::from_millis(200),
        );
        let state = tracker.wait_for_creation(ticket(), None, None).await.unwrap();
        assert_eq!(state.status(), MessageStatus::Expired);
    }
}

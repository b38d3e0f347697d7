//! Outreach Orchestrator — compose, deliver, then commit `Applied`.
//!
//! Everything from the status check to the store commit runs under the
//! posting's key lock. A second request for the same posting waits, then
//! observes `Applied` and is rejected without sending anything. The store's
//! conditional `mark_applied` backs this up across processes.
//!
//! A failed delivery leaves the posting `Discovered` so the call can be retried.
//! Composition is bounded by `compose_timeout`; past it the template is used.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::discovery::contact::is_plausible_address;
use crate::locks::KeyedLocks;
use crate::models::{IncompleteProfile, Posting, ProfileSnapshot};
use crate::outreach::composer::{fallback_message, MessageComposer, OutreachMessage};
use crate::outreach::lifecycle::{ensure_submittable, submit_outreach, TransitionError};
use crate::outreach::transport::{MailError, MailTransport};
use crate::store::{Store, StoreError};

#[derive(Debug, Error)]
pub enum OutreachError {
    #[error("Posting {0} not found")]
    PostingNotFound(Uuid),

    #[error("Profile {0} not found")]
    ProfileNotFound(Uuid),

    #[error(transparent)]
    ProfileIncomplete(#[from] IncompleteProfile),

    #[error("Posting {0} has already been applied to")]
    AlreadyApplied(Uuid),

    #[error("No valid recipient address for this posting")]
    RecipientMissing,

    #[error("Delivery failed: {0}")]
    Delivery(#[source] MailError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<TransitionError> for OutreachError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::AlreadyApplied(id) => OutreachError::AlreadyApplied(id),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OutreachResult {
    pub posting_id: Uuid,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub delivered: bool,
    /// True when the deterministic template replaced the composer's output.
    pub used_fallback: bool,
}

/// Longest wait for the composer before falling back to the template.
pub const DEFAULT_COMPOSE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct OutreachOrchestrator {
    store: Arc<dyn Store>,
    composer: Arc<dyn MessageComposer>,
    transport: Arc<dyn MailTransport>,
    posting_locks: KeyedLocks<Uuid>,
    compose_timeout: Duration,
}

impl OutreachOrchestrator {
    pub fn new(
        store: Arc<dyn Store>,
        composer: Arc<dyn MessageComposer>,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        Self {
            store,
            composer,
            transport,
            posting_locks: KeyedLocks::new(),
            compose_timeout: DEFAULT_COMPOSE_TIMEOUT,
        }
    }

    pub fn with_compose_timeout(mut self, timeout: Duration) -> Self {
        self.compose_timeout = timeout;
        self
    }

    /// Sends one application message for the posting and marks it `Applied`.
    pub async fn apply(
        &self,
        posting_id: Uuid,
        override_recipient: Option<&str>,
    ) -> Result<OutreachResult, OutreachError> {
        let _guard = self.posting_locks.acquire(posting_id).await;

        let posting = self
            .store
            .get_posting(posting_id)
            .await?
            .ok_or(OutreachError::PostingNotFound(posting_id))?;
        ensure_submittable(&posting)?;

        let profile = self
            .store
            .get_profile(posting.profile_id)
            .await?
            .ok_or(OutreachError::ProfileNotFound(posting.profile_id))?;
        let snapshot = profile.outreach_snapshot()?;

        self.deliver(&posting, &snapshot, override_recipient).await
    }

    async fn deliver(
        &self,
        posting: &Posting,
        profile: &ProfileSnapshot,
        override_recipient: Option<&str>,
    ) -> Result<OutreachResult, OutreachError> {
        let recipient = resolve_recipient(override_recipient, posting.contact_email.as_deref())?;
        let (message, used_fallback) = self.compose_or_fallback(profile, posting).await;

        if let Err(e) = self
            .transport
            .send(&recipient.address, &message.subject, &message.body)
            .await
        {
            warn!(posting_id = %posting.id, recipient = %recipient.address, error = %e, "delivery failed");
            return Err(OutreachError::Delivery(e));
        }

        let contact_override = recipient.overridden.then(|| recipient.address.clone());
        let transition = submit_outreach(posting, Utc::now(), contact_override)?;
        let committed = self
            .store
            .mark_applied(
                transition.posting_id,
                transition.applied_at,
                transition.contact_override.as_deref(),
            )
            .await?;
        if committed.is_none() {
            error!(posting_id = %posting.id, "message delivered but posting was no longer discovered");
            return Err(OutreachError::AlreadyApplied(posting.id));
        }

        info!(
            posting_id = %posting.id,
            profile_id = %posting.profile_id,
            recipient = %recipient.address,
            used_fallback,
            "outreach delivered"
        );

        Ok(OutreachResult {
            posting_id: posting.id,
            recipient: recipient.address,
            subject: message.subject,
            body: message.body,
            delivered: true,
            used_fallback,
        })
    }

    async fn compose_or_fallback(
        &self,
        profile: &ProfileSnapshot,
        posting: &Posting,
    ) -> (OutreachMessage, bool) {
        let composed =
            tokio::time::timeout(self.compose_timeout, self.composer.compose(profile, posting)).await;
        match composed {
            Ok(Ok(message)) => (message, false),
            Ok(Err(e)) => {
                warn!(posting_id = %posting.id, error = %e, "composer failed, using fallback template");
                (fallback_message(profile, posting), true)
            }
            Err(_) => {
                warn!(
                    posting_id = %posting.id,
                    timeout_ms = self.compose_timeout.as_millis() as u64,
                    "composer timed out, using fallback template"
                );
                (fallback_message(profile, posting), true)
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Recipient {
    address: String,
    overridden: bool,
}

/// A syntactically valid override beats the stored contact.
fn resolve_recipient(
    override_recipient: Option<&str>,
    contact_email: Option<&str>,
) -> Result<Recipient, OutreachError> {
    if let Some(address) = override_recipient.map(str::trim) {
        if is_plausible_address(address) {
            return Ok(Recipient {
                address: address.to_string(),
                overridden: true,
            });
        }
        warn!(%address, "ignoring invalid recipient override");
    }

    contact_email
        .map(str::trim)
        .filter(|address| is_plausible_address(address))
        .map(|address| Recipient {
            address: address.to_string(),
            overridden: false,
        })
        .ok_or(OutreachError::RecipientMissing)
}

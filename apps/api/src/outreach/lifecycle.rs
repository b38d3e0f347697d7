//! Application lifecycle for a single posting.
//!
//! ```text
//! Discovered ──submit_outreach──► Applied
//! ```
//!
//! `Applied` is terminal. The transition is produced here as a value and
//! committed by the store only after the message has been delivered.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Posting, PostingStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("posting {0} has already been applied to")]
    AlreadyApplied(Uuid),
}

/// The `Discovered → Applied` transition, ready to be committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutreach {
    pub posting_id: Uuid,
    pub applied_at: DateTime<Utc>,
    /// Recipient to persist as the posting's contact when the caller overrode it.
    pub contact_override: Option<String>,
}

impl PostingStatus {
    pub fn can_transition_to(self, next: PostingStatus) -> bool {
        matches!(
            (self, next),
            (PostingStatus::Discovered, PostingStatus::Applied)
        )
    }
}

/// Guard for the outreach transition: only `Discovered` postings qualify.
pub fn ensure_submittable(posting: &Posting) -> Result<(), TransitionError> {
    if posting.status.can_transition_to(PostingStatus::Applied) {
        Ok(())
    } else {
        Err(TransitionError::AlreadyApplied(posting.id))
    }
}

pub fn submit_outreach(
    posting: &Posting,
    applied_at: DateTime<Utc>,
    contact_override: Option<String>,
) -> Result<SubmitOutreach, TransitionError> {
    ensure_submittable(posting)?;
    Ok(SubmitOutreach {
        posting_id: posting.id,
        applied_at,
        contact_override,
    })
}

/// Applies a committed transition to an in-memory posting.
/// Re-checks the guard so a stale transition can never revert or repeat.
pub fn apply_transition(
    posting: &mut Posting,
    transition: &SubmitOutreach,
) -> Result<(), TransitionError> {
    ensure_submittable(posting)?;
    posting.status = PostingStatus::Applied;
    posting.applied_at = Some(transition.applied_at);
    if let Some(contact) = &transition.contact_override {
        posting.contact_email = Some(contact.clone());
    }
    Ok(())
}

/// `status = Applied` exactly when `applied_at` is present.
pub fn is_consistent(posting: &Posting) -> bool {
    (posting.status == PostingStatus::Applied) == posting.applied_at.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::posting::NewPosting;

    fn discovered() -> Posting {
        Posting::discovered(
            Uuid::new_v4(),
            NewPosting {
                title: "Backend Engineer".into(),
                company: "Acme".into(),
                url: "https://jobs.example/1".into(),
                required_skills: "rust".into(),
                required_experience: "3+ years".into(),
                contact_email: "hr@acme.com".into(),
                contact_derived: true,
            },
        )
    }

    #[test]
    fn test_only_discovered_to_applied_is_allowed() {
        assert!(PostingStatus::Discovered.can_transition_to(PostingStatus::Applied));
        assert!(!PostingStatus::Applied.can_transition_to(PostingStatus::Discovered));
        assert!(!PostingStatus::Applied.can_transition_to(PostingStatus::Applied));
        assert!(!PostingStatus::Discovered.can_transition_to(PostingStatus::Discovered));
    }

    #[test]
    fn test_submit_then_apply_sets_applied_at() {
        let mut posting = discovered();
        assert!(is_consistent(&posting));

        let now = Utc::now();
        let transition = submit_outreach(&posting, now, None).unwrap();
        apply_transition(&mut posting, &transition).unwrap();

        assert_eq!(posting.status, PostingStatus::Applied);
        assert_eq!(posting.applied_at, Some(now));
        assert_eq!(posting.contact_email.as_deref(), Some("hr@acme.com"));
        assert!(is_consistent(&posting));
    }

    #[test]
    fn test_override_replaces_contact() {
        let mut posting = discovered();
        let transition =
            submit_outreach(&posting, Utc::now(), Some("talent@acme.io".into())).unwrap();
        apply_transition(&mut posting, &transition).unwrap();
        assert_eq!(posting.contact_email.as_deref(), Some("talent@acme.io"));
    }

    #[test]
    fn test_applied_posting_rejects_second_transition() {
        let mut posting = discovered();
        let first_at = Utc::now();
        let transition = submit_outreach(&posting, first_at, None).unwrap();
        apply_transition(&mut posting, &transition).unwrap();

        assert_eq!(
            submit_outreach(&posting, Utc::now(), None),
            Err(TransitionError::AlreadyApplied(posting.id))
        );
        // A stale transition replayed against the applied posting changes nothing.
        assert!(apply_transition(&mut posting, &transition).is_err());
        assert_eq!(posting.applied_at, Some(first_at));
        assert_eq!(posting.status, PostingStatus::Applied);
    }
}

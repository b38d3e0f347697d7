//! Fakes for the external collaborators, shared by unit tests.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::discovery::provider::{JobSearchProvider, ProviderError, RawPosting, SearchQuery};
use crate::models::posting::NewPosting;
use crate::models::{Posting, Profile, ProfileSnapshot};
use crate::outreach::composer::{ComposeError, MessageComposer, OutreachMessage};
use crate::outreach::transport::{MailError, MailTransport};
use crate::profiles::extractor::{ExtractError, ExtractedProfile, ResumeExtractor};
use crate::store::{MemoryStore, ProfileStore};

pub fn new_posting(url: &str) -> NewPosting {
    NewPosting {
        title: "Software Engineer".into(),
        company: "Acme".into(),
        url: url.into(),
        required_skills: "python".into(),
        required_experience: "3+ years".into(),
        contact_email: "hr@acme.com".into(),
        contact_derived: true,
    }
}

pub fn raw_row(title: &str, company: &str, url: &str) -> RawPosting {
    RawPosting {
        title: Some(title.into()),
        company: Some(company.into()),
        url: Some(url.into()),
        email: None,
        skills: Vec::new(),
    }
}

/// Registers a profile with the given skills and experience.
pub async fn seed_profile(
    store: &MemoryStore,
    email: &str,
    skills: &[&str],
    experience_years: Option<u32>,
) -> Profile {
    let profile = Profile::new(email);
    store.create_profile(&profile).await.unwrap();
    let skills: BTreeSet<String> = skills.iter().map(|s| s.to_string()).collect();
    store
        .update_resume_fields(profile.id, &skills, experience_years)
        .await
        .unwrap()
}

/// Provider answering from a fixed table; unknown terms fail.
#[derive(Default)]
pub struct FakeProvider {
    responses: Mutex<HashMap<String, Result<Vec<RawPosting>, String>>>,
    calls: Mutex<Vec<SearchQuery>>,
    delay: Duration,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, term: &str, rows: Vec<RawPosting>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(term.to_string(), Ok(rows));
        self
    }

    pub fn fail(self, term: &str, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(term.to_string(), Err(message.to_string()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<SearchQuery> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobSearchProvider for FakeProvider {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawPosting>, ProviderError> {
        self.calls.lock().unwrap().push(query.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let response = self.responses.lock().unwrap().get(&query.term).cloned();
        match response {
            Some(Ok(rows)) => Ok(rows),
            Some(Err(message)) => Err(ProviderError::Api {
                status: 503,
                message,
            }),
            None => Err(ProviderError::Decode(format!("no fixture for '{}'", query.term))),
        }
    }
}

pub enum ComposerBehavior {
    Reply(OutreachMessage),
    Fail,
    Malformed,
}

pub struct FakeComposer {
    behavior: ComposerBehavior,
    delay: Duration,
    pub calls: AtomicUsize,
}

impl FakeComposer {
    pub fn replying(subject: &str, body: &str) -> Self {
        Self::with(ComposerBehavior::Reply(OutreachMessage {
            subject: subject.into(),
            body: body.into(),
        }))
    }

    pub fn failing() -> Self {
        Self::with(ComposerBehavior::Fail)
    }

    pub fn malformed() -> Self {
        Self::with(ComposerBehavior::Malformed)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn with(behavior: ComposerBehavior) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MessageComposer for FakeComposer {
    async fn compose(
        &self,
        _profile: &ProfileSnapshot,
        _posting: &Posting,
    ) -> Result<OutreachMessage, ComposeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.behavior {
            ComposerBehavior::Reply(message) => Ok(message.clone()),
            ComposerBehavior::Fail => Err(ComposeError::Unavailable("composer offline".into())),
            ComposerBehavior::Malformed => OutreachMessage {
                subject: "  ".into(),
                body: String::new(),
            }
            .validated(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Transport that records deliveries; optionally slow or failing.
pub struct FakeTransport {
    succeed: bool,
    delay: Duration,
    sent: Mutex<Vec<SentMail>>,
    pub attempts: AtomicUsize,
}

impl FakeTransport {
    pub fn succeeding() -> Self {
        Self {
            succeed: true,
            delay: Duration::ZERO,
            sent: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            succeed: false,
            ..Self::succeeding()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for FakeTransport {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), MailError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if !self.succeed {
            return Err(MailError::Rejected {
                status: 500,
                message: "smtp relay down".into(),
            });
        }
        self.sent.lock().unwrap().push(SentMail {
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
        });
        Ok(())
    }
}

pub struct FakeExtractor {
    result: Result<ExtractedProfile, String>,
}

impl FakeExtractor {
    pub fn returning(skills: &[&str], experience_years: Option<u32>) -> Self {
        Self {
            result: Ok(ExtractedProfile {
                skills: skills.iter().map(|s| s.to_string()).collect(),
                experience_years,
            }),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: Err("not a pdf".into()),
        }
    }
}

#[async_trait]
impl ResumeExtractor for FakeExtractor {
    async fn extract(&self, _document: Bytes) -> Result<ExtractedProfile, ExtractError> {
        self.result.clone().map_err(ExtractError::Pdf)
    }
}

pub mod posting;
pub mod profile;
pub mod run;

pub use posting::{Posting, PostingStatus};
pub use profile::{IncompleteProfile, Profile, ProfileSnapshot};
pub use run::{RejectedRow, RunOutcome, RunStatus, SearchRun, TermFailure};

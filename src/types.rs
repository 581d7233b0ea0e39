//! # Core Types for the Election System
//!
//! This module defines the records the election owns and the value types it
//! hands back to callers. Everything here is plain data: the rules about who
//! may change what live in [`crate::election`].
//!
//! ## Type Categories
//!
//! ### Lifecycle
//! - [`ElectionStatus`]: the four-phase election state machine
//! - [`VoterStatus`]: per-voter verification state
//!
//! ### Entities
//! - [`Candidate`]: a ballot option with its running tally
//! - [`Voter`]: a registered person and their `has_voted` flag
//! - [`Vote`]: an immutable cast ballot
//!
//! ### Reports
//! - [`ElectionStatistics`]: counters readable in any phase
//! - [`ElectionResults`]: final tally, keyed by candidate id
//!
//! ## Usage Examples
//!
//! ```rust
//! use election::types::{Candidate, ElectionStatus, NewCandidate};
//!
//! let candidate = Candidate::from_registration(
//!     NewCandidate::new("Alice Smith", "Civic Party")
//!         .with_manifesto("Open data for every council"),
//! );
//! assert_eq!(candidate.vote_count, 0);
//!
//! assert_eq!(ElectionStatus::Setup.next(), Some(ElectionStatus::RegistrationOpen));
//! assert_eq!(ElectionStatus::Closed.next(), None);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Opaque candidate identifier
pub type CandidateId = Uuid;

/// Opaque voter identifier
pub type VoterId = Uuid;

/// Opaque vote identifier
pub type VoteId = Uuid;

/// Election lifecycle status
///
/// Phases only ever move forward, one step at a time:
///
/// ```text
/// SETUP -> REGISTRATION_OPEN -> VOTING_OPEN -> CLOSED
/// ```
///
/// `CLOSED` is terminal. The derived ordering follows the lifecycle, so
/// `Setup < RegistrationOpen < VotingOpen < Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElectionStatus {
    /// Candidates are being added
    Setup,
    /// Voters may register
    RegistrationOpen,
    /// Ballots are accepted
    VotingOpen,
    /// Results are final
    Closed,
}

impl ElectionStatus {
    /// All phases in lifecycle order
    pub const ALL: [ElectionStatus; 4] = [
        ElectionStatus::Setup,
        ElectionStatus::RegistrationOpen,
        ElectionStatus::VotingOpen,
        ElectionStatus::Closed,
    ];

    /// The only phase this one may advance to, if any
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Setup => Some(Self::RegistrationOpen),
            Self::RegistrationOpen => Some(Self::VotingOpen),
            Self::VotingOpen => Some(Self::Closed),
            Self::Closed => None,
        }
    }

    /// The phase that must precede this one, if any
    pub fn predecessor(self) -> Option<Self> {
        match self {
            Self::Setup => None,
            Self::RegistrationOpen => Some(Self::Setup),
            Self::VotingOpen => Some(Self::RegistrationOpen),
            Self::Closed => Some(Self::VotingOpen),
        }
    }

    /// Whether the election has reached its terminal phase
    pub fn is_final(self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Wire/display name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "SETUP",
            Self::RegistrationOpen => "REGISTRATION_OPEN",
            Self::VotingOpen => "VOTING_OPEN",
            Self::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for ElectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle phase an operation needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusRequirement {
    /// Exactly this phase
    Exactly(ElectionStatus),
    /// Any phase before `CLOSED`
    NotClosed,
}

impl StatusRequirement {
    pub fn is_met_by(self, status: ElectionStatus) -> bool {
        match self {
            Self::Exactly(required) => status == required,
            Self::NotClosed => !status.is_final(),
        }
    }
}

impl fmt::Display for StatusRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exactly(status) => write!(f, "{status}"),
            Self::NotClosed => f.write_str("any status before CLOSED"),
        }
    }
}

/// Verification state of a registered voter
///
/// Only `Verified` voters may cast a ballot. Transitions are driven by the
/// administrative operations on [`crate::election::Election`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoterStatus {
    PendingVerification,
    Verified,
    Blocked,
}

impl fmt::Display for VoterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PendingVerification => "PENDING_VERIFICATION",
            Self::Verified => "VERIFIED",
            Self::Blocked => "BLOCKED",
        })
    }
}

/// Input for adding a candidate during setup
///
/// Name and party are required; the descriptive fields default to empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCandidate {
    pub name: String,
    pub party: String,
    pub manifesto: String,
    pub image_url: String,
    pub background: String,
}

impl NewCandidate {
    pub fn new(name: impl Into<String>, party: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            party: party.into(),
            ..Self::default()
        }
    }

    pub fn with_manifesto(mut self, manifesto: impl Into<String>) -> Self {
        self.manifesto = manifesto.into();
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = image_url.into();
        self
    }

    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = background.into();
        self
    }
}

/// A ballot option and its running tally
///
/// Candidates are created once during setup and never removed. The tally is
/// only ever advanced by the election while it records a vote, so
/// `vote_count` always equals the number of [`Vote`]s naming this candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Unique candidate identifier, assigned at creation
    pub id: CandidateId,

    /// Display name as printed on the ballot
    ///
    /// Names are not deduplicated; two candidates may share one.
    pub name: String,

    /// Party or affiliation
    pub party: String,

    /// Platform statement
    pub manifesto: String,

    /// Reference to a portrait or logo
    pub image_url: String,

    /// Biography
    pub background: String,

    /// Votes received so far
    pub vote_count: u64,
}

impl Candidate {
    /// Create a candidate with a fresh id and an empty tally
    pub fn from_registration(registration: NewCandidate) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: registration.name,
            party: registration.party,
            manifesto: registration.manifesto,
            image_url: registration.image_url,
            background: registration.background,
            vote_count: 0,
        }
    }

    pub(crate) fn record_vote(&mut self) {
        self.vote_count += 1;
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Candidate: {} ({}) - {} votes",
            self.name, self.party, self.vote_count
        )
    }
}

/// Input for registering a voter
///
/// Carries a credential hash rather than a password; see
/// [`crate::auth::CredentialHasher`].
#[derive(Debug, Clone, PartialEq)]
pub struct VoterRegistration {
    pub name: String,
    pub email: String,
    pub national_id: String,
    pub credential_hash: String,
}

/// A registered voter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voter {
    /// Unique voter identifier, assigned at registration
    pub id: VoterId,

    pub name: String,

    pub email: String,

    /// National identity number, unique across all voters
    pub national_id: String,

    /// Salted credential hash. Never serialized.
    #[serde(skip)]
    pub credential_hash: String,

    /// When the voter registered
    pub registered_at: DateTime<Utc>,

    /// Set exactly once, on the voter's successful ballot
    pub has_voted: bool,

    /// Verification state
    pub status: VoterStatus,
}

impl Voter {
    /// Create a pending voter with a fresh id
    pub fn from_registration(registration: VoterRegistration) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: registration.name,
            email: registration.email,
            national_id: registration.national_id,
            credential_hash: registration.credential_hash,
            registered_at: Utc::now(),
            has_voted: false,
            status: VoterStatus::PendingVerification,
        }
    }

    /// Verified and has not voted yet
    pub fn is_eligible(&self) -> bool {
        self.status == VoterStatus::Verified && !self.has_voted
    }

    pub(crate) fn mark_voted(&mut self) {
        self.has_voted = true;
    }
}

/// An immutable cast ballot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub voter_id: VoterId,
    pub candidate_id: CandidateId,
    pub cast_at: DateTime<Utc>,
    /// Where the ballot was cast (e.g. `ONLINE`)
    pub station: String,
}

impl Vote {
    pub fn new(voter_id: VoterId, candidate_id: CandidateId, station: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            voter_id,
            candidate_id,
            cast_at: Utc::now(),
            station: station.into(),
        }
    }
}

/// Counters readable in every phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionStatistics {
    pub total_voters: usize,
    pub total_votes: usize,
    /// `total_votes / total_voters * 100`, or `0.0` with no voters
    pub turnout_percentage: f64,
    pub total_candidates: usize,
    pub status: ElectionStatus,
}

impl ElectionStatistics {
    pub fn new(
        total_voters: usize,
        total_votes: usize,
        total_candidates: usize,
        status: ElectionStatus,
    ) -> Self {
        Self {
            total_voters,
            total_votes,
            turnout_percentage: percentage(total_votes as u64, total_voters as u64),
            total_candidates,
            status,
        }
    }
}

/// Final tally for a single candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub candidate_id: CandidateId,

    /// Display name; may collide with another candidate's
    pub candidate_name: String,

    pub party: String,

    pub vote_count: u64,

    /// Share of all votes cast, `0.0` when nobody voted
    pub percentage: f64,
}

/// Final election tally
///
/// Results are keyed by candidate id so that candidates sharing a display
/// name keep separate counts. Use [`ElectionResults::by_name`] to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionResults {
    pub election_name: String,
    pub total_votes: u64,
    pub results: BTreeMap<CandidateId, CandidateResult>,
}

impl ElectionResults {
    /// Build results from the candidate registry
    pub fn tally<'a>(
        election_name: impl Into<String>,
        candidates: impl IntoIterator<Item = &'a Candidate>,
    ) -> Self {
        let candidates: Vec<&Candidate> = candidates.into_iter().collect();
        let total_votes: u64 = candidates.iter().map(|c| c.vote_count).sum();

        let results = candidates
            .into_iter()
            .map(|c| {
                (
                    c.id,
                    CandidateResult {
                        candidate_id: c.id,
                        candidate_name: c.name.clone(),
                        party: c.party.clone(),
                        vote_count: c.vote_count,
                        percentage: percentage(c.vote_count, total_votes),
                    },
                )
            })
            .collect();

        Self {
            election_name: election_name.into(),
            total_votes,
            results,
        }
    }

    /// Vote count for one candidate
    pub fn count_for(&self, candidate_id: &CandidateId) -> Option<u64> {
        self.results.get(candidate_id).map(|r| r.vote_count)
    }

    /// `(name, count)` pairs for display, ordered by name then id
    ///
    /// Duplicate names appear as separate entries.
    pub fn by_name(&self) -> Vec<(String, u64)> {
        let mut rows: Vec<&CandidateResult> = self.results.values().collect();
        rows.sort_by(|a, b| {
            a.candidate_name
                .cmp(&b.candidate_name)
                .then(a.candidate_id.cmp(&b.candidate_id))
        });
        rows.into_iter()
            .map(|r| (r.candidate_name.clone(), r.vote_count))
            .collect()
    }

    /// All candidates sharing the highest count
    ///
    /// Empty when there are no candidates or no votes were cast.
    pub fn winners(&self) -> Vec<&CandidateResult> {
        let Some(max) = self.results.values().map(|r| r.vote_count).max() else {
            return Vec::new();
        };
        if max == 0 {
            return Vec::new();
        }
        self.results
            .values()
            .filter(|r| r.vote_count == max)
            .collect()
    }
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

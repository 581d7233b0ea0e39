//! Election lifecycle, registries and vote casting
//!
//! An [`Election`] is an explicit context object: each instance owns its
//! candidates, voters and ballots, so any number of elections can coexist in
//! one process.
//!
//! Concurrency model:
//! 1. All state lives behind one `RwLock` per election
//! 2. Every mutating operation holds the write guard for its whole duration,
//!    so registration, verification, status changes and vote casting are
//!    serialized against each other
//! 3. Read paths share the read guard and always see a consistent snapshot
//! 4. Each operation validates everything before it mutates anything, so a
//!    failure leaves the election exactly as it was

use crate::audit::{ActionLogger, ElectionLogger};
use crate::config::ElectionConfig;
use crate::types::{
    Candidate, CandidateId, ElectionResults, ElectionStatistics, ElectionStatus, NewCandidate,
    Vote, Voter, VoterId, VoterRegistration, VoterStatus,
};
use crate::validation;
use crate::{Error, Result, conflict_error, internal_error};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug)]
struct ElectionState {
    status: ElectionStatus,
    candidates: HashMap<CandidateId, Candidate>,
    voters: HashMap<VoterId, Voter>,
    /// national id -> voter id
    national_ids: HashMap<String, VoterId>,
    /// lowercased email -> voter id
    emails: HashMap<String, VoterId>,
    /// Append-only
    votes: Vec<Vote>,
}

impl ElectionState {
    fn new() -> Self {
        Self {
            status: ElectionStatus::Setup,
            candidates: HashMap::new(),
            voters: HashMap::new(),
            national_ids: HashMap::new(),
            emails: HashMap::new(),
            votes: Vec::new(),
        }
    }
}

/// A single election
pub struct Election {
    name: String,
    scheduled_for: DateTime<Utc>,
    state: RwLock<ElectionState>,
    logger: Arc<dyn ActionLogger>,
}

impl Election {
    /// Create an election in `SETUP`
    pub fn new(
        name: impl Into<String>,
        scheduled_for: DateTime<Utc>,
        logger: Arc<dyn ActionLogger>,
    ) -> Self {
        let name = name.into();
        tracing::info!("🗳️  Election '{}' created for {}", name, scheduled_for);
        Self {
            name,
            scheduled_for,
            state: RwLock::new(ElectionState::new()),
            logger,
        }
    }

    pub fn from_config(config: &ElectionConfig, logger: Arc<dyn ActionLogger>) -> Self {
        Self::new(config.name.clone(), config.scheduled_for, logger)
    }

    /// Create for testing with an in-memory audit log
    pub fn for_testing() -> (Self, Arc<ElectionLogger>) {
        let logger = Arc::new(ElectionLogger::new());
        let election = Self::from_config(&ElectionConfig::for_testing(), logger.clone());
        (election, logger)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scheduled_for(&self) -> DateTime<Utc> {
        self.scheduled_for
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, ElectionState>> {
        self.state
            .read()
            .map_err(|_| internal_error!("Election state read error"))
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, ElectionState>> {
        self.state
            .write()
            .map_err(|_| internal_error!("Election state write error"))
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub fn status(&self) -> Result<ElectionStatus> {
        Ok(self.read_state()?.status)
    }

    /// `SETUP -> REGISTRATION_OPEN`
    pub fn open_registration(&self) -> Result<()> {
        self.advance("open registration", ElectionStatus::RegistrationOpen, "Voter registration opened")
    }

    /// `REGISTRATION_OPEN -> VOTING_OPEN`
    pub fn open_voting(&self) -> Result<()> {
        self.advance("open voting", ElectionStatus::VotingOpen, "Voting opened")
    }

    /// `VOTING_OPEN -> CLOSED`
    pub fn close_election(&self) -> Result<()> {
        self.advance("close election", ElectionStatus::Closed, "Election closed")
    }

    fn advance(&self, operation: &str, target: ElectionStatus, audit_message: &str) -> Result<()> {
        let mut state = self.write_state()?;

        let required = target
            .predecessor()
            .ok_or_else(|| internal_error!("{} has no predecessor", target))?;
        validation::validate_election_status(operation, state.status, required).inspect_err(|e| {
            tracing::warn!("⛔ Rejected {}: {}", operation, e);
        })?;

        state.status = target;
        self.logger.log_action(audit_message);
        tracing::info!("🔄 Election '{}' moved {} -> {}", self.name, required, target);
        Ok(())
    }

    // =========================================================================
    // Candidate registry
    // =========================================================================

    /// Add a candidate during `SETUP`
    ///
    /// Candidate names are not deduplicated.
    pub fn add_candidate(&self, registration: NewCandidate) -> Result<CandidateId> {
        let mut state = self.write_state()?;
        validation::validate_election_status("add candidate", state.status, ElectionStatus::Setup)?;
        validation::validate_new_candidate(&registration)?;

        let candidate = Candidate::from_registration(registration);
        let id = candidate.id;
        self.logger
            .log_action(&format!("Added candidate: {}", candidate.name));
        tracing::debug!("Candidate {} registered as {}", candidate.name, id);
        state.candidates.insert(id, candidate);
        Ok(id)
    }

    pub fn candidate(&self, id: &CandidateId) -> Result<Candidate> {
        self.read_state()?
            .candidates
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found("Candidate", id))
    }

    /// All candidates, ordered by name then id
    pub fn candidates(&self) -> Result<Vec<Candidate>> {
        let state = self.read_state()?;
        let mut candidates: Vec<Candidate> = state.candidates.values().cloned().collect();
        candidates.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(candidates)
    }

    /// Up to `limit` candidates by descending vote count, ties by ascending id
    pub fn get_top_candidates(&self, limit: usize) -> Result<Vec<Candidate>> {
        let state = self.read_state()?;
        let mut ranked: Vec<&Candidate> = state.candidates.values().collect();
        ranked.sort_by(|a, b| b.vote_count.cmp(&a.vote_count).then(a.id.cmp(&b.id)));
        Ok(ranked.into_iter().take(limit).cloned().collect())
    }

    // =========================================================================
    // Voter registry
    // =========================================================================

    /// Register a voter during `REGISTRATION_OPEN`
    ///
    /// The voter starts `PENDING_VERIFICATION` and cannot vote until
    /// [`Election::verify_voter`] is called.
    pub fn register_voter(&self, registration: VoterRegistration) -> Result<VoterId> {
        let mut state = self.write_state()?;
        validation::validate_election_status(
            "register voter",
            state.status,
            ElectionStatus::RegistrationOpen,
        )?;
        validation::validate_registration(
            &registration.name,
            &registration.email,
            &registration.national_id,
        )?;

        let national_id = registration.national_id.trim().to_string();
        if state.national_ids.contains_key(&national_id) {
            tracing::warn!("⛔ Duplicate registration for national id");
            return Err(conflict_error!("Voter already registered"));
        }

        let email = registration.email.trim().to_string();
        let key = email_key(&email);
        if state.emails.contains_key(&key) {
            tracing::warn!("⛔ Duplicate registration for email");
            return Err(conflict_error!("Email {} is already registered", email));
        }

        let voter = Voter::from_registration(VoterRegistration {
            national_id: national_id.clone(),
            email,
            ..registration
        });
        let id = voter.id;
        self.logger
            .log_action(&format!("Registered voter: {}", voter.name));
        state.national_ids.insert(national_id, id);
        state.emails.insert(key, id);
        state.voters.insert(id, voter);
        Ok(id)
    }

    /// Administrative approval: `PENDING_VERIFICATION -> VERIFIED`
    pub fn verify_voter(&self, voter_id: &VoterId) -> Result<()> {
        let mut state = self.write_state()?;
        validation::validate_not_closed("verify voter", state.status)?;

        let voter = state
            .voters
            .get_mut(voter_id)
            .ok_or_else(|| Error::not_found("Voter", voter_id))?;

        match voter.status {
            VoterStatus::PendingVerification => {}
            VoterStatus::Verified => return Err(conflict_error!("Voter {} is already verified", voter_id)),
            VoterStatus::Blocked => return Err(conflict_error!("Voter {} is blocked", voter_id)),
        }

        voter.status = VoterStatus::Verified;
        self.logger
            .log_action(&format!("Verified voter ID: {voter_id}"));
        Ok(())
    }

    /// Administrative block; a blocked voter can no longer vote or log in
    pub fn block_voter(&self, voter_id: &VoterId) -> Result<()> {
        let mut state = self.write_state()?;
        validation::validate_not_closed("block voter", state.status)?;

        let voter = state
            .voters
            .get_mut(voter_id)
            .ok_or_else(|| Error::not_found("Voter", voter_id))?;

        if voter.status == VoterStatus::Blocked {
            return Err(conflict_error!("Voter {} is already blocked", voter_id));
        }

        voter.status = VoterStatus::Blocked;
        self.logger
            .log_action(&format!("Blocked voter ID: {voter_id}"));
        Ok(())
    }

    pub fn voter(&self, id: &VoterId) -> Result<Voter> {
        self.read_state()?
            .voters
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found("Voter", id))
    }

    /// Case-insensitive email lookup
    pub fn find_voter_by_email(&self, email: &str) -> Result<Voter> {
        let state = self.read_state()?;
        state
            .emails
            .get(&email_key(email))
            .and_then(|id| state.voters.get(id))
            .cloned()
            .ok_or_else(|| Error::not_found("Voter", email.trim()))
    }

    pub fn find_voter_by_national_id(&self, national_id: &str) -> Result<Voter> {
        let state = self.read_state()?;
        state
            .national_ids
            .get(national_id.trim())
            .and_then(|id| state.voters.get(id))
            .cloned()
            .ok_or_else(|| Error::not_found("Voter", national_id))
    }

    pub fn has_voted(&self, voter_id: &VoterId) -> Result<bool> {
        Ok(self.voter(voter_id)?.has_voted)
    }

    // =========================================================================
    // Vote casting
    // =========================================================================

    /// Cast a ballot
    ///
    /// Checks, in order: the election is `VOTING_OPEN`, the voter exists, the
    /// voter is verified and has not voted, the candidate exists. Only then
    /// is the vote recorded, the voter marked and the tally advanced, all
    /// under the same write guard.
    pub fn cast_vote(
        &self,
        voter_id: &VoterId,
        candidate_id: &CandidateId,
        station: &str,
    ) -> Result<()> {
        let mut guard = self.write_state()?;
        let state = &mut *guard;

        Self::check_ballot(state, voter_id, candidate_id).inspect_err(|e| {
            tracing::warn!("⛔ Vote rejected for voter {}: {}", voter_id, e);
        })?;

        let (Some(voter), Some(candidate)) = (
            state.voters.get_mut(voter_id),
            state.candidates.get_mut(candidate_id),
        ) else {
            return Err(internal_error!("Ballot participants vanished after validation"));
        };

        state.votes.push(Vote::new(*voter_id, *candidate_id, station));
        voter.mark_voted();
        candidate.record_vote();

        self.logger
            .log_action(&format!("Vote cast by voter ID: {voter_id}"));
        tracing::info!("🗳️ Vote recorded: voter={}, station={}", voter_id, station);
        Ok(())
    }

    fn check_ballot(
        state: &ElectionState,
        voter_id: &VoterId,
        candidate_id: &CandidateId,
    ) -> Result<()> {
        validation::validate_election_status("cast vote", state.status, ElectionStatus::VotingOpen)?;
        validation::validate_voter(state.voters.get(voter_id), voter_id)?;
        validation::validate_candidate(state.candidates.get(candidate_id), candidate_id)?;
        Ok(())
    }

    /// Snapshot of every ballot cast so far, in casting order
    pub fn votes(&self) -> Result<Vec<Vote>> {
        Ok(self.read_state()?.votes.clone())
    }

    // =========================================================================
    // Results & statistics
    // =========================================================================

    /// Final tally, available once the election is `CLOSED`
    pub fn get_results(&self) -> Result<ElectionResults> {
        let state = self.read_state()?;
        validation::validate_election_status("read results", state.status, ElectionStatus::Closed)?;
        Ok(ElectionResults::tally(&self.name, state.candidates.values()))
    }

    /// Current counters; valid in every phase
    pub fn get_statistics(&self) -> Result<ElectionStatistics> {
        let state = self.read_state()?;
        Ok(ElectionStatistics::new(
            state.voters.len(),
            state.votes.len(),
            state.candidates.len(),
            state.status,
        ))
    }
}

/// Key for the email index
fn email_key(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

impl std::fmt::Debug for Election {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Election")
            .field("name", &self.name)
            .field("scheduled_for", &self.scheduled_for)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StatusRequirement;

    fn registration(national_id: &str) -> VoterRegistration {
        VoterRegistration {
            name: format!("Voter {national_id}"),
            email: format!("{national_id}@example.org"),
            national_id: national_id.to_string(),
            credential_hash: "hash".to_string(),
        }
    }

    /// Election in VOTING_OPEN with two candidates and one verified voter
    fn voting_election() -> (Election, CandidateId, CandidateId, VoterId) {
        let (election, _) = Election::for_testing();
        let a = election.add_candidate(NewCandidate::new("A", "Party A")).unwrap();
        let b = election.add_candidate(NewCandidate::new("B", "Party B")).unwrap();
        election.open_registration().unwrap();
        let v = election.register_voter(registration("N-1")).unwrap();
        election.verify_voter(&v).unwrap();
        election.open_voting().unwrap();
        (election, a, b, v)
    }

    #[test]
    fn test_transitions_follow_lifecycle() {
        let (election, logger) = Election::for_testing();
        assert_eq!(election.status().unwrap(), ElectionStatus::Setup);

        // Skipping ahead is refused
        assert!(matches!(
            election.open_voting(),
            Err(Error::InvalidStateTransition { .. })
        ));
        assert!(election.close_election().is_err());
        assert_eq!(election.status().unwrap(), ElectionStatus::Setup);

        election.open_registration().unwrap();
        assert!(election.open_registration().is_err());
        election.open_voting().unwrap();
        election.close_election().unwrap();
        assert_eq!(election.status().unwrap(), ElectionStatus::Closed);

        // Terminal
        for result in [
            election.open_registration(),
            election.open_voting(),
            election.close_election(),
        ] {
            assert!(matches!(result, Err(Error::InvalidStateTransition { .. })));
        }
        assert_eq!(election.status().unwrap(), ElectionStatus::Closed);

        let messages: Vec<String> = logger
            .entries()
            .unwrap()
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(
            messages,
            vec!["Voter registration opened", "Voting opened", "Election closed"]
        );
    }

    #[test]
    fn test_candidates_only_in_setup() {
        let (election, _) = Election::for_testing();
        election.add_candidate(NewCandidate::new("A", "P")).unwrap();
        election.open_registration().unwrap();

        let err = election.add_candidate(NewCandidate::new("B", "P")).unwrap_err();
        assert!(matches!(err, Error::InvalidStateTransition { .. }));
        assert_eq!(election.candidates().unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_candidate_names_allowed() {
        let (election, _) = Election::for_testing();
        let first = election.add_candidate(NewCandidate::new("Sam", "P")).unwrap();
        let second = election.add_candidate(NewCandidate::new("Sam", "Q")).unwrap();
        assert_ne!(first, second);
        assert_eq!(election.candidates().unwrap().len(), 2);
    }

    #[test]
    fn test_duplicate_national_id_conflicts() {
        let (election, _) = Election::for_testing();
        election.open_registration().unwrap();
        election.register_voter(registration("N-1")).unwrap();

        let mut dup = registration("N-1");
        dup.national_id = " N-1 ".to_string();
        dup.email = "other@example.org".to_string();
        assert!(matches!(
            election.register_voter(dup),
            Err(Error::Conflict { .. })
        ));
        assert_eq!(election.get_statistics().unwrap().total_voters, 1);
    }

    #[test]
    fn test_registration_only_while_open() {
        let (election, _) = Election::for_testing();
        assert!(matches!(
            election.register_voter(registration("N-1")),
            Err(Error::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_verification_rules() {
        let (election, _) = Election::for_testing();
        election.open_registration().unwrap();
        let v = election.register_voter(registration("N-1")).unwrap();
        assert_eq!(
            election.voter(&v).unwrap().status,
            VoterStatus::PendingVerification
        );

        election.verify_voter(&v).unwrap();
        assert_eq!(election.voter(&v).unwrap().status, VoterStatus::Verified);
        assert!(matches!(election.verify_voter(&v), Err(Error::Conflict { .. })));

        election.block_voter(&v).unwrap();
        assert!(matches!(election.verify_voter(&v), Err(Error::Conflict { .. })));
        assert!(matches!(
            election.verify_voter(&uuid::Uuid::new_v4()),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_cast_vote_commits_all_effects() {
        let (election, a, b, v) = voting_election();
        election.cast_vote(&v, &a, "STATION-1").unwrap();

        assert!(election.has_voted(&v).unwrap());
        assert_eq!(election.candidate(&a).unwrap().vote_count, 1);
        assert_eq!(election.candidate(&b).unwrap().vote_count, 0);

        let votes = election.votes().unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].voter_id, v);
        assert_eq!(votes[0].candidate_id, a);
        assert_eq!(votes[0].station, "STATION-1");
    }

    #[test]
    fn test_second_vote_rejected() {
        let (election, a, b, v) = voting_election();
        election.cast_vote(&v, &a, "ONLINE").unwrap();

        let err = election.cast_vote(&v, &b, "ONLINE").unwrap_err();
        assert!(matches!(err, Error::AlreadyVoted { .. }));
        assert!(err.is_voter_ineligible());
        assert_eq!(election.candidate(&b).unwrap().vote_count, 0);
        assert_eq!(election.votes().unwrap().len(), 1);
    }

    #[test]
    fn test_unverified_voter_rejected() {
        let (election, _) = Election::for_testing();
        let a = election.add_candidate(NewCandidate::new("A", "P")).unwrap();
        election.open_registration().unwrap();
        let v = election.register_voter(registration("N-1")).unwrap();
        election.open_voting().unwrap();

        assert!(matches!(
            election.cast_vote(&v, &a, "ONLINE"),
            Err(Error::VoterIneligible { .. })
        ));
        assert!(!election.has_voted(&v).unwrap());
    }

    #[test]
    fn test_unknown_candidate_leaves_voter_untouched() {
        let (election, _, _, v) = voting_election();
        let err = election
            .cast_vote(&v, &uuid::Uuid::new_v4(), "ONLINE")
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { ref entity, .. } if entity == "Candidate"));
        assert!(!election.has_voted(&v).unwrap());
        assert!(election.votes().unwrap().is_empty());
    }

    #[test]
    fn test_top_candidates_tie_break_by_id() {
        let (election, _, b, v) = voting_election();
        election.cast_vote(&v, &b, "ONLINE").unwrap();

        let top = election.get_top_candidates(1).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].id, b);

        // Equal tallies fall back to id order
        let (tied, x, y, _) = voting_election();
        let ranked = tied.get_top_candidates(10).unwrap();
        let expected = if x < y { vec![x, y] } else { vec![y, x] };
        assert_eq!(ranked.iter().map(|c| c.id).collect::<Vec<_>>(), expected);

        assert!(election.get_top_candidates(0).unwrap().is_empty());
    }

    #[test]
    fn test_results_only_when_closed() {
        let (election, a, b, v) = voting_election();
        assert!(matches!(
            election.get_results(),
            Err(Error::InvalidStateTransition { .. })
        ));

        election.cast_vote(&v, &a, "ONLINE").unwrap();
        election.close_election().unwrap();

        let results = election.get_results().unwrap();
        assert_eq!(results.count_for(&a), Some(1));
        assert_eq!(results.count_for(&b), Some(0));
        assert_eq!(
            results.by_name(),
            vec![("A".to_string(), 1), ("B".to_string(), 0)]
        );
    }

    #[test]
    fn test_voter_lookups() {
        let (election, _) = Election::for_testing();
        election.open_registration().unwrap();
        let v = election.register_voter(registration("N-7")).unwrap();

        assert_eq!(election.find_voter_by_email("N-7@EXAMPLE.org").unwrap().id, v);
        assert_eq!(election.find_voter_by_national_id("N-7").unwrap().id, v);
        assert!(election.find_voter_by_email("nobody@example.org").is_err());
    }

    #[test]
    fn test_admin_actions_refused_after_close() {
        let (election, _, _, v) = voting_election();
        election.close_election().unwrap();

        for result in [election.verify_voter(&v), election.block_voter(&v)] {
            assert!(matches!(
                result,
                Err(Error::InvalidStateTransition {
                    required: StatusRequirement::NotClosed,
                    current: ElectionStatus::Closed,
                    ..
                })
            ));
        }
        assert_eq!(election.voter(&v).unwrap().status, VoterStatus::Verified);
    }

    #[test]
    fn test_duplicate_email_conflicts() {
        let (election, _) = Election::for_testing();
        election.open_registration().unwrap();
        let first = election.register_voter(registration("N-1")).unwrap();

        let mut dup = registration("N-2");
        dup.email = " N-1@Example.ORG ".to_string();
        assert!(matches!(
            election.register_voter(dup),
            Err(Error::Conflict { .. })
        ));
        assert_eq!(election.get_statistics().unwrap().total_voters, 1);
        assert!(election.find_voter_by_national_id("N-2").is_err());
        assert_eq!(election.find_voter_by_email("n-1@example.org").unwrap().id, first);
    }
}

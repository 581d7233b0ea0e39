//! Precondition checks shared by the election operations
//!
//! Every function here is pure: it inspects its arguments and either returns
//! `Ok` or the specific [`Error`] the caller should propagate.

use crate::types::{
    Candidate, CandidateId, ElectionStatus, NewCandidate, StatusRequirement, Voter, VoterId,
    VoterStatus,
};
use crate::{Error, Result};

/// Require the election to be in exactly `required`
pub fn validate_election_status(
    operation: &str,
    current: ElectionStatus,
    required: ElectionStatus,
) -> Result<()> {
    if !StatusRequirement::Exactly(required).is_met_by(current) {
        return Err(Error::invalid_state(operation, required, current));
    }
    Ok(())
}

/// Require the election not to have closed yet
pub fn validate_not_closed(operation: &str, current: ElectionStatus) -> Result<()> {
    if !StatusRequirement::NotClosed.is_met_by(current) {
        return Err(Error::election_closed(operation));
    }
    Ok(())
}

/// Resolve a voter and check they may cast a ballot
///
/// Already having voted is reported ahead of other ineligibility so callers
/// can distinguish a repeat attempt.
pub fn validate_voter<'a>(voter: Option<&'a Voter>, voter_id: &VoterId) -> Result<&'a Voter> {
    let voter = voter.ok_or_else(|| Error::not_found("Voter", voter_id))?;

    if voter.has_voted {
        return Err(Error::already_voted(voter_id));
    }

    match voter.status {
        VoterStatus::Verified => Ok(voter),
        VoterStatus::PendingVerification => Err(Error::ineligible(voter_id, "voter is not verified")),
        VoterStatus::Blocked => Err(Error::ineligible(voter_id, "voter is blocked")),
    }
}

/// Resolve a candidate
pub fn validate_candidate<'a>(
    candidate: Option<&'a Candidate>,
    candidate_id: &CandidateId,
) -> Result<&'a Candidate> {
    candidate.ok_or_else(|| Error::not_found("Candidate", candidate_id))
}

/// Field checks for a new candidate
pub fn validate_new_candidate(candidate: &NewCandidate) -> Result<()> {
    require_non_empty("name", &candidate.name)?;
    require_non_empty("party", &candidate.party)?;
    Ok(())
}

/// Field checks for a voter registration
pub fn validate_registration(name: &str, email: &str, national_id: &str) -> Result<()> {
    require_non_empty("name", name)?;
    require_non_empty("national_id", national_id)?;
    validate_email(email)
}

/// Minimal shape check: exactly one `@` with text on both sides
pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(Error::validation("email")),
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(field));
    }
    Ok(())
}

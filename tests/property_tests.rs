//! Property-based tests for lifecycle and tally invariants

use election::{
    Election, Error,
    types::{ElectionStatus, NewCandidate, VoterRegistration},
};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Transition {
    OpenRegistration,
    OpenVoting,
    Close,
}

fn transition_strategy() -> impl Strategy<Value = Transition> {
    prop_oneof![
        Just(Transition::OpenRegistration),
        Just(Transition::OpenVoting),
        Just(Transition::Close),
    ]
}

proptest! {
    #[test]
    fn status_only_moves_forward(steps in prop::collection::vec(transition_strategy(), 0..20)) {
        let (election, _) = Election::for_testing();

        for step in steps {
            let before = election.status().unwrap();
            let (result, target) = match step {
                Transition::OpenRegistration => (election.open_registration(), ElectionStatus::RegistrationOpen),
                Transition::OpenVoting => (election.open_voting(), ElectionStatus::VotingOpen),
                Transition::Close => (election.close_election(), ElectionStatus::Closed),
            };
            let after = election.status().unwrap();

            if before.next() == Some(target) {
                prop_assert!(result.is_ok());
                prop_assert_eq!(after, target);
            } else {
                let is_state_error = matches!(result, Err(Error::InvalidStateTransition { .. }));
                prop_assert!(is_state_error);
                prop_assert_eq!(after, before);
            }
            prop_assert!(after >= before);
        }
    }

    #[test]
    fn tallies_match_ballots(
        candidate_count in 1usize..5,
        ballots in prop::collection::vec((0usize..8, 0usize..5), 0..40),
    ) {
        let (election, _) = Election::for_testing();
        let candidates: Vec<_> = (0..candidate_count)
            .map(|i| election.add_candidate(NewCandidate::new(format!("C{i}"), "P")).unwrap())
            .collect();

        election.open_registration().unwrap();
        let voters: Vec<_> = (0..8)
            .map(|i| {
                let id = election
                    .register_voter(VoterRegistration {
                        name: format!("V{i}"),
                        email: format!("v{i}@example.org"),
                        national_id: format!("N{i}"),
                        credential_hash: String::new(),
                    })
                    .unwrap();
                // Odd voters stay unverified
                if i % 2 == 0 {
                    election.verify_voter(&id).unwrap();
                }
                id
            })
            .collect();
        election.open_voting().unwrap();

        for (voter_index, candidate_index) in ballots {
            let candidate = candidates[candidate_index % candidate_count];
            let tally_before = election.candidate(&candidate).unwrap().vote_count;
            let result = election.cast_vote(&voters[voter_index], &candidate, "ONLINE");
            let tally_after = election.candidate(&candidate).unwrap().vote_count;

            match result {
                Ok(()) => prop_assert_eq!(tally_after, tally_before + 1),
                Err(e) => {
                    prop_assert!(e.is_voter_ineligible());
                    prop_assert_eq!(tally_after, tally_before);
                }
            }
        }

        let votes = election.votes().unwrap();
        for candidate in election.candidates().unwrap() {
            let referencing = votes.iter().filter(|v| v.candidate_id == candidate.id).count() as u64;
            prop_assert_eq!(candidate.vote_count, referencing);
        }
        for voter_id in &voters {
            let referencing = votes.iter().filter(|v| v.voter_id == *voter_id).count();
            let has_voted = election.has_voted(voter_id).unwrap();
            prop_assert!(referencing <= 1);
            prop_assert_eq!(has_voted, referencing == 1);
        }
    }

    #[test]
    fn turnout_is_bounded(voter_count in 0usize..12, voting in 0usize..12) {
        let (election, _) = Election::for_testing();
        let candidate = election.add_candidate(NewCandidate::new("C", "P")).unwrap();
        election.open_registration().unwrap();
        let voters: Vec<_> = (0..voter_count)
            .map(|i| {
                let id = election
                    .register_voter(VoterRegistration {
                        name: format!("V{i}"),
                        email: format!("v{i}@example.org"),
                        national_id: format!("N{i}"),
                        credential_hash: String::new(),
                    })
                    .unwrap();
                election.verify_voter(&id).unwrap();
                id
            })
            .collect();
        election.open_voting().unwrap();
        for voter in voters.iter().take(voting) {
            election.cast_vote(voter, &candidate, "ONLINE").unwrap();
        }

        let stats = election.get_statistics().unwrap();
        let expected = if voter_count == 0 {
            0.0
        } else {
            voting.min(voter_count) as f64 / voter_count as f64 * 100.0
        };
        prop_assert_eq!(stats.turnout_percentage, expected);
        prop_assert!((0.0..=100.0).contains(&stats.turnout_percentage));
    }
}

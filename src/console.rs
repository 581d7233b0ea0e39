//! Menu-driven console front end
//!
//! Drives an [`Election`] and a [`SessionService`] over any line-oriented
//! input and output. Domain errors are printed and the menu loop carries
//! on; only I/O failures end the session early. End of input exits cleanly.

use crate::auth::{SessionService, SessionToken};
use crate::types::{CandidateId, NewCandidate, VoterRegistration};
use crate::{Election, Error, Result};
use std::io::{BufRead, Write};

/// Station label recorded for ballots cast through the console
pub const CONSOLE_STATION: &str = "ONLINE";

enum Flow {
    Continue,
    Exit,
}

/// Interactive console session
pub struct Console<'a, R, W> {
    election: &'a Election,
    sessions: &'a SessionService,
    input: R,
    output: W,
    session: Option<SessionToken>,
}

impl<'a, R: BufRead, W: Write> Console<'a, R, W> {
    pub fn new(election: &'a Election, sessions: &'a SessionService, input: R, output: W) -> Self {
        Self {
            election,
            sessions,
            input,
            output,
            session: None,
        }
    }

    /// Run the main menu until the user exits or input ends
    pub fn run(&mut self) -> Result<()> {
        loop {
            writeln!(self.output, "\n=== {} ===", self.election.name())?;
            writeln!(self.output, "1. Admin Access")?;
            writeln!(self.output, "2. Voter Access")?;
            writeln!(self.output, "3. View Results")?;
            writeln!(self.output, "4. Exit")?;

            let Some(choice) = self.prompt("Choose an option: ")? else {
                return Ok(());
            };
            let outcome = match choice.as_str() {
                "1" => self.admin_menu(),
                "2" => self.voter_menu(),
                "3" => self.view_results(),
                "4" => {
                    writeln!(self.output, "Exiting system...")?;
                    return Ok(());
                }
                _ => self.invalid_choice(),
            };
            if let Flow::Exit = self.settle(outcome)? {
                return Ok(());
            }
        }
    }

    fn admin_menu(&mut self) -> Result<Flow> {
        loop {
            writeln!(self.output, "\n=== Admin Menu ===")?;
            writeln!(self.output, "1. Add Candidate")?;
            writeln!(self.output, "2. View All Candidates")?;
            writeln!(self.output, "3. Open Registration")?;
            writeln!(self.output, "4. Open Voting")?;
            writeln!(self.output, "5. Close Election")?;
            writeln!(self.output, "6. View Statistics")?;
            writeln!(self.output, "7. Verify Voter")?;
            writeln!(self.output, "8. Back to Main Menu")?;

            let Some(choice) = self.prompt("Choose an option: ")? else {
                return Ok(Flow::Exit);
            };
            let outcome = match choice.as_str() {
                "1" => self.add_candidate(),
                "2" => self.view_candidates(),
                "3" => self.transition(Election::open_registration, "Registration opened."),
                "4" => self.transition(Election::open_voting, "Voting opened."),
                "5" => self.transition(Election::close_election, "Election closed."),
                "6" => self.view_statistics(),
                "7" => self.verify_voter(),
                "8" => return Ok(Flow::Continue),
                _ => self.invalid_choice(),
            };
            if let Flow::Exit = self.settle(outcome)? {
                return Ok(Flow::Exit);
            }
        }
    }

    fn voter_menu(&mut self) -> Result<Flow> {
        loop {
            writeln!(self.output, "\n=== Voter Menu ===")?;
            writeln!(self.output, "1. Register to Vote")?;
            writeln!(self.output, "2. Login")?;
            writeln!(self.output, "3. Cast Vote")?;
            writeln!(self.output, "4. Logout")?;
            writeln!(self.output, "5. Back to Main Menu")?;

            let Some(choice) = self.prompt("Choose an option: ")? else {
                return Ok(Flow::Exit);
            };
            let outcome = match choice.as_str() {
                "1" => self.register_voter(),
                "2" => self.login(),
                "3" => self.cast_vote(),
                "4" => self.logout(),
                "5" => return Ok(Flow::Continue),
                _ => self.invalid_choice(),
            };
            if let Flow::Exit = self.settle(outcome)? {
                return Ok(Flow::Exit);
            }
        }
    }

    /// Print domain errors and keep going; propagate I/O errors
    fn settle(&mut self, outcome: Result<Flow>) -> Result<Flow> {
        match outcome {
            Ok(flow) => Ok(flow),
            Err(Error::Io(e)) => Err(Error::Io(e)),
            Err(e) => {
                writeln!(self.output, "Error: {e}")?;
                Ok(Flow::Continue)
            }
        }
    }

    fn invalid_choice(&mut self) -> Result<Flow> {
        writeln!(self.output, "Invalid choice. Please try again.")?;
        Ok(Flow::Continue)
    }

    fn transition(&mut self, step: fn(&Election) -> Result<()>, done: &str) -> Result<Flow> {
        step(self.election)?;
        writeln!(self.output, "{done}")?;
        Ok(Flow::Continue)
    }

    fn add_candidate(&mut self) -> Result<Flow> {
        writeln!(self.output, "\n=== Add New Candidate ===")?;
        let Some(name) = self.prompt("Enter candidate name: ")? else { return Ok(Flow::Exit) };
        let Some(party) = self.prompt("Enter party: ")? else { return Ok(Flow::Exit) };
        let Some(manifesto) = self.prompt("Enter manifesto: ")? else { return Ok(Flow::Exit) };
        let Some(image_url) = self.prompt("Enter image URL: ")? else { return Ok(Flow::Exit) };
        let Some(background) = self.prompt("Enter background: ")? else { return Ok(Flow::Exit) };

        let id = self.election.add_candidate(
            NewCandidate::new(name, party)
                .with_manifesto(manifesto)
                .with_image_url(image_url)
                .with_background(background),
        )?;
        writeln!(self.output, "Candidate added successfully! ID: {id}")?;
        Ok(Flow::Continue)
    }

    fn view_candidates(&mut self) -> Result<Flow> {
        writeln!(self.output, "\n=== Candidates ===")?;
        let candidates = self.election.candidates()?;
        if candidates.is_empty() {
            writeln!(self.output, "No candidates registered.")?;
        }
        for candidate in candidates {
            writeln!(self.output, "[{}] {}", candidate.id, candidate)?;
        }
        Ok(Flow::Continue)
    }

    fn view_statistics(&mut self) -> Result<Flow> {
        let stats = self.election.get_statistics()?;
        writeln!(self.output, "\n=== Election Statistics ===")?;
        writeln!(self.output, "Total Voters: {}", stats.total_voters)?;
        writeln!(self.output, "Total Votes: {}", stats.total_votes)?;
        writeln!(self.output, "Turnout: {:.2}%", stats.turnout_percentage)?;
        writeln!(self.output, "Total Candidates: {}", stats.total_candidates)?;
        writeln!(self.output, "Election Status: {}", stats.status)?;
        Ok(Flow::Continue)
    }

    fn verify_voter(&mut self) -> Result<Flow> {
        let Some(national_id) = self.prompt("Enter voter national ID: ")? else {
            return Ok(Flow::Exit);
        };
        let voter = self.election.find_voter_by_national_id(&national_id)?;
        self.election.verify_voter(&voter.id)?;
        writeln!(self.output, "Voter {} verified.", voter.name)?;
        Ok(Flow::Continue)
    }

    fn register_voter(&mut self) -> Result<Flow> {
        writeln!(self.output, "\n=== Voter Registration ===")?;
        let Some(name) = self.prompt("Enter your name: ")? else { return Ok(Flow::Exit) };
        let Some(email) = self.prompt("Enter your email: ")? else { return Ok(Flow::Exit) };
        let Some(national_id) = self.prompt("Enter your national ID: ")? else { return Ok(Flow::Exit) };
        let Some(password) = self.prompt("Create password: ")? else { return Ok(Flow::Exit) };

        if password.is_empty() {
            return Err(Error::validation("password"));
        }

        self.election.register_voter(VoterRegistration {
            name,
            email,
            national_id,
            credential_hash: self.sessions.hasher().hash(&password),
        })?;
        writeln!(self.output, "Registration successful! Please wait for verification.")?;
        Ok(Flow::Continue)
    }

    fn login(&mut self) -> Result<Flow> {
        let Some(email) = self.prompt("Enter email: ")? else { return Ok(Flow::Exit) };
        let Some(password) = self.prompt("Enter password: ")? else { return Ok(Flow::Exit) };

        let voter = self
            .election
            .find_voter_by_email(&email)
            .map_err(|_| Error::unauthorized("Invalid credentials"))?;
        let token = self.sessions.login(&voter, &password)?;

        if let Some(previous) = self.session.replace(token) {
            self.sessions.logout(&previous)?;
        }
        writeln!(self.output, "Login successful!")?;
        Ok(Flow::Continue)
    }

    fn logout(&mut self) -> Result<Flow> {
        match self.session.take() {
            Some(token) => {
                self.sessions.logout(&token)?;
                writeln!(self.output, "Logged out.")?;
            }
            None => writeln!(self.output, "Not logged in.")?,
        }
        Ok(Flow::Continue)
    }

    fn cast_vote(&mut self) -> Result<Flow> {
        let token = self
            .session
            .clone()
            .ok_or_else(|| Error::unauthorized("Please login first"))?;
        let voter_id = self.sessions.resolve_session(&token)?;

        self.view_candidates()?;
        let Some(raw_id) = self.prompt("Enter candidate ID to vote: ")? else {
            return Ok(Flow::Exit);
        };
        let candidate_id: CandidateId = raw_id
            .parse()
            .map_err(|_| Error::validation("candidate_id"))?;

        self.election
            .cast_vote(&voter_id, &candidate_id, CONSOLE_STATION)?;
        writeln!(self.output, "Vote cast successfully!")?;
        Ok(Flow::Continue)
    }

    fn view_results(&mut self) -> Result<Flow> {
        let results = self.election.get_results()?;
        writeln!(self.output, "\n=== Election Results ===")?;
        for (name, votes) in results.by_name() {
            writeln!(self.output, "{name}: {votes} votes")?;
        }
        Ok(Flow::Continue)
    }

    /// Print a prompt and read one trimmed line; `None` at end of input
    fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{label}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

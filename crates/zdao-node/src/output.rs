//! Output formatting utilities.

use colored::Colorize;
use zdao_governance::{Governor, PersistentGovernor, Proposal, ProposalState, Quorum};
use zdao_types::Hash;

/// Print success message.
pub fn print_success(msg: &str) {
    println!("{}", format!("✓ {}", msg).green());
}

/// Print info message.
pub fn print_info(msg: &str) {
    println!("{}", format!("ℹ {}", msg).blue());
}

/// Print warning message.
pub fn print_warning(msg: &str) {
    println!("{}", format!("⚠ {}", msg).yellow());
}

fn colored_state(state: ProposalState) -> colored::ColoredString {
    let text = state.to_string();
    match state {
        ProposalState::Pending | ProposalState::Queued => text.yellow(),
        ProposalState::Active => text.bright_cyan(),
        ProposalState::Succeeded | ProposalState::Executed => text.green(),
        ProposalState::Defeated | ProposalState::Canceled | ProposalState::Expired => text.red(),
    }
}

/// Print one proposal.
pub fn print_proposal(gov: &Governor, proposal: &Proposal) {
    let state = gov
        .state(&proposal.id)
        .map(colored_state)
        .unwrap_or_else(|e| e.to_string().red());

    println!("{}", format!("Proposal {}", proposal.id).bold());
    println!("{}", "=".repeat(50));
    println!("State:        {}", state);
    println!("Proposer:     {}", proposal.proposer);
    println!("Description:  {}", proposal.description);
    println!("Voting:       blocks {} to {}", proposal.snapshot_height + 1, proposal.deadline_height);
    println!(
        "Votes:        for {} / against {} / abstain {}",
        proposal.tally.for_votes.to_string().bright_green(),
        proposal.tally.against_votes.to_string().bright_red(),
        proposal.tally.abstain_votes
    );
    if let Some(eta) = proposal.eta {
        println!("ETA:          {}", eta);
    }
    for (i, ((target, value), calldata)) in proposal
        .targets
        .iter()
        .zip(&proposal.values)
        .zip(&proposal.calldatas)
        .enumerate()
    {
        println!("Call {}:       {:x} value {} data 0x{}", i, target, value, hex::encode(calldata));
    }
}

/// Print node status.
pub fn print_status(node: &PersistentGovernor) {
    let gov = node.governor();
    let clock = gov.clock();
    let config = gov.config();
    let quorum = match config.quorum {
        Quorum::Fraction { numerator } => format!("{}% of supply", numerator),
        Quorum::Absolute { votes } => format!("{} votes", votes),
    };

    println!("{}", format!("Governor {}", config.name).bold());
    println!("{}", "=".repeat(50));
    println!("Data dir:     {}", node.data_dir().display());
    println!("Governor:     {}", gov.address());
    println!("Timelock:     {}", gov.timelock().address());
    println!("Token:        {} ({:?})", gov.token().address(), gov.token().kind());
    println!("Token owner:  {}", gov.token().owner());
    println!("Height:       {}", clock.height.to_string().bright_green());
    println!("Timestamp:    {}", clock.timestamp);
    println!("Supply:       {}", gov.token().total_supply());
    println!("Proposals:    {}", gov.proposals().count());
    println!(
        "Voting:       delay {} / period {} blocks, threshold {}, quorum {}",
        gov.voting_delay(),
        gov.voting_period(),
        gov.proposal_threshold(),
        quorum
    );
    println!("Delays:       min delay {}s, expiry {}s", gov.timelock().min_delay(), config.expiry_window);
    println!("Journal seq:  {}", node.last_seq());
}

/// Short form used in listings.
pub fn format_id(id: &Hash) -> String {
    let s = id.to_string();
    format!("{}...{}", &s[..10], &s[s.len() - 8..])
}

//! Governor: sequences propose -> vote -> queue -> execute over the ledger,
//! the proposal registry and the timelock.
//!
//! Every mutating operation runs against a staged copy of [`GovernorState`]
//! that replaces the live state only when the operation succeeds, so a
//! failed operation leaves nothing behind.

use serde::{Deserialize, Serialize};
use zdao_types::{Address, Hash};

use crate::clock::Clock;
use crate::config::GovernorConfig;
use crate::error::GovernanceError;
use crate::hashing::{hash_description, hash_proposal, timelock_salt};
use crate::ledger::VotingPowerLedger;
use crate::proposal::{Proposal, ProposalRegistry, ProposalState};
use crate::roles::{Role, RoleStore, OPEN_ROLE};
use crate::tally::{VoteSupport, VoteTally};
use crate::timelock::{OperationState, TimelockScheduler};
use crate::token::VotesToken;

/// Identity of the governor named `name`.
pub fn governor_address(name: &str) -> Address {
    Address::from_label(&format!("zdao.governor:{name}"))
}

/// Identity of the timelock deployed with governor `name`.
pub fn timelock_address(name: &str) -> Address {
    Address::from_label(&format!("zdao.timelock:{name}"))
}

/// Identity of the votes token deployed with governor `name`.
pub fn token_address(name: &str) -> Address {
    Address::from_label(&format!("zdao.token:{name}"))
}

/// Everything the governor owns. This is what snapshots persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernorState {
    pub config: GovernorConfig,
    pub clock: Clock,
    pub roles: RoleStore,
    pub token: VotesToken,
    pub timelock: TimelockScheduler,
    pub proposals: ProposalRegistry,
}

impl GovernorState {
    /// A queued proposal follows its timelock operation, which may also be
    /// executed or canceled directly on the timelock.
    fn proposal_state(&self, proposal: &Proposal) -> Result<ProposalState, GovernanceError> {
        if let (true, false, Some(op)) = (proposal.queued, proposal.canceled, proposal.timelock_op) {
            match self.timelock.operation_state(&op, self.clock.timestamp) {
                OperationState::Done => return Ok(ProposalState::Executed),
                OperationState::Canceled => return Ok(ProposalState::Canceled),
                _ => {}
            }
        }
        proposal.state(&self.clock, self.config.expiry_window, |height| self.quorum(height))
    }

    fn quorum(&self, height: u64) -> Result<u128, GovernanceError> {
        let supply = self.token.ledger().get_past_total_supply(height, self.clock.height)?;
        Ok(self.config.quorum.votes_required(supply))
    }

    fn require_state(
        &self,
        id: &Hash,
        allowed: &[ProposalState],
        operation: &'static str,
    ) -> Result<ProposalState, GovernanceError> {
        let state = self.proposal_state(self.proposals.get(id)?)?;
        if !allowed.contains(&state) {
            return Err(GovernanceError::InvalidStateForOperation { id: *id, state, operation });
        }
        Ok(state)
    }
}

/// Governance coordinator.
#[derive(Debug, Clone)]
pub struct Governor {
    address: Address,
    state: GovernorState,
}

impl Governor {
    /// Deploy a governor with its timelock and token.
    ///
    /// `admin` receives the timelock admin role and initially owns the token.
    /// The governor holds the proposer and admin roles; execution is open.
    pub fn new(config: GovernorConfig, admin: Address) -> Result<Self, GovernanceError> {
        config.validate()?;
        let address = governor_address(&config.name);

        let mut roles = RoleStore::new(admin);
        roles.grant_role(&admin, Role::Admin, address)?;
        roles.grant_role(&admin, Role::Proposer, address)?;
        roles.grant_role(&admin, Role::Executor, OPEN_ROLE)?;

        let state = GovernorState {
            clock: Clock::default(),
            roles,
            token: VotesToken::new(token_address(&config.name), admin, config.voting_units),
            timelock: TimelockScheduler::new(timelock_address(&config.name), config.min_delay),
            proposals: ProposalRegistry::new(),
            config,
        };

        tracing::info!("Governor {:x} deployed (admin {:x})", address, admin);
        Ok(Self { address, state })
    }

    /// Resume from a previously persisted state.
    pub fn from_state(state: GovernorState) -> Result<Self, GovernanceError> {
        state.config.validate()?;
        Ok(Self {
            address: governor_address(&state.config.name),
            state,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn as_state(&self) -> &GovernorState {
        &self.state
    }

    fn transact<T, F>(&mut self, op: F) -> Result<T, GovernanceError>
    where
        F: FnOnce(&mut GovernorState, Address) -> Result<T, GovernanceError>,
    {
        let mut staged = self.state.clone();
        let out = op(&mut staged, self.address)?;
        self.state = staged;
        Ok(out)
    }

    // Clock

    pub fn clock(&self) -> Clock {
        self.state.clock
    }

    pub fn advance_blocks(&mut self, blocks: u64, seconds_per_block: u64) -> Result<Clock, GovernanceError> {
        self.state.clock.advance_blocks(blocks, seconds_per_block)?;
        Ok(self.state.clock)
    }

    pub fn increase_time(&mut self, seconds: u64) -> Result<Clock, GovernanceError> {
        self.state.clock.increase_time(seconds)?;
        Ok(self.state.clock)
    }

    pub fn advance_to(&mut self, height: u64, timestamp: u64) -> Result<Clock, GovernanceError> {
        self.state.clock.advance_to(height, timestamp)?;
        Ok(self.state.clock)
    }

    // Token and delegation

    /// Delegate `account`'s voting units. Returns false if nothing changed.
    pub fn delegate(&mut self, account: Address, delegatee: Address) -> Result<bool, GovernanceError> {
        self.transact(|s, _| {
            let height = s.clock.height;
            s.token.delegate(account, delegatee, height)
        })
    }

    pub fn mint(&mut self, caller: Address, to: Address, value: u128) -> Result<(), GovernanceError> {
        self.transact(|s, _| {
            let height = s.clock.height;
            s.token.mint(&caller, to, value, height)
        })
    }

    pub fn burn(&mut self, caller: Address, from: Address, value: u128) -> Result<(), GovernanceError> {
        self.transact(|s, _| {
            let height = s.clock.height;
            s.token.burn(&caller, from, value, height)
        })
    }

    pub fn transfer(&mut self, caller: Address, to: Address, value: u128) -> Result<(), GovernanceError> {
        self.transact(|s, _| {
            let height = s.clock.height;
            s.token.transfer(&caller, to, value, height)
        })
    }

    pub fn transfer_token_ownership(&mut self, caller: Address, new_owner: Address) -> Result<(), GovernanceError> {
        self.transact(|s, _| s.token.transfer_ownership(&caller, new_owner))
    }

    pub fn token(&self) -> &VotesToken {
        &self.state.token
    }

    pub fn ledger(&self) -> &VotingPowerLedger {
        self.state.token.ledger()
    }

    /// Voting power of `account` at a strictly past `height`.
    pub fn get_votes(&self, account: &Address, height: u64) -> Result<u128, GovernanceError> {
        self.ledger().get_votes(account, height, self.state.clock.height)
    }

    // Roles

    pub fn grant_role(&mut self, caller: Address, role: Role, account: Address) -> Result<bool, GovernanceError> {
        self.transact(|s, _| s.roles.grant_role(&caller, role, account))
    }

    pub fn revoke_role(&mut self, caller: Address, role: Role, account: Address) -> Result<bool, GovernanceError> {
        self.transact(|s, _| s.roles.revoke_role(&caller, role, &account))
    }

    pub fn renounce_role(&mut self, caller: Address, role: Role) -> Result<bool, GovernanceError> {
        self.transact(|s, _| s.roles.renounce_role(&caller, role))
    }

    pub fn roles(&self) -> &RoleStore {
        &self.state.roles
    }

    // Proposals

    /// Deterministic proposal id.
    pub fn hash_proposal(targets: &[Address], values: &[u128], calldatas: &[Vec<u8>], description_hash: &Hash) -> Hash {
        hash_proposal(targets, values, calldatas, description_hash)
    }

    /// Create a proposal. Returns its id.
    pub fn propose(
        &mut self,
        proposer: Address,
        targets: Vec<Address>,
        values: Vec<u128>,
        calldatas: Vec<Vec<u8>>,
        description: String,
    ) -> Result<Hash, GovernanceError> {
        if targets.is_empty() {
            return Err(GovernanceError::InvalidProposal("empty proposal".to_string()));
        }
        if targets.len() != values.len() || targets.len() != calldatas.len() {
            return Err(GovernanceError::InvalidProposal(format!(
                "length mismatch: {} targets, {} values, {} calldatas",
                targets.len(),
                values.len(),
                calldatas.len()
            )));
        }

        self.transact(|s, _| {
            let height = s.clock.height;
            let votes = match height.checked_sub(1) {
                Some(previous) => s.token.ledger().get_votes(&proposer, previous, height)?,
                None => 0,
            };
            let threshold = s.config.proposal_threshold;
            if votes < threshold {
                return Err(GovernanceError::InsufficientProposerVotes { proposer, votes, threshold });
            }

            let description_hash = hash_description(&description);
            let id = hash_proposal(&targets, &values, &calldatas, &description_hash);
            let snapshot_height = height.checked_add(s.config.voting_delay).ok_or(GovernanceError::Overflow)?;
            let deadline_height = snapshot_height
                .checked_add(s.config.voting_period)
                .ok_or(GovernanceError::Overflow)?;

            s.proposals.insert(Proposal {
                id,
                proposer,
                targets,
                values,
                calldatas,
                description_hash,
                description,
                snapshot_height,
                deadline_height,
                tally: VoteTally::default(),
                receipts: Default::default(),
                canceled: false,
                queued: false,
                executed: false,
                timelock_op: None,
                eta: None,
                created_at: height,
            })?;

            tracing::info!(
                "Proposal {} created by {:x}: voting from {} to {}",
                id,
                proposer,
                snapshot_height + 1,
                deadline_height
            );
            Ok(id)
        })
    }

    /// Derived state of a proposal.
    pub fn state(&self, id: &Hash) -> Result<ProposalState, GovernanceError> {
        self.state.proposal_state(self.state.proposals.get(id)?)
    }

    /// Quorum at a strictly past `height`.
    pub fn quorum(&self, height: u64) -> Result<u128, GovernanceError> {
        self.state.quorum(height)
    }

    /// Cast a vote (0 = against, 1 = for, 2 = abstain). Returns the weight counted.
    pub fn cast_vote(&mut self, voter: Address, id: Hash, support: u8) -> Result<u128, GovernanceError> {
        self.cast_vote_with_reason(voter, id, support, "")
    }

    pub fn cast_vote_with_reason(
        &mut self,
        voter: Address,
        id: Hash,
        support: u8,
        reason: &str,
    ) -> Result<u128, GovernanceError> {
        let support = VoteSupport::try_from(support)?;
        self.transact(|s, _| {
            s.require_state(&id, &[ProposalState::Active], "vote")?;

            let height = s.clock.height;
            let snapshot = s.proposals.get(&id)?.snapshot_height;
            let weight = s.token.ledger().get_votes(&voter, snapshot, height)?;
            s.proposals.get_mut(&id)?.record_vote(voter, support, weight)?;

            if reason.is_empty() {
                tracing::info!("Vote on {} by {:x}: {:?} with weight {}", id, voter, support, weight);
            } else {
                tracing::info!(
                    "Vote on {} by {:x}: {:?} with weight {} ({})",
                    id,
                    voter,
                    support,
                    weight,
                    reason
                );
            }
            Ok(weight)
        })
    }

    /// Schedule a succeeded proposal on the timelock. Returns the proposal id.
    pub fn queue(
        &mut self,
        targets: &[Address],
        values: &[u128],
        calldatas: &[Vec<u8>],
        description_hash: Hash,
    ) -> Result<Hash, GovernanceError> {
        let id = hash_proposal(targets, values, calldatas, &description_hash);
        self.transact(|s, governor| {
            s.require_state(&id, &[ProposalState::Succeeded], "queue")?;

            let salt = timelock_salt(&governor, &description_hash);
            let delay = s.timelock.min_delay();
            let clock = s.clock;
            let op = s
                .timelock
                .schedule(&s.roles, &governor, targets, values, calldatas, Hash::ZERO, salt, delay, &clock)?;
            let eta = s.timelock.timestamp(&op).ok_or(GovernanceError::UnknownOperation(op))?;

            let proposal = s.proposals.get_mut(&id)?;
            proposal.queued = true;
            proposal.timelock_op = Some(op);
            proposal.eta = Some(eta);

            tracing::info!("Proposal {} queued as timelock operation {}, eta {}", id, op, eta);
            Ok(id)
        })
    }

    /// Execute a queued proposal through the timelock. Returns the proposal id.
    pub fn execute(
        &mut self,
        targets: &[Address],
        values: &[u128],
        calldatas: &[Vec<u8>],
        description_hash: Hash,
    ) -> Result<Hash, GovernanceError> {
        let id = hash_proposal(targets, values, calldatas, &description_hash);
        self.transact(|s, governor| {
            let state = s.proposal_state(s.proposals.get(&id)?)?;
            if state == ProposalState::Executed {
                return Err(GovernanceError::AlreadyExecuted(id));
            }
            if state != ProposalState::Queued {
                return Err(GovernanceError::InvalidStateForOperation { id, state, operation: "execute" });
            }

            let salt = timelock_salt(&governor, &description_hash);
            let clock = s.clock;
            s.timelock.execute(
                &s.roles,
                &governor,
                targets,
                values,
                calldatas,
                Hash::ZERO,
                salt,
                &clock,
                &mut s.token,
            )?;
            s.proposals.get_mut(&id)?.executed = true;

            tracing::info!("Proposal {} executed", id);
            Ok(id)
        })
    }

    /// Cancel a proposal that has not been executed.
    ///
    /// Allowed for the proposer and for timelock admins. A queued proposal's
    /// timelock operation is canceled as well.
    pub fn cancel(
        &mut self,
        caller: Address,
        targets: &[Address],
        values: &[u128],
        calldatas: &[Vec<u8>],
        description_hash: Hash,
    ) -> Result<Hash, GovernanceError> {
        let id = hash_proposal(targets, values, calldatas, &description_hash);
        self.transact(|s, governor| {
            let proposal = s.proposals.get(&id)?;
            if proposal.proposer != caller && !s.roles.has_role(Role::Admin, &caller) {
                return Err(GovernanceError::Unauthorized { account: caller, role: Role::Admin });
            }
            let state = s.proposal_state(proposal)?;
            match state {
                ProposalState::Executed => return Err(GovernanceError::AlreadyExecuted(id)),
                ProposalState::Canceled | ProposalState::Expired => {
                    return Err(GovernanceError::InvalidStateForOperation { id, state, operation: "cancel" })
                }
                _ => {}
            }

            if let Some(op) = proposal.timelock_op {
                if s.timelock.is_pending(&op) {
                    s.timelock.cancel(&s.roles, &governor, &op)?;
                }
            }
            s.proposals.get_mut(&id)?.canceled = true;

            tracing::info!("Proposal {} canceled by {:x} (was {})", id, caller, state);
            Ok(id)
        })
    }

    pub fn proposal(&self, id: &Hash) -> Result<&Proposal, GovernanceError> {
        self.state.proposals.get(id)
    }

    /// All proposals in creation order.
    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.state.proposals.all()
    }

    pub fn has_voted(&self, id: &Hash, account: &Address) -> Result<bool, GovernanceError> {
        Ok(self.proposal(id)?.has_voted(account))
    }

    pub fn proposal_votes(&self, id: &Hash) -> Result<VoteTally, GovernanceError> {
        Ok(self.proposal(id)?.tally)
    }

    pub fn proposal_snapshot(&self, id: &Hash) -> Result<u64, GovernanceError> {
        Ok(self.proposal(id)?.snapshot_height)
    }

    pub fn proposal_deadline(&self, id: &Hash) -> Result<u64, GovernanceError> {
        Ok(self.proposal(id)?.deadline_height)
    }

    pub fn proposal_proposer(&self, id: &Hash) -> Result<Address, GovernanceError> {
        Ok(self.proposal(id)?.proposer)
    }

    pub fn proposal_eta(&self, id: &Hash) -> Result<Option<u64>, GovernanceError> {
        Ok(self.proposal(id)?.eta)
    }

    pub fn proposal_threshold(&self) -> u128 {
        self.state.config.proposal_threshold
    }

    pub fn voting_delay(&self) -> u64 {
        self.state.config.voting_delay
    }

    pub fn voting_period(&self) -> u64 {
        self.state.config.voting_period
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.state.config
    }

    // Direct timelock access

    pub fn timelock(&self) -> &TimelockScheduler {
        &self.state.timelock
    }

    #[allow(clippy::too_many_arguments)]
    pub fn timelock_schedule(
        &mut self,
        caller: Address,
        targets: &[Address],
        values: &[u128],
        calldatas: &[Vec<u8>],
        predecessor: Hash,
        salt: Hash,
        delay: u64,
    ) -> Result<Hash, GovernanceError> {
        self.transact(|s, _| {
            let clock = s.clock;
            s.timelock
                .schedule(&s.roles, &caller, targets, values, calldatas, predecessor, salt, delay, &clock)
        })
    }

    pub fn timelock_execute(
        &mut self,
        caller: Address,
        targets: &[Address],
        values: &[u128],
        calldatas: &[Vec<u8>],
        predecessor: Hash,
        salt: Hash,
    ) -> Result<Hash, GovernanceError> {
        self.transact(|s, _| {
            let clock = s.clock;
            s.timelock.execute(
                &s.roles,
                &caller,
                targets,
                values,
                calldatas,
                predecessor,
                salt,
                &clock,
                &mut s.token,
            )
        })
    }

    pub fn timelock_cancel(&mut self, caller: Address, op: Hash) -> Result<(), GovernanceError> {
        self.transact(|s, _| s.timelock.cancel(&s.roles, &caller, &op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tally::Quorum;
    use crate::token::TokenCall;

    const ADMIN: Address = Address::from_bytes([0xad; 20]);
    const ALICE: Address = Address::from_bytes([0xa1; 20]);
    const BOB: Address = Address::from_bytes([0xb0; 20]);

    fn config() -> GovernorConfig {
        GovernorConfig {
            name: "unit".to_string(),
            voting_delay: 1,
            voting_period: 5,
            proposal_threshold: 1,
            quorum: Quorum::Fraction { numerator: 4 },
            min_delay: 60,
            expiry_window: 600,
            voting_units: Default::default(),
        }
    }

    /// ALICE holds 100 self-delegated units, token owned by the timelock.
    fn governor() -> Governor {
        let mut gov = Governor::new(config(), ADMIN).unwrap();
        gov.mint(ADMIN, ALICE, 100).unwrap();
        gov.delegate(ALICE, ALICE).unwrap();
        let timelock = gov.timelock().address();
        gov.transfer_token_ownership(ADMIN, timelock).unwrap();
        gov.advance_blocks(1, 12).unwrap();
        gov
    }

    fn mint_batch(gov: &Governor, to: Address) -> (Vec<Address>, Vec<u128>, Vec<Vec<u8>>) {
        (
            vec![gov.token().address()],
            vec![0],
            vec![TokenCall::Mint { to, value: 10 }.encode().unwrap()],
        )
    }

    #[test]
    fn test_propose_below_threshold() {
        let mut gov = governor();
        let (t, v, c) = mint_batch(&gov, BOB);
        let err = gov.propose(BOB, t, v, c, "x".to_string()).unwrap_err();
        assert_eq!(
            err,
            GovernanceError::InsufficientProposerVotes { proposer: BOB, votes: 0, threshold: 1 }
        );
        assert!(gov.proposals().next().is_none());
    }

    #[test]
    fn test_propose_sets_windows_and_rejects_duplicates() {
        let mut gov = governor();
        let (t, v, c) = mint_batch(&gov, BOB);
        let id = gov.propose(ALICE, t.clone(), v.clone(), c.clone(), "x".to_string()).unwrap();

        assert_eq!(id, Governor::hash_proposal(&t, &v, &c, &hash_description("x")));
        assert_eq!(gov.proposal_snapshot(&id).unwrap(), 2);
        assert_eq!(gov.proposal_deadline(&id).unwrap(), 7);
        assert_eq!(gov.proposal_proposer(&id).unwrap(), ALICE);
        assert_eq!(gov.state(&id).unwrap(), ProposalState::Pending);
        assert_eq!(
            gov.propose(ALICE, t, v, c, "x".to_string()),
            Err(GovernanceError::DuplicateProposal(id))
        );
    }

    #[test]
    fn test_propose_rejects_malformed_batches() {
        let mut gov = governor();
        assert!(matches!(
            gov.propose(ALICE, vec![], vec![], vec![], "x".to_string()),
            Err(GovernanceError::InvalidProposal(_))
        ));
        assert!(matches!(
            gov.propose(ALICE, vec![BOB], vec![0, 0], vec![vec![]], "x".to_string()),
            Err(GovernanceError::InvalidProposal(_))
        ));
    }

    #[test]
    fn test_vote_weight_is_fixed_at_snapshot() {
        let mut gov = governor();
        let (t, v, c) = mint_batch(&gov, BOB);
        let id = gov.propose(ALICE, t, v, c, "x".to_string()).unwrap();

        assert!(matches!(
            gov.cast_vote(ALICE, id, 1),
            Err(GovernanceError::InvalidStateForOperation { state: ProposalState::Pending, .. })
        ));

        gov.advance_blocks(2, 12).unwrap();
        // Units moved after the snapshot do not change the weight.
        gov.transfer(ALICE, BOB, 40).unwrap();
        assert_eq!(gov.cast_vote(ALICE, id, 1).unwrap(), 100);
        assert_eq!(gov.cast_vote(BOB, id, 0).unwrap(), 0);
        assert!(gov.has_voted(&id, &ALICE).unwrap());
        assert_eq!(gov.proposal_votes(&id).unwrap().for_votes, 100);
    }

    #[test]
    fn test_invalid_support_rejected() {
        let mut gov = governor();
        let (t, v, c) = mint_batch(&gov, BOB);
        let id = gov.propose(ALICE, t, v, c, "x".to_string()).unwrap();
        gov.advance_blocks(2, 12).unwrap();
        assert_eq!(gov.cast_vote(ALICE, id, 7), Err(GovernanceError::InvalidVoteType(7)));
    }

    #[test]
    fn test_quorum_uses_past_supply() {
        let gov = governor();
        assert_eq!(gov.quorum(0).unwrap(), 4);
        assert!(matches!(gov.quorum(1), Err(GovernanceError::FutureLookup { .. })));
    }

    #[test]
    fn test_cancel_permissions() {
        let mut gov = governor();
        let (t, v, c) = mint_batch(&gov, BOB);
        let desc = hash_description("x");
        gov.propose(ALICE, t.clone(), v.clone(), c.clone(), "x".to_string()).unwrap();

        assert_eq!(
            gov.cancel(BOB, &t, &v, &c, desc),
            Err(GovernanceError::Unauthorized { account: BOB, role: Role::Admin })
        );
        let id = gov.cancel(ALICE, &t, &v, &c, desc).unwrap();
        assert_eq!(gov.state(&id).unwrap(), ProposalState::Canceled);
        assert!(matches!(
            gov.cancel(ADMIN, &t, &v, &c, desc),
            Err(GovernanceError::InvalidStateForOperation { state: ProposalState::Canceled, .. })
        ));
    }

    #[test]
    fn test_failed_operation_leaves_state_untouched() {
        let mut gov = governor();
        let before = gov.as_state().clone();
        assert!(gov.mint(BOB, BOB, 1).is_err());
        assert!(gov.transfer(BOB, ALICE, 1).is_err());
        assert_eq!(gov.as_state(), &before);
    }

    #[test]
    fn test_deploy_roles() {
        let gov = governor();
        assert!(gov.roles().has_role(Role::Proposer, &gov.address()));
        assert!(gov.roles().has_role(Role::Admin, &gov.address()));
        assert!(gov.roles().has_role(Role::Admin, &ADMIN));
        assert!(gov.roles().has_role(Role::Executor, &OPEN_ROLE));
        assert_eq!(gov.token().owner(), gov.timelock().address());
    }
}

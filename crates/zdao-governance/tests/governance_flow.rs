//! End-to-end governance flows: propose, vote, queue and execute through the
//! timelock, plus durability across restarts.

use zdao_governance::{
    hash_description, timelock_salt, Command, CommandOutput, GovernanceError, Governor, GovernorConfig, PersistentGovernor,
    ProposalState, Quorum, TokenCall, UnitKind,
};
use zdao_storage::StorageConfig;
use zdao_types::{Address, Hash};

const ADMIN: Address = Address::from_bytes([0x01; 20]);
const PROPOSER: Address = Address::from_bytes([0x02; 20]);
const VOTER_A: Address = Address::from_bytes([0x03; 20]);
const VOTER_B: Address = Address::from_bytes([0x04; 20]);
const STRANGER: Address = Address::from_bytes([0x05; 20]);

const BLOCK_TIME: u64 = 12;
const MIN_DELAY: u64 = 3_600;

fn config(voting_units: UnitKind) -> GovernorConfig {
    GovernorConfig {
        name: "flow".to_string(),
        voting_delay: 1,
        voting_period: 5,
        proposal_threshold: 1,
        quorum: Quorum::Fraction { numerator: 4 },
        min_delay: MIN_DELAY,
        expiry_window: 7 * 24 * 3_600,
        voting_units,
    }
}

/// Proposer holds 1000 units, each voter 500, all self-delegated. The token
/// is owned by the timelock afterwards.
fn setup() -> Governor {
    let mut gov = Governor::new(config(UnitKind::Weighted), ADMIN).unwrap();
    for (account, amount) in [(PROPOSER, 1_000), (VOTER_A, 500), (VOTER_B, 500)] {
        gov.mint(ADMIN, account, amount).unwrap();
        gov.delegate(account, account).unwrap();
    }
    let timelock = gov.timelock().address();
    gov.transfer_token_ownership(ADMIN, timelock).unwrap();
    gov.advance_blocks(1, BLOCK_TIME).unwrap();
    gov
}

struct Batch {
    targets: Vec<Address>,
    values: Vec<u128>,
    calldatas: Vec<Vec<u8>>,
    description: String,
}

impl Batch {
    fn mint(gov: &Governor, to: Address, value: u128, description: &str) -> Self {
        Self {
            targets: vec![gov.token().address()],
            values: vec![0],
            calldatas: vec![TokenCall::Mint { to, value }.encode().unwrap()],
            description: description.to_string(),
        }
    }

    fn description_hash(&self) -> Hash {
        hash_description(&self.description)
    }

    fn propose(&self, gov: &mut Governor) -> Result<Hash, GovernanceError> {
        gov.propose(
            PROPOSER,
            self.targets.clone(),
            self.values.clone(),
            self.calldatas.clone(),
            self.description.clone(),
        )
    }

    fn queue(&self, gov: &mut Governor) -> Result<Hash, GovernanceError> {
        gov.queue(&self.targets, &self.values, &self.calldatas, self.description_hash())
    }

    fn execute(&self, gov: &mut Governor) -> Result<Hash, GovernanceError> {
        gov.execute(&self.targets, &self.values, &self.calldatas, self.description_hash())
    }
}

/// Propose, vote 1500 for / 500 against and mine past the deadline.
fn succeed(gov: &mut Governor, batch: &Batch) -> Hash {
    let id = batch.propose(gov).unwrap();
    gov.advance_blocks(2, BLOCK_TIME).unwrap();
    gov.cast_vote(PROPOSER, id, 1).unwrap();
    gov.cast_vote(VOTER_A, id, 1).unwrap();
    gov.cast_vote(VOTER_B, id, 0).unwrap();
    gov.advance_blocks(5, BLOCK_TIME).unwrap();
    id
}

#[test]
fn test_full_lifecycle_mints_through_timelock() {
    let mut gov = setup();
    let batch = Batch::mint(&gov, PROPOSER, 100, "Proposal #1: mint 100");

    let id = batch.propose(&mut gov).unwrap();
    assert_eq!(gov.state(&id).unwrap(), ProposalState::Pending);

    gov.advance_blocks(2, BLOCK_TIME).unwrap();
    assert_eq!(gov.state(&id).unwrap(), ProposalState::Active);
    assert_eq!(gov.cast_vote(PROPOSER, id, 1).unwrap(), 1_000);
    assert_eq!(gov.cast_vote(VOTER_A, id, 1).unwrap(), 500);
    assert_eq!(gov.cast_vote(VOTER_B, id, 0).unwrap(), 500);

    gov.advance_blocks(5, BLOCK_TIME).unwrap();
    let tally = gov.proposal_votes(&id).unwrap();
    assert_eq!(tally.for_votes, 1_500);
    assert_eq!(tally.against_votes, 500);
    assert_eq!(gov.state(&id).unwrap(), ProposalState::Succeeded);

    batch.queue(&mut gov).unwrap();
    assert_eq!(gov.state(&id).unwrap(), ProposalState::Queued);
    let op = gov.proposal(&id).unwrap().timelock_op.unwrap();
    assert_eq!(gov.proposal_eta(&id).unwrap(), Some(gov.clock().timestamp + MIN_DELAY));

    assert_eq!(batch.execute(&mut gov), Err(GovernanceError::TimelockNotReady(op)));
    assert_eq!(gov.token().balance_of(&PROPOSER), 1_000);

    gov.increase_time(MIN_DELAY).unwrap();
    batch.execute(&mut gov).unwrap();
    assert_eq!(gov.token().balance_of(&PROPOSER), 1_100);
    assert_eq!(gov.state(&id).unwrap(), ProposalState::Executed);
    assert!(gov.timelock().is_done(&op));

    assert_eq!(batch.execute(&mut gov), Err(GovernanceError::AlreadyExecuted(id)));
    assert_eq!(gov.token().balance_of(&PROPOSER), 1_100);
}

#[test]
fn test_state_queries_are_pure() {
    let mut gov = setup();
    let batch = Batch::mint(&gov, PROPOSER, 1, "pure");
    let id = succeed(&mut gov, &batch);

    let before = gov.as_state().clone();
    let first = gov.state(&id).unwrap();
    for _ in 0..3 {
        assert_eq!(gov.state(&id).unwrap(), first);
    }
    assert_eq!(gov.as_state(), &before);
}

#[test]
fn test_shared_timelock_keeps_proposals_independent() {
    let mut gov = setup();
    let first = Batch::mint(&gov, VOTER_A, 10, "first");
    let second = Batch::mint(&gov, VOTER_B, 20, "second");

    let first_id = first.propose(&mut gov).unwrap();
    let second_id = second.propose(&mut gov).unwrap();
    gov.advance_blocks(2, BLOCK_TIME).unwrap();
    for id in [first_id, second_id] {
        gov.cast_vote(PROPOSER, id, 1).unwrap();
        gov.cast_vote(VOTER_A, id, 2).unwrap();
    }
    gov.advance_blocks(5, BLOCK_TIME).unwrap();

    first.queue(&mut gov).unwrap();
    second.queue(&mut gov).unwrap();
    gov.increase_time(MIN_DELAY).unwrap();

    let second_op = gov.proposal(&second_id).unwrap().timelock_op.unwrap();
    let tally_before = gov.proposal_votes(&second_id).unwrap();
    let now = gov.clock().timestamp;
    assert!(gov.timelock().is_ready(&second_op, now));

    first.execute(&mut gov).unwrap();

    assert_eq!(gov.state(&first_id).unwrap(), ProposalState::Executed);
    assert_eq!(gov.state(&second_id).unwrap(), ProposalState::Queued);
    assert_eq!(gov.proposal_votes(&second_id).unwrap(), tally_before);
    assert!(gov.timelock().is_ready(&second_op, now));
    assert_eq!(gov.token().balance_of(&VOTER_A), 510);

    second.execute(&mut gov).unwrap();
    assert_eq!(gov.token().balance_of(&VOTER_B), 520);
}

#[test]
fn test_votes_outside_window_and_double_votes() {
    let mut gov = setup();
    let batch = Batch::mint(&gov, PROPOSER, 1, "window");
    let id = batch.propose(&mut gov).unwrap();

    assert!(matches!(
        gov.cast_vote(VOTER_A, id, 1),
        Err(GovernanceError::InvalidStateForOperation { state: ProposalState::Pending, .. })
    ));

    gov.advance_blocks(2, BLOCK_TIME).unwrap();
    gov.cast_vote(VOTER_A, id, 1).unwrap();
    assert_eq!(
        gov.cast_vote(VOTER_A, id, 0),
        Err(GovernanceError::DoubleVote { id, voter: VOTER_A })
    );
    assert_eq!(gov.proposal_votes(&id).unwrap().against_votes, 0);

    gov.advance_blocks(5, BLOCK_TIME).unwrap();
    assert!(matches!(
        gov.cast_vote(VOTER_B, id, 1),
        Err(GovernanceError::InvalidStateForOperation { state: ProposalState::Succeeded, .. })
    ));
    assert_eq!(
        gov.cast_vote(VOTER_B, Hash::ZERO, 1),
        Err(GovernanceError::UnknownProposal(Hash::ZERO))
    );
}

#[test]
fn test_quorum_not_reached_is_defeated() {
    let mut gov = Governor::new(
        GovernorConfig {
            quorum: Quorum::Absolute { votes: 1_500 },
            ..config(UnitKind::Weighted)
        },
        ADMIN,
    )
    .unwrap();
    gov.mint(ADMIN, PROPOSER, 1_000).unwrap();
    gov.delegate(PROPOSER, PROPOSER).unwrap();
    gov.advance_blocks(1, BLOCK_TIME).unwrap();

    let batch = Batch::mint(&gov, PROPOSER, 1, "low turnout");
    let id = batch.propose(&mut gov).unwrap();
    gov.advance_blocks(2, BLOCK_TIME).unwrap();
    gov.cast_vote(PROPOSER, id, 1).unwrap();
    gov.advance_blocks(5, BLOCK_TIME).unwrap();

    assert_eq!(gov.state(&id).unwrap(), ProposalState::Defeated);
    assert!(matches!(
        batch.queue(&mut gov),
        Err(GovernanceError::InvalidStateForOperation { state: ProposalState::Defeated, .. })
    ));
}

#[test]
fn test_queued_proposal_expires() {
    let mut gov = setup();
    let batch = Batch::mint(&gov, PROPOSER, 1, "late");
    let id = succeed(&mut gov, &batch);
    batch.queue(&mut gov).unwrap();

    let expiry = gov.config().expiry_window;
    gov.increase_time(MIN_DELAY + expiry).unwrap();
    assert_eq!(gov.state(&id).unwrap(), ProposalState::Expired);
    assert!(matches!(
        batch.execute(&mut gov),
        Err(GovernanceError::InvalidStateForOperation { state: ProposalState::Expired, .. })
    ));
}

#[test]
fn test_cancel_queued_proposal_cancels_timelock_operation() {
    let mut gov = setup();
    let batch = Batch::mint(&gov, PROPOSER, 1, "cancel me");
    let id = succeed(&mut gov, &batch);
    batch.queue(&mut gov).unwrap();
    let op = gov.proposal(&id).unwrap().timelock_op.unwrap();

    gov.cancel(ADMIN, &batch.targets, &batch.values, &batch.calldatas, batch.description_hash())
        .unwrap();
    assert_eq!(gov.state(&id).unwrap(), ProposalState::Canceled);
    assert!(!gov.timelock().is_pending(&op));

    gov.increase_time(MIN_DELAY).unwrap();
    assert!(matches!(
        batch.execute(&mut gov),
        Err(GovernanceError::InvalidStateForOperation { state: ProposalState::Canceled, .. })
    ));
}

#[test]
fn test_direct_timelock_execution_marks_proposal_executed() {
    let mut gov = setup();
    let batch = Batch::mint(&gov, PROPOSER, 100, "executed around the governor");
    let id = succeed(&mut gov, &batch);
    batch.queue(&mut gov).unwrap();
    gov.increase_time(MIN_DELAY).unwrap();

    // Execution is open, so anyone can run the governor's operation on the timelock.
    let salt = timelock_salt(&gov.address(), &batch.description_hash());
    gov.timelock_execute(STRANGER, &batch.targets, &batch.values, &batch.calldatas, Hash::ZERO, salt)
        .unwrap();
    assert_eq!(gov.token().balance_of(&PROPOSER), 1_100);
    assert_eq!(gov.state(&id).unwrap(), ProposalState::Executed);

    assert_eq!(batch.execute(&mut gov), Err(GovernanceError::AlreadyExecuted(id)));
    let expiry = gov.config().expiry_window;
    gov.increase_time(expiry).unwrap();
    assert_eq!(gov.state(&id).unwrap(), ProposalState::Executed);
    assert_eq!(gov.token().balance_of(&PROPOSER), 1_100);
}

#[test]
fn test_direct_timelock_cancel_marks_proposal_canceled() {
    let mut gov = setup();
    let batch = Batch::mint(&gov, PROPOSER, 100, "canceled on the timelock");
    let id = succeed(&mut gov, &batch);
    batch.queue(&mut gov).unwrap();
    let op = gov.proposal(&id).unwrap().timelock_op.unwrap();

    gov.timelock_cancel(ADMIN, op).unwrap();
    assert_eq!(gov.state(&id).unwrap(), ProposalState::Canceled);

    gov.increase_time(MIN_DELAY).unwrap();
    assert!(matches!(
        batch.execute(&mut gov),
        Err(GovernanceError::InvalidStateForOperation { state: ProposalState::Canceled, .. })
    ));
    assert_eq!(gov.token().balance_of(&PROPOSER), 1_000);
}

#[test]
fn test_counted_units_one_vote_per_item() {
    let mut gov = Governor::new(config(UnitKind::Counted), ADMIN).unwrap();
    for item in 0..3 {
        gov.mint(ADMIN, PROPOSER, item).unwrap();
    }
    gov.mint(ADMIN, VOTER_A, 10).unwrap();
    gov.delegate(PROPOSER, PROPOSER).unwrap();
    gov.delegate(VOTER_A, VOTER_A).unwrap();
    let timelock = gov.timelock().address();
    gov.transfer_token_ownership(ADMIN, timelock).unwrap();
    gov.advance_blocks(1, BLOCK_TIME).unwrap();

    let batch = Batch::mint(&gov, VOTER_B, 42, "mint item 42");
    let id = batch.propose(&mut gov).unwrap();
    gov.advance_blocks(2, BLOCK_TIME).unwrap();
    assert_eq!(gov.cast_vote(PROPOSER, id, 1).unwrap(), 3);
    assert_eq!(gov.cast_vote(VOTER_A, id, 0).unwrap(), 1);
    gov.advance_blocks(5, BLOCK_TIME).unwrap();
    assert_eq!(gov.state(&id).unwrap(), ProposalState::Succeeded);

    batch.queue(&mut gov).unwrap();
    gov.increase_time(MIN_DELAY).unwrap();
    batch.execute(&mut gov).unwrap();
    assert_eq!(gov.token().owner_of(42), Some(VOTER_B));
    assert_eq!(gov.token().balance_of(&VOTER_B), 1);
}

#[test]
fn test_transfer_moves_checkpoints_between_delegatees() {
    let mut gov = setup();
    let height = gov.clock().height;
    let a_before = gov.ledger().num_checkpoints(&VOTER_A);
    let b_before = gov.ledger().num_checkpoints(&VOTER_B);

    gov.transfer(VOTER_A, VOTER_B, 200).unwrap();
    assert_eq!(gov.ledger().get_current_votes(&VOTER_A), 300);
    assert_eq!(gov.ledger().get_current_votes(&VOTER_B), 700);
    assert_eq!(gov.ledger().num_checkpoints(&VOTER_A), a_before + 1);
    assert_eq!(gov.ledger().num_checkpoints(&VOTER_B), b_before + 1);

    gov.advance_blocks(1, BLOCK_TIME).unwrap();
    assert_eq!(gov.get_votes(&VOTER_A, height - 1).unwrap(), 500);
    assert_eq!(gov.get_votes(&VOTER_A, height).unwrap(), 300);
    assert!(matches!(
        gov.get_votes(&VOTER_A, height + 1),
        Err(GovernanceError::FutureLookup { .. })
    ));

    // Same delegatee on both sides: no checkpoint is written.
    gov.delegate(VOTER_A, VOTER_B).unwrap();
    let b_count = gov.ledger().num_checkpoints(&VOTER_B);
    gov.transfer(VOTER_A, VOTER_B, 100).unwrap();
    assert_eq!(gov.ledger().num_checkpoints(&VOTER_B), b_count);
    assert_eq!(gov.ledger().get_current_votes(&VOTER_B), 1_000);
}

#[test]
fn test_lifecycle_survives_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let storage = StorageConfig { snapshot_interval: 4 };
    let batch_targets;
    let batch_calldatas;
    let description = "Proposal #1: mint 100".to_string();

    let id = {
        let mut node =
            PersistentGovernor::create(dir.path(), storage.clone(), config(UnitKind::Weighted), ADMIN).unwrap();
        let token = node.governor().token().address();
        let timelock = node.governor().timelock().address();
        batch_targets = vec![token];
        batch_calldatas = vec![TokenCall::Mint { to: PROPOSER, value: 100 }.encode().unwrap()];

        for (account, amount) in [(PROPOSER, 1_000), (VOTER_A, 500)] {
            node.apply(Command::Mint { caller: ADMIN, to: account, value: amount }).unwrap();
            node.apply(Command::Delegate { account, delegatee: account }).unwrap();
        }
        node.apply(Command::TransferTokenOwnership { caller: ADMIN, new_owner: timelock }).unwrap();
        node.apply(Command::AdvanceBlocks { blocks: 1, seconds_per_block: BLOCK_TIME }).unwrap();

        let CommandOutput::Id(id) = node
            .apply(Command::Propose {
                proposer: PROPOSER,
                targets: batch_targets.clone(),
                values: vec![0],
                calldatas: batch_calldatas.clone(),
                description: description.clone(),
            })
            .unwrap()
        else {
            panic!("propose returns an id");
        };
        node.apply(Command::AdvanceBlocks { blocks: 2, seconds_per_block: BLOCK_TIME }).unwrap();
        node.apply(Command::CastVote { voter: VOTER_A, id, support: 1, reason: "yes".to_string() })
            .unwrap();
        id
    };

    let mut node = PersistentGovernor::open(dir.path(), storage.clone()).unwrap();
    assert_eq!(node.governor().state(&id).unwrap(), ProposalState::Active);
    assert!(node.governor().has_voted(&id, &VOTER_A).unwrap());
    assert_eq!(
        node.apply(Command::CastVote { voter: VOTER_A, id, support: 1, reason: String::new() }),
        Err(GovernanceError::DoubleVote { id, voter: VOTER_A })
    );

    node.apply(Command::AdvanceBlocks { blocks: 5, seconds_per_block: BLOCK_TIME }).unwrap();
    node.apply(Command::Queue {
        targets: batch_targets.clone(),
        values: vec![0],
        calldatas: batch_calldatas.clone(),
        description_hash: hash_description(&description),
    })
    .unwrap();
    node.apply(Command::IncreaseTime { seconds: MIN_DELAY }).unwrap();
    drop(node);

    let mut node = PersistentGovernor::open(dir.path(), storage).unwrap();
    assert_eq!(node.governor().state(&id).unwrap(), ProposalState::Queued);
    node.apply(Command::Execute {
        targets: batch_targets,
        values: vec![0],
        calldatas: batch_calldatas,
        description_hash: hash_description(&description),
    })
    .unwrap();
    assert_eq!(node.governor().token().balance_of(&PROPOSER), 1_100);
    assert_eq!(node.governor().state(&id).unwrap(), ProposalState::Executed);
}

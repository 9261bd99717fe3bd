//! CLI command implementations.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use zdao_governance::{
    hash_description, Command, CommandOutput, Governor, PersistentGovernor, Role, TokenCall, VoteSupport,
};
use zdao_types::{Address, Hash};

use crate::config::NodeConfig;
use crate::output::*;

/// Main CLI.
#[derive(Parser, Debug)]
#[command(name = "zdao")]
#[command(about = "ZDAO - token governance with timelocked execution")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Config file path
    #[arg(short, long, global = true, value_name = "FILE", env = "ZDAO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory
    #[arg(short, long, global = true, env = "ZDAO_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// JSON log output
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy a governor in the data directory
    Init {
        /// Also write the effective configuration to --config
        #[arg(long)]
        write_config: bool,
    },
    /// Show governor status
    Status,
    /// Write a snapshot and truncate the journal
    Compact,
    /// Mine blocks and/or move time forward
    Advance {
        /// Blocks to mine
        #[arg(long, default_value = "1")]
        blocks: u64,
        /// Extra seconds to add after mining
        #[arg(long, default_value = "0")]
        seconds: u64,
    },
    /// Mint voting units (amount, or item id for counted tokens)
    Mint {
        to: Address,
        value: u128,
        /// Caller; defaults to the configured admin
        #[arg(long)]
        caller: Option<Address>,
    },
    /// Transfer voting units
    Transfer { from: Address, to: Address, value: u128 },
    /// Delegate an account's voting units
    Delegate { account: Address, delegatee: Address },
    /// Create a proposal
    Propose {
        proposer: Address,
        #[command(flatten)]
        batch: BatchArgs,
    },
    /// Compute a proposal id without submitting anything
    HashProposal {
        #[command(flatten)]
        batch: BatchArgs,
    },
    /// Cast a vote: for, against or abstain (or 1, 0, 2)
    Vote {
        voter: Address,
        id: Hash,
        #[arg(value_parser = parse_support)]
        support: VoteSupport,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Show a proposal and its state
    State { id: Hash },
    /// List proposals
    List,
    /// Queue a succeeded proposal on the timelock
    Queue {
        #[command(flatten)]
        batch: BatchArgs,
    },
    /// Execute a queued proposal
    Execute {
        #[command(flatten)]
        batch: BatchArgs,
    },
    /// Cancel a proposal (proposer or timelock admin)
    Cancel {
        caller: Address,
        #[command(flatten)]
        batch: BatchArgs,
    },
    /// Show voting power, current or at a past height
    Votes {
        account: Address,
        #[arg(long)]
        height: Option<u64>,
    },
    /// Grant a timelock role (admin, proposer, executor)
    GrantRole {
        role: Role,
        account: Address,
        #[arg(long)]
        caller: Option<Address>,
    },
    /// Revoke a timelock role
    RevokeRole {
        role: Role,
        account: Address,
        #[arg(long)]
        caller: Option<Address>,
    },
    /// Encode token calldata for use in proposals
    #[command(subcommand)]
    Calldata(CalldataCommands),
}

/// Calldata encoders.
#[derive(Subcommand, Debug)]
pub enum CalldataCommands {
    Mint { to: Address, value: u128 },
    Burn { from: Address, value: u128 },
    Transfer { to: Address, value: u128 },
}

/// Call batch and description identifying a proposal.
#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Call target (repeatable; "token" names the governed token)
    #[arg(long = "target", required = true)]
    pub targets: Vec<String>,
    /// Call value (repeatable; defaults to 0 for every call)
    #[arg(long = "value")]
    pub values: Vec<u128>,
    /// Hex calldata (repeatable)
    #[arg(long = "calldata", value_parser = parse_hex)]
    pub calldatas: Vec<Vec<u8>>,
    /// Proposal description
    #[arg(long)]
    pub description: String,
}

struct Batch {
    targets: Vec<Address>,
    values: Vec<u128>,
    calldatas: Vec<Vec<u8>>,
    description: String,
}

impl BatchArgs {
    fn resolve(&self, gov: &Governor) -> anyhow::Result<Batch> {
        let targets = self
            .targets
            .iter()
            .map(|t| {
                if t == "token" {
                    Ok(gov.token().address())
                } else {
                    t.parse::<Address>()
                        .map_err(|e| anyhow::anyhow!("Invalid target '{}': {}", t, e))
                }
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        let values = if self.values.is_empty() {
            vec![0; targets.len()]
        } else {
            self.values.clone()
        };
        Ok(Batch {
            targets,
            values,
            calldatas: self.calldatas.clone(),
            description: self.description.clone(),
        })
    }
}

fn parse_hex(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s))
}

fn parse_support(s: &str) -> Result<VoteSupport, String> {
    match s.to_ascii_lowercase().as_str() {
        "for" | "1" => Ok(VoteSupport::For),
        "against" | "0" => Ok(VoteSupport::Against),
        "abstain" | "2" => Ok(VoteSupport::Abstain),
        other => Err(format!("unknown vote '{other}', expected for, against or abstain")),
    }
}

/// Execute a parsed command against the node described by `config`.
pub fn execute(command: Commands, config: &NodeConfig, config_path: Option<&PathBuf>) -> anyhow::Result<()> {
    let storage = config.storage.clone();
    let dir = config.data_dir.as_path();

    match command {
        Commands::Init { write_config } => {
            if write_config {
                let path = config_path.ok_or_else(|| anyhow::anyhow!("--write-config needs --config"))?;
                config.to_file(path)?;
                print_info(&format!("Configuration written to {}", path.display()));
            }
            let node = PersistentGovernor::create(dir, storage, config.governor.clone(), config.admin)?;
            print_success(&format!(
                "Governor {} deployed in {}",
                node.governor().address(),
                dir.display()
            ));
            print_status(&node);
        }
        Commands::Status => {
            let node = PersistentGovernor::open(dir, storage)?;
            print_status(&node);
        }
        Commands::Compact => {
            let node = PersistentGovernor::open(dir, storage)?;
            node.compact()?;
            print_success(&format!("Snapshot written at seq {}", node.last_seq()));
        }
        Commands::Advance { blocks, seconds } => {
            let mut node = PersistentGovernor::open(dir, storage)?;
            if blocks > 0 {
                node.apply(Command::AdvanceBlocks { blocks, seconds_per_block: config.block_time })?;
            }
            if seconds > 0 {
                node.apply(Command::IncreaseTime { seconds })?;
            }
            let clock = node.governor().clock();
            print_success(&format!("Height {}, timestamp {}", clock.height, clock.timestamp));
        }
        Commands::Mint { to, value, caller } => {
            let mut node = PersistentGovernor::open(dir, storage)?;
            let caller = caller.unwrap_or(config.admin);
            node.apply(Command::Mint { caller, to, value })?;
            print_success(&format!("Minted {} to {}", value, to));
        }
        Commands::Transfer { from, to, value } => {
            let mut node = PersistentGovernor::open(dir, storage)?;
            node.apply(Command::Transfer { caller: from, to, value })?;
            print_success(&format!("Transferred {} from {} to {}", value, from, to));
        }
        Commands::Delegate { account, delegatee } => {
            let mut node = PersistentGovernor::open(dir, storage)?;
            match node.apply(Command::Delegate { account, delegatee })? {
                CommandOutput::Changed(false) => print_warning(&format!("{} already delegates to {}", account, delegatee)),
                _ => print_success(&format!("{} now delegates to {}", account, delegatee)),
            }
        }
        Commands::Propose { proposer, batch } => {
            let mut node = PersistentGovernor::open(dir, storage)?;
            let batch = batch.resolve(node.governor())?;
            let output = node.apply(Command::Propose {
                proposer,
                targets: batch.targets,
                values: batch.values,
                calldatas: batch.calldatas,
                description: batch.description,
            })?;
            if let CommandOutput::Id(id) = output {
                print_success(&format!("Proposal created: {}", id));
                print_proposal(node.governor(), node.governor().proposal(&id)?);
            }
        }
        Commands::HashProposal { batch } => {
            let node = PersistentGovernor::open(dir, storage)?;
            let batch = batch.resolve(node.governor())?;
            let id = Governor::hash_proposal(
                &batch.targets,
                &batch.values,
                &batch.calldatas,
                &hash_description(&batch.description),
            );
            println!("{}", id);
        }
        Commands::Vote { voter, id, support, reason } => {
            let mut node = PersistentGovernor::open(dir, storage)?;
            let output = node.apply(Command::CastVote {
                voter,
                id,
                support: support as u8,
                reason: reason.unwrap_or_default(),
            })?;
            if let CommandOutput::Weight(weight) = output {
                print_success(&format!("{:?} vote by {} counted with weight {}", support, voter, weight));
            }
        }
        Commands::State { id } => {
            let node = PersistentGovernor::open(dir, storage)?;
            print_proposal(node.governor(), node.governor().proposal(&id)?);
        }
        Commands::List => {
            let node = PersistentGovernor::open(dir, storage)?;
            let gov = node.governor();
            for proposal in gov.proposals() {
                let state = gov.state(&proposal.id)?;
                println!("{}  {:<10} {}", format_id(&proposal.id), state, proposal.description);
            }
        }
        Commands::Queue { batch } => {
            let mut node = PersistentGovernor::open(dir, storage)?;
            let batch = batch.resolve(node.governor())?;
            node.apply(Command::Queue {
                targets: batch.targets,
                values: batch.values,
                calldatas: batch.calldatas,
                description_hash: hash_description(&batch.description),
            })?;
            print_success("Proposal queued");
        }
        Commands::Execute { batch } => {
            let mut node = PersistentGovernor::open(dir, storage)?;
            let batch = batch.resolve(node.governor())?;
            node.apply(Command::Execute {
                targets: batch.targets,
                values: batch.values,
                calldatas: batch.calldatas,
                description_hash: hash_description(&batch.description),
            })?;
            print_success("Proposal executed");
        }
        Commands::Cancel { caller, batch } => {
            let mut node = PersistentGovernor::open(dir, storage)?;
            let batch = batch.resolve(node.governor())?;
            node.apply(Command::Cancel {
                caller,
                targets: batch.targets,
                values: batch.values,
                calldatas: batch.calldatas,
                description_hash: hash_description(&batch.description),
            })?;
            print_success("Proposal canceled");
        }
        Commands::Votes { account, height } => {
            let node = PersistentGovernor::open(dir, storage)?;
            let gov = node.governor();
            let votes = match height {
                Some(height) => gov.get_votes(&account, height)?,
                None => gov.ledger().get_current_votes(&account),
            };
            println!("{}", votes);
        }
        Commands::GrantRole { role, account, caller } => {
            let mut node = PersistentGovernor::open(dir, storage)?;
            let caller = caller.unwrap_or(config.admin);
            match node.apply(Command::GrantRole { caller, role, account })? {
                CommandOutput::Changed(false) => print_warning(&format!("{} already holds {}", account, role)),
                _ => print_success(&format!("Granted {} to {}", role, account)),
            }
        }
        Commands::RevokeRole { role, account, caller } => {
            let mut node = PersistentGovernor::open(dir, storage)?;
            let caller = caller.unwrap_or(config.admin);
            match node.apply(Command::RevokeRole { caller, role, account })? {
                CommandOutput::Changed(false) => print_warning(&format!("{} does not hold {}", account, role)),
                _ => print_success(&format!("Revoked {} from {}", role, account)),
            }
        }
        Commands::Calldata(call) => {
            let call = match call {
                CalldataCommands::Mint { to, value } => TokenCall::Mint { to, value },
                CalldataCommands::Burn { from, value } => TokenCall::Burn { from, value },
                CalldataCommands::Transfer { to, value } => TokenCall::Transfer { to, value },
            };
            println!("0x{}", hex::encode(call.encode()?));
        }
    }

    Ok(())
}

//! Deterministic identifiers for proposals and timelock operations.
//!
//! Both ids hash a call batch with blake3. Every variable-length field is
//! length-prefixed (little-endian u64) so distinct batches never share an
//! encoding, and each id kind is separated by a domain tag.

use zdao_types::{Address, Hash};

const PROPOSAL_DOMAIN: &[u8] = b"zdao.proposal.v1";
const OPERATION_DOMAIN: &[u8] = b"zdao.timelock.v1";

fn update_len(hasher: &mut blake3::Hasher, len: usize) {
    hasher.update(&(len as u64).to_le_bytes());
}

fn hash_calls(
    domain: &[u8],
    targets: &[Address],
    values: &[u128],
    calldatas: &[Vec<u8>],
    extra: &[&Hash],
) -> Hash {
    let mut hasher = blake3::Hasher::new();
    update_len(&mut hasher, domain.len());
    hasher.update(domain);

    update_len(&mut hasher, targets.len());
    for target in targets {
        hasher.update(target.as_bytes());
    }

    update_len(&mut hasher, values.len());
    for value in values {
        hasher.update(&value.to_le_bytes());
    }

    update_len(&mut hasher, calldatas.len());
    for data in calldatas {
        update_len(&mut hasher, data.len());
        hasher.update(data);
    }

    for hash in extra {
        hasher.update(hash.as_bytes());
    }

    Hash::from_bytes(*hasher.finalize().as_bytes())
}

/// Proposal id: a pure function of the call batch and the description hash.
pub fn hash_proposal(
    targets: &[Address],
    values: &[u128],
    calldatas: &[Vec<u8>],
    description_hash: &Hash,
) -> Hash {
    hash_calls(PROPOSAL_DOMAIN, targets, values, calldatas, &[description_hash])
}

/// Timelock operation id.
pub fn hash_operation(
    targets: &[Address],
    values: &[u128],
    calldatas: &[Vec<u8>],
    predecessor: &Hash,
    salt: &Hash,
) -> Hash {
    hash_calls(OPERATION_DOMAIN, targets, values, calldatas, &[predecessor, salt])
}

/// Hash of a proposal description.
pub fn hash_description(description: &str) -> Hash {
    Hash::compute(description.as_bytes())
}

/// Salt a governor uses when scheduling a proposal on a (possibly shared) timelock.
///
/// The governor address occupies the first 20 bytes of the mask.
pub fn timelock_salt(governor: &Address, description_hash: &Hash) -> Hash {
    let mut mask = [0u8; 32];
    mask[..Address::LEN].copy_from_slice(governor.as_bytes());
    *description_hash ^ Hash::from_bytes(mask)
}

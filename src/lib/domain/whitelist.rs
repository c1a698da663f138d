//! Merkle whitelist for membership proofs.
//!
//! Implements the `standard-v1` tree format so that roots and proofs
//! generated here verify against the on-chain `MerkleProof.verify`:
//! a leaf is the double keccak of the ABI-encoded member address, and
//! internal nodes hash their children as a sorted pair, which makes
//! verification independent of left/right position.

use alloy::primitives::{keccak256, Address, B256};
use alloy::sol_types::SolValue;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Interchange format tag, shared with the reference JS tooling.
pub const DUMP_FORMAT: &str = "standard-v1";

#[derive(Debug, Error)]
pub enum WhitelistError {
    #[error("whitelist must contain at least one member")]
    Empty,

    #[error("address is not in the whitelist: {0}")]
    UnknownMember(Address),

    #[error("invalid whitelist dump: {0}")]
    InvalidDump(String),
}

/// Hash a member address into a tree leaf.
///
/// `keccak256(keccak256(abi.encode(member)))` — the inner hash covers
/// the 32-byte ABI encoding, the outer hash guards against
/// second-preimage attacks that confuse leaves with internal nodes.
pub fn leaf_hash(member: Address) -> B256 {
    keccak256(keccak256(member.abi_encode()))
}

/// Commutative pair hash: `keccak256(min(a,b) ++ max(a,b))`.
fn hash_pair(a: B256, b: B256) -> B256 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(lo.as_slice());
    buf[32..].copy_from_slice(hi.as_slice());
    keccak256(buf)
}

/// Fold a sibling path onto a leaf hash and compare against the root.
pub fn verify_leaf(root: B256, leaf: B256, proof: &[B256]) -> bool {
    proof.iter().fold(leaf, |acc, sibling| hash_pair(acc, *sibling)) == root
}

/// Verify that `member` belongs to the tree committed to by `root`.
pub fn verify_proof(root: B256, member: Address, proof: &[B256]) -> bool {
    verify_leaf(root, leaf_hash(member), proof)
}

/// Immutable Merkle tree over a set of whitelisted addresses.
///
/// Array layout: `tree[0]` is the root, node `i` has children at
/// `2i+1` and `2i+2`, and the `n` leaf hashes occupy the final `n`
/// slots. Leaves are sorted by hash before placement, so the root is
/// invariant under permutation of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhitelistTree {
    tree: Vec<B256>,
    /// Members in input order, each with its index into `tree`.
    values: Vec<(Address, usize)>,
}

impl WhitelistTree {
    /// Build a tree from member addresses. Fails on an empty set.
    pub fn new(members: impl IntoIterator<Item = Address>) -> Result<Self, WhitelistError> {
        let members: Vec<Address> = members.into_iter().collect();
        if members.is_empty() {
            return Err(WhitelistError::Empty);
        }

        let n = members.len();
        let mut hashed: Vec<(usize, B256)> = members
            .iter()
            .enumerate()
            .map(|(i, member)| (i, leaf_hash(*member)))
            .collect();
        hashed.sort_by(|a, b| a.1.cmp(&b.1));

        let mut tree = vec![B256::ZERO; 2 * n - 1];
        let mut values: Vec<(Address, usize)> = members.iter().map(|m| (*m, 0)).collect();
        for (sorted_pos, (input_index, hash)) in hashed.iter().enumerate() {
            let tree_index = tree.len() - 1 - sorted_pos;
            tree[tree_index] = *hash;
            values[*input_index].1 = tree_index;
        }
        for i in (0..n.saturating_sub(1)).rev() {
            tree[i] = hash_pair(tree[2 * i + 1], tree[2 * i + 2]);
        }

        Ok(Self { tree, values })
    }

    /// Root committed to on-chain.
    pub fn root(&self) -> B256 {
        self.tree[0]
    }

    /// Number of whitelisted entries (duplicates count separately).
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Members in their original input order.
    pub fn members(&self) -> impl Iterator<Item = Address> + '_ {
        self.values.iter().map(|(member, _)| *member)
    }

    pub fn contains(&self, member: Address) -> bool {
        self.values.iter().any(|(m, _)| *m == member)
    }

    /// Sibling path from the member's leaf to the root.
    pub fn proof(&self, member: Address) -> Result<Vec<B256>, WhitelistError> {
        let (_, tree_index) = self
            .values
            .iter()
            .find(|(m, _)| *m == member)
            .ok_or(WhitelistError::UnknownMember(member))?;

        let mut proof = Vec::new();
        let mut i = *tree_index;
        while i > 0 {
            let sibling = if i % 2 == 1 { i + 1 } else { i - 1 };
            proof.push(self.tree[sibling]);
            i = (i - 1) / 2;
        }
        Ok(proof)
    }

    /// Serialize in the `standard-v1` interchange format.
    pub fn dump(&self) -> WhitelistDump {
        WhitelistDump {
            format: DUMP_FORMAT.to_string(),
            leaf_encoding: vec!["address".to_string()],
            tree: self.tree.clone(),
            values: self
                .values
                .iter()
                .map(|(member, tree_index)| DumpValue {
                    value: [*member],
                    tree_index: *tree_index,
                })
                .collect(),
        }
    }

    /// Reconstruct a tree from a dump, revalidating every node.
    pub fn load(dump: WhitelistDump) -> Result<Self, WhitelistError> {
        let invalid = |msg: &str| WhitelistError::InvalidDump(msg.to_string());

        if dump.format != DUMP_FORMAT {
            return Err(WhitelistError::InvalidDump(format!(
                "unknown format {:?}",
                dump.format
            )));
        }
        if dump.leaf_encoding != ["address"] {
            return Err(invalid("leaf encoding must be [\"address\"]"));
        }
        let n = dump.values.len();
        if n == 0 {
            return Err(WhitelistError::Empty);
        }
        if dump.tree.len() != 2 * n - 1 {
            return Err(invalid("tree length does not match value count"));
        }

        let mut seen = vec![false; dump.tree.len()];
        for value in &dump.values {
            if value.tree_index < n - 1 || value.tree_index >= dump.tree.len() {
                return Err(invalid("value tree index is not a leaf slot"));
            }
            if std::mem::replace(&mut seen[value.tree_index], true) {
                return Err(invalid("duplicate leaf slot"));
            }
            if dump.tree[value.tree_index] != leaf_hash(value.value[0]) {
                return Err(invalid("leaf hash does not match its value"));
            }
        }
        for i in (0..n.saturating_sub(1)).rev() {
            if dump.tree[i] != hash_pair(dump.tree[2 * i + 1], dump.tree[2 * i + 2]) {
                return Err(invalid("internal node does not hash its children"));
            }
        }

        Ok(Self {
            tree: dump.tree,
            values: dump
                .values
                .into_iter()
                .map(|v| (v.value[0], v.tree_index))
                .collect(),
        })
    }
}

/// JSON dump of a [`WhitelistTree`], compatible with the reference
/// JS library's `tree.dump()` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhitelistDump {
    pub format: String,
    pub leaf_encoding: Vec<String>,
    pub tree: Vec<B256>,
    pub values: Vec<DumpValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DumpValue {
    pub value: [Address; 1],
    pub tree_index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn test_leaf_hash_is_double_keccak() {
        let member = addr(0x11);
        let encoded = member.abi_encode();
        assert_eq!(encoded.len(), 32);
        assert_eq!(leaf_hash(member), keccak256(keccak256(encoded)));
    }

    #[test]
    fn test_hash_pair_commutes() {
        let a = B256::repeat_byte(0x01);
        let b = B256::repeat_byte(0x02);
        assert_eq!(hash_pair(a, b), hash_pair(b, a));
    }

    #[test]
    fn test_empty_whitelist_rejected() {
        assert!(matches!(
            WhitelistTree::new(std::iter::empty::<Address>()),
            Err(WhitelistError::Empty)
        ));
    }

    #[test]
    fn test_single_member_root_is_leaf() {
        let tree = WhitelistTree::new([addr(0xAA)]).unwrap();
        assert_eq!(tree.root(), leaf_hash(addr(0xAA)));
        assert!(tree.proof(addr(0xAA)).unwrap().is_empty());
    }

    #[test]
    fn test_two_member_root() {
        let tree = WhitelistTree::new([addr(0x01), addr(0x02)]).unwrap();
        let expected = hash_pair(leaf_hash(addr(0x01)), leaf_hash(addr(0x02)));
        assert_eq!(tree.root(), expected);
    }

    #[test]
    fn test_unknown_member_has_no_proof() {
        let tree = WhitelistTree::new([addr(0x01), addr(0x02)]).unwrap();
        assert!(matches!(
            tree.proof(addr(0x03)),
            Err(WhitelistError::UnknownMember(_))
        ));
        assert!(!tree.contains(addr(0x03)));
    }

    #[test]
    fn test_duplicate_members_allowed() {
        let tree = WhitelistTree::new([addr(0x01), addr(0x01), addr(0x02)]).unwrap();
        assert_eq!(tree.len(), 3);
        let proof = tree.proof(addr(0x01)).unwrap();
        assert!(verify_proof(tree.root(), addr(0x01), &proof));
    }

    #[test]
    fn test_members_preserve_input_order() {
        let members = [addr(0x0C), addr(0x01), addr(0x07)];
        let tree = WhitelistTree::new(members).unwrap();
        let out: Vec<Address> = tree.members().collect();
        assert_eq!(out, members);
    }

    #[test]
    fn test_load_rejects_tampered_leaf() {
        let tree = WhitelistTree::new([addr(0x01), addr(0x02), addr(0x03)]).unwrap();
        let mut dump = tree.dump();
        let leaf_slot = dump.values[0].tree_index;
        dump.tree[leaf_slot] = B256::repeat_byte(0xFF);
        assert!(matches!(
            WhitelistTree::load(dump),
            Err(WhitelistError::InvalidDump(_))
        ));
    }

    #[test]
    fn test_load_rejects_tampered_internal_node() {
        let tree = WhitelistTree::new([addr(0x01), addr(0x02), addr(0x03)]).unwrap();
        let mut dump = tree.dump();
        dump.tree[0] = B256::repeat_byte(0xFF);
        assert!(matches!(
            WhitelistTree::load(dump),
            Err(WhitelistError::InvalidDump(_))
        ));
    }
}

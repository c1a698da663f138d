//! Properties of the Merkle whitelist construction.
//!
//! The tree must agree with the on-chain verifier: roots are
//! order-independent, every member proves its membership, and no
//! altered proof, leaf or root survives verification. The reference
//! vectors at the bottom pin the format against the JS tooling that
//! produced the original whitelists.

use alloy::primitives::{Address, B256};
use rand::seq::SliceRandom;
use rand::Rng;

use cert_registry::domain::whitelist::{
    leaf_hash, verify_leaf, verify_proof, WhitelistError, WhitelistTree,
};

fn random_addresses(n: usize) -> Vec<Address> {
    let mut rng = rand::thread_rng();
    (0..n).map(|_| Address::from(rng.gen::<[u8; 20]>())).collect()
}

fn flip_bit(value: B256, bit: usize) -> B256 {
    let mut bytes = value.0;
    bytes[bit / 8] ^= 1 << (bit % 8);
    B256::from(bytes)
}

#[test]
fn test_root_is_order_independent() {
    let members = random_addresses(12);
    let root = WhitelistTree::new(members.clone()).unwrap().root();

    let mut rng = rand::thread_rng();
    let mut shuffled = members;
    for _ in 0..5 {
        shuffled.shuffle(&mut rng);
        let permuted_root = WhitelistTree::new(shuffled.clone()).unwrap().root();
        assert_eq!(permuted_root, root);
    }
}

#[test]
fn test_every_member_verifies() {
    for n in [1usize, 2, 3, 5, 8, 16, 17] {
        let members = random_addresses(n);
        let tree = WhitelistTree::new(members.clone()).unwrap();
        for member in &members {
            let proof = tree.proof(*member).unwrap();
            assert!(
                verify_proof(tree.root(), *member, &proof),
                "member of a {n}-entry whitelist failed to verify"
            );
        }
    }
}

#[test]
fn test_non_member_never_verifies() {
    let members = random_addresses(8);
    let tree = WhitelistTree::new(members.clone()).unwrap();
    let outsider = Address::repeat_byte(0x99);
    assert!(!tree.contains(outsider));

    assert!(matches!(
        tree.proof(outsider),
        Err(WhitelistError::UnknownMember(_))
    ));

    // No member's proof can be replayed for the outsider.
    for member in &members {
        let proof = tree.proof(*member).unwrap();
        assert!(!verify_proof(tree.root(), outsider, &proof));
    }
}

#[test]
fn test_bit_flip_in_proof_fails() {
    let members = random_addresses(9);
    let tree = WhitelistTree::new(members.clone()).unwrap();
    let member = members[4];
    let proof = tree.proof(member).unwrap();
    assert!(verify_proof(tree.root(), member, &proof));

    for i in 0..proof.len() {
        for bit in [0usize, 137, 255] {
            let mut tampered = proof.clone();
            tampered[i] = flip_bit(tampered[i], bit);
            assert!(
                !verify_proof(tree.root(), member, &tampered),
                "flipping bit {bit} of proof element {i} still verified"
            );
        }
    }
}

#[test]
fn test_tampered_root_and_leaf_fail() {
    let members = random_addresses(6);
    let tree = WhitelistTree::new(members.clone()).unwrap();
    let member = members[0];
    let proof = tree.proof(member).unwrap();

    assert!(!verify_leaf(
        flip_bit(tree.root(), 0),
        leaf_hash(member),
        &proof
    ));
    assert!(!verify_leaf(
        tree.root(),
        flip_bit(leaf_hash(member), 42),
        &proof
    ));
}

#[test]
fn test_truncated_or_extended_proof_fails() {
    let members = random_addresses(8);
    let tree = WhitelistTree::new(members.clone()).unwrap();
    let member = members[2];
    let proof = tree.proof(member).unwrap();

    let truncated = &proof[..proof.len() - 1];
    assert!(!verify_proof(tree.root(), member, truncated));

    let mut extended = proof.clone();
    extended.push(B256::repeat_byte(0xEE));
    assert!(!verify_proof(tree.root(), member, &extended));
}

#[test]
fn test_dump_survives_json_round_trip() {
    let members = random_addresses(7);
    let tree = WhitelistTree::new(members.clone()).unwrap();

    let json = serde_json::to_string(&tree.dump()).unwrap();
    let reloaded = WhitelistTree::load(serde_json::from_str(&json).unwrap()).unwrap();

    assert_eq!(reloaded.root(), tree.root());
    for member in &members {
        let proof = reloaded.proof(*member).unwrap();
        assert!(verify_proof(tree.root(), *member, &proof));
    }
}

// ── Reference vectors ──
//
// Generated with the reference JS implementation
// (https://github.com/OpenZeppelin/merkle-tree):
//
// ```js
// const merkleTree = StandardMerkleTree.of(
//   toElements('ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/='),
//   ['string'],
// );
// const root = merkleTree.root;
// const hash = merkleTree.leafHash(['A']);
// const proof = merkleTree.getProof(['A']);
// ```
//
// The leaves are string-typed, so the vectors exercise the
// hash-level verifier shared by every leaf encoding.

#[test]
fn test_reference_vector_verifies() {
    let root: B256 = "0xb89eb120147840e813a77109b44063488a346b4ca15686185cf314320560d3f3"
        .parse()
        .unwrap();
    let leaf: B256 = "0x6efbf77e320741a027b50f02224545461f97cd83762d5fbfeb894b9eb3287c16"
        .parse()
        .unwrap();
    let proof: Vec<B256> = [
        "0x7051e21dd45e25ed8c605a53da6f77de151dcbf47b0e3ced3c5d8b61f4a13dbc",
        "0x1629d3b5b09b30449d258e35bbd09dd5e8a3abb91425ef810dc27eef995f7490",
        "0x633d21baee4bbe5ed5c51ac0c68f7946b8f28d2937f0ca7ef5e1ea9dbda52e7a",
        "0x8a65d3006581737a3bab46d9e4775dbc1821b1ea813d350a13fcd4f15a8942ec",
        "0xd6c3f3e36cd23ba32443f6a687ecea44ebfe2b8759a62cccf7759ec1fb563c76",
        "0x276141cd72b9b81c67f7182ff8a550b76eb96de9248a3ec027ac048c79649115",
    ]
    .iter()
    .map(|h| h.parse().unwrap())
    .collect();

    assert!(verify_leaf(root, leaf, &proof));
}

#[test]
fn test_reference_vector_rejects_foreign_proof() {
    // Proof taken from a different tree:
    //
    // ```js
    // const correctMerkleTree = StandardMerkleTree.of(toElements('abc'), ['string']);
    // const otherMerkleTree = StandardMerkleTree.of(toElements('def'), ['string']);
    // ```
    let root: B256 = "0xf2129b5a697531ef818f644564a6552b35c549722385bc52aa7fe46c0b5f46b1"
        .parse()
        .unwrap();
    let leaf: B256 = "0x9c15a6a0eaeed500fd9eed4cbeab71f797cefcc67bfd46683e4d2e6ff7f06d1c"
        .parse()
        .unwrap();
    let proof: B256 = "0x7b0c6cd04b82bfc0e250030a5d2690c52585e0cc6a4f3bc7909d7723b0236ece"
        .parse()
        .unwrap();

    assert!(!verify_leaf(root, leaf, &[proof]));
}

#[test]
fn test_reference_vector_rejects_short_proof() {
    let root: B256 = "0xf2129b5a697531ef818f644564a6552b35c549722385bc52aa7fe46c0b5f46b1"
        .parse()
        .unwrap();
    let leaf: B256 = "0x9c15a6a0eaeed500fd9eed4cbeab71f797cefcc67bfd46683e4d2e6ff7f06d1c"
        .parse()
        .unwrap();
    let full: Vec<B256> = [
        "0x19ba6c6333e0e9a15bf67523e0676e2f23eb8e574092552d5e888c64a4bb3681",
        "0x9cf5a63718145ba968a01c1d557020181c5b252f665cf7386d370eddb176517b",
    ]
    .iter()
    .map(|h| h.parse().unwrap())
    .collect();

    let short = &full[..1];
    assert!(!verify_leaf(root, leaf, short));
}

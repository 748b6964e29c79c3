//! # Concurrent Callers
//!
//! Transactions on a shared chain are serialized. Racing callers that
//! present the same nonce never both succeed.

use std::sync::{Arc, Barrier};
use std::thread;

use twosig_chain::Chain;
use twosig_core::{Address, Amount};
use twosig_escrow::ErrorKind;

fn addr(label: &str) -> Address {
    Address::from_label(label)
}

fn primed(chain: &Chain) -> Address {
    let owner = addr("owner");
    let escrow = chain.deploy_escrow(&owner, 2, 2).unwrap();
    chain.set_signer(&escrow, &owner, 0, addr("alice")).unwrap();
    chain.set_signer(&escrow, &owner, 1, addr("bob")).unwrap();
    let issuer = addr("issuer");
    let coin = chain.deploy_asset(&issuer, "SampleCoin", "SMPL", Amount::new(100)).unwrap();
    chain.transfer_asset(&coin, &issuer, &escrow, Amount::new(100)).unwrap();
    escrow
}

#[test]
fn same_nonce_is_consumed_exactly_once() {
    let chain = Chain::new();
    let escrow = primed(&chain);
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let chain = chain.clone();
            let barrier = Arc::clone(&barrier);
            let who = if i % 2 == 0 { "alice" } else { "bob" };
            thread::spawn(move || {
                barrier.wait();
                chain.propose_withdrawal(
                    &escrow,
                    &addr(who),
                    0,
                    Address::NULL,
                    addr("carol"),
                    Amount::ZERO,
                )
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for err in results.into_iter().filter_map(Result::err) {
        assert_eq!(err.kind(), ErrorKind::Nonce);
    }
    assert_eq!(chain.nonce(&escrow).unwrap(), 1);
}

#[test]
fn concurrent_signers_each_advance_the_nonce_once() {
    let chain = Chain::new();
    let escrow = primed(&chain);
    chain
        .propose_withdrawal(&escrow, &addr("alice"), 0, Address::NULL, addr("carol"), Amount::ZERO)
        .unwrap();

    // Each signer retries with the freshly read nonce until it lands.
    let handles: Vec<_> = ["alice", "bob"]
        .into_iter()
        .map(|who| {
            let chain = chain.clone();
            thread::spawn(move || loop {
                let nonce = chain.nonce(&escrow).unwrap();
                match chain.sign_proposal(&escrow, &addr(who), nonce, true) {
                    Ok(()) => break,
                    Err(e) => assert_eq!(e.kind(), ErrorKind::Nonce),
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(chain.nonce(&escrow).unwrap(), 3);
    assert!(chain.active_proposal(&escrow).unwrap().has_quorum());
}

//! # Factory
//!
//! Escrows created through a factory are independent of the reference and
//! of each other.

use twosig_chain::Chain;
use twosig_cli::deploy::deploy;
use twosig_core::{Address, Amount, Event};
use twosig_escrow::ErrorKind;
use twosig_ledger::CodeKind;

fn addr(label: &str) -> Address {
    Address::from_label(label)
}

#[test]
fn created_escrows_are_fresh_and_independent() {
    let chain = Chain::new();
    let deployment = deploy(&chain, &addr("deployer")).unwrap();

    let first = chain.create_escrow(&deployment.factory, &addr("t1"), 2, 2).unwrap();
    let second = chain.create_escrow(&deployment.factory, &addr("t2"), 2, 2).unwrap();
    assert_ne!(first, second);
    assert_ne!(first, deployment.escrow);
    chain.read(|w| {
        assert_eq!(w.ledger().code_at(&first), Some(CodeKind::Escrow));
        assert_eq!(w.ledger().code_at(&deployment.factory), Some(CodeKind::Factory));
    });

    chain.set_signer(&first, &addr("t1"), 0, addr("a")).unwrap();
    chain.set_signer(&first, &addr("t1"), 1, addr("b")).unwrap();
    assert_eq!(chain.controller(&first).unwrap(), Address::NULL);
    assert_eq!(chain.controller(&second).unwrap(), addr("t2"));
    assert_eq!(chain.controller(&deployment.escrow).unwrap(), addr("deployer"));
    assert_eq!(chain.signers(&second).unwrap(), [Address::NULL; 2]);

    let issuer = addr("issuer");
    let coin = chain.deploy_asset(&issuer, "SampleCoin", "SMPL", Amount::new(10)).unwrap();
    chain.transfer_asset(&coin, &issuer, &first, Amount::new(10)).unwrap();
    assert_eq!(chain.deposits_of(&first, &coin).unwrap(), Amount::new(10));
    assert_eq!(chain.deposits_of(&second, &coin).unwrap(), Amount::ZERO);
}

#[test]
fn creation_is_announced_with_caller_as_controller() {
    let chain = Chain::new();
    let deployment = deploy(&chain, &addr("deployer")).unwrap();
    let created = chain.create_escrow(&deployment.factory, &addr("tenant"), 2, 2).unwrap();

    let announced: Vec<_> = chain
        .events()
        .into_iter()
        .filter(|e| e.emitter == deployment.factory)
        .filter_map(|e| match e.event {
            Event::EscrowCreated { escrow, controller } => Some((escrow, controller)),
            _ => None,
        })
        .collect();
    assert_eq!(announced, [(created, addr("tenant"))]);
}

#[test]
fn unsupported_quorum_leaves_no_trace() {
    let chain = Chain::new();
    let deployment = deploy(&chain, &addr("deployer")).unwrap();
    let height = chain.block_height();
    let events = chain.events().len();

    for (n, q) in [(3, 2), (2, 1), (2, 3)] {
        let err = chain
            .create_escrow(&deployment.factory, &addr("tenant"), n, q)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
    assert_eq!(chain.block_height(), height);
    assert_eq!(chain.events().len(), events);
}

#[test]
fn direct_deployment_rejects_unsupported_quorum() {
    let chain = Chain::new();
    let err = chain.deploy_escrow(&addr("deployer"), 1, 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

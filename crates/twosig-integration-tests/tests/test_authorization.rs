//! # Authorization
//!
//! Who may call what: controller-only priming, signer-only proposals and
//! approvals, anyone-may-execute.

use twosig_chain::Chain;
use twosig_core::{Address, Amount};
use twosig_escrow::{ErrorKind, Proposal};

fn addr(label: &str) -> Address {
    Address::from_label(label)
}

struct Setup {
    chain: Chain,
    escrow: Address,
    coin: Address,
    owner: Address,
    a1: Address,
    a2: Address,
}

fn primed_with_coin() -> Setup {
    let chain = Chain::new();
    let owner = addr("owner");
    let (a1, a2) = (addr("addr1"), addr("addr2"));
    let escrow = chain.deploy_escrow(&owner, 2, 2).unwrap();
    chain.set_signer(&escrow, &owner, 0, a1).unwrap();
    chain.set_signer(&escrow, &owner, 1, a2).unwrap();
    let coin = chain
        .deploy_asset(&owner, "SampleCoin", "SMPL", Amount::new(1_000_000))
        .unwrap();
    Setup {
        chain,
        escrow,
        coin,
        owner,
        a1,
        a2,
    }
}

#[test]
fn controller_access_is_restrictive() {
    let chain = Chain::new();
    let owner = addr("owner");
    let (a1, a2) = (addr("addr1"), addr("addr2"));
    let escrow = chain.deploy_escrow(&owner, 2, 2).unwrap();

    let err = chain.set_signer(&escrow, &a1, 0, owner).unwrap_err();
    assert_eq!(err.to_string(), "Only owner can do this!");
    assert_eq!(chain.signers(&escrow).unwrap(), [Address::NULL; 2]);

    chain.set_signer(&escrow, &owner, 0, a1).unwrap();
    assert_eq!(chain.signers(&escrow).unwrap(), [a1, Address::NULL]);
    assert_eq!(chain.controller(&escrow).unwrap(), owner);

    // Overwriting an assigned slot is allowed until priming.
    chain.set_signer(&escrow, &owner, 0, owner).unwrap();
    assert_eq!(chain.signers(&escrow).unwrap(), [owner, Address::NULL]);
    assert_eq!(chain.controller(&escrow).unwrap(), owner);

    chain.set_signer(&escrow, &owner, 1, a2).unwrap();
    assert_eq!(chain.signers(&escrow).unwrap(), [owner, a2]);
    assert_eq!(chain.controller(&escrow).unwrap(), Address::NULL);

    let err = chain.set_signer(&escrow, &owner, 0, a1).unwrap_err();
    assert_eq!(err.to_string(), "This function is permanently deactivated!");
    assert_eq!(chain.controller(&escrow).unwrap(), Address::NULL);
}

#[test]
fn priming_is_one_way_for_every_caller() {
    let s = primed_with_coin();
    for caller in [s.owner, s.a1, s.a2, addr("stranger")] {
        let err = s.chain.set_signer(&s.escrow, &caller, 1, caller).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
    }
    assert_eq!(s.chain.signers(&s.escrow).unwrap(), [s.a1, s.a2]);
}

#[test]
fn proposal_control_is_restrictive() {
    let s = primed_with_coin();
    let (chain, escrow, coin) = (&s.chain, &s.escrow, s.coin);

    let nonce = chain.nonce(escrow).unwrap();
    let err = chain
        .propose_withdrawal(escrow, &s.owner, nonce, coin, coin, Amount::new(10))
        .unwrap_err();
    assert_eq!(err.to_string(), "Only signers can do this!");

    chain
        .propose_withdrawal(escrow, &s.a1, nonce, coin, s.a1, Amount::ZERO)
        .unwrap();
    let proposal = chain.active_proposal(escrow).unwrap();
    assert_eq!(proposal.token, coin);
    assert_eq!(proposal.amount, Amount::ZERO);

    let nonce = chain.nonce(escrow).unwrap();
    let err = chain
        .propose_withdrawal(escrow, &s.a1, nonce - 1, coin, s.a1, Amount::ZERO)
        .unwrap_err();
    assert!(err.to_string().starts_with("Wrong nonce"));

    let err = chain
        .propose_withdrawal(escrow, &s.a1, nonce, coin, s.a1, Amount::new(100))
        .unwrap_err();
    assert!(err.to_string().starts_with("Not enough in deposits"));

    // A token address that is not an asset contract reverts.
    let err = chain
        .propose_withdrawal(escrow, &s.a1, nonce, s.owner, s.a1, Amount::ZERO)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Collaborator);

    chain
        .propose_withdrawal(escrow, &s.a2, nonce, coin, s.a2, Amount::ZERO)
        .unwrap();
    let proposal = chain.active_proposal(escrow).unwrap();
    assert_eq!(proposal.receiver, s.a2);
    assert_eq!(proposal.amount, Amount::ZERO);
}

#[test]
fn signing_is_restrictive() {
    let s = primed_with_coin();
    let (chain, escrow, coin) = (&s.chain, &s.escrow, s.coin);

    let nonce = chain.nonce(escrow).unwrap();
    chain
        .propose_withdrawal(escrow, &s.a1, nonce, coin, s.a1, Amount::ZERO)
        .unwrap();

    let nonce = chain.nonce(escrow).unwrap();
    let err = chain.sign_proposal(escrow, &s.owner, nonce, true).unwrap_err();
    assert_eq!(err.to_string(), "Only signers can do this!");

    chain.sign_proposal(escrow, &s.a1, nonce, true).unwrap();
    assert_eq!(chain.active_proposal(escrow).unwrap().approvals, [true, false]);

    let nonce = chain.nonce(escrow).unwrap();
    chain.sign_proposal(escrow, &s.a1, nonce, false).unwrap();
    assert_eq!(chain.active_proposal(escrow).unwrap().approvals, [false, false]);

    let nonce = chain.nonce(escrow).unwrap();
    chain.sign_proposal(escrow, &s.a2, nonce, true).unwrap();
    assert_eq!(chain.active_proposal(escrow).unwrap().approvals, [false, true]);
}

#[test]
fn indexed_signing_binds_caller_to_own_slot() {
    let s = primed_with_coin();
    let (chain, escrow, coin) = (&s.chain, &s.escrow, s.coin);
    chain
        .propose_withdrawal(escrow, &s.a1, 0, coin, s.a1, Amount::ZERO)
        .unwrap();

    let err = chain
        .sign_proposal_indexed(escrow, &s.a1, 1, 1, true)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert_eq!(chain.nonce(escrow).unwrap(), 1);

    chain.sign_proposal_indexed(escrow, &s.a1, 1, 0, true).unwrap();
    chain.sign_proposal_indexed(escrow, &s.a2, 2, 1, true).unwrap();
    assert!(chain.active_proposal(escrow).unwrap().has_quorum());
}

#[test]
fn anyone_may_execute_but_only_with_quorum() {
    let s = primed_with_coin();
    let (chain, escrow, coin) = (&s.chain, &s.escrow, s.coin);
    chain.transfer_asset(&coin, &s.owner, escrow, Amount::new(10)).unwrap();

    let err = chain.execute_proposal(escrow, &addr("stranger")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);

    chain
        .propose_withdrawal(escrow, &s.a1, 0, coin, s.a1, Amount::new(10))
        .unwrap();
    chain.sign_proposal(escrow, &s.a1, 1, true).unwrap();
    let err = chain.execute_proposal(escrow, &addr("stranger")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);

    chain.sign_proposal(escrow, &s.a2, 2, true).unwrap();
    chain.execute_proposal(escrow, &addr("stranger")).unwrap();
    assert_eq!(chain.active_proposal(escrow).unwrap(), Proposal::EMPTY);
    assert_eq!(chain.asset_balance(&coin, &s.a1).unwrap(), Amount::new(10));
}

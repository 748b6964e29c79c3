//! # Escrow Phase
//!
//! ```text
//! Unprimed { controller, slots } ──set_signer() fills both slots──▶ Primed { signers }
//! ```
//!
//! An unprimed escrow has a controller and two optional signer slots. The
//! assignment that fills the second slot moves it to `Primed`, dropping the
//! controller in the same step. There is no transition out of `Primed`:
//! the signer pair is frozen and nobody can reassign it.
//!
//! ## Security Invariant
//!
//! Signer rights exist only in `Primed`. While unprimed, the controller can
//! still rewrite the slots, so an address sitting in a slot cannot propose
//! or sign yet.
//!
//! `assign` is the only way to reach `Primed`. A phase can be serialized
//! for reports but never deserialized, so a signer pair cannot be forged
//! from external input:
//!
//! ```compile_fail
//! use twosig_escrow::Phase;
//!
//! // ERROR: `Phase` does not implement `Deserialize`
//! let forged: Phase = serde_json::from_str(r#"{"phase":"primed","signers":[null,null]}"#).unwrap();
//! ```

use serde::Serialize;
use twosig_core::Address;

use crate::config::SIGNER_SLOTS;
use crate::error::EscrowError;

/// Lifecycle phase of an escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    /// Controller present; slots may be rewritten.
    Unprimed {
        /// The only address allowed to assign signers.
        controller: Address,
        /// Signer slots; `None` is unassigned.
        slots: [Option<Address>; SIGNER_SLOTS],
    },
    /// Signer pair fixed; controller gone.
    Primed {
        /// The two signers, by slot.
        signers: [Address; SIGNER_SLOTS],
    },
}

/// Result of a successful signer assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// At least one slot is still empty.
    Pending,
    /// Both slots are filled; the escrow is now primed.
    Primed([Address; SIGNER_SLOTS]),
}

impl Phase {
    /// A freshly deployed escrow.
    pub fn unprimed(controller: Address) -> Self {
        Phase::Unprimed {
            controller,
            slots: [None; SIGNER_SLOTS],
        }
    }

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Unprimed { .. } => "UNPRIMED",
            Phase::Primed { .. } => "PRIMED",
        }
    }

    /// Whether the signer pair is frozen.
    pub fn is_primed(&self) -> bool {
        matches!(self, Phase::Primed { .. })
    }

    /// The controller, or the null address once primed.
    pub fn controller(&self) -> Address {
        match self {
            Phase::Unprimed { controller, .. } => *controller,
            Phase::Primed { .. } => Address::NULL,
        }
    }

    /// Signer per slot; unassigned slots read as the null address.
    ///
    /// While unprimed this reports pending assignments, which carry no
    /// rights yet. Use [`Phase::slot_of`] to ask whether an address may act
    /// as a signer.
    pub fn signers(&self) -> [Address; SIGNER_SLOTS] {
        match self {
            Phase::Unprimed { slots, .. } => slots.map(|s| s.unwrap_or(Address::NULL)),
            Phase::Primed { signers } => *signers,
        }
    }

    /// Slot held by `who`, if the escrow is primed and `who` is a signer.
    pub fn slot_of(&self, who: &Address) -> Option<u8> {
        match self {
            Phase::Unprimed { .. } => None,
            Phase::Primed { signers } => signers
                .iter()
                .position(|s| s == who)
                .and_then(|i| u8::try_from(i).ok()),
        }
    }

    /// Assign `signer` to slot `index` on behalf of `caller`.
    ///
    /// Checks run in order: phase, controller, index, duplicate. Assigning
    /// the null address clears the slot. On error the phase is unchanged.
    pub(crate) fn assign(
        &mut self,
        caller: &Address,
        index: u8,
        signer: Address,
    ) -> Result<Assignment, EscrowError> {
        let Phase::Unprimed { controller, slots } = self else {
            return Err(EscrowError::PermanentlyDeactivated);
        };
        let (controller, mut next) = (*controller, *slots);

        if *caller != controller {
            return Err(EscrowError::NotController { caller: *caller });
        }
        let slot = usize::from(index);
        if slot >= SIGNER_SLOTS {
            return Err(EscrowError::InvalidSignerIndex(index));
        }

        if signer.is_null() {
            next[slot] = None;
        } else {
            let other = SIGNER_SLOTS - 1 - slot;
            if next[other] == Some(signer) {
                return Err(EscrowError::DuplicateSigner {
                    signer,
                    index: other as u8,
                });
            }
            next[slot] = Some(signer);
        }

        match next {
            [Some(first), Some(second)] => {
                let signers = [first, second];
                *self = Phase::Primed { signers };
                Ok(Assignment::Primed(signers))
            }
            _ => {
                *self = Phase::Unprimed {
                    controller,
                    slots: next,
                };
                Ok(Assignment::Pending)
            }
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn addr(label: &str) -> Address {
        Address::from_label(label)
    }

    #[test]
    fn filling_both_slots_primes_and_drops_controller() {
        let owner = addr("owner");
        let mut phase = Phase::unprimed(owner);
        assert_eq!(phase.assign(&owner, 0, addr("a")).unwrap(), Assignment::Pending);
        assert_eq!(phase.controller(), owner);
        assert_eq!(phase.signers(), [addr("a"), Address::NULL]);

        let done = phase.assign(&owner, 1, addr("b")).unwrap();
        assert_eq!(done, Assignment::Primed([addr("a"), addr("b")]));
        assert!(phase.is_primed());
        assert_eq!(phase.controller(), Address::NULL);
        assert_eq!(phase.to_string(), "PRIMED");
    }

    #[test]
    fn primed_phase_rejects_everyone_before_checking_caller() {
        let owner = addr("owner");
        let mut phase = Phase::Primed {
            signers: [addr("a"), addr("b")],
        };
        let before = phase.clone();
        for caller in [owner, addr("a"), addr("stranger")] {
            let err = phase.assign(&caller, 0, addr("c")).unwrap_err();
            assert_eq!(err, EscrowError::PermanentlyDeactivated);
        }
        assert_eq!(phase, before);
    }

    #[test]
    fn non_controller_is_rejected() {
        let mut phase = Phase::unprimed(addr("owner"));
        let err = phase.assign(&addr("a"), 0, addr("a")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(phase, Phase::unprimed(addr("owner")));
    }

    #[test]
    fn index_out_of_range_is_rejected() {
        let owner = addr("owner");
        let mut phase = Phase::unprimed(owner);
        assert_eq!(
            phase.assign(&owner, 2, addr("a")).unwrap_err(),
            EscrowError::InvalidSignerIndex(2)
        );
    }

    #[test]
    fn same_signer_cannot_hold_both_slots() {
        let owner = addr("owner");
        let mut phase = Phase::unprimed(owner);
        phase.assign(&owner, 0, addr("a")).unwrap();
        let err = phase.assign(&owner, 1, addr("a")).unwrap_err();
        assert_eq!(
            err,
            EscrowError::DuplicateSigner {
                signer: addr("a"),
                index: 0
            }
        );
        assert!(!phase.is_primed());
    }

    #[test]
    fn null_signer_clears_slot_and_overwrite_is_allowed() {
        let owner = addr("owner");
        let mut phase = Phase::unprimed(owner);
        phase.assign(&owner, 0, addr("a")).unwrap();
        phase.assign(&owner, 0, Address::NULL).unwrap();
        assert_eq!(phase.signers(), [Address::NULL, Address::NULL]);
        phase.assign(&owner, 0, addr("b")).unwrap();
        phase.assign(&owner, 0, addr("c")).unwrap();
        assert_eq!(phase.signers()[0], addr("c"));
    }

    #[test]
    fn slot_of_requires_primed() {
        let owner = addr("owner");
        let mut phase = Phase::unprimed(owner);
        phase.assign(&owner, 0, addr("a")).unwrap();
        assert_eq!(phase.slot_of(&addr("a")), None);
        phase.assign(&owner, 1, addr("b")).unwrap();
        assert_eq!(phase.slot_of(&addr("a")), Some(0));
        assert_eq!(phase.slot_of(&addr("b")), Some(1));
        assert_eq!(phase.slot_of(&owner), None);
    }

    #[test]
    fn phase_serializes_with_tag() {
        let phase = Phase::Primed {
            signers: [addr("a"), addr("b")],
        };
        let json = serde_json::to_value(&phase).unwrap();
        assert_eq!(json["phase"], "primed");
        assert_eq!(json["signers"][0], addr("a").to_string());
    }
}

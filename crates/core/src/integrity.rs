//! Integration Glue (`spec.md` §2 item 15): the background resource-
//! integrity check and the local platform fingerprint. Both are ports —
//! this crate never touches a filesystem or OS API directly, per the
//! `GameSurface` boundary in §1.

use crate::crypto::domain_hash;
use crate::telemetry::{ErrorQueue, Severity};

/// A 32-byte local device identifier (`SPEC_FULL.md` §9 "platform
/// fingerprint"). Never sent on the wire: it only seeds
/// [`local_storage_key`], which encrypts persisted tokens at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformFingerprint(pub [u8; 32]);

/// Predetermined fallback fingerprint used when the embedder's platform
/// probe fails, so a device that can't compute a stable identifier still
/// gets a deterministic (if not device-unique) local key rather than a
/// fresh random one every launch.
const FALLBACK_FINGERPRINT: [u8; 32] = *b"globed-core-fallback-fingerprnt\0";

/// Computes the platform fingerprint, which is OS/hardware specific and
/// thus out of this crate's scope (`spec.md` §1). The embedder supplies
/// the probe; a probe failure falls back to a fixed constant rather than
/// failing the caller.
pub trait FingerprintPort {
    fn compute(&self) -> Option<[u8; 32]>;
}

pub fn fingerprint(port: &dyn FingerprintPort) -> PlatformFingerprint {
    PlatformFingerprint(port.compute().unwrap_or(FALLBACK_FINGERPRINT))
}

/// Derives the local symmetric key used to encrypt persisted tokens (the
/// authkey, cached server-list payload) before they reach the
/// `SettingsStore`. Distinct domain from [`crate::auth`]'s wire-facing
/// hash so a leaked save file and a leaked wire capture can't cross-derive
/// each other's keys.
pub fn local_storage_key(fingerprint: PlatformFingerprint) -> [u8; 32] {
    domain_hash("local-fingerprint", &fingerprint.0)
}

/// What the embedder found when asked to verify its own bundled
/// resources are intact (sprite sheets, sound banks, ...). The concrete
/// checks are asset-format specific and belong entirely to the embedder;
/// this crate only aggregates the yes/no verdicts into telemetry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    pub all_resources_present: bool,
    pub severely_broken: bool,
}

pub trait ResourceIntegrityPort {
    fn check_resources(&self) -> IntegrityReport;
}

/// Runs the resource-integrity check once and surfaces any failure to the
/// error queue. Respects the `skip-resource-check` launch flag
/// (`spec.md` §6 CLI/env) by simply not being called when it's set — the
/// caller is expected to gate the call, not this function.
pub fn check_resources(port: &dyn ResourceIntegrityPort, telemetry: &ErrorQueue) -> IntegrityReport {
    let report = port.check_resources();
    if report.severely_broken {
        telemetry.push(Severity::Error, "bundled resources are severely broken; some visuals will be missing");
    } else if !report.all_resources_present {
        telemetry.push(Severity::Warn, "some bundled resources are missing; falling back to builtin assets");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingFingerprint;
    impl FingerprintPort for FailingFingerprint {
        fn compute(&self) -> Option<[u8; 32]> {
            None
        }
    }

    struct StableFingerprint;
    impl FingerprintPort for StableFingerprint {
        fn compute(&self) -> Option<[u8; 32]> {
            Some([7u8; 32])
        }
    }

    #[test]
    fn failed_probe_falls_back_to_the_fixed_constant() {
        let a = fingerprint(&FailingFingerprint);
        let b = fingerprint(&FailingFingerprint);
        assert_eq!(a, b);
        assert_eq!(a.0, FALLBACK_FINGERPRINT);
    }

    #[test]
    fn storage_key_is_deterministic_per_fingerprint() {
        let fp = fingerprint(&StableFingerprint);
        assert_eq!(local_storage_key(fp), local_storage_key(fp));
    }

    #[test]
    fn different_fingerprints_derive_different_keys() {
        let a = fingerprint(&StableFingerprint);
        let b = fingerprint(&FailingFingerprint);
        assert_ne!(local_storage_key(a), local_storage_key(b));
    }

    struct OkResources;
    impl ResourceIntegrityPort for OkResources {
        fn check_resources(&self) -> IntegrityReport {
            IntegrityReport {
                all_resources_present: true,
                severely_broken: false,
            }
        }
    }

    struct BrokenResources;
    impl ResourceIntegrityPort for BrokenResources {
        fn check_resources(&self) -> IntegrityReport {
            IntegrityReport {
                all_resources_present: false,
                severely_broken: true,
            }
        }
    }

    #[test]
    fn intact_resources_push_no_telemetry() {
        let telemetry = ErrorQueue::default();
        check_resources(&OkResources, &telemetry);
        assert!(telemetry.is_empty());
    }

    #[test]
    fn broken_resources_push_an_error() {
        let telemetry = ErrorQueue::default();
        check_resources(&BrokenResources, &telemetry);
        assert_eq!(telemetry.drain().len(), 1);
    }
}

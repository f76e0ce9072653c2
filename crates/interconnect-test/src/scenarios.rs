//! Handoff scenarios across an in-process federation

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::json;
use tokio::time::Instant;

use interconnect_authority::TransferOutcome;
use interconnect_core::{
    AuthorityState, CorrelationId, Identity, InterconnectError, InterconnectResult, ServerRef,
    UnitKey,
};
use interconnect_crypto::{seal, Keypair, UnsignedIdentity};
use interconnect_policy::{ImportPolicy, Predicate};
use interconnect_transport::{TransferHandler, TransferLink};
use interconnect_wire::{TransferMessage, TransferReply};

use crate::Federation;

fn veterans() -> ImportPolicy {
    ImportPolicy::new("veterans")
        .accept_if(Predicate::exists("age_days".parse().unwrap()))
        .reject_if(
            Predicate::lt("payload.age_days".parse().unwrap(), 30),
            "account too new",
        )
        .strip_field("payload.debug".parse().unwrap())
}

fn zone(name: &str) -> ServerRef {
    ServerRef::new(name)
}

#[tokio::test]
async fn test_age_policy_rejects_then_admits() {
    let federation = Federation::builder()
        .open_server("zone-a")
        .server("zone-b", veterans())
        .build()
        .unwrap();
    let a = federation.server("zone-a");
    let keypair = Keypair::generate();

    let rookie = UnitKey::from("rookie");
    a.claim(&rookie).unwrap();
    let outcome = a
        .transfer_passport(&rookie, &zone("zone-b"), &br#"{"age_days": 10}"#[..], &keypair)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        TransferOutcome::Rejected(InterconnectError::PolicyRejected("account too new".into()))
    );
    assert_eq!(a.state(&rookie), Some(AuthorityState::Active));
    assert_eq!(federation.sole_authority(&rookie), Some("zone-a"));

    let veteran = UnitKey::from("veteran");
    a.claim(&veteran).unwrap();
    let outcome = a
        .transfer_passport(
            &veteran,
            &zone("zone-b"),
            &br#"{"age_days": 45, "debug": {"god_mode": true}}"#[..],
            &keypair,
        )
        .await
        .unwrap();
    match outcome {
        TransferOutcome::Accepted(ack) => assert_eq!(ack.stripped, vec!["payload.debug".to_string()]),
        other => panic!("expected admission, got {other:?}"),
    }
    assert_eq!(federation.sole_authority(&veteran), Some("zone-b"));
    assert_eq!(
        a.state(&veteran),
        Some(AuthorityState::Transferred { to: zone("zone-b") })
    );

    let admissions = federation.member("zone-b").host.admissions();
    assert_eq!(admissions.len(), 1);
    assert_eq!(admissions[0].identity, keypair.identity().clone());
    assert_eq!(admissions[0].value, json!({"age_days": 45}));
}

#[tokio::test]
async fn test_tampered_signature_is_rejected() {
    let federation = Federation::builder()
        .open_server("zone-a")
        .open_server("zone-b")
        .build()
        .unwrap();
    let a = federation.server("zone-a");
    let unit = UnitKey::from("player-1");
    a.claim(&unit).unwrap();

    let mut envelope = seal("zone-b", &b"{}"[..], &Keypair::generate());
    let mut signature = envelope.signature.clone().unwrap().to_vec();
    signature[7] ^= 0x10;
    envelope.signature = Some(Bytes::from(signature));

    let outcome = a.transfer(&unit, &zone("zone-b"), envelope).await.unwrap();
    assert_eq!(outcome, TransferOutcome::Rejected(InterconnectError::SignatureInvalid));
    assert!(!InterconnectError::SignatureInvalid.is_retryable());
    assert_eq!(federation.sole_authority(&unit), Some("zone-a"));
    assert!(federation.member("zone-b").host.admissions().is_empty());
}

#[tokio::test]
async fn test_trusting_schemes_need_no_signature() {
    let federation = Federation::builder()
        .open_server("zone-a")
        .open_server("zone-b")
        .open_server("zone-c")
        .build()
        .unwrap();
    let a = federation.server("zone-a");

    let by_url = UnitKey::from("ann");
    a.claim(&by_url).unwrap();
    let signer = UnsignedIdentity(Identity::url("ann@zone-a.example"));
    let outcome = a
        .transfer_passport(&by_url, &zone("zone-b"), &b"{}"[..], &signer)
        .await
        .unwrap();
    assert!(outcome.is_accepted());

    let by_local = UnitKey::from("bob");
    a.claim(&by_local).unwrap();
    let signer = UnsignedIdentity(Identity::local("bob"));
    let outcome = a
        .transfer_passport(&by_local, &zone("zone-c"), &b"{}"[..], &signer)
        .await
        .unwrap();
    assert!(outcome.is_accepted());

    // No strategy registered for this scheme
    let stranger = UnitKey::from("stranger");
    a.claim(&stranger).unwrap();
    let signer = UnsignedIdentity("dilithium:ab12".parse().unwrap());
    let outcome = a
        .transfer_passport(&stranger, &zone("zone-b"), &b"{}"[..], &signer)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        TransferOutcome::Rejected(InterconnectError::UnknownScheme("dilithium".into()))
    );
}

#[tokio::test]
async fn test_replayed_transfer_admits_once() {
    let federation = Federation::builder()
        .open_server("zone-a")
        .open_server("zone-b")
        .build()
        .unwrap();
    let unit = UnitKey::from("player-1");
    let message = TransferMessage {
        correlation: CorrelationId::generate(),
        unit: unit.clone(),
        origin: zone("zone-a"),
        envelope: seal("zone-b", &br#"{"hp": 7}"#[..], &Keypair::generate()),
    };

    let link = &federation.member("zone-b").link;
    let first = link.deliver(message.clone()).await.unwrap();
    let second = link.deliver(message).await.unwrap();

    assert!(first.is_accepted());
    assert_eq!(first, second);
    assert_eq!(federation.member("zone-b").host.admissions().len(), 1);
    assert_eq!(federation.sole_authority(&unit), Some("zone-b"));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_transfers_only_one_wins() {
    let federation = Federation::builder()
        .open_server("zone-a")
        .open_server("zone-b")
        .open_server("zone-c")
        .build()
        .unwrap();
    for name in ["zone-b", "zone-c"] {
        federation
            .member(name)
            .link
            .set_latency(Some(Duration::from_millis(100)));
    }
    let a = federation.server("zone-a");
    let unit = UnitKey::from("castle");
    a.claim(&unit).unwrap();
    let keypair = Keypair::generate();

    let (zone_b, zone_c) = (zone("zone-b"), zone("zone-c"));
    let (to_b, to_c) = tokio::join!(
        a.transfer_passport(&unit, &zone_b, &b"{}"[..], &keypair),
        a.transfer_passport(&unit, &zone_c, &b"{}"[..], &keypair),
    );

    let results = [to_b, to_c];
    let accepted = results
        .iter()
        .filter(|r| matches!(r, Ok(TransferOutcome::Accepted(_))))
        .count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(InterconnectError::TransferConflict(_))))
        .count();
    assert_eq!((accepted, conflicts), (1, 1));
    assert_eq!(federation.sole_authority(&unit), Some("zone-b"));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_rolls_back_then_retry_elsewhere() {
    let timeout = Duration::from_secs(2);
    let federation = Federation::builder()
        .open_server("zone-a")
        .open_server("zone-b")
        .open_server("zone-c")
        .transfer_timeout(timeout)
        .build()
        .unwrap();
    // zone-b never answers in time
    federation
        .member("zone-b")
        .link
        .set_latency(Some(Duration::from_secs(3600)));

    let a = federation.server("zone-a");
    let unit = UnitKey::from("caravan");
    a.claim(&unit).unwrap();
    let keypair = Keypair::generate();

    let started = Instant::now();
    let outcome = a
        .transfer_passport(&unit, &zone("zone-b"), &b"{}"[..], &keypair)
        .await
        .unwrap();
    assert!(matches!(outcome, TransferOutcome::TimedOut { .. }));
    assert!(started.elapsed() <= timeout);
    assert_eq!(a.state(&unit), Some(AuthorityState::Active));
    assert!(a.table().pending(&unit).is_none());

    let outcome = a
        .transfer_passport(&unit, &zone("zone-c"), &b"{}"[..], &keypair)
        .await
        .unwrap();
    assert!(outcome.is_accepted());
    assert_eq!(federation.sole_authority(&unit), Some("zone-c"));
    assert_eq!(federation.server("zone-b").state(&unit), None);
}

/// Admits immediately, then holds the first reply back for `delay`
struct LateAck {
    handler: Arc<dyn TransferHandler>,
    delay: Mutex<Option<Duration>>,
}

#[async_trait]
impl TransferLink for LateAck {
    async fn deliver(&self, message: TransferMessage) -> InterconnectResult<TransferReply> {
        let reply = self.handler.handle_transfer(message).await;
        let delay = self.delay.lock().take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(reply)
    }
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_late_ack_commits_once() {
    let federation = Federation::builder()
        .open_server("zone-a")
        .open_server("zone-b")
        .transfer_timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    federation.links().register(
        zone("zone-b"),
        Arc::new(LateAck {
            handler: federation.server("zone-b").border(),
            delay: Mutex::new(Some(Duration::from_secs(10))),
        }),
    );

    let a = federation.server("zone-a");
    let unit = UnitKey::from("courier");
    a.claim(&unit).unwrap();
    let envelope = seal("zone-b", &br#"{"hp": 12}"#[..], &Keypair::generate());

    let correlation = match a
        .transfer(&unit, &zone("zone-b"), envelope.clone())
        .await
        .unwrap()
    {
        TransferOutcome::TimedOut { correlation } => correlation,
        other => panic!("expected a timeout, got {other:?}"),
    };
    // The destination admitted but the origin never heard back
    assert_eq!(federation.authorities(&unit), vec!["zone-a", "zone-b"]);

    let outcome = a
        .retry_transfer(&unit, &zone("zone-b"), envelope, correlation)
        .await
        .unwrap();
    match outcome {
        TransferOutcome::Accepted(ack) => assert_eq!(ack.correlation, correlation),
        other => panic!("expected acceptance, got {other:?}"),
    }
    assert_eq!(
        a.state(&unit),
        Some(AuthorityState::Transferred { to: zone("zone-b") })
    );
    assert_eq!(federation.sole_authority(&unit), Some("zone-b"));
    assert_eq!(federation.member("zone-b").host.admissions().len(), 1);
}

#[tokio::test]
async fn test_partitioned_destination_is_retryable() {
    let federation = Federation::builder()
        .open_server("zone-a")
        .open_server("zone-b")
        .build()
        .unwrap();
    let a = federation.server("zone-a");
    let unit = UnitKey::from("player-1");
    a.claim(&unit).unwrap();
    let keypair = Keypair::generate();

    federation.member("zone-b").link.set_partitioned(true);
    let err = a
        .transfer_passport(&unit, &zone("zone-b"), &b"{}"[..], &keypair)
        .await
        .unwrap_err();
    assert_eq!(err, InterconnectError::Unreachable);
    assert!(err.is_retryable());
    assert_eq!(a.state(&unit), Some(AuthorityState::Active));

    federation.member("zone-b").link.set_partitioned(false);
    let outcome = a
        .transfer_passport(&unit, &zone("zone-b"), &b"{}"[..], &keypair)
        .await
        .unwrap();
    assert!(outcome.is_accepted());
}

#[tokio::test]
async fn test_unreachable_authority_degrades_to_ghost() {
    let federation = Federation::builder()
        .open_server("zone-a")
        .unreachable_threshold(3)
        .build()
        .unwrap();
    let member = federation.member("zone-a");
    let a = &member.server;
    let unit = UnitKey::from("city");
    a.claim(&unit).unwrap();
    let hash = a.write_substrate(&unit, &b"city geometry"[..]).unwrap();
    member.host.bind_substrate(unit.clone(), vec![hash]);

    member.host.set_reachable(false);
    for _ in 0..2 {
        a.probe_now().await;
    }
    assert_eq!(a.state(&unit), Some(AuthorityState::Active));
    a.probe_now().await;
    assert_eq!(a.state(&unit), Some(AuthorityState::Ghost));

    assert_eq!(a.read_substrate(&hash).unwrap().bytes().as_ref(), b"city geometry");
    assert_eq!(
        a.write_substrate(&unit, &b"new tower"[..]),
        Err(InterconnectError::AuthorityRequired(AuthorityState::Ghost))
    );
    assert_eq!(federation.sole_authority(&unit), Some("zone-a"));

    member.host.set_reachable(true);
    a.probe_now().await;
    assert_eq!(a.state(&unit), Some(AuthorityState::Active));
    assert!(a.write_substrate(&unit, &b"new tower"[..]).is_ok());
}

#[tokio::test]
async fn test_unreachable_without_substrate_goes_dark() {
    let federation = Federation::builder().open_server("zone-a").build().unwrap();
    let member = federation.member("zone-a");
    let unit = UnitKey::from("dungeon");
    member.server.claim(&unit).unwrap();
    member.host.bind_substrate(unit.clone(), vec![]);

    member.host.set_reachable(false);
    for _ in 0..4 {
        member.server.probe_now().await;
    }
    assert_eq!(member.server.state(&unit), Some(AuthorityState::Unreachable));
    assert_eq!(federation.sole_authority(&unit), None);
}

#[tokio::test]
async fn test_delegation_moves_writes_not_truth() {
    let federation = Federation::builder()
        .open_server("zone-a")
        .open_server("zone-b")
        .build()
        .unwrap();
    let (a, b) = (federation.server("zone-a"), federation.server("zone-b"));
    let unit = UnitKey::from("arena");
    a.claim(&unit).unwrap();

    a.delegate(&unit, &zone("zone-b")).unwrap();
    b.accept_delegation(&unit, &zone("zone-a")).unwrap();
    assert!(b.write_substrate(&unit, &b"scoreboard"[..]).is_ok());
    assert!(a.write_substrate(&unit, &b"scoreboard 2"[..]).is_err());

    // Delegated units cannot be transferred away
    let err = a
        .transfer_passport(&unit, &zone("zone-b"), &b"{}"[..], &Keypair::generate())
        .await
        .unwrap_err();
    assert!(matches!(err, InterconnectError::InvalidTransition { .. }));

    a.revoke(&unit).unwrap();
    b.end_delegation(&unit, &zone("zone-a")).unwrap();
    assert_eq!(a.state(&unit), Some(AuthorityState::Active));
    assert_eq!(b.state(&unit), None);
}

#[tokio::test]
async fn test_transferred_unit_can_come_back() {
    let federation = Federation::builder()
        .open_server("zone-a")
        .open_server("zone-b")
        .build()
        .unwrap();
    let (a, b) = (federation.server("zone-a"), federation.server("zone-b"));
    let unit = UnitKey::from("nomad");
    let keypair = Keypair::generate();
    a.claim(&unit).unwrap();

    let there = a
        .transfer_passport(&unit, &zone("zone-b"), &b"{}"[..], &keypair)
        .await
        .unwrap();
    assert!(there.is_accepted());
    let back = b
        .transfer_passport(&unit, &zone("zone-a"), &b"{}"[..], &keypair)
        .await
        .unwrap();
    assert!(back.is_accepted());

    assert_eq!(federation.sole_authority(&unit), Some("zone-a"));
    assert_eq!(
        b.state(&unit),
        Some(AuthorityState::Transferred { to: zone("zone-a") })
    );
}

#[tokio::test]
async fn test_rejected_reply_round_trips_the_wire() {
    let federation = Federation::builder()
        .open_server("zone-a")
        .server("zone-b", veterans())
        .build()
        .unwrap();
    let message = TransferMessage {
        correlation: CorrelationId::generate(),
        unit: UnitKey::from("p"),
        origin: zone("zone-a"),
        envelope: seal("zone-b", &b"not json"[..], &UnsignedIdentity(Identity::local("p"))),
    };

    match federation.member("zone-b").link.deliver(message).await.unwrap() {
        TransferReply::Rejected(rejection) => assert!(matches!(
            rejection.to_error(),
            InterconnectError::InvalidWireFormat(_)
        )),
        other => panic!("expected rejection, got {other:?}"),
    }
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_admission_follows_account_age(age in 0u32..120) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();
            runtime.block_on(async {
                let federation = Federation::builder()
                    .open_server("zone-a")
                    .server("zone-b", veterans())
                    .build()
                    .unwrap();
                let a = federation.server("zone-a");
                let unit = UnitKey::from("player");
                a.claim(&unit).unwrap();

                let passport = json!({"age_days": age}).to_string();
                let outcome = a
                    .transfer_passport(&unit, &zone("zone-b"), passport, &Keypair::generate())
                    .await
                    .unwrap();

                prop_assert_eq!(outcome.is_accepted(), age >= 30);
                let expected = if age >= 30 { "zone-b" } else { "zone-a" };
                prop_assert_eq!(federation.sole_authority(&unit), Some(expected));
                Ok::<(), TestCaseError>(())
            })?;
        }
    }
}

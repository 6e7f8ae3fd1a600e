//! Safety matrix for map-cache deletion against scripted server states.

use anyhow::Result;
use demovault_maps::{AbortReason, MapDeletionDecision, MapDeletionOrchestrator};
use demovault_telemetry::Metrics;
use demovault_test_support::fixtures::{map_settings, server};
use demovault_test_support::{LifecycleCall, MemoryRemote, RemoteCall, ScriptedLifecycle};

const MIB: u64 = 1024 * 1024;

fn cache_of(size_mb: u64) -> MemoryRemote {
    let remote = MemoryRemote::new();
    remote.add_sized_file("/maps/content/730/1001/map.vpk", size_mb * MIB / 2);
    remote.add_sized_file("/maps/content/730/1002/map.vpk", size_mb * MIB - size_mb * MIB / 2);
    remote.add_file("/maps/appworkshop_730.acf", b"\"AppWorkshop\" {}");
    remote
}

fn run(remote: &MemoryRemote, lifecycle: &ScriptedLifecycle) -> Result<MapDeletionDecision> {
    let orchestrator = MapDeletionOrchestrator::new(map_settings(1000), Metrics::new()?);
    Ok(orchestrator.run(&server("s1"), &mut remote.clone(), lifecycle))
}

fn content_untouched(remote: &MemoryRemote) -> bool {
    remote.exists("/maps/content/730/1001/map.vpk")
        && remote.exists("/maps/content/730/1002/map.vpk")
        && remote.exists("/maps/appworkshop_730.acf")
}

#[test]
fn small_cache_aborts_after_size_query_only() -> Result<()> {
    let remote = cache_of(500);
    let lifecycle = ScriptedLifecycle::running(Some(0));
    let decision = run(&remote, &lifecycle)?;

    assert_eq!(
        decision,
        MapDeletionDecision::Aborted(AbortReason::TooSmall {
            size_bytes: 500 * MIB
        })
    );
    assert!(lifecycle.calls().is_empty());
    assert!(
        remote
            .calls()
            .iter()
            .all(|call| matches!(call, RemoteCall::ListEntries(_)))
    );
    assert!(content_untouched(&remote));
    Ok(())
}

#[test]
fn stopped_server_is_cleaned_without_stop_or_start() -> Result<()> {
    let remote = cache_of(1000);
    let lifecycle = ScriptedLifecycle::stopped();
    let decision = run(&remote, &lifecycle)?;

    assert_eq!(decision, MapDeletionDecision::Executed { restarted: None });
    assert!(!lifecycle.touched_run_state());
    assert!(remote.children("/maps/content/730").is_empty());
    assert!(!remote.exists("/maps/appworkshop_730.acf"));
    Ok(())
}

#[test]
fn empty_running_server_is_stopped_cleaned_and_restarted() -> Result<()> {
    let remote = cache_of(1500);
    let lifecycle = ScriptedLifecycle::running(Some(0));
    let decision = run(&remote, &lifecycle)?;

    assert_eq!(
        decision,
        MapDeletionDecision::Executed {
            restarted: Some(true)
        }
    );
    assert_eq!(
        lifecycle.calls(),
        vec![
            LifecycleCall::IsRunning("s1".into()),
            LifecycleCall::PlayerCount("s1".into()),
            LifecycleCall::Stop("s1".into()),
            LifecycleCall::Start("s1".into()),
        ]
    );
    assert!(lifecycle.is_up());
    assert!(remote.children("/maps/content/730").is_empty());
    Ok(())
}

#[test]
fn occupied_or_unknown_player_count_never_deletes() -> Result<()> {
    for players in [Some(3), None] {
        let remote = cache_of(2000);
        let lifecycle = ScriptedLifecycle::running(players);
        let decision = run(&remote, &lifecycle)?;

        assert_eq!(
            decision,
            MapDeletionDecision::Aborted(AbortReason::Occupied { players })
        );
        assert!(!lifecycle.touched_run_state());
        assert!(content_untouched(&remote));
    }
    Ok(())
}

#[test]
fn query_failures_abort_before_any_change() -> Result<()> {
    let cases = [
        (
            ScriptedLifecycle::running(Some(0)).failing_running_query(),
            AbortReason::LivenessQueryFailed,
        ),
        (
            ScriptedLifecycle::running(Some(0)).failing_player_query(),
            AbortReason::OccupancyQueryFailed,
        ),
        (
            ScriptedLifecycle::running(Some(0)).failing_stop(),
            AbortReason::ShutdownFailed,
        ),
    ];
    for (lifecycle, expected) in cases {
        let remote = cache_of(2000);
        let decision = run(&remote, &lifecycle)?;
        assert_eq!(decision, MapDeletionDecision::Aborted(expected));
        assert!(content_untouched(&remote));
        assert!(
            !lifecycle
                .calls()
                .iter()
                .any(|call| matches!(call, LifecycleCall::Start(_)))
        );
    }
    Ok(())
}

#[test]
fn unmeasurable_cache_aborts() -> Result<()> {
    let remote = cache_of(2000);
    remote.fail_list("/maps/content/730/1002");
    let lifecycle = ScriptedLifecycle::running(Some(0));
    let decision = run(&remote, &lifecycle)?;

    assert_eq!(
        decision,
        MapDeletionDecision::Aborted(AbortReason::SizeQueryFailed)
    );
    assert!(lifecycle.calls().is_empty());
    Ok(())
}

#[test]
fn partial_delete_failure_still_restarts() -> Result<()> {
    let remote = cache_of(2000);
    remote.fail_delete("/maps/content/730/1002/map.vpk");
    let lifecycle = ScriptedLifecycle::running(Some(0));
    let decision = run(&remote, &lifecycle)?;

    assert_eq!(
        decision,
        MapDeletionDecision::Aborted(AbortReason::DeleteFailed {
            path: "/maps/content/730/1002/map.vpk".into(),
            restarted: Some(true),
        })
    );
    assert!(lifecycle.is_up());
    assert!(!remote.exists("/maps/content/730/1001"));
    assert!(remote.exists("/maps/appworkshop_730.acf"));
    Ok(())
}

#[test]
fn restart_failure_is_reported_not_fatal() -> Result<()> {
    let remote = cache_of(2000);
    let lifecycle = ScriptedLifecycle::running(Some(0)).failing_start();
    let decision = run(&remote, &lifecycle)?;

    assert_eq!(
        decision,
        MapDeletionDecision::Executed {
            restarted: Some(false)
        }
    );
    assert!(remote.children("/maps/content/730").is_empty());
    Ok(())
}

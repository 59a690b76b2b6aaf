//! Event stream behavior: ordering, fan-out and serialization.

#![allow(clippy::unwrap_used)]

mod common;

use chrono::Duration;
use common::{bulker, engine, engine_with_port, harbour, t, unload_grain};
use portcall_types::{PortEvent, PortStatus, WeatherCondition};
use rust_decimal_macros::dec;
use tokio::sync::broadcast;

/// Everything already sent to `rx`.
fn drain(rx: &mut broadcast::Receiver<PortEvent>) -> Vec<PortEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn kinds(events: &[PortEvent]) -> Vec<&'static str> {
    events.iter().map(PortEvent::kind).collect()
}

#[tokio::test]
async fn full_port_call_emits_events_in_call_order() {
    let (engine, clock) = engine();
    let mut rx = engine.subscribe();

    let port = harbour(1, 1);
    let port_id = port.id;
    let _ = engine.initialize_port(port).await.unwrap();
    let allocation = engine
        .request_berth_allocation(port_id, bulker("Gannet"), t(2), t(8), vec![unload_grain(dec!(1000))])
        .await
        .unwrap();
    clock.set(t(2));
    let arrival = engine
        .process_vessel_arrival(port_id, allocation.id, t(2))
        .await
        .unwrap();
    let op = arrival.operations.first().unwrap().id;
    let _ = engine.start_operation(port_id, op).await.unwrap();
    clock.advance(Duration::hours(3));
    let _ = engine.complete_operation(port_id, op, None).await.unwrap();
    clock.set(t(6));
    let _ = engine
        .process_vessel_departure(port_id, allocation.id, t(6))
        .await
        .unwrap();

    let events = drain(&mut rx);
    assert_eq!(
        kinds(&events),
        vec![
            "PortInitialized",
            "BerthAllocated",
            "VesselArrived",
            "UtilizationChanged",
            "OperationStarted",
            "UtilizationChanged",
            "OperationCompleted",
            "UtilizationChanged",
            "VesselDeparted",
            "UtilizationChanged",
        ]
    );
    assert!(events.iter().all(|e| e.port_id() == port_id));

    let arrived = events
        .iter()
        .find(|e| matches!(e, PortEvent::VesselArrived { .. }))
        .unwrap();
    assert!(matches!(
        arrived,
        PortEvent::VesselArrived { operations_created: 1, queue_position: 1, delay_minutes: 0, .. }
    ));
}

#[tokio::test]
async fn forced_completion_is_announced_before_departure() {
    let (engine, _clock, port) = engine_with_port(1, 1).await;
    let allocation = engine
        .request_berth_allocation(port, bulker("Kittiwake"), t(1), t(5), vec![unload_grain(dec!(10))])
        .await
        .unwrap();
    let arrival = engine
        .process_vessel_arrival(port, allocation.id, t(1))
        .await
        .unwrap();
    let _ = engine
        .start_operation(port, arrival.operations.first().unwrap().id)
        .await
        .unwrap();

    let mut rx = engine.subscribe();
    let _ = engine
        .process_vessel_departure(port, allocation.id, t(4))
        .await
        .unwrap();
    let events = drain(&mut rx);
    let kinds = kinds(&events);
    let completed = kinds.iter().position(|k| *k == "OperationCompleted").unwrap();
    let departed = kinds.iter().position(|k| *k == "VesselDeparted").unwrap();
    assert!(completed < departed);
    assert!(matches!(
        events.get(departed),
        Some(PortEvent::VesselDeparted { cancelled_operations: 0, total_port_time_minutes: 180, .. })
    ));
}

#[tokio::test]
async fn every_subscriber_sees_the_same_stream() {
    let (engine, _clock, port) = engine_with_port(2, 1).await;
    let mut a = engine.subscribe();
    let mut b = engine.subscribe();

    let allocation = engine
        .request_berth_allocation(port, bulker("Puffin"), t(1), t(3), Vec::new())
        .await
        .unwrap();
    let _ = engine.cancel_allocation(port, allocation.id).await.unwrap();

    let seen_a = drain(&mut a);
    let seen_b = drain(&mut b);
    assert_eq!(seen_a, seen_b);
    assert_eq!(kinds(&seen_a), vec!["BerthAllocated", "AllocationCancelled"]);
}

#[tokio::test]
async fn condition_changes_are_announced_once() {
    let (engine, _clock, port) = engine_with_port(1, 1).await;
    let mut rx = engine.subscribe();

    let _ = engine.update_weather(port, WeatherCondition::Rough).await.unwrap();
    // Same weather again: nothing changes, nothing is sent.
    let _ = engine.update_weather(port, WeatherCondition::Rough).await.unwrap();
    let state = engine
        .set_operational_status(port, PortStatus::EmergencyOnly)
        .await
        .unwrap();
    assert_eq!(state.weather, WeatherCondition::Rough);
    assert_eq!(state.status, PortStatus::EmergencyOnly);

    let events = drain(&mut rx);
    assert_eq!(events.len(), 2);
    assert!(matches!(
        events.last(),
        Some(PortEvent::PortConditionsChanged {
            weather: WeatherCondition::Rough,
            status: PortStatus::EmergencyOnly,
            ..
        })
    ));
}

#[tokio::test]
async fn rejected_requests_emit_nothing() {
    let (engine, _clock, port) = engine_with_port(1, 1).await;
    let _ = engine
        .request_berth_allocation(port, bulker("Razorbill"), t(1), t(3), Vec::new())
        .await
        .unwrap();

    let mut rx = engine.subscribe();
    assert!(
        engine
            .request_berth_allocation(port, bulker("Sanderling"), t(2), t(4), Vec::new())
            .await
            .is_err()
    );
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn events_serialize_as_tagged_json() {
    let (engine, _clock, port) = engine_with_port(1, 1).await;
    let mut rx = engine.subscribe();
    let allocation = engine
        .request_berth_allocation(port, bulker("Stint"), t(1), t(3), Vec::new())
        .await
        .unwrap();

    let event = rx.recv().await.unwrap();
    let json = serde_json::to_value(&event).unwrap();
    let body = json.get("BerthAllocated").unwrap();
    assert_eq!(
        body.get("allocation_id").and_then(|v| v.as_str()),
        Some(allocation.id.to_string().as_str())
    );
    assert_eq!(body.get("berth_number").and_then(serde_json::Value::as_u64), Some(1));

    let back: PortEvent = serde_json::from_value(json).unwrap();
    assert_eq!(back, event);
}

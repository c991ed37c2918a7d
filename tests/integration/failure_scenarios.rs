//! Failure and chaos tests for the bridge actor
//!
//! These tests verify that the agent survives the ugly cases:
//! - Broker down at connect time
//! - Consumers disappearing mid-flight
//! - The bus closing underneath a connected agent
//! - Malformed control commands

use std::time::Duration;

use gpio_monitoring::SensorState;

use crate::helpers::*;

#[tokio::test]
async fn test_connect_to_downed_broker_keeps_loop_alive() {
    let agent = spawn_agent();
    agent.broker.shut_down();

    // The connect fails, gets logged, and the loop keeps serving commands.
    agent.bridge.connect(ENDPOINT).await.unwrap();
    agent.bridge.terminate().await.unwrap();

    tokio::time::timeout(Duration::from_secs(1), agent.task)
        .await
        .expect("actor should exit promptly after a failed connect")
        .unwrap();
}

#[tokio::test]
async fn test_dropped_consumer_does_not_stop_the_agent() {
    let agent = spawn_connected_agent().await;
    add_sensor(&agent, 1, "rackcontroller-0", SensorState::Closed).await;

    let watcher = attach_watcher(&agent.broker, "watcher-1").await;
    drop(watcher);

    // The delivery to the gone consumer is dropped silently.
    agent.bridge.update().await.unwrap();
    wait_for_state(&agent, 1, SensorState::Closed).await;

    // A fresh consumer sees the next cycle.
    let mut replacement = attach_watcher(&agent.broker, "watcher-2").await;
    agent.bridge.update().await.unwrap();
    recv_within(&mut replacement, "metric after consumer churn").await;
}

#[tokio::test]
async fn test_bus_closure_stops_publishing_but_not_polling() {
    let agent = spawn_connected_agent().await;
    add_sensor(&agent, 2, "rackcontroller-0", SensorState::Open).await;

    // Tear the broker down underneath the connected agent.
    agent.broker.shut_down();

    // Updates still read hardware and store states.
    agent.bridge.update().await.unwrap();
    wait_for_state(&agent, 2, SensorState::Open).await;

    agent.bridge.terminate().await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), agent.task)
        .await
        .expect("actor should exit promptly after the bus closed")
        .unwrap();
}

#[tokio::test]
async fn test_missing_arguments_are_skipped_not_fatal() {
    let agent = spawn_agent();

    // Truncated and malformed control frames are logged and dropped.
    agent
        .bridge
        .send_frames(vec!["CONNECT".to_string()])
        .await
        .unwrap();
    agent
        .bridge
        .send_frames(vec!["CONSUMER".to_string(), "ASSETS".to_string()])
        .await
        .unwrap();
    agent
        .bridge
        .send_frames(vec!["GPIO_CHIP_ADDRESS".to_string(), "chip0".to_string()])
        .await
        .unwrap();

    // The same commands with proper arguments still work afterwards.
    agent.bridge.connect(ENDPOINT).await.unwrap();
    agent.bridge.producer(METRICS_STREAM).await.unwrap();
    add_sensor(&agent, 1, "rackcontroller-0", SensorState::Closed).await;

    let mut watcher = attach_watcher(&agent.broker, "watcher").await;
    agent.bridge.update().await.unwrap();
    recv_within(&mut watcher, "metric after malformed commands").await;
}

#[tokio::test]
async fn test_producer_before_connect_is_skipped() {
    let agent = spawn_agent();

    // Without a connection the producer command fails and is logged.
    agent.bridge.producer(METRICS_STREAM).await.unwrap();

    agent.bridge.connect(ENDPOINT).await.unwrap();
    agent.bridge.producer(METRICS_STREAM).await.unwrap();
    add_sensor(&agent, 4, "rackcontroller-4", SensorState::Open).await;

    let mut watcher = attach_watcher(&agent.broker, "watcher").await;
    agent.bridge.update().await.unwrap();

    let delivery = recv_within(&mut watcher, "metric after late connect").await;
    assert_eq!(delivery.sender, AGENT_NAME);
}

#[tokio::test]
async fn test_bad_consumer_pattern_is_logged_and_skipped() {
    let agent = spawn_connected_agent().await;

    agent.bridge.consumer("ASSETS", "[unclosed").await.unwrap();

    // The subscription failed but the mailbox side still answers.
    let mut asker = connect_client(&agent.broker, "asker").await;
    send_request(&mut asker, AGENT_NAME, &["GPIO-TEST"]).await;
    recv_within(&mut asker, "manifest after a bad pattern").await;
}

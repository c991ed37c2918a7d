//! Integration tests for the mailbox request/reply protocol
//!
//! These tests verify the point-to-point side of the bridge:
//! - GPIO manifests mirror the live registry
//! - GPIO-TEST works without registry or hardware
//! - Everything else gets the fixed error reply, or a logged drop

use gpio_monitoring::SensorState;

use crate::helpers::*;

#[tokio::test]
async fn test_gpio_manifest_reflects_live_registry() {
    let agent = spawn_connected_agent().await;
    add_sensor(&agent, 3, "rackcontroller-3", SensorState::Closed).await;
    add_sensor(&agent, 5, "rackcontroller-5", SensorState::Open).await;

    // Poll once so the manifest reports real states, not `unknown`.
    agent.bridge.update().await.unwrap();
    wait_for_state(&agent, 3, SensorState::Closed).await;
    wait_for_state(&agent, 5, SensorState::Open).await;

    let mut asker = connect_client(&agent.broker, "asker").await;
    send_request(&mut asker, AGENT_NAME, &["GPIO", "req-7"]).await;

    let reply = recv_within(&mut asker, "manifest reply").await;
    assert_eq!(reply.sender, AGENT_NAME);
    assert_eq!(reply.subject, "info");
    assert_eq!(reply.frames[0], "req-7");
    assert_eq!(reply.frames[1], AGENT_NAME);
    assert_eq!(reply.frames[2], "sensor");
    assert_eq!(reply.frames[3], "gpio");

    let info: serde_json::Value = serde_json::from_str(&reply.frames[4]).unwrap();
    assert_eq!(info["GPI3"]["gpx_number"], 3);
    assert_eq!(info["GPI3"]["asset_name"], "rackcontroller-3");
    assert_eq!(info["GPI3"]["state"], "closed");
    assert_eq!(info["GPI5"]["state"], "open");
    assert_eq!(info.as_object().unwrap().len(), 2);
}

#[tokio::test]
async fn test_manifest_request_without_uuid_echoes_empty() {
    let agent = spawn_connected_agent().await;

    let mut asker = connect_client(&agent.broker, "asker").await;
    send_request(&mut asker, AGENT_NAME, &["GPIO"]).await;

    let reply = recv_within(&mut asker, "manifest reply").await;
    assert_eq!(reply.frames.len(), 5);
    assert_eq!(reply.frames[0], "");
}

#[tokio::test]
async fn test_gpio_test_needs_no_registry() {
    let agent = spawn_connected_agent().await;

    let mut asker = connect_client(&agent.broker, "asker").await;
    send_request(&mut asker, AGENT_NAME, &["GPIO-TEST", "req-1"]).await;

    let reply = recv_within(&mut asker, "test manifest reply").await;
    assert_eq!(reply.frames[0], "req-1");
    assert_eq!(reply.frames[2], "sensor");
    assert_eq!(reply.frames[3], "gpio");

    let info: serde_json::Value = serde_json::from_str(&reply.frames[4]).unwrap();
    assert!(
        !info.as_object().unwrap().is_empty(),
        "test manifest should list the built-in sensors"
    );
    assert!(info.get("GPI1").is_some());
}

#[tokio::test]
async fn test_unexpected_command_gets_exact_error_reply() {
    let agent = spawn_connected_agent().await;

    let mut asker = connect_client(&agent.broker, "asker").await;
    send_request(&mut asker, AGENT_NAME, &["LIST-ALL", "req-9"]).await;

    let reply = recv_within(&mut asker, "error reply").await;
    assert_eq!(reply.subject, "info");
    assert_eq!(
        reply.frames,
        vec!["ERROR".to_string(), "unexpected command".to_string()]
    );
}

#[tokio::test]
async fn test_empty_request_is_dropped_without_reply() {
    let agent = spawn_connected_agent().await;

    let mut asker = connect_client(&agent.broker, "asker").await;
    send_request(&mut asker, AGENT_NAME, &[]).await;
    expect_silence(&mut asker, "a reply to an empty request").await;

    // The loop is still serving requests.
    send_request(&mut asker, AGENT_NAME, &["GPIO-TEST"]).await;
    recv_within(&mut asker, "manifest after the dropped request").await;
}

#[tokio::test]
async fn test_reply_goes_only_to_the_requester() {
    let agent = spawn_connected_agent().await;

    let mut asker = connect_client(&agent.broker, "asker").await;
    let mut bystander = connect_client(&agent.broker, "bystander").await;

    send_request(&mut asker, AGENT_NAME, &["GPIO-TEST"]).await;
    recv_within(&mut asker, "manifest reply").await;
    expect_silence(&mut bystander, "deliveries to a bystander").await;
}

// MIT License - Copyright (c) 2026 Peter Wright
// End-to-end tests against a scripted radio

mod common;

use common::{af_incoming, announce, network, temp_db, FakeRadio, DEVICE_IEEE};
use ezstack::unp::Subsystem;
use ezstack::zcl::cluster::Toggle;
use ezstack::zcl::global::AttributeReportingConfigurationRecord;
use ezstack::zcl::{ClusterId, ZclCommand, ZclDataType};
use ezstack::{DeviceAndEndpoint, PowerSource, Stack, StackConfig, StackError};
use serde_json::json;

fn config(db: &std::path::Path) -> StackConfig {
    StackConfig::builder()
        .network(network())
        .serial_port("/dev/null")
        .permit_join(true)
        .database_path(db)
        .build()
}

#[tokio::test]
async fn test_bring_up_sequence() {
    let db = temp_db("bringup");
    let ((reader, writer), mut radio) = FakeRadio::start(11);

    let (stack, _events, handle) = Stack::start(reader, writer, config(&db)).await.unwrap();
    assert_eq!(stack.coordinator().network_address(), "0x0000");

    let mut expected = vec![
        (Subsystem::Sys, 0x00),  // reset
        (Subsystem::Sys, 0x10),  // set time
        (Subsystem::Sys, 0x02),  // version
        (Subsystem::Util, 0x01), // NV info
        (Subsystem::Sys, 0x08),  // extended PAN id
        (Subsystem::Util, 0x06), // callbacks
        (Subsystem::Sapi, 0x00), // start
        (Subsystem::Util, 0x00), // device info
        (Subsystem::Util, 0x0a), // LED
    ];
    expected.extend([(Subsystem::Af, 0x00); 6]);
    expected.push((Subsystem::Sapi, 0x08));
    assert_eq!(radio.seen(), expected);

    handle.shutdown().await.unwrap();
    std::fs::remove_file(db).unwrap();
}

#[tokio::test]
async fn test_mismatching_radio_is_not_flashed() {
    let db = temp_db("mismatch");
    let ((reader, writer), mut radio) = FakeRadio::start(15);

    let err = Stack::start(reader, writer, config(&db)).await.err().unwrap();
    match err {
        StackError::ConfigMismatch(diff) => {
            assert_eq!(diff.len(), 1);
            assert_eq!(diff[0].field, "channel");
        }
        other => panic!("expected a config mismatch, got {other}"),
    }
    // nothing was written to the radio
    assert!(!radio.seen().contains(&(Subsystem::Util, 0x03)));
    let _ = std::fs::remove_file(db);
}

#[tokio::test]
async fn test_device_lifecycle() {
    let db = temp_db("lifecycle");
    let ((reader, writer), radio) = FakeRadio::start(11);
    let (stack, mut events, handle) = Stack::start(reader, writer, config(&db)).await.unwrap();

    radio.indicate(Subsystem::Zdo, 0xc1, announce());
    let device = events.registered.recv().await.unwrap();
    assert_eq!(device.ieee_address, DEVICE_IEEE);
    assert_eq!(device.manufacturer, "IKEA of Sweden");
    assert_eq!(device.model, "TRADFRI bulb E27");
    assert_eq!(device.power_source, PowerSource::MainsSinglePhase);
    assert_eq!(device.endpoint_with_cluster(ClusterId::OnOff.into()).map(|ep| ep.id), Some(1));

    stack
        .local_command(&DeviceAndEndpoint::from(&device), Toggle {})
        .await
        .unwrap();
    stack
        .configure_reporting(
            &device.network_address,
            ClusterId::OnOff.into(),
            vec![AttributeReportingConfigurationRecord::reported(
                0x0000,
                ZclDataType::Boolean,
                0,
                300,
                None,
            )],
        )
        .await
        .unwrap();
    stack
        .bind_to_coordinator(DEVICE_IEEE, 1, ClusterId::OnOff, 1)
        .await
        .unwrap();

    // OnOff report: on
    radio.indicate(
        Subsystem::Af,
        0x81,
        af_incoming([0x06, 0x00], &[0x18, 0x40, 0x0a, 0x00, 0x00, 0x10, 0x01]),
    );
    let incoming = loop {
        let incoming = events.incoming.recv().await.unwrap();
        if incoming.message.data.command_name == "ReportAttributes" {
            break incoming;
        }
    };
    assert_eq!(incoming.device.ieee_address, DEVICE_IEEE);
    assert!(matches!(incoming.message.data.command, ZclCommand::Global(_)));

    // leave
    let mut leave = vec![0x2b, 0x1a];
    leave.extend_from_slice(&common::DEVICE_IEEE_BYTES);
    leave.extend_from_slice(&[0x00, 0x00, 0x00]);
    radio.indicate(Subsystem::Zdo, 0xc9, leave);
    assert_eq!(events.unregistered.recv().await.unwrap().ieee_address, DEVICE_IEEE);

    handle.shutdown().await.unwrap();
    let on_disk: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&db).unwrap()).unwrap();
    assert_eq!(on_disk, json!({ "devices": [] }));
    std::fs::remove_file(db).unwrap();
}

#[tokio::test]
async fn test_registered_device_survives_restart() {
    let db = temp_db("restart");
    {
        let ((reader, writer), radio) = FakeRadio::start(11);
        let (_stack, mut events, handle) = Stack::start(reader, writer, config(&db)).await.unwrap();
        radio.indicate(Subsystem::Zdo, 0xc1, announce());
        events.registered.recv().await.unwrap();
        handle.shutdown().await.unwrap();
    }

    let ((reader, writer), radio) = FakeRadio::start(11);
    let (stack, mut events, handle) = Stack::start(reader, writer, config(&db)).await.unwrap();
    assert_eq!(stack.devices().len(), 1);

    // a known device is not interrogated again
    radio.indicate(Subsystem::Zdo, 0xc1, announce());
    let device = events.became_available.recv().await.unwrap();
    assert_eq!(device.model, "TRADFRI bulb E27");

    handle.shutdown().await.unwrap();
    std::fs::remove_file(db).unwrap();
}

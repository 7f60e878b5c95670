// Tests for lib.rs core types
//
// Tests cover: interrupt and wipe-phase flags, error display, SMART health
// rendering and the inventory feature map of a disk record.

use super::*;
use serde_json::json;
use serial_test::serial;

fn sample_disk() -> DiskRecord {
    DiskRecord {
        serial: "WD-WCC4N0123456".to_string(),
        device_path: "/dev/sdc".to_string(),
        capacity: 1_000_204_886_016,
        model: "WDC WD10EZEX-08WN4A0".to_string(),
        vendor: Some("ATA".to_string()),
        rotational: true,
        smart_health: SmartHealth::Ok,
        inventory_code: None,
    }
}

// ==================== INTERRUPT HANDLING TESTS ====================

#[test]
#[serial]
fn test_interrupt_flag_round_trip() {
    reset_interrupted();
    assert!(!is_interrupted());
    set_interrupted();
    assert!(is_interrupted());
    reset_interrupted();
    assert!(!is_interrupted());
}

#[test]
#[serial]
fn test_wipe_active_flag() {
    set_wipe_active(true);
    assert!(is_wipe_active());
    set_wipe_active(false);
    assert!(!is_wipe_active());
}

// ==================== ERROR TESTS ====================

#[test]
fn test_inventory_connection_error_display() {
    let err = WipeError::InventoryConnection(InventoryError::Connection("refused".into()));
    assert!(err.to_string().contains("inventory service"));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_mount_probe_error_display() {
    let err = WipeError::MountProbe("df exited with 1".into());
    assert!(err.to_string().contains("Mount table probe failed"));
}

// ==================== SMART HEALTH TESTS ====================

#[test]
fn test_smart_health_feature_values() {
    assert_eq!(SmartHealth::Ok.feature_value(), Some("ok"));
    assert_eq!(SmartHealth::Fail.feature_value(), Some("fail"));
    assert_eq!(SmartHealth::Unknown.feature_value(), None);
    assert_eq!(SmartHealth::default(), SmartHealth::Unknown);
}

#[test]
fn test_smart_health_serializes_lowercase() -> anyhow::Result<()> {
    assert_eq!(serde_json::to_string(&SmartHealth::Fail)?, "\"fail\"");
    Ok(())
}

// ==================== DISK RECORD TESTS ====================

#[test]
fn test_log_stem_prefers_inventory_code() {
    let mut disk = sample_disk();
    assert_eq!(disk.log_stem(), "sdc");

    disk.inventory_code = Some("H42".to_string());
    assert_eq!(disk.log_stem(), "H42");
}

#[test]
fn test_log_stem_escapes_path_separators() {
    let mut disk = sample_disk();
    disk.inventory_code = Some("lot/7\\H42".to_string());
    assert_eq!(disk.log_stem(), "lot_7_H42");
}

#[test]
fn test_device_name_strips_dev_prefix() {
    let mut disk = sample_disk();
    disk.device_path = "/dev/nvme0n1".to_string();
    assert_eq!(disk.device_name(), "nvme0n1");
}

#[test]
fn test_features_for_healthy_hdd() {
    let features = sample_disk().features();

    assert_eq!(features["type"], json!("hdd"));
    assert_eq!(features["sn"], json!("WD-WCC4N0123456"));
    assert_eq!(features["model"], json!("WDC WD10EZEX-08WN4A0"));
    assert_eq!(features["brand"], json!("ATA"));
    assert_eq!(features["capacity-decibyte"], json!(1_000_204_886_016u64));
    assert_eq!(features["smart-data"], json!("ok"));
}

#[test]
fn test_features_omit_unknown_values() {
    let mut disk = sample_disk();
    disk.rotational = false;
    disk.vendor = None;
    disk.model = String::new();
    disk.smart_health = SmartHealth::Unknown;

    let features = disk.features();

    assert_eq!(features["type"], json!("ssd"));
    assert!(!features.contains_key("brand"));
    assert!(!features.contains_key("model"));
    assert!(!features.contains_key("smart-data"));
}

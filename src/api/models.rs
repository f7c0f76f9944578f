// Wire types for the vendor REST API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A charger as returned by the product listing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Charger {
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub product_code: Option<u32>,
    #[serde(default)]
    pub level_of_access: Option<u32>,
}

/// Operating mode of a charger, reported as a numeric code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargerOpMode {
    Offline,
    Disconnected,
    AwaitingStart,
    Charging,
    Completed,
    Error,
    ReadyToCharge,
    Unknown(u8),
}

impl ChargerOpMode {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => ChargerOpMode::Offline,
            1 => ChargerOpMode::Disconnected,
            2 => ChargerOpMode::AwaitingStart,
            3 => ChargerOpMode::Charging,
            4 => ChargerOpMode::Completed,
            5 => ChargerOpMode::Error,
            6 => ChargerOpMode::ReadyToCharge,
            other => ChargerOpMode::Unknown(other),
        }
    }

    /// Host-facing charging-state identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            ChargerOpMode::Offline => "offline",
            ChargerOpMode::Disconnected => "plugged_out",
            ChargerOpMode::AwaitingStart => "plugged_in_paused",
            ChargerOpMode::Charging => "plugged_in_charging",
            ChargerOpMode::Completed => "plugged_in_discharging",
            ChargerOpMode::Error => "error",
            ChargerOpMode::ReadyToCharge => "plugged_in",
            ChargerOpMode::Unknown(_) => "unknown",
        }
    }

    pub fn is_charging(&self) -> bool {
        matches!(self, ChargerOpMode::Charging)
    }

    pub fn is_plugged_in(&self) -> bool {
        !matches!(
            self,
            ChargerOpMode::Offline | ChargerOpMode::Disconnected | ChargerOpMode::Unknown(_)
        )
    }
}

impl<'de> Deserialize<'de> for ChargerOpMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let code = u8::deserialize(deserializer)?;
        Ok(ChargerOpMode::from_code(code))
    }
}

/// Charger observation snapshot from `/chargers/{id}/state`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargerState {
    pub charger_op_mode: ChargerOpMode,
    /// Total power in kW
    pub total_power: f64,
    /// Session energy in kWh
    pub session_energy: f64,
    pub energy_per_hour: f64,
    pub output_current: f64,
    #[serde(default)]
    pub in_current_t3: f64,
    #[serde(default)]
    pub in_current_t4: f64,
    #[serde(default)]
    pub in_current_t5: f64,
    pub voltage: f64,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub cable_locked: bool,
    #[serde(rename = "wiFiRSSI", default)]
    pub wi_fi_rssi: Option<i32>,
    #[serde(rename = "cellRSSI", default)]
    pub cell_rssi: Option<i32>,
    #[serde(default)]
    pub lifetime_energy: f64,
    #[serde(default)]
    pub latest_pulse: Option<DateTime<Utc>>,
}

/// Charger configuration from `/chargers/{id}/config`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargerConfig {
    pub is_enabled: bool,
    pub max_charger_current: f64,
    pub dynamic_charger_current: f64,
    #[serde(default)]
    pub phase_mode: Option<u8>,
    #[serde(default)]
    pub detected_power_grid_type: Option<u8>,
}

/// Charger metadata from `/chargers/{id}/details`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargerDetails {
    pub serial_number: String,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub circuit_id: Option<u64>,
    #[serde(default)]
    pub site_id: Option<u64>,
}

/// An equalizer power meter from the equalizer listing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Equalizer {
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub site_id: Option<u64>,
    #[serde(default)]
    pub circuit_id: Option<u64>,
}

/// Equalizer meter snapshot from `/equalizers/{id}/state`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EqualizerState {
    #[serde(rename = "currentL1")]
    pub current_l1: f64,
    #[serde(rename = "currentL2")]
    pub current_l2: f64,
    #[serde(rename = "currentL3")]
    pub current_l3: f64,
    #[serde(rename = "voltageNL1", default)]
    pub voltage_n_l1: f64,
    #[serde(rename = "voltageNL2", default)]
    pub voltage_n_l2: f64,
    #[serde(rename = "voltageNL3", default)]
    pub voltage_n_l3: f64,
    #[serde(default)]
    pub active_power_import: f64,
    #[serde(default)]
    pub active_power_export: f64,
    #[serde(default)]
    pub reactive_power_import: f64,
    #[serde(default)]
    pub cumulative_active_power_import: f64,
    #[serde(default)]
    pub is_online: bool,
}

/// Commands accepted by `/chargers/{id}/commands/{command}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargerCommand {
    StartCharging,
    StopCharging,
    PauseCharging,
    ResumeCharging,
    ToggleCharging,
    Reboot,
}

impl ChargerCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChargerCommand::StartCharging => "start_charging",
            ChargerCommand::StopCharging => "stop_charging",
            ChargerCommand::PauseCharging => "pause_charging",
            ChargerCommand::ResumeCharging => "resume_charging",
            ChargerCommand::ToggleCharging => "toggle_charging",
            ChargerCommand::Reboot => "reboot",
        }
    }
}

/// Body for `/chargers/{id}/settings`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargerSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamic_charger_current: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_charger_current: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Body for `/sites/{siteId}/circuits/{circuitId}/settings`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitDynamicCurrent {
    pub dynamic_circuit_current_p1: f64,
    pub dynamic_circuit_current_p2: f64,
    pub dynamic_circuit_current_p3: f64,
}

// Charger capability mapping

use crate::api::models::{ChargerConfig, ChargerState};

use super::CapabilityUpdate;

/// Map a polled charger state and config onto host capability values.
///
/// Cloud power figures are kW; the host expects W. Per-phase currents are
/// only meaningful on three-phase installs and are passed through as-is.
pub fn capabilities(state: &ChargerState, config: &ChargerConfig) -> Vec<CapabilityUpdate> {
    let mode = state.charger_op_mode;

    vec![
        CapabilityUpdate::bool("onoff", mode.is_charging()),
        CapabilityUpdate::text("charging_state", mode.as_str()),
        CapabilityUpdate::bool("alarm_generic.car_connected", mode.is_plugged_in()),
        CapabilityUpdate::bool("onoff.enabled", config.is_enabled),
        CapabilityUpdate::bool("locked", state.cable_locked),
        CapabilityUpdate::number("measure_power", state.total_power * 1000.0),
        CapabilityUpdate::number("meter_power.session", state.session_energy),
        CapabilityUpdate::number("meter_power.lifetime", state.lifetime_energy),
        CapabilityUpdate::number("measure_current.offered", state.output_current),
        CapabilityUpdate::number("measure_current.p1", state.in_current_t3),
        CapabilityUpdate::number("measure_current.p2", state.in_current_t4),
        CapabilityUpdate::number("measure_current.p3", state.in_current_t5),
        CapabilityUpdate::number("measure_voltage", state.voltage),
        CapabilityUpdate::number(
            "measure_current.limit",
            config.dynamic_charger_current.min(config.max_charger_current),
        ),
        CapabilityUpdate::bool("alarm_generic.offline", !state.is_online),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::ChargerOpMode;
    use crate::devices::CapabilityValue;

    fn charging_state() -> ChargerState {
        serde_json::from_str(
            r#"{
                "chargerOpMode": 3,
                "totalPower": 7.36,
                "sessionEnergy": 12.5,
                "energyPerHour": 7.2,
                "outputCurrent": 16.0,
                "inCurrentT3": 15.8,
                "inCurrentT4": 15.9,
                "inCurrentT5": 16.0,
                "voltage": 230.1,
                "isOnline": true,
                "cableLocked": true,
                "lifetimeEnergy": 1040.2
            }"#,
        )
        .unwrap()
    }

    fn config() -> ChargerConfig {
        serde_json::from_str(
            r#"{
                "isEnabled": true,
                "maxChargerCurrent": 32.0,
                "dynamicChargerCurrent": 16.0
            }"#,
        )
        .unwrap()
    }

    fn value_of<'a>(updates: &'a [CapabilityUpdate], capability: &str) -> &'a CapabilityValue {
        &updates
            .iter()
            .find(|u| u.capability == capability)
            .unwrap_or_else(|| panic!("missing capability {}", capability))
            .value
    }

    #[test]
    fn test_charging_maps_to_onoff_and_watts() {
        let updates = capabilities(&charging_state(), &config());

        assert_eq!(value_of(&updates, "onoff"), &CapabilityValue::Bool(true));
        match value_of(&updates, "measure_power") {
            CapabilityValue::Number(watts) => {
                assert!((watts - 7360.0).abs() < 1e-6, "got {}", watts)
            }
            other => panic!("expected number, got {:?}", other),
        }
        assert_eq!(
            value_of(&updates, "charging_state"),
            &CapabilityValue::Text("plugged_in_charging".to_string())
        );
        assert_eq!(
            value_of(&updates, "alarm_generic.offline"),
            &CapabilityValue::Bool(false)
        );
    }

    #[test]
    fn test_current_limit_is_clamped_to_max() {
        let mut cfg = config();
        cfg.dynamic_charger_current = 40.0;

        let updates = capabilities(&charging_state(), &cfg);
        assert_eq!(
            value_of(&updates, "measure_current.limit"),
            &CapabilityValue::Number(32.0)
        );
    }

    #[test]
    fn test_disconnected_charger() {
        let mut state = charging_state();
        state.charger_op_mode = ChargerOpMode::Disconnected;

        let updates = capabilities(&state, &config());
        assert_eq!(value_of(&updates, "onoff"), &CapabilityValue::Bool(false));
        assert_eq!(
            value_of(&updates, "alarm_generic.car_connected"),
            &CapabilityValue::Bool(false)
        );
    }
}

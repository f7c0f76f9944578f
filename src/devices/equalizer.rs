// Equalizer capability mapping

use crate::api::models::EqualizerState;

use super::CapabilityUpdate;

/// Map a polled equalizer state onto host capability values.
///
/// Net power is import minus export so a producing site shows negative
/// consumption, matching the host's power-meter convention. Cloud figures
/// are kW/kWh; power goes out in W.
pub fn capabilities(state: &EqualizerState) -> Vec<CapabilityUpdate> {
    let net_power_kw = state.active_power_import - state.active_power_export;

    vec![
        CapabilityUpdate::number("measure_power", net_power_kw * 1000.0),
        CapabilityUpdate::number("measure_current.p1", state.current_l1),
        CapabilityUpdate::number("measure_current.p2", state.current_l2),
        CapabilityUpdate::number("measure_current.p3", state.current_l3),
        CapabilityUpdate::number("measure_voltage.p1", state.voltage_n_l1),
        CapabilityUpdate::number("measure_voltage.p2", state.voltage_n_l2),
        CapabilityUpdate::number("measure_voltage.p3", state.voltage_n_l3),
        CapabilityUpdate::number("meter_power.imported", state.cumulative_active_power_import),
        CapabilityUpdate::bool("alarm_generic.offline", !state.is_online),
    ]
}

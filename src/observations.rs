// Observation decoding
// Static lookup tables turning numeric observation codes into named,
// typed values

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Named charger observations, keyed by the cloud's numeric code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservationId {
    LockCablePermanently,
    IsEnabled,
    DynamicChargerCurrent,
    WiFiRssi,
    CellRssi,
    ReasonForNoCurrent,
    CableLocked,
    CableRating,
    ChargerOpMode,
    OutputCurrent,
    TotalPower,
    SessionEnergy,
    EnergyPerHour,
    LifetimeEnergy,
    TemperatureMax,
    InCurrentT3,
    InCurrentT4,
    InCurrentT5,
    InVoltageT1T2,
    InVoltageT1T3,
}

/// Value type an observation decodes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Boolean,
    Integer,
    Double,
    Text,
}

impl ObservationId {
    pub fn from_id(id: u16) -> Option<Self> {
        let observation = match id {
            30 => ObservationId::LockCablePermanently,
            31 => ObservationId::IsEnabled,
            48 => ObservationId::DynamicChargerCurrent,
            68 => ObservationId::WiFiRssi,
            101 => ObservationId::CellRssi,
            96 => ObservationId::ReasonForNoCurrent,
            103 => ObservationId::CableLocked,
            104 => ObservationId::CableRating,
            109 => ObservationId::ChargerOpMode,
            114 => ObservationId::OutputCurrent,
            120 => ObservationId::TotalPower,
            121 => ObservationId::SessionEnergy,
            122 => ObservationId::EnergyPerHour,
            124 => ObservationId::LifetimeEnergy,
            150 => ObservationId::TemperatureMax,
            182 => ObservationId::InCurrentT3,
            183 => ObservationId::InCurrentT4,
            184 => ObservationId::InCurrentT5,
            194 => ObservationId::InVoltageT1T2,
            195 => ObservationId::InVoltageT1T3,
            _ => return None,
        };
        Some(observation)
    }

    pub fn data_type(&self) -> DataType {
        match self {
            ObservationId::LockCablePermanently
            | ObservationId::IsEnabled
            | ObservationId::CableLocked => DataType::Boolean,
            ObservationId::WiFiRssi
            | ObservationId::CellRssi
            | ObservationId::ReasonForNoCurrent
            | ObservationId::ChargerOpMode => DataType::Integer,
            ObservationId::DynamicChargerCurrent
            | ObservationId::CableRating
            | ObservationId::OutputCurrent
            | ObservationId::TotalPower
            | ObservationId::SessionEnergy
            | ObservationId::EnergyPerHour
            | ObservationId::LifetimeEnergy
            | ObservationId::TemperatureMax
            | ObservationId::InCurrentT3
            | ObservationId::InCurrentT4
            | ObservationId::InCurrentT5
            | ObservationId::InVoltageT1T2
            | ObservationId::InVoltageT1T3 => DataType::Double,
        }
    }
}

/// Raw observation as it arrives on the wire.
/// Values come as native JSON numbers on REST routes and as strings on the
/// push stream, so the value field stays untyped until decoding.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub id: u16,
    pub value: serde_json::Value,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Typed value decoded from an observation
#[derive(Debug, Clone, PartialEq)]
pub enum ObservationValue {
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Text(String),
}

/// An observation resolved to a name and a typed value
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedObservation {
    pub id: ObservationId,
    pub value: ObservationValue,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Decode a wire observation against the lookup table.
/// Returns `None` for codes the table does not know or values that do not
/// parse as the expected type.
pub fn decode(observation: &Observation) -> Option<DecodedObservation> {
    let id = ObservationId::from_id(observation.id)?;
    let value = decode_value(id.data_type(), &observation.value)?;

    Some(DecodedObservation {
        id,
        value,
        timestamp: observation.timestamp,
    })
}

fn decode_value(data_type: DataType, raw: &serde_json::Value) -> Option<ObservationValue> {
    match data_type {
        DataType::Boolean => as_bool(raw).map(ObservationValue::Boolean),
        DataType::Integer => as_i64(raw).map(ObservationValue::Integer),
        DataType::Double => as_f64(raw).map(ObservationValue::Double),
        DataType::Text => raw
            .as_str()
            .map(|s| ObservationValue::Text(s.to_string())),
    }
}

fn as_bool(raw: &serde_json::Value) -> Option<bool> {
    match raw {
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::Number(n) => n.as_i64().map(|n| n != 0),
        serde_json::Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_i64(raw: &serde_json::Value) -> Option<i64> {
    match raw {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(raw: &serde_json::Value) -> Option<f64> {
    match raw {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_known_ids_resolve() {
        assert_eq!(ObservationId::from_id(109), Some(ObservationId::ChargerOpMode));
        assert_eq!(ObservationId::from_id(120), Some(ObservationId::TotalPower));
        assert_eq!(ObservationId::from_id(9999), None);
    }

    #[test]
    fn test_decode_numeric_value() {
        let obs = Observation {
            id: 120,
            value: json!(7.36),
            timestamp: None,
        };
        let decoded = decode(&obs).unwrap();
        assert_eq!(decoded.id, ObservationId::TotalPower);
        assert_eq!(decoded.value, ObservationValue::Double(7.36));
    }

    #[test]
    fn test_decode_stringified_value() {
        // Push-stream payloads carry numbers as strings
        let obs = Observation {
            id: 121,
            value: json!("12.5"),
            timestamp: None,
        };
        let decoded = decode(&obs).unwrap();
        assert_eq!(decoded.value, ObservationValue::Double(12.5));
    }

    #[test]
    fn test_decode_boolean_variants() {
        for raw in [json!(true), json!(1), json!("true"), json!("1")] {
            let obs = Observation {
                id: 103,
                value: raw,
                timestamp: None,
            };
            let decoded = decode(&obs).unwrap();
            assert_eq!(decoded.value, ObservationValue::Boolean(true));
        }
    }

    #[test]
    fn test_decode_integer_op_mode() {
        let obs = Observation {
            id: 109,
            value: json!(3),
            timestamp: None,
        };
        let decoded = decode(&obs).unwrap();
        assert_eq!(decoded.value, ObservationValue::Integer(3));
    }

    #[test]
    fn test_unknown_id_is_skipped() {
        let obs = Observation {
            id: 1,
            value: json!(0),
            timestamp: None,
        };
        assert!(decode(&obs).is_none());
    }

    #[test]
    fn test_type_mismatch_is_skipped() {
        let obs = Observation {
            id: 109,
            value: json!("not-a-number"),
            timestamp: None,
        };
        assert!(decode(&obs).is_none());
    }
}

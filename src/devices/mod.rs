// Device glue
// Maps polled cloud state onto host capability values

pub mod charger;
pub mod equalizer;

/// A value destined for one host capability slot
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// One capability update the host adapter should apply
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityUpdate {
    pub capability: &'static str,
    pub value: CapabilityValue,
}

impl CapabilityUpdate {
    pub fn bool(capability: &'static str, value: bool) -> Self {
        Self {
            capability,
            value: CapabilityValue::Bool(value),
        }
    }

    pub fn number(capability: &'static str, value: f64) -> Self {
        Self {
            capability,
            value: CapabilityValue::Number(value),
        }
    }

    pub fn text(capability: &'static str, value: impl Into<String>) -> Self {
        Self {
            capability,
            value: CapabilityValue::Text(value.into()),
        }
    }
}

//! Read-through projection of the aggregate view into the host-facing signal.

use serde::Serialize;
use serde_json::Value;

use crate::aggregator::OutageAggregator;
use crate::model::{AggregateState, OutageRecord, OutageWindow};
use crate::pool::AddressPool;

/// Device model string reported to the host.
pub const DEVICE_MODEL: &str = "REST call";
/// Device manufacturer string reported to the host.
pub const DEVICE_MANUFACTURER: &str = "ČEZ distribuce";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
/// Kind of signal as understood by home automation hosts.
pub enum DeviceClass {
    /// "On" means something is wrong.
    Problem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Static device metadata.
pub struct DeviceInfo {
    /// Identifiers under which the host groups the device.
    pub identifiers: Vec<String>,
    /// Display name.
    pub name: String,
    /// Model string.
    pub model: String,
    /// Manufacturer string.
    pub manufacturer: String,
    /// Software version.
    pub sw_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
/// Structured attributes attached to the signal.
pub struct SignalAttributes {
    /// Raw local outages.
    pub outages: Vec<OutageRecord>,
    /// Raw town-wide outages.
    pub outages_in_town: Vec<Value>,
    /// `{from, to}` windows of the local outages.
    pub times: Vec<OutageWindow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Boolean "outage present" signal plus its attributes.
pub struct OutageSignal {
    /// Stable identifier.
    pub unique_id: String,
    /// Display name.
    pub name: String,
    /// Device class.
    pub device_class: DeviceClass,
    /// Whether any local outage is known.
    pub is_on: bool,
    /// Attached outage details.
    pub attributes: SignalAttributes,
    /// Device metadata.
    pub device: DeviceInfo,
}

/// Projects [`AggregateState`] snapshots into [`OutageSignal`]s.
#[derive(Debug, Clone)]
pub struct SignalAdapter {
    name: String,
    unique_id: String,
}

impl SignalAdapter {
    /// Create an adapter with an explicit identifier.
    #[must_use]
    pub fn new<N: Into<String>, U: Into<String>>(name: N, unique_id: U) -> Self {
        Self {
            name: name.into(),
            unique_id: unique_id.into(),
        }
    }

    /// Create an adapter whose identifier is derived from the pool's streets.
    #[must_use]
    pub fn for_pool<N: Into<String>>(name: N, pool: &AddressPool) -> Self {
        Self::new(name, pool.unique_id())
    }

    /// Stable identifier.
    #[must_use]
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Static device metadata.
    #[must_use]
    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            identifiers: vec![self.name.clone(), self.unique_id.clone()],
            name: self.name.clone(),
            model: DEVICE_MODEL.to_owned(),
            manufacturer: DEVICE_MANUFACTURER.to_owned(),
            sw_version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }

    /// Project a state.
    #[must_use]
    pub fn project(&self, state: &AggregateState) -> OutageSignal {
        OutageSignal {
            unique_id: self.unique_id.clone(),
            name: self.name.clone(),
            device_class: DeviceClass::Problem,
            is_on: state.active,
            attributes: SignalAttributes {
                outages: state.outages.clone(),
                outages_in_town: state.outages_in_town.clone(),
                times: state.times.clone(),
            },
            device: self.device_info(),
        }
    }

    /// Refresh the aggregator (if due) and project the result.
    pub async fn update(&self, aggregator: &OutageAggregator) -> OutageSignal {
        let state = aggregator.refresh().await;
        self.project(&state)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::OutagePayload;

    #[test]
    fn empty_state_projects_to_off() {
        let signal = SignalAdapter::new("Home", "Main St").project(&AggregateState::default());

        assert!(!signal.is_on, "no outages means off");
        assert_eq!(signal.attributes, SignalAttributes::default(), "empty attributes");
        assert_eq!(signal.device.manufacturer, DEVICE_MANUFACTURER, "static metadata");
    }

    #[test]
    fn attributes_serialise_like_host_attributes() {
        let payload: OutagePayload = serde_json::from_value(json!({
            "outages": [{
                "opened_at": "2024-01-01T10:00",
                "fix_expected_at": "2024-01-01T14:00",
                "id": 7
            }],
            "outages_in_town": ["Statenice: planned work"]
        }))
        .expect("payload decodes");
        let state = AggregateState::merge([Some(payload)]);

        let signal = SignalAdapter::new("Home", "Main St").project(&state);

        assert!(signal.is_on, "outage means on");
        assert_eq!(
            serde_json::to_value(&signal.attributes).expect("attributes encode"),
            json!({
                "outages": [{
                    "opened_at": "2024-01-01T10:00",
                    "fix_expected_at": "2024-01-01T14:00",
                    "id": 7
                }],
                "outages_in_town": ["Statenice: planned work"],
                "times": [{"from": "2024-01-01T10:00", "to": "2024-01-01T14:00"}]
            }),
            "attribute map keeps passthrough fields"
        );
        assert_eq!(
            serde_json::to_value(signal.device_class).expect("class encodes"),
            json!("problem"),
            "problem device class"
        );
    }
}

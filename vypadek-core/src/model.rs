//! Domain data structures for monitored addresses, outage records, and the aggregate view.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// One configured street/house/parcel unit being monitored.
pub struct AddressQuery {
    /// Street name interpolated into the lookup URL.
    pub street: String,
    /// Optional house number.
    pub house_number: Option<String>,
    /// Optional parcel number.
    pub parcel_number: Option<String>,
}

impl AddressQuery {
    /// Construct a query for a street without house or parcel number.
    #[must_use]
    pub fn new<S: Into<String>>(street: S) -> Self {
        Self {
            street: street.into(),
            house_number: None,
            parcel_number: None,
        }
    }

    /// Attach a house number.
    #[must_use]
    pub fn with_house_number<H: Into<String>>(mut self, house_number: H) -> Self {
        self.house_number = Some(house_number.into());
        self
    }

    /// Attach a parcel number.
    #[must_use]
    pub fn with_parcel_number<P: Into<String>>(mut self, parcel_number: P) -> Self {
        self.parcel_number = Some(parcel_number.into());
        self
    }

    /// Human-friendly label combining street, house number and parcel number.
    #[must_use]
    pub fn label(&self) -> String {
        let mut label = self.street.trim().to_owned();
        if let Some(house_number) = &self.house_number {
            label.push(' ');
            label.push_str(house_number);
        }
        if let Some(parcel_number) = &self.parcel_number {
            label.push_str(" (parcel ");
            label.push_str(parcel_number);
            label.push(')');
        }
        label
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A single outage entry as reported by the lookup API.
///
/// Only the two timestamps are interpreted. They stay raw JSON values because the
/// upstream format is not normalised; every other field rides along in `extra`.
pub struct OutageRecord {
    /// When the outage started.
    #[serde(default)]
    pub opened_at: Value,
    /// When the fix is expected.
    #[serde(default)]
    pub fix_expected_at: Value,
    /// Passthrough fields not interpreted by vypadek.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OutageRecord {
    /// Build a record from its two timestamps.
    #[must_use]
    pub fn new<O: Into<Value>, F: Into<Value>>(opened_at: O, fix_expected_at: F) -> Self {
        Self {
            opened_at: opened_at.into(),
            fix_expected_at: fix_expected_at.into(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Decoded response of one address lookup.
///
/// Missing or `null` lists decode as empty; unknown top-level keys are ignored.
/// Town-wide entries are never interpreted and stay raw JSON.
pub struct OutagePayload {
    /// Outages affecting the address itself. Entries that are not objects are dropped.
    #[serde(default, deserialize_with = "records_or_empty")]
    pub outages: Vec<OutageRecord>,
    /// Outages elsewhere in the same town.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub outages_in_town: Vec<Value>,
}

impl OutagePayload {
    /// Decode a payload from a raw response body.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] when the body is not JSON or has the wrong shape.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn records_or_empty<'de, D>(deserializer: D) -> Result<Vec<OutageRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries: Vec<Value> = null_as_empty(deserializer)?;
    Ok(entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Start/expected-end pair projected from an outage.
///
/// Either side is `null` when the record did not carry that timestamp.
pub struct OutageWindow {
    /// Opening timestamp.
    pub from: Value,
    /// Expected fix timestamp.
    pub to: Value,
}

impl From<&OutageRecord> for OutageWindow {
    fn from(record: &OutageRecord) -> Self {
        Self {
            from: record.opened_at.clone(),
            to: record.fix_expected_at.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Merged view across every monitored address for one refresh cycle.
pub struct AggregateState {
    /// True iff `outages` is non-empty.
    pub active: bool,
    /// Local outages, in address then record order.
    pub outages: Vec<OutageRecord>,
    /// Town-wide outages as raw JSON, in address then entry order.
    pub outages_in_town: Vec<Value>,
    /// One window per entry of `outages`.
    pub times: Vec<OutageWindow>,
}

impl AggregateState {
    /// Merge per-address lookup results into one state.
    ///
    /// `None` marks an address whose lookup failed; it contributes nothing.
    #[must_use]
    pub fn merge<I>(payloads: I) -> Self
    where
        I: IntoIterator<Item = Option<OutagePayload>>,
    {
        let mut outages = Vec::new();
        let mut outages_in_town = Vec::new();

        for payload in payloads.into_iter().flatten() {
            outages.extend(payload.outages);
            outages_in_town.extend(payload.outages_in_town);
        }

        let times = outages.iter().map(OutageWindow::from).collect();

        Self {
            active: !outages.is_empty(),
            outages,
            outages_in_town,
            times,
        }
    }
}

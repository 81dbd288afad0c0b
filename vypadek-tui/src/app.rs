use std::sync::Arc;

use chrono::{DateTime, Local};
use serde_json::{Map, Value};
use tokio::sync::watch;
use vypadek_core::{
    aggregator::OutageAggregator,
    model::OutageRecord,
    signal::OutageSignal,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tab {
    Outages,
    TownOutages,
    Addresses,
}

impl Tab {
    pub(crate) const ALL: [Tab; 3] = [Tab::Outages, Tab::TownOutages, Tab::Addresses];

    pub(crate) fn title(self) -> &'static str {
        match self {
            Tab::Outages => "Outages",
            Tab::TownOutages => "In town",
            Tab::Addresses => "Addresses",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Tab::Outages => 0,
            Tab::TownOutages => 1,
            Tab::Addresses => 2,
        }
    }
}

pub(crate) struct AddressStatus {
    pub label: String,
    /// `None` while the last lookup failed or never ran.
    pub outages: Option<(usize, usize)>,
}

/// One table line, from a decoded local record or a raw town entry.
pub(crate) struct OutageRow {
    pub(crate) opened_at: Value,
    pub(crate) fix_expected_at: Value,
    pub(crate) details: String,
}

impl OutageRow {
    fn from_record(record: &OutageRecord) -> Self {
        Self {
            opened_at: record.opened_at.clone(),
            fix_expected_at: record.fix_expected_at.clone(),
            details: fields_label(&record.extra),
        }
    }

    // town entries are not guaranteed to be objects
    fn from_entry(entry: &Value) -> Self {
        match serde_json::from_value::<OutageRecord>(entry.clone()) {
            Ok(record) => Self::from_record(&record),
            Err(_) => Self {
                opened_at: Value::Null,
                fix_expected_at: Value::Null,
                details: match entry {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                },
            },
        }
    }
}

fn fields_label(fields: &Map<String, Value>) -> String {
    if fields.is_empty() {
        return String::new();
    }
    serde_json::to_string(fields).unwrap_or_default()
}

pub(crate) struct App {
    pub aggregator: Arc<OutageAggregator>,
    pub signal_rx: watch::Receiver<OutageSignal>,

    pub signal: OutageSignal,
    pub received_at: Option<DateTime<Local>>,

    pub tab: Tab,
    pub list_index: usize,
}

impl App {
    pub(crate) fn new(
        aggregator: Arc<OutageAggregator>,
        signal_rx: watch::Receiver<OutageSignal>,
    ) -> Self {
        let signal = signal_rx.borrow().clone();
        Self {
            aggregator,
            signal_rx,
            signal,
            received_at: None,
            tab: Tab::Outages,
            list_index: 0,
        }
    }

    /// Pull the latest signal published by the poller, if any.
    pub(crate) fn sync_signal(&mut self) {
        if !self.signal_rx.has_changed().unwrap_or(false) {
            return;
        }
        self.signal = self.signal_rx.borrow_and_update().clone();
        self.received_at = Some(Local::now());
        self.list_index = self.list_index.min(self.row_count().saturating_sub(1));
    }

    pub(crate) fn outage_rows(&self) -> Vec<OutageRow> {
        let attributes = &self.signal.attributes;
        match self.tab {
            Tab::Outages => attributes.outages.iter().map(OutageRow::from_record).collect(),
            Tab::TownOutages => attributes
                .outages_in_town
                .iter()
                .map(OutageRow::from_entry)
                .collect(),
            Tab::Addresses => Vec::new(),
        }
    }

    pub(crate) fn address_statuses(&self) -> Vec<AddressStatus> {
        self.aggregator
            .pool()
            .fetchers()
            .iter()
            .map(|fetcher| AddressStatus {
                label: fetcher.query().label(),
                outages: fetcher
                    .last_value()
                    .map(|payload| (payload.outages.len(), payload.outages_in_town.len())),
            })
            .collect()
    }

    pub(crate) fn row_count(&self) -> usize {
        match self.tab {
            Tab::Addresses => self.aggregator.pool().len(),
            Tab::Outages => self.signal.attributes.outages.len(),
            Tab::TownOutages => self.signal.attributes.outages_in_town.len(),
        }
    }

    pub(crate) fn next_tab(&mut self) {
        let next = (self.tab.index() + 1) % Tab::ALL.len();
        self.select_tab(next);
    }

    pub(crate) fn previous_tab(&mut self) {
        let previous = (self.tab.index() + Tab::ALL.len() - 1) % Tab::ALL.len();
        self.select_tab(previous);
    }

    pub(crate) fn scroll_up(&mut self) {
        self.list_index = self.list_index.saturating_sub(1);
    }

    pub(crate) fn scroll_down(&mut self) {
        if self.list_index + 1 < self.row_count() {
            self.list_index += 1;
        }
    }

    fn select_tab(&mut self, index: usize) {
        if let Some(tab) = Tab::ALL.get(index) {
            self.tab = *tab;
            self.list_index = 0;
        }
    }
}

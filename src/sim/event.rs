//! Failure and maintenance events and the per-scenario append-only log.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Component name reserved for planned maintenance events.
pub const MAINTENANCE: &str = "MAINTENANCE";
/// Component name reserved for forced (unplanned) maintenance events.
pub const UNPLANNED_MAINTENANCE: &str = "UNPLANNEDMAINTENANCE";

/// What produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A component failure generated by a failure-mode test.
    Failure,
    /// Whole-plant planned maintenance at the end of a maintenance interval.
    PlannedMaintenance,
    /// Whole-plant shutdown forced by insufficient capacity.
    UnplannedMaintenance,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Failure => "failure",
            Self::PlannedMaintenance => "planned_maintenance",
            Self::UnplannedMaintenance => "unplanned_maintenance",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failure or maintenance occurrence. Immutable once logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureEvent {
    pub scenario: usize,
    /// Step index at which the event was generated.
    pub time: usize,
    /// Failed component, or a reserved maintenance name.
    pub component: String,
    pub kind: EventKind,
    /// Index of the triggering failure type within the component.
    pub failure_index: Option<usize>,
    /// Drawn downtime (h), including cooldown.
    pub downtime: f64,
    /// Repair labor (h), downtime excluding cooldown.
    pub labor_hours: f64,
    /// Life or probability redrawn for the triggering failure type.
    pub new_life: f64,
}

impl FailureEvent {
    /// Creates a whole-plant maintenance event.
    pub fn maintenance(scenario: usize, time: usize, planned: bool, duration: f64) -> Self {
        let (kind, component) = if planned {
            (EventKind::PlannedMaintenance, MAINTENANCE)
        } else {
            (EventKind::UnplannedMaintenance, UNPLANNED_MAINTENANCE)
        };
        Self {
            scenario,
            time,
            component: component.to_string(),
            kind,
            failure_index: None,
            downtime: duration,
            labor_hours: 0.0,
            new_life: 0.0,
        }
    }

    /// Composite key: scenario, time, component and failure-type index.
    pub fn key(&self) -> EventKey {
        EventKey {
            scenario: self.scenario,
            time: self.time,
            component: self.component.clone(),
            failure_index: self.failure_index,
        }
    }

    /// Printable form of [`FailureEvent::key`], e.g. `S0T12SP1F4`.
    pub fn label(&self) -> String {
        self.key().to_string()
    }
}

/// Identity of a logged event.
///
/// The printed label concatenates the fields, so two keys can print alike
/// (`2X` at step 11 and `X` at step 112); the log compares the fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    pub scenario: usize,
    pub time: usize,
    pub component: String,
    pub failure_index: Option<usize>,
}

impl EventKey {
    pub fn failure(scenario: usize, time: usize, component: &str, failure_index: usize) -> Self {
        Self {
            scenario,
            time,
            component: component.to_string(),
            failure_index: Some(failure_index),
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}T{}{}", self.scenario, self.time, self.component)?;
        if let Some(idx) = self.failure_index {
            write!(f, "F{idx}")?;
        }
        Ok(())
    }
}

impl fmt::Display for FailureEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>5} {:<24} {:?} failure={} downtime={:.2}h labor={:.2}h new_life={:.4e}",
            self.time,
            self.component,
            self.kind,
            self.failure_index
                .map_or_else(|| "-".to_string(), |i| i.to_string()),
            self.downtime,
            self.labor_hours,
            self.new_life,
        )
    }
}

/// Append-only event log of one scenario, indexed by [`EventKey`] and by
/// step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<FailureEvent>", into = "Vec<FailureEvent>")]
pub struct FailureLog {
    events: Vec<FailureEvent>,
    index: HashMap<EventKey, usize>,
    by_time: BTreeMap<usize, Vec<usize>>,
}

impl FailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    ///
    /// # Panics
    ///
    /// Panics if an event with the same key is already logged; a component
    /// cannot fail twice in the same step.
    pub fn push(&mut self, event: FailureEvent) {
        let key = event.key();
        assert!(!self.index.contains_key(&key), "duplicate event {key}");
        let i = self.events.len();
        self.index.insert(key, i);
        self.by_time.entry(event.time).or_default().push(i);
        self.events.push(event);
    }

    pub fn contains(&self, key: &EventKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &EventKey) -> Option<&FailureEvent> {
        self.index.get(key).map(|&i| &self.events[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &FailureEvent> {
        self.events.iter()
    }

    /// Events generated at step `time`, in insertion order.
    pub fn at(&self, time: usize) -> impl Iterator<Item = &FailureEvent> {
        self.by_time
            .get(&time)
            .into_iter()
            .flatten()
            .map(|&i| &self.events[i])
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of component failures, maintenance excluded.
    pub fn failure_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| e.kind == EventKind::Failure)
            .count()
    }

    /// Step of the most recent component failure.
    pub fn last_failure_time(&self) -> Option<usize> {
        self.events
            .iter()
            .filter(|e| e.kind == EventKind::Failure)
            .map(|e| e.time)
            .max()
    }

    /// Total repair labor (h) over all logged events.
    pub fn labor_hours(&self) -> f64 {
        self.events.iter().map(|e| e.labor_hours).sum()
    }

    /// Labor cost at `hourly_rate` per labor hour.
    pub fn labor_cost(&self, hourly_rate: f64) -> f64 {
        self.labor_hours() * hourly_rate
    }
}

impl From<Vec<FailureEvent>> for FailureLog {
    fn from(events: Vec<FailureEvent>) -> Self {
        let mut log = Self::new();
        for e in events {
            if !log.contains(&e.key()) {
                log.push(e);
            }
        }
        log
    }
}

impl From<FailureLog> for Vec<FailureEvent> {
    fn from(log: FailureLog) -> Self {
        log.events
    }
}

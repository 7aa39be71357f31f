//! # Waffle Audit Observer
//!
//! Records feature-flag record mutations (flags, switches and samples) as
//! structured log lines under the `credentials_dispatch::audit` target.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub const AUDIT_TARGET: &str = "credentials_dispatch::audit";

/// Kind of feature-flag record being audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaffleKind {
    Flag,
    Switch,
    Sample,
}

impl WaffleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Switch => "switch",
            Self::Sample => "sample",
        }
    }

    /// Fields included in the audit description for this kind
    pub fn watched_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Flag => &[
                "everyone",
                "percent",
                "superusers",
                "staff",
                "authenticated",
                "note",
                "languages",
            ],
            Self::Switch => &["active", "note"],
            Self::Sample => &["percent", "note"],
        }
    }
}

impl fmt::Display for WaffleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A feature-flag record as seen by the audit observer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WaffleRecord {
    pub name: String,
    pub fields: BTreeMap<String, Value>,
}

impl WaffleRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }
}

/// Render `field=value` pairs for the watched fields of `record`
///
/// Fields the record does not carry render as `None`.
pub fn describe_fields(record: &WaffleRecord, watched_fields: &[&str]) -> String {
    watched_fields
        .iter()
        .map(|field| match record.fields.get(*field) {
            Some(Value::Null) | None => format!("{field}=None"),
            Some(value) => format!("{field}={value}"),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy)]
pub struct WaffleObserver {
    enabled: bool,
}

impl WaffleObserver {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Audit a create or update of `record`
    ///
    /// Returns the logged description, or `None` when auditing is disabled.
    pub fn on_mutation(
        &self,
        kind: WaffleKind,
        record: &WaffleRecord,
        created: bool,
        watched_fields: &[&str],
    ) -> Option<String> {
        let verb = if created { "created" } else { "updated" };
        self.emit(kind, record, verb, watched_fields)
    }

    /// Audit a deletion of `record`
    pub fn on_deletion(&self, kind: WaffleKind, record: &WaffleRecord) -> Option<String> {
        self.emit(kind, record, "deleted", kind.watched_fields())
    }

    fn emit(
        &self,
        kind: WaffleKind,
        record: &WaffleRecord,
        verb: &str,
        watched_fields: &[&str],
    ) -> Option<String> {
        if !self.enabled {
            return None;
        }

        let description = describe_fields(record, watched_fields);
        tracing::info!(
            target: AUDIT_TARGET,
            kind = kind.as_str(),
            name = %record.name,
            verb,
            config = %description,
            "Waffle {kind} {:?} was {verb}. New config: {description}",
            record.name
        );
        Some(description)
    }
}

impl Default for WaffleObserver {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_describe_switch() {
        let record = WaffleRecord::new("credentials.enabled")
            .with_field("active", true)
            .with_field("note", "rollout");

        assert_eq!(
            describe_fields(&record, WaffleKind::Switch.watched_fields()),
            r#"active=true, note="rollout""#
        );
    }

    #[test]
    fn test_describe_missing_fields_as_none() {
        let record = WaffleRecord::new("sample").with_field("percent", json!(12.5));
        assert_eq!(
            describe_fields(&record, WaffleKind::Sample.watched_fields()),
            "percent=12.5, note=None"
        );
    }

    #[test]
    fn test_flag_watches_all_fields() {
        let record = WaffleRecord::new("learner_records.edx")
            .with_field("everyone", Value::Null)
            .with_field("languages", "en,fr");
        let description = describe_fields(&record, WaffleKind::Flag.watched_fields());

        assert!(description.starts_with("everyone=None, percent=None"));
        assert!(description.ends_with(r#"languages="en,fr""#));
        assert_eq!(description.split(", ").count(), 7);
    }

    #[test]
    fn test_observer_verbs() {
        let observer = WaffleObserver::default();
        let record = WaffleRecord::new("credentials.enabled").with_field("active", false);

        assert!(observer
            .on_mutation(WaffleKind::Switch, &record, true, WaffleKind::Switch.watched_fields())
            .is_some());
        assert_eq!(
            observer.on_deletion(WaffleKind::Switch, &record).as_deref(),
            Some("active=false, note=None")
        );
    }

    #[test]
    fn test_disabled_observer_is_silent() {
        let observer = WaffleObserver::new(false);
        let record = WaffleRecord::new("credentials.enabled");

        assert!(observer
            .on_mutation(WaffleKind::Switch, &record, false, &["active"])
            .is_none());
        assert!(observer.on_deletion(WaffleKind::Switch, &record).is_none());
    }
}

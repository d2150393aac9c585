use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::observer::error::NotifierError;
use crate::observer::sink::NotificationSink;
use crate::observer::snapshot::Snapshot;
use crate::tasks::TaskQueue;

/// Field refreshed on every save; never counts as a change
pub const UPDATED_AT: &str = "updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Added,    // Field didn't exist before
    Modified, // Field existed but value changed
    Removed,  // Field no longer present
}

/// One differing field between two snapshots
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub change_type: ChangeType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub entity: &'static str,
    pub kind: ChangeKind,
    /// After-snapshot for created/updated, before-snapshot for deleted
    pub snapshot: Snapshot,
    /// Differing fields; empty unless `kind` is `Updated`
    pub changes: Vec<FieldChange>,
}

impl Notification {
    pub fn message(&self) -> String {
        match self.kind {
            ChangeKind::Created => format!("Added new {}", self.entity),
            ChangeKind::Updated => format!("Updated {}", self.entity),
            ChangeKind::Deleted => format!("Deleted {}", self.entity),
        }
    }
}

/// Compare every key of both snapshots, skipping `ignored`
pub fn diff(before: &Snapshot, after: &Snapshot, ignored: &[&str]) -> Vec<FieldChange> {
    let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();

    keys.into_iter()
        .filter(|key| !ignored.contains(&key.as_str()))
        .filter_map(|key| {
            let old_value = before.get(key);
            let new_value = after.get(key);
            let change_type = match (old_value, new_value) {
                (None, Some(_)) => ChangeType::Added,
                (Some(_), None) => ChangeType::Removed,
                (Some(old), Some(new)) if old != new => ChangeType::Modified,
                _ => return None,
            };
            Some(FieldChange {
                field: key.clone(),
                old_value: old_value.cloned(),
                new_value: new_value.cloned(),
                change_type,
            })
        })
        .collect()
}

/// Decides whether a mutation is worth announcing and hands the result to a sink
pub struct ChangeNotifier {
    entity: &'static str,
    ignored: Vec<&'static str>,
    sink: Arc<dyn NotificationSink>,
}

impl ChangeNotifier {
    pub fn new(entity: &'static str, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            entity,
            ignored: vec![UPDATED_AT],
            sink,
        }
    }

    /// Pure decision step: at most one notification per call
    pub fn evaluate(
        &self,
        before: Option<Snapshot>,
        after: Option<Snapshot>,
    ) -> Result<Option<Notification>, NotifierError> {
        let (kind, snapshot, changes) = match (before, after) {
            (None, None) => return Err(NotifierError::NoSnapshots),
            (None, Some(after)) => (ChangeKind::Created, after, Vec::new()),
            (Some(before), None) => (ChangeKind::Deleted, before, Vec::new()),
            (Some(before), Some(after)) => {
                let changes = diff(&before, &after, &self.ignored);
                if changes.is_empty() {
                    return Ok(None);
                }
                (ChangeKind::Updated, after, changes)
            }
        };

        Ok(Some(Notification {
            entity: self.entity,
            kind,
            snapshot,
            changes,
        }))
    }

    pub async fn notify(
        &self,
        before: Option<Snapshot>,
        after: Option<Snapshot>,
    ) -> Result<Option<Notification>, NotifierError> {
        let notification = self.evaluate(before, after)?;
        if let Some(notification) = &notification {
            self.sink.deliver(notification).await?;
        }
        Ok(notification)
    }

    /// Run `notify` as a deferred task. An empty pair is refused here, before queueing.
    pub fn schedule(
        self: &Arc<Self>,
        tasks: &TaskQueue,
        before: Option<Snapshot>,
        after: Option<Snapshot>,
    ) -> Result<(), NotifierError> {
        if before.is_none() && after.is_none() {
            return Err(NotifierError::NoSnapshots);
        }

        let notifier = Arc::clone(self);
        tasks.spawn("change-notification", async move {
            if let Err(e) = notifier.notify(before, after).await {
                tracing::error!("{} change notification failed: {}", notifier.entity, e);
            }
        });
        Ok(())
    }
}

//! Per-project change derivation.
//!
//! Every accepted write is compared project-by-project against the document
//! it replaces. The resulting [`EntityChange`] list feeds the entity history
//! that powers undo and entity-scoped restore.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{BackupId, BoardDocument, EntityEventId, EntityId};

/// Kind of change recorded against a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// The project first appeared.
    Create,
    /// The project's content changed.
    Update,
    /// The project was removed.
    Delete,
    /// The project was put back from history or a backup.
    Restore,
}

impl ActionType {
    /// Storage representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Restore => "restore",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stored action type is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action type: {0}")]
pub struct UnknownActionType(pub String);

impl FromStr for ActionType {
    type Err = UnknownActionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "restore" => Ok(Self::Restore),
            other => Err(UnknownActionType(other.to_owned())),
        }
    }
}

/// Why a write happened. Restores tag every derived change as `restore`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// An ordinary client save.
    Client,
    /// Rollback of one project to a historical entity event.
    EntityRestore {
        /// Project being restored.
        project_id: EntityId,
        /// Entity event whose `snapshot_after` was applied.
        source_event_id: EntityEventId,
    },
    /// Whole-document restore from a backup.
    BackupRestore {
        /// Backup that was applied.
        backup_id: BackupId,
    },
}

impl ChangeOrigin {
    /// Storage label for the ledger entry.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::EntityRestore { .. } => "entity_restore",
            Self::BackupRestore { .. } => "backup_restore",
        }
    }

    fn is_restore(&self) -> bool {
        !matches!(self, Self::Client)
    }

    fn reference(&self) -> Option<(&'static str, Value)> {
        match self {
            Self::Client => None,
            Self::EntityRestore {
                source_event_id, ..
            } => Some(("sourceEventId", json!(source_event_id.get()))),
            Self::BackupRestore { backup_id } => Some(("backupId", json!(backup_id.get()))),
        }
    }
}

/// One project-level change produced by a write.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityChange {
    /// Project affected.
    pub project_id: EntityId,
    /// What happened to it.
    pub action_type: ActionType,
    /// Diff metadata.
    pub payload: Value,
    /// The project after the write, `None` once removed.
    pub snapshot_after: Option<Value>,
}

fn index_projects(document: &BoardDocument) -> (Vec<EntityId>, HashMap<EntityId, &Value>) {
    let mut order = Vec::new();
    let mut by_id = HashMap::new();
    for project in document.projects() {
        let Some(id) = EntityId::of(project) else {
            continue;
        };
        if !by_id.contains_key(&id) {
            order.push(id.clone());
            by_id.insert(id, project);
        }
    }
    (order, by_id)
}

fn changed_fields(before: &Value, after: &Value) -> Vec<String> {
    let (Some(before), Some(after)) = (before.as_object(), after.as_object()) else {
        return Vec::new();
    };
    let mut keys: Vec<String> = before
        .keys()
        .chain(after.keys())
        .filter(|key| before.get(*key) != after.get(*key))
        .cloned()
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    keys.sort();
    keys
}

/// Compare two documents and describe every project-level change.
///
/// Creates and updates follow the order of `next`; deletes follow the
/// order of `previous`. Projects without an identity are ignored.
pub fn derive_entity_changes(
    previous: Option<&BoardDocument>,
    next: &BoardDocument,
    origin: &ChangeOrigin,
) -> Vec<EntityChange> {
    let empty = BoardDocument::empty();
    let (previous_order, previous_by_id) = index_projects(previous.unwrap_or(&empty));
    let (next_order, next_by_id) = index_projects(next);
    let restoring = origin.is_restore();
    let mut changes = Vec::new();

    for id in &next_order {
        let Some(after) = next_by_id.get(id) else {
            continue;
        };
        let (action_type, payload) = match previous_by_id.get(id) {
            None => (ActionType::Create, json!({})),
            Some(before) if before == after => continue,
            Some(before) => (
                ActionType::Update,
                json!({ "changedFields": changed_fields(before, after) }),
            ),
        };
        changes.push(EntityChange {
            project_id: id.clone(),
            action_type,
            payload,
            snapshot_after: Some((*after).clone()),
        });
    }

    for id in &previous_order {
        if !next_by_id.contains_key(id) {
            changes.push(EntityChange {
                project_id: id.clone(),
                action_type: ActionType::Delete,
                payload: json!({}),
                snapshot_after: None,
            });
        }
    }

    if let ChangeOrigin::EntityRestore { project_id, .. } = origin {
        if !changes.iter().any(|change| &change.project_id == project_id) {
            changes.push(EntityChange {
                project_id: project_id.clone(),
                action_type: ActionType::Restore,
                payload: json!({}),
                snapshot_after: next_by_id.get(project_id).map(|project| (*project).clone()),
            });
        }
    }

    if restoring {
        for change in &mut changes {
            change.payload = restore_payload(change, origin);
            change.action_type = ActionType::Restore;
        }
    }
    changes
}

fn restore_payload(change: &EntityChange, origin: &ChangeOrigin) -> Value {
    let mut payload = match &change.payload {
        Value::Object(fields) => fields.clone(),
        _ => serde_json::Map::new(),
    };
    payload.insert("restoredAction".to_owned(), json!(change.action_type));
    if let Some((key, value)) = origin.reference() {
        payload.insert(key.to_owned(), value);
    }
    Value::Object(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn doc(value: Value) -> BoardDocument {
        BoardDocument::from_value(value).expect("valid document")
    }

    fn id(raw: &str) -> EntityId {
        EntityId::new(raw).expect("non-blank id")
    }

    #[rstest]
    fn first_write_creates_every_identified_project() {
        let next = doc(json!([{ "id": "a" }, { "title": "no id" }, { "id": "b" }]));
        let changes = derive_entity_changes(None, &next, &ChangeOrigin::Client);
        let ids: Vec<_> = changes.iter().map(|c| c.project_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(changes.iter().all(|c| c.action_type == ActionType::Create));
    }

    #[rstest]
    fn update_lists_changed_fields_and_delete_has_no_snapshot() {
        let previous = doc(json!([
            { "id": "a", "title": "Old", "colour": "red" },
            { "id": "b" }
        ]));
        let next = doc(json!([{ "id": "a", "title": "New", "colour": "red", "due": 3 }]));
        let changes = derive_entity_changes(Some(&previous), &next, &ChangeOrigin::Client);

        assert_eq!(changes.len(), 2);
        let update = changes.first().expect("update recorded");
        assert_eq!(update.action_type, ActionType::Update);
        assert_eq!(update.payload, json!({ "changedFields": ["due", "title"] }));
        let delete = changes.get(1).expect("delete recorded");
        assert_eq!(delete.project_id, id("b"));
        assert_eq!(delete.action_type, ActionType::Delete);
        assert!(delete.snapshot_after.is_none());
    }

    #[rstest]
    fn unchanged_projects_produce_no_changes() {
        let previous = doc(json!([{ "id": "a", "n": 1 }]));
        let changes = derive_entity_changes(Some(&previous), &previous, &ChangeOrigin::Client);
        assert!(changes.is_empty());
    }

    #[rstest]
    fn backup_restore_tags_changes_with_backup_reference() {
        let previous = doc(json!([{ "id": "a" }]));
        let next = doc(json!([{ "id": "b" }]));
        let origin = ChangeOrigin::BackupRestore {
            backup_id: BackupId::new(9),
        };
        let changes = derive_entity_changes(Some(&previous), &next, &origin);
        assert_eq!(changes.len(), 2);
        for change in &changes {
            assert_eq!(change.action_type, ActionType::Restore);
            assert_eq!(change.payload.get("backupId"), Some(&json!(9)));
        }
        assert_eq!(
            changes.first().and_then(|c| c.payload.get("restoredAction")),
            Some(&json!("create"))
        );
    }

    #[rstest]
    fn entity_restore_always_records_the_target() {
        let current = doc(json!([{ "id": "a", "n": 1 }]));
        let origin = ChangeOrigin::EntityRestore {
            project_id: id("a"),
            source_event_id: EntityEventId::new(4),
        };
        let changes = derive_entity_changes(Some(&current), &current, &origin);
        assert_eq!(changes.len(), 1);
        let change = changes.first().expect("restore recorded");
        assert_eq!(change.action_type, ActionType::Restore);
        assert_eq!(change.payload.get("sourceEventId"), Some(&json!(4)));
        assert_eq!(change.snapshot_after, Some(json!({ "id": "a", "n": 1 })));
    }

    #[rstest]
    #[case(ActionType::Create)]
    #[case(ActionType::Update)]
    #[case(ActionType::Delete)]
    #[case(ActionType::Restore)]
    fn action_type_parses_its_storage_form(#[case] action: ActionType) {
        assert_eq!(action.as_str().parse::<ActionType>(), Ok(action));
    }

    #[rstest]
    fn action_type_rejects_unknown_labels() {
        assert_eq!(
            "archive".parse::<ActionType>(),
            Err(UnknownActionType("archive".to_owned()))
        );
    }
}

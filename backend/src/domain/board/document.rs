//! Board document model.
//!
//! The board document is an opaque JSON aggregate whose only structural
//! guarantee is a top-level `projects` array. Older clients persisted a bare
//! array of projects; [`DocumentShape`] captures both forms at the boundary
//! and [`DocumentShape::normalize`] is the single path into
//! [`BoardDocument`], the form every other component works with.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key holding the project collection.
pub const PROJECTS_KEY: &str = "projects";
/// Key merged into served documents to carry the version.
pub const VERSION_KEY: &str = "version";
/// Key identifying a project inside the collection.
pub const PROJECT_ID_KEY: &str = "id";

/// Errors raised while interpreting a raw document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    /// The payload was neither an object nor an array.
    #[error("document must be a JSON object or array")]
    NotAnAggregate,
    /// The object form lacked a `projects` array.
    #[error("document must contain a `projects` array")]
    MissingProjects,
    /// A served document did not carry a numeric version.
    #[error("document must carry a non-negative integer `version`")]
    MissingVersion,
    /// A project could not be addressed by identity.
    #[error("project must carry a string or numeric `id`")]
    MissingProjectId,
}

/// Monotonic document version.
///
/// Zero means no write has been accepted yet.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StateVersion(u64);

impl StateVersion {
    /// Version reported before the first accepted write.
    pub const INITIAL: Self = Self(0);

    /// Wrap a raw version number.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw version number.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The version an accepted write against `self` produces.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for StateVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for StateVersion {
    type Error = std::num::TryFromIntError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value).map(Self)
    }
}

impl TryFrom<StateVersion> for i64 {
    type Error = std::num::TryFromIntError;

    fn try_from(value: StateVersion) -> Result<Self, Self::Error> {
        i64::try_from(value.0)
    }
}

/// Identity of a project within the board collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Build an identity from a path segment or stored column.
    ///
    /// Returns `None` when the input is blank.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_owned()))
    }

    /// Read the identity of a project value.
    ///
    /// Numeric ids are rendered in their decimal form so that `7` and `"7"`
    /// address the same project.
    pub fn of(project: &Value) -> Option<Self> {
        match project.get(PROJECT_ID_KEY)? {
            Value::String(id) => Self::new(id.as_str()),
            Value::Number(id) => Self::new(id.to_string()),
            _ => None,
        }
    }

    /// Borrow the identity as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw document as it may appear on the wire or in storage.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentShape {
    /// Legacy bare array of projects.
    LegacyArray(Vec<Value>),
    /// Object form carrying a `projects` array.
    Normalized(Map<String, Value>),
}

impl DocumentShape {
    /// Classify a raw JSON value.
    pub fn classify(value: Value) -> Result<Self, DocumentError> {
        match value {
            Value::Array(projects) => Ok(Self::LegacyArray(projects)),
            Value::Object(fields) => Ok(Self::Normalized(fields)),
            _ => Err(DocumentError::NotAnAggregate),
        }
    }

    /// Convert either shape into a [`BoardDocument`].
    ///
    /// A `version` key inside the object form is dropped: versions live
    /// beside the document, never inside it.
    pub fn normalize(self) -> Result<BoardDocument, DocumentError> {
        match self {
            Self::LegacyArray(projects) => Ok(BoardDocument {
                projects,
                extra: Map::new(),
            }),
            Self::Normalized(mut fields) => {
                fields.remove(VERSION_KEY);
                let projects = match fields.remove(PROJECTS_KEY) {
                    Some(Value::Array(projects)) => projects,
                    _ => return Err(DocumentError::MissingProjects),
                };
                Ok(BoardDocument {
                    projects,
                    extra: fields,
                })
            }
        }
    }
}

/// Normalized board document.
///
/// # Examples
/// ```
/// use boardsync::domain::BoardDocument;
/// use serde_json::json;
///
/// let doc = BoardDocument::from_value(json!([{ "id": "p1" }])).expect("legacy form");
/// assert_eq!(doc.to_value(), json!({ "projects": [{ "id": "p1" }] }));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct BoardDocument {
    projects: Vec<Value>,
    extra: Map<String, Value>,
}

impl BoardDocument {
    /// Document with an empty project collection.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Normalize any accepted raw form.
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        DocumentShape::classify(value)?.normalize()
    }

    /// Projects in document order.
    pub fn projects(&self) -> &[Value] {
        &self.projects
    }

    /// Find a project by identity.
    pub fn find_project(&self, id: &EntityId) -> Option<&Value> {
        self.projects
            .iter()
            .find(|project| EntityId::of(project).as_ref() == Some(id))
    }

    /// Replace the project sharing `project`'s identity, or append it.
    pub fn upsert_project(&mut self, project: Value) -> Result<(), DocumentError> {
        let id = EntityId::of(&project).ok_or(DocumentError::MissingProjectId)?;
        match self
            .projects
            .iter_mut()
            .find(|existing| EntityId::of(existing).as_ref() == Some(&id))
        {
            Some(slot) => *slot = project,
            None => self.projects.push(project),
        }
        Ok(())
    }

    /// Remove every project with the given identity.
    ///
    /// Returns whether anything was removed.
    pub fn remove_project(&mut self, id: &EntityId) -> bool {
        let before = self.projects.len();
        self.projects
            .retain(|project| EntityId::of(project).as_ref() != Some(id));
        self.projects.len() != before
    }

    /// Render as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::from(self.clone())
    }
}

impl TryFrom<Value> for BoardDocument {
    type Error = DocumentError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<BoardDocument> for Value {
    fn from(document: BoardDocument) -> Self {
        let BoardDocument { projects, mut extra } = document;
        extra.insert(PROJECTS_KEY.to_owned(), Value::Array(projects));
        Value::Object(extra)
    }
}

/// A document paired with the version it was stored at.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedDocument {
    /// Normalized content.
    pub document: BoardDocument,
    /// Version the content was accepted at.
    pub version: StateVersion,
}

impl VersionedDocument {
    /// Pair a document with its version.
    pub fn new(document: BoardDocument, version: StateVersion) -> Self {
        Self { document, version }
    }

    /// Served form: the document's fields with `version` merged in.
    pub fn to_value(&self) -> Value {
        let mut value = self.document.to_value();
        if let Value::Object(fields) = &mut value {
            fields.insert(VERSION_KEY.to_owned(), Value::from(self.version.get()));
        }
        value
    }

    /// Parse the served form, insisting on an object with a `projects`
    /// array and a numeric `version`.
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        let Value::Object(fields) = value else {
            return Err(DocumentError::NotAnAggregate);
        };
        let version = fields
            .get(VERSION_KEY)
            .and_then(Value::as_u64)
            .map(StateVersion::new)
            .ok_or(DocumentError::MissingVersion)?;
        let document = DocumentShape::Normalized(fields).normalize()?;
        Ok(Self { document, version })
    }
}

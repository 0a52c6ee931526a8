use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier for a graph entity: `{path}::{name}@{start}-{end}`.
///
/// Line-range suffixes keep overloaded names within one file distinct;
/// re-parsing a file after an edit yields new ids for moved entities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(path: &str, name: &str, start_line: usize, end_line: usize) -> Self {
        Self(format!("{path}::{name}@{start_line}-{end_line}"))
    }

    /// Wrap an id string produced by [`EntityId::to_string`], e.g. one
    /// round-tripped through a vector index.
    pub fn from_raw(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    File,
    Function,
    Class,
    /// Named target that was referenced but never parsed as a definition
    /// (imports, unresolved calls). Placeholder until a definition shows up.
    Symbol,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::File => "file",
            EntityKind::Function => "function",
            EntityKind::Class => "class",
            EntityKind::Symbol => "symbol",
        }
    }
}

/// A node in the relationship graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeEntity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    pub path: String,
    pub start_line: usize,
    pub end_line: usize,
}

impl CodeEntity {
    pub fn new(
        kind: EntityKind,
        name: impl Into<String>,
        path: impl Into<String>,
        start_line: usize,
        end_line: usize,
    ) -> Self {
        let name = name.into();
        let path = path.into();
        Self {
            id: EntityId::new(&path, &name, start_line, end_line),
            kind,
            name,
            path,
            start_line,
            end_line,
        }
    }

    /// Number of lines the entity spans, used to pick the tightest
    /// enclosing entity for a position.
    pub fn span(&self) -> usize {
        self.end_line.saturating_sub(self.start_line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Member entity to its containing file
    DefinedIn,
    /// File to an imported symbol
    Imports,
    /// Function or class to a callee
    Calls,
    /// Function or class to a referenced type or constant
    Uses,
}

impl RelationKind {
    pub const ALL: [RelationKind; 4] = [
        RelationKind::DefinedIn,
        RelationKind::Imports,
        RelationKind::Calls,
        RelationKind::Uses,
    ];
}

/// A directed relationship between two entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: EntityId,
    pub target: EntityId,
    pub kind: RelationKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_entity_id_format() {
        let id = EntityId::new("src/config.py", "load_config", 10, 42);
        assert_eq!(id.to_string(), "src/config.py::load_config@10-42");
    }

    #[test]
    fn test_entity_construction() {
        let entity = CodeEntity::new(EntityKind::Function, "load_config", "src/config.py", 10, 42);
        assert_eq!(entity.id.as_str(), "src/config.py::load_config@10-42");
        assert_eq!(entity.span(), 32);
    }
}

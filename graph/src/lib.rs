/*!
# Codectx Relationship Graph

In-memory graph of parsed code entities (files, functions, classes,
symbols) and the relationships between them (`DefinedIn`, `Imports`,
`Calls`, `Uses`). Built incrementally from [`codectx_structure::FileStructure`]
snapshots, one file at a time; each file's contribution is replaced
atomically on re-index.

The graph answers the structural side of hybrid retrieval: exact name
lookups, enclosing-entity queries for a cursor position, and bounded
breadth-first neighborhood walks.
*/

mod entity;
mod error;
mod graph;

pub use entity::{CodeEntity, Edge, EntityId, EntityKind, RelationKind};
pub use error::GraphError;
pub use graph::{GraphConfig, RelationshipGraph};

pub type Result<T> = std::result::Result<T, GraphError>;

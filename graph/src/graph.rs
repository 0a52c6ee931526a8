use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::path::Path;

use codectx_structure::{FileStructure, StructureItem};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::Result;
use crate::entity::{CodeEntity, Edge, EntityId, EntityKind, RelationKind};
use crate::error::GraphError;

const DEFAULT_SHARD_COUNT: usize = 16;

/// Configuration for [`RelationshipGraph`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Number of file-record lock shards
    #[serde(default = "default_shard_count")]
    pub shard_count: usize,
}

fn default_shard_count() -> usize {
    DEFAULT_SHARD_COUNT
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            shard_count: DEFAULT_SHARD_COUNT,
        }
    }
}

impl GraphConfig {
    pub fn validate(&self) -> Result<()> {
        if self.shard_count == 0 {
            return Err(GraphError::InvalidConfig(
                "shard_count must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything one file contributed to the graph. Replaced as a unit on
/// re-index, so a file update is atomic with respect to readers.
#[derive(Debug)]
struct FileRecord {
    file_id: EntityId,
    entities: Vec<CodeEntity>,
    outgoing: Vec<Edge>,
}

/// Cross-file lookup tables, updated together with the owning file record.
#[derive(Debug, Default)]
struct Indexes {
    /// Exact name to ids, in upsert order
    by_name: HashMap<String, Vec<(EntityKind, EntityId)>>,
    /// Reverse adjacency, in upsert order
    incoming: HashMap<EntityId, Vec<Edge>>,
    /// Entity id to its owning file path
    locate: HashMap<EntityId, String>,
}

impl Indexes {
    fn add_record(&mut self, path: &str, record: &FileRecord) {
        for entity in &record.entities {
            self.by_name
                .entry(entity.name.clone())
                .or_default()
                .push((entity.kind, entity.id.clone()));
            self.locate.insert(entity.id.clone(), path.to_string());
        }
        for edge in &record.outgoing {
            self.incoming
                .entry(edge.target.clone())
                .or_default()
                .push(edge.clone());
        }
    }

    fn strip_record(&mut self, record: &FileRecord) {
        for entity in &record.entities {
            if let Some(ids) = self.by_name.get_mut(&entity.name) {
                ids.retain(|(_, id)| *id != entity.id);
                if ids.is_empty() {
                    self.by_name.remove(&entity.name);
                }
            }
            self.locate.remove(&entity.id);
        }
        // Only this file's own edges leave the reverse index; edges other
        // files point at these entities must survive a re-index. Entries
        // left keyed by a removed entity are skipped by the locate check
        // during traversal.
        for edge in &record.outgoing {
            if let Some(edges) = self.incoming.get_mut(&edge.target) {
                edges.retain(|e| e != edge);
                if edges.is_empty() {
                    self.incoming.remove(&edge.target);
                }
            }
        }
    }

    /// First id registered under `name`, preferring real definitions over
    /// placeholder symbols. Entries from `exclude_path` are skipped so a
    /// file being re-indexed never resolves against its own stale revision.
    fn resolve_name(&self, name: &str, exclude_path: &str) -> Option<EntityId> {
        let ids = self.by_name.get(name)?;
        let mut fallback = None;
        for (kind, id) in ids {
            if self.locate.get(id).is_some_and(|p| p == exclude_path) {
                continue;
            }
            if *kind != EntityKind::Symbol {
                return Some(id.clone());
            }
            if fallback.is_none() {
                fallback = Some(id.clone());
            }
        }
        fallback
    }
}

/// In-memory graph of code entities and their relationships.
///
/// File records live in path-hashed shards behind `tokio::sync::RwLock`, so
/// entity reads for one file never wait on updates to files in other shards.
/// Upserts resolve references under the index read lock and take the write
/// lock only for the strip/add swap; the lock order is always indexes
/// before shard.
///
/// Nothing is persisted. A restart re-indexes from source.
#[derive(Debug)]
pub struct RelationshipGraph {
    shards: Vec<RwLock<HashMap<String, FileRecord>>>,
    indexes: RwLock<Indexes>,
}

impl RelationshipGraph {
    pub fn new(config: GraphConfig) -> Result<Self> {
        config.validate()?;
        let shards = (0..config.shard_count)
            .map(|_| RwLock::new(HashMap::new()))
            .collect();
        Ok(Self {
            shards,
            indexes: RwLock::new(Indexes::default()),
        })
    }

    fn shard_for(&self, path: &str) -> &RwLock<HashMap<String, FileRecord>> {
        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        let idx = (hasher.finish() as usize) % self.shards.len();
        &self.shards[idx]
    }

    /// Replace everything known about `path` with the entities and edges
    /// derived from `structure`.
    ///
    /// A structure that fails validation is rejected without touching the
    /// graph; records for other files are never affected either way.
    /// Reference targets resolve against local definitions first, then the
    /// global name index, else a placeholder `Symbol` entity is created in
    /// this file.
    pub async fn upsert_file(&self, path: &str, structure: &FileStructure) -> Result<()> {
        structure
            .validate()
            .map_err(|e| GraphError::RejectedStructure {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        // Build against a read snapshot. Resolution skips this file's own
        // index entries, so the outcome matches a strip-then-build under
        // one lock while the write lock is held only for the swap below.
        let record = {
            let indexes = self.indexes.read().await;
            build_record(path, structure, &indexes)
        };
        log::debug!(
            "Indexed {path}: {} entities, {} edges",
            record.entities.len(),
            record.outgoing.len()
        );

        let mut indexes = self.indexes.write().await;
        let mut shard = self.shard_for(path).write().await;
        if let Some(old) = shard.remove(path) {
            indexes.strip_record(&old);
        }
        indexes.add_record(path, &record);
        shard.insert(path.to_string(), record);
        Ok(())
    }

    /// Drop a file's entities and edges. Returns the number of entities
    /// removed.
    pub async fn remove_file(&self, path: &str) -> usize {
        let mut indexes = self.indexes.write().await;
        let mut shard = self.shard_for(path).write().await;
        match shard.remove(path) {
            Some(old) => {
                indexes.strip_record(&old);
                old.entities.len()
            }
            None => 0,
        }
    }

    pub async fn entity(&self, id: &EntityId) -> Option<CodeEntity> {
        let indexes = self.indexes.read().await;
        let path = indexes.locate.get(id)?.clone();
        drop(indexes);

        let shard = self.shard_for(&path).read().await;
        let record = shard.get(&path)?;
        record.entities.iter().find(|e| e.id == *id).cloned()
    }

    /// Tightest entity enclosing `line` in `path`: the smallest-span
    /// function wins, then the smallest-span class, then the file itself.
    pub async fn entity_at(&self, path: &str, line: usize) -> Option<CodeEntity> {
        let shard = self.shard_for(path).read().await;
        let record = shard.get(path)?;

        for kind in [EntityKind::Function, EntityKind::Class] {
            let enclosing = record
                .entities
                .iter()
                .filter(|e| e.kind == kind && e.start_line <= line && line <= e.end_line)
                .min_by_key(|e| e.span());
            if let Some(entity) = enclosing {
                return Some(entity.clone());
            }
        }
        record
            .entities
            .iter()
            .find(|e| e.id == record.file_id)
            .cloned()
    }

    /// Exact-name lookup, in the order the entities were indexed.
    pub async fn find_by_name(&self, name: &str, kind: Option<EntityKind>) -> Vec<EntityId> {
        let indexes = self.indexes.read().await;
        indexes
            .by_name
            .get(name)
            .map(|ids| {
                ids.iter()
                    .filter(|(k, _)| kind.is_none_or(|want| *k == want))
                    .map(|(_, id)| id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Sorted snapshot of all known entity names, optionally limited to one
    /// kind. Used for fuzzy keyword matching.
    pub async fn entity_names(&self, kind: Option<EntityKind>) -> Vec<String> {
        let indexes = self.indexes.read().await;
        let mut names: Vec<String> = indexes
            .by_name
            .iter()
            .filter(|(_, ids)| ids.iter().any(|(k, _)| kind.is_none_or(|want| *k == want)))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Breadth-first neighborhood of `id` up to `max_depth` hops, following
    /// outgoing edges before incoming ones, each in insertion order. The
    /// result is ordered by increasing depth and excludes the start; cycles
    /// are cut by the visited set. `kinds` limits the edges followed, an
    /// empty slice follows all of them.
    pub async fn neighbors(
        &self,
        id: &EntityId,
        kinds: &[RelationKind],
        max_depth: usize,
    ) -> Vec<EntityId> {
        self.neighbors_with_depth(id, kinds, max_depth)
            .await
            .into_iter()
            .map(|(id, _)| id)
            .collect()
    }

    /// Same walk as [`Self::neighbors`], with each entity tagged by the hop
    /// count at which it was first reached (1 for direct neighbors).
    pub async fn neighbors_with_depth(
        &self,
        id: &EntityId,
        kinds: &[RelationKind],
        max_depth: usize,
    ) -> Vec<(EntityId, usize)> {
        let indexes = self.indexes.read().await;
        if !indexes.locate.contains_key(id) {
            return Vec::new();
        }

        let follows =
            |kind: RelationKind| -> bool { kinds.is_empty() || kinds.contains(&kind) };

        let mut visited: HashSet<EntityId> = HashSet::from([id.clone()]);
        let mut result = Vec::new();
        let mut frontier = vec![id.clone()];

        for depth in 1..=max_depth {
            let mut next = Vec::new();
            for node in &frontier {
                let mut linked: Vec<EntityId> = Vec::new();

                if let Some(path) = indexes.locate.get(node) {
                    let shard = self.shard_for(path).read().await;
                    if let Some(record) = shard.get(path) {
                        linked.extend(
                            record
                                .outgoing
                                .iter()
                                .filter(|e| e.source == *node && follows(e.kind))
                                .map(|e| e.target.clone()),
                        );
                    }
                }
                if let Some(edges) = indexes.incoming.get(node) {
                    linked.extend(
                        edges
                            .iter()
                            .filter(|e| follows(e.kind))
                            .map(|e| e.source.clone()),
                    );
                }

                for candidate in linked {
                    // Dangling targets stay out of results and expansion.
                    if !indexes.locate.contains_key(&candidate) {
                        continue;
                    }
                    if visited.insert(candidate.clone()) {
                        result.push((candidate.clone(), depth));
                        next.push(candidate);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        result
    }

    /// Direct targets of `id`'s own edges, in insertion order. Unlike
    /// [`Self::neighbors`] this never follows incoming edges, so it answers
    /// "what does this entity depend on" rather than "what is nearby".
    pub async fn outgoing(&self, id: &EntityId, kinds: &[RelationKind]) -> Vec<EntityId> {
        let indexes = self.indexes.read().await;
        let Some(path) = indexes.locate.get(id) else {
            return Vec::new();
        };

        let shard = self.shard_for(path).read().await;
        let Some(record) = shard.get(path) else {
            return Vec::new();
        };
        record
            .outgoing
            .iter()
            .filter(|e| {
                e.source == *id && (kinds.is_empty() || kinds.contains(&e.kind))
            })
            .map(|e| e.target.clone())
            .collect()
    }

    pub async fn entity_count(&self) -> usize {
        self.indexes.read().await.locate.len()
    }

    pub async fn file_count(&self) -> usize {
        let mut count = 0;
        for shard in &self.shards {
            count += shard.read().await.len();
        }
        count
    }
}

fn file_display_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// Build the entity and edge set one parsed file contributes. `indexes`
/// still holds every other file's names, so cross-file references resolve
/// here; names nobody defines become placeholder symbols local to this file.
fn build_record(path: &str, structure: &FileStructure, indexes: &Indexes) -> FileRecord {
    let file_entity = CodeEntity::new(EntityKind::File, file_display_name(path), path, 0, 0);
    let file_id = file_entity.id.clone();

    let mut entities = vec![file_entity];
    let mut outgoing = Vec::new();

    let members: Vec<(EntityKind, &StructureItem)> = structure
        .functions
        .iter()
        .map(|item| (EntityKind::Function, item))
        .chain(structure.classes.iter().map(|item| (EntityKind::Class, item)))
        .chain(structure.symbols.iter().map(|item| (EntityKind::Symbol, item)))
        .collect();

    // Local definitions shadow the global index; first definition wins.
    let mut local: HashMap<&str, EntityId> = HashMap::new();
    for (kind, item) in &members {
        let entity = CodeEntity::new(
            *kind,
            item.name.as_str(),
            path,
            item.start_line,
            item.end_line,
        );
        local.entry(item.name.as_str()).or_insert_with(|| entity.id.clone());
        outgoing.push(Edge {
            source: entity.id.clone(),
            target: file_id.clone(),
            kind: RelationKind::DefinedIn,
        });
        entities.push(entity);
    }

    let mut placeholders: HashMap<String, EntityId> = HashMap::new();
    let mut resolve = |name: &str, entities: &mut Vec<CodeEntity>| -> EntityId {
        if let Some(id) = local.get(name) {
            return id.clone();
        }
        if let Some(id) = indexes.resolve_name(name, path) {
            return id;
        }
        placeholders
            .entry(name.to_string())
            .or_insert_with(|| {
                let placeholder = CodeEntity::new(EntityKind::Symbol, name, path, 0, 0);
                let id = placeholder.id.clone();
                entities.push(placeholder);
                id
            })
            .clone()
    };

    for import in &structure.imports {
        let target = resolve(import, &mut entities);
        outgoing.push(Edge {
            source: file_id.clone(),
            target,
            kind: RelationKind::Imports,
        });
    }

    for (kind, item) in &members {
        let source = EntityId::new(path, &item.name, item.start_line, item.end_line);
        for callee in &item.calls {
            let target = resolve(callee, &mut entities);
            outgoing.push(Edge {
                source: source.clone(),
                target,
                kind: RelationKind::Calls,
            });
        }
        for used in &item.uses {
            let target = resolve(used, &mut entities);
            outgoing.push(Edge {
                source: source.clone(),
                target,
                kind: RelationKind::Uses,
            });
        }
    }

    FileRecord {
        file_id,
        entities,
        outgoing,
    }
}

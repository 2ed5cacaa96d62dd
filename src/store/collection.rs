//! JSON-file-backed document collection.
//!
//! The file layout is TinyDB's default table:
//!
//! ```text
//! {"_default": {"1": {"id": "abc", ...}, "2": {...}}}
//! ```
//!
//! so snapshots written by earlier tooling load unchanged. Other tables in the
//! file are carried through untouched. Every write rewrites the whole file via
//! a temporary sibling and a rename.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::StoreError;

use super::{json_eq, Document};

/// Store-assigned document id.
pub type DocId = u64;

const DEFAULT_TABLE: &str = "_default";

#[derive(Debug, Default)]
struct CollectionFile {
    documents: BTreeMap<DocId, Document>,
    other_tables: Map<String, Value>,
}

impl CollectionFile {
    /// Split a parsed file into the default table and everything else.
    fn from_root(mut root: Map<String, Value>) -> Result<Self, StoreError> {
        let table = match root.remove(DEFAULT_TABLE) {
            Some(Value::Object(table)) => table,
            Some(_) => return Err(invalid_file(format!("`{}` is not an object", DEFAULT_TABLE))),
            None => Map::new(),
        };

        let mut documents = BTreeMap::new();
        for (key, value) in table {
            let id: DocId = key
                .parse()
                .map_err(|_| invalid_file(format!("document id `{}` is not an integer", key)))?;
            match value {
                Value::Object(doc) => {
                    documents.insert(id, doc);
                }
                _ => return Err(invalid_file(format!("document {} is not an object", id))),
            }
        }

        Ok(Self {
            documents,
            other_tables: root,
        })
    }
}

/// A set of JSON documents persisted to one file.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    /// Backing file; `None` keeps the collection in memory only.
    path: Option<PathBuf>,
    documents: BTreeMap<DocId, Document>,
    other_tables: Map<String, Value>,
    next_id: DocId,
    writes: u64,
}

/// Undo information for a staged batch.
#[derive(Debug)]
pub(crate) struct Rollback {
    inserted: Vec<DocId>,
    replaced: Vec<(DocId, Document)>,
    next_id: DocId,
    writes: u64,
}

impl Collection {
    /// Open the collection stored at `path`.
    ///
    /// A missing or empty file yields an empty collection; the file is
    /// created on first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let file = match load_file(&path)? {
            Some(file) => file,
            None => {
                info!(path = %path.display(), "No collection file found, starting empty");
                CollectionFile::default()
            }
        };

        let next_id = file.documents.keys().next_back().map_or(1, |last| last + 1);
        debug!(
            path = %path.display(),
            documents = file.documents.len(),
            "Opened collection"
        );

        Ok(Self {
            path: Some(path),
            documents: file.documents,
            other_tables: file.other_tables,
            next_id,
            writes: 0,
        })
    }

    /// Collection that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the collection holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Logical write operations applied since open.
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    /// All documents in insertion order.
    pub fn all(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    /// All documents with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (DocId, &Document)> {
        self.documents.iter().map(|(id, doc)| (*id, doc))
    }

    /// Document by id.
    pub fn get(&self, id: DocId) -> Option<&Document> {
        self.documents.get(&id)
    }

    /// Documents whose `field` equals `value`.
    pub fn search<'a>(
        &'a self,
        field: &'a str,
        value: &'a Value,
    ) -> impl Iterator<Item = (DocId, &'a Document)> + 'a {
        self.iter()
            .filter(move |(_, doc)| doc.get(field).is_some_and(|v| json_eq(v, value)))
    }

    /// Whether any document has `field` equal to `value`.
    pub fn contains(&self, field: &str, value: &Value) -> bool {
        self.search(field, value).next().is_some()
    }

    /// Values of `field` across documents that have it.
    pub fn values_of<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.all().filter_map(move |doc| doc.get(field))
    }

    /// Insert one document and persist.
    pub fn insert(&mut self, doc: Document) -> Result<DocId, StoreError> {
        let mut ids = self.insert_multiple(vec![doc])?;
        Ok(ids.remove(0))
    }

    /// Insert documents with one write and persist.
    pub fn insert_multiple(&mut self, docs: Vec<Document>) -> Result<Vec<DocId>, StoreError> {
        let mut rollback = self.begin();
        let ids = self.stage_insert(docs, &mut rollback);
        self.commit(rollback)?;
        Ok(ids)
    }

    /// Replace every document whose `field` equals `value` with `doc`.
    ///
    /// Returns the number of replaced documents.
    pub fn update_where(
        &mut self,
        field: &str,
        value: &Value,
        doc: Document,
    ) -> Result<usize, StoreError> {
        let mut rollback = self.begin();
        let replaced = self.stage_update(field, value, doc, &mut rollback);
        self.commit(rollback)?;
        Ok(replaced)
    }

    /// Start staging a batch of changes.
    pub(crate) fn begin(&self) -> Rollback {
        Rollback {
            inserted: Vec::new(),
            replaced: Vec::new(),
            next_id: self.next_id,
            writes: self.writes,
        }
    }

    pub(crate) fn stage_insert(&mut self, docs: Vec<Document>, rollback: &mut Rollback) -> Vec<DocId> {
        if docs.is_empty() {
            return Vec::new();
        }

        let mut ids = Vec::with_capacity(docs.len());
        for doc in docs {
            let id = self.next_id;
            self.next_id += 1;
            self.documents.insert(id, doc);
            rollback.inserted.push(id);
            ids.push(id);
        }
        self.writes += 1;
        ids
    }

    pub(crate) fn stage_update(
        &mut self,
        field: &str,
        value: &Value,
        doc: Document,
        rollback: &mut Rollback,
    ) -> usize {
        let matching: Vec<DocId> = self.search(field, value).map(|(id, _)| id).collect();

        for id in &matching {
            if let Some(previous) = self.documents.insert(*id, doc.clone()) {
                rollback.replaced.push((*id, previous));
            }
        }
        self.writes += 1;
        matching.len()
    }

    /// Persist staged changes, undoing them in memory if the write fails.
    pub(crate) fn commit(&mut self, rollback: Rollback) -> Result<(), StoreError> {
        if rollback.inserted.is_empty() && rollback.replaced.is_empty() {
            return Ok(());
        }

        if let Err(e) = self.flush() {
            for (id, previous) in rollback.replaced.into_iter().rev() {
                self.documents.insert(id, previous);
            }
            for id in rollback.inserted {
                self.documents.remove(&id);
            }
            self.next_id = rollback.next_id;
            self.writes = rollback.writes;
            return Err(e);
        }
        Ok(())
    }

    /// Write the whole collection to its file.
    pub fn flush(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(io_error(path))?;
            }
        }

        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        let written = write_json(&tmp_path, &self.file_view())
            .and_then(|()| fs::rename(&tmp_path, path).map_err(io_error(path)));
        if written.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        written?;

        debug!(path = %path.display(), documents = self.documents.len(), "Saved collection");
        Ok(())
    }

    fn file_view(&self) -> Value {
        let mut root = self.other_tables.clone();
        let documents: Map<String, Value> = self
            .documents
            .iter()
            .map(|(id, doc)| (id.to_string(), Value::Object(doc.clone())))
            .collect();
        root.insert(DEFAULT_TABLE.to_string(), Value::Object(documents));
        Value::Object(root)
    }
}

fn load_file(path: &Path) -> Result<Option<CollectionFile>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }

    let metadata = fs::metadata(path).map_err(io_error(path))?;
    if metadata.len() == 0 {
        return Ok(None);
    }

    let file = File::open(path).map_err(io_error(path))?;
    let root: Map<String, Value> = serde_json::from_reader(BufReader::new(file))?;
    CollectionFile::from_root(root).map(Some)
}

fn write_json(path: &Path, value: &Value) -> Result<(), StoreError> {
    let file = File::create(path).map_err(io_error(path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush().map_err(io_error(path))
}

fn invalid_file(reason: String) -> StoreError {
    StoreError::Json(serde::de::Error::custom(reason))
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

use crate::document::{BookId, Document};
use crate::registry::Registry;
use crate::store::{Corpus, Library};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_books: u32,
    pub created_at: String,
    pub version: u32,
}

pub struct SnapshotPaths {
    pub root: PathBuf,
}

impl SnapshotPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn corpus(&self) -> PathBuf { self.root.join("corpus.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

#[derive(Serialize)]
struct CorpusFileRef<'a> {
    next_book_id: BookId,
    documents: Vec<(BookId, &'a Document)>,
    registry: &'a Registry,
}

#[derive(Deserialize)]
struct CorpusFile {
    next_book_id: BookId,
    documents: Vec<(BookId, Document)>,
    registry: Registry,
}

pub fn snapshot_exists(paths: &SnapshotPaths) -> bool {
    paths.corpus().is_file()
}

/// Write documents and registry. The index is derived and rebuilt on load.
pub fn save_snapshot(paths: &SnapshotPaths, library: &Library) -> Result<()> {
    create_dir_all(&paths.root)?;
    let _saving = library.lock_saves();
    let corpus = library.read();
    let file = CorpusFileRef {
        next_book_id: corpus.next_book_id(),
        documents: corpus.documents().collect(),
        registry: corpus.registry(),
    };
    let bytes = bincode::serialize(&file)?;
    // write-then-rename so a crash never leaves a truncated snapshot
    let mut tmp = NamedTempFile::new_in(&paths.root)?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(paths.corpus()).with_context(|| format!("replacing {}", paths.corpus().display()))?;

    let meta = MetaFile {
        num_books: corpus.num_documents() as u32,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "".into()),
        version: SNAPSHOT_VERSION,
    };
    save_meta(paths, &meta)?;
    tracing::debug!(root = %paths.root.display(), books = meta.num_books, "saved snapshot");
    Ok(())
}

pub fn load_snapshot(paths: &SnapshotPaths) -> Result<Library> {
    let meta = load_meta(paths)?;
    if meta.version != SNAPSHOT_VERSION {
        anyhow::bail!("unsupported snapshot version {} (expected {SNAPSHOT_VERSION})", meta.version);
    }
    let mut f = File::open(paths.corpus()).with_context(|| format!("opening {}", paths.corpus().display()))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let file: CorpusFile = bincode::deserialize(&buf)?;
    let corpus = Corpus::from_parts(file.documents, file.next_book_id, file.registry)?;
    tracing::info!(root = %paths.root.display(), books = corpus.num_documents(), "loaded snapshot");
    Ok(Library::from_corpus(corpus))
}

/// Load the snapshot if one exists, otherwise start empty.
pub fn open_or_create(paths: &SnapshotPaths) -> Result<Library> {
    if snapshot_exists(paths) {
        load_snapshot(paths)
    } else {
        Ok(Library::new())
    }
}

pub fn save_meta(paths: &SnapshotPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &SnapshotPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::WordFilters;

    #[test]
    fn snapshot_round_trip_keeps_index_and_registry() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SnapshotPaths::new(dir.path());
        assert!(!snapshot_exists(&paths));

        let lib = Library::new();
        lib.add_book("Genesis.1\n[1] In the beginning God created", "Genesis", "Torah").unwrap();
        lib.add_group("divine-names").unwrap();
        lib.add_word_to_group("divine-names", "God").unwrap();
        lib.add_phrase("in the beginning").unwrap();
        save_snapshot(&paths, &lib).unwrap();

        let loaded = load_snapshot(&paths).unwrap();
        assert_eq!(loaded.list_book_names(), vec!["genesis"]);
        let page = loaded
            .filter_words(&WordFilters { group_name: Some("divine-names".into()), ..Default::default() }, 0, 10)
            .unwrap();
        assert_eq!(page.items, vec!["god"]);
        assert_eq!(loaded.get_phrase_references("in the beginning").unwrap().len(), 1);
        assert_eq!(load_meta(&paths).unwrap().num_books, 1);

        // ids keep counting after a reload
        loaded.add_book("Exodus.1\n[1] Now these are the names", "Exodus", "Torah").unwrap();
        assert_eq!(loaded.list_book_names(), vec!["genesis", "exodus"]);
    }

    #[test]
    fn concurrent_saves_all_succeed_and_keep_latest_state() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SnapshotPaths::new(dir.path());
        let lib = Library::new();

        std::thread::scope(|s| {
            for t in 0..8 {
                let (lib, paths) = (&lib, &paths);
                s.spawn(move || {
                    for i in 0..10 {
                        lib.add_group(&format!("group-{t}-{i}")).unwrap();
                        save_snapshot(paths, lib).unwrap();
                    }
                });
            }
        });

        let loaded = load_snapshot(&paths).unwrap();
        assert_eq!(loaded.list_groups().len(), 80);
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n != "corpus.bin" && n != "meta.json")
            .collect();
        assert!(leftovers.is_empty(), "{leftovers:?}");
    }
}

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::Context;

use crate::models::InvertedIndex;

/// Serializes `index` to a single file at `path`, overwriting it if present.
pub fn save(index: &InvertedIndex, path: &Path) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("create index file {path:?}"))?;
    let mut writer = BufWriter::new(file);
    bincode2::serialize_into(&mut writer, index)
        .with_context(|| format!("serialize index to {path:?}"))?;
    Ok(())
}

/// Loads the index at `path`. A missing file is not an error: it yields a
/// fresh empty index, matching what a first-time `index` build expects.
/// Any other I/O or decode failure is surfaced.
pub fn load(path: &Path) -> anyhow::Result<InvertedIndex> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(InvertedIndex::new()),
        Err(err) => return Err(err).with_context(|| format!("open index file {path:?}")),
    };
    let mut reader = BufReader::new(file);
    let mut index: InvertedIndex = bincode2::deserialize_from(&mut reader)
        .with_context(|| format!("decode index file {path:?}"))?;
    index.normalize();
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, Posting};
    use std::path::PathBuf;
    use std::time::SystemTime;
    use std::io::Write;

    fn sample_index() -> InvertedIndex {
        let mut idx = InvertedIndex::new();
        idx.docs.insert(
            0,
            Document {
                id: 0,
                path: PathBuf::from("a.txt"),
                total_words: 4,
                last_modified: SystemTime::UNIX_EPOCH,
            },
        );
        idx.index
            .insert("quick".to_string(), vec![Posting::new(0, vec![1])]);
        idx.next_doc_id = 1;
        idx
    }

    #[test]
    fn load_missing_file_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.idx");

        let idx = load(&path).expect("missing file must not be an error");
        assert!(idx.docs.is_empty());
        assert!(idx.index.is_empty());
        assert_eq!(idx.next_doc_id, 0);
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.idx");
        let original = sample_index();

        save(&original, &path).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded.next_doc_id, original.next_doc_id);
        assert_eq!(loaded.docs.len(), original.docs.len());
        assert_eq!(
            loaded.docs.get(&0).unwrap().path,
            original.docs.get(&0).unwrap().path
        );
        assert_eq!(
            loaded.index.get("quick").unwrap(),
            original.index.get("quick").unwrap()
        );
    }

    #[test]
    fn truncated_file_fails_to_load_instead_of_returning_a_partial_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.idx");
        save(&sample_index(), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let mut file = File::create(&path).unwrap();
        file.write_all(&bytes[..bytes.len() / 2]).unwrap();

        assert!(load(&path).is_err());
    }
}

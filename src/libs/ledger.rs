use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Persisted, append-only set of finished identifiers (downloaded clusters,
/// prepared clusters, built leaves), one per line.
///
/// Stages consult it instead of guessing from the files present on disk.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    done: Mutex<BTreeSet<String>>,
}

impl Ledger {
    /// Load the ledger at `path`; a missing file is an empty ledger.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut done = BTreeSet::new();

        match std::fs::File::open(&path) {
            Ok(file) => {
                for line in BufReader::new(file).lines() {
                    let line = line?;
                    let id = line.trim();
                    if !id.is_empty() {
                        done.insert(id.to_string());
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        Ok(Self {
            path,
            done: Mutex::new(done),
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Add `id`, appending it to the file unless it is already listed.
    pub fn record(&self, id: &str) -> std::io::Result<()> {
        let mut done = self.lock();
        if done.contains(id) {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", id)?;

        done.insert(id.to_string());
        Ok(())
    }

    /// Forget `id`. The file is rewritten without it.
    pub fn remove(&self, id: &str) -> std::io::Result<()> {
        let mut done = self.lock();
        if !done.remove(id) {
            return Ok(());
        }

        let mut staged = tempfile::NamedTempFile::new_in(
            self.path.parent().unwrap_or_else(|| Path::new(".")),
        )?;
        for id in done.iter() {
            writeln!(staged, "{}", id)?;
        }
        staged.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Forget everything and delete the file
    pub fn clear(&self) -> std::io::Result<()> {
        let mut done = self.lock();
        done.clear();
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeSet<String>> {
        // the set stays consistent even if a holder panicked
        self.done.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn record_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sub/.completed");

        let ledger = Ledger::open(&path).unwrap();
        assert!(ledger.is_empty());
        ledger.record("A").unwrap();
        ledger.record("B").unwrap();
        ledger.record("A").unwrap();

        let reloaded = Ledger::open(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains("A") && reloaded.contains("B"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "A\nB\n");
    }

    #[test]
    fn remove_and_clear() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".completed");
        let ledger = Ledger::open(&path).unwrap();
        for id in ["c1", "c2", "c3"] {
            ledger.record(id).unwrap();
        }

        ledger.remove("c2").unwrap();
        assert!(!ledger.contains("c2"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "c1\nc3\n");

        ledger.clear().unwrap();
        assert!(ledger.is_empty());
        assert!(!path.exists());
        ledger.clear().unwrap();
    }
}

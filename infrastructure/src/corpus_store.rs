use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::Context;
use domain::corpus::Corpus;
use memmap2::Mmap;
use shared::types::Result;

/// On-disk corpus layout: one JSON document per source under a common
/// directory, e.g. `embeddings/discourse.json`.
pub struct CorpusStore {
    dir: PathBuf,
}

impl CorpusStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, source: &str) -> PathBuf {
        self.dir.join(format!("{source}.json"))
    }

    /// Load and validate one source. The file is memory-mapped so large
    /// embedding files are parsed without a second in-memory copy.
    pub fn load(&self, source: &str) -> Result<Corpus> {
        let path = self.path_for(source);
        let file = File::open(&path)
            .with_context(|| format!("cannot open corpus file {}", path.display()))?;
        // Read-only map; the file is never written while loaded.
        let map = unsafe { Mmap::map(&file) }
            .with_context(|| format!("cannot map corpus file {}", path.display()))?;
        let corpus: Corpus = serde_json::from_slice(&map)
            .with_context(|| format!("corpus file {} is not valid JSON", path.display()))?;
        corpus
            .validate()
            .with_context(|| format!("corpus file {} is inconsistent", path.display()))?;
        Ok(corpus)
    }

    pub fn save(&self, corpus: &Corpus) -> Result<()> {
        corpus.validate()?;
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("cannot create corpus dir {}", self.dir.display()))?;
        let path = self.path_for(&corpus.source);
        let json = serde_json::to_vec_pretty(corpus)?;
        fs::write(&path, json)
            .with_context(|| format!("cannot write corpus file {}", path.display()))?;
        Ok(())
    }
}

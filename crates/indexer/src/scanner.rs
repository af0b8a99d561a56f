use std::path::{Path, PathBuf};

use context_extract::ExtractionRouter;
use context_protocol::policy;
use ignore::WalkBuilder;

/// Walks a directory and retains files an extractor supports and that pass
/// allow/block admission — spec.md §4.4 step 1 ("enumerate filesystem").
pub struct FileScanner<'a> {
    root: PathBuf,
    recursive: bool,
    extraction_router: &'a ExtractionRouter,
    allowed_list: &'a [String],
    block_list: &'a [String],
}

impl<'a> FileScanner<'a> {
    pub fn new(
        root: impl AsRef<Path>,
        recursive: bool,
        extraction_router: &'a ExtractionRouter,
        allowed_list: &'a [String],
        block_list: &'a [String],
    ) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            recursive,
            extraction_router,
            allowed_list,
            block_list,
        }
    }

    pub fn scan(&self) -> Vec<PathBuf> {
        let mut builder = WalkBuilder::new(&self.root);
        builder.hidden(false);
        if !self.recursive {
            builder.max_depth(Some(1));
        }

        let mut files = Vec::new();
        for entry in builder.build() {
            match entry {
                Ok(entry) => {
                    if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                        continue;
                    }
                    let path = entry.path();
                    if self.admits(path) {
                        files.push(path.to_path_buf());
                    }
                }
                Err(e) => log::warn!("failed to read directory entry: {e}"),
            }
        }

        log::info!("scanned {} admitted files under {}", files.len(), self.root.display());
        files
    }

    fn admits(&self, path: &Path) -> bool {
        if !self.extraction_router.supports(path) {
            return false;
        }
        let path_str = path.to_string_lossy();
        policy::admitted(&path_str, self.allowed_list, self.block_list)
    }
}

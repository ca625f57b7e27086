//! Output directory layout
//!
//! Computes filesystem paths for each of the four layout modes described by
//! [`crate::config::LayoutMode`], and tracks the running per-folder file
//! handles and skip counters the walker consults while descending the tree.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::archive::FolderHandle;
use crate::config::{Config, LayoutMode};
use crate::errors::{AppError, AppResult};
use crate::model::{ItemKind, ReducedKind};
use crate::sanitize::{sanitize_filename, unique_output_path};

/// Open output files for one folder, one per reduced kind bucket that is
/// actually used (Normal/KMail/Recurse), or a single running file counter
/// (Separate).
pub struct FileLedger {
    mode: LayoutMode,
    dir: PathBuf,
    folder_name: String,
    overwrite: bool,
    writers: HashMap<ReducedKind, (PathBuf, BufWriter<File>)>,
    /// Next numeric filename to try, per reduced kind, in Separate mode
    next_index: HashMap<ReducedKind, u32>,
    /// Count of items that existed but were not materialized (excluded kind,
    /// unresolved attachment id, rejected extension, ...)
    pub skip_count: u64,
    /// Count of items actually written to an output file or bucket
    processed_count: u64,
    /// Whether to write the Thunderbird `-u` `.type`/`.size` bookkeeping files
    thunderbird: bool,
    /// The folder descriptor's own declared item count, written into `.size`
    stored_count: Option<i32>,
}

impl FileLedger {
    /// Enter a folder: create its directory (for Recurse/Separate/KMail) and
    /// prepare to open per-kind output files lazily. Writes the Thunderbird
    /// `-u` `.type` bookkeeping file immediately, since it records the
    /// folder's own descriptor type rather than anything accumulated while
    /// inside it.
    pub fn enter(parent_dir: &Path, folder: &FolderHandle, config: &Config) -> AppResult<Self> {
        let safe_name = sanitize_filename(&folder.name);
        let dir = match config.layout {
            LayoutMode::Normal => parent_dir.to_path_buf(),
            LayoutMode::Kmail => {
                let dir = parent_dir.join(format!(".{safe_name}.directory"));
                fs::create_dir_all(&dir)?;
                dir
            }
            LayoutMode::Recurse | LayoutMode::Separate => {
                let dir = parent_dir.join(&safe_name);
                fs::create_dir_all(&dir)?;
                dir
            }
        };

        let thunderbird = config.layout == LayoutMode::Recurse && config.recurse.thunderbird;
        if thunderbird {
            let _ = fs::write(dir.join(".type"), format!("{}\n", ItemKind::Folder.raw_type_code()));
        }

        Ok(Self {
            mode: config.layout,
            dir,
            folder_name: safe_name,
            overwrite: config.overwrite,
            writers: HashMap::new(),
            next_index: HashMap::new(),
            skip_count: 0,
            processed_count: 0,
            thunderbird,
            stored_count: folder.item_count,
        })
    }

    /// The directory new child folders should be created under
    pub fn child_parent_dir(&self) -> &Path {
        &self.dir
    }

    /// Count of items actually written to an output file or bucket so far
    pub fn processed_count(&self) -> u64 {
        self.processed_count
    }

    /// Append `text` to the running output file for `kind`, opening it on
    /// first use (Normal/KMail/Recurse layouts: one file per kind per folder).
    pub fn write_bucket(&mut self, kind: ReducedKind, text: &str) -> AppResult<()> {
        use std::io::Write as _;
        if !self.writers.contains_key(&kind) {
            let path = self.bucket_path(kind);
            let (actual_path, file) = open_unique(&path, self.overwrite)?;
            self.writers.insert(kind, (actual_path, BufWriter::new(file)));
        }
        let (_, writer) = self.writers.get_mut(&kind).expect("just inserted");
        writer.write_all(text.as_bytes())?;
        self.processed_count += 1;
        Ok(())
    }

    fn bucket_path(&self, kind: ReducedKind) -> PathBuf {
        let base_name = match self.mode {
            LayoutMode::Normal | LayoutMode::Kmail => format!("{}.{}", self.folder_name, kind.file_extension()),
            LayoutMode::Recurse | LayoutMode::Separate => kind.file_extension().to_string(),
        };
        self.dir.join(base_name)
    }

    /// Write one item's rendered output as its own file (Separate layout only).
    /// Returns the path written and the numeric index assigned to it, the
    /// latter used to name any sibling attachment files for the same item.
    pub fn write_separate_item(&mut self, kind: ReducedKind, text: &str, extension: Option<&str>) -> AppResult<(PathBuf, u32)> {
        let index = *self.next_index.entry(kind).or_insert(0);
        let name = match extension {
            Some(ext) if !ext.is_empty() => format!("{index}{ext}"),
            _ => index.to_string(),
        };
        self.next_index.insert(kind, index + 1);
        let path = unique_output_path(&self.dir.join(name), self.overwrite)?;
        let mut file = File::create(&path)?;
        use std::io::Write as _;
        file.write_all(text.as_bytes())?;
        self.processed_count += 1;
        Ok((path, index))
    }

    /// Path for an attachment saved alongside a Separate-mode item.
    pub fn separate_attachment_path(&self, item_number: u32, attach_name: &str) -> AppResult<PathBuf> {
        let safe_name = sanitize_filename(attach_name);
        unique_output_path(&self.dir.join(format!("{item_number}-{safe_name}")), self.overwrite)
    }

    /// Flush and drop all open bucket files for this folder, then unlink any
    /// that ended up empty (a kind whose only items were all skipped). Writes
    /// the Thunderbird `-u` `.size` bookkeeping file last, since it reports
    /// counts accumulated over the whole folder visit.
    pub fn close(&mut self) -> AppResult<()> {
        use std::io::Write as _;
        for (path, writer) in self.writers.values_mut() {
            writer.flush()?;
            if writer.get_ref().metadata().map(|m| m.len() == 0).unwrap_or(false) {
                let _ = fs::remove_file(path);
            }
        }
        self.writers.clear();
        if self.thunderbird {
            let contents = format!("{} {}\n", self.processed_count, self.stored_count.unwrap_or(0));
            let _ = fs::write(self.dir.join(".size"), contents);
        }
        Ok(())
    }
}

impl ReducedKind {
    fn file_extension(self) -> &'static str {
        self.output_kind_name_for_layout()
    }

    fn output_kind_name_for_layout(self) -> &'static str {
        match self {
            ReducedKind::Appointment => "calendar",
            ReducedKind::Contact => "contacts",
            ReducedKind::Journal => "journal",
            ReducedKind::Note => "mbox",
        }
    }
}

fn open_unique(path: &Path, overwrite: bool) -> AppResult<(PathBuf, File)> {
    let target = unique_output_path(path, overwrite)?;
    let mut options = File::options();
    options.create(true);
    if overwrite {
        options.write(true).truncate(true);
    } else {
        options.append(true);
    }
    let file = options.open(&target).map_err(|e| AppError::Filesystem(format!("{}: {e}", target.display())))?;
    Ok((target, file))
}

//! Parser collaborator boundary
//!
//! The actual PST binary format is parsed by an external collaborator. This
//! module defines the trait contract the rest of the crate programs against,
//! so the walker and serializers never depend on a concrete parser.

use crate::errors::AppResult;
use crate::model::Item;

/// A folder node in the archive's tree, as seen by the walker
#[derive(Debug, Clone)]
pub struct FolderHandle {
    pub descriptor_id: u64,
    pub name: String,
    pub is_special_folder: bool,
    /// The folder descriptor's own declared item count, as recorded by the
    /// archive itself (not a count of items this run actually materialized).
    /// Used only for the Thunderbird `-u` `.size` bookkeeping file.
    pub item_count: Option<i32>,
}

/// A handle onto an open PST archive
///
/// Implementors own whatever file descriptors/index structures the real
/// format requires. `reopen` gives each worker task its own handle so no
/// read cursor is shared across threads.
pub trait PstArchive: Send + Sync {
    /// The folder that roots the visible tree (skips the root store item itself)
    fn top_of_folders(&self) -> AppResult<FolderHandle>;

    /// Direct child folders of `folder`, in archive order
    fn child_folders(&self, folder: &FolderHandle) -> AppResult<Vec<FolderHandle>>;

    /// Leaf items directly inside `folder` (not recursive)
    fn folder_items(&self, folder: &FolderHandle) -> AppResult<Vec<Item>>;

    /// Resolve a single item by its archive-local id, used for by-reference
    /// attachments and embedded messages
    fn get_item(&self, i_id: u64) -> AppResult<Item>;

    /// Open an independent handle onto the same archive for use by another worker
    fn reopen(&self) -> AppResult<Box<dyn PstArchive>>;

    /// The collaborator that decompresses LZFU RTF bodies for this archive.
    ///
    /// The same reader crate that implements `PstArchive` typically implements
    /// this too, since both need the archive's compressed-data conventions.
    /// Defaults to a no-op so archives that never carry RTF bodies (and test
    /// fixtures) need not implement it.
    fn rtf_decompressor(&self) -> &dyn RtfDecompressor {
        &NoopRtfDecompressor
    }
}

/// Decompresses the proprietary LZFU-compressed RTF body format
pub trait RtfDecompressor: Send + Sync {
    /// Returns the decompressed RTF bytes, or `None` if `data` is not
    /// recognizable LZFU (the caller falls back to not attaching an RTF body)
    fn decompress(&self, data: &[u8]) -> Option<Vec<u8>>;
}

struct NoopRtfDecompressor;

impl RtfDecompressor for NoopRtfDecompressor {
    fn decompress(&self, _data: &[u8]) -> Option<Vec<u8>> {
        None
    }
}

//! Folder tree walker
//!
//! Descends the archive's folder tree depth-first, dispatching each
//! non-empty child folder to the [`crate::concurrency::Supervisor`] and
//! rendering every leaf item it finds into the layout-appropriate output
//! file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Semaphore};

use crate::archive::{FolderHandle, PstArchive};
use crate::concurrency::{Decision, Supervisor};
use crate::config::{Config, ContactMode};
use crate::errors::AppResult;
use crate::ical;
use crate::layout::FileLedger;
use crate::mail::{self, Framing, RenderOptions};
use crate::model::{Item, ItemKind, ReducedKind};
use crate::msg::MsgWriter;
use crate::vcard;

const DELETED_ITEMS_FOLDER: &str = "Deleted Items";

/// Walk the whole archive starting at its top-of-folders node.
///
/// Runs on the blocking thread pool since folder processing is synchronous
/// archive/file I/O; the returned future resolves once every dispatched
/// subtree (recursively) has finished. The worker-slot semaphore and the
/// progress-stream mutex are each constructed exactly once here and cloned
/// into every `walk_folder` call, so the configured concurrency cap and the
/// serialized progress output apply across the whole tree rather than per folder.
pub async fn run(archive: Arc<dyn PstArchive>, config: Arc<Config>, now: DateTime<Utc>) -> AppResult<()> {
    let output_dir = config.output_dir.clone();
    let semaphore = Arc::new(Semaphore::new(config.effective_max_children().max(1)));
    let progress = Arc::new(Mutex::new(()));
    tokio::task::spawn_blocking(move || {
        let top = archive.top_of_folders()?;
        walk_folder(archive, config, &output_dir, &top, now, semaphore, progress)
    })
    .await
    .map_err(|e| crate::errors::AppError::WorkerFailed(e.to_string()))?
}

/// Process one folder synchronously: its leaf items, then its non-empty
/// child folders (each either dispatched to the blocking pool or processed
/// inline if the pool is saturated). Blocks on its own child supervisor
/// before returning so a caller awaiting this call's `JoinHandle` sees a
/// fully-drained subtree.
#[allow(clippy::too_many_arguments)]
fn walk_folder(
    archive: Arc<dyn PstArchive>,
    config: Arc<Config>,
    parent_dir: &Path,
    folder: &FolderHandle,
    now: DateTime<Utc>,
    semaphore: Arc<Semaphore>,
    progress: Arc<Mutex<()>>,
) -> AppResult<()> {
    let mut ledger = FileLedger::enter(parent_dir, folder, &config)?;

    for item in archive.folder_items(folder)? {
        process_item(&archive, &config, &mut ledger, &item, now)?;
    }

    let mut supervisor = Supervisor::new(semaphore.clone());
    let children = archive.child_folders(folder)?;
    for child in children {
        if !config.include_deleted && child.name == DELETED_ITEMS_FOLDER {
            continue;
        }
        let has_content = !archive.folder_items(&child)?.is_empty() || !archive.child_folders(&child)?.is_empty();
        if !has_content {
            continue;
        }

        let child_dir = ledger.child_parent_dir().to_path_buf();
        let label = child.name.clone();

        let archive_for_task = archive.reopen()?;
        let config_for_task = config.clone();
        let child_for_task = child.clone();
        let semaphore_for_task = semaphore.clone();
        let progress_for_task = progress.clone();
        let child_dir_for_task = child_dir.clone();
        let decision = supervisor.try_dispatch(&label, move || {
            let archive_arc: Arc<dyn PstArchive> = archive_for_task.into();
            walk_folder(archive_arc, config_for_task, &child_dir_for_task, &child_for_task, now, semaphore_for_task, progress_for_task)
        });

        if decision == Decision::InlineSelf {
            walk_folder(archive.clone(), config.clone(), &child_dir, &child, now, semaphore.clone(), progress.clone())?;
        }
    }

    tokio::runtime::Handle::current().block_on(supervisor.join_all())?;
    report_progress(&config, &folder.name, &ledger, &progress);
    ledger.close()
}

/// Print the per-folder "items done, items skipped" summary to stdout, the
/// same line `readpst.c`'s `close_enter_dir` prints under its debug lock.
/// Held across the write so concurrently-finishing subtrees never interleave
/// their lines.
fn report_progress(config: &Config, folder_name: &str, ledger: &FileLedger, progress: &Arc<Mutex<()>>) {
    if config.quiet {
        return;
    }
    let _guard = tokio::runtime::Handle::current().block_on(progress.lock());
    println!("\t\"{folder_name}\" - {} items done, {} items skipped.", ledger.processed_count(), ledger.skip_count);
}

fn process_item(
    archive: &Arc<dyn PstArchive>,
    config: &Config,
    ledger: &mut FileLedger,
    item: &Item,
    now: DateTime<Utc>,
) -> AppResult<()> {
    match item.kind {
        ItemKind::Contact => {
            if !config.output_type.contact {
                ledger.skip_count += 1;
                return Ok(());
            }
            let contact = item.contact.clone_or_skip(ledger);
            let Some(contact) = contact else { return Ok(()) };
            let text = match config.contact_mode {
                ContactMode::VCard => vcard::render_vcard(item, &contact),
                ContactMode::List => format!(
                    "{} <{}>\n",
                    contact.fullname.as_deref().unwrap_or_default(),
                    contact.address1.as_deref().unwrap_or_default(),
                ),
            };
            emit(ledger, config, ReducedKind::Contact, &text, "vcf")?;
            Ok(())
        }
        ItemKind::Note | ItemKind::Schedule | ItemKind::Report => {
            if !config.output_type.email {
                ledger.skip_count += 1;
                return Ok(());
            }
            let is_separate = config.layout == crate::config::LayoutMode::Separate;
            let opts = RenderOptions {
                framing: if is_separate && config.separate.mh { Framing::Headers } else { Framing::Mbox },
                save_rtf_body: config.save_rtf_body,
                prefer_utf8: config.prefer_utf8,
                default_charset: config.default_charset.as_deref().unwrap_or("us-ascii"),
                embedding: false,
                acceptable_extensions: config.acceptable_extensions.as_ref(),
                one_message_per_file: is_separate,
            };
            let archive_for_embed = archive.clone();
            let resolve_embedded = move |i_id: u64| archive_for_embed.get_item(i_id).ok();
            let (text, _extra_headers, pending_attachments) =
                mail::render_mail(item, &opts, None, Some(&resolve_embedded), archive.rtf_decompressor());
            let written = emit(ledger, config, ReducedKind::Note, &text, "eml")?;
            if is_separate && config.separate.msg {
                if let Some((eml_path, _)) = &written {
                    let msg_path = eml_path.with_extension("msg");
                    crate::msg::PlaceholderMsgWriter.write_msg_email(&msg_path, item, archive.as_ref())?;
                }
            }
            if let Some((_, item_number)) = written {
                for (name, data) in pending_attachments {
                    let path = ledger.separate_attachment_path(item_number, &name)?;
                    std::fs::write(&path, &data)?;
                }
            }
            Ok(())
        }
        ItemKind::Journal => {
            if !config.output_type.journal {
                ledger.skip_count += 1;
                return Ok(());
            }
            let Some(journal) = &item.journal else { return Ok(()) };
            let text = ical::render_vjournal(item, journal, now);
            emit(ledger, config, ReducedKind::Journal, &format!("{text}\n"), "ics")?;
            Ok(())
        }
        ItemKind::Appointment => {
            if !config.output_type.appointment {
                ledger.skip_count += 1;
                return Ok(());
            }
            let Some(appt) = &item.appointment else { return Ok(()) };
            let text = ical::render_vevent(item, appt, now);
            emit(ledger, config, ReducedKind::Appointment, &format!("{text}\n"), "ics")?;
            Ok(())
        }
        ItemKind::Folder | ItemKind::MessageStore | ItemKind::Sticky | ItemKind::Task | ItemKind::Other => {
            ledger.skip_count += 1;
            Ok(())
        }
    }
}

/// Writes the rendered item, returning the file it landed in and its numeric
/// index when the layout gave it its own file (Separate mode); `None` for
/// the bucketed modes.
fn emit(ledger: &mut FileLedger, config: &Config, kind: ReducedKind, text: &str, extension: &str) -> AppResult<Option<(PathBuf, u32)>> {
    match config.layout {
        crate::config::LayoutMode::Separate => {
            let ext = if config.separate.extensions { Some(format!(".{extension}")) } else { None };
            Ok(Some(ledger.write_separate_item(kind, text, ext.as_deref())?))
        }
        _ => {
            ledger.write_bucket(kind, text)?;
            Ok(None)
        }
    }
}

/// Small helper trait so `process_item` can skip cleanly when a contact item
/// is missing its contact payload, bumping the skip counter once.
trait CloneOrSkip<T> {
    fn clone_or_skip(&self, ledger: &mut FileLedger) -> Option<T>;
}

impl CloneOrSkip<crate::model::ContactFields> for Option<crate::model::ContactFields> {
    fn clone_or_skip(&self, ledger: &mut FileLedger) -> Option<crate::model::ContactFields> {
        match self {
            Some(c) => Some(c.clone()),
            None => {
                ledger.skip_count += 1;
                None
            }
        }
    }
}

/// Compute the output directory path at which the archive's own tree root is
/// rooted, honoring `-o`.
pub fn root_output_dir(config: &Config) -> PathBuf {
    config.output_dir.clone()
}

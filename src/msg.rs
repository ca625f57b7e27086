//! `.msg` binary container placeholder
//!
//! The real `.msg` format is an OLE/CFBF compound file (MS-OXMSG) and its
//! byte layout is out of scope for this crate; this module exists only to
//! satisfy the parser collaborator contract's `MsgWriter` boundary so `-m`
//! has something to call, writing a clearly-labeled stand-in rather than a
//! byte-accurate container.

use std::io::Write as _;
use std::path::Path;

use crate::archive::PstArchive;
use crate::errors::AppResult;
use crate::model::Item;

/// Writes one item as a `.msg` binary container.
///
/// Grounded on `readpst.c`'s `write_msg_email`, invoked once per note item
/// immediately after its separate `.eml` is written when `-m` is given.
pub trait MsgWriter: Send + Sync {
    fn write_msg_email(&self, path: &Path, item: &Item, archive: &dyn PstArchive) -> AppResult<()>;
}

/// Stand-in `MsgWriter` that writes a flat, clearly-labeled text container
/// instead of a genuine compound-file binary. A real deployment wanting
/// actual Outlook-openable `.msg` files would supply its own `MsgWriter`.
pub struct PlaceholderMsgWriter;

impl MsgWriter for PlaceholderMsgWriter {
    fn write_msg_email(&self, path: &Path, item: &Item, _archive: &dyn PstArchive) -> AppResult<()> {
        let mut file = std::fs::File::create(path)?;
        writeln!(file, "X-Msg-Container-Placeholder: true")?;
        writeln!(file, "X-Msg-Container-Note: not a genuine MS-OXMSG compound file")?;
        if let Some(subject) = &item.subject {
            writeln!(file, "Subject: {}", subject.text)?;
        }
        if let Some(email) = &item.email {
            if let Some(sender) = &email.sender_address {
                writeln!(file, "From: {sender}")?;
            }
            if let Some(to) = &email.sentto_address {
                writeln!(file, "To: {to}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ItemKind, PstString};

    struct NoopArchive;
    impl PstArchive for NoopArchive {
        fn top_of_folders(&self) -> AppResult<crate::archive::FolderHandle> {
            unreachable!()
        }
        fn child_folders(&self, _folder: &crate::archive::FolderHandle) -> AppResult<Vec<crate::archive::FolderHandle>> {
            unreachable!()
        }
        fn folder_items(&self, _folder: &crate::archive::FolderHandle) -> AppResult<Vec<Item>> {
            unreachable!()
        }
        fn get_item(&self, _i_id: u64) -> AppResult<Item> {
            unreachable!()
        }
        fn reopen(&self) -> AppResult<Box<dyn PstArchive>> {
            unreachable!()
        }
    }

    #[test]
    fn placeholder_writer_labels_its_output_and_carries_subject() {
        let dir = std::env::temp_dir().join(format!("pst-extract-test-msg-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("1.msg");

        let mut item = Item {
            kind: ItemKind::Note,
            file_as: None,
            subject: Some(PstString::utf8("Hello")),
            body: None,
            comment: None,
            create_date: None,
            modify_date: None,
            block_id: 1,
            extra_fields: vec![],
            email: None,
            contact: None,
            appointment: None,
            journal: None,
            attachments: vec![],
            folder_item_count: None,
        };
        item.email = Some(crate::model::EmailFields { sender_address: Some("a@x.com".into()), ..Default::default() });

        PlaceholderMsgWriter.write_msg_email(&path, &item, &NoopArchive).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("X-Msg-Container-Placeholder: true"));
        assert!(contents.contains("Subject: Hello"));
        assert!(contents.contains("From: a@x.com"));
    }
}

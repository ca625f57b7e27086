//! Archive data model
//!
//! These types describe what the core consumes from a parsed PST archive.
//! The archive/parser itself is an external collaborator (see [`crate::archive`]);
//! this module only defines the shapes that cross that boundary.

/// A PST-native timestamp: 100-nanosecond ticks since 1601-01-01 (Windows `FILETIME`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FileTime(pub u64);

/// A string paired with the flag that says whether it is already UTF-8
///
/// Mirrors the PST library's `pst_string`: text fields in a PST can arrive
/// either as narrow (non-UTF-8) or wide (UTF-16, converted to UTF-8 by the
/// parser) strings, and body rendering needs to know which.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PstString {
    pub text: String,
    pub is_utf8: bool,
}

impl PstString {
    pub fn utf8(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_utf8: true }
    }

    pub fn narrow(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_utf8: false }
    }
}

/// The tagged union of item kinds a descriptor can resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Folder,
    MessageStore,
    Note,
    Schedule,
    Report,
    Contact,
    Appointment,
    Journal,
    Sticky,
    Task,
    Other,
}

/// The canonical mapping that collapses similar item kinds into one of four
/// output buckets, per §4.E / the glossary's "reduced item type"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReducedKind {
    Appointment,
    Contact,
    Journal,
    Note,
}

impl ItemKind {
    /// A stable integer per variant, used for the Thunderbird `-u` bookkeeping
    /// `.type` file. The real format's numeric type codes live in libpst's
    /// public header, which isn't part of this crate's grounding material; the
    /// declaration order here stands in for it, since Thunderbird only needs a
    /// consistent marker distinguishing one folder's descriptor item from
    /// another within a single extraction run.
    pub fn raw_type_code(self) -> i32 {
        self as i32
    }

    pub fn reduced(self) -> ReducedKind {
        match self {
            Self::Appointment => ReducedKind::Appointment,
            Self::Contact => ReducedKind::Contact,
            Self::Journal => ReducedKind::Journal,
            Self::Sticky | Self::Task | Self::Note | Self::Other | Self::Report => {
                ReducedKind::Note
            }
            Self::Folder | Self::MessageStore | Self::Schedule => ReducedKind::Note,
        }
    }

    /// Human-readable name used for output file extensions/kinds, e.g. "mbox"
    pub fn output_kind_name(self) -> &'static str {
        match self.reduced() {
            ReducedKind::Appointment => "calendar",
            ReducedKind::Contact => "contacts",
            ReducedKind::Journal => "journal",
            ReducedKind::Note => "mbox",
        }
    }
}

/// Free/busy state of an appointment, used to derive `STATUS`/`TRANSP`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeBusy {
    Tentative,
    Free,
    Busy,
    OutOfOffice,
}

/// Recurrence frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurrenceFreq {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurrenceFreq {
    pub fn ical_name(self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }
}

/// A decoded recurrence pattern, the output of the `convert_recurrence` collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecurrenceRecord {
    pub freq: Option<RecurrenceFreq>,
    pub count: u32,
    pub interval: u32,
    pub day_of_month: u32,
    pub month_of_year: u32,
    pub position: u32,
    /// Bit `i` (0=Sunday .. 6=Saturday) set means that weekday recurs
    pub by_day_mask: u8,
}

/// Fixed appointment category label, mirrors `PST_APP_LABEL_*`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppointmentLabel {
    #[default]
    None,
    Important,
    Business,
    Personal,
    Vacation,
    MustAttend,
    TravelRequired,
    NeedsPreparation,
    Birthday,
    Anniversary,
    PhoneCall,
}

impl AppointmentLabel {
    pub fn category_name(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Important => Some("IMPORTANT"),
            Self::Business => Some("BUSINESS"),
            Self::Personal => Some("PERSONAL"),
            Self::Vacation => Some("VACATION"),
            Self::MustAttend => Some("MUST-ATTEND"),
            Self::TravelRequired => Some("TRAVEL-REQUIRED"),
            Self::NeedsPreparation => Some("NEEDS-PREPARATION"),
            Self::Birthday => Some("BIRTHDAY"),
            Self::Anniversary => Some("ANNIVERSARY"),
            Self::PhoneCall => Some("PHONE-CALL"),
        }
    }
}

/// Mail-specific fields, present when [`ItemKind`] is Note/Schedule/Report
#[derive(Debug, Clone, Default)]
pub struct EmailFields {
    pub header: Option<String>,
    pub sender_address: Option<String>,
    pub outlook_sender_name: Option<String>,
    pub sentto_address: Option<String>,
    pub cc_address: Option<String>,
    pub bcc_address: Option<String>,
    pub messageid: Option<String>,
    pub sent_date: Option<FileTime>,
    pub is_read: bool,
    pub htmlbody: Option<PstString>,
    pub rtf_compressed: Option<Vec<u8>>,
    pub encrypted_body: Option<Vec<u8>>,
    pub encrypted_htmlbody: Option<Vec<u8>>,
    pub report_text: Option<PstString>,
}

/// Contact-specific fields, present when [`ItemKind::Contact`]
#[derive(Debug, Clone, Default)]
pub struct ContactFields {
    pub fullname: Option<String>,
    pub surname: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub display_name_prefix: Option<String>,
    pub suffix: Option<String>,
    pub nickname: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub address3: Option<String>,
    pub birthday: Option<FileTime>,

    pub home_po_box: Option<String>,
    pub home_street: Option<String>,
    pub home_city: Option<String>,
    pub home_state: Option<String>,
    pub home_postal_code: Option<String>,
    pub home_country: Option<String>,
    pub home_address: Option<String>,

    pub business_po_box: Option<String>,
    pub business_street: Option<String>,
    pub business_city: Option<String>,
    pub business_state: Option<String>,
    pub business_postal_code: Option<String>,
    pub business_country: Option<String>,
    pub business_address: Option<String>,

    pub other_po_box: Option<String>,
    pub other_street: Option<String>,
    pub other_city: Option<String>,
    pub other_state: Option<String>,
    pub other_postal_code: Option<String>,
    pub other_country: Option<String>,
    pub other_address: Option<String>,

    pub business_fax: Option<String>,
    pub business_phone: Option<String>,
    pub business_phone2: Option<String>,
    pub car_phone: Option<String>,
    pub home_fax: Option<String>,
    pub home_phone: Option<String>,
    pub home_phone2: Option<String>,
    pub isdn_phone: Option<String>,
    pub mobile_phone: Option<String>,
    pub other_phone: Option<String>,
    pub pager_phone: Option<String>,
    pub primary_fax: Option<String>,
    pub primary_phone: Option<String>,
    pub radio_phone: Option<String>,
    pub telex: Option<String>,

    pub job_title: Option<String>,
    pub profession: Option<String>,
    pub assistant_name: Option<String>,
    pub assistant_phone: Option<String>,
    pub company_name: Option<String>,
}

/// Appointment-specific fields, present when [`ItemKind::Appointment`]
#[derive(Debug, Clone, Default)]
pub struct AppointmentFields {
    pub location: Option<String>,
    pub start: Option<FileTime>,
    pub end: Option<FileTime>,
    pub showas: Option<FreeBusy>,
    pub is_recurring: bool,
    pub recurrence: Option<RecurrenceRecord>,
    pub label: AppointmentLabel,
    pub alarm: bool,
    pub alarm_minutes: i32,
}

/// Journal-specific fields, present when [`ItemKind::Journal`]
#[derive(Debug, Clone, Default)]
pub struct JournalFields {
    pub start: Option<FileTime>,
}

/// How an attachment's bytes are made available
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachMethod {
    /// A `message/rfc822` sub-message, fetched by re-parsing the archive at `i_id`
    Embedded,
    /// Bytes already resident in `data`
    ByValue,
    /// Bytes must be fetched from the archive via `i_id`
    ByReference,
}

/// An attachment on a mail item
#[derive(Debug, Clone)]
pub struct Attachment {
    pub method: AttachMethod,
    /// Short (8.3-style) filename
    pub filename1: Option<String>,
    /// Long filename, preferred over `filename1` when present
    pub filename2: Option<String>,
    pub mimetype: Option<String>,
    pub content_id: Option<String>,
    pub data: Option<Vec<u8>>,
    /// Archive-local id used to fetch `data` lazily, or to re-parse an embedded message
    pub i_id: Option<u64>,
}

impl Attachment {
    /// The filename to present to the user: long name if present, else short name
    pub fn display_filename(&self) -> Option<&str> {
        self.filename2.as_deref().or(self.filename1.as_deref())
    }

    /// Lowercased extension (without the dot), if the display filename has one
    pub fn extension(&self) -> Option<String> {
        let name = self.display_filename()?;
        let dot = name.rfind('.')?;
        if dot == name.len() - 1 {
            return None;
        }
        Some(name[dot + 1..].to_ascii_lowercase())
    }
}

/// A parsed archive item: a folder or one of the leaf kinds
#[derive(Debug, Clone)]
pub struct Item {
    pub kind: ItemKind,
    pub file_as: Option<PstString>,
    pub subject: Option<PstString>,
    pub body: Option<PstString>,
    pub comment: Option<PstString>,
    pub create_date: Option<FileTime>,
    pub modify_date: Option<FileTime>,
    /// Stable per-item identifier; MIME boundaries and iCal UIDs are a function of this alone
    pub block_id: u64,
    /// Extra named fields (e.g. "Keywords" for vCard/iCal CATEGORIES)
    pub extra_fields: Vec<(String, String)>,
    pub email: Option<EmailFields>,
    pub contact: Option<ContactFields>,
    pub appointment: Option<AppointmentFields>,
    pub journal: Option<JournalFields>,
    pub attachments: Vec<Attachment>,
    /// For folder items: number of leaf items directly inside (used as `stored_count`)
    pub folder_item_count: Option<i32>,
}

impl Item {
    /// All values of the `extra_fields` entry named `Keywords`, in order
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.extra_fields
            .iter()
            .filter(|(name, _)| name == "Keywords")
            .map(|(_, value)| value.as_str())
    }
}

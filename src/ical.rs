//! RFC 5545 iCalendar rendering for appointment (VEVENT) and journal (VJOURNAL) items

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::charset;
use crate::model::{AppointmentFields, FreeBusy, Item, JournalFields};
use crate::vcard;

/// Render a journal item to a single `BEGIN:VJOURNAL`..`END:VJOURNAL` block
pub fn render_vjournal(item: &Item, journal: &JournalFields, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    out.push_str("BEGIN:VJOURNAL\n");
    write_dtstamp(&mut out, item, now);
    if let Some(subject) = &item.subject {
        let _ = write!(out, "SUMMARY:{}\n", charset::rfc2426_escape(&subject.text));
    }
    if let Some(body) = &item.body {
        let _ = write!(out, "DESCRIPTION:{}\n", charset::rfc2426_escape(&body.text));
    }
    if let Some(start) = journal.start.and_then(charset::filetime_to_datetime) {
        let _ = write!(out, "DTSTART;VALUE=DATE-TIME:{}\n", charset::rfc2445_datetime(start));
    }
    out.push_str("END:VJOURNAL\n");
    out
}

/// Render an appointment item's `BEGIN:VEVENT`..`END:VEVENT` body (without the UID/ORGANIZER
/// lines that only apply in the standalone calendar file; see [`write_vevent_body`] for the
/// shared interior used both there and in a schedule-request VCALENDAR part)
pub fn render_vevent(item: &Item, appt: &AppointmentFields, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = write!(out, "UID:{:#x}\n", item.block_id);
    write_dtstamp(&mut out, item, now);
    write_vevent_body(&mut out, item, appt);
    out
}

/// Fields shared by a standalone appointment file and an embedded schedule request:
/// everything after DTSTAMP, through END:VEVENT.
pub(crate) fn write_vevent_body(out: &mut String, item: &Item, appt: &AppointmentFields) {
    if let Some(subject) = &item.subject {
        let _ = write!(out, "SUMMARY:{}\n", charset::rfc2426_escape(&subject.text));
    }
    if let Some(body) = &item.body {
        let _ = write!(out, "DESCRIPTION:{}\n", charset::rfc2426_escape(&body.text));
    }
    if let Some(start) = appt.start.and_then(charset::filetime_to_datetime) {
        let _ = write!(out, "DTSTART;VALUE=DATE-TIME:{}\n", charset::rfc2445_datetime(start));
    }
    if let Some(end) = appt.end.and_then(charset::filetime_to_datetime) {
        let _ = write!(out, "DTEND;VALUE=DATE-TIME:{}\n", charset::rfc2445_datetime(end));
    }
    if let Some(location) = &appt.location {
        let _ = write!(out, "LOCATION:{}\n", charset::rfc2426_escape(location));
    }

    match appt.showas {
        Some(FreeBusy::Tentative) => out.push_str("STATUS:TENTATIVE\n"),
        Some(FreeBusy::Free) => {
            out.push_str("TRANSP:TRANSPARENT\n");
            out.push_str("STATUS:CONFIRMED\n");
        }
        Some(FreeBusy::Busy) | Some(FreeBusy::OutOfOffice) => out.push_str("STATUS:CONFIRMED\n"),
        None => {}
    }

    if appt.is_recurring {
        if let Some(rrule) = appt.recurrence {
            write_rrule(out, &rrule);
        }
    }

    if let Some(category) = appt.label.category_name() {
        let _ = write!(out, "CATEGORIES:{category}\n");
    } else if !vcard::write_categories(out, item) {
        out.push_str("CATEGORIES:NONE\n");
    }

    if appt.alarm && (0..1440).contains(&appt.alarm_minutes) {
        out.push_str("BEGIN:VALARM\n");
        let _ = write!(out, "TRIGGER:-PT{}M\n", appt.alarm_minutes);
        out.push_str("ACTION:DISPLAY\n");
        out.push_str("DESCRIPTION:Reminder\n");
        out.push_str("END:VALARM\n");
    }

    out.push_str("END:VEVENT\n");
}

fn write_rrule(out: &mut String, rdata: &crate::model::RecurrenceRecord) {
    const DAYS: [&str; 7] = ["SU", "MO", "TU", "WE", "TH", "FR", "SA"];
    let Some(freq) = rdata.freq else { return };
    let _ = write!(out, "RRULE:FREQ={}", freq.ical_name());
    if rdata.count != 0 {
        let _ = write!(out, ";COUNT={}", rdata.count);
    }
    if rdata.interval != 1 && rdata.interval != 0 {
        let _ = write!(out, ";INTERVAL={}", rdata.interval);
    }
    if rdata.day_of_month != 0 {
        let _ = write!(out, ";BYMONTHDAY={}", rdata.day_of_month);
    }
    if rdata.month_of_year != 0 {
        let _ = write!(out, ";BYMONTH={}", rdata.month_of_year);
    }
    if rdata.position != 0 {
        let _ = write!(out, ";BYSETPOS={}", rdata.position);
    }
    if rdata.by_day_mask != 0 {
        let days: Vec<&str> = (0..7).filter(|i| rdata.by_day_mask & (1 << i) != 0).map(|i| DAYS[i]).collect();
        let _ = write!(out, ";BYDAY={}", days.join(","));
    }
    out.push('\n');
}

fn write_dtstamp(out: &mut String, item: &Item, now: DateTime<Utc>) {
    let stamp = item.create_date.and_then(charset::filetime_to_datetime).unwrap_or(now);
    let _ = write!(out, "DTSTAMP:{}\n", charset::rfc2445_datetime(stamp));
    if let Some(created) = item.create_date.and_then(charset::filetime_to_datetime) {
        let _ = write!(out, "CREATED:{}\n", charset::rfc2445_datetime(created));
    }
    if let Some(modified) = item.modify_date.and_then(charset::filetime_to_datetime) {
        let _ = write!(out, "LAST-MOD:{}\n", charset::rfc2445_datetime(modified));
    }
}

//! RFC 2426 vCard rendering for contact items

use std::fmt::Write as _;

use crate::charset;
use crate::model::{ContactFields, Item};

/// Render a contact item to a single `BEGIN:VCARD`..`END:VCARD` block
pub fn render_vcard(item: &Item, contact: &ContactFields) -> String {
    let mut out = String::new();
    let esc = |s: &str| charset::rfc2426_escape(s);
    let opt = |s: &Option<String>| s.as_deref().map(esc).unwrap_or_default();

    out.push_str("BEGIN:VCARD\n");
    let _ = write!(out, "FN:{}\n", opt(&contact.fullname));

    let _ = write!(
        out,
        "N:{};{};{};{};{}\n",
        opt(&contact.surname),
        opt(&contact.first_name),
        opt(&contact.middle_name),
        opt(&contact.display_name_prefix),
        opt(&contact.suffix),
    );

    if let Some(nickname) = &contact.nickname {
        let _ = write!(out, "NICKNAME:{}\n", esc(nickname));
    }
    for addr in [&contact.address1, &contact.address2, &contact.address3] {
        if let Some(addr) = addr {
            let _ = write!(out, "EMAIL:{}\n", esc(addr));
        }
    }
    if let Some(birthday) = contact.birthday.and_then(charset::filetime_to_datetime) {
        let _ = write!(out, "BDAY:{}\n", charset::rfc2425_datetime(birthday));
    }

    write_postal_address(&mut out, "home", &contact.home_address, [
        &contact.home_po_box,
        &contact.home_street,
        &contact.home_city,
        &contact.home_state,
        &contact.home_postal_code,
        &contact.home_country,
    ]);
    write_postal_address(&mut out, "work", &contact.business_address, [
        &contact.business_po_box,
        &contact.business_street,
        &contact.business_city,
        &contact.business_state,
        &contact.business_postal_code,
        &contact.business_country,
    ]);
    write_postal_address(&mut out, "postal", &contact.other_address, [
        &contact.other_po_box,
        &contact.other_street,
        &contact.other_city,
        &contact.other_state,
        &contact.other_postal_code,
        &contact.other_country,
    ]);

    for (field, label) in [
        (&contact.business_fax, "work,fax"),
        (&contact.business_phone, "work,voice"),
        (&contact.business_phone2, "work,voice"),
        (&contact.car_phone, "car,voice"),
        (&contact.home_fax, "home,fax"),
        (&contact.home_phone, "home,voice"),
        (&contact.home_phone2, "home,voice"),
        (&contact.isdn_phone, "isdn"),
        (&contact.mobile_phone, "cell,voice"),
        (&contact.other_phone, "msg"),
        (&contact.pager_phone, "pager"),
        (&contact.primary_fax, "fax,pref"),
        (&contact.primary_phone, "phone,pref"),
        (&contact.radio_phone, "pcs"),
        (&contact.telex, "bbs"),
    ] {
        if let Some(number) = field {
            let _ = write!(out, "TEL;TYPE={label}:{}\n", esc(number));
        }
    }

    if let Some(title) = &contact.job_title {
        let _ = write!(out, "TITLE:{}\n", esc(title));
    }
    if let Some(profession) = &contact.profession {
        let _ = write!(out, "ROLE:{}\n", esc(profession));
    }
    if contact.assistant_name.is_some() || contact.assistant_phone.is_some() {
        out.push_str("AGENT:BEGIN:VCARD\n");
        if let Some(name) = &contact.assistant_name {
            let _ = write!(out, "FN:{}\n", esc(name));
        }
        if let Some(phone) = &contact.assistant_phone {
            let _ = write!(out, "TEL:{}\n", esc(phone));
        }
    }
    if let Some(company) = &contact.company_name {
        let _ = write!(out, "ORG:{}\n", esc(company));
    }
    if let Some(comment) = &item.comment {
        let _ = write!(out, "NOTE:{}\n", esc(&comment.text));
    }
    if let Some(body) = &item.body {
        let _ = write!(out, "NOTE:{}\n", esc(&body.text));
    }

    write_categories(&mut out, item);

    out.push_str("VERSION:3.0\n");
    out.push_str("END:VCARD\n\n");
    out
}

fn write_postal_address(out: &mut String, kind: &str, full_address: &Option<String>, fields: [&Option<String>; 6]) {
    let Some(full_address) = full_address else { return };
    let [po_box, street, city, state, postal_code, country] = fields;
    let esc = |s: &Option<String>| s.as_deref().map(charset::rfc2426_escape).unwrap_or_default();
    let _ = write!(
        out,
        "ADR;TYPE={kind}:{};;{};{};{};{};{}\n",
        esc(po_box),
        esc(street),
        esc(city),
        esc(state),
        esc(postal_code),
        esc(country),
    );
    let _ = write!(out, "LABEL;TYPE={kind}:{}\n", charset::rfc2426_escape(full_address));
}

/// Write the `CATEGORIES:` line for every `Keywords` extra field, comma-joined.
/// Returns true if anything was written.
pub fn write_categories(out: &mut String, item: &Item) -> bool {
    let values: Vec<&str> = item.keywords().collect();
    if values.is_empty() {
        return false;
    }
    let escaped: Vec<String> = values.iter().map(|v| charset::rfc2426_escape(v)).collect();
    let _ = write!(out, "CATEGORIES:{}\n", escaped.join(", "));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ItemKind, PstString};

    fn sample_item() -> Item {
        Item {
            kind: ItemKind::Contact,
            file_as: None,
            subject: None,
            body: None,
            comment: None,
            create_date: None,
            modify_date: None,
            block_id: 1,
            extra_fields: vec![("Keywords".into(), "friend".into()), ("Keywords".into(), "colleague".into())],
            email: None,
            contact: None,
            appointment: None,
            journal: None,
            attachments: vec![],
            folder_item_count: None,
        }
    }

    #[test]
    fn render_vcard_includes_fn_and_name() {
        let item = sample_item();
        let contact = ContactFields {
            fullname: Some("Jane Doe".into()),
            surname: Some("Doe".into()),
            first_name: Some("Jane".into()),
            ..Default::default()
        };
        let rendered = render_vcard(&item, &contact);
        assert!(rendered.starts_with("BEGIN:VCARD\n"));
        assert!(rendered.contains("FN:Jane Doe\n"));
        assert!(rendered.contains("N:Doe;Jane;;;\n"));
        assert!(rendered.ends_with("END:VCARD\n\n"));
    }

    #[test]
    fn render_vcard_joins_multiple_categories() {
        let item = sample_item();
        let contact = ContactFields::default();
        let rendered = render_vcard(&item, &contact);
        assert!(rendered.contains("CATEGORIES:friend, colleague\n"));
    }

    #[test]
    fn render_vcard_writes_home_address_and_label() {
        let item = sample_item();
        let contact = ContactFields {
            home_address: Some("123 Main St, Anytown".into()),
            home_city: Some("Anytown".into()),
            ..Default::default()
        };
        let rendered = render_vcard(&item, &contact);
        assert!(rendered.contains("ADR;TYPE=home:;;;Anytown;;;\n"));
        assert!(rendered.contains("LABEL;TYPE=home:123 Main St\\, Anytown\n"));
    }
}

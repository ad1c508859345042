//! Request-side XML: search documents, contact documents, fetch payloads.
//!
//! Element order follows the input order everywhere; the remote API matches
//! on document shape, so reordering is not harmless here.

use std::io::{self, Write};

use quick_xml::Writer;
use quick_xml::events::BytesText;

use crate::error::Error;
use crate::types::{Contact, Criterion};

/// Encode search criteria as a `<search>` document with one `<equation>`
/// element per criterion, in input order.
pub fn search_xml(criteria: &[Criterion]) -> Result<String, Error> {
    build(|writer| {
        writer.create_element("search").write_inner_content(|w| {
            for criterion in criteria {
                w.create_element("equation").write_inner_content(|w2| {
                    write_text_element(w2, "field", &criterion.field)?;
                    write_text_element(w2, "op", &criterion.op)?;
                    write_text_element(w2, "value", &criterion.value)?;
                    Ok(())
                })?;
            }
            Ok(())
        })?;
        Ok(())
    })
}

/// Encode a contact as a `<contact>` document.
///
/// The `id` attribute appears only when the contact carries one; an absent
/// id must not become an empty attribute. Groups emit `<Group_Tag name="…">`
/// in insertion order, fields `<field name="…">value</field>` likewise, and
/// an empty group still emits its (empty) `Group_Tag` element.
pub fn contact_xml(contact: &Contact) -> Result<String, Error> {
    build(|writer| {
        let element = writer.create_element("contact");
        let element = match contact.id() {
            Some(id) => element.with_attribute(("id", id)),
            None => element,
        };
        element.write_inner_content(|w| {
            for (group, fields) in contact.groups() {
                w.create_element("Group_Tag")
                    .with_attribute(("name", group))
                    .write_inner_content(|w2| {
                        for (field, value) in fields {
                            w2.create_element("field")
                                .with_attribute(("name", field.as_str()))
                                .write_text_content(BytesText::new(value))?;
                        }
                        Ok(())
                    })?;
            }
            Ok(())
        })?;
        Ok(())
    })
}

/// Encode a fetch payload: one `<contact_id>` fragment per id, in input
/// order. This is a bare element sequence, not a rooted document.
pub fn contact_id_xml(ids: &[u32]) -> String {
    let mut payload = String::new();
    for id in ids {
        payload.push_str("<contact_id>");
        payload.push_str(&id.to_string());
        payload.push_str("</contact_id>");
    }
    payload
}

/// Write `<tag>text</tag>` with escaped text content.
fn write_text_element<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> io::Result<()> {
    writer
        .create_element(tag)
        .write_text_content(BytesText::new(text))?;
    Ok(())
}

/// Run a writer closure against an in-memory buffer and return the document.
fn build<F>(content: F) -> Result<String, Error>
where
    F: FnOnce(&mut Writer<&mut Vec<u8>>) -> io::Result<()>,
{
    let mut buf = Vec::with_capacity(256);
    let mut writer = Writer::new(&mut buf);
    content(&mut writer).map_err(|e| Error::Serialize(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| Error::Serialize(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_xml_with_one_criterion() {
        let criteria = [Criterion::new("E-Mail", "e", "john@example.com")];
        let xml = search_xml(&criteria).unwrap();
        assert_eq!(
            xml,
            "<search><equation>\
             <field>E-Mail</field><op>e</op><value>john@example.com</value>\
             </equation></search>"
        );
    }

    #[test]
    fn search_xml_preserves_criteria_order() {
        let criteria = [
            Criterion::new("E-Mail", "e", "foo@example.com"),
            Criterion::new("Contact Tags", "n", "bar"),
        ];
        let xml = search_xml(&criteria).unwrap();
        let first = xml.find("<field>E-Mail</field>").unwrap();
        let second = xml.find("<field>Contact Tags</field>").unwrap();
        assert!(first < second);
        assert!(xml.contains("<equation><field>Contact Tags</field><op>n</op><value>bar</value></equation>"));
    }

    #[test]
    fn search_xml_escapes_values() {
        let criteria = [Criterion::new("E-Mail", "e", "a&b<c>")];
        let xml = search_xml(&criteria).unwrap();
        assert!(xml.contains("<value>a&amp;b&lt;c&gt;</value>"));
    }

    #[test]
    fn contact_xml_without_id_has_no_id_attribute() {
        let mut contact = Contact::new();
        contact.set("Contact Information", "First Name", "Bob");
        contact.set("Contact Information", "Last Name", "Foo");
        contact.set("Contact Information", "E-Mail", "b@example.com");
        contact.set("Lead Information", "Contact Owner", "Mr Bar");

        let xml = contact_xml(&contact).unwrap();
        assert!(xml.starts_with("<contact>"));
        assert!(!xml.contains("id="));
        assert!(xml.contains("<Group_Tag name=\"Contact Information\">"));
        assert!(xml.contains("<field name=\"First Name\">Bob</field>"));
        assert!(xml.contains("<field name=\"Last Name\">Foo</field>"));
        assert!(xml.contains("<Group_Tag name=\"Lead Information\">"));
        assert!(xml.contains("<field name=\"Contact Owner\">Mr Bar</field>"));
    }

    #[test]
    fn contact_xml_with_id_carries_it_verbatim() {
        let mut contact = Contact::with_id("1234");
        contact.set("Contact Information", "First Name", "Bob");

        let xml = contact_xml(&contact).unwrap();
        assert!(xml.starts_with("<contact id=\"1234\">"));
        assert!(xml.contains("<field name=\"First Name\">Bob</field>"));
    }

    #[test]
    fn contact_xml_emits_empty_group_tag() {
        let mut contact = Contact::new();
        contact.add_group("Lead Information");
        let xml = contact_xml(&contact).unwrap();
        assert!(xml.contains("<Group_Tag name=\"Lead Information\"></Group_Tag>"));
    }

    #[test]
    fn contact_id_xml_concatenates_in_input_order() {
        assert_eq!(
            contact_id_xml(&[8, 5, 7]),
            "<contact_id>8</contact_id><contact_id>5</contact_id><contact_id>7</contact_id>"
        );
        assert_eq!(contact_id_xml(&[]), "");
    }
}

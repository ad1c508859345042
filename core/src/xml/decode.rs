//! Response-side XML: contact records, id/name listings, schema metadata.
//!
//! # Design
//! Every public function takes the raw response text and fails with
//! [`Error::InvalidXml`] carrying that text when the document cannot be
//! parsed. A well-formed document with no matching elements is not an error;
//! it decodes to an empty collection. Unknown elements are skipped, so the
//! decoders survive additions to the remote format.

use std::str;

use quick_xml::Reader;
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};

use crate::error::Error;
use crate::types::{Contact, FieldSchema, GroupSchema, IdNameMap, Schema};

/// Decode every `<contact>` element in document order.
///
/// The `id` attribute, when present, becomes the contact's id; each
/// `<Group_Tag name="…">` child becomes a group holding its
/// `<field name="…">value</field>` children as trimmed string values.
pub fn parse_contacts(xml: &str) -> Result<Vec<Contact>, Error> {
    scan_contacts(xml).map_err(|Malformed| invalid(xml))
}

/// Decode an id/name listing: every `<item_tag id="…">name</item_tag>`
/// element becomes one map entry. Tag and sequence listings share this shape
/// under different element names.
pub fn parse_id_name_map(xml: &str, item_tag: &str) -> Result<IdNameMap, Error> {
    scan_id_name_map(xml, item_tag).map_err(|Malformed| invalid(xml))
}

/// Decode the field-schema ("key") response.
///
/// Groups and fields are editable only when their `editable` attribute
/// explicitly says so; absence means read-only. `<option>` children keep
/// document order, `<list id="…">name</list>` children build an id/name map.
pub fn parse_schema(xml: &str) -> Result<Schema, Error> {
    scan_schema(xml).map_err(|Malformed| invalid(xml))
}

/// The response gate: the text must parse to EOF as well-formed XML and
/// contain at least one element.
pub fn check_well_formed(xml: &str) -> Result<(), Error> {
    let mut reader = reader_for(xml);
    let mut depth: u32 = 0;
    let mut saw_element = false;
    loop {
        match reader.read_event().map_err(|_| invalid(xml))? {
            Event::Start(_) => {
                saw_element = true;
                depth += 1;
            }
            Event::Empty(_) => saw_element = true,
            Event::End(_) => {
                if depth == 0 {
                    return Err(invalid(xml));
                }
                depth -= 1;
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if saw_element && depth == 0 {
        Ok(())
    } else {
        Err(invalid(xml))
    }
}

// ---------------------------------------------------------------------------
// Scanners
// ---------------------------------------------------------------------------

/// Internal marker for any structural failure. The public functions attach
/// the offending document text, which the helpers never see.
struct Malformed;

impl From<quick_xml::Error> for Malformed {
    fn from(_: quick_xml::Error) -> Self {
        Malformed
    }
}

impl From<AttrError> for Malformed {
    fn from(_: AttrError) -> Self {
        Malformed
    }
}

impl From<str::Utf8Error> for Malformed {
    fn from(_: str::Utf8Error) -> Self {
        Malformed
    }
}

fn invalid(xml: &str) -> Error {
    Error::InvalidXml {
        body: xml.to_string(),
    }
}

fn reader_for(xml: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    reader.config_mut().trim_text(true);
    reader
}

fn scan_contacts(xml: &str) -> Result<Vec<Contact>, Malformed> {
    let mut reader = reader_for(xml);
    let mut contacts = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"contact" => {
                contacts.push(read_contact(&mut reader, &e)?);
            }
            Event::Empty(e) if e.name().as_ref() == b"contact" => {
                let mut contact = Contact::new();
                if let Some(id) = attr(&e, "id")? {
                    contact.set_id(id);
                }
                contacts.push(contact);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(contacts)
}

/// Read one `<contact>` element; the reader sits just past its start tag.
fn read_contact(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<Contact, Malformed> {
    let mut contact = Contact::new();
    if let Some(id) = attr(start, "id")? {
        contact.set_id(id);
    }
    loop {
        match reader.read_event()? {
            Event::Start(e) => match (e.name().as_ref() == b"Group_Tag", attr(&e, "name")?) {
                (true, Some(group)) => {
                    contact.add_group(&group);
                    read_group(reader, &mut contact, &group)?;
                }
                _ => skip_element(reader)?,
            },
            Event::Empty(e) => {
                if e.name().as_ref() == b"Group_Tag" {
                    if let Some(group) = attr(&e, "name")? {
                        contact.add_group(group);
                    }
                }
            }
            Event::End(_) => break,
            Event::Eof => return Err(Malformed),
            _ => {}
        }
    }
    Ok(contact)
}

/// Read the `<field>` children of one `Group_Tag` into the named group.
fn read_group(
    reader: &mut Reader<&[u8]>,
    contact: &mut Contact,
    group: &str,
) -> Result<(), Malformed> {
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if e.name().as_ref() == b"field" {
                    let name = attr(&e, "name")?;
                    let value = read_text_content(reader)?;
                    if let Some(name) = name {
                        contact.set(group, name, value);
                    }
                } else {
                    skip_element(reader)?;
                }
            }
            // A self-closing field is an empty string value.
            Event::Empty(e) => {
                if e.name().as_ref() == b"field" {
                    if let Some(name) = attr(&e, "name")? {
                        contact.set(group, name, "");
                    }
                }
            }
            Event::End(_) => break,
            Event::Eof => return Err(Malformed),
            _ => {}
        }
    }
    Ok(())
}

fn scan_id_name_map(xml: &str, item_tag: &str) -> Result<IdNameMap, Malformed> {
    let mut reader = reader_for(xml);
    let mut map = IdNameMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if e.name().as_ref() == item_tag.as_bytes() {
                    let id = attr(&e, "id")?;
                    let name = read_text_content(&mut reader)?;
                    if let Some(id) = id {
                        map.insert(id, name);
                    }
                }
            }
            Event::Empty(e) => {
                if e.name().as_ref() == item_tag.as_bytes() {
                    if let Some(id) = attr(&e, "id")? {
                        map.insert(id, String::new());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(map)
}

fn scan_schema(xml: &str) -> Result<Schema, Malformed> {
    let mut reader = reader_for(xml);
    let mut schema = Schema::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"Group_Tag" => {
                let name = attr(&e, "name")?;
                let editable = flag(attr(&e, "editable")?);
                let fields = read_schema_fields(&mut reader)?;
                if let Some(name) = name {
                    schema.insert(name, GroupSchema { editable, fields });
                }
            }
            Event::Empty(e) if e.name().as_ref() == b"Group_Tag" => {
                if let Some(name) = attr(&e, "name")? {
                    let editable = flag(attr(&e, "editable")?);
                    schema.insert(
                        name,
                        GroupSchema {
                            editable,
                            fields: Default::default(),
                        },
                    );
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(schema)
}

/// Read the `<field>` children of one schema `Group_Tag`.
fn read_schema_fields(
    reader: &mut Reader<&[u8]>,
) -> Result<std::collections::HashMap<String, FieldSchema>, Malformed> {
    let mut fields = std::collections::HashMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if e.name().as_ref() == b"field" {
                    let name = attr(&e, "name")?;
                    let mut field = field_from_attrs(&e)?;
                    read_field_choices(reader, &mut field)?;
                    if let Some(name) = name {
                        fields.insert(name, field);
                    }
                } else {
                    skip_element(reader)?;
                }
            }
            Event::Empty(e) => {
                if e.name().as_ref() == b"field" {
                    if let Some(name) = attr(&e, "name")? {
                        fields.insert(name, field_from_attrs(&e)?);
                    }
                }
            }
            Event::End(_) => break,
            Event::Eof => return Err(Malformed),
            _ => {}
        }
    }
    Ok(fields)
}

fn field_from_attrs(e: &BytesStart) -> Result<FieldSchema, Malformed> {
    Ok(FieldSchema {
        editable: flag(attr(e, "editable")?),
        field_type: attr(e, "type")?.unwrap_or_default(),
        options: Vec::new(),
        list: IdNameMap::new(),
    })
}

/// Read `<option>` and `<list>` children of one schema `<field>`.
fn read_field_choices(
    reader: &mut Reader<&[u8]>,
    field: &mut FieldSchema,
) -> Result<(), Malformed> {
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"option" => field.options.push(read_text_content(reader)?),
                b"list" => {
                    let id = attr(&e, "id")?;
                    let name = read_text_content(reader)?;
                    if let Some(id) = id {
                        field.list.insert(id, name);
                    }
                }
                _ => skip_element(reader)?,
            },
            Event::End(_) => break,
            Event::Eof => return Err(Malformed),
            _ => {}
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Reader helpers
// ---------------------------------------------------------------------------

/// Read the text content of the current element and consume its end tag.
/// Empty elements yield an empty string.
fn read_text_content(reader: &mut Reader<&[u8]>) -> Result<String, Malformed> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(e) => {
                let decoded = e.decode().map_err(|_| Malformed)?;
                let unescaped =
                    quick_xml::escape::unescape(&decoded).map_err(|_| Malformed)?;
                text.push_str(&unescaped);
            }
            Event::Start(_) => skip_element(reader)?,
            Event::End(_) => return Ok(text),
            Event::Eof => return Err(Malformed),
            _ => {}
        }
    }
}

/// Skip over an element and all of its children.
fn skip_element(reader: &mut Reader<&[u8]>) -> Result<(), Malformed> {
    let mut depth: u32 = 1;
    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => return Err(Malformed),
            _ => {}
        }
    }
}

/// An attribute value, entity-unescaped; `None` when absent.
fn attr(e: &BytesStart, name: &str) -> Result<Option<String>, Malformed> {
    match e.try_get_attribute(name)? {
        Some(a) => {
            let value = a.unescape_value().map_err(|_| Malformed)?;
            Ok(Some(value.into_owned()))
        }
        None => Ok(None),
    }
}

/// The remote API marks editability with `"1"` (or `"true"`); anything else,
/// including absence, means read-only.
fn flag(value: Option<String>) -> bool {
    matches!(value.as_deref(), Some("1") | Some("true"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE_CONTACT: &str = r#"<result>
  <contact id="7" date="2010-01-01">
    <Group_Tag name="Contact Information">
      <field name="First Name">prashant</field>
      <field name="Last Name">nadarajan</field>
      <field name="E-Mail">prashant@example.com</field>
    </Group_Tag>
    <Group_Tag name="Lead Information">
      <field name="Contact Owner">Don Corleone</field>
    </Group_Tag>
  </contact>
</result>"#;

    const MULTIPLE_CONTACTS: &str = r#"<result>
  <contact id="8">
    <Group_Tag name="Contact Information">
      <field name="First Name">bobby</field>
      <field name="E-Mail">bobby@example.com</field>
    </Group_Tag>
    <Group_Tag name="Lead Information">
      <field name="Contact Owner">Jimbo Watunusi</field>
    </Group_Tag>
  </contact>
  <contact id="5">
    <Group_Tag name="Contact Information">
      <field name="First Name">ali</field>
      <field name="E-Mail">ali@example.com</field>
    </Group_Tag>
    <Group_Tag name="Lead Information">
      <field name="Contact Owner">Jimbo Watunusi</field>
    </Group_Tag>
  </contact>
  <contact id="7">
    <Group_Tag name="Contact Information">
      <field name="First Name">prashant</field>
      <field name="E-Mail">prashant@example.com</field>
    </Group_Tag>
    <Group_Tag name="Lead Information">
      <field name="Contact Owner">Don Corleone</field>
    </Group_Tag>
  </contact>
</result>"#;

    const PULL_TAGS: &str = r#"<result>
  <tag id="3">newleads</tag>
  <tag id="4">old_leads</tag>
  <tag id="5">legacy Leads</tag>
</result>"#;

    const KEY_SCHEMA: &str = r#"<result>
  <Group_Tag name="Contact Information">
    <field name="Cell Phone" type="phone"/>
    <field name="Birthday" type="fulldate"/>
  </Group_Tag>
  <Group_Tag name="Lead Information">
    <field name="Lead Source" editable="1" type="tdrop">
      <option>Adwords</option>
      <option>Referral</option>
      <option>Trade Show</option>
      <option>Cold Call</option>
      <option>Newspaper Ad</option>
    </field>
  </Group_Tag>
  <Group_Tag name="Sequences and Tags">
    <field name="Contact Tags" type="list">
      <list id="3">newleads</list>
      <list id="4">old_leads</list>
      <list id="5">legacy Leads</list>
    </field>
  </Group_Tag>
  <Group_Tag name="PrecisoPro" editable="1">
    <field name="Lead Status" editable="1" type="tdrop">
      <option>New</option>
      <option>Qualified</option>
    </field>
  </Group_Tag>
</result>"#;

    #[test]
    fn parse_contacts_single_response() {
        let contacts = parse_contacts(SINGLE_CONTACT).unwrap();
        assert_eq!(contacts.len(), 1);

        let contact = &contacts[0];
        assert_eq!(contact.id(), Some("7"));
        assert_eq!(
            contact.get("Contact Information", "First Name"),
            Some("prashant")
        );
        assert_eq!(
            contact.get("Contact Information", "Last Name"),
            Some("nadarajan")
        );
        assert_eq!(
            contact.get("Contact Information", "E-Mail"),
            Some("prashant@example.com")
        );
        assert_eq!(
            contact.get("Lead Information", "Contact Owner"),
            Some("Don Corleone")
        );
    }

    #[test]
    fn parse_contacts_multiple_response_keeps_document_order() {
        let contacts = parse_contacts(MULTIPLE_CONTACTS).unwrap();
        assert_eq!(contacts.len(), 3);

        assert_eq!(contacts[0].id(), Some("8"));
        assert_eq!(
            contacts[0].get("Contact Information", "E-Mail"),
            Some("bobby@example.com")
        );
        assert_eq!(
            contacts[0].get("Lead Information", "Contact Owner"),
            Some("Jimbo Watunusi")
        );

        assert_eq!(contacts[1].id(), Some("5"));
        assert_eq!(
            contacts[1].get("Contact Information", "E-Mail"),
            Some("ali@example.com")
        );

        assert_eq!(contacts[2].id(), Some("7"));
    }

    #[test]
    fn parse_contacts_empty_field_yields_empty_string() {
        let xml = r#"<contact id="1">
            <Group_Tag name="Contact Information">
              <field name="First Name"></field>
              <field name="Last Name"/>
            </Group_Tag>
        </contact>"#;
        let contacts = parse_contacts(xml).unwrap();
        assert_eq!(contacts[0].get("Contact Information", "First Name"), Some(""));
        assert_eq!(contacts[0].get("Contact Information", "Last Name"), Some(""));
    }

    #[test]
    fn parse_contacts_no_matches_is_empty_not_an_error() {
        let contacts = parse_contacts("<result></result>").unwrap();
        assert!(contacts.is_empty());
    }

    #[test]
    fn parse_contacts_unescapes_entities() {
        let xml = r#"<contact id="2">
            <Group_Tag name="Contact Information">
              <field name="Company">Smith &amp; Sons &lt;Ltd&gt;</field>
            </Group_Tag>
        </contact>"#;
        let contacts = parse_contacts(xml).unwrap();
        assert_eq!(
            contacts[0].get("Contact Information", "Company"),
            Some("Smith & Sons <Ltd>")
        );
    }

    #[test]
    fn parse_contacts_malformed_xml_carries_the_text() {
        let err = parse_contacts("<result><contact></result>").unwrap_err();
        match err {
            Error::InvalidXml { body } => assert_eq!(body, "<result><contact></result>"),
            other => panic!("expected InvalidXml, got {other:?}"),
        }
    }

    #[test]
    fn parse_id_name_map_reads_tags() {
        let tags = parse_id_name_map(PULL_TAGS, "tag").unwrap();
        assert_eq!(tags.len(), 3);
        assert_eq!(tags["3"], "newleads");
        assert_eq!(tags["4"], "old_leads");
        assert_eq!(tags["5"], "legacy Leads");
    }

    #[test]
    fn parse_id_name_map_reads_sequences() {
        let xml = r#"<result>
          <sequence id="3">APPOINTMENT REMINDER</sequence>
          <sequence id="4">foo sequence</sequence>
        </result>"#;
        let sequences = parse_id_name_map(xml, "sequence").unwrap();
        assert_eq!(sequences["3"], "APPOINTMENT REMINDER");
        assert_eq!(sequences["4"], "foo sequence");
        assert_eq!(sequences.len(), 2);
    }

    #[test]
    fn parse_id_name_map_ignores_other_elements() {
        let tags = parse_id_name_map(PULL_TAGS, "sequence").unwrap();
        assert!(tags.is_empty());
    }

    #[test]
    fn parse_schema_reads_groups_fields_and_types() {
        let schema = parse_schema(KEY_SCHEMA).unwrap();

        let contact_info = &schema["Contact Information"];
        assert!(!contact_info.editable);
        assert!(!contact_info.fields["Cell Phone"].editable);
        assert_eq!(contact_info.fields["Cell Phone"].field_type, "phone");
        assert_eq!(contact_info.fields["Birthday"].field_type, "fulldate");

        let lead_source = &schema["Lead Information"].fields["Lead Source"];
        assert_eq!(lead_source.field_type, "tdrop");
        assert_eq!(lead_source.options[0], "Adwords");
        assert_eq!(lead_source.options[4], "Newspaper Ad");

        let contact_tags = &schema["Sequences and Tags"].fields["Contact Tags"];
        assert_eq!(contact_tags.field_type, "list");
        assert_eq!(contact_tags.list["5"], "legacy Leads");

        assert!(schema["PrecisoPro"].editable);
        assert!(schema["PrecisoPro"].fields["Lead Status"].editable);
    }

    #[test]
    fn check_well_formed_accepts_a_simple_result() {
        assert!(check_well_formed("<result>Success</result>").is_ok());
    }

    #[test]
    fn check_well_formed_rejects_plain_text() {
        let err = check_well_formed("Invalid Key or Appid provided").unwrap_err();
        assert!(matches!(err, Error::InvalidXml { .. }));
    }

    #[test]
    fn check_well_formed_rejects_mismatched_tags() {
        assert!(check_well_formed("<result><foo></result>").is_err());
    }
}

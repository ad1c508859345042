use std::{io, sync::Arc};

use axum::{extract::State, routing::post, Router};
use quick_xml::{
    escape::unescape,
    events::{BytesStart, BytesText, Event},
    Reader, Writer,
};
use tokio::{net::TcpListener, sync::RwLock};

/// The one credential pair the mock accepts.
pub const APP_ID: &str = "test-appid";
pub const API_KEY: &str = "test-key";

/// Keys the legacy form format is allowed to start a pair with. Anything
/// else after an `&` belongs to the previous value, because `data` is
/// XML-escaped rather than percent-encoded and its entities contain `&`.
const FORM_KEYS: [&str; 5] = ["reqType", "return_id", "data", "Appid", "Key"];

#[derive(Clone, Debug, Default)]
pub struct ContactRecord {
    pub id: String,
    pub groups: Vec<(String, Vec<(String, String)>)>,
}

impl ContactRecord {
    /// Field lookup across all groups; search equations name fields only.
    fn field(&self, name: &str) -> Option<&str> {
        self.groups
            .iter()
            .flat_map(|(_, fields)| fields.iter())
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug)]
pub struct Store {
    pub contacts: Vec<ContactRecord>,
    next_id: u32,
    tags: Vec<(String, String)>,
    sequences: Vec<(String, String)>,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            contacts: Vec::new(),
            next_id: 1,
            tags: vec![
                ("3".to_string(), "newleads".to_string()),
                ("4".to_string(), "old_leads".to_string()),
                ("5".to_string(), "legacy Leads".to_string()),
            ],
            sequences: vec![
                ("3".to_string(), "APPOINTMENT REMINDER".to_string()),
                ("4".to_string(), "foo sequence".to_string()),
            ],
        }
    }
}

impl Store {
    /// Insert or, when the record carries a known id, replace. Returns the
    /// stored record with its id filled in.
    pub fn upsert(&mut self, mut record: ContactRecord) -> ContactRecord {
        if !record.id.is_empty() {
            if let Some(existing) = self.contacts.iter_mut().find(|c| c.id == record.id) {
                *existing = record.clone();
                return record;
            }
        } else {
            record.id = self.next_id.to_string();
            self.next_id += 1;
        }
        self.contacts.push(record.clone());
        record
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new().route("/cdata.php", post(cdata)).with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn cdata(State(db): State<Db>, body: String) -> String {
    let pairs = parse_form(&body);
    if form_value(&pairs, "Appid") != Some(APP_ID) || form_value(&pairs, "Key") != Some(API_KEY) {
        return "Invalid Key provided, check the API documentation".to_string();
    }
    let data = match form_value(&pairs, "data").map(unescape) {
        Some(Ok(unescaped)) => unescaped.into_owned(),
        Some(Err(_)) => return "could not decode data parameter".to_string(),
        None => String::new(),
    };
    match form_value(&pairs, "reqType") {
        Some("add") => {
            let Some(record) = parse_contact(&data) else {
                return "could not decode data parameter".to_string();
            };
            let stored = db.write().await.upsert(record);
            render_contacts(&[stored])
        }
        Some("search") => {
            let equations = parse_equations(&data);
            let store = db.read().await;
            let matches: Vec<ContactRecord> = store
                .contacts
                .iter()
                .filter(|contact| equations.iter().all(|eq| eq.matches(contact)))
                .cloned()
                .collect();
            render_contacts(&matches)
        }
        Some("fetch") => {
            let ids = parse_contact_ids(&data);
            let store = db.read().await;
            // unknown ids are skipped, not reported
            let found: Vec<ContactRecord> = ids
                .iter()
                .filter_map(|id| store.contacts.iter().find(|c| &c.id == id))
                .cloned()
                .collect();
            render_contacts(&found)
        }
        Some("pull_tag") => render_listing("tag", &db.read().await.tags),
        Some("fetch_sequences") => render_listing("sequence", &db.read().await.sequences),
        Some("key") => SCHEMA_DOCUMENT.to_string(),
        _ => "unknown reqType".to_string(),
    }
}

/// Split the legacy form body into pairs. Only a segment starting with a
/// known key opens a new pair; every other segment is glued back onto the
/// current value with the `&` that separated it.
pub fn parse_form(body: &str) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for segment in body.split('&') {
        match segment.split_once('=') {
            Some((key, value)) if FORM_KEYS.contains(&key) => {
                pairs.push((key.to_string(), value.to_string()));
            }
            _ => {
                if let Some(last) = pairs.last_mut() {
                    last.1.push('&');
                    last.1.push_str(segment);
                }
            }
        }
    }
    pairs
}

fn form_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

#[derive(Debug, PartialEq)]
struct Equation {
    field: String,
    op: String,
    value: String,
}

impl Equation {
    fn matches(&self, contact: &ContactRecord) -> bool {
        let actual = contact.field(&self.field);
        match self.op.as_str() {
            "e" => actual == Some(self.value.as_str()),
            "n" => actual != Some(self.value.as_str()),
            _ => false,
        }
    }
}

fn parse_contact(xml: &str) -> Option<ContactRecord> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    reader.config_mut().trim_text(true);

    let mut record = ContactRecord::default();
    let mut seen_contact = false;
    loop {
        match reader.read_event().ok()? {
            Event::Start(e) => match e.name().as_ref() {
                b"contact" => {
                    seen_contact = true;
                    if let Some(id) = attr(&e, "id") {
                        record.id = id;
                    }
                }
                b"Group_Tag" => {
                    record.groups.push((attr(&e, "name")?, Vec::new()));
                }
                b"field" => {
                    let name = attr(&e, "name")?;
                    let value = text_of(&mut reader, &e)?;
                    record.groups.last_mut()?.1.push((name, value));
                }
                _ => {}
            },
            // empty elements never produce an End event
            Event::Empty(e) => match e.name().as_ref() {
                b"contact" => {
                    seen_contact = true;
                    if let Some(id) = attr(&e, "id") {
                        record.id = id;
                    }
                }
                b"Group_Tag" => {
                    record.groups.push((attr(&e, "name")?, Vec::new()));
                }
                b"field" => {
                    let name = attr(&e, "name")?;
                    record.groups.last_mut()?.1.push((name, String::new()));
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    seen_contact.then_some(record)
}

fn parse_equations(xml: &str) -> Vec<Equation> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    reader.config_mut().trim_text(true);

    let mut equations = Vec::new();
    let mut current: Option<Equation> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"equation" => {
                    current = Some(Equation {
                        field: String::new(),
                        op: String::new(),
                        value: String::new(),
                    });
                }
                tag @ (b"field" | b"op" | b"value") => {
                    let tag = tag.to_vec();
                    let Some(text) = text_of(&mut reader, &e) else {
                        return equations;
                    };
                    if let Some(eq) = current.as_mut() {
                        match tag.as_slice() {
                            b"field" => eq.field = text,
                            b"op" => eq.op = text,
                            _ => eq.value = text,
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::End(e)) if e.name().as_ref() == b"equation" => {
                if let Some(eq) = current.take() {
                    equations.push(eq);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }
    equations
}

fn parse_contact_ids(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    reader.config_mut().trim_text(true);

    let mut ids = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"contact_id" => {
                if let Some(id) = text_of(&mut reader, &e) {
                    ids.push(id);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }
    ids
}

fn attr(e: &BytesStart<'_>, name: &str) -> Option<String> {
    let value = e.try_get_attribute(name).ok()??;
    Some(value.unescape_value().ok()?.into_owned())
}

/// Text content of the element just opened by `start`. Empty elements have
/// already been consumed as `Event::Empty` and never reach here.
fn text_of(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> Option<String> {
    let mut text = String::new();
    loop {
        match reader.read_event().ok()? {
            Event::Text(t) => {
                let decoded = t.decode().ok()?;
                text.push_str(&unescape(&decoded).ok()?);
            }
            Event::End(e) if e.name() == start.name() => return Some(text),
            Event::Eof => return None,
            _ => {}
        }
    }
}

fn render_contacts(contacts: &[ContactRecord]) -> String {
    render(|w| {
        w.create_element("result").write_inner_content(|w| {
            for contact in contacts {
                w.create_element("contact")
                    .with_attribute(("id", contact.id.as_str()))
                    .write_inner_content(|w| {
                        for (group, fields) in &contact.groups {
                            w.create_element("Group_Tag")
                                .with_attribute(("name", group.as_str()))
                                .write_inner_content(|w| {
                                    for (field, value) in fields {
                                        w.create_element("field")
                                            .with_attribute(("name", field.as_str()))
                                            .write_text_content(BytesText::new(value))?;
                                    }
                                    Ok(())
                                })?;
                        }
                        Ok(())
                    })?;
            }
            Ok(())
        })?;
        Ok(())
    })
}

fn render_listing(item_tag: &str, entries: &[(String, String)]) -> String {
    render(|w| {
        w.create_element("result").write_inner_content(|w| {
            for (id, name) in entries {
                w.create_element(item_tag)
                    .with_attribute(("id", id.as_str()))
                    .write_text_content(BytesText::new(name))?;
            }
            Ok(())
        })?;
        Ok(())
    })
}

fn render<F>(f: F) -> String
where
    F: FnOnce(&mut Writer<&mut Vec<u8>>) -> io::Result<()>,
{
    let mut buf = Vec::new();
    let mut writer = Writer::new(&mut buf);
    if f(&mut writer).is_err() {
        return String::new();
    }
    String::from_utf8_lossy(&buf).into_owned()
}

const SCHEMA_DOCUMENT: &str = r#"<result>
  <Group_Tag name="Contact Information">
    <field name="First Name" editable="1" type="text"/>
    <field name="Last Name" editable="1" type="text"/>
    <field name="E-Mail" editable="1" type="text"/>
    <field name="Cell Phone" type="phone"/>
    <field name="Birthday" type="fulldate"/>
  </Group_Tag>
  <Group_Tag name="Lead Information">
    <field name="Contact Owner" editable="1" type="text"/>
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

//! Domain types for the contact API.
//!
//! # Design
//! The remote schema is dynamic: groups and fields are arbitrary strings
//! configured per account, so nothing here is statically declared beyond the
//! grouping concept itself. `Contact` keeps insertion order because the
//! generated XML is order-sensitive; the listing and schema maps are plain
//! `HashMap`s because their order carries no meaning.

use std::collections::HashMap;

/// Tag and sequence listings: numeric-id-as-string to display name.
pub type IdNameMap = HashMap<String, String>;

/// Field-schema metadata for the whole account, keyed by group name.
pub type Schema = HashMap<String, GroupSchema>;

/// A contact record: an optional server-assigned id plus named groups of
/// field/value string pairs.
///
/// The same type serves both directions: build one up with [`Contact::set`]
/// to send to the API, or receive one parsed from a response. Group and
/// field order is insertion order and is preserved in generated XML. No type
/// coercion is ever applied; every value stays a string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contact {
    id: Option<String>,
    groups: Vec<(String, Vec<(String, String)>)>,
}

impl Contact {
    pub fn new() -> Self {
        Self::default()
    }

    /// A contact carrying the id of an existing record, for updates.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            groups: Vec::new(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Set a field value, creating the group on first use. Setting an
    /// existing field overwrites it in place without disturbing order.
    pub fn set(
        &mut self,
        group: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) {
        let group = group.into();
        let field = field.into();
        let value = value.into();
        let idx = match self.groups.iter().position(|(name, _)| *name == group) {
            Some(idx) => idx,
            None => {
                self.groups.push((group, Vec::new()));
                self.groups.len() - 1
            }
        };
        let fields = &mut self.groups[idx].1;
        match fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => *existing = value,
            None => fields.push((field, value)),
        }
    }

    /// Ensure a group exists even with no fields; empty groups still emit an
    /// empty `Group_Tag` element.
    pub fn add_group(&mut self, group: impl Into<String>) {
        let group = group.into();
        if !self.groups.iter().any(|(name, _)| *name == group) {
            self.groups.push((group, Vec::new()));
        }
    }

    pub fn get(&self, group: &str, field: &str) -> Option<&str> {
        self.group(group)?
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    /// The fields of one group, in insertion order.
    pub fn group(&self, name: &str) -> Option<&[(String, String)]> {
        self.groups
            .iter()
            .find(|(group, _)| group == name)
            .map(|(_, fields)| fields.as_slice())
    }

    /// All groups in insertion order.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &[(String, String)])> {
        self.groups
            .iter()
            .map(|(name, fields)| (name.as_str(), fields.as_slice()))
    }

    /// True when the contact carries no groups at all.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// One field/operator/value triple of a search request.
///
/// Operators are passed through verbatim; validating them is the remote
/// API's job, so unknown operators travel unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion {
    pub field: String,
    pub op: String,
    pub value: String,
}

impl Criterion {
    pub fn new(
        field: impl Into<String>,
        op: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            op: op.into(),
            value: value.into(),
        }
    }
}

/// Schema metadata for one group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupSchema {
    /// True only when the group is explicitly flagged editable.
    pub editable: bool,
    pub fields: HashMap<String, FieldSchema>,
}

/// Schema metadata for one field within a group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSchema {
    pub editable: bool,
    /// The remote type tag, e.g. `phone`, `fulldate`, `tdrop`, `list`.
    pub field_type: String,
    /// Dropdown choices in document order; empty for other field types.
    pub options: Vec<String>,
    /// Id-to-name entries for `list` fields; empty for other field types.
    pub list: IdNameMap,
}

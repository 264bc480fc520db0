use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A leaf value in a record tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypedValue {
    Text(String),
    DateTime(DateTime<Utc>),
    Numeric(f64),
    Boolean(bool),
    /// An object whose structure belongs to an outside vocabulary and is
    /// carried opaquely under its type name.
    External { type_name: String, payload: Value },
}

impl TypedValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            TypedValue::Text(_) => ValueKind::Text,
            TypedValue::DateTime(_) => ValueKind::DateTime,
            TypedValue::Numeric(_) => ValueKind::Numeric,
            TypedValue::Boolean(_) => ValueKind::Boolean,
            TypedValue::External { type_name, .. } => ValueKind::External(type_name.clone()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TypedValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            TypedValue::Text(s) => Value::String(s.clone()),
            TypedValue::DateTime(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
            TypedValue::Numeric(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            TypedValue::Boolean(b) => Value::Bool(*b),
            TypedValue::External { payload, .. } => payload.clone(),
        }
    }
}

/// Accepts RFC 3339 instants, naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC)
/// and plain dates (midnight UTC).
pub fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Type tag of a location. Writes must preserve it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Text,
    DateTime,
    Numeric,
    Boolean,
    Structure(String),
    External(String),
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValueKind::Text => f.write_str("Text"),
            ValueKind::DateTime => f.write_str("DateTime"),
            ValueKind::Numeric => f.write_str("Numeric"),
            ValueKind::Boolean => f.write_str("Boolean"),
            ValueKind::Structure(name) => write!(f, "structure {}", name),
            ValueKind::External(name) => write!(f, "external {}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar(TypedValue),
    Structure(Structure),
}

impl Node {
    pub fn text(value: impl Into<String>) -> Self {
        Node::Scalar(TypedValue::Text(value.into()))
    }

    pub fn numeric(value: f64) -> Self {
        Node::Scalar(TypedValue::Numeric(value))
    }

    pub fn date_time(value: DateTime<Utc>) -> Self {
        Node::Scalar(TypedValue::DateTime(value))
    }

    pub fn boolean(value: bool) -> Self {
        Node::Scalar(TypedValue::Boolean(value))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Node::Scalar(value) => value.kind(),
            Node::Structure(s) => ValueKind::Structure(s.type_name.clone()),
        }
    }

    pub fn as_scalar(&self) -> Option<&TypedValue> {
        match self {
            Node::Scalar(value) => Some(value),
            Node::Structure(_) => None,
        }
    }

    pub fn as_structure(&self) -> Option<&Structure> {
        match self {
            Node::Structure(s) => Some(s),
            Node::Scalar(_) => None,
        }
    }

    pub fn as_structure_mut(&mut self) -> Option<&mut Structure> {
        match self {
            Node::Structure(s) => Some(s),
            Node::Scalar(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Node::Scalar(value) => value.to_json(),
            Node::Structure(s) => s.to_json(),
        }
    }

    fn visit_scalars<'a>(&'a self, visit: &mut dyn FnMut(&'a TypedValue)) {
        match self {
            Node::Scalar(value) => visit(value),
            Node::Structure(s) => s.visit_scalars(visit),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlotContent {
    Singleton(Box<Node>),
    Collection(Vec<Node>),
}

/// A named child of a structure, either exactly one node or an ordered list.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub name: String,
    pub content: SlotContent,
}

impl Slot {
    pub fn singleton(name: impl Into<String>, node: Node) -> Self {
        Slot {
            name: name.into(),
            content: SlotContent::Singleton(Box::new(node)),
        }
    }

    pub fn collection(name: impl Into<String>, nodes: Vec<Node>) -> Self {
        Slot {
            name: name.into(),
            content: SlotContent::Collection(nodes),
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.content, SlotContent::Collection(_))
    }

    /// All nodes held by the slot, in order.
    pub fn nodes(&self) -> Vec<&Node> {
        match &self.content {
            SlotContent::Singleton(node) => vec![node.as_ref()],
            SlotContent::Collection(nodes) => nodes.iter().collect(),
        }
    }
}

/// A typed composite node. Slot names are unique within one structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    pub type_name: String,
    pub slots: Vec<Slot>,
}

impl Structure {
    pub fn new(type_name: impl Into<String>) -> Self {
        Structure {
            type_name: type_name.into(),
            slots: Vec::new(),
        }
    }

    pub fn with_singleton(mut self, name: impl Into<String>, node: Node) -> Self {
        self.set_slot(Slot::singleton(name, node));
        self
    }

    pub fn with_collection(mut self, name: impl Into<String>, nodes: Vec<Node>) -> Self {
        self.set_slot(Slot::collection(name, nodes));
        self
    }

    pub fn resolve(&self, name: &str) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.name == name)
    }

    pub fn resolve_mut(&mut self, name: &str) -> Option<&mut Slot> {
        self.slots.iter_mut().find(|slot| slot.name == name)
    }

    pub fn children_of(&self, name: &str) -> Vec<&Node> {
        self.resolve(name).map(Slot::nodes).unwrap_or_default()
    }

    /// Insert the slot, replacing any slot of the same name in place.
    pub fn set_slot(&mut self, slot: Slot) {
        match self.slots.iter_mut().find(|existing| existing.name == slot.name) {
            Some(existing) => *existing = slot,
            None => self.slots.push(slot),
        }
    }

    pub fn remove_slot(&mut self, name: &str) -> Option<Slot> {
        let position = self.slots.iter().position(|slot| slot.name == name)?;
        Some(self.slots.remove(position))
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Visit every scalar below this structure in document order.
    pub fn visit_scalars<'a>(&'a self, visit: &mut dyn FnMut(&'a TypedValue)) {
        for slot in &self.slots {
            match &slot.content {
                SlotContent::Singleton(node) => node.visit_scalars(visit),
                SlotContent::Collection(nodes) => {
                    for node in nodes {
                        node.visit_scalars(visit);
                    }
                }
            }
        }
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for slot in &self.slots {
            let value = match &slot.content {
                SlotContent::Singleton(node) => node.to_json(),
                SlotContent::Collection(nodes) => Value::Array(nodes.iter().map(Node::to_json).collect()),
            };
            map.insert(slot.name.clone(), value);
        }
        Value::Object(map)
    }
}

use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::SchemaKind;
use crate::tree::node::{parse_instant, Node, Slot, SlotContent, Structure, TypedValue, ValueKind};
use crate::tree::path::PathExpression;

/// Declared type and cardinality of one property of one structure type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub kind: ValueKind,
    pub collection: bool,
}

/// Everything the catalog needs to know about one metadata standard:
/// which properties each structure type declares, where the identifier
/// lives, what the brief and summary element sets contain, and which
/// sub-paths feed which queryable.
#[derive(Debug)]
pub struct SchemaProfile {
    pub kind: SchemaKind,
    pub root_type: &'static str,
    pub identifier_property: &'static str,
    /// Strict profiles reject properties they do not declare.
    pub strict: bool,
    declarations: HashMap<&'static str, HashMap<&'static str, Declaration>>,
    brief: Vec<PathExpression>,
    summary: Vec<PathExpression>,
    extraction: Vec<(&'static str, Vec<PathExpression>)>,
}

pub struct ProfileBuilder {
    profile: SchemaProfile,
}

impl SchemaProfile {
    pub fn builder(kind: SchemaKind, root_type: &'static str, identifier_property: &'static str) -> ProfileBuilder {
        ProfileBuilder {
            profile: SchemaProfile {
                kind,
                root_type,
                identifier_property,
                strict: true,
                declarations: HashMap::new(),
                brief: Vec::new(),
                summary: Vec::new(),
                extraction: Vec::new(),
            },
        }
    }

    pub fn declaration(&self, owner: &str, property: &str) -> Option<&Declaration> {
        self.declarations.get(owner)?.get(property)
    }

    pub fn brief_paths(&self) -> &[PathExpression] {
        &self.brief
    }

    pub fn summary_paths(&self) -> &[PathExpression] {
        &self.summary
    }

    /// Queryable name and the paths whose values populate it.
    pub fn extraction(&self) -> &[(&'static str, Vec<PathExpression>)] {
        &self.extraction
    }

    pub fn extraction_paths(&self, queryable: &str) -> Option<&[PathExpression]> {
        self.extraction
            .iter()
            .find(|(name, _)| *name == queryable)
            .map(|(_, paths)| paths.as_slice())
    }

    /// Build a tree from a JSON object, guided by the declarations.
    pub fn tree_from_json(&self, document: &Value) -> Result<Structure> {
        let object = document.as_object().ok_or_else(|| {
            Error::new(
                ErrorKind::Document,
                format!("a {} document must be a JSON object", self.kind),
            )
        })?;
        // Accept both the bare content and content wrapped in its root element.
        let object = match object.get(self.root_type).and_then(Value::as_object) {
            Some(inner) if object.len() == 1 => inner,
            _ => object,
        };
        self.structure_from_object(self.root_type, object)
    }

    fn structure_from_object(&self, type_name: &str, object: &Map<String, Value>) -> Result<Structure> {
        let mut structure = Structure::new(type_name);
        for (name, value) in object {
            if value.is_null() {
                continue;
            }
            let slot = match self.declaration(type_name, name) {
                Some(declaration) => self.declared_slot(type_name, name, declaration, value)?,
                None if self.strict => {
                    return Err(Error::new(
                        ErrorKind::Document,
                        format!("{} does not declare a property named {}", type_name, name),
                    ));
                }
                None => infer_slot(name, value)?,
            };
            structure.set_slot(slot);
        }
        Ok(structure)
    }

    fn declared_slot(&self, owner: &str, name: &str, declaration: &Declaration, value: &Value) -> Result<Slot> {
        match (value, declaration.collection) {
            (Value::Array(items), true) => {
                let nodes = items
                    .iter()
                    .filter(|item| !item.is_null())
                    .map(|item| self.typed_node(owner, name, &declaration.kind, item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Slot::collection(name, nodes))
            }
            (single, true) => {
                let node = self.typed_node(owner, name, &declaration.kind, single)?;
                Ok(Slot::collection(name, vec![node]))
            }
            (Value::Array(_), false) => Err(Error::new(
                ErrorKind::Document,
                format!("{}.{} holds a single value, not a list", owner, name),
            )),
            (single, false) => Ok(Slot::singleton(name, self.typed_node(owner, name, &declaration.kind, single)?)),
        }
    }

    fn typed_node(&self, owner: &str, name: &str, kind: &ValueKind, value: &Value) -> Result<Node> {
        let mismatch = || {
            Error::new(
                ErrorKind::Document,
                format!("{}.{} expects {} but the document holds {}", owner, name, kind, value),
            )
        };
        let node = match kind {
            ValueKind::Text => match value {
                Value::String(s) => Node::text(s.clone()),
                Value::Number(n) => Node::text(n.to_string()),
                Value::Bool(b) => Node::text(b.to_string()),
                _ => return Err(mismatch()),
            },
            ValueKind::DateTime => {
                let instant = value.as_str().and_then(parse_instant).ok_or_else(mismatch)?;
                Node::date_time(instant)
            }
            ValueKind::Numeric => {
                let number = match value {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse().ok(),
                    _ => None,
                };
                Node::numeric(number.ok_or_else(mismatch)?)
            }
            ValueKind::Boolean => match value {
                Value::Bool(b) => Node::boolean(*b),
                Value::String(s) if s == "true" || s == "false" => Node::boolean(s == "true"),
                _ => return Err(mismatch()),
            },
            ValueKind::Structure(type_name) => {
                let object = value.as_object().ok_or_else(mismatch)?;
                Node::Structure(self.structure_from_object(type_name, object)?)
            }
            ValueKind::External(type_name) => Node::Scalar(TypedValue::External {
                type_name: type_name.clone(),
                payload: value.clone(),
            }),
        };
        Ok(node)
    }

    /// Check a structured value against the declarations of its type and of
    /// every structure nested in it. `at` names the value in error messages.
    pub fn validate_structure(&self, structure: &Structure, at: &str) -> Result<()> {
        for slot in &structure.slots {
            let here = format!("{}/{}", at, slot.name);
            let declaration = match self.declaration(&structure.type_name, &slot.name) {
                Some(declaration) => declaration,
                None if self.strict => {
                    return Err(Error::new(
                        ErrorKind::TypeMismatch,
                        format!("{} does not declare a property named {} ('{}')", structure.type_name, slot.name, here),
                    ));
                }
                None => {
                    for (position, node) in positioned(&slot.content) {
                        if let Node::Structure(inner) = node {
                            self.validate_structure(inner, &element_path(&here, position))?;
                        }
                    }
                    continue;
                }
            };

            match (&slot.content, declaration.collection) {
                (SlotContent::Singleton(_), true) => {
                    return Err(Error::new(
                        ErrorKind::TypeMismatch,
                        format!("'{}' is a collection and cannot hold a single value", here),
                    ));
                }
                (SlotContent::Collection(_), false) => {
                    return Err(Error::new(
                        ErrorKind::TypeMismatch,
                        format!("'{}' holds a single value, not a list", here),
                    ));
                }
                _ => {}
            }

            for (position, node) in positioned(&slot.content) {
                let at = element_path(&here, position);
                let actual = node.kind();
                if actual != declaration.kind {
                    return Err(Error::new(
                        ErrorKind::TypeMismatch,
                        format!("'{}' holds {} and cannot take {}", at, declaration.kind, actual),
                    ));
                }
                if let Node::Structure(inner) = node {
                    self.validate_structure(inner, &at)?;
                }
            }
        }
        Ok(())
    }
}

/// Nodes of a slot with their 1-based position, `None` for a singleton.
fn positioned(content: &SlotContent) -> Vec<(Option<usize>, &Node)> {
    match content {
        SlotContent::Singleton(node) => vec![(None, node.as_ref())],
        SlotContent::Collection(nodes) => nodes.iter().enumerate().map(|(i, node)| (Some(i + 1), node)).collect(),
    }
}

fn element_path(slot_path: &str, position: Option<usize>) -> String {
    match position {
        Some(position) => format!("{}[{}]", slot_path, position),
        None => slot_path.to_string(),
    }
}

/// Undeclared content: objects become structures typed by their key,
/// arrays become collections.
fn infer_slot(name: &str, value: &Value) -> Result<Slot> {
    match value {
        Value::Array(items) => {
            let nodes = items
                .iter()
                .filter(|item| !item.is_null())
                .map(|item| infer_node(name, item))
                .collect::<Result<Vec<_>>>()?;
            Ok(Slot::collection(name, nodes))
        }
        single => Ok(Slot::singleton(name, infer_node(name, single)?)),
    }
}

fn infer_node(name: &str, value: &Value) -> Result<Node> {
    match value {
        Value::String(s) => Ok(Node::text(s.clone())),
        Value::Bool(b) => Ok(Node::boolean(*b)),
        Value::Number(n) => n
            .as_f64()
            .map(Node::numeric)
            .ok_or_else(|| Error::new(ErrorKind::Document, format!("{} is not representable as a number", n))),
        Value::Object(object) => {
            let mut structure = Structure::new(name);
            for (child, child_value) in object {
                if !child_value.is_null() {
                    structure.set_slot(infer_slot(child, child_value)?);
                }
            }
            Ok(Node::Structure(structure))
        }
        Value::Array(_) => Err(Error::new(
            ErrorKind::Document,
            format!("nested lists are not supported under {}", name),
        )),
        Value::Null => Err(Error::new(ErrorKind::Document, format!("{} is null", name))),
    }
}

fn static_path(text: &'static str) -> PathExpression {
    PathExpression::plain(text)
}

impl ProfileBuilder {
    pub fn declare(mut self, owner: &'static str, property: &'static str, kind: ValueKind) -> Self {
        self.insert(owner, property, kind, false);
        self
    }

    pub fn declare_many(mut self, owner: &'static str, property: &'static str, kind: ValueKind) -> Self {
        self.insert(owner, property, kind, true);
        self
    }

    /// Shorthand for a list of text singletons on one owner.
    pub fn texts(mut self, owner: &'static str, properties: &[&'static str]) -> Self {
        for property in properties {
            self.insert(owner, property, ValueKind::Text, false);
        }
        self
    }

    pub fn lenient(mut self) -> Self {
        self.profile.strict = false;
        self
    }

    pub fn brief(mut self, paths: &[&'static str]) -> Self {
        self.profile.brief = paths.iter().map(|p| static_path(p)).collect();
        self
    }

    /// Summary paths are added on top of the brief ones.
    pub fn summary(mut self, paths: &[&'static str]) -> Self {
        let mut summary = self.profile.brief.clone();
        summary.extend(paths.iter().map(|p| static_path(p)));
        self.profile.summary = summary;
        self
    }

    pub fn extract(mut self, queryable: &'static str, paths: &[&'static str]) -> Self {
        self.profile
            .extraction
            .push((queryable, paths.iter().map(|p| static_path(p)).collect()));
        self
    }

    pub fn build(self) -> SchemaProfile {
        self.profile
    }

    fn insert(&mut self, owner: &'static str, property: &'static str, kind: ValueKind, collection: bool) {
        self.profile
            .declarations
            .entry(owner)
            .or_default()
            .insert(property, Declaration { kind, collection });
    }
}

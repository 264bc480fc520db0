use serde_json::Value;
use std::fmt;

use crate::core::types::SchemaKind;
use crate::schema::profile::{Declaration, SchemaProfile};
use crate::tree::node::{Node, Slot, SlotContent, Structure};

/// Capabilities every schema adapter offers to the generic algorithms:
/// reach the root structure, answer declared types, and read or rewrite
/// the identifier.
pub trait RecordTree: fmt::Debug + Send + Sync {
    fn profile(&self) -> &'static SchemaProfile;

    fn root(&self) -> &Structure;

    fn root_mut(&mut self) -> &mut Structure;

    fn box_clone(&self) -> Box<dyn RecordTree>;

    fn schema_kind(&self) -> SchemaKind {
        self.profile().kind
    }

    /// The first non-blank text under the identifier property.
    fn identifier(&self) -> Option<String> {
        self.root()
            .children_of(self.profile().identifier_property)
            .into_iter()
            .filter_map(Node::as_scalar)
            .filter_map(|value| value.as_text())
            .map(str::trim)
            .find(|text| !text.is_empty())
            .map(str::to_string)
    }

    /// Write the identifier into the content, keeping the slot cardinality.
    fn set_identifier(&mut self, identifier: &str) {
        let profile = self.profile();
        let property = profile.identifier_property;
        let root = self.root_mut();
        let value = Node::text(identifier);

        match root.resolve_mut(property) {
            Some(slot) => match &mut slot.content {
                SlotContent::Singleton(node) => **node = value,
                SlotContent::Collection(nodes) if nodes.is_empty() => nodes.push(value),
                SlotContent::Collection(nodes) => nodes[0] = value,
            },
            None => {
                let collection = profile
                    .declaration(&root.type_name, property)
                    .map(|d| d.collection)
                    .unwrap_or(false);
                let slot = if collection {
                    Slot::collection(property, vec![value])
                } else {
                    Slot::singleton(property, value)
                };
                root.slots.insert(0, slot);
            }
        }
    }

    fn declared(&self, owner_type: &str, property: &str) -> Option<&'static Declaration> {
        self.profile().declaration(owner_type, property)
    }

    fn to_json(&self) -> Value {
        self.root().to_json()
    }
}

impl Clone for Box<dyn RecordTree> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

impl PartialEq for dyn RecordTree {
    fn eq(&self, other: &Self) -> bool {
        self.schema_kind() == other.schema_kind() && self.root() == other.root()
    }
}

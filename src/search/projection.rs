use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::SchemaKind;
use crate::index::entry::{IndexEntry, IndexValue};
use crate::schema::dc::{DcRecord, DC_PROFILE};
use crate::search::results::ProjectedRecord;
use crate::tree::extract::copy_paths;
use crate::tree::node::{Node, Structure};
use crate::tree::path::PathExpression;
use crate::tree::record::RecordTree;

/// Element set of returned records.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Brief,
    Summary,
    Full,
    Elements(Vec<PathExpression>),
}

/// Dublin Core element filled from each queryable when a record is
/// returned in a schema other than its own.
const DC_VIEW: &[(&str, &str)] = &[
    ("identifier", "identifier"),
    ("title", "Title"),
    ("type", "Type"),
    ("subject", "Subject"),
    ("format", "Format"),
    ("language", "Language"),
    ("modified", "Modified"),
    ("abstract", "Abstract"),
    ("publisher", "OrganisationName"),
];

impl Projection {
    /// `brief`, `summary` or `full`, in any case.
    pub fn from_element_set(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "brief" => Ok(Projection::Brief),
            "summary" => Ok(Projection::Summary),
            "full" => Ok(Projection::Full),
            _ => Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("unknown element set name '{}'", name),
            )),
        }
    }

    pub fn elements(names: &[&str]) -> Result<Self> {
        let paths = names.iter().map(|name| name.parse()).collect::<Result<Vec<PathExpression>>>()?;
        Ok(Projection::Elements(paths))
    }

    pub fn apply(&self, identifier: &str, tree: &dyn RecordTree) -> ProjectedRecord {
        let profile = tree.profile();
        let content = match self {
            Projection::Full => tree.root().clone(),
            Projection::Brief => copy_paths(tree.root(), profile.brief_paths()),
            Projection::Summary => copy_paths(tree.root(), profile.summary_paths()),
            Projection::Elements(paths) => copy_paths(tree.root(), paths),
        };
        ProjectedRecord {
            identifier: identifier.to_string(),
            kind: profile.kind,
            content,
        }
    }

    /// Shape a record for `output`. A record is always available in its own
    /// schema; any record can be seen as Dublin Core through its index entry.
    pub fn apply_as(
        &self,
        identifier: &str,
        tree: &dyn RecordTree,
        entry: &IndexEntry,
        output: SchemaKind,
    ) -> Result<ProjectedRecord> {
        if output == tree.schema_kind() {
            return Ok(self.apply(identifier, tree));
        }
        if output != SchemaKind::Dc {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!(
                    "record '{}' is stored as {} and cannot be returned as {}",
                    identifier,
                    tree.schema_kind(),
                    output
                ),
            ));
        }
        let view = DcRecord::new(dublin_core_view(entry))?;
        Ok(self.apply(identifier, &view))
    }
}

fn dublin_core_view(entry: &IndexEntry) -> Structure {
    let mut root = Structure::new(DC_PROFILE.root_type);

    for (element, queryable) in DC_VIEW {
        let mut nodes: Vec<Node> = entry.values(queryable).iter().filter_map(scalar_node).collect();
        if nodes.is_empty() {
            continue;
        }
        let repeated = DC_PROFILE
            .declaration(DC_PROFILE.root_type, element)
            .is_some_and(|d| d.collection);
        root = if repeated {
            root.with_collection(*element, nodes)
        } else {
            root.with_singleton(*element, nodes.remove(0))
        };
    }

    let boxes: Vec<Node> = entry
        .values("BoundingBox")
        .iter()
        .filter_map(|value| match value {
            IndexValue::Envelope(e) => Some(Node::Structure(
                Structure::new("BoundingBox")
                    .with_singleton("crs", Node::text("EPSG:4326"))
                    .with_singleton("minx", Node::numeric(e.min_x))
                    .with_singleton("miny", Node::numeric(e.min_y))
                    .with_singleton("maxx", Node::numeric(e.max_x))
                    .with_singleton("maxy", Node::numeric(e.max_y)),
            )),
            _ => None,
        })
        .collect();
    if !boxes.is_empty() {
        root = root.with_collection("BoundingBox", boxes);
    }
    root
}

fn scalar_node(value: &IndexValue) -> Option<Node> {
    match value {
        IndexValue::Text(text) => Some(Node::text(text.clone())),
        IndexValue::Number(n) => Some(Node::numeric(*n)),
        IndexValue::Instant(t) => Some(Node::date_time(*t)),
        IndexValue::Envelope(_) => None,
    }
}

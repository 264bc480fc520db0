use crate::core::error::{Error, NavigationErrorKind, Result};
use crate::schema::profile::SchemaProfile;
use crate::tree::node::{Node, SlotContent, Structure, ValueKind};
use crate::tree::path::{PathExpression, Segment};

/// What the final segment of a path addresses inside its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The single node of a singleton slot.
    Singleton,
    /// An existing element of a collection, 0-based.
    Element(usize),
    /// One past the end of a collection (`name[len + 1]`).
    Append,
    /// An unindexed collection as a whole.
    WholeCollection,
    /// A declared singleton the record does not hold yet.
    Create,
}

/// A unique location resolved from a path: the structure owning the final
/// slot, which slot, and which part of it.
#[derive(Debug)]
pub struct Location<'a> {
    pub parent: &'a mut Structure,
    pub segment: Segment,
    pub target: Target,
}

impl<'a> Location<'a> {
    /// Type tag of what currently sits at the location, if anything does.
    pub fn existing_kind(&self) -> Option<ValueKind> {
        let slot = self.parent.resolve(&self.segment.name)?;
        match (&slot.content, self.target) {
            (SlotContent::Singleton(node), Target::Singleton) => Some(node.kind()),
            (SlotContent::Collection(nodes), Target::Element(i)) => nodes.get(i).map(Node::kind),
            (SlotContent::Collection(nodes), Target::Append | Target::WholeCollection) => {
                nodes.first().map(Node::kind)
            }
            _ => None,
        }
    }
}

/// Walk `path` from `root` down to a unique location.
///
/// Intermediate collections must be indexed, indexes must address existing
/// elements, and only the final segment may point one past the end. A final
/// slot the record lacks is addressable when `profile` declares it: a
/// declared collection counts as empty.
pub fn navigate<'a>(
    root: &'a mut Structure,
    path: &PathExpression,
    profile: &SchemaProfile,
) -> Result<Location<'a>> {
    let segments = effective_segments(root, path)?;
    let (last, intermediate) = match segments.split_last() {
        Some(split) => split,
        None => {
            return Err(Error::navigation(
                NavigationErrorKind::PathNotFound,
                format!("path '{}' addresses the record root, not a property", path),
            ));
        }
    };

    let mut current: &'a mut Structure = root;
    for segment in intermediate {
        current = step_into(current, segment, path)?;
    }

    let target = final_target(current, last, path, profile)?;
    Ok(Location {
        parent: current,
        segment: last.clone(),
        target,
    })
}

/// Read-only resolution of a path to the node at a unique location.
pub fn resolve<'a>(root: &'a Structure, path: &PathExpression) -> Result<&'a Node> {
    let segments = effective_segments(root, path)?;
    let mut current = root;
    let mut found: Option<&Node> = None;
    for (i, segment) in segments.iter().enumerate() {
        let node = select(current, segment, path, i + 1 == segments.len())?;
        if i + 1 < segments.len() {
            current = node.as_structure().ok_or_else(|| scalar_has_no_children(segment, path))?;
        }
        found = Some(node);
    }
    found.ok_or_else(|| {
        Error::navigation(
            NavigationErrorKind::PathNotFound,
            format!("path '{}' addresses the record root, not a property", path),
        )
    })
}

/// Paths may start with the root element name, which is skipped.
fn effective_segments<'p>(root: &Structure, path: &'p PathExpression) -> Result<&'p [Segment]> {
    let segments = path.segments();
    match segments.first() {
        Some(first) if first.index.is_none() && first.name == root.type_name && root.resolve(&first.name).is_none() => {
            Ok(&segments[1..])
        }
        _ => Ok(segments),
    }
}

fn step_into<'b>(parent: &'b mut Structure, segment: &Segment, path: &PathExpression) -> Result<&'b mut Structure> {
    let owner = parent.type_name.clone();
    let slot = parent
        .resolve_mut(&segment.name)
        .ok_or_else(|| not_found(&owner, segment, path))?;

    let node = match (&mut slot.content, segment.index) {
        (SlotContent::Singleton(_), Some(_)) => return Err(not_a_collection(segment, path)),
        (SlotContent::Singleton(node), None) => node.as_mut(),
        (SlotContent::Collection(_), None) => return Err(not_a_singleton(segment, path)),
        (SlotContent::Collection(nodes), Some(index)) => {
            let len = nodes.len();
            if index == 0 || index > len {
                return Err(out_of_range(segment, len, path));
            }
            &mut nodes[index - 1]
        }
    };

    node.as_structure_mut().ok_or_else(|| scalar_has_no_children(segment, path))
}

fn select<'b>(parent: &'b Structure, segment: &Segment, path: &PathExpression, is_last: bool) -> Result<&'b Node> {
    let slot = parent
        .resolve(&segment.name)
        .ok_or_else(|| not_found(&parent.type_name, segment, path))?;
    match (&slot.content, segment.index) {
        (SlotContent::Singleton(_), Some(_)) => Err(not_a_collection(segment, path)),
        (SlotContent::Singleton(node), None) => Ok(node.as_ref()),
        (SlotContent::Collection(nodes), None) if is_last && nodes.len() == 1 => Ok(&nodes[0]),
        (SlotContent::Collection(_), None) => Err(not_a_singleton(segment, path)),
        (SlotContent::Collection(nodes), Some(index)) => index
            .checked_sub(1)
            .and_then(|i| nodes.get(i))
            .ok_or_else(|| out_of_range(segment, nodes.len(), path)),
    }
}

fn final_target(
    parent: &Structure,
    segment: &Segment,
    path: &PathExpression,
    profile: &SchemaProfile,
) -> Result<Target> {
    let Some(slot) = parent.resolve(&segment.name) else {
        return absent_target(parent, segment, path, profile);
    };
    match (&slot.content, segment.index) {
        (SlotContent::Singleton(_), None) => Ok(Target::Singleton),
        (SlotContent::Singleton(_), Some(_)) => Err(not_a_collection(segment, path)),
        (SlotContent::Collection(_), None) => Ok(Target::WholeCollection),
        (SlotContent::Collection(nodes), Some(index)) => {
            let len = nodes.len();
            if index == 0 {
                Err(out_of_range(segment, len, path))
            } else if index <= len {
                Ok(Target::Element(index - 1))
            } else if index == len + 1 {
                Ok(Target::Append)
            } else {
                Err(out_of_range(segment, len, path))
            }
        }
    }
}

fn absent_target(
    parent: &Structure,
    segment: &Segment,
    path: &PathExpression,
    profile: &SchemaProfile,
) -> Result<Target> {
    let declaration = profile
        .declaration(&parent.type_name, &segment.name)
        .ok_or_else(|| not_found(&parent.type_name, segment, path))?;
    match (declaration.collection, segment.index) {
        (false, None) => Ok(Target::Create),
        (false, Some(_)) => Err(not_a_collection(segment, path)),
        (true, None) => Ok(Target::WholeCollection),
        (true, Some(1)) => Ok(Target::Append),
        (true, Some(_)) => Err(out_of_range(segment, 0, path)),
    }
}

fn not_found(owner: &str, segment: &Segment, path: &PathExpression) -> Error {
    Error::navigation(
        NavigationErrorKind::PathNotFound,
        format!("{} has no property {} (path '{}')", owner, segment.name, path),
    )
}

fn not_a_collection(segment: &Segment, path: &PathExpression) -> Error {
    Error::navigation(
        NavigationErrorKind::NotACollection,
        format!("the property {} is not a collection and cannot be indexed (path '{}')", segment.name, path),
    )
}

fn not_a_singleton(segment: &Segment, path: &PathExpression) -> Error {
    Error::navigation(
        NavigationErrorKind::NotASingleton,
        format!("the property {} is a collection and needs an index (path '{}')", segment.name, path),
    )
}

fn out_of_range(segment: &Segment, len: usize, path: &PathExpression) -> Error {
    Error::navigation(
        NavigationErrorKind::IndexOutOfRange,
        format!(
            "index {} is out of range for {} which holds {} element(s) (path '{}')",
            segment.index.unwrap_or(0),
            segment.name,
            len,
            path
        ),
    )
}

fn scalar_has_no_children(segment: &Segment, path: &PathExpression) -> Error {
    Error::navigation(
        NavigationErrorKind::PathNotFound,
        format!("the property {} holds a value, not a structure (path '{}')", segment.name, path),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::iso::ISO_PROFILE;

    fn metadata() -> Structure {
        let keywords = |words: &[&str]| {
            Node::Structure(
                Structure::new("MD_Keywords")
                    .with_collection("keyword", words.iter().map(|w| Node::text(*w)).collect()),
            )
        };
        let identification = Structure::new("MD_DataIdentification")
            .with_singleton("abstract", Node::text("An abstract"))
            .with_collection(
                "descriptiveKeywords",
                vec![keywords(&["ocean"]), keywords(&["salinity", "depth"]), keywords(&["Mediterranean"])],
            );
        Structure::new("MD_Metadata")
            .with_singleton("language", Node::text("eng"))
            .with_collection("identificationInfo", vec![Node::Structure(identification)])
    }

    fn path(text: &str) -> PathExpression {
        PathExpression::parse(text).unwrap()
    }

    fn navigate_in<'a>(root: &'a mut Structure, path: &PathExpression) -> Result<Location<'a>> {
        navigate(root, path, &ISO_PROFILE)
    }

    #[test]
    fn resolves_top_level_singleton() {
        let mut root = metadata();
        let location = navigate_in(&mut root, &path("/language")).unwrap();
        assert_eq!(location.target, Target::Singleton);
        assert_eq!(location.existing_kind(), Some(ValueKind::Text));
    }

    #[test]
    fn resolves_nested_element_and_append() {
        let mut root = metadata();
        let location = navigate_in(&mut root, &path("identificationInfo[1]/descriptiveKeywords[3]/keyword")).unwrap();
        assert_eq!(location.parent.type_name, "MD_Keywords");
        assert_eq!(location.target, Target::WholeCollection);

        let location = navigate_in(&mut root, &path("identificationInfo[1]/descriptiveKeywords[4]")).unwrap();
        assert_eq!(location.target, Target::Append);
    }

    #[test]
    fn root_element_name_is_skipped() {
        let mut root = metadata();
        let location = navigate_in(&mut root, &path("/gmd:MD_Metadata/gmd:language")).unwrap();
        assert_eq!(location.segment.name, "language");
    }

    #[test]
    fn classifies_failures() {
        let mut root = metadata();
        let cases = [
            ("identificationInfo[1]/abstract[2]", NavigationErrorKind::NotACollection),
            ("identificationInfo/abstract", NavigationErrorKind::NotASingleton),
            ("identificationInfo[2]/abstract", NavigationErrorKind::IndexOutOfRange),
            ("identificationInfo[1]/descriptiveKeywords[5]", NavigationErrorKind::IndexOutOfRange),
            ("identificationInfo[1]/colour", NavigationErrorKind::PathNotFound),
            ("identificationInfo[1]/purpose[1]", NavigationErrorKind::NotACollection),
            ("identificationInfo[1]/status[2]", NavigationErrorKind::IndexOutOfRange),
            ("language/code", NavigationErrorKind::PathNotFound),
        ];
        for (text, expected) in cases {
            let err = navigate_in(&mut root, &path(text)).unwrap_err();
            assert!(err.is_navigation(expected), "{}: {}", text, err);
        }
    }

    #[test]
    fn declared_but_absent_slots_are_addressable() {
        let mut root = metadata();
        let location = navigate_in(&mut root, &path("identificationInfo[1]/purpose")).unwrap();
        assert_eq!(location.target, Target::Create);
        assert_eq!(location.existing_kind(), None);

        let location = navigate_in(&mut root, &path("identificationInfo[1]/topicCategory[1]")).unwrap();
        assert_eq!(location.target, Target::Append);
        let location = navigate_in(&mut root, &path("identificationInfo[1]/topicCategory")).unwrap();
        assert_eq!(location.target, Target::WholeCollection);
    }

    #[test]
    fn read_only_resolve_finds_nodes() {
        let root = metadata();
        let node = resolve(&root, &path("identificationInfo[1]/descriptiveKeywords[2]/keyword[2]")).unwrap();
        assert_eq!(node, &Node::text("depth"));
        assert!(resolve(&root, &path("identificationInfo[1]/descriptiveKeywords")).is_err());
    }
}

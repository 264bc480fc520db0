use tracing::trace;

use crate::core::error::{Error, ErrorKind, NavigationErrorKind, Result};
use crate::schema::profile::SchemaProfile;
use crate::tree::navigator::{navigate, Location, Target};
use crate::tree::node::{Node, Slot, SlotContent};
use crate::tree::path::PathExpression;
use crate::tree::record::RecordTree;

/// One targeted write: set the location to `value`, or remove it when
/// `value` is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyUpdate {
    pub path: String,
    pub value: Option<Node>,
}

impl PropertyUpdate {
    pub fn set(path: impl Into<String>, value: Node) -> Self {
        PropertyUpdate {
            path: path.into(),
            value: Some(value),
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        PropertyUpdate {
            path: path.into(),
            value: None,
        }
    }
}

pub struct UpdateApplier;

impl UpdateApplier {
    /// Apply a single write in place.
    pub fn apply(tree: &mut dyn RecordTree, update: &PropertyUpdate) -> Result<()> {
        let path = PathExpression::parse(&update.path)?;
        let profile = tree.profile();
        let mut location = navigate(tree.root_mut(), &path, profile)?;

        match &update.value {
            Some(value) => write(profile, &mut location, value.clone(), &path)?,
            None => remove(&mut location, &path)?,
        }
        trace!(path = %path, removed = update.value.is_none(), "applied property write");
        Ok(())
    }

    /// Apply the writes in order to a copy of `tree`. The copy is returned
    /// only when every write succeeded, so a failure leaves nothing half done.
    pub fn apply_all(tree: &dyn RecordTree, updates: &[PropertyUpdate]) -> Result<Box<dyn RecordTree>> {
        let mut working = tree.box_clone();
        for update in updates {
            UpdateApplier::apply(working.as_mut(), update)?;
        }
        Ok(working)
    }
}

fn write(profile: &SchemaProfile, location: &mut Location<'_>, value: Node, path: &PathExpression) -> Result<()> {
    // Existing content fixes the type; an empty collection falls back to the declaration.
    let expected = location.existing_kind().or_else(|| {
        profile
            .declaration(&location.parent.type_name, &location.segment.name)
            .map(|declaration| declaration.kind.clone())
    });
    if let Some(expected) = expected {
        let actual = value.kind();
        if actual != expected {
            return Err(Error::new(
                ErrorKind::TypeMismatch,
                format!("'{}' holds {} and cannot take {}", path, expected, actual),
            ));
        }
    }
    if let Node::Structure(structure) = &value {
        profile.validate_structure(structure, &path.to_string())?;
    }

    let target = location.target;
    let name = location.segment.name.clone();
    if location.parent.resolve(&name).is_none() {
        let slot = match target {
            Target::Create => Slot::singleton(name, value),
            Target::Append | Target::WholeCollection => Slot::collection(name, vec![value]),
            Target::Singleton | Target::Element(_) => {
                return Err(Error::new(ErrorKind::InvalidState, format!("slot for '{}' vanished", path)));
            }
        };
        location.parent.set_slot(slot);
        return Ok(());
    }
    let slot = location
        .parent
        .resolve_mut(&name)
        .ok_or_else(|| Error::new(ErrorKind::InvalidState, format!("slot for '{}' vanished", path)))?;

    match (&mut slot.content, target) {
        (SlotContent::Singleton(node), Target::Singleton) => **node = value,
        (SlotContent::Collection(nodes), Target::Element(i)) => nodes[i] = value,
        (SlotContent::Collection(nodes), Target::Append) => nodes.push(value),
        (SlotContent::Collection(nodes), Target::WholeCollection) => {
            nodes.clear();
            nodes.push(value);
        }
        _ => {
            return Err(Error::new(
                ErrorKind::InvalidState,
                format!("location for '{}' does not match its slot", path),
            ));
        }
    }
    Ok(())
}

fn remove(location: &mut Location<'_>, path: &PathExpression) -> Result<()> {
    let name = location.segment.name.clone();
    match location.target {
        Target::Singleton => {
            location.parent.remove_slot(&name);
        }
        // Absent already.
        Target::Create => {}
        Target::Append => {
            return Err(Error::navigation(
                NavigationErrorKind::IndexOutOfRange,
                format!("'{}' points past the end of {}, nothing to remove", path, name),
            ));
        }
        Target::Element(i) => {
            if let Some(SlotContent::Collection(nodes)) = content_mut(location, &name) {
                nodes.remove(i);
            }
        }
        Target::WholeCollection => {
            if let Some(SlotContent::Collection(nodes)) = content_mut(location, &name) {
                nodes.clear();
            }
        }
    }
    Ok(())
}

fn content_mut<'l>(location: &'l mut Location<'_>, name: &str) -> Option<&'l mut SlotContent> {
    location.parent.resolve_mut(name).map(|slot| &mut slot.content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::iso::IsoRecord;
    use crate::tree::navigator::resolve;
    use crate::tree::node::Structure;
    use serde_json::json;

    fn record() -> IsoRecord {
        IsoRecord::from_json(&json!({
            "fileIdentifier": "rec-1",
            "language": "eng",
            "identificationInfo": [{
                "citation": {"title": "Ocean temperature"},
                "abstract": "Measurements",
                "descriptiveKeywords": [
                    {"keyword": ["ocean"]},
                    {"keyword": ["temperature", "salinity"]},
                    {"keyword": ["Mediterranean"]}
                ]
            }]
        }))
        .unwrap()
    }

    fn at<'a>(tree: &'a dyn RecordTree, path: &str) -> &'a Node {
        resolve(tree.root(), &PathExpression::parse(path).unwrap()).unwrap()
    }

    #[test]
    fn writes_exactly_one_location() {
        let mut tree = record();
        let before = tree.clone();
        UpdateApplier::apply(
            &mut tree,
            &PropertyUpdate::set("identificationInfo[1]/descriptiveKeywords[3]/keyword[1]", Node::text("Adriatic")),
        )
        .unwrap();

        assert_eq!(at(&tree, "identificationInfo[1]/descriptiveKeywords[3]/keyword[1]"), &Node::text("Adriatic"));
        assert_eq!(
            at(&tree, "identificationInfo[1]/descriptiveKeywords[1]/keyword[1]"),
            at(&before, "identificationInfo[1]/descriptiveKeywords[1]/keyword[1]")
        );
        assert_eq!(at(&tree, "language"), &Node::text("eng"));
    }

    #[test]
    fn appends_one_past_the_end() {
        let mut tree = record();
        UpdateApplier::apply(
            &mut tree,
            &PropertyUpdate::set("identificationInfo[1]/descriptiveKeywords[2]/keyword[3]", Node::text("depth")),
        )
        .unwrap();
        assert_eq!(at(&tree, "identificationInfo[1]/descriptiveKeywords[2]/keyword[3]"), &Node::text("depth"));
    }

    #[test]
    fn rejects_type_changes() {
        let mut tree = record();
        let err = UpdateApplier::apply(&mut tree, &PropertyUpdate::set("language", Node::numeric(3.0))).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
        assert_eq!(at(&tree, "language"), &Node::text("eng"));
    }

    #[test]
    fn removal_drops_singletons_and_elements() {
        let mut tree = record();
        UpdateApplier::apply(&mut tree, &PropertyUpdate::remove("identificationInfo[1]/abstract")).unwrap();
        let keyword = PropertyUpdate::remove("identificationInfo[1]/descriptiveKeywords[2]/keyword[1]");
        UpdateApplier::apply(&mut tree, &keyword).unwrap();

        let err = resolve(tree.root(), &PathExpression::parse("identificationInfo[1]/abstract").unwrap()).unwrap_err();
        assert!(err.is_navigation(NavigationErrorKind::PathNotFound));
        assert_eq!(at(&tree, "identificationInfo[1]/descriptiveKeywords[2]/keyword[1]"), &Node::text("salinity"));
    }

    #[test]
    fn removed_singletons_can_be_written_again() {
        let mut tree = record();
        UpdateApplier::apply(&mut tree, &PropertyUpdate::remove("identificationInfo[1]/abstract")).unwrap();
        UpdateApplier::apply(&mut tree, &PropertyUpdate::remove("identificationInfo[1]/abstract")).unwrap();
        UpdateApplier::apply(&mut tree, &PropertyUpdate::set("identificationInfo[1]/abstract", Node::text("Revised")))
            .unwrap();
        assert_eq!(at(&tree, "identificationInfo[1]/abstract"), &Node::text("Revised"));
        assert!(!tree.root().children_of("identificationInfo")[0]
            .as_structure()
            .unwrap()
            .resolve("abstract")
            .unwrap()
            .is_collection());

        let purpose = PropertyUpdate::set("identificationInfo[1]/purpose", Node::numeric(1.0));
        let err = UpdateApplier::apply(&mut tree, &purpose).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn structured_values_are_checked_all_the_way_down() {
        let mut tree = record();
        let citation = |title: Node| Structure::new("CI_Citation").with_singleton("title", title);
        let cases = [
            (citation(Node::numeric(42.0)), "citation/title"),
            (citation(Node::text("T")).with_singleton("colour", Node::text("red")), "citation/colour"),
            (
                citation(Node::text("T")).with_singleton("alternateTitle", Node::text("single")),
                "citation/alternateTitle",
            ),
        ];
        for (value, named) in cases {
            let update = PropertyUpdate::set("identificationInfo[1]/citation", Node::Structure(value));
            let err = UpdateApplier::apply(&mut tree, &update).unwrap_err();
            assert_eq!(err.kind, ErrorKind::TypeMismatch);
            assert!(err.context.contains(named), "{}", err);
        }
        assert_eq!(at(&tree, "identificationInfo[1]/citation/title"), &Node::text("Ocean temperature"));

        let valid = citation(Node::text("T")).with_collection("alternateTitle", vec![Node::text("Alt")]);
        UpdateApplier::apply(&mut tree, &PropertyUpdate::set("identificationInfo[1]/citation", Node::Structure(valid)))
            .unwrap();
        assert_eq!(at(&tree, "identificationInfo[1]/citation/alternateTitle[1]"), &Node::text("Alt"));
    }

    #[test]
    fn apply_all_is_all_or_nothing() {
        let tree = record();
        let updates = vec![
            PropertyUpdate::set("language", Node::text("fra")),
            PropertyUpdate::set("identificationInfo[1]/abstract[2]", Node::text("x")),
        ];
        let err = UpdateApplier::apply_all(&tree, &updates).unwrap_err();
        assert!(err.is_navigation(NavigationErrorKind::NotACollection));
        assert_eq!(at(&tree, "language"), &Node::text("eng"));

        let updated = UpdateApplier::apply_all(&tree, &updates[..1]).unwrap();
        assert_eq!(at(updated.as_ref(), "language"), &Node::text("fra"));
    }
}

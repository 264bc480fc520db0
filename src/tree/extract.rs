use crate::tree::node::{Node, Slot, SlotContent, Structure};
use crate::tree::path::{PathExpression, Segment};

/// All nodes reachable by `path`. Unindexed collections fan out over every
/// element; an index picks one element or nothing.
pub fn collect<'a>(root: &'a Structure, path: &PathExpression) -> Vec<&'a Node> {
    let mut found = Vec::new();
    let segments = skip_root(root, path.segments());
    if !segments.is_empty() {
        collect_from(root, segments, &mut found);
    }
    found
}

fn skip_root<'p>(root: &Structure, segments: &'p [Segment]) -> &'p [Segment] {
    match segments.first() {
        Some(first) if first.index.is_none() && first.name == root.type_name && root.resolve(&first.name).is_none() => {
            &segments[1..]
        }
        _ => segments,
    }
}

fn selected<'a>(slot: &'a Slot, index: Option<usize>) -> Vec<&'a Node> {
    match (&slot.content, index) {
        (SlotContent::Singleton(node), None) => vec![node.as_ref()],
        (SlotContent::Singleton(_), Some(_)) => Vec::new(),
        (SlotContent::Collection(nodes), None) => nodes.iter().collect(),
        (SlotContent::Collection(nodes), Some(i)) => i.checked_sub(1).and_then(|i| nodes.get(i)).into_iter().collect(),
    }
}

fn collect_from<'a>(current: &'a Structure, segments: &[Segment], found: &mut Vec<&'a Node>) {
    let (segment, rest) = match segments.split_first() {
        Some(split) => split,
        None => return,
    };
    let Some(slot) = current.resolve(&segment.name) else {
        return;
    };
    for node in selected(slot, segment.index) {
        if rest.is_empty() {
            found.push(node);
        } else if let Some(child) = node.as_structure() {
            collect_from(child, rest, found);
        }
    }
}

/// Copy the parts of `source` addressed by `paths` into a new structure of
/// the same type. Collection elements keep their relative order, and
/// structures left empty by the copy are dropped.
pub fn copy_paths(source: &Structure, paths: &[PathExpression]) -> Structure {
    let mut target = Structure::new(source.type_name.clone());
    for path in paths {
        let segments = skip_root(source, path.segments());
        if !segments.is_empty() {
            copy_into(source, &mut target, segments);
        }
    }
    prune(&mut target);
    target
}

fn copy_into(source: &Structure, target: &mut Structure, segments: &[Segment]) {
    let Some((segment, rest)) = segments.split_first() else {
        return;
    };
    let Some(slot) = source.resolve(&segment.name) else {
        return;
    };

    if rest.is_empty() {
        match (&slot.content, segment.index) {
            (_, None) => target.set_slot(slot.clone()),
            (SlotContent::Collection(nodes), Some(i)) => {
                if let Some(node) = i.checked_sub(1).and_then(|i| nodes.get(i)) {
                    merge_element(target, &segment.name, nodes.len(), i - 1, node.clone());
                }
            }
            (SlotContent::Singleton(_), Some(_)) => {}
        }
        return;
    }

    match &slot.content {
        SlotContent::Singleton(node) => {
            if segment.index.is_some() {
                return;
            }
            if let Node::Structure(child) = node.as_ref() {
                if let Some(holder) = singleton_holder(target, &segment.name, &child.type_name) {
                    copy_into(child, holder, rest);
                }
            }
        }
        SlotContent::Collection(nodes) => {
            let positions: Vec<usize> = match segment.index {
                None => (0..nodes.len()).collect(),
                Some(i) if i >= 1 && i <= nodes.len() => vec![i - 1],
                Some(_) => Vec::new(),
            };
            for position in positions {
                if let Node::Structure(child) = &nodes[position] {
                    if let Some(holder) = element_holder(target, &segment.name, nodes, position) {
                        copy_into(child, holder, rest);
                    }
                }
            }
        }
    }
}

fn singleton_holder<'t>(target: &'t mut Structure, name: &str, type_name: &str) -> Option<&'t mut Structure> {
    let needs_slot = !matches!(
        target.resolve(name).map(|slot| &slot.content),
        Some(SlotContent::Singleton(node)) if matches!(node.as_ref(), Node::Structure(_))
    );
    if needs_slot {
        target.set_slot(Slot::singleton(name, Node::Structure(Structure::new(type_name))));
    }
    match target.resolve_mut(name).map(|slot| &mut slot.content) {
        Some(SlotContent::Singleton(node)) => node.as_structure_mut(),
        _ => None,
    }
}

/// Element holders mirror the source collection one-to-one until pruning.
fn element_holder<'t>(
    target: &'t mut Structure,
    name: &str,
    source: &[Node],
    position: usize,
) -> Option<&'t mut Structure> {
    let aligned = matches!(
        target.resolve(name).map(|slot| &slot.content),
        Some(SlotContent::Collection(nodes)) if nodes.len() == source.len()
    );
    if !aligned {
        let placeholders = source.iter().map(placeholder).collect();
        target.set_slot(Slot::collection(name, placeholders));
    }
    match target.resolve_mut(name).map(|slot| &mut slot.content) {
        Some(SlotContent::Collection(nodes)) => nodes.get_mut(position).and_then(Node::as_structure_mut),
        _ => None,
    }
}

fn merge_element(target: &mut Structure, name: &str, source_len: usize, position: usize, node: Node) {
    let aligned = matches!(
        target.resolve(name).map(|slot| &slot.content),
        Some(SlotContent::Collection(nodes)) if nodes.len() == source_len
    );
    if !aligned {
        let empty = (0..source_len).map(|_| Node::Structure(Structure::new(String::new()))).collect();
        target.set_slot(Slot::collection(name, empty));
    }
    if let Some(SlotContent::Collection(nodes)) = target.resolve_mut(name).map(|slot| &mut slot.content) {
        if let Some(slot) = nodes.get_mut(position) {
            *slot = node;
        }
    }
}

fn placeholder(node: &Node) -> Node {
    match node {
        Node::Structure(s) => Node::Structure(Structure::new(s.type_name.clone())),
        Node::Scalar(_) => Node::Structure(Structure::new(String::new())),
    }
}

fn is_placeholder(node: &Node) -> bool {
    matches!(node, Node::Structure(s) if s.is_empty())
}

fn prune(structure: &mut Structure) {
    for slot in &mut structure.slots {
        match &mut slot.content {
            SlotContent::Singleton(node) => {
                if let Node::Structure(child) = node.as_mut() {
                    prune(child);
                }
            }
            SlotContent::Collection(nodes) => {
                for node in nodes.iter_mut() {
                    if let Node::Structure(child) = node {
                        prune(child);
                    }
                }
                nodes.retain(|node| !is_placeholder(node));
            }
        }
    }
    structure.slots.retain(|slot| match &slot.content {
        SlotContent::Singleton(node) => !is_placeholder(node),
        SlotContent::Collection(nodes) => !nodes.is_empty(),
    });
}

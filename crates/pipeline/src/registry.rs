//! Heterogeneous node registry.
//!
//! Nodes of different concrete types live in one registry, grouped per type
//! in insertion order. Each group is created lazily on its first insert and
//! carries its own clear/copy/size bookkeeping behind the `KindSlot` trait.

use crate::error::PipelineResult;
use crate::node::{Node, NodeHandle};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Identifies one concrete node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKind {
    id: TypeId,
    name: &'static str,
}

impl NodeKind {
    pub fn of<N: Node>() -> Self {
        Self {
            id: TypeId::of::<N>(),
            name: std::any::type_name::<N>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Callback object driven by `NodeRegistry::visit_one_per_kind` and
/// `NodeRegistry::visit_all_of_kind`.
pub trait NodeVisitor {
    /// Kinds this visitor handles, in visiting order. `None` means every
    /// stored kind in first-insertion order.
    fn kinds(&self) -> Option<Vec<NodeKind>> {
        None
    }

    fn visit_element(&mut self, node: &NodeHandle) -> PipelineResult<()> {
        let _ = node;
        Ok(())
    }

    fn visit_collection(&mut self, kind: NodeKind, nodes: &[NodeHandle]) -> PipelineResult<()> {
        let _ = kind;
        nodes.iter().try_for_each(|node| self.visit_element(node))
    }
}

trait KindSlot: Send + Sync {
    fn kind(&self) -> NodeKind;
    fn len(&self) -> usize;
    fn handles(&self) -> Vec<NodeHandle>;
    fn clone_slot(&self) -> Box<dyn KindSlot>;
    fn clear(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct TypedSlot<N: Node> {
    nodes: Vec<Arc<N>>,
}

impl<N: Node> KindSlot for TypedSlot<N> {
    fn kind(&self) -> NodeKind {
        NodeKind::of::<N>()
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn handles(&self) -> Vec<NodeHandle> {
        self.nodes
            .iter()
            .map(|node| node.clone() as NodeHandle)
            .collect()
    }

    fn clone_slot(&self) -> Box<dyn KindSlot> {
        Box::new(TypedSlot {
            nodes: self.nodes.clone(),
        })
    }

    fn clear(&mut self) {
        self.nodes.clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Owns every node of a graph.
#[derive(Default)]
pub struct NodeRegistry {
    slots: Vec<Box<dyn KindSlot>>,
    index: HashMap<TypeId, usize>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `node`, registering its kind on first use.
    pub fn insert<N: Node>(&mut self, node: Arc<N>) -> NodeHandle {
        let handle: NodeHandle = node.clone();
        let position = match self.index.get(&TypeId::of::<N>()) {
            Some(&position) => position,
            None => {
                self.slots.push(Box::new(TypedSlot::<N> { nodes: Vec::new() }));
                self.index.insert(TypeId::of::<N>(), self.slots.len() - 1);
                self.slots.len() - 1
            }
        };
        if let Some(slot) = self.slots[position]
            .as_any_mut()
            .downcast_mut::<TypedSlot<N>>()
        {
            slot.nodes.push(node);
        }
        handle
    }

    /// Nodes of type `N`, in insertion order.
    pub fn of_kind<N: Node>(&self) -> &[Arc<N>] {
        self.index
            .get(&TypeId::of::<N>())
            .and_then(|&position| self.slots[position].as_any().downcast_ref::<TypedSlot<N>>())
            .map(|slot| slot.nodes.as_slice())
            .unwrap_or(&[])
    }

    pub fn count_of_kind<N: Node>(&self) -> usize {
        self.of_kind::<N>().len()
    }

    /// Number of nodes across all kinds.
    pub fn size(&self) -> usize {
        self.slots.iter().map(|slot| slot.len()).sum()
    }

    /// Number of distinct kinds stored.
    pub fn kind_count(&self) -> usize {
        self.slots.len()
    }

    pub fn kinds(&self) -> Vec<NodeKind> {
        self.slots.iter().map(|slot| slot.kind()).collect()
    }

    /// Every node, grouped by kind.
    pub fn nodes(&self) -> Vec<NodeHandle> {
        self.slots.iter().flat_map(|slot| slot.handles()).collect()
    }

    pub fn find(&self, name: &str) -> Option<NodeHandle> {
        self.slots
            .iter()
            .flat_map(|slot| slot.handles())
            .find(|node| node.name() == name)
    }

    /// Looks up a node by name and concrete type.
    pub fn find_as<N: Node>(&self, name: &str) -> Option<Arc<N>> {
        self.of_kind::<N>()
            .iter()
            .find(|node| node.name() == name)
            .cloned()
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.clear();
        }
    }

    fn visited_slots(&self, visitor: &dyn NodeVisitor) -> Vec<&dyn KindSlot> {
        match visitor.kinds() {
            None => self.slots.iter().map(|slot| slot.as_ref()).collect(),
            Some(kinds) => kinds
                .iter()
                .filter_map(|kind| self.index.get(&kind.id))
                .map(|&position| self.slots[position].as_ref())
                .collect(),
        }
    }

    /// Calls `visit_element` once per stored node of every visited kind.
    pub fn visit_one_per_kind<V: NodeVisitor>(&self, visitor: &mut V) -> PipelineResult<()> {
        for slot in self.visited_slots(&*visitor) {
            for node in slot.handles() {
                visitor.visit_element(&node)?;
            }
        }
        Ok(())
    }

    /// Calls `visit_collection` once per visited kind with all of its nodes.
    pub fn visit_all_of_kind<V: NodeVisitor>(&self, visitor: &mut V) -> PipelineResult<()> {
        for slot in self.visited_slots(&*visitor) {
            visitor.visit_collection(slot.kind(), &slot.handles())?;
        }
        Ok(())
    }
}

impl Clone for NodeRegistry {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.iter().map(|slot| slot.clone_slot()).collect(),
            index: self.index.clone(),
        }
    }
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for slot in &self.slots {
            map.entry(&slot.kind().name(), &slot.len());
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Edge;
    use crate::error::StageResult;
    use crate::node::NodeCore;
    use flow_types::{ModuleType, RunContext, TaggedValue};

    struct Alpha(NodeCore);
    struct Beta(NodeCore);

    macro_rules! test_node {
        ($ty:ident) => {
            impl Node for $ty {
                fn core(&self) -> &NodeCore {
                    &self.0
                }
                fn set_first_input(&self, _: &TaggedValue) -> StageResult {
                    Ok(())
                }
                fn process(&self, _: &TaggedValue) -> StageResult {
                    Ok(())
                }
                fn start(&self) -> StageResult {
                    Ok(())
                }
                fn is_done(&self) -> bool {
                    true
                }
                fn as_any(&self) -> &dyn Any {
                    self
                }
            }
        };
    }

    test_node!(Alpha);
    test_node!(Beta);

    fn core(name: &str, index: u8) -> NodeCore {
        NodeCore::new(
            ModuleType::Adder,
            index,
            name,
            Vec::<Edge>::new(),
            false,
            RunContext::new().shared(),
        )
    }

    fn registry() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        registry.insert(Arc::new(Alpha(core("a1", 1))));
        registry.insert(Arc::new(Beta(core("b1", 2))));
        registry.insert(Arc::new(Alpha(core("a2", 3))));
        registry
    }

    #[test]
    fn test_counts_per_kind() {
        let registry = registry();
        assert_eq!(registry.size(), 3);
        assert_eq!(registry.kind_count(), 2);
        assert_eq!(registry.count_of_kind::<Alpha>(), 2);
        assert_eq!(registry.count_of_kind::<Beta>(), 1);
        assert!(registry.find_as::<Beta>("b1").is_some());
        assert!(registry.find_as::<Alpha>("b1").is_none());
        assert_eq!(registry.find("a2").map(|n| n.index()), Some(3));
    }

    struct Names {
        kinds: Option<Vec<NodeKind>>,
        elements: Vec<String>,
    }

    impl NodeVisitor for Names {
        fn kinds(&self) -> Option<Vec<NodeKind>> {
            self.kinds.clone()
        }

        fn visit_element(&mut self, node: &NodeHandle) -> PipelineResult<()> {
            self.elements.push(node.name().to_string());
            Ok(())
        }
    }

    #[test]
    fn test_visit_one_per_kind_follows_declared_kinds() {
        let registry = registry();
        let mut visitor = Names {
            kinds: Some(vec![NodeKind::of::<Beta>(), NodeKind::of::<Alpha>()]),
            elements: vec![],
        };
        registry.visit_one_per_kind(&mut visitor).unwrap();
        assert_eq!(visitor.elements, vec!["b1", "a1", "a2"]);

        let mut only_alpha = Names {
            kinds: Some(vec![NodeKind::of::<Alpha>()]),
            elements: vec![],
        };
        registry.visit_one_per_kind(&mut only_alpha).unwrap();
        assert_eq!(only_alpha.elements, vec!["a1", "a2"]);
    }

    struct Sizes(Vec<usize>);

    impl NodeVisitor for Sizes {
        fn visit_collection(&mut self, _: NodeKind, nodes: &[NodeHandle]) -> PipelineResult<()> {
            self.0.push(nodes.len());
            Ok(())
        }
    }

    #[test]
    fn test_visit_all_of_kind_sees_whole_collections() {
        let registry = registry();
        let mut sizes = Sizes(vec![]);
        registry.visit_all_of_kind(&mut sizes).unwrap();
        assert_eq!(sizes.0, vec![2, 1]);

        let mut names = Names {
            kinds: None,
            elements: vec![],
        };
        registry.visit_all_of_kind(&mut names).unwrap();
        assert_eq!(names.elements, vec!["a1", "a2", "b1"]);
    }

    #[test]
    fn test_clone_copies_collections() {
        let mut original = registry();
        let copy = original.clone();
        original.clear();
        assert_eq!(original.size(), 0);
        assert_eq!(copy.size(), 3);
        assert_eq!(copy.count_of_kind::<Alpha>(), 2);
    }
}

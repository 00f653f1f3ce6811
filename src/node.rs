use crate::{component::ComponentNode, root::RootNode, surface::{Handle, Listener}};
use core::{
	fmt::{self, Display, Formatter},
	sync::atomic::{AtomicU64, Ordering},
};
use serde_json::Value;
use std::collections::BTreeMap;

/// Process-unique node identity, assigned at construction and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
	pub(crate) fn next() -> Self {
		static NEXT: AtomicU64 = AtomicU64::new(1);
		Self(NEXT.fetch_add(1, Ordering::Relaxed))
	}
}

impl Display for NodeId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Reconciliation identity of a node among its siblings.
pub type Key = String;

/// The closed set of node kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeType {
	Root,
	Component,
	Element,
	Comment,
}

impl Display for NodeType {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			NodeType::Root => "root",
			NodeType::Component => "component",
			NodeType::Element => "element",
			NodeType::Comment => "comment",
		})
	}
}

/// An entry of a [`Tree`](`crate::Tree`).
///
/// `parent` is a back-reference only. The tree's arena owns every node.
#[derive(Debug)]
pub struct Node {
	id: NodeId,
	pub(crate) parent: Option<NodeId>,
	pub(crate) kind: NodeKind,
}

#[derive(Debug)]
pub enum NodeKind {
	Root(RootNode),
	Component(ComponentNode),
	Element(Element),
	Comment(Comment),
}

impl Node {
	pub(crate) fn new(kind: NodeKind) -> Self {
		Self::with_id(NodeId::next(), kind)
	}

	pub(crate) fn with_id(id: NodeId, kind: NodeKind) -> Self {
		Self { id, parent: None, kind }
	}

	#[must_use]
	pub fn id(&self) -> NodeId {
		self.id
	}

	#[must_use]
	pub fn parent(&self) -> Option<NodeId> {
		self.parent
	}

	#[must_use]
	pub fn kind(&self) -> &NodeKind {
		&self.kind
	}

	#[must_use]
	pub fn node_type(&self) -> NodeType {
		match self.kind {
			NodeKind::Root(_) => NodeType::Root,
			NodeKind::Component(_) => NodeType::Component,
			NodeKind::Element(_) => NodeType::Element,
			NodeKind::Comment(_) => NodeType::Comment,
		}
	}

	#[must_use]
	pub fn is_root(&self) -> bool {
		matches!(self.kind, NodeKind::Root(_))
	}

	/// `true` for roots as well, as every root is also a component.
	#[must_use]
	pub fn is_component(&self) -> bool {
		matches!(self.kind, NodeKind::Root(_) | NodeKind::Component(_))
	}

	#[must_use]
	pub fn is_element(&self) -> bool {
		matches!(self.kind, NodeKind::Element(_))
	}

	#[must_use]
	pub fn is_comment(&self) -> bool {
		matches!(self.kind, NodeKind::Comment(_))
	}

	#[must_use]
	pub fn as_component(&self) -> Option<&ComponentNode> {
		match &self.kind {
			NodeKind::Root(root) => Some(&root.component),
			NodeKind::Component(component) => Some(component),
			NodeKind::Element(_) | NodeKind::Comment(_) => None,
		}
	}

	pub(crate) fn as_component_mut(&mut self) -> Option<&mut ComponentNode> {
		match &mut self.kind {
			NodeKind::Root(root) => Some(&mut root.component),
			NodeKind::Component(component) => Some(component),
			NodeKind::Element(_) | NodeKind::Comment(_) => None,
		}
	}

	#[must_use]
	pub fn as_root(&self) -> Option<&RootNode> {
		match &self.kind {
			NodeKind::Root(root) => Some(root),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_element(&self) -> Option<&Element> {
		match &self.kind {
			NodeKind::Element(element) => Some(element),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_comment(&self) -> Option<&Comment> {
		match &self.kind {
			NodeKind::Comment(comment) => Some(comment),
			_ => None,
		}
	}

	#[must_use]
	pub fn key(&self) -> Option<&str> {
		match &self.kind {
			NodeKind::Component(component) => component.key(),
			NodeKind::Element(element) => element.key.as_deref(),
			NodeKind::Root(_) | NodeKind::Comment(_) => None,
		}
	}

	/// Whether `other` can be reconciled with `self` in place instead of replacing it.
	///
	/// Requires the same [`NodeType`] and key, as well as the same concrete component type for components and the same name for elements.
	#[must_use]
	pub fn is_compatible(&self, other: &Node) -> bool {
		if self.node_type() != other.node_type() || self.key() != other.key() {
			return false;
		}
		match (&self.kind, &other.kind) {
			(NodeKind::Root(a), NodeKind::Root(b)) => a.component.component_type() == b.component.component_type(),
			(NodeKind::Component(a), NodeKind::Component(b)) => a.component_type() == b.component_type(),
			(NodeKind::Element(a), NodeKind::Element(b)) => a.name == b.name,
			(NodeKind::Comment(_), NodeKind::Comment(_)) => true,
			_ => false,
		}
	}
}

/// A node mirrored by an element on the live surface.
///
/// The mutators here only change the virtual node. Patches are what keep the surface in sync.
#[derive(Clone, Debug, Default)]
pub struct Element {
	pub name: String,
	pub attrs: BTreeMap<String, String>,
	pub dataset: BTreeMap<String, String>,
	pub style: BTreeMap<String, String>,
	/// Semantically a set. Duplicates are tolerated.
	pub class_names: Vec<String>,
	pub listeners: BTreeMap<String, Listener>,
	/// Annotations that are never rendered.
	pub metadata: BTreeMap<String, Value>,
	pub text: Option<String>,
	pub key: Option<Key>,
	pub(crate) children: Vec<NodeId>,
	pub(crate) live: Option<Handle>,
}

impl Element {
	#[must_use]
	pub fn new(name: impl Into<String>) -> Self {
		Self { name: name.into(), ..Self::default() }
	}

	#[must_use]
	pub fn children(&self) -> &[NodeId] {
		&self.children
	}

	/// The live surface node, once attached.
	#[must_use]
	pub fn live(&self) -> Option<Handle> {
		self.live
	}

	pub fn set_attribute(&mut self, name: impl Into<String>, value: impl ToString) {
		self.attrs.insert(name.into(), value.to_string());
	}

	pub fn remove_attribute(&mut self, name: &str) {
		self.attrs.remove(name);
	}

	pub fn set_data_attribute(&mut self, name: impl Into<String>, value: impl ToString) {
		self.dataset.insert(name.into(), value.to_string());
	}

	pub fn remove_data_attribute(&mut self, name: &str) {
		self.dataset.remove(name);
	}

	pub fn add_class_name(&mut self, class_name: impl Into<String>) {
		self.class_names.push(class_name.into());
	}

	/// Removes every occurrence of `class_name`.
	pub fn remove_class_name(&mut self, class_name: &str) {
		self.class_names.retain(|item| item != class_name);
	}

	pub fn set_style_property(&mut self, property: impl Into<String>, value: impl ToString) {
		self.style.insert(property.into(), value.to_string());
	}

	pub fn remove_style_property(&mut self, property: &str) {
		self.style.remove(property);
	}

	pub fn add_listener(&mut self, name: impl Into<String>, listener: Listener) {
		self.listeners.insert(name.into(), listener);
	}

	pub fn remove_listener(&mut self, name: &str) {
		self.listeners.remove(name);
	}
}

/// Placeholder standing in for absent content.
#[derive(Clone, Debug)]
pub struct Comment {
	pub text: String,
	pub(crate) live: Option<Handle>,
}

impl Comment {
	#[must_use]
	pub fn new(text: impl Into<String>) -> Self {
		Self { text: text.into(), live: None }
	}

	#[must_use]
	pub fn live(&self) -> Option<Handle> {
		self.live
	}
}

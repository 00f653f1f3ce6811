//! A headless [`Surface`], for tests and server-side rendering.

use crate::{
	render::Updater,
	surface::{Event, Handle, Listener, Surface, SurfaceError},
};
use core::fmt::Write;
use hashbrown::HashMap;
use std::collections::BTreeMap;
use tracing::{trace, warn};

/// A node of a [`MemorySurface`].
#[derive(Clone, Debug, Default)]
pub struct MemoryNode {
	/// Comments have an empty name and keep their data in `text`.
	pub is_comment: bool,
	pub name: String,
	pub attrs: BTreeMap<String, String>,
	pub dataset: BTreeMap<String, String>,
	pub style: BTreeMap<String, String>,
	pub class_names: Vec<String>,
	pub text: Option<String>,
	pub listeners: BTreeMap<String, Listener>,
	pub children: Vec<Handle>,
	pub parent: Option<Handle>,
}

/// Keeps live nodes in memory and can print them as markup.
///
/// Dispatched events bubble along parent links and are logged, see [`MemorySurface::dispatched`].
#[derive(Debug, Default)]
pub struct MemorySurface {
	next: u64,
	nodes: HashMap<Handle, MemoryNode>,
	dispatched: Vec<(Handle, Event)>,
}

fn escape(text: &str, quotes: bool) -> String {
	let mut escaped = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' if quotes => escaped.push_str("&quot;"),
			c => escaped.push(c),
		}
	}
	escaped
}

impl MemorySurface {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	fn allocate(&mut self, node: MemoryNode) -> Result<Handle, SurfaceError> {
		let next = self.next.checked_add(1).ok_or_else(|| SurfaceError::new("Ran out of handles."))?;
		let handle = Handle::from_raw(self.next);
		self.next = next;
		self.nodes.insert(handle, node);
		Ok(handle)
	}

	/// Creates a detached element to render into.
	///
	/// # Errors
	///
	/// Iff the surface ran out of handles.
	pub fn create_container(&mut self, name: &str) -> Result<Handle, SurfaceError> {
		self.allocate(MemoryNode { name: name.to_owned(), ..MemoryNode::default() })
	}

	#[must_use]
	pub fn get(&self, handle: Handle) -> Option<&MemoryNode> {
		self.nodes.get(&handle)
	}

	#[must_use]
	pub fn children(&self, handle: Handle) -> &[Handle] {
		self.nodes.get(&handle).map_or(&[][..], |node| node.children.as_slice())
	}

	/// How many nodes haven't been released yet, containers included.
	#[must_use]
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Every event dispatched so far, with its target.
	#[must_use]
	pub fn dispatched(&self) -> &[(Handle, Event)] {
		&self.dispatched
	}

	/// `handle` and its descendants as HTML-like markup.
	#[must_use]
	pub fn markup(&self, handle: Handle) -> String {
		let mut markup = String::new();
		self.write_markup(&mut markup, handle);
		markup
	}

	/// The descendants of `handle` as markup.
	#[must_use]
	pub fn inner_markup(&self, handle: Handle) -> String {
		let mut markup = String::new();
		for &child in self.children(handle) {
			self.write_markup(&mut markup, child);
		}
		markup
	}

	fn write_markup(&self, markup: &mut String, handle: Handle) {
		let node = match self.nodes.get(&handle) {
			Some(node) => node,
			None => {
				markup.push_str("<!--released-->");
				return;
			}
		};
		if node.is_comment {
			let _ = write!(markup, "<!--{}-->", node.text.as_deref().unwrap_or_default());
			return;
		}

		let _ = write!(markup, "<{}", node.name);
		for (name, value) in &node.attrs {
			let _ = write!(markup, " {}=\"{}\"", name, escape(value, true));
		}
		for (name, value) in &node.dataset {
			let _ = write!(markup, " data-{}=\"{}\"", name, escape(value, true));
		}
		if !node.class_names.is_empty() {
			let _ = write!(markup, " class=\"{}\"", escape(&node.class_names.join(" "), true));
		}
		if !node.style.is_empty() {
			let style: Vec<_> = node.style.iter().map(|(property, value)| format!("{}: {};", property, value)).collect();
			let _ = write!(markup, " style=\"{}\"", escape(&style.join(" "), true));
		}
		markup.push('>');
		if let Some(text) = &node.text {
			markup.push_str(&escape(text, false));
		}
		for &child in &node.children {
			self.write_markup(markup, child);
		}
		let _ = write!(markup, "</{}>", node.name);
	}

	/// The listeners for `name` that an event at `target` reaches, in the order they'd be called.
	#[must_use]
	pub fn collect_listeners(&self, target: Handle, name: &str, bubbles: bool) -> Vec<Listener> {
		let mut listeners = Vec::new();
		let mut current = Some(target);
		while let Some(handle) = current {
			let node = match self.nodes.get(&handle) {
				Some(node) => node,
				None => break,
			};
			listeners.extend(node.listeners.get(name).cloned());
			if !bubbles || listeners.len() > self.nodes.len() {
				break;
			}
			current = node.parent;
		}
		listeners
	}

	fn node_mut(&mut self, handle: Handle, operation: &str) -> Option<&mut MemoryNode> {
		let node = self.nodes.get_mut(&handle);
		if node.is_none() {
			warn!(?handle, "Failed to {}: Unknown node.", operation);
		}
		node
	}

	/// Takes `child` out of its current parent, if any.
	fn detach(&mut self, child: Handle) {
		let parent = match self.nodes.get_mut(&child).and_then(|child| child.parent.take()) {
			Some(parent) => parent,
			None => return,
		};
		if let Some(parent) = self.nodes.get_mut(&parent) {
			parent.children.retain(|&c| c != child);
		}
	}
}

impl Surface for MemorySurface {
	fn create_element(&mut self, name: &str) -> Result<Handle, SurfaceError> {
		if name.is_empty() {
			return Err(SurfaceError::new("Elements need a name."));
		}
		self.allocate(MemoryNode { name: name.to_owned(), ..MemoryNode::default() })
	}

	fn create_comment(&mut self, text: &str) -> Result<Handle, SurfaceError> {
		self.allocate(MemoryNode { is_comment: true, text: Some(text.to_owned()), ..MemoryNode::default() })
	}

	fn insert_before(&mut self, parent: Handle, child: Handle, reference: Option<Handle>) {
		if reference == Some(child) || !self.nodes.contains_key(&child) || self.node_mut(parent, "insert child").is_none() {
			return;
		}
		self.detach(child);
		if let Some(parent_node) = self.nodes.get_mut(&parent) {
			let index = match reference {
				None => parent_node.children.len(),
				Some(reference) => match parent_node.children.iter().position(|&c| c == reference) {
					Some(index) => index,
					None => {
						warn!(?reference, "Reference node isn't a child of the parent. Appending instead.");
						parent_node.children.len()
					}
				},
			};
			parent_node.children.insert(index, child);
		}
		if let Some(child) = self.nodes.get_mut(&child) {
			child.parent = Some(parent);
		}
	}

	fn remove_child(&mut self, parent: Handle, child: Handle) {
		match self.nodes.get(&child).map(|child| child.parent) {
			Some(Some(actual)) if actual == parent => self.detach(child),
			_ => warn!(?parent, ?child, "Failed to remove child: Not a child of this parent."),
		}
	}

	fn replace_child(&mut self, parent: Handle, new: Handle, old: Handle) {
		if new == old {
			return;
		}
		let index = self.nodes.get(&parent).and_then(|parent| parent.children.iter().position(|&c| c == old));
		let index = match index {
			Some(index) => index,
			None => return warn!(?parent, ?old, "Failed to replace child: Not a child of this parent."),
		};
		self.detach(new);
		// Detaching `new` may have shifted `old` if both were siblings.
		let index = self.nodes.get(&parent).and_then(|parent| parent.children.iter().position(|&c| c == old)).unwrap_or(index);
		if let Some(parent_node) = self.nodes.get_mut(&parent) {
			parent_node.children[index] = new;
		}
		if let Some(old) = self.nodes.get_mut(&old) {
			old.parent = None;
		}
		if let Some(new) = self.nodes.get_mut(&new) {
			new.parent = Some(parent);
		}
	}

	fn set_attribute(&mut self, node: Handle, name: &str, value: &str) {
		if let Some(node) = self.node_mut(node, "set attribute") {
			node.attrs.insert(name.to_owned(), value.to_owned());
		}
	}

	fn remove_attribute(&mut self, node: Handle, name: &str) {
		if let Some(node) = self.node_mut(node, "remove attribute") {
			node.attrs.remove(name);
		}
	}

	fn set_data_attribute(&mut self, node: Handle, name: &str, value: &str) {
		if let Some(node) = self.node_mut(node, "set data attribute") {
			node.dataset.insert(name.to_owned(), value.to_owned());
		}
	}

	fn remove_data_attribute(&mut self, node: Handle, name: &str) {
		if let Some(node) = self.node_mut(node, "remove data attribute") {
			node.dataset.remove(name);
		}
	}

	fn set_style_property(&mut self, node: Handle, property: &str, value: &str) {
		if let Some(node) = self.node_mut(node, "set style property") {
			node.style.insert(property.to_owned(), value.to_owned());
		}
	}

	fn remove_style_property(&mut self, node: Handle, property: &str) {
		if let Some(node) = self.node_mut(node, "remove style property") {
			node.style.remove(property);
		}
	}

	fn add_class_name(&mut self, node: Handle, class_name: &str) {
		if let Some(node) = self.node_mut(node, "add class name") {
			if !node.class_names.iter().any(|c| c == class_name) {
				node.class_names.push(class_name.to_owned());
			}
		}
	}

	fn remove_class_name(&mut self, node: Handle, class_name: &str) {
		if let Some(node) = self.node_mut(node, "remove class name") {
			node.class_names.retain(|c| c != class_name);
		}
	}

	fn set_text(&mut self, node: Handle, text: Option<&str>) {
		let children = match self.node_mut(node, "set text") {
			Some(node) if node.is_comment => {
				node.text = Some(text.unwrap_or_default().to_owned());
				return;
			}
			Some(node) => {
				node.text = text.map(str::to_owned);
				if text.is_some() {
					std::mem::take(&mut node.children)
				} else {
					Vec::new()
				}
			}
			None => return,
		};
		for child in children {
			if let Some(child) = self.nodes.get_mut(&child) {
				child.parent = None;
			}
		}
	}

	fn add_listener(&mut self, node: Handle, name: &str, listener: &Listener) {
		if let Some(node) = self.node_mut(node, "add listener") {
			node.listeners.insert(name.to_owned(), listener.clone());
		}
	}

	fn remove_listener(&mut self, node: Handle, name: &str) {
		if let Some(node) = self.node_mut(node, "remove listener") {
			node.listeners.remove(name);
		}
	}

	fn dispatch(&mut self, target: Handle, event: &Event) {
		trace!(?target, name = %event.name, "Dispatching event.");
		self.dispatched.push((target, event.clone()));
		for listener in self.collect_listeners(target, &event.name, event.bubbles) {
			listener.call(event);
		}
	}

	fn release(&mut self, node: Handle) {
		if self.nodes.remove(&node).is_none() {
			warn!(?node, "Released an unknown node.");
		}
	}
}

impl<P> Updater<P, MemorySurface> {
	/// Dispatches `event` at `target` and calls the listeners it reaches outside of the surface borrow, so they may update this tree.
	///
	/// Returns how many listeners were called.
	pub fn fire(&self, target: Handle, event: &Event) -> usize {
		let listeners = self.with_surface(|surface| {
			surface.dispatched.push((target, event.clone()));
			surface.collect_listeners(target, &event.name, event.bubbles)
		});
		for listener in &listeners {
			listener.call(event);
		}
		listeners.len()
	}
}

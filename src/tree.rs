use crate::{
	app::Dispatch,
	component::{Broadcast, Component, ComponentNode, Hook, RenderContext},
	node::{Comment, Element, Node, NodeId, NodeKind, NodeType},
	root::{Host, RootNode},
	service::Service,
	surface::{Event, Handle, Surface},
	template::Template,
	Error,
};
use core::any::Any;
use hashbrown::HashMap;
use serde_json::Value;
use std::rc::Rc;
use tracing::{instrument, trace, warn};

/// Arena owning every node of one or more trees.
///
/// Nodes refer to each other by [`NodeId`]. Children are owned through the arena, parents are plain back-references.
/// Nodes materialised from templates live here unattached until a [`Patch`](`crate::Patch`) adopts them.
#[derive(Debug, Default)]
pub struct Tree {
	nodes: HashMap<NodeId, Node>,
	pub(crate) broadcasts: Vec<Broadcast>,
}

/// A parent element, possibly synthesized for a [`RootNode`]'s container.
#[derive(Debug)]
pub enum ElementRef<'a> {
	Node(NodeId, &'a Element),
	Container(Element),
}

impl ElementRef<'_> {
	#[must_use]
	pub fn element(&self) -> &Element {
		match self {
			ElementRef::Node(_, element) => element,
			ElementRef::Container(element) => element,
		}
	}

	/// [`None`] for synthesized container elements, which aren't part of the tree.
	#[must_use]
	pub fn id(&self) -> Option<NodeId> {
		match self {
			ElementRef::Node(id, _) => Some(*id),
			ElementRef::Container(_) => None,
		}
	}

	#[must_use]
	pub fn live(&self) -> Option<Handle> {
		self.element().live
	}
}

/// The topmost element above a node, or the node itself if it has no parent element.
#[derive(Debug)]
pub enum RootElement<'a> {
	Element(ElementRef<'a>),
	Node(NodeId),
}

fn unexpected(node: &Node, expected: NodeType) -> Error {
	Error::UnexpectedNodeType { id: node.id(), expected, actual: node.node_type() }
}

impl Tree {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	#[must_use]
	pub fn contains(&self, id: NodeId) -> bool {
		self.nodes.contains_key(&id)
	}

	#[must_use]
	pub fn get(&self, id: NodeId) -> Option<&Node> {
		self.nodes.get(&id)
	}

	/// # Errors
	///
	/// [`Error::UnknownNode`] iff `id` isn't in this tree.
	pub fn node(&self, id: NodeId) -> Result<&Node, Error> {
		self.nodes.get(&id).ok_or(Error::UnknownNode(id))
	}

	pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, Error> {
		self.nodes.get_mut(&id).ok_or(Error::UnknownNode(id))
	}

	/// # Errors
	///
	/// Iff `id` is unknown or not an element.
	pub fn element(&self, id: NodeId) -> Result<&Element, Error> {
		let node = self.node(id)?;
		node.as_element().ok_or_else(|| unexpected(node, NodeType::Element))
	}

	/// Mutable access to an element's attributes, classes, styles, listeners and so on.
	///
	/// Changes made here are not mirrored onto the live surface.
	///
	/// # Errors
	///
	/// Iff `id` is unknown or not an element.
	pub fn element_mut(&mut self, id: NodeId) -> Result<&mut Element, Error> {
		let node = self.node_mut(id)?;
		let actual = node.node_type();
		match &mut node.kind {
			NodeKind::Element(element) => Ok(element),
			_ => Err(Error::UnexpectedNodeType { id, expected: NodeType::Element, actual }),
		}
	}

	/// Roots count as components here.
	///
	/// # Errors
	///
	/// Iff `id` is unknown or neither a component nor a root.
	pub fn component(&self, id: NodeId) -> Result<&ComponentNode, Error> {
		let node = self.node(id)?;
		node.as_component().ok_or_else(|| unexpected(node, NodeType::Component))
	}

	pub(crate) fn component_mut(&mut self, id: NodeId) -> Result<&mut ComponentNode, Error> {
		let node = self.node_mut(id)?;
		let actual = node.node_type();
		match &mut node.kind {
			NodeKind::Root(root) => Ok(&mut root.component),
			NodeKind::Component(component) => Ok(component),
			_ => Err(Error::UnexpectedNodeType { id, expected: NodeType::Component, actual }),
		}
	}

	/// # Errors
	///
	/// Iff `id` is unknown or not a comment.
	pub fn comment(&self, id: NodeId) -> Result<&Comment, Error> {
		let node = self.node(id)?;
		node.as_comment().ok_or_else(|| unexpected(node, NodeType::Comment))
	}

	pub(crate) fn comment_mut(&mut self, id: NodeId) -> Result<&mut Comment, Error> {
		let node = self.node_mut(id)?;
		let actual = node.node_type();
		match &mut node.kind {
			NodeKind::Comment(comment) => Ok(comment),
			_ => Err(Error::UnexpectedNodeType { id, expected: NodeType::Comment, actual }),
		}
	}

	/// # Errors
	///
	/// Iff `id` is unknown or not a root.
	pub fn root(&self, id: NodeId) -> Result<&RootNode, Error> {
		let node = self.node(id)?;
		node.as_root().ok_or_else(|| unexpected(node, NodeType::Root))
	}

	fn insert(&mut self, node: Node) -> NodeId {
		let id = node.id();
		self.nodes.insert(id, node);
		id
	}

	/// Adds a detached element. Its children and live node are reset.
	pub fn create_element(&mut self, mut element: Element) -> NodeId {
		crate::assert(element.children.is_empty(), "New elements can't have children yet");
		element.children.clear();
		element.live = None;
		self.insert(Node::new(NodeKind::Element(element)))
	}

	/// Adds a comment, optionally already pointing at `parent`.
	pub fn create_comment(&mut self, text: impl Into<String>, parent: Option<NodeId>) -> NodeId {
		let mut node = Node::new(NodeKind::Comment(Comment::new(text)));
		node.parent = parent;
		self.insert(node)
	}

	/// Adds a detached component of type `C`, showing its placeholder.
	pub fn create_component<C: Component + Default>(&mut self, props: C::Props) -> NodeId {
		self.insert_component(ComponentNode::new(Box::new(C::default()), Rc::new(props), None))
	}

	/// Adds a root bound to `container`.
	pub fn create_root(&mut self, container: Handle) -> NodeId {
		self.insert_root(ComponentNode::new(Box::new(Host), Rc::new(()), None), container, None)
	}

	pub(crate) fn insert_component(&mut self, component: ComponentNode) -> NodeId {
		self.insert_with_placeholder(NodeKind::Component, component)
	}

	pub(crate) fn insert_root(&mut self, component: ComponentNode, container: Handle, dispatch: Option<Dispatch>) -> NodeId {
		self.insert_with_placeholder(|component| NodeKind::Root(RootNode::new(component, container, dispatch)), component)
	}

	fn insert_with_placeholder(&mut self, kind: impl FnOnce(ComponentNode) -> NodeKind, mut component: ComponentNode) -> NodeId {
		let id = NodeId::next();
		let comment = self.create_comment(component.name(), Some(id));
		component.comment = Some(comment);
		self.insert(Node::with_id(id, kind(component)))
	}

	/// Points `root` at a new container. Existing live nodes are not moved.
	///
	/// # Errors
	///
	/// Iff `root` is unknown or not a root.
	pub fn set_container(&mut self, root: NodeId, container: Handle) -> Result<(), Error> {
		let node = self.node_mut(root)?;
		let actual = node.node_type();
		match &mut node.kind {
			NodeKind::Root(node) => {
				node.set_container(container);
				Ok(())
			}
			_ => Err(Error::UnexpectedNodeType { id: root, expected: NodeType::Root, actual }),
		}
	}

	/// The nearest element above `id`.
	///
	/// Above a root, that's an element synthesized from its container on each call.
	#[must_use]
	pub fn parent_element(&self, id: NodeId) -> Option<ElementRef<'_>> {
		let node = self.nodes.get(&id)?;
		if let NodeKind::Root(root) = &node.kind {
			return Some(ElementRef::Container(root.parent_element(id)));
		}

		let mut current = node.parent;
		for _ in 0..=self.nodes.len() {
			let parent_id = current?;
			let parent = self.nodes.get(&parent_id)?;
			match &parent.kind {
				NodeKind::Element(element) => return Some(ElementRef::Node(parent_id, element)),
				NodeKind::Root(root) => return Some(ElementRef::Container(root.parent_element(parent_id))),
				NodeKind::Component(_) | NodeKind::Comment(_) => current = parent.parent,
			}
		}
		crate::assert(false, "Parent links must not form a cycle");
		None
	}

	#[must_use]
	pub fn root_element(&self, id: NodeId) -> RootElement<'_> {
		let mut top = match self.parent_element(id) {
			Some(element) => element,
			None => return RootElement::Node(id),
		};
		for _ in 0..=self.nodes.len() {
			let next = match &top {
				ElementRef::Node(element_id, _) => self.parent_element(*element_id),
				ElementRef::Container(_) => None,
			};
			match next {
				Some(next) => top = next,
				None => return RootElement::Element(top),
			}
		}
		crate::assert(false, "Parent links must not form a cycle");
		RootElement::Element(top)
	}

	/// The element rendered by `id`, looking through nested components.
	#[must_use]
	pub fn child_element(&self, id: NodeId) -> Option<NodeId> {
		let mut current = id;
		for _ in 0..=self.nodes.len() {
			let child = self.nodes.get(&current)?.as_component()?.child?;
			let child_node = self.nodes.get(&child)?;
			match child_node.kind {
				NodeKind::Element(_) => return Some(child),
				NodeKind::Component(_) => current = child,
				NodeKind::Root(_) | NodeKind::Comment(_) => return None,
			}
		}
		None
	}

	/// The placeholder comment standing in for `id`'s absent content, looking through nested components.
	#[must_use]
	pub fn placeholder(&self, id: NodeId) -> Option<NodeId> {
		let mut current = id;
		for _ in 0..=self.nodes.len() {
			let component = self.nodes.get(&current)?.as_component()?;
			if let Some(comment) = component.comment {
				return Some(comment);
			}
			let child = component.child?;
			if !self.nodes.get(&child)?.is_component() {
				return None;
			}
			current = child;
		}
		None
	}

	/// The live surface node representing `id`.
	///
	/// Components are represented by their [`child_element`](`Tree::child_element`), or else by their [`placeholder`](`Tree::placeholder`).
	#[must_use]
	pub fn live_ref(&self, id: NodeId) -> Option<Handle> {
		match &self.nodes.get(&id)?.kind {
			NodeKind::Element(element) => element.live,
			NodeKind::Comment(comment) => comment.live,
			NodeKind::Root(_) | NodeKind::Component(_) => match self.child_element(id) {
				Some(element) => self.element(element).ok()?.live,
				None => self.comment(self.placeholder(id)?).ok()?.live,
			},
		}
	}

	/// [`Node::is_compatible`], with absent nodes never being compatible.
	#[must_use]
	pub fn is_compatible(&self, a: Option<NodeId>, b: Option<NodeId>) -> bool {
		match (a.and_then(|a| self.nodes.get(&a)), b.and_then(|b| self.nodes.get(&b))) {
			(Some(a), Some(b)) => a.is_compatible(b),
			_ => false,
		}
	}

	/// Children as listed by `id`, including a component's placeholder comment.
	#[must_use]
	pub fn child_nodes(&self, id: NodeId) -> Vec<NodeId> {
		match self.nodes.get(&id).map(|node| &node.kind) {
			Some(NodeKind::Element(element)) => element.children.clone(),
			Some(NodeKind::Root(RootNode { component, .. }) | NodeKind::Component(component)) => component.child.or(component.comment).into_iter().collect(),
			Some(NodeKind::Comment(_)) | None => Vec::new(),
		}
	}

	/// `id` and every node it owns, parents before children.
	///
	/// Listed children that have since been adopted elsewhere are skipped.
	#[must_use]
	pub fn pre_order(&self, id: NodeId) -> Vec<NodeId> {
		self.walk(id, true)
	}

	/// `id` and every node it owns, children before parents.
	#[must_use]
	pub fn post_order(&self, id: NodeId) -> Vec<NodeId> {
		let mut order = self.walk(id, false);
		order.reverse();
		order
	}

	fn walk(&self, id: NodeId, children_in_order: bool) -> Vec<NodeId> {
		let mut order = Vec::new();
		let mut stack = vec![id];
		while let Some(current) = stack.pop() {
			if !self.nodes.contains_key(&current) {
				continue;
			}
			if order.len() >= self.nodes.len() {
				crate::assert(false, "Child links must not form a cycle");
				break;
			}
			order.push(current);
			let owned = self.child_nodes(current).into_iter().filter(|child| self.nodes.get(child).map_or(false, |child| child.parent == Some(current)));
			let start = stack.len();
			stack.extend(owned);
			if children_in_order {
				stack[start..].reverse();
			}
		}
		order
	}

	/// Inserts `child` into the element `parent` at `index`, or appends it.
	///
	/// # Errors
	///
	/// Iff a node is unknown, `parent` isn't an element or `index` is past the end.
	pub fn insert_child(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) -> Result<(), Error> {
		self.node(child)?;
		let element = self.element_mut(parent)?;
		let len = element.children.len();
		let index = index.unwrap_or(len);
		if index > len {
			return Err(Error::IndexOutOfRange { parent, index, len });
		}
		element.children.insert(index, child);
		self.node_mut(child)?.parent = Some(parent);
		Ok(())
	}

	/// Removes `child` from `parent`.
	///
	/// Elements drop the first occurrence by identity and report whether there was one.
	/// Components fall back to a fresh placeholder, see [`Tree::remove_component_child`].
	///
	/// # Errors
	///
	/// Iff `parent` is unknown or a comment.
	pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<bool, Error> {
		let node = self.node_mut(parent)?;
		let actual = node.node_type();
		match &mut node.kind {
			NodeKind::Element(element) => {
				let index = match element.children.iter().position(|&c| c == child) {
					Some(index) => index,
					None => return Ok(false),
				};
				element.children.remove(index);
				if let Some(child) = self.nodes.get_mut(&child) {
					child.parent = None;
				}
				Ok(true)
			}
			NodeKind::Root(_) | NodeKind::Component(_) => self.remove_component_child(parent, child).map(|_| true),
			NodeKind::Comment(_) => Err(Error::UnexpectedNodeType { id: parent, expected: NodeType::Element, actual }),
		}
	}

	/// Moves `child` of the element `parent` from `from` to `to`.
	///
	/// `children[from]` must be `child`.
	///
	/// # Errors
	///
	/// Iff `parent` is unknown or not an element, or an index is out of range.
	pub fn move_child(&mut self, parent: NodeId, child: NodeId, from: usize, to: usize) -> Result<(), Error> {
		let element = self.element_mut(parent)?;
		let len = element.children.len();
		if from >= len || to >= len {
			return Err(Error::IndexOutOfRange { parent, index: from.max(to), len });
		}
		crate::assert(element.children[from] == child, "The moved child must be at its `from` index");
		let moved = element.children.remove(from);
		element.children.insert(to, moved);
		Ok(())
	}

	/// Makes `child` the content of `component`, detaching and returning its placeholder.
	///
	/// # Errors
	///
	/// Iff a node is unknown or `component` isn't a component.
	pub fn append_child(&mut self, component: NodeId, child: NodeId) -> Result<Option<Node>, Error> {
		self.node(child)?;
		let target = self.component_mut(component)?;
		crate::assert(target.child.is_none(), "A component can only have one child");
		let previous = target.child.replace(child);
		let comment = target.comment.take();

		if let Some(previous) = previous {
			if let Some(previous) = self.nodes.get_mut(&previous) {
				previous.parent = None;
			}
		}
		self.node_mut(child)?.parent = Some(component);

		Ok(comment.and_then(|comment| self.nodes.remove(&comment)).map(|mut comment| {
			comment.parent = None;
			comment
		}))
	}

	/// Removes the content of `component` and gives it a fresh placeholder, labelled with the component's name.
	///
	/// Returns the id of the new placeholder.
	///
	/// # Errors
	///
	/// Iff `component` is unknown or isn't a component.
	pub fn remove_component_child(&mut self, component: NodeId, child: NodeId) -> Result<NodeId, Error> {
		let target = self.component_mut(component)?;
		crate::assert(target.child == Some(child), "Only a component's own child can be removed from it");
		let name = target.name();
		let removed = match target.child.take() {
			Some(removed) => removed,
			None => {
				if let Some(comment) = target.comment {
					return Ok(comment);
				}
				// Neither child nor placeholder: Restore the invariant below.
				child
			}
		};
		if let Some(removed) = self.nodes.get_mut(&removed) {
			removed.parent = None;
		}

		let comment = self.create_comment(name, Some(component));
		self.component_mut(component)?.comment = Some(comment);
		Ok(comment)
	}

	/// Puts `new` where `old` is under `parent`. `old` is detached but stays in the arena.
	///
	/// # Errors
	///
	/// Iff a node is unknown, `old` isn't a child of `parent` or `parent` is a comment.
	pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> Result<(), Error> {
		self.node(new)?;
		let node = self.node_mut(parent)?;
		let actual = node.node_type();
		match &mut node.kind {
			NodeKind::Element(element) => match element.children.iter().position(|&c| c == old) {
				Some(index) => element.children[index] = new,
				None => return Err(Error::UnknownNode(old)),
			},
			NodeKind::Root(RootNode { component, .. }) | NodeKind::Component(component) => {
				if component.child != Some(old) {
					return Err(Error::UnknownNode(old));
				}
				component.child = Some(new);
			}
			NodeKind::Comment(_) => return Err(Error::UnexpectedNodeType { id: parent, expected: NodeType::Element, actual }),
		}
		self.node_mut(old)?.parent = None;
		self.node_mut(new)?.parent = Some(parent);
		Ok(())
	}

	/// Drops `id` and everything it owns from the arena, without running any hooks.
	pub fn remove_subtree(&mut self, id: NodeId) -> Vec<Node> {
		let order = self.pre_order(id);
		if let Some(parent) = self.nodes.get(&id).and_then(Node::parent) {
			if let Some(NodeKind::Element(element)) = self.nodes.get_mut(&parent).map(|parent| &mut parent.kind) {
				element.children.retain(|&c| c != id);
			}
		}
		order.into_iter().filter_map(|id| self.nodes.remove(&id)).collect()
	}

	/// Subscribes the component `id` to `service` until it is destroyed.
	///
	/// # Errors
	///
	/// Iff `id` isn't a component, see also [`Context::connect_to`](`crate::Context::connect_to`).
	pub fn connect_to<S: Service + ?Sized>(&mut self, id: NodeId, service: &S, listeners: S::Listeners) -> Result<(), Error> {
		self.component_mut(id)?.connect_to(id, service, listeners)
	}

	/// Dispatches a bubbling, composed event named `name` from the live node of `id`'s root element.
	///
	/// Logs a warning instead if nothing there is live.
	#[instrument(skip(self, surface, detail))]
	pub fn broadcast(&self, surface: &mut dyn Surface, id: NodeId, name: &str, detail: Value) {
		let target = match self.root_element(id) {
			RootElement::Element(element) => element.live(),
			RootElement::Node(node) => self.live_ref(node),
		};
		match target {
			Some(target) => surface.dispatch(target, &Event::broadcast(name, detail)),
			None => warn!("Nothing live to broadcast {:?} from.", name),
		}
	}

	pub(crate) fn flush_broadcasts(&mut self, surface: &mut dyn Surface) {
		for Broadcast { from, name, detail } in std::mem::take(&mut self.broadcasts) {
			self.broadcast(surface, from, &name, detail);
		}
	}

	/// The dispatcher of the root above `id`.
	pub(crate) fn dispatch_for(&self, id: NodeId) -> Option<Dispatch> {
		let mut current = Some(id);
		for _ in 0..=self.nodes.len() {
			let node = self.nodes.get(&current?)?;
			if let NodeKind::Root(root) = &node.kind {
				return root.dispatch().cloned();
			}
			current = node.parent;
		}
		None
	}

	pub(crate) fn render_context(&self, id: NodeId) -> RenderContext {
		RenderContext::new(self.dispatch_for(id))
	}

	/// Replaces the props of `component`, running `on_props_received` iff `notify`.
	pub(crate) fn receive_props(&mut self, component: NodeId, props: Rc<dyn Any>, notify: bool) -> Result<(), Error> {
		self.component_mut(component)?.set_props(props);
		if notify {
			self.run_hook(component, Hook::PropsReceived)?;
		}
		Ok(())
	}

	/// Renders `component` from its current props.
	pub(crate) fn render_component(&self, component: NodeId) -> Result<Option<Template>, Error> {
		let cx = self.render_context(component);
		Ok(self.component(component)?.render(&cx))
	}

	pub(crate) fn run_hook(&mut self, id: NodeId, hook: Hook) -> Result<(), Error> {
		let dispatch = self.dispatch_for(id);
		let Self { nodes, broadcasts } = self;
		let node = nodes.get_mut(&id).ok_or(Error::UnknownNode(id))?;
		let node_type = node.node_type();
		match node.as_component_mut() {
			Some(component) => {
				component.run_hook(id, hook, dispatch, broadcasts);
				Ok(())
			}
			None => Err(Error::UnexpectedNodeType { id, expected: NodeType::Component, actual: node_type }),
		}
	}

	/// Drops whatever is left of a materialised template once a patch batch has adopted what it needs.
	pub(crate) fn discard(&mut self, candidate: NodeId) {
		let attached = self.nodes.get(&candidate).map_or(false, |node| node.parent.is_some());
		if attached {
			return;
		}
		let discarded = self.remove_subtree(candidate);
		trace!(%candidate, count = discarded.len(), "Discarded unadopted nodes.");
	}
}

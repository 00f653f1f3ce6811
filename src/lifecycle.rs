//! Moving subtrees onto and off the live surface, with the hooks that go along with it.

use crate::{
	component::{Hook, Stage},
	node::{NodeId, NodeKind, NodeType},
	surface::{Handle, Surface},
	Error, Tree,
};
use tracing::{instrument, trace, trace_span};

/// Creates live nodes for `id` and everything it owns, and returns the live node representing `id`.
///
/// Components run `on_created` parent-first on the way down. The result isn't inserted anywhere yet.
#[instrument(skip(tree, surface))]
pub(crate) fn mount(tree: &mut Tree, surface: &mut dyn Surface, id: NodeId) -> Result<Handle, Error> {
	match tree.node(id)?.node_type() {
		NodeType::Element => mount_element(tree, surface, id),
		NodeType::Comment => {
			let handle = surface.create_comment(&tree.comment(id)?.text)?;
			tree.comment_mut(id)?.live = Some(handle);
			Ok(handle)
		}
		NodeType::Root | NodeType::Component => {
			let component = tree.component_mut(id)?;
			if component.stage() == Stage::Constructed {
				component.set_stage(Stage::Created);
				tree.run_hook(id, Hook::Created)?;
			}

			let component = tree.component(id)?;
			match component.child.or(component.comment) {
				Some(content) => mount(tree, surface, content),
				None => {
					crate::assert(false, "A component must have either a child or a placeholder");
					Err(Error::NotLive(id))
				}
			}
		}
	}
}

fn mount_element(tree: &mut Tree, surface: &mut dyn Surface, id: NodeId) -> Result<Handle, Error> {
	let (handle, children) = {
		let element = tree.element(id)?;
		let handle = surface.create_element(&element.name)?;
		for (name, value) in &element.attrs {
			surface.set_attribute(handle, name, value);
		}
		for (name, value) in &element.dataset {
			surface.set_data_attribute(handle, name, value);
		}
		for (property, value) in &element.style {
			surface.set_style_property(handle, property, value);
		}
		for class_name in &element.class_names {
			surface.add_class_name(handle, class_name);
		}
		if element.text.is_some() {
			surface.set_text(handle, element.text.as_deref());
		}
		for (name, listener) in &element.listeners {
			surface.add_listener(handle, name, listener);
		}
		(handle, element.children.clone())
	};
	tree.element_mut(id)?.live = Some(handle);

	for child in children {
		let child = mount(tree, surface, child)?;
		surface.insert_before(handle, child, None);
	}
	Ok(handle)
}

/// Runs `on_attached` children-first for every created component in the subtree at `id`.
pub(crate) fn attach(tree: &mut Tree, id: NodeId) -> Result<(), Error> {
	let span = trace_span!("Attaching", %id);
	let _enter = span.enter();
	for node in tree.post_order(id) {
		transition(tree, node, |stage| stage == Stage::Created, Stage::Attached, Hook::Attached)?;
	}
	Ok(())
}

/// Runs `on_detached` parent-first for every attached component in the subtree at `id`.
///
/// Only call this once the subtree's live nodes are out of the surface.
pub(crate) fn detach(tree: &mut Tree, id: NodeId) -> Result<(), Error> {
	let span = trace_span!("Detaching", %id);
	let _enter = span.enter();
	for node in tree.pre_order(id) {
		transition(tree, node, |stage| matches!(stage, Stage::Created | Stage::Attached), Stage::Detached, Hook::Detached)?;
	}
	Ok(())
}

fn transition(tree: &mut Tree, id: NodeId, from: impl Fn(Stage) -> bool, to: Stage, hook: Hook) -> Result<(), Error> {
	let component = match tree.node_mut(id)?.as_component_mut() {
		Some(component) => component,
		None => return Ok(()),
	};
	if !from(component.stage()) {
		return Ok(());
	}
	component.set_stage(to);
	tree.run_hook(id, hook)
}

/// Tears down the subtree at `id` children-first and drops it from `tree`.
///
/// Each component runs its cleanup tasks in registration order, becomes [`Stage::Destroyed`], runs `on_destroyed` and loses its sandbox.
/// Live nodes are released on `surface`.
pub(crate) fn destroy(tree: &mut Tree, surface: &mut dyn Surface, id: NodeId) -> Result<(), Error> {
	let span = trace_span!("Destroying", %id);
	let _enter = span.enter();

	for node in tree.post_order(id) {
		let component = match tree.node_mut(node)?.as_component_mut() {
			Some(component) => component,
			None => continue,
		};
		if component.stage() == Stage::Destroyed {
			continue;
		}
		component.run_cleanup_tasks(node);
		component.set_stage(Stage::Destroyed);
		tree.run_hook(node, Hook::Destroyed)?;
		tree.component_mut(node)?.drop_sandbox();
	}

	let removed = tree.remove_subtree(id);
	let mut released = 0_usize;
	for node in removed {
		let live = match node.kind {
			NodeKind::Element(element) => element.live,
			NodeKind::Comment(comment) => comment.live,
			NodeKind::Root(_) | NodeKind::Component(_) => None,
		};
		if let Some(live) = live {
			surface.release(live);
			released += 1;
		}
	}
	trace!(released, "Released live nodes.");
	Ok(())
}

/// Detaches and destroys `id`, the usual fate of a node a patch took out of the live tree.
pub(crate) fn retire(tree: &mut Tree, surface: &mut dyn Surface, id: NodeId) -> Result<(), Error> {
	detach(tree, id)?;
	destroy(tree, surface, id)
}

/// Puts the placeholder of `root` into its container and attaches it.
#[instrument(skip(tree, surface))]
pub(crate) fn mount_root(tree: &mut Tree, surface: &mut dyn Surface, root: NodeId) -> Result<(), Error> {
	let container = tree.root(root)?.container();
	let handle = mount(tree, surface, root)?;
	surface.insert_before(container, handle, None);
	attach(tree, root)
}

/// Takes everything below and including `root` off the surface and destroys it.
#[instrument(skip(tree, surface))]
pub(crate) fn unmount_root(tree: &mut Tree, surface: &mut dyn Surface, root: NodeId) -> Result<(), Error> {
	let container = tree.root(root)?.container();
	if let Some(live) = tree.live_ref(root) {
		surface.remove_child(container, live);
	}
	retire(tree, surface, root)
}

use crate::{
	component::Hook,
	lifecycle,
	node::NodeId,
	surface::{Handle, Listener, Surface},
	Error, Tree,
};
use serde_json::Value;
use tracing::{trace, trace_span};

/// One step of reconciling the live tree with a candidate.
///
/// Nodes named as `child` or `new` usually belong to the candidate and are adopted into the live tree when the patch is applied.
/// Indices refer to the parent's children as they are right before the patch, so patches must be applied in the order they were calculated.
#[derive(Clone, Debug, PartialEq)]
pub enum Patch {
	/// Appends to an element, or gives a component its content in place of its placeholder.
	AppendChild { parent: NodeId, child: NodeId },
	/// Removes from an element, or replaces a component's content with a fresh placeholder.
	RemoveChild { parent: NodeId, child: NodeId },
	ReplaceChild { parent: NodeId, old: NodeId, new: NodeId },
	InsertChild { parent: NodeId, child: NodeId, index: usize },
	MoveChild { parent: NodeId, child: NodeId, from: usize, to: usize },
	/// Hands the candidate's props to `target` and runs `on_props_received`.
	UpdateComponent { target: NodeId, candidate: NodeId },
	/// Runs `on_updated` once the patches for `target`'s content are through.
	ComponentUpdated { target: NodeId },
	SetAttribute { target: NodeId, name: String, value: String },
	RemoveAttribute { target: NodeId, name: String },
	SetDataAttribute { target: NodeId, name: String, value: String },
	RemoveDataAttribute { target: NodeId, name: String },
	SetStyleProperty { target: NodeId, property: String, value: String },
	RemoveStyleProperty { target: NodeId, property: String },
	AddClassName { target: NodeId, class_name: String },
	RemoveClassName { target: NodeId, class_name: String },
	AddListener { target: NodeId, name: String, listener: Listener },
	ReplaceListener { target: NodeId, name: String, listener: Listener },
	RemoveListener { target: NodeId, name: String },
	SetMetadata { target: NodeId, name: String, value: Value },
	RemoveMetadata { target: NodeId, name: String },
	SetText { target: NodeId, text: String },
	RemoveText { target: NodeId },
	SetCommentText { target: NodeId, text: String },
}

/// The live node children of `parent` are inserted into.
fn live_parent(tree: &Tree, parent: NodeId) -> Option<Handle> {
	let node = tree.node(parent).ok()?;
	if node.is_component() {
		tree.parent_element(parent)?.live()
	} else {
		node.as_element()?.live()
	}
}

fn is_live(tree: &Tree, parent: NodeId) -> bool {
	tree.live_ref(parent).is_some()
}

impl Patch {
	/// Applies this patch to both `tree` and `surface`.
	///
	/// # Errors
	///
	/// Iff a referenced node is missing or of the wrong type, an index is out of range, or the surface fails to create a node.
	#[allow(clippy::too_many_lines)]
	pub fn apply(self, tree: &mut Tree, surface: &mut dyn Surface) -> Result<(), Error> {
		let span = trace_span!("Applying patch", patch = ?self);
		let _enter = span.enter();

		match self {
			Patch::AppendChild { parent, child } => {
				let live = is_live(tree, parent);
				let handle = lifecycle::mount(tree, surface, child)?;
				if tree.node(parent)?.is_component() {
					let placeholder = tree.append_child(parent, child)?;
					let old = placeholder.and_then(|placeholder| placeholder.as_comment().and_then(|comment| comment.live()));
					match (live_parent(tree, parent), old) {
						(Some(container), Some(old)) => {
							surface.replace_child(container, handle, old);
							surface.release(old);
						}
						(Some(container), None) => surface.insert_before(container, handle, None),
						(None, old) => {
							if let Some(old) = old {
								surface.release(old);
							}
						}
					}
				} else {
					tree.insert_child(parent, child, None)?;
					if let Some(container) = live_parent(tree, parent) {
						surface.insert_before(container, handle, None);
					}
				}
				if live {
					lifecycle::attach(tree, child)?;
				}
			}

			Patch::RemoveChild { parent, child } => {
				let old = tree.live_ref(child);
				let container = live_parent(tree, parent);
				if tree.node(parent)?.is_component() {
					let comment = tree.remove_component_child(parent, child)?;
					if let (Some(container), Some(old)) = (container, old) {
						let handle = lifecycle::mount(tree, surface, comment)?;
						surface.replace_child(container, handle, old);
					}
				} else {
					if !tree.remove_child(parent, child)? {
						return Err(Error::UnknownNode(child));
					}
					if let (Some(container), Some(old)) = (container, old) {
						surface.remove_child(container, old);
					}
				}
				lifecycle::retire(tree, surface, child)?;
			}

			Patch::ReplaceChild { parent, old, new } => {
				let live = is_live(tree, parent);
				let old_handle = tree.live_ref(old);
				let handle = lifecycle::mount(tree, surface, new)?;
				tree.replace_child(parent, old, new)?;
				if let (Some(container), Some(old_handle)) = (live_parent(tree, parent), old_handle) {
					surface.replace_child(container, handle, old_handle);
				}
				lifecycle::retire(tree, surface, old)?;
				if live {
					lifecycle::attach(tree, new)?;
				}
			}

			Patch::InsertChild { parent, child, index } => {
				let live = is_live(tree, parent);
				let next = tree.element(parent)?.children().get(index).copied();
				let handle = lifecycle::mount(tree, surface, child)?;
				tree.insert_child(parent, child, Some(index))?;
				if let Some(container) = live_parent(tree, parent) {
					surface.insert_before(container, handle, next.and_then(|next| tree.live_ref(next)));
				}
				if live {
					lifecycle::attach(tree, child)?;
				}
			}

			Patch::MoveChild { parent, child, from, to } => {
				tree.move_child(parent, child, from, to)?;
				let next = tree.element(parent)?.children().get(to + 1).copied();
				if let (Some(container), Some(handle)) = (live_parent(tree, parent), tree.live_ref(child)) {
					surface.insert_before(container, handle, next.and_then(|next| tree.live_ref(next)));
				}
			}

			Patch::UpdateComponent { target, candidate } => {
				let props = tree.component(candidate)?.erased_props().clone();
				tree.component_mut(target)?.set_props(props);
				tree.run_hook(target, Hook::PropsReceived)?;
			}

			Patch::ComponentUpdated { target } => tree.run_hook(target, Hook::Updated)?,

			Patch::SetAttribute { target, name, value } => {
				let element = tree.element_mut(target)?;
				if let Some(live) = element.live {
					surface.set_attribute(live, &name, &value);
				}
				element.set_attribute(name, value);
			}
			Patch::RemoveAttribute { target, name } => {
				let element = tree.element_mut(target)?;
				if let Some(live) = element.live {
					surface.remove_attribute(live, &name);
				}
				element.remove_attribute(&name);
			}
			Patch::SetDataAttribute { target, name, value } => {
				let element = tree.element_mut(target)?;
				if let Some(live) = element.live {
					surface.set_data_attribute(live, &name, &value);
				}
				element.set_data_attribute(name, value);
			}
			Patch::RemoveDataAttribute { target, name } => {
				let element = tree.element_mut(target)?;
				if let Some(live) = element.live {
					surface.remove_data_attribute(live, &name);
				}
				element.remove_data_attribute(&name);
			}
			Patch::SetStyleProperty { target, property, value } => {
				let element = tree.element_mut(target)?;
				if let Some(live) = element.live {
					surface.set_style_property(live, &property, &value);
				}
				element.set_style_property(property, value);
			}
			Patch::RemoveStyleProperty { target, property } => {
				let element = tree.element_mut(target)?;
				if let Some(live) = element.live {
					surface.remove_style_property(live, &property);
				}
				element.remove_style_property(&property);
			}
			Patch::AddClassName { target, class_name } => {
				let element = tree.element_mut(target)?;
				if let Some(live) = element.live {
					surface.add_class_name(live, &class_name);
				}
				element.add_class_name(class_name);
			}
			Patch::RemoveClassName { target, class_name } => {
				let element = tree.element_mut(target)?;
				if let Some(live) = element.live {
					surface.remove_class_name(live, &class_name);
				}
				element.remove_class_name(&class_name);
			}
			Patch::AddListener { target, name, listener } | Patch::ReplaceListener { target, name, listener } => {
				let element = tree.element_mut(target)?;
				if let Some(live) = element.live {
					surface.add_listener(live, &name, &listener);
				}
				element.add_listener(name, listener);
			}
			Patch::RemoveListener { target, name } => {
				let element = tree.element_mut(target)?;
				if let Some(live) = element.live {
					surface.remove_listener(live, &name);
				}
				element.remove_listener(&name);
			}

			Patch::SetMetadata { target, name, value } => {
				tree.element_mut(target)?.metadata.insert(name, value);
			}
			Patch::RemoveMetadata { target, name } => {
				tree.element_mut(target)?.metadata.remove(&name);
			}

			Patch::SetText { target, text } => {
				let element = tree.element_mut(target)?;
				if let Some(live) = element.live {
					surface.set_text(live, Some(&text));
				}
				element.text = Some(text);
			}
			Patch::RemoveText { target } => {
				let element = tree.element_mut(target)?;
				if let Some(live) = element.live {
					surface.set_text(live, None);
				}
				element.text = None;
			}
			Patch::SetCommentText { target, text } => {
				let comment = tree.comment_mut(target)?;
				if let Some(live) = comment.live {
					surface.set_text(live, Some(&text));
				}
				comment.text = text;
			}
		}

		trace!("Applied.");
		Ok(())
	}

	/// The node whose own state or children this patch changes.
	#[must_use]
	pub fn target(&self) -> NodeId {
		match self {
			Patch::AppendChild { parent, .. }
			| Patch::RemoveChild { parent, .. }
			| Patch::ReplaceChild { parent, .. }
			| Patch::InsertChild { parent, .. }
			| Patch::MoveChild { parent, .. } => *parent,
			Patch::UpdateComponent { target, .. }
			| Patch::ComponentUpdated { target }
			| Patch::SetAttribute { target, .. }
			| Patch::RemoveAttribute { target, .. }
			| Patch::SetDataAttribute { target, .. }
			| Patch::RemoveDataAttribute { target, .. }
			| Patch::SetStyleProperty { target, .. }
			| Patch::RemoveStyleProperty { target, .. }
			| Patch::AddClassName { target, .. }
			| Patch::RemoveClassName { target, .. }
			| Patch::AddListener { target, .. }
			| Patch::ReplaceListener { target, .. }
			| Patch::RemoveListener { target, .. }
			| Patch::SetMetadata { target, .. }
			| Patch::RemoveMetadata { target, .. }
			| Patch::SetText { target, .. }
			| Patch::RemoveText { target }
			| Patch::SetCommentText { target, .. } => *target,
		}
	}
}

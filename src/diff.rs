use crate::{
	node::{Element, NodeId, NodeKind},
	patch::Patch,
	Error, Tree,
};
use core::hash::Hash;
use hashbrown::HashSet;
use std::collections::BTreeMap;
use tracing::{instrument, trace, trace_span};

/// Computes the [`Patch`]es that turn a live subtree into a candidate.
///
/// The tree is only read. Applying the result in order (see [`Patch::apply`]) adopts candidate nodes where needed.
#[derive(Debug)]
pub struct Diff<'a> {
	tree: &'a Tree,
	patches: Vec<Patch>,
}

impl<'a> Diff<'a> {
	/// Diffs the content `old` of `parent` against `new`.
	///
	/// # Errors
	///
	/// Iff a node isn't in `tree`.
	#[instrument(skip(tree))]
	pub fn calculate(tree: &'a Tree, old: Option<NodeId>, new: Option<NodeId>, parent: NodeId) -> Result<Vec<Patch>, Error> {
		let mut diff = Self { tree, patches: Vec::new() };
		diff.diff_content(old, new, parent)?;
		trace!(count = diff.patches.len(), "Calculated patches.");
		Ok(diff.patches)
	}

	fn diff_content(&mut self, old: Option<NodeId>, new: Option<NodeId>, parent: NodeId) -> Result<(), Error> {
		match (old, new) {
			(None, None) => (),
			(None, Some(child)) => self.patches.push(Patch::AppendChild { parent, child }),
			(Some(child), None) => self.patches.push(Patch::RemoveChild { parent, child }),
			(Some(old), Some(new)) => self.diff_or_replace(old, new, parent)?,
		}
		Ok(())
	}

	fn diff_or_replace(&mut self, old: NodeId, new: NodeId, parent: NodeId) -> Result<(), Error> {
		if self.tree.is_compatible(Some(old), Some(new)) {
			self.diff_node(old, new)
		} else {
			self.patches.push(Patch::ReplaceChild { parent, old, new });
			Ok(())
		}
	}

	fn diff_node(&mut self, old: NodeId, new: NodeId) -> Result<(), Error> {
		let tree = self.tree;
		match (&tree.node(old)?.kind, &tree.node(new)?.kind) {
			(NodeKind::Component(_) | NodeKind::Root(_), NodeKind::Component(_) | NodeKind::Root(_)) => {
				let span = trace_span!("Diffing component", %old, %new);
				let _enter = span.enter();
				let (old_child, new_child) = (tree.component(old)?.child(), tree.component(new)?.child());
				self.patches.push(Patch::UpdateComponent { target: old, candidate: new });
				self.diff_content(old_child, new_child, old)?;
				self.patches.push(Patch::ComponentUpdated { target: old });
			}
			(NodeKind::Element(a), NodeKind::Element(b)) => {
				let span = trace_span!("Diffing element", %old, %new, name = %a.name);
				let _enter = span.enter();
				self.diff_element(old, a, b)?;
			}
			(NodeKind::Comment(a), NodeKind::Comment(b)) => {
				if a.text != b.text {
					self.patches.push(Patch::SetCommentText { target: old, text: b.text.clone() });
				}
			}
			_ => crate::assert(false, "Only compatible nodes can be diffed"),
		}
		Ok(())
	}

	fn diff_element(&mut self, target: NodeId, a: &Element, b: &Element) -> Result<(), Error> {
		for (name, value) in diff_map(&a.attrs, &b.attrs) {
			self.patches.push(match value {
				Some(value) => Patch::SetAttribute { target, name: name.clone(), value: value.clone() },
				None => Patch::RemoveAttribute { target, name: name.clone() },
			});
		}
		for (name, value) in diff_map(&a.dataset, &b.dataset) {
			self.patches.push(match value {
				Some(value) => Patch::SetDataAttribute { target, name: name.clone(), value: value.clone() },
				None => Patch::RemoveDataAttribute { target, name: name.clone() },
			});
		}
		for (property, value) in diff_map(&a.style, &b.style) {
			self.patches.push(match value {
				Some(value) => Patch::SetStyleProperty { target, property: property.clone(), value: value.clone() },
				None => Patch::RemoveStyleProperty { target, property: property.clone() },
			});
		}
		for (name, value) in diff_map(&a.metadata, &b.metadata) {
			self.patches.push(match value {
				Some(value) => Patch::SetMetadata { target, name: name.clone(), value: value.clone() },
				None => Patch::RemoveMetadata { target, name: name.clone() },
			});
		}

		for class_name in unique(&a.class_names).filter(|class_name| !b.class_names.contains(*class_name)) {
			self.patches.push(Patch::RemoveClassName { target, class_name: class_name.clone() });
		}
		for class_name in unique(&b.class_names).filter(|class_name| !a.class_names.contains(*class_name)) {
			self.patches.push(Patch::AddClassName { target, class_name: class_name.clone() });
		}

		for (name, listener) in &b.listeners {
			match a.listeners.get(name) {
				None => self.patches.push(Patch::AddListener { target, name: name.clone(), listener: listener.clone() }),
				Some(previous) if previous != listener => self.patches.push(Patch::ReplaceListener { target, name: name.clone(), listener: listener.clone() }),
				Some(_) => (),
			}
		}
		for name in a.listeners.keys().filter(|name| !b.listeners.contains_key(*name)) {
			self.patches.push(Patch::RemoveListener { target, name: name.clone() });
		}

		if a.text.is_some() && b.text.is_none() {
			self.patches.push(Patch::RemoveText { target });
		}
		self.diff_children(target, &a.children, &b.children)?;
		if let Some(text) = &b.text {
			if a.text.as_ref() != Some(text) {
				self.patches.push(Patch::SetText { target, text: text.clone() });
			}
		}
		Ok(())
	}

	fn diff_children(&mut self, parent: NodeId, old: &[NodeId], new: &[NodeId]) -> Result<(), Error> {
		match (self.keys(old), self.keys(new)) {
			(Some(old_keys), Some(new_keys)) if !old.is_empty() && !new.is_empty() => self.diff_keyed(parent, old, &old_keys, new, &new_keys),
			_ => self.diff_positional(parent, old, new),
		}
	}

	/// The keys of `children`, iff all of them are keyed and no key repeats.
	fn keys(&self, children: &[NodeId]) -> Option<Vec<String>> {
		let mut seen = HashSet::with_capacity(children.len());
		children
			.iter()
			.map(|&child| {
				let key = self.tree.get(child)?.key()?;
				seen.insert(key).then(|| key.to_owned())
			})
			.collect()
	}

	fn diff_keyed(&mut self, parent: NodeId, old: &[NodeId], old_keys: &[String], new: &[NodeId], new_keys: &[String]) -> Result<(), Error> {
		let span = trace_span!("Diffing keyed children", %parent, old = old.len(), new = new.len());
		let _enter = span.enter();

		// Mirrors the parent's children as the patches so far leave them.
		let mut current: Vec<(NodeId, &str)> = Vec::with_capacity(new.len());
		for (&child, key) in old.iter().zip(old_keys) {
			if new_keys.contains(key) {
				current.push((child, key.as_str()));
			} else {
				self.patches.push(Patch::RemoveChild { parent, child });
			}
		}

		for (index, (&new_child, key)) in new.iter().zip(new_keys).enumerate() {
			match current.iter().position(|&(_, current_key)| current_key == key.as_str()) {
				Some(from) => {
					let (old_child, _) = current[from];
					if from != index {
						self.patches.push(Patch::MoveChild { parent, child: old_child, from, to: index });
						let moved = current.remove(from);
						current.insert(index, moved);
					}
					if self.tree.is_compatible(Some(old_child), Some(new_child)) {
						self.diff_node(old_child, new_child)?;
					} else {
						self.patches.push(Patch::ReplaceChild { parent, old: old_child, new: new_child });
						current[index].0 = new_child;
					}
				}
				None => {
					self.patches.push(Patch::InsertChild { parent, child: new_child, index });
					current.insert(index, (new_child, key.as_str()));
				}
			}
		}
		Ok(())
	}

	fn diff_positional(&mut self, parent: NodeId, old: &[NodeId], new: &[NodeId]) -> Result<(), Error> {
		let common = old.len().min(new.len());
		for (&old_child, &new_child) in old.iter().zip(new) {
			self.diff_or_replace(old_child, new_child, parent)?;
		}
		for (index, &child) in new.iter().enumerate().skip(common) {
			self.patches.push(Patch::InsertChild { parent, child, index });
		}
		for &child in old[common..].iter().rev() {
			self.patches.push(Patch::RemoveChild { parent, child });
		}
		Ok(())
	}
}

/// Changed or added entries as `Some`, removed ones as `None`.
fn diff_map<'m, V: PartialEq>(a: &'m BTreeMap<String, V>, b: &'m BTreeMap<String, V>) -> impl Iterator<Item = (&'m String, Option<&'m V>)> {
	b.iter()
		.filter(move |(name, value)| a.get(*name) != Some(*value))
		.map(|(name, value)| (name, Some(value)))
		.chain(a.keys().filter(move |name| !b.contains_key(*name)).map(|name| (name, None)))
}

fn unique<T: Eq + Hash>(items: &[T]) -> impl Iterator<Item = &T> {
	let mut seen = HashSet::new();
	items.iter().filter(move |item| seen.insert(*item))
}

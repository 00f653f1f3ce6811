use crate::node::NodeId;
use core::any::{Any, TypeId};
use hashbrown::HashMap;

/// Per-component state, keyed by type.
///
/// A component's sandbox is only created on first access through [`Context::sandbox`](`crate::Context::sandbox`)
/// and is dropped right after the component's `on_destroyed` hook.
#[derive(Debug)]
pub struct Sandbox {
	owner: NodeId,
	slots: HashMap<TypeId, Box<dyn Any>>,
}

impl Sandbox {
	pub(crate) fn new(owner: NodeId) -> Self {
		Self { owner, slots: HashMap::new() }
	}

	#[must_use]
	pub fn owner(&self) -> NodeId {
		self.owner
	}

	#[must_use]
	pub fn get<T: 'static>(&self) -> Option<&T> {
		self.slots.get(&TypeId::of::<T>()).and_then(|slot| slot.downcast_ref())
	}

	pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
		self.slots.get_mut(&TypeId::of::<T>()).and_then(|slot| slot.downcast_mut())
	}

	/// Stores `value`, returning the previous value of the same type.
	pub fn insert<T: 'static>(&mut self, value: T) -> Option<T> {
		self.slots.insert(TypeId::of::<T>(), Box::new(value)).and_then(|previous| previous.downcast().ok()).map(|previous| *previous)
	}

	pub fn remove<T: 'static>(&mut self) -> Option<T> {
		self.slots.remove(&TypeId::of::<T>()).and_then(|previous| previous.downcast().ok()).map(|previous| *previous)
	}

	pub fn get_or_insert_with<T: 'static>(&mut self, f: impl FnOnce() -> T) -> &mut T {
		let slot = self.slots.entry(TypeId::of::<T>()).or_insert_with(|| Box::new(f()));
		match slot.downcast_mut() {
			Some(value) => value,
			None => unreachable!("sandbox slots are keyed by their value's type"),
		}
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.slots.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn typed_slots() {
		let mut sandbox = Sandbox::new(NodeId::next());
		assert!(sandbox.is_empty());
		assert_eq!(sandbox.insert(1_u32), None);
		assert_eq!(sandbox.insert(2_u32), Some(1));
		*sandbox.get_or_insert_with(String::new) += "abc";
		assert_eq!(sandbox.get::<String>().map(String::as_str), Some("abc"));
		assert_eq!(sandbox.get::<u32>(), Some(&2));
		assert_eq!(sandbox.remove::<u32>(), Some(2));
		assert_eq!(sandbox.len(), 1);
	}
}

//! The live output surface that patches are mirrored onto.
//!
//! Virtual nodes only ever hold opaque [`Handle`]s. Each [`Surface`] implementation maps those to its own node representation,
//! which keeps the tree free of surface-specific types and lets the same tree drive a DOM ([`DomSurface`](`crate::dom::DomSurface`))
//! or a headless [`MemorySurface`](`crate::memory::MemorySurface`).

use core::fmt::{self, Debug, Formatter};
use serde_json::Value;
use std::rc::Rc;

/// Opaque reference to a node on a [`Surface`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u64);

impl Handle {
	#[must_use]
	pub fn from_raw(raw: u64) -> Self {
		Self(raw)
	}

	#[must_use]
	pub fn into_raw(self) -> u64 {
		self.0
	}
}

/// A named notification travelling through the surface.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
	pub name: String,
	pub detail: Value,
	pub bubbles: bool,
	pub composed: bool,
}

impl Event {
	#[must_use]
	pub fn new(name: impl Into<String>) -> Self {
		Self { name: name.into(), detail: Value::Null, bubbles: false, composed: false }
	}

	/// A bubbling, composed event, as sent by [`Tree::broadcast`](`crate::Tree::broadcast`).
	#[must_use]
	pub fn broadcast(name: impl Into<String>, detail: Value) -> Self {
		Self { name: name.into(), detail, bubbles: true, composed: true }
	}
}

/// An event handler. Equality is identity.
#[derive(Clone)]
pub struct Listener(Rc<dyn Fn(&Event)>);

impl Listener {
	pub fn new(handler: impl 'static + Fn(&Event)) -> Self {
		Self(Rc::new(handler))
	}

	pub fn call(&self, event: &Event) {
		(self.0)(event)
	}
}

impl PartialEq for Listener {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl Eq for Listener {}

impl Debug for Listener {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Listener").field(&Rc::as_ptr(&self.0).cast::<()>()).finish()
	}
}

#[derive(thiserror::Error, Debug)]
#[error("{message}")]
pub struct SurfaceError {
	pub message: String,
}

impl SurfaceError {
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}
}

/// A live output surface.
///
/// Structural operations follow DOM semantics: inserting a node that is already attached somewhere moves it.
///
/// Only node creation can fail. Implementations log (and otherwise skip) failing mutations,
/// so a misbehaving host can't leave a patch batch half-applied in the virtual tree.
pub trait Surface {
	/// # Errors
	///
	/// Iff the surface can't create an element called `name`.
	fn create_element(&mut self, name: &str) -> Result<Handle, SurfaceError>;

	/// # Errors
	///
	/// Iff the surface can't create a comment.
	fn create_comment(&mut self, text: &str) -> Result<Handle, SurfaceError>;

	/// Inserts `child` into `parent` before `reference`, or at the end if `reference` is [`None`].
	fn insert_before(&mut self, parent: Handle, child: Handle, reference: Option<Handle>);
	fn remove_child(&mut self, parent: Handle, child: Handle);
	fn replace_child(&mut self, parent: Handle, new: Handle, old: Handle);

	fn set_attribute(&mut self, node: Handle, name: &str, value: &str);
	fn remove_attribute(&mut self, node: Handle, name: &str);
	fn set_data_attribute(&mut self, node: Handle, name: &str, value: &str);
	fn remove_data_attribute(&mut self, node: Handle, name: &str);
	fn set_style_property(&mut self, node: Handle, property: &str, value: &str);
	fn remove_style_property(&mut self, node: Handle, property: &str);
	fn add_class_name(&mut self, node: Handle, class_name: &str);
	fn remove_class_name(&mut self, node: Handle, class_name: &str);

	/// Sets the text content of an element, or the data of a comment.
	fn set_text(&mut self, node: Handle, text: Option<&str>);

	/// Installs `listener` for `name` on `node`, replacing any previous one for the same name.
	fn add_listener(&mut self, node: Handle, name: &str, listener: &Listener);
	fn remove_listener(&mut self, node: Handle, name: &str);

	/// Dispatches `event` with `target` as its target.
	fn dispatch(&mut self, target: Handle, event: &Event);

	/// Forgets `node`. Called once a handle is no longer referenced by the virtual tree.
	fn release(&mut self, node: Handle);
}

use crate::{
	app::{Dispatch, Reducer},
	component::{Component, ComponentNode},
	node::{Element, NodeId},
	surface::Handle,
};
use core::fmt::{self, Debug, Formatter};

/// A component that can sit at the top of an [`App`](`crate::App`).
pub trait RootComponent: Component {
	/// The state the app starts from, given the defaults passed to [`App::mount`](`crate::App::mount`).
	fn initial_state(&self, default_props: Self::Props) -> Self::Props {
		default_props
	}

	/// State transitions, applied in order to every dispatched [`Action`](`crate::Action`).
	fn reducers(&self) -> Vec<Reducer<Self::Props>> {
		Vec::new()
	}
}

/// Behaviour of roots created by [`render`](`crate::render()`).
#[derive(Debug, Default)]
pub(crate) struct Host;

impl Component for Host {
	type Props = ();

	fn name() -> &'static str {
		"Root"
	}
}

impl RootComponent for Host {}

/// The boundary between a component tree and the container hosting it.
pub struct RootNode {
	pub(crate) component: ComponentNode,
	container: Handle,
	dispatch: Option<Dispatch>,
}

impl Debug for RootNode {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("RootNode")
			.field("component", &self.component)
			.field("container", &self.container)
			.field("dispatch", &self.dispatch.is_some())
			.finish()
	}
}

impl RootNode {
	pub(crate) fn new(component: ComponentNode, container: Handle, dispatch: Option<Dispatch>) -> Self {
		Self { component, container, dispatch }
	}

	#[must_use]
	pub fn component(&self) -> &ComponentNode {
		&self.component
	}

	#[must_use]
	pub fn container(&self) -> Handle {
		self.container
	}

	pub(crate) fn set_container(&mut self, container: Handle) {
		self.container = container;
	}

	#[must_use]
	pub fn dispatch(&self) -> Option<&Dispatch> {
		self.dispatch.as_ref()
	}

	/// A fresh stand-in for the container: an element called `root` whose only child is this root and whose live node is the container.
	///
	/// Built anew on each call so it always reflects the current container.
	#[must_use]
	pub fn parent_element(&self, id: NodeId) -> Element {
		let mut element = Element::new("root");
		element.children.push(id);
		element.live = Some(self.container);
		element
	}
}

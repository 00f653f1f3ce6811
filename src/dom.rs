//! The browser DOM as a [`Surface`].

use crate::surface::{Event, Handle, Listener, Surface, SurfaceError};
use hashbrown::HashMap;
use serde_json::Value;
use tracing::{error, instrument, trace, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

/// Maps [`Handle`]s to DOM nodes and keeps the JavaScript side of event listeners alive.
///
/// Listeners are only freed once their node is [released](`Surface::release`) or the listener is replaced.
/// Dropping the surface while its nodes are still in the document makes their listeners throw when called.
pub struct DomSurface {
	document: web_sys::Document,
	next: u64,
	nodes: HashMap<Handle, web_sys::Node>,
	closures: HashMap<(Handle, String), Closure<dyn Fn(web_sys::Event)>>,
}

impl core::fmt::Debug for DomSurface {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("DomSurface").field("nodes", &self.nodes.len()).field("closures", &self.closures.len()).finish_non_exhaustive()
	}
}

/// Converts a DOM event, reading the detail of [***CustomEvent***](https://developer.mozilla.org/en-US/docs/Web/API/CustomEvent)s as JSON.
fn translate(event: &web_sys::Event) -> Event {
	let detail = event
		.dyn_ref::<web_sys::CustomEvent>()
		.and_then(|custom| js_sys::JSON::stringify(&custom.detail()).ok())
		.and_then(|json| json.as_string())
		.and_then(|json| serde_json::from_str(&json).ok())
		.unwrap_or(Value::Null);
	Event {
		name: event.type_(),
		detail,
		bubbles: event.bubbles(),
		composed: event.composed(),
	}
}

impl DomSurface {
	#[must_use]
	pub fn new(document: web_sys::Document) -> Self {
		Self {
			document,
			next: 0,
			nodes: HashMap::new(),
			closures: HashMap::new(),
		}
	}

	/// Registers an existing node, usually a container to render into.
	///
	/// # Errors
	///
	/// Iff the surface ran out of handles.
	pub fn adopt(&mut self, node: web_sys::Node) -> Result<Handle, SurfaceError> {
		let next = self.next.checked_add(1).ok_or_else(|| SurfaceError::new("Ran out of handles."))?;
		let handle = Handle::from_raw(self.next);
		self.next = next;
		self.nodes.insert(handle, node);
		Ok(handle)
	}

	#[must_use]
	pub fn node(&self, handle: Handle) -> Option<&web_sys::Node> {
		self.nodes.get(&handle)
	}

	fn get(&self, handle: Handle, operation: &str) -> Option<&web_sys::Node> {
		let node = self.nodes.get(&handle);
		if node.is_none() {
			warn!(?handle, "Failed to {}: Unknown node.", operation);
		}
		node
	}

	fn element(&self, handle: Handle, operation: &str) -> Option<&web_sys::Element> {
		let element = self.get(handle, operation)?.dyn_ref::<web_sys::Element>();
		if element.is_none() {
			warn!(?handle, "Failed to {}: Not an element.", operation);
		}
		element
	}

	fn html_element(&self, handle: Handle, operation: &str) -> Option<&web_sys::HtmlElement> {
		let element = self.get(handle, operation)?.dyn_ref::<web_sys::HtmlElement>();
		if element.is_none() {
			warn!(?handle, "Failed to {}: Not an HTML element.", operation);
		}
		element
	}
}

fn log_failure<T>(operation: &str, result: Result<T, JsValue>) {
	if let Err(error) = result {
		error!("Failed to {}: {:?}", operation, error);
	}
}

impl Surface for DomSurface {
	fn create_element(&mut self, name: &str) -> Result<Handle, SurfaceError> {
		let element = self.document.create_element(name).map_err(|error| SurfaceError::new(format!("Failed to create element {:?}: {:?}", name, error)))?;
		self.adopt(element.into())
	}

	fn create_comment(&mut self, text: &str) -> Result<Handle, SurfaceError> {
		let comment = self.document.create_comment(text);
		self.adopt(comment.into())
	}

	fn insert_before(&mut self, parent: Handle, child: Handle, reference: Option<Handle>) {
		let (parent, child) = match (self.get(parent, "insert child"), self.get(child, "insert child")) {
			(Some(parent), Some(child)) => (parent, child),
			_ => return,
		};
		let reference = reference.and_then(|reference| self.get(reference, "insert child"));
		log_failure("insert child", parent.insert_before(child, reference));
	}

	fn remove_child(&mut self, parent: Handle, child: Handle) {
		if let (Some(parent), Some(child)) = (self.get(parent, "remove child"), self.get(child, "remove child")) {
			log_failure("remove child", parent.remove_child(child));
		}
	}

	fn replace_child(&mut self, parent: Handle, new: Handle, old: Handle) {
		if let (Some(parent), Some(new), Some(old)) = (self.get(parent, "replace child"), self.get(new, "replace child"), self.get(old, "replace child")) {
			log_failure("replace child", parent.replace_child(new, old));
		}
	}

	fn set_attribute(&mut self, node: Handle, name: &str, value: &str) {
		if let Some(element) = self.element(node, "set attribute") {
			log_failure("set attribute", element.set_attribute(name, value));
		}
	}

	fn remove_attribute(&mut self, node: Handle, name: &str) {
		if let Some(element) = self.element(node, "remove attribute") {
			log_failure("remove attribute", element.remove_attribute(name));
		}
	}

	fn set_data_attribute(&mut self, node: Handle, name: &str, value: &str) {
		if let Some(element) = self.element(node, "set data attribute") {
			log_failure("set data attribute", element.set_attribute(&format!("data-{}", name), value));
		}
	}

	fn remove_data_attribute(&mut self, node: Handle, name: &str) {
		if let Some(element) = self.element(node, "remove data attribute") {
			log_failure("remove data attribute", element.remove_attribute(&format!("data-{}", name)));
		}
	}

	fn set_style_property(&mut self, node: Handle, property: &str, value: &str) {
		if let Some(element) = self.html_element(node, "set style property") {
			log_failure("set style property", element.style().set_property(property, value));
		}
	}

	fn remove_style_property(&mut self, node: Handle, property: &str) {
		if let Some(element) = self.html_element(node, "remove style property") {
			log_failure("remove style property", element.style().remove_property(property));
		}
	}

	fn add_class_name(&mut self, node: Handle, class_name: &str) {
		if let Some(element) = self.element(node, "add class name") {
			log_failure("add class name", element.class_list().add_1(class_name));
		}
	}

	fn remove_class_name(&mut self, node: Handle, class_name: &str) {
		if let Some(element) = self.element(node, "remove class name") {
			log_failure("remove class name", element.class_list().remove_1(class_name));
		}
	}

	fn set_text(&mut self, node: Handle, text: Option<&str>) {
		if let Some(node) = self.get(node, "set text") {
			node.set_text_content(text);
		}
	}

	#[instrument(skip(self, listener))]
	fn add_listener(&mut self, node: Handle, name: &str, listener: &Listener) {
		self.remove_listener(node, name);
		let target = match self.get(node, "add listener") {
			Some(target) => target.clone(),
			None => return,
		};

		let listener = listener.clone();
		let closure = Closure::wrap(Box::new(move |event: web_sys::Event| listener.call(&translate(&event))) as Box<dyn Fn(web_sys::Event)>);
		match target.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref()) {
			Ok(()) => {
				self.closures.insert((node, name.to_owned()), closure);
			}
			Err(error) => error!("Failed to add listener: {:?}", error),
		}
	}

	fn remove_listener(&mut self, node: Handle, name: &str) {
		let closure = match self.closures.remove(&(node, name.to_owned())) {
			Some(closure) => closure,
			None => return,
		};
		if let Some(target) = self.nodes.get(&node) {
			log_failure("remove listener", target.remove_event_listener_with_callback(name, closure.as_ref().unchecked_ref()));
		}
		trace!(?node, name, "Freed listener.");
	}

	fn dispatch(&mut self, target: Handle, event: &Event) {
		let target = match self.get(target, "dispatch event") {
			Some(target) => target,
			None => return,
		};

		let init = web_sys::CustomEventInit::new();
		init.set_bubbles(event.bubbles);
		init.set_composed(event.composed);
		match serde_json::to_string(&event.detail).map(|json| js_sys::JSON::parse(&json)) {
			Ok(Ok(detail)) => init.set_detail(&detail),
			Ok(Err(error)) => error!("Failed to convert event detail: {:?}", error),
			Err(error) => error!("Failed to serialise event detail: {}", error),
		}

		match web_sys::CustomEvent::new_with_event_init_dict(&event.name, &init) {
			Ok(custom) => log_failure("dispatch event", target.dispatch_event(&custom)),
			Err(error) => error!("Failed to create event {:?}: {:?}", event.name, error),
		}
	}

	fn release(&mut self, node: Handle) {
		let names: Vec<String> = self.closures.keys().filter(|(owner, _)| *owner == node).map(|(_, name)| name.clone()).collect();
		for name in names {
			self.remove_listener(node, &name);
		}
		if self.nodes.remove(&node).is_none() {
			warn!(?node, "Released an unknown node.");
		}
	}
}

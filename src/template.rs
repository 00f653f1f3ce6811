//! Declarative descriptions of UI, materialised into nodes by [`create_from_template`](`crate::component_tree::create_from_template`).

use crate::{
	component::{AnyComponent, Component},
	node::Key,
	surface::Listener,
};
use core::{
	any::{Any, TypeId},
	fmt::{self, Debug, Formatter},
};
use serde_json::Value;
use std::{collections::BTreeMap, rc::Rc};

#[derive(Clone, Debug)]
pub enum Template {
	Element(ElementTemplate),
	Component(ComponentTemplate),
}

impl Template {
	#[must_use]
	pub fn element(name: impl Into<String>) -> ElementTemplate {
		ElementTemplate::new(name)
	}

	#[must_use]
	pub fn component<C: Component + Default>(props: C::Props) -> ComponentTemplate {
		ComponentTemplate::new::<C>(props)
	}

	#[must_use]
	pub fn key(&self) -> Option<&str> {
		match self {
			Template::Element(element) => element.key.as_deref(),
			Template::Component(component) => component.key.as_deref(),
		}
	}
}

impl From<ElementTemplate> for Template {
	fn from(element: ElementTemplate) -> Self {
		Self::Element(element)
	}
}

impl From<ComponentTemplate> for Template {
	fn from(component: ComponentTemplate) -> Self {
		Self::Component(component)
	}
}

/// Element content. Text and children are mutually exclusive.
#[derive(Clone, Debug, Default)]
pub enum Content {
	#[default]
	Empty,
	Text(String),
	Children(Vec<Template>),
}

#[derive(Clone, Debug)]
pub struct ElementTemplate {
	pub(crate) name: String,
	pub(crate) attrs: BTreeMap<String, String>,
	pub(crate) dataset: BTreeMap<String, String>,
	pub(crate) style: BTreeMap<String, String>,
	pub(crate) class_names: Vec<String>,
	pub(crate) listeners: BTreeMap<String, Listener>,
	pub(crate) metadata: BTreeMap<String, Value>,
	pub(crate) key: Option<Key>,
	pub(crate) content: Content,
}

impl ElementTemplate {
	#[must_use]
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			attrs: BTreeMap::new(),
			dataset: BTreeMap::new(),
			style: BTreeMap::new(),
			class_names: Vec::new(),
			listeners: BTreeMap::new(),
			metadata: BTreeMap::new(),
			key: None,
			content: Content::Empty,
		}
	}

	#[must_use]
	pub fn attr(mut self, name: impl Into<String>, value: impl ToString) -> Self {
		self.attrs.insert(name.into(), value.to_string());
		self
	}

	#[must_use]
	pub fn data(mut self, name: impl Into<String>, value: impl ToString) -> Self {
		self.dataset.insert(name.into(), value.to_string());
		self
	}

	#[must_use]
	pub fn style(mut self, property: impl Into<String>, value: impl ToString) -> Self {
		self.style.insert(property.into(), value.to_string());
		self
	}

	#[must_use]
	pub fn class(mut self, class_name: impl Into<String>) -> Self {
		self.class_names.push(class_name.into());
		self
	}

	#[must_use]
	pub fn on(mut self, event: impl Into<String>, listener: Listener) -> Self {
		self.listeners.insert(event.into(), listener);
		self
	}

	#[must_use]
	pub fn metadata(mut self, name: impl Into<String>, value: Value) -> Self {
		self.metadata.insert(name.into(), value);
		self
	}

	#[must_use]
	pub fn key(mut self, key: impl ToString) -> Self {
		self.key = Some(key.to_string());
		self
	}

	/// Replaces the content with `text`.
	#[must_use]
	pub fn text(mut self, text: impl Into<String>) -> Self {
		self.content = Content::Text(text.into());
		self
	}

	/// Appends a child, discarding text content if there was any.
	#[must_use]
	pub fn child(mut self, child: impl Into<Template>) -> Self {
		match &mut self.content {
			Content::Children(children) => children.push(child.into()),
			content => *content = Content::Children(vec![child.into()]),
		}
		self
	}

	/// Appends each child in order. Empty iterators leave the content as is.
	#[must_use]
	pub fn children<T: Into<Template>>(self, children: impl IntoIterator<Item = T>) -> Self {
		children.into_iter().fold(self, |template, child| template.child(child))
	}

	/// Shorthand for conditionally present children.
	#[must_use]
	pub fn maybe_child(self, child: Option<impl Into<Template>>) -> Self {
		match child {
			Some(child) => self.child(child),
			None => self,
		}
	}
}

fn instantiate<C: Component + Default>() -> Box<dyn AnyComponent> {
	Box::new(C::default())
}

#[derive(Clone)]
pub struct ComponentTemplate {
	pub(crate) component_type: TypeId,
	pub(crate) name: &'static str,
	pub(crate) instantiate: fn() -> Box<dyn AnyComponent>,
	pub(crate) props: Rc<dyn Any>,
	pub(crate) key: Option<Key>,
}

impl Debug for ComponentTemplate {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComponentTemplate").field("name", &self.name).field("key", &self.key).finish_non_exhaustive()
	}
}

impl ComponentTemplate {
	#[must_use]
	pub fn new<C: Component + Default>(props: C::Props) -> Self {
		Self {
			component_type: TypeId::of::<C>(),
			name: <C as Component>::name(),
			instantiate: instantiate::<C>,
			props: Rc::new(props),
			key: None,
		}
	}

	#[must_use]
	pub fn key(mut self, key: impl ToString) -> Self {
		self.key = Some(key.to_string());
		self
	}

	#[must_use]
	pub fn component_type(&self) -> TypeId {
		self.component_type
	}
}

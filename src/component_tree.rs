use crate::{
	component::{ComponentNode, RenderContext},
	node::{Element, NodeId},
	template::{ComponentTemplate, Content, ElementTemplate, Template},
	Error, Tree,
};
use tracing::{instrument, trace};

/// Materialises `template` into detached nodes in `tree`, rendering nested components as it goes.
///
/// No hooks run and nothing is made live here. The result is a candidate for [`Diff::calculate`](`crate::Diff::calculate`).
///
/// # Errors
///
/// Only on internal inconsistencies of `tree`.
#[instrument(skip(tree, template, cx), fields(key = ?template.key()))]
pub fn create_from_template(tree: &mut Tree, template: Template, cx: &RenderContext) -> Result<NodeId, Error> {
	match template {
		Template::Element(element) => create_element(tree, element, cx),
		Template::Component(component) => create_component(tree, component, cx),
	}
}

fn create_element(tree: &mut Tree, template: ElementTemplate, cx: &RenderContext) -> Result<NodeId, Error> {
	let ElementTemplate { name, attrs, dataset, style, class_names, listeners, metadata, key, content } = template;
	let (text, children) = match content {
		Content::Empty => (None, Vec::new()),
		Content::Text(text) => (Some(text), Vec::new()),
		Content::Children(children) => (None, children),
	};

	let id = tree.create_element(Element {
		name,
		attrs,
		dataset,
		style,
		class_names,
		listeners,
		metadata,
		text,
		key,
		..Element::default()
	});
	for child in children {
		let child = create_from_template(tree, child, cx)?;
		tree.insert_child(id, child, None)?;
	}
	Ok(id)
}

fn create_component(tree: &mut Tree, template: ComponentTemplate, cx: &RenderContext) -> Result<NodeId, Error> {
	let ComponentTemplate { instantiate, props, key, .. } = template;
	let node = ComponentNode::new(instantiate(), props, key);
	let rendered = node.render(cx);
	let id = tree.insert_component(node);

	if let Some(rendered) = rendered {
		let child = create_from_template(tree, rendered, cx)?;
		if let Some(placeholder) = tree.append_child(id, child)? {
			trace!(component = %id, placeholder = %placeholder.id(), "Dropped unused placeholder.");
		}
	}
	Ok(id)
}

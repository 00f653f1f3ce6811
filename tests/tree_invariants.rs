use grove_dom::{Component, Element, ElementRef, Error, Handle, NodeType, Tree};
use std::collections::HashSet;

mod common;

#[derive(Default)]
struct Empty;
impl Component for Empty {
	type Props = ();
}

#[derive(Default)]
struct Other;
impl Component for Other {
	type Props = ();
}

fn keyed(name: &str, key: &str) -> Element {
	let mut element = Element::new(name);
	element.key = Some(key.to_owned());
	element
}

#[test]
fn ids_are_unique() {
	common::setup();
	let mut tree = Tree::new();
	let mut ids = HashSet::new();
	for i in 0..50 {
		ids.insert(tree.create_element(Element::new("div")));
		ids.insert(tree.create_comment(i.to_string(), None));
		ids.insert(tree.create_component::<Empty>(()));
	}
	// Each component brings its own placeholder.
	assert_eq!(tree.len(), 200);
	assert_eq!(ids.len(), 150);
}

#[test]
fn compatibility() {
	common::setup();
	let mut tree = Tree::new();
	let div = tree.create_element(Element::new("div"));
	let other_div = tree.create_element(Element::new("div"));
	let span = tree.create_element(Element::new("span"));
	let keyed_a = tree.create_element(keyed("div", "a"));
	let keyed_a_again = tree.create_element(keyed("div", "a"));
	let keyed_b = tree.create_element(keyed("div", "b"));
	let comment = tree.create_comment("x", None);
	let empty = tree.create_component::<Empty>(());
	let other_empty = tree.create_component::<Empty>(());
	let other = tree.create_component::<Other>(());

	let all = [div, other_div, span, keyed_a, keyed_a_again, keyed_b, comment, empty, other_empty, other];
	for &a in &all {
		assert!(tree.is_compatible(Some(a), Some(a)));
		assert!(!tree.is_compatible(Some(a), None));
		for &b in &all {
			assert_eq!(tree.is_compatible(Some(a), Some(b)), tree.is_compatible(Some(b), Some(a)));
			if tree.node(a).unwrap().node_type() != tree.node(b).unwrap().node_type() {
				assert!(!tree.is_compatible(Some(a), Some(b)));
			}
		}
	}

	assert!(tree.is_compatible(Some(div), Some(other_div)));
	assert!(!tree.is_compatible(Some(div), Some(span)));
	assert!(!tree.is_compatible(Some(div), Some(keyed_a)));
	assert!(tree.is_compatible(Some(keyed_a), Some(keyed_a_again)));
	assert!(!tree.is_compatible(Some(keyed_a), Some(keyed_b)));
	assert!(tree.is_compatible(Some(empty), Some(other_empty)));
	assert!(!tree.is_compatible(Some(empty), Some(other)));
	assert!(!tree.is_compatible(None, None));
}

#[test]
fn append_child_detaches_placeholder() {
	common::setup();
	let mut tree = Tree::new();
	let component = tree.create_component::<Empty>(());
	let placeholder = tree.component(component).unwrap().comment().unwrap();
	assert_eq!(tree.node(placeholder).unwrap().parent(), Some(component));
	assert_eq!(tree.comment(placeholder).unwrap().text, "Empty");

	let child = tree.create_element(Element::new("div"));
	let detached = tree.append_child(component, child).unwrap().unwrap();
	assert_eq!(detached.id(), placeholder);
	assert_eq!(detached.parent(), None);
	assert!(!tree.contains(placeholder));

	assert_eq!(tree.node(child).unwrap().parent(), Some(component));
	assert_eq!(tree.component(component).unwrap().child(), Some(child));
	assert_eq!(tree.component(component).unwrap().comment(), None);
}

#[test]
fn remove_child_restores_placeholder() {
	common::setup();
	let mut tree = Tree::new();
	let component = tree.create_component::<Empty>(());
	let child = tree.create_element(Element::new("div"));
	tree.append_child(component, child).unwrap();

	assert!(tree.remove_child(component, child).unwrap());
	let node = tree.component(component).unwrap();
	assert_eq!(node.child(), None);
	let placeholder = node.comment().unwrap();
	assert_eq!(tree.comment(placeholder).unwrap().text, "Empty");
	assert_eq!(tree.node(placeholder).unwrap().parent(), Some(component));
	assert_eq!(tree.node(child).unwrap().parent(), None);
}

#[test]
fn child_element_resolves_through_components() {
	common::setup();
	let mut tree = Tree::new();
	let outer = tree.create_component::<Empty>(());
	let middle = tree.create_component::<Other>(());
	tree.append_child(outer, middle).unwrap();

	assert_eq!(tree.child_element(outer), None);
	assert_eq!(tree.placeholder(outer), tree.component(middle).unwrap().comment());

	let inner = tree.create_component::<Empty>(());
	let element = tree.create_element(Element::new("p"));
	tree.append_child(inner, element).unwrap();
	tree.append_child(middle, inner).unwrap();

	assert_eq!(tree.child_element(outer), Some(element));
	assert_eq!(tree.child_element(middle), Some(element));
	assert_eq!(tree.placeholder(outer), None);
	assert_eq!(tree.child_element(element), None);
}

#[test]
fn element_children() {
	common::setup();
	let mut tree = Tree::new();
	let list = tree.create_element(Element::new("ul"));
	let items: Vec<_> = (0..3).map(|_| tree.create_element(Element::new("li"))).collect();
	for &item in &items {
		tree.insert_child(list, item, None).unwrap();
	}
	let first = tree.create_element(Element::new("li"));
	tree.insert_child(list, first, Some(0)).unwrap();
	assert_eq!(tree.element(list).unwrap().children(), [first, items[0], items[1], items[2]]);

	let stray = tree.create_element(Element::new("li"));
	assert!(matches!(tree.insert_child(list, stray, Some(9)), Err(Error::IndexOutOfRange { index: 9, len: 4, .. })));

	tree.move_child(list, first, 0, 3).unwrap();
	assert_eq!(tree.element(list).unwrap().children(), [items[0], items[1], items[2], first]);

	assert!(tree.remove_child(list, items[1]).unwrap());
	assert!(!tree.remove_child(list, items[1]).unwrap());
	assert_eq!(tree.node(items[1]).unwrap().parent(), None);
	assert_eq!(tree.parent_element(items[0]).and_then(|parent| parent.id()), Some(list));

	let comment = tree.create_comment("x", None);
	assert!(matches!(
		tree.insert_child(comment, stray, None),
		Err(Error::UnexpectedNodeType { expected: NodeType::Element, actual: NodeType::Comment, .. })
	));
}

#[test]
fn root_parent_element_is_synthesized() {
	common::setup();
	let mut tree = Tree::new();
	let root = tree.create_root(Handle::from_raw(7));
	assert!(tree.node(root).unwrap().is_root());
	assert!(tree.node(root).unwrap().is_component());

	match tree.parent_element(root) {
		Some(ElementRef::Container(element)) => {
			assert_eq!(element.name, "root");
			assert_eq!(element.children(), [root]);
			assert_eq!(element.live(), Some(Handle::from_raw(7)));
		}
		other => panic!("Expected a container, got {:?}", other),
	}

	tree.set_container(root, Handle::from_raw(8)).unwrap();
	let element = tree.parent_element(root).unwrap();
	assert_eq!(element.live(), Some(Handle::from_raw(8)));

	let div = tree.create_element(Element::new("div"));
	tree.append_child(root, div).unwrap();
	assert_eq!(tree.parent_element(div).and_then(|parent| parent.live()), Some(Handle::from_raw(8)));
}

#[test]
fn element_mutators() {
	let mut element = Element::new("div");
	element.set_attribute("id", 5);
	element.set_attribute("id", 5);
	element.remove_attribute("title");
	element.set_data_attribute("user", "ada");
	element.set_style_property("color", "red");
	element.add_class_name("a");
	element.add_class_name("b");
	element.add_class_name("a");
	element.remove_class_name("a");

	assert_eq!(element.attrs.get("id").map(String::as_str), Some("5"));
	assert_eq!(element.attrs.len(), 1);
	assert_eq!(element.dataset.get("user").map(String::as_str), Some("ada"));
	assert_eq!(element.class_names, ["b"]);

	element.remove_style_property("color");
	element.remove_data_attribute("user");
	assert!(element.style.is_empty());
	assert!(element.dataset.is_empty());
}

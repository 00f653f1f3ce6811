use grove_dom::{
	component_tree::create_from_template, render, Component, Context, Diff, Handle, MemorySurface, NodeId, Patch, RenderContext, Template, Tree, Updater,
};
use std::cell::RefCell;

mod common;

fn list(tree: &mut Tree, items: &[(&str, &str)]) -> NodeId {
	let template = Template::element("ul").children(items.iter().map(|&(key, name)| Template::element(name).key(key).text(key)));
	create_from_template(tree, template.into(), &RenderContext::default()).unwrap()
}

#[test]
fn swap_is_a_single_move() {
	common::setup();
	let mut tree = Tree::new();
	let parent = tree.create_root(Handle::from_raw(0));
	let old = list(&mut tree, &[("1", "li"), ("2", "li")]);
	let new = list(&mut tree, &[("2", "li"), ("1", "li")]);
	let moved = tree.element(old).unwrap().children()[1];

	let patches = Diff::calculate(&tree, Some(old), Some(new), parent).unwrap();
	assert_eq!(patches, [Patch::MoveChild { parent: old, child: moved, from: 1, to: 0 }]);
}

#[test]
fn same_key_other_kind_is_replaced() {
	common::setup();
	let mut tree = Tree::new();
	let parent = tree.create_root(Handle::from_raw(0));
	let old = list(&mut tree, &[("a", "li"), ("b", "li")]);
	let new = list(&mut tree, &[("b", "li"), ("a", "p")]);
	let (old_a, old_b) = {
		let children = tree.element(old).unwrap().children();
		(children[0], children[1])
	};
	let new_a = tree.element(new).unwrap().children()[1];

	let patches = Diff::calculate(&tree, Some(old), Some(new), parent).unwrap();
	assert_eq!(
		patches,
		[
			Patch::MoveChild { parent: old, child: old_b, from: 1, to: 0 },
			Patch::ReplaceChild { parent: old, old: old_a, new: new_a },
		]
	);
}

#[test]
fn duplicate_keys_fall_back_to_positions() {
	common::setup();
	let mut tree = Tree::new();
	let parent = tree.create_root(Handle::from_raw(0));
	let old = list(&mut tree, &[("a", "li"), ("a", "li")]);
	let new = list(&mut tree, &[("a", "li")]);
	let second = tree.element(old).unwrap().children()[1];

	let patches = Diff::calculate(&tree, Some(old), Some(new), parent).unwrap();
	assert_eq!(patches, [Patch::RemoveChild { parent: old, child: second }]);
}

#[test]
fn unkeyed_insertion_is_positional() {
	common::setup();
	let mut tree = Tree::new();
	let parent = tree.create_root(Handle::from_raw(0));
	let old = list(&mut tree, &[("a", "li")]);
	let new = create_from_template(
		&mut tree,
		Template::element("ul").child(Template::element("li").text("b")).child(Template::element("li").key("a").text("a")).into(),
		&RenderContext::default(),
	)
	.unwrap();
	let first = tree.element(old).unwrap().children()[0];
	let (new_first, new_second) = {
		let children = tree.element(new).unwrap().children();
		(children[0], children[1])
	};

	let patches = Diff::calculate(&tree, Some(old), Some(new), parent).unwrap();
	assert_eq!(
		patches,
		[
			Patch::ReplaceChild { parent: old, old: first, new: new_first },
			Patch::InsertChild { parent: old, child: new_second, index: 1 },
		]
	);
}

thread_local! {
	static CREATED: RefCell<Vec<u32>> = RefCell::new(Vec::new());
	static DESTROYED: RefCell<Vec<u32>> = RefCell::new(Vec::new());
}

#[derive(Default)]
struct Item;
impl Component for Item {
	type Props = u32;

	fn render(&self, n: &u32, _: &RenderContext) -> Option<Template> {
		Some(Template::element("li").text(n.to_string()).into())
	}

	fn on_created(&mut self, cx: &mut Context<'_>) {
		let n = cx.props::<u32>().copied();
		CREATED.with(|created| created.borrow_mut().extend(n));
	}

	fn on_destroyed(&mut self, cx: &mut Context<'_>) {
		let n = cx.props::<u32>().copied();
		DESTROYED.with(|destroyed| destroyed.borrow_mut().extend(n));
	}
}

fn items(updater: &Updater<Vec<u32>, MemorySurface>) -> Vec<(NodeId, Option<Handle>)> {
	updater.with_tree(|tree| {
		let list = tree.child_element(updater.root().unwrap()).unwrap();
		tree.element(list).unwrap().children().iter().map(|&item| (item, tree.live_ref(item))).collect()
	})
}

fn take(log: &'static std::thread::LocalKey<RefCell<Vec<u32>>>) -> Vec<u32> {
	log.with(|log| log.borrow_mut().drain(..).collect())
}

#[test]
fn keyed_components_keep_their_identity() {
	common::setup();
	let mut surface = MemorySurface::new();
	let container = surface.create_container("main").unwrap();
	let updater = render(
		|items: &Vec<u32>, _| Some(Template::element("ul").children(items.iter().map(|&n| Template::component::<Item>(n).key(n))).into()),
		&vec![1, 2, 3],
		surface,
		container,
	)
	.unwrap();
	assert_eq!(take(&CREATED), [1, 2, 3]);
	let before = items(&updater);

	updater.update(&vec![3, 1, 2]).unwrap();
	assert_eq!(updater.with_surface(|surface| surface.inner_markup(container)), "<ul><li>3</li><li>1</li><li>2</li></ul>");
	assert_eq!(items(&updater), [before[2], before[0], before[1]]);
	assert!(take(&CREATED).is_empty());
	assert!(take(&DESTROYED).is_empty());

	updater.update(&vec![3, 2]).unwrap();
	assert_eq!(updater.with_surface(|surface| surface.inner_markup(container)), "<ul><li>3</li><li>2</li></ul>");
	assert_eq!(take(&DESTROYED), [1]);
	assert_eq!(items(&updater), [before[2], before[1]]);

	updater.update(&vec![4, 3, 2]).unwrap();
	assert_eq!(updater.with_surface(|surface| surface.inner_markup(container)), "<ul><li>4</li><li>3</li><li>2</li></ul>");
	assert_eq!(take(&CREATED), [4]);
	assert!(take(&DESTROYED).is_empty());
	assert_eq!(items(&updater)[1..], [before[2], before[1]]);

	// Container, list and three items.
	assert_eq!(updater.with_surface(|surface| surface.len()), 5);
}

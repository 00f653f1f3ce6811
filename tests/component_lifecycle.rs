use grove_dom::{render, Component, Context, Error, MemorySurface, RenderContext, Stage, Template, Updater};
use std::cell::RefCell;

mod common;

thread_local! {
	static LOG: RefCell<Vec<String>> = RefCell::new(Vec::new());
}

fn log(entry: impl Into<String>) {
	LOG.with(|log| log.borrow_mut().push(entry.into()));
}

fn take_log() -> Vec<String> {
	LOG.with(|log| log.borrow_mut().drain(..).collect())
}

struct DropGuard(&'static str);
impl Drop for DropGuard {
	fn drop(&mut self) {
		log(format!("{} sandbox dropped", self.0));
	}
}

macro_rules! logged_hooks {
	($name:literal) => {
		fn on_created(&mut self, cx: &mut Context<'_>) {
			assert_eq!(cx.stage(), Stage::Created);
			cx.sandbox().insert(DropGuard($name));
			log(concat!($name, " created"));
		}
		fn on_attached(&mut self, cx: &mut Context<'_>) {
			assert_eq!(cx.stage(), Stage::Attached);
			assert!(cx.sandbox().get::<DropGuard>().is_some());
			log(concat!($name, " attached"));
		}
		fn on_props_received(&mut self, _: &Self::Props, _: &mut Context<'_>) {
			log(concat!($name, " props received"));
		}
		fn on_updated(&mut self, _: &mut Context<'_>) {
			log(concat!($name, " updated"));
		}
		fn on_detached(&mut self, cx: &mut Context<'_>) {
			assert_eq!(cx.stage(), Stage::Detached);
			log(concat!($name, " detached"));
		}
		fn on_destroyed(&mut self, cx: &mut Context<'_>) {
			assert_eq!(cx.stage(), Stage::Destroyed);
			log(concat!($name, " destroyed"));
		}
	};
}

#[derive(Default)]
struct Parent;
impl Component for Parent {
	type Props = String;

	fn render(&self, label: &String, _: &RenderContext) -> Option<Template> {
		Some(Template::element("section").child(Template::element("h1").text(label.clone())).child(Template::component::<Child>(())).into())
	}

	logged_hooks!("Parent");
}

#[derive(Default)]
struct Child;
impl Component for Child {
	type Props = ();

	fn render(&self, _: &(), _: &RenderContext) -> Option<Template> {
		Some(Template::element("p").text("child").into())
	}

	logged_hooks!("Child");
}

fn mount(label: Option<&str>) -> (Updater<Option<String>, MemorySurface>, grove_dom::Handle) {
	common::setup();
	let mut surface = MemorySurface::new();
	let container = surface.create_container("main").unwrap();
	let updater = render(
		|label: &Option<String>, _| label.clone().map(|label| Template::component::<Parent>(label).into()),
		&label.map(str::to_owned),
		surface,
		container,
	)
	.unwrap();
	(updater, container)
}

fn stage_of_parent(updater: &Updater<Option<String>, MemorySurface>) -> Option<Stage> {
	updater.with_tree(|tree| {
		let root = updater.root()?;
		let parent = tree.component(root).ok()?.child()?;
		Some(tree.component(parent).ok()?.stage())
	})
}

#[test]
fn hook_order() {
	let (updater, container) = mount(Some("Title"));
	assert_eq!(take_log(), ["Parent created", "Child created", "Child attached", "Parent attached"]);
	assert_eq!(stage_of_parent(&updater), Some(Stage::Attached));
	assert_eq!(
		updater.with_surface(|surface| surface.inner_markup(container)),
		"<section><h1>Title</h1><p>child</p></section>"
	);

	updater.update(&Some("Renamed".to_owned())).unwrap();
	assert_eq!(take_log(), ["Parent props received", "Child props received", "Child updated", "Parent updated"]);
	assert_eq!(
		updater.with_surface(|surface| surface.inner_markup(container)),
		"<section><h1>Renamed</h1><p>child</p></section>"
	);

	updater.update(&None).unwrap();
	assert_eq!(
		take_log(),
		[
			"Parent detached",
			"Child detached",
			"Child destroyed",
			"Child sandbox dropped",
			"Parent destroyed",
			"Parent sandbox dropped",
		]
	);
	assert_eq!(updater.with_surface(|surface| surface.inner_markup(container)), "<!--Root-->");
	assert_eq!(stage_of_parent(&updater), None);
}

#[test]
fn unmount_destroys_everything() {
	let (updater, container) = mount(Some("Title"));
	take_log();
	let before = updater.with_surface(|surface| surface.len());
	assert!(updater.with_tree(|tree| tree.len()) > 0);

	updater.unmount().unwrap();
	assert_eq!(
		take_log(),
		[
			"Parent detached",
			"Child detached",
			"Child destroyed",
			"Child sandbox dropped",
			"Parent destroyed",
			"Parent sandbox dropped",
		]
	);
	assert_eq!(updater.with_surface(|surface| surface.inner_markup(container)), "");
	assert!(updater.with_surface(|surface| surface.len()) < before);
	assert_eq!(updater.with_surface(|surface| surface.len()), 1);
	assert_eq!(updater.with_tree(|tree| tree.len()), 0);
	assert_eq!(updater.root(), None);

	assert!(matches!(updater.update(&Some("Again".to_owned())), Err(Error::Unmounted)));
	assert!(matches!(updater.unmount(), Err(Error::Unmounted)));
}

#[test]
fn empty_render_then_content() {
	let (updater, container) = mount(None);
	assert!(take_log().is_empty());
	assert_eq!(updater.with_surface(|surface| surface.inner_markup(container)), "<!--Root-->");

	updater.update(&Some("Late".to_owned())).unwrap();
	assert_eq!(take_log(), ["Parent created", "Child created", "Child attached", "Parent attached"]);
	assert_eq!(
		updater.with_surface(|surface| surface.inner_markup(container)),
		"<section><h1>Late</h1><p>child</p></section>"
	);
}

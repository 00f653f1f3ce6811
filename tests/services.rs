use grove_dom::{
	render, Component, Context, Disconnect, DisconnectError, Element, Error, MemorySurface, RenderContext, Service, Template, Topic, Tree, Updater,
};
use std::cell::RefCell;

mod common;

thread_local! {
	static NUMBERS: Topic<u32> = Topic::new("numbers");
	static RECEIVED: RefCell<Vec<u32>> = RefCell::new(Vec::new());
	static LOG: RefCell<Vec<String>> = RefCell::new(Vec::new());
	static TICKS: Topic<u32> = Topic::new("ticks");
	static HITS: RefCell<Vec<(u32, u32)>> = RefCell::new(Vec::new());
	static TICKED: RefCell<Option<Updater<Vec<u32>, MemorySurface>>> = RefCell::new(None);
}

fn log(entry: impl Into<String>) {
	LOG.with(|log| log.borrow_mut().push(entry.into()));
}

fn take_log() -> Vec<String> {
	LOG.with(|log| log.borrow_mut().drain(..).collect())
}

/// Logs each label once its subscription is torn down. `"fail"` fails to disconnect.
struct Recorder;
impl Service for Recorder {
	type Listeners = &'static str;

	fn name(&self) -> String {
		"recorder".to_owned()
	}

	fn connect(&self, label: &'static str) -> Option<Disconnect> {
		Some(Box::new(move || {
			log(label);
			if label == "fail" {
				Err(DisconnectError::new("boom"))
			} else {
				Ok(())
			}
		}))
	}
}

struct Broken;
impl Service for Broken {
	type Listeners = ();

	fn connect(&self, (): ()) -> Option<Disconnect> {
		None
	}
}

fn mount<C: Component<Props = ()> + Default>() -> (Updater<bool, MemorySurface>, grove_dom::Handle) {
	common::setup();
	let mut surface = MemorySurface::new();
	let container = surface.create_container("main").unwrap();
	let updater = render(|show: &bool, _| show.then(|| Template::from(Template::component::<C>(()))), &true, surface, container).unwrap();
	(updater, container)
}

fn content(updater: &Updater<bool, MemorySurface>) -> Option<grove_dom::NodeId> {
	updater.with_tree(|tree| tree.component(updater.root()?).ok()?.child())
}

#[derive(Default)]
struct Subscriber;
impl Component for Subscriber {
	type Props = ();

	fn render(&self, _: &(), _: &RenderContext) -> Option<Template> {
		Some(Template::element("span").into())
	}

	fn on_created(&mut self, cx: &mut Context<'_>) {
		let listener: Box<dyn Fn(&u32)> = Box::new(|value| RECEIVED.with(|received| received.borrow_mut().push(*value)));
		NUMBERS.with(|numbers| cx.connect_to(numbers, listener)).unwrap();
	}
}

#[test]
fn subscriptions_end_on_destroy() {
	let (updater, _) = mount::<Subscriber>();
	assert_eq!(NUMBERS.with(Topic::subscriber_count), 1);
	assert_eq!(NUMBERS.with(|numbers| numbers.publish(&5)), 1);
	assert_eq!(RECEIVED.with(|received| received.borrow().clone()), [5]);

	let subscriber = content(&updater).unwrap();
	let services = updater.with_tree(|tree| tree.component(subscriber).unwrap().cleanup_tasks().iter().map(|task| task.service().to_owned()).collect::<Vec<_>>());
	assert_eq!(services, ["numbers"]);

	updater.update(&false).unwrap();
	assert_eq!(NUMBERS.with(Topic::subscriber_count), 0);
	assert_eq!(NUMBERS.with(|numbers| numbers.publish(&6)), 0);
	assert_eq!(RECEIVED.with(|received| received.borrow().clone()), [5]);
}

#[derive(Default)]
struct Recording;
impl Component for Recording {
	type Props = ();

	fn on_created(&mut self, cx: &mut Context<'_>) {
		for label in ["a", "fail", "b"] {
			cx.connect_to(&Recorder, label).unwrap();
		}
	}

	fn on_detached(&mut self, _: &mut Context<'_>) {
		log("detached");
	}

	fn on_destroyed(&mut self, cx: &mut Context<'_>) {
		log("destroyed");
		let late = cx.connect_to(&Recorder, "late");
		assert!(matches!(late, Err(Error::ComponentDestroyed { ref service, .. }) if service == "recorder"));
	}
}

#[test]
fn cleanup_tasks_run_once_in_order() {
	let (updater, container) = mount::<Recording>();
	assert!(take_log().is_empty());
	assert_eq!(updater.with_surface(|surface| surface.inner_markup(container)), "<!--Recording-->");

	let recording = content(&updater).unwrap();
	assert_eq!(updater.with_tree(|tree| tree.component(recording).unwrap().cleanup_tasks().len()), 3);

	updater.update(&false).unwrap();
	assert_eq!(take_log(), ["detached", "a", "fail", "b", "destroyed"]);
	assert!(!updater.with_tree(|tree| tree.contains(recording)));

	updater.update(&true).unwrap();
	updater.update(&true).unwrap();
	assert!(take_log().is_empty());

	updater.unmount().unwrap();
	assert_eq!(take_log(), ["detached", "a", "fail", "b", "destroyed"]);
}

#[derive(Default)]
struct Plain;
impl Component for Plain {
	type Props = ();
}

#[test]
fn tree_level_connections() {
	common::setup();
	let mut tree = Tree::new();
	let component = tree.create_component::<Plain>(());
	tree.connect_to(component, &Recorder, "direct").unwrap();
	assert_eq!(tree.component(component).unwrap().cleanup_tasks()[0].service(), "recorder");
	assert!(take_log().is_empty());

	let element = tree.create_element(Element::new("div"));
	assert!(matches!(tree.connect_to(element, &Recorder, "element"), Err(Error::UnexpectedNodeType { .. })));
}

#[test]
#[should_panic(expected = "Assertion failed")]
fn services_must_return_a_disconnect() {
	common::setup();
	let mut tree = Tree::new();
	let component = tree.create_component::<Plain>(());
	let _ = tree.connect_to(component, &Broken, ());
}

#[derive(Default)]
struct Lazy;
impl Component for Lazy {
	type Props = ();

	fn on_attached(&mut self, cx: &mut Context<'_>) {
		*cx.sandbox().get_or_insert_with(|| 0_u32) += 1;
	}
}

#[test]
fn sandboxes_are_created_on_first_use() {
	let (updater, _) = mount::<Lazy>();
	let lazy = content(&updater).unwrap();
	assert!(updater.with_tree(|tree| tree.component(lazy).unwrap().has_sandbox()));

	let (updater, _) = mount::<Plain>();
	let plain = content(&updater).unwrap();
	assert!(!updater.with_tree(|tree| tree.component(plain).unwrap().has_sandbox()));
}

/// Records ticks. The first one also drops every other `Ticker` from the list.
#[derive(Default)]
struct Ticker;
impl Component for Ticker {
	type Props = u32;

	fn render(&self, _: &u32, _: &RenderContext) -> Option<Template> {
		Some(Template::element("li").into())
	}

	fn on_created(&mut self, cx: &mut Context<'_>) {
		let n = cx.props::<u32>().copied().unwrap_or_default();
		let listener: Box<dyn Fn(&u32)> = Box::new(move |value| {
			HITS.with(|hits| hits.borrow_mut().push((n, *value)));
			if n == 1 {
				TICKED.with(|ticked| ticked.borrow().as_ref().unwrap().update(&vec![1]).unwrap());
			}
		});
		TICKS.with(|ticks| cx.connect_to(ticks, listener)).unwrap();
	}
}

#[test]
fn disconnected_while_publishing() {
	common::setup();
	let mut surface = MemorySurface::new();
	let container = surface.create_container("main").unwrap();
	let updater = render(
		|items: &Vec<u32>, _| Some(Template::element("ul").children(items.iter().map(|&n| Template::component::<Ticker>(n).key(n))).into()),
		&vec![1, 2],
		surface,
		container,
	)
	.unwrap();
	TICKED.with(|ticked| *ticked.borrow_mut() = Some(updater.clone()));
	assert_eq!(TICKS.with(Topic::subscriber_count), 2);

	assert_eq!(TICKS.with(|ticks| ticks.publish(&7)), 1);
	assert_eq!(HITS.with(|hits| hits.borrow().clone()), [(1, 7)]);
	assert_eq!(TICKS.with(Topic::subscriber_count), 1);
	assert_eq!(updater.with_surface(|surface| surface.inner_markup(container)), "<ul><li></li></ul>");

	TICKED.with(|ticked| ticked.borrow_mut().take());
}

#![cfg(target_arch = "wasm32")]

use grove_dom::{render, DomSurface, Listener, Template};
use std::{cell::Cell, rc::Rc};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, HtmlBodyElement, HtmlElement};

mod common;

wasm_bindgen_test_configure!(run_in_browser);

fn container() -> (DomSurface, web_sys::Element) {
	let document = window().unwrap().document().unwrap();
	let body = document.body().unwrap().dyn_into::<HtmlBodyElement>().unwrap();
	let container = document.create_element("div").unwrap();
	body.append_child(&container).unwrap();
	(DomSurface::new(document), container)
}

#[wasm_bindgen_test]
fn update_and_unmount() {
	common::setup();
	let (mut surface, element) = container();
	let handle = surface.adopt(element.clone().into()).unwrap();

	let updater = render(
		|items: &Vec<&'static str>, _| {
			Some(
				Template::element("ul")
					.class("list")
					.children(items.iter().map(|item| Template::element("li").key(*item).data("item", *item).text(*item)))
					.into(),
			)
		},
		&vec!["a", "b"],
		surface,
		handle,
	)
	.unwrap();
	assert_eq!(element.inner_html(), r#"<ul class="list"><li data-item="a">a</li><li data-item="b">b</li></ul>"#);

	updater.update(&vec!["b", "c", "a"]).unwrap();
	assert_eq!(element.inner_html(), r#"<ul class="list"><li data-item="b">b</li><li data-item="c">c</li><li data-item="a">a</li></ul>"#);

	updater.update(&vec![]).unwrap();
	assert_eq!(element.inner_html(), r#"<ul class="list"></ul>"#);

	updater.unmount().unwrap();
	assert_eq!(element.inner_html(), "");
}

#[wasm_bindgen_test]
fn click() {
	common::setup();
	let (mut surface, element) = container();
	let handle = surface.adopt(element.clone().into()).unwrap();

	let clicks = Rc::new(Cell::new(0));
	let on_click = {
		let clicks = Rc::clone(&clicks);
		Listener::new(move |event| {
			assert_eq!(event.name, "click");
			clicks.set(clicks.get() + 1);
		})
	};
	let updater = render(
		move |(): &(), _| Some(Template::element("button").attr("id", "grove-button").on("click", on_click.clone()).into()),
		&(),
		surface,
		handle,
	)
	.unwrap();

	let button: HtmlElement = window().unwrap().document().unwrap().get_element_by_id("grove-button").unwrap().dyn_into().unwrap();
	button.click();
	assert_eq!(clicks.get(), 1);

	updater.update(&()).unwrap();
	button.click();
	assert_eq!(clicks.get(), 2);

	updater.unmount().unwrap();
	button.click();
	assert_eq!(clicks.get(), 2);
}

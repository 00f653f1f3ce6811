//! Long-lived producers that components subscribe to.
//!
//! A component connects through [`Context::connect_to`](`crate::Context::connect_to`),
//! which keeps the returned [`Disconnect`] and runs it when the component is destroyed.

use core::any::type_name;
use std::{cell::RefCell, rc::Rc};
use tracing::trace;

/// Tears down one subscription. Runs at most once.
pub type Disconnect = Box<dyn FnOnce() -> Result<(), DisconnectError>>;

#[derive(thiserror::Error, Debug)]
#[error("{message}")]
pub struct DisconnectError {
	pub message: String,
}

impl DisconnectError {
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}
}

pub trait Service {
	type Listeners;

	/// Tag attached to the cleanup task of each subscription.
	fn name(&self) -> String {
		type_name::<Self>().to_owned()
	}

	/// Subscribes `listeners`.
	///
	/// Returning [`None`] breaks the service contract. [`Context::connect_to`](`crate::Context::connect_to`) rejects it.
	fn connect(&self, listeners: Self::Listeners) -> Option<Disconnect>;
}

/// A minimal publish/subscribe [`Service`].
pub struct Topic<T> {
	name: String,
	subscribers: Rc<RefCell<Subscribers<T>>>,
}

struct Subscribers<T> {
	next: u64,
	entries: Vec<(u64, Rc<dyn Fn(&T)>)>,
}

impl<T: 'static> Topic<T> {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			subscribers: Rc::new(RefCell::new(Subscribers { next: 0, entries: Vec::new() })),
		}
	}

	/// Calls every current subscriber with `value` and returns how many were called.
	///
	/// Subscribers connected while being notified only hear from the next publication on.
	/// Subscribers disconnected while being notified aren't called any more.
	pub fn publish(&self, value: &T) -> usize {
		let snapshot: Vec<_> = self.subscribers.borrow().entries.iter().map(|(id, listener)| (*id, Rc::clone(listener))).collect();
		let mut called = 0;
		for (id, listener) in &snapshot {
			let connected = self.subscribers.borrow().entries.iter().any(|(entry, _)| entry == id);
			if !connected {
				trace!(topic = %self.name, id, "Skipped disconnected subscriber.");
				continue;
			}
			listener(value);
			called += 1;
		}
		called
	}

	#[must_use]
	pub fn subscriber_count(&self) -> usize {
		self.subscribers.borrow().entries.len()
	}
}

impl<T: 'static> Service for Topic<T> {
	type Listeners = Box<dyn Fn(&T)>;

	fn name(&self) -> String {
		self.name.clone()
	}

	fn connect(&self, listeners: Self::Listeners) -> Option<Disconnect> {
		let id = {
			let mut subscribers = self.subscribers.borrow_mut();
			let id = subscribers.next;
			subscribers.next += 1;
			subscribers.entries.push((id, Rc::from(listeners)));
			id
		};
		trace!(topic = %self.name, id, "Connected.");

		let subscribers = Rc::downgrade(&self.subscribers);
		let name = self.name.clone();
		Some(Box::new(move || {
			if let Some(subscribers) = subscribers.upgrade() {
				subscribers.borrow_mut().entries.retain(|&(entry, _)| entry != id);
			}
			trace!(topic = %name, id, "Disconnected.");
			Ok(())
		}))
	}
}

//! Trellis Core Runtime
//!
//! This crate provides the notification primitives the Trellis layout
//! engine is built on:
//!
//! - **Change Signals**: synchronous multicast callbacks with idempotent,
//!   handle-based subscription
//! - **Subscriber Sets**: ordered, idempotent key sets for graph edges
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use trellis_core::ChangeSignal;
//!
//! let mut signal = ChangeSignal::<f32>::new();
//! let seen = Rc::new(Cell::new(0.0));
//!
//! let sink = Rc::clone(&seen);
//! let id = signal.subscribe(move |value| sink.set(*value));
//!
//! signal.fire(&12.5);
//! assert_eq!(seen.get(), 12.5);
//!
//! signal.unsubscribe(id);
//! signal.fire(&3.0);
//! assert_eq!(seen.get(), 12.5);
//! ```

pub mod signal;
pub mod subscribers;

pub use signal::{Callback, ChangeSignal, SubscriptionId};
pub use subscribers::Subscribers;

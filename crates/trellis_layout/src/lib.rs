//! Trellis Layout Engine
//!
//! Reactive layout built from scalar length cells. Every node owns one cell
//! per axis (size, position, margins, padding, border). A cell resolves
//! through a single strategy and listens to the cells that strategy reads,
//! so changing one length re-resolves everything downstream of it before the
//! call returns.
//!
//! # Features
//!
//! - **Strategies**: fixed, percentage of the parent, content-sized,
//!   container-filling and arbitrary expressions over other cells
//! - **Stack arrangement**: vertical and horizontal (left, right, center)
//!   stacks that bind their children's positions into chains
//! - **Suspension**: batch several changes and notify once
//! - **Measurement**: content-size providers with an LRU result cache
//!
//! # Example
//!
//! ```rust
//! use trellis_layout::{Axis, LayoutGraph, StackLayout};
//!
//! let mut graph = LayoutGraph::new();
//! let column = graph.create_stack(StackLayout::vertical());
//!
//! let header = graph.create_node();
//! let body = graph.create_node();
//! graph.set_fixed(graph.cell(header, Axis::Height), 20.0).unwrap();
//! graph.set_fixed(graph.cell(body, Axis::Height), 30.0).unwrap();
//! graph.append_children(column, &[header, body]).unwrap();
//!
//! assert_eq!(graph.get(body, Axis::Y), 20.0);
//! assert_eq!(graph.get(column, Axis::Height), 50.0);
//!
//! graph.set_fixed(graph.cell(header, Axis::Height), 40.0).unwrap();
//! assert_eq!(graph.get(body, Axis::Y), 40.0);
//! ```

pub mod axis;
pub mod binding;
mod cascade;
pub mod config;
pub mod error;
pub mod graph;
pub mod measure;
mod parse;
mod resolve;
pub mod stack;
pub mod strategy;
mod tree;

pub use axis::{Axis, Orientation};
pub use binding::{ExpressionRequest, LengthRequest};
pub use config::LayoutConfig;
pub use error::{LayoutError, Result};
pub use graph::{Flow, Frame, LayoutGraph, LengthChange, LengthId, NodeId};
pub use measure::{ContentContext, ContentSizeProvider, IntrinsicSize, MeasureCache};
pub use stack::{Arrangement, HorizontalAlignment, StackDirection, StackLayout};
pub use strategy::{difference, sum, AutoStrategy, Combine, Expression, Strategy, StrategyKind};
pub use trellis_core::SubscriptionId;

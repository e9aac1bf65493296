//! Layout error types

use thiserror::Error;

use crate::axis::Axis;
use crate::graph::{LengthId, NodeId};
use crate::strategy::StrategyKind;

/// Errors surfaced at the call site that configures the layout graph
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// The node handle is stale or was never created by this graph
    #[error("Unknown layout node: {0:?}")]
    UnknownNode(NodeId),

    /// The length handle is stale or was never created by this graph
    #[error("Unknown length cell: {0:?}")]
    UnknownCell(LengthId),

    /// A length was asked to depend on itself
    #[error("Length cell {0:?} cannot be bound to itself")]
    SelfBinding(LengthId),

    /// A scalar input was NaN or infinite
    #[error("Length value must be finite, got {0}")]
    NonFinite(f32),

    /// Expression requests take between one and five inputs
    #[error("Expression needs 1 to 5 inputs, got {0}")]
    ExpressionArity(usize),

    /// The strategy makes no sense on this axis
    #[error("{strategy:?} is not supported on the {axis:?} axis")]
    UnsupportedStrategy { axis: Axis, strategy: StrategyKind },

    /// Minimum limit above maximum limit
    #[error("Invalid limits: min {min} is greater than max {max}")]
    InvalidLimits { min: f32, max: f32 },

    /// The child is already attached somewhere
    #[error("Node {0:?} already has a parent")]
    AlreadyAttached(NodeId),

    #[error("Node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },

    /// Attaching would make a node its own ancestor
    #[error("Attaching {child:?} under {parent:?} would create a cycle")]
    TreeCycle { parent: NodeId, child: NodeId },

    #[error("Child index {index} out of bounds for {len} children")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Malformed length literal
    #[error("Invalid length literal {input:?}: {reason}")]
    Parse { input: String, reason: String },

    /// Configuration could not be read or parsed
    #[error("Invalid layout config: {0}")]
    Config(String),
}

/// Result type for layout operations
pub type Result<T> = std::result::Result<T, LayoutError>;

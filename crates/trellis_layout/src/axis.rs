//! Layout axes
//!
//! Every node owns one length cell per [`Axis`]. Axes are grouped by
//! [`Orientation`] so that resolution code can ask for "the size along this
//! orientation" or "the leading padding along this orientation" without
//! matching on every variant.

use serde::{Deserialize, Serialize};

/// Which scalar of a node's box a length cell holds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Axis {
    Width,
    Height,
    X,
    Y,
    MarginTop,
    MarginBottom,
    MarginLeft,
    MarginRight,
    PaddingTop,
    PaddingBottom,
    PaddingLeft,
    PaddingRight,
    BorderTop,
    BorderBottom,
    BorderLeft,
    BorderRight,
}

impl Axis {
    /// Number of axes, and so of cells per node
    pub const COUNT: usize = 16;

    /// All axes in cell-index order
    pub const ALL: [Axis; Axis::COUNT] = [
        Axis::Width,
        Axis::Height,
        Axis::X,
        Axis::Y,
        Axis::MarginTop,
        Axis::MarginBottom,
        Axis::MarginLeft,
        Axis::MarginRight,
        Axis::PaddingTop,
        Axis::PaddingBottom,
        Axis::PaddingLeft,
        Axis::PaddingRight,
        Axis::BorderTop,
        Axis::BorderBottom,
        Axis::BorderLeft,
        Axis::BorderRight,
    ];

    /// Index of this axis in a node's cell array
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Orientation whose parent dimension this axis is measured against
    pub const fn orientation(self) -> Orientation {
        match self {
            Axis::Width
            | Axis::X
            | Axis::MarginLeft
            | Axis::MarginRight
            | Axis::PaddingLeft
            | Axis::PaddingRight
            | Axis::BorderLeft
            | Axis::BorderRight => Orientation::Horizontal,
            Axis::Height
            | Axis::Y
            | Axis::MarginTop
            | Axis::MarginBottom
            | Axis::PaddingTop
            | Axis::PaddingBottom
            | Axis::BorderTop
            | Axis::BorderBottom => Orientation::Vertical,
        }
    }

    /// Width or Height
    pub const fn is_size(self) -> bool {
        matches!(self, Axis::Width | Axis::Height)
    }

    /// X or Y
    pub const fn is_position(self) -> bool {
        matches!(self, Axis::X | Axis::Y)
    }
}

/// Horizontal or vertical
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    pub const fn size(self) -> Axis {
        match self {
            Orientation::Horizontal => Axis::Width,
            Orientation::Vertical => Axis::Height,
        }
    }

    pub const fn position(self) -> Axis {
        match self {
            Orientation::Horizontal => Axis::X,
            Orientation::Vertical => Axis::Y,
        }
    }

    /// Left or top margin
    pub const fn leading_margin(self) -> Axis {
        match self {
            Orientation::Horizontal => Axis::MarginLeft,
            Orientation::Vertical => Axis::MarginTop,
        }
    }

    /// Right or bottom margin
    pub const fn trailing_margin(self) -> Axis {
        match self {
            Orientation::Horizontal => Axis::MarginRight,
            Orientation::Vertical => Axis::MarginBottom,
        }
    }

    pub const fn leading_padding(self) -> Axis {
        match self {
            Orientation::Horizontal => Axis::PaddingLeft,
            Orientation::Vertical => Axis::PaddingTop,
        }
    }

    pub const fn trailing_padding(self) -> Axis {
        match self {
            Orientation::Horizontal => Axis::PaddingRight,
            Orientation::Vertical => Axis::PaddingBottom,
        }
    }

    pub const fn leading_border(self) -> Axis {
        match self {
            Orientation::Horizontal => Axis::BorderLeft,
            Orientation::Vertical => Axis::BorderTop,
        }
    }

    pub const fn trailing_border(self) -> Axis {
        match self {
            Orientation::Horizontal => Axis::BorderRight,
            Orientation::Vertical => Axis::BorderBottom,
        }
    }

    /// Padding and border axes on both sides
    pub const fn inset_axes(self) -> [Axis; 4] {
        [
            self.leading_padding(),
            self.trailing_padding(),
            self.leading_border(),
            self.trailing_border(),
        ]
    }

    pub const fn cross(self) -> Orientation {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_matches_index() {
        for (index, axis) in Axis::ALL.iter().enumerate() {
            assert_eq!(axis.index(), index);
        }
    }

    #[test]
    fn test_inset_axes_share_orientation() {
        for orientation in [Orientation::Horizontal, Orientation::Vertical] {
            for axis in orientation.inset_axes() {
                assert_eq!(axis.orientation(), orientation);
            }
            assert_eq!(orientation.size().orientation(), orientation);
            assert_eq!(orientation.position().orientation(), orientation);
            assert_ne!(orientation.cross(), orientation);
        }
    }
}

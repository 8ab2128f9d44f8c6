//! Compositor layers
//!
//! A layer draws into a buffer anchored at (0, 0); `bounds` says where that
//! buffer lands on screen.

use ratatui::buffer::Buffer;
use ratatui::layout::{Position, Rect};

use super::LayerId;

/// How a layer's blank cells are composited
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Occlusion {
    /// Blank cells let lower layers show through
    Transparent,
    /// Every cell inside the bounds hides lower layers (dialogs)
    Solid,
}

/// One surface region: conversation, input, status bar, overlay or toast
pub struct Layer {
    pub id: LayerId,
    /// Stacking order; larger draws later
    pub z_index: i32,
    /// Screen rectangle
    pub bounds: Rect,
    pub visible: bool,
    pub occlusion: Occlusion,
    /// Local-coordinate cells, sized to `bounds`
    pub buffer: Buffer,
}

impl Layer {
    pub fn new(id: LayerId, bounds: Rect, z_index: i32, occlusion: Occlusion) -> Self {
        Self {
            id,
            z_index,
            bounds,
            visible: true,
            occlusion,
            buffer: Buffer::empty(local_area(bounds)),
        }
    }

    /// Move to `bounds`, reallocating the buffer only when the size changes
    pub fn place(&mut self, bounds: Rect) {
        let resized = (self.bounds.width, self.bounds.height) != (bounds.width, bounds.height);
        self.bounds = bounds;
        if resized {
            self.buffer = Buffer::empty(local_area(bounds));
        }
    }

    /// Whether screen cell (`x`, `y`) falls on this layer
    pub fn contains(&self, x: u16, y: u16) -> bool {
        self.bounds.contains(Position { x, y })
    }
}

fn local_area(bounds: Rect) -> Rect {
    Rect::new(0, 0, bounds.width, bounds.height)
}

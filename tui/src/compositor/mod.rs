//! Layered Compositor
//!
//! Manages z-ordered layers for rendering. The conversation, input and status
//! bar sit at the bottom; funnel dialogs and toasts are layers drawn above
//! them and toggled with [`Compositor::set_visible`].

mod layer;

use std::collections::HashMap;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;

pub use layer::{Layer, Occlusion};

/// Unique identifier for a layer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerId(u32);

/// The compositor manages all layers and composites them together
pub struct Compositor {
    /// All layers by ID
    layers: HashMap<LayerId, Layer>,
    /// Layers sorted by z-index for rendering
    render_order: Vec<LayerId>,
    /// Next layer ID to assign
    next_id: u32,
    /// Output buffer (composited result)
    output: Buffer,
    /// Total area
    area: Rect,
}

impl Compositor {
    /// Create a new compositor for the given area
    pub fn new(area: Rect) -> Self {
        Self {
            layers: HashMap::new(),
            render_order: Vec::new(),
            next_id: 0,
            output: Buffer::empty(area),
            area,
        }
    }

    /// Create a new layer and return its ID
    pub fn create_layer(&mut self, bounds: Rect, z_index: i32, occlusion: Occlusion) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;

        self.layers
            .insert(id, Layer::new(id, bounds, z_index, occlusion));
        self.update_render_order();

        id
    }

    /// Get mutable access to a layer's buffer for rendering
    pub fn layer_buffer_mut(&mut self, id: LayerId) -> Option<&mut Buffer> {
        self.layers.get_mut(&id).map(|l| &mut l.buffer)
    }

    /// Move and resize a layer. The buffer is only reallocated on size change.
    pub fn place_layer(&mut self, id: LayerId, bounds: Rect) {
        if let Some(layer) = self.layers.get_mut(&id) {
            layer.place(bounds);
        }
    }

    /// Set layer visibility
    pub fn set_visible(&mut self, id: LayerId, visible: bool) {
        if let Some(layer) = self.layers.get_mut(&id) {
            layer.visible = visible;
        }
    }

    /// Whether a layer is currently drawn
    pub fn is_visible(&self, id: LayerId) -> bool {
        self.layers.get(&id).is_some_and(|l| l.visible)
    }

    /// Resize the entire compositor
    pub fn resize(&mut self, area: Rect) {
        self.area = area;
        self.output = Buffer::empty(area);
    }

    /// Composite all visible layers into the output buffer
    pub fn composite(&mut self) -> &Buffer {
        self.output.reset();

        // Back to front
        for id in &self.render_order {
            if let Some(layer) = self.layers.get(id) {
                if layer.visible {
                    Self::blit_layer(&mut self.output, self.area, layer);
                }
            }
        }

        &self.output
    }

    /// Find the topmost visible layer at a given position
    pub fn layer_at(&self, x: u16, y: u16) -> Option<LayerId> {
        self.render_order.iter().rev().copied().find(|id| {
            self.layers
                .get(id)
                .is_some_and(|l| l.visible && l.contains(x, y))
        })
    }

    fn blit_layer(output: &mut Buffer, area: Rect, layer: &Layer) {
        let lb = layer.bounds;

        for ly in 0..lb.height {
            for lx in 0..lb.width {
                let dst_x = lb.x.saturating_add(lx);
                let dst_y = lb.y.saturating_add(ly);
                if dst_x >= area.width || dst_y >= area.height {
                    continue;
                }

                let src_idx = layer.buffer.index_of(lx, ly);
                let Some(src_cell) = layer.buffer.content.get(src_idx) else {
                    continue;
                };

                if layer.occlusion == Occlusion::Transparent && src_cell.symbol() == " " {
                    continue;
                }

                let dst_idx = output.index_of(dst_x, dst_y);
                if let Some(dst) = output.content.get_mut(dst_idx) {
                    *dst = src_cell.clone();
                }
            }
        }
    }

    fn update_render_order(&mut self) {
        self.render_order = self.layers.keys().copied().collect();
        self.render_order
            .sort_by_key(|id| self.layers.get(id).map_or(0, |l| l.z_index));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Style;

    fn symbol_at(buf: &Buffer, x: u16, y: u16) -> String {
        buf.content[buf.index_of(x, y)].symbol().to_string()
    }

    #[test]
    fn test_higher_layer_wins() {
        let mut c = Compositor::new(Rect::new(0, 0, 10, 2));
        let low = c.create_layer(Rect::new(0, 0, 10, 2), 0, Occlusion::Transparent);
        let high = c.create_layer(Rect::new(0, 0, 10, 2), 10, Occlusion::Transparent);
        c.layer_buffer_mut(low)
            .unwrap()
            .set_string(0, 0, "low", Style::default());
        c.layer_buffer_mut(high)
            .unwrap()
            .set_string(0, 0, "H", Style::default());

        let out = c.composite();
        assert_eq!(symbol_at(out, 0, 0), "H");
        // Transparent blank cells let the lower layer through
        assert_eq!(symbol_at(out, 1, 0), "o");
    }

    #[test]
    fn test_solid_layer_hides_lower_text() {
        let mut c = Compositor::new(Rect::new(0, 0, 10, 2));
        let low = c.create_layer(Rect::new(0, 0, 10, 2), 0, Occlusion::Transparent);
        let dialog = c.create_layer(Rect::new(0, 0, 5, 1), 10, Occlusion::Solid);
        c.layer_buffer_mut(low)
            .unwrap()
            .set_string(0, 0, "background", Style::default());
        c.layer_buffer_mut(dialog).unwrap().reset();

        let out = c.composite();
        assert_eq!(symbol_at(out, 0, 0), " ");
        assert_eq!(symbol_at(out, 5, 0), "r");
    }

    #[test]
    fn test_hidden_layer_not_drawn() {
        let mut c = Compositor::new(Rect::new(0, 0, 4, 1));
        let id = c.create_layer(Rect::new(0, 0, 4, 1), 0, Occlusion::Solid);
        c.layer_buffer_mut(id)
            .unwrap()
            .set_string(0, 0, "x", Style::default());
        c.set_visible(id, false);

        assert!(!c.is_visible(id));
        assert_eq!(symbol_at(c.composite(), 0, 0), " ");
        assert_eq!(c.layer_at(0, 0), None);
    }

    #[test]
    fn test_place_layer_clips_to_area() {
        let mut c = Compositor::new(Rect::new(0, 0, 4, 1));
        let id = c.create_layer(Rect::new(0, 0, 2, 1), 0, Occlusion::Solid);
        c.place_layer(id, Rect::new(3, 0, 3, 1));
        c.layer_buffer_mut(id)
            .unwrap()
            .set_string(0, 0, "abc", Style::default());

        let out = c.composite();
        assert_eq!(symbol_at(out, 3, 0), "a");
        assert_eq!(c.layer_at(3, 0), Some(id));
    }
}

use crate::fmt::fmt;
use crate::marker::Marker;
use crate::overlay::MarkerSurface;
use crate::{Error, Result};
use plotmark_core::geom::PixelSize;
use std::cell::{Cell, RefCell};

/// An in-memory overlay layer: the headless counterpart of the chart's top `svg` element.
#[derive(Debug)]
pub struct SvgMarkerLayer {
    size: Cell<PixelSize>,
    markers: RefCell<Vec<Marker>>,
}

impl SvgMarkerLayer {
    pub fn new(size: PixelSize) -> Self {
        Self {
            size: Cell::new(size),
            markers: RefCell::new(Vec::new()),
        }
    }

    /// Resizes the layer, as a window resize would.
    pub fn set_size(&self, size: PixelSize) {
        self.size.set(size);
    }

    pub fn markers(&self) -> Vec<Marker> {
        self.markers.borrow().clone()
    }

    pub fn count_class(&self, class_name: &str) -> usize {
        self.markers
            .borrow()
            .iter()
            .filter(|m| m.class_name() == class_name)
            .count()
    }

    /// A standalone SVG document holding the current markers.
    pub fn to_svg_document(&self) -> String {
        let size = self.size.get();
        let w = fmt(size.width);
        let h = fmt(size.height);
        let mut out = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" class="main-svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
        );
        for marker in self.markers.borrow().iter() {
            out.push_str(&marker.to_svg());
        }
        out.push_str("</svg>");
        out
    }
}

impl MarkerSurface for SvgMarkerLayer {
    fn bounding_box(&self) -> PixelSize {
        self.size.get()
    }

    fn remove_markers(&self, class_name: &str) -> usize {
        let mut markers = self.markers.borrow_mut();
        let before = markers.len();
        markers.retain(|m| m.class_name() != class_name);
        before - markers.len()
    }

    fn append_marker(&self, marker: &Marker) -> Result<()> {
        let size = self.size.get();
        if !(size.width.is_finite() && size.height.is_finite()) {
            return Err(Error::Surface {
                message: format!("layer size {}x{} is not drawable", size.width, size.height),
            });
        }
        self.markers.borrow_mut().push(marker.clone());
        Ok(())
    }
}

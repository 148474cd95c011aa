//! Page geometry for image pages

/// Page size in PDF user-space units (1/72 inch)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageDimensions {
    pub width: f32,
    pub height: f32,
}

impl PageDimensions {
    /// A4 at 72 dpi, rounded to whole points (595 × 842)
    pub const A4: PageDimensions = PageDimensions {
        width: 595.0,
        height: 842.0,
    };

    /// `[0 0 width height]` media box entries
    pub fn media_box(&self) -> [f32; 4] {
        [0.0, 0.0, self.width, self.height]
    }
}

/// Where an image is drawn on a page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Placement {
    /// Transformation matrix mapping the unit square onto this placement
    pub fn matrix(&self) -> [f32; 6] {
        [self.width, 0.0, 0.0, self.height, self.x, self.y]
    }
}

/// Scale an image of `width` × `height` pixels to fit inside `page`
///
/// The aspect ratio is preserved and the image is always scaled, up or
/// down, until one side touches the page bounds. The result is anchored at
/// the page origin (bottom left).
pub fn fit_to_page(width: u32, height: u32, page: &PageDimensions) -> Placement {
    if width == 0 || height == 0 {
        return Placement {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        };
    }

    let (w, h) = (width as f32, height as f32);
    let scale = (page.width / w).min(page.height / h);

    Placement {
        x: 0.0,
        y: 0.0,
        width: w * scale,
        height: h * scale,
    }
}

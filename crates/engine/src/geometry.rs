/// Axis-aligned rectangle. The unit (tiles or pixels) is up to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub const fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Edges that only touch do not count as an intersection.
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    pub fn scaled(&self, sx: i32, sy: i32) -> Rect {
        Rect::new(self.x * sx, self.y * sy, self.width * sx, self.height * sy)
    }

    pub fn centered_on(&self, cx: i32, cy: i32) -> Rect {
        Rect::new(cx - self.width / 2, cy - self.height / 2, self.width, self.height)
    }

    /// Moves `self` inside `bounds`. When `self` is larger than `bounds` on an axis it is
    /// centered on that axis instead.
    pub fn clamped_inside(&self, bounds: &Rect) -> Rect {
        let x = if self.width >= bounds.width {
            bounds.x + (bounds.width - self.width) / 2
        } else {
            self.x.clamp(bounds.x, bounds.right() - self.width)
        };
        let y = if self.height >= bounds.height {
            bounds.y + (bounds.height - self.height) / 2
        } else {
            self.y.clamp(bounds.y, bounds.bottom() - self.height)
        };
        Rect::new(x, y, self.width, self.height)
    }
}

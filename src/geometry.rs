//! Integer geometry in layer space.
//!
//! All effect regions (apply, needed and changed rects) are axis-aligned
//! integer rectangles. The right and bottom edges are exclusive.

use std::ops::{Add, Neg, Sub};

/// Integer point / offset vector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }

    /// True when both components are zero.
    pub fn is_null(&self) -> bool {
        self.x == 0 && self.y == 0
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Axis-aligned rectangle `(x, y, width, height)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Rect { x, y, width, height }
    }

    /// Build a rect from inclusive-left/top and exclusive-right/bottom edges.
    pub fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Rect::new(left, top, right - left, bottom - top)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Center pixel, rounding towards the top-left like integer rect math
    /// in most raster engines.
    pub fn center(&self) -> Point {
        Point::new(
            (self.x + self.right() - 1).div_euclid(2),
            (self.y + self.bottom() - 1).div_euclid(2),
        )
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.width as i64 * self.height as i64
        }
    }

    pub fn translated(&self, offset: Point) -> Rect {
        Rect::new(self.x + offset.x, self.y + offset.y, self.width, self.height)
    }

    /// Grow by `dx` horizontally and `dy` vertically on each side.
    pub fn grown_xy(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(
            self.x - dx,
            self.y - dy,
            self.width + 2 * dx,
            self.height + 2 * dy,
        )
    }

    /// Grow by `amount` on every side (negative values shrink).
    pub fn grown(&self, amount: i32) -> Rect {
        self.grown_xy(amount, amount)
    }

    /// Bounding rect of both. Empty rects are ignored.
    pub fn united(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect::from_edges(
            self.left().min(other.left()),
            self.top().min(other.top()),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    /// Overlapping part of both, or an empty rect.
    pub fn intersected(&self, other: &Rect) -> Rect {
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return Rect::default();
        }
        Rect::from_edges(left, top, right, bottom)
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.right() && y < self.bottom()
    }

    /// True when `other` lies completely inside. An empty `other` is always
    /// contained.
    pub fn contains(&self, other: &Rect) -> bool {
        if other.is_empty() {
            return true;
        }
        other.left() >= self.left()
            && other.top() >= self.top()
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Split into tiles of at most `tile_size` × `tile_size`, row by row.
    pub fn tiles(&self, tile_size: i32) -> Vec<Rect> {
        let mut tiles = Vec::new();
        if self.is_empty() || tile_size <= 0 {
            return tiles;
        }
        let mut y = self.top();
        while y < self.bottom() {
            let h = tile_size.min(self.bottom() - y);
            let mut x = self.left();
            while x < self.right() {
                let w = tile_size.min(self.right() - x);
                tiles.push(Rect::new(x, y, w, h));
                x += w;
            }
            y += h;
        }
        tiles
    }
}

//! Polygon being drawn on the display canvas, before it is committed to the
//! annotation store.
//!
//! The model keeps a trailing "floating" vertex that follows the pointer, so
//! an active draft always has at least two points: the fixed ones and the
//! cursor.

use crate::coords::PixelPoint;

/// A primary press this close (display pixels) to the first vertex closes
/// the polygon.
pub const CLOSE_RADIUS: f64 = 5.0;

/// Fewest vertices a closed polygon may have.
pub const MIN_VERTICES: usize = 3;

/// What a secondary press undid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Retract {
    /// A fixed vertex of the active draft was removed (possibly emptying it).
    Vertex,
    /// The draft was idle; the caller should drop its last saved polygon.
    PreviousPolygon,
}

#[derive(Clone, Debug, Default)]
pub struct Draft {
    points: Vec<PixelPoint>,
}

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        !self.points.is_empty()
    }

    /// Fixed vertices followed by the floating cursor vertex.
    pub fn points(&self) -> &[PixelPoint] {
        &self.points
    }

    fn fixed(&self) -> &[PixelPoint] {
        match self.points.split_last() {
            Some((_, fixed)) => fixed,
            None => &[],
        }
    }

    /// Handles a primary press. Returns the finished polygon when the press
    /// lands on the first vertex.
    pub fn press(&mut self, at: PixelPoint) -> Option<Vec<PixelPoint>> {
        let Some(&first) = self.points.first() else {
            self.points = vec![at, at];
            return None;
        };

        if first.distance(at) < CLOSE_RADIUS {
            if self.fixed().len() < MIN_VERTICES {
                return None;
            }
            let mut polygon = std::mem::take(&mut self.points);
            polygon.pop();
            return Some(polygon);
        }

        // Pin the floating vertex where the press happened and start a new one.
        self.hover(at);
        self.points.push(at);
        None
    }

    pub fn hover(&mut self, at: PixelPoint) {
        if let Some(last) = self.points.last_mut() {
            *last = at;
        }
    }

    pub fn retract(&mut self, at: PixelPoint) -> Retract {
        if self.points.is_empty() {
            return Retract::PreviousPolygon;
        }

        self.points.pop();
        if self.points.len() == 1 {
            self.points.clear();
        } else if let Some(last) = self.points.last_mut() {
            *last = at;
        }
        Retract::Vertex
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

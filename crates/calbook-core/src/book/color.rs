//! Book colors and the fallback palette.
//!
//! Colors are persisted as four dot-separated integers (`r.g.b.a`).
//! Parsing is lenient: missing or malformed components read as 0, and
//! alpha is always forced to 255.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::book::BookId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse the stored `r.g.b.a` form. Never fails.
    pub fn parse(s: &str) -> Self {
        let mut parts = s.split('.').map(|p| p.trim().parse::<u8>().unwrap_or(0));
        let r = parts.next().unwrap_or(0);
        let g = parts.next().unwrap_or(0);
        let b = parts.next().unwrap_or(0);
        Self::rgb(r, g, b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.r, self.g, self.b, self.a)
    }
}

/// Colors handed out to synced books that arrive without one.
pub const FALLBACK_PALETTE: [Color; 6] = [
    Color::rgb(231, 76, 60),
    Color::rgb(230, 126, 34),
    Color::rgb(241, 196, 15),
    Color::rgb(46, 204, 113),
    Color::rgb(52, 152, 219),
    Color::rgb(155, 89, 182),
];

/// Deterministic fallback color for a stored book.
pub fn fallback_color(id: BookId) -> Color {
    let len = FALLBACK_PALETTE.len() as i64;
    FALLBACK_PALETTE[i64::from(id).rem_euclid(len) as usize]
}

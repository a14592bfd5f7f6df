//! Pilot instructions: the per-tick command a bot returns to the engine.
//!
//! Bots fill in an [`Instructions`] record with at most one primary
//! directive plus an optional sail trim. The engine decodes the record
//! exactly once into a [`Directive`] and rejects ambiguous input.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::errors::InstructionError;
use crate::types::Location;

/// An absolute heading command (degrees, 0 = East, 90 = North).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    pub angle: f64,
}

/// A direction given as a (u, v) vector; only the direction matters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub u: f64,
    pub v: f64,
}

/// The record a pilot hands back each tick. All fields optional; at most
/// one primary directive may be set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Instructions {
    pub location: Option<Location>,
    pub heading: Option<Heading>,
    pub vector: Option<Vector>,
    /// Relative turn to port, degrees.
    pub left: Option<f64>,
    /// Relative turn to starboard, degrees.
    pub right: Option<f64>,
    /// Sail trim in [0, 1]; clamped on apply.
    pub sail: Option<f64>,
}

/// The decoded primary directive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Directive {
    Goto(Location),
    SetHeading(f64),
    SetVector(DVec2),
    TurnLeft(f64),
    TurnRight(f64),
}

impl Instructions {
    /// Steer toward a location.
    pub fn goto(location: Location) -> Self {
        Self {
            location: Some(location),
            ..Self::default()
        }
    }

    /// Set an absolute heading angle.
    pub fn heading(angle: f64) -> Self {
        Self {
            heading: Some(Heading { angle }),
            ..Self::default()
        }
    }

    /// Set the heading from a direction vector.
    pub fn vector(u: f64, v: f64) -> Self {
        Self {
            vector: Some(Vector { u, v }),
            ..Self::default()
        }
    }

    /// Turn left by `degrees`.
    pub fn left(degrees: f64) -> Self {
        Self {
            left: Some(degrees),
            ..Self::default()
        }
    }

    /// Turn right by `degrees`.
    pub fn right(degrees: f64) -> Self {
        Self {
            right: Some(degrees),
            ..Self::default()
        }
    }

    /// Attach a sail trim value.
    pub fn with_sail(mut self, sail: f64) -> Self {
        self.sail = Some(sail);
        self
    }

    /// Decode into at most one primary directive plus the optional sail.
    ///
    /// Returns an error if more than one primary directive is set. An
    /// empty record (or sail-only) decodes to `(None, sail)` and is a
    /// valid "no change" instruction.
    pub fn decode(&self) -> Result<(Option<Directive>, Option<f64>), InstructionError> {
        let mut directives = Vec::with_capacity(1);
        if let Some(loc) = self.location {
            directives.push(Directive::Goto(loc));
        }
        if let Some(h) = self.heading {
            directives.push(Directive::SetHeading(h.angle));
        }
        if let Some(v) = self.vector {
            directives.push(Directive::SetVector(DVec2::new(v.u, v.v)));
        }
        if let Some(d) = self.left {
            directives.push(Directive::TurnLeft(d));
        }
        if let Some(d) = self.right {
            directives.push(Directive::TurnRight(d));
        }

        if directives.len() > 1 {
            return Err(InstructionError::MultipleDirectives {
                count: directives.len(),
            });
        }
        Ok((directives.pop(), self.sail))
    }
}

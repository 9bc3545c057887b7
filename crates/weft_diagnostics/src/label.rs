//! Labels pointing at the IR nodes involved in a diagnostic.

use serde::{Deserialize, Serialize};
use weft_common::SourceLoc;

/// The visual style of a diagnostic label.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum LabelStyle {
    /// The node that triggered the failure.
    Primary,
    /// Another node involved in the failure.
    Secondary,
}

/// One offending node: its rendered name plus every host-program location
/// recorded for it. Nodes built outside debug mode have no locations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Label {
    /// Locations recorded on the node, oldest first.
    pub locations: Vec<SourceLoc>,
    /// The message displayed with this label.
    pub message: String,
    /// Whether this is a primary or secondary label.
    pub style: LabelStyle,
}

impl Label {
    /// Creates a primary label.
    pub fn primary(locations: Vec<SourceLoc>, message: impl Into<String>) -> Self {
        Self {
            locations,
            message: message.into(),
            style: LabelStyle::Primary,
        }
    }

    /// Creates a secondary label.
    pub fn secondary(locations: Vec<SourceLoc>, message: impl Into<String>) -> Self {
        Self {
            locations,
            message: message.into(),
            style: LabelStyle::Secondary,
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::graph::GraphDelta;

/// Indicates the origin of a delta for proper handling by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EventOrigin {
    /// Delta was produced by a user-driven structural edit inside this
    /// process and has already been applied to the store before broadcast.
    Local,

    /// Delta was derived from an externally observed filesystem change.
    #[default]
    Remote,
}

/// Events delivered to downstream consumers. Delta operations must be
/// applied in list order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum Event {
    #[default]
    Ping,
    Delta(GraphDelta, EventOrigin),
}

impl Display for Event {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Event::Ping => write!(f, "Ping"),
            Event::Delta(delta, origin) => {
                write!(f, "Delta({} ops, {:?})", delta.len(), origin)
            }
        }
    }
}

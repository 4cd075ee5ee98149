//! Inbound commands to the reconciliation engine.
//!
//! These represent actions requested by the backend over the command topic
//! that [`CellService`](super::service::CellService) interprets and acts
//! upon.  Parsing from the wire format lives in the command channel adapter
//! (`adapters::mqtt`); by the time a `CellCommand` exists it is already
//! validated.

/// Commands the command channel can deliver into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellCommand {
    /// Unlock the cell: engage the relay and announce immediately.
    Open { user_id: u32 },
    /// Lock the cell: deferred until the sensor confirms physical closure.
    Close { user_id: u32 },
}

impl CellCommand {
    /// The user attributed to this command.
    pub fn user_id(self) -> u32 {
        match self {
            Self::Open { user_id } | Self::Close { user_id } => user_id,
        }
    }
}

use crate::connector::Connector;
use crate::error::{Error, Result};
use midi_types::MidiMessage;

/// Capability set of an endpoint attached as a connector's target.
///
/// Every method has a default body, so an endpoint kind implements only
/// the callbacks it cares about; an absent callback is a no-op, not an
/// error. The one exception is `relay`, whose default reports the endpoint
/// as having no relay capability.
pub trait TargetDelegate {
    /// Called right after the delegate is installed so the endpoint can
    /// register the connector as one of its inbound handles.
    fn connect(&self, connector: &Connector) -> Result<()> {
        let _ = connector;
        Ok(())
    }

    /// Handles one message arriving through the connector, synchronously.
    fn relay(&self, message: &MidiMessage) -> Result<()> {
        let _ = message;
        Err(Error::NoTarget)
    }

    /// Called when the arrangement this endpoint was part of is torn down,
    /// so it can drop or re-route state referencing the connector.
    fn invalidate(&self, connector: &Connector) {
        let _ = connector;
    }
}

/// Capability set of an endpoint attached as a connector's source.
pub trait SourceDelegate {
    /// Called right after the delegate is installed so the endpoint can
    /// register the connector as its outbound handle.
    fn connect(&self, connector: &Connector) -> Result<()> {
        let _ = connector;
        Ok(())
    }

    /// Called when the arrangement this endpoint was part of is torn down.
    fn invalidate(&self, connector: &Connector) {
        let _ = connector;
    }
}

//! Type-erased pipe between a message source and a message target.
//!
//! A [`Connector`] binds at most one source endpoint and one target
//! endpoint, each represented by a delegate implementing the capability set
//! for its side. Neither side knows the other's concrete kind; a device
//! input, a driver send queue and an RTP bridge all attach the same way.
//!
//! Lifecycle is an explicit reference count: [`Connector::create`] hands
//! out a count of one, endpoints that keep a handle [`retain`] it, and the
//! count reaching zero through [`release`] destroys the connector exactly
//! once, invalidating both sides first so each can detach cleanly.
//!
//! [`retain`]: Connector::retain
//! [`release`]: Connector::release

mod delegate;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use midi_types::MidiMessage;
use tracing::{Level, event};

use crate::error::{Error, Result};

pub use delegate::{SourceDelegate, TargetDelegate};

struct State {
    refs: Cell<usize>,
    tearing_down: Cell<bool>,
    target: RefCell<Option<Rc<dyn TargetDelegate>>>,
    source: RefCell<Option<Rc<dyn SourceDelegate>>>,
}

/// Handle to a bidirectional pipe wiring one source endpoint to one target
/// endpoint.
///
/// Cloning the handle is free and does not touch the reference count;
/// ownership is declared explicitly with [`Connector::retain`] and
/// [`Connector::release`], the way endpoints pass connectors around.
/// Single-threaded by design: all attach, detach, relay and lifecycle
/// calls happen on the one control-flow thread that drives the wiring.
#[derive(Clone)]
pub struct Connector {
    state: Rc<State>,
}

impl Connector {
    /// New connector with a reference count of one and nothing attached.
    pub fn create() -> Self {
        Connector {
            state: Rc::new(State {
                refs: Cell::new(1),
                tearing_down: Cell::new(false),
                target: RefCell::new(None),
                source: RefCell::new(None),
            }),
        }
    }

    /// Current reference count; zero once the connector has been destroyed.
    pub fn refs(&self) -> usize {
        self.state.refs.get()
    }

    pub fn has_target(&self) -> bool {
        self.state.target.borrow().is_some()
    }

    pub fn has_source(&self) -> bool {
        self.state.source.borrow().is_some()
    }

    /// Takes one more reference. Ignored while the connector is mid
    /// destruction: invalidation callbacks must not resurrect it.
    pub fn retain(&self) {
        if self.state.tearing_down.get() {
            return;
        }
        self.state.refs.set(self.state.refs.get() + 1);
    }

    /// Drops one reference; the count reaching zero destroys the
    /// connector, invalidating the source and then the target so each side
    /// gets one last chance to detach cleanly. Ignored while destruction
    /// is already in progress.
    pub fn release(&self) {
        if self.state.tearing_down.get() {
            return;
        }
        let refs = self.state.refs.get().saturating_sub(1);
        self.state.refs.set(refs);
        if refs == 0 {
            self.teardown();
        }
    }

    fn teardown(&self) {
        self.state.tearing_down.set(true);
        event!(Level::DEBUG, "tearing down connector");
        let source = self.state.source.borrow_mut().take();
        if let Some(source) = source {
            source.invalidate(self);
        }
        let target = self.state.target.borrow_mut().take();
        if let Some(target) = target {
            target.invalidate(self);
        }
    }

    /// Installs `delegate` as the target endpoint.
    ///
    /// The source side is invalidated first — it is the side still holding
    /// state that references the old downstream target — then the new
    /// delegate's `connect` runs so the endpoint can register its handle.
    pub fn attach_target(&self, delegate: Rc<dyn TargetDelegate>) -> Result<()> {
        if self.state.tearing_down.get() {
            return Err(Error::InvalidArgument("connector is being destroyed"));
        }
        let source = self.state.source.borrow().clone();
        if let Some(source) = source {
            source.invalidate(self);
        }
        *self.state.target.borrow_mut() = Some(delegate.clone());
        delegate.connect(self)
    }

    /// Installs `delegate` as the source endpoint; mirror of
    /// [`Connector::attach_target`], invalidating the target side first.
    pub fn attach_source(&self, delegate: Rc<dyn SourceDelegate>) -> Result<()> {
        if self.state.tearing_down.get() {
            return Err(Error::InvalidArgument("connector is being destroyed"));
        }
        let target = self.state.target.borrow().clone();
        if let Some(target) = target {
            target.invalidate(self);
        }
        *self.state.source.borrow_mut() = Some(delegate.clone());
        delegate.connect(self)
    }

    /// Clears the target pair and invalidates the source side — the side
    /// that must now stop assuming a target exists.
    pub fn detach_target(&self) {
        self.state.target.borrow_mut().take();
        let source = self.state.source.borrow().clone();
        if let Some(source) = source {
            source.invalidate(self);
        }
    }

    /// Clears the source pair and invalidates the target side.
    pub fn detach_source(&self) {
        self.state.source.borrow_mut().take();
        let target = self.state.target.borrow().clone();
        if let Some(target) = target {
            target.invalidate(self);
        }
    }

    /// Forwards one message to the target delegate, synchronously; control
    /// returns only after the target has fully processed it. Fails with
    /// [`Error::NoTarget`] when no target is attached or the attached
    /// delegate has no relay capability.
    pub fn relay(&self, message: &MidiMessage) -> Result<()> {
        let target = self.state.target.borrow().clone();
        match target {
            Some(target) => target.relay(message),
            None => Err(Error::NoTarget),
        }
    }
}

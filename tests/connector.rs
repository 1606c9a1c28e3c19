use std::cell::{Cell, RefCell};
use std::rc::Rc;

use midi_types::MidiMessage;
use midilink::Error;
use midilink::connector::{Connector, SourceDelegate, TargetDelegate};

type EventLog = Rc<RefCell<Vec<String>>>;

struct Target {
    name: &'static str,
    log: EventLog,
    connected: Cell<usize>,
    invalidated: Cell<usize>,
    relayed: RefCell<Vec<MidiMessage>>,
}

impl Target {
    fn new(name: &'static str, log: &EventLog) -> Rc<Self> {
        Rc::new(Target {
            name,
            log: log.clone(),
            connected: Cell::new(0),
            invalidated: Cell::new(0),
            relayed: RefCell::new(Vec::new()),
        })
    }
}

impl TargetDelegate for Target {
    fn connect(&self, _connector: &Connector) -> Result<(), Error> {
        self.connected.set(self.connected.get() + 1);
        self.log.borrow_mut().push(format!("connect {}", self.name));
        Ok(())
    }

    fn relay(&self, message: &MidiMessage) -> Result<(), Error> {
        self.relayed.borrow_mut().push(*message);
        Ok(())
    }

    fn invalidate(&self, _connector: &Connector) {
        self.invalidated.set(self.invalidated.get() + 1);
        self.log.borrow_mut().push(format!("invalidate {}", self.name));
    }
}

struct Source {
    name: &'static str,
    log: EventLog,
    connected: Cell<usize>,
    invalidated: Cell<usize>,
}

impl Source {
    fn new(name: &'static str, log: &EventLog) -> Rc<Self> {
        Rc::new(Source {
            name,
            log: log.clone(),
            connected: Cell::new(0),
            invalidated: Cell::new(0),
        })
    }
}

impl SourceDelegate for Source {
    fn connect(&self, _connector: &Connector) -> Result<(), Error> {
        self.connected.set(self.connected.get() + 1);
        self.log.borrow_mut().push(format!("connect {}", self.name));
        Ok(())
    }

    fn invalidate(&self, _connector: &Connector) {
        self.invalidated.set(self.invalidated.get() + 1);
        self.log.borrow_mut().push(format!("invalidate {}", self.name));
    }
}

#[test]
fn test_attach_target_invalidates_source_side() {
    let log = EventLog::default();
    let connector = Connector::create();
    let source = Source::new("source", &log);
    let first_target = Target::new("first", &log);
    let second_target = Target::new("second", &log);

    connector.attach_source(source.clone()).unwrap();
    assert_eq!(source.connected.get(), 1);

    connector.attach_target(first_target.clone()).unwrap();
    assert_eq!(source.invalidated.get(), 1);
    assert_eq!(first_target.connected.get(), 1);

    // replacing the target notifies the source again; the displaced target
    // delegate is not called
    connector.attach_target(second_target.clone()).unwrap();
    assert_eq!(source.invalidated.get(), 2);
    assert_eq!(first_target.invalidated.get(), 0);
    assert_eq!(second_target.connected.get(), 1);
}

#[test]
fn test_attach_source_invalidates_target_side() {
    let log = EventLog::default();
    let connector = Connector::create();
    let target = Target::new("target", &log);
    let first_source = Source::new("first", &log);
    let second_source = Source::new("second", &log);

    connector.attach_target(target.clone()).unwrap();
    connector.attach_source(first_source.clone()).unwrap();
    assert_eq!(target.invalidated.get(), 1);

    connector.attach_source(second_source.clone()).unwrap();
    assert_eq!(target.invalidated.get(), 2);
    assert_eq!(first_source.invalidated.get(), 0);
    assert_eq!(second_source.connected.get(), 1);
}

#[test]
fn test_detach_invalidates_the_other_side() {
    let log = EventLog::default();
    let connector = Connector::create();
    let source = Source::new("source", &log);
    let target = Target::new("target", &log);

    connector.attach_target(target.clone()).unwrap();
    connector.attach_source(source.clone()).unwrap();
    let target_invalidations = target.invalidated.get();

    connector.detach_target();
    assert!(!connector.has_target());
    assert_eq!(source.invalidated.get(), 1);
    assert_eq!(target.invalidated.get(), target_invalidations);

    connector.detach_source();
    assert!(!connector.has_source());
    // the target pair is already gone, so nothing is notified
    assert_eq!(target.invalidated.get(), target_invalidations);
}

#[test]
fn test_reference_count_tracks_retains_minus_releases() {
    let connector = Connector::create();
    assert_eq!(connector.refs(), 1);

    connector.retain();
    connector.retain();
    connector.retain();
    assert_eq!(connector.refs(), 4);

    connector.release();
    assert_eq!(connector.refs(), 3);
    connector.release();
    connector.release();
    assert_eq!(connector.refs(), 1);

    connector.release();
    assert_eq!(connector.refs(), 0);
}

#[test]
fn test_destruction_invalidates_source_then_target_once() {
    let log = EventLog::default();
    let connector = Connector::create();
    let source = Source::new("source", &log);
    let target = Target::new("target", &log);

    connector.attach_target(target.clone()).unwrap();
    connector.attach_source(source.clone()).unwrap();
    log.borrow_mut().clear();
    let target_invalidations = target.invalidated.get();

    connector.retain();
    connector.release();
    assert!(log.borrow().is_empty(), "destruction fired before the count hit zero");

    connector.release();
    assert_eq!(
        log.borrow().as_slice(),
        ["invalidate source".to_string(), "invalidate target".to_string()]
    );

    // further releases on the dead connector change nothing
    connector.release();
    assert_eq!(source.invalidated.get(), 1);
    assert_eq!(target.invalidated.get(), target_invalidations + 1);
}

struct Clinger {
    invalidated: Cell<usize>,
}

impl SourceDelegate for Clinger {
    // tries to keep the connector alive from inside its own teardown
    fn invalidate(&self, connector: &Connector) {
        self.invalidated.set(self.invalidated.get() + 1);
        connector.retain();
        connector.release();
        connector.release();
    }
}

#[test]
fn test_reentrant_lifecycle_calls_during_teardown_are_inert() {
    let connector = Connector::create();
    let clinger = Rc::new(Clinger {
        invalidated: Cell::new(0),
    });
    connector.attach_source(clinger.clone()).unwrap();

    connector.release();
    assert_eq!(clinger.invalidated.get(), 1);
    assert_eq!(connector.refs(), 0);
}

#[test]
fn test_relay_after_detach() {
    let log = EventLog::default();
    let connector = Connector::create();
    let target = Target::new("target", &log);
    connector.attach_target(target.clone()).unwrap();

    let message = MidiMessage::TimingClock;
    connector.relay(&message).unwrap();
    connector.detach_target();
    assert!(matches!(connector.relay(&message), Err(Error::NoTarget)));
    assert_eq!(target.relayed.borrow().len(), 1);
}

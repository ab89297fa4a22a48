//! Instrumented configurator for cache and factory tests.
//!
//! Every configured section registers its own name as a `String` and a
//! disposal hook that records the section in a shared log. Behaviour can be
//! steered per section:
//!
//! - sections marked failing return `SectionNotFound`
//! - sections marked panicking panic inside `configure`
//! - sections starting with `stubborn` get a disposal hook that fails
//! - sections starting with `gated` block until the gate is opened
//! - sections starting with `held` block on the same gate while being disposed
//! - sections starting with `slow` sleep briefly before registering

use parking_lot::{Condvar, Mutex};
use section_settings::{
    Configurator, Resolver, ServiceRegistry, SettingsFactory, SetupError, SetupResult,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Default)]
struct Gate {
    open: Mutex<bool>,
    opened: Condvar,
}

impl Gate {
    fn open(&self) {
        *self.open.lock() = true;
        self.opened.notify_all();
    }

    fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.opened.wait(&mut open);
        }
    }
}

#[derive(Default)]
pub struct CountingConfigurator {
    calls: Mutex<HashMap<String, usize>>,
    releasing: Arc<Mutex<Vec<String>>>,
    disposed: Arc<Mutex<Vec<String>>>,
    failing: Mutex<HashSet<String>>,
    panicking: Mutex<HashSet<String>>,
    gate: Arc<Gate>,
}

impl CountingConfigurator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self, section: &str) -> usize {
        self.calls.lock().get(section).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    /// Sections whose disposal has started, in order
    pub fn releasing(&self) -> Vec<String> {
        self.releasing.lock().clone()
    }

    /// Sections disposed so far, in disposal order
    pub fn disposed(&self) -> Vec<String> {
        self.disposed.lock().clone()
    }

    pub fn fail(&self, section: &str) {
        self.failing.lock().insert(section.to_string());
    }

    pub fn heal(&self, section: &str) {
        self.failing.lock().remove(section);
        self.panicking.lock().remove(section);
    }

    pub fn panic_on(&self, section: &str) {
        self.panicking.lock().insert(section.to_string());
    }

    pub fn open_gate(&self) {
        self.gate.open();
    }

    /// Poll until `section` has been configured `count` times
    pub fn wait_for_calls(&self, section: &str, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.calls(section) < count {
            assert!(Instant::now() < deadline, "configure('{section}') was not reached");
            thread::sleep(Duration::from_millis(2));
        }
    }

    /// Poll until the disposal of `section` has started
    pub fn wait_for_release(&self, section: &str) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !self.releasing.lock().iter().any(|s| s == section) {
            assert!(Instant::now() < deadline, "disposal of '{section}' was not reached");
            thread::sleep(Duration::from_millis(2));
        }
    }
}

impl Configurator for CountingConfigurator {
    fn configure(&self, section: &str) -> SetupResult<Box<dyn Resolver>> {
        *self.calls.lock().entry(section.to_string()).or_default() += 1;

        if section.starts_with("gated") {
            self.gate.wait();
        }
        if section.starts_with("slow") {
            thread::sleep(Duration::from_millis(50));
        }
        if self.panicking.lock().contains(section) {
            panic!("configure('{section}') exploded");
        }
        if self.failing.lock().contains(section) {
            return Err(SetupError::section_not_found(section));
        }

        let mut registry = ServiceRegistry::new();
        registry.register_instance(section.to_string());

        let releasing = Arc::clone(&self.releasing);
        let log = Arc::clone(&self.disposed);
        let gate = section.starts_with("held").then(|| Arc::clone(&self.gate));
        let owner = section.to_string();
        let stubborn = section.starts_with("stubborn");
        registry.on_dispose(move || {
            releasing.lock().push(owner.clone());
            if let Some(gate) = &gate {
                gate.wait();
            }
            log.lock().push(owner.clone());
            if stubborn {
                return Err(SetupError::disposal(owner, "refused to close"));
            }
            Ok(())
        });

        Ok(Box::new(registry))
    }
}

/// Factory of the given capacity around a fresh counting configurator
pub fn counting_factory(capacity: usize) -> (SettingsFactory, Arc<CountingConfigurator>) {
    let configurator = CountingConfigurator::new();
    let factory = SettingsFactory::with_capacity(configurator.clone(), capacity)
        .expect("capacity is positive");
    (factory, configurator)
}

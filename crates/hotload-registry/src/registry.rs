//! Observable name → component store.
//!
//! Mutations are serialized per registry: the value change and the delivery
//! of its event to every observer happen inside one critical section, so
//! observers see events in exactly the order mutations were applied.
//! Observer callbacks run synchronously on the mutating thread and must not
//! mutate the same registry.

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use hotload_protocol::ComponentKind;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error};

use crate::error::RegistryError;

/// Receives change events from a [`Registry`].
pub trait RegistryObserver<T>: Send + Sync {
    fn on_added(&self, name: &str, value: &T);
    fn on_removed(&self, name: &str, value: &T);
    fn on_changed(&self, name: &str, old: &T, new: &T);
}

/// One successful mutation, as delivered to observers.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEvent<T> {
    Added { name: String, value: T },
    Removed { name: String, value: T },
    Changed { name: String, old: T, new: T },
}

impl<T> RegistryEvent<T> {
    pub fn name(&self) -> &str {
        match self {
            Self::Added { name, .. } | Self::Removed { name, .. } | Self::Changed { name, .. } => {
                name
            }
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Added { .. } => "added",
            Self::Removed { .. } => "removed",
            Self::Changed { .. } => "changed",
        }
    }

    fn deliver(&self, observer: &dyn RegistryObserver<T>) {
        match self {
            Self::Added { name, value } => observer.on_added(name, value),
            Self::Removed { name, value } => observer.on_removed(name, value),
            Self::Changed { name, old, new } => observer.on_changed(name, old, new),
        }
    }
}

/// What a successful `register` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Added,
    /// An existing entry was overwritten, even with an equal value.
    Replaced,
}

/// Store for one component kind.
pub struct Registry<T> {
    kind: ComponentKind,
    items: RwLock<BTreeMap<String, T>>,
    observers: RwLock<Vec<Arc<dyn RegistryObserver<T>>>>,
    /// Held across apply + emit.
    mutation: Mutex<()>,
    closed: AtomicBool,
}

impl<T> Registry<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            items: RwLock::new(BTreeMap::new()),
            observers: RwLock::new(Vec::new()),
            mutation: Mutex::new(()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn get(&self, name: &str) -> Option<T> {
        self.items.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.read().contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.items.read().keys().cloned().collect()
    }

    pub fn snapshot(&self) -> Vec<(String, T)> {
        self.items
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Add `value` under `name`. An existing entry is replaced only when
    /// `replace` is set; otherwise the call fails with `AlreadyExists`.
    pub fn register(
        &self,
        name: &str,
        value: T,
        replace: bool,
    ) -> Result<RegisterOutcome, RegistryError> {
        let _guard = self.mutation.lock();
        self.ensure_open()?;

        let event = {
            let mut items = self.items.write();
            if !replace && items.contains_key(name) {
                return Err(RegistryError::AlreadyExists {
                    kind: self.kind,
                    name: name.to_string(),
                });
            }
            match items.insert(name.to_string(), value.clone()) {
                Some(old) => RegistryEvent::Changed {
                    name: name.to_string(),
                    old,
                    new: value,
                },
                None => RegistryEvent::Added {
                    name: name.to_string(),
                    value,
                },
            }
        };

        let outcome = match event {
            RegistryEvent::Changed { .. } => RegisterOutcome::Replaced,
            _ => RegisterOutcome::Added,
        };
        debug!("{} {name} {}", self.kind.label(), event.label());
        self.emit(&event);
        Ok(outcome)
    }

    /// Remove and return the entry stored under `name`.
    pub fn remove(&self, name: &str) -> Result<T, RegistryError> {
        let _guard = self.mutation.lock();
        self.ensure_open()?;

        let value = self
            .items
            .write()
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound {
                kind: self.kind,
                name: name.to_string(),
            })?;

        self.emit(&RegistryEvent::Removed {
            name: name.to_string(),
            value: value.clone(),
        });
        Ok(value)
    }

    /// Attach an observer. Returns `false` if it was already attached.
    pub fn attach(&self, observer: Arc<dyn RegistryObserver<T>>) -> bool {
        let mut observers = self.observers.write();
        if observers.iter().any(|o| same_observer(o, &observer)) {
            return false;
        }
        observers.push(observer);
        true
    }

    /// Detach an observer. Returns `false` if it was not attached.
    pub fn detach(&self, observer: &Arc<dyn RegistryObserver<T>>) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|o| !same_observer(o, observer));
        observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Reject all further mutations. Reads keep working.
    pub fn close(&self) {
        let _guard = self.mutation.lock();
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), RegistryError> {
        if self.is_closed() {
            Err(RegistryError::Closed { kind: self.kind })
        } else {
            Ok(())
        }
    }

    /// Deliver `event` to every observer. A panicking observer is logged and
    /// skipped; it affects neither the other observers nor the mutation.
    fn emit(&self, event: &RegistryEvent<T>) {
        let observers = self.observers.read().clone();
        for observer in observers {
            let delivered = catch_unwind(AssertUnwindSafe(|| event.deliver(observer.as_ref())));
            if delivered.is_err() {
                error!(
                    "{} observer panicked handling {} event for {}",
                    self.kind.label(),
                    event.label(),
                    event.name()
                );
            }
        }
    }
}

fn same_observer<T>(a: &Arc<dyn RegistryObserver<T>>, b: &Arc<dyn RegistryObserver<T>>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every event it sees, optionally panicking on the first one.
    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<RegistryEvent<String>>>,
        panic_on_added: bool,
    }

    impl RegistryObserver<String> for Recorder {
        fn on_added(&self, name: &str, value: &String) {
            if self.panic_on_added {
                panic!("observer failure");
            }
            self.events.lock().push(RegistryEvent::Added {
                name: name.into(),
                value: value.clone(),
            });
        }

        fn on_removed(&self, name: &str, value: &String) {
            self.events.lock().push(RegistryEvent::Removed {
                name: name.into(),
                value: value.clone(),
            });
        }

        fn on_changed(&self, name: &str, old: &String, new: &String) {
            self.events.lock().push(RegistryEvent::Changed {
                name: name.into(),
                old: old.clone(),
                new: new.clone(),
            });
        }
    }

    fn registry_with_recorder() -> (Registry<String>, Arc<Recorder>) {
        let registry = Registry::new(ComponentKind::Tool);
        let recorder = Arc::new(Recorder::default());
        assert!(registry.attach(recorder.clone()));
        (registry, recorder)
    }

    #[test]
    fn one_event_per_mutation_in_order() {
        let (registry, recorder) = registry_with_recorder();

        registry.register("a", "1".into(), true).unwrap();
        registry.register("b", "2".into(), true).unwrap();
        registry.register("a", "3".into(), true).unwrap();
        registry.remove("b").unwrap();

        let events = recorder.events.lock().clone();
        assert_eq!(
            events,
            vec![
                RegistryEvent::Added { name: "a".into(), value: "1".into() },
                RegistryEvent::Added { name: "b".into(), value: "2".into() },
                RegistryEvent::Changed { name: "a".into(), old: "1".into(), new: "3".into() },
                RegistryEvent::Removed { name: "b".into(), value: "2".into() },
            ]
        );
    }

    #[test]
    fn failed_mutations_emit_nothing() {
        let (registry, recorder) = registry_with_recorder();
        registry.register("a", "1".into(), false).unwrap();

        let err = registry.register("a", "2".into(), false).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyExists { .. }));
        assert_eq!(registry.get("a").as_deref(), Some("1"));

        let err = registry.remove("missing").unwrap_err();
        assert_eq!(err.to_string(), "Tool missing not found");

        assert_eq!(recorder.events.lock().len(), 1);
    }

    #[test]
    fn replacing_with_an_equal_value_still_emits() {
        let (registry, recorder) = registry_with_recorder();

        registry.register("doc", "same".into(), false).unwrap();
        assert_eq!(
            registry.register("doc", "same".into(), true).unwrap(),
            RegisterOutcome::Replaced
        );
        registry.remove("doc").unwrap();

        let events = recorder.events.lock().clone();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[1],
            RegistryEvent::Changed { name: "doc".into(), old: "same".into(), new: "same".into() }
        );
    }

    #[test]
    fn attach_and_detach_are_idempotent() {
        let registry: Registry<String> = Registry::new(ComponentKind::Prompt);
        let observer: Arc<dyn RegistryObserver<String>> = Arc::new(Recorder::default());

        assert!(registry.attach(observer.clone()));
        assert!(!registry.attach(observer.clone()));
        assert_eq!(registry.observer_count(), 1);

        assert!(registry.detach(&observer));
        assert!(!registry.detach(&observer));
        assert_eq!(registry.observer_count(), 0);
    }

    #[test]
    fn panicking_observer_is_isolated() {
        let registry: Registry<String> = Registry::new(ComponentKind::Resource);
        let faulty = Arc::new(Recorder {
            panic_on_added: true,
            ..Default::default()
        });
        let healthy = Arc::new(Recorder::default());
        registry.attach(faulty);
        registry.attach(healthy.clone());

        assert_eq!(
            registry.register("a", "1".into(), true).unwrap(),
            RegisterOutcome::Added
        );
        registry.remove("a").unwrap();

        assert_eq!(healthy.events.lock().len(), 2);
        assert!(!registry.contains("a"));
    }

    #[test]
    fn closed_registry_rejects_mutations() {
        let (registry, _recorder) = registry_with_recorder();
        registry.register("a", "1".into(), true).unwrap();
        registry.close();

        assert!(matches!(
            registry.register("b", "2".into(), true),
            Err(RegistryError::Closed { .. })
        ));
        assert!(matches!(registry.remove("a"), Err(RegistryError::Closed { .. })));
        assert_eq!(registry.names(), vec!["a".to_string()]);
    }
}

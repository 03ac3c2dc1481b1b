//! # Ability registry.
//!
//! Keeps declared abilities in declaration order (which is also start order)
//! with a name index for command routing.
//!
//! ## Rules
//! - Names are unique, case-sensitive and non-empty.
//! - There is no partial declaration and no removal: an ability is either
//!   declared for the supervisor's lifetime or not at all.
//! - The first declaration error is remembered; `run` refuses to start with it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::abilities::Ability;
use crate::error::RuntimeError;

#[derive(Default)]
struct Entries {
    order: Vec<Arc<dyn Ability>>,
    index: HashMap<String, usize>,
}

/// Declared abilities by name.
#[derive(Default)]
pub(crate) struct Registry {
    entries: RwLock<Entries>,
    first_error: Mutex<Option<RuntimeError>>,
}

impl Registry {
    /// Registers `ability`; the first declaration of a name wins.
    ///
    /// `open` runs under the write lock, so a declaration either lands before
    /// [`list`](Self::list) observes the registry or is refused. Its error is
    /// returned as is and not remembered.
    pub(crate) fn declare(
        &self,
        ability: Arc<dyn Ability>,
        open: impl FnOnce() -> Result<(), RuntimeError>,
    ) -> Result<(), RuntimeError> {
        let mut entries = self.entries.write();
        open()?;

        let name = ability.name().to_string();
        if name.is_empty() {
            drop(entries);
            return Err(self.remember(|| RuntimeError::InvalidName { kind: "ability" }));
        }
        if entries.index.contains_key(&name) {
            drop(entries);
            return Err(self.remember(|| RuntimeError::DuplicateAbility { name: name.clone() }));
        }
        let pos = entries.order.len();
        entries.order.push(ability);
        entries.index.insert(name, pos);
        Ok(())
    }

    /// Looks up an ability by name.
    pub(crate) fn get(&self, name: &str) -> Option<Arc<dyn Ability>> {
        let entries = self.entries.read();
        entries.index.get(name).map(|&i| Arc::clone(&entries.order[i]))
    }

    /// All abilities in declaration order.
    pub(crate) fn list(&self) -> Vec<Arc<dyn Ability>> {
        self.entries.read().order.clone()
    }

    /// Takes the first remembered declaration error, if any.
    pub(crate) fn take_error(&self) -> Option<RuntimeError> {
        self.first_error.lock().take()
    }

    /// Records the first error and hands a fresh copy back to the caller.
    fn remember(&self, make: impl Fn() -> RuntimeError) -> RuntimeError {
        let mut first = self.first_error.lock();
        if first.is_none() {
            *first = Some(make());
        }
        make()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::{AbilityFn, Command};

    impl Registry {
        fn declare_open(&self, ability: Arc<dyn Ability>) -> Result<(), RuntimeError> {
            self.declare(ability, || Ok(()))
        }
    }

    fn ability(name: &str, cmd: &'static str) -> Arc<dyn Ability> {
        AbilityFn::builder(name)
            .command(cmd, |_c: Command| async { Ok(None) })
            .build()
    }

    #[test]
    fn duplicate_keeps_first_declaration() {
        let reg = Registry::default();
        reg.declare_open(ability("speaking", "say")).unwrap();
        let err = reg.declare_open(ability("speaking", "shout")).unwrap_err();
        assert_eq!(err.as_label(), "runtime_duplicate_ability");

        let kept = reg.get("speaking").unwrap();
        assert!(kept.accepts("say"));
        assert!(!kept.accepts("shout"));
        assert_eq!(reg.list().len(), 1);

        assert!(matches!(
            reg.take_error(),
            Some(RuntimeError::DuplicateAbility { name }) if name == "speaking"
        ));
        assert!(reg.take_error().is_none());
    }

    #[test]
    fn names_are_case_sensitive_and_non_empty() {
        let reg = Registry::default();
        reg.declare_open(ability("Speaking", "say")).unwrap();
        reg.declare_open(ability("speaking", "say")).unwrap();
        assert!(reg.declare_open(ability("", "say")).is_err());
        assert!(reg.get("SPEAKING").is_none());

        let names: Vec<String> = reg.list().iter().map(|a| a.name().to_string()).collect();
        assert_eq!(names, vec!["Speaking", "speaking"]);
    }

    #[test]
    fn closed_registry_refuses_without_remembering() {
        use crate::core::RunState;

        let reg = Registry::default();
        let err = reg
            .declare(ability("speaking", "say"), || {
                Err(RuntimeError::InvalidState { op: "declare", state: RunState::Running })
            })
            .unwrap_err();
        assert_eq!(err.as_label(), "runtime_invalid_state");
        assert!(reg.get("speaking").is_none());
        assert!(reg.list().is_empty());
        assert!(reg.take_error().is_none());
    }
}

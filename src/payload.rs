//! # Opaque payloads carried by events, commands and command results.
//!
//! The bus and the supervisor never look inside a [`Payload`]; only the
//! producer and the consumer agree on its concrete type.
//!
//! ```
//! use abilityvisor::Payload;
//!
//! #[derive(Debug, PartialEq)]
//! struct Samples { rate: u32, bits: u8 }
//!
//! let p = Payload::new(Samples { rate: 16_000, bits: 16 });
//! assert_eq!(p.downcast_ref::<Samples>(), Some(&Samples { rate: 16_000, bits: 16 }));
//! assert!(p.downcast_ref::<String>().is_none());
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Type-erased, cheaply cloneable value.
#[derive(Clone)]
pub struct Payload {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Payload {
    /// Wraps a value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Returns the value if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// True if the value is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Name of the wrapped type (diagnostics only).
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload<{}>", self.type_name)
    }
}

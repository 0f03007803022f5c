//! Lazily computed property representations.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use super::lock::mutex_lock;

const SOURCE: &str = "cache::values";

/// A converted property value. Conversions are opaque to the cache; callers
/// downcast to the type their converter produces.
pub type ConvertedValue = Arc<dyn Any + Send + Sync>;

pub fn converted<T: Any + Send + Sync>(value: T) -> ConvertedValue {
    Arc::new(value)
}

/// Representation of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Intermediate value produced from the raw source; input of the other two.
    Inter,
    /// Typed object handed to consumers.
    Object,
    /// Legacy navigation representation.
    XPath,
}

#[derive(Default, Clone)]
struct Representations {
    inter: Option<ConvertedValue>,
    object: Option<ConvertedValue>,
    xpath: Option<ConvertedValue>,
}

impl Representations {
    fn slot(&mut self, kind: ValueKind) -> &mut Option<ConvertedValue> {
        match kind {
            ValueKind::Inter => &mut self.inter,
            ValueKind::Object => &mut self.object,
            ValueKind::XPath => &mut self.xpath,
        }
    }
}

/// One cache slot of a property: per culture, each representation is either
/// uninitialized or holds its computed value.
#[derive(Default)]
pub struct CacheValues {
    cultures: Mutex<HashMap<String, Representations>>,
}

impl CacheValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, culture: &str, kind: ValueKind) -> Option<ConvertedValue> {
        let mut cultures = mutex_lock(&self.cultures, SOURCE, "get");
        cultures
            .get_mut(culture)
            .and_then(|representations| representations.slot(kind).clone())
    }

    pub fn is_initialized(&self, culture: &str, kind: ValueKind) -> bool {
        self.get(culture, kind).is_some()
    }

    /// Store `value` unless the representation is already initialized, and
    /// return whichever value the slot holds afterwards.
    pub fn get_or_insert(&self, culture: &str, kind: ValueKind, value: ConvertedValue) -> ConvertedValue {
        let mut cultures = mutex_lock(&self.cultures, SOURCE, "get_or_insert");
        let slot = cultures.entry(culture.to_string()).or_default().slot(kind);
        Arc::clone(slot.get_or_insert(value))
    }
}

impl fmt::Debug for CacheValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cultures = mutex_lock(&self.cultures, SOURCE, "debug");
        f.debug_struct("CacheValues")
            .field("cultures", &cultures.keys().collect::<Vec<_>>())
            .finish()
    }
}

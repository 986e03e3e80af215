use crate::model::IndexColumn;
use std::collections::HashMap;
use std::sync::Arc;

/// A value interpreter referenced by name from an index column.
///
/// The engine only needs to know whether an interpreter produces one value
/// per language; the values themselves are computed by the object layer.
pub trait Interpreter: Send + Sync {
    fn is_localized(&self) -> bool {
        false
    }
}

/// Produces one value per language.
#[derive(Debug, Clone, Default)]
pub struct LocalizedInterpreter;

impl Interpreter for LocalizedInterpreter {
    fn is_localized(&self) -> bool {
        true
    }
}

/// Produces a single locale-independent value.
#[derive(Debug, Clone, Default)]
pub struct PlainInterpreter;

impl Interpreter for PlainInterpreter {}

#[derive(Clone, Default)]
pub struct InterpreterRegistry {
    entries: HashMap<String, Arc<dyn Interpreter>>,
}

impl InterpreterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, interpreter: Arc<dyn Interpreter>) {
        self.entries.insert(name.into(), interpreter);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Interpreter>> {
        self.entries.get(name).cloned()
    }

    /// Whether `column`'s interpreter is locale-aware. Unknown interpreter
    /// names count as locale-independent.
    pub fn is_localized(&self, column: &IndexColumn) -> bool {
        let Some(name) = column.interpreter.as_deref() else {
            return false;
        };
        match self.entries.get(name) {
            Some(interpreter) => interpreter.is_localized(),
            None => {
                tracing::debug!(
                    "Interpreter {} of column {} is not registered",
                    name,
                    column.name
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ColumnType;

    #[test]
    fn test_is_localized_lookup() {
        let mut registry = InterpreterRegistry::new();
        registry.register("localeMapping", Arc::new(LocalizedInterpreter));
        registry.register("identity", Arc::new(PlainInterpreter));

        let localized = IndexColumn::new("title", ColumnType::String).with_interpreter("localeMapping");
        let plain = IndexColumn::new("sku", ColumnType::String).with_interpreter("identity");
        let unknown = IndexColumn::new("x", ColumnType::String).with_interpreter("missing");
        let none = IndexColumn::new("y", ColumnType::String);

        assert!(registry.is_localized(&localized));
        assert!(!registry.is_localized(&plain));
        assert!(!registry.is_localized(&unknown));
        assert!(!registry.is_localized(&none));
    }
}

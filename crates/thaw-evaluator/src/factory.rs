//! Configuration-driven evaluator construction.

use indexmap::IndexMap;
use thaw_core::{ConfigError, ParamValue, ParameterList};

use crate::evaluator::Evaluator;
use crate::primary::PrimaryVariable;

/// Key naming the evaluator type in a configuration record.
pub const EVALUATOR_TYPE_KEY: &str = "evaluator type";

/// Builds one evaluator from its configuration record.
///
/// The record still contains [`EVALUATOR_TYPE_KEY`]; constructors mark it
/// consumed.
pub type Constructor = fn(&ParameterList) -> Result<Box<dyn Evaluator>, ConfigError>;

/// Maps evaluator type names to constructors.
///
/// A new factory knows only `"primary variable"`; closure-relation crates
/// register their own types.
///
/// # Examples
///
/// ```
/// use thaw_core::ParameterList;
/// use thaw_evaluator::EvaluatorFactory;
///
/// let factory = EvaluatorFactory::new();
/// let plist = ParameterList::new()
///     .with("evaluator type", "primary variable")
///     .with("field key", "pressure");
/// let ev = factory.create(&plist).unwrap();
/// assert_eq!(ev.key().name(), "pressure");
/// ```
#[derive(Clone)]
pub struct EvaluatorFactory {
    constructors: IndexMap<String, Constructor>,
}

impl EvaluatorFactory {
    /// Factory with the built-in primary variable type registered.
    pub fn new() -> Self {
        let mut f = Self {
            constructors: IndexMap::new(),
        };
        f.register(PrimaryVariable::TYPE_NAME, PrimaryVariable::construct);
        f
    }

    /// Register `constructor` under `type_name`, replacing any previous one.
    pub fn register(&mut self, type_name: &str, constructor: Constructor) -> &mut Self {
        self.constructors.insert(type_name.to_string(), constructor);
        self
    }

    /// Whether `type_name` is registered.
    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }

    /// Registered type names in registration order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Build an evaluator from a record naming its type.
    pub fn create(&self, plist: &ParameterList) -> Result<Box<dyn Evaluator>, ConfigError> {
        let type_name = match plist.get(EVALUATOR_TYPE_KEY) {
            Some(ParamValue::String(s)) => s,
            Some(other) => {
                return Err(ConfigError::WrongType {
                    context: "evaluator factory".into(),
                    key: EVALUATOR_TYPE_KEY.into(),
                    expected: "string",
                    found: other.type_name(),
                })
            }
            None => {
                return Err(ConfigError::MissingParameter {
                    context: "evaluator factory".into(),
                    key: EVALUATOR_TYPE_KEY.into(),
                })
            }
        };
        let ctor = self
            .constructors
            .get(type_name)
            .ok_or_else(|| ConfigError::UnknownEvaluatorType {
                name: type_name.clone(),
            })?;
        ctor(plist)
    }
}

impl Default for EvaluatorFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EvaluatorFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.constructors.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::EvaluatorKind;

    #[test]
    fn unknown_type_rejected() {
        let f = EvaluatorFactory::new();
        let plist = ParameterList::new().with(EVALUATOR_TYPE_KEY, "bogus");
        match f.create(&plist) {
            Err(ConfigError::UnknownEvaluatorType { name }) => assert_eq!(name, "bogus"),
            Err(other) => panic!("expected UnknownEvaluatorType, got {other:?}"),
            Ok(_) => panic!("expected UnknownEvaluatorType, got an evaluator"),
        }
    }

    #[test]
    fn missing_type_rejected() {
        let f = EvaluatorFactory::new();
        assert!(matches!(
            f.create(&ParameterList::new()),
            Err(ConfigError::MissingParameter { .. })
        ));
        let plist = ParameterList::new().with(EVALUATOR_TYPE_KEY, 3i64);
        assert!(matches!(
            f.create(&plist),
            Err(ConfigError::WrongType { .. })
        ));
    }

    #[test]
    fn custom_registration() {
        fn make(plist: &ParameterList) -> Result<Box<dyn Evaluator>, ConfigError> {
            PrimaryVariable::construct(plist)
        }
        let mut f = EvaluatorFactory::new();
        f.register("alias", make);
        assert!(f.contains("alias"));
        assert_eq!(
            f.type_names().collect::<Vec<_>>(),
            vec![PrimaryVariable::TYPE_NAME, "alias"]
        );
        let plist = ParameterList::new()
            .with(EVALUATOR_TYPE_KEY, "alias")
            .with("field key", "temperature");
        let ev = f.create(&plist).unwrap();
        assert_eq!(ev.kind(), EvaluatorKind::Primary);
    }
}

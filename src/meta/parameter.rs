use crate::{
    condition::{Arg, Condition},
    domain::Pageable,
    error::Error,
};

/// Semantic role of one formal parameter of a mapped method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParameterRole {
    /// A plain value the engine does not interpret.
    #[default]
    Value,
    /// The condition object driving query construction. At most one per
    /// method.
    Condition,
    /// The pagination window. At most one per method.
    Pageable,
}

/// Describes one formal parameter: its position in the argument list and
/// its role. Owned by its `MethodMeta` and extraction is bound to the
/// argument slice of a single call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterMeta {
    position: usize,
    role: ParameterRole,
}

impl ParameterMeta {
    pub(crate) fn new(position: usize, role: ParameterRole) -> Self {
        Self { position, role }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn role(&self) -> ParameterRole {
        self.role
    }

    /// Extracts the condition object at this parameter's position.
    pub fn condition_value<'a>(
        &self,
        method: &str,
        args: &[Arg<'a>],
    ) -> Result<&'a dyn Condition, Error> {
        match args.get(self.position) {
            Some(Arg::Condition(condition)) => Ok(*condition),
            _ => Err(self.mismatch(method)),
        }
    }

    /// Extracts the pagination window at this parameter's position.
    pub fn pageable_value(&self, method: &str, args: &[Arg<'_>]) -> Result<Pageable, Error> {
        match args.get(self.position) {
            Some(Arg::Pageable(pageable)) => Ok(*pageable),
            _ => Err(self.mismatch(method)),
        }
    }

    fn mismatch(&self, method: &str) -> Error {
        Error::ArgumentMismatch {
            method: method.to_string(),
            position: self.position,
        }
    }
}

use crate::function::Function;
use crate::types::Type;
use crate::values::{Constant, ValueId};
use crate::{IrError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A function referenced by the module but defined elsewhere (`declare i32 @getchar()`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub return_type: Type,
    pub param_types: Vec<Type>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Global {
    pub name: ValueId,
    pub value_type: Type,
    pub initializer: Option<Constant>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub globals: Vec<Global>,
    pub declarations: IndexMap<String, Declaration>,
    pub functions: IndexMap<String, Function>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add_function(&mut self, function: Function) {
        self.functions.insert(function.name.clone(), function);
    }

    pub fn add_declaration(&mut self, declaration: Declaration) {
        self.declarations.insert(declaration.name.clone(), declaration);
    }

    pub fn add_global(&mut self, global: Global) {
        self.globals.push(global);
    }

    pub fn function(&self, name: &str) -> Result<&Function> {
        self.functions
            .get(name)
            .ok_or_else(|| IrError::FunctionNotFound(name.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.functions.values().try_for_each(Function::validate)
    }
}

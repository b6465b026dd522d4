//! Especificación de lanzamiento del proceso hijo, propiedad del framework.

use std::collections::BTreeMap;
use std::ffi::OsString;

use flowenv_core::ExecutionContext;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchPlan {
    /// Comandos activos de la invocación.
    pub commands: Vec<String>,
    pub env: BTreeMap<String, OsString>,
    pub entrypoint: Vec<OsString>,
}

impl LaunchPlan {
    pub fn new(entrypoint: Vec<OsString>) -> Self {
        Self { entrypoint, ..Default::default() }
    }

    /// `true` si algún comando activo fuerza la arquitectura canónica.
    pub fn requests_forcing(&self, force_list: &[String]) -> bool {
        self.commands.iter().any(|c| force_list.contains(c))
    }

    /// Fusiona el contexto: variables encima de las existentes e intérprete en
    /// el primer elemento del entrypoint.
    pub fn apply(&mut self, ctx: &ExecutionContext) {
        for (k, v) in ctx.variables() {
            self.env.insert(k.clone(), v.clone());
        }
        if let Some(interpreter) = ctx.interpreter() {
            match self.entrypoint.first_mut() {
                Some(first) => *first = interpreter.as_os_str().to_owned(),
                None => self.entrypoint.push(interpreter.as_os_str().to_owned()),
            }
        }
    }
}

//! Hand-written entity used by unit tests that must not depend on the derive.

use crate::core::{Result, Value};
use crate::entity::{Entity, EntityRef};
use std::any::Any;

/// Records every dynamic method call; each call returns the method name.
pub struct Probe {
    pub total: Value,
    pub calls: Vec<String>,
    methods: Vec<&'static str>,
}

impl Probe {
    pub fn new(methods: &[&'static str]) -> Self {
        Self {
            total: Value::Null,
            calls: Vec::new(),
            methods: methods.to_vec(),
        }
    }
}

impl Entity for Probe {
    fn class_name(&self) -> &str {
        "Probe"
    }

    fn declared_properties(&self) -> &'static [&'static str] {
        &["total"]
    }

    fn read_field(&self, field: &str) -> Option<Value> {
        (field == "total").then(|| self.total.clone())
    }

    fn write_field(&mut self, field: &str, value: Value) -> Option<Result<()>> {
        if field != "total" {
            return None;
        }
        self.total = value;
        Some(Ok(()))
    }

    fn has_method(&self, name: &str) -> bool {
        self.methods.contains(&name)
    }

    fn call_method(&mut self, _this: &EntityRef, name: &str, args: Vec<Value>) -> Option<Result<Value>> {
        if !self.has_method(name) {
            return None;
        }
        let call = if args.is_empty() {
            name.to_string()
        } else {
            let rendered: Vec<String> = args.iter().map(Value::to_string).collect();
            format!("{}({})", name, rendered.join(", "))
        };
        self.calls.push(call);
        Some(Ok(Value::Text(name.to_string())))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

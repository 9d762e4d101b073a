//! Ordered accessor resolution: override method, conventional method, raw field.
//!
//! Each tier either applies (and the chain stops) or declines. The raw-field
//! tier is supplied per operation by the wrapper, since "raw" means a plain
//! read for `get`, a plain write for `set` and the default collection path
//! for `add` / `remove`.

use crate::config::AccessorConfig;
use crate::core::{AccessError, Result, Value};
use crate::entity::EntityRef;
use crate::overrides::{AccessorKind, AccessorOverrideCache};
use tracing::{Level, event};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    OverrideMethod,
    ConventionalMethod,
    RawField,
}

/// One accessor invocation flowing through the chain.
pub struct AccessRequest<'a> {
    pub entity: &'a EntityRef,
    pub kind: AccessorKind,
    pub property: &'a str,
    pub args: Vec<Value>,
}

impl<'a> AccessRequest<'a> {
    pub fn new(entity: &'a EntityRef, kind: AccessorKind, property: &'a str, args: Vec<Value>) -> Self {
        Self {
            entity,
            kind,
            property,
            args,
        }
    }
}

/// Outcome of a chain run: which tier handled it and what it returned.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub tier: Tier,
    pub value: Value,
}

pub trait AccessStrategy {
    fn tier(&self) -> Tier;

    /// `Ok(None)` when this tier does not apply to the request.
    fn try_access(&self, request: &AccessRequest<'_>) -> Result<Option<Value>>;
}

/// Calls the custom method configured for the property, if any.
pub struct OverrideMethod<'a> {
    overrides: &'a AccessorOverrideCache,
}

impl<'a> OverrideMethod<'a> {
    pub fn new(overrides: &'a AccessorOverrideCache) -> Self {
        Self { overrides }
    }
}

impl AccessStrategy for OverrideMethod<'_> {
    fn tier(&self) -> Tier {
        Tier::OverrideMethod
    }

    fn try_access(&self, request: &AccessRequest<'_>) -> Result<Option<Value>> {
        let accessor = {
            let entity = request.entity.borrow()?;
            self.overrides.resolve(&*entity, request.property)
        };
        let Some(method) = accessor.method(request.kind) else {
            return Ok(None);
        };

        // A configured override that the entity does not provide is a
        // configuration error, not a reason to fall through.
        invoke(request, method)?
            .map(Some)
            .ok_or_else(|| {
                AccessError::method_call(
                    request.entity.class_name(),
                    method,
                    format!("configured {} override is not defined", request.kind.as_str()),
                )
            })
    }
}

/// Calls `<prefix><property>` when the entity defines it.
pub struct ConventionalMethod<'a> {
    config: &'a AccessorConfig,
}

impl<'a> ConventionalMethod<'a> {
    pub fn new(config: &'a AccessorConfig) -> Self {
        Self { config }
    }
}

impl AccessStrategy for ConventionalMethod<'_> {
    fn tier(&self) -> Tier {
        Tier::ConventionalMethod
    }

    fn try_access(&self, request: &AccessRequest<'_>) -> Result<Option<Value>> {
        let method = self.config.conventional_method(request.kind, request.property);
        if !request.entity.borrow()?.has_method(&method) {
            return Ok(None);
        }
        invoke(request, &method)
    }
}

/// Terminal tier; always applies.
pub struct RawField<'a> {
    access: Box<dyn Fn(&AccessRequest<'_>) -> Result<Value> + 'a>,
}

impl<'a> RawField<'a> {
    pub fn new(access: impl Fn(&AccessRequest<'_>) -> Result<Value> + 'a) -> Self {
        Self {
            access: Box::new(access),
        }
    }
}

impl AccessStrategy for RawField<'_> {
    fn tier(&self) -> Tier {
        Tier::RawField
    }

    fn try_access(&self, request: &AccessRequest<'_>) -> Result<Option<Value>> {
        (self.access)(request).map(Some)
    }
}

fn invoke(request: &AccessRequest<'_>, method: &str) -> Result<Option<Value>> {
    let mut entity = request.entity.borrow_mut()?;
    entity
        .call_method(request.entity, method, request.args.clone())
        .transpose()
}

pub struct ResolutionChain<'a> {
    strategies: Vec<Box<dyn AccessStrategy + 'a>>,
}

impl<'a> ResolutionChain<'a> {
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// The fixed override -> convention -> raw order.
    pub fn standard(
        overrides: &'a AccessorOverrideCache,
        config: &'a AccessorConfig,
        raw: RawField<'a>,
    ) -> Self {
        Self::new()
            .then(OverrideMethod::new(overrides))
            .then(ConventionalMethod::new(config))
            .then(raw)
    }

    pub fn then(mut self, strategy: impl AccessStrategy + 'a) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Runs tiers in order and stops at the first that applies.
    pub fn run(&self, request: &AccessRequest<'_>) -> Result<Resolved> {
        for strategy in &self.strategies {
            if let Some(value) = strategy.try_access(request)? {
                event!(
                    Level::TRACE,
                    class = request.entity.class_name(),
                    property = request.property,
                    kind = request.kind.as_str(),
                    tier = ?strategy.tier(),
                    "accessor resolved"
                );
                return Ok(Resolved {
                    tier: strategy.tier(),
                    value,
                });
            }
        }

        Err(AccessError::field_not_exist(
            request.entity.class_name(),
            request.property,
        ))
    }
}

impl Default for ResolutionChain<'_> {
    fn default() -> Self {
        Self::new()
    }
}

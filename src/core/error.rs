use std::fmt;
use thiserror::Error;

/// Why an association request was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssociationFault {
    NotDeclared,
    NotToMany,
    InvalidTarget { expected: String, given: String },
}

#[derive(Error, Debug)]
pub enum AccessError {
    #[error("Class {class} has no field {field}")]
    InvalidField { class: String, field: String },

    #[error("{}", association_message(.class, .association, .reason))]
    InvalidAssociation {
        class: String,
        association: String,
        reason: AssociationFault,
    },

    #[error("Class property {class}::${property} is not {expected}")]
    UnexpectedValue {
        class: String,
        property: String,
        expected: &'static str,
    },

    #[error("Entity of class {0} is a lazy reference that has not been materialized")]
    NotMaterialized(String),

    #[error("Entity of class {0} is already borrowed by a running accessor")]
    EntityBusy(String),

    #[error("Method {class}::{method}() failed: {message}")]
    MethodCall {
        class: String,
        method: String,
        message: String,
    },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Payload-free classification of [`AccessError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidField,
    InvalidAssociation,
    UnexpectedValue,
    NotMaterialized,
    EntityBusy,
    MethodCall,
    Persistence,
    Config,
}

impl AccessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidField { .. } => ErrorKind::InvalidField,
            Self::InvalidAssociation { .. } => ErrorKind::InvalidAssociation,
            Self::UnexpectedValue { .. } => ErrorKind::UnexpectedValue,
            Self::NotMaterialized(_) => ErrorKind::NotMaterialized,
            Self::EntityBusy(_) => ErrorKind::EntityBusy,
            Self::MethodCall { .. } => ErrorKind::MethodCall,
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    pub fn field_not_exist(class: impl Into<String>, field: impl Into<String>) -> Self {
        Self::InvalidField {
            class: class.into(),
            field: field.into(),
        }
    }

    pub fn association_not_exist(class: impl Into<String>, association: impl Into<String>) -> Self {
        Self::InvalidAssociation {
            class: class.into(),
            association: association.into(),
            reason: AssociationFault::NotDeclared,
        }
    }

    pub fn not_to_many_association(class: impl Into<String>, association: impl Into<String>) -> Self {
        Self::InvalidAssociation {
            class: class.into(),
            association: association.into(),
            reason: AssociationFault::NotToMany,
        }
    }

    pub fn invalid_target_entity(
        class: impl Into<String>,
        association: impl Into<String>,
        expected: impl Into<String>,
        given: impl Into<String>,
    ) -> Self {
        Self::InvalidAssociation {
            class: class.into(),
            association: association.into(),
            reason: AssociationFault::InvalidTarget {
                expected: expected.into(),
                given: given.into(),
            },
        }
    }

    pub fn not_a_collection(class: impl Into<String>, property: impl Into<String>) -> Self {
        Self::UnexpectedValue {
            class: class.into(),
            property: property.into(),
            expected: "a collection",
        }
    }

    pub fn method_call(
        class: impl Into<String>,
        method: impl Into<String>,
        message: impl fmt::Display,
    ) -> Self {
        Self::MethodCall {
            class: class.into(),
            method: method.into(),
            message: message.to_string(),
        }
    }
}

fn association_message(class: &str, association: &str, reason: &AssociationFault) -> String {
    match reason {
        AssociationFault::NotDeclared => format!("Class {class} has no association {association}"),
        AssociationFault::NotToMany => format!(
            "Class association {class}::${association} is not one-to-many or many-to-many association"
        ),
        AssociationFault::InvalidTarget { expected, given } => format!(
            "Invalid class for {class}::${association}. {expected} expected, {given} given"
        ),
    }
}

pub type Result<T> = std::result::Result<T, AccessError>;

impl From<serde_json::Error> for AccessError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for AccessError {
    fn from(err: std::io::Error) -> Self {
        Self::Config(err.to_string())
    }
}

pub mod error;
pub mod identifier;
pub mod value;

pub use error::{AccessError, AssociationFault, ErrorKind, Result};
pub use identifier::Identifier;
pub use value::{FromValue, IntoValue, Value, ValueMismatch};

pub mod error;
pub mod lang_string;
pub mod value;

pub use error::{PersistError, Result};
pub use lang_string::LangString;
pub use value::{FromValue, Value};

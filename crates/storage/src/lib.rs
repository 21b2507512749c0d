//! Local storage of versioned geolocation databases.
//!
//! Database files carry their version in their name
//! (`<prefix>-<YYYY>-<MM>.<extension>`); there is no manifest. The
//! [`NamingScheme`] recognises and produces those names, and the
//! [`LocalStore`] keeps the runtime directory holding them: listing the
//! installed versions, staging downloads as partial files and promoting or
//! deleting them.

pub mod error;
mod local;
mod naming;
mod path;

pub use crate::local::{LocalStore, PartialFile};
pub use crate::naming::{DEFAULT_EXTENSION, DEFAULT_PREFIX, DatabaseFile, DatabaseVersion, NamingScheme};
pub use crate::path::validate_file_name;

//! Rule implementations for translens.
//!
//! Pure functions over analyzed templates and the unified catalog, each
//! returning one issue type.
//!
//! ## Module Structure
//!
//! - `missing_key`: keys absent from the catalog for their domain
//! - `missing_locale`: keys lacking a required or requested locale

pub mod missing_key;
pub mod missing_locale;

pub use missing_key::check_missing_key;
pub use missing_locale::check_missing_locale;

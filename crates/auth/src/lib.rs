//! Strand - Authorization
//!
//! Static allow-lists of 128-bit identifiers. The server keeps two: one for
//! applications allowed to emit events, and one for viewers allowed to
//! subscribe. A viewer's position in its list is its slot, and therefore its
//! interest bit, for the lifetime of the process.
//!
//! # File Format
//!
//! ```text
//! # comments start with #
//! 6f1c2b8e-93a1-4d7e-9a55-0c2f4b1d8e70
//! 0b7e41c2-5d3a-4f18-8c6e-2a9d7f3b1c05
//! ```

mod allow_list;
mod error;

pub use allow_list::AllowList;
pub use error::{AuthError, Result};

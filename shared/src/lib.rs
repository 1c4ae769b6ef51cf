//! Data types shared between the baby tracker backend and its clients.
//!
//! Everything in here is plain serde data: events and their variants, babies,
//! families, remote admin settings, the editable form mirrors of each event
//! variant and the request/response types of the REST API. No I/O happens in
//! this crate.

/// Declares a closed enum whose values are persisted by a stable upper-case name.
macro_rules! stored_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Stable name used in storage and on the wire
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// Parse a stored name back, `None` for anything unrecognized
            pub fn parse(name: &str) -> Option<Self> {
                match name {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub mod api;
pub mod baby;
pub mod events;
pub mod family;
pub mod forms;
pub mod settings;

pub use api::*;
pub use baby::*;
pub use events::*;
pub use family::*;
pub use forms::*;
pub use settings::*;

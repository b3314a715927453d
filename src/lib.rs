//! # segmented-session
//!
//! A thin facade over a host platform's session facility: session
//! attributes as properties, hierarchical "segments" over the flat
//! session key-value store, and one-time "flash" values layered on a
//! segment. A runtime lifecycle and in-memory backend make the whole
//! surface usable from command line tools and tests, where interactive
//! session persistence is unavailable or undesired.
//!
//! ## Features
//!
//! - **Segments**: named, lazily created views over one sub-tree of the
//!   session store. Segments are addressing handles, not copies: every
//!   handle over the same name observes the same data.
//! - **Flash values**: written once, persisted across exactly one
//!   session reload, and served from a volatile tier after the first
//!   read.
//! - **Session tokens**: high-entropy per-session tokens with
//!   constant-time verification, for validating that a request belongs
//!   to the current session.
//! - **Pluggable lifecycle and storage**: the host session facility and
//!   its persistence are consumed through traits, with in-memory
//!   runtime implementations included.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use segmented_session::{KeyedContainer, Session};
//!
//! let session = Session::new();
//!
//! let cart = session.segments().get("cart");
//! cart.set("items", vec!["apples", "pears"]);
//!
//! cart.flash().set("notice", "cart updated");
//! assert_eq!(
//!     cart.flash().get::<String>("notice").as_deref(),
//!     Some("cart updated")
//! );
//!
//! let token = session.token();
//! assert!(session.verify_token(&token));
//! ```

pub mod backend;
pub mod collection;
pub mod config;
pub mod error;
pub mod flash;
pub mod lifecycle;
pub mod segment;
pub mod session;
pub mod store;

mod token;

pub use backend::{RuntimeBackend, StorageBackend};
pub use collection::SegmentCollection;
pub use config::{CookieOptions, CookieParams, SessionOptions};
pub use error::SessionError;
pub use flash::{Flash, FLASH_NAME};
pub use lifecycle::{
    LifecycleOp, LifecycleOutcome, RuntimeLifecycle, SessionLifecycle, SessionStatus,
};
pub use segment::Segment;
pub use session::Session;
pub use store::{KeyedContainer, MutableView, Store};
pub use token::TOKEN_NAME;

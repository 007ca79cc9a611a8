//! Amalgam: a native/script object bridge written in Rust
//!
//! Amalgam embeds a small JS-flavored scripting layer over native Rust
//! objects. Script code can construct, call, and mutate objects the native
//! side owns, while the native side keeps final authority over mutability,
//! lifetime, and identity: handles carry per-handle const/mutable capability
//! tags, aliased handles share one identity, and destroying an object makes
//! every outstanding handle fail cleanly instead of dangling.
//!
//! # Quick Start
//!
//! ```no_run
//! use amalgam::{Host, Value};
//!
//! fn main() -> amalgam::Result<()> {
//!     let mut host = Host::new();
//!     host.register_function("add", |args| {
//!         Ok(Value::Number(args[0].to_number() + args[1].to_number()))
//!     });
//!     let result = host.run("add(21, 2)")?;
//!     println!("Result: {}", result);
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! The pipeline flows: Source → [`lexer`] → [`parser`] → [`ast`] → [`runtime`] → Result,
//! with every native-object touch routed through [`bridge`] and values
//! crossing the boundary through [`marshal`].
//!
//! | Category | Modules |
//! |----------|---------|
//! | **Frontend** | [`lexer`], [`parser`], [`ast`], [`runtime`] |
//! | **Bridge** | [`bridge`] (registry, bindings, dispatch), [`marshal`] |
//! | **Errors** | [`Error`], [`Result`] |

pub mod ast;
pub mod bridge;
pub mod lexer;
pub mod marshal;
pub mod parser;
pub mod runtime;

mod error;

pub use bridge::{
    Access, BindingTable, ClassBinding, ClassBuilder, ClassDescriptor, Dispatcher, Handle,
    HandleRegistry, NativeObject,
};
pub use error::{BridgeErrorKind, Error, Result, SourceLocation};
pub use marshal::{Expected, HostValue};
pub use runtime::{Host, Value};

/// Amalgam version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

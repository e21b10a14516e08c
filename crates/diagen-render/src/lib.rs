//! External renderer invocation for diagen.
//!
//! This crate renders cache misses through an external tool whose output file
//! name cannot be predicted (`PlantUML` names SVGs after the diagram title):
//! - [`Renderer`] abstracts the tool; [`CommandRenderer`] runs a process with a timeout
//! - [`RenderInvoker`] isolates each render in a private scratch directory,
//!   discovers the produced file and moves it to the artifact path
//!
//! # Architecture
//!
//! - [`renderer`](Renderer): the renderer seam and the process implementation
//! - [`invoker`](RenderInvoker): scratch staging, output discovery and publishing
//! - [`error`](RenderError): per-step render errors and the run precondition

mod consts;
mod error;
mod invoker;
mod renderer;
mod scratch;

pub use consts::DEFAULT_TIMEOUT;
pub use error::{InvokeError, PreconditionError, RenderError, RenderErrorKind, RenderStep};
pub use invoker::{MultipleOutputs, Published, RenderInvoker};
pub use renderer::{CommandRenderer, Renderer};

//! Context assembly.
//!
//! | Piece          | Role                                              |
//! |----------------|---------------------------------------------------|
//! | `assembler`    | concurrent fan-out, fallback package, refinement  |
//! | `catalog`      | tools derived from configured providers           |
//! | `instructions` | baseline and task-specific system directives      |

pub mod assembler;
pub mod catalog;
pub mod instructions;

pub use assembler::{AssemblerSettings, ContextAssembler, FALLBACK_COMPLETENESS};
pub use catalog::{BASELINE_TOOLS, StaticToolCatalog};
pub use instructions::{baseline_instructions, system_instructions};

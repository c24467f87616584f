//! Platform shim (component A).
//!
//! The minimal contract the core needs from the host OS: load/unload
//! shared libraries, stat a file's mtime, page-granular virtual memory,
//! and an atomic counter. Everything else (windowing, networking,
//! threading pools) belongs to the embedding application.

pub mod atomics;
pub mod library;
pub mod virtual_memory;

pub use atomics::AtomicCounter;
pub use library::{load_library, LoadedLibrary};
pub use virtual_memory::{page_size, VirtualMemoryError};

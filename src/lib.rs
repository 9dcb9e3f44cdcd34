// Buddysim - binary buddy allocator simulator
// Replays a stream of allocation requests and reports fragmentation

#![warn(rust_2018_idioms)]

pub mod buddy;
pub mod config;
pub mod input;
pub mod simulation;

// Re-exports for convenience
pub use buddy::{Allocation, BuddyAllocator, Geometry, MemoryReport};
pub use self::config::SimConfig;
pub use input::{Request, RequestReader};

/// Buddysim error types
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Read error: {0}")]
        Input(String),

        #[error("Format error: {0}")]
        Format(String),

        #[error("Program {label} ({size_kb} KB): no suitable free block.")]
        OutOfMemory { label: char, size_kb: i64 },

        #[error("Configuration error: {0}")]
        Config(String),

        #[error("Internal error: {0}")]
        Internal(String),

        #[error("Output error: {0}")]
        Output(#[from] std::io::Error),
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

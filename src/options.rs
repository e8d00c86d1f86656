//! Compiler configuration.
//!
//! Options are assembled by the driver from command-line flags and threaded
//! through every lowering pass. Logging verbosity is configured separately
//! through `RUST_LOG` (see [`crate::init_tracing`]).

/// Options controlling a single compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    /// Name reported in spans and diagnostics.
    pub file_name: String,
    /// Size of a machine word in bytes. Values up to this size cross
    /// function boundaries directly; larger aggregates go indirect.
    pub word_size: u64,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            file_name: String::from("<input>"),
            word_size: 8,
        }
    }
}

impl CompileOptions {
    pub fn new(file_name: &str) -> Self {
        CompileOptions {
            file_name: file_name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_word_size(mut self, word_size: u64) -> Self {
        self.word_size = word_size;
        self
    }
}

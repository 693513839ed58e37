//! VM construction parameters.
//!
//! A plain builder-style struct, not a config-file format — PL/0 programs
//! have no persisted state (spec §6), so the only configurable knobs are
//! the ones the CLI exposes as flags. Modeled after `CompilerConfig` in
//! the sibling `pl0-compiler` crate: a struct with a `new()` + `with_*`
//! builder API rather than a constructor with a long positional argument
//! list.

/// Parameters controlling a single [`crate::Vm`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Capacity of the `data` segment. The original PL/0 VM defaults to 500.
    pub stack_size: usize,
    /// Whether the interactive single-step debugger starts armed (normally
    /// only turned on by executing a `DEBUG` statement).
    pub debug: bool,
    /// Whether the debugger actually blocks on stdin when armed. Tests
    /// that want to exercise the `DEBUG` opcode's state transition without
    /// hanging on input construct a `Vm` with this set to `false`.
    pub interactive: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            stack_size: 500,
            debug: false,
            interactive: true,
        }
    }
}

impl VmConfig {
    pub fn new() -> Self {
        VmConfig::default()
    }

    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }
}

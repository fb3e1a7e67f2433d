//! The compilation environment: the single root handle owning every
//! interning table and its configuration.
//!
//! The original threads a single `Environment *` through every function
//! rather than relying on process-global state, so that a host can run
//! several independent compilations in one process. `Environment` plays
//! that role here: it owns an [`AtomInterner`] and nothing is ever stashed
//! in a `static`.

use crate::atoms::AtomInterner;

/// Initial table sizes and scanning policy for a fresh [`Environment`].
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentConfig {
    pub symbol_table_capacity: usize,
    pub string_table_capacity: usize,
    pub instance_name_table_capacity: usize,
    pub float_table_capacity: usize,
    pub integer_table_capacity: usize,
    pub bitmap_table_capacity: usize,
    pub external_address_table_capacity: usize,
    /// If `true`, numeric overflow while scanning a number token is a hard
    /// error instead of a warning with a saturated value.
    pub strict_numeric_overflow: bool,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        EnvironmentConfig {
            symbol_table_capacity: 167,
            string_table_capacity: 167,
            instance_name_table_capacity: 167,
            float_table_capacity: 167,
            integer_table_capacity: 167,
            bitmap_table_capacity: 167,
            external_address_table_capacity: 167,
            strict_numeric_overflow: false,
        }
    }
}

/// Owns every table a compilation needs. Constructed fresh per compilation
/// unit; never global.
pub struct Environment {
    pub atoms: AtomInterner,
    pub config: EnvironmentConfig,
    halt: bool,
    evaluation_error: bool,
}

impl Environment {
    pub fn new(config: EnvironmentConfig) -> Self {
        let atoms = AtomInterner::with_capacities(
            config.symbol_table_capacity,
            config.string_table_capacity,
            config.instance_name_table_capacity,
            config.float_table_capacity,
            config.integer_table_capacity,
            config.bitmap_table_capacity,
            config.external_address_table_capacity,
        );
        Environment {
            atoms,
            config,
            halt: false,
            evaluation_error: false,
        }
    }

    /// Requests cooperative cancellation; checked at yield points (the top
    /// of each construct in a load, the top of each module multi-import
    /// scan iteration).
    pub fn request_halt(&mut self) {
        self.halt = true;
        log::warn!("halt requested; compilation will stop at the next yield point");
    }

    pub fn halt_requested(&self) -> bool {
        self.halt
    }

    /// Clears a previously requested halt, for reuse of the same
    /// environment across multiple loads.
    pub fn clear_halt(&mut self) {
        self.halt = false;
    }

    /// Sets the evaluation-error flag. Distinct from `halt`: this records
    /// that something went wrong during a load so an outer loop or command
    /// dispatcher can check it after the fact, rather than requesting that
    /// the current load stop early.
    pub fn set_evaluation_error(&mut self) {
        self.evaluation_error = true;
    }

    pub fn evaluation_error_raised(&self) -> bool {
        self.evaluation_error
    }

    /// Clears a previously raised evaluation error, for reuse of the same
    /// environment across multiple loads.
    pub fn clear_evaluation_error(&mut self) {
        self.evaluation_error = false;
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(EnvironmentConfig::default())
    }
}

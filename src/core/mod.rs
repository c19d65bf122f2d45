// Core modules implementing path resolution, lookup sources, and error modeling.
pub mod error;
pub mod path;
pub mod replacer;
pub mod vars;

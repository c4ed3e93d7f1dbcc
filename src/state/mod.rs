/// State management module
/// 
/// This module handles all application state, including:
/// - Shared data structures (data.rs)
/// - The six-point capture state machine (session.rs)
/// - Persisted form options and the validated batch snapshot (options.rs)
/// - Batch iteration and the script sink (batch.rs)
/// - Catalog of already logged rasters (ledger.rs)

pub mod data;
pub mod session;
pub mod options;
pub mod batch;
pub mod ledger;

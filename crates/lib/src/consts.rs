//! Names and widths shared across the extraction pipeline.

/// Default name of the scripts folder created under the output directory.
pub const DEFAULT_FOLDER_NAME: &str = "otl_scripts_folder";

/// Ledger file written at the scripts root and inside every container folder.
pub const LOG_FILENAME: &str = "log.json";

/// Hex characters kept from the identity digest (128 bits).
pub const IDENTITY_HEX_LEN: usize = 32;

/// Extension given to every extracted script.
pub const SCRIPT_EXTENSION: &str = "py";

pub const MAIN_SCRIPTS_DIR: &str = "main_python_scripts";
pub const ITEM_GENERATION_DIR: &str = "item_generation_scripts";
pub const PARAMETER_CALLBACKS_DIR: &str = "parameter_callbacks";

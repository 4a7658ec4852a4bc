pub mod scan_cmd;
pub mod validate_cmd;

pub use scan_cmd::cmd_scan;
pub use validate_cmd::cmd_validate;

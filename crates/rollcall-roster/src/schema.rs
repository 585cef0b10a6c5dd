//! Roster column names.

pub const TIMESTAMP: &str = "Timestamp";
pub const EMAIL_ADDRESS: &str = "Email address";
pub const FULL_NAME: &str = "Full Name";
pub const EMAIL: &str = "Email";
pub const DEPARTMENT: &str = "Department/Class";
pub const IP_ADDRESS: &str = "Your IP Address";
pub const STATUS: &str = "Status";

/// Optional; status transitions are only written when the roster has it.
pub const STATUS_LOG: &str = "Status Log";

/// Columns every roster must carry, in sheet order.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    TIMESTAMP,
    EMAIL_ADDRESS,
    FULL_NAME,
    EMAIL,
    DEPARTMENT,
    IP_ADDRESS,
    STATUS,
];

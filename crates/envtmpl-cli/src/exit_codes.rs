//! Process exit codes

/// Success - template rendered and written
pub const SUCCESS: i32 = 0;

/// Usage error - bad arguments or options; also used after printing help
pub const USAGE_ERROR: i32 = 1;

/// Template parse error - bad syntax, no matching template file, unreadable source
pub const TEMPLATE_PARSE_ERROR: i32 = 2;

/// Template execution error - unknown entry template or a failing function
pub const TEMPLATE_EXECUTION_ERROR: i32 = 3;

/// Internal error - a bundled function example failed (following sysexits.h EX_SOFTWARE)
pub const INTERNAL_ERROR: i32 = 70;

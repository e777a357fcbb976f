// Constants for the K'UHUL interpreter

/// Default ceiling for nested dispatch
pub const MAX_CALL_DEPTH: usize = 100;

/// Environment variable overriding [`MAX_CALL_DEPTH`]
pub const MAX_CALL_DEPTH_ENV: &str = "KUHUL_MAX_CALL_DEPTH";

/// Largest list `range`, `zeros` and `ones` will build; past it they return `[]`
pub const MAX_BUILTIN_LEN: usize = 1 << 20;

/// Kernel identifier written to associative memory on boot
pub const KERNEL_ID: &str = concat!("kuhul-rs ", env!("CARGO_PKG_VERSION"));

/// N-gram width used when an observation does not specify one
pub const DEFAULT_NGRAM_WINDOW: usize = 3;

/// Separator between the items of a stored n-gram
pub const NGRAM_SEPARATOR: &str = "|";

/// Prefix of trace-record ids (`rlhf_1`, `rlhf_2`, ...)
pub const TRACE_ID_PREFIX: &str = "rlhf_";

/// Boot log entries, in the order `kernel_boot` writes them
pub const BOOT_START: &str = "kernel_boot_start";
pub const BOOT_MANIFEST_LOADED: &str = "manifest_loaded";
pub const BOOT_TAPES_REGISTERED: &str = "tapes_registered";
pub const BOOT_COMPLETE: &str = "kernel_boot_complete";

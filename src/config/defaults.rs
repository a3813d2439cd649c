//! Default configuration values

/// Settings file looked up in the current directory
pub const SETTINGS_FILE: &str = "crossforge.toml";

/// Catalog file looked up in the current directory
pub const CATALOG_FILE: &str = "catalog.toml";

/// Quiet-mode log for external command output
pub const DEFAULT_LOG_FILE: &str = "raw_build.log";

/// Working directory holding per-bitness trees
pub const DEFAULT_WORK_DIR: &str = "workdir";

/// Toolchain directory inside the working directory
pub const DEFAULT_TOOLCHAIN_DIR: &str = "toolchain";

/// Target operating system suffix of the host triple
pub const DEFAULT_TARGET_OS: &str = "w64-mingw32";

/// Compiler flags every node starts from
pub const DEFAULT_CFLAGS: &str = "-O3";

/// User agent for downloads and mirror probes
pub const DEFAULT_USER_AGENT: &str = concat!("crossforge/", env!("CARGO_PKG_VERSION"));

/// User agent accepted by sourceforge mirrors
pub const WGET_USER_AGENT: &str = "Wget/1.21";

/// Longest silence tolerated while a download streams
pub const READ_TIMEOUT_SECS: u64 = 120;

/// Connection timeout
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Mirror probe timeout
pub const PROBE_TIMEOUT_SECS: u64 = 15;

/// Sentinel written once an archive has been extracted
pub const UNPACKED_SENTINEL: &str = "unpacked.successfully";

/// Prefix shared by every stage marker
pub const MARKER_PREFIX: &str = "already_";

/// Hex characters of the options digest kept in marker names
pub const FINGERPRINT_LEN: usize = 16;

/// Marker suffix for applied pre-configure patches
pub const PATCH_DONE_SUFFIX: &str = ".done";

/// Marker suffix for applied post-configure patches
pub const PATCH_DONE_POST_SUFFIX: &str = ".done_past_conf";

/// Meson cross file written into the target sub-prefix
pub const MESON_CROSS_FILE: &str = "meson_environment.txt";

/// Products built when none are requested
pub const DEFAULT_PRODUCT_ORDER: &[&str] = &["mpv", "ffmpeg_static", "ffmpeg_shared"];

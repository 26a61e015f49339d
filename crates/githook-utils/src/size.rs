//! Human-readable byte sizes for hook output.

const KB: u64 = 1024;
const MB: u64 = 1024 * KB;
const GB: u64 = 1024 * MB;

/// Format a byte count the way the hook reports limits: whole bytes below
/// one kilobyte, two decimals above.
///
/// ```
/// use githook_utils::format_size;
/// assert_eq!(format_size(512), "512 B");
/// assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

use crate::error::ParseByteSizeError;

pub const KB: u64 = 1024;
pub const MB: u64 = 1024 * KB;
pub const GB: u64 = 1024 * MB;
pub const TB: u64 = 1024 * GB;

/// Parse a byte size such as `1048576`, `512m`, `512M`, `1GiB` or `64kb`.
///
/// Suffixes are binary (`k` = 1024) and case-insensitive. Fractional values are
/// not accepted.
pub fn parse_byte_size(raw: &str) -> Result<u64, ParseByteSizeError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ParseByteSizeError::Empty);
    }

    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, suffix) = raw.split_at(split);
    if digits.is_empty() {
        return Err(ParseByteSizeError::InvalidNumber(raw.to_string()));
    }

    let value: u64 = digits
        .parse()
        .map_err(|_| ParseByteSizeError::Overflow(raw.to_string()))?;

    let multiplier = match suffix.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => KB,
        "m" | "mb" | "mib" => MB,
        "g" | "gb" | "gib" => GB,
        "t" | "tb" | "tib" => TB,
        _ => return Err(ParseByteSizeError::UnknownSuffix(raw.to_string())),
    };

    value
        .checked_mul(multiplier)
        .ok_or_else(|| ParseByteSizeError::Overflow(raw.to_string()))
}

/// Render a byte count using the JVM's size syntax (`720M`, `512K`, `1000`).
pub fn format_jvm_size(bytes: u64) -> String {
    if bytes == 0 {
        "0".to_string()
    } else if bytes % MB == 0 {
        format!("{}M", bytes / MB)
    } else if bytes % KB == 0 {
        format!("{}K", bytes / KB)
    } else {
        bytes.to_string()
    }
}

use chrono::Utc;

const MAX_SANITIZED_LEN: usize = 60;

/// Milliseconds since the epoch; prefixes every stored filename.
pub fn timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Makes a client-supplied filename safe to use as a path component.
///
/// Lowercases, collapses each run of characters outside `[a-z0-9.]` into a
/// single `-`, then keeps at most 60 characters.
pub fn sanitize_filename(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len());
    let mut in_run = false;

    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' {
            sanitized.push(c);
            in_run = false;
        } else if !in_run {
            sanitized.push('-');
            in_run = true;
        }
    }

    // Only ASCII survives the loop, so byte length equals char count.
    sanitized.truncate(MAX_SANITIZED_LEN);
    sanitized
}

/// Name under which the uploaded original is staged in the originals area.
pub fn original_filename(stamp: i64, client_name: &str) -> String {
    format!("{}-{}", stamp, sanitize_filename(client_name))
}

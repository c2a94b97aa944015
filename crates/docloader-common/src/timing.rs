//! Elapsed-time formatting for run summaries

use std::time::Duration;

/// Format a duration as `"N min, SS sec, MMM ms"`.
///
/// Minutes are not capped, so a two hour load reads `"120 min, 00 sec, 000 ms"`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_ms = elapsed.as_millis();
    let minutes = total_ms / 60_000;
    let seconds = (total_ms / 1_000) % 60;
    let millis = total_ms % 1_000;
    format!("{} min, {:02} sec, {:03} ms", minutes, seconds, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::ZERO), "0 min, 00 sec, 000 ms");
        assert_eq!(
            format_elapsed(Duration::from_millis(61_005)),
            "1 min, 01 sec, 005 ms"
        );
        assert_eq!(
            format_elapsed(Duration::from_secs(7_200)),
            "120 min, 00 sec, 000 ms"
        );
    }
}

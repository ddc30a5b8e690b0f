//! Date helper functions

use chrono::{DateTime, TimeZone, Utc};

/// Format a date using a Moment.js-compatible format string
///
/// # Examples
/// ```ignore
/// format_date(&date, "M/D/YYYY, h:mm:ss A") // -> "1/15/2024, 10:30:00 AM"
/// ```
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>, format: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let chrono_format = moment_to_chrono_format(format);
    date.format(&chrono_format).to_string()
}

/// Render a store timestamp in the site's timezone
pub fn local_datetime(date: &DateTime<Utc>, tz: chrono_tz::Tz, format: &str) -> String {
    format_date(&date.with_timezone(&tz), format)
}

/// Convert Moment.js format to chrono format
///
/// Tokens are matched longest first at each position, so `MM` never
/// becomes two `M`s. Text inside `[...]` is copied literally.
fn moment_to_chrono_format(format: &str) -> String {
    const TOKENS: [(&str, &str); 22] = [
        ("YYYY", "%Y"),
        ("YY", "%y"),
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        ("M", "%-m"),
        ("DDDD", "%j"),
        ("DD", "%d"),
        ("D", "%-d"),
        ("dddd", "%A"),
        ("ddd", "%a"),
        ("HH", "%H"),
        ("H", "%-H"),
        ("hh", "%I"),
        ("h", "%-I"),
        ("mm", "%M"),
        ("ss", "%S"),
        ("SSS", "%3f"),
        ("ZZ", "%z"),
        ("Z", "%:z"),
        ("A", "%p"),
        ("a", "%P"),
    ];

    let mut result = String::with_capacity(format.len() * 2);
    let mut rest = format;

    'outer: while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix('[') {
            let end = stripped.find(']').unwrap_or(stripped.len());
            result.push_str(&stripped[..end].replace('%', "%%"));
            rest = stripped.get(end + 1..).unwrap_or("");
            continue;
        }

        for (from, to) in TOKENS {
            if let Some(stripped) = rest.strip_prefix(from) {
                result.push_str(to);
                rest = stripped;
                continue 'outer;
            }
        }

        let c = rest.chars().next().unwrap_or_default();
        if c == '%' {
            result.push_str("%%");
        } else {
            result.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_date() {
        let date = Utc.with_ymd_and_hms(2024, 1, 5, 14, 3, 9).unwrap();
        assert_eq!(format_date(&date, "YYYY-MM-DD"), "2024-01-05");
        assert_eq!(format_date(&date, "M/D/YYYY, h:mm:ss A"), "1/5/2024, 2:03:09 PM");
        assert_eq!(format_date(&date, "MMMM D, YYYY"), "January 5, 2024");
    }

    #[test]
    fn test_local_datetime() {
        let date = Utc.with_ymd_and_hms(2024, 1, 5, 23, 30, 0).unwrap();
        assert_eq!(
            local_datetime(&date, chrono_tz::Asia::Tokyo, "YYYY-MM-DD HH:mm"),
            "2024-01-06 08:30"
        );
    }

    #[test]
    fn test_moment_to_chrono() {
        assert_eq!(moment_to_chrono_format("YYYY-MM-DD"), "%Y-%m-%d");
        assert_eq!(moment_to_chrono_format("HH:mm:ss"), "%H:%M:%S");
        assert_eq!(moment_to_chrono_format("[Day] D"), "Day %-d");
        assert_eq!(moment_to_chrono_format("100%"), "100%%");
    }
}

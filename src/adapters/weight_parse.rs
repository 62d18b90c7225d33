//! Pure parsing for the scale's ASCII line protocol (§6), split out of
//! `serial_scale` so it carries unit tests without dragging in `esp-idf-hal`.
//!
//! Grounded on `original_source/components/scale_driver/scale_driver.c`'s
//! `parse_weight_response`: skip any leading text up to the first sign or
//! digit, parse a float, reject anything outside the [-10.0, 500.0] lbs
//! sanity band.

const MIN_LBS: f32 = -10.0;
const MAX_LBS: f32 = 500.0;

pub fn parse_weight_line(line: &str) -> Option<f32> {
    let start = line.find(|c: char| c == '+' || c == '-' || c.is_ascii_digit())?;
    let rest = &line[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '+' || c == '-'))
        .unwrap_or(rest.len());
    let value: f32 = rest[..end].parse().ok()?;
    if (MIN_LBS..=MAX_LBS).contains(&value) {
        Some(value)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_line_with_sign() {
        assert_eq!(parse_weight_line("WT:+012.34 LBS\r\n"), Some(12.34));
    }

    #[test]
    fn parses_bare_negative_value() {
        assert_eq!(parse_weight_line("-003.50"), Some(-3.50));
    }

    #[test]
    fn rejects_out_of_band_values() {
        assert_eq!(parse_weight_line("WT:+900.00 LBS"), None);
        assert_eq!(parse_weight_line("WT:-050.00 LBS"), None);
    }

    #[test]
    fn rejects_lines_with_no_numeric_content() {
        assert_eq!(parse_weight_line("ERR NO SCALE\r\n"), None);
    }
}

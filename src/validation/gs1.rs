//! GS1 prefix regions and the GTIN check digit.

/// Three-digit GS1 prefix ranges and the organisation issuing them.
const PREFIX_REGIONS: &[(u16, u16, &str)] = &[
    (0, 19, "United States & Canada"),
    (30, 39, "United States (drugs)"),
    (60, 139, "United States & Canada"),
    (200, 299, "Restricted circulation"),
    (300, 379, "France & Monaco"),
    (380, 380, "Bulgaria"),
    (383, 383, "Slovenia"),
    (385, 385, "Croatia"),
    (400, 440, "Germany"),
    (450, 459, "Japan"),
    (460, 469, "Russia"),
    (471, 471, "Taiwan"),
    (474, 474, "Estonia"),
    (475, 475, "Latvia"),
    (477, 477, "Lithuania"),
    (482, 482, "Ukraine"),
    (489, 489, "Hong Kong"),
    (490, 499, "Japan"),
    (500, 509, "United Kingdom"),
    (520, 521, "Greece"),
    (540, 549, "Belgium & Luxembourg"),
    (560, 560, "Portugal"),
    (569, 569, "Iceland"),
    (570, 579, "Denmark"),
    (590, 590, "Poland"),
    (594, 594, "Romania"),
    (599, 599, "Hungary"),
    (600, 601, "South Africa"),
    (640, 649, "Finland"),
    (690, 699, "China"),
    (700, 709, "Norway"),
    (729, 729, "Israel"),
    (730, 739, "Sweden"),
    (750, 750, "Mexico"),
    (760, 769, "Switzerland & Liechtenstein"),
    (789, 790, "Brazil"),
    (800, 839, "Italy"),
    (840, 849, "Spain & Andorra"),
    (858, 858, "Slovakia"),
    (859, 859, "Czechia"),
    (868, 869, "Turkey"),
    (870, 879, "Netherlands"),
    (880, 880, "South Korea"),
    (890, 890, "India"),
    (900, 919, "Austria"),
    (930, 939, "Australia"),
    (940, 949, "New Zealand"),
    (977, 977, "Serial publications (ISSN)"),
    (978, 979, "Bookland (ISBN)"),
];

/// Returns the issuing region for a three-digit GS1 prefix.
pub fn region(prefix: u16) -> Option<&'static str> {
    PREFIX_REGIONS
        .iter()
        .find(|(start, end, _)| (*start..=*end).contains(&prefix))
        .map(|(_, _, name)| *name)
}

/// Reads the three-digit prefix from the start of a digit string.
pub fn prefix(digits: &str) -> Option<u16> {
    digits.get(..3)?.parse().ok()
}

/// Verifies the trailing GTIN mod-10 check digit.
///
/// Weights alternate 3, 1 starting from the digit left of the check
/// digit, which makes the rule identical for GTIN-8, -12 and -13.
pub fn check_digit_ok(digits: &str) -> bool {
    let values: Vec<u32> = match digits.chars().map(|c| c.to_digit(10)).collect() {
        Some(values) => values,
        None => return false,
    };
    let Some((&check, body)) = values.split_last() else {
        return false;
    };

    let sum: u32 = body
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| if i % 2 == 0 { d * 3 } else { d })
        .sum();
    (10 - sum % 10) % 10 == check
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_lookup() {
        assert_eq!(region(590), Some("Poland"));
        assert_eq!(region(5), Some("United States & Canada"));
        assert_eq!(region(978), Some("Bookland (ISBN)"));
        assert_eq!(region(995), None);
    }

    #[test]
    fn test_prefix() {
        assert_eq!(prefix("5901234123457"), Some(590));
        assert_eq!(prefix("59"), None);
    }

    #[test]
    fn test_check_digits() {
        assert!(check_digit_ok("5901234123457"));
        assert!(!check_digit_ok("5901234123458"));
        assert!(check_digit_ok("96385074"));
        assert!(check_digit_ok("036000291452"));
        assert!(!check_digit_ok(""));
        assert!(!check_digit_ok("12a4"));
    }
}

//! Human-readable order numbers
//!
//! Format: `PREFIX-YYYYMMDD-XXXXXX` where the suffix is random uppercase
//! alphanumeric. Unique enough at shop scale; the column carries a
//! UNIQUE index as the real guarantee.

use rand::Rng;

const SUFFIX_LEN: usize = 6;
const SUFFIX_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generate an order number with the given prefix and today's UTC date
pub fn order_number(prefix: &str) -> String {
    let date = chrono::Utc::now().format("%Y%m%d");
    format!("{}-{}-{}", prefix, date, random_suffix())
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_has_expected_shape() {
        let n = order_number("ORD");
        let parts: Vec<&str> = n.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), SUFFIX_LEN);
        assert!(parts[2]
            .bytes()
            .all(|b| SUFFIX_CHARSET.contains(&b)));
    }

    #[test]
    fn suffix_varies_between_calls() {
        // 32^6 values; 20 draws colliding would point at a broken RNG
        let mut seen = std::collections::HashSet::new();
        for _ in 0..20 {
            seen.insert(order_number("ORD"));
        }
        assert!(seen.len() > 1);
    }
}

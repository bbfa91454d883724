use fake::Fake;
use fake::faker::lorem::en::{Sentence, Word};
use rand::{Rng, RngCore};

const ADJECTIVES: &[&str] = &["Red", "Blue", "Steel", "Oak", "Deluxe", "Compact", "Classic"];
const NOUNS: &[&str] = &["Table", "Chair", "Screw", "Laptop", "Cable", "Lamp", "Shelf"];

/// Cut `value` to at most `max_chars` characters.
pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

/// Replace every `?` with a random lowercase letter.
pub fn lexify(pattern: &str, rng: &mut dyn RngCore) -> String {
    pattern
        .chars()
        .map(|ch| {
            if ch == '?' {
                char::from(b'a' + rng.random_range(0..26u8))
            } else {
                ch
            }
        })
        .collect()
}

/// Replace every `#` with a random digit.
pub fn numerify(pattern: &str, rng: &mut dyn RngCore) -> String {
    pattern
        .chars()
        .map(|ch| {
            if ch == '#' {
                char::from(b'0' + rng.random_range(0..10u8))
            } else {
                ch
            }
        })
        .collect()
}

pub fn title_word(rng: &mut dyn RngCore) -> String {
    let word: String = Word().fake_with_rng(rng);
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => word,
    }
}

pub fn sentence(words: usize, rng: &mut dyn RngCore) -> String {
    let words = words.max(1);
    Sentence(words..words + 1).fake_with_rng(rng)
}

pub fn product_name(rng: &mut dyn RngCore) -> String {
    let adjective = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.random_range(0..NOUNS.len())];
    format!("{adjective} {noun}")
}

/// EAN-13 barcode with a valid check digit.
pub fn ean13(rng: &mut dyn RngCore) -> String {
    let body = numerify("############", rng);
    let sum: u32 = body
        .bytes()
        .enumerate()
        .map(|(idx, digit)| {
            let digit = u32::from(digit - b'0');
            if idx % 2 == 0 { digit } else { digit * 3 }
        })
        .sum();
    let check = (10 - sum % 10) % 10;
    format!("{body}{check}")
}

/// German-format IBAN with valid mod-97 check digits.
pub fn iban(rng: &mut dyn RngCore) -> String {
    let bban = numerify("##################", rng);
    // Country letters D=13, E=14 followed by placeholder check digits "00".
    let rearranged = format!("{bban}131400");
    let remainder = rearranged
        .bytes()
        .fold(0u32, |acc, digit| (acc * 10 + u32::from(digit - b'0')) % 97);
    let check = 98 - remainder;
    format!("DE{check:02}{bban}")
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn truncates_on_character_boundaries() {
        assert_eq!(truncate_chars("şehir merkezi", 5), "şehir");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn lexify_and_numerify_fill_placeholders() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let word = lexify("????", &mut rng);
        assert_eq!(word.len(), 4);
        assert!(word.chars().all(|ch| ch.is_ascii_lowercase()));

        let digits = numerify("AUTO-####", &mut rng);
        assert!(digits.starts_with("AUTO-"));
        assert!(digits[5..].chars().all(|ch| ch.is_ascii_digit()));
    }

    #[test]
    fn ean13_check_digit_is_valid() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..20 {
            let code = ean13(&mut rng);
            assert_eq!(code.len(), 13);
            let total: u32 = code
                .bytes()
                .enumerate()
                .map(|(idx, d)| {
                    let d = u32::from(d - b'0');
                    if idx % 2 == 0 { d } else { d * 3 }
                })
                .sum();
            assert_eq!(total % 10, 0);
        }
    }

    #[test]
    fn iban_passes_mod_97() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..20 {
            let value = iban(&mut rng);
            assert_eq!(value.len(), 22);
            let rearranged = format!("{}1314{}", &value[4..], &value[2..4]);
            let remainder = rearranged
                .bytes()
                .fold(0u32, |acc, d| (acc * 10 + u32::from(d - b'0')) % 97);
            assert_eq!(remainder, 1);
        }
    }

    #[test]
    fn title_word_is_capitalized() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let word = title_word(&mut rng);
        assert!(word.chars().next().is_some_and(char::is_uppercase));
    }
}

//! Column-name token dictionary for the keyword heuristic.

use std::sync::LazyLock;

use rust_decimal::Decimal;

use crate::providers::Provider;

pub struct KeywordEntry {
    pub tokens: &'static [&'static str],
    pub provider: Provider,
}

/// Ordered dictionary; the first entry with a matching token wins.
///
/// Identifier entries come before generic ones so `TAX_NUMBER` is not
/// captured by a broader token further down. Tokens of up to
/// [`SHORT_TOKEN`] characters only match a whole word of the name, so
/// `TEL` does not fire on `HOTEL` nor `CITY` on `CAPACITY`.
pub static DICTIONARY: LazyLock<Vec<KeywordEntry>> = LazyLock::new(|| {
    vec![
        entry(
            &["TAXID", "TAXNUMBER", "TAXNO", "VATNUMBER", "VATNO", "VKN", "VERGINO"],
            Provider::Numerify("##########".to_string()),
        ),
        entry(
            &["NATIONALID", "SSN", "TCKN", "IDENTITYNUMBER", "TCKIMLIK"],
            Provider::Numerify("###########".to_string()),
        ),
        entry(&["IBAN"], Provider::Iban),
        entry(&["MAILINGADDRESS", "POSTALADDRESS"], Provider::Address),
        entry(&["EMAIL", "MAIL", "EPOSTA"], Provider::Email),
        entry(&["PHONE", "MOBILE", "GSM", "FAX", "TEL"], Provider::PhoneNumber),
        entry(
            &["COMPANY", "FIRM", "VENDORNAME", "SUPPLIERNAME", "UNVAN"],
            Provider::Company,
        ),
        entry(&["FIRSTNAME", "GIVENNAME", "FORENAME"], Provider::FirstName),
        entry(&["LASTNAME", "SURNAME", "FAMILYNAME", "SOYAD"], Provider::LastName),
        entry(
            &["FULLNAME", "CONTACTNAME", "CUSTOMERNAME", "ADSOYAD"],
            Provider::FullName,
        ),
        entry(&["ADDRESS", "STREET", "ADRES"], Provider::Address),
        entry(&["CITY", "TOWN", "SEHIR"], Provider::City),
        entry(&["COUNTRY", "ULKE"], Provider::Country),
        entry(&["ZIP", "ZIPCODE", "POSTAL", "POSTCODE"], Provider::PostalCode),
        entry(
            &["DESCRIPTION", "REMARK", "COMMENT", "NOTE", "ACIKLAMA"],
            Provider::Sentence { words: 5 },
        ),
        entry(&["BARCODE", "EAN13", "BARKOD"], Provider::Ean13),
        entry(
            &["PRODUCTNAME", "ITEMNAME", "STOCKNAME", "URUNADI", "STOKADI"],
            Provider::ProductName,
        ),
        entry(&["CODE", "KOD", "SKU"], Provider::Code),
        entry(
            &["PRICE", "AMOUNT", "TOTAL", "COST", "BALANCE", "FIYAT", "TUTAR"],
            Provider::Decimal {
                min: Decimal::from(10),
                max: Decimal::from(5000),
                scale: 2,
            },
        ),
        entry(&["QUANTITY", "QTY", "MIKTAR"], Provider::RandomInt { min: 1, max: 100 }),
        entry(&["WEBSITE", "URL", "HOMEPAGE"], Provider::Url),
        entry(&["CURRENCY", "DOVIZ"], Provider::CurrencyCode),
    ]
});

/// Tokens this short must equal a word of the name (or its plural).
pub const SHORT_TOKEN: usize = 4;

fn entry(tokens: &'static [&'static str], provider: Provider) -> KeywordEntry {
    KeywordEntry { tokens, provider }
}

/// Upper-case and strip separators so `e_mail`, `E-Mail` and `EMail` compare equal.
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|ch| !matches!(ch, '_' | '-' | ' '))
        .flat_map(char::to_uppercase)
        .collect()
}

/// Split on separators and camel-case boundaries: `MailingAddress`,
/// `mailing_address` and `MAILING-ADDRESS` all give `MAILING`, `ADDRESS`.
pub fn words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();
    for (idx, &ch) in chars.iter().enumerate() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if let Some(&prev) = idx.checked_sub(1).and_then(|i| chars.get(i)) {
            let next_lower = chars.get(idx + 1).is_some_and(|next| next.is_lowercase());
            let boundary = ch.is_uppercase()
                && ((prev.is_lowercase() || prev.is_ascii_digit())
                    || (prev.is_uppercase() && next_lower));
            if boundary && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        }
        current.extend(ch.to_uppercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Provider for a column, matched on its name first and its description second.
pub fn lookup(column: &str, description: Option<&str>) -> Option<&'static Provider> {
    find(column).or_else(|| description.and_then(find))
}

fn find(text: &str) -> Option<&'static Provider> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return None;
    }
    let words = words(text);
    DICTIONARY
        .iter()
        .find(|entry| {
            entry
                .tokens
                .iter()
                .any(|token| matches_token(token, &normalized, &words))
        })
        .map(|entry| &entry.provider)
}

fn matches_token(token: &str, normalized: &str, words: &[String]) -> bool {
    if token.chars().count() > SHORT_TOKEN {
        return normalized.contains(token);
    }
    words.iter().any(|word| {
        word == token || word.strip_suffix('S').is_some_and(|stem| stem == token)
    })
}

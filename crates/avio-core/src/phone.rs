//! Country resolution from phone numbers.
//!
//! Registration derives the user's country (and through it the language)
//! from the dial code of the contact they share. A static longest-prefix
//! table over international dial codes is all the flow needs.

use crate::domain::UserRecord;

// Dial code -> country name, as the localization layer expects them.
const DIAL_CODES: &[(&str, &str)] = &[
    ("1", "United States"),
    ("7", "Russia"),
    ("20", "Egypt"),
    ("27", "South Africa"),
    ("31", "Netherlands"),
    ("32", "Belgium"),
    ("33", "France"),
    ("34", "Spain"),
    ("39", "Italy"),
    ("40", "Romania"),
    ("44", "United Kingdom"),
    ("46", "Sweden"),
    ("48", "Poland"),
    ("49", "Germany"),
    ("52", "Mexico"),
    ("55", "Brazil"),
    ("61", "Australia"),
    ("62", "Indonesia"),
    ("63", "Philippines"),
    ("81", "Japan"),
    ("82", "South Korea"),
    ("84", "Vietnam"),
    ("86", "China"),
    ("90", "Turkey"),
    ("91", "India"),
    ("92", "Pakistan"),
    ("98", "Iran"),
    ("212", "Morocco"),
    ("213", "Algeria"),
    ("234", "Nigeria"),
    ("254", "Kenya"),
    ("351", "Portugal"),
    ("358", "Finland"),
    ("370", "Lithuania"),
    ("371", "Latvia"),
    ("372", "Estonia"),
    ("374", "Armenia"),
    ("375", "Belarus"),
    ("380", "Ukraine"),
    ("420", "Czech Republic"),
    ("421", "Slovakia"),
    ("880", "Bangladesh"),
    ("971", "United Arab Emirates"),
    ("972", "Israel"),
    ("992", "Tajikistan"),
    ("993", "Turkmenistan"),
    ("994", "Azerbaijan"),
    ("995", "Georgia"),
    ("996", "Kyrgyzstan"),
    ("998", "Uzbekistan"),
];

/// Resolve a country name from a phone number in international format.
///
/// Returns [`UserRecord::UNKNOWN_COUNTRY`] when the dial code is not in the
/// table or the number contains no digits.
pub fn country_for_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return UserRecord::UNKNOWN_COUNTRY.to_string();
    }

    // Longest dial code wins (e.g. 998 before 9).
    for len in (1..=3).rev() {
        if digits.len() < len {
            continue;
        }
        let prefix = &digits[..len];
        if let Some((_, country)) = DIAL_CODES.iter().find(|(code, _)| *code == prefix) {
            return (*country).to_string();
        }
    }

    UserRecord::UNKNOWN_COUNTRY.to_string()
}

//! Smart field matcher — resolves common field semantics straight from the
//! candidate profile, bypassing both the cache and the answer engine.
//!
//! Two entry points: structural (`match_by_element_id`, driven by id/name
//! fragments) and textual (`match_by_question_text`, keyword fallback).
//! Specializations for school dropdowns and phone-prefix dropdowns live
//! here too, since both need profile data plus fuzzy option matching.

use crate::forms::normalize_text;
use crate::forms::Control;
use crate::models::profile::CandidateProfile;

/// Alternative spellings for institutions, checked after exact matching.
/// Keys and values are normalized forms.
const SCHOOL_ALIASES: &[(&str, &[&str])] = &[
    (
        "technical university of munich",
        &["tu munich", "tum", "technische universitat munchen"],
    ),
    (
        "massachusetts institute of technology",
        &["mit", "massachusetts institute"],
    ),
    (
        "eth zurich",
        &["eth", "swiss federal institute of technology"],
    ),
    (
        "university of california, berkeley",
        &["uc berkeley", "berkeley"],
    ),
];

/// Prefixes tried when the profile's own country code is not among the
/// options. Ordered by how often application forms carry them.
const COMMON_PHONE_PREFIXES: &[&str] = &["+1", "+44", "+49", "+33", "+34", "+91"];

/// Resolves a value from structural id/name patterns on the control.
///
/// The phone split matters: sites that separate country code and national
/// number reject a full number in the national-number control.
pub fn match_by_element_id(profile: &CandidateProfile, control: &Control) -> Option<String> {
    let identifier = normalize_text(&control.identifier());
    if identifier.is_empty() {
        return None;
    }

    if identifier.contains("geo") || identifier.contains("city") || identifier.contains("location")
    {
        return Some(profile.personal.city.clone());
    }
    if identifier.contains("phone") && identifier.contains("national") {
        return Some(profile.personal.phone.national.clone());
    }
    if identifier.contains("phone") || identifier.contains("mobile") {
        return Some(profile.personal.phone.full());
    }
    if identifier.contains("email") {
        return Some(profile.personal.email.clone());
    }
    if identifier.contains("school") || identifier.contains("university") {
        return profile.latest_school().map(str::to_string);
    }
    None
}

/// Keyword fallback over the question text, used when the markup carries no
/// structural signal.
pub fn match_by_question_text(profile: &CandidateProfile, question: &str) -> Option<String> {
    let q = normalize_text(question);
    if q.is_empty() {
        return None;
    }

    let any = |keys: &[&str]| keys.iter().any(|k| q.contains(k));

    if any(&["phone", "mobile", "telephone"]) {
        return Some(profile.personal.phone.full());
    }
    if any(&["email", "e-mail"]) {
        return Some(profile.personal.email.clone());
    }
    if any(&["city", "location", "ville", "stadt", "ciudad"]) {
        return Some(profile.personal.city.clone());
    }
    if q.contains("linkedin") {
        return profile.link("linkedin").map(str::to_string);
    }
    if q.contains("github") {
        return profile.link("github").map(str::to_string);
    }
    if any(&["website", "portfolio", "url", "personal site"]) {
        return profile
            .link("website")
            .or_else(|| profile.link("portfolio"))
            .or_else(|| profile.links.first().map(|l| l.url.as_str()))
            .map(str::to_string);
    }
    None
}

/// Picks the option matching the profile's most recent school: exact
/// normalized match, alias table, substring, then significant-word overlap.
pub fn match_school<'a>(profile: &CandidateProfile, options: &'a [String]) -> Option<&'a str> {
    let school = normalize_text(profile.latest_school()?);
    if school.is_empty() {
        return None;
    }

    // Exact normalized match.
    if let Some(hit) = options.iter().find(|o| normalize_text(o) == school) {
        return Some(hit.as_str());
    }

    // Alias table, both directions.
    let aliases: Vec<&str> = SCHOOL_ALIASES
        .iter()
        .find(|(canonical, alts)| *canonical == school || alts.contains(&school.as_str()))
        .map(|(canonical, alts)| {
            let mut all = vec![*canonical];
            all.extend_from_slice(alts);
            all
        })
        .unwrap_or_default();
    if let Some(hit) = options.iter().find(|o| {
        let norm = normalize_text(o);
        aliases.iter().any(|a| norm == *a)
    }) {
        return Some(hit.as_str());
    }

    // Substring either way.
    if let Some(hit) = options.iter().find(|o| {
        let norm = normalize_text(o);
        norm.contains(&school) || school.contains(&norm)
    }) {
        return Some(hit.as_str());
    }

    // Significant-word overlap: a majority of the school's long words
    // present in the option.
    let school_words: Vec<&str> = school.split(' ').filter(|w| w.len() > 3).collect();
    if school_words.is_empty() {
        return None;
    }
    options
        .iter()
        .find(|o| {
            let norm = normalize_text(o);
            let hits = school_words.iter().filter(|w| norm.contains(**w)).count();
            hits * 2 >= school_words.len()
        })
        .map(|s| s.as_str())
}

/// Picks the option carrying the profile's phone country code, else the
/// first option carrying any common prefix.
pub fn match_phone_prefix<'a>(
    profile: &CandidateProfile,
    options: &'a [String],
) -> Option<&'a str> {
    if let Some(prefix) = &profile.personal.phone.prefix {
        if let Some(hit) = options.iter().find(|o| o.contains(prefix.as_str())) {
            return Some(hit.as_str());
        }
    }
    for prefix in COMMON_PHONE_PREFIXES {
        if let Some(hit) = options.iter().find(|o| o.contains(prefix)) {
            return Some(hit.as_str());
        }
    }
    None
}

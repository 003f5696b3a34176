use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Closed set of participant preconditions a test may configure. Adding a
/// kind here forces every match below to handle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EligibilityRule {
    MinAge { min_age: i32 },
}

/// Deserialize the rule list stored on a test. An unrecognized rule kind is
/// a hard error, not a silent no-op.
pub fn parse_rules(raw: Option<&JsonValue>) -> crate::error::Result<Vec<EligibilityRule>> {
    match raw {
        None => Ok(Vec::new()),
        Some(value) if value.is_null() => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone()).map_err(Into::into),
    }
}

/// Whole years between `dob` and `today`, counting a year only once the
/// birthday has occurred.
pub fn age_in_years(dob: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    age
}

/// Participant-supplied date of birth wins over the stored profile one.
/// An unparseable submitted value counts as absent.
pub fn resolve_date_of_birth(
    submitted: Option<&str>,
    profile: Option<NaiveDate>,
) -> Option<NaiveDate> {
    submitted
        .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
        .or(profile)
}

/// Returns `Err(reason)` with a human-readable explanation on failure.
pub fn check(
    rules: &[EligibilityRule],
    dob: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(), String> {
    for rule in rules {
        match rule {
            EligibilityRule::MinAge { min_age } => {
                let Some(dob) = dob else {
                    return Err("date of birth required".to_string());
                };
                let age = age_in_years(dob, today);
                if age < *min_age {
                    return Err(format!(
                        "This assessment requires a minimum age of {}, but the computed age is {}",
                        min_age, age
                    ));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn no_rules_means_eligible_without_dob() {
        assert!(check(&[], None, date(2026, 8, 7)).is_ok());
    }

    #[test]
    fn exactly_min_age_is_eligible() {
        let rules = [EligibilityRule::MinAge { min_age: 18 }];
        let today = date(2026, 8, 7);
        assert!(check(&rules, Some(date(2008, 8, 7)), today).is_ok());
    }

    #[test]
    fn one_day_short_reports_age_seventeen() {
        let rules = [EligibilityRule::MinAge { min_age: 18 }];
        let today = date(2026, 8, 7);
        let err = check(&rules, Some(date(2008, 8, 8)), today).unwrap_err();
        assert!(err.contains("minimum age of 18"));
        assert!(err.contains("17"));
    }

    #[test]
    fn missing_dob_with_min_age_rule_fails() {
        let rules = [EligibilityRule::MinAge { min_age: 18 }];
        let err = check(&rules, None, date(2026, 8, 7)).unwrap_err();
        assert_eq!(err, "date of birth required");
    }

    #[test]
    fn age_decrements_before_birthday() {
        assert_eq!(age_in_years(date(2000, 12, 31), date(2026, 8, 7)), 25);
        assert_eq!(age_in_years(date(2000, 1, 1), date(2026, 8, 7)), 26);
        assert_eq!(age_in_years(date(2000, 8, 7), date(2026, 8, 7)), 26);
    }

    #[test]
    fn unparseable_submitted_dob_falls_back_to_profile() {
        let profile = Some(date(2000, 1, 1));
        assert_eq!(resolve_date_of_birth(Some("not-a-date"), profile), profile);
        assert_eq!(resolve_date_of_birth(Some("not-a-date"), None), None);
        assert_eq!(
            resolve_date_of_birth(Some("1999-05-20"), profile),
            Some(date(1999, 5, 20))
        );
    }

    #[test]
    fn unknown_rule_kind_is_rejected() {
        let raw = json!([{ "kind": "max_height", "max_height": 200 }]);
        assert!(parse_rules(Some(&raw)).is_err());
    }

    #[test]
    fn rules_round_trip_from_json() {
        let raw = json!([{ "kind": "min_age", "min_age": 18 }]);
        let rules = parse_rules(Some(&raw)).unwrap();
        assert_eq!(rules, vec![EligibilityRule::MinAge { min_age: 18 }]);
    }
}

//! Property-based checks of the cleaning and feature invariants.

use proptest::prelude::*;

use pisa_did::data::{clean, derive_features};
use pisa_did::domain::{
    Column, Gender, OecdStatus, PerformanceGroup, StudentRecord, SurveyYear, TOP_PERFORMERS,
};

const CODES: [&str; 8] = ["HKG", "KOR", "USA", "GBR", "DEU", "MEX", "BRA", "ZZZ"];

type Cells = (
    usize,
    bool,
    Option<bool>,
    Option<bool>,
    Option<f64>,
    Option<f64>,
    Option<f64>,
    Option<f64>,
);

fn cells() -> impl Strategy<Value = Cells> {
    (
        0..CODES.len(),
        any::<bool>(),
        prop::option::weighted(0.9, any::<bool>()),
        prop::option::weighted(0.9, any::<bool>()),
        prop::option::weighted(0.9, -3.0..3.0f64),
        prop::option::weighted(0.9, 3.0..18.0f64),
        prop::option::weighted(0.9, 200.0..700.0f64),
        prop::option::weighted(0.95, 7.0..12.0f64),
    )
}

fn record(i: usize, c: Cells) -> StudentRecord {
    let (code, y2022, female, oecd, homepos, paredint, score, grade) = c;
    let year = if y2022 { SurveyYear::Y2022 } else { SurveyYear::Y2018 };
    let mut r = StudentRecord::empty(year);
    r.country_id = Some(code as i64 + 1);
    r.country_code = Some(CODES[code].to_string());
    r.school_id = Some(1);
    r.student_id = Some(i as i64);
    r.oecd = oecd.map(|o| if o { OecdStatus::Oecd } else { OecdStatus::NonOecd });
    r.grade = grade;
    r.student_gender = female.map(|f| if f { Gender::Female } else { Gender::Male });
    r.homepos = homepos;
    r.paredint = paredint;
    r.reading_score = score;
    r
}

fn records() -> impl Strategy<Value = Vec<StudentRecord>> {
    prop::collection::vec(cells(), 0..80)
        .prop_map(|cs| cs.into_iter().enumerate().map(|(i, c)| record(i, c)).collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_clean_leaves_no_missing_and_is_idempotent(rows in records()) {
        let once = clean(&rows);
        prop_assert!(once.iter().all(|r| Column::ALL.iter().all(|c| !r.is_missing(*c))));
        prop_assert!(once.len() <= rows.len());
        let twice = clean(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_indicators_match_labels(rows in records()) {
        let data = derive_features(&clean(&rows)).unwrap();
        for r in &data.rows {
            prop_assert!(r.gender_numeric <= 1 && r.oecd_numeric <= 1);
            prop_assert_eq!(r.gender_numeric == 1, r.student_gender == Gender::Female);
            prop_assert_eq!(r.oecd_numeric == 1, r.oecd == OecdStatus::Oecd);
            prop_assert_eq!(r.year_binary == 1, r.year == SurveyYear::Y2022);
            let top = TOP_PERFORMERS.contains(&r.country_code.as_str());
            prop_assert_eq!(top, r.performance_group == PerformanceGroup::Top);
            prop_assert_eq!(r.performance_group_numeric == 1, top);
        }
    }

    #[test]
    fn prop_ses_standardized_per_year(rows in records()) {
        let data = derive_features(&clean(&rows)).unwrap();
        for year in SurveyYear::ALL {
            let z: Vec<f64> = data.rows.iter().filter(|r| r.year == year).map(|r| r.ses_standardized).collect();
            let raw: Vec<f64> = data.rows.iter().filter(|r| r.year == year).map(|r| r.homepos).collect();
            if z.len() < 2 {
                continue;
            }
            let n = z.len() as f64;
            let mean = z.iter().sum::<f64>() / n;
            prop_assert!(mean.abs() < 1e-9);

            let raw_mean = raw.iter().sum::<f64>() / n;
            let raw_var = raw.iter().map(|v| (v - raw_mean).powi(2)).sum::<f64>() / (n - 1.0);
            let var = z.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            if raw_var > 1e-12 {
                prop_assert!((var - 1.0).abs() < 1e-9);
            } else {
                prop_assert!(z.iter().all(|v| *v == 0.0));
            }
        }
    }

    #[test]
    fn prop_unknown_codes_are_bottom(code in "[A-Z]{3}") {
        let expected = if TOP_PERFORMERS.contains(&code.as_str()) {
            PerformanceGroup::Top
        } else {
            PerformanceGroup::Bottom
        };
        prop_assert_eq!(PerformanceGroup::classify(&code), expected);
    }
}

#[test]
fn zzz_is_bottom_with_numeric_zero() {
    assert_eq!(PerformanceGroup::classify("ZZZ"), PerformanceGroup::Bottom);
    assert_eq!(PerformanceGroup::classify("ZZZ").numeric(), 0);
}

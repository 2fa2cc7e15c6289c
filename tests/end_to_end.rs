//! End-to-end runs through the library API on synthetic data.

use std::fs;
use std::path::Path;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use pisa_did::app::pipeline::fit_models;
use pisa_did::app::{analyze, simulate};
use pisa_did::data::sample::{FEMALE_EFFECT, PAREDINT_EFFECT, SES_EFFECT};
use pisa_did::domain::{
    AnalysisConfig, AnalysisRow, CombinedDataset, Gender, OecdStatus, PerformanceGroup, SimulateConfig, SurveyYear,
};
use pisa_did::error::AppError;
use pisa_did::fit::fit_model;
use pisa_did::models::{oecd_did, COUNTRY_INTERACTIONS, GENDER_DID_CONTROLS};

fn config(dir: &Path, p2018: &Path, p2022: &Path) -> AnalysisConfig {
    AnalysisConfig {
        pisa_2018: p2018.to_path_buf(),
        pisa_2022: p2022.to_path_buf(),
        out_dir: dir.join("out"),
        delimiter: b',',
        reference_country: None,
        charts: true,
        export_dataset: Some(dir.join("dataset.csv")),
        print_reports: false,
    }
}

fn row(country: &str, year: SurveyYear, oecd: bool, female: bool, ses: f64, score: f64) -> AnalysisRow {
    let perf = PerformanceGroup::classify(country);
    let oecd = if oecd { OecdStatus::Oecd } else { OecdStatus::NonOecd };
    let gender = if female { Gender::Female } else { Gender::Male };
    AnalysisRow {
        country_id: 1,
        country_code: country.into(),
        school_id: 1,
        student_id: 1,
        oecd,
        grade: 10.0,
        student_gender: gender,
        homepos: ses,
        paredint: 10.0 + ((ses * 100.0).round() as i64).rem_euclid(7) as f64,
        reading_score: score,
        year,
        year_binary: year.binary(),
        gender_numeric: gender.numeric(),
        oecd_numeric: oecd.numeric(),
        performance_group: perf,
        performance_group_numeric: perf.numeric(),
        ses_standardized: ses,
    }
}

#[test]
fn simulate_then_analyze_writes_every_output() {
    let dir = tempfile::tempdir().unwrap();
    let files = simulate(&SimulateConfig {
        out_dir: dir.path().join("raw"),
        students_per_country: 60,
        seed: 11,
        missing_rate: 0.03,
        did_effect: -8.0,
        noise_sd: 30.0,
    })
    .unwrap();
    assert_eq!(files.len(), 2);

    let cfg = config(dir.path(), &files[0], &files[1]);
    let outcome = analyze(&cfg).unwrap();

    assert!(outcome.prepared.rows_dropped() > 0);
    assert_eq!(outcome.results.outputs.len(), 4);
    assert!(outcome.results.skipped.is_empty());

    let out = cfg.out_dir;
    for name in ["missing_report.csv", "descriptives.csv", "categorical.csv", "did_cell_means.csv", "models.json"] {
        assert!(out.join(name).exists(), "{name} missing");
    }
    for o in &outcome.results.outputs {
        let slug = &o.fit.spec.slug;
        assert!(out.join(format!("model_{slug}.txt")).exists());
        assert!(out.join(format!("predictions_{slug}.csv")).exists());
        let svg = fs::read_to_string(out.join(format!("chart_{slug}.svg"))).unwrap();
        assert!(svg.contains("<svg"));
    }
    assert!(dir.path().join("dataset.csv").exists());

    // 12 countries x 2 genders x 3 SES levels x 2 years
    let country = outcome
        .results
        .outputs
        .iter()
        .find(|o| o.fit.spec.slug == COUNTRY_INTERACTIONS)
        .unwrap();
    assert_eq!(country.predictions.len(), 12 * 2 * 3 * 2);
}

#[test]
fn raw_did_equals_interaction_coefficient() {
    let dir = tempfile::tempdir().unwrap();
    let files = simulate(&SimulateConfig {
        out_dir: dir.path().to_path_buf(),
        students_per_country: 40,
        seed: 3,
        missing_rate: 0.0,
        did_effect: 10.0,
        noise_sd: 25.0,
    })
    .unwrap();
    let mut cfg = config(dir.path(), &files[0], &files[1]);
    cfg.charts = false;
    cfg.export_dataset = None;
    let outcome = analyze(&cfg).unwrap();

    let cells = &outcome.prepared.did_cells;
    let pairs = [("oecd_did", "year_binary:oecd_numeric", 0), ("performance_did", "year_binary:performance_group_numeric", 1)];
    for (slug, coef, idx) in pairs {
        let fit = &outcome.results.outputs.iter().find(|o| o.fit.spec.slug == slug).unwrap().fit;
        let b = fit.coefficient(coef).unwrap().estimate;
        assert!((b - cells[idx].did()).abs() < 1e-8, "{slug}: {b} vs {}", cells[idx].did());
    }
}

#[test]
fn model_one_recovers_known_coefficients() {
    let mut rng = StdRng::seed_from_u64(2024);
    let noise = Normal::new(0.0, 1.0).unwrap();
    let mut rows = Vec::new();
    for i in 0..2000 {
        let year = if i % 2 == 0 { SurveyYear::Y2018 } else { SurveyYear::Y2022 };
        let oecd = (i / 2) % 2 == 0;
        let (yb, o) = (f64::from(year.binary()), if oecd { 1.0 } else { 0.0 });
        let y = 10.0 + 5.0 * yb + 20.0 * o + 3.0 * yb * o + noise.sample(&mut rng);
        rows.push(row("DEU", year, oecd, true, 0.0, y));
    }
    let fit = fit_model(&oecd_did(), &rows).unwrap();
    let expected = [10.0, 5.0, 20.0, 3.0];
    for (c, e) in fit.coefficients.iter().zip(expected) {
        assert!((c.estimate - e).abs() < 0.5, "{}: {} vs {e}", c.name, c.estimate);
        assert!(c.ci_lower < e && e < c.ci_upper, "{} interval misses {e}", c.name);
    }
}

#[test]
fn model_three_recovers_simulated_student_effects() {
    // Gender, SES and paredint are drawn independently of country, so the
    // omitted country effects only add noise to their slopes.
    let dir = tempfile::tempdir().unwrap();
    let files = simulate(&SimulateConfig {
        out_dir: dir.path().to_path_buf(),
        students_per_country: 500,
        seed: 7,
        missing_rate: 0.0,
        did_effect: -8.0,
        noise_sd: 20.0,
    })
    .unwrap();
    let mut cfg = config(dir.path(), &files[0], &files[1]);
    cfg.charts = false;
    cfg.export_dataset = None;
    let outcome = analyze(&cfg).unwrap();

    let fit = &outcome
        .results
        .outputs
        .iter()
        .find(|o| o.fit.spec.slug == GENDER_DID_CONTROLS)
        .unwrap()
        .fit;
    assert_eq!(fit.stats.n_obs, 12 * 500 * 2);
    let estimate = |name: &str| fit.coefficient(name).unwrap().estimate;
    assert!((estimate("gender_numeric") - FEMALE_EFFECT).abs() < 6.0);
    assert!((estimate("SES_standardized") - SES_EFFECT).abs() < 2.5);
    assert!((estimate("paredint") - PAREDINT_EFFECT).abs() < 1.0);
    assert!(estimate("year_binary:gender_numeric").abs() < 9.0);
}

#[test]
fn singular_country_design_fails_only_that_model() {
    // BRA has only female students: gender_numeric:country[T.BRA] duplicates country[T.BRA].
    let mut rows = Vec::new();
    for i in 0..120 {
        let year = if i % 2 == 0 { SurveyYear::Y2018 } else { SurveyYear::Y2022 };
        let ses = ((i * 7) % 13) as f64 / 6.0 - 1.0;
        let female = (i / 2) % 2 == 0;
        rows.push(row("KOR", year, true, female, ses, 520.0 + 10.0 * ses + (i % 5) as f64));
        rows.push(row("MEX", year, true, !female, ses * 0.8, 430.0 + 8.0 * ses + (i % 7) as f64));
        rows.push(row("BRA", year, false, true, ses * 1.1, 410.0 + 6.0 * ses + (i % 3) as f64));
    }
    let data = CombinedDataset {
        rows,
        ses_partitions: Vec::new(),
    };
    let results = fit_models(&data, None).unwrap();
    assert_eq!(results.outputs.len(), 3);
    assert_eq!(results.skipped.len(), 1);
    assert_eq!(results.skipped[0].0, COUNTRY_INTERACTIONS);
}

const HEADER: &str = "CNTRYID,CNT,CNTSCHID,CNTSTUID,OECD,GRADE,ST004D01T,HOMEPOS,PAREDINT,reading_score";

fn write_csv(path: &Path, lines: &[&str]) {
    let mut text = String::from(HEADER);
    for l in lines {
        text.push('\n');
        text.push_str(l);
    }
    text.push('\n');
    fs::write(path, text).unwrap();
}

#[test]
fn missing_required_column_is_schema_error() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.csv");
    let b = dir.path().join("b.csv");
    write_csv(&a, &["410,KOR,1,1,1,10,1,0.1,12,500"]);
    fs::write(&b, "CNTRYID,CNT,CNTSCHID,CNTSTUID,OECD,GRADE,ST004D01T,PAREDINT,reading_score\n1,KOR,1,1,1,10,1,12,500\n")
        .unwrap();
    let err = analyze(&config(dir.path(), &a, &b)).unwrap_err();
    assert!(matches!(err, AppError::Schema(_)), "{err:?}");
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn no_estimable_model_exits_three_after_data_reports() {
    // One country, all female: every design has a constant column.
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.csv");
    let b = dir.path().join("b.csv");
    write_csv(&a, &["410,KOR,1,1,1,10,1,0.1,12,500", "410,KOR,1,2,1,10,1,0.4,14,510", "410,KOR,1,3,1,9,1,-0.3,9,470"]);
    write_csv(&b, &["410,KOR,1,4,1,10,1,0.2,12,495", "410,KOR,1,5,1,10,1,0.9,15,520", "410,KOR,1,6,1,9,1,-0.5,8,460"]);

    let cfg = config(dir.path(), &a, &b);
    let err = analyze(&cfg).unwrap_err();
    assert!(matches!(err, AppError::NoModels(_)), "{err:?}");
    assert_eq!(err.exit_code(), 3);
    assert!(cfg.out_dir.join("missing_report.csv").exists());
    assert!(cfg.out_dir.join("descriptives.csv").exists());
}

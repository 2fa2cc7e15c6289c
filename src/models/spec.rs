//! Model specifications as explicit term lists.
//!
//! A specification is the response plus a list of terms. Each term is a main
//! effect or an interaction of two covariates; categorical covariates are flagged
//! as such and expanded with treatment coding against a reference level.
//!
//! `a * b` in the usual formula notation is spelled `.crossed(a, b)` and expands
//! to `a + b + a:b`. Repeated terms collapse, so the per-country model can cross
//! `country` with several covariates without duplicating its main effect.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Numeric columns of the combined dataset usable as response or covariate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum NumericVar {
    ReadingScore,
    YearBinary,
    OecdNumeric,
    PerformanceGroupNumeric,
    GenderNumeric,
    SesStandardized,
    Paredint,
    Homepos,
    Grade,
}

impl NumericVar {
    pub fn name(self) -> &'static str {
        match self {
            NumericVar::ReadingScore => "reading_score",
            NumericVar::YearBinary => "year_binary",
            NumericVar::OecdNumeric => "oecd_numeric",
            NumericVar::PerformanceGroupNumeric => "performance_group_numeric",
            NumericVar::GenderNumeric => "gender_numeric",
            NumericVar::SesStandardized => "SES_standardized",
            NumericVar::Paredint => "paredint",
            NumericVar::Homepos => "homepos",
            NumericVar::Grade => "grade",
        }
    }
}

/// Categorical columns that expand into dummy variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Factor {
    Country,
}

impl Factor {
    pub fn name(self) -> &'static str {
        match self {
            Factor::Country => "country",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Covariate {
    Numeric(NumericVar),
    Categorical(Factor),
}

impl Covariate {
    pub fn name(self) -> &'static str {
        match self {
            Covariate::Numeric(v) => v.name(),
            Covariate::Categorical(f) => f.name(),
        }
    }
}

impl From<NumericVar> for Covariate {
    fn from(v: NumericVar) -> Self {
        Covariate::Numeric(v)
    }
}

impl From<Factor> for Covariate {
    fn from(f: Factor) -> Self {
        Covariate::Categorical(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Term {
    Main(Covariate),
    Interaction(Covariate, Covariate),
}

impl Term {
    fn is_main(&self) -> bool {
        matches!(self, Term::Main(_))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Main(c) => f.write_str(c.name()),
            Term::Interaction(a, b) => write!(f, "{}:{}", a.name(), b.name()),
        }
    }
}

/// An OLS model: response, intercept, and terms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSpec {
    /// Short identifier used in file names.
    pub slug: String,
    pub title: String,
    pub response: NumericVar,
    terms: Vec<Term>,
    /// Stated reference levels; factors without an entry use their first level.
    pub references: BTreeMap<Factor, String>,
    formula_parts: Vec<String>,
}

impl ModelSpec {
    pub fn new(slug: impl Into<String>, title: impl Into<String>, response: NumericVar) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
            response,
            terms: Vec::new(),
            references: BTreeMap::new(),
            formula_parts: Vec::new(),
        }
    }

    /// Add a main effect.
    pub fn main(mut self, c: impl Into<Covariate>) -> Self {
        let c = c.into();
        self.formula_parts.push(c.name().to_string());
        self.push(Term::Main(c));
        self
    }

    /// Add `a * b`: both main effects and their interaction.
    pub fn crossed(mut self, a: impl Into<Covariate>, b: impl Into<Covariate>) -> Self {
        let (a, b) = (a.into(), b.into());
        self.formula_parts.push(format!("{} * {}", a.name(), b.name()));
        self.push(Term::Main(a));
        self.push(Term::Main(b));
        self.push(Term::Interaction(a, b));
        self
    }

    /// Add only the interaction `a:b`.
    pub fn interaction(mut self, a: impl Into<Covariate>, b: impl Into<Covariate>) -> Self {
        let (a, b) = (a.into(), b.into());
        self.formula_parts.push(format!("{}:{}", a.name(), b.name()));
        self.push(Term::Interaction(a, b));
        self
    }

    pub fn with_reference(mut self, factor: Factor, level: impl Into<String>) -> Self {
        self.references.insert(factor, level.into());
        self
    }

    fn push(&mut self, term: Term) {
        let duplicate = self.terms.iter().any(|t| match (t, &term) {
            (Term::Interaction(a, b), Term::Interaction(c, d)) => (a == c && b == d) || (a == d && b == c),
            _ => t == &term,
        });
        if !duplicate {
            self.terms.push(term);
        }
    }

    /// Terms in design order: main effects first, then interactions.
    pub fn terms(&self) -> Vec<Term> {
        let mut out: Vec<Term> = self.terms.iter().filter(|t| t.is_main()).copied().collect();
        out.extend(self.terms.iter().filter(|t| !t.is_main()).copied());
        out
    }

    /// Every factor referenced by any term.
    pub fn factors(&self) -> Vec<Factor> {
        let mut out = Vec::new();
        for t in &self.terms {
            let covs = match t {
                Term::Main(c) => vec![*c],
                Term::Interaction(a, b) => vec![*a, *b],
            };
            for c in covs {
                if let Covariate::Categorical(f) = c {
                    if !out.contains(&f) {
                        out.push(f);
                    }
                }
            }
        }
        out
    }

    /// Formula-style rendering for reports.
    pub fn formula(&self) -> String {
        format!("{} ~ {}", self.response.name(), self.formula_parts.join(" + "))
    }
}

pub const OECD_DID: &str = "oecd_did";
pub const PERFORMANCE_DID: &str = "performance_did";
pub const GENDER_DID_CONTROLS: &str = "gender_did_controls";
pub const COUNTRY_INTERACTIONS: &str = "country_interactions";

/// Model 1: `reading_score ~ year_binary * oecd_numeric`.
pub fn oecd_did() -> ModelSpec {
    ModelSpec::new(OECD_DID, "OECD membership DiD", NumericVar::ReadingScore)
        .crossed(NumericVar::YearBinary, NumericVar::OecdNumeric)
}

/// Model 2: `reading_score ~ year_binary * performance_group_numeric`.
pub fn performance_did() -> ModelSpec {
    ModelSpec::new(PERFORMANCE_DID, "Performance group DiD", NumericVar::ReadingScore)
        .crossed(NumericVar::YearBinary, NumericVar::PerformanceGroupNumeric)
}

/// Model 3: gender DiD with OECD, SES and parental-education controls.
pub fn gender_did_controls() -> ModelSpec {
    ModelSpec::new(GENDER_DID_CONTROLS, "Gender DiD with controls", NumericVar::ReadingScore)
        .crossed(NumericVar::YearBinary, NumericVar::GenderNumeric)
        .main(NumericVar::OecdNumeric)
        .main(NumericVar::SesStandardized)
        .main(NumericVar::Paredint)
}

/// Model 4: every covariate interacted with country.
pub fn country_interactions(reference_country: Option<&str>) -> ModelSpec {
    let spec = ModelSpec::new(COUNTRY_INTERACTIONS, "Per-country interactions", NumericVar::ReadingScore)
        .crossed(NumericVar::YearBinary, Factor::Country)
        .crossed(NumericVar::GenderNumeric, Factor::Country)
        .crossed(NumericVar::SesStandardized, Factor::Country)
        .crossed(NumericVar::Paredint, Factor::Country);
    match reference_country {
        Some(code) => spec.with_reference(Factor::Country, code),
        None => spec,
    }
}

/// The four specifications, in increasing complexity.
pub fn standard_models(reference_country: Option<&str>) -> Vec<ModelSpec> {
    vec![
        oecd_did(),
        performance_did(),
        gender_did_controls(),
        country_interactions(reference_country),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossed_expands_to_mains_then_interaction() {
        let spec = oecd_did();
        assert_eq!(
            spec.terms(),
            vec![
                Term::Main(NumericVar::YearBinary.into()),
                Term::Main(NumericVar::OecdNumeric.into()),
                Term::Interaction(NumericVar::YearBinary.into(), NumericVar::OecdNumeric.into()),
            ]
        );
        assert_eq!(spec.formula(), "reading_score ~ year_binary * oecd_numeric");
    }

    #[test]
    fn repeated_main_effects_collapse() {
        let spec = country_interactions(None);
        let terms = spec.terms();
        let country_mains = terms
            .iter()
            .filter(|t| **t == Term::Main(Factor::Country.into()))
            .count();
        assert_eq!(country_mains, 1);
        // 4 numeric mains + country, then 4 interactions.
        assert_eq!(terms.len(), 9);
        assert!(terms[..5].iter().all(|t| matches!(t, Term::Main(_))));
        assert_eq!(spec.factors(), vec![Factor::Country]);
    }

    #[test]
    fn model_three_orders_interaction_last() {
        let terms = gender_did_controls().terms();
        assert_eq!(terms.len(), 6);
        assert_eq!(terms[5].to_string(), "year_binary:gender_numeric");
        assert_eq!(
            gender_did_controls().formula(),
            "reading_score ~ year_binary * gender_numeric + oecd_numeric + SES_standardized + paredint"
        );
    }

    #[test]
    fn interaction_only_adds_no_main_effects() {
        let spec = ModelSpec::new("slopes", "Country slopes", NumericVar::ReadingScore)
            .main(NumericVar::YearBinary)
            .interaction(NumericVar::SesStandardized, Factor::Country)
            .interaction(Factor::Country, NumericVar::SesStandardized);
        assert_eq!(
            spec.terms(),
            vec![
                Term::Main(NumericVar::YearBinary.into()),
                Term::Interaction(NumericVar::SesStandardized.into(), Factor::Country.into()),
            ]
        );
        assert_eq!(spec.factors(), vec![Factor::Country]);
        assert!(spec.formula().starts_with("reading_score ~ year_binary + SES_standardized:country"));
    }

    #[test]
    fn stated_reference_is_recorded() {
        let spec = country_interactions(Some("USA"));
        assert_eq!(spec.references.get(&Factor::Country).map(String::as_str), Some("USA"));
        assert!(country_interactions(None).references.is_empty());
    }
}

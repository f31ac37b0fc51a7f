use std::collections::BTreeMap;

use ahash::HashMap;
use serde::Deserialize;

use crate::{AtomicDatabase, Composition, Result, parsers::formula::formula};

use super::{atomic_database::is_symbol, errors::DatabaseError};

pub const DEFAULT_TOML: &str = include_str!("../../data/abbreviations.toml");

/// Shorthand for groups of atoms (like `Me` or `Ph`) that can be used in place of an element in a formula
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct AbbreviationDatabase<'a> {
    abbreviations: HashMap<String, Abbreviation<'a>>,
}

#[derive(Clone, Eq, PartialEq, Debug)]
struct Abbreviation<'a> {
    name: String,
    composition: Composition<'a>,
}

impl<'a> AbbreviationDatabase<'a> {
    pub fn new(
        atomic_db: &'a AtomicDatabase,
        file_name: impl AsRef<str>,
        toml: impl AsRef<str>,
    ) -> Result<Self> {
        let schema: AbbreviationDatabaseToml =
            toml::from_str(toml.as_ref()).map_err(|e| DatabaseError::toml(file_name, &e))?;
        let abbreviations = schema
            .abbreviations
            .into_iter()
            .map(|(abbr, abbreviation)| {
                abbreviation
                    .into_abbreviation(atomic_db, &abbr)
                    .map(|a| (abbr, a))
            })
            .collect::<Result<_, _>>()?;

        Ok(Self { abbreviations })
    }

    /// The abbreviations shipped with this crate, checked against `atomic_db`
    ///
    /// # Panics
    ///
    /// If `atomic_db` lacks any of the elements used by the built-in abbreviations, or defines an element that
    /// shares a symbol with one of them
    #[must_use]
    pub fn builtin(atomic_db: &'a AtomicDatabase) -> Self {
        // SAFETY: Checked against the default `AtomicDatabase` by the `builtin_database` test below
        Self::new(atomic_db, "abbreviations.toml", DEFAULT_TOML).unwrap()
    }

    #[must_use]
    pub fn get(&self, abbr: &str) -> Option<&Composition<'a>> {
        self.abbreviations.get(abbr).map(|a| &a.composition)
    }

    #[must_use]
    pub fn name(&self, abbr: &str) -> Option<&str> {
        self.abbreviations.get(abbr).map(|a| a.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.abbreviations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.abbreviations.is_empty()
    }
}

// TOML Schema =========================================================================================================

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AbbreviationDatabaseToml {
    #[serde(default)]
    abbreviations: BTreeMap<String, AbbreviationToml>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AbbreviationToml {
    name: String,
    formula: String,
}

// Schema Validation and Conversion ====================================================================================

impl AbbreviationToml {
    // NOTE: Abbreviations are expanded using only the atomic database, so they can't be defined in terms of each other
    fn into_abbreviation<'a>(
        self,
        atomic_db: &'a AtomicDatabase,
        abbr: &str,
    ) -> Result<Abbreviation<'a>, DatabaseError> {
        if !is_symbol(abbr) {
            return Err(DatabaseError::AbbreviationSymbol(abbr.to_owned()));
        }

        if atomic_db.contains(abbr) {
            return Err(DatabaseError::ShadowedElement(abbr.to_owned()));
        }

        let parsed = formula(atomic_db, None, &self.formula).map_err(|error| {
            DatabaseError::AbbreviationFormula {
                abbr: abbr.to_owned(),
                error,
            }
        })?;
        if parsed.charge.is_some() {
            return Err(DatabaseError::AbbreviationCharge(abbr.to_owned()));
        }

        Ok(Abbreviation {
            name: self.name,
            composition: parsed.composition,
        })
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use once_cell::sync::Lazy;

    use super::*;

    static DB: Lazy<AtomicDatabase> = Lazy::new(AtomicDatabase::default);

    fn db_error(toml: &str) -> String {
        AbbreviationDatabase::new(&DB, "test.toml", toml)
            .unwrap_err()
            .to_string()
    }

    #[test]
    fn builtin_database() {
        let abbreviations = AbbreviationDatabase::builtin(&DB);
        assert_eq!(abbreviations.len(), 16);
        assert!(!abbreviations.is_empty());

        assert_eq!(abbreviations.name("Me"), Some("methyl"));
        assert_eq!(abbreviations.get("Me").unwrap().to_string(), "CH3");
        assert_eq!(abbreviations.get("Ph").unwrap().to_string(), "C6H5");
        assert_eq!(abbreviations.get("Fmoc").unwrap().to_string(), "C15H11O2");
        assert_eq!(abbreviations.get("D").unwrap().to_string(), "(2H)");
        assert_eq!(abbreviations.get("Tf").unwrap().to_string(), "CF3O2S");
        assert_eq!(abbreviations.get("C"), None);
        assert_eq!(abbreviations.name("Xx"), None);
    }

    #[test]
    fn custom_database() {
        let abbreviations = AbbreviationDatabase::new(
            &DB,
            "custom.toml",
            indoc! {r#"
                [abbreviations.Piv]
                name = "pivaloyl"
                formula = "(CH3)3CCO"

                [abbreviations.Tbs]
                name = "tert-butyldimethylsilyl"
                formula = "Si(CH3)2C(CH3)3"
            "#},
        )
        .unwrap();
        assert_eq!(abbreviations.len(), 2);
        assert_eq!(abbreviations.get("Piv").unwrap().to_string(), "C5H9O");
        assert_eq!(abbreviations.get("Tbs").unwrap().to_string(), "C6H15Si");

        let empty = AbbreviationDatabase::new(&DB, "empty.toml", "").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn invalid_databases() {
        insta::assert_snapshot!(
            db_error(r#"abbreviations.Co = { name = "carbonyl", formula = "CO" }"#),
            @r#"the abbreviation "Co" shadows an element with the same symbol"#
        );
        insta::assert_snapshot!(
            db_error(r#"abbreviations.Ac = { name = "acetyl", formula = "CH3CO" }"#),
            @r#"the abbreviation "Ac" shadows an element with the same symbol"#
        );
        insta::assert_snapshot!(
            db_error(r#"abbreviations.ME = { name = "methyl", formula = "CH3" }"#),
            @r#""ME" is not a valid abbreviation"#
        );
        insta::assert_snapshot!(
            db_error(r#"abbreviations.Nh = { name = "ammonium", formula = "NH4(1+)" }"#),
            @r#"the formula of the abbreviation "Nh" specifies a charge"#
        );
        insta::assert_snapshot!(
            db_error(r#"abbreviations.Xy = { name = "mystery", formula = "C6Qq" }"#),
            @r#"the formula of the abbreviation "Xy" is invalid"#
        );
        // Abbreviations can't refer to one another
        insta::assert_snapshot!(
            db_error(r#"abbreviations.Bu = { name = "butyl", formula = "Et2" }"#),
            @r#"the formula of the abbreviation "Bu" is invalid"#
        );
        assert!(db_error(r#"abbreviations.Me = { formula = "CH3" }"#).starts_with("failed to read test.toml"));
    }
}

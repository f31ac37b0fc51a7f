pub mod config;
pub mod mutation;
pub mod statistics;

use std::{
    collections::BTreeMap,
    f64::consts::LN_2,
    fmt::{self, Display, Formatter},
};

// External Crate Imports
use rust_decimal::Decimal;

// Local Crate Imports
use crate::{
    AbbreviationDatabase, AtomicDatabase, Charge, Composition, Config, IsochemError, Mass,
    Massive, Molecule, MoleculeState, ParsedFormula, Result, Simulator, Spectrum,
    spectra::{
        accumulator::Accumulator, bar::bar_pattern, gaussian::gaussian_spectrum, progress,
        raw::raw_pattern, rms_residual,
    },
};

// Public API ==========================================================================================================

impl<'a> Simulator<'a> {
    /// Bundles the reference tables with a configuration, ready to build molecules
    ///
    /// # Errors
    ///
    /// If `config` is invalid
    pub fn new(
        atomic_db: &'a AtomicDatabase,
        abbreviations: &'a AbbreviationDatabase<'a>,
        config: Config,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            atomic_db,
            abbreviations,
            config,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Parses `formula` and calculates everything about it
    ///
    /// # Errors
    ///
    /// If `formula` can't be parsed, or doesn't contain any atoms
    pub fn molecule(&self, formula: impl AsRef<str>) -> Result<Molecule<'a>> {
        let formula = formula.as_ref();
        let ParsedFormula {
            composition,
            charge,
        } = self.parse(formula)?;
        let charge = charge.unwrap_or(self.config.charge);

        let state = MoleculeState::new(&self.config, formula.to_owned(), composition, charge)?;
        Ok(Molecule {
            simulator: *self,
            snapshot: state.clone(),
            state,
        })
    }

    fn parse(&self, formula: &str) -> Result<ParsedFormula<'a>> {
        ParsedFormula::new(self.atomic_db, self.abbreviations, formula)
    }
}

impl<'a> Molecule<'a> {
    /// # Errors
    ///
    /// If `config` is invalid, or if `formula` can't be parsed or doesn't contain any atoms
    pub fn new(
        atomic_db: &'a AtomicDatabase,
        abbreviations: &'a AbbreviationDatabase<'a>,
        formula: impl AsRef<str>,
        config: Config,
    ) -> Result<Self> {
        Simulator::new(atomic_db, abbreviations, config)?.molecule(formula)
    }

    /// The formula this molecule was built from, or its canonical formula once it has been mutated
    #[must_use]
    pub fn formula(&self) -> &str {
        &self.state.formula
    }

    #[must_use]
    pub const fn composition(&self) -> &Composition<'a> {
        &self.state.composition
    }

    #[must_use]
    pub const fn charge(&self) -> Charge {
        self.state.charge
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.simulator.config
    }

    #[must_use]
    pub const fn molecular_weight(&self) -> Mass {
        self.state.molecular_weight
    }

    /// The fraction of the molecular weight contributed by each element
    #[must_use]
    pub const fn percent_composition(&self) -> &BTreeMap<&'a str, Decimal> {
        &self.state.percent_composition
    }

    /// The m/z of the tallest peak in the bar pattern
    #[must_use]
    pub const fn exact_mass(&self) -> f64 {
        self.state.exact_mass
    }

    /// A quick estimate of the exact mass from the most abundant isotope of each element, which drifts from the
    /// true exact mass as molecules grow
    #[must_use]
    pub fn rough_exact_mass(&self) -> f64 {
        self.monoisotopic_mass().to_f64() / charge_magnitude(self.state.charge)
    }

    /// The infinite-resolution pattern, with masses uncorrected for charge
    #[must_use]
    pub const fn raw_pattern(&self) -> &Spectrum {
        &self.state.raw_pattern
    }

    /// The raw pattern consolidated into resolvable peaks, in m/z
    #[must_use]
    pub const fn bar_pattern(&self) -> &Spectrum {
        &self.state.bar_pattern
    }

    #[must_use]
    pub const fn fwhm(&self) -> f64 {
        self.state.fwhm
    }

    #[must_use]
    pub const fn sigma(&self) -> f64 {
        self.state.sigma
    }

    /// The spectrum an instrument of the configured resolution would record. Recalculated on every call.
    #[must_use]
    pub fn gaussian_pattern(&self) -> Spectrum {
        self.gaussian_accumulator().into_spectrum()
    }

    /// How far an experimental spectrum strays from the simulated one, as the root-mean-square of their intensity
    /// differences after normalising both to 100 (lower is better)
    ///
    /// Returns `None` when the experimental spectrum has no signal or doesn't overlap the simulated one.
    #[must_use]
    pub fn compare(&self, experimental: &Spectrum) -> Option<f64> {
        rms_residual(&self.gaussian_accumulator(), experimental)
    }

    /// Undoes every mutation since this molecule was built
    pub fn reset(&mut self) {
        self.state = self.snapshot.clone();
    }

    /// Recalculates this molecule under a new configuration. Its composition and charge are kept, as is the state
    /// that [`Molecule::reset`] returns to; the configured default charge only applies to newly built molecules.
    ///
    /// # Errors
    ///
    /// If `config` is invalid, in which case the molecule is left untouched
    pub fn reconfigure(&mut self, config: Config) -> Result<()> {
        let simulator = Simulator::new(self.simulator.atomic_db, self.simulator.abbreviations, config)?;
        let state = self.state.recalculate(&config)?;
        let snapshot = self.snapshot.recalculate(&config)?;
        *self = Self {
            simulator,
            state,
            snapshot,
        };
        Ok(())
    }
}

// Massive and Display Trait Implementations ===========================================================================

impl Massive for Molecule<'_> {
    fn monoisotopic_mass(&self) -> Mass {
        self.state.composition.monoisotopic_mass()
    }

    fn average_mass(&self) -> Mass {
        self.state.composition.average_mass()
    }
}

impl Display for Molecule<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.state.composition)
    }
}

// Private Helper Methods ==============================================================================================

impl<'a> MoleculeState<'a> {
    fn new(
        config: &Config,
        formula: String,
        composition: Composition<'a>,
        charge: Charge,
    ) -> Result<Self> {
        if composition.is_empty() {
            return Err(IsochemError::empty_composition(&formula).into());
        }

        let molecular_weight = composition.average_mass();
        let percent_composition = composition.percent_composition();
        let raw_pattern = raw_pattern(&composition, config);
        let bar_pattern = bar_pattern(&raw_pattern, charge);

        // NOTE: The tallest bar is normalised to exactly 100, but fall back to the base peak all the same
        let exact_mass = bar_pattern
            .iter()
            .find(|&(_, intensity)| intensity == 100.0)
            .or_else(|| bar_pattern.base_peak())
            .map_or(0.0, |(mz, _)| mz);
        let fwhm = exact_mass / config.resolution;
        let sigma = fwhm / (2.0 * (2.0 * LN_2).sqrt());

        progress!(
            config.verbose,
            %composition,
            %charge,
            exact_mass,
            fwhm,
            peaks = bar_pattern.len(),
            "calculated isotope pattern"
        );

        Ok(Self {
            formula,
            composition,
            charge,
            molecular_weight,
            percent_composition,
            raw_pattern,
            bar_pattern,
            exact_mass,
            fwhm,
            sigma,
        })
    }

    fn recalculate(&self, config: &Config) -> Result<Self> {
        Self::new(config, self.formula.clone(), self.composition.clone(), self.charge)
    }
}

impl Molecule<'_> {
    fn gaussian_accumulator(&self) -> Accumulator {
        gaussian_spectrum(
            &self.state.bar_pattern,
            self.state.fwhm,
            self.state.sigma,
            self.simulator.config.storage,
        )
    }
}

fn charge_magnitude(charge: Charge) -> f64 {
    i64::from(charge.abs()) as f64
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use once_cell::sync::Lazy;
    use rust_decimal_macros::dec;

    use crate::{Storage, testing_tools::assert_error_message};

    use super::*;

    static DB: Lazy<AtomicDatabase> = Lazy::new(AtomicDatabase::default);
    static ABBREVIATIONS: Lazy<AbbreviationDatabase> = Lazy::new(|| AbbreviationDatabase::builtin(&DB));
    static SIMULATOR: Lazy<Simulator> =
        Lazy::new(|| Simulator::new(&DB, &ABBREVIATIONS, Config::default()).unwrap());

    fn bars(molecule: &Molecule) -> String {
        molecule
            .bar_pattern()
            .iter()
            .map(|(mz, intensity)| format!("{mz:.7} {intensity:.4}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn tetrahydroxyborate() {
        let borate = SIMULATOR.molecule("B(OH)4").unwrap();
        assert_eq!(borate.formula(), "B(OH)4");
        assert_eq!(borate.to_string(), "BH4O4");
        assert_eq!(borate.composition().get("B").unwrap().get(), 1);
        assert_eq!(borate.composition().get("O").unwrap().get(), 4);
        assert_eq!(borate.composition().get("H").unwrap().get(), 4);
        assert_eq!(borate.charge(), Charge(1));
        assert_eq!(borate.molecular_weight(), Mass(dec!(78.84041075990622100)));
        assert_eq!(borate.monoisotopic_mass(), Mass(dec!(79.02026396720)));

        insta::assert_snapshot!(bars(&borate), @r"
        78.0238954 24.8439
        79.0202638 100.0000
        ");
        // The tallest bar sits at the exact mass
        assert_eq!(format!("{:.7}", borate.exact_mass()), "79.0202638");
        assert_eq!(borate.bar_pattern().base_peak().unwrap().0, borate.exact_mass());
        assert_eq!(format!("{:.5}", borate.rough_exact_mass()), "79.02026");

        let fwhm = borate.exact_mass() / 5000.0;
        assert_eq!(borate.fwhm(), fwhm);
        assert!((borate.sigma() - fwhm / 2.354_820_045).abs() < 1e-12);
    }

    #[test]
    fn bar_pattern_invariants() {
        for formula in ["C6H12O6", "B(OH)4", "FeCl3", "C60", "Fmoc(13C)2", "[Fe(CN)6](3-)"] {
            let molecule = SIMULATOR.molecule(formula).unwrap();
            let bars = molecule.bar_pattern();
            assert_eq!(bars.max_intensity(), Some(100.0), "{formula}");
            assert!(bars.intensity().iter().all(|&i| i >= 0.0), "{formula}");
            assert!(bars.iter().any(|peak| peak == (molecule.exact_mass(), 100.0)), "{formula}");
            assert_eq!(molecule.raw_pattern().max_intensity(), Some(100.0), "{formula}");
        }
    }

    #[test]
    fn charged_molecules() {
        let neutral = SIMULATOR.molecule("C6H12O6").unwrap();
        let charged = SIMULATOR.molecule("C6H12O6(2+)").unwrap();
        assert_eq!(charged.charge(), Charge(2));
        assert_eq!(charged.raw_pattern(), neutral.raw_pattern());
        assert_eq!(format!("{:.7}", neutral.exact_mass()), "180.0633876");
        assert_eq!(format!("{:.7}", charged.exact_mass()), "90.0316938");
        assert_eq!(charged.molecular_weight(), neutral.molecular_weight());
        assert!((charged.fwhm() * 2.0 - neutral.fwhm()).abs() < 1e-12);

        // The configured charge is used when the formula has none
        let config = Config {
            charge: Charge(-3),
            ..Config::default()
        };
        let anion = Molecule::new(&DB, &ABBREVIATIONS, "C6H12O6", config).unwrap();
        assert_eq!(anion.charge(), Charge(-3));
        assert_eq!(format!("{:.7}", anion.exact_mass()), "60.0211292");
        // But the formula's charge takes precedence
        let cation = Molecule::new(&DB, &ABBREVIATIONS, "C6H12O6(+1)", config).unwrap();
        assert_eq!(cation.charge(), Charge(1));
    }

    #[test]
    fn invalid_molecules() {
        assert_error_message!(
            SIMULATOR.molecule("(2+)"),
            r#"the formula "(2+)" doesn't contain any atoms"#
        );
        assert_error_message!(SIMULATOR.molecule("()"), r#"the formula "()" doesn't contain any atoms"#);
        assert_error_message!(SIMULATOR.molecule(""), "the formula is empty");
        assert_error_message!(
            SIMULATOR.molecule("C6H12O6)"),
            "found a closing ')' bracket without a matching opening bracket"
        );
        let config = Config {
            decimals: 12,
            ..Config::default()
        };
        assert_error_message!(
            Molecule::new(&DB, &ABBREVIATIONS, "H2O", config),
            "the raw pattern can be binned to at most 10 decimal places, but 12 were requested"
        );
    }

    #[test]
    fn percent_composition() {
        let water = SIMULATOR.molecule("D2O").unwrap();
        let fractions: Vec<_> = water
            .percent_composition()
            .iter()
            .map(|(&symbol, fraction)| (symbol, fraction.round_dp(4)))
            .collect();
        assert_eq!(fractions, [("H", dec!(0.2011)), ("O", dec!(0.7989))]);
        let total: Decimal = water.percent_composition().values().sum();
        assert_eq!(total.round_dp(20), Decimal::ONE);
    }

    #[test]
    fn heavy_elements() {
        let formulas = [
            "KrF2", "Y2O3", "ZrO2", "NbCl5", "CdS", "InP", "SbCl3", "TeO2", "XeF2", "BaSO4", "La2O3", "CeO2",
            "Pr6O11", "Nd2Fe14B", "Sm2O3", "EuCl3", "GdCl3", "Tb4O7", "Dy2O3", "HoCl3", "Er2O3", "TmF3", "Yb2O3",
            "LuCl3", "HfO2", "Ta2O5", "WO3", "ReO3", "OsO4", "IrCl3", "TlCl", "ThO2", "PaCl5",
        ];
        for formula in formulas {
            let molecule = SIMULATOR.molecule(formula).unwrap();
            let bars = molecule.bar_pattern();
            assert_eq!(bars.max_intensity(), Some(100.0), "{formula}");
            assert!(molecule.exact_mass() > 80.0, "{formula}");
            assert!(molecule.molecular_weight() > Mass::default(), "{formula}");
        }

        // Radioactive elements can only be used with an explicit isotope
        let radon_fluoride = SIMULATOR.molecule("(222Rn)F2").unwrap();
        assert_eq!(radon_fluoride.bar_pattern().len(), 1);
        assert_eq!(format!("{:.4}", radon_fluoride.exact_mass()), "260.0144");
        assert!(SIMULATOR.molecule("PuO2").is_err());
        assert!(SIMULATOR.molecule("(239Pu)O2").is_ok());
    }

    #[test]
    fn gaussian_pattern() {
        let borate = SIMULATOR.molecule("B(OH)4").unwrap();
        let gaussian = borate.gaussian_pattern();
        assert_eq!(gaussian.max_intensity(), Some(100.0));
        let (lightest, heaviest) = (gaussian.mz()[0], gaussian.mz()[gaussian.len() - 1]);
        assert!(lightest < 78.0238954 - borate.fwhm());
        assert!(heaviest > 79.0202638 + borate.fwhm());

        // The simulated spectrum matches itself
        let error = borate.compare(&gaussian).unwrap();
        assert!(error < 1e-9, "{error}");
        let scaled = Spectrum::new(
            gaussian.mz().to_vec(),
            gaussian.intensity().iter().map(|i| i * 3.0).collect(),
        )
        .unwrap();
        let error = borate.compare(&scaled).unwrap();
        assert!(error < 1e-9, "{error}");

        // But not other molecules
        let water = SIMULATOR.molecule("H2O").unwrap();
        assert_eq!(water.compare(&gaussian), None);
        let shifted = Spectrum::new(gaussian.mz().iter().map(|mz| mz + 0.002).collect(), gaussian.intensity().to_vec())
            .unwrap();
        assert!(borate.compare(&shifted).unwrap() > 1.0);
    }

    #[test]
    fn storage_modes_agree() {
        let sparse = Config {
            decimals: 3,
            ..Config::default()
        };
        let dense = Config {
            storage: Storage::Dense,
            ..sparse
        };
        let sparse = Molecule::new(&DB, &ABBREVIATIONS, "C12H22O11", sparse).unwrap();
        let dense = Molecule::new(&DB, &ABBREVIATIONS, "C12H22O11", dense).unwrap();
        assert_eq!(sparse.raw_pattern(), dense.raw_pattern());
        assert_eq!(sparse.bar_pattern(), dense.bar_pattern());
        assert_eq!(sparse.gaussian_pattern(), dense.gaussian_pattern());
    }

    #[test]
    fn reconfigure() {
        let mut sugar = SIMULATOR.molecule("C6H12O6").unwrap();
        sugar.add("H2O(2+)").unwrap();
        assert_eq!(sugar.charge(), Charge(2));
        let mutated = sugar.to_string();

        let config = Config {
            decimals: 4,
            resolution: 10_000.0,
            charge: Charge(-1),
            ..Config::default()
        };
        sugar.reconfigure(config).unwrap();
        assert_eq!(sugar.config().decimals, 4);
        assert_eq!(sugar.to_string(), mutated);
        assert_eq!(sugar.charge(), Charge(2));
        assert!((sugar.fwhm() - sugar.exact_mass() / 10_000.0).abs() < 1e-12);

        // The reset state was recalculated too, and the new configuration sticks through later mutations
        sugar.reset();
        assert_eq!(sugar.to_string(), "C6H12O6");
        assert_eq!(sugar.charge(), Charge(1));
        assert_eq!(sugar.config().resolution, 10_000.0);
        sugar.multiply(2).unwrap();
        assert_eq!(sugar.config().decimals, 4);

        // An invalid configuration leaves the molecule as it was
        let before = sugar.clone();
        let invalid = Config {
            resolution: -1.0,
            ..config
        };
        assert!(sugar.reconfigure(invalid).is_err());
        assert_eq!(sugar.to_string(), before.to_string());
        assert_eq!(sugar.bar_pattern(), before.bar_pattern());
        assert_eq!(sugar.config().resolution, 10_000.0);
    }
}

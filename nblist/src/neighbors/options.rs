use crate::Error;

use super::CutoffMatrix;

/// Cutoff to use for a specific pair of species
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SpeciesPairCutoff {
    /// first species in the pair
    pub first: i32,
    /// second species in the pair
    pub second: i32,
    /// interaction cutoff for this pair of species
    pub cutoff: f64,
}

/// Parameters for a [`LocalCellList`](super::LocalCellList).
///
/// These can be created directly or parsed from JSON, for example
///
/// ```json
/// {
///     "cutoff": 2.5,
///     "skin": 0.3,
///     "species_cutoffs": [{"first": 1, "second": 8, "cutoff": 1.2}]
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NeighborListOptions {
    /// Interaction cutoff, used for all pairs of species not listed in
    /// `species_cutoffs`
    pub cutoff: f64,
    /// Additional distance added to the interaction cutoff when building the
    /// candidate list, allowing particles to move a bit before the list needs
    /// to be rebuilt. Defaults to 10% of the largest cutoff.
    #[serde(default)]
    pub skin: Option<f64>,
    /// Fraction of the skin particles are allowed to move before the list is
    /// considered stale. With the default of 0.5, the list becomes stale as
    /// soon as two particles could have moved closer by more than the skin.
    #[serde(default = "serde_default_drift_factor")]
    pub drift_factor: f64,
    /// Specific cutoffs for some pairs of species
    #[serde(default)]
    pub species_cutoffs: Vec<SpeciesPairCutoff>,
}

fn serde_default_drift_factor() -> f64 { 0.5 }

impl NeighborListOptions {
    /// Create options using a single `cutoff` and the given `skin`
    pub fn new(cutoff: f64, skin: f64) -> NeighborListOptions {
        NeighborListOptions {
            cutoff: cutoff,
            skin: Some(skin),
            drift_factor: serde_default_drift_factor(),
            species_cutoffs: Vec::new(),
        }
    }

    /// Parse options from a JSON string, and validate them
    pub fn from_json(json: &str) -> Result<NeighborListOptions, Error> {
        let options = serde_json::from_str::<NeighborListOptions>(json)?;
        options.validate()?;
        return Ok(options);
    }

    /// Check that all the values in these options make sense
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.cutoff > 0.0 && self.cutoff.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "cutoff must be a positive finite number, got {}", self.cutoff
            )));
        }

        if let Some(skin) = self.skin {
            if !(skin >= 0.0 && skin.is_finite()) {
                return Err(Error::InvalidParameter(format!(
                    "skin must be a non-negative finite number, got {}", skin
                )));
            }
        }

        if !(self.drift_factor > 0.0 && self.drift_factor < 1.0) {
            return Err(Error::InvalidParameter(format!(
                "drift_factor must be between 0 and 1, got {}", self.drift_factor
            )));
        }

        // this checks the values in species_cutoffs
        self.cutoffs()?;

        Ok(())
    }

    /// Get the cutoff matrix corresponding to these options
    pub fn cutoffs(&self) -> Result<CutoffMatrix, Error> {
        if self.species_cutoffs.is_empty() {
            Ok(CutoffMatrix::uniform(self.cutoff))
        } else {
            CutoffMatrix::new(self.cutoff, &self.species_cutoffs)
        }
    }

    /// Get the skin to use with these options, falling back to 10% of the
    /// largest cutoff
    pub fn skin(&self) -> Result<f64, Error> {
        match self.skin {
            Some(skin) => Ok(skin),
            None => Ok(0.1 * self.cutoffs()?.max_cutoff()),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_ulps_eq;

    use super::*;

    #[test]
    fn from_json() {
        let options = NeighborListOptions::from_json(r#"{
            "cutoff": 2.5,
            "skin": 0.3,
            "species_cutoffs": [{"first": 1, "second": 8, "cutoff": 3.0}]
        }"#).unwrap();

        assert_eq!(options.cutoff, 2.5);
        assert_eq!(options.skin, Some(0.3));
        assert_eq!(options.drift_factor, 0.5);
        assert_eq!(options.species_cutoffs, [SpeciesPairCutoff { first: 1, second: 8, cutoff: 3.0 }]);

        let cutoffs = options.cutoffs().unwrap();
        assert_eq!(cutoffs.cutoff2(8, 1), 9.0);
        assert_eq!(cutoffs.cutoff2(1, 1), 6.25);
    }

    #[test]
    fn defaults() {
        let options = NeighborListOptions::from_json(r#"{"cutoff": 4.0}"#).unwrap();
        assert_eq!(options.skin, None);
        assert_ulps_eq!(options.skin().unwrap(), 0.4);
        assert!(options.species_cutoffs.is_empty());

        let options = NeighborListOptions::from_json(r#"{
            "cutoff": 2.0,
            "species_cutoffs": [{"first": 1, "second": 1, "cutoff": 5.0}]
        }"#).unwrap();
        assert_ulps_eq!(options.skin().unwrap(), 0.5);
    }

    #[test]
    fn invalid() {
        let result = NeighborListOptions::from_json(r#"{"cutoff": 4.0, "unknown": 3}"#);
        assert!(matches!(result, Err(Error::Json(_))));

        let result = NeighborListOptions::from_json(r#"{"cutoff": -4.0}"#);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));

        let result = NeighborListOptions::from_json(r#"{"cutoff": 4.0, "skin": -0.1}"#);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));

        let result = NeighborListOptions::from_json(r#"{"cutoff": 4.0, "drift_factor": 1.5}"#);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));

        let result = NeighborListOptions::from_json(r#"{
            "cutoff": 2.0,
            "species_cutoffs": [{"first": 1, "second": 1, "cutoff": 0.0}]
        }"#);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn schema() {
        let schema = schemars::schema_for!(NeighborListOptions);
        let schema = serde_json::to_value(&schema).unwrap();

        let properties = schema["properties"].as_object().unwrap();
        assert!(properties.contains_key("cutoff"));
        assert!(properties.contains_key("skin"));
        assert!(properties.contains_key("drift_factor"));
        assert!(properties.contains_key("species_cutoffs"));

        assert_eq!(schema["required"], serde_json::json!(["cutoff"]));
    }
}

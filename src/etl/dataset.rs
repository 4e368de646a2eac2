/// Dataset Module
///
/// Describes each dataset once: where its columns live in the source sheet, how the stored
/// value is derived, and which table receives it. The transform and load stages are generic
/// over these descriptors.
use rust_decimal::Decimal;

use crate::models::DatasetKind;

/// How the stored value is derived from the source value column
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueDerivation {
    /// Store the source value as-is (MW)
    Passthrough,
    /// Divide by nameplate capacity and clamp into [0, 1]
    CapacityFactor { capacity_mw: Decimal },
}

impl ValueDerivation {
    pub fn apply(&self, value: Decimal) -> Decimal {
        match self {
            Self::Passthrough => value,
            Self::CapacityFactor { capacity_mw } => {
                // Overflow saturates; the clamp below brings it back into range
                let factor = value.checked_div(*capacity_mw).unwrap_or(if value.is_sign_negative() {
                    Decimal::MIN
                } else {
                    Decimal::MAX
                });
                factor.clamp(Decimal::ZERO, Decimal::ONE)
            }
        }
    }
}

/// Source column names for one dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceColumns {
    pub date: &'static str,
    pub hour_ending: &'static str,
    pub value: &'static str,
}

impl SourceColumns {
    pub fn required(&self) -> [&'static str; 3] {
        [self.date, self.hour_ending, self.value]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetDescriptor {
    pub kind: DatasetKind,
    pub columns: SourceColumns,
    pub derivation: ValueDerivation,
    pub table: &'static str,
    pub value_column: &'static str,
    /// Collapse duplicate (date, hour) rows, keeping the first
    pub dedup_keys: bool,
}

impl DatasetDescriptor {
    pub fn load() -> Self {
        Self {
            kind: DatasetKind::Load,
            columns: SourceColumns { date: "Date", hour_ending: "Hr_End", value: "RT_Demand" },
            derivation: ValueDerivation::Passthrough,
            table: "load_curves",
            value_column: "load_mw",
            dedup_keys: true,
        }
    }

    pub fn solar(capacity_mw: Decimal) -> Self {
        Self {
            kind: DatasetKind::Solar,
            columns: SourceColumns { date: "local_day", hour_ending: "LOCAL_HOUR_END", value: "tot_solar_mwh" },
            derivation: ValueDerivation::CapacityFactor { capacity_mw },
            table: "solar_generation",
            value_column: "generation_factor",
            dedup_keys: false,
        }
    }

    pub fn wind(capacity_mw: Decimal) -> Self {
        Self {
            kind: DatasetKind::Wind,
            columns: SourceColumns { date: "local_day", hour_ending: "local_hour_end", value: "tot_wind_mwh" },
            derivation: ValueDerivation::CapacityFactor { capacity_mw },
            table: "wind_generation",
            value_column: "generation_factor",
            dedup_keys: false,
        }
    }

    /// Descriptor for a dataset kind using the configured capacities
    pub fn for_kind(kind: DatasetKind, solar_capacity_mw: Decimal, wind_capacity_mw: Decimal) -> Self {
        match kind {
            DatasetKind::Load => Self::load(),
            DatasetKind::Solar => Self::solar(solar_capacity_mw),
            DatasetKind::Wind => Self::wind(wind_capacity_mw),
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }
}

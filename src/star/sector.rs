// src/star/sector.rs

use tracing::instrument;

use crate::error::EtlError;

/// Indicator column ↔ display name, in warehouse key order. `sector_key` is
/// the 1-based position in this slice. This is a closed, versioned vocabulary:
/// it is never derived from source content, so sector identity is stable
/// across runs regardless of which rows the source file happens to contain.
pub const SECTORS: &[(&str, &str)] = &[
    ("indice_manufacturas_mensual", "Manufacturas"),
    ("indice_comercio_mensual", "Comercio"),
    ("indice_construccion_mensual", "Construcción"),
    ("indice_servicios_mensual", "Servicios"),
    (
        "indice_de_actividad_empresarial_no_petrolera_total_mensual",
        "Total AENP",
    ),
];

pub const SECTOR_COUNT: usize = SECTORS.len();

#[derive(Debug, Clone, PartialEq)]
pub struct SectorRow {
    pub sector_key: i64,
    pub sector_name: String,
}

/// Build the sector dimension from the static vocabulary.
///
/// A duplicate column identifier or display name would make the fact join
/// ambiguous, so both are rejected here, before any stage uses the dimension.
#[instrument(level = "info")]
pub fn build_sector_dimension() -> Result<Vec<SectorRow>, EtlError> {
    for (i, (column, name)) in SECTORS.iter().enumerate() {
        for (other_column, other_name) in &SECTORS[i + 1..] {
            if column == other_column {
                return Err(EtlError::Configuration {
                    detail: format!("duplicate indicator column `{column}`"),
                });
            }
            if name == other_name {
                return Err(EtlError::Configuration {
                    detail: format!("duplicate display name `{name}`"),
                });
            }
        }
    }

    Ok(SECTORS
        .iter()
        .enumerate()
        .map(|(i, (_, name))| SectorRow {
            sector_key: (i + 1) as i64,
            sector_name: (*name).to_string(),
        })
        .collect())
}

/// Display name for an indicator column, if the column is in the vocabulary.
pub fn display_name(column: &str) -> Option<&'static str> {
    SECTORS
        .iter()
        .find(|(c, _)| *c == column)
        .map(|(_, name)| *name)
}

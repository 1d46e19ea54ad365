//! Static column-name signatures for each mission's raw table

use super::Mission;
use serde::Serialize;

/// Characteristic set of column names identifying a mission's raw schema
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MissionSignature {
    pub mission: Mission,
    pub columns: &'static [&'static str],
}

impl MissionSignature {
    /// Number of signature columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Whether `column` belongs to this signature
    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }
}

const KEPLER_COLUMNS: &[&str] = &[
    "koi_pdisposition", "koi_fpflag_nt", "koi_fpflag_ss", "koi_fpflag_co", "koi_fpflag_ec",
    "koi_period", "koi_time0bk", "koi_impact", "koi_duration", "koi_depth", "koi_prad",
    "koi_teq", "koi_insol", "koi_model_snr", "koi_tce_plnt_num", "koi_steff",
    "koi_slogg", "koi_srad", "ra", "dec", "koi_kepmag",
];

const TESS_COLUMNS: &[&str] = &[
    "ra", "dec", "st_pmra", "st_pmdec", "pl_tranmid",
    "pl_orbper", "pl_trandurh", "pl_trandep", "pl_trandeplim", "pl_rade",
    "pl_insol", "pl_eqt", "st_tmag", "st_dist", "st_teff", "st_logg", "st_rad",
];

const K2_COLUMNS: &[&str] = &[
    "pl_orbperlim", "pl_rade", "pl_radelim", "pl_radj",
    "pl_radjlim", "ttv_flag", "st_rad", "st_radlim", "dec", "sy_dist",
    "sy_vmag", "sy_kmag", "sy_gaiamag",
];

/// All registered signatures, in [`Mission::PRIORITY`] order
pub const SIGNATURES: [MissionSignature; 3] = [
    MissionSignature { mission: Mission::Kepler, columns: KEPLER_COLUMNS },
    MissionSignature { mission: Mission::Tess, columns: TESS_COLUMNS },
    MissionSignature { mission: Mission::K2, columns: K2_COLUMNS },
];

/// Look up the signature of a mission
pub fn signature(mission: Mission) -> &'static MissionSignature {
    match mission {
        Mission::Kepler => &SIGNATURES[0],
        Mission::Tess => &SIGNATURES[1],
        Mission::K2 => &SIGNATURES[2],
    }
}

//! Static per-mission preprocessing plans

use crate::mission::{signature, Mission};
use serde::Serialize;

/// Statistic used to fill missing numeric values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FillRule {
    Mean,
    Median,
}

/// How rows are treated by target-column encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LabelPolicy {
    /// Rows whose normalized value contains `reject` are removed, then every
    /// row whose value is not in the label map is removed as well
    FilterToKnown { reject: &'static str },
    /// Every row is kept; unmapped values become null labels
    KeepAll,
}

/// Immutable preprocessing recipe for one mission
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PreprocessingPlan {
    pub mission: Mission,
    pub drop_columns: &'static [&'static str],
    pub fill: FillRule,
    pub target: &'static str,
    /// Normalized (trimmed, uppercase) target value to class id
    pub label_map: &'static [(&'static str, i32)],
    pub label_policy: LabelPolicy,
    /// Columns that are filled then one-hot expanded instead of coerced
    pub dummy_columns: &'static [&'static str],
    /// Whether caller-requested outlier suppression applies to this mission
    pub supports_outliers: bool,
}

/// Kepler delivery-name column
pub const KEPLER_DELIVNAME: &str = "koi_tce_delivname";

const KEPLER_DROP: &[&str] = &[
    "kepid", "kepoi_name", "kepler_name", "koi_pdisposition", "koi_score",
    "koi_period_err1", "koi_time0bk_err2", "koi_time0bk_err1",
    "koi_impact_err1", "koi_impact_err2", "koi_duration_err1", "koi_duration_err2",
    "koi_depth_err1", "koi_depth_err2", "koi_prad_err1", "koi_prad_err2",
    "koi_teq_err1", "koi_teq_err2", "koi_insol_err1", "koi_insol_err2",
    "koi_steff_err1", "koi_steff_err2", "koi_slogg_err1", "koi_slogg_err2",
    "koi_srad_err1", "koi_srad_err2",
];

const K2_DROP: &[&str] = &[
    "pl_name", "hostname", "default_flag", "disp_refname",
    "sy_snum", "sy_pnum", "discoverymethod", "disc_year", "disc_facility", "soltype", "pl_controv_flag",
    "pl_refname", "pl_orbpererr1", "pl_orbpererr2", "pl_orbsmaxerr1", "pl_orbsmaxerr2",
    "pl_radeerr1", "pl_radeerr2", "pl_radjerr1", "pl_radjerr2", "pl_bmasseerr1", "pl_bmasseerr2",
    "pl_bmassjerr1", "pl_bmassjerr2", "pl_orbeccenerr1", "pl_orbeccenerr2", "pl_insolerr1", "pl_insolerr2",
    "pl_eqterr1", "pl_eqterr2", "st_refname", "st_spectype", "st_tefferr1", "st_tefferr2",
    "st_raderr1", "st_raderr2", "st_masserr1", "st_masserr2", "st_meterr1", "st_meterr2",
    "st_loggerr1", "st_loggerr2", "sy_refname", "sy_disterr1", "sy_disterr2", "sy_vmagerr1", "sy_vmagerr2",
    "sy_kmagerr1", "sy_kmagerr2", "sy_gaiamagerr1", "sy_gaiamagerr2", "rowupdate", "pl_pubdate", "releasedate",
    "Unnamed: 94", "Unnamed: 95", "Unnamed: 96", "Unnamed: 97", "pl_orbsmaxlim", "pl_bmasse", "pl_bmasselim", "pl_bmassj",
    "pl_bmassjlim", "pl_bmassprov", "pl_orbeccen", "pl_orbeccenlim", "pl_insol", "pl_insollim", "pl_orbsmax", "pl_eqt", "pl_eqtlim",
    "st_teff", "st_tefflim", "st_mass", "st_masslim", "st_met", "st_metlim", "st_metratio", "st_logg", "st_logglim", "rastr", "decstr",
    "ra", "pl_orbper",
];

const TESS_DROP: &[&str] = &[
    "toi", "tid", "rastr", "decstr",
    "st_pmraerr1", "st_pmraerr2", "st_pmdecerr1", "st_pmdecerr2",
    "pl_orbpererr1", "pl_orbpererr2", "pl_trandurherr1", "pl_trandurherr2",
    "pl_trandeperr1", "pl_trandeperr2", "pl_radeerr1", "pl_radeerr2",
    "pl_insolerr1", "pl_insolerr2", "pl_eqterr1", "pl_eqterr2",
    "st_tmagerr1", "st_tmagerr2", "st_disterr1", "st_disterr2",
    "st_tefferr1", "st_tefferr2", "st_loggerr1", "st_loggerr2",
    "st_raderr1", "st_raderr2", "pl_insollim", "pl_eqtlim", "toi_created",
    "rowupdate", "st_radlim", "st_logglim", "st_tefflim", "st_distlim", "st_tmaglim",
    "pl_radelim", "pl_trandurhlim", "pl_orbperlim", "pl_tranmidlim", "pl_tranmiderr2", "pl_tranmiderr1",
    "st_pmdeclim", "st_pmralim",
];

const KEPLER_PLAN: PreprocessingPlan = PreprocessingPlan {
    mission: Mission::Kepler,
    drop_columns: KEPLER_DROP,
    fill: FillRule::Mean,
    target: "koi_disposition",
    label_map: &[("CANDIDATE", 0), ("CONFIRMED", 1)],
    label_policy: LabelPolicy::FilterToKnown { reject: "FALSE" },
    dummy_columns: &[KEPLER_DELIVNAME],
    supports_outliers: true,
};

const K2_PLAN: PreprocessingPlan = PreprocessingPlan {
    mission: Mission::K2,
    drop_columns: K2_DROP,
    fill: FillRule::Median,
    target: "disposition",
    label_map: &[("CANDIDATE", 0), ("CONFIRMED", 1)],
    label_policy: LabelPolicy::KeepAll,
    dummy_columns: &[],
    supports_outliers: false,
};

const TESS_PLAN: PreprocessingPlan = PreprocessingPlan {
    mission: Mission::Tess,
    drop_columns: TESS_DROP,
    fill: FillRule::Median,
    target: "tfopwg_disp",
    label_map: &[("PC", 0), ("APC", 0), ("CP", 1), ("KP", 1)],
    label_policy: LabelPolicy::KeepAll,
    dummy_columns: &[],
    supports_outliers: false,
};

/// Look up the plan of a mission
pub fn plan(mission: Mission) -> &'static PreprocessingPlan {
    match mission {
        Mission::Kepler => &KEPLER_PLAN,
        Mission::K2 => &K2_PLAN,
        Mission::Tess => &TESS_PLAN,
    }
}

impl PreprocessingPlan {
    /// Whether `column` is removed by the drop list
    pub fn drops(&self, column: &str) -> bool {
        self.drop_columns.contains(&column)
    }

    /// Class id of a normalized target value
    pub fn encode_label(&self, normalized: &str) -> Option<i32> {
        self.label_map
            .iter()
            .find(|(value, _)| *value == normalized)
            .map(|(_, code)| *code)
    }

    /// Feature contract used when no trained artifact is available:
    /// the signature minus dropped columns and the target, in signature order
    pub fn default_feature_contract(&self) -> Vec<String> {
        signature(self.mission)
            .columns
            .iter()
            .filter(|c| !self.drops(c) && **c != self.target)
            .map(|c| c.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_drop_lists_unique() {
        for mission in Mission::PRIORITY {
            let p = plan(mission);
            let set: HashSet<_> = p.drop_columns.iter().collect();
            assert_eq!(set.len(), p.drop_columns.len(), "duplicate in {}", mission);
        }
        assert_eq!(plan(Mission::Kepler).drop_columns.len(), 26);
        assert_eq!(plan(Mission::K2).drop_columns.len(), 84);
        assert_eq!(plan(Mission::Tess).drop_columns.len(), 47);
    }

    #[test]
    fn test_delivname_is_encoded_not_dropped() {
        let p = plan(Mission::Kepler);
        assert!(!p.drops(KEPLER_DELIVNAME));
        assert_eq!(p.dummy_columns, &[KEPLER_DELIVNAME]);
    }

    #[test]
    fn test_label_encoding_orientation() {
        assert_eq!(plan(Mission::Kepler).encode_label("CONFIRMED"), Some(1));
        assert_eq!(plan(Mission::K2).encode_label("CANDIDATE"), Some(0));
        assert_eq!(plan(Mission::Tess).encode_label("KP"), Some(1));
        assert_eq!(plan(Mission::Tess).encode_label("APC"), Some(0));
        assert_eq!(plan(Mission::Tess).encode_label("FP"), None);
    }

    #[test]
    fn test_default_contracts() {
        let kepler = plan(Mission::Kepler).default_feature_contract();
        assert_eq!(kepler.len(), 20);
        assert!(!kepler.contains(&"koi_pdisposition".to_string()));

        assert_eq!(plan(Mission::Tess).default_feature_contract().len(), 17);

        let k2 = plan(Mission::K2).default_feature_contract();
        assert_eq!(k2.len(), 13);
        assert!(k2.contains(&"sy_dist".to_string()));
    }
}

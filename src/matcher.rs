use std::path::{Path, PathBuf};

/// Suffix some exporters append after the well token, e.g.
/// `EXP_P1_L52_A3_attention_map.jpg`.
const ATTENTION_MAP_MARKER: &str = "_attention_map";

pub const STAGES: &[&str] = &["PreFix", "PostFix", "PostStain"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub experiment: String,
    pub plate: String,
    pub patient_code: String,
    pub stage: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub filename: String,
    pub well_id: String,
    pub path: PathBuf,
}

/// Filters `files` by `criteria` and derives an `ImageRecord` for each match,
/// preserving input order.
///
/// The plate criterion is located by prefix (first `_` segment of the
/// lower-cased path starting with it) but only accepted on exact equality, so
/// `P1` selects `..._P1_...` and rejects `..._P10_...`. The remaining criteria
/// are case-insensitive substring tests; empty ones are ignored.
pub fn match_images(
    files: &[PathBuf],
    directory: &Path,
    criteria: &FilterCriteria,
) -> Vec<ImageRecord> {
    let plate = criteria.plate.to_lowercase();
    let required = [
        criteria.experiment.to_lowercase(),
        criteria.patient_code.to_lowercase(),
        criteria.stage.to_lowercase(),
    ];

    files
        .iter()
        .filter(|file| {
            let lower = file.to_string_lossy().to_lowercase();
            let plate_segment = lower.split('_').find(|segment| segment.starts_with(&plate));
            plate_segment == Some(plate.as_str())
                && required
                    .iter()
                    .all(|part| part.is_empty() || lower.contains(part.as_str()))
        })
        .map(|file| {
            let filename = filename_of(&file.to_string_lossy()).to_string();
            ImageRecord {
                well_id: well_id_from_filename(&filename),
                path: directory.join(&filename),
                filename,
            }
        })
        .collect()
}

/// Well token of an image filename, lower-cased: `EXP_P1_H7.png` -> `h7`.
pub fn well_id_from_filename(filename: &str) -> String {
    let stem = match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    };
    let stem = strip_suffix_ignore_ascii_case(stem, ATTENTION_MAP_MARKER);
    let token = stem.rsplit('_').next().unwrap_or_default();
    token.split('.').next().unwrap_or_default().to_lowercase()
}

/// Whether the patient code and stage inputs should be editable: experiment
/// and plate are set and at least one listed file mentions both.
pub fn secondary_inputs_enabled(files: &[PathBuf], criteria: &FilterCriteria) -> bool {
    if criteria.experiment.is_empty() || criteria.plate.is_empty() {
        return false;
    }
    let experiment = criteria.experiment.to_lowercase();
    let plate = criteria.plate.to_lowercase();
    files.iter().any(|file| {
        let lower = file.to_string_lossy().to_lowercase();
        lower.contains(&experiment) && lower.contains(&plate)
    })
}

pub fn filename_of(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn strip_suffix_ignore_ascii_case<'a>(value: &'a str, suffix: &str) -> &'a str {
    if value.len() < suffix.len() {
        return value;
    }
    let split = value.len() - suffix.len();
    if !value.is_char_boundary(split) {
        return value;
    }
    let (head, tail) = value.split_at(split);
    if tail.eq_ignore_ascii_case(suffix) {
        head
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria(experiment: &str, plate: &str, patient_code: &str, stage: &str) -> FilterCriteria {
        FilterCriteria {
            experiment: experiment.to_string(),
            plate: plate.to_string(),
            patient_code: patient_code.to_string(),
            stage: stage.to_string(),
        }
    }

    fn paths(dir: &str, names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|name| Path::new(dir).join(name)).collect()
    }

    #[test]
    fn well_id_strips_attention_map_marker() {
        assert_eq!(well_id_from_filename("EXP_P1_PATIENT_A3_attention_map.jpg"), "a3");
        assert_eq!(well_id_from_filename("EXP_P1_PATIENT_B4_ATTENTION_MAP.png"), "b4");
    }

    #[test]
    fn well_id_takes_last_token() {
        assert_eq!(well_id_from_filename("EXP_P1_H7.png"), "h7");
        assert_eq!(well_id_from_filename("H7.png"), "h7");
        assert_eq!(well_id_from_filename("EXP_P1_"), "");
    }

    #[test]
    fn filename_of_handles_both_separators() {
        assert_eq!(filename_of("/data/plates/X_P1_A1.jpg"), "X_P1_A1.jpg");
        assert_eq!(filename_of("C:\\plates\\X_P1_A1.jpg"), "X_P1_A1.jpg");
        assert_eq!(filename_of("X_P1_A1.jpg"), "X_P1_A1.jpg");
    }

    #[test]
    fn plate_requires_exact_segment() {
        let files = paths("/data", &["DF195_P1_L52_PreFix_A2.jpg", "DF195_P10_L52_PreFix_A3.jpg"]);
        let matched = match_images(&files, Path::new("/data"), &criteria("", "P1", "", ""));
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].filename, "DF195_P1_L52_PreFix_A2.jpg");
    }

    #[test]
    fn plate_prefix_hit_on_longer_segment_rejects() {
        // The first segment starting with "p1" is "p10", which is not equal.
        let files = paths("/data", &["DF195_P10_P1_PreFix_A3.jpg"]);
        let matched = match_images(&files, Path::new("/data"), &criteria("", "P1", "", ""));
        assert!(matched.is_empty());
    }

    #[test]
    fn empty_plate_only_matches_empty_plate_segment() {
        let files = vec![PathBuf::from("_P1_A2.jpg"), PathBuf::from("DF195_P1_A2.jpg")];
        let matched = match_images(&files, Path::new(""), &criteria("", "", "", ""));
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].filename, "_P1_A2.jpg");
    }

    #[test]
    fn other_criteria_are_case_insensitive_substrings() {
        let files = paths(
            "/data",
            &[
                "DF195_P1_L52_PreFix_A2.jpg",
                "DF195_P1_L53_PreFix_A3.jpg",
                "DF195_P1_L52_PostFix_A4.jpg",
            ],
        );
        let matched = match_images(&files, Path::new("/data"), &criteria("df195", "p1", "l52", "prefix"));
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].well_id, "a2");

        let unconstrained = match_images(&files, Path::new("/data"), &criteria("", "p1", "", ""));
        assert_eq!(unconstrained.len(), 3);
    }

    #[test]
    fn match_is_deterministic_and_order_preserving() {
        let files = paths("/data", &["E_P1_B3.png", "E_P1_A2.png", "E_P1_C1.png"]);
        let c = criteria("E", "P1", "", "");
        let first = match_images(&files, Path::new("/data"), &c);
        let second = match_images(&files, Path::new("/data"), &c);
        assert_eq!(first, second);
        let wells = first.iter().map(|r| r.well_id.as_str()).collect::<Vec<_>>();
        assert_eq!(wells, vec!["b3", "a2", "c1"]);
    }

    #[test]
    fn record_path_joins_directory_and_filename() {
        let files = vec![PathBuf::from("C:\\plates\\DF195_P1_A2.jpg")];
        let matched = match_images(&files, Path::new("/mnt/plates"), &criteria("", "p1", "", ""));
        assert_eq!(matched[0].filename, "DF195_P1_A2.jpg");
        assert_eq!(matched[0].path, Path::new("/mnt/plates").join("DF195_P1_A2.jpg"));
    }

    #[test]
    fn empty_listing_yields_no_matches() {
        let matched = match_images(&[], Path::new("/data"), &criteria("DF195", "P1", "", ""));
        assert!(matched.is_empty());
    }

    #[test]
    fn secondary_inputs_need_experiment_and_plate_hit() {
        let files = paths("/data", &["DF195_P1_L52_PreFix_A2.jpg"]);
        assert!(secondary_inputs_enabled(&files, &criteria("df195", "P1", "", "")));
        assert!(!secondary_inputs_enabled(&files, &criteria("DF196", "P1", "", "")));
        assert!(!secondary_inputs_enabled(&files, &criteria("DF195", "", "", "")));
        assert!(!secondary_inputs_enabled(&[], &criteria("DF195", "P1", "", "")));
    }
}

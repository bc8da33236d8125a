use crate::matcher::ImageRecord;

pub const ROWS: [char; 8] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'];
pub const COLUMNS: std::ops::RangeInclusive<u8> = 1..=12;

/// Border rows reserved for controls; never interactive.
pub const DISABLED_ROWS: [char; 2] = ['A', 'H'];

pub fn is_disabled_row(row: char) -> bool {
    DISABLED_ROWS.contains(&row.to_ascii_uppercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellContent<'a> {
    Disabled,
    Empty,
    Image(&'a ImageRecord),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlateCell<'a> {
    pub id: String,
    pub row: char,
    pub column: u8,
    pub content: CellContent<'a>,
}

impl<'a> PlateCell<'a> {
    pub fn image(&self) -> Option<&'a ImageRecord> {
        match self.content {
            CellContent::Image(record) => Some(record),
            _ => None,
        }
    }
}

/// The 8x12 plate in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlateMap<'a> {
    cells: Vec<PlateCell<'a>>,
}

impl<'a> PlateMap<'a> {
    pub fn rows(&self) -> impl Iterator<Item = &[PlateCell<'a>]> {
        self.cells.chunks(COLUMNS.len())
    }

    pub fn get(&self, cell_id: &str) -> Option<&PlateCell<'a>> {
        self.cells
            .iter()
            .find(|cell| cell.id.eq_ignore_ascii_case(cell_id))
    }

    pub fn image_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.image().is_some()).count()
    }
}

/// Projects `images` onto the plate. When several records share a well id the
/// first one in input order wins.
pub fn map_to_grid(images: &[ImageRecord]) -> PlateMap<'_> {
    let mut cells = Vec::with_capacity(ROWS.len() * COLUMNS.len());
    for row in ROWS {
        for column in COLUMNS {
            let id = format!("{row}{column}");
            let content = if is_disabled_row(row) {
                CellContent::Disabled
            } else {
                images
                    .iter()
                    .find(|image| image.well_id.eq_ignore_ascii_case(&id))
                    .map(CellContent::Image)
                    .unwrap_or(CellContent::Empty)
            };
            cells.push(PlateCell {
                id,
                row,
                column,
                content,
            });
        }
    }
    PlateMap { cells }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::matcher::{match_images, FilterCriteria};

    fn record(filename: &str, well_id: &str) -> ImageRecord {
        ImageRecord {
            filename: filename.to_string(),
            well_id: well_id.to_string(),
            path: PathBuf::from(filename),
        }
    }

    #[test]
    fn grid_has_96_cells_in_row_major_order() {
        let plate = map_to_grid(&[]);
        let cells = plate.rows().flatten().collect::<Vec<_>>();
        assert_eq!(cells.len(), 96);
        assert_eq!(cells[0].id, "A1");
        assert_eq!(cells[11].id, "A12");
        assert_eq!(cells[12].id, "B1");
        assert_eq!(cells[95].id, "H12");
        assert_eq!(plate.rows().count(), 8);
        assert!(plate.rows().all(|row| row.len() == 12));
    }

    #[test]
    fn border_rows_stay_disabled_even_with_matches() {
        let images = vec![record("x_A1.jpg", "a1"), record("x_H12.jpg", "h12")];
        let plate = map_to_grid(&images);
        assert_eq!(plate.get("A1").unwrap().content, CellContent::Disabled);
        assert_eq!(plate.get("h12").unwrap().content, CellContent::Disabled);
        assert_eq!(plate.image_count(), 0);
    }

    #[test]
    fn unmatched_cells_are_empty() {
        let images = [record("x_B2.jpg", "b2")];
        let plate = map_to_grid(&images);
        assert_eq!(plate.get("B3").unwrap().content, CellContent::Empty);
        assert_eq!(
            plate.get("B2").unwrap().image().map(|r| r.filename.as_str()),
            Some("x_B2.jpg")
        );
    }

    #[test]
    fn duplicate_well_ids_keep_first_in_input_order() {
        let images = vec![record("first_C5.jpg", "c5"), record("second_C5.jpg", "C5")];
        let plate = map_to_grid(&images);
        assert_eq!(
            plate.get("c5").unwrap().image().unwrap().filename,
            "first_C5.jpg"
        );
    }

    #[test]
    fn filter_then_map_end_to_end() {
        let dir = Path::new("/plates");
        let files = vec![
            dir.join("DF195_P1_L52_PreFix_A2.jpg"),
            dir.join("DF195_P1_L52_PreFix_B3.jpg"),
        ];
        let criteria = FilterCriteria {
            experiment: "DF195".to_string(),
            plate: "P1".to_string(),
            patient_code: "L52".to_string(),
            stage: "PreFix".to_string(),
        };
        let matched = match_images(&files, dir, &criteria);
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0].well_id, "a2");
        assert_eq!(matched[1].well_id, "b3");

        let plate = map_to_grid(&matched);
        // A2 is in a border row, so only B3 is shown.
        assert_eq!(plate.get("A2").unwrap().content, CellContent::Disabled);
        assert_eq!(
            plate.get("B3").unwrap().image().unwrap().filename,
            "DF195_P1_L52_PreFix_B3.jpg"
        );
        assert_eq!(plate.image_count(), 1);
    }
}

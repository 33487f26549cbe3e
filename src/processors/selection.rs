use crate::error::{ProcessingError, Result};
use crate::models::Table;
use crate::utils::constants::CITY_COLUMN;
use tracing::{debug, info};

/// Keep rows whose city matches `city`, ignoring case and surrounding whitespace.
///
/// Returns the number of rows removed, or a missing-column error when the
/// table has no city column.
pub fn filter_city(table: &mut Table, city: &str) -> Result<usize> {
    let index = table
        .column_index(CITY_COLUMN)
        .ok_or_else(|| ProcessingError::missing_column(CITY_COLUMN, "city filter"))?;
    let wanted = city.trim().to_lowercase();

    let before = table.len();
    let removed = table.retain_rows(|row| {
        row[index]
            .as_text()
            .map_or(false, |value| value.trim().to_lowercase() == wanted)
    });

    info!(city = %wanted, before, kept = table.len(), "Filtered rows by city");
    Ok(removed)
}

/// Project onto the allow-list, skipping requested columns that are absent.
///
/// An empty allow-list keeps the table unchanged.
pub fn select_columns<S: AsRef<str>>(table: &Table, allow_list: &[S]) -> Table {
    if allow_list.is_empty() {
        return table.clone();
    }

    let (selected, skipped) = table.select_existing(allow_list);
    if !skipped.is_empty() {
        debug!(?skipped, "Requested output columns not present");
    }
    info!(
        columns = selected.columns().len(),
        "Restricted output to the allow-listed columns"
    );
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;
    use crate::readers::TableReader;

    fn table(csv: &str) -> Table {
        TableReader::new().parse_str(csv).unwrap()
    }

    #[test]
    fn test_city_filter_is_case_and_space_insensitive() {
        let mut t = table("city,value\n Amsterdam ,1\nAMSTERDAM,2\nUtrecht,3\n,4\n");
        let removed = filter_city(&mut t, "amsterdam").unwrap();

        assert_eq!(removed, 2);
        assert_eq!(t.len(), 2);
        assert_eq!(t.cell(1, "value"), Some(&Cell::text("2")));
    }

    #[test]
    fn test_city_filter_without_city_column() {
        let mut t = table("value\n1\n");
        let err = filter_city(&mut t, "amsterdam").unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_select_columns_skips_unknown() {
        let t = table("value,lat,extra\n1,52,x\n");
        let selected = select_columns(&t, &["lat", "lon", "value"]);
        assert_eq!(selected.columns(), &["lat", "value"].map(String::from));
    }

    #[test]
    fn test_empty_allow_list_keeps_everything() {
        let t = table("a,b\n1,2\n");
        let empty: [&str; 0] = [];
        assert_eq!(select_columns(&t, &empty), t);
    }
}

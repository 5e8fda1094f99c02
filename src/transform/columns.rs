use std::collections::BTreeMap;

use crate::data::Dataset;
use crate::error::TransformError;

impl Dataset {
    /// Remove `names`. A missing column is an error unless `tolerant`.
    pub fn drop_columns(&mut self, names: &[String], tolerant: bool) -> Result<(), TransformError> {
        let mut doomed = Vec::with_capacity(names.len());
        for name in names {
            match self.column_index(name) {
                Ok(i) => doomed.push(i),
                Err(_) if tolerant => continue,
                Err(e) => return Err(e),
            }
        }
        if doomed.is_empty() {
            return Ok(());
        }

        let keep: Vec<bool> = (0..self.width()).map(|i| !doomed.contains(&i)).collect();
        self.columns = retain_flags(std::mem::take(&mut self.columns), &keep);
        for row in self.rows.iter_mut() {
            *row = retain_flags(std::mem::take(row), &keep);
        }
        Ok(())
    }

    /// Keep only `names`, in that order.
    pub fn select_columns(&mut self, names: &[String]) -> Result<(), TransformError> {
        let idx = names
            .iter()
            .map(|n| self.column_index(n))
            .collect::<Result<Vec<_>, _>>()?;

        self.columns = names.to_vec();
        for row in self.rows.iter_mut() {
            *row = idx.iter().map(|&i| row[i].clone()).collect();
        }
        Ok(())
    }

    /// Rename columns per `mapping` (old → new). Every old name must exist.
    pub fn rename_columns(&mut self, mapping: &BTreeMap<String, String>) -> Result<(), TransformError> {
        let targets = mapping
            .iter()
            .map(|(old, new)| self.column_index(old).map(|i| (i, new)))
            .collect::<Result<Vec<_>, _>>()?;
        for (i, new) in targets {
            self.columns[i] = new.clone();
        }
        Ok(())
    }
}

fn retain_flags<T>(items: Vec<T>, keep: &[bool]) -> Vec<T> {
    items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, &k)| k.then_some(item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;

    fn table() -> Dataset {
        Dataset::from_rows(
            ["Unnamed: 0", "Pos.", "Team"],
            vec![vec![Value::Null, "1".into(), "A".into()]],
        )
    }

    #[test]
    fn test_drop() {
        let mut ds = table();
        ds.drop_columns(&["Unnamed: 0".into()], false).unwrap();
        assert_eq!(ds.columns(), &["Pos.", "Team"]);
        assert_eq!(ds.rows()[0], vec![Value::text("1"), Value::text("A")]);
    }

    #[test]
    fn test_drop_missing() {
        let mut ds = table();
        assert!(matches!(
            ds.drop_columns(&["Pts".into()], false),
            Err(TransformError::ColumnNotFound(_))
        ));
        ds.drop_columns(&["Pts".into()], true).unwrap();
        assert_eq!(ds.width(), 3);
    }

    #[test]
    fn test_select_reorders() {
        let mut ds = table();
        ds.select_columns(&["Team".into(), "Pos.".into()]).unwrap();
        assert_eq!(ds.columns(), &["Team", "Pos."]);
        assert_eq!(ds.rows()[0], vec![Value::text("A"), Value::text("1")]);
    }

    #[test]
    fn test_rename() {
        let mut ds = table();
        let mapping = BTreeMap::from([("Team".to_string(), "Squadra".to_string())]);
        ds.rename_columns(&mapping).unwrap();
        assert_eq!(ds.columns(), &["Unnamed: 0", "Pos.", "Squadra"]);
    }
}

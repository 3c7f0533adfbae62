use log::debug;

// ---------------------------------------------------------------------------
// Insertion directives
// ---------------------------------------------------------------------------

/// Where a column should land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Directly after the named column (append if it is not present).
    After(String),
    Append,
}

/// One "put column X here" instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInsert {
    pub name: String,
    pub placement: Placement,
}

impl ColumnInsert {
    pub fn after(name: &str, target: &str) -> Self {
        ColumnInsert {
            name: name.to_string(),
            placement: Placement::After(target.to_string()),
        }
    }

    pub fn append(name: &str) -> Self {
        ColumnInsert {
            name: name.to_string(),
            placement: Placement::Append,
        }
    }
}

// ---------------------------------------------------------------------------
// ColumnSchema – ordered, duplicate-free column list
// ---------------------------------------------------------------------------

/// An ordered list of column names with no duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSchema {
    columns: Vec<String>,
}

impl ColumnSchema {
    pub fn new<I, S>(base: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut schema = ColumnSchema::default();
        for name in base {
            let name = name.into();
            if !schema.contains(&name) {
                schema.columns.push(name);
            }
        }
        schema
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Move `name` to `placement`, inserting it if it is not there yet.
    ///
    /// The target is resolved after `name` has been taken out, so the
    /// result never holds `name` twice.
    pub fn move_or_insert(&mut self, name: &str, placement: &Placement) {
        if let Some(idx) = self.position(name) {
            self.columns.remove(idx);
        }
        let at = match placement {
            Placement::After(target) => match self.position(target) {
                Some(idx) => idx + 1,
                None => {
                    debug!("column '{target}' not present, appending '{name}'");
                    self.columns.len()
                }
            },
            Placement::Append => self.columns.len(),
        };
        self.columns.insert(at, name.to_string());
    }

    /// Apply directives in order; each sees the result of the previous one.
    pub fn apply(&mut self, directives: &[ColumnInsert]) {
        for d in directives {
            self.move_or_insert(&d.name, &d.placement);
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<String> {
        self.columns
    }
}

/// Final column order for `base` after `directives`.
pub fn build_columns(base: &[String], directives: &[ColumnInsert]) -> Vec<String> {
    let mut schema = ColumnSchema::new(base.iter().cloned());
    schema.apply(directives);
    schema.into_columns()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Vec<String> {
        ["HostID", "Host", "%_RAM_Util", "%_RAM_Util_MAX", "Note"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_chained_inserts_follow_each_other() {
        let cols = build_columns(
            &base(),
            &[
                ColumnInsert::after("A", "%_RAM_Util_MAX"),
                ColumnInsert::after("B", "A"),
                ColumnInsert::after("C", "B"),
            ],
        );
        assert_eq!(
            cols,
            ["HostID", "Host", "%_RAM_Util", "%_RAM_Util_MAX", "A", "B", "C", "Note"]
        );
    }

    #[test]
    fn test_existing_column_is_repositioned() {
        let cols = build_columns(&base(), &[ColumnInsert::after("Note", "Host")]);
        assert_eq!(cols, ["HostID", "Host", "Note", "%_RAM_Util", "%_RAM_Util_MAX"]);
    }

    #[test]
    fn test_last_directive_wins_for_duplicate_name() {
        let cols = build_columns(
            &base(),
            &[
                ColumnInsert::after("X", "Host"),
                ColumnInsert::after("X", "%_RAM_Util_MAX"),
            ],
        );
        assert_eq!(cols.iter().filter(|c| *c == "X").count(), 1);
        assert_eq!(
            cols,
            ["HostID", "Host", "%_RAM_Util", "%_RAM_Util_MAX", "X", "Note"]
        );
    }

    #[test]
    fn test_unresolved_target_appends() {
        let cols = build_columns(
            &base(),
            &[
                ColumnInsert::after("Y", "Missing"),
                ColumnInsert::append("Z"),
            ],
        );
        assert_eq!(cols[cols.len() - 2..], ["Y", "Z"]);
    }

    #[test]
    fn test_forward_reference_falls_back_only_for_that_directive() {
        let cols = build_columns(
            &base(),
            &[
                ColumnInsert::after("B", "A"),
                ColumnInsert::after("A", "Host"),
            ],
        );
        assert_eq!(
            cols,
            ["HostID", "Host", "A", "%_RAM_Util", "%_RAM_Util_MAX", "Note", "B"]
        );
    }

    #[test]
    fn test_self_target_appends() {
        let mut schema = ColumnSchema::new(base());
        schema.move_or_insert("Host", &Placement::After("Host".into()));
        assert_eq!(schema.columns().last().map(String::as_str), Some("Host"));
        assert_eq!(schema.columns().len(), 5);
    }
}

use std::fmt::{self, Display, Formatter};

use comfy_table::presets::UTF8_HORIZONTAL_BORDERS_ONLY;
use comfy_table::{Cell, ContentArrangement, Row as TableRow, Table, TableComponent};

use crate::DataSet;

/// Renders a [`DataSet`] as a text table.
pub struct DataSetDisplay<'a> {
    dataset: &'a DataSet,
    header: bool,
    max_rows: Option<usize>,
}

impl DataSet {
    pub fn display(&self) -> DataSetDisplay<'_> {
        DataSetDisplay {
            dataset: self,
            header: true,
            max_rows: None,
        }
    }
}

impl<'a> DataSetDisplay<'a> {
    pub fn without_header(self) -> Self {
        Self {
            header: false,
            ..self
        }
    }

    /// Only renders the first `max_rows` rows, followed by a summary line.
    pub fn with_max_rows(self, max_rows: usize) -> Self {
        Self {
            max_rows: Some(max_rows),
            ..self
        }
    }
}

impl<'a> Display for DataSetDisplay<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.load_preset(UTF8_HORIZONTAL_BORDERS_ONLY);

        if self.header {
            table.set_header(
                self.dataset
                    .schema()
                    .fields()
                    .iter()
                    .map(|field| format!("{}: {}", field.name, field.data_type)),
            );
        } else {
            table.remove_style(TableComponent::TopBorder);
            table.remove_style(TableComponent::TopBorderIntersections);
        }

        if self.dataset.is_empty() {
            table.add_row(TableRow::from(vec!["No data!"]));
            return table.fmt(f);
        }

        let limit = self.max_rows.unwrap_or_else(|| self.dataset.len());
        for row in self.dataset.rows().iter().take(limit) {
            let mut table_row = TableRow::new();
            for value in row.values() {
                table_row.add_cell(Cell::new(value));
            }
            table.add_row(table_row);
        }

        let hidden = self.dataset.len().saturating_sub(limit);
        if hidden > 0 {
            table.add_row(TableRow::from(vec![format!("... {} more row(s)", hidden)]));
        }

        table.fmt(f)
    }
}

impl Display for DataSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.display().fmt(f)
    }
}

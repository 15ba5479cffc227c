use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::commands::DecodeReport;

pub fn print_report(report: &DecodeReport) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Input"),
        header_cell("Rows"),
        header_cell("Columns"),
        header_cell("Output"),
    ]);
    apply_table_style(&mut table);
    if let Some(column) = table.column_mut(1) {
        column.set_cell_alignment(CellAlignment::Right);
    }

    let mut total_rows = 0usize;
    for outcome in &report.outcomes {
        let input = Cell::new(outcome.unit.display());
        match &outcome.result {
            Ok(summary) => {
                total_rows += summary.rows;
                table.add_row(vec![
                    input,
                    Cell::new(summary.rows),
                    Cell::new(summary.columns.join(", ")),
                    Cell::new(summary.output.display()),
                ]);
            }
            Err(error) => {
                table.add_row(vec![
                    input.fg(Color::Red),
                    dim_cell("-"),
                    dim_cell("-"),
                    Cell::new(format!("{error:#}")).fg(Color::Red),
                ]);
            }
        }
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(total_rows).add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell(format!(
            "{} failed of {}",
            report.failures().count(),
            report.outcomes.len()
        )),
    ]);
    println!("{table}");
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn color_coded_completion_cell(rate: f64) -> Cell {
    let text = format!("{rate:.1}%");
    if rate >= 90.0 {
        Cell::new(text).fg(TableColor::Green)
    } else if rate >= 75.0 {
        Cell::new(text).fg(TableColor::Yellow)
    } else {
        Cell::new(text).fg(TableColor::Red)
    }
}

pub fn color_coded_age_cell(working_days: u32) -> Cell {
    let text = format!("{working_days}d");
    if working_days <= 5 {
        Cell::new(text).fg(TableColor::Green)
    } else if working_days <= 10 {
        Cell::new(text).fg(TableColor::Yellow)
    } else {
        Cell::new(text).fg(TableColor::Red)
    }
}

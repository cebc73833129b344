use crate::analytics;
use crate::cli::ui;
use crate::service::PriceService;
use anyhow::Result;
use chrono::NaiveDate;
use comfy_table::Cell;

pub async fn run(service: &PriceService, code: &str, start: NaiveDate, end: NaiveDate) -> Result<()> {
    let spinner = ui::new_spinner(&format!("Fetching {code} prices..."));
    let points = service.historical_prices(code, start, end).await?;
    spinner.finish_and_clear();

    if points.is_empty() {
        println!(
            "{}",
            ui::style_text(
                &format!("No data available for {code} between {start} and {end}"),
                ui::StyleType::Error
            )
        );
        return Ok(());
    }

    let rows = analytics::prepare(&points);

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Price (BRL)"),
        ui::header_cell("MA 7"),
        ui::header_cell("MA 30"),
        ui::header_cell("Change"),
        ui::header_cell("Change 30d"),
        ui::header_cell("Min 30"),
        ui::header_cell("Max 30"),
    ]);
    for row in &rows {
        let change = row
            .pct_change
            .map_or(Cell::new("N/A"), ui::change_cell);
        let change_30d = row
            .pct_change_30d
            .map_or(Cell::new("N/A"), ui::change_cell);
        table.add_row(vec![
            Cell::new(row.date.to_string()),
            Cell::new(format!("{:.2}", row.price_brl)),
            Cell::new(format!("{:.2}", row.ma_7)),
            Cell::new(format!("{:.2}", row.ma_30)),
            change,
            change_30d,
            Cell::new(format!("{:.2}", row.min_30)),
            Cell::new(format!("{:.2}", row.max_30)),
        ]);
    }

    println!(
        "{}\n\n{table}",
        ui::style_text(
            &format!("{code} analytics: {start} to {end}"),
            ui::StyleType::Title
        )
    );
    Ok(())
}

use crate::cli::ui;
use crate::core::PricePoint;
use crate::service::PriceService;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use comfy_table::Cell;
use std::path::Path;

pub async fn run(
    service: &PriceService,
    code: &str,
    start: NaiveDate,
    end: NaiveDate,
    output: Option<&Path>,
) -> Result<()> {
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

    if let Some(path) = output {
        write_csv(path, &points)?;
        println!(
            "Wrote {} rows to {}",
            points.len(),
            ui::style_text(&path.display().to_string(), ui::StyleType::Subtle)
        );
        return Ok(());
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Price (BRL)"),
        ui::header_cell("Price (USD)"),
        ui::header_cell("Rate used"),
    ]);
    for point in &points {
        table.add_row(vec![
            Cell::new(point.date.to_string()),
            Cell::new(format!("{:.2}", point.price_brl)),
            ui::format_optional_cell(point.price_usd, |v| format!("{v:.2}")),
            ui::format_optional_cell(point.exchange_rate, |v| format!("{v:.4}")),
        ]);
    }

    println!(
        "{}\n\n{table}",
        ui::style_text(&format!("{code}: {start} to {end}"), ui::StyleType::Title)
    );
    Ok(())
}

fn write_csv(path: &Path, points: &[PricePoint]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    writer.write_record(["date", "price_brl", "price_usd", "exchange_rate"])?;
    for point in points {
        writer.write_record([
            point.date.to_string(),
            format!("{}", point.price_brl),
            point.price_usd.map(|v| v.to_string()).unwrap_or_default(),
            point
                .exchange_rate
                .map(|v| v.to_string())
                .unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_export_keeps_optional_fields_blank() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let points = vec![
            PricePoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                price_brl: 245.6,
                price_usd: Some(49.62),
                exchange_rate: Some(4.95),
            },
            PricePoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
                price_brl: 246.3,
                price_usd: None,
                exchange_rate: None,
            },
        ];

        write_csv(&path, &points).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "date,price_brl,price_usd,exchange_rate"
        );
        assert_eq!(lines.next().unwrap(), "2024-01-02,245.6,49.62,4.95");
        assert_eq!(lines.next().unwrap(), "2024-01-03,246.3,,");
    }
}

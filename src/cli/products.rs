use crate::cli::ui;
use crate::service::PriceService;
use anyhow::Result;
use comfy_table::Cell;

pub fn run(service: &PriceService) -> Result<()> {
    let products = service.list_products();

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Code"),
        ui::header_cell("Product"),
        ui::header_cell("Unit"),
        ui::header_cell("Currency"),
        ui::header_cell("Source"),
    ]);

    for product in &products {
        table.add_row(vec![
            Cell::new(&product.code),
            Cell::new(&product.display_name),
            Cell::new(&product.unit),
            Cell::new(product.currency.to_string()),
            Cell::new(product.source.label()),
        ]);
    }

    println!(
        "{}\n\n{table}",
        ui::style_text("Available products", ui::StyleType::Title)
    );
    Ok(())
}

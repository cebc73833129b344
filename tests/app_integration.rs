use agq::service::ServiceError;
use chrono::NaiveDate;
use std::fs;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Writes a config pointing every provider at `mock_server` with a
/// throwaway data directory, and returns the parsed config. The temp
/// handles must stay alive for the duration of the test.
fn mock_config(
    mock_server: &MockServer,
) -> (agq::config::AppConfig, tempfile::NamedTempFile, tempfile::TempDir) {
    let data_dir = tempfile::tempdir().expect("Failed to create data dir");
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let config_content = format!(
        r#"
        providers:
          cepea:
            base_url: {uri}
          ipeadata:
            base_url: {uri}
          bcb:
            base_url: {uri}
          ptax:
            base_url: {uri}
        data_path: "{data}"
    "#,
        uri = mock_server.uri(),
        data = data_dir.path().display()
    );
    fs::write(config_file.path(), &config_content).expect("Failed to write config file");

    let config = agq::config::AppConfig::load_from_path(config_file.path())
        .expect("Failed to load config");
    (config, config_file, data_dir)
}

async fn mount_ptax(mock_server: &MockServer, rate: f64) {
    let body = format!(r#"{{"value": [{{"cotacaoCompra": {rate}}}]}}"#);
    Mock::given(method("GET"))
        .and(path_regex(r"CotacaoDolarDia"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(mock_server)
        .await;
}

const BGI_PAGE: &str = r#"
    <html><body>
    <table id="imagenet-indicador1">
        <tr><th>Data</th><th>Valor R$</th></tr>
        <tr><td>05/01/2024</td><td>244,80</td></tr>
        <tr><td>04/01/2024</td><td>243,10</td></tr>
        <tr><td>03/01/2024</td><td>n/d</td></tr>
        <tr><td>02/01/2024</td><td>241,50</td></tr>
        <tr><td>01/01/2024</td><td>240,00</td></tr>
    </table>
    </body></html>"#;

#[test_log::test(tokio::test)]
async fn test_scraped_product_flow_derives_usd_legs() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indicador/boi-gordo.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BGI_PAGE))
        .mount(&mock_server)
        .await;
    mount_ptax(&mock_server, 4.95).await;

    let (config, _config_file, _data_dir) = mock_config(&mock_server);
    let service = agq::build_service(&config).expect("Failed to build service");

    let points = service
        .historical_prices("BGI", date(2024, 1, 1), date(2024, 1, 5))
        .await
        .expect("Fetch failed");

    // The unparseable 03/01 row is dropped; the rest come back ascending
    let dates: Vec<NaiveDate> = points.iter().map(|p| p.date).collect();
    assert_eq!(
        dates,
        vec![
            date(2024, 1, 1),
            date(2024, 1, 2),
            date(2024, 1, 4),
            date(2024, 1, 5)
        ]
    );
    for point in &points {
        assert_eq!(point.exchange_rate, Some(4.95));
        let usd = point.price_usd.expect("USD leg missing");
        assert!((usd - point.price_brl / 4.95).abs() < 1e-9);
    }
    assert_eq!(points[0].price_brl, 240.00);
    assert_eq!(points[3].price_brl, 244.80);
}

#[test_log::test(tokio::test)]
async fn test_second_fetch_is_served_from_cache() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indicador/boi-gordo.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BGI_PAGE))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_ptax(&mock_server, 4.95).await;

    let (config, _config_file, _data_dir) = mock_config(&mock_server);
    let service = agq::build_service(&config).expect("Failed to build service");

    let first = service
        .historical_prices("BGI", date(2024, 1, 1), date(2024, 1, 5))
        .await
        .expect("First fetch failed");
    let second = service
        .historical_prices("BGI", date(2024, 1, 1), date(2024, 1, 5))
        .await
        .expect("Second fetch failed");

    assert_eq!(first, second);
}

#[test_log::test(tokio::test)]
async fn test_retired_central_bank_series_substitutes_alternate() {
    let series_body = r#"[
        {"data": "02/01/2024", "valor": "152.34"},
        {"data": "03/01/2024", "valor": "153.10"}
    ]"#;

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dados/serie/bcdata.sgs.7461/dados"))
        .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"erro":"Value(s) not found"}"#))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dados/serie/bcdata.sgs.7811/dados"))
        .respond_with(ResponseTemplate::new(200).set_body_string(series_body))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_ptax(&mock_server, 5.10).await;

    let (config, _config_file, _data_dir) = mock_config(&mock_server);
    let service = agq::build_service(&config).expect("Failed to build service");

    let points = service
        .historical_prices("SOJ", date(2024, 1, 1), date(2024, 1, 31))
        .await
        .expect("Fetch failed");

    assert_eq!(points.len(), 2);
    assert_eq!(points[0].date, date(2024, 1, 2));
    assert_eq!(points[0].price_brl, 152.34);
    assert_eq!(points[0].exchange_rate, Some(5.10));
}

#[test_log::test(tokio::test)]
async fn test_source_failure_degrades_to_empty_series() {
    // Nothing mounted: the indicator page request 404s
    let mock_server = MockServer::start().await;

    let (config, _config_file, _data_dir) = mock_config(&mock_server);
    let service = agq::build_service(&config).expect("Failed to build service");

    let points = service
        .historical_prices("BGI", date(2024, 1, 1), date(2024, 1, 5))
        .await
        .expect("Degraded fetch should not error");
    assert!(points.is_empty());
}

#[test_log::test(tokio::test)]
async fn test_invalid_range_and_unknown_product_are_rejected() {
    let mock_server = MockServer::start().await;
    let (config, _config_file, _data_dir) = mock_config(&mock_server);
    let service = agq::build_service(&config).expect("Failed to build service");

    let result = service
        .historical_prices("BGI", date(2024, 2, 1), date(2024, 1, 1))
        .await;
    assert!(matches!(result, Err(ServiceError::InvalidRange { .. })));

    let result = service
        .historical_prices("XXX", date(2024, 1, 1), date(2024, 1, 31))
        .await;
    assert!(matches!(result, Err(ServiceError::UnknownProduct(code)) if code == "XXX"));
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_writes_csv() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indicador/boi-gordo.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BGI_PAGE))
        .mount(&mock_server)
        .await;
    mount_ptax(&mock_server, 4.95).await;

    let (_, config_file, _data_dir) = mock_config(&mock_server);
    let output_dir = tempfile::tempdir().expect("Failed to create output dir");
    let output_path = output_dir.path().join("bgi.csv");

    let result = agq::run_command(
        agq::AppCommand::Prices {
            code: "BGI".to_string(),
            start: date(2024, 1, 1),
            end: date(2024, 1, 5),
            output: Some(output_path.clone()),
        },
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Command failed with: {:?}", result.err());

    let contents = fs::read_to_string(&output_path).expect("CSV not written");
    let mut lines = contents.lines();
    assert_eq!(
        lines.next().unwrap(),
        "date,price_brl,price_usd,exchange_rate"
    );
    assert_eq!(lines.count(), 4);
}
